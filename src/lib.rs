//! Reading, writing and creating BitTorrent metainfo (`.torrent`) files,
//! plus magnet link parsing and building.
//!
//! ```no_run
//! use torrentfile::Metainfo;
//!
//! let torrent = Metainfo::from_path("ubuntu.torrent")?;
//! println!("{} {}", torrent.info_hash()?, torrent.info().name());
//! println!("{}", torrent.magnet_link()?);
//! # Ok::<(), torrentfile::Error>(())
//! ```
pub mod config;
mod error;
pub mod magnet;
pub mod torrent;

pub use bencode;
pub use config::{CreateConfig, ParseMode};
pub use error::{Error, Result};
pub use magnet::MagnetLink;
pub use torrent::{FileEntry, Info, Metainfo, Sha1Hash};
