mod builder;
mod file;
mod hash;
mod piece;
use crate::Result;
pub use builder::{build, collect_files, FileList, CREATED_BY};
pub use file::{FileEntry, Info, Metainfo};
pub use hash::{Sha1Hash, SHA1_LEN};
pub use piece::{hash_files, PieceHasher};

/// Info-hash of an encoded torrent.
pub fn torrent_info_hash(torrent: &[u8]) -> Result<Sha1Hash> {
    Metainfo::from_bytes(torrent)?.info_hash()
}

pub fn parse_torrent(buf: impl AsRef<[u8]>) -> Result<Metainfo> {
    Metainfo::from_bytes(buf)
}
