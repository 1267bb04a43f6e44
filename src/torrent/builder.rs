use super::{hash_files, FileEntry, Metainfo};
use crate::config::CreateConfig;
use crate::{Error, Result};
use bencode::{Dictionary, Value};
use chrono::Utc;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// Written to `created by` in every torrent this crate builds.
pub const CREATED_BY: &str = concat!("torrentfile/", env!("CARGO_PKG_VERSION"));

/// Content to put in a torrent: entries relative to `root`, in hashing order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FileList {
    pub root: PathBuf,
    pub files: Vec<FileEntry>,
}

impl FileList {
    pub fn new(root: impl Into<PathBuf>, files: Vec<FileEntry>) -> Self {
        Self {
            root: root.into(),
            files,
        }
    }

    pub fn total_length(&self) -> u64 {
        self.files.iter().map(|f| f.length).sum()
    }
}

/// Lists a file, or every file below a directory.
///
/// Each directory level is visited in file-name order so the result does
/// not depend on how the filesystem enumerates entries. Symbolic links below
/// a directory are skipped.
pub fn collect_files(path: impl AsRef<Path>) -> Result<FileList> {
    let path = path.as_ref();
    let meta = fs::metadata(path).map_err(|e| Error::io(path, e))?;

    let list = if meta.is_dir() {
        let mut files = vec![];
        walk(path, &mut vec![], &mut files)?;
        FileList::new(path, files)
    } else {
        let name = segment(path)?;
        let root = path.parent().map(Path::to_path_buf).unwrap_or_default();
        FileList::new(root, vec![FileEntry::new(vec![name], meta.len())])
    };

    if list.files.is_empty() {
        return Err(Error::NoFiles);
    }
    debug!(root = ?list.root, files = list.files.len(), length = list.total_length(), "collected files");
    Ok(list)
}

fn walk(dir: &Path, prefix: &mut Vec<String>, out: &mut Vec<FileEntry>) -> Result<()> {
    let mut entries = fs::read_dir(dir)
        .and_then(|rd| rd.collect::<std::io::Result<Vec<_>>>())
        .map_err(|e| Error::io(dir, e))?;
    entries.sort_by_key(|e| e.file_name());

    for entry in entries {
        let path = entry.path();
        let meta = entry.metadata().map_err(|e| Error::io(&path, e))?;
        prefix.push(segment(&path)?);
        if meta.is_dir() {
            walk(&path, prefix, out)?;
        } else if meta.is_file() {
            out.push(FileEntry::new(prefix.clone(), meta.len()));
        }
        prefix.pop();
    }
    Ok(())
}

fn segment(path: &Path) -> Result<String> {
    path.file_name()
        .and_then(|s| s.to_str())
        .map(str::to_owned)
        .ok_or_else(|| Error::InvalidInput(format!("unusable file name in {path:?}")))
}

/// Hashes `list` and assembles a torrent for it.
///
/// One entry produces a single-file torrent named after that entry; more
/// produce a `files` list, named only if `config.name` is set.
pub fn build(config: &CreateConfig, list: &FileList) -> Result<Metainfo> {
    if list.files.is_empty() {
        return Err(Error::NoFiles);
    }
    let piece_size = config.piece_size();
    let pieces = hash_files(&list.root, &list.files, piece_size)?;

    let mut info = Dictionary::new();
    info.insert("piece length", Value::try_from(piece_size)?);
    info.insert(
        "pieces",
        pieces
            .iter()
            .flat_map(|p| p.iter().copied())
            .collect::<Vec<u8>>(),
    );
    if config.private {
        info.insert("private", 1);
    }
    match list.files.as_slice() {
        [single] => {
            let name = config
                .name
                .clone()
                .or_else(|| single.path.last().cloned())
                .unwrap_or_default();
            info.insert("name", name);
            info.insert("length", Value::try_from(single.length)?);
        }
        files => {
            if let Some(name) = &config.name {
                info.insert("name", name);
            }
            info.insert(
                "files",
                files
                    .iter()
                    .map(FileEntry::to_value)
                    .collect::<Result<Vec<_>>>()?,
            );
        }
    }
    if config.md5 {
        debug!("md5sum requested but not computed");
    }

    let mut root = Dictionary::new();
    if !config.announce.is_empty() {
        root.insert("announce", &config.announce);
    }
    if !config.announce_list.is_empty() {
        let tiers = config
            .announce_list
            .iter()
            .map(|tier| Value::from(tier.iter().map(Value::from).collect::<Vec<_>>()))
            .collect::<Vec<_>>();
        root.insert("announce-list", tiers);
    }
    if !config.encoding.is_empty() {
        root.insert("encoding", &config.encoding);
    }
    if !config.comment.is_empty() {
        root.insert("comment", &config.comment);
    }
    if !config.url_list.is_empty() {
        root.insert(
            "url-list",
            config.url_list.iter().map(Value::from).collect::<Vec<_>>(),
        );
    }
    root.insert("creation date", Utc::now().timestamp());
    root.insert("created by", CREATED_BY);
    root.insert("info", info);

    let torrent = Metainfo::from_raw(root)?;
    info!(
        name = torrent.info().name(),
        files = list.files.len(),
        pieces = pieces.len(),
        piece_size,
        "built torrent"
    );
    Ok(torrent)
}
