use super::{FileEntry, Sha1Hash};
use crate::{Error, Result};
use std::fs::File;
use std::io::{self, Read};
use std::path::Path;
use tracing::debug;

/// Splits a byte stream into fixed-size pieces and hashes each one.
///
/// Feed sources in order with [`PieceHasher::update`]; they are treated as
/// one concatenated stream, so a piece may span several sources.
pub struct PieceHasher {
    buf: Vec<u8>,
    offset: usize,
    pieces: Vec<Sha1Hash>,
}

impl PieceHasher {
    pub fn new(piece_size: usize) -> Result<Self> {
        if piece_size == 0 {
            return Err(Error::InvalidPieceSize(piece_size));
        }
        Ok(Self {
            buf: vec![0u8; piece_size],
            offset: 0,
            pieces: vec![],
        })
    }

    pub fn piece_size(&self) -> usize {
        self.buf.len()
    }

    /// Reads `input` to the end, returning how many bytes it contributed.
    pub fn update<R: Read>(&mut self, mut input: R) -> io::Result<u64> {
        let mut total = 0u64;
        loop {
            let n = match input.read(&mut self.buf[self.offset..]) {
                Ok(0) => break,
                Ok(n) => n,
                Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                Err(e) => return Err(e),
            };
            total += n as u64;
            self.offset += n;
            if self.offset == self.buf.len() {
                self.pieces.push(Sha1Hash::digest(&self.buf));
                self.offset = 0;
            }
        }
        Ok(total)
    }

    /// Hashes the partial last piece, if any, and returns every digest in
    /// stream order.
    pub fn finish(mut self) -> Vec<Sha1Hash> {
        if self.offset > 0 {
            self.pieces.push(Sha1Hash::digest(&self.buf[..self.offset]));
        }
        self.pieces
    }
}

/// Hashes `files` under `root` in the order given.
///
/// Any unreadable file aborts the whole pass.
pub fn hash_files(root: &Path, files: &[FileEntry], piece_size: usize) -> Result<Vec<Sha1Hash>> {
    let mut hasher = PieceHasher::new(piece_size)?;
    for entry in files {
        let path = entry.path_under(root);
        let file = File::open(&path).map_err(|e| Error::io(&path, e))?;
        let read = hasher.update(file).map_err(|e| Error::io(&path, e))?;
        debug!(path = ?path, length = read, "hashed file");
    }
    let pieces = hasher.finish();
    debug!(count = pieces.len(), piece_size, "hashed pieces");
    Ok(pieces)
}
