use super::{Sha1Hash, SHA1_LEN};
use crate::config::ParseMode;
use crate::magnet::MagnetLink;
use crate::{Error, Result};
use bencode::{Dictionary, Value};
use bytes::Bytes;
use chrono::{DateTime, TimeZone, Utc};
use serde::Serialize;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

/// One file of a multi-file torrent.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct FileEntry {
    pub path: Vec<String>,
    pub length: u64,
    pub md5sum: Option<String>,
}

impl FileEntry {
    pub fn new(path: Vec<String>, length: u64) -> Self {
        Self {
            path,
            length,
            md5sum: None,
        }
    }

    /// Location of this file on disk when the torrent content lives in `root`.
    pub fn path_under(&self, root: &Path) -> PathBuf {
        self.path
            .iter()
            .fold(root.to_path_buf(), |acc, p| acc.join(p))
    }

    pub(crate) fn to_value(&self) -> Result<Value> {
        let mut d = Dictionary::new();
        d.insert("length", Value::try_from(self.length)?);
        d.insert(
            "path",
            self.path.iter().map(Value::from).collect::<Vec<_>>(),
        );
        if let Some(md5sum) = &self.md5sum {
            d.insert("md5sum", md5sum);
        }
        Ok(d.into())
    }

    fn from_dict(d: &Dictionary) -> Self {
        Self {
            path: d
                .get("path")
                .and_then(Value::as_list)
                .unwrap_or_default()
                .iter()
                .filter_map(Value::as_str)
                .map(str::to_owned)
                .collect(),
            length: non_negative(d.get("length")).unwrap_or(0),
            md5sum: d.get("md5sum").and_then(Value::as_str).map(str::to_owned),
        }
    }
}

fn non_negative(v: Option<&Value>) -> Option<u64> {
    v.and_then(Value::as_i64).and_then(|n| u64::try_from(n).ok())
}

/// Read-only view of an `info` dictionary.
///
/// Every accessor reads the retained dictionary, so the typed values can
/// never disagree with the bytes the info-hash is computed over. Fields that
/// are missing or malformed read as their zero value.
#[derive(Clone, Copy)]
pub struct Info<'a> {
    dict: &'a Dictionary,
}

impl<'a> Info<'a> {
    pub fn raw(&self) -> &'a Dictionary {
        self.dict
    }

    pub fn piece_length(&self) -> u64 {
        non_negative(self.dict.get("piece length")).unwrap_or(0)
    }

    /// Content length; only single-file torrents carry it.
    pub fn length(&self) -> Option<u64> {
        non_negative(self.dict.get("length"))
    }

    pub fn name(&self) -> &'a str {
        self.dict
            .get("name")
            .and_then(Value::as_str)
            .unwrap_or_default()
    }

    pub fn private(&self) -> bool {
        self.dict
            .get("private")
            .and_then(Value::as_i64)
            .map_or(false, |n| n != 0)
    }

    pub fn source(&self) -> Option<&'a str> {
        self.dict.get("source").and_then(Value::as_str)
    }

    fn pieces_bytes(&self) -> &'a [u8] {
        self.dict
            .get("pieces")
            .and_then(Value::as_bytes)
            .map(|b| &b[..])
            .unwrap_or_default()
    }

    pub fn piece_count(&self) -> usize {
        self.pieces_bytes().len() / SHA1_LEN
    }

    pub fn piece(&self, index: usize) -> Option<Sha1Hash> {
        let start = index.checked_mul(SHA1_LEN)?;
        let end = start.checked_add(SHA1_LEN)?;
        self.pieces_bytes()
            .get(start..end)
            .and_then(|b| Sha1Hash::from_slice(b).ok())
    }

    pub fn pieces(&self) -> Vec<Sha1Hash> {
        self.pieces_bytes()
            .chunks_exact(SHA1_LEN)
            .filter_map(|b| Sha1Hash::from_slice(b).ok())
            .collect()
    }

    pub fn is_multi_file(&self) -> bool {
        self.dict.contains_key("files")
    }

    /// Declared files in order; empty for single-file torrents.
    pub fn files(&self) -> Vec<FileEntry> {
        self.dict
            .get("files")
            .and_then(Value::as_list)
            .unwrap_or_default()
            .iter()
            .filter_map(Value::as_dict)
            .map(FileEntry::from_dict)
            .collect()
    }

    pub fn total_length(&self) -> u64 {
        if self.is_multi_file() {
            return self.files().iter().map(|f| f.length).sum();
        }
        self.length().unwrap_or(0)
    }
}

impl std::fmt::Debug for Info<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Info")
            .field("name", &self.name())
            .field("piece_length", &self.piece_length())
            .field("length", &self.length())
            .field("files", &self.files())
            .field("private", &self.private())
            .field("source", &self.source())
            .field("piece_count", &self.piece_count())
            .finish_non_exhaustive()
    }
}

/// A loaded or freshly built torrent.
///
/// The decoded dictionaries are kept as-is: unknown keys survive
/// [`Metainfo::to_bytes`] and the info-hash is always taken over the
/// original `info` dictionary.
#[derive(Clone)]
pub struct Metainfo {
    announce: String,
    announce_list: Vec<Vec<String>>,
    creation_date: Option<DateTime<Utc>>,
    encoding: String,
    comment: String,
    created_by: String,
    url_list: Vec<String>,
    root: Dictionary,
    raw_info: Dictionary,
}

impl Metainfo {
    pub fn from_bytes(buf: impl AsRef<[u8]>) -> Result<Self> {
        Self::from_bytes_with_mode(buf, ParseMode::Lenient)
    }

    pub fn from_bytes_with_mode(buf: impl AsRef<[u8]>, mode: ParseMode) -> Result<Self> {
        let value = bencode::from_bytes(buf.as_ref())?;
        Self::from_value(value, mode)
    }

    /// Loads from a shared buffer without copying; `pieces` and other byte
    /// strings stay views into `buf`.
    pub fn from_buf(buf: Bytes, mode: ParseMode) -> Result<Self> {
        let value = bencode::from_buf(buf)?;
        Self::from_value(value, mode)
    }

    pub fn from_path(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let data = std::fs::read(path).map_err(|e| Error::io(path, e))?;
        let torrent = Self::from_buf(data.into(), ParseMode::Lenient)?;
        debug!(path = ?path, name = torrent.info().name(), "loaded torrent");
        Ok(torrent)
    }

    fn from_value(value: Value, mode: ParseMode) -> Result<Self> {
        match value {
            Value::Dictionary(d) => Self::from_raw_with_mode(d, mode),
            other => Err(Error::Structural(format!(
                "top level is a {}, expected dictionary",
                other.kind()
            ))),
        }
    }

    pub fn from_raw(root: Dictionary) -> Result<Self> {
        Self::from_raw_with_mode(root, ParseMode::Lenient)
    }

    pub fn from_raw_with_mode(mut root: Dictionary, mode: ParseMode) -> Result<Self> {
        let raw_info = match root.remove("info") {
            Some(Value::Dictionary(d)) => d,
            Some(other) => {
                return Err(Error::Structural(format!(
                    "info is a {}, expected dictionary",
                    other.kind()
                )))
            }
            None => return Err(Error::Structural("missing info dictionary".into())),
        };
        check_info(&raw_info, mode)?;

        let fields = Fields::new(&root, mode, "");
        let creation_date = match fields.integer("creation date")? {
            Some(secs) => match Utc.timestamp_opt(secs, 0).single() {
                Some(date) => Some(date),
                None => fields.malformed("creation date", "timestamp in range", "integer")?,
            },
            None => None,
        };

        Ok(Self {
            announce: fields.string("announce")?.unwrap_or_default(),
            announce_list: fields.announce_list()?,
            creation_date,
            encoding: fields.string("encoding")?.unwrap_or_default(),
            comment: fields.string("comment")?.unwrap_or_default(),
            created_by: fields.string("created by")?.unwrap_or_default(),
            url_list: fields.url_list()?,
            root,
            raw_info,
        })
    }

    pub fn announce(&self) -> &str {
        &self.announce
    }

    pub fn announce_list(&self) -> &[Vec<String>] {
        &self.announce_list
    }

    pub fn creation_date(&self) -> Option<DateTime<Utc>> {
        self.creation_date
    }

    pub fn encoding(&self) -> &str {
        &self.encoding
    }

    pub fn comment(&self) -> &str {
        &self.comment
    }

    pub fn created_by(&self) -> &str {
        &self.created_by
    }

    pub fn url_list(&self) -> &[String] {
        &self.url_list
    }

    pub fn info(&self) -> Info<'_> {
        Info {
            dict: &self.raw_info,
        }
    }

    /// The `info` dictionary exactly as decoded or built.
    pub fn raw_info(&self) -> &Dictionary {
        &self.raw_info
    }

    /// SHA-1 over the canonical encoding of the `info` dictionary.
    pub fn info_hash(&self) -> Result<Sha1Hash> {
        let buf = bencode::to_bytes(&Value::Dictionary(self.raw_info.clone()))?;
        Ok(Sha1Hash::digest(&buf))
    }

    /// `announce` followed by every `announce-list` tracker, without repeats.
    pub fn trackers(&self) -> Vec<String> {
        let mut trackers: Vec<String> = vec![];
        let candidates = std::iter::once(&self.announce).chain(self.announce_list.iter().flatten());
        for tracker in candidates {
            if !tracker.is_empty() && !trackers.contains(tracker) {
                trackers.push(tracker.clone());
            }
        }
        trackers
    }

    pub fn magnet_link(&self) -> Result<MagnetLink> {
        let info = self.info();
        Ok(MagnetLink {
            info_hash: self.info_hash()?.hex(),
            trackers: self.trackers(),
            display_name: info.name().to_owned(),
            length: Some(info.total_length()).filter(|&n| n > 0),
            ..Default::default()
        })
    }

    pub fn to_bytes(&self) -> Result<Vec<u8>> {
        let mut root = self.root.clone();
        root.insert("info", self.raw_info.clone());
        Ok(bencode::to_bytes(&root.into())?)
    }
}

impl std::fmt::Debug for Metainfo {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Metainfo")
            .field("announce", &self.announce)
            .field("announce_list", &self.announce_list)
            .field("creation_date", &self.creation_date)
            .field("encoding", &self.encoding)
            .field("comment", &self.comment)
            .field("created_by", &self.created_by)
            .field("url_list", &self.url_list)
            .field("info", &self.info())
            .finish_non_exhaustive()
    }
}

/// Checks of the `info` dictionary that apply in every mode, plus the
/// optional-field shape checks that only [`ParseMode::Strict`] enforces.
fn check_info(info: &Dictionary, mode: ParseMode) -> Result<()> {
    if let Some(Value::Bytes(pieces)) = info.get("pieces") {
        if pieces.len() % SHA1_LEN != 0 {
            return Err(Error::Consistency(pieces.len()));
        }
    }
    if let Some(files) = info.get("files") {
        if files.as_list().is_none() {
            return Err(Error::Structural(format!(
                "info.files is a {}, expected list",
                files.kind()
            )));
        }
    }

    let fields = Fields::new(info, mode, "info");
    fields.unsigned("piece length")?;
    fields.unsigned("length")?;
    fields.string("name")?;
    fields.integer("private")?;
    fields.string("source")?;
    fields.get("pieces", "byte string", Value::as_bytes)?;

    for (i, file) in fields.list("files")?.unwrap_or_default().iter().enumerate() {
        let scope = format!("info.files[{i}]");
        let entry = match file.as_dict() {
            Some(entry) => entry,
            None => {
                fields.report(&scope, "dictionary", file.kind())?;
                continue;
            }
        };
        let fields = Fields::new(entry, mode, &scope);
        fields.unsigned("length")?;
        fields.string("md5sum")?;
        for segment in fields.list("path")?.unwrap_or_default() {
            if segment.as_str().is_none() {
                fields.malformed::<()>("path", "list of UTF-8 strings", segment.kind())?;
            }
        }
    }
    Ok(())
}

/// Typed access to optional dictionary fields under a [`ParseMode`].
struct Fields<'a> {
    dict: &'a Dictionary,
    mode: ParseMode,
    scope: String,
}

impl<'a> Fields<'a> {
    fn new(dict: &'a Dictionary, mode: ParseMode, scope: &str) -> Self {
        Self {
            dict,
            mode,
            scope: scope.to_owned(),
        }
    }

    fn name(&self, key: &str) -> String {
        if self.scope.is_empty() {
            key.to_owned()
        } else {
            format!("{}.{key}", self.scope)
        }
    }

    fn report(&self, field: &str, expected: &str, found: &str) -> Result<()> {
        match self.mode {
            ParseMode::Strict => Err(Error::invalid_field(
                field,
                format!("expected {expected}, found {found}"),
            )),
            ParseMode::Lenient => {
                warn!(field, expected, found, "ignoring malformed field");
                Ok(())
            }
        }
    }

    fn malformed<T>(&self, key: &str, expected: &str, found: &str) -> Result<Option<T>> {
        self.report(&self.name(key), expected, found)?;
        Ok(None)
    }

    fn get<T>(
        &self,
        key: &str,
        expected: &str,
        f: impl FnOnce(&'a Value) -> Option<T>,
    ) -> Result<Option<T>> {
        match self.dict.get(key) {
            None => Ok(None),
            Some(v) => match f(v) {
                Some(t) => Ok(Some(t)),
                None => self.malformed(key, expected, v.kind()),
            },
        }
    }

    fn string(&self, key: &str) -> Result<Option<String>> {
        self.get(key, "UTF-8 string", |v| v.as_str().map(str::to_owned))
    }

    fn integer(&self, key: &str) -> Result<Option<i64>> {
        self.get(key, "integer", Value::as_i64)
    }

    fn unsigned(&self, key: &str) -> Result<Option<u64>> {
        self.get(key, "non-negative integer", |v| non_negative(Some(v)))
    }

    fn list(&self, key: &str) -> Result<Option<&'a [Value]>> {
        self.get(key, "list", Value::as_list)
    }

    fn strings(&self, key: &str, items: &[Value]) -> Result<Vec<String>> {
        let mut out = vec![];
        for item in items {
            match item.as_str() {
                Some(s) => out.push(s.to_owned()),
                None => {
                    self.malformed::<()>(key, "list of UTF-8 strings", item.kind())?;
                }
            }
        }
        Ok(out)
    }

    fn announce_list(&self) -> Result<Vec<Vec<String>>> {
        const KEY: &str = "announce-list";
        let mut tiers = vec![];
        for tier in self.list(KEY)?.unwrap_or_default() {
            match tier.as_list() {
                Some(trackers) => tiers.push(self.strings(KEY, trackers)?),
                None => {
                    self.malformed::<()>(KEY, "list of tiers", tier.kind())?;
                }
            }
        }
        Ok(tiers)
    }

    fn url_list(&self) -> Result<Vec<String>> {
        const KEY: &str = "url-list";
        match self.dict.get(KEY) {
            None => Ok(vec![]),
            Some(Value::List(urls)) => self.strings(KEY, urls),
            Some(v) => match v.as_str() {
                Some(url) => Ok(vec![url.to_owned()]),
                None => Ok(self
                    .malformed(KEY, "string or list of strings", v.kind())?
                    .unwrap_or_default()),
            },
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;

    fn single_file_info() -> Dictionary {
        let mut info = Dictionary::new();
        info.insert("name", "hello.txt");
        info.insert("piece length", 16384);
        info.insert("length", 11);
        info.insert("pieces", Sha1Hash::digest(b"hello world").to_vec());
        info
    }

    fn torrent_with(info: Dictionary) -> Dictionary {
        let mut root = Dictionary::new();
        root.insert("announce", "http://tracker.example/announce");
        root.insert("info", info);
        root
    }

    #[test]
    fn single_file_projection() {
        let torrent = Metainfo::from_raw(torrent_with(single_file_info())).unwrap();
        let info = torrent.info();
        assert_eq!(info.name(), "hello.txt");
        assert_eq!(info.piece_length(), 16384);
        assert_eq!(info.length(), Some(11));
        assert_eq!(info.total_length(), 11);
        assert!(!info.is_multi_file());
        assert!(info.files().is_empty());
        assert!(!info.private());
        assert_eq!(info.source(), None);
        assert_eq!(info.pieces(), vec![Sha1Hash::digest(b"hello world")]);
        assert_eq!(info.piece(0), Some(Sha1Hash::digest(b"hello world")));
        assert_eq!(info.piece(1), None);
        assert_eq!(torrent.announce(), "http://tracker.example/announce");
    }

    #[test]
    fn multi_file_projection() {
        let mut info = single_file_info();
        info.remove("length");
        info.insert("private", 1);
        info.insert("source", "unit");
        let mut with_md5 = FileEntry::new(vec!["dir".into(), "b.txt".into()], 5);
        with_md5.md5sum = Some("d41d8cd98f00b204e9800998ecf8427e".into());
        info.insert(
            "files",
            vec![
                FileEntry::new(vec!["a.txt".into()], 6).to_value().unwrap(),
                Value::from("not a file"),
                with_md5.to_value().unwrap(),
            ],
        );

        let torrent = Metainfo::from_raw(torrent_with(info)).unwrap();
        let info = torrent.info();
        assert!(info.is_multi_file());
        assert!(info.private());
        assert_eq!(info.source(), Some("unit"));
        let files = info.files();
        assert_eq!(files.len(), 2);
        assert_eq!(files[0].path, vec!["a.txt".to_string()]);
        assert_eq!(files[1], with_md5);
        assert_eq!(info.total_length(), 11);
    }

    #[test]
    fn info_required() {
        let mut root = Dictionary::new();
        root.insert("announce", "http://tracker.example/announce");
        assert!(matches!(Metainfo::from_raw(root.clone()), Err(Error::Structural(_))));

        root.insert("info", "not a dictionary");
        assert!(matches!(Metainfo::from_raw(root), Err(Error::Structural(_))));

        assert!(matches!(
            Metainfo::from_bytes(b"li1ee"),
            Err(Error::Structural(_))
        ));
        assert!(matches!(
            Metainfo::from_bytes(b"d4:info"),
            Err(Error::Bencode(_))
        ));
    }

    #[test]
    fn pieces_must_be_whole_digests() {
        let mut info = single_file_info();
        info.insert("pieces", vec![0u8; 41]);
        for mode in [ParseMode::Lenient, ParseMode::Strict] {
            let err = Metainfo::from_raw_with_mode(torrent_with(info.clone()), mode).unwrap_err();
            assert!(matches!(err, Error::Consistency(41)));
        }
    }

    #[test]
    fn files_must_be_a_list() {
        let mut info = single_file_info();
        info.insert("files", 3);
        assert!(matches!(
            Metainfo::from_raw(torrent_with(info)),
            Err(Error::Structural(_))
        ));
    }

    #[test]
    fn lenient_defaults_malformed_optionals() {
        let mut info = single_file_info();
        info.insert("name", 42);
        let mut root = torrent_with(info);
        root.insert("announce", 7);
        root.insert("comment", vec![0xffu8, 0xfe]);
        root.insert("creation date", "yesterday");
        root.insert(
            "announce-list",
            vec![
                Value::from(vec![Value::from("udp://a"), Value::from(1)]),
                Value::from("flat"),
                Value::from(vec![Value::from("udp://b")]),
            ],
        );
        root.insert("url-list", "http://mirror.example/");

        let torrent = Metainfo::from_raw(root.clone()).unwrap();
        assert_eq!(torrent.announce(), "");
        assert_eq!(torrent.comment(), "");
        assert_eq!(torrent.creation_date(), None);
        assert_eq!(torrent.info().name(), "");
        assert_eq!(
            torrent.announce_list(),
            &[vec!["udp://a".to_string()], vec!["udp://b".to_string()]]
        );
        assert_eq!(torrent.url_list(), &["http://mirror.example/".to_string()]);
        assert_eq!(torrent.trackers(), vec!["udp://a", "udp://b"]);

        match Metainfo::from_raw_with_mode(root, ParseMode::Strict) {
            Err(Error::InvalidField { field, .. }) => assert_eq!(field, "info.name"),
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn strict_checks_file_entries() {
        let mut info = single_file_info();
        info.remove("length");
        info.insert(
            "files",
            vec![Value::from(
                [("length", Value::from(-1)), ("path", Value::from(vec![Value::from("x")]))]
                    .into_iter()
                    .collect::<Dictionary>(),
            )],
        );
        assert!(Metainfo::from_raw(torrent_with(info.clone())).is_ok());
        match Metainfo::from_raw_with_mode(torrent_with(info), ParseMode::Strict) {
            Err(Error::InvalidField { field, .. }) => assert_eq!(field, "info.files[0].length"),
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn strict_accepts_well_formed() {
        let mut root = torrent_with(single_file_info());
        root.insert("creation date", 1_700_000_000);
        root.insert("url-list", vec![Value::from("http://a/"), Value::from("http://b/")]);
        let torrent = Metainfo::from_raw_with_mode(root, ParseMode::Strict).unwrap();
        assert_eq!(
            torrent.creation_date().map(|d| d.timestamp()),
            Some(1_700_000_000)
        );
        assert_eq!(torrent.url_list().len(), 2);
    }

    #[test]
    fn info_hash_ignores_insertion_order() {
        let info = single_file_info();
        let mut reversed = Dictionary::new();
        let entries: Vec<_> = info.iter().collect();
        for (k, v) in entries.into_iter().rev() {
            reversed.insert(k.clone(), v.clone());
        }
        let a = Metainfo::from_raw(torrent_with(info)).unwrap();
        let b = Metainfo::from_raw(torrent_with(reversed)).unwrap();
        assert_eq!(a.info_hash().unwrap(), b.info_hash().unwrap());
        assert_eq!(a.info_hash().unwrap(), a.info_hash().unwrap());

        let encoded = bencode::to_bytes(&Value::Dictionary(single_file_info())).unwrap();
        assert_eq!(a.info_hash().unwrap(), Sha1Hash::digest(&encoded));
    }

    #[test]
    fn from_buf_shares_pieces() {
        let encoded = Bytes::from(
            bencode::to_bytes(&torrent_with(single_file_info()).into()).unwrap(),
        );
        let torrent = Metainfo::from_buf(encoded.clone(), ParseMode::Strict).unwrap();
        let pieces = torrent.raw_info().get("pieces").and_then(Value::as_bytes).unwrap();
        let start = pieces.as_ptr() as usize - encoded.as_ptr() as usize;
        assert!(start + SHA1_LEN <= encoded.len());
        assert_eq!(&encoded[start..start + SHA1_LEN], &pieces[..]);
    }

    #[test]
    fn unknown_keys_survive_to_bytes() {
        let mut info = single_file_info();
        info.insert("x-custom", "kept");
        let mut root = torrent_with(info);
        root.insert("zz-extra", 1);

        let torrent = Metainfo::from_raw(root).unwrap();
        let again = Metainfo::from_bytes(torrent.to_bytes().unwrap()).unwrap();
        assert_eq!(again.info().raw().get("x-custom").and_then(Value::as_str), Some("kept"));
        assert_eq!(again.info_hash().unwrap(), torrent.info_hash().unwrap());
        assert!(again.to_bytes().unwrap().windows(8).any(|w| w == b"zz-extra"));
    }

    #[test]
    fn magnet_from_torrent() {
        let mut root = torrent_with(single_file_info());
        root.insert(
            "announce-list",
            vec![Value::from(vec![
                Value::from("http://tracker.example/announce"),
                Value::from("udp://backup.example:80"),
            ])],
        );
        let torrent = Metainfo::from_raw(root).unwrap();
        let magnet = torrent.magnet_link().unwrap();
        assert_eq!(magnet.info_hash, torrent.info_hash().unwrap().hex());
        assert_eq!(magnet.display_name, "hello.txt");
        assert_eq!(magnet.length, Some(11));
        assert_eq!(
            magnet.trackers,
            vec!["http://tracker.example/announce", "udp://backup.example:80"]
        );
    }
}
