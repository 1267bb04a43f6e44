use crate::{Error, Result};
use serde::{Deserialize, Serialize};

/// Piece size used when a creation request leaves it unset.
pub const DEFAULT_PIECE_SIZE_KIB: usize = 32;

/// A request to create a torrent. Callers validate it; this type only
/// carries data.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CreateConfig {
    pub announce: String,
    pub announce_list: Vec<Vec<String>>,
    pub encoding: String,
    pub comment: String,
    pub created_by: String,
    pub url_list: Vec<String>,
    /// Piece size in KiB; 0 selects [`DEFAULT_PIECE_SIZE_KIB`].
    pub piece_size_kib: usize,
    /// Accepted for compatibility. Built torrents never carry `md5sum`.
    pub md5: bool,
    pub private: bool,
    /// Explicit torrent name. Without it only single-file torrents get a
    /// `name`, taken from the file itself.
    pub name: Option<String>,
}

impl CreateConfig {
    pub fn from_json_str(s: &str) -> Result<Self> {
        let value = s.parse::<serde_json::Value>()?;
        let mut config = Self::default();
        config.merge_json(&value)?;
        Ok(config)
    }

    /// Overlays the keys present in `val` onto this config.
    pub fn merge_json(&mut self, val: &serde_json::Value) -> Result<()> {
        let table = val
            .as_object()
            .ok_or_else(|| Error::invalid_field("config", "expected a JSON object"))?;

        for (key, val) in table {
            match key.as_str() {
                "announce" => self.announce = json_string(key, val)?,
                "announce_list" => {
                    self.announce_list = json_array(key, val)?
                        .iter()
                        .map(|tier| json_strings(key, tier))
                        .collect::<Result<_>>()?
                }
                "encoding" => self.encoding = json_string(key, val)?,
                "comment" => self.comment = json_string(key, val)?,
                "created_by" => self.created_by = json_string(key, val)?,
                "url_list" => self.url_list = json_strings(key, val)?,
                "piece_size_kib" => {
                    let n = val
                        .as_u64()
                        .ok_or_else(|| Error::invalid_field(key, "expected unsigned integer"))?;
                    self.piece_size_kib = usize::try_from(n)
                        .map_err(|_| Error::invalid_field(key, "out of range"))?;
                }
                "md5" => self.md5 = json_bool(key, val)?,
                "private" => self.private = json_bool(key, val)?,
                "name" => self.name = Some(json_string(key, val)?),
                _ => {}
            }
        }
        Ok(())
    }

    /// Piece size in bytes.
    pub fn piece_size(&self) -> usize {
        let kib = match self.piece_size_kib {
            0 => DEFAULT_PIECE_SIZE_KIB,
            n => n,
        };
        kib.saturating_mul(1024)
    }
}

fn json_string(key: &str, val: &serde_json::Value) -> Result<String> {
    val.as_str()
        .map(str::to_owned)
        .ok_or_else(|| Error::invalid_field(key, "expected string"))
}

fn json_bool(key: &str, val: &serde_json::Value) -> Result<bool> {
    val.as_bool()
        .ok_or_else(|| Error::invalid_field(key, "expected boolean"))
}

fn json_array<'a>(key: &str, val: &'a serde_json::Value) -> Result<&'a Vec<serde_json::Value>> {
    val.as_array()
        .ok_or_else(|| Error::invalid_field(key, "expected array"))
}

fn json_strings(key: &str, val: &serde_json::Value) -> Result<Vec<String>> {
    json_array(key, val)?
        .iter()
        .map(|v| json_string(key, v))
        .collect()
}

/// How metainfo loading treats optional fields that are present but have
/// the wrong shape.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ParseMode {
    /// Substitute the zero value and keep going.
    #[default]
    Lenient,
    /// Fail with [`Error::InvalidField`].
    Strict,
}
