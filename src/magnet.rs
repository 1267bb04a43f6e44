use crate::torrent::Sha1Hash;
use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use url::form_urlencoded;

const PREFIX: &str = "magnet:?";
const BTIH: &str = "urn:btih:";

/// A BitTorrent magnet link.
///
/// Every field is optional on the wire, so a link parsed from `magnet:?`
/// is simply [`MagnetLink::default`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MagnetLink {
    /// Info-hash text after `urn:btih:`, kept exactly as given.
    pub info_hash: String,
    pub trackers: Vec<String>,
    pub display_name: String,
    pub length: Option<u64>,
    pub keywords: Vec<String>,
    pub acceptable_sources: Vec<String>,
    pub exact_sources: Vec<String>,
    pub manifest_topics: Vec<String>,
}

impl MagnetLink {
    pub fn parse(uri: &str) -> Result<Self> {
        let query = uri.strip_prefix(PREFIX).ok_or(Error::MagnetPrefix)?;

        let mut magnet = Self::default();
        let mut seen_xt = false;
        let mut seen_dn = false;
        let mut seen_xl = false;
        for (key, value) in form_urlencoded::parse(query.as_bytes()) {
            match key.as_ref() {
                "xt" if !seen_xt => {
                    seen_xt = true;
                    magnet.info_hash = value
                        .strip_prefix(BTIH)
                        .ok_or_else(|| Error::MagnetScheme(value.to_string()))?
                        .to_owned();
                }
                "dn" if !seen_dn => {
                    seen_dn = true;
                    magnet.display_name = value.into_owned();
                }
                "tr" => magnet.trackers.push(value.into_owned()),
                "xl" if !seen_xl => {
                    seen_xl = true;
                    let n = value.parse::<u64>().map_err(|_| Error::MagnetParse {
                        key: "xl",
                        value: value.to_string(),
                    })?;
                    magnet.length = Some(n);
                }
                "kt" => magnet.keywords.push(value.into_owned()),
                "as" => magnet.acceptable_sources.push(value.into_owned()),
                "xs" => magnet.exact_sources.push(value.into_owned()),
                "mt" => magnet.manifest_topics.push(value.into_owned()),
                _ => {}
            }
        }
        Ok(magnet)
    }

    /// Encodes the link. Only the first keyword is written.
    pub fn to_uri(&self) -> String {
        let mut uri = format!("{}xt={}", PREFIX, BTIH);
        uri.extend(form_urlencoded::byte_serialize(self.info_hash.as_bytes()));
        let mut push = |key: &str, value: &str| {
            uri.push('&');
            uri.push_str(key);
            uri.push('=');
            uri.extend(form_urlencoded::byte_serialize(value.as_bytes()));
        };

        if !self.display_name.is_empty() {
            push("dn", &self.display_name);
        }
        for tracker in &self.trackers {
            push("tr", tracker);
        }
        if let Some(n) = self.length.filter(|&n| n > 0) {
            push("xl", &n.to_string());
        }
        if let Some(keyword) = self.keywords.first() {
            push("kt", keyword);
        }
        for source in &self.acceptable_sources {
            push("as", source);
        }
        for source in &self.exact_sources {
            push("xs", source);
        }
        for topic in &self.manifest_topics {
            push("mt", topic);
        }
        uri
    }

    /// Decodes a hex `info_hash`.
    pub fn sha1_info_hash(&self) -> Result<Sha1Hash> {
        Sha1Hash::from_hex(&self.info_hash)
    }
}

impl FromStr for MagnetLink {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}

impl fmt::Display for MagnetLink {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_uri())
    }
}
