use crate::{Error, Result};
use serde::{de, ser};
use std::{
    convert,
    fmt::{Debug, Display},
    ops,
};

pub const SHA1_LEN: usize = 20;

/// A 20-byte SHA-1 digest: a piece hash or an info-hash.
#[derive(Default, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Sha1Hash([u8; SHA1_LEN]);

impl Sha1Hash {
    pub const fn zero() -> Self {
        Self([0u8; SHA1_LEN])
    }

    pub fn is_zero(&self) -> bool {
        self == &Self::zero()
    }

    pub fn digest(data: &[u8]) -> Self {
        let d = ring::digest::digest(&ring::digest::SHA1_FOR_LEGACY_USE_ONLY, data);
        let mut id = [0u8; SHA1_LEN];
        id.copy_from_slice(d.as_ref());
        Self(id)
    }

    pub fn hex(&self) -> String {
        hex::encode(self)
    }

    pub fn from_hex(s: impl AsRef<str>) -> Result<Self> {
        let data = hex::decode(s.as_ref()).map_err(|err| Error::InvalidInput(err.to_string()))?;
        Self::from_slice(&data)
    }

    pub fn from_slice(slice: &[u8]) -> Result<Self> {
        let id: [u8; SHA1_LEN] = slice.try_into().map_err(|_| {
            Error::InvalidInput(format!("expected {SHA1_LEN} bytes, got {}", slice.len()))
        })?;
        Ok(Self(id))
    }
}

impl Debug for Sha1Hash {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        Display::fmt(&self, f)
    }
}

impl Display for Sha1Hash {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", hex::encode(self))
    }
}

impl From<[u8; SHA1_LEN]> for Sha1Hash {
    fn from(value: [u8; SHA1_LEN]) -> Self {
        Self(value)
    }
}

impl TryFrom<&[u8]> for Sha1Hash {
    type Error = Error;
    fn try_from(b: &[u8]) -> std::result::Result<Self, Self::Error> {
        Sha1Hash::from_slice(b)
    }
}

impl ops::Deref for Sha1Hash {
    type Target = [u8; SHA1_LEN];
    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl convert::AsRef<[u8]> for Sha1Hash {
    fn as_ref(&self) -> &[u8] {
        &self.0
    }
}

impl<'de> de::Deserialize<'de> for Sha1Hash {
    fn deserialize<D>(deserializer: D) -> std::result::Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        struct HexVisitor;
        impl<'de> de::Visitor<'de> for HexVisitor {
            type Value = Sha1Hash;
            fn expecting(&self, formatter: &mut std::fmt::Formatter) -> std::fmt::Result {
                write!(formatter, "a 40 character hex string")
            }

            fn visit_str<E>(self, v: &str) -> std::result::Result<Self::Value, E>
            where
                E: de::Error,
            {
                Sha1Hash::from_hex(v).map_err(|e| de::Error::custom(e.to_string()))
            }
        }

        deserializer.deserialize_str(HexVisitor)
    }
}

impl ser::Serialize for Sha1Hash {
    fn serialize<S>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.serialize_str(&self.hex())
    }
}
