use bytes::Bytes;
use indexmap::IndexMap;

use super::{Error, Result};

/// A decoded bencode value.
///
/// Byte strings are kept as [`Bytes`] so large payloads such as the `pieces`
/// field are shared with the decode buffer rather than copied.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Value {
    Bytes(Bytes),
    Integer(i64),
    List(Vec<Value>),
    Dictionary(Dictionary),
}

impl Value {
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::Bytes(b) => std::str::from_utf8(b).ok(),
            _ => None,
        }
    }

    pub fn as_bytes(&self) -> Option<&Bytes> {
        match self {
            Self::Bytes(b) => Some(b),
            _ => None,
        }
    }

    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Self::Integer(n) => Some(*n),
            _ => None,
        }
    }

    pub fn as_list(&self) -> Option<&[Value]> {
        match self {
            Self::List(list) => Some(list),
            _ => None,
        }
    }

    pub fn as_dict(&self) -> Option<&Dictionary> {
        match self {
            Self::Dictionary(m) => Some(m),
            _ => None,
        }
    }

    pub fn into_dict(self) -> Option<Dictionary> {
        match self {
            Self::Dictionary(m) => Some(m),
            _ => None,
        }
    }

    pub fn list_get(&self, index: usize) -> Option<&Value> {
        self.as_list().and_then(|list| list.get(index))
    }

    pub fn dict_get(&self, key: impl AsRef<[u8]>) -> Option<&Value> {
        self.as_dict().and_then(|dict| dict.get(key))
    }

    /// Name of the variant, used when reporting a value of the wrong shape.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Bytes(_) => "byte string",
            Self::Integer(_) => "integer",
            Self::List(_) => "list",
            Self::Dictionary(_) => "dictionary",
        }
    }
}

/// Dictionary with byte-string keys.
///
/// Entries keep the order they were inserted (or decoded) in. The encoder
/// ignores that order and always writes keys in ascending byte-wise order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Dictionary {
    entries: IndexMap<Bytes, Value>,
}

impl Dictionary {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn get(&self, key: impl AsRef<[u8]>) -> Option<&Value> {
        self.entries.get(key.as_ref())
    }

    pub fn contains_key(&self, key: impl AsRef<[u8]>) -> bool {
        self.entries.contains_key(key.as_ref())
    }

    /// Inserts `value` under `key`. A repeated key keeps its original
    /// position and the previous value is returned.
    pub fn insert(&mut self, key: impl Into<Bytes>, value: impl Into<Value>) -> Option<Value> {
        self.entries.insert(key.into(), value.into())
    }

    pub fn remove(&mut self, key: impl AsRef<[u8]>) -> Option<Value> {
        self.entries.shift_remove(key.as_ref())
    }

    /// Entries in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = (&Bytes, &Value)> {
        self.entries.iter()
    }

    pub fn keys(&self) -> impl Iterator<Item = &Bytes> {
        self.entries.keys()
    }

    /// Entries in ascending byte-wise key order.
    pub fn sorted(&self) -> Vec<(&Bytes, &Value)> {
        let mut entries: Vec<_> = self.iter().collect();
        entries.sort_by(|a, b| a.0.as_ref().cmp(b.0.as_ref()));
        entries
    }
}

impl<K, V> FromIterator<(K, V)> for Dictionary
where
    K: Into<Bytes>,
    V: Into<Value>,
{
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut dict = Dictionary::new();
        for (k, v) in iter {
            dict.insert(k, v);
        }
        dict
    }
}

impl IntoIterator for Dictionary {
    type Item = (Bytes, Value);
    type IntoIter = indexmap::map::IntoIter<Bytes, Value>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.into_iter()
    }
}

impl From<&'static str> for Value {
    fn from(s: &'static str) -> Self {
        Self::Bytes(Bytes::from_static(s.as_bytes()))
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Self::Bytes(Bytes::from(s))
    }
}

impl From<&String> for Value {
    fn from(s: &String) -> Self {
        s.clone().into()
    }
}

impl From<Vec<u8>> for Value {
    fn from(value: Vec<u8>) -> Self {
        Self::Bytes(Bytes::from(value))
    }
}

impl From<&[u8]> for Value {
    fn from(b: &[u8]) -> Self {
        Self::Bytes(Bytes::copy_from_slice(b))
    }
}

impl From<Bytes> for Value {
    fn from(b: Bytes) -> Self {
        Self::Bytes(b)
    }
}

impl From<Vec<Value>> for Value {
    fn from(b: Vec<Value>) -> Self {
        Self::List(b)
    }
}

impl From<Dictionary> for Value {
    fn from(d: Dictionary) -> Self {
        Self::Dictionary(d)
    }
}

macro_rules! impl_number {
    ($t:ty) => {
        impl From<$t> for Value {
            fn from(n: $t) -> Self {
                Self::Integer(n as i64)
            }
        }
    };
    ($($t:ty),+ $(,)?) => {
        $(
            impl_number!($t);
        )+
    }
}

impl_number!(i8, i16, i32, i64, isize);
impl_number!(u8, u16, u32);
impl_number!(bool);

macro_rules! impl_try_number {
    ($($t:ty),+ $(,)?) => {
        $(
            impl TryFrom<$t> for Value {
                type Error = Error;
                fn try_from(n: $t) -> Result<Self> {
                    i64::try_from(n)
                        .map(Self::Integer)
                        .map_err(|_| Error::IntegerOverflow(n.to_string()))
                }
            }
        )+
    }
}

impl_try_number!(u64, usize);
