//! Bencode value codec.
//!
//! Decoding is tolerant of dictionary key order; encoding is canonical, so
//! `to_bytes(&from_bytes(x)?)` always yields sorted dictionaries.

mod decoder;
mod encoder;
mod error;
mod value;

pub use decoder::{Decoder, MAX_DEPTH};
pub use encoder::Encoder;
pub use error::{Error, Result};
pub use value::{Dictionary, Value};

use bytes::Bytes;
use std::io::{self, Read};

/// Decodes a single value from `input`, copying it once into a shared buffer.
pub fn from_bytes<B>(input: &B) -> Result<Value>
where
    B: AsRef<[u8]> + ?Sized,
{
    Decoder::new(Bytes::copy_from_slice(input.as_ref())).decode()
}

/// Decodes without copying; byte strings in the result borrow `input`.
pub fn from_buf(input: Bytes) -> Result<Value> {
    Decoder::new(input).decode()
}

pub fn from_reader<R: Read>(mut input: R) -> Result<Value> {
    let mut buf = vec![];
    input.read_to_end(&mut buf)?;
    from_buf(buf.into())
}

pub fn to_writer<W>(w: &mut W, value: &Value) -> Result<()>
where
    W: io::Write,
{
    let mut encoder = Encoder::new(w);
    encoder.encode(value)?;
    Ok(())
}

pub fn to_bytes(value: &Value) -> Result<Vec<u8>> {
    let mut writer = vec![];
    to_writer(&mut writer, value)?;
    Ok(writer)
}
