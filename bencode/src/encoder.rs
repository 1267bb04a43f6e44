use super::{Result, Value};
use byteorder::WriteBytesExt;
use std::io::Write;

/// Writes values in canonical form: dictionary keys in ascending byte-wise
/// order and integers without leading zeros or a negative zero.
pub struct Encoder<W> {
    w: W,
}

impl<W: Write> Encoder<W> {
    pub fn new(output: W) -> Self {
        Self { w: output }
    }

    pub fn into_inner(self) -> W {
        self.w
    }

    fn write_bytes(&mut self, b: &[u8]) -> Result<()> {
        self.w.write_all(b.len().to_string().as_bytes())?;
        self.w.write_u8(b':')?;
        self.w.write_all(b)?;
        Ok(())
    }

    fn inner_write(&mut self, v: &Value) -> Result<()> {
        match v {
            Value::Bytes(b) => self.write_bytes(b)?,
            Value::Integer(i) => {
                self.w.write_u8(b'i')?;
                self.w.write_all(i.to_string().as_bytes())?;
                self.w.write_u8(b'e')?;
            }
            Value::List(list) => {
                self.w.write_u8(b'l')?;
                for vv in list {
                    self.inner_write(vv)?;
                }
                self.w.write_u8(b'e')?;
            }
            Value::Dictionary(m) => {
                self.w.write_u8(b'd')?;
                for (k, v) in m.sorted() {
                    self.write_bytes(k)?;
                    self.inner_write(v)?;
                }
                self.w.write_u8(b'e')?;
            }
        }
        Ok(())
    }

    pub fn encode(&mut self, v: &Value) -> Result<()> {
        self.inner_write(v)
    }
}
