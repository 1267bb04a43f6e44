use super::{Dictionary, Error, Result, Value};
use bytes::Bytes;

/// Containers nested deeper than this are rejected instead of recursing.
pub const MAX_DEPTH: usize = 256;

/// Decodes bencode out of an in-memory buffer.
///
/// Byte strings in the result are slices of the input buffer, so decoding a
/// `Bytes` never copies string payloads. Dictionary keys are accepted in any
/// order and keep the order they appeared in.
pub struct Decoder {
    input: Bytes,
    pos: usize,
}

impl Decoder {
    pub fn new(input: impl Into<Bytes>) -> Self {
        Self {
            input: input.into(),
            pos: 0,
        }
    }

    /// Decodes exactly one value; anything after it is an error.
    pub fn decode(mut self) -> Result<Value> {
        let value = self.next_value(0)?;
        let remain = self.input.len() - self.pos;
        if remain != 0 {
            return Err(Error::TrailingData(remain));
        }
        Ok(value)
    }

    /// Decodes one value and hands back whatever follows it.
    pub fn decode_partial(mut self) -> Result<(Value, Bytes)> {
        let value = self.next_value(0)?;
        let remain = self.input.slice(self.pos..);
        Ok((value, remain))
    }

    fn next_value(&mut self, depth: usize) -> Result<Value> {
        if depth > MAX_DEPTH {
            return Err(Error::NestingTooDeep(MAX_DEPTH));
        }
        let v = match self.peek_byte().ok_or(Error::UnexpectedEof)? {
            b'i' => Value::Integer(self.read_integer()?),
            b'l' => Value::List(self.read_list(depth)?),
            b'd' => Value::Dictionary(self.read_dictionary(depth)?),
            b'0'..=b'9' => Value::Bytes(self.read_bytes()?),
            b => return Err(Error::InvalidType(b as char)),
        };
        Ok(v)
    }

    fn read_dictionary(&mut self, depth: usize) -> Result<Dictionary> {
        self.consume_byte(b'd')?;

        let mut m = Dictionary::new();
        loop {
            match self.peek_byte() {
                None => return Err(Error::UnterminatedContainer("dictionary")),
                Some(b'e') => {
                    self.pos += 1;
                    break;
                }
                Some(b'0'..=b'9') => {
                    let key = self.read_bytes()?;
                    if self.peek_byte().is_none() {
                        return Err(Error::UnterminatedContainer("dictionary"));
                    }
                    let value = self.next_value(depth + 1)?;
                    m.insert(key, value);
                }
                Some(_) => return Err(Error::InvalidKey),
            }
        }
        Ok(m)
    }

    fn read_list(&mut self, depth: usize) -> Result<Vec<Value>> {
        self.consume_byte(b'l')?;

        let mut v = vec![];
        loop {
            match self.peek_byte() {
                None => return Err(Error::UnterminatedContainer("list")),
                Some(b'e') => {
                    self.pos += 1;
                    break;
                }
                Some(_) => v.push(self.next_value(depth + 1)?),
            }
        }
        Ok(v)
    }

    fn read_bytes(&mut self) -> Result<Bytes> {
        let len = self.read_length()?;
        let end = self
            .pos
            .checked_add(len)
            .ok_or_else(|| Error::InvalidLength(len.to_string()))?;
        if end > self.input.len() {
            return Err(Error::UnexpectedEof);
        }
        let b = self.input.slice(self.pos..end);
        self.pos = end;
        Ok(b)
    }

    fn read_integer(&mut self) -> Result<i64> {
        self.consume_byte(b'i')?;

        let digits = self.take_until(b'e')?;
        let s = String::from_utf8_lossy(&digits);
        let unsigned = s.strip_prefix('-').unwrap_or(&s);
        let well_formed = !unsigned.is_empty()
            && unsigned.bytes().all(|b| b.is_ascii_digit())
            && !(unsigned.starts_with('0') && (unsigned.len() > 1 || s.starts_with('-')));
        if !well_formed {
            return Err(Error::InvalidInteger(s.into_owned()));
        }
        s.parse::<i64>()
            .map_err(|_| Error::InvalidInteger(s.into_owned()))
    }

    fn read_length(&mut self) -> Result<usize> {
        let digits = self.take_until(b':')?;
        let s = String::from_utf8_lossy(&digits);
        if s.is_empty() || !s.bytes().all(|b| b.is_ascii_digit()) {
            return Err(Error::InvalidLength(s.into_owned()));
        }
        s.parse::<usize>()
            .map_err(|_| Error::InvalidLength(s.into_owned()))
    }

    /// Returns the bytes before `stop` and moves past `stop`.
    fn take_until(&mut self, stop: u8) -> Result<Bytes> {
        let rest = &self.input[self.pos..];
        let offset = rest
            .iter()
            .position(|&b| b == stop)
            .ok_or(Error::UnexpectedEof)?;
        let taken = self.input.slice(self.pos..self.pos + offset);
        self.pos += offset + 1;
        Ok(taken)
    }

    fn consume_byte(&mut self, expected: u8) -> Result<()> {
        match self.peek_byte() {
            Some(actual) if actual == expected => {
                self.pos += 1;
                Ok(())
            }
            Some(b) => Err(Error::InvalidType(b as char)),
            None => Err(Error::UnexpectedEof),
        }
    }

    fn peek_byte(&self) -> Option<u8> {
        self.input.get(self.pos).copied()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn decode(s: &'static [u8]) -> Result<Value> {
        Decoder::new(s).decode()
    }

    #[test]
    fn scalars() {
        assert_eq!(decode(b"i42e").unwrap(), Value::Integer(42));
        assert_eq!(decode(b"i-42e").unwrap(), Value::Integer(-42));
        assert_eq!(decode(b"i0e").unwrap(), Value::Integer(0));
        assert_eq!(decode(b"4:spam").unwrap(), Value::from("spam"));
        assert_eq!(decode(b"0:").unwrap(), Value::from(""));
    }

    #[test]
    fn malformed_integers() {
        for s in [
            b"i-0e".as_slice(),
            b"i03e",
            b"ie",
            b"i-e",
            b"i1x2e",
            b"i99999999999999999999e",
        ] {
            assert!(
                matches!(Decoder::new(s).decode(), Err(Error::InvalidInteger(_))),
                "{}",
                String::from_utf8_lossy(s)
            );
        }
    }

    #[test]
    fn error_kinds() {
        assert!(matches!(decode(b""), Err(Error::UnexpectedEof)));
        assert!(matches!(decode(b"i42"), Err(Error::UnexpectedEof)));
        assert!(matches!(decode(b"10:short"), Err(Error::UnexpectedEof)));
        assert!(matches!(decode(b"4spam"), Err(Error::UnexpectedEof)));
        assert!(matches!(decode(b"3x:abc"), Err(Error::InvalidLength(_))));
        assert!(matches!(decode(b"x"), Err(Error::InvalidType('x'))));
        assert!(matches!(
            decode(b"l4:spam"),
            Err(Error::UnterminatedContainer("list"))
        ));
        assert!(matches!(
            decode(b"d3:cow3:moo"),
            Err(Error::UnterminatedContainer("dictionary"))
        ));
        assert!(matches!(
            decode(b"d3:cow"),
            Err(Error::UnterminatedContainer("dictionary"))
        ));
        assert!(matches!(decode(b"di1ei2ee"), Err(Error::InvalidKey)));
        assert!(matches!(decode(b"i42eextra"), Err(Error::TrailingData(5))));
    }

    #[test]
    fn unsorted_keys_keep_order() {
        let v = decode(b"d4:spam4:eggs3:cow3:mooe").unwrap();
        let dict = v.as_dict().unwrap();
        let keys: Vec<_> = dict.keys().map(|k| k.as_ref()).collect();
        assert_eq!(keys, vec![b"spam".as_slice(), b"cow".as_slice()]);
        assert_eq!(dict.get("cow").and_then(Value::as_str), Some("moo"));
    }

    #[test]
    fn many_keys() {
        let n = 60_000;
        let mut s = b"d".to_vec();
        for i in 0..n {
            s.extend(format!("8:{i:08}i{i}e").as_bytes());
        }
        s.push(b'e');

        let v = Decoder::new(s).decode().unwrap();
        let dict = v.as_dict().unwrap();
        assert_eq!(dict.len(), n);
        assert_eq!(dict.get("00000000").and_then(Value::as_i64), Some(0));
        assert_eq!(dict.get("00059999").and_then(Value::as_i64), Some(59999));
        assert_eq!(dict.keys().last().map(|k| k.as_ref()), Some(b"00059999".as_slice()));
    }

    #[test]
    fn nested() {
        let v = decode(b"d4:listl4:spami42eee").unwrap();
        let list = v.dict_get("list").and_then(Value::as_list).unwrap();
        assert_eq!(list, &[Value::from("spam"), Value::Integer(42)]);
    }

    #[test]
    fn too_deep() {
        let mut s = vec![b'l'; MAX_DEPTH + 2];
        s.extend(vec![b'e'; MAX_DEPTH + 2]);
        assert!(matches!(
            Decoder::new(s).decode(),
            Err(Error::NestingTooDeep(_))
        ));
    }

    #[test]
    fn byte_strings_share_input() {
        let input = Bytes::from_static(b"l3:abc3:defe");
        let v = Decoder::new(input.clone()).decode().unwrap();
        let first = v.list_get(0).and_then(Value::as_bytes).unwrap();
        assert_eq!(first.as_ptr(), input[3..].as_ptr());
    }

    #[test]
    fn decode_partial_no_remain() {
        let s = b"d1:rd2:id20:abcdefghij01234567895:token8:aoeusnth6:valuesl6:axje.u6:idhtnmee1:t2:aa1:y1:re".as_slice();
        let (v, remain) = Decoder::new(s).decode_partial().unwrap();
        assert_eq!(remain.len(), 0);
        assert_eq!(v.dict_get("y").and_then(Value::as_str), Some("r"));
    }

    #[test]
    fn decode_partial_with_remain() {
        let s = b"d8:msg_typei1e5:piecei0e10:total_sizei34256eexxxxxxxx".as_slice();
        let (v, remain) = Decoder::new(s).decode_partial().unwrap();
        assert_eq!(&remain[..], b"xxxxxxxx");
        assert_eq!(v.dict_get("total_size").and_then(Value::as_i64), Some(34256));
    }
}
