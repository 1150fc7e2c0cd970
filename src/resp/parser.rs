//! Incremental RESP2/RESP3 reply parser.
//!
//! [`parse`] returns `Ok((reply, consumed))` for one complete frame at the
//! front of the buffer, `Err(Incomplete)` when more bytes are needed and
//! `Err(Protocol(…))` for malformed input. Bulk payloads are zero-copy
//! slices of the input `Bytes`.

use crate::error::{Error, Result};
use crate::resp::types::RawReply;
use bytes::Bytes;
use memchr::memchr;

/// Upper bound on aggregate lengths announced by the server.
const MAX_ELEMENTS: usize = 16 * 1024 * 1024;

/// Upper bound on aggregate nesting.
const MAX_DEPTH: usize = 512;

/// Parse one reply frame from the front of `buf`.
pub fn parse(buf: &Bytes) -> Result<(RawReply, usize)> {
    let mut reader = Reader { buf, pos: 0 };
    let reply = reader.frame(0)?;
    Ok((reply, reader.pos))
}

/// Like [`parse`] for a plain slice (copies into `Bytes` first).
pub fn parse_slice(buf: &[u8]) -> Result<(RawReply, usize)> {
    parse(&Bytes::copy_from_slice(buf))
}

struct Reader<'a> {
    buf: &'a Bytes,
    pos: usize,
}

impl Reader<'_> {
    fn frame(&mut self, depth: usize) -> Result<RawReply> {
        if depth > MAX_DEPTH {
            return Err(Error::Protocol("reply nesting too deep".into()));
        }
        let Some(&marker) = self.buf.get(self.pos) else {
            return Err(Error::Incomplete);
        };
        self.pos += 1;

        match marker {
            b'+' => Ok(RawReply::SimpleString(self.line_string()?)),
            b'-' => Ok(RawReply::Error(self.line_string()?)),
            b':' => Ok(RawReply::Integer(self.line_int()?)),
            b'_' => {
                self.line()?;
                Ok(RawReply::Null)
            }
            b'#' => match self.line()? {
                b"t" => Ok(RawReply::Boolean(true)),
                b"f" => Ok(RawReply::Boolean(false)),
                other => Err(Error::Protocol(format!(
                    "invalid boolean {:?}",
                    String::from_utf8_lossy(other)
                ))),
            },
            b',' => {
                let text = self.line_string()?;
                parse_wire_double(&text).map(RawReply::Double)
            }
            b'(' => {
                let text = self.line_string()?;
                let digits = text.strip_prefix(['+', '-']).unwrap_or(&text);
                if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
                    return Err(Error::Protocol(format!("invalid big number {text:?}")));
                }
                Ok(RawReply::BigNumber(text))
            }
            b'$' => match self.blob()? {
                Some(data) => Ok(RawReply::Bulk(data)),
                None => Ok(RawReply::Null),
            },
            b'!' => {
                let data = self
                    .blob()?
                    .ok_or_else(|| Error::Protocol("nil bulk error".into()))?;
                Ok(RawReply::Error(utf8(&data)?))
            }
            b'=' => {
                let data = self
                    .blob()?
                    .ok_or_else(|| Error::Protocol("nil verbatim string".into()))?;
                if data.len() < 4 || data[3] != b':' {
                    return Err(Error::Protocol("verbatim string missing format prefix".into()));
                }
                Ok(RawReply::Verbatim {
                    format: utf8(&data[..3])?,
                    text: utf8(&data[4..])?,
                })
            }
            b'*' => match self.count()? {
                Some(n) => Ok(RawReply::Array(self.items(n, depth)?)),
                None => Ok(RawReply::Null),
            },
            b'~' => {
                let n = self.required_count("set")?;
                Ok(RawReply::Set(self.items(n, depth)?))
            }
            b'%' => {
                let n = self.required_count("map")?;
                Ok(RawReply::Map(self.pairs(n, depth)?))
            }
            b'>' => {
                let n = self.required_count("push")?;
                if n == 0 {
                    return Err(Error::Protocol("push frame without kind".into()));
                }
                let mut items = self.items(n, depth)?;
                let kind = match items.remove(0) {
                    RawReply::SimpleString(s) => s,
                    RawReply::Bulk(b) => utf8(&b)?,
                    other => {
                        return Err(Error::Protocol(format!(
                            "push kind must be a string, got {}",
                            other.type_name()
                        )))
                    }
                };
                Ok(RawReply::Push { kind, data: items })
            }
            b'|' => {
                // Attributes are metadata about the reply that follows; drop them.
                let n = self.required_count("attribute")?;
                self.pairs(n, depth)?;
                self.frame(depth + 1)
            }
            other => Err(Error::Protocol(format!("unknown RESP type byte 0x{other:02x}"))),
        }
    }

    fn items(&mut self, n: usize, depth: usize) -> Result<Vec<RawReply>> {
        let mut items = Vec::with_capacity(n.min(1024));
        for _ in 0..n {
            items.push(self.frame(depth + 1)?);
        }
        Ok(items)
    }

    fn pairs(&mut self, n: usize, depth: usize) -> Result<Vec<(RawReply, RawReply)>> {
        let mut pairs = Vec::with_capacity(n.min(1024));
        for _ in 0..n {
            let k = self.frame(depth + 1)?;
            let v = self.frame(depth + 1)?;
            pairs.push((k, v));
        }
        Ok(pairs)
    }

    /// Line up to CRLF; advances past the terminator.
    fn line(&mut self) -> Result<&[u8]> {
        let start = self.pos;
        let rest = &self.buf[start..];
        let cr = memchr(b'\r', rest).ok_or(Error::Incomplete)?;
        match rest.get(cr + 1) {
            None => Err(Error::Incomplete),
            Some(b'\n') => {
                self.pos = start + cr + 2;
                Ok(&self.buf[start..start + cr])
            }
            Some(_) => Err(Error::Protocol("expected \\n after \\r".into())),
        }
    }

    fn line_string(&mut self) -> Result<String> {
        let line = self.line()?;
        utf8(line)
    }

    fn line_int(&mut self) -> Result<i64> {
        let line = self.line()?;
        parse_wire_int(line)
    }

    /// Aggregate length; `None` for the RESP2 nil marker `-1`.
    fn count(&mut self) -> Result<Option<usize>> {
        let n = self.line_int()?;
        if n < 0 {
            return Ok(None);
        }
        let n = n as usize;
        if n > MAX_ELEMENTS {
            return Err(Error::Protocol(format!("aggregate length {n} exceeds limit")));
        }
        Ok(Some(n))
    }

    fn required_count(&mut self, what: &str) -> Result<usize> {
        self.count()?
            .ok_or_else(|| Error::Protocol(format!("negative {what} length")))
    }

    /// Length-prefixed payload; `None` for `$-1`.
    fn blob(&mut self) -> Result<Option<Bytes>> {
        let len = self.line_int()?;
        if len < 0 {
            return Ok(None);
        }
        let start = self.pos;
        let end = start + len as usize;
        if self.buf.len() < end + 2 {
            return Err(Error::Incomplete);
        }
        if &self.buf[end..end + 2] != b"\r\n" {
            return Err(Error::Protocol("bulk payload not terminated by CRLF".into()));
        }
        self.pos = end + 2;
        Ok(Some(self.buf.slice(start..end)))
    }
}

fn utf8(bytes: &[u8]) -> Result<String> {
    std::str::from_utf8(bytes)
        .map(str::to_owned)
        .map_err(|e| Error::Protocol(format!("invalid UTF-8: {e}")))
}

/// Signed decimal without allocation; rejects overflow.
fn parse_wire_int(bytes: &[u8]) -> Result<i64> {
    let (negative, digits) = match bytes.first() {
        Some(b'-') => (true, &bytes[1..]),
        Some(b'+') => (false, &bytes[1..]),
        _ => (false, bytes),
    };
    if digits.is_empty() {
        return Err(Error::Protocol("integer has no digits".into()));
    }
    // Accumulate negatively so i64::MIN parses.
    let mut n: i64 = 0;
    for &b in digits {
        if !b.is_ascii_digit() {
            return Err(Error::Protocol(format!("invalid byte in integer: 0x{b:02x}")));
        }
        n = n
            .checked_mul(10)
            .and_then(|n| n.checked_sub(i64::from(b - b'0')))
            .ok_or_else(|| Error::Protocol("integer overflow".into()))?;
    }
    if negative {
        Ok(n)
    } else {
        n.checked_neg()
            .ok_or_else(|| Error::Protocol("integer overflow".into()))
    }
}

/// RESP3 double frame. NaN is representable on the wire; the decoder
/// decides whether a given command may carry it.
fn parse_wire_double(text: &str) -> Result<f64> {
    match text {
        "inf" | "+inf" => Ok(f64::INFINITY),
        "-inf" => Ok(f64::NEG_INFINITY),
        "nan" | "-nan" => Ok(f64::NAN),
        _ => text
            .parse::<f64>()
            .map_err(|e| Error::Protocol(format!("invalid double {text:?}: {e}"))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ok(input: &[u8]) -> RawReply {
        let (reply, consumed) = parse_slice(input).unwrap();
        assert_eq!(consumed, input.len(), "frame length for {input:?}");
        reply
    }

    #[test]
    fn simple_types() {
        assert_eq!(ok(b"+OK\r\n"), RawReply::SimpleString("OK".into()));
        assert_eq!(ok(b"-ERR bad\r\n"), RawReply::Error("ERR bad".into()));
        assert_eq!(ok(b":-42\r\n"), RawReply::Integer(-42));
        assert_eq!(ok(b"_\r\n"), RawReply::Null);
        assert_eq!(ok(b"#t\r\n"), RawReply::Boolean(true));
        assert_eq!(ok(b",1.5\r\n"), RawReply::Double(1.5));
        assert_eq!(ok(b",-inf\r\n"), RawReply::Double(f64::NEG_INFINITY));
        assert_eq!(ok(b"(12345678901234567890\r\n"), RawReply::BigNumber("12345678901234567890".into()));
    }

    #[test]
    fn integer_extremes() {
        assert_eq!(ok(b":-9223372036854775808\r\n"), RawReply::Integer(i64::MIN));
        assert_eq!(ok(b":9223372036854775807\r\n"), RawReply::Integer(i64::MAX));
        assert!(matches!(parse_slice(b":9223372036854775808\r\n"), Err(Error::Protocol(_))));
    }

    #[test]
    fn bulk_and_nil() {
        assert_eq!(ok(b"$5\r\nhello\r\n"), RawReply::Bulk(Bytes::from_static(b"hello")));
        assert_eq!(ok(b"$0\r\n\r\n"), RawReply::Bulk(Bytes::new()));
        assert_eq!(ok(b"$-1\r\n"), RawReply::Null);
        assert_eq!(ok(b"*-1\r\n"), RawReply::Null);
    }

    #[test]
    fn bulk_is_binary_safe() {
        assert_eq!(
            ok(b"$4\r\na\r\nb\r\n"),
            RawReply::Bulk(Bytes::from_static(b"a\r\nb"))
        );
    }

    #[test]
    fn nested_aggregates() {
        let reply = ok(b"*2\r\n$1\r\na\r\n*1\r\n:1\r\n");
        assert_eq!(
            reply,
            RawReply::Array(vec![
                RawReply::from("a"),
                RawReply::Array(vec![RawReply::Integer(1)]),
            ])
        );

        let map = ok(b"%1\r\n+field\r\n:7\r\n");
        assert_eq!(
            map,
            RawReply::Map(vec![(RawReply::SimpleString("field".into()), RawReply::Integer(7))])
        );

        let set = ok(b"~2\r\n:1\r\n:2\r\n");
        assert_eq!(set, RawReply::Set(vec![RawReply::Integer(1), RawReply::Integer(2)]));
    }

    #[test]
    fn resp3_strings() {
        assert_eq!(ok(b"!9\r\nSYNTAX no\r\n"), RawReply::Error("SYNTAX no".into()));
        assert_eq!(
            ok(b"=8\r\ntxt:abcd\r\n"),
            RawReply::Verbatim {
                format: "txt".into(),
                text: "abcd".into()
            }
        );
    }

    #[test]
    fn push_frame() {
        let reply = ok(b">2\r\n+invalidate\r\n*1\r\n$1\r\nk\r\n");
        assert_eq!(
            reply,
            RawReply::Push {
                kind: "invalidate".into(),
                data: vec![RawReply::Array(vec![RawReply::from("k")])],
            }
        );
    }

    #[test]
    fn attributes_are_skipped() {
        let reply = ok(b"|1\r\n+ttl\r\n:10\r\n:5\r\n");
        assert_eq!(reply, RawReply::Integer(5));
    }

    #[test]
    fn incomplete_frames() {
        for partial in [&b""[..], b"+OK", b"+OK\r", b"$5\r\nhel", b"*2\r\n:1\r\n", b"%1\r\n+a\r\n"] {
            assert!(
                matches!(parse_slice(partial), Err(Error::Incomplete)),
                "{partial:?} should be incomplete"
            );
        }
    }

    #[test]
    fn malformed_frames() {
        assert!(matches!(parse_slice(b"?x\r\n"), Err(Error::Protocol(_))));
        assert!(matches!(parse_slice(b"+OK\rX"), Err(Error::Protocol(_))));
        assert!(matches!(parse_slice(b"$3\r\nabcd\r\n"), Err(Error::Protocol(_))));
        assert!(matches!(parse_slice(b":12a\r\n"), Err(Error::Protocol(_))));
        assert!(matches!(parse_slice(b"#x\r\n"), Err(Error::Protocol(_))));
        assert!(matches!(parse_slice(b"~-1\r\n"), Err(Error::Protocol(_))));
    }

    #[test]
    fn consumed_stops_at_frame_end() {
        let (reply, consumed) = parse_slice(b"+OK\r\n:1\r\n").unwrap();
        assert_eq!(reply, RawReply::SimpleString("OK".into()));
        assert_eq!(consumed, 5);
    }

    #[test]
    fn depth_limit() {
        let mut input = Vec::new();
        for _ in 0..(MAX_DEPTH + 2) {
            input.extend_from_slice(b"*1\r\n");
        }
        input.extend_from_slice(b":1\r\n");
        assert!(matches!(parse_slice(&input), Err(Error::Protocol(_))));
    }
}
