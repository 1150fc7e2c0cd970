//! Result decoding.
//!
//! [`FromReply`] turns one [`RawReply`] into the type the caller asked for.
//! The requested type picks the decode path; a reply whose shape does not
//! fit is a [`Error::Decode`], never a silent coercion. Shapes that depend on
//! the command rather than the target type (flat score pairs, scan pages,
//! `GEOSEARCH … WITH*`) live in [`decode`].

pub mod decode;
mod types;

pub use types::{
    GeoCoordinate, GeoSearchResult, PendingEntry, PendingSummary, ScanResult, Status, StreamEntry,
    StreamId, StreamReadReply, Tuple,
};

use crate::error::{Error, Result};
use crate::resp::RawReply;
use bytes::Bytes;
use std::collections::HashMap;
use std::hash::Hash;

/// Decode a reply into `Self`.
pub trait FromReply: Sized {
    fn from_reply(reply: RawReply) -> Result<Self>;
}

/// Surface a server error reply as an error, pass anything else through.
pub fn check(reply: RawReply) -> Result<RawReply> {
    match reply {
        RawReply::Error(msg) => Err(Error::server(msg)),
        other => Ok(other),
    }
}

impl FromReply for RawReply {
    fn from_reply(reply: RawReply) -> Result<Self> {
        check(reply)
    }
}

/// Accepts any non-error reply.
impl FromReply for () {
    fn from_reply(reply: RawReply) -> Result<Self> {
        check(reply).map(drop)
    }
}

impl FromReply for String {
    fn from_reply(reply: RawReply) -> Result<Self> {
        match check(reply)? {
            RawReply::Bulk(b) => String::from_utf8(b.to_vec())
                .map_err(|e| Error::Decode(format!("bulk string is not UTF-8: {e}"))),
            RawReply::SimpleString(s) | RawReply::BigNumber(s) => Ok(s),
            RawReply::Verbatim { text, .. } => Ok(text),
            other => Err(Error::decode("string", &other)),
        }
    }
}

impl FromReply for Bytes {
    fn from_reply(reply: RawReply) -> Result<Self> {
        match check(reply)? {
            RawReply::Bulk(b) => Ok(b),
            RawReply::SimpleString(s) => Ok(Bytes::from(s)),
            RawReply::Verbatim { text, .. } => Ok(Bytes::from(text)),
            other => Err(Error::decode("binary string", &other)),
        }
    }
}

impl FromReply for Vec<u8> {
    fn from_reply(reply: RawReply) -> Result<Self> {
        Bytes::from_reply(reply).map(|b| b.to_vec())
    }
}

/// Integers arrive as `:n`, or as decimal text in a bulk reply (`HGET` of a
/// counter, `CONFIG GET`). Anything else is a shape error.
impl FromReply for i64 {
    fn from_reply(reply: RawReply) -> Result<Self> {
        match check(reply)? {
            RawReply::Integer(i) => Ok(i),
            RawReply::Bulk(b) => parse_int_text(&b),
            RawReply::SimpleString(s) | RawReply::BigNumber(s) => parse_int_text(s.as_bytes()),
            other => Err(Error::decode("integer", &other)),
        }
    }
}

fn parse_int_text(text: &[u8]) -> Result<i64> {
    let s = std::str::from_utf8(text)
        .map_err(|_| Error::Decode("integer text is not UTF-8".into()))?;
    s.parse::<i64>().map_err(|e| match e.kind() {
        std::num::IntErrorKind::PosOverflow | std::num::IntErrorKind::NegOverflow => {
            Error::NumericRange(format!("{s} does not fit in i64"))
        }
        _ => Error::Decode(format!("expected integer, got {s:?}")),
    })
}

macro_rules! narrow_int {
    ($($t:ty),*) => {$(
        impl FromReply for $t {
            fn from_reply(reply: RawReply) -> Result<Self> {
                let wide = i64::from_reply(reply)?;
                <$t>::try_from(wide).map_err(|_| {
                    Error::NumericRange(format!("{wide} does not fit in {}", stringify!($t)))
                })
            }
        }
    )*};
}

// No `u8`: `Vec<u8>` decodes as binary, not as a list of integers.
narrow_int!(i8, i16, i32, isize, u16, u32, usize);

impl FromReply for u64 {
    fn from_reply(reply: RawReply) -> Result<Self> {
        match check(reply)? {
            RawReply::Integer(i) => u64::try_from(i)
                .map_err(|_| Error::NumericRange(format!("{i} does not fit in u64"))),
            RawReply::Bulk(b) => parse_uint_text(&b),
            RawReply::SimpleString(s) | RawReply::BigNumber(s) => parse_uint_text(s.as_bytes()),
            other => Err(Error::decode("unsigned integer", &other)),
        }
    }
}

fn parse_uint_text(text: &[u8]) -> Result<u64> {
    let s = std::str::from_utf8(text)
        .map_err(|_| Error::Decode("integer text is not UTF-8".into()))?;
    s.parse::<u64>().map_err(|e| match e.kind() {
        std::num::IntErrorKind::PosOverflow | std::num::IntErrorKind::NegOverflow => {
            Error::NumericRange(format!("{s} does not fit in u64"))
        }
        _ => Error::Decode(format!("expected unsigned integer, got {s:?}")),
    })
}

impl FromReply for f64 {
    fn from_reply(reply: RawReply) -> Result<Self> {
        match check(reply)? {
            RawReply::Double(d) if d.is_nan() => Err(Error::Decode("nan is not a valid score".into())),
            RawReply::Double(d) => Ok(d),
            RawReply::Bulk(b) => decode::parse_double(&b),
            RawReply::SimpleString(s) => decode::parse_double(s.as_bytes()),
            RawReply::Integer(i) => Ok(i as f64),
            other => Err(Error::decode("double", &other)),
        }
    }
}

/// `:1` / `:0` or RESP3 booleans.
impl FromReply for bool {
    fn from_reply(reply: RawReply) -> Result<Self> {
        match check(reply)? {
            RawReply::Boolean(b) => Ok(b),
            RawReply::Integer(1) => Ok(true),
            RawReply::Integer(0) => Ok(false),
            RawReply::Integer(i) => Err(Error::Decode(format!("expected 0 or 1, got {i}"))),
            other => Err(Error::decode("boolean", &other)),
        }
    }
}

/// Nil becomes `None`; everything else must decode as `T`.
impl<T: FromReply> FromReply for Option<T> {
    fn from_reply(reply: RawReply) -> Result<Self> {
        match check(reply)? {
            RawReply::Null => Ok(None),
            other => T::from_reply(other).map(Some),
        }
    }
}

/// Arrays and sets element-wise; a RESP3 map is flattened to
/// `key, value, key, value…` so RESP2 and RESP3 servers agree.
impl<T: FromReply> FromReply for Vec<T> {
    fn from_reply(reply: RawReply) -> Result<Self> {
        match check(reply)? {
            RawReply::Array(items) | RawReply::Set(items) => {
                items.into_iter().map(T::from_reply).collect()
            }
            RawReply::Map(pairs) => {
                let mut out = Vec::with_capacity(pairs.len() * 2);
                for (k, v) in pairs {
                    out.push(T::from_reply(k)?);
                    out.push(T::from_reply(v)?);
                }
                Ok(out)
            }
            other => Err(Error::decode("array", &other)),
        }
    }
}

impl<K, V> FromReply for HashMap<K, V>
where
    K: FromReply + Eq + Hash,
    V: FromReply,
{
    fn from_reply(reply: RawReply) -> Result<Self> {
        Ok(decode::pairs::<K, V>(reply)?.into_iter().collect())
    }
}

impl<A: FromReply, B: FromReply> FromReply for (A, B) {
    fn from_reply(reply: RawReply) -> Result<Self> {
        let items = decode::exact_items(reply, 2)?;
        let mut it = items.into_iter();
        match (it.next(), it.next()) {
            (Some(a), Some(b)) => Ok((A::from_reply(a)?, B::from_reply(b)?)),
            _ => Err(Error::Decode("expected 2 elements".into())),
        }
    }
}

impl<A: FromReply, B: FromReply, C: FromReply> FromReply for (A, B, C) {
    fn from_reply(reply: RawReply) -> Result<Self> {
        let items = decode::exact_items(reply, 3)?;
        let mut it = items.into_iter();
        match (it.next(), it.next(), it.next()) {
            (Some(a), Some(b), Some(c)) => {
                Ok((A::from_reply(a)?, B::from_reply(b)?, C::from_reply(c)?))
            }
            _ => Err(Error::Decode("expected 3 elements".into())),
        }
    }
}

// ── Tests ──────────────────────────────────────────────────────────
