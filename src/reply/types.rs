use super::{check, decode, FromReply};
use crate::args::ToArg;
use crate::error::{Error, Result};
use crate::resp::RawReply;
use bytes::Bytes;
use std::fmt;
use std::str::FromStr;

/// Outcome of a status-returning command.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Status {
    /// `+OK` (or `+QUEUED` inside a transaction).
    Success,
    /// Nil: the command ran but its condition was not met (`SET … NX`).
    Failure,
}

impl Status {
    pub fn is_success(self) -> bool {
        self == Self::Success
    }
}

impl FromReply for Status {
    fn from_reply(reply: RawReply) -> Result<Self> {
        match check(reply)? {
            RawReply::SimpleString(s) if s == "OK" || s == "QUEUED" => Ok(Self::Success),
            RawReply::Null => Ok(Self::Failure),
            RawReply::SimpleString(s) => Err(Error::Decode(format!("unexpected status {s:?}"))),
            other => Err(Error::decode("status", &other)),
        }
    }
}

/// A sorted-set member with its score, in server order.
#[derive(Debug, Clone, PartialEq)]
pub struct Tuple<M> {
    pub member: M,
    pub score: f64,
}

impl<M> Tuple<M> {
    pub fn new(member: M, score: f64) -> Self {
        Self { member, score }
    }
}

/// From a nested `[member, score]` pair (RESP3 and `ZMPOP` layout).
impl<M: FromReply> FromReply for Tuple<M> {
    fn from_reply(reply: RawReply) -> Result<Self> {
        let (member, score) = <(M, f64)>::from_reply(reply)?;
        Ok(Self { member, score })
    }
}

/// One page of a `SCAN`-family iteration.
///
/// The cursor is kept as the exact bytes the server sent; pass
/// [`next_cursor`](Self::next_cursor) back unchanged to continue.
#[derive(Debug, Clone, PartialEq)]
pub struct ScanResult<C, T> {
    pub cursor: C,
    pub items: Vec<T>,
    raw_cursor: Bytes,
}

impl<C, T> ScanResult<C, T> {
    pub(crate) fn new(cursor: C, raw_cursor: Bytes, items: Vec<T>) -> Self {
        Self {
            cursor,
            items,
            raw_cursor,
        }
    }

    /// The server signalled the end of the iteration (cursor `0`).
    pub fn is_finished(&self) -> bool {
        &self.raw_cursor[..] == b"0"
    }

    pub fn next_cursor(&self) -> &Bytes {
        &self.raw_cursor
    }
}

impl<C, T> ToArg for ScanResult<C, T> {
    fn to_arg(&self) -> Bytes {
        self.raw_cursor.clone()
    }
}

/// Stream entry id `<ms>-<seq>`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct StreamId {
    pub ms: u64,
    pub seq: u64,
}

impl StreamId {
    pub fn new(ms: u64, seq: u64) -> Self {
        Self { ms, seq }
    }
}

impl FromStr for StreamId {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        let bad = || Error::Decode(format!("invalid stream id {s:?}"));
        let (ms, seq) = s.split_once('-').ok_or_else(bad)?;
        Ok(Self {
            ms: ms.parse().map_err(|_| bad())?,
            seq: seq.parse().map_err(|_| bad())?,
        })
    }
}

impl fmt::Display for StreamId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{}", self.ms, self.seq)
    }
}

impl FromReply for StreamId {
    fn from_reply(reply: RawReply) -> Result<Self> {
        String::from_reply(reply)?.parse()
    }
}

impl ToArg for StreamId {
    fn to_arg(&self) -> Bytes {
        Bytes::from(self.to_string())
    }
}

/// `[id, [field, value, …]]`, fields in stream order.
#[derive(Debug, Clone, PartialEq)]
pub struct StreamEntry<F = String, V = String> {
    pub id: StreamId,
    pub fields: Vec<(F, V)>,
}

impl<F: FromReply, V: FromReply> FromReply for StreamEntry<F, V> {
    fn from_reply(reply: RawReply) -> Result<Self> {
        let (id, fields) = <(StreamId, RawReply)>::from_reply(reply)?;
        let fields = match fields {
            RawReply::Null => Vec::new(),
            other => decode::pairs(other)?,
        };
        Ok(Self { id, fields })
    }
}

/// Per-stream entries as returned by `XREAD` / `XREADGROUP`.
pub type StreamReadReply<F = String, V = String> = Vec<(String, Vec<StreamEntry<F, V>>)>;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GeoCoordinate {
    pub longitude: f64,
    pub latitude: f64,
}

impl FromReply for GeoCoordinate {
    fn from_reply(reply: RawReply) -> Result<Self> {
        let (longitude, latitude) = <(f64, f64)>::from_reply(reply)?;
        Ok(Self {
            longitude,
            latitude,
        })
    }
}

/// One `GEOSEARCH` hit; optional parts are present when requested.
#[derive(Debug, Clone, PartialEq)]
pub struct GeoSearchResult<M> {
    pub member: M,
    pub distance: Option<f64>,
    pub hash: Option<i64>,
    pub coordinate: Option<GeoCoordinate>,
}

/// Summary form of `XPENDING key group`.
#[derive(Debug, Clone, PartialEq)]
pub struct PendingSummary {
    pub count: u64,
    pub smallest: Option<StreamId>,
    pub greatest: Option<StreamId>,
    pub consumers: Vec<(String, u64)>,
}

impl FromReply for PendingSummary {
    fn from_reply(reply: RawReply) -> Result<Self> {
        let items = decode::exact_items(reply, 4)?;
        let mut it = items.into_iter();
        let mut next = || it.next().ok_or_else(|| Error::Decode("short XPENDING reply".into()));
        let count = u64::from_reply(next()?)?;
        let smallest = Option::<StreamId>::from_reply(next()?)?;
        let greatest = Option::<StreamId>::from_reply(next()?)?;
        let consumers = Option::<Vec<(String, u64)>>::from_reply(next()?)?.unwrap_or_default();
        Ok(Self {
            count,
            smallest,
            greatest,
            consumers,
        })
    }
}

/// One row of the extended `XPENDING` form.
#[derive(Debug, Clone, PartialEq)]
pub struct PendingEntry {
    pub id: StreamId,
    pub consumer: String,
    pub idle_ms: u64,
    pub deliveries: u64,
}

impl FromReply for PendingEntry {
    fn from_reply(reply: RawReply) -> Result<Self> {
        let items = decode::exact_items(reply, 4)?;
        let mut it = items.into_iter();
        let mut next = || it.next().ok_or_else(|| Error::Decode("short XPENDING entry".into()));
        Ok(Self {
            id: StreamId::from_reply(next()?)?,
            consumer: String::from_reply(next()?)?,
            idle_ms: u64::from_reply(next()?)?,
            deliveries: u64::from_reply(next()?)?,
        })
    }
}
