//! Command-specific reply shapes.

use super::types::{GeoCoordinate, GeoSearchResult, ScanResult, StreamEntry, StreamId, Tuple};
use super::{check, FromReply};
use crate::error::{Error, Result};
use crate::resp::RawReply;
use bytes::Bytes;

/// Parse a Redis double string. `inf`, `+inf` and `-inf` are accepted; NaN
/// is not a value Redis can store and is rejected.
pub fn parse_double(text: &[u8]) -> Result<f64> {
    let s = std::str::from_utf8(text)
        .map_err(|_| Error::Decode("double is not UTF-8".into()))?;
    let value = match s {
        "inf" | "+inf" => f64::INFINITY,
        "-inf" => f64::NEG_INFINITY,
        _ => s
            .parse::<f64>()
            .map_err(|_| Error::Decode(format!("expected double, got {s:?}")))?,
    };
    if value.is_nan() {
        return Err(Error::Decode(format!("{s:?} is not a valid double")));
    }
    Ok(value)
}

/// Items of a sequence reply of exactly `n` elements.
pub fn exact_items(reply: RawReply, n: usize) -> Result<Vec<RawReply>> {
    let reply = check(reply)?;
    let type_name = reply.type_name();
    let items = reply
        .into_items()
        .ok_or_else(|| Error::Decode(format!("expected array of {n}, got {type_name}")))?;
    if items.len() != n {
        return Err(Error::Decode(format!(
            "expected array of {n}, got {} elements",
            items.len()
        )));
    }
    Ok(items)
}

fn items(reply: RawReply) -> Result<Vec<RawReply>> {
    let reply = check(reply)?;
    match reply {
        RawReply::Array(items) | RawReply::Set(items) => Ok(items),
        other => Err(Error::decode("array", &other)),
    }
}

/// Key/value pairs from a RESP3 map or a flat `k, v, k, v` array.
pub fn pairs<K: FromReply, V: FromReply>(reply: RawReply) -> Result<Vec<(K, V)>> {
    match check(reply)? {
        RawReply::Map(pairs) => pairs
            .into_iter()
            .map(|(k, v)| Ok((K::from_reply(k)?, V::from_reply(v)?)))
            .collect(),
        RawReply::Array(items) => {
            if items.len() % 2 != 0 {
                return Err(Error::Decode(format!(
                    "expected even number of elements, got {}",
                    items.len()
                )));
            }
            let mut out = Vec::with_capacity(items.len() / 2);
            let mut it = items.into_iter();
            while let (Some(k), Some(v)) = (it.next(), it.next()) {
                out.push((K::from_reply(k)?, V::from_reply(v)?));
            }
            Ok(out)
        }
        other => Err(Error::decode("map", &other)),
    }
}

/// Score tuples from either layout: flat `[m, s, m, s]` (RESP2
/// `WITHSCORES`) or nested `[[m, s], …]` (RESP3, `ZMPOP`).
pub fn tuples<M: FromReply>(reply: RawReply) -> Result<Vec<Tuple<M>>> {
    let items = items(reply)?;
    let nested = matches!(items.first(), Some(RawReply::Array(_)));
    if nested {
        return items.into_iter().map(Tuple::from_reply).collect();
    }
    pairs::<M, f64>(RawReply::Array(items))
        .map(|ps| ps.into_iter().map(|(m, s)| Tuple::new(m, s)).collect())
}

/// `BZPOPMIN` / `BZPOPMAX`: `[key, member, score]`, or nil on timeout.
pub fn key_tuple<K: FromReply, M: FromReply>(reply: RawReply) -> Result<Option<(K, Tuple<M>)>> {
    match check(reply)? {
        RawReply::Null => Ok(None),
        other => {
            let (key, member, score) = <(K, M, f64)>::from_reply(other)?;
            Ok(Some((key, Tuple::new(member, score))))
        }
    }
}

fn split_scan(reply: RawReply) -> Result<(RawReply, RawReply)> {
    let items = exact_items(reply, 2)?;
    let mut it = items.into_iter();
    match (it.next(), it.next()) {
        (Some(cursor), Some(page)) => Ok((cursor, page)),
        _ => Err(Error::Decode("malformed scan reply".into())),
    }
}

fn cursor<C: FromReply>(reply: RawReply) -> Result<(C, Bytes)> {
    let raw = match &reply {
        RawReply::Bulk(b) => b.clone(),
        RawReply::SimpleString(s) => Bytes::copy_from_slice(s.as_bytes()),
        other => return Err(Error::decode("scan cursor", other)),
    };
    Ok((C::from_reply(reply)?, raw))
}

/// `[cursor, [item, …]]`.
pub fn scan<C: FromReply, T: FromReply>(reply: RawReply) -> Result<ScanResult<C, T>> {
    let (raw_cursor, page) = split_scan(reply)?;
    let (cursor, raw) = cursor(raw_cursor)?;
    Ok(ScanResult::new(cursor, raw, Vec::<T>::from_reply(page)?))
}

/// `HSCAN`: page is flat `field, value, …`.
pub fn scan_pairs<C: FromReply, K: FromReply, V: FromReply>(
    reply: RawReply,
) -> Result<ScanResult<C, (K, V)>> {
    let (raw_cursor, page) = split_scan(reply)?;
    let (cursor, raw) = cursor(raw_cursor)?;
    Ok(ScanResult::new(cursor, raw, pairs(page)?))
}

/// `ZSCAN`: page is flat `member, score, …`.
pub fn scan_tuples<C: FromReply, M: FromReply>(reply: RawReply) -> Result<ScanResult<C, Tuple<M>>> {
    let (raw_cursor, page) = split_scan(reply)?;
    let (cursor, raw) = cursor(raw_cursor)?;
    Ok(ScanResult::new(cursor, raw, tuples(page)?))
}

/// `GEOSEARCH` hits. Without `WITH*` options each hit is a bare member;
/// otherwise `[member, dist?, hash?, [lon, lat]?]` in that fixed order.
pub fn geo_search<M: FromReply>(
    reply: RawReply,
    with_coord: bool,
    with_dist: bool,
    with_hash: bool,
) -> Result<Vec<GeoSearchResult<M>>> {
    let hits = items(reply)?;
    if !(with_coord || with_dist || with_hash) {
        return hits
            .into_iter()
            .map(|m| {
                Ok(GeoSearchResult {
                    member: M::from_reply(m)?,
                    distance: None,
                    hash: None,
                    coordinate: None,
                })
            })
            .collect();
    }
    let width = 1 + usize::from(with_coord) + usize::from(with_dist) + usize::from(with_hash);
    hits.into_iter()
        .map(|hit| {
            let mut parts = exact_items(hit, width)?.into_iter();
            let mut next = || parts.next().ok_or_else(|| Error::Decode("short GEOSEARCH hit".into()));
            let member = M::from_reply(next()?)?;
            let distance = if with_dist { Some(f64::from_reply(next()?)?) } else { None };
            let hash = if with_hash { Some(i64::from_reply(next()?)?) } else { None };
            let coordinate = if with_coord {
                Some(GeoCoordinate::from_reply(next()?)?)
            } else {
                None
            };
            Ok(GeoSearchResult {
                member,
                distance,
                hash,
                coordinate,
            })
        })
        .collect()
}

/// `BITFIELD`: one slot per `GET`/`SET`/`INCRBY`, nil where `OVERFLOW FAIL`
/// suppressed an operation.
pub fn bitfield(reply: RawReply, expected: usize) -> Result<Vec<Option<i64>>> {
    let values = Vec::<Option<i64>>::from_reply(reply)?;
    if values.len() != expected {
        return Err(Error::Decode(format!(
            "BITFIELD returned {} values for {expected} operations",
            values.len()
        )));
    }
    Ok(values)
}

/// `XREAD` / `XREADGROUP`: per-stream entries from an array of
/// `[key, entries]` or a RESP3 map; nil (block timeout) is empty.
pub fn streams<K: FromReply, F: FromReply, V: FromReply>(
    reply: RawReply,
) -> Result<Vec<(K, Vec<StreamEntry<F, V>>)>> {
    match check(reply)? {
        RawReply::Null => Ok(Vec::new()),
        RawReply::Map(pairs) => pairs
            .into_iter()
            .map(|(k, v)| Ok((K::from_reply(k)?, Vec::from_reply(v)?)))
            .collect(),
        other => Vec::<(K, Vec<StreamEntry<F, V>>)>::from_reply(other),
    }
}

/// `XAUTOCLAIM`: `[next-id, entries]` plus deleted ids on Redis 7+.
pub fn autoclaim<F: FromReply, V: FromReply>(
    reply: RawReply,
) -> Result<(StreamId, Vec<StreamEntry<F, V>>, Vec<StreamId>)> {
    let items = items(reply)?;
    let len = items.len();
    let mut it = items.into_iter();
    match (it.next(), it.next(), it.next()) {
        (Some(next), Some(entries), deleted) if len == 2 || len == 3 => Ok((
            StreamId::from_reply(next)?,
            Vec::from_reply(entries)?,
            match deleted {
                Some(d) => Vec::from_reply(d)?,
                None => Vec::new(),
            },
        )),
        _ => Err(Error::Decode(format!("expected XAUTOCLAIM reply of 2 or 3, got {len}"))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn bulk(s: &'static str) -> RawReply {
        RawReply::from(s)
    }

    #[test]
    fn doubles() {
        assert_eq!(parse_double(b"1.5").unwrap(), 1.5);
        assert_eq!(parse_double(b"+inf").unwrap(), f64::INFINITY);
        assert_eq!(parse_double(b"-inf").unwrap(), f64::NEG_INFINITY);
        assert_eq!(parse_double(b"1e3").unwrap(), 1000.0);
        assert!(parse_double(b"nan").is_err());
        assert!(parse_double(b"NaN").is_err());
        assert!(parse_double(b"abc").is_err());
    }

    #[test]
    fn tuples_flat_and_nested() {
        let flat = RawReply::Array(vec![bulk("a"), bulk("1"), bulk("b"), bulk("2.5")]);
        let t: Vec<Tuple<String>> = tuples(flat).unwrap();
        assert_eq!(t, vec![Tuple::new("a".to_string(), 1.0), Tuple::new("b".to_string(), 2.5)]);

        let nested = RawReply::Array(vec![
            RawReply::Array(vec![bulk("a"), RawReply::Double(1.0)]),
            RawReply::Array(vec![bulk("b"), RawReply::Double(2.5)]),
        ]);
        assert_eq!(tuples::<String>(nested).unwrap(), t);

        assert!(tuples::<String>(RawReply::Array(vec![])).unwrap().is_empty());
        assert!(tuples::<String>(RawReply::Array(vec![bulk("a")])).is_err());
    }

    #[test]
    fn tuples_reject_nan_score() {
        let flat = RawReply::Array(vec![bulk("a"), bulk("nan")]);
        assert!(matches!(tuples::<String>(flat), Err(Error::Decode(_))));
    }

    #[test]
    fn key_tuple_timeout() {
        assert!(key_tuple::<String, String>(RawReply::Null).unwrap().is_none());
        let hit = RawReply::Array(vec![bulk("z"), bulk("m"), bulk("3")]);
        let (k, t) = key_tuple::<String, String>(hit).unwrap().unwrap();
        assert_eq!(k, "z");
        assert_eq!(t, Tuple::new("m".to_string(), 3.0));
    }

    #[test]
    fn scan_keeps_raw_cursor() {
        let reply = RawReply::Array(vec![bulk("0017"), RawReply::Array(vec![bulk("k1"), bulk("k2")])]);
        let page: ScanResult<u64, String> = scan(reply.clone()).unwrap();
        assert_eq!(page.cursor, 17);
        assert_eq!(&page.next_cursor()[..], b"0017");
        assert_eq!(page.items, vec!["k1".to_string(), "k2".to_string()]);

        let page: ScanResult<String, Vec<u8>> = scan(reply).unwrap();
        assert_eq!(page.cursor, "0017");
    }

    #[test]
    fn hscan_and_zscan_pages() {
        let reply = RawReply::Array(vec![bulk("0"), RawReply::Array(vec![bulk("f"), bulk("v")])]);
        let page: ScanResult<String, (String, String)> = scan_pairs(reply).unwrap();
        assert!(page.is_finished());
        assert_eq!(page.items, vec![("f".to_string(), "v".to_string())]);

        let reply = RawReply::Array(vec![bulk("0"), RawReply::Array(vec![bulk("m"), bulk("inf")])]);
        let page: ScanResult<String, Tuple<String>> = scan_tuples(reply).unwrap();
        assert_eq!(page.items[0].score, f64::INFINITY);
    }

    #[test]
    fn geo_positional() {
        let reply = RawReply::Array(vec![RawReply::Array(vec![
            bulk("Palermo"),
            bulk("190.4424"),
            RawReply::Integer(3479099956230698),
            RawReply::Array(vec![bulk("13.36138933897018433"), bulk("38.11555639549629859")]),
        ])]);
        let hits: Vec<GeoSearchResult<String>> = geo_search(reply, true, true, true).unwrap();
        assert_eq!(hits[0].member, "Palermo");
        assert_eq!(hits[0].distance, Some(190.4424));
        assert_eq!(hits[0].hash, Some(3479099956230698));
        assert!((hits[0].coordinate.unwrap().longitude - 13.3613893).abs() < 1e-6);

        let only_dist = RawReply::Array(vec![RawReply::Array(vec![bulk("a"), bulk("1.5")])]);
        let hits: Vec<GeoSearchResult<String>> = geo_search(only_dist, false, true, false).unwrap();
        assert_eq!(hits[0].distance, Some(1.5));
        assert_eq!(hits[0].coordinate, None);

        let bare = RawReply::Array(vec![bulk("a"), bulk("b")]);
        let hits: Vec<GeoSearchResult<String>> = geo_search(bare, false, false, false).unwrap();
        assert_eq!(hits.len(), 2);

        let wrong_width = RawReply::Array(vec![RawReply::Array(vec![bulk("a")])]);
        assert!(geo_search::<String>(wrong_width, false, true, false).is_err());
    }

    #[test]
    fn bitfield_positions() {
        let reply = RawReply::Array(vec![RawReply::Integer(1), RawReply::Null, RawReply::Integer(-3)]);
        assert_eq!(bitfield(reply.clone(), 3).unwrap(), vec![Some(1), None, Some(-3)]);
        assert!(bitfield(reply, 2).is_err());
    }

    #[test]
    fn xread_layouts() {
        let entries = RawReply::Array(vec![RawReply::Array(vec![
            bulk("1-1"),
            RawReply::Array(vec![bulk("f"), bulk("v")]),
        ])]);
        let resp2 = RawReply::Array(vec![RawReply::Array(vec![bulk("s"), entries.clone()])]);
        let out: Vec<(String, Vec<StreamEntry>)> = streams(resp2).unwrap();
        assert_eq!(out[0].0, "s");
        assert_eq!(out[0].1[0].id, StreamId::new(1, 1));

        let resp3 = RawReply::Map(vec![(bulk("s"), entries)]);
        let out3: Vec<(String, Vec<StreamEntry>)> = streams(resp3).unwrap();
        assert_eq!(out, out3);

        assert!(streams::<String, String, String>(RawReply::Null).unwrap().is_empty());
    }

    #[test]
    fn autoclaim_two_or_three() {
        let two = RawReply::Array(vec![bulk("0-0"), RawReply::Array(vec![])]);
        let (next, entries, deleted) = autoclaim::<String, String>(two).unwrap();
        assert_eq!(next, StreamId::new(0, 0));
        assert!(entries.is_empty() && deleted.is_empty());

        let three = RawReply::Array(vec![
            bulk("5-0"),
            RawReply::Array(vec![]),
            RawReply::Array(vec![bulk("3-0")]),
        ]);
        let (_, _, deleted) = autoclaim::<String, String>(three).unwrap();
        assert_eq!(deleted, vec![StreamId::new(3, 0)]);
    }
}
