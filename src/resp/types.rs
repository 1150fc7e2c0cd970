use bytes::Bytes;

/// One reply frame as delivered by the transport (RESP2 + RESP3).
///
/// This is the untyped input of the result decoder; nothing above the
/// transport inspects wire markers beyond this enum.
#[derive(Debug, Clone, PartialEq)]
pub enum RawReply {
    /// `+OK`
    SimpleString(String),
    /// `-ERR message` or RESP3 `!` bulk error
    Error(String),
    /// `:1000`
    Integer(i64),
    /// `$6\r\nfoobar`
    Bulk(Bytes),
    /// `*2 …`
    Array(Vec<RawReply>),
    /// `$-1`, `*-1` or RESP3 `_`
    Null,
    /// RESP3 `,3.14`
    Double(f64),
    /// RESP3 `#t` / `#f`
    Boolean(bool),
    /// RESP3 `%N`
    Map(Vec<(RawReply, RawReply)>),
    /// RESP3 `~N`
    Set(Vec<RawReply>),
    /// RESP3 `(` arbitrary precision integer, kept as text
    BigNumber(String),
    /// RESP3 `=` verbatim string with its three-letter format
    Verbatim { format: String, text: String },
    /// RESP3 `>` out-of-band push
    Push { kind: String, data: Vec<RawReply> },
}

impl RawReply {
    /// Binary view of string-like replies.
    pub fn as_bytes(&self) -> Option<&[u8]> {
        match self {
            Self::Bulk(b) => Some(b),
            Self::SimpleString(s) => Some(s.as_bytes()),
            Self::Verbatim { text, .. } => Some(text.as_bytes()),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::SimpleString(s) => Some(s),
            Self::Bulk(b) => std::str::from_utf8(b).ok(),
            Self::Verbatim { text, .. } => Some(text),
            _ => None,
        }
    }

    pub fn as_int(&self) -> Option<i64> {
        match self {
            Self::Integer(i) => Some(*i),
            _ => None,
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }

    pub fn is_error(&self) -> bool {
        matches!(self, Self::Error(_))
    }

    pub fn as_error_msg(&self) -> Option<&str> {
        match self {
            Self::Error(msg) => Some(msg),
            _ => None,
        }
    }

    /// Sequence-shaped replies (array, set, push payload) as an owned vector.
    pub fn into_items(self) -> Option<Vec<RawReply>> {
        match self {
            Self::Array(items) | Self::Set(items) => Some(items),
            Self::Push { data, .. } => Some(data),
            _ => None,
        }
    }

    /// Name used in decode error messages.
    pub fn type_name(&self) -> &'static str {
        match self {
            Self::SimpleString(_) => "simple string",
            Self::Error(_) => "error",
            Self::Integer(_) => "integer",
            Self::Bulk(_) => "bulk string",
            Self::Array(_) => "array",
            Self::Null => "nil",
            Self::Double(_) => "double",
            Self::Boolean(_) => "boolean",
            Self::Map(_) => "map",
            Self::Set(_) => "set",
            Self::BigNumber(_) => "big number",
            Self::Verbatim { .. } => "verbatim string",
            Self::Push { .. } => "push",
        }
    }
}

impl From<&'static str> for RawReply {
    fn from(s: &'static str) -> Self {
        Self::Bulk(Bytes::from_static(s.as_bytes()))
    }
}

impl From<i64> for RawReply {
    fn from(i: i64) -> Self {
        Self::Integer(i)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn string_views() {
        let bulk = RawReply::Bulk(Bytes::from_static(b"hello"));
        assert_eq!(bulk.as_str(), Some("hello"));
        assert_eq!(bulk.as_bytes(), Some(&b"hello"[..]));

        let binary = RawReply::Bulk(Bytes::from_static(&[0xff, 0xfe]));
        assert_eq!(binary.as_str(), None);
        assert_eq!(binary.as_bytes(), Some(&[0xff, 0xfe][..]));

        let verbatim = RawReply::Verbatim {
            format: "txt".into(),
            text: "some text".into(),
        };
        assert_eq!(verbatim.as_str(), Some("some text"));

        assert_eq!(RawReply::Integer(1).as_str(), None);
        assert_eq!(RawReply::Null.as_bytes(), None);
    }

    #[test]
    fn into_items_shapes() {
        let arr = RawReply::Array(vec![RawReply::Integer(1)]);
        assert_eq!(arr.into_items().map(|v| v.len()), Some(1));

        let set = RawReply::Set(vec![RawReply::Integer(1), RawReply::Integer(2)]);
        assert_eq!(set.into_items().map(|v| v.len()), Some(2));

        assert!(RawReply::Integer(1).into_items().is_none());
        assert!(RawReply::Null.into_items().is_none());
    }

    #[test]
    fn error_accessors() {
        let e = RawReply::Error("ERR boom".into());
        assert!(e.is_error());
        assert_eq!(e.as_error_msg(), Some("ERR boom"));
        assert!(!RawReply::SimpleString("ERR".into()).is_error());
    }

    #[test]
    fn type_names() {
        assert_eq!(RawReply::Null.type_name(), "nil");
        assert_eq!(RawReply::Bulk(Bytes::new()).type_name(), "bulk string");
        assert_eq!(RawReply::Map(vec![]).type_name(), "map");
    }

    #[test]
    fn conversions() {
        assert_eq!(RawReply::from("x"), RawReply::Bulk(Bytes::from_static(b"x")));
        assert_eq!(RawReply::from(7i64), RawReply::Integer(7));
    }
}
