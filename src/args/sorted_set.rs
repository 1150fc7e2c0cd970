use super::{format_double, CommandArgs, ToArg, WriteArgs};
use crate::error::{Error, Result};
use bytes::{BufMut, Bytes, BytesMut};

/// Options for `ZADD key [NX|XX] [GT|LT] [CH] [INCR] score member …`.
#[derive(Debug, Clone, Copy, Default)]
pub struct ZAddArgs {
    nx: bool,
    xx: bool,
    gt: bool,
    lt: bool,
    ch: bool,
    incr: bool,
}

impl ZAddArgs {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn nx(mut self) -> Self {
        self.nx = true;
        self
    }

    pub fn xx(mut self) -> Self {
        self.xx = true;
        self
    }

    pub fn gt(mut self) -> Self {
        self.gt = true;
        self
    }

    pub fn lt(mut self) -> Self {
        self.lt = true;
        self
    }

    /// Count changed elements instead of only added ones.
    pub fn ch(mut self) -> Self {
        self.ch = true;
        self
    }

    /// Behave like `ZINCRBY`; only one score/member pair is allowed.
    pub fn incr(mut self) -> Self {
        self.incr = true;
        self
    }

    pub(crate) fn is_incr(&self) -> bool {
        self.incr
    }
}

impl WriteArgs for ZAddArgs {
    fn write_args(&self, args: &mut CommandArgs) -> Result<()> {
        if self.nx && self.xx {
            return Err(Error::Argument("ZADD accepts only one of NX, XX".into()));
        }
        if self.gt && self.lt {
            return Err(Error::Argument("ZADD accepts only one of GT, LT".into()));
        }
        if self.nx && (self.gt || self.lt) {
            return Err(Error::Argument("ZADD NX cannot be combined with GT or LT".into()));
        }
        if self.nx {
            args.push("NX");
        }
        if self.xx {
            args.push("XX");
        }
        if self.gt {
            args.push("GT");
        }
        if self.lt {
            args.push("LT");
        }
        if self.ch {
            args.push("CH");
        }
        if self.incr {
            args.push("INCR");
        }
        Ok(())
    }
}

/// One end of a score interval.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ScoreBound {
    Inclusive(f64),
    Exclusive(f64),
    NegInf,
    PosInf,
}

impl ScoreBound {
    pub fn to_token(self) -> Result<Bytes> {
        match self {
            Self::Inclusive(v) => format_double(v),
            Self::Exclusive(v) => {
                let text = format_double(v)?;
                let mut buf = BytesMut::with_capacity(text.len() + 1);
                buf.put_u8(b'(');
                buf.put_slice(&text);
                Ok(buf.freeze())
            }
            Self::NegInf => Ok(Bytes::from_static(b"-inf")),
            Self::PosInf => Ok(Bytes::from_static(b"+inf")),
        }
    }
}

impl From<f64> for ScoreBound {
    fn from(v: f64) -> Self {
        Self::Inclusive(v)
    }
}

/// Interval selector for `ZRANGE`.
#[derive(Debug, Clone, PartialEq)]
pub enum ZRangeBy {
    /// Index range, inclusive, negative counts from the end.
    Rank(i64, i64),
    Score(ScoreBound, ScoreBound),
    /// Lexicographic range; bounds are `[x`, `(x`, `-` or `+`.
    Lex(Bytes, Bytes),
}

fn check_lex_bound(bound: &[u8]) -> Result<()> {
    match bound {
        b"-" | b"+" => Ok(()),
        [b'[' | b'(', ..] => Ok(()),
        _ => Err(Error::Argument(format!(
            "invalid lex bound {:?}: must start with '[' or '(' or be '-' / '+'",
            String::from_utf8_lossy(bound)
        ))),
    }
}

/// Options for `ZRANGE` / `ZRANGESTORE`.
#[derive(Debug, Clone)]
pub struct ZRangeArgs {
    by: ZRangeBy,
    rev: bool,
    limit: Option<(i64, i64)>,
}

impl ZRangeArgs {
    pub fn rank(start: i64, stop: i64) -> Self {
        Self::new(ZRangeBy::Rank(start, stop))
    }

    pub fn score(min: impl Into<ScoreBound>, max: impl Into<ScoreBound>) -> Self {
        Self::new(ZRangeBy::Score(min.into(), max.into()))
    }

    pub fn lex(min: impl ToArg, max: impl ToArg) -> Self {
        Self::new(ZRangeBy::Lex(min.to_arg(), max.to_arg()))
    }

    pub fn new(by: ZRangeBy) -> Self {
        Self {
            by,
            rev: false,
            limit: None,
        }
    }

    pub fn rev(mut self) -> Self {
        self.rev = true;
        self
    }

    pub fn limit(mut self, offset: i64, count: i64) -> Self {
        self.limit = Some((offset, count));
        self
    }

    pub(crate) fn is_lex(&self) -> bool {
        matches!(self.by, ZRangeBy::Lex(..))
    }
}

impl WriteArgs for ZRangeArgs {
    fn write_args(&self, args: &mut CommandArgs) -> Result<()> {
        match &self.by {
            ZRangeBy::Rank(start, stop) => {
                if self.limit.is_some() {
                    return Err(Error::Argument(
                        "ZRANGE LIMIT requires a score or lex range".into(),
                    ));
                }
                args.push(*start).push(*stop);
            }
            ZRangeBy::Score(min, max) => {
                // With REV the server expects max before min.
                let (first, second) = if self.rev { (max, min) } else { (min, max) };
                args.push(first.to_token()?).push(second.to_token()?).push("BYSCORE");
            }
            ZRangeBy::Lex(min, max) => {
                check_lex_bound(min)?;
                check_lex_bound(max)?;
                let (first, second) = if self.rev { (max, min) } else { (min, max) };
                args.push(first).push(second).push("BYLEX");
            }
        }
        if self.rev {
            args.push("REV");
        }
        if let Some((offset, count)) = self.limit {
            args.push("LIMIT").push(offset).push(count);
        }
        Ok(())
    }
}

/// Score combination for `ZUNION*` / `ZINTER*`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Aggregate {
    Sum,
    Min,
    Max,
}

/// `WEIGHTS` / `AGGREGATE` for `ZUNION`, `ZINTER` and their `STORE` forms.
#[derive(Debug, Clone, Default)]
pub struct ZStoreArgs {
    weights: Vec<f64>,
    aggregate: Option<Aggregate>,
}

impl ZStoreArgs {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn weights(mut self, weights: impl IntoIterator<Item = f64>) -> Self {
        self.weights = weights.into_iter().collect();
        self
    }

    pub fn aggregate(mut self, aggregate: Aggregate) -> Self {
        self.aggregate = Some(aggregate);
        self
    }

    pub(crate) fn check_key_count(&self, numkeys: usize) -> Result<()> {
        if !self.weights.is_empty() && self.weights.len() != numkeys {
            return Err(Error::Argument(format!(
                "{} WEIGHTS given for {numkeys} keys",
                self.weights.len()
            )));
        }
        Ok(())
    }
}

impl WriteArgs for ZStoreArgs {
    fn write_args(&self, args: &mut CommandArgs) -> Result<()> {
        if !self.weights.is_empty() {
            args.push("WEIGHTS");
            for w in &self.weights {
                args.push_double(*w)?;
            }
        }
        if let Some(agg) = self.aggregate {
            args.push("AGGREGATE").push(match agg {
                Aggregate::Sum => "SUM",
                Aggregate::Min => "MIN",
                Aggregate::Max => "MAX",
            });
        }
        Ok(())
    }
}
