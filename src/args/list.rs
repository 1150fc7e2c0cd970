use super::{CommandArgs, ToArg, WriteArgs};
use crate::error::{Error, Result};

/// End of a list for `LMOVE` / `BLMOVE` / `LMPOP`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Left,
    Right,
}

impl Direction {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Left => "LEFT",
            Self::Right => "RIGHT",
        }
    }
}

impl ToArg for Direction {
    fn to_arg(&self) -> bytes::Bytes {
        bytes::Bytes::from_static(self.as_str().as_bytes())
    }
}

/// Pivot side for `LINSERT`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InsertPosition {
    Before,
    After,
}

impl ToArg for InsertPosition {
    fn to_arg(&self) -> bytes::Bytes {
        bytes::Bytes::from_static(match self {
            Self::Before => b"BEFORE",
            Self::After => b"AFTER",
        })
    }
}

/// Options for `LPOS key element [RANK r] [COUNT n] [MAXLEN m]`.
#[derive(Debug, Clone, Copy, Default)]
pub struct LPosArgs {
    rank: Option<i64>,
    count: Option<u64>,
    maxlen: Option<u64>,
}

impl LPosArgs {
    pub fn new() -> Self {
        Self::default()
    }

    /// 1-based match to start from; negative searches from the tail.
    pub fn rank(mut self, rank: i64) -> Self {
        self.rank = Some(rank);
        self
    }

    /// Return up to `count` positions (0 = all).
    pub fn count(mut self, count: u64) -> Self {
        self.count = Some(count);
        self
    }

    pub fn maxlen(mut self, maxlen: u64) -> Self {
        self.maxlen = Some(maxlen);
        self
    }
}

impl WriteArgs for LPosArgs {
    fn write_args(&self, args: &mut CommandArgs) -> Result<()> {
        if let Some(rank) = self.rank {
            if rank == 0 {
                return Err(Error::Argument("LPOS RANK must not be zero".into()));
            }
            args.push("RANK").push(rank);
        }
        if let Some(count) = self.count {
            args.push("COUNT").push(count);
        }
        if let Some(maxlen) = self.maxlen {
            args.push("MAXLEN").push(maxlen);
        }
        Ok(())
    }
}
