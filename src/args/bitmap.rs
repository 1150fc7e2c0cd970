use super::{CommandArgs, WriteArgs};
use crate::error::{Error, Result};

/// Integer encoding of a `BITFIELD` slot: `i1`..`i64` or `u1`..`u63`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IntType {
    Signed(u8),
    Unsigned(u8),
}

impl IntType {
    fn token(self) -> Result<String> {
        match self {
            Self::Signed(bits @ 1..=64) => Ok(format!("i{bits}")),
            Self::Unsigned(bits @ 1..=63) => Ok(format!("u{bits}")),
            Self::Signed(bits) => Err(Error::Argument(format!("invalid signed width i{bits}"))),
            Self::Unsigned(bits) => Err(Error::Argument(format!("invalid unsigned width u{bits}"))),
        }
    }
}

/// Behaviour of subsequent `SET` / `INCRBY` on overflow.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BitFieldOverflow {
    Wrap,
    Sat,
    Fail,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Offset {
    Bits(u64),
    /// `#n`: n times the type width.
    Scaled(u64),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Op {
    Get(IntType, Offset),
    Set(IntType, Offset, i64),
    IncrBy(IntType, Offset, i64),
    Overflow(BitFieldOverflow),
}

/// Sub-operations of one `BITFIELD` call, sent in insertion order.
///
/// The reply holds one entry per `GET`, `SET` and `INCRBY`, in the same
/// order; `OVERFLOW` contributes nothing, and an `INCRBY` skipped by
/// `OVERFLOW FAIL` yields nil.
#[derive(Debug, Clone, Default)]
pub struct BitFieldArgs {
    ops: Vec<Op>,
}

impl BitFieldArgs {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(mut self, ty: IntType, offset: u64) -> Self {
        self.ops.push(Op::Get(ty, Offset::Bits(offset)));
        self
    }

    /// `GET` at `#index` (offset in units of the type width).
    pub fn get_nth(mut self, ty: IntType, index: u64) -> Self {
        self.ops.push(Op::Get(ty, Offset::Scaled(index)));
        self
    }

    pub fn set(mut self, ty: IntType, offset: u64, value: i64) -> Self {
        self.ops.push(Op::Set(ty, Offset::Bits(offset), value));
        self
    }

    pub fn set_nth(mut self, ty: IntType, index: u64, value: i64) -> Self {
        self.ops.push(Op::Set(ty, Offset::Scaled(index), value));
        self
    }

    pub fn incrby(mut self, ty: IntType, offset: u64, increment: i64) -> Self {
        self.ops.push(Op::IncrBy(ty, Offset::Bits(offset), increment));
        self
    }

    pub fn incrby_nth(mut self, ty: IntType, index: u64, increment: i64) -> Self {
        self.ops.push(Op::IncrBy(ty, Offset::Scaled(index), increment));
        self
    }

    pub fn overflow(mut self, mode: BitFieldOverflow) -> Self {
        self.ops.push(Op::Overflow(mode));
        self
    }

    /// Number of reply entries the server will send back.
    pub fn reply_len(&self) -> usize {
        self.ops
            .iter()
            .filter(|op| !matches!(op, Op::Overflow(_)))
            .count()
    }

    pub(crate) fn is_read_only(&self) -> bool {
        self.ops.iter().all(|op| matches!(op, Op::Get(..)))
    }
}

fn push_offset(args: &mut CommandArgs, offset: Offset) {
    match offset {
        Offset::Bits(n) => args.push(n),
        Offset::Scaled(n) => args.push(format!("#{n}")),
    };
}

impl WriteArgs for BitFieldArgs {
    fn write_args(&self, args: &mut CommandArgs) -> Result<()> {
        if self.ops.is_empty() {
            return Err(Error::Argument("BITFIELD requires at least one operation".into()));
        }
        for op in &self.ops {
            match *op {
                Op::Get(ty, offset) => {
                    args.push("GET").push(ty.token()?);
                    push_offset(args, offset);
                }
                Op::Set(ty, offset, value) => {
                    args.push("SET").push(ty.token()?);
                    push_offset(args, offset);
                    args.push(value);
                }
                Op::IncrBy(ty, offset, increment) => {
                    args.push("INCRBY").push(ty.token()?);
                    push_offset(args, offset);
                    args.push(increment);
                }
                Op::Overflow(mode) => {
                    args.push("OVERFLOW").push(match mode {
                        BitFieldOverflow::Wrap => "WRAP",
                        BitFieldOverflow::Sat => "SAT",
                        BitFieldOverflow::Fail => "FAIL",
                    });
                }
            }
        }
        Ok(())
    }
}

/// Operator for `BITOP`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BitOp {
    And,
    Or,
    Xor,
    /// Takes exactly one source key.
    Not,
}

impl BitOp {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::And => "AND",
            Self::Or => "OR",
            Self::Xor => "XOR",
            Self::Not => "NOT",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BitUnit {
    Byte,
    Bit,
}

/// `start end [BYTE|BIT]` for `BITCOUNT` / `BITPOS`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BitRange {
    start: i64,
    end: Option<i64>,
    unit: Option<BitUnit>,
}

impl BitRange {
    pub fn new(start: i64, end: i64) -> Self {
        Self {
            start,
            end: Some(end),
            unit: None,
        }
    }

    /// `BITPOS` only: search from `start` to the end of the string.
    pub fn starting_at(start: i64) -> Self {
        Self {
            start,
            end: None,
            unit: None,
        }
    }

    pub fn unit(mut self, unit: BitUnit) -> Self {
        self.unit = Some(unit);
        self
    }
    pub(crate) fn is_open_ended(&self) -> bool {
        self.end.is_none()
    }
}

impl WriteArgs for BitRange {
    fn write_args(&self, args: &mut CommandArgs) -> Result<()> {
        args.push(self.start);
        match self.end {
            Some(end) => {
                args.push(end);
            }
            None if self.unit.is_some() => {
                return Err(Error::Argument("BYTE/BIT requires an end offset".into()))
            }
            None => {}
        }
        match self.unit {
            Some(BitUnit::Byte) => {
                args.push("BYTE");
            }
            Some(BitUnit::Bit) => {
                args.push("BIT");
            }
            None => {}
        }
        Ok(())
    }
}
