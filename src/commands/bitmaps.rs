use crate::args::{cmd, BitFieldArgs, BitOp, BitRange, ToArg};
use crate::client::Client;
use crate::command::Command;
use crate::connection::Transport;
use crate::error::{Error, Result};
use crate::reply::decode;

impl<T: Transport> Client<T> {
    /// Previous bit value.
    pub async fn setbit(&self, key: impl ToArg, offset: u64, value: bool) -> Result<bool> {
        self.execute(cmd(Command::SetBit).key(key).arg(offset).arg(value)).await
    }

    pub async fn getbit(&self, key: impl ToArg, offset: u64) -> Result<bool> {
        self.execute(cmd(Command::GetBit).key(key).arg(offset)).await
    }

    pub async fn bitcount(&self, key: impl ToArg, range: Option<BitRange>) -> Result<i64> {
        let args = cmd(Command::BitCount).key(key);
        let args = match range {
            Some(r) if r.is_open_ended() => {
                return Err(Error::Argument("BITCOUNT requires both start and end".into()))
            }
            Some(r) => args.opts(&r)?,
            None => args,
        };
        self.execute(args).await
    }

    /// Position of the first `bit`, `-1` when not found.
    pub async fn bitpos(&self, key: impl ToArg, bit: bool, range: Option<BitRange>) -> Result<i64> {
        let args = cmd(Command::BitPos).key(key).arg(bit);
        let args = match range {
            Some(r) => args.opts(&r)?,
            None => args,
        };
        self.execute(args).await
    }

    /// Length of the string stored in `destination`.
    pub async fn bitop<K: ToArg>(&self, op: BitOp, destination: impl ToArg, keys: impl IntoIterator<Item = K>) -> Result<i64> {
        let keys: Vec<K> = keys.into_iter().collect();
        if op == BitOp::Not && keys.len() != 1 {
            return Err(Error::Argument("BITOP NOT takes exactly one source key".into()));
        }
        let mut args = cmd(Command::BitOp).arg(op.as_str()).key(destination);
        args.push_keys(keys)?;
        self.execute(args).await
    }

    /// One entry per `GET`/`SET`/`INCRBY`; nil where `OVERFLOW FAIL` applied.
    pub async fn bitfield(&self, key: impl ToArg, ops: &BitFieldArgs) -> Result<Vec<Option<i64>>> {
        let reply = self.call(cmd(Command::BitField).key(key).opts(ops)?).await?;
        decode::bitfield(reply, ops.reply_len())
    }

    pub async fn bitfield_ro(&self, key: impl ToArg, ops: &BitFieldArgs) -> Result<Vec<Option<i64>>> {
        if !ops.is_read_only() {
            return Err(Error::Argument("BITFIELD_RO accepts only GET operations".into()));
        }
        let reply = self.call(cmd(Command::BitFieldRo).key(key).opts(ops)?).await?;
        decode::bitfield(reply, ops.reply_len())
    }
}
