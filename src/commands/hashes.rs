use crate::args::{cmd, ScanArgs, ToArg};
use crate::client::Client;
use crate::command::Command;
use crate::connection::Transport;
use crate::error::{Error, Result};
use crate::reply::{decode, FromReply, ScanResult, Status};
use crate::resp::RawReply;
use std::collections::HashMap;
use std::hash::Hash;

impl<T: Transport> Client<T> {
    pub async fn hget<R: FromReply>(&self, key: impl ToArg, field: impl ToArg) -> Result<Option<R>> {
        self.execute(cmd(Command::HGet).key(key).arg(field)).await
    }

    /// Number of fields that were added (not updated).
    pub async fn hset<F: ToArg, V: ToArg>(
        &self,
        key: impl ToArg,
        pairs: impl IntoIterator<Item = (F, V)>,
    ) -> Result<i64> {
        let mut args = cmd(Command::HSet).key(key);
        let before = args.tokens().len();
        for (f, v) in pairs {
            args.push(f).push(v);
        }
        if args.tokens().len() == before {
            return Err(Error::Argument("HSET requires at least one field".into()));
        }
        self.execute(args).await
    }

    pub async fn hset_nx(&self, key: impl ToArg, field: impl ToArg, value: impl ToArg) -> Result<bool> {
        self.execute(cmd(Command::HSetNx).key(key).arg(field).arg(value)).await
    }

    pub async fn hmset<F: ToArg, V: ToArg>(
        &self,
        key: impl ToArg,
        pairs: impl IntoIterator<Item = (F, V)>,
    ) -> Result<Status> {
        let mut args = cmd(Command::HMSet).key(key);
        let before = args.tokens().len();
        for (f, v) in pairs {
            args.push(f).push(v);
        }
        if args.tokens().len() == before {
            return Err(Error::Argument("HMSET requires at least one field".into()));
        }
        self.execute(args).await
    }

    pub async fn hmget<F: ToArg, R: FromReply>(
        &self,
        key: impl ToArg,
        fields: impl IntoIterator<Item = F>,
    ) -> Result<Vec<Option<R>>> {
        let mut args = cmd(Command::HMGet).key(key);
        args.push_all(fields)?;
        self.execute(args).await
    }

    /// All fields and values, from a flat array or a RESP3 map.
    pub async fn hgetall<K, V>(&self, key: impl ToArg) -> Result<HashMap<K, V>>
    where
        K: FromReply + Eq + Hash,
        V: FromReply,
    {
        self.execute(cmd(Command::HGetAll).key(key)).await
    }

    pub async fn hdel<F: ToArg>(&self, key: impl ToArg, fields: impl IntoIterator<Item = F>) -> Result<i64> {
        let mut args = cmd(Command::HDel).key(key);
        args.push_all(fields)?;
        self.execute(args).await
    }

    pub async fn hexists(&self, key: impl ToArg, field: impl ToArg) -> Result<bool> {
        self.execute(cmd(Command::HExists).key(key).arg(field)).await
    }

    pub async fn hlen(&self, key: impl ToArg) -> Result<i64> {
        self.execute(cmd(Command::HLen).key(key)).await
    }

    pub async fn hstrlen(&self, key: impl ToArg, field: impl ToArg) -> Result<i64> {
        self.execute(cmd(Command::HStrLen).key(key).arg(field)).await
    }

    pub async fn hkeys<R: FromReply>(&self, key: impl ToArg) -> Result<Vec<R>> {
        self.execute(cmd(Command::HKeys).key(key)).await
    }

    pub async fn hvals<R: FromReply>(&self, key: impl ToArg) -> Result<Vec<R>> {
        self.execute(cmd(Command::HVals).key(key)).await
    }

    pub async fn hincr_by(&self, key: impl ToArg, field: impl ToArg, delta: i64) -> Result<i64> {
        self.execute(cmd(Command::HIncrBy).key(key).arg(field).arg(delta)).await
    }

    pub async fn hincr_by_float(&self, key: impl ToArg, field: impl ToArg, delta: f64) -> Result<f64> {
        self.execute(cmd(Command::HIncrByFloat).key(key).arg(field).double(delta)?).await
    }

    /// `HRANDFIELD key count`; a negative count allows repeats.
    pub async fn hrand_field<R: FromReply>(&self, key: impl ToArg, count: i64) -> Result<Vec<R>> {
        self.execute(cmd(Command::HRandField).key(key).arg(count)).await
    }

    pub async fn hrand_field_with_values<F: FromReply, V: FromReply>(
        &self,
        key: impl ToArg,
        count: i64,
    ) -> Result<Vec<(F, V)>> {
        let reply = self
            .call(cmd(Command::HRandField).key(key).arg(count).arg("WITHVALUES"))
            .await?;
        match reply {
            // RESP3 nests each pair
            RawReply::Array(items) if matches!(items.first(), Some(RawReply::Array(_))) => {
                items.into_iter().map(<(F, V)>::from_reply).collect()
            }
            other => decode::pairs(other),
        }
    }

    pub async fn hscan<F: FromReply, V: FromReply>(
        &self,
        key: impl ToArg,
        cursor: impl ToArg,
        opts: &ScanArgs,
    ) -> Result<ScanResult<String, (F, V)>> {
        if opts.has_kind() {
            return Err(Error::Argument("HSCAN does not accept TYPE".into()));
        }
        let reply = self.call(cmd(Command::HScan).key(key).arg(cursor).opts(opts)?).await?;
        decode::scan_pairs(reply)
    }
}
