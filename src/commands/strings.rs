use crate::args::{cmd, GetExArgs, SetArgs, ToArg};
use crate::client::Client;
use crate::command::Command;
use crate::connection::Transport;
use crate::error::{Error, Result};
use crate::reply::{FromReply, Status};

impl<T: Transport> Client<T> {
    pub async fn get<R: FromReply>(&self, key: impl ToArg) -> Result<Option<R>> {
        self.execute(cmd(Command::Get).key(key)).await
    }

    pub async fn set(&self, key: impl ToArg, value: impl ToArg) -> Result<Status> {
        self.execute(cmd(Command::Set).key(key).arg(value)).await
    }

    /// `SET` with options. Decode as [`Status`] (nil when `NX`/`XX` did not
    /// apply) or as `Option<V>` when `GET` was requested.
    pub async fn set_with<R: FromReply>(&self, key: impl ToArg, value: impl ToArg, opts: &SetArgs) -> Result<R> {
        self.execute(cmd(Command::Set).key(key).arg(value).opts(opts)?).await
    }

    pub async fn set_nx(&self, key: impl ToArg, value: impl ToArg) -> Result<bool> {
        self.execute(cmd(Command::SetNx).key(key).arg(value)).await
    }

    pub async fn set_ex(&self, key: impl ToArg, seconds: u64, value: impl ToArg) -> Result<Status> {
        self.execute(cmd(Command::SetEx).key(key).arg(seconds).arg(value)).await
    }

    pub async fn pset_ex(&self, key: impl ToArg, millis: u64, value: impl ToArg) -> Result<Status> {
        self.execute(cmd(Command::PSetEx).key(key).arg(millis).arg(value)).await
    }

    pub async fn get_set<R: FromReply>(&self, key: impl ToArg, value: impl ToArg) -> Result<Option<R>> {
        self.execute(cmd(Command::GetSet).key(key).arg(value)).await
    }

    pub async fn get_del<R: FromReply>(&self, key: impl ToArg) -> Result<Option<R>> {
        self.execute(cmd(Command::GetDel).key(key)).await
    }

    pub async fn get_ex<R: FromReply>(&self, key: impl ToArg, opts: &GetExArgs) -> Result<Option<R>> {
        self.execute(cmd(Command::GetEx).key(key).opts(opts)?).await
    }

    pub async fn get_range<R: FromReply>(&self, key: impl ToArg, start: i64, end: i64) -> Result<R> {
        self.execute(cmd(Command::GetRange).key(key).arg(start).arg(end)).await
    }

    pub async fn set_range(&self, key: impl ToArg, offset: u64, value: impl ToArg) -> Result<i64> {
        self.execute(cmd(Command::SetRange).key(key).arg(offset).arg(value)).await
    }

    pub async fn append(&self, key: impl ToArg, value: impl ToArg) -> Result<i64> {
        self.execute(cmd(Command::Append).key(key).arg(value)).await
    }

    pub async fn strlen(&self, key: impl ToArg) -> Result<i64> {
        self.execute(cmd(Command::StrLen).key(key)).await
    }

    pub async fn incr(&self, key: impl ToArg) -> Result<i64> {
        self.execute(cmd(Command::Incr).key(key)).await
    }

    pub async fn incr_by(&self, key: impl ToArg, delta: i64) -> Result<i64> {
        self.execute(cmd(Command::IncrBy).key(key).arg(delta)).await
    }

    pub async fn incr_by_float(&self, key: impl ToArg, delta: f64) -> Result<f64> {
        self.execute(cmd(Command::IncrByFloat).key(key).double(delta)?).await
    }

    pub async fn decr(&self, key: impl ToArg) -> Result<i64> {
        self.execute(cmd(Command::Decr).key(key)).await
    }

    pub async fn decr_by(&self, key: impl ToArg, delta: i64) -> Result<i64> {
        self.execute(cmd(Command::DecrBy).key(key).arg(delta)).await
    }

    /// Values in key order; missing keys are `None`.
    pub async fn mget<K: ToArg, R: FromReply>(&self, keys: impl IntoIterator<Item = K>) -> Result<Vec<Option<R>>> {
        let mut args = cmd(Command::MGet);
        args.push_keys(keys)?;
        self.execute(args).await
    }

    pub async fn mset<K: ToArg, V: ToArg>(&self, pairs: impl IntoIterator<Item = (K, V)>) -> Result<Status> {
        self.execute(key_value_args(Command::MSet, pairs)?).await
    }

    /// `true` only if every key was set.
    pub async fn mset_nx<K: ToArg, V: ToArg>(&self, pairs: impl IntoIterator<Item = (K, V)>) -> Result<bool> {
        self.execute(key_value_args(Command::MSetNx, pairs)?).await
    }

    pub async fn lcs<R: FromReply>(&self, key1: impl ToArg, key2: impl ToArg) -> Result<R> {
        self.execute(cmd(Command::Lcs).key(key1).key(key2)).await
    }

    pub async fn lcs_len(&self, key1: impl ToArg, key2: impl ToArg) -> Result<i64> {
        self.execute(cmd(Command::Lcs).key(key1).key(key2).arg("LEN")).await
    }
}

/// `CMD k1 v1 k2 v2 …`, rejecting an empty list.
pub(crate) fn key_value_args<K: ToArg, V: ToArg>(
    command: Command,
    pairs: impl IntoIterator<Item = (K, V)>,
) -> Result<crate::args::CommandArgs> {
    let mut args = cmd(command);
    for (k, v) in pairs {
        args.push_key(k).push(v);
    }
    if !args.has_keys() {
        return Err(Error::Argument(format!("{} requires at least one pair", command.name())));
    }
    Ok(args)
}
