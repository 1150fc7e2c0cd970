use crate::args::{cmd, CommandArgs, ScanArgs, ScoreBound, ToArg, ZAddArgs, ZRangeArgs, ZStoreArgs};
use crate::client::Client;
use crate::command::Command;
use crate::connection::Transport;
use crate::error::{Error, Result};
use crate::reply::{decode, FromReply, ScanResult, Tuple};
use crate::resp::RawReply;

/// `numkeys key…` followed by the combine options.
fn combine_args<K: ToArg>(
    command: Command,
    destination: Option<&dyn ToArg>,
    keys: impl IntoIterator<Item = K>,
    opts: &ZStoreArgs,
) -> Result<CommandArgs> {
    let mut args = cmd(command);
    if let Some(dest) = destination {
        args.push_key(dest.to_arg());
    }
    let keys: Vec<K> = keys.into_iter().collect();
    opts.check_key_count(keys.len())?;
    args.push(keys.len());
    args.push_keys(keys)?;
    args.opts(opts)
}

fn numkeys<K: ToArg>(command: Command, keys: impl IntoIterator<Item = K>) -> Result<CommandArgs> {
    let keys: Vec<K> = keys.into_iter().collect();
    let mut args = cmd(command).arg(keys.len());
    args.push_keys(keys)?;
    Ok(args)
}

fn min_max(mut args: CommandArgs, min: ScoreBound, max: ScoreBound) -> Result<CommandArgs> {
    args.push(min.to_token()?).push(max.to_token()?);
    Ok(args)
}

/// `[key, [[member, score], …]]` from `ZMPOP` / `BZMPOP`, nil when empty.
fn key_tuples<M: FromReply>(reply: RawReply) -> Result<Option<(String, Vec<Tuple<M>>)>> {
    match crate::reply::check(reply)? {
        RawReply::Null => Ok(None),
        other => {
            let (key, tuples) = <(String, RawReply)>::from_reply(other)?;
            Ok(Some((key, decode::tuples(tuples)?)))
        }
    }
}

impl<T: Transport> Client<T> {
    /// Add `(score, member)` pairs. Number of added (or with `CH`, changed)
    /// members.
    pub async fn zadd<M: ToArg>(
        &self,
        key: impl ToArg,
        members: impl IntoIterator<Item = (f64, M)>,
        opts: &ZAddArgs,
    ) -> Result<i64> {
        if opts.is_incr() {
            return Err(Error::Argument("use zadd_incr for ZADD INCR".into()));
        }
        let mut args = cmd(Command::ZAdd).key(key).opts(opts)?;
        let before = args.tokens().len();
        for (score, member) in members {
            args.push_double(score)?.push(member);
        }
        if args.tokens().len() == before {
            return Err(Error::Argument("ZADD requires at least one member".into()));
        }
        self.execute(args).await
    }

    /// `ZADD … INCR`: new score, or nil when a condition blocked it.
    pub async fn zadd_incr(&self, key: impl ToArg, delta: f64, member: impl ToArg, opts: &ZAddArgs) -> Result<Option<f64>> {
        let opts = opts.incr();
        let mut args = cmd(Command::ZAdd).key(key).opts(&opts)?;
        args.push_double(delta)?.push(member);
        self.execute(args).await
    }

    pub async fn zincr_by(&self, key: impl ToArg, delta: f64, member: impl ToArg) -> Result<f64> {
        self.execute(cmd(Command::ZIncrBy).key(key).double(delta)?.arg(member)).await
    }

    pub async fn zrem<M: ToArg>(&self, key: impl ToArg, members: impl IntoIterator<Item = M>) -> Result<i64> {
        let mut args = cmd(Command::ZRem).key(key);
        args.push_all(members)?;
        self.execute(args).await
    }

    pub async fn zcard(&self, key: impl ToArg) -> Result<i64> {
        self.execute(cmd(Command::ZCard).key(key)).await
    }

    pub async fn zcount(&self, key: impl ToArg, min: impl Into<ScoreBound>, max: impl Into<ScoreBound>) -> Result<i64> {
        self.execute(min_max(cmd(Command::ZCount).key(key), min.into(), max.into())?).await
    }

    pub async fn zlex_count(&self, key: impl ToArg, min: impl ToArg, max: impl ToArg) -> Result<i64> {
        self.execute(cmd(Command::ZLexCount).key(key).arg(min).arg(max)).await
    }

    pub async fn zscore(&self, key: impl ToArg, member: impl ToArg) -> Result<Option<f64>> {
        self.execute(cmd(Command::ZScore).key(key).arg(member)).await
    }

    pub async fn zmscore<M: ToArg>(&self, key: impl ToArg, members: impl IntoIterator<Item = M>) -> Result<Vec<Option<f64>>> {
        let mut args = cmd(Command::ZMScore).key(key);
        args.push_all(members)?;
        self.execute(args).await
    }

    pub async fn zrank(&self, key: impl ToArg, member: impl ToArg) -> Result<Option<i64>> {
        self.execute(cmd(Command::ZRank).key(key).arg(member)).await
    }

    pub async fn zrev_rank(&self, key: impl ToArg, member: impl ToArg) -> Result<Option<i64>> {
        self.execute(cmd(Command::ZRevRank).key(key).arg(member)).await
    }

    /// `ZRANGE` members only.
    pub async fn zrange<R: FromReply>(&self, key: impl ToArg, range: &ZRangeArgs) -> Result<Vec<R>> {
        self.execute(cmd(Command::ZRange).key(key).opts(range)?).await
    }

    /// `ZRANGE … WITHSCORES`, flat or nested reply.
    pub async fn zrange_with_scores<M: FromReply>(&self, key: impl ToArg, range: &ZRangeArgs) -> Result<Vec<Tuple<M>>> {
        if range.is_lex() {
            return Err(Error::Argument("WITHSCORES is not supported with BYLEX".into()));
        }
        let reply = self
            .call(cmd(Command::ZRange).key(key).opts(range)?.arg("WITHSCORES"))
            .await?;
        decode::tuples(reply)
    }

    pub async fn zrange_store(&self, destination: impl ToArg, source: impl ToArg, range: &ZRangeArgs) -> Result<i64> {
        self.execute(cmd(Command::ZRangeStore).key(destination).key(source).opts(range)?)
            .await
    }

    pub async fn zrev_range<R: FromReply>(&self, key: impl ToArg, start: i64, stop: i64) -> Result<Vec<R>> {
        self.execute(cmd(Command::ZRevRange).key(key).arg(start).arg(stop)).await
    }

    pub async fn zrange_by_score<R: FromReply>(
        &self,
        key: impl ToArg,
        min: impl Into<ScoreBound>,
        max: impl Into<ScoreBound>,
    ) -> Result<Vec<R>> {
        self.execute(min_max(cmd(Command::ZRangeByScore).key(key), min.into(), max.into())?)
            .await
    }

    /// `ZREVRANGEBYSCORE key max min`.
    pub async fn zrev_range_by_score<R: FromReply>(
        &self,
        key: impl ToArg,
        max: impl Into<ScoreBound>,
        min: impl Into<ScoreBound>,
    ) -> Result<Vec<R>> {
        self.execute(min_max(cmd(Command::ZRevRangeByScore).key(key), max.into(), min.into())?)
            .await
    }

    pub async fn zrange_by_lex<R: FromReply>(&self, key: impl ToArg, min: impl ToArg, max: impl ToArg) -> Result<Vec<R>> {
        self.execute(cmd(Command::ZRangeByLex).key(key).arg(min).arg(max)).await
    }

    pub async fn zrem_range_by_rank(&self, key: impl ToArg, start: i64, stop: i64) -> Result<i64> {
        self.execute(cmd(Command::ZRemRangeByRank).key(key).arg(start).arg(stop)).await
    }

    pub async fn zrem_range_by_score(
        &self,
        key: impl ToArg,
        min: impl Into<ScoreBound>,
        max: impl Into<ScoreBound>,
    ) -> Result<i64> {
        self.execute(min_max(cmd(Command::ZRemRangeByScore).key(key), min.into(), max.into())?)
            .await
    }

    pub async fn zrem_range_by_lex(&self, key: impl ToArg, min: impl ToArg, max: impl ToArg) -> Result<i64> {
        self.execute(cmd(Command::ZRemRangeByLex).key(key).arg(min).arg(max)).await
    }

    pub async fn zpop_min<M: FromReply>(&self, key: impl ToArg, count: Option<u64>) -> Result<Vec<Tuple<M>>> {
        let mut args = cmd(Command::ZPopMin).key(key);
        if let Some(count) = count {
            args.push(count);
        }
        decode::tuples(self.call(args).await?)
    }

    pub async fn zpop_max<M: FromReply>(&self, key: impl ToArg, count: Option<u64>) -> Result<Vec<Tuple<M>>> {
        let mut args = cmd(Command::ZPopMax).key(key);
        if let Some(count) = count {
            args.push(count);
        }
        decode::tuples(self.call(args).await?)
    }

    /// `BZPOPMIN`: `(key, tuple)` or nil on timeout.
    pub async fn bzpop_min<K: ToArg, M: FromReply>(
        &self,
        keys: impl IntoIterator<Item = K>,
        timeout_secs: f64,
    ) -> Result<Option<(String, Tuple<M>)>> {
        let mut args = cmd(Command::BZPopMin);
        args.push_keys(keys)?.push_double(timeout_secs)?;
        decode::key_tuple(self.call(args).await?)
    }

    pub async fn bzpop_max<K: ToArg, M: FromReply>(
        &self,
        keys: impl IntoIterator<Item = K>,
        timeout_secs: f64,
    ) -> Result<Option<(String, Tuple<M>)>> {
        let mut args = cmd(Command::BZPopMax);
        args.push_keys(keys)?.push_double(timeout_secs)?;
        decode::key_tuple(self.call(args).await?)
    }

    /// `ZMPOP numkeys key… MIN|MAX [COUNT n]`.
    pub async fn zmpop<K: ToArg, M: FromReply>(
        &self,
        keys: impl IntoIterator<Item = K>,
        max: bool,
        count: Option<u64>,
    ) -> Result<Option<(String, Vec<Tuple<M>>)>> {
        let mut args = numkeys(Command::ZMPop, keys)?;
        args.push(if max { "MAX" } else { "MIN" });
        if let Some(count) = count {
            args.push("COUNT").push(count);
        }
        key_tuples(self.call(args).await?)
    }

    pub async fn bzmpop<K: ToArg, M: FromReply>(
        &self,
        timeout_secs: f64,
        keys: impl IntoIterator<Item = K>,
        max: bool,
        count: Option<u64>,
    ) -> Result<Option<(String, Vec<Tuple<M>>)>> {
        let keys: Vec<K> = keys.into_iter().collect();
        let mut args = cmd(Command::BZMPop).double(timeout_secs)?.arg(keys.len());
        args.push_keys(keys)?;
        args.push(if max { "MAX" } else { "MIN" });
        if let Some(count) = count {
            args.push("COUNT").push(count);
        }
        key_tuples(self.call(args).await?)
    }

    pub async fn zrand_member<R: FromReply>(&self, key: impl ToArg, count: i64) -> Result<Vec<R>> {
        self.execute(cmd(Command::ZRandMember).key(key).arg(count)).await
    }

    pub async fn zrand_member_with_scores<M: FromReply>(&self, key: impl ToArg, count: i64) -> Result<Vec<Tuple<M>>> {
        let reply = self
            .call(cmd(Command::ZRandMember).key(key).arg(count).arg("WITHSCORES"))
            .await?;
        decode::tuples(reply)
    }

    pub async fn zunion<K: ToArg, R: FromReply>(&self, keys: impl IntoIterator<Item = K>, opts: &ZStoreArgs) -> Result<Vec<R>> {
        self.execute(combine_args(Command::ZUnion, None, keys, opts)?).await
    }

    pub async fn zunion_with_scores<K: ToArg, M: FromReply>(
        &self,
        keys: impl IntoIterator<Item = K>,
        opts: &ZStoreArgs,
    ) -> Result<Vec<Tuple<M>>> {
        let args = combine_args(Command::ZUnion, None, keys, opts)?.arg("WITHSCORES");
        decode::tuples(self.call(args).await?)
    }

    pub async fn zinter<K: ToArg, R: FromReply>(&self, keys: impl IntoIterator<Item = K>, opts: &ZStoreArgs) -> Result<Vec<R>> {
        self.execute(combine_args(Command::ZInter, None, keys, opts)?).await
    }

    pub async fn zinter_with_scores<K: ToArg, M: FromReply>(
        &self,
        keys: impl IntoIterator<Item = K>,
        opts: &ZStoreArgs,
    ) -> Result<Vec<Tuple<M>>> {
        let args = combine_args(Command::ZInter, None, keys, opts)?.arg("WITHSCORES");
        decode::tuples(self.call(args).await?)
    }

    pub async fn zunion_store<K: ToArg>(
        &self,
        destination: impl ToArg,
        keys: impl IntoIterator<Item = K>,
        opts: &ZStoreArgs,
    ) -> Result<i64> {
        self.execute(combine_args(Command::ZUnionStore, Some(&destination), keys, opts)?)
            .await
    }

    pub async fn zinter_store<K: ToArg>(
        &self,
        destination: impl ToArg,
        keys: impl IntoIterator<Item = K>,
        opts: &ZStoreArgs,
    ) -> Result<i64> {
        self.execute(combine_args(Command::ZInterStore, Some(&destination), keys, opts)?)
            .await
    }

    pub async fn zinter_card<K: ToArg>(&self, keys: impl IntoIterator<Item = K>, limit: Option<u64>) -> Result<i64> {
        let mut args = numkeys(Command::ZInterCard, keys)?;
        if let Some(limit) = limit {
            args.push("LIMIT").push(limit);
        }
        self.execute(args).await
    }

    pub async fn zdiff<K: ToArg, R: FromReply>(&self, keys: impl IntoIterator<Item = K>) -> Result<Vec<R>> {
        self.execute(numkeys(Command::ZDiff, keys)?).await
    }

    pub async fn zdiff_store<K: ToArg>(&self, destination: impl ToArg, keys: impl IntoIterator<Item = K>) -> Result<i64> {
        let keys: Vec<K> = keys.into_iter().collect();
        let mut args = cmd(Command::ZDiffStore).key(destination).arg(keys.len());
        args.push_keys(keys)?;
        self.execute(args).await
    }

    pub async fn zscan<M: FromReply>(
        &self,
        key: impl ToArg,
        cursor: impl ToArg,
        opts: &ScanArgs,
    ) -> Result<ScanResult<String, Tuple<M>>> {
        if opts.has_kind() {
            return Err(Error::Argument("ZSCAN does not accept TYPE".into()));
        }
        let reply = self.call(cmd(Command::ZScan).key(key).arg(cursor).opts(opts)?).await?;
        decode::scan_tuples(reply)
    }
}
