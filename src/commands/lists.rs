use crate::args::{cmd, CommandArgs, Direction, InsertPosition, LPosArgs, ToArg};
use crate::client::Client;
use crate::command::Command;
use crate::connection::Transport;
use crate::error::Result;
use crate::reply::{FromReply, Status};

/// Server-side timeout in seconds, as the double the blocking commands take.
fn push_timeout(args: &mut CommandArgs, timeout_secs: f64) -> Result<()> {
    args.push_double(timeout_secs)?;
    Ok(())
}

fn mpop_args<K: ToArg>(
    command: Command,
    timeout_secs: Option<f64>,
    keys: impl IntoIterator<Item = K>,
    direction: Direction,
    count: Option<u64>,
) -> Result<CommandArgs> {
    let mut args = cmd(command);
    if let Some(t) = timeout_secs {
        push_timeout(&mut args, t)?;
    }
    let keys: Vec<K> = keys.into_iter().collect();
    args.push(keys.len());
    args.push_keys(keys)?;
    args.push(direction);
    if let Some(count) = count {
        args.push("COUNT").push(count);
    }
    Ok(args)
}

impl<T: Transport> Client<T> {
    pub async fn lpush<V: ToArg>(&self, key: impl ToArg, values: impl IntoIterator<Item = V>) -> Result<i64> {
        let mut args = cmd(Command::LPush).key(key);
        args.push_all(values)?;
        self.execute(args).await
    }

    pub async fn rpush<V: ToArg>(&self, key: impl ToArg, values: impl IntoIterator<Item = V>) -> Result<i64> {
        let mut args = cmd(Command::RPush).key(key);
        args.push_all(values)?;
        self.execute(args).await
    }

    pub async fn lpush_x<V: ToArg>(&self, key: impl ToArg, values: impl IntoIterator<Item = V>) -> Result<i64> {
        let mut args = cmd(Command::LPushX).key(key);
        args.push_all(values)?;
        self.execute(args).await
    }

    pub async fn rpush_x<V: ToArg>(&self, key: impl ToArg, values: impl IntoIterator<Item = V>) -> Result<i64> {
        let mut args = cmd(Command::RPushX).key(key);
        args.push_all(values)?;
        self.execute(args).await
    }

    pub async fn lpop<R: FromReply>(&self, key: impl ToArg) -> Result<Option<R>> {
        self.execute(cmd(Command::LPop).key(key)).await
    }

    /// `LPOP key count`; nil when the list does not exist.
    pub async fn lpop_count<R: FromReply>(&self, key: impl ToArg, count: u64) -> Result<Option<Vec<R>>> {
        self.execute(cmd(Command::LPop).key(key).arg(count)).await
    }

    pub async fn rpop<R: FromReply>(&self, key: impl ToArg) -> Result<Option<R>> {
        self.execute(cmd(Command::RPop).key(key)).await
    }

    pub async fn rpop_count<R: FromReply>(&self, key: impl ToArg, count: u64) -> Result<Option<Vec<R>>> {
        self.execute(cmd(Command::RPop).key(key).arg(count)).await
    }

    pub async fn llen(&self, key: impl ToArg) -> Result<i64> {
        self.execute(cmd(Command::LLen).key(key)).await
    }

    pub async fn lrange<R: FromReply>(&self, key: impl ToArg, start: i64, stop: i64) -> Result<Vec<R>> {
        self.execute(cmd(Command::LRange).key(key).arg(start).arg(stop)).await
    }

    pub async fn lindex<R: FromReply>(&self, key: impl ToArg, index: i64) -> Result<Option<R>> {
        self.execute(cmd(Command::LIndex).key(key).arg(index)).await
    }

    pub async fn lset(&self, key: impl ToArg, index: i64, value: impl ToArg) -> Result<Status> {
        self.execute(cmd(Command::LSet).key(key).arg(index).arg(value)).await
    }

    /// New length, `-1` when the pivot was not found.
    pub async fn linsert(
        &self,
        key: impl ToArg,
        position: InsertPosition,
        pivot: impl ToArg,
        value: impl ToArg,
    ) -> Result<i64> {
        self.execute(cmd(Command::LInsert).key(key).arg(position).arg(pivot).arg(value)).await
    }

    pub async fn lrem(&self, key: impl ToArg, count: i64, value: impl ToArg) -> Result<i64> {
        self.execute(cmd(Command::LRem).key(key).arg(count).arg(value)).await
    }

    pub async fn ltrim(&self, key: impl ToArg, start: i64, stop: i64) -> Result<Status> {
        self.execute(cmd(Command::LTrim).key(key).arg(start).arg(stop)).await
    }

    pub async fn lpos(&self, key: impl ToArg, element: impl ToArg, opts: &LPosArgs) -> Result<Option<i64>> {
        self.execute(cmd(Command::LPos).key(key).arg(element).opts(opts)?).await
    }

    /// `LPOS … COUNT n`: every matching index.
    pub async fn lpos_all(&self, key: impl ToArg, element: impl ToArg, count: u64, opts: &LPosArgs) -> Result<Vec<i64>> {
        let opts = opts.count(count);
        self.execute(cmd(Command::LPos).key(key).arg(element).opts(&opts)?).await
    }

    pub async fn lmove<R: FromReply>(
        &self,
        source: impl ToArg,
        destination: impl ToArg,
        from: Direction,
        to: Direction,
    ) -> Result<Option<R>> {
        self.execute(cmd(Command::LMove).key(source).key(destination).arg(from).arg(to)).await
    }

    pub async fn rpoplpush<R: FromReply>(&self, source: impl ToArg, destination: impl ToArg) -> Result<Option<R>> {
        self.execute(cmd(Command::RPopLPush).key(source).key(destination)).await
    }

    /// `LMPOP`: the key popped from and its elements, or nil.
    pub async fn lmpop<K: ToArg, R: FromReply>(
        &self,
        keys: impl IntoIterator<Item = K>,
        direction: Direction,
        count: Option<u64>,
    ) -> Result<Option<(String, Vec<R>)>> {
        self.execute(mpop_args(Command::LMPop, None, keys, direction, count)?).await
    }

    /// `BLPOP`; `timeout_secs` of 0 blocks forever. Nil on timeout.
    pub async fn blpop<K: ToArg, R: FromReply>(
        &self,
        keys: impl IntoIterator<Item = K>,
        timeout_secs: f64,
    ) -> Result<Option<(String, R)>> {
        let mut args = cmd(Command::BLPop);
        args.push_keys(keys)?;
        push_timeout(&mut args, timeout_secs)?;
        self.execute(args).await
    }

    pub async fn brpop<K: ToArg, R: FromReply>(
        &self,
        keys: impl IntoIterator<Item = K>,
        timeout_secs: f64,
    ) -> Result<Option<(String, R)>> {
        let mut args = cmd(Command::BRPop);
        args.push_keys(keys)?;
        push_timeout(&mut args, timeout_secs)?;
        self.execute(args).await
    }

    pub async fn blmove<R: FromReply>(
        &self,
        source: impl ToArg,
        destination: impl ToArg,
        from: Direction,
        to: Direction,
        timeout_secs: f64,
    ) -> Result<Option<R>> {
        let mut args = cmd(Command::BLMove).key(source).key(destination).arg(from).arg(to);
        push_timeout(&mut args, timeout_secs)?;
        self.execute(args).await
    }

    pub async fn brpoplpush<R: FromReply>(
        &self,
        source: impl ToArg,
        destination: impl ToArg,
        timeout_secs: f64,
    ) -> Result<Option<R>> {
        let mut args = cmd(Command::BRPopLPush).key(source).key(destination);
        push_timeout(&mut args, timeout_secs)?;
        self.execute(args).await
    }

    pub async fn blmpop<K: ToArg, R: FromReply>(
        &self,
        timeout_secs: f64,
        keys: impl IntoIterator<Item = K>,
        direction: Direction,
        count: Option<u64>,
    ) -> Result<Option<(String, Vec<R>)>> {
        self.execute(mpop_args(Command::BLMPop, Some(timeout_secs), keys, direction, count)?)
            .await
    }
}
