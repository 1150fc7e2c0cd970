use crate::args::{cmd, CommandArgs, ScanArgs, ToArg};
use crate::client::Client;
use crate::command::Command;
use crate::connection::Transport;
use crate::error::{Error, Result};
use crate::reply::{decode, FromReply, ScanResult};

fn keyed<K: ToArg>(command: Command, keys: impl IntoIterator<Item = K>) -> Result<CommandArgs> {
    let mut args = cmd(command);
    args.push_keys(keys)?;
    Ok(args)
}

fn store<K: ToArg>(command: Command, destination: impl ToArg, keys: impl IntoIterator<Item = K>) -> Result<CommandArgs> {
    let mut args = cmd(command).key(destination);
    args.push_keys(keys)?;
    Ok(args)
}

impl<T: Transport> Client<T> {
    pub async fn sadd<M: ToArg>(&self, key: impl ToArg, members: impl IntoIterator<Item = M>) -> Result<i64> {
        let mut args = cmd(Command::SAdd).key(key);
        args.push_all(members)?;
        self.execute(args).await
    }

    pub async fn srem<M: ToArg>(&self, key: impl ToArg, members: impl IntoIterator<Item = M>) -> Result<i64> {
        let mut args = cmd(Command::SRem).key(key);
        args.push_all(members)?;
        self.execute(args).await
    }

    pub async fn smembers<R: FromReply>(&self, key: impl ToArg) -> Result<Vec<R>> {
        self.execute(cmd(Command::SMembers).key(key)).await
    }

    pub async fn scard(&self, key: impl ToArg) -> Result<i64> {
        self.execute(cmd(Command::SCard).key(key)).await
    }

    pub async fn sismember(&self, key: impl ToArg, member: impl ToArg) -> Result<bool> {
        self.execute(cmd(Command::SIsMember).key(key).arg(member)).await
    }

    pub async fn smismember<M: ToArg>(&self, key: impl ToArg, members: impl IntoIterator<Item = M>) -> Result<Vec<bool>> {
        let mut args = cmd(Command::SMIsMember).key(key);
        args.push_all(members)?;
        self.execute(args).await
    }

    pub async fn smove(&self, source: impl ToArg, destination: impl ToArg, member: impl ToArg) -> Result<bool> {
        self.execute(cmd(Command::SMove).key(source).key(destination).arg(member)).await
    }

    pub async fn spop<R: FromReply>(&self, key: impl ToArg) -> Result<Option<R>> {
        self.execute(cmd(Command::SPop).key(key)).await
    }

    pub async fn spop_count<R: FromReply>(&self, key: impl ToArg, count: u64) -> Result<Vec<R>> {
        self.execute(cmd(Command::SPop).key(key).arg(count)).await
    }

    pub async fn srand_member<R: FromReply>(&self, key: impl ToArg) -> Result<Option<R>> {
        self.execute(cmd(Command::SRandMember).key(key)).await
    }

    /// Negative `count` allows repeated members.
    pub async fn srand_member_count<R: FromReply>(&self, key: impl ToArg, count: i64) -> Result<Vec<R>> {
        self.execute(cmd(Command::SRandMember).key(key).arg(count)).await
    }

    pub async fn sdiff<K: ToArg, R: FromReply>(&self, keys: impl IntoIterator<Item = K>) -> Result<Vec<R>> {
        self.execute(keyed(Command::SDiff, keys)?).await
    }

    pub async fn sinter<K: ToArg, R: FromReply>(&self, keys: impl IntoIterator<Item = K>) -> Result<Vec<R>> {
        self.execute(keyed(Command::SInter, keys)?).await
    }

    pub async fn sunion<K: ToArg, R: FromReply>(&self, keys: impl IntoIterator<Item = K>) -> Result<Vec<R>> {
        self.execute(keyed(Command::SUnion, keys)?).await
    }

    pub async fn sdiff_store<K: ToArg>(&self, destination: impl ToArg, keys: impl IntoIterator<Item = K>) -> Result<i64> {
        self.execute(store(Command::SDiffStore, destination, keys)?).await
    }

    pub async fn sinter_store<K: ToArg>(&self, destination: impl ToArg, keys: impl IntoIterator<Item = K>) -> Result<i64> {
        self.execute(store(Command::SInterStore, destination, keys)?).await
    }

    pub async fn sunion_store<K: ToArg>(&self, destination: impl ToArg, keys: impl IntoIterator<Item = K>) -> Result<i64> {
        self.execute(store(Command::SUnionStore, destination, keys)?).await
    }

    /// `SINTERCARD numkeys key… [LIMIT n]`.
    pub async fn sinter_card<K: ToArg>(&self, keys: impl IntoIterator<Item = K>, limit: Option<u64>) -> Result<i64> {
        let keys: Vec<K> = keys.into_iter().collect();
        let mut args = cmd(Command::SInterCard).arg(keys.len());
        args.push_keys(keys)?;
        if let Some(limit) = limit {
            args.push("LIMIT").push(limit);
        }
        self.execute(args).await
    }

    pub async fn sscan<R: FromReply>(
        &self,
        key: impl ToArg,
        cursor: impl ToArg,
        opts: &ScanArgs,
    ) -> Result<ScanResult<String, R>> {
        if opts.has_kind() {
            return Err(Error::Argument("SSCAN does not accept TYPE".into()));
        }
        let reply = self.call(cmd(Command::SScan).key(key).arg(cursor).opts(opts)?).await?;
        decode::scan(reply)
    }
}
