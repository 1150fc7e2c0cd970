use crate::args::{cmd, CommandArgs, ExpireCondition, MigrateArgs, RestoreArgs, ScanArgs, SortArgs, ToArg};
use crate::client::Client;
use crate::command::Command;
use crate::connection::Transport;
use crate::error::{Error, Result};
use crate::reply::{decode, FromReply, ScanResult, Status};

fn multi_key<K: ToArg>(command: Command, keys: impl IntoIterator<Item = K>) -> Result<CommandArgs> {
    let mut args = cmd(command);
    args.push_keys(keys)?;
    Ok(args)
}

fn expire_args(
    command: Command,
    key: impl ToArg,
    amount: u64,
    condition: Option<ExpireCondition>,
) -> Result<CommandArgs> {
    let args = cmd(command).key(key).arg(amount);
    match condition {
        Some(c) => args.opts(&c),
        None => Ok(args),
    }
}

impl<T: Transport> Client<T> {
    /// Number of keys removed.
    pub async fn del<K: ToArg>(&self, keys: impl IntoIterator<Item = K>) -> Result<i64> {
        self.execute(multi_key(Command::Del, keys)?).await
    }

    pub async fn unlink<K: ToArg>(&self, keys: impl IntoIterator<Item = K>) -> Result<i64> {
        self.execute(multi_key(Command::Unlink, keys)?).await
    }

    /// Number of the given keys that exist, counting repeats.
    pub async fn exists<K: ToArg>(&self, keys: impl IntoIterator<Item = K>) -> Result<i64> {
        self.execute(multi_key(Command::Exists, keys)?).await
    }

    pub async fn touch<K: ToArg>(&self, keys: impl IntoIterator<Item = K>) -> Result<i64> {
        self.execute(multi_key(Command::Touch, keys)?).await
    }

    pub async fn expire(&self, key: impl ToArg, seconds: u64, condition: Option<ExpireCondition>) -> Result<bool> {
        self.execute(expire_args(Command::Expire, key, seconds, condition)?).await
    }

    pub async fn pexpire(&self, key: impl ToArg, millis: u64, condition: Option<ExpireCondition>) -> Result<bool> {
        self.execute(expire_args(Command::PExpire, key, millis, condition)?).await
    }

    pub async fn expire_at(&self, key: impl ToArg, unix_secs: u64, condition: Option<ExpireCondition>) -> Result<bool> {
        self.execute(expire_args(Command::ExpireAt, key, unix_secs, condition)?).await
    }

    pub async fn pexpire_at(
        &self,
        key: impl ToArg,
        unix_millis: u64,
        condition: Option<ExpireCondition>,
    ) -> Result<bool> {
        self.execute(expire_args(Command::PExpireAt, key, unix_millis, condition)?).await
    }

    /// Absolute expiry in seconds; `-1` no expiry, `-2` no key.
    pub async fn expire_time(&self, key: impl ToArg) -> Result<i64> {
        self.execute(cmd(Command::ExpireTime).key(key)).await
    }

    pub async fn pexpire_time(&self, key: impl ToArg) -> Result<i64> {
        self.execute(cmd(Command::PExpireTime).key(key)).await
    }

    pub async fn ttl(&self, key: impl ToArg) -> Result<i64> {
        self.execute(cmd(Command::Ttl).key(key)).await
    }

    pub async fn pttl(&self, key: impl ToArg) -> Result<i64> {
        self.execute(cmd(Command::PTtl).key(key)).await
    }

    pub async fn persist(&self, key: impl ToArg) -> Result<bool> {
        self.execute(cmd(Command::Persist).key(key)).await
    }

    /// Type name, `"none"` for a missing key.
    pub async fn key_type(&self, key: impl ToArg) -> Result<String> {
        self.execute(cmd(Command::Type).key(key)).await
    }

    pub async fn rename(&self, key: impl ToArg, new_key: impl ToArg) -> Result<Status> {
        self.execute(cmd(Command::Rename).key(key).key(new_key)).await
    }

    pub async fn rename_nx(&self, key: impl ToArg, new_key: impl ToArg) -> Result<bool> {
        self.execute(cmd(Command::RenameNx).key(key).key(new_key)).await
    }

    pub async fn copy(&self, source: impl ToArg, destination: impl ToArg, replace: bool) -> Result<bool> {
        let mut args = cmd(Command::Copy).key(source).key(destination);
        if replace {
            args.push("REPLACE");
        }
        self.execute(args).await
    }

    /// Move a key to another database (standalone only).
    pub async fn move_key(&self, key: impl ToArg, db: u32) -> Result<bool> {
        self.execute(cmd(Command::Move).key(key).arg(db)).await
    }

    pub async fn keys<R: FromReply>(&self, pattern: impl ToArg) -> Result<Vec<R>> {
        self.execute(cmd(Command::Keys).arg(pattern)).await
    }

    pub async fn random_key<R: FromReply>(&self) -> Result<Option<R>> {
        self.execute(cmd(Command::RandomKey)).await
    }

    /// One page of `SCAN`. Pass the returned [`ScanResult`] (or its
    /// `next_cursor`) back as the cursor to continue.
    pub async fn scan<R: FromReply>(&self, cursor: impl ToArg, opts: &ScanArgs) -> Result<ScanResult<String, R>> {
        let reply = self.call(cmd(Command::Scan).arg(cursor).opts(opts)?).await?;
        decode::scan(reply)
    }

    pub async fn dump(&self, key: impl ToArg) -> Result<Option<bytes::Bytes>> {
        self.execute(cmd(Command::Dump).key(key)).await
    }

    pub async fn restore(
        &self,
        key: impl ToArg,
        ttl_ms: u64,
        serialized: impl ToArg,
        opts: &RestoreArgs,
    ) -> Result<Status> {
        self.execute(cmd(Command::Restore).key(key).arg(ttl_ms).arg(serialized).opts(opts)?)
            .await
    }

    /// `OK`, or `NOKEY` when none of the keys existed.
    pub async fn migrate(&self, opts: &MigrateArgs) -> Result<String> {
        self.execute(cmd(Command::Migrate).opts(opts)?).await
    }

    pub async fn object_encoding(&self, key: impl ToArg) -> Result<Option<String>> {
        self.execute(CommandArgs::with_sub(Command::Object, "ENCODING")?.key(key)).await
    }

    pub async fn object_idle_time(&self, key: impl ToArg) -> Result<Option<i64>> {
        self.execute(CommandArgs::with_sub(Command::Object, "IDLETIME")?.key(key)).await
    }

    pub async fn object_freq(&self, key: impl ToArg) -> Result<Option<i64>> {
        self.execute(CommandArgs::with_sub(Command::Object, "FREQ")?.key(key)).await
    }

    pub async fn object_refcount(&self, key: impl ToArg) -> Result<Option<i64>> {
        self.execute(CommandArgs::with_sub(Command::Object, "REFCOUNT")?.key(key)).await
    }

    /// `SORT`; with `STORE` the reply is the stored length, so decode as `i64`.
    pub async fn sort<R: FromReply>(&self, key: impl ToArg, opts: &SortArgs) -> Result<R> {
        self.execute(cmd(Command::Sort).key(key).opts(opts)?).await
    }

    pub async fn sort_ro<R: FromReply>(&self, key: impl ToArg, opts: &SortArgs) -> Result<Vec<R>> {
        if opts.stores() {
            return Err(Error::Argument("SORT_RO does not accept STORE".into()));
        }
        self.execute(cmd(Command::SortRo).key(key).opts(opts)?).await
    }
}
