use crate::args::{cmd, CommandArgs, ToArg, XAddArgs, XClaimArgs, XPendingArgs, XReadArgs, XReadGroupArgs, XTrimArgs};
use crate::client::Client;
use crate::command::Command;
use crate::connection::Transport;
use crate::error::{Error, Result};
use crate::reply::{decode, FromReply, PendingEntry, PendingSummary, Status, StreamEntry, StreamId, StreamReadReply};
use crate::resp::RawReply;
use std::collections::HashMap;

/// `STREAMS key… id…`; every stream name is a routing key.
fn push_streams<K: ToArg, I: ToArg>(args: &mut CommandArgs, streams: impl IntoIterator<Item = (K, I)>) -> Result<()> {
    let (keys, ids): (Vec<K>, Vec<I>) = streams.into_iter().unzip();
    if keys.is_empty() {
        return Err(Error::Argument(format!("{} requires at least one stream", args.name())));
    }
    args.push("STREAMS");
    args.push_keys(keys)?;
    args.push_all(ids)?;
    Ok(())
}

fn range_args(command: Command, key: impl ToArg, start: impl ToArg, end: impl ToArg, count: Option<u64>) -> CommandArgs {
    let mut args = cmd(command).key(key).arg(start).arg(end);
    if let Some(count) = count {
        args.push("COUNT").push(count);
    }
    args
}

impl<T: Transport> Client<T> {
    /// Append an entry. The new id, or nil when `NOMKSTREAM` found no stream.
    pub async fn xadd<F: ToArg, V: ToArg>(
        &self,
        key: impl ToArg,
        fields: impl IntoIterator<Item = (F, V)>,
        opts: &XAddArgs,
    ) -> Result<Option<StreamId>> {
        let mut args = cmd(Command::XAdd).key(key).opts(opts)?;
        let before = args.tokens().len();
        for (f, v) in fields {
            args.push(f).push(v);
        }
        if args.tokens().len() == before {
            return Err(Error::Argument("XADD requires at least one field".into()));
        }
        self.execute(args).await
    }

    pub async fn xlen(&self, key: impl ToArg) -> Result<i64> {
        self.execute(cmd(Command::XLen).key(key)).await
    }

    /// Entries between `start` and `end` inclusive (`-` and `+` for the ends).
    pub async fn xrange<F: FromReply, V: FromReply>(
        &self,
        key: impl ToArg,
        start: impl ToArg,
        end: impl ToArg,
        count: Option<u64>,
    ) -> Result<Vec<StreamEntry<F, V>>> {
        self.execute(range_args(Command::XRange, key, start, end, count)).await
    }

    pub async fn xrev_range<F: FromReply, V: FromReply>(
        &self,
        key: impl ToArg,
        end: impl ToArg,
        start: impl ToArg,
        count: Option<u64>,
    ) -> Result<Vec<StreamEntry<F, V>>> {
        self.execute(range_args(Command::XRevRange, key, end, start, count)).await
    }

    pub async fn xdel<I: ToArg>(&self, key: impl ToArg, ids: impl IntoIterator<Item = I>) -> Result<i64> {
        let mut args = cmd(Command::XDel).key(key);
        args.push_all(ids)?;
        self.execute(args).await
    }

    /// Number of entries evicted.
    pub async fn xtrim(&self, key: impl ToArg, opts: &XTrimArgs) -> Result<i64> {
        self.execute(cmd(Command::XTrim).key(key).opts(opts)?).await
    }

    /// `XREAD`. Empty when a `BLOCK` timed out.
    pub async fn xread<K: ToArg, I: ToArg, F: FromReply, V: FromReply>(
        &self,
        streams: impl IntoIterator<Item = (K, I)>,
        opts: &XReadArgs,
    ) -> Result<StreamReadReply<F, V>> {
        let mut args = cmd(Command::XRead).opts(opts)?;
        push_streams(&mut args, streams)?;
        decode::streams(self.call(args).await?)
    }

    /// `XREADGROUP`; use `>` as the id for never-delivered entries.
    pub async fn xread_group<K: ToArg, I: ToArg, F: FromReply, V: FromReply>(
        &self,
        streams: impl IntoIterator<Item = (K, I)>,
        opts: &XReadGroupArgs,
    ) -> Result<StreamReadReply<F, V>> {
        let mut args = cmd(Command::XReadGroup).opts(opts)?;
        push_streams(&mut args, streams)?;
        decode::streams(self.call(args).await?)
    }

    pub async fn xack<I: ToArg>(&self, key: impl ToArg, group: impl ToArg, ids: impl IntoIterator<Item = I>) -> Result<i64> {
        let mut args = cmd(Command::XAck).key(key).arg(group);
        args.push_all(ids)?;
        self.execute(args).await
    }

    /// `XGROUP CREATE key group id [MKSTREAM]`.
    pub async fn xgroup_create(&self, key: impl ToArg, group: impl ToArg, id: impl ToArg, mkstream: bool) -> Result<Status> {
        let mut args = CommandArgs::with_sub(Command::XGroup, "CREATE")?.key(key).arg(group).arg(id);
        if mkstream {
            args.push("MKSTREAM");
        }
        self.execute(args).await
    }

    pub async fn xgroup_destroy(&self, key: impl ToArg, group: impl ToArg) -> Result<bool> {
        self.execute(CommandArgs::with_sub(Command::XGroup, "DESTROY")?.key(key).arg(group))
            .await
    }

    pub async fn xgroup_create_consumer(&self, key: impl ToArg, group: impl ToArg, consumer: impl ToArg) -> Result<bool> {
        let args = CommandArgs::with_sub(Command::XGroup, "CREATECONSUMER")?
            .key(key)
            .arg(group)
            .arg(consumer);
        self.execute(args).await
    }

    /// Pending entries the consumer held before deletion.
    pub async fn xgroup_del_consumer(&self, key: impl ToArg, group: impl ToArg, consumer: impl ToArg) -> Result<i64> {
        let args = CommandArgs::with_sub(Command::XGroup, "DELCONSUMER")?
            .key(key)
            .arg(group)
            .arg(consumer);
        self.execute(args).await
    }

    pub async fn xgroup_set_id(&self, key: impl ToArg, group: impl ToArg, id: impl ToArg) -> Result<Status> {
        self.execute(CommandArgs::with_sub(Command::XGroup, "SETID")?.key(key).arg(group).arg(id))
            .await
    }

    pub async fn xpending(&self, key: impl ToArg, group: impl ToArg) -> Result<PendingSummary> {
        self.execute(cmd(Command::XPending).key(key).arg(group)).await
    }

    pub async fn xpending_range(&self, key: impl ToArg, group: impl ToArg, opts: &XPendingArgs) -> Result<Vec<PendingEntry>> {
        self.execute(cmd(Command::XPending).key(key).arg(group).opts(opts)?).await
    }

    /// `XCLAIM` returning full entries; see [`xclaim_ids`](Self::xclaim_ids) for `JUSTID`.
    pub async fn xclaim<I: ToArg, F: FromReply, V: FromReply>(
        &self,
        key: impl ToArg,
        group: impl ToArg,
        consumer: impl ToArg,
        min_idle_ms: u64,
        ids: impl IntoIterator<Item = I>,
        opts: &XClaimArgs,
    ) -> Result<Vec<StreamEntry<F, V>>> {
        if opts.is_justid() {
            return Err(Error::Argument("use xclaim_ids for XCLAIM JUSTID".into()));
        }
        let mut args = cmd(Command::XClaim).key(key).arg(group).arg(consumer).arg(min_idle_ms);
        args.push_all(ids)?;
        self.execute(args.opts(opts)?).await
    }

    pub async fn xclaim_ids<I: ToArg>(
        &self,
        key: impl ToArg,
        group: impl ToArg,
        consumer: impl ToArg,
        min_idle_ms: u64,
        ids: impl IntoIterator<Item = I>,
        opts: &XClaimArgs,
    ) -> Result<Vec<StreamId>> {
        let opts = opts.clone().justid();
        let mut args = cmd(Command::XClaim).key(key).arg(group).arg(consumer).arg(min_idle_ms);
        args.push_all(ids)?;
        self.execute(args.opts(&opts)?).await
    }

    /// `XAUTOCLAIM`: next start id, claimed entries, ids that no longer exist.
    pub async fn xautoclaim<F: FromReply, V: FromReply>(
        &self,
        key: impl ToArg,
        group: impl ToArg,
        consumer: impl ToArg,
        min_idle_ms: u64,
        start: impl ToArg,
        count: Option<u64>,
    ) -> Result<(StreamId, Vec<StreamEntry<F, V>>, Vec<StreamId>)> {
        let mut args = cmd(Command::XAutoClaim)
            .key(key)
            .arg(group)
            .arg(consumer)
            .arg(min_idle_ms)
            .arg(start);
        if let Some(count) = count {
            args.push("COUNT").push(count);
        }
        decode::autoclaim(self.call(args).await?)
    }

    pub async fn xinfo_stream(&self, key: impl ToArg) -> Result<HashMap<String, RawReply>> {
        self.execute(CommandArgs::with_sub(Command::XInfo, "STREAM")?.key(key)).await
    }

    pub async fn xinfo_groups(&self, key: impl ToArg) -> Result<Vec<HashMap<String, RawReply>>> {
        self.execute(CommandArgs::with_sub(Command::XInfo, "GROUPS")?.key(key)).await
    }

    pub async fn xinfo_consumers(&self, key: impl ToArg, group: impl ToArg) -> Result<Vec<HashMap<String, RawReply>>> {
        self.execute(CommandArgs::with_sub(Command::XInfo, "CONSUMERS")?.key(key).arg(group))
            .await
    }
}
