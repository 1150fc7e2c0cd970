use crate::args::{cmd, CommandArgs, ToArg};
use crate::client::Client;
use crate::command::Command;
use crate::connection::Transport;
use crate::error::{Error, Result};
use crate::reply::{FromReply, Status};
use crate::resp::RawReply;
use std::collections::HashMap;

/// `INFO` text as `field -> value`; section headers and blank lines dropped.
pub(crate) fn parse_info(text: &str) -> HashMap<String, String> {
    text.lines()
        .map(str::trim)
        .filter(|line| !line.is_empty() && !line.starts_with('#'))
        .filter_map(|line| line.split_once(':'))
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect()
}

fn flush_args(command: Command, asynchronous: bool) -> CommandArgs {
    let args = cmd(command);
    if asynchronous {
        args.arg("ASYNC")
    } else {
        args
    }
}

impl<T: Transport> Client<T> {
    pub async fn dbsize(&self) -> Result<i64> {
        self.execute(cmd(Command::DbSize)).await
    }

    pub async fn flushdb(&self, asynchronous: bool) -> Result<Status> {
        self.execute(flush_args(Command::FlushDb, asynchronous)).await
    }

    pub async fn flushall(&self, asynchronous: bool) -> Result<Status> {
        self.execute(flush_args(Command::FlushAll, asynchronous)).await
    }

    /// Raw `INFO` text, optionally for one section.
    pub async fn info(&self, section: Option<&str>) -> Result<String> {
        let mut args = cmd(Command::Info);
        if let Some(section) = section {
            args.push(section);
        }
        self.execute(args).await
    }

    pub async fn info_map(&self, section: Option<&str>) -> Result<HashMap<String, String>> {
        Ok(parse_info(&self.info(section).await?))
    }

    pub async fn config_get(&self, pattern: impl ToArg) -> Result<HashMap<String, String>> {
        self.execute(CommandArgs::with_sub(Command::Config, "GET")?.arg(pattern)).await
    }

    pub async fn config_set<P: ToArg, V: ToArg>(&self, pairs: impl IntoIterator<Item = (P, V)>) -> Result<Status> {
        let mut args = CommandArgs::with_sub(Command::Config, "SET")?;
        let before = args.tokens().len();
        for (p, v) in pairs {
            args.push(p).push(v);
        }
        if args.tokens().len() == before {
            return Err(Error::Argument("CONFIG SET requires at least one parameter".into()));
        }
        self.execute(args).await
    }

    pub async fn config_resetstat(&self) -> Result<Status> {
        self.execute(CommandArgs::with_sub(Command::Config, "RESETSTAT")?).await
    }

    pub async fn config_rewrite(&self) -> Result<Status> {
        self.execute(CommandArgs::with_sub(Command::Config, "REWRITE")?).await
    }

    /// Server clock as `(unix seconds, microseconds)`.
    pub async fn time(&self) -> Result<(u64, u64)> {
        self.execute(cmd(Command::Time)).await
    }

    pub async fn lastsave(&self) -> Result<i64> {
        self.execute(cmd(Command::LastSave)).await
    }

    pub async fn save(&self) -> Result<Status> {
        self.execute(cmd(Command::Save)).await
    }

    /// Status text such as `Background saving started`.
    pub async fn bgsave(&self) -> Result<String> {
        self.execute(cmd(Command::BgSave)).await
    }

    pub async fn bgrewriteaof(&self) -> Result<String> {
        self.execute(cmd(Command::BgRewriteAof)).await
    }

    pub async fn role(&self) -> Result<RawReply> {
        self.execute(cmd(Command::Role)).await
    }

    pub async fn swapdb(&self, index1: u32, index2: u32) -> Result<Status> {
        self.execute(cmd(Command::SwapDb).arg(index1).arg(index2)).await
    }

    /// Replicas that acknowledged; blocks up to `timeout_ms` (0 = forever).
    pub async fn wait(&self, num_replicas: u32, timeout_ms: u64) -> Result<i64> {
        self.execute(cmd(Command::Wait).arg(num_replicas).arg(timeout_ms)).await
    }

    /// `(local fsyncs, replica fsyncs)`.
    pub async fn waitaof(&self, num_local: u32, num_replicas: u32, timeout_ms: u64) -> Result<(i64, i64)> {
        self.execute(cmd(Command::WaitAof).arg(num_local).arg(num_replicas).arg(timeout_ms))
            .await
    }

    /// Bytes used by the key and its value, nil when missing.
    pub async fn memory_usage(&self, key: impl ToArg, samples: Option<u64>) -> Result<Option<i64>> {
        let mut args = CommandArgs::with_sub(Command::Memory, "USAGE")?.key(key);
        if let Some(samples) = samples {
            args.push("SAMPLES").push(samples);
        }
        self.execute(args).await
    }

    pub async fn memory_doctor(&self) -> Result<String> {
        self.execute(CommandArgs::with_sub(Command::Memory, "DOCTOR")?).await
    }

    pub async fn memory_stats(&self) -> Result<HashMap<String, RawReply>> {
        self.execute(CommandArgs::with_sub(Command::Memory, "STATS")?).await
    }

    pub async fn slowlog_get(&self, count: Option<i64>) -> Result<Vec<RawReply>> {
        let mut args = CommandArgs::with_sub(Command::SlowLog, "GET")?;
        if let Some(count) = count {
            args.push(count);
        }
        self.execute(args).await
    }

    pub async fn slowlog_len(&self) -> Result<i64> {
        self.execute(CommandArgs::with_sub(Command::SlowLog, "LEN")?).await
    }

    pub async fn slowlog_reset(&self) -> Result<Status> {
        self.execute(CommandArgs::with_sub(Command::SlowLog, "RESET")?).await
    }

    pub async fn command_count(&self) -> Result<i64> {
        self.execute(CommandArgs::with_sub(Command::CommandCmd, "COUNT")?).await
    }

    pub async fn command_list<R: FromReply>(&self) -> Result<Vec<R>> {
        self.execute(CommandArgs::with_sub(Command::CommandCmd, "LIST")?).await
    }

    /// Keys the server would extract from a full command line.
    pub async fn command_getkeys<A: ToArg, R: FromReply>(&self, command_line: impl IntoIterator<Item = A>) -> Result<Vec<R>> {
        let mut args = CommandArgs::with_sub(Command::CommandCmd, "GETKEYS")?;
        args.push_all(command_line)?;
        self.execute(args).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn info_fields() {
        let text = "# Server\r\nredis_version:7.2.4\r\nrun_id:abc\r\n\r\n# Keyspace\r\ndb0:keys=1,expires=0\r\n";
        let info = parse_info(text);
        assert_eq!(info.get("redis_version").map(String::as_str), Some("7.2.4"));
        assert_eq!(info.get("db0").map(String::as_str), Some("keys=1,expires=0"));
        assert_eq!(info.len(), 3);
    }

    #[test]
    fn flush_modifier() {
        assert_eq!(flush_args(Command::FlushDb, true).tokens().len(), 2);
        assert_eq!(flush_args(Command::FlushAll, false).tokens().len(), 1);
    }
}
