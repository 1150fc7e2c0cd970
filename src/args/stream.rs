use super::{CommandArgs, ToArg, WriteArgs};
use crate::error::{Error, Result};
use bytes::Bytes;

/// `MAXLEN` / `MINID` trimming clause shared by `XADD` and `XTRIM`.
#[derive(Debug, Clone, PartialEq)]
pub enum TrimStrategy {
    MaxLen {
        threshold: u64,
        approximate: bool,
        limit: Option<u64>,
    },
    MinId {
        id: Bytes,
        approximate: bool,
        limit: Option<u64>,
    },
}

impl TrimStrategy {
    pub fn maxlen(threshold: u64) -> Self {
        Self::MaxLen {
            threshold,
            approximate: false,
            limit: None,
        }
    }

    pub fn minid(id: impl ToArg) -> Self {
        Self::MinId {
            id: id.to_arg(),
            approximate: false,
            limit: None,
        }
    }

    /// Use `~` (trim at macro-node granularity).
    pub fn approximate(mut self) -> Self {
        match &mut self {
            Self::MaxLen { approximate, .. } | Self::MinId { approximate, .. } => *approximate = true,
        }
        self
    }

    /// Cap the entries evicted per call; needs [`approximate`](Self::approximate).
    pub fn limit(mut self, count: u64) -> Self {
        match &mut self {
            Self::MaxLen { limit, .. } | Self::MinId { limit, .. } => *limit = Some(count),
        }
        self
    }
}

impl WriteArgs for TrimStrategy {
    fn write_args(&self, args: &mut CommandArgs) -> Result<()> {
        let (approximate, limit) = match self {
            Self::MaxLen {
                threshold,
                approximate,
                limit,
            } => {
                args.push("MAXLEN").push(if *approximate { "~" } else { "=" }).push(*threshold);
                (*approximate, *limit)
            }
            Self::MinId {
                id,
                approximate,
                limit,
            } => {
                args.push("MINID").push(if *approximate { "~" } else { "=" }).push(id);
                (*approximate, *limit)
            }
        };
        if let Some(limit) = limit {
            if !approximate {
                return Err(Error::Argument("LIMIT requires approximate (~) trimming".into()));
            }
            args.push("LIMIT").push(limit);
        }
        Ok(())
    }
}

/// Options for `XADD key [NOMKSTREAM] [trim] <* | id> field value …`.
#[derive(Debug, Clone, Default)]
pub struct XAddArgs {
    nomkstream: bool,
    trim: Option<TrimStrategy>,
    id: Option<Bytes>,
}

impl XAddArgs {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn nomkstream(mut self) -> Self {
        self.nomkstream = true;
        self
    }

    pub fn trim(mut self, strategy: TrimStrategy) -> Self {
        self.trim = Some(strategy);
        self
    }

    /// Explicit entry id; `*` (server-generated) when unset.
    pub fn id(mut self, id: impl ToArg) -> Self {
        self.id = Some(id.to_arg());
        self
    }
}

impl WriteArgs for XAddArgs {
    fn write_args(&self, args: &mut CommandArgs) -> Result<()> {
        if self.nomkstream {
            args.push("NOMKSTREAM");
        }
        if let Some(trim) = &self.trim {
            trim.write_args(args)?;
        }
        match &self.id {
            Some(id) => args.push(id),
            None => args.push("*"),
        };
        Ok(())
    }
}

/// Options for `XTRIM key <strategy>`.
#[derive(Debug, Clone)]
pub struct XTrimArgs {
    strategy: TrimStrategy,
}

impl XTrimArgs {
    pub fn new(strategy: TrimStrategy) -> Self {
        Self { strategy }
    }
}

impl WriteArgs for XTrimArgs {
    fn write_args(&self, args: &mut CommandArgs) -> Result<()> {
        self.strategy.write_args(args)
    }
}

/// `COUNT` / `BLOCK` for `XREAD`.
#[derive(Debug, Clone, Copy, Default)]
pub struct XReadArgs {
    count: Option<u64>,
    block_ms: Option<u64>,
}

impl XReadArgs {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn count(mut self, count: u64) -> Self {
        self.count = Some(count);
        self
    }

    /// Block up to `millis` (0 = forever) waiting for entries.
    pub fn block(mut self, millis: u64) -> Self {
        self.block_ms = Some(millis);
        self
    }
}

fn write_count_block(args: &mut CommandArgs, count: Option<u64>, block_ms: Option<u64>) -> Result<()> {
    if let Some(count) = count {
        if count == 0 {
            return Err(Error::Argument("COUNT must be positive".into()));
        }
        args.push("COUNT").push(count);
    }
    if let Some(block) = block_ms {
        args.push("BLOCK").push(block).set_blocking();
    }
    Ok(())
}

impl WriteArgs for XReadArgs {
    fn write_args(&self, args: &mut CommandArgs) -> Result<()> {
        write_count_block(args, self.count, self.block_ms)
    }
}

/// Options for `XREADGROUP GROUP group consumer [COUNT] [BLOCK] [NOACK]`.
#[derive(Debug, Clone)]
pub struct XReadGroupArgs {
    group: Bytes,
    consumer: Bytes,
    count: Option<u64>,
    block_ms: Option<u64>,
    noack: bool,
}

impl XReadGroupArgs {
    pub fn new(group: impl ToArg, consumer: impl ToArg) -> Self {
        Self {
            group: group.to_arg(),
            consumer: consumer.to_arg(),
            count: None,
            block_ms: None,
            noack: false,
        }
    }

    pub fn count(mut self, count: u64) -> Self {
        self.count = Some(count);
        self
    }

    pub fn block(mut self, millis: u64) -> Self {
        self.block_ms = Some(millis);
        self
    }

    pub fn noack(mut self) -> Self {
        self.noack = true;
        self
    }
}

impl WriteArgs for XReadGroupArgs {
    fn write_args(&self, args: &mut CommandArgs) -> Result<()> {
        args.push("GROUP").push(&self.group).push(&self.consumer);
        write_count_block(args, self.count, self.block_ms)?;
        if self.noack {
            args.push("NOACK");
        }
        Ok(())
    }
}

/// Options for `XCLAIM` after the id list.
#[derive(Debug, Clone, Default)]
pub struct XClaimArgs {
    idle_ms: Option<u64>,
    time_ms: Option<u64>,
    retry_count: Option<u64>,
    force: bool,
    justid: bool,
    last_id: Option<Bytes>,
}

impl XClaimArgs {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn idle(mut self, millis: u64) -> Self {
        self.idle_ms = Some(millis);
        self
    }

    pub fn time(mut self, unix_millis: u64) -> Self {
        self.time_ms = Some(unix_millis);
        self
    }

    pub fn retry_count(mut self, count: u64) -> Self {
        self.retry_count = Some(count);
        self
    }

    pub fn force(mut self) -> Self {
        self.force = true;
        self
    }

    pub fn justid(mut self) -> Self {
        self.justid = true;
        self
    }

    pub fn last_id(mut self, id: impl ToArg) -> Self {
        self.last_id = Some(id.to_arg());
        self
    }

    pub(crate) fn is_justid(&self) -> bool {
        self.justid
    }
}

impl WriteArgs for XClaimArgs {
    fn write_args(&self, args: &mut CommandArgs) -> Result<()> {
        if self.idle_ms.is_some() && self.time_ms.is_some() {
            return Err(Error::Argument("XCLAIM accepts only one of IDLE, TIME".into()));
        }
        if let Some(idle) = self.idle_ms {
            args.push("IDLE").push(idle);
        }
        if let Some(time) = self.time_ms {
            args.push("TIME").push(time);
        }
        if let Some(n) = self.retry_count {
            args.push("RETRYCOUNT").push(n);
        }
        if self.force {
            args.push("FORCE");
        }
        if self.justid {
            args.push("JUSTID");
        }
        if let Some(id) = &self.last_id {
            args.push("LASTID").push(id);
        }
        Ok(())
    }
}

/// Extended form of `XPENDING key group [IDLE ms] start end count [consumer]`.
#[derive(Debug, Clone)]
pub struct XPendingArgs {
    idle_ms: Option<u64>,
    start: Bytes,
    end: Bytes,
    count: u64,
    consumer: Option<Bytes>,
}

impl XPendingArgs {
    pub fn new(start: impl ToArg, end: impl ToArg, count: u64) -> Self {
        Self {
            idle_ms: None,
            start: start.to_arg(),
            end: end.to_arg(),
            count,
            consumer: None,
        }
    }

    pub fn idle(mut self, millis: u64) -> Self {
        self.idle_ms = Some(millis);
        self
    }

    pub fn consumer(mut self, consumer: impl ToArg) -> Self {
        self.consumer = Some(consumer.to_arg());
        self
    }
}

impl WriteArgs for XPendingArgs {
    fn write_args(&self, args: &mut CommandArgs) -> Result<()> {
        if let Some(idle) = self.idle_ms {
            args.push("IDLE").push(idle);
        }
        args.push(&self.start).push(&self.end).push(self.count);
        if let Some(consumer) = &self.consumer {
            args.push(consumer);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::args::cmd;
    use crate::command::Command;

    fn texts(args: &CommandArgs) -> Vec<String> {
        args.tokens()
            .iter()
            .map(|t| String::from_utf8_lossy(t).into_owned())
            .collect()
    }

    #[test]
    fn xadd_defaults_to_star() {
        let args = cmd(Command::XAdd).key("s").opts(&XAddArgs::new()).unwrap();
        assert_eq!(texts(&args), ["XADD", "s", "*"]);
    }

    #[test]
    fn xadd_full() {
        let opts = XAddArgs::new()
            .nomkstream()
            .trim(TrimStrategy::maxlen(1000).approximate().limit(10))
            .id("1-1");
        let args = cmd(Command::XAdd).key("s").opts(&opts).unwrap();
        assert_eq!(
            texts(&args),
            ["XADD", "s", "NOMKSTREAM", "MAXLEN", "~", "1000", "LIMIT", "10", "1-1"]
        );
    }

    #[test]
    fn trim_limit_needs_approximate() {
        let opts = XTrimArgs::new(TrimStrategy::minid("5-0").limit(3));
        assert!(matches!(cmd(Command::XTrim).key("s").opts(&opts), Err(Error::Argument(_))));

        let opts = XTrimArgs::new(TrimStrategy::minid("5-0"));
        let args = cmd(Command::XTrim).key("s").opts(&opts).unwrap();
        assert_eq!(texts(&args), ["XTRIM", "s", "MINID", "=", "5-0"]);
    }

    #[test]
    fn xread_block_marks_blocking() {
        let args = cmd(Command::XRead).opts(&XReadArgs::new().count(5)).unwrap();
        assert!(!args.is_blocking());
        let args = cmd(Command::XRead).opts(&XReadArgs::new().block(0)).unwrap();
        assert!(args.is_blocking());
        assert_eq!(texts(&args), ["XREAD", "BLOCK", "0"]);
    }

    #[test]
    fn xreadgroup_header() {
        let opts = XReadGroupArgs::new("g", "c").count(1).noack();
        let args = cmd(Command::XReadGroup).opts(&opts).unwrap();
        assert_eq!(texts(&args), ["XREADGROUP", "GROUP", "g", "c", "COUNT", "1", "NOACK"]);
    }

    #[test]
    fn xclaim_exclusive_times() {
        let bad = cmd(Command::XClaim).opts(&XClaimArgs::new().idle(1).time(2));
        assert!(matches!(bad, Err(Error::Argument(_))));
    }

    #[test]
    fn xpending_extended() {
        let opts = XPendingArgs::new("-", "+", 10).idle(100).consumer("alice");
        let args = cmd(Command::XPending).key("s").arg("g").opts(&opts).unwrap();
        assert_eq!(
            texts(&args),
            ["XPENDING", "s", "g", "IDLE", "100", "-", "+", "10", "alice"]
        );
    }
}
