use super::{CommandArgs, ToArg, WriteArgs};
use crate::error::{Error, Result};
use bytes::Bytes;

/// Condition flag for `EXPIRE` and friends (Redis 7+).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExpireCondition {
    /// Only when the key has no expiry.
    Nx,
    /// Only when the key already has an expiry.
    Xx,
    /// Only when the new expiry is greater than the current one.
    Gt,
    /// Only when the new expiry is less than the current one.
    Lt,
}

impl ExpireCondition {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Nx => "NX",
            Self::Xx => "XX",
            Self::Gt => "GT",
            Self::Lt => "LT",
        }
    }
}

impl WriteArgs for ExpireCondition {
    fn write_args(&self, args: &mut CommandArgs) -> Result<()> {
        args.push(self.as_str());
        Ok(())
    }
}

/// `MATCH` / `COUNT` / `TYPE` for the SCAN family.
#[derive(Debug, Clone, Default)]
pub struct ScanArgs {
    pattern: Option<Bytes>,
    count: Option<u64>,
    kind: Option<String>,
}

impl ScanArgs {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn pattern(mut self, pattern: impl ToArg) -> Self {
        self.pattern = Some(pattern.to_arg());
        self
    }

    pub fn count(mut self, count: u64) -> Self {
        self.count = Some(count);
        self
    }

    /// Restrict `SCAN` to one value type (`string`, `hash`, …).
    pub fn kind(mut self, kind: impl Into<String>) -> Self {
        self.kind = Some(kind.into());
        self
    }

    pub(crate) fn has_kind(&self) -> bool {
        self.kind.is_some()
    }
}

impl WriteArgs for ScanArgs {
    fn write_args(&self, args: &mut CommandArgs) -> Result<()> {
        if let Some(pattern) = &self.pattern {
            args.push("MATCH").push(pattern);
        }
        if let Some(count) = self.count {
            if count == 0 {
                return Err(Error::Argument("SCAN COUNT must be positive".into()));
            }
            args.push("COUNT").push(count);
        }
        if let Some(kind) = &self.kind {
            args.push("TYPE").push(kind);
        }
        Ok(())
    }
}

/// Options for `SORT` / `SORT_RO`.
#[derive(Debug, Clone, Default)]
pub struct SortArgs {
    by: Option<Bytes>,
    limit: Option<(i64, i64)>,
    get: Vec<Bytes>,
    descending: bool,
    alpha: bool,
    store: Option<Bytes>,
}

impl SortArgs {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn by(mut self, pattern: impl ToArg) -> Self {
        self.by = Some(pattern.to_arg());
        self
    }

    pub fn limit(mut self, offset: i64, count: i64) -> Self {
        self.limit = Some((offset, count));
        self
    }

    /// Add a `GET pattern`; repeatable, order kept.
    pub fn get(mut self, pattern: impl ToArg) -> Self {
        self.get.push(pattern.to_arg());
        self
    }

    pub fn desc(mut self) -> Self {
        self.descending = true;
        self
    }

    pub fn alpha(mut self) -> Self {
        self.alpha = true;
        self
    }

    pub fn store(mut self, destination: impl ToArg) -> Self {
        self.store = Some(destination.to_arg());
        self
    }

    pub(crate) fn stores(&self) -> bool {
        self.store.is_some()
    }
}

impl WriteArgs for SortArgs {
    fn write_args(&self, args: &mut CommandArgs) -> Result<()> {
        if let Some(by) = &self.by {
            args.push("BY").push(by);
        }
        if let Some((offset, count)) = self.limit {
            args.push("LIMIT").push(offset).push(count);
        }
        for pattern in &self.get {
            args.push("GET").push(pattern);
        }
        if self.descending {
            args.push("DESC");
        }
        if self.alpha {
            args.push("ALPHA");
        }
        if let Some(dest) = &self.store {
            args.push("STORE").push_key(dest);
        }
        Ok(())
    }
}

/// Everything after `MIGRATE`: target, keys and transfer options.
#[derive(Debug, Clone)]
pub struct MigrateArgs {
    host: String,
    port: u16,
    db: u32,
    timeout_ms: u64,
    keys: Vec<Bytes>,
    copy: bool,
    replace: bool,
    auth: Option<(Option<String>, String)>,
}

impl MigrateArgs {
    pub fn new(host: impl Into<String>, port: u16, db: u32, timeout_ms: u64) -> Self {
        Self {
            host: host.into(),
            port,
            db,
            timeout_ms,
            keys: Vec::new(),
            copy: false,
            replace: false,
            auth: None,
        }
    }

    pub fn key(mut self, key: impl ToArg) -> Self {
        self.keys.push(key.to_arg());
        self
    }

    pub fn copy(mut self) -> Self {
        self.copy = true;
        self
    }

    pub fn replace(mut self) -> Self {
        self.replace = true;
        self
    }

    pub fn auth(mut self, password: impl Into<String>) -> Self {
        self.auth = Some((None, password.into()));
        self
    }

    pub fn auth2(mut self, username: impl Into<String>, password: impl Into<String>) -> Self {
        self.auth = Some((Some(username.into()), password.into()));
        self
    }
}

impl WriteArgs for MigrateArgs {
    fn write_args(&self, args: &mut CommandArgs) -> Result<()> {
        args.push(&self.host).push(self.port);
        match self.keys.as_slice() {
            [] => return Err(Error::Argument("MIGRATE requires at least one key".into())),
            [single] => {
                args.push_key(single);
            }
            _ => {
                args.push("");
            }
        }
        args.push(self.db).push(self.timeout_ms);
        if self.copy {
            args.push("COPY");
        }
        if self.replace {
            args.push("REPLACE");
        }
        match &self.auth {
            Some((None, password)) => {
                args.push("AUTH").push(password);
            }
            Some((Some(user), password)) => {
                args.push("AUTH2").push(user).push(password);
            }
            None => {}
        }
        if self.keys.len() > 1 {
            args.push("KEYS");
            for key in &self.keys {
                args.push_key(key);
            }
        }
        Ok(())
    }
}

/// Options for `RESTORE key ttl payload`.
#[derive(Debug, Clone, Default)]
pub struct RestoreArgs {
    replace: bool,
    absttl: bool,
    idle_time: Option<u64>,
    freq: Option<u64>,
}

impl RestoreArgs {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn replace(mut self) -> Self {
        self.replace = true;
        self
    }

    /// Interpret the ttl as an absolute Unix time in milliseconds.
    pub fn absttl(mut self) -> Self {
        self.absttl = true;
        self
    }

    pub fn idle_time(mut self, seconds: u64) -> Self {
        self.idle_time = Some(seconds);
        self
    }

    pub fn freq(mut self, frequency: u64) -> Self {
        self.freq = Some(frequency);
        self
    }
}

impl WriteArgs for RestoreArgs {
    fn write_args(&self, args: &mut CommandArgs) -> Result<()> {
        if self.idle_time.is_some() && self.freq.is_some() {
            return Err(Error::Argument("RESTORE accepts only one of IDLETIME, FREQ".into()));
        }
        if self.replace {
            args.push("REPLACE");
        }
        if self.absttl {
            args.push("ABSTTL");
        }
        if let Some(idle) = self.idle_time {
            args.push("IDLETIME").push(idle);
        }
        if let Some(freq) = self.freq {
            args.push("FREQ").push(freq);
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
    fn scan_options() {
        let args = cmd(Command::Scan)
            .arg("0")
            .opts(&ScanArgs::new().pattern("user:*").count(100).kind("hash"))
            .unwrap();
        assert_eq!(texts(&args), ["SCAN", "0", "MATCH", "user:*", "COUNT", "100", "TYPE", "hash"]);
    }

    #[test]
    fn scan_zero_count() {
        assert!(cmd(Command::Scan).arg("0").opts(&ScanArgs::new().count(0)).is_err());
    }

    #[test]
    fn sort_full() {
        let args = cmd(Command::Sort)
            .key("list")
            .opts(
                &SortArgs::new()
                    .by("w_*")
                    .limit(0, 10)
                    .get("#")
                    .get("o_*")
                    .desc()
                    .alpha()
                    .store("dst"),
            )
            .unwrap();
        assert_eq!(
            texts(&args),
            ["SORT", "list", "BY", "w_*", "LIMIT", "0", "10", "GET", "#", "GET", "o_*", "DESC", "ALPHA", "STORE", "dst"]
        );
        assert_eq!(args.keys().count(), 2);
    }

    #[test]
    fn migrate_single_and_multi() {
        let args = cmd(Command::Migrate)
            .opts(&MigrateArgs::new("10.0.0.1", 6379, 0, 5000).key("k").replace())
            .unwrap();
        assert_eq!(texts(&args), ["MIGRATE", "10.0.0.1", "6379", "k", "0", "5000", "REPLACE"]);

        let args = cmd(Command::Migrate)
            .opts(
                &MigrateArgs::new("h", 7000, 1, 10)
                    .key("{t}a")
                    .key("{t}b")
                    .auth2("u", "p"),
            )
            .unwrap();
        assert_eq!(
            texts(&args),
            ["MIGRATE", "h", "7000", "", "1", "10", "AUTH2", "u", "p", "KEYS", "{t}a", "{t}b"]
        );
        assert_eq!(args.keys().count(), 2);

        assert!(cmd(Command::Migrate).opts(&MigrateArgs::new("h", 1, 0, 1)).is_err());
    }

    #[test]
    fn restore_exclusive_hints() {
        let ok = cmd(Command::Restore).key("k").arg(0u32).arg("x").opts(&RestoreArgs::new().replace().idle_time(5));
        assert!(ok.is_ok());
        let bad = cmd(Command::Restore).key("k").opts(&RestoreArgs::new().idle_time(5).freq(1));
        assert!(matches!(bad, Err(Error::Argument(_))));
    }

    #[test]
    fn expire_condition_token() {
        let args = cmd(Command::Expire).key("k").arg(10u64).opts(&ExpireCondition::Gt).unwrap();
        assert_eq!(texts(&args), ["EXPIRE", "k", "10", "GT"]);
    }
}
