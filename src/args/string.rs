use super::{CommandArgs, WriteArgs};
use crate::error::{Error, Result};

/// `NX` / `XX` for `SET`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SetCondition {
    /// Only set if the key does not exist.
    Nx,
    /// Only set if the key already exists.
    Xx,
}

/// Expiration clause shared by `SET` and `GETEX`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Expiry {
    /// Seconds from now.
    Ex(u64),
    /// Milliseconds from now.
    Px(u64),
    /// Unix time in seconds.
    ExAt(u64),
    /// Unix time in milliseconds.
    PxAt(u64),
    /// Retain the current TTL (`SET` only).
    KeepTtl,
    /// Remove the TTL (`GETEX` only).
    Persist,
}

impl Expiry {
    fn write(self, args: &mut CommandArgs) -> Result<()> {
        let (word, value) = match self {
            Self::Ex(v) => ("EX", v),
            Self::Px(v) => ("PX", v),
            Self::ExAt(v) => ("EXAT", v),
            Self::PxAt(v) => ("PXAT", v),
            Self::KeepTtl => {
                args.push("KEEPTTL");
                return Ok(());
            }
            Self::Persist => {
                args.push("PERSIST");
                return Ok(());
            }
        };
        if value == 0 {
            return Err(Error::Argument(format!("{word} must be positive")));
        }
        args.push(word).push(value);
        Ok(())
    }
}

/// Options for `SET key value [NX|XX] [GET] [EX|PX|EXAT|PXAT|KEEPTTL]`.
///
/// Each setter records its clause; conflicting clauses are reported when
/// the command is encoded rather than silently overwritten.
#[derive(Debug, Clone, Default)]
pub struct SetArgs {
    conditions: Vec<SetCondition>,
    get: bool,
    expiries: Vec<Expiry>,
}

impl SetArgs {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn nx(self) -> Self {
        self.condition(SetCondition::Nx)
    }

    pub fn xx(self) -> Self {
        self.condition(SetCondition::Xx)
    }

    /// Repeating the same condition is a no-op.
    pub fn condition(mut self, condition: SetCondition) -> Self {
        if !self.conditions.contains(&condition) {
            self.conditions.push(condition);
        }
        self
    }

    /// Return the previous value.
    pub fn get(mut self) -> Self {
        self.get = true;
        self
    }

    pub fn ex(self, seconds: u64) -> Self {
        self.expiry(Expiry::Ex(seconds))
    }

    pub fn px(self, millis: u64) -> Self {
        self.expiry(Expiry::Px(millis))
    }

    pub fn exat(self, unix_secs: u64) -> Self {
        self.expiry(Expiry::ExAt(unix_secs))
    }

    pub fn pxat(self, unix_millis: u64) -> Self {
        self.expiry(Expiry::PxAt(unix_millis))
    }

    pub fn keepttl(self) -> Self {
        self.expiry(Expiry::KeepTtl)
    }

    pub fn expiry(mut self, expiry: Expiry) -> Self {
        self.expiries.push(expiry);
        self
    }
}

impl WriteArgs for SetArgs {
    fn write_args(&self, args: &mut CommandArgs) -> Result<()> {
        match self.conditions.as_slice() {
            [] => {}
            [SetCondition::Nx] => {
                args.push("NX");
            }
            [SetCondition::Xx] => {
                args.push("XX");
            }
            _ => return Err(Error::Argument("SET accepts NX or XX, not both".into())),
        }
        if self.get {
            args.push("GET");
        }
        match self.expiries.as_slice() {
            [] => Ok(()),
            [Expiry::Persist] => Err(Error::Argument("SET does not accept PERSIST".into())),
            [one] => one.write(args),
            _ => Err(Error::Argument(
                "SET accepts only one of EX, PX, EXAT, PXAT, KEEPTTL".into(),
            )),
        }
    }
}

/// Options for `GETEX key [EX|PX|EXAT|PXAT|PERSIST]`.
#[derive(Debug, Clone, Default)]
pub struct GetExArgs {
    expiries: Vec<Expiry>,
}

impl GetExArgs {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn ex(self, seconds: u64) -> Self {
        self.expiry(Expiry::Ex(seconds))
    }

    pub fn px(self, millis: u64) -> Self {
        self.expiry(Expiry::Px(millis))
    }

    pub fn exat(self, unix_secs: u64) -> Self {
        self.expiry(Expiry::ExAt(unix_secs))
    }

    pub fn pxat(self, unix_millis: u64) -> Self {
        self.expiry(Expiry::PxAt(unix_millis))
    }

    pub fn persist(self) -> Self {
        self.expiry(Expiry::Persist)
    }

    pub fn expiry(mut self, expiry: Expiry) -> Self {
        self.expiries.push(expiry);
        self
    }
}

impl WriteArgs for GetExArgs {
    fn write_args(&self, args: &mut CommandArgs) -> Result<()> {
        match self.expiries.as_slice() {
            [] => Ok(()),
            [Expiry::KeepTtl] => Err(Error::Argument("GETEX does not accept KEEPTTL".into())),
            [one] => one.write(args),
            _ => Err(Error::Argument(
                "GETEX accepts only one of EX, PX, EXAT, PXAT, PERSIST".into(),
            )),
        }
    }
}
