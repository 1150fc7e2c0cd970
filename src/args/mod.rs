//! Argument encoding.
//!
//! A call is encoded once into a [`CommandArgs`]: the command, its ordered
//! binary-safe tokens and the positions of the key tokens. Text and binary
//! inputs meet at [`ToArg`], so `"k"` and `b"k"` produce identical tokens.
//! Option builders implement [`WriteArgs`] and validate their combinations
//! while writing.

mod bitmap;
mod geo;
mod keys;
mod list;
mod sorted_set;
mod stream;
mod string;

pub use bitmap::{BitFieldArgs, BitFieldOverflow, BitOp, BitRange, BitUnit, IntType};
pub use geo::{GeoAddArgs, GeoOrder, GeoSearchArgs, GeoUnit};
pub use keys::{ExpireCondition, MigrateArgs, RestoreArgs, ScanArgs, SortArgs};
pub use list::{Direction, InsertPosition, LPosArgs};
pub use sorted_set::{Aggregate, ScoreBound, ZAddArgs, ZRangeArgs, ZRangeBy, ZStoreArgs};
pub use stream::{TrimStrategy, XAddArgs, XClaimArgs, XPendingArgs, XReadArgs, XReadGroupArgs, XTrimArgs};
pub use string::{Expiry, GetExArgs, SetArgs, SetCondition};

use crate::command::{Command, CommandFlags};
use crate::crc16;
use crate::error::{Error, Result};
use bytes::Bytes;
use std::fmt;

/// Converts a caller value into one wire token.
///
/// Implemented for text, binary and integer types; every implementation
/// produces the UTF-8 / canonical decimal bytes the server expects.
pub trait ToArg {
    fn to_arg(&self) -> Bytes;
}

impl ToArg for str {
    fn to_arg(&self) -> Bytes {
        Bytes::copy_from_slice(self.as_bytes())
    }
}

impl ToArg for String {
    fn to_arg(&self) -> Bytes {
        Bytes::copy_from_slice(self.as_bytes())
    }
}

impl ToArg for [u8] {
    fn to_arg(&self) -> Bytes {
        Bytes::copy_from_slice(self)
    }
}

impl<const N: usize> ToArg for [u8; N] {
    fn to_arg(&self) -> Bytes {
        Bytes::copy_from_slice(self)
    }
}

impl ToArg for Vec<u8> {
    fn to_arg(&self) -> Bytes {
        Bytes::copy_from_slice(self)
    }
}

impl ToArg for Bytes {
    fn to_arg(&self) -> Bytes {
        self.clone()
    }
}

impl ToArg for bool {
    fn to_arg(&self) -> Bytes {
        Bytes::from_static(if *self { b"1" } else { b"0" })
    }
}

impl<T: ToArg + ?Sized> ToArg for &T {
    fn to_arg(&self) -> Bytes {
        (**self).to_arg()
    }
}

macro_rules! int_to_arg {
    ($($t:ty),*) => {$(
        impl ToArg for $t {
            fn to_arg(&self) -> Bytes {
                Bytes::copy_from_slice(itoa::Buffer::new().format(*self).as_bytes())
            }
        }
    )*};
}

int_to_arg!(i8, i16, i32, i64, isize, u8, u16, u32, u64, usize);

/// Canonical text for a double token.
///
/// Shortest round-trippable decimal, `+inf`/`-inf` for infinities. NaN has
/// no meaning to the server and is rejected.
pub fn format_double(value: f64) -> Result<Bytes> {
    if value.is_nan() {
        return Err(Error::Argument("NaN is not a valid numeric argument".into()));
    }
    if value.is_infinite() {
        return Ok(Bytes::from_static(if value > 0.0 { b"+inf" } else { b"-inf" }));
    }
    let mut buf = ryu::Buffer::new();
    let text = buf.format_finite(value);
    let text = text.strip_suffix(".0").unwrap_or(text);
    Ok(Bytes::copy_from_slice(text.as_bytes()))
}

/// Option structs that append their populated fields to a command.
pub trait WriteArgs {
    fn write_args(&self, args: &mut CommandArgs) -> Result<()>;
}

/// A fully encoded command: name token, argument tokens, key positions.
///
/// Built once per call and resent verbatim on redirection.
#[derive(Clone, PartialEq)]
pub struct CommandArgs {
    command: Command,
    tokens: Vec<Bytes>,
    keys: Vec<usize>,
    blocking: bool,
}

impl CommandArgs {
    pub fn new(command: Command) -> Self {
        let mut tokens = Vec::with_capacity(4);
        tokens.push(Bytes::from_static(command.name().as_bytes()));
        Self {
            command,
            tokens,
            keys: Vec::new(),
            blocking: command.is_blocking(),
        }
    }

    /// Start a command with a sub-command (`CLUSTER SLOTS`, `XGROUP CREATE`, …).
    pub fn with_sub(command: Command, sub: &str) -> Result<Self> {
        let info = command.info();
        if !info.has_subcommand(sub.as_bytes()) {
            return Err(Error::Argument(format!(
                "unknown {} sub-command '{sub}'",
                info.name
            )));
        }
        let mut args = Self::new(command);
        args.tokens.push(Bytes::copy_from_slice(sub.to_ascii_uppercase().as_bytes()));
        Ok(args)
    }

    pub fn arg(mut self, value: impl ToArg) -> Self {
        self.push(value);
        self
    }

    pub fn key(mut self, key: impl ToArg) -> Self {
        self.push_key(key);
        self
    }

    pub fn double(mut self, value: f64) -> Result<Self> {
        self.push_double(value)?;
        Ok(self)
    }

    pub fn opts(mut self, opts: &impl WriteArgs) -> Result<Self> {
        opts.write_args(&mut self)?;
        Ok(self)
    }

    pub fn push(&mut self, value: impl ToArg) -> &mut Self {
        self.tokens.push(value.to_arg());
        self
    }

    pub fn push_key(&mut self, key: impl ToArg) -> &mut Self {
        self.keys.push(self.tokens.len());
        self.tokens.push(key.to_arg());
        self
    }

    pub fn push_double(&mut self, value: f64) -> Result<&mut Self> {
        self.tokens.push(format_double(value)?);
        Ok(self)
    }

    /// Append every key, failing if the list is empty.
    pub fn push_keys<K: ToArg>(&mut self, keys: impl IntoIterator<Item = K>) -> Result<&mut Self> {
        let before = self.tokens.len();
        for key in keys {
            self.push_key(key);
        }
        if self.tokens.len() == before {
            return Err(Error::Argument(format!(
                "{} requires at least one key",
                self.command
            )));
        }
        Ok(self)
    }

    /// Append every value, failing if the list is empty.
    pub fn push_all<V: ToArg>(&mut self, values: impl IntoIterator<Item = V>) -> Result<&mut Self> {
        let before = self.tokens.len();
        for value in values {
            self.push(value);
        }
        if self.tokens.len() == before {
            return Err(Error::Argument(format!(
                "{} requires at least one element",
                self.command
            )));
        }
        Ok(self)
    }

    /// Mark this call as parking its connection (e.g. `XREAD BLOCK`).
    pub fn set_blocking(&mut self) -> &mut Self {
        self.blocking = true;
        self
    }

    pub fn command(&self) -> Command {
        self.command
    }

    pub fn name(&self) -> &'static str {
        self.command.name()
    }

    pub fn flags(&self) -> CommandFlags {
        self.command.flags()
    }

    pub fn is_blocking(&self) -> bool {
        self.blocking
    }

    /// All tokens, command name first.
    pub fn tokens(&self) -> &[Bytes] {
        &self.tokens
    }

    /// First token after the name, used for sub-command checks.
    pub fn subcommand(&self) -> Option<&[u8]> {
        self.tokens.get(1).map(|t| &t[..])
    }

    pub fn keys(&self) -> impl Iterator<Item = &[u8]> {
        self.keys.iter().map(|&i| &self.tokens[i][..])
    }

    pub fn has_keys(&self) -> bool {
        !self.keys.is_empty()
    }

    /// Hash slot shared by all keys; `None` for key-less commands.
    pub fn slot(&self) -> Result<Option<u16>> {
        crc16::common_slot(self.keys()).map_err(|(first, second)| Error::CrossSlot {
            command: self.name(),
            first,
            second,
        })
    }

    /// Display name including the sub-command, e.g. `CLUSTER FORGET`.
    pub fn display_name(&self) -> String {
        match self.subcommand() {
            Some(sub) if !self.command.info().subcommands.is_empty() => {
                format!("{} {}", self.name(), String::from_utf8_lossy(sub).to_ascii_uppercase())
            }
            _ => self.name().to_string(),
        }
    }
}

impl fmt::Debug for CommandArgs {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut list = f.debug_list();
        for token in &self.tokens {
            list.entry(&String::from_utf8_lossy(token));
        }
        list.finish()
    }
}

/// Shorthand for `CommandArgs::new`.
pub fn cmd(command: Command) -> CommandArgs {
    CommandArgs::new(command)
}

// ── Tests ──────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    fn texts(args: &CommandArgs) -> Vec<String> {
        args.tokens()
            .iter()
            .map(|t| String::from_utf8_lossy(t).into_owned())
            .collect()
    }

    #[test]
    fn text_and_binary_inputs_match() {
        let a = cmd(Command::Set).key("k").arg("v");
        let b = cmd(Command::Set).key(&b"k"[..]).arg(b"v".to_vec());
        let c = cmd(Command::Set).key(Bytes::from_static(b"k")).arg(String::from("v"));
        assert_eq!(a, b);
        assert_eq!(b, c);
    }

    #[test]
    fn integers_are_canonical() {
        let args = cmd(Command::IncrBy).key("n").arg(-42i64);
        assert_eq!(texts(&args), ["INCRBY", "n", "-42"]);
        let args = cmd(Command::Expire).key("k").arg(u64::MAX);
        assert_eq!(texts(&args)[2], "18446744073709551615");
    }

    #[test]
    fn doubles() {
        assert_eq!(&format_double(1.5).unwrap()[..], b"1.5");
        assert_eq!(&format_double(3.0).unwrap()[..], b"3");
        assert_eq!(&format_double(0.1).unwrap()[..], b"0.1");
        assert_eq!(&format_double(f64::INFINITY).unwrap()[..], b"+inf");
        assert_eq!(&format_double(f64::NEG_INFINITY).unwrap()[..], b"-inf");
        assert!(matches!(format_double(f64::NAN), Err(Error::Argument(_))));
    }

    #[test]
    fn booleans_are_bits() {
        let args = cmd(Command::SetBit).key("b").arg(7u32).arg(true);
        assert_eq!(texts(&args), ["SETBIT", "b", "7", "1"]);
        assert_eq!(&false.to_arg()[..], b"0");
    }

    #[test]
    fn key_positions() {
        let mut args = cmd(Command::MSet);
        args.push_key("a").push("1").push_key("b").push("2");
        let keys: Vec<&[u8]> = args.keys().collect();
        assert_eq!(keys, [&b"a"[..], &b"b"[..]]);
    }

    #[test]
    fn slot_detection() {
        let args = cmd(Command::Get).key("foo");
        assert_eq!(args.slot().unwrap(), Some(12182));

        let args = cmd(Command::Ping);
        assert_eq!(args.slot().unwrap(), None);

        let mut args = cmd(Command::MGet);
        args.push_keys(["{t}1", "{t}2"]).unwrap();
        assert!(args.slot().unwrap().is_some());

        let mut args = cmd(Command::MGet);
        args.push_keys(["foo", "bar"]).unwrap();
        assert!(matches!(
            args.slot(),
            Err(Error::CrossSlot { command: "MGET", first: 12182, second: 5061 })
        ));
    }

    #[test]
    fn empty_variadic_rejected() {
        let mut args = cmd(Command::Del);
        let empty: Vec<&str> = Vec::new();
        assert!(matches!(args.push_keys(empty), Err(Error::Argument(_))));
    }

    #[test]
    fn subcommands() {
        let args = CommandArgs::with_sub(Command::Cluster, "forget").unwrap();
        assert_eq!(texts(&args), ["CLUSTER", "FORGET"]);
        assert_eq!(args.display_name(), "CLUSTER FORGET");

        assert!(matches!(
            CommandArgs::with_sub(Command::Cluster, "EXPLODE"),
            Err(Error::Argument(_))
        ));
        assert_eq!(cmd(Command::Get).key("k").display_name(), "GET");
    }

    #[test]
    fn blocking_marker() {
        assert!(cmd(Command::BLPop).is_blocking());
        let mut args = cmd(Command::XRead);
        assert!(!args.is_blocking());
        args.set_blocking();
        assert!(args.is_blocking());
    }

    #[test]
    fn debug_shows_tokens() {
        let args = cmd(Command::Get).key("k");
        assert_eq!(format!("{args:?}"), r#"["GET", "k"]"#);
    }
}
