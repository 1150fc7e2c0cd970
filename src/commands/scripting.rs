use crate::args::{cmd, CommandArgs, ToArg};
use crate::client::Client;
use crate::command::Command;
use crate::connection::Transport;
use crate::error::Result;
use crate::reply::{FromReply, Status};
use crate::resp::RawReply;

/// `script numkeys key… arg…`; the keys take part in slot routing.
fn script_args<K: ToArg, A: ToArg>(
    command: Command,
    script: impl ToArg,
    keys: impl IntoIterator<Item = K>,
    argv: impl IntoIterator<Item = A>,
) -> CommandArgs {
    let keys: Vec<K> = keys.into_iter().collect();
    let mut args = cmd(command).arg(script).arg(keys.len());
    for key in keys {
        args.push_key(key);
    }
    for a in argv {
        args.push(a);
    }
    args
}

impl<T: Transport> Client<T> {
    pub async fn eval<K: ToArg, A: ToArg, R: FromReply>(
        &self,
        script: impl ToArg,
        keys: impl IntoIterator<Item = K>,
        argv: impl IntoIterator<Item = A>,
    ) -> Result<R> {
        self.execute(script_args(Command::Eval, script, keys, argv)).await
    }

    pub async fn eval_ro<K: ToArg, A: ToArg, R: FromReply>(
        &self,
        script: impl ToArg,
        keys: impl IntoIterator<Item = K>,
        argv: impl IntoIterator<Item = A>,
    ) -> Result<R> {
        self.execute(script_args(Command::EvalRo, script, keys, argv)).await
    }

    /// `EVALSHA`; a `NOSCRIPT` reply surfaces as
    /// [`ServerErrorKind::NoScript`](crate::ServerErrorKind::NoScript).
    pub async fn evalsha<K: ToArg, A: ToArg, R: FromReply>(
        &self,
        sha1: impl ToArg,
        keys: impl IntoIterator<Item = K>,
        argv: impl IntoIterator<Item = A>,
    ) -> Result<R> {
        self.execute(script_args(Command::EvalSha, sha1, keys, argv)).await
    }

    pub async fn evalsha_ro<K: ToArg, A: ToArg, R: FromReply>(
        &self,
        sha1: impl ToArg,
        keys: impl IntoIterator<Item = K>,
        argv: impl IntoIterator<Item = A>,
    ) -> Result<R> {
        self.execute(script_args(Command::EvalShaRo, sha1, keys, argv)).await
    }

    pub async fn fcall<K: ToArg, A: ToArg, R: FromReply>(
        &self,
        function: impl ToArg,
        keys: impl IntoIterator<Item = K>,
        argv: impl IntoIterator<Item = A>,
    ) -> Result<R> {
        self.execute(script_args(Command::FCall, function, keys, argv)).await
    }

    pub async fn fcall_ro<K: ToArg, A: ToArg, R: FromReply>(
        &self,
        function: impl ToArg,
        keys: impl IntoIterator<Item = K>,
        argv: impl IntoIterator<Item = A>,
    ) -> Result<R> {
        self.execute(script_args(Command::FCallRo, function, keys, argv)).await
    }

    /// SHA1 digest of the cached script.
    pub async fn script_load(&self, script: impl ToArg) -> Result<String> {
        self.execute(CommandArgs::with_sub(Command::Script, "LOAD")?.arg(script)).await
    }

    pub async fn script_exists<S: ToArg>(&self, sha1s: impl IntoIterator<Item = S>) -> Result<Vec<bool>> {
        let mut args = CommandArgs::with_sub(Command::Script, "EXISTS")?;
        args.push_all(sha1s)?;
        self.execute(args).await
    }

    pub async fn script_flush(&self) -> Result<Status> {
        self.execute(CommandArgs::with_sub(Command::Script, "FLUSH")?).await
    }

    pub async fn script_kill(&self) -> Result<Status> {
        self.execute(CommandArgs::with_sub(Command::Script, "KILL")?).await
    }

    /// Library name registered by the code.
    pub async fn function_load(&self, code: impl ToArg, replace: bool) -> Result<String> {
        let mut args = CommandArgs::with_sub(Command::Function, "LOAD")?;
        if replace {
            args.push("REPLACE");
        }
        self.execute(args.arg(code)).await
    }

    pub async fn function_delete(&self, library: impl ToArg) -> Result<Status> {
        self.execute(CommandArgs::with_sub(Command::Function, "DELETE")?.arg(library)).await
    }

    pub async fn function_flush(&self) -> Result<Status> {
        self.execute(CommandArgs::with_sub(Command::Function, "FLUSH")?).await
    }

    /// Library descriptions, left raw.
    pub async fn function_list(&self, pattern: Option<&str>, with_code: bool) -> Result<RawReply> {
        let mut args = CommandArgs::with_sub(Command::Function, "LIST")?;
        if let Some(pattern) = pattern {
            args.push("LIBRARYNAME").push(pattern);
        }
        if with_code {
            args.push("WITHCODE");
        }
        self.execute(args).await
    }

    pub async fn function_dump(&self) -> Result<bytes::Bytes> {
        self.execute(CommandArgs::with_sub(Command::Function, "DUMP")?).await
    }

    pub async fn function_restore(&self, payload: impl ToArg) -> Result<Status> {
        self.execute(CommandArgs::with_sub(Command::Function, "RESTORE")?.arg(payload))
            .await
    }
}
