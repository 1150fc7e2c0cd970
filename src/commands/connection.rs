use crate::args::{cmd, CommandArgs, ToArg};
use crate::client::Client;
use crate::command::Command;
use crate::connection::Transport;
use crate::error::Result;
use crate::reply::FromReply;

// AUTH, SELECT and HELLO belong to the connection handshake; on a pooled
// connection they would only change one member of the pool.
impl<T: Transport> Client<T> {
    /// `PONG`, or the message echoed back.
    pub async fn ping(&self, message: Option<&str>) -> Result<String> {
        let mut args = cmd(Command::Ping);
        if let Some(message) = message {
            args.push(message);
        }
        self.execute(args).await
    }

    pub async fn echo<R: FromReply>(&self, message: impl ToArg) -> Result<R> {
        self.execute(cmd(Command::Echo).arg(message)).await
    }

    /// Id of whichever pooled connection served the call.
    pub async fn client_id(&self) -> Result<i64> {
        self.execute(CommandArgs::with_sub(Command::Client, "ID")?).await
    }

    pub async fn client_info(&self) -> Result<String> {
        self.execute(CommandArgs::with_sub(Command::Client, "INFO")?).await
    }

    pub async fn client_list(&self) -> Result<String> {
        self.execute(CommandArgs::with_sub(Command::Client, "LIST")?).await
    }

    pub async fn client_getname(&self) -> Result<Option<String>> {
        self.execute(CommandArgs::with_sub(Command::Client, "GETNAME")?).await
    }

    /// `CLIENT KILL ID id`; number of clients killed.
    pub async fn client_kill_id(&self, id: i64) -> Result<i64> {
        self.execute(CommandArgs::with_sub(Command::Client, "KILL")?.arg("ID").arg(id))
            .await
    }

    /// Unblock a client parked in a blocking command; `error` makes the
    /// blocked call fail instead of timing out.
    pub async fn client_unblock(&self, id: i64, error: bool) -> Result<bool> {
        let mut args = CommandArgs::with_sub(Command::Client, "UNBLOCK")?.arg(id);
        if error {
            args.push("ERROR");
        }
        self.execute(args).await
    }
}
