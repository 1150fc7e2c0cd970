use crate::args::{CommandArgs, ToArg};
use crate::client::Client;
use crate::command::Command;
use crate::connection::Transport;
use crate::error::Result;
use crate::reply::Status;
use crate::resp::RawReply;
use std::collections::HashMap;

fn acl(sub: &str) -> Result<CommandArgs> {
    CommandArgs::with_sub(Command::Acl, sub)
}

impl<T: Transport> Client<T> {
    pub async fn acl_whoami(&self) -> Result<String> {
        self.execute(acl("WHOAMI")?).await
    }

    pub async fn acl_users(&self) -> Result<Vec<String>> {
        self.execute(acl("USERS")?).await
    }

    /// Rules in `ACL SETUSER` syntax, one line per user.
    pub async fn acl_list(&self) -> Result<Vec<String>> {
        self.execute(acl("LIST")?).await
    }

    /// Create or modify a user; `rules` are passed through verbatim
    /// (`on`, `>password`, `~keys:*`, `+@read`, …).
    pub async fn acl_setuser<R: ToArg>(&self, username: impl ToArg, rules: impl IntoIterator<Item = R>) -> Result<Status> {
        let mut args = acl("SETUSER")?.arg(username);
        for rule in rules {
            args.push(rule);
        }
        self.execute(args).await
    }

    /// Number of users deleted.
    pub async fn acl_deluser<U: ToArg>(&self, usernames: impl IntoIterator<Item = U>) -> Result<i64> {
        let mut args = acl("DELUSER")?;
        args.push_all(usernames)?;
        self.execute(args).await
    }

    /// User description, nil when the user does not exist.
    pub async fn acl_getuser(&self, username: impl ToArg) -> Result<Option<HashMap<String, RawReply>>> {
        self.execute(acl("GETUSER")?.arg(username)).await
    }

    /// Categories, or the commands in one category.
    pub async fn acl_cat(&self, category: Option<&str>) -> Result<Vec<String>> {
        let mut args = acl("CAT")?;
        if let Some(category) = category {
            args.push(category);
        }
        self.execute(args).await
    }

    pub async fn acl_genpass(&self, bits: Option<u32>) -> Result<String> {
        let mut args = acl("GENPASS")?;
        if let Some(bits) = bits {
            args.push(bits);
        }
        self.execute(args).await
    }

    /// `OK`, or the reason the user may not run the command.
    pub async fn acl_dryrun<A: ToArg>(
        &self,
        username: impl ToArg,
        command: impl ToArg,
        argv: impl IntoIterator<Item = A>,
    ) -> Result<String> {
        let mut args = acl("DRYRUN")?.arg(username).arg(command);
        for a in argv {
            args.push(a);
        }
        self.execute(args).await
    }

    pub async fn acl_log(&self, count: Option<u64>) -> Result<Vec<HashMap<String, RawReply>>> {
        let mut args = acl("LOG")?;
        if let Some(count) = count {
            args.push(count);
        }
        self.execute(args).await
    }

    pub async fn acl_log_reset(&self) -> Result<Status> {
        self.execute(acl("LOG")?.arg("RESET")).await
    }

    pub async fn acl_save(&self) -> Result<Status> {
        self.execute(acl("SAVE")?).await
    }

    pub async fn acl_load(&self) -> Result<Status> {
        self.execute(acl("LOAD")?).await
    }
}
