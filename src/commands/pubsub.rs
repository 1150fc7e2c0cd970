use crate::args::{cmd, CommandArgs, ToArg};
use crate::client::Client;
use crate::command::Command;
use crate::connection::Transport;
use crate::error::Result;
use crate::reply::FromReply;

// Publishing only; a subscriber needs a dedicated connection outside the pool.
impl<T: Transport> Client<T> {
    /// Number of clients that received the message.
    pub async fn publish(&self, channel: impl ToArg, message: impl ToArg) -> Result<i64> {
        self.execute(cmd(Command::Publish).arg(channel).arg(message)).await
    }

    /// Sharded publish; the channel routes like a key.
    pub async fn spublish(&self, shard_channel: impl ToArg, message: impl ToArg) -> Result<i64> {
        self.execute(cmd(Command::SPublish).key(shard_channel).arg(message)).await
    }

    pub async fn pubsub_channels<R: FromReply>(&self, pattern: Option<&str>) -> Result<Vec<R>> {
        let mut args = CommandArgs::with_sub(Command::PubSubCmd, "CHANNELS")?;
        if let Some(pattern) = pattern {
            args.push(pattern);
        }
        self.execute(args).await
    }

    pub async fn pubsub_numpat(&self) -> Result<i64> {
        self.execute(CommandArgs::with_sub(Command::PubSubCmd, "NUMPAT")?).await
    }

    /// Subscriber count per channel, in request order.
    pub async fn pubsub_numsub<C: ToArg>(&self, channels: impl IntoIterator<Item = C>) -> Result<Vec<(String, i64)>> {
        let mut args = CommandArgs::with_sub(Command::PubSubCmd, "NUMSUB")?;
        for channel in channels {
            args.push(channel);
        }
        let reply = self.call(args).await?;
        crate::reply::decode::pairs(reply)
    }

    pub async fn pubsub_shard_channels<R: FromReply>(&self, pattern: Option<&str>) -> Result<Vec<R>> {
        let mut args = CommandArgs::with_sub(Command::PubSubCmd, "SHARDCHANNELS")?;
        if let Some(pattern) = pattern {
            args.push(pattern);
        }
        self.execute(args).await
    }
}
