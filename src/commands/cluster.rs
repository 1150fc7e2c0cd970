use crate::args::{CommandArgs, ToArg};
use crate::client::Client;
use crate::command::Command;
use crate::commands::server::parse_info;
use crate::connection::Transport;
use crate::error::Result;
use crate::reply::Status;
use crate::resp::RawReply;
use std::collections::HashMap;

fn cluster(sub: &str) -> Result<CommandArgs> {
    CommandArgs::with_sub(Command::Cluster, sub)
}

// Every CLUSTER sub-command is key-less and is answered by whichever primary
// serves the call.
impl<T: Transport> Client<T> {
    /// `CLUSTER INFO` as `field -> value`.
    pub async fn cluster_info(&self) -> Result<HashMap<String, String>> {
        let text: String = self.execute(cluster("INFO")?).await?;
        Ok(parse_info(&text))
    }

    pub async fn cluster_nodes(&self) -> Result<String> {
        self.execute(cluster("NODES")?).await
    }

    pub async fn cluster_myid(&self) -> Result<String> {
        self.execute(cluster("MYID")?).await
    }

    pub async fn cluster_slots(&self) -> Result<RawReply> {
        self.execute(cluster("SLOTS")?).await
    }

    pub async fn cluster_shards(&self) -> Result<RawReply> {
        self.execute(cluster("SHARDS")?).await
    }

    /// Slot the server computes for `key`; see [`crc16::hash_slot`](crate::crc16::hash_slot)
    /// for the local equivalent.
    pub async fn cluster_keyslot(&self, key: impl ToArg) -> Result<i64> {
        self.execute(cluster("KEYSLOT")?.arg(key)).await
    }

    pub async fn cluster_meet(&self, host: &str, port: u16) -> Result<Status> {
        self.execute(cluster("MEET")?.arg(host).arg(port)).await
    }

    pub async fn cluster_forget(&self, node_id: impl ToArg) -> Result<Status> {
        self.execute(cluster("FORGET")?.arg(node_id)).await
    }

    pub async fn cluster_replicas(&self, node_id: impl ToArg) -> Result<Vec<String>> {
        self.execute(cluster("REPLICAS")?.arg(node_id)).await
    }

    /// `CLUSTER FAILOVER [FORCE|TAKEOVER]`.
    pub async fn cluster_failover(&self, mode: Option<&str>) -> Result<Status> {
        let mut args = cluster("FAILOVER")?;
        if let Some(mode) = mode {
            args.push(mode);
        }
        self.execute(args).await
    }
}
