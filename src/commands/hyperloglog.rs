use crate::args::{cmd, ToArg};
use crate::client::Client;
use crate::command::Command;
use crate::connection::Transport;
use crate::error::Result;
use crate::reply::Status;

impl<T: Transport> Client<T> {
    /// `true` when the estimate changed. With no elements only creates the key.
    pub async fn pfadd<E: ToArg>(&self, key: impl ToArg, elements: impl IntoIterator<Item = E>) -> Result<bool> {
        let mut args = cmd(Command::PfAdd).key(key);
        for e in elements {
            args.push(e);
        }
        self.execute(args).await
    }

    /// Estimated cardinality of the union of `keys`.
    pub async fn pfcount<K: ToArg>(&self, keys: impl IntoIterator<Item = K>) -> Result<i64> {
        let mut args = cmd(Command::PfCount);
        args.push_keys(keys)?;
        self.execute(args).await
    }

    pub async fn pfmerge<K: ToArg>(&self, destination: impl ToArg, sources: impl IntoIterator<Item = K>) -> Result<Status> {
        let mut args = cmd(Command::PfMerge).key(destination);
        for source in sources {
            args.push_key(source);
        }
        self.execute(args).await
    }
}
