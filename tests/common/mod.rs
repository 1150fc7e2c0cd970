//! Shared helpers for integration tests.
//!
//! [`MockTransport`] stands in for the wire: each node address gets a
//! handler that answers commands, every command sent is logged with its
//! exact tokens, and nodes can be marked unreachable.

#![allow(dead_code)]

use bytes::Bytes;
use parking_lot::Mutex;
use rsedis::connection::NodeRole;
use rsedis::{ClientConfig, CommandArgs, Error, RawReply, Result, RetryPolicy, Topology, Transport};
use std::collections::{HashMap, HashSet};
use std::io;
use std::sync::{Arc, Once};
use std::time::Duration;

/// What a node does with one command.
pub enum Step {
    Reply(RawReply),
    /// Drop the connection after the request was written.
    Drop,
}

type Handler = Box<dyn FnMut(&[String]) -> Step + Send>;

/// One logged command.
#[derive(Debug, Clone)]
pub struct Sent {
    pub addr: String,
    pub tokens: Vec<Bytes>,
}

impl Sent {
    pub fn text(&self) -> Vec<String> {
        self.tokens
            .iter()
            .map(|t| String::from_utf8_lossy(t).into_owned())
            .collect()
    }

    /// Topology queries issued by the router itself.
    pub fn is_topology_query(&self) -> bool {
        let text = self.text();
        text.first().map(String::as_str) == Some("CLUSTER")
            && matches!(text.get(1).map(String::as_str), Some("SLOTS" | "SHARDS"))
    }
}

#[derive(Default)]
struct Inner {
    nodes: HashMap<String, Handler>,
    unreachable: HashSet<String>,
    sent: Vec<Sent>,
    connects: Vec<String>,
}

#[derive(Clone, Default)]
pub struct MockTransport {
    inner: Arc<Mutex<Inner>>,
}

pub struct MockConn {
    addr: String,
}

/// Route client logs to the test output; filter with `RUST_LOG`.
pub fn init_tracing() {
    static INIT: Once = Once::new();
    INIT.call_once(|| {
        let _ = tracing_subscriber::fmt()
            .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
            .with_test_writer()
            .try_init();
    });
}

impl MockTransport {
    pub fn new() -> Self {
        init_tracing();
        Self::default()
    }

    pub fn node(&self, addr: &str, handler: impl FnMut(&[String]) -> Step + Send + 'static) -> &Self {
        self.inner.lock().nodes.insert(addr.to_string(), Box::new(handler));
        self
    }

    pub fn set_unreachable(&self, addr: &str, down: bool) {
        let mut inner = self.inner.lock();
        if down {
            inner.unreachable.insert(addr.to_string());
        } else {
            inner.unreachable.remove(addr);
        }
    }

    pub fn sent(&self) -> Vec<Sent> {
        self.inner.lock().sent.clone()
    }

    /// Logged commands other than the router's own topology queries.
    pub fn data_commands(&self) -> Vec<Sent> {
        self.sent().into_iter().filter(|s| !s.is_topology_query()).collect()
    }

    pub fn connects(&self) -> Vec<String> {
        self.inner.lock().connects.clone()
    }

    pub fn clear_log(&self) {
        let mut inner = self.inner.lock();
        inner.sent.clear();
        inner.connects.clear();
    }
}

impl Transport for MockTransport {
    type Connection = MockConn;

    async fn connect(&self, addr: &str, _role: NodeRole) -> Result<MockConn> {
        let mut inner = self.inner.lock();
        if inner.unreachable.contains(addr) || !inner.nodes.contains_key(addr) {
            return Err(Error::Connection(io::Error::new(
                io::ErrorKind::ConnectionRefused,
                format!("{addr} refused"),
            )));
        }
        inner.connects.push(addr.to_string());
        Ok(MockConn {
            addr: addr.to_string(),
        })
    }

    async fn send(&self, conn: &mut MockConn, args: &CommandArgs) -> Result<RawReply> {
        let mut inner = self.inner.lock();
        let sent = Sent {
            addr: conn.addr.clone(),
            tokens: args.tokens().to_vec(),
        };
        let text = sent.text();
        inner.sent.push(sent);
        if inner.unreachable.contains(&conn.addr) {
            return Err(Error::Transport(io::Error::new(io::ErrorKind::BrokenPipe, "node went away")));
        }
        let handler = inner
            .nodes
            .get_mut(&conn.addr)
            .ok_or_else(|| Error::Transport(io::Error::new(io::ErrorKind::NotConnected, "no handler")))?;
        match handler(&text) {
            Step::Reply(reply) => Ok(reply),
            Step::Drop => Err(Error::Transport(io::Error::new(
                io::ErrorKind::ConnectionReset,
                "connection reset by peer",
            ))),
        }
    }
}

// ── Reply builders ─────────────────────────────────────────────────

pub fn ok() -> Step {
    Step::Reply(RawReply::SimpleString("OK".into()))
}

pub fn bulk(s: &str) -> RawReply {
    RawReply::Bulk(Bytes::copy_from_slice(s.as_bytes()))
}

pub fn int(n: i64) -> Step {
    Step::Reply(RawReply::Integer(n))
}

pub fn err(msg: &str) -> Step {
    Step::Reply(RawReply::Error(msg.to_string()))
}

/// `CLUSTER SLOTS` reply for `(start, end, "host:port")` ranges.
pub fn cluster_slots(ranges: &[(u16, u16, &str)]) -> RawReply {
    RawReply::Array(
        ranges
            .iter()
            .map(|(start, end, addr)| {
                let (host, port) = addr.rsplit_once(':').unwrap();
                RawReply::Array(vec![
                    RawReply::Integer(i64::from(*start)),
                    RawReply::Integer(i64::from(*end)),
                    RawReply::Array(vec![
                        bulk(host),
                        RawReply::Integer(port.parse().unwrap()),
                        bulk("node-id"),
                    ]),
                ])
            })
            .collect(),
    )
}

fn is_cluster_slots(cmd: &[String]) -> bool {
    cmd.len() == 2 && cmd[0] == "CLUSTER" && cmd[1] == "SLOTS"
}

/// Answer `CLUSTER SLOTS` with `map` and everything else with `on_command`.
pub fn cluster_node(
    map: RawReply,
    mut on_command: impl FnMut(&[String]) -> Step + Send + 'static,
) -> impl FnMut(&[String]) -> Step + Send + 'static {
    move |cmd| {
        if is_cluster_slots(cmd) {
            Step::Reply(map.clone())
        } else {
            on_command(cmd)
        }
    }
}

// ── Configuration ──────────────────────────────────────────────────

fn fast(mut config: ClientConfig) -> ClientConfig {
    config.connect_timeout = Duration::from_millis(200);
    config.response_timeout = Some(Duration::from_millis(500));
    config.retry = RetryPolicy {
        max_attempts: 3,
        base_backoff: Duration::from_millis(1),
        max_backoff: Duration::from_millis(5),
    };
    config.slot_refresh_interval = None;
    config
}

pub fn standalone_config(addr: &str) -> ClientConfig {
    let (host, port) = addr.rsplit_once(':').unwrap();
    fast(ClientConfig {
        host: host.to_string(),
        port: port.parse().unwrap(),
        ..ClientConfig::default()
    })
}

pub fn cluster_config(seeds: &[&str]) -> ClientConfig {
    let nodes: Vec<(String, u16)> = seeds
        .iter()
        .map(|s| {
            let (h, p) = s.rsplit_once(':').unwrap();
            (h.to_string(), p.parse().unwrap())
        })
        .collect();
    let (host, port) = nodes[0].clone();
    fast(ClientConfig {
        host,
        port,
        topology: Topology::Cluster { nodes },
        ..ClientConfig::default()
    })
}

pub fn sentinel_config(master_name: &str, sentinels: &[&str]) -> ClientConfig {
    let sentinels: Vec<(String, u16)> = sentinels
        .iter()
        .map(|s| {
            let (h, p) = s.rsplit_once(':').unwrap();
            (h.to_string(), p.parse().unwrap())
        })
        .collect();
    let (host, port) = sentinels[0].clone();
    fast(ClientConfig {
        host,
        port,
        topology: Topology::Sentinel {
            master_name: master_name.to_string(),
            sentinels,
        },
        ..ClientConfig::default()
    })
}

/// Unique key prefix per test for live-server runs.
pub fn test_prefix(name: &str) -> String {
    format!("rsedis_test_{}_{name}", std::process::id())
}
