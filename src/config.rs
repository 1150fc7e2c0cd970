//! Client configuration and URL parsing.
//!
//! Supports the following URL schemes:
//! - `redis://[user:pass@]host[:port][/db]`          standalone
//! - `rediss://[user:pass@]host[:port][/db]`         standalone + TLS
//! - `redis+sentinel://[user:pass@]master@host[:port][,host[:port]…][/db]`
//! - `redis+cluster://[user:pass@]host[:port][,host[:port]…]`

use crate::connection::tcp::{TcpSettings, DEFAULT_MAX_BUF_SIZE};
use crate::connection::PoolConfig;
use crate::dispatch::{Dispatcher, RetryPolicy};
use crate::error::{Error, Result};
use crate::router::cluster::ClusterSettings;
use crate::router::Mode;
use std::time::Duration;

/// Default Redis port.
pub const DEFAULT_PORT: u16 = 6379;
/// Default Redis Sentinel port.
pub const DEFAULT_SENTINEL_PORT: u16 = 26379;

/// How to reach the deployment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Topology {
    /// Single Redis server at `host:port`.
    Standalone,
    /// Master resolved by name through a list of sentinels.
    Sentinel {
        master_name: String,
        sentinels: Vec<(String, u16)>,
    },
    /// Cluster discovered from seed nodes.
    Cluster { nodes: Vec<(String, u16)> },
}

impl Topology {
    pub fn mode(&self) -> Mode {
        match self {
            Self::Standalone => Mode::Standalone,
            Self::Sentinel { .. } => Mode::Sentinel,
            Self::Cluster { .. } => Mode::Cluster,
        }
    }
}

/// Full client configuration.
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Standalone host, or the first sentinel / seed node.
    pub host: String,
    pub port: u16,
    /// Redis 6+ ACL user.
    pub username: Option<String>,
    pub password: Option<String>,
    /// Credentials for sentinel nodes when they differ from the data nodes'.
    pub sentinel_username: Option<String>,
    pub sentinel_password: Option<String>,
    /// Database index; must be 0 in cluster mode.
    pub db: u16,
    pub tls: bool,
    pub topology: Topology,
    /// Connection pool size per node.
    pub pool_size: usize,
    pub connect_timeout: Duration,
    /// Default reply deadline for non-blocking commands; `None` waits forever.
    pub response_timeout: Option<Duration>,
    /// Idle connections older than this are dropped.
    pub idle_timeout: Duration,
    /// Maximum read buffer size per connection in bytes.
    pub max_buffer_size: usize,
    pub retry: RetryPolicy,
    /// Redirects followed per cluster call before giving up.
    pub max_redirects: usize,
    /// Background slot map refresh; `None` refreshes only on demand.
    pub slot_refresh_interval: Option<Duration>,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: DEFAULT_PORT,
            username: None,
            password: None,
            sentinel_username: None,
            sentinel_password: None,
            db: 0,
            tls: false,
            topology: Topology::Standalone,
            pool_size: 8,
            connect_timeout: Duration::from_secs(5),
            response_timeout: Some(Duration::from_secs(30)),
            idle_timeout: Duration::from_secs(300),
            max_buffer_size: DEFAULT_MAX_BUF_SIZE,
            retry: RetryPolicy::default(),
            max_redirects: 5,
            slot_refresh_interval: Some(Duration::from_secs(30)),
        }
    }
}

impl ClientConfig {
    /// Parse a Redis URL.
    pub fn from_url(url: &str) -> Result<Self> {
        let mut config = Self::default();

        let (scheme, rest) = url
            .split_once("://")
            .ok_or_else(|| Error::Argument(format!("invalid URL, missing ://: {url}")))?;

        match scheme {
            "redis" => parse_standalone_url(&mut config, rest)?,
            "rediss" => {
                config.tls = true;
                parse_standalone_url(&mut config, rest)?;
            }
            "redis+sentinel" | "redis+sentinels" => {
                config.tls = scheme == "redis+sentinels";
                parse_sentinel_url(&mut config, rest)?;
            }
            "redis+cluster" | "rediss+cluster" => {
                config.tls = scheme == "rediss+cluster";
                parse_cluster_url(&mut config, rest)?;
            }
            _ => return Err(Error::Argument(format!("unknown URL scheme: {scheme}"))),
        }
        config.validate()?;
        Ok(config)
    }

    /// Reject combinations no router can serve.
    pub fn validate(&self) -> Result<()> {
        if self.pool_size == 0 {
            return Err(Error::Argument("pool_size must be at least 1".into()));
        }
        if self.retry.max_attempts == 0 {
            return Err(Error::Argument("retry.max_attempts must be at least 1".into()));
        }
        if matches!(self.topology, Topology::Cluster { .. }) && self.db != 0 {
            return Err(Error::Argument(format!(
                "cluster mode only supports db 0, got {}",
                self.db
            )));
        }
        Ok(())
    }

    pub fn mode(&self) -> Mode {
        self.topology.mode()
    }

    /// The primary address as `host:port`.
    pub fn primary_addr(&self) -> String {
        join_addr(&self.host, self.port)
    }

    pub fn tcp_settings(&self) -> TcpSettings {
        TcpSettings {
            username: self.username.clone(),
            password: self.password.clone(),
            db: if self.mode() == Mode::Cluster { 0 } else { self.db },
            sentinel_username: self.sentinel_username.clone(),
            sentinel_password: self.sentinel_password.clone(),
            tls: self.tls,
            max_buffer_size: self.max_buffer_size,
        }
    }

    pub fn pool_config(&self) -> PoolConfig {
        PoolConfig {
            max_size: self.pool_size,
            idle_timeout: self.idle_timeout,
            connect_timeout: self.connect_timeout,
        }
    }

    pub fn dispatcher(&self) -> Dispatcher {
        Dispatcher {
            response_timeout: self.response_timeout,
            retry: self.retry,
        }
    }

    pub fn cluster_settings(&self) -> ClusterSettings {
        ClusterSettings {
            max_redirects: self.max_redirects,
            refresh_interval: self.slot_refresh_interval,
        }
    }
}

/// `host:port`, bracketing IPv6 hosts.
pub(crate) fn join_addr(host: &str, port: u16) -> String {
    if host.contains(':') {
        format!("[{host}]:{port}")
    } else {
        format!("{host}:{port}")
    }
}

fn parse_db(config: &mut ClientConfig, db_part: Option<&str>) -> Result<()> {
    if let Some(db_str) = db_part {
        config.db = db_str
            .parse()
            .map_err(|_| Error::Argument(format!("invalid db number: {db_str}")))?;
    }
    Ok(())
}

/// Parse `[user:pass@]host[:port][/db]`
fn parse_standalone_url(config: &mut ClientConfig, rest: &str) -> Result<()> {
    let (host_part, db_part) = split_path(rest);
    parse_db(config, db_part)?;

    let host_port = match host_part.rsplit_once('@') {
        Some((userinfo, hp)) => {
            parse_userinfo(config, userinfo);
            hp
        }
        None => host_part,
    };

    let (host, port) = parse_host_port(host_port, DEFAULT_PORT)?;
    config.host = host;
    config.port = port;
    Ok(())
}

/// Parse `[user:pass@]master@host[:port][,host[:port]…][/db]`
fn parse_sentinel_url(config: &mut ClientConfig, rest: &str) -> Result<()> {
    let (host_part, db_part) = split_path(rest);
    parse_db(config, db_part)?;

    // One '@' separates master from hosts; a second one precedes credentials.
    let (master_name, sentinel_hosts) = match host_part.rsplit_once('@') {
        None => {
            return Err(Error::Argument(
                "sentinel URL must include master name: redis+sentinel://master@host:port".into(),
            ))
        }
        Some((before, hosts)) => match before.rsplit_once('@') {
            Some((userinfo, master)) => {
                parse_userinfo(config, userinfo);
                (master, hosts)
            }
            None => (before, hosts),
        },
    };

    if master_name.is_empty() {
        return Err(Error::Argument("empty sentinel master name".into()));
    }

    let sentinels = parse_host_list(sentinel_hosts, DEFAULT_SENTINEL_PORT)?;
    let Some((host, port)) = sentinels.first().cloned() else {
        return Err(Error::Argument(
            "sentinel URL must include at least one sentinel host".into(),
        ));
    };

    config.host = host;
    config.port = port;
    config.topology = Topology::Sentinel {
        master_name: master_name.to_string(),
        sentinels,
    };
    Ok(())
}

/// Parse `[user:pass@]host1[:port][,host2[:port]…][/db]`
fn parse_cluster_url(config: &mut ClientConfig, rest: &str) -> Result<()> {
    let (host_part, db_part) = split_path(rest);
    parse_db(config, db_part)?;

    let hosts = match host_part.rsplit_once('@') {
        Some((userinfo, hp)) => {
            parse_userinfo(config, userinfo);
            hp
        }
        None => host_part,
    };

    let nodes = parse_host_list(hosts, DEFAULT_PORT)?;
    let Some((host, port)) = nodes.first().cloned() else {
        return Err(Error::Argument("cluster URL must include at least one node".into()));
    };

    config.host = host;
    config.port = port;
    config.topology = Topology::Cluster { nodes };
    Ok(())
}

// ── URL parsing helpers ────────────────────────────────────────────

/// Split `rest` into (before_path, Some(path)) or (rest, None).
fn split_path(rest: &str) -> (&str, Option<&str>) {
    match rest.split_once('/') {
        Some((before, after)) if !after.is_empty() => (before, Some(after)),
        Some((before, _)) => (before, None),
        None => (rest, None),
    }
}

/// Parse `user:pass`, `:pass` or a bare password.
fn parse_userinfo(config: &mut ClientConfig, userinfo: &str) {
    match userinfo.split_once(':') {
        Some((user, pass)) => {
            if !user.is_empty() {
                config.username = Some(user.to_string());
            }
            if !pass.is_empty() {
                config.password = Some(pass.to_string());
            }
        }
        None if !userinfo.is_empty() => config.password = Some(userinfo.to_string()),
        None => {}
    }
}

fn parse_host_list(list: &str, default_port: u16) -> Result<Vec<(String, u16)>> {
    list.split(',')
        .map(str::trim)
        .filter(|addr| !addr.is_empty())
        .map(|addr| parse_host_port(addr, default_port))
        .collect()
}

/// Parse `host[:port]` or `[ipv6]:port`.
fn parse_host_port(s: &str, default_port: u16) -> Result<(String, u16)> {
    let parse_port = |p: &str| {
        p.parse::<u16>()
            .map_err(|_| Error::Argument(format!("invalid port: {p}")))
    };

    let (host, port) = if let Some(bracketed) = s.strip_prefix('[') {
        let (host, after) = bracketed
            .split_once(']')
            .ok_or_else(|| Error::Argument(format!("unclosed IPv6 bracket: {s}")))?;
        match after.strip_prefix(':') {
            Some(p) => (host.to_string(), parse_port(p)?),
            None => (host.to_string(), default_port),
        }
    } else if let Some((h, p)) = s.rsplit_once(':') {
        match p.parse::<u16>() {
            Ok(port) => (h.to_string(), port),
            // Bare IPv6 without brackets
            Err(_) if h.contains(':') => (s.to_string(), default_port),
            Err(_) => return Err(Error::Argument(format!("invalid port: {p}"))),
        }
    } else {
        (s.to_string(), default_port)
    };

    if host.is_empty() {
        return Ok(("127.0.0.1".to_string(), port));
    }
    Ok((host, port))
}

// ── Tests ──────────────────────────────────────────────────────────
