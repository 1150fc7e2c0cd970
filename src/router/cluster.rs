//! Redis Cluster topology router.
//!
//! Routes commands to the primary owning the hash slot of their keys.
//! Handles `MOVED`, `ASK` and `TRYAGAIN` within a redirect budget, refreshes
//! the slot map when no owner is known or a node is unreachable, and can
//! refresh periodically in the background.

use crate::args::{cmd, CommandArgs};
use crate::command::Command;
use crate::connection::{ConnectionPool, NodeRole, PoolConfig, Transport};
use crate::crc16;
use crate::dispatch::{trace_state, CallOptions, CallState, Dispatcher};
use crate::error::{Error, Result, ServerErrorKind};
use crate::reply::decode;
use crate::resp::RawReply;
use crate::router::{Mode, Router};

use parking_lot::RwLock;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

/// Number of hash slots in a cluster.
pub const SLOT_COUNT: usize = 16384;

const UNASSIGNED: u16 = u16::MAX;

// ── Slot map ──────────────────────────────────────────────────────

/// Slot → primary mapping.
///
/// One owner index per slot into a list of node addresses, so a `MOVED`
/// reassigns exactly one slot.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SlotMap {
    owners: Vec<u16>,
    nodes: Vec<String>,
}

impl Default for SlotMap {
    fn default() -> Self {
        Self {
            owners: vec![UNASSIGNED; SLOT_COUNT],
            nodes: Vec::new(),
        }
    }
}

impl SlotMap {
    /// Build from `(start, end, primary)` ranges, bounds inclusive.
    pub fn from_ranges<I, S>(ranges: I) -> Self
    where
        I: IntoIterator<Item = (u16, u16, S)>,
        S: Into<String>,
    {
        let mut map = Self::default();
        for (start, end, addr) in ranges {
            let idx = map.node_index(addr.into());
            for slot in start..=end.min(SLOT_COUNT as u16 - 1) {
                map.owners[slot as usize] = idx;
            }
        }
        map
    }

    fn node_index(&mut self, addr: String) -> u16 {
        match self.nodes.iter().position(|n| *n == addr) {
            Some(i) => i as u16,
            None => {
                self.nodes.push(addr);
                (self.nodes.len() - 1) as u16
            }
        }
    }

    pub fn node_for_slot(&self, slot: u16) -> Option<&str> {
        match self.owners.get(slot as usize) {
            Some(&idx) if idx != UNASSIGNED => self.nodes.get(idx as usize).map(String::as_str),
            _ => None,
        }
    }

    /// A primary for key-less commands.
    pub fn any_primary(&self) -> Option<&str> {
        self.owners
            .iter()
            .find(|&&idx| idx != UNASSIGNED)
            .and_then(|&idx| self.nodes.get(idx as usize))
            .map(String::as_str)
    }

    /// Every address the map has referred to.
    pub fn nodes(&self) -> &[String] {
        &self.nodes
    }

    pub fn is_empty(&self) -> bool {
        self.owners.iter().all(|&idx| idx == UNASSIGNED)
    }

    /// Reassign one slot (after `MOVED`).
    pub fn assign(&mut self, slot: u16, addr: &str) {
        if (slot as usize) < SLOT_COUNT {
            let idx = self.node_index(addr.to_string());
            self.owners[slot as usize] = idx;
        }
    }

    /// Parse `CLUSTER SLOTS`. `origin` fills in an empty host, which the
    /// server uses for "the node you are talking to".
    pub fn from_cluster_slots(reply: &RawReply, origin: &str) -> Result<Self> {
        let entries = match reply {
            RawReply::Array(items) => items,
            other => return Err(Error::Topology(format!("CLUSTER SLOTS: expected array, got {}", other.type_name()))),
        };

        let mut ranges = Vec::with_capacity(entries.len());
        for entry in entries {
            let RawReply::Array(items) = entry else { continue };
            if items.len() < 3 {
                continue;
            }
            let start = slot_number(&items[0])?;
            let end = slot_number(&items[1])?;
            ranges.push((start, end, parse_node_addr(&items[2], origin)?));
        }
        Ok(Self::from_ranges(ranges))
    }

    /// Parse `CLUSTER SHARDS` (Redis 7+), flat or RESP3 map layout.
    pub fn from_cluster_shards(reply: &RawReply, origin: &str) -> Result<Self> {
        let shards = match reply {
            RawReply::Array(items) => items,
            other => return Err(Error::Topology(format!("CLUSTER SHARDS: expected array, got {}", other.type_name()))),
        };

        let mut ranges = Vec::new();
        for shard in shards {
            let fields: HashMap<String, RawReply> = decode::pairs(shard.clone())?.into_iter().collect();
            let Some(primary) = fields.get("nodes").and_then(|n| shard_primary(n, origin)) else {
                continue;
            };
            let bounds = match fields.get("slots") {
                Some(RawReply::Array(b)) => b,
                _ => continue,
            };
            for pair in bounds.chunks(2) {
                if let [start, end] = pair {
                    ranges.push((slot_number(start)?, slot_number(end)?, primary.clone()));
                }
            }
        }
        Ok(Self::from_ranges(ranges))
    }
}

fn slot_number(value: &RawReply) -> Result<u16> {
    value
        .as_int()
        .and_then(|n| u16::try_from(n).ok())
        .filter(|&n| (n as usize) < SLOT_COUNT)
        .ok_or_else(|| Error::Topology("invalid slot number".into()))
}

/// `host:port`, bracketing IPv6 hosts.
fn join_host_port(host: &str, port: i64) -> String {
    if host.contains(':') {
        format!("[{host}]:{port}")
    } else {
        format!("{host}:{port}")
    }
}

fn origin_host(origin: &str) -> &str {
    match origin.rsplit_once(':') {
        Some((host, _)) => host.trim_start_matches('[').trim_end_matches(']'),
        None => origin,
    }
}

/// Parse a node array `[host, port, ...]` from `CLUSTER SLOTS`.
fn parse_node_addr(value: &RawReply, origin: &str) -> Result<String> {
    let RawReply::Array(items) = value else {
        return Err(Error::Topology("CLUSTER SLOTS: expected node array".into()));
    };
    let (Some(host), Some(port)) = (items.first(), items.get(1)) else {
        return Err(Error::Topology("CLUSTER SLOTS: node array too short".into()));
    };
    let host = host
        .as_str()
        .ok_or_else(|| Error::Topology("CLUSTER SLOTS: invalid host".into()))?;
    let port = port
        .as_int()
        .ok_or_else(|| Error::Topology("CLUSTER SLOTS: invalid port".into()))?;
    let host = if host.is_empty() || host == "?" { origin_host(origin) } else { host };
    Ok(join_host_port(host, port))
}

/// Address of the healthy primary in a `CLUSTER SHARDS` node list.
fn shard_primary(nodes: &RawReply, origin: &str) -> Option<String> {
    let RawReply::Array(nodes) = nodes else { return None };
    nodes.iter().find_map(|node| {
        let attrs: HashMap<String, RawReply> = decode::pairs(node.clone()).ok()?.into_iter().collect();
        let text = |k: &str| attrs.get(k).and_then(RawReply::as_str).map(str::to_string);
        if text("role").as_deref() != Some("master") || text("health").as_deref() == Some("fail") {
            return None;
        }
        let port = attrs.get("port").and_then(RawReply::as_int)?;
        let host = text("endpoint")
            .filter(|h| !h.is_empty() && h != "?")
            .or_else(|| text("ip"))
            .unwrap_or_else(|| origin_host(origin).to_string());
        Some(join_host_port(&host, port))
    })
}

// ── ClusterRouter ─────────────────────────────────────────────────

/// Knobs specific to cluster routing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ClusterSettings {
    /// `MOVED` + `ASK` + `TRYAGAIN` allowed per call.
    pub max_redirects: usize,
    /// Background slot refresh period; `None` refreshes only on demand.
    pub refresh_interval: Option<Duration>,
}

impl Default for ClusterSettings {
    fn default() -> Self {
        Self {
            max_redirects: 5,
            refresh_interval: Some(Duration::from_secs(30)),
        }
    }
}

/// Where the next attempt goes.
#[derive(Debug, Clone, PartialEq, Eq)]
enum Target {
    Owner,
    Node(String),
    Asking(String),
    /// Same node after `TRYAGAIN`, with backoff.
    Again(String),
}

/// Router for Redis Cluster topology.
///
/// One connection pool per node; the slot map is swapped copy-on-write and
/// readers work on an `Arc` snapshot.
pub struct ClusterRouter<T: Transport> {
    transport: Arc<T>,
    pool_config: PoolConfig,
    dispatcher: Dispatcher,
    settings: ClusterSettings,
    seeds: Vec<String>,
    nodes: RwLock<HashMap<String, Arc<ConnectionPool<T>>>>,
    slots: RwLock<Arc<SlotMap>>,
    refreshing: tokio::sync::Mutex<()>,
}

impl<T: Transport> ClusterRouter<T> {
    /// Build the initial slot map from the first reachable seed and start
    /// the background refresh.
    pub async fn new(
        seeds: Vec<String>,
        transport: Arc<T>,
        pool_config: PoolConfig,
        dispatcher: Dispatcher,
        settings: ClusterSettings,
    ) -> Result<Arc<Self>> {
        if seeds.is_empty() {
            return Err(Error::Topology("at least one seed node is required".into()));
        }

        let router = Arc::new(Self {
            transport,
            pool_config,
            dispatcher,
            settings,
            seeds,
            nodes: RwLock::new(HashMap::new()),
            slots: RwLock::new(Arc::new(SlotMap::default())),
            refreshing: tokio::sync::Mutex::new(()),
        });
        router.refresh().await?;

        if let Some(every) = settings.refresh_interval {
            let weak = Arc::downgrade(&router);
            tokio::spawn(async move {
                loop {
                    tokio::time::sleep(every).await;
                    let Some(router) = weak.upgrade() else {
                        break;
                    };
                    if let Err(e) = router.refresh().await {
                        warn!(error = %e, "periodic slot refresh failed");
                    }
                }
            });
        }

        Ok(router)
    }

    /// Current slot map snapshot.
    pub fn slot_map(&self) -> Arc<SlotMap> {
        self.slots.read().clone()
    }

    pub fn node_for_slot(&self, slot: u16) -> Option<String> {
        self.slot_map().node_for_slot(slot).map(str::to_string)
    }

    /// Reload the slot map from any known node, falling back to the seeds.
    pub async fn refresh(&self) -> Result<()> {
        let _single_writer = self.refreshing.lock().await;

        let mut candidates: Vec<String> = self.slot_map().nodes().to_vec();
        for seed in &self.seeds {
            if !candidates.contains(seed) {
                candidates.push(seed.clone());
            }
        }

        let mut last_err = None;
        for addr in &candidates {
            match self.fetch_slot_map(addr).await {
                Ok(map) => {
                    info!(node = %addr, primaries = map.nodes().len(), "slot map refreshed");
                    self.install(map);
                    return Ok(());
                }
                Err(e) => {
                    debug!(node = %addr, error = %e, "slot map fetch failed");
                    last_err = Some(e);
                }
            }
        }
        Err(Error::Topology(match last_err {
            Some(e) => format!("slot refresh failed on every node: {e}"),
            None => "no node to refresh the slot map from".into(),
        }))
    }

    async fn fetch_slot_map(&self, addr: &str) -> Result<SlotMap> {
        let connect = self.transport.connect(addr, NodeRole::Data);
        let mut conn = tokio::time::timeout(self.pool_config.connect_timeout, connect)
            .await
            .map_err(|_| Error::Topology(format!("connect to {addr} timed out")))??;

        let result = self.query_slot_map(&mut conn, addr).await;
        self.transport.close(conn);
        let map = result?;
        if map.is_empty() {
            return Err(Error::Topology(format!("{addr} reports no assigned slots")));
        }
        Ok(map)
    }

    async fn query_slot_map(&self, conn: &mut T::Connection, addr: &str) -> Result<SlotMap> {
        let slots_cmd = CommandArgs::with_sub(Command::Cluster, "SLOTS")?;
        let reply = self.transport.send(conn, &slots_cmd).await?;
        match reply {
            RawReply::Array(ref entries) if !entries.is_empty() => SlotMap::from_cluster_slots(&reply, addr),
            _ => {
                debug!(node = %addr, "CLUSTER SLOTS unusable, trying CLUSTER SHARDS");
                let shards_cmd = CommandArgs::with_sub(Command::Cluster, "SHARDS")?;
                let reply = self.transport.send(conn, &shards_cmd).await?;
                SlotMap::from_cluster_shards(&reply, addr)
            }
        }
    }

    fn install(&self, map: SlotMap) {
        {
            let mut nodes = self.nodes.write();
            for addr in map.nodes() {
                self.ensure_pool(&mut nodes, addr);
            }
        }
        *self.slots.write() = Arc::new(map);
    }

    fn ensure_pool(&self, nodes: &mut HashMap<String, Arc<ConnectionPool<T>>>, addr: &str) -> Arc<ConnectionPool<T>> {
        nodes
            .entry(addr.to_string())
            .or_insert_with(|| {
                Arc::new(ConnectionPool::new(addr, self.transport.clone(), self.pool_config))
            })
            .clone()
    }

    fn pool(&self, addr: &str) -> Arc<ConnectionPool<T>> {
        if let Some(pool) = self.nodes.read().get(addr) {
            return pool.clone();
        }
        let mut nodes = self.nodes.write();
        self.ensure_pool(&mut nodes, addr)
    }

    /// Copy-on-write reassignment of one slot.
    fn assign(&self, slot: u16, addr: &str) {
        let mut slots = self.slots.write();
        Arc::make_mut(&mut slots).assign(slot, addr);
    }

    fn owner(&self, slot: Option<u16>) -> Option<String> {
        let map = self.slot_map();
        match slot {
            Some(slot) => map.node_for_slot(slot),
            None => map.any_primary(),
        }
        .map(str::to_string)
    }

    /// Resolve the node for the next attempt, refreshing once if needed.
    async fn resolve(&self, target: Target, slot: Option<u16>, refreshed: &mut bool) -> Result<(String, bool)> {
        match target {
            Target::Node(addr) | Target::Again(addr) => Ok((addr, false)),
            Target::Asking(addr) => Ok((addr, true)),
            Target::Owner => {
                if let Some(addr) = self.owner(slot) {
                    return Ok((addr, false));
                }
                if !*refreshed {
                    *refreshed = true;
                    self.refresh().await?;
                    if let Some(addr) = self.owner(slot) {
                        return Ok((addr, false));
                    }
                }
                Err(Error::Topology(match slot {
                    Some(slot) => format!("no node owns slot {slot}"),
                    None => "no primary known".into(),
                }))
            }
        }
    }

    /// Next target for a redirect reply; `None` means the reply is final.
    /// `MOVED` updates the slot map on the spot.
    fn next_target(&self, reply: &RawReply, addr: &str) -> Option<Target> {
        let msg = reply.as_error_msg()?;
        match ServerErrorKind::parse(msg) {
            ServerErrorKind::Moved { slot, addr: to } => {
                debug!(slot, from = %addr, to = %to, "MOVED");
                self.assign(slot, &to);
                Some(Target::Node(to))
            }
            ServerErrorKind::Ask { slot, addr: to } => {
                debug!(slot, from = %addr, to = %to, "ASK");
                Some(Target::Asking(to))
            }
            ServerErrorKind::TryAgain => Some(Target::Again(addr.to_string())),
            _ => None,
        }
    }

    /// Charge one redirect against the budget, backing off for `TRYAGAIN`.
    async fn spend_redirect(&self, redirects: &mut usize, next: &Target, reply: &RawReply) -> Result<()> {
        *redirects += 1;
        if *redirects > self.settings.max_redirects {
            return Err(Error::Topology(format!(
                "redirect budget of {} exhausted: {}",
                self.settings.max_redirects,
                reply.as_error_msg().unwrap_or_default()
            )));
        }
        if matches!(next, Target::Again(_)) {
            tokio::time::sleep(self.dispatcher.retry.backoff(*redirects as u32)).await;
        }
        Ok(())
    }

    /// One logical attempt: follow redirects until a final reply.
    async fn route(&self, args: &CommandArgs, opts: &CallOptions) -> Result<RawReply> {
        let slot = args.slot()?;
        let mut target = Target::Owner;
        let mut refreshed = false;
        let mut redirects = 0;

        loop {
            let (addr, asking) = self.resolve(target, slot, &mut refreshed).await?;
            let pool = self.pool(&addr);
            let result = if asking {
                self.dispatcher.round_trip_asking(&pool, args, opts).await
            } else {
                self.dispatcher.round_trip(&pool, args, opts).await
            };

            let reply = match result {
                Ok(reply) => reply,
                Err(e) if e.is_unsent() && !refreshed => {
                    warn!(node = %addr, error = %e, "node unreachable, refreshing slot map");
                    refreshed = true;
                    self.refresh().await?;
                    target = Target::Owner;
                    continue;
                }
                Err(e) if e.is_unsent() => {
                    return Err(Error::Topology(format!("node {addr} unreachable after refresh: {e}")));
                }
                Err(e) => return Err(e),
            };

            match self.next_target(&reply, &addr) {
                Some(next) => {
                    self.spend_redirect(&mut redirects, &next, &reply).await?;
                    trace_state(args, CallState::Redirected);
                    target = next;
                }
                None => return Ok(reply),
            }
        }
    }

    /// Send part of a pipeline to `addr`, each command behind `ASKING` when
    /// following an `ASK`.
    async fn send_round(&self, addr: &str, asking: bool, batch: &[CommandArgs], opts: &CallOptions) -> Result<Vec<RawReply>> {
        let pool = self.pool(addr);
        if !asking {
            return self.dispatcher.round_trip_batch(&pool, batch, opts).await;
        }
        let replies = self.dispatcher.round_trip_batch(&pool, &with_asking(batch), opts).await?;
        let mut out = Vec::with_capacity(batch.len());
        let mut replies = replies.into_iter();
        while let Some(ack) = replies.next() {
            if let RawReply::Error(msg) = ack {
                return Err(Error::server(msg));
            }
            out.push(
                replies
                    .next()
                    .ok_or_else(|| Error::Protocol("missing reply after ASKING".into()))?,
            );
        }
        Ok(out)
    }

    /// `MULTI` ... `EXEC` as one unit. A single `ASKING` ahead of `MULTI`
    /// covers the whole transaction. The batch is only resent when `EXEC`
    /// aborted, so nothing in it was applied.
    async fn transaction(&self, batch: &[CommandArgs], slot: Option<u16>, opts: &CallOptions) -> Result<Vec<RawReply>> {
        let mut target = Target::Owner;
        let mut refreshed = false;
        let mut redirects = 0;

        loop {
            let (addr, asking) = self.resolve(target, slot, &mut refreshed).await?;
            let result = if asking {
                let mut framed = Vec::with_capacity(batch.len() + 1);
                framed.push(cmd(Command::Asking));
                framed.extend_from_slice(batch);
                let pool = self.pool(&addr);
                self.dispatcher
                    .round_trip_batch(&pool, &framed, opts)
                    .await
                    .and_then(|mut replies| match replies.remove(0) {
                        RawReply::Error(msg) => Err(Error::server(msg)),
                        _ => Ok(replies),
                    })
            } else {
                self.send_round(&addr, false, batch, opts).await
            };

            let replies = match result {
                Ok(replies) => replies,
                Err(e) if e.is_unsent() && !refreshed => {
                    warn!(node = %addr, error = %e, "node unreachable, refreshing slot map");
                    refreshed = true;
                    self.refresh().await?;
                    target = Target::Owner;
                    continue;
                }
                Err(e) if e.is_unsent() => {
                    return Err(Error::Topology(format!("node {addr} unreachable after refresh: {e}")));
                }
                Err(e) => return Err(e),
            };

            let aborted = matches!(replies.last(), Some(RawReply::Error(_)));
            let redirect = replies
                .iter()
                .find_map(|r| self.next_target(r, &addr).map(|next| (next, r.clone())));
            match redirect {
                Some((next, reply)) if aborted => {
                    self.spend_redirect(&mut redirects, &next, &reply).await?;
                    target = next;
                }
                _ => return Ok(replies),
            }
        }
    }
}

/// The one slot a whole batch hashes to.
fn batch_slot(batch: &[CommandArgs]) -> Result<Option<u16>> {
    let first = batch.first().map(CommandArgs::name).unwrap_or("pipeline");
    crc16::common_slot(batch.iter().flat_map(CommandArgs::keys)).map_err(|(a, b)| Error::CrossSlot {
        command: first,
        first: a,
        second: b,
    })
}

fn is_transaction(batch: &[CommandArgs]) -> bool {
    batch.first().map(CommandArgs::command) == Some(Command::Multi)
}

/// Each command preceded by `ASKING`.
fn with_asking(batch: &[CommandArgs]) -> Vec<CommandArgs> {
    batch
        .iter()
        .flat_map(|args| [cmd(Command::Asking), args.clone()])
        .collect()
}

impl<T: Transport> Router for ClusterRouter<T> {
    fn mode(&self) -> Mode {
        Mode::Cluster
    }

    async fn execute(&self, args: &CommandArgs, opts: &CallOptions) -> Result<RawReply> {
        let reply = self
            .dispatcher
            .retry(args, opts, |_| self.route(args, opts))
            .await?;
        trace_state(args, CallState::Replied);
        Ok(reply)
    }

    /// The whole batch must hash to one slot. Only commands answered with a
    /// redirect are resent; their replies go back in their original place.
    async fn pipeline(&self, batch: &[CommandArgs], opts: &CallOptions) -> Result<Vec<RawReply>> {
        let slot = batch_slot(batch)?;
        if is_transaction(batch) {
            return self.transaction(batch, slot, opts).await;
        }

        let mut replies: Vec<Option<RawReply>> = vec![None; batch.len()];
        let mut pending: Vec<(usize, Target)> = (0..batch.len()).map(|i| (i, Target::Owner)).collect();
        let mut refreshed = false;
        let mut redirects = 0;

        while let Some((_, head)) = pending.first() {
            let head = head.clone();
            let (round, rest): (Vec<_>, Vec<_>) = pending.into_iter().partition(|(_, t)| *t == head);
            pending = rest;
            let indices: Vec<usize> = round.into_iter().map(|(i, _)| i).collect();
            let sub: Vec<CommandArgs> = indices.iter().map(|&i| batch[i].clone()).collect();

            let (addr, asking) = self.resolve(head, slot, &mut refreshed).await?;
            let round_replies = match self.send_round(&addr, asking, &sub, opts).await {
                Ok(r) => r,
                Err(e) if e.is_unsent() && !refreshed => {
                    warn!(node = %addr, error = %e, "node unreachable, refreshing slot map");
                    refreshed = true;
                    self.refresh().await?;
                    pending.extend(indices.into_iter().map(|i| (i, Target::Owner)));
                    continue;
                }
                Err(e) if e.is_unsent() => {
                    return Err(Error::Topology(format!("node {addr} unreachable after refresh: {e}")));
                }
                Err(e) => return Err(e),
            };

            let mut charged = None;
            for (i, reply) in indices.into_iter().zip(round_replies) {
                match self.next_target(&reply, &addr) {
                    Some(next) => {
                        if charged.is_none() {
                            charged = Some((next.clone(), reply));
                        }
                        pending.push((i, next));
                    }
                    None => replies[i] = Some(reply),
                }
            }
            if let Some((next, reply)) = charged {
                debug!(resend = pending.len(), "pipeline redirected");
                self.spend_redirect(&mut redirects, &next, &reply).await?;
            }
        }

        replies
            .into_iter()
            .map(|r| r.ok_or_else(|| Error::Protocol("pipeline reply missing".into())))
            .collect()
    }

    fn pool_idle_count(&self) -> usize {
        self.nodes.read().values().map(|p| p.idle_count()).sum()
    }

    fn pool_available(&self) -> usize {
        self.nodes.read().values().map(|p| p.available()).sum()
    }
}

// ── Tests ──────────────────────────────────────────────────────────
