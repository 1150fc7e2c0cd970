mod common;

use common::*;
use parking_lot::Mutex;
use rsedis::crc16::hash_slot;
use rsedis::{cmd, Client, Command, Error, Mode, RawReply, ServerErrorKind};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

const A: &str = "10.0.0.1:7000";
const B: &str = "10.0.0.2:7001";

/// Slots 0..=8191 on A, the rest on B.
fn split_map() -> RawReply {
    cluster_slots(&[(0, 8191, A), (8192, 16383, B)])
}

fn single_owner(addr: &str) -> RawReply {
    cluster_slots(&[(0, 16383, addr)])
}

async fn connect(transport: &MockTransport) -> Client<MockTransport> {
    let client = Client::with_transport(cluster_config(&[A]), transport.clone())
        .await
        .unwrap();
    transport.clear_log();
    client
}

#[tokio::test]
async fn initial_map_routes_by_slot() {
    assert!(hash_slot(b"foo") > 8191);
    assert!(hash_slot(b"bar") <= 8191);

    let transport = MockTransport::new();
    transport.node(A, cluster_node(split_map(), |_| Step::Reply(bulk("from-a"))));
    transport.node(B, cluster_node(split_map(), |_| Step::Reply(bulk("from-b"))));
    let client = connect(&transport).await;
    assert_eq!(client.mode(), Mode::Cluster);

    let foo: Option<String> = client.get("foo").await.unwrap();
    let bar: Option<String> = client.get("bar").await.unwrap();

    assert_eq!(foo.as_deref(), Some("from-b"));
    assert_eq!(bar.as_deref(), Some("from-a"));
    let addrs: Vec<String> = transport.data_commands().into_iter().map(|s| s.addr).collect();
    assert_eq!(addrs, [B, A]);
}

#[tokio::test]
async fn moved_resends_and_updates_one_slot() {
    let slot = hash_slot(b"foo");
    let transport = MockTransport::new();
    transport.node(
        A,
        cluster_node(single_owner(A), move |_| err(&format!("MOVED {slot} {B}"))),
    );
    transport.node(B, |_| Step::Reply(bulk("v")));
    let client = connect(&transport).await;

    let value: Option<String> = client.get("foo").await.unwrap();
    assert_eq!(value.as_deref(), Some("v"));

    let sent = transport.data_commands();
    assert_eq!(sent.len(), 2);
    assert_eq!((sent[0].addr.as_str(), sent[1].addr.as_str()), (A, B));
    assert_eq!(sent[0].tokens, sent[1].tokens);

    let router = client.cluster().unwrap();
    assert_eq!(router.node_for_slot(slot).as_deref(), Some(B));
    assert_eq!(router.node_for_slot(0).as_deref(), Some(A));

    transport.clear_log();
    let _: Option<String> = client.get("foo").await.unwrap();
    let sent = transport.data_commands();
    assert_eq!(sent.len(), 1);
    assert_eq!(sent[0].addr, B);
}

#[tokio::test]
async fn ask_sends_asking_and_keeps_map() {
    let slot = hash_slot(b"foo");
    let transport = MockTransport::new();
    transport.node(
        A,
        cluster_node(single_owner(A), move |_| err(&format!("ASK {slot} {B}"))),
    );
    transport.node(B, |cmd| match cmd[0].as_str() {
        "ASKING" => ok(),
        _ => Step::Reply(bulk("migrating")),
    });
    let client = connect(&transport).await;

    let value: Option<String> = client.get("foo").await.unwrap();
    assert_eq!(value.as_deref(), Some("migrating"));

    let sent: Vec<(String, String)> = transport
        .data_commands()
        .into_iter()
        .map(|s| (s.addr.clone(), s.text()[0].clone()))
        .collect();
    assert_eq!(
        sent,
        [
            (A.to_string(), "GET".to_string()),
            (B.to_string(), "ASKING".to_string()),
            (B.to_string(), "GET".to_string()),
        ]
    );
    assert_eq!(client.cluster().unwrap().node_for_slot(slot).as_deref(), Some(A));
}

#[tokio::test]
async fn tryagain_retries_same_node() {
    let calls = Arc::new(AtomicUsize::new(0));
    let seen = calls.clone();
    let transport = MockTransport::new();
    transport.node(
        A,
        cluster_node(single_owner(A), move |_| {
            if seen.fetch_add(1, Ordering::SeqCst) == 0 {
                err("TRYAGAIN Multiple keys request during rehashing of slot")
            } else {
                int(2)
            }
        }),
    );
    let client = connect(&transport).await;

    let n = client.incr("{t}counter").await.unwrap();

    assert_eq!(n, 2);
    let sent = transport.data_commands();
    assert_eq!(sent.len(), 2);
    assert!(sent.iter().all(|s| s.addr == A));
}

#[tokio::test]
async fn redirect_budget_exhausted_is_topology_error() {
    let slot = hash_slot(b"foo");
    let transport = MockTransport::new();
    transport.node(A, cluster_node(single_owner(A), move |_| err(&format!("MOVED {slot} {B}"))));
    transport.node(B, move |_| err(&format!("MOVED {slot} {A}")));
    let client = connect(&transport).await;

    let err = client.get::<String>("foo").await.unwrap_err();

    assert!(matches!(err, Error::Topology(_)), "{err:?}");
    assert_eq!(transport.data_commands().len(), 6);
}

#[tokio::test]
async fn cross_slot_fails_before_dispatch() {
    let transport = MockTransport::new();
    transport.node(A, cluster_node(split_map(), |_| ok()));
    transport.node(B, cluster_node(split_map(), |_| ok()));
    let client = connect(&transport).await;

    let err = client.mget::<_, String>(["foo", "bar"]).await.unwrap_err();
    match err {
        Error::CrossSlot { command, first, second } => {
            assert_eq!(command, "MGET");
            assert_ne!(first, second);
        }
        other => panic!("unexpected {other:?}"),
    }

    let mut pipe = client.pipeline();
    pipe.add(cmd(Command::Get).key("foo")).add(cmd(Command::Get).key("bar"));
    assert!(matches!(pipe.query_raw().await, Err(Error::CrossSlot { .. })));

    assert!(transport.sent().is_empty());
}

#[tokio::test]
async fn same_hash_tag_dispatches_once() {
    assert_eq!(hash_slot(b"{user1}:a"), hash_slot(b"{user1}:b"));
    let owner = if hash_slot(b"{user1}") <= 8191 { A } else { B };

    let transport = MockTransport::new();
    for addr in [A, B] {
        transport.node(
            addr,
            cluster_node(split_map(), |_| Step::Reply(RawReply::Array(vec![bulk("1"), RawReply::Null]))),
        );
    }
    let client = connect(&transport).await;

    let values = client.mget::<_, String>(["{user1}:a", "{user1}:b"]).await.unwrap();

    assert_eq!(values, vec![Some("1".to_string()), None]);
    let sent = transport.data_commands();
    assert_eq!(sent.len(), 1);
    assert_eq!(sent[0].addr, owner);
}

#[tokio::test]
async fn unreachable_owner_triggers_refresh() {
    let map = Arc::new(Mutex::new(split_map()));
    let current = map.clone();
    let transport = MockTransport::new();
    transport.node(A, move |cmd| {
        if cmd.len() == 2 && cmd[0] == "CLUSTER" && cmd[1] == "SLOTS" {
            Step::Reply(current.lock().clone())
        } else {
            Step::Reply(bulk("from-a"))
        }
    });
    transport.node(B, cluster_node(split_map(), |_| Step::Reply(bulk("from-b"))));
    let client = connect(&transport).await;

    transport.set_unreachable(B, true);
    *map.lock() = single_owner(A);

    let value: Option<String> = client.get("foo").await.unwrap();

    assert_eq!(value.as_deref(), Some("from-a"));
    assert!(transport.sent().iter().any(|s| s.is_topology_query()));
    let router = client.cluster().unwrap();
    assert_eq!(router.node_for_slot(hash_slot(b"foo")).as_deref(), Some(A));
}

#[tokio::test]
async fn unreachable_after_refresh_is_topology_error() {
    let transport = MockTransport::new();
    transport.node(A, cluster_node(split_map(), |_| ok()));
    transport.node(B, cluster_node(split_map(), |_| ok()));
    let client = connect(&transport).await;
    transport.set_unreachable(B, true);

    let err = client.get::<String>("foo").await.unwrap_err();

    assert!(matches!(err, Error::Topology(_)), "{err:?}");
}

#[tokio::test]
async fn falls_back_to_cluster_shards() {
    let shards = RawReply::Array(vec![RawReply::Array(vec![
        bulk("slots"),
        RawReply::Array(vec![RawReply::Integer(0), RawReply::Integer(16383)]),
        bulk("nodes"),
        RawReply::Array(vec![RawReply::Array(vec![
            bulk("ip"),
            bulk("10.0.0.1"),
            bulk("port"),
            RawReply::Integer(7000),
            bulk("role"),
            bulk("master"),
            bulk("health"),
            bulk("online"),
        ])]),
    ])]);
    let transport = MockTransport::new();
    transport.node(A, move |cmd| match (cmd[0].as_str(), cmd.get(1).map(String::as_str)) {
        ("CLUSTER", Some("SLOTS")) => Step::Reply(RawReply::Array(vec![])),
        ("CLUSTER", Some("SHARDS")) => Step::Reply(shards.clone()),
        _ => Step::Reply(bulk("v")),
    });

    let client = Client::with_transport(cluster_config(&[A]), transport.clone())
        .await
        .unwrap();

    assert_eq!(client.cluster().unwrap().node_for_slot(42).as_deref(), Some(A));
    let value: Option<String> = client.get("anything").await.unwrap();
    assert_eq!(value.as_deref(), Some("v"));
}

#[tokio::test]
async fn no_reachable_seed_fails_to_build() {
    let transport = MockTransport::new();
    let err = match Client::with_transport(cluster_config(&[A]), transport.clone()).await {
        Err(e) => e,
        Ok(_) => panic!("client should not build without a reachable seed"),
    };
    assert!(matches!(err, Error::Topology(_)));
}

#[tokio::test]
async fn standalone_only_commands_rejected() {
    let transport = MockTransport::new();
    transport.node(A, cluster_node(single_owner(A), |_| ok()));
    let client = connect(&transport).await;

    let err = client.execute::<RawReply>(cmd(Command::SwapDb).arg(0).arg(1)).await.unwrap_err();
    assert!(matches!(err, Error::Capability { .. }), "{err:?}");
    assert!(transport.sent().is_empty());
}

#[tokio::test]
async fn pipeline_follows_moved_for_every_redirected_command() {
    let slot = hash_slot(b"{p}");
    let transport = MockTransport::new();
    transport.node(A, cluster_node(single_owner(A), move |_| err(&format!("MOVED {slot} {B}"))));
    transport.node(B, |cmd| match cmd[0].as_str() {
        "SET" => ok(),
        _ => Step::Reply(bulk("1")),
    });
    let client = connect(&transport).await;

    let mut pipe = client.pipeline();
    pipe.add(cmd(Command::Set).key("{p}a").arg("1")).add(cmd(Command::Get).key("{p}a"));
    let replies = pipe.query_raw().await.unwrap();

    assert_eq!(replies, vec![RawReply::SimpleString("OK".into()), bulk("1")]);
    let to_b = transport.data_commands().into_iter().filter(|s| s.addr == B).count();
    assert_eq!(to_b, 2);
}

fn log(transport: &MockTransport) -> Vec<(String, Vec<String>)> {
    transport
        .data_commands()
        .into_iter()
        .map(|s| (s.addr.clone(), s.text()))
        .collect()
}

fn entry(addr: &str, tokens: &[&str]) -> (String, Vec<String>) {
    (addr.to_string(), tokens.iter().map(|t| t.to_string()).collect())
}

#[tokio::test]
async fn pipeline_resends_only_asked_commands() {
    let slot = hash_slot(b"{p}");
    let transport = MockTransport::new();
    transport.node(
        A,
        cluster_node(single_owner(A), move |cmd| match cmd[1].as_str() {
            "{p}a" => int(1),
            _ => err(&format!("ASK {slot} {B}")),
        }),
    );
    transport.node(B, |cmd| match cmd[0].as_str() {
        "ASKING" => ok(),
        _ => int(7),
    });
    let client = connect(&transport).await;

    let mut pipe = client.pipeline();
    pipe.add(cmd(Command::Incr).key("{p}a")).add(cmd(Command::Incr).key("{p}b"));
    let replies = pipe.query_raw().await.unwrap();

    assert_eq!(replies, vec![RawReply::Integer(1), RawReply::Integer(7)]);
    assert_eq!(
        log(&transport),
        [
            entry(A, &["INCR", "{p}a"]),
            entry(A, &["INCR", "{p}b"]),
            entry(B, &["ASKING"]),
            entry(B, &["INCR", "{p}b"]),
        ]
    );
    assert_eq!(client.cluster().unwrap().node_for_slot(slot).as_deref(), Some(A));
}

#[tokio::test]
async fn pipeline_keyless_write_not_repeated_after_moved() {
    let slot = hash_slot(b"{p}a");
    let transport = MockTransport::new();
    transport.node(
        A,
        cluster_node(single_owner(A), move |cmd| match cmd[0].as_str() {
            "PUBLISH" => int(0),
            _ => err(&format!("MOVED {slot} {B}")),
        }),
    );
    transport.node(B, |_| ok());
    let client = connect(&transport).await;

    let mut pipe = client.pipeline();
    pipe.add(cmd(Command::Publish).arg("ch").arg("m"))
        .add(cmd(Command::Set).key("{p}a").arg("1"));
    let replies = pipe.query_raw().await.unwrap();

    assert_eq!(replies, vec![RawReply::Integer(0), RawReply::SimpleString("OK".into())]);
    assert_eq!(
        log(&transport),
        [
            entry(A, &["PUBLISH", "ch", "m"]),
            entry(A, &["SET", "{p}a", "1"]),
            entry(B, &["SET", "{p}a", "1"]),
        ]
    );
    assert_eq!(client.cluster().unwrap().node_for_slot(slot).as_deref(), Some(B));
}

#[tokio::test]
async fn pipeline_asking_rejected_is_server_error() {
    let slot = hash_slot(b"{p}a");
    let transport = MockTransport::new();
    transport.node(A, cluster_node(single_owner(A), move |_| err(&format!("ASK {slot} {B}"))));
    transport.node(B, |cmd| match cmd[0].as_str() {
        "ASKING" => err("ERR ASKING is not allowed"),
        _ => Step::Reply(bulk("v")),
    });
    let client = connect(&transport).await;

    let mut pipe = client.pipeline();
    pipe.add(cmd(Command::Get).key("{p}a"));
    let err = pipe.query_raw().await.unwrap_err();

    assert_eq!(err.server_kind(), Some(&ServerErrorKind::Err), "{err:?}");
}

#[tokio::test]
async fn aborted_transaction_follows_moved_as_a_unit() {
    let slot = hash_slot(b"{p}a");
    let transport = MockTransport::new();
    transport.node(
        A,
        cluster_node(single_owner(A), move |cmd| match cmd[0].as_str() {
            "MULTI" => ok(),
            "EXEC" => err("EXECABORT Transaction discarded because of previous errors."),
            _ => err(&format!("MOVED {slot} {B}")),
        }),
    );
    transport.node(B, |cmd| match cmd[0].as_str() {
        "MULTI" => ok(),
        "EXEC" => Step::Reply(RawReply::Array(vec![RawReply::Integer(1)])),
        _ => Step::Reply(RawReply::SimpleString("QUEUED".into())),
    });
    let client = connect(&transport).await;

    let mut pipe = client.pipeline();
    pipe.add(cmd(Command::Incr).key("{p}a"));
    let results: Vec<i64> = pipe.transaction().await.unwrap();

    assert_eq!(results, [1]);
    let to_b: Vec<String> = log(&transport)
        .into_iter()
        .filter(|(addr, _)| addr == B)
        .map(|(_, tokens)| tokens[0].clone())
        .collect();
    assert_eq!(to_b, ["MULTI", "INCR", "EXEC"]);
}

#[tokio::test]
async fn pipeline_unreachable_after_refresh_is_topology_error() {
    let transport = MockTransport::new();
    transport.node(A, |_| ok());
    transport.node(B, cluster_node(single_owner(A), |_| ok()));
    transport.set_unreachable(A, true);
    let client = Client::with_transport(cluster_config(&[B]), transport.clone())
        .await
        .unwrap();

    let mut pipe = client.pipeline();
    pipe.add(cmd(Command::Get).key("{p}a"));
    let err = pipe.query_raw().await.unwrap_err();

    assert!(matches!(err, Error::Topology(_)), "{err:?}");
}
