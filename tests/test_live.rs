//! Integration tests against a real server.
//!
//! Ignored by default. Run with `REDIS_URL=redis://host:port cargo test -- --ignored`.

mod common;

use common::{init_tracing, test_prefix};
use rsedis::{
    cmd, BlockingClient, Client, Command, RawReply, ScanArgs, ServerErrorKind, SetArgs, Status,
    StreamEntry, XAddArgs, ZAddArgs, ZRangeArgs,
};
use std::collections::HashMap;

fn redis_url() -> String {
    std::env::var("REDIS_URL").unwrap_or_else(|_| "redis://127.0.0.1:6379".into())
}

async fn client() -> Client {
    init_tracing();
    Client::from_url(&redis_url()).await.expect("REDIS_URL must point at a running server")
}

#[tokio::test]
#[ignore]
async fn strings_round_trip() {
    let c = client().await;
    let key = test_prefix("strings");

    let status: Status = c.set_with(&key, "hello", &SetArgs::new().ex(10)).await.unwrap();
    assert_eq!(status, Status::Success);
    let ttl = c.ttl(&key).await.unwrap();
    assert!(ttl > 0 && ttl <= 10);

    let again: Status = c.set_with(&key, "other", &SetArgs::new().nx()).await.unwrap();
    assert_eq!(again, Status::Failure);
    assert_eq!(c.get::<String>(&key).await.unwrap().as_deref(), Some("hello"));

    c.del([&key]).await.unwrap();
}

#[tokio::test]
#[ignore]
async fn binary_values_survive() {
    let c = client().await;
    let key = test_prefix("binary");
    let payload: Vec<u8> = (0..=255).collect();

    c.set(&key, payload.clone()).await.unwrap();
    assert_eq!(c.get::<Vec<u8>>(&key).await.unwrap(), Some(payload));
    c.del([&key]).await.unwrap();
}

#[tokio::test]
#[ignore]
async fn wrong_type_and_overflow() {
    let c = client().await;
    let key = test_prefix("errors");
    c.set(&key, "x").await.unwrap();

    let err = c.lpush(&key, ["a"]).await.unwrap_err();
    assert_eq!(err.server_kind(), Some(&ServerErrorKind::WrongType));

    c.set(&key, i64::MAX).await.unwrap();
    let err = c.incr(&key).await.unwrap_err();
    assert!(matches!(err, rsedis::Error::NumericRange(_)), "{err:?}");

    c.del([&key]).await.unwrap();
}

#[tokio::test]
#[ignore]
async fn hashes_and_sorted_sets() {
    let c = client().await;
    let h = test_prefix("hash");
    let z = test_prefix("zset");

    c.hset(&h, [("a", "1"), ("b", "2")]).await.unwrap();
    let all: HashMap<String, i64> = c.hgetall(&h).await.unwrap();
    assert_eq!(all.get("a"), Some(&1));

    c.zadd(&z, [(1.5, "one"), (f64::INFINITY, "top")], &ZAddArgs::new()).await.unwrap();
    let ranked = c.zrange_with_scores::<String>(&z, &ZRangeArgs::rank(0, -1)).await.unwrap();
    assert_eq!(ranked.len(), 2);
    assert_eq!(ranked[1].score, f64::INFINITY);
    assert_eq!(c.zscore(&z, "one").await.unwrap(), Some(1.5));

    c.del([&h, &z]).await.unwrap();
}

#[tokio::test]
#[ignore]
async fn scan_visits_every_key() {
    let c = client().await;
    let prefix = test_prefix("scan");
    let keys: Vec<String> = (0..25).map(|i| format!("{prefix}:{i}")).collect();
    for k in &keys {
        c.set(k, "1").await.unwrap();
    }

    let opts = ScanArgs::new().pattern(format!("{prefix}:*")).count(5);
    let mut seen = Vec::new();
    let mut page = c.scan::<String>("0", &opts).await.unwrap();
    loop {
        seen.append(&mut page.items);
        if page.is_finished() {
            break;
        }
        page = c.scan::<String>(&page, &opts).await.unwrap();
    }
    seen.sort();
    seen.dedup();
    assert_eq!(seen.len(), keys.len());

    c.del(&keys).await.unwrap();
}

#[tokio::test]
#[ignore]
async fn streams_add_and_range() {
    let c = client().await;
    let key = test_prefix("stream");

    let id = c.xadd(&key, [("field", "value")], &XAddArgs::new()).await.unwrap();
    assert!(id.is_some());
    let entries: Vec<StreamEntry> = c.xrange(&key, "-", "+", None).await.unwrap();
    assert_eq!(entries.len(), 1);
    assert_eq!(entries[0].fields, vec![("field".to_string(), "value".to_string())]);

    c.del([&key]).await.unwrap();
}

#[tokio::test]
#[ignore]
async fn pipeline_and_transaction() {
    let c = client().await;
    let key = test_prefix("tx");

    let mut pipe = c.pipeline();
    pipe.add(cmd(Command::Set).key(&key).arg(1))
        .add(cmd(Command::Incr).key(&key))
        .add(cmd(Command::Get).key(&key));
    let replies = pipe.query_raw().await.unwrap();
    assert_eq!(replies[1], RawReply::Integer(2));

    pipe.add(cmd(Command::Incr).key(&key)).add(cmd(Command::Incr).key(&key));
    let (a, b): (i64, i64) = pipe.transaction().await.unwrap();
    assert_eq!((a, b), (3, 4));

    c.del([&key]).await.unwrap();
}

#[tokio::test]
#[ignore]
async fn scripts_route_their_keys() {
    let c = client().await;
    let key = test_prefix("script");

    let n: i64 = c
        .eval("return redis.call('INCRBY', KEYS[1], ARGV[1])", [&key], ["5"])
        .await
        .unwrap();
    assert_eq!(n, 5);
    c.del([&key]).await.unwrap();
}

#[test]
#[ignore]
fn blocking_client_round_trip() {
    let c = BlockingClient::from_url(&redis_url()).unwrap();
    let key = test_prefix("blocking");

    let n: i64 = c.execute(cmd(Command::Incr).key(&key)).unwrap();
    assert_eq!(n, 1);
    let n: i64 = c.run(|c| { let key = key.clone(); async move { c.incr(&key).await } }).unwrap();
    assert_eq!(n, 2);

    let _: i64 = c.execute(cmd(Command::Del).key(&key)).unwrap();
}
