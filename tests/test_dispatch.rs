mod common;

use bytes::Bytes;
use common::*;
use rsedis::{
    cmd, BitFieldArgs, CallOptions, Client, Command, CommandArgs, Error, IntType, RawReply, ScanArgs,
    ServerErrorKind, SetArgs, Status, ZAddArgs,
};
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

const NODE: &str = "10.0.0.1:6379";

async fn client_with(handler: impl FnMut(&[String]) -> Step + Send + 'static) -> (Client<MockTransport>, MockTransport) {
    let transport = MockTransport::new();
    transport.node(NODE, handler);
    let client = Client::with_transport(standalone_config(NODE), transport.clone())
        .await
        .unwrap();
    (client, transport)
}

#[tokio::test]
async fn set_with_expiry_is_one_dispatch() {
    let (client, transport) = client_with(|_| ok()).await;

    let status: Status = client.set_with("k", "v", &SetArgs::new().ex(10)).await.unwrap();

    assert_eq!(status, Status::Success);
    let sent = transport.sent();
    assert_eq!(sent.len(), 1);
    assert_eq!(sent[0].text(), ["SET", "k", "v", "EX", "10"]);
}

#[tokio::test]
async fn set_nx_not_applied_is_failure() {
    let (client, _) = client_with(|_| Step::Reply(RawReply::Null)).await;
    let status: Status = client.set_with("k", "v", &SetArgs::new().nx()).await.unwrap();
    assert_eq!(status, Status::Failure);
}

#[tokio::test]
async fn text_and_binary_inputs_send_identical_tokens() {
    let (client, transport) = client_with(|_| Step::Reply(bulk("x"))).await;

    let _: Option<String> = client.get("user:1").await.unwrap();
    let _: Option<String> = client.get(&b"user:1"[..]).await.unwrap();
    let _: Option<String> = client.get(Bytes::from_static(b"user:1")).await.unwrap();
    let _: Option<String> = client.get(b"user:1".to_vec()).await.unwrap();

    let sent = transport.sent();
    assert_eq!(sent.len(), 4);
    assert!(sent.windows(2).all(|w| w[0].tokens == w[1].tokens));
}

#[tokio::test]
async fn binary_reply_decodes_to_bytes() {
    let payload = RawReply::Bulk(Bytes::from_static(&[0xff, 0x00, 0xfe]));
    let (client, _) = client_with(move |_| Step::Reply(payload.clone())).await;

    let raw: Option<Vec<u8>> = client.get("blob").await.unwrap();
    assert_eq!(raw, Some(vec![0xff, 0x00, 0xfe]));
    let err = client.get::<String>("blob").await.unwrap_err();
    assert!(matches!(err, Error::Decode(_)));
}

#[tokio::test]
async fn builder_conflicts_fail_without_io() {
    let (client, transport) = client_with(|_| ok()).await;

    let err = client
        .set_with::<Status>("k", "v", &SetArgs::new().nx().xx())
        .await
        .unwrap_err();
    assert!(matches!(err, Error::Argument(_)));

    let err = client
        .zadd("z", [(1.0, "a")], &ZAddArgs::new().gt().lt())
        .await
        .unwrap_err();
    assert!(matches!(err, Error::Argument(_)));

    let err = client.incr_by_float("k", f64::NAN).await.unwrap_err();
    assert!(matches!(err, Error::Argument(_)));

    let err = client.del(Vec::<&str>::new()).await.unwrap_err();
    assert!(matches!(err, Error::Argument(_)));

    assert!(transport.sent().is_empty());
    assert!(transport.connects().is_empty());
}

#[tokio::test]
async fn cluster_only_command_rejected_in_standalone() {
    let (client, transport) = client_with(|_| ok()).await;
    let err = client.cluster_forget("abc").await.unwrap_err();
    match err {
        Error::Capability { command, .. } => assert_eq!(command, "CLUSTER FORGET"),
        other => panic!("unexpected {other:?}"),
    }
    assert!(transport.connects().is_empty());
}

#[tokio::test]
async fn write_not_resent_after_bytes_were_written() {
    let (client, transport) = client_with(|_| Step::Drop).await;

    let err = client.incr("counter").await.unwrap_err();

    assert!(matches!(err, Error::Transport(_)));
    assert_eq!(transport.sent().len(), 1);
}

#[tokio::test]
async fn write_resent_when_caller_opts_in() {
    let calls = Arc::new(AtomicUsize::new(0));
    let seen = calls.clone();
    let (client, transport) = client_with(move |_| {
        if seen.fetch_add(1, Ordering::SeqCst) == 0 {
            Step::Drop
        } else {
            int(1)
        }
    })
    .await;

    let n: i64 = client
        .execute_with(cmd(Command::Incr).key("counter"), CallOptions::default().retry_writes())
        .await
        .unwrap();

    assert_eq!(n, 1);
    assert_eq!(transport.sent().len(), 2);
}

#[tokio::test]
async fn read_retried_after_transport_failure() {
    let calls = Arc::new(AtomicUsize::new(0));
    let seen = calls.clone();
    let (client, transport) = client_with(move |_| {
        if seen.fetch_add(1, Ordering::SeqCst) == 0 {
            Step::Drop
        } else {
            Step::Reply(bulk("v"))
        }
    })
    .await;

    let value: Option<String> = client.get("k").await.unwrap();

    assert_eq!(value.as_deref(), Some("v"));
    let sent = transport.sent();
    assert_eq!(sent.len(), 2);
    assert_eq!(sent[0].tokens, sent[1].tokens);
}

#[tokio::test]
async fn connection_failure_retried_for_writes_then_surfaced() {
    let (client, transport) = client_with(|_| ok()).await;
    transport.set_unreachable(NODE, true);

    let err = client.incr("counter").await.unwrap_err();

    assert!(err.is_unsent(), "{err:?}");
    assert!(transport.sent().is_empty());
}

#[tokio::test]
async fn server_errors_carry_their_kind() {
    let (client, _) = client_with(|cmd| match cmd[0].as_str() {
        "LPUSH" => err("WRONGTYPE Operation against a key holding the wrong kind of value"),
        "INCR" => err("ERR increment or decrement would overflow"),
        _ => err("NOSCRIPT No matching script. Please use EVAL."),
    })
    .await;

    let e = client.lpush("k", ["a"]).await.unwrap_err();
    assert_eq!(e.server_kind(), Some(&ServerErrorKind::WrongType));

    let e = client.incr("k").await.unwrap_err();
    assert!(matches!(e, Error::NumericRange(_)));

    let e = client
        .evalsha::<&str, &str, RawReply>("deadbeef", [], [])
        .await
        .unwrap_err();
    assert_eq!(e.server_kind(), Some(&ServerErrorKind::NoScript));
}

#[tokio::test]
async fn integer_narrowing_is_range_checked() {
    let (client, _) = client_with(|_| int(i64::from(u32::MAX) + 1)).await;
    let err = client.execute::<u32>(cmd(Command::StrLen).key("k")).await.unwrap_err();
    assert!(matches!(err, Error::NumericRange(_)));
}

#[tokio::test]
async fn reply_shape_mismatch_is_decode_error() {
    let (client, _) = client_with(|_| Step::Reply(RawReply::Array(vec![]))).await;
    let err = client.incr("k").await.unwrap_err();
    assert!(matches!(err, Error::Decode(_)));
}

#[tokio::test]
async fn hgetall_accepts_flat_and_map_layouts() {
    let flat = RawReply::Array(vec![bulk("a"), bulk("1"), bulk("b"), bulk("2")]);
    let map = RawReply::Map(vec![(bulk("a"), bulk("1")), (bulk("b"), bulk("2"))]);
    let replies = Arc::new(parking_lot::Mutex::new(vec![map, flat]));
    let (client, _) = client_with(move |_| Step::Reply(replies.lock().pop().unwrap())).await;

    let first: HashMap<String, i64> = client.hgetall("h").await.unwrap();
    let second: HashMap<String, i64> = client.hgetall("h").await.unwrap();
    assert_eq!(first, second);
    assert_eq!(first.get("b"), Some(&2));
}

#[tokio::test]
async fn scan_cursor_is_passed_back_verbatim() {
    let (client, transport) = client_with(|cmd| {
        let page = if cmd[1] == "0" {
            RawReply::Array(vec![bulk("00017"), RawReply::Array(vec![bulk("k1")])])
        } else {
            RawReply::Array(vec![bulk("0"), RawReply::Array(vec![bulk("k2")])])
        };
        Step::Reply(page)
    })
    .await;

    let opts = ScanArgs::new().count(10);
    let page = client.scan::<String>("0", &opts).await.unwrap();
    assert_eq!(page.cursor, "00017");
    assert!(!page.is_finished());
    let last = client.scan::<String>(&page, &opts).await.unwrap();
    assert!(last.is_finished());

    let sent = transport.sent();
    assert_eq!(sent[1].text()[1], "00017");
}

#[tokio::test]
async fn zpop_tuples_from_either_layout() {
    let (client, _) = client_with(|cmd| match cmd[0].as_str() {
        "ZPOPMIN" => Step::Reply(RawReply::Array(vec![bulk("a"), bulk("1.5"), bulk("b"), bulk("inf")])),
        _ => Step::Reply(RawReply::Array(vec![RawReply::Array(vec![bulk("c"), RawReply::Double(-2.0)])])),
    })
    .await;

    let min = client.zpop_min::<String>("z", Some(2)).await.unwrap();
    assert_eq!(min.len(), 2);
    assert_eq!(min[1].score, f64::INFINITY);
    let max = client.zpop_max::<String>("z", None).await.unwrap();
    assert_eq!(max[0].member, "c");
    assert_eq!(max[0].score, -2.0);
}

#[tokio::test]
async fn bitfield_keeps_positions() {
    let (client, transport) = client_with(|_| {
        Step::Reply(RawReply::Array(vec![RawReply::Integer(1), RawReply::Null]))
    })
    .await;

    let ops = BitFieldArgs::new()
        .get(IntType::Unsigned(8), 0)
        .overflow(rsedis::BitFieldOverflow::Fail)
        .incrby(IntType::Signed(8), 8, 200);
    let values = client.bitfield("bf", &ops).await.unwrap();

    assert_eq!(values, vec![Some(1), None]);
    assert_eq!(
        transport.sent()[0].text(),
        ["BITFIELD", "bf", "GET", "u8", "0", "OVERFLOW", "FAIL", "INCRBY", "i8", "8", "200"]
    );
}

#[tokio::test]
async fn unknown_subcommand_rejected() {
    let (client, transport) = client_with(|_| ok()).await;
    let err = CommandArgs::with_sub(Command::Config, "EXPLODE").unwrap_err();
    assert!(matches!(err, Error::Argument(_)));
    let err = client.execute::<RawReply>(cmd(Command::Config).arg("EXPLODE")).await.unwrap_err();
    assert!(matches!(err, Error::Argument(_)));
    assert!(transport.sent().is_empty());
}

#[tokio::test]
async fn pipeline_replies_in_order() {
    let (client, transport) = client_with(|cmd| match cmd[0].as_str() {
        "SET" => ok(),
        "INCR" => int(7),
        _ => err("ERR boom"),
    })
    .await;

    let mut pipe = client.pipeline();
    pipe.add(cmd(Command::Set).key("a").arg("1"))
        .add(cmd(Command::Incr).key("a"))
        .add(cmd(Command::LPush).key("a").arg("x"));
    let replies = pipe.query_raw().await.unwrap();

    assert_eq!(replies.len(), 3);
    assert_eq!(replies[1], RawReply::Integer(7));
    assert!(matches!(replies[2], RawReply::Error(_)));
    assert_eq!(transport.connects().len(), 1);
}

#[tokio::test]
async fn transaction_wraps_batch() {
    let (client, transport) = client_with(|cmd| match cmd[0].as_str() {
        "MULTI" => ok(),
        "EXEC" => Step::Reply(RawReply::Array(vec![RawReply::Integer(1), RawReply::Integer(2)])),
        _ => Step::Reply(RawReply::SimpleString("QUEUED".into())),
    })
    .await;

    let mut pipe = client.pipeline();
    pipe.add(cmd(Command::Incr).key("a")).add(cmd(Command::Incr).key("a"));
    let results: Vec<i64> = pipe.transaction().await.unwrap();

    assert_eq!(results, vec![1, 2]);
    let names: Vec<String> = transport.sent().iter().map(|s| s.text()[0].clone()).collect();
    assert_eq!(names, ["MULTI", "INCR", "INCR", "EXEC"]);
}

#[tokio::test]
async fn sentinel_resolves_master_and_fails_over_on_readonly() {
    let transport = MockTransport::new();
    let master = Arc::new(parking_lot::Mutex::new("10.0.0.2"));
    let current = master.clone();
    transport.node("10.0.0.9:26379", move |cmd| {
        assert_eq!(cmd[1], "GET-MASTER-ADDR-BY-NAME");
        Step::Reply(RawReply::Array(vec![bulk(*current.lock()), bulk("6379")]))
    });
    transport.node("10.0.0.2:6379", |_| err("READONLY You can't write against a read only replica."));
    transport.node("10.0.0.3:6379", |_| ok());

    let client = Client::with_transport(sentinel_config("mymaster", &["10.0.0.9:26379"]), transport.clone())
        .await
        .unwrap();
    *master.lock() = "10.0.0.3";

    let status = client.set("k", "v").await.unwrap();

    assert_eq!(status, Status::Success);
    let data: Vec<String> = transport
        .sent()
        .into_iter()
        .filter(|s| s.text()[0] == "SET")
        .map(|s| s.addr)
        .collect();
    assert_eq!(data, ["10.0.0.2:6379", "10.0.0.3:6379"]);
}
