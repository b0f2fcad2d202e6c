//! Gateway integration tests
//!
//! Each test boots its own gateway on ephemeral loopback ports.
//!
//! Run with: cargo test -p integration-tests --test gateway_tests

use comet_gateway::protocol::{HeartbeatAckPayload, OpCode, Proto, RouteChangePayload};
use comet_gateway::zone::RoutingId;
use integration_tests::{
    auth_frame, auth_frame_with_code, heartbeat_frame, test_config, unique_uid, ConnectionStats,
    PushRequest, PushResponse, TestGateway, WsClient, ZoneStats,
};
use reqwest::StatusCode;
use std::time::Duration;

// ============================================================================
// Handshake
// ============================================================================

#[tokio::test]
async fn test_tcp_auth_registers_session() {
    let gateway = TestGateway::start().await.unwrap();
    let mut client = gateway.tcp_client().await.unwrap();
    let uid = unique_uid();

    let ack = client.auth(uid).await.unwrap();
    let id = RoutingId::from_raw(ack.id);
    assert_eq!(id.user(), u64::from(uid));
    assert_eq!(ack.zone, (uid % 16) as u8);
    assert_eq!(id.zone(), ack.zone);
    assert_eq!(ack.heartbeat_ms, 90_000);

    // Registered before the ack is written.
    assert!(gateway.server().zones().get(id).is_some());
}

#[tokio::test]
async fn test_auth_reply_echoes_seq() {
    let gateway = TestGateway::start().await.unwrap();
    let mut client = gateway.tcp_client().await.unwrap();

    client.send(&auth_frame(unique_uid(), 77)).await.unwrap();
    let reply = client.expect_frame().await.unwrap();
    assert_eq!(reply.op_code(), Some(OpCode::AuthReply));
    assert_eq!(reply.seq, 77);
}

#[tokio::test]
async fn test_rejected_auth_closes_without_registering() {
    let gateway = TestGateway::start().await.unwrap();
    let mut client = gateway.tcp_client().await.unwrap();

    client
        .send(&auth_frame_with_code(unique_uid(), "", 1))
        .await
        .unwrap();
    client.expect_closed().await.unwrap();
    assert_eq!(gateway.server().zones().session_count(), 0);
}

#[tokio::test]
async fn test_first_frame_must_be_auth() {
    let gateway = TestGateway::start().await.unwrap();
    let mut client = gateway.tcp_client().await.unwrap();

    client.send(&heartbeat_frame(1, 1)).await.unwrap();
    client.expect_closed().await.unwrap();
}

#[tokio::test]
async fn test_handshake_timeout_closes_silent_client() {
    let mut config = test_config();
    config.proto.handshake_timeout_ms = 200;
    let gateway = TestGateway::start_with_config(config).await.unwrap();
    let mut client = gateway.tcp_client().await.unwrap();

    client.expect_closed().await.unwrap();
    assert_eq!(gateway.server().zones().session_count(), 0);
}

// ============================================================================
// Established connections
// ============================================================================

#[tokio::test]
async fn test_heartbeat_reply_carries_server_time() {
    let gateway = TestGateway::start().await.unwrap();
    let mut client = gateway.tcp_client().await.unwrap();
    let uid = unique_uid();
    client.auth(uid).await.unwrap();

    client.send(&heartbeat_frame(uid, 5)).await.unwrap();
    let reply = client.expect_frame().await.unwrap();
    assert_eq!(reply.op_code(), Some(OpCode::HeartbeatReply));
    assert_eq!(reply.seq, 5);
    let body: HeartbeatAckPayload = serde_json::from_slice(&reply.body).unwrap();
    assert!(!body.time.is_empty());
}

#[tokio::test]
async fn test_empty_heartbeat_body_is_accepted() {
    let gateway = TestGateway::start().await.unwrap();
    let mut client = gateway.tcp_client().await.unwrap();
    client.auth(unique_uid()).await.unwrap();

    client
        .send(&Proto::new(OpCode::Heartbeat, Vec::new()).with_seq(2))
        .await
        .unwrap();
    let reply = client.expect_frame().await.unwrap();
    assert_eq!(reply.op_code(), Some(OpCode::HeartbeatReply));
}

#[tokio::test]
async fn test_route_change_reply_has_no_body() {
    let gateway = TestGateway::start().await.unwrap();
    let mut client = gateway.tcp_client().await.unwrap();
    let uid = unique_uid();
    client.auth(uid).await.unwrap();

    let body = serde_json::to_vec(&RouteChangePayload { uid, mid: 9 }).unwrap();
    client
        .send(&Proto::new(OpCode::RouteChange, body).with_seq(3))
        .await
        .unwrap();
    let reply = client.expect_frame().await.unwrap();
    assert_eq!(reply.op_code(), Some(OpCode::RouteChangeReply));
    assert_eq!(reply.seq, 3);
    assert!(reply.body.is_empty());
}

#[tokio::test]
async fn test_pipelined_requests_reply_in_order() {
    let gateway = TestGateway::start().await.unwrap();
    let mut client = gateway.tcp_client().await.unwrap();
    let uid = unique_uid();
    client.auth(uid).await.unwrap();

    for seq in 10..14 {
        client.send(&heartbeat_frame(uid, seq)).await.unwrap();
    }
    for seq in 10..14 {
        assert_eq!(client.expect_frame().await.unwrap().seq, seq);
    }
}

#[tokio::test]
async fn test_heartbeats_extend_the_deadline() {
    let mut config = test_config();
    config.proto.heartbeat_ms = 1_000;
    let gateway = TestGateway::start_with_config(config).await.unwrap();
    let mut client = gateway.tcp_client().await.unwrap();
    let uid = unique_uid();
    client.auth(uid).await.unwrap();

    for seq in 0..5 {
        tokio::time::sleep(Duration::from_millis(400)).await;
        client.send(&heartbeat_frame(uid, seq)).await.unwrap();
        assert_eq!(
            client.expect_frame().await.unwrap().op_code(),
            Some(OpCode::HeartbeatReply)
        );
    }
    assert_eq!(gateway.server().zones().session_count(), 1);
}

#[tokio::test]
async fn test_missed_heartbeat_closes_and_unregisters() {
    let mut config = test_config();
    config.proto.heartbeat_ms = 300;
    let gateway = TestGateway::start_with_config(config).await.unwrap();
    let mut client = gateway.tcp_client().await.unwrap();
    client.auth(unique_uid()).await.unwrap();

    client.expect_closed().await.unwrap();
    assert!(gateway.eventually(|s| s.zones().session_count() == 0).await);
}

#[tokio::test]
async fn test_oversize_frame_is_fatal() {
    let gateway = TestGateway::start().await.unwrap();
    let mut client = gateway.tcp_client().await.unwrap();
    client.auth(unique_uid()).await.unwrap();

    client
        .send(&Proto::new(OpCode::Heartbeat, vec![b' '; 5000]))
        .await
        .unwrap();
    client.expect_closed().await.unwrap();
    assert!(gateway.eventually(|s| s.zones().session_count() == 0).await);
}

#[tokio::test]
async fn test_auth_after_establishment_is_fatal() {
    let gateway = TestGateway::start().await.unwrap();
    let mut client = gateway.tcp_client().await.unwrap();
    let uid = unique_uid();
    client.auth(uid).await.unwrap();

    client.send(&auth_frame(uid, 2)).await.unwrap();
    client.expect_closed().await.unwrap();
}

#[tokio::test]
async fn test_duplicate_uid_evicts_older_connection() {
    let gateway = TestGateway::start().await.unwrap();
    let uid = unique_uid();

    let mut first = gateway.tcp_client().await.unwrap();
    let ack = first.auth(uid).await.unwrap();
    let mut second = gateway.tcp_client().await.unwrap();
    assert_eq!(second.auth(uid).await.unwrap().id, ack.id);

    first.expect_closed().await.unwrap();

    // The evicted connection's teardown leaves the replacement registered.
    second.send(&heartbeat_frame(uid, 4)).await.unwrap();
    assert_eq!(second.expect_frame().await.unwrap().seq, 4);
    assert!(gateway
        .server()
        .zones()
        .get(RoutingId::from_raw(ack.id))
        .is_some());
    assert_eq!(gateway.server().zones().session_count(), 1);
}

// ============================================================================
// WebSocket
// ============================================================================

#[tokio::test]
async fn test_ws_auth_and_heartbeat() {
    let gateway = TestGateway::start().await.unwrap();
    let mut client = gateway.ws_client().await.unwrap();
    let uid = unique_uid();

    let ack = client.auth(uid).await.unwrap();
    assert!(gateway
        .server()
        .zones()
        .get(RoutingId::from_raw(ack.id))
        .is_some());

    client.send(&heartbeat_frame(uid, 8)).await.unwrap();
    let reply = client.expect_frame().await.unwrap();
    assert_eq!(reply.op_code(), Some(OpCode::HeartbeatReply));
    assert_eq!(reply.seq, 8);
}

#[tokio::test]
async fn test_ws_accepts_single_unit_array() {
    let gateway = TestGateway::start().await.unwrap();
    let mut client = gateway.ws_client().await.unwrap();
    let uid = unique_uid();
    client.auth(uid).await.unwrap();

    client
        .send_text(r#"[{"ver":1,"type":1,"seq":21,"body":{"uid":1}}]"#)
        .await
        .unwrap();
    assert_eq!(client.expect_frame().await.unwrap().seq, 21);
}

#[tokio::test]
async fn test_ws_invalid_json_is_fatal() {
    let gateway = TestGateway::start().await.unwrap();
    let mut client = gateway.ws_client().await.unwrap();

    client.send_text("not json").await.unwrap();
    client.expect_closed().await.unwrap();
}

#[tokio::test]
async fn test_ws_wrong_path_is_refused() {
    let gateway = TestGateway::start().await.unwrap();
    assert!(WsClient::connect(&gateway.ws_url("/other")).await.is_err());
}

#[tokio::test]
async fn test_ws_handshake_timeout_closes_silent_client() {
    let mut config = test_config();
    config.proto.handshake_timeout_ms = 200;
    let gateway = TestGateway::start_with_config(config).await.unwrap();
    let mut client = gateway.ws_client().await.unwrap();

    client.expect_closed().await.unwrap();
    assert_eq!(gateway.server().zones().session_count(), 0);
}

#[tokio::test]
async fn test_ws_missed_heartbeat_closes_and_unregisters() {
    let mut config = test_config();
    config.proto.heartbeat_ms = 300;
    let gateway = TestGateway::start_with_config(config).await.unwrap();
    let mut client = gateway.ws_client().await.unwrap();
    let ack = client.auth(unique_uid()).await.unwrap();

    client.expect_closed().await.unwrap();
    assert!(gateway.eventually(|s| s.zones().session_count() == 0).await);

    let request = PushRequest {
        id: ack.id,
        op: 2000,
        seq: 0,
        body: serde_json::json!({}),
    };
    let response: PushResponse = gateway
        .post("/push", &request)
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(response.result, "unknown_id");
}

#[tokio::test]
async fn test_ws_oversize_message_is_fatal() {
    let gateway = TestGateway::start().await.unwrap();
    let mut client = gateway.ws_client().await.unwrap();
    client.auth(unique_uid()).await.unwrap();

    let padding = "x".repeat(5000);
    let text = format!(r#"{{"ver":1,"type":1,"seq":2,"body":{{"pad":"{padding}"}}}}"#);
    client.send_text(&text).await.unwrap();
    client.expect_closed().await.unwrap();
    assert!(gateway.eventually(|s| s.zones().session_count() == 0).await);
}

// ============================================================================
// Stat / admin endpoint
// ============================================================================

#[tokio::test]
async fn test_health_check() {
    let gateway = TestGateway::start().await.unwrap();
    let response = gateway.get("/health").await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(response.text().await.unwrap(), "OK");
}

#[tokio::test]
async fn test_stat_snapshots() {
    let gateway = TestGateway::start().await.unwrap();
    let mut client = gateway.tcp_client().await.unwrap();
    let ack = client.auth(unique_uid()).await.unwrap();

    let server: serde_json::Value = gateway
        .get("/stat?type=server")
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(server["pid"], std::process::id());

    let connection: ConnectionStats = gateway
        .get("/stat?type=connection")
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(connection.sessions, 1);
    assert_eq!(connection.timers, 1);

    let zones: Vec<ZoneStats> = gateway
        .get("/stat?type=zone")
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(zones.len(), 16);
    let zone = &zones[usize::from(ack.zone)];
    assert_eq!(zone.id, ack.zone);
    assert_eq!((zone.add, zone.remove, zone.current), (1, 0, 1));

    let response = gateway.get("/stat?type=bogus").await.unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_push_delivered_over_tcp() {
    let gateway = TestGateway::start().await.unwrap();
    let mut client = gateway.tcp_client().await.unwrap();
    let ack = client.auth(unique_uid()).await.unwrap();

    let request = PushRequest {
        id: ack.id,
        op: 1030,
        seq: 0,
        body: serde_json::json!({"msg": "hi"}),
    };
    let response: PushResponse = gateway
        .post("/push", &request)
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(response.result, "delivered");

    let frame = client.expect_frame().await.unwrap();
    assert_eq!(frame.op, 1030);
    assert_eq!(frame.body, br#"{"msg":"hi"}"#);

    let messages: serde_json::Value = gateway
        .get("/stat?type=message")
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(messages["succeed"], 1);
}

#[tokio::test]
async fn test_push_delivered_over_websocket() {
    let gateway = TestGateway::start().await.unwrap();
    let mut client = gateway.ws_client().await.unwrap();
    let ack = client.auth(unique_uid()).await.unwrap();

    let request = PushRequest {
        id: ack.id,
        op: 1030,
        seq: 6,
        body: serde_json::json!({"msg": "hi"}),
    };
    let response: PushResponse = gateway
        .post("/push", &request)
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(response.result, "delivered");

    let frame = client.expect_frame().await.unwrap();
    assert_eq!((frame.op, frame.seq), (1030, 6));
    assert_eq!(frame.body, br#"{"msg":"hi"}"#);
}

#[tokio::test]
async fn test_push_to_unknown_id() {
    let gateway = TestGateway::start().await.unwrap();
    let request = PushRequest {
        id: RoutingId::new(0, 3, 12345).as_u64(),
        op: 1030,
        seq: 0,
        body: serde_json::json!({}),
    };
    let response: PushResponse = gateway
        .post("/push", &request)
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(response.result, "unknown_id");
}

// ============================================================================
// Shutdown
// ============================================================================

#[tokio::test]
async fn test_shutdown_closes_live_connections() {
    let mut gateway = TestGateway::start().await.unwrap();
    let mut tcp = gateway.tcp_client().await.unwrap();
    tcp.auth(unique_uid()).await.unwrap();
    let mut ws = gateway.ws_client().await.unwrap();
    ws.auth(unique_uid()).await.unwrap();

    assert_eq!(gateway.gateway.shutdown(), 2);
    tcp.expect_closed().await.unwrap();
    ws.expect_closed().await.unwrap();
}
