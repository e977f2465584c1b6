use std::time::Duration;

use serde_json::{json, Value};

use crate::*;

const FIVE_MIN: Duration = Duration::from_secs(300);

/// Two peers register and each sees only the other.
#[tokio::test]
async fn test_register_and_list_peers() {
    let api = start_api(FIVE_MIN).await;

    let (status, body) = api_post(
        &api.base,
        "/register",
        json!({"id": "A", "name": "alice", "host": "10.0.0.1", "port": 1000, "pubKey": "AAEC"}),
    )
    .await
    .unwrap();
    assert_eq!(status, 200, "register A: {body}");
    assert_eq!(serde_json::from_str::<Value>(&body).unwrap(), json!({"ok": true}));

    let (status, _) = api_post(
        &api.base,
        "/register",
        json!({"id": "B", "host": "10.0.0.2", "port": 2000}),
    )
    .await
    .unwrap();
    assert_eq!(status, 200);

    let for_b = api_get(&api.base, "/peers?id=B").await.unwrap();
    assert_eq!(
        for_b,
        json!({"peers": [{"id": "A", "name": "alice", "host": "10.0.0.1", "port": 1000, "pubKey": "AAEC"}]})
    );

    let for_a = api_get(&api.base, "/peers?id=A").await.unwrap();
    assert_eq!(
        for_a,
        json!({"peers": [{"id": "B", "host": "10.0.0.2", "port": 2000}]})
    );

    let everyone = api_get(&api.base, "/peers").await.unwrap();
    assert_eq!(peer_ids(&everyone), vec!["A", "B"]);
}

/// Re-registering refreshes fields without duplicating the record.
#[tokio::test]
async fn test_reregister_updates_in_place() {
    let api = start_api(FIVE_MIN).await;

    for (id, port) in [("A", 1000), ("B", 2000), ("A", 1001)] {
        let (status, _) = api_post(
            &api.base,
            "/register",
            json!({"id": id, "host": "127.0.0.1", "port": port}),
        )
        .await
        .unwrap();
        assert_eq!(status, 200);
    }

    let body = api_get(&api.base, "/peers?id=C").await.unwrap();
    assert_eq!(peer_ids(&body), vec!["A", "B"]);
    assert_eq!(body["peers"][0]["port"], 1001);
    assert_eq!(api.state.directory.len(), 2);
}

/// Missing required fields and undecodable bodies are both 400s.
#[tokio::test]
async fn test_register_rejects_bad_requests() {
    let api = start_api(FIVE_MIN).await;

    let cases = [
        json!({"host": "h", "port": 1}),
        json!({"id": "A", "port": 1}),
        json!({"id": "A", "host": "h"}),
        json!({"id": "", "host": "h", "port": 1}),
        json!({"id": "A", "host": "h", "port": 0}),
    ];
    for body in cases {
        let (status, text) = api_post(&api.base, "/register", body.clone()).await.unwrap();
        assert_eq!(status, 400, "{body} should be rejected: {text}");
    }

    let (status, _) = api_post_raw(&api.base, "/register", "{not json").await.unwrap();
    assert_eq!(status, 400);

    let (status, _) = api_post(&api.base, "/register", json!({"id": "A", "host": "h", "port": "x"}))
        .await
        .unwrap();
    assert_eq!(status, 400);

    assert!(api.state.directory.is_empty(), "nothing should have been stored");
}

#[tokio::test]
async fn test_notify_rejects_missing_ids() {
    let api = start_api(FIVE_MIN).await;

    let (status, _) = api_post(&api.base, "/notify", json!({"fromId": "A"})).await.unwrap();
    assert_eq!(status, 400);
    let (status, _) = api_post(&api.base, "/notify", json!({"toId": "B"})).await.unwrap();
    assert_eq!(status, 400);
    assert!(api.state.notify.is_empty());
}

/// A connect request is reported on exactly one poll.
#[tokio::test]
async fn test_notify_is_consumed_once() {
    let api = start_api(FIVE_MIN).await;

    for (id, port) in [("A", 1000), ("B", 2000)] {
        api_post(&api.base, "/register", json!({"id": id, "host": "h", "port": port}))
            .await
            .unwrap();
    }

    let (status, _) = api_post(&api.base, "/notify", json!({"fromId": "A", "toId": "B"}))
        .await
        .unwrap();
    assert_eq!(status, 200);

    let first = api_get(&api.base, "/peers_with_notify?id=B").await.unwrap();
    assert_eq!(
        first,
        json!({"peers": [{"id": "A", "host": "h", "port": 1000, "wantsToConnect": true}]})
    );

    let second = api_get(&api.base, "/peers_with_notify?id=B").await.unwrap();
    assert_eq!(second["peers"][0]["wantsToConnect"], false);

    // A never had a request from B.
    let for_a = api_get(&api.base, "/peers_with_notify?id=A").await.unwrap();
    assert_eq!(for_a["peers"][0]["wantsToConnect"], false);
}

/// Plain /peers never consumes a pending connect request.
#[tokio::test]
async fn test_plain_peers_leaves_tokens() {
    let api = start_api(FIVE_MIN).await;

    api_post(&api.base, "/register", json!({"id": "A", "host": "h", "port": 1}))
        .await
        .unwrap();
    api_post(&api.base, "/notify", json!({"fromId": "A", "toId": "B"}))
        .await
        .unwrap();

    api_get(&api.base, "/peers?id=B").await.unwrap();
    assert_eq!(api.state.notify.len(), 1);

    let polled = api_get(&api.base, "/peers_with_notify?id=B").await.unwrap();
    assert_eq!(polled["peers"][0]["wantsToConnect"], true);
    assert!(api.state.notify.is_empty());
}

/// Peers that stop refreshing drop out of every listing.
#[tokio::test]
async fn test_stale_peers_expire() {
    let api = start_api(Duration::from_millis(300)).await;

    api_post(&api.base, "/register", json!({"id": "A", "host": "h", "port": 1}))
        .await
        .unwrap();
    tokio::time::sleep(Duration::from_millis(200)).await;
    api_post(&api.base, "/register", json!({"id": "B", "host": "h", "port": 2}))
        .await
        .unwrap();
    tokio::time::sleep(Duration::from_millis(200)).await;

    let body = api_get(&api.base, "/peers").await.unwrap();
    assert_eq!(peer_ids(&body), vec!["B"]);
    assert_eq!(api.state.directory.len(), 1, "A should have been pruned");

    // Refreshing brings a peer back.
    api_post(&api.base, "/register", json!({"id": "A", "host": "h", "port": 1}))
        .await
        .unwrap();
    let body = api_get(&api.base, "/peers_with_notify").await.unwrap();
    assert_eq!(peer_ids(&body), vec!["B", "A"]);
}

#[tokio::test]
async fn test_status_reports_table_sizes() {
    let api = start_api(FIVE_MIN).await;

    api_post(&api.base, "/register", json!({"id": "A", "host": "h", "port": 1}))
        .await
        .unwrap();
    api_post(&api.base, "/notify", json!({"fromId": "A", "toId": "B"}))
        .await
        .unwrap();

    let status = api_get(&api.base, "/status").await.unwrap();
    assert_eq!(
        status,
        json!({"peers": 1, "notifyTokens": 1, "awaitingRelays": 0, "signalingSessions": 0})
    );
}

#[tokio::test]
async fn test_cors_allows_any_origin() {
    let api = start_api(FIVE_MIN).await;

    let resp = reqwest::Client::new()
        .get(format!("{}/peers", api.base))
        .header("origin", "http://example.test")
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status().as_u16(), 200);
    assert_eq!(
        resp.headers()
            .get("access-control-allow-origin")
            .and_then(|v| v.to_str().ok()),
        Some("*")
    );
}

/// An id with query metacharacters only excludes itself once form-encoded.
#[tokio::test]
async fn test_encoded_caller_id_excludes_only_itself() {
    let api = start_api(FIVE_MIN).await;

    for (id, port) in [("a&b", 1), ("a", 2)] {
        api_post(&api.base, "/register", json!({"id": id, "host": "h", "port": port}))
            .await
            .unwrap();
    }

    let url = reqwest::Url::parse_with_params(&format!("{}/peers", api.base), [("id", "a&b")])
        .unwrap();
    let body: Value = reqwest::get(url).await.unwrap().json().await.unwrap();
    assert_eq!(peer_ids(&body), vec!["a"]);
}
