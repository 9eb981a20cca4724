//! Integration tests for the blob arena server.
//!
//! These tests start a real server instance and connect via WebSocket
//! to verify end-to-end behavior.

use futures_util::{SinkExt, StreamExt};
use serde_json::{json, Value};
use std::time::Duration;
use tokio::net::TcpListener;
use tokio::sync::mpsc;
use tokio_tungstenite::{connect_async, tungstenite::Message};

use blobarena_server::config::ServerConfig;
use blobarena_server::game_loop::{run_game_loop, GameCommand};
use blobarena_server::ws::AppState;
use blobarena_shared::config::WorldConfig;

type Ws =
    tokio_tungstenite::WebSocketStream<tokio_tungstenite::MaybeTlsStream<tokio::net::TcpStream>>;

fn test_config() -> ServerConfig {
    ServerConfig {
        listen_addr: "127.0.0.1:0".to_string(),
        world: WorldConfig {
            food_count: 5,
            power_up_count: 2,
            ..Default::default()
        },
        idle_timeout: None,
        sweep_interval: Duration::from_millis(50),
        max_connections: 100,
        rng_seed: Some(12345),
        ..Default::default()
    }
}

/// Start a test server on a random available port and return the WebSocket URL.
async fn start_test_server(config: ServerConfig) -> String {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    let (game_tx, game_rx) = mpsc::channel::<GameCommand>(256);
    let app_state = AppState::new(game_tx, &config);

    tokio::spawn(async move {
        run_game_loop(game_rx, config).await;
    });

    let app = blobarena_server::router(app_state);
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    format!("ws://{}/ws", addr)
}

async fn connect(url: &str) -> Ws {
    let (ws, _) = connect_async(url).await.expect("Failed to connect");
    ws
}

/// Read the next text message as JSON.
async fn recv_msg(ws: &mut Ws) -> Value {
    loop {
        match ws.next().await {
            Some(Ok(Message::Text(text))) => {
                return serde_json::from_str(&text).expect("Failed to parse server message");
            }
            Some(Ok(Message::Close(_))) => panic!("WebSocket closed unexpectedly"),
            Some(Ok(_)) => continue,
            Some(Err(e)) => panic!("WebSocket error: {}", e),
            None => panic!("WebSocket closed unexpectedly"),
        }
    }
}

async fn recv_msg_timeout(ws: &mut Ws, timeout: Duration) -> Option<Value> {
    tokio::time::timeout(timeout, recv_msg(ws)).await.ok()
}

/// Read messages until one with the given type arrives.
async fn recv_type(ws: &mut Ws, msg_type: &str) -> Value {
    let wait = async {
        loop {
            let msg = recv_msg(ws).await;
            if msg["type"] == msg_type {
                return msg;
            }
        }
    };
    tokio::time::timeout(Duration::from_secs(2), wait)
        .await
        .unwrap_or_else(|_| panic!("Timed out waiting for {}", msg_type))
}

async fn send(ws: &mut Ws, msg: Value) {
    ws.send(Message::Text(msg.to_string().into())).await.unwrap();
}

/// Connect and consume the initial welcome/foods/powerUps burst. Returns (ws, self_id, foods).
async fn connect_and_handshake(url: &str) -> (Ws, u64, Value) {
    let mut ws = connect(url).await;
    let welcome = recv_msg(&mut ws).await;
    assert_eq!(welcome["type"], "welcome");
    let self_id = welcome["selfId"].as_u64().unwrap();
    let foods = recv_msg(&mut ws).await;
    assert_eq!(foods["type"], "foods");
    let power_ups = recv_msg(&mut ws).await;
    assert_eq!(power_ups["type"], "powerUps");
    (ws, self_id, foods)
}

fn ids(list: &Value) -> Vec<String> {
    list.as_array()
        .unwrap()
        .iter()
        .map(|item| item["id"].to_string())
        .collect()
}

// ============================================================================
// Tests
// ============================================================================

#[tokio::test]
async fn test_connect_receives_welcome_and_food() {
    let url = start_test_server(test_config()).await;
    let (_ws, self_id, foods) = connect_and_handshake(&url).await;

    assert!(self_id > 0);
    let foods = foods["foods"].as_array().unwrap();
    assert_eq!(foods.len(), 5);
    assert_eq!(foods[0]["id"], "food-0");
}

#[tokio::test]
async fn test_welcome_carries_world_config() {
    let url = start_test_server(test_config()).await;
    let mut ws = connect(&url).await;
    let welcome = recv_msg(&mut ws).await;
    assert_eq!(welcome["protocolVersion"], 1);
    assert_eq!(welcome["config"]["foodCount"], 5);
    assert!(welcome["players"].as_array().unwrap().is_empty());
}

#[tokio::test]
async fn test_join_broadcasts_player_list() {
    let url = start_test_server(test_config()).await;
    let (mut ws, self_id, _) = connect_and_handshake(&url).await;

    send(&mut ws, json!({"type": "join", "name": "Alice", "skinId": 0})).await;

    let msg = recv_type(&mut ws, "players").await;
    let players = msg["players"].as_array().unwrap();
    assert_eq!(players.len(), 1);
    assert_eq!(players[0]["id"].as_u64(), Some(self_id));
    assert_eq!(players[0]["name"], "Alice");
    assert_eq!(players[0]["skinId"], 0);
    assert_eq!(players[0]["size"], 1.0);
    assert_eq!(players[0]["score"], 0);
}

#[tokio::test]
async fn test_food_eaten_replaces_item() {
    let url = start_test_server(test_config()).await;
    let (mut ws, _, _) = connect_and_handshake(&url).await;

    send(&mut ws, json!({"type": "join", "name": "Alice", "skinId": 0})).await;
    recv_type(&mut ws, "players").await;

    send(&mut ws, json!({"type": "foodEaten", "foodId": "food-2"})).await;
    let msg = recv_type(&mut ws, "foods").await;
    let food_ids = ids(&msg["foods"]);
    assert_eq!(food_ids.len(), 5);
    assert!(!food_ids.contains(&"\"food-2\"".to_string()));
    assert!(food_ids.contains(&"\"food-5\"".to_string()));
}

#[tokio::test]
async fn test_player_died_then_update_is_silent() {
    let url = start_test_server(test_config()).await;
    let (mut ws, _, _) = connect_and_handshake(&url).await;

    send(&mut ws, json!({"type": "join", "name": "Alice", "skinId": 0})).await;
    recv_type(&mut ws, "players").await;

    send(&mut ws, json!({"type": "playerDied"})).await;
    let msg = recv_type(&mut ws, "players").await;
    assert!(msg["players"].as_array().unwrap().is_empty());

    send(
        &mut ws,
        json!({"type": "updatePosition", "position": [1.0, 0.0, 1.0], "size": 2.0, "score": 5}),
    )
    .await;
    let next = recv_msg_timeout(&mut ws, Duration::from_millis(300)).await;
    assert!(next.is_none(), "Expected no broadcast, got {:?}", next);
}

#[tokio::test]
async fn test_malformed_messages_are_ignored() {
    let url = start_test_server(test_config()).await;
    let (mut ws, _, _) = connect_and_handshake(&url).await;

    ws.send(Message::Text("not json".into())).await.unwrap();
    send(&mut ws, json!({"type": "updatePosition", "size": 3.0})).await;
    send(&mut ws, json!({"type": "teleport"})).await;

    // Connection survives and still works
    send(&mut ws, json!({"type": "join", "name": "Still here"})).await;
    let msg = recv_type(&mut ws, "players").await;
    assert_eq!(msg["players"][0]["name"], "Still here");
}

#[tokio::test]
async fn test_disconnect_removes_player_for_others() {
    let url = start_test_server(test_config()).await;
    let (mut ws1, id1, _) = connect_and_handshake(&url).await;
    let (mut ws2, _, _) = connect_and_handshake(&url).await;

    send(&mut ws1, json!({"type": "join", "name": "Leaver"})).await;
    let msg = recv_type(&mut ws2, "players").await;
    assert_eq!(msg["players"][0]["id"].as_u64(), Some(id1));

    ws1.close(None).await.unwrap();

    let msg = recv_type(&mut ws2, "players").await;
    let still_there = msg["players"]
        .as_array()
        .unwrap()
        .iter()
        .any(|p| p["id"].as_u64() == Some(id1));
    assert!(!still_there, "Disconnected player should be removed");
}

#[tokio::test]
async fn test_clients_converge_on_identical_snapshots() {
    let url = start_test_server(test_config()).await;
    let (mut ws1, _, _) = connect_and_handshake(&url).await;
    let (mut ws2, _, _) = connect_and_handshake(&url).await;

    send(&mut ws1, json!({"type": "join", "name": "One"})).await;
    send(&mut ws2, json!({"type": "join", "name": "Two"})).await;
    for i in 0..5 {
        send(
            &mut ws1,
            json!({"type": "updatePosition", "position": [i as f64, 0.0, 0.0], "size": 1.5, "score": i}),
        )
        .await;
        send(
            &mut ws2,
            json!({"type": "updatePosition", "position": [0.0, 0.0, i as f64], "size": 2.5, "score": i * 2}),
        )
        .await;
    }
    send(&mut ws1, json!({"type": "foodEaten", "foodId": "food-0"})).await;
    send(&mut ws2, json!({"type": "foodEaten", "foodId": "food-0"})).await;

    // 2 joins + 10 moves produce 12 players frames; food produces exactly one foods frame
    async fn collect(ws: &mut Ws) -> (Vec<String>, Vec<String>) {
        let mut players = Vec::new();
        let mut foods = Vec::new();
        while players.len() < 12 || foods.is_empty() {
            let msg = recv_msg_timeout(ws, Duration::from_secs(2))
                .await
                .expect("missing broadcast");
            match msg["type"].as_str() {
                Some("players") => players.push(msg.to_string()),
                Some("foods") => foods.push(msg.to_string()),
                _ => {}
            }
        }
        (players, foods)
    }

    let (players1, foods1) = collect(&mut ws1).await;
    let (players2, foods2) = collect(&mut ws2).await;
    assert_eq!(players1, players2);
    assert_eq!(foods1, foods2);

    // The duplicate foodEaten was a no-op
    assert!(recv_msg_timeout(&mut ws1, Duration::from_millis(200)).await.is_none());
}

#[tokio::test]
async fn test_power_up_collection_marks_player() {
    let url = start_test_server(test_config()).await;
    let mut ws = connect(&url).await;
    recv_type(&mut ws, "welcome").await;
    let power_ups = recv_type(&mut ws, "powerUps").await;
    let target = power_ups["powerUps"][0].clone();

    send(&mut ws, json!({"type": "join", "name": "Collector"})).await;
    recv_type(&mut ws, "players").await;

    send(&mut ws, json!({"type": "powerUpCollected", "powerUpId": target["id"]})).await;
    let players = recv_type(&mut ws, "players").await;
    assert_eq!(players["players"][0]["powerUps"][0], target["kind"]);

    let refreshed = recv_type(&mut ws, "powerUps").await;
    let remaining = ids(&refreshed["powerUps"]);
    assert_eq!(remaining.len(), 2);
    assert!(!remaining.contains(&target["id"].to_string()));
}

#[tokio::test]
async fn test_idle_connection_is_evicted() {
    let config = ServerConfig {
        idle_timeout: Some(Duration::from_millis(200)),
        ..test_config()
    };
    let url = start_test_server(config).await;
    let (mut quiet, quiet_id, _) = connect_and_handshake(&url).await;
    let (mut watcher, _, _) = connect_and_handshake(&url).await;

    send(&mut quiet, json!({"type": "join", "name": "Quiet"})).await;
    recv_type(&mut watcher, "players").await;

    // Keep the watcher alive while the quiet client goes silent
    let deadline = tokio::time::Instant::now() + Duration::from_secs(2);
    let mut evicted = false;
    while tokio::time::Instant::now() < deadline {
        send(&mut watcher, json!({"type": "activity"})).await;
        if let Some(msg) = recv_msg_timeout(&mut watcher, Duration::from_millis(50)).await {
            if msg["type"] == "players"
                && !msg["players"]
                    .as_array()
                    .unwrap()
                    .iter()
                    .any(|p| p["id"].as_u64() == Some(quiet_id))
            {
                evicted = true;
                break;
            }
        }
    }
    assert!(evicted, "Idle player should be removed from the roster");

    // The evicted socket is closed by the server
    let closed = tokio::time::timeout(Duration::from_secs(1), async {
        loop {
            match quiet.next().await {
                Some(Ok(Message::Close(_))) | None | Some(Err(_)) => return true,
                Some(Ok(_)) => continue,
            }
        }
    })
    .await
    .unwrap_or(false);
    assert!(closed, "Evicted connection should be closed");
}

#[tokio::test]
async fn test_connection_limit_rejects_extra_clients() {
    let config = ServerConfig {
        max_connections: 1,
        ..test_config()
    };
    let url = start_test_server(config).await;
    let (_first, _, _) = connect_and_handshake(&url).await;

    let mut second = connect(&url).await;
    let outcome = tokio::time::timeout(Duration::from_secs(1), second.next())
        .await
        .expect("server should respond");
    assert!(
        matches!(outcome, Some(Ok(Message::Close(_))) | None | Some(Err(_))),
        "Expected rejection, got {:?}",
        outcome
    );
}

#[tokio::test]
async fn test_silent_client_answering_pings_stays_connected() {
    let config = ServerConfig {
        idle_timeout: Some(Duration::from_millis(300)),
        ..test_config()
    };
    let url = start_test_server(config).await;
    let (mut ws, _, _) = connect_and_handshake(&url).await;

    // Only read; tungstenite answers each ping with a pong while polled
    let mut pings = 0;
    let outcome = tokio::time::timeout(Duration::from_secs(1), async {
        loop {
            match ws.next().await {
                Some(Ok(Message::Ping(_))) => pings += 1,
                Some(Ok(Message::Close(_))) | None | Some(Err(_)) => return "closed",
                Some(Ok(_)) => {}
            }
        }
    })
    .await;
    assert!(outcome.is_err(), "Silent client was closed");
    assert!(pings >= 2, "Expected server pings, got {}", pings);

    // Still fully usable
    send(&mut ws, json!({"type": "join", "name": "Lurker"})).await;
    let msg = recv_type(&mut ws, "players").await;
    assert_eq!(msg["players"][0]["name"], "Lurker");
}

#[tokio::test]
async fn test_join_with_wrongly_typed_skin_uses_default() {
    let url = start_test_server(test_config()).await;
    let (mut ws, self_id, _) = connect_and_handshake(&url).await;

    send(&mut ws, json!({"type": "join", "name": "Alice", "skinId": "gold"})).await;
    let msg = recv_type(&mut ws, "players").await;
    assert_eq!(msg["players"][0]["id"].as_u64(), Some(self_id));
    assert_eq!(msg["players"][0]["skinId"], 0);
}
