//! Load test for the blob arena server.
//!
//! Spawns multiple fake WebSocket clients that:
//! - Connect and join with a generated name
//! - Periodically send updatePosition messages
//! - Occasionally report eating a food item they know about
//! - Receive and count players/foods broadcasts
//!
//! Usage: cargo run --bin loadtest -- [OPTIONS]
//!
//! Options:
//!   --clients N       Number of clients to spawn (default: 100)
//!   --duration S      Test duration in seconds (default: 30)
//!   --update-rate R   Position updates per second per client (default: 10)
//!   --eat-chance P    Chance per update of eating a food item (default: 0.05)
//!   --url URL         Server URL (default: ws://127.0.0.1:3001/ws)

use futures_util::{SinkExt, StreamExt};
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use serde_json::json;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio_tungstenite::{connect_async, tungstenite::Message};

use blobarena_shared::protocol::ServerMsg;

// === Metrics ===

#[derive(Default)]
struct Metrics {
    connected: AtomicU64,
    messages_received: AtomicU64,
    players_received: AtomicU64,
    foods_received: AtomicU64,
    updates_sent: AtomicU64,
    foods_eaten_sent: AtomicU64,
    errors: AtomicU64,
    total_players_seen: AtomicU64,
    latency_sum_ms: AtomicU64,
    latency_count: AtomicU64,
}

struct ClientOptions {
    url: String,
    update_interval: Duration,
    eat_chance: f64,
    duration: Duration,
}

/// Time between position updates; a rate of 0 disables them.
fn update_interval(rate: f64) -> Result<Duration, String> {
    if rate == 0.0 {
        return Ok(Duration::from_secs(3600));
    }
    if !rate.is_finite() || rate < 0.0 {
        return Err(format!("--update-rate must be a finite number >= 0, got {}", rate));
    }
    Duration::try_from_secs_f64(1.0 / rate)
        .map_err(|_| format!("--update-rate {} is out of range", rate))
}

fn check_eat_chance(chance: f64) -> Result<f64, String> {
    if (0.0..=1.0).contains(&chance) {
        Ok(chance)
    } else {
        Err(format!("--eat-chance must be within [0, 1], got {}", chance))
    }
}

// === Client task ===

async fn run_client(client_id: u32, opts: Arc<ClientOptions>, metrics: Arc<Metrics>) {
    let connect_start = Instant::now();

    let (mut ws, _) = match connect_async(&opts.url).await {
        Ok(conn) => conn,
        Err(e) => {
            if client_id < 5 {
                eprintln!("Client {} failed to connect: {}", client_id, e);
            }
            metrics.errors.fetch_add(1, Ordering::Relaxed);
            return;
        }
    };

    metrics
        .latency_sum_ms
        .fetch_add(connect_start.elapsed().as_millis() as u64, Ordering::Relaxed);
    metrics.latency_count.fetch_add(1, Ordering::Relaxed);
    metrics.connected.fetch_add(1, Ordering::Relaxed);

    // Wait for the food field that follows the welcome
    let handshake = tokio::time::timeout(Duration::from_secs(5), async {
        while let Some(msg) = ws.next().await {
            match msg {
                Ok(Message::Text(text)) => {
                    metrics.messages_received.fetch_add(1, Ordering::Relaxed);
                    if let Ok(ServerMsg::Foods(foods)) = serde_json::from_str(&text) {
                        return Some(foods.foods.into_iter().map(|f| f.id).collect::<Vec<String>>());
                    }
                }
                Ok(Message::Close(_)) | Err(_) => return None,
                _ => {}
            }
        }
        None
    })
    .await;

    let mut food_ids: Vec<String> = match handshake {
        Ok(Some(ids)) => ids,
        Ok(None) | Err(_) => {
            if client_id < 3 {
                eprintln!("Client {} failed handshake", client_id);
            }
            metrics.errors.fetch_add(1, Ordering::Relaxed);
            metrics.connected.fetch_sub(1, Ordering::Relaxed);
            return;
        }
    };

    let join = json!({"type": "join", "name": format!("bot-{}", client_id), "skinId": client_id % 10});
    if ws.send(Message::Text(join.to_string().into())).await.is_err() {
        metrics.errors.fetch_add(1, Ordering::Relaxed);
        metrics.connected.fetch_sub(1, Ordering::Relaxed);
        return;
    }

    let mut update_timer = tokio::time::interval(opts.update_interval);
    update_timer.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);

    let mut rng = ChaCha8Rng::seed_from_u64(client_id as u64);
    let mut position = [0.0f64, 0.0, 0.0];
    let mut score: u32 = 0;
    let test_end = Instant::now() + opts.duration;

    loop {
        if Instant::now() >= test_end {
            break;
        }

        tokio::select! {
            _ = update_timer.tick() => {
                position[0] = (position[0] + rng.gen_range(-1.0..1.0)).clamp(-100.0, 100.0);
                position[2] = (position[2] + rng.gen_range(-1.0..1.0)).clamp(-100.0, 100.0);

                let mut outgoing = vec![json!({
                    "type": "updatePosition",
                    "position": position,
                    "size": 1.0 + score as f64 * 0.05,
                    "score": score,
                })];
                if !food_ids.is_empty() && rng.gen_bool(opts.eat_chance) {
                    let food_id = &food_ids[rng.gen_range(0..food_ids.len())];
                    outgoing.push(json!({"type": "foodEaten", "foodId": food_id}));
                    score += 1;
                }

                let mut send_failed = false;
                for msg in outgoing {
                    let is_food = msg["type"] == "foodEaten";
                    if ws.send(Message::Text(msg.to_string().into())).await.is_err() {
                        metrics.errors.fetch_add(1, Ordering::Relaxed);
                        send_failed = true;
                        break;
                    }
                    if is_food {
                        metrics.foods_eaten_sent.fetch_add(1, Ordering::Relaxed);
                    } else {
                        metrics.updates_sent.fetch_add(1, Ordering::Relaxed);
                    }
                }
                if send_failed {
                    break;
                }
            }

            msg = ws.next() => {
                match msg {
                    Some(Ok(Message::Text(text))) => {
                        metrics.messages_received.fetch_add(1, Ordering::Relaxed);
                        match serde_json::from_str::<ServerMsg>(&text) {
                            Ok(ServerMsg::Players(p)) => {
                                metrics.players_received.fetch_add(1, Ordering::Relaxed);
                                metrics.total_players_seen.fetch_add(p.players.len() as u64, Ordering::Relaxed);
                            }
                            Ok(ServerMsg::Foods(f)) => {
                                metrics.foods_received.fetch_add(1, Ordering::Relaxed);
                                food_ids = f.foods.into_iter().map(|f| f.id).collect();
                            }
                            _ => {}
                        }
                    }
                    Some(Ok(Message::Close(_))) | None => break,
                    Some(Err(e)) => {
                        if client_id < 3 {
                            eprintln!("Client {} error: {}", client_id, e);
                        }
                        metrics.errors.fetch_add(1, Ordering::Relaxed);
                        break;
                    }
                    Some(Ok(_)) => {}
                }
            }
        }
    }

    let _ = ws.close(None).await;
    metrics.connected.fetch_sub(1, Ordering::Relaxed);
}

// === Main ===

#[tokio::main]
async fn main() {
    let args: Vec<String> = std::env::args().collect();

    let mut num_clients: u32 = 100;
    let mut duration_secs: u64 = 30;
    let mut update_rate: f64 = 10.0;
    let mut eat_chance: f64 = 0.05;
    let mut url = "ws://127.0.0.1:3001/ws".to_string();

    let mut i = 1;
    while i < args.len() {
        match args[i].as_str() {
            "--clients" => {
                i += 1;
                num_clients = args.get(i).and_then(|s| s.parse().ok()).unwrap_or(100);
            }
            "--duration" => {
                i += 1;
                duration_secs = args.get(i).and_then(|s| s.parse().ok()).unwrap_or(30);
            }
            "--update-rate" => {
                i += 1;
                update_rate = args.get(i).and_then(|s| s.parse().ok()).unwrap_or(10.0);
            }
            "--eat-chance" => {
                i += 1;
                eat_chance = args.get(i).and_then(|s| s.parse().ok()).unwrap_or(0.05);
            }
            "--url" => {
                i += 1;
                url = args.get(i).cloned().unwrap_or(url);
            }
            _ => {}
        }
        i += 1;
    }
    let checked = update_interval(update_rate)
        .and_then(|interval| Ok((interval, check_eat_chance(eat_chance)?)));
    let (interval, eat_chance) = match checked {
        Ok(checked) => checked,
        Err(e) => {
            eprintln!("{}", e);
            std::process::exit(1);
        }
    };

    println!("=== Blob Arena Load Test ===");
    println!("Clients: {}", num_clients);
    println!("Duration: {}s", duration_secs);
    println!("Update rate: {}/s per client", update_rate);
    println!("Eat chance: {}", eat_chance);
    println!("URL: {}", url);
    println!();

    let metrics = Arc::new(Metrics::default());
    let opts = Arc::new(ClientOptions {
        url,
        update_interval: interval,
        eat_chance,
        duration: Duration::from_secs(duration_secs),
    });

    let mut handles = Vec::with_capacity(num_clients as usize);

    println!("Spawning {} clients...", num_clients);
    let spawn_start = Instant::now();

    for client_id in 0..num_clients {
        let opts = Arc::clone(&opts);
        let metrics = Arc::clone(&metrics);

        handles.push(tokio::spawn(async move {
            run_client(client_id, opts, metrics).await;
        }));

        // Stagger spawns slightly to avoid thundering herd
        if client_id % 50 == 49 {
            tokio::time::sleep(Duration::from_millis(100)).await;
        }
    }

    println!("All clients spawned in {:?}", spawn_start.elapsed());
    println!();

    let metrics_clone = Arc::clone(&metrics);
    let stats_handle = tokio::spawn(async move {
        let mut interval = tokio::time::interval(Duration::from_secs(5));
        let start = Instant::now();

        loop {
            interval.tick().await;
            let elapsed = start.elapsed().as_secs();
            if elapsed >= duration_secs + 5 {
                break;
            }

            println!(
                "[{:3}s] connected={}, msgs={}, players={}, foods={}, updates={}, eaten={}, errors={}",
                elapsed,
                metrics_clone.connected.load(Ordering::Relaxed),
                metrics_clone.messages_received.load(Ordering::Relaxed),
                metrics_clone.players_received.load(Ordering::Relaxed),
                metrics_clone.foods_received.load(Ordering::Relaxed),
                metrics_clone.updates_sent.load(Ordering::Relaxed),
                metrics_clone.foods_eaten_sent.load(Ordering::Relaxed),
                metrics_clone.errors.load(Ordering::Relaxed),
            );
        }
    });

    for handle in handles {
        let _ = handle.await;
    }

    stats_handle.abort();

    println!();
    println!("=== Final Results ===");
    let msgs = metrics.messages_received.load(Ordering::Relaxed);
    let players = metrics.players_received.load(Ordering::Relaxed);
    let foods = metrics.foods_received.load(Ordering::Relaxed);
    let updates = metrics.updates_sent.load(Ordering::Relaxed);
    let eaten = metrics.foods_eaten_sent.load(Ordering::Relaxed);
    let errors = metrics.errors.load(Ordering::Relaxed);
    let roster = metrics.total_players_seen.load(Ordering::Relaxed);
    let latency_sum = metrics.latency_sum_ms.load(Ordering::Relaxed);
    let latency_count = metrics.latency_count.load(Ordering::Relaxed);

    println!("Total messages received: {}", msgs);
    println!("Total players messages: {}", players);
    println!("Total foods messages: {}", foods);
    println!("Total updatePosition sent: {}", updates);
    println!("Total foodEaten sent: {}", eaten);
    println!("Total errors: {}", errors);
    println!(
        "Average roster size: {}",
        if players > 0 { roster / players } else { 0 }
    );

    if latency_count > 0 {
        println!("Average connect latency: {}ms", latency_sum / latency_count);
    }

    let msgs_per_sec = msgs as f64 / duration_secs.max(1) as f64;
    println!();
    println!("Messages/sec (total): {:.0}", msgs_per_sec);

    // Every update fans out to every client
    let expected_per_client = updates as f64;
    let per_client = players as f64 / num_clients.max(1) as f64;
    if expected_per_client > 0.0 {
        println!(
            "Delivery rate: {:.1}%",
            per_client / expected_per_client * 100.0
        );
    }
}
