use blobarena_server::config::ServerConfig;
use blobarena_server::game_loop::{run_game_loop, GameCommand};
use blobarena_server::router;
use blobarena_server::ws::AppState;
use tokio::sync::mpsc;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    let config = match ServerConfig::from_env() {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Invalid server configuration: {}", e);
            std::process::exit(1);
        }
    };

    // Validate configuration before starting
    if let Err(e) = config.validate() {
        eprintln!("Invalid server configuration: {}", e);
        std::process::exit(1);
    }

    let listen_addr = config.listen_addr.clone();
    let (game_tx, game_rx) = mpsc::channel::<GameCommand>(config.command_capacity);
    let app_state = AppState::new(game_tx, &config);

    tracing::info!(
        "World: {} food, {} power-ups, idle timeout {:?}",
        config.world.food_count,
        config.world.power_up_count,
        config.idle_timeout
    );

    // Spawn game loop
    tokio::spawn(async move {
        run_game_loop(game_rx, config).await;
    });

    let listener = match tokio::net::TcpListener::bind(&listen_addr).await {
        Ok(listener) => listener,
        Err(e) => {
            eprintln!("Failed to bind {}: {}", listen_addr, e);
            std::process::exit(1);
        }
    };

    tracing::info!("Blob arena server listening on {}", listen_addr);

    if let Err(e) = axum::serve(listener, router(app_state)).await {
        tracing::error!("Server error: {}", e);
        std::process::exit(1);
    }
}
