//! REST API server demo
//!
//! Runs tunefetch with the REST API enabled. Pass a JSON config file path as the
//! first argument, or run with defaults (local storage under `./storage`).
//!
//! After starting, you can:
//! - View Swagger UI at http://localhost:3900/swagger-ui
//! - Submit a song via POST http://localhost:3900/download
//! - Poll a task via GET http://localhost:3900/download?task_id=1
//! - Stream events via GET http://localhost:3900/events
//!
//! Log verbosity follows `RUST_LOG` (default: `tunefetch=info,tower_http=info`).

use tracing_subscriber::EnvFilter;
use tunefetch::{Config, TaskManager, run_with_shutdown};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("tunefetch=info,tower_http=info")),
        )
        .init();

    let config = match std::env::args().nth(1) {
        Some(path) => Config::from_json_file(path)?,
        None => {
            let mut config = Config::default();
            // Lets `curl -H 'X-Test-Mode: true' -H 'X-Test-Secret: demo'` work out of the box
            config.server.api.auth.test_mode_secret = Some("demo".to_string());
            config
        }
    };
    let bind_address = config.server.api.bind_address;

    let manager = TaskManager::new(config).await?;
    let api = manager.spawn_api_server();

    println!("Starting tunefetch REST API server");
    println!("Swagger UI: http://{bind_address}/swagger-ui");
    println!("Events stream: http://{bind_address}/events");
    println!();
    println!("Example commands:");
    println!("  # Submit a fixture song in test mode");
    println!("  curl -X POST http://{bind_address}/download \\");
    println!("    -H 'Content-Type: application/json' \\");
    println!("    -H 'X-Test-Mode: true' -H 'X-Test-Secret: demo' \\");
    println!("    -d '{{\"url\": \"test://hello\"}}'");
    println!();
    println!("  # List recent tasks");
    println!("  curl -H 'X-Test-Mode: true' -H 'X-Test-Secret: demo' http://{bind_address}/download");

    run_with_shutdown(manager).await?;
    api.abort();

    Ok(())
}
