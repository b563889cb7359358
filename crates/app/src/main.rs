use std::sync::Arc;
use std::time::Duration;

use migration::{Migrator, MigratorTrait};
use server::ServerState;
use settings::Database;
use store::{Backend, LocalBackend, RemoteBackend, Store};

mod settings;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    let settings = settings::Settings::new()?;

    tracing_subscriber::fmt()
        .with_env_filter(format!(
            "valigia={level},server={level},engine={level},store={level}",
            level = settings.app.level
        ))
        .init();

    let backend = build_backend(&settings.storage).await?;
    let store = Arc::new(Store::new(backend));
    store.restore_last_trip().await;

    if let Some(remote) = &settings.storage.remote {
        store.spawn_change_feed(Duration::from_secs(remote.poll_secs));
    }

    let engine = engine::Engine::new(Arc::clone(&store));
    let state = ServerState {
        engine: Arc::new(engine),
        assistant: None,
    };

    let server = settings.server.unwrap_or(settings::Server {
        bind: None,
        port: 3000,
    });
    let bind = server.bind.unwrap_or_else(|| "127.0.0.1".to_string());
    let addr = format!("{}:{}", bind, server.port);
    let listener = tokio::net::TcpListener::bind(addr).await?;
    server::run_with_listener(state, listener).await?;

    Ok(())
}

async fn build_backend(
    storage: &settings::Storage,
) -> Result<Arc<dyn Backend>, Box<dyn std::error::Error + Send + Sync>> {
    if let Some(remote) = &storage.remote {
        tracing::info!("Found remote storage settings...");
        return Ok(Arc::new(RemoteBackend::new(
            &remote.base_url,
            remote.auth_token.clone(),
        )));
    }

    let url = match &storage.database {
        Database::Memory => String::from("sqlite::memory:"),
        Database::Sqlite(path) => format!("sqlite:{}?mode=rwc", path),
    };
    let database = sea_orm::Database::connect(url).await?;
    Migrator::up(&database, None).await?;
    Ok(Arc::new(LocalBackend::new(database)))
}
