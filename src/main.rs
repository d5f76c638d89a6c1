use std::net::TcpListener;
use std::sync::Arc;

use parley::configuration::get_configuration;
use parley::startup::run;
use parley::store::{FriendshipStore, PgFriendshipStore, PgUserStore, UserStore};
use parley::telemetry::init_telemetry;
use sqlx::postgres::PgPoolOptions;

#[tokio::main]
async fn main() -> std::io::Result<()> {
    init_telemetry();

    tracing::info!("Starting application");

    let configuration = match get_configuration() {
        Ok(config) => {
            tracing::info!("Configuration loaded successfully");
            config
        }
        Err(e) => {
            tracing::error!("Failed to read configuration: {}", e);
            return Err(std::io::Error::new(
                std::io::ErrorKind::InvalidInput,
                "Configuration error",
            ));
        }
    };

    let connection_string = configuration.database.connection_string();
    tracing::info!("Attempting to connect to database");

    let pool = PgPoolOptions::new()
        .max_connections(5)
        .connect(&connection_string)
        .await
        .map_err(|e| {
            tracing::error!("Failed to create connection pool: {}", e);
            std::io::Error::new(
                std::io::ErrorKind::ConnectionRefused,
                "Database connection error",
            )
        })?;

    tracing::info!("Database connection pool created successfully");

    let address = format!("127.0.0.1:{}", configuration.application.port);
    tracing::info!("Binding server to address: {}", address);

    let listener = TcpListener::bind(&address)?;
    tracing::info!("Server listening on: {}", address);

    let user_store: Arc<dyn UserStore> = Arc::new(PgUserStore::new(pool.clone()));
    let friendship_store: Arc<dyn FriendshipStore> = Arc::new(PgFriendshipStore::new(pool));

    let jwt_config = configuration.jwt.clone();

    let server = run(listener, user_store, friendship_store, jwt_config)?;
    tracing::info!("Server started successfully");

    let _ = server.await;

    Ok(())
}
