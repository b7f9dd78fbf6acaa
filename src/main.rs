use sqlx::postgres::PgPoolOptions;
use std::net::TcpListener;
use std::sync::Arc;
use user_service::configuration::get_configuration;
use user_service::startup::run;
use user_service::store::{InMemoryUserStore, PgUserStore, UserStore};
use user_service::telemetry::init_telemetry;

#[tokio::main]
async fn main() -> std::io::Result<()> {
    init_telemetry("info");

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

    let store: Arc<dyn UserStore> = match &configuration.database {
        Some(database) => {
            tracing::info!("Attempting to connect to database");

            let pool = PgPoolOptions::new()
                .max_connections(database.max_connections)
                .connect(&database.connection_string())
                .await
                .map_err(|e| {
                    tracing::error!("Failed to create connection pool: {}", e);
                    std::io::Error::new(
                        std::io::ErrorKind::ConnectionRefused,
                        "Database connection error",
                    )
                })?;

            sqlx::migrate!("./migrations")
                .run(&pool)
                .await
                .map_err(|e| {
                    tracing::error!("Failed to run migrations: {}", e);
                    std::io::Error::new(std::io::ErrorKind::Other, "Migration error")
                })?;

            tracing::info!("Database connection pool created successfully");
            Arc::new(PgUserStore::new(pool))
        }
        None => {
            tracing::warn!("No database configured, users are kept in memory only");
            Arc::new(InMemoryUserStore::new())
        }
    };

    let address = configuration.application.address();
    tracing::info!("Binding server to address: {}", address);

    let listener = TcpListener::bind(&address)?;

    let server = run(
        listener,
        store,
        configuration.jwt.clone(),
        configuration.application.password_hash_cost,
    )?;
    tracing::info!("Server started successfully");

    server.await
}
