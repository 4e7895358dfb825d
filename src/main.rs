use std::io;
use std::sync::Arc;

use actix_cors::Cors;
use actix_web::middleware::{Logger, NormalizePath};
use actix_web::{web, App, HttpServer};

use kanmind::auth::{PasswordHasher, TokenService};
use kanmind::config::{Config, StorageBackend};
use kanmind::routes;
use kanmind::store::{MemoryStore, PgStore, Store};

fn io_error(err: impl std::fmt::Display) -> io::Error {
    io::Error::new(io::ErrorKind::Other, err.to_string())
}

#[actix_web::main]
async fn main() -> io::Result<()> {
    dotenv::dotenv().ok();
    env_logger::init_from_env(env_logger::Env::default().default_filter_or("info"));

    let config = Config::from_env().map_err(io_error)?;

    let store: Arc<dyn Store> = match &config.storage {
        StorageBackend::Postgres {
            database_url,
            max_connections,
        } => {
            let store = PgStore::connect(database_url, *max_connections)
                .await
                .map_err(io_error)?;
            store.migrate().await.map_err(io_error)?;
            log::info!("connected to PostgreSQL, migrations applied");
            Arc::new(store)
        }
        StorageBackend::InMemory => {
            log::warn!("running on the in-memory store; data is lost on shutdown");
            Arc::new(MemoryStore::new())
        }
    };

    let store = web::Data::from(store);
    let tokens = web::Data::new(TokenService::new(
        &config.jwt_secret,
        config.jwt_expiration_hours,
    ));
    let hasher = web::Data::new(PasswordHasher::new(config.bcrypt_cost));

    log::info!("Starting KanMind server at {}", config.server_url());
    HttpServer::new(move || {
        App::new()
            .app_data(store.clone())
            .app_data(tokens.clone())
            .app_data(hasher.clone())
            .wrap(Cors::permissive().max_age(3600))
            .wrap(Logger::default())
            .wrap(NormalizePath::trim())
            .configure(routes::app_config)
    })
    .bind((config.server_host.as_str(), config.server_port))?
    .run()
    .await
}
