//! User records for a job recruitment platform.
//!
//! Validation, password hashing and unique lookups live in
//! [`user::UserService`]. Storage is PostgreSQL, or memory for tests.

#![forbid(unsafe_code)]

pub mod config;
pub mod crypto;
pub mod database;
pub mod error;
pub mod user;

use std::sync::Arc;

use axum::extract::FromRef;

/// State shared by request handlers.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<config::Configuration>,
    pub db: database::Database,
    pub users: user::UserService,
}

impl FromRef<AppState> for user::UserService {
    fn from_ref(state: &AppState) -> user::UserService {
        state.users.clone()
    }
}

/// Initialize the application state.
///
/// Connects to PostgreSQL and runs migrations before returning.
pub async fn initialize_state() -> Result<AppState, Box<dyn std::error::Error>>
{
    // read configuration file. let it in memory.
    let config = config::Configuration::default().read()?;

    let Some(pg) = &config.postgres else {
        tracing::error!("missing `postgres` entry on `config.yaml` file");
        return Err("missing postgres configuration".into());
    };

    let db = database::Database::new(
        &pg.address,
        pg.username.as_deref().unwrap_or(database::DEFAULT_CREDENTIALS),
        pg.password.as_deref().unwrap_or(database::DEFAULT_CREDENTIALS),
        pg.database
            .as_deref()
            .unwrap_or(database::DEFAULT_DATABASE_NAME),
        pg.pool_size.unwrap_or(database::DEFAULT_POOL_SIZE),
    )
    .await?;

    // execute migrations scripts on start.
    db.migrate().await?;

    let hasher = crypto::PasswordManager::new(Some(config.argon2.clone()))?;
    let users = user::UserService::new(
        Arc::new(user::PgUserRepository::new(db.postgres.clone())),
        Arc::new(hasher),
    );

    Ok(AppState { config, db, users })
}
