pub mod auth;
pub mod automation;
pub mod config;
pub mod db;
pub mod error;
pub mod handlers;
pub mod rate_limit;
pub mod routes;
pub mod scans;
pub mod security;

use sea_orm::DatabaseConnection;

use config::Config;
use rate_limit::CounterStore;

#[derive(Clone)]
pub struct AppState {
    pub db: DatabaseConnection,
    pub jwt: auth::jwt::JwtManager,
    pub config: Config,
    pub counters: CounterStore,
}

impl AsRef<AppState> for AppState {
    fn as_ref(&self) -> &AppState {
        self
    }
}
