use sea_orm::DatabaseConnection;

use crate::config::AppConfig;
use crate::ledger::RegistrationLedger;

#[derive(Clone)]
pub struct AppState {
    pub db: DatabaseConnection,
    pub ledger: RegistrationLedger,
    pub config: AppConfig,
}
