use std::sync::{Arc, Mutex, MutexGuard};

use rusqlite::Connection;
use tokio::sync::broadcast;

use crate::config::AppConfig;
use crate::errors::AppError;
use crate::models::ChangeEvent;
use crate::services::events::EVENT_CHANNEL_CAPACITY;

pub struct AppState {
    pub db: Arc<Mutex<Connection>>,
    pub config: AppConfig,
    pub events_tx: broadcast::Sender<ChangeEvent>,
}

impl AppState {
    pub fn new(conn: Connection, config: AppConfig) -> Self {
        let (events_tx, _) = broadcast::channel(EVENT_CHANNEL_CAPACITY);
        Self {
            db: Arc::new(Mutex::new(conn)),
            config,
            events_tx,
        }
    }

    pub fn db(&self) -> Result<MutexGuard<'_, Connection>, AppError> {
        self.db
            .lock()
            .map_err(|_| AppError::Internal("database mutex poisoned".to_string()))
    }
}
