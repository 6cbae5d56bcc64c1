//! Application state shared across request handlers.

use std::sync::Arc;

use crate::db::{Database, DbError};
use crate::service::IdentifierService;

/// Shared application state.
///
/// This is passed to all request handlers via Axum's state extractor.
#[derive(Clone)]
pub struct AppState {
    inner: Arc<AppStateInner>,
}

struct AppStateInner {
    service: IdentifierService,
    /// Absent when running on in-memory stores.
    db: Option<Database>,
}

impl AppState {
    /// Create a new application state.
    pub fn new(service: IdentifierService, db: Option<Database>) -> Self {
        Self {
            inner: Arc::new(AppStateInner { service, db }),
        }
    }

    /// Get a reference to the identifier service.
    pub fn service(&self) -> &IdentifierService {
        &self.inner.service
    }

    /// Get a reference to the database, if one is configured.
    pub fn db(&self) -> Option<&Database> {
        self.inner.db.as_ref()
    }

    /// Checks that the backing store can serve requests.
    pub async fn check_store(&self) -> Result<(), DbError> {
        match self.db() {
            Some(db) => db.health_check().await,
            None => Ok(()),
        }
    }
}
