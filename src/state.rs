//! Shared application state handed to every handler.

use std::sync::Arc;

use crate::notify::Notifier;
use crate::scheduler::DiscountScheduler;

#[derive(Clone)]
pub struct AppState {
    pub db: sqlx::PgPool,
    pub notifier: Arc<dyn Notifier>,
    pub scheduler: DiscountScheduler,
}
