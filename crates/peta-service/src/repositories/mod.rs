mod approvals;
mod posts;
mod sites;
mod traits;

pub use approvals::SqliteApprovalRepository;
pub use posts::SqlitePostRepository;
pub use sites::SqliteSiteRepository;
pub use traits::{ApprovalRepository, PostRepository, SiteRepository};

use crate::errors::ApiError;
use diesel::sqlite::SqliteConnection;
use std::sync::{Arc, Mutex, MutexGuard};

pub type SharedConnection = Arc<Mutex<SqliteConnection>>;

fn lock(db: &SharedConnection) -> Result<MutexGuard<'_, SqliteConnection>, ApiError> {
    db.lock().map_err(|_| {
        tracing::error!("Database connection mutex poisoned");
        ApiError::InternalError
    })
}
