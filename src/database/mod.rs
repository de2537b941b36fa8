mod errors;
mod services;
mod types;

pub use errors::DatabaseError;
pub use services::Database;
pub use types::{BanRecord, PendingAction, UserRecord};
