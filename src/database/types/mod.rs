mod admin;
mod ban;
mod user;

pub use admin::PendingAction;
pub use ban::BanRecord;
pub use user::UserRecord;
