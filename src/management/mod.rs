mod auth;
mod store;

pub use auth::TokenManager;
pub use auth::is_expired;
pub use store::LedgerChanges;
pub use store::LedgerStore;
pub use store::PlayTally;
pub use store::SqliteStore;
