pub mod auth;
pub mod backend;
pub mod client;
pub mod config;
pub mod error;
pub mod identity;
pub mod range;
pub mod session;
pub mod store;
pub mod sync;
pub mod types;
pub mod weather;

// Re-export commonly used types
pub use auth::{authenticate, ReauthPolicy};
pub use client::{SignedIn, TodoClient};
pub use error::{Result, SyncError};
pub use session::Session;
pub use sync::ListSynchronizer;
pub use types::{SessionState, SheetRef, TaskRecord};
