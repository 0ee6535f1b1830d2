//! Infrastructure layer - external concerns

pub mod cache;
pub mod database;
pub mod mail;
pub mod shutdown;
pub mod storage;

pub use cache::{CacheKey, ResponseCache};
pub use database::{init_database, DatabaseConfig, DatabaseStorage};
pub use mail::{Attachment, LogMailer, Mailer, MemoryMailer, OutboundEmail};
pub use shutdown::{spawn_signal_listener, ShutdownSignal};
pub use storage::{InMemoryStorage, Storage};
