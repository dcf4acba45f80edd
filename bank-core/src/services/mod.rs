//! Service layer - business logic orchestration
//!
//! Services coordinate domain logic and port interactions. Each service
//! focuses on a specific use case or feature area.

mod account;
mod auth;
mod history;
pub mod locks;
pub mod logging;
pub mod migration;
mod status;
mod transfer;

pub use account::AccountService;
pub use auth::AuthService;
pub use history::HistoryService;
pub use locks::{AccountGuard, AccountLocks};
pub use logging::{EntryPoint, LogEntry, LogEvent, LoggingService};
pub use migration::{MigrationResult, MigrationService};
pub use status::{StatusService, StatusSummary};
pub use transfer::{TransferReceipt, TransferService};
