//! herald: notification orchestration core for a task-management platform.
//!
//! Turns task lifecycle events (status changes, approaching and overdue
//! deadlines, @-mentions) into deduplicated outbound emails. Events arrive
//! from a Redis queue and from a periodic deadline sweep; a persistent
//! ledger guarantees at-most-once delivery per logical event.

pub mod config;
pub mod consumer;
pub mod delivery;
pub mod directory;
pub mod ledger;
pub mod notify;
pub mod render;
pub mod sweep;

// Re-export commonly used error types
pub use consumer::QueueError;
pub use delivery::DeliveryError;
pub use directory::DirectoryError;
pub use ledger::LedgerError;
pub use notify::NotifyError;
