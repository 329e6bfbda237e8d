//! Channel adapters.
//!
//! Each adapter implements the [`crate::core::Notifier`] capability and owns
//! nothing beyond its transport details and required render format. Adapters
//! are assembled once at startup from configuration and held behind
//! `Arc<dyn Notifier>` for the life of the process.

pub mod console;
pub mod email;
pub mod slack;
pub mod telegram;

pub use console::ConsoleNotifier;
pub use email::EmailNotifier;
pub use slack::SlackNotifier;
pub use telegram::TelegramNotifier;
