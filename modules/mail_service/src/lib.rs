//! Outgoing mail. Messages are queued in an in-memory outbox.

pub mod config;
pub mod module;
pub mod outbox;

pub use config::MailConfig;
pub use module::MailServiceFactory;
pub use outbox::{Mail, MailService};
