//! User accounts. Depends on the HTTP route table and the mail outbox.

pub mod config;
pub mod directory;
pub mod module;

pub use config::UserConfig;
pub use directory::{User, UserService, ROUTES};
pub use module::UserServiceFactory;
