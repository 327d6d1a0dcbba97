//! CLI command implementations

pub mod config;
pub mod inspect;
pub mod list;
pub mod remove;
pub mod verify;

pub use config::execute as config;
pub use inspect::execute as inspect;
pub use list::execute as list;
pub use remove::execute as remove;
pub use verify::execute as verify;
