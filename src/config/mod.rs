//! Harness configuration

mod settings;

pub use settings::{DEFAULT_DB_VERSION, HarnessSettings, ToolProfile};
