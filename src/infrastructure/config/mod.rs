//! Infrastructure configuration modules.

pub mod connection;
pub mod database;
pub mod logging;
pub mod retention;
pub mod settings;
pub mod stream;

pub use settings::Config;
