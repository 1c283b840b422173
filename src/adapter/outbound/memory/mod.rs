//! In-process adapters.

pub mod stream;

pub use stream::MemoryStream;
