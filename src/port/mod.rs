//! Trait definitions (hexagonal ports). Depend only on domain.
//!
//! ```text
//!                    ┌─────────────────────────┐
//!                    │      Application        │
//!     ┌──────────────┤  publisher, aggregator, ├──────────────┐
//!     │              │  retention, connection  │              │
//!     │              └─────────────────────────┘              │
//!     ▼                         ▼                             ▼
//! ┌─────────┐            ┌─────────────┐              ┌───────────┐
//! │ Stream  │            │   SQLite    │              │ WebSocket │
//! │ Adapter │            │   Adapter   │              │  Adapter  │
//! └─────────┘            └─────────────┘              └───────────┘
//! ```

pub mod outbound;

pub use outbound::monitoring::MonitoringSource;
pub use outbound::results::ResultsStore;
pub use outbound::store::MetricStore;
pub use outbound::stream::MetricStream;
pub use outbound::transport::{Connector, FrameSink, FrameSource, Link};
