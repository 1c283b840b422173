//! Composition root: builds adapters and services from configuration.

use std::sync::Arc;

use tracing::info;

use crate::adapter::outbound::memory::MemoryStream;
use crate::adapter::outbound::sqlite::database::connection::{create_pool, run_migrations, DbPool};
use crate::adapter::outbound::sqlite::{SqliteMetricStore, SqliteMonitoringSource, SqliteResultsStore};
use crate::adapter::outbound::websocket::WsConnector;
use crate::application::connection::{ConnectionManager, ConnectionOptions};
use crate::application::{Aggregator, MetricPublisher, RetentionSweeper};
use crate::error::Result;
use crate::infrastructure::config::settings::Config;
use crate::port::outbound::store::MetricStore;
use crate::port::outbound::stream::MetricStream;

/// Storage-side services sharing one pool and one stream.
pub struct Services {
    pub pool: DbPool,
    pub stream: Arc<MemoryStream>,
    pub publisher: MetricPublisher,
    pub aggregator: Aggregator,
    pub sweeper: RetentionSweeper,
}

/// Open the database, apply migrations, and wire the metric services.
///
/// # Errors
/// Returns an error if the pool cannot be created or migrations fail.
pub fn build_services(config: &Config) -> Result<Services> {
    let pool = create_pool(&config.database.url, config.database.pool_size)?;
    run_migrations(&pool)?;
    info!(database = %config.database.url, "Database ready");

    let stream = Arc::new(MemoryStream::new(
        config.stream.max_len,
        config.stream.trim_slack,
    ));
    let store: Arc<dyn MetricStore> = Arc::new(SqliteMetricStore::new(pool.clone()));
    let stream_port: Arc<dyn MetricStream> = stream.clone();

    Ok(Services {
        publisher: MetricPublisher::new(Arc::clone(&stream_port), Arc::clone(&store)),
        aggregator: Aggregator::new(
            Arc::clone(&store),
            stream_port,
            Arc::new(SqliteMonitoringSource::new(pool.clone())),
        ),
        sweeper: RetentionSweeper::new(store, Arc::new(SqliteResultsStore::new(pool.clone()))),
        stream,
        pool,
    })
}

/// Spawn a connection manager over WebSocket using `[connection]`.
///
/// # Panics
/// Panics when called outside a Tokio runtime.
#[must_use]
pub fn build_connection(config: &Config) -> ConnectionManager {
    ConnectionManager::new(
        Arc::new(WsConnector::new()),
        ConnectionOptions::from(&config.connection),
    )
}
