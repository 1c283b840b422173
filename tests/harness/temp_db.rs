use chrono::{DateTime, Utc};
use diesel::prelude::*;
use pulsewire::adapter::outbound::sqlite::database::model::{
    encode_time, NewAlertRow, NewEndpointRow, NewResultRow,
};
use pulsewire::adapter::outbound::sqlite::database::schema::{alerts, endpoints, monitoring_results};
use pulsewire::adapter::outbound::sqlite::{create_pool, run_migrations, DbPool};
use tempfile::TempDir;

/// Temporary SQLite database with migrations applied.
///
/// A file is used rather than `:memory:` because every pooled connection
/// would otherwise see its own empty database.
pub struct TempDb {
    _dir: TempDir,
    url: String,
    pool: DbPool,
}

impl TempDb {
    pub fn create(name: &str) -> Self {
        let dir = tempfile::tempdir().expect("create temp dir");
        let url = dir
            .path()
            .join(format!("pulsewire-{name}.db"))
            .display()
            .to_string();

        let pool = create_pool(&url, 4).expect("create sqlite pool");
        run_migrations(&pool).expect("run migrations");

        // WAL mode improves concurrent writer behavior in tests.
        {
            let mut conn = pool.get().expect("get sqlite connection");
            diesel::sql_query("PRAGMA journal_mode=WAL")
                .execute(&mut conn)
                .expect("enable WAL mode");
        }

        Self {
            _dir: dir,
            url,
            pool,
        }
    }

    pub fn pool(&self) -> &DbPool {
        &self.pool
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    /// Insert an endpoint and return its id.
    pub fn endpoint(&self, url: &str, active: bool, deleted: bool) -> i64 {
        let mut conn = self.pool.get().expect("connection");
        let now = encode_time(Utc::now());
        diesel::insert_into(endpoints::table)
            .values(NewEndpointRow {
                url: url.to_string(),
                is_active: active,
                created_at: now.clone(),
                deleted_at: deleted.then_some(now),
            })
            .execute(&mut conn)
            .expect("insert endpoint");
        endpoints::table
            .select(endpoints::id)
            .order(endpoints::id.desc())
            .first(&mut conn)
            .expect("endpoint id")
    }

    /// Insert one check result.
    pub fn result(&self, endpoint_id: i64, status: i32, response_ms: i32, at: DateTime<Utc>) {
        let mut conn = self.pool.get().expect("connection");
        diesel::insert_into(monitoring_results::table)
            .values(NewResultRow {
                endpoint_id,
                status_code: status,
                response_time_ms: response_ms,
                created_at: encode_time(at),
            })
            .execute(&mut conn)
            .expect("insert result");
    }

    /// Insert `count` identical successful check results in one transaction.
    pub fn results(&self, endpoint_id: i64, count: usize, at: DateTime<Utc>) {
        let rows: Vec<_> = (0..count)
            .map(|_| NewResultRow {
                endpoint_id,
                status_code: 200,
                response_time_ms: 120,
                created_at: encode_time(at),
            })
            .collect();
        let mut conn = self.pool.get().expect("connection");
        conn.transaction(|conn| {
            for chunk in rows.chunks(200) {
                diesel::insert_into(monitoring_results::table)
                    .values(chunk)
                    .execute(conn)?;
            }
            diesel::QueryResult::Ok(())
        })
        .expect("insert results");
    }

    /// Insert an alert rule, optionally triggered at `triggered`.
    pub fn alert(&self, endpoint_id: i64, triggered: Option<DateTime<Utc>>, deleted: bool) {
        let mut conn = self.pool.get().expect("connection");
        diesel::insert_into(alerts::table)
            .values(NewAlertRow {
                endpoint_id,
                triggered_at: triggered.map(encode_time),
                deleted_at: deleted.then(|| encode_time(Utc::now())),
            })
            .execute(&mut conn)
            .expect("insert alert");
    }

    pub fn result_count(&self) -> i64 {
        let mut conn = self.pool.get().expect("connection");
        monitoring_results::table
            .count()
            .get_result(&mut conn)
            .expect("count results")
    }
}
