use async_trait::async_trait;
use segcode_core::store::Result;
use segcode_core::{CounterRow, Segment, SegmentStore, StorageError};
use sqlx::mysql::MySqlDatabaseError;
use sqlx::{MySqlPool, Row};
use tracing::{debug, info};

const SCHEMA: &str = include_str!("../ddl/mysql/id_segment.sql");

/// MySQL error number for `ER_LOCK_DEADLOCK`.
const ER_LOCK_DEADLOCK: u16 = 1213;
/// MySQL error number for `ER_LOCK_WAIT_TIMEOUT`.
const ER_LOCK_WAIT_TIMEOUT: u16 = 1205;
/// MySQL error number for `ER_DUP_ENTRY`.
const ER_DUP_ENTRY: u16 = 1062;

/// MySQL implementation of the segment store contract.
///
/// Counters live in the `id_segment` table, one row per `biz_type`.
/// Allocation locks the row with `SELECT ... FOR UPDATE` inside a
/// transaction, so concurrent allocators in any process serialize on the
/// row. Row creation relies on the unique key over `biz_type`, which holds
/// at most [`MAX_BUSINESS_KEY_LEN`](segcode_core::MAX_BUSINESS_KEY_LEN)
/// characters.
#[derive(Debug, Clone)]
pub struct MySqlSegmentStore {
    pool: MySqlPool,
}

impl MySqlSegmentStore {
    /// Creates a store from an existing MySQL connection pool.
    pub fn new(pool: MySqlPool) -> Self {
        Self { pool }
    }

    /// Creates a store by opening a new MySQL connection pool.
    pub async fn connect(database_url: &str) -> Result<Self> {
        let pool = MySqlPool::connect(database_url)
            .await
            .map_err(map_sqlx_error)?;
        Ok(Self::new(pool))
    }

    /// Creates the `id_segment` table if it does not exist.
    pub async fn create_schema(&self) -> Result<()> {
        sqlx::query(SCHEMA)
            .execute(&self.pool)
            .await
            .map_err(map_sqlx_error)?;
        Ok(())
    }

    /// Returns a reference to the underlying pool.
    pub fn pool(&self) -> &MySqlPool {
        &self.pool
    }
}

fn mysql_error_number(err: &sqlx::Error) -> Option<u16> {
    err.as_database_error()
        .and_then(|db| db.try_downcast_ref::<MySqlDatabaseError>())
        .map(MySqlDatabaseError::number)
}

fn map_sqlx_error(err: sqlx::Error) -> StorageError {
    let message = err.to_string();

    match mysql_error_number(&err) {
        Some(ER_LOCK_DEADLOCK) => return StorageError::Conflict(message),
        Some(ER_LOCK_WAIT_TIMEOUT) => return StorageError::Timeout(message),
        _ => {}
    }

    match err {
        sqlx::Error::PoolTimedOut => StorageError::Timeout(message),
        sqlx::Error::PoolClosed
        | sqlx::Error::WorkerCrashed
        | sqlx::Error::Io(_)
        | sqlx::Error::Tls(_) => StorageError::Unavailable(message),
        sqlx::Error::ColumnIndexOutOfBounds { .. }
        | sqlx::Error::ColumnNotFound(_)
        | sqlx::Error::ColumnDecode { .. }
        | sqlx::Error::TypeNotFound { .. }
        | sqlx::Error::Decode(_) => StorageError::InvalidData(message),
        _ => StorageError::Query(message),
    }
}

fn row_to_counter(row: &sqlx::mysql::MySqlRow) -> Result<CounterRow> {
    Ok(CounterRow {
        business_key: row.try_get("biz_type").map_err(map_sqlx_error)?,
        current_max: row.try_get("current_max").map_err(map_sqlx_error)?,
        step: row.try_get("step").map_err(map_sqlx_error)?,
    })
}

#[async_trait]
impl SegmentStore for MySqlSegmentStore {
    async fn create_counter_if_absent(&self, row: &CounterRow) -> Result<bool> {
        // A plain INSERT keeps strict-mode errors such as an over-long key;
        // only the unique key violation means the row already exists.
        let result = sqlx::query(
            r#"
            INSERT INTO id_segment (biz_type, current_max, step)
            VALUES (?, ?, ?)
            "#,
        )
        .bind(&row.business_key)
        .bind(row.current_max)
        .bind(row.step)
        .execute(&self.pool)
        .await;

        match result {
            Ok(_) => {
                info!(
                    key = %row.business_key,
                    initial_value = row.current_max,
                    step = row.step,
                    "created counter"
                );
                Ok(true)
            }
            Err(err) if mysql_error_number(&err) == Some(ER_DUP_ENTRY) => Ok(false),
            Err(err) => Err(map_sqlx_error(err)),
        }
    }

    async fn update_step(&self, business_key: &str, step: u64) -> Result<bool> {
        let result = sqlx::query(
            r#"
            UPDATE id_segment
            SET step = ?
            WHERE biz_type = ?
            "#,
        )
        .bind(step)
        .bind(business_key)
        .execute(&self.pool)
        .await
        .map_err(map_sqlx_error)?;

        // MySQL reports zero affected rows when the value is unchanged, so
        // fall back to an existence check before reporting a missing row.
        if result.rows_affected() > 0 {
            return Ok(true);
        }
        Ok(self.get_counter(business_key).await?.is_some())
    }

    async fn allocate_next(&self, business_key: &str) -> Result<Segment> {
        let mut tx = self.pool.begin().await.map_err(map_sqlx_error)?;

        let row = sqlx::query(
            r#"
            SELECT biz_type, current_max, step
            FROM id_segment
            WHERE biz_type = ?
            FOR UPDATE
            "#,
        )
        .bind(business_key)
        .fetch_optional(&mut *tx)
        .await
        .map_err(map_sqlx_error)?;

        let Some(row) = row else {
            return Err(StorageError::CounterMissing(business_key.to_string()));
        };

        let mut counter = row_to_counter(&row)?;
        let segment = counter.advance()?;

        sqlx::query(
            r#"
            UPDATE id_segment
            SET current_max = ?
            WHERE biz_type = ?
            "#,
        )
        .bind(counter.current_max)
        .bind(business_key)
        .execute(&mut *tx)
        .await
        .map_err(map_sqlx_error)?;

        tx.commit().await.map_err(map_sqlx_error)?;

        debug!(
            key = %business_key,
            start = segment.start(),
            end = segment.end(),
            "allocated segment"
        );
        Ok(segment)
    }

    async fn get_counter(&self, business_key: &str) -> Result<Option<CounterRow>> {
        let row = sqlx::query(
            r#"
            SELECT biz_type, current_max, step
            FROM id_segment
            WHERE biz_type = ?
            LIMIT 1
            "#,
        )
        .bind(business_key)
        .fetch_optional(&self.pool)
        .await
        .map_err(map_sqlx_error)?;

        row.as_ref().map(row_to_counter).transpose()
    }
}
