use crate::domain::{Label, PredictionBasis, PredictionRecord, SessionId};
use crate::engine::ModelLog;
use crate::error::{Result, SicboError};
use crate::persistence::PredictionStore;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sqlx::postgres::{PgPool, PgPoolOptions, PgRow};
use sqlx::Row;
use tracing::{debug, info, instrument};

/// PostgreSQL storage adapter
#[derive(Clone)]
pub struct PostgresStore {
    pool: PgPool,
}

impl PostgresStore {
    /// Connect and make sure the schema exists
    pub async fn new(database_url: &str, max_connections: u32) -> Result<Self> {
        let pool = PgPoolOptions::new()
            .max_connections(max_connections)
            .connect(database_url)
            .await?;

        info!("Connected to PostgreSQL");
        let store = Self { pool };
        store.ensure_schema().await?;
        Ok(store)
    }

    /// Create a PostgreSQL store from an existing connection pool
    pub fn from_pool(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Get the connection pool
    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// CREATE TABLE IF NOT EXISTS for predictions and the model log
    pub async fn ensure_schema(&self) -> Result<()> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS predictions (
                session_id BIGINT PRIMARY KEY,
                based_on BIGINT,
                label TEXT NOT NULL,
                numeric_totals INTEGER[] NOT NULL,
                confidence NUMERIC(5, 2) NOT NULL,
                rationale TEXT NOT NULL,
                basis TEXT NOT NULL,
                realized_label TEXT,
                predicted_at TIMESTAMPTZ NOT NULL,
                updated_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
            )
            "#,
        )
        .execute(&self.pool)
        .await?;

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS model_log (
                id SMALLINT PRIMARY KEY,
                log JSONB NOT NULL,
                updated_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
            )
            "#,
        )
        .execute(&self.pool)
        .await?;

        debug!("prediction schema ready");
        Ok(())
    }

    fn row_to_record(row: &PgRow) -> Result<PredictionRecord> {
        let session_id: i64 = row.get("session_id");
        let based_on: Option<i64> = row.get("based_on");
        let label: String = row.get("label");
        let totals: Vec<i32> = row.get("numeric_totals");
        let basis: String = row.get("basis");
        let realized: Option<String> = row.get("realized_label");

        let numeric_totals = <[i32; 3]>::try_from(totals.as_slice()).map_err(|_| {
            SicboError::Internal(format!(
                "session {} has {} stored totals",
                session_id,
                totals.len()
            ))
        })?;

        Ok(PredictionRecord {
            session_id: SessionId(session_id as u64),
            based_on: based_on.map(|s| SessionId(s as u64)),
            label: label.parse::<Label>().map_err(SicboError::Internal)?,
            numeric_totals,
            confidence: row.get::<Decimal, _>("confidence"),
            rationale: row.get("rationale"),
            basis: basis.parse::<PredictionBasis>().map_err(SicboError::Internal)?,
            realized_label: realized
                .map(|l| l.parse::<Label>())
                .transpose()
                .map_err(SicboError::Internal)?,
            timestamp: row.get::<DateTime<Utc>, _>("predicted_at"),
        })
    }
}

// ==================== Predictions ====================

#[async_trait]
impl PredictionStore for PostgresStore {
    #[instrument(skip(self, record), fields(session = %record.session_id))]
    async fn save_prediction(&self, record: &PredictionRecord) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO predictions (
                session_id, based_on, label, numeric_totals, confidence,
                rationale, basis, realized_label, predicted_at
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
            ON CONFLICT (session_id) DO UPDATE SET
                based_on = EXCLUDED.based_on,
                label = EXCLUDED.label,
                numeric_totals = EXCLUDED.numeric_totals,
                confidence = EXCLUDED.confidence,
                rationale = EXCLUDED.rationale,
                basis = EXCLUDED.basis,
                realized_label = COALESCE(EXCLUDED.realized_label, predictions.realized_label),
                predicted_at = EXCLUDED.predicted_at,
                updated_at = NOW()
            "#,
        )
        .bind(record.session_id.value() as i64)
        .bind(record.based_on.map(|s| s.value() as i64))
        .bind(record.label.as_str())
        .bind(record.numeric_totals.to_vec())
        .bind(record.confidence)
        .bind(&record.rationale)
        .bind(record.basis.as_str())
        .bind(record.realized_label.map(|l| l.as_str()))
        .bind(record.timestamp)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn report_outcome(&self, session: SessionId, label: Label) -> Result<bool> {
        let result = sqlx::query(
            r#"
            UPDATE predictions
            SET realized_label = $2, updated_at = NOW()
            WHERE session_id = $1
            "#,
        )
        .bind(session.value() as i64)
        .bind(label.as_str())
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() > 0)
    }

    async fn get_prediction(&self, session: SessionId) -> Result<Option<PredictionRecord>> {
        let row = sqlx::query(
            r#"
            SELECT session_id, based_on, label, numeric_totals, confidence,
                   rationale, basis, realized_label, predicted_at
            FROM predictions WHERE session_id = $1
            "#,
        )
        .bind(session.value() as i64)
        .fetch_optional(&self.pool)
        .await?;

        row.as_ref().map(Self::row_to_record).transpose()
    }

    async fn recent_predictions(&self, limit: usize) -> Result<Vec<PredictionRecord>> {
        let rows = sqlx::query(
            r#"
            SELECT session_id, based_on, label, numeric_totals, confidence,
                   rationale, basis, realized_label, predicted_at
            FROM predictions
            ORDER BY session_id DESC
            LIMIT $1
            "#,
        )
        .bind(limit as i64)
        .fetch_all(&self.pool)
        .await?;

        rows.iter().map(Self::row_to_record).collect()
    }

    // ==================== Model log ====================

    async fn load_model_log(&self) -> Result<ModelLog> {
        let raw: Option<String> =
            sqlx::query_scalar("SELECT log::text FROM model_log WHERE id = 1")
                .fetch_optional(&self.pool)
                .await?;

        match raw {
            Some(json) => Ok(serde_json::from_str(&json)?),
            None => Ok(ModelLog::new()),
        }
    }

    async fn save_model_log(&self, log: &ModelLog) -> Result<()> {
        let json = serde_json::to_string(log)?;
        sqlx::query(
            r#"
            INSERT INTO model_log (id, log) VALUES (1, $1::jsonb)
            ON CONFLICT (id) DO UPDATE SET log = EXCLUDED.log, updated_at = NOW()
            "#,
        )
        .bind(json)
        .execute(&self.pool)
        .await?;

        Ok(())
    }
}
