//! Exchange persistence.

use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::Utc;
use sqlx::SqlitePool;
use tracing::{debug, instrument};

use super::models::{AiExchange, ExchangeQuery, NewAiExchange};

/// Default and largest page size for exchange listings.
const MAX_LIST_LIMIT: i64 = 100;

/// Rows to return for a requested `limit`. SQLite reads a negative LIMIT as
/// unbounded, so out-of-range values are pulled back into `1..=100`.
fn page_size(limit: Option<i64>) -> i64 {
    limit.unwrap_or(MAX_LIST_LIMIT).clamp(1, MAX_LIST_LIMIT)
}

/// Durable storage for chatbot exchanges.
#[async_trait]
pub trait ExchangeStore: Send + Sync {
    /// Store one exchange and return it with its assigned id.
    async fn save_exchange(&self, exchange: NewAiExchange) -> Result<AiExchange>;

    /// List stored exchanges, newest first.
    async fn list_exchanges(&self, query: ExchangeQuery) -> Result<Vec<AiExchange>>;
}

/// SQLite-backed exchange store.
#[derive(Debug, Clone)]
pub struct ExchangeRepository {
    pool: SqlitePool,
}

impl ExchangeRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Get an exchange by ID.
    #[instrument(skip(self))]
    pub async fn get(&self, id: i64) -> Result<Option<AiExchange>> {
        sqlx::query_as::<_, AiExchange>(
            r#"
            SELECT id, asked_by, role, category, content, response, model_name, provider, created_at
            FROM ai_exchanges
            WHERE id = ?
            "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .context("fetching exchange")
    }
}

#[async_trait]
impl ExchangeStore for ExchangeRepository {
    #[instrument(skip_all)]
    async fn save_exchange(&self, exchange: NewAiExchange) -> Result<AiExchange> {
        let created_at = Utc::now().to_rfc3339();

        let id = sqlx::query_scalar::<_, i64>(
            r#"
            INSERT INTO ai_exchanges
                (asked_by, role, category, content, response, model_name, provider, created_at)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?)
            RETURNING id
            "#,
        )
        .bind(exchange.asked_by)
        .bind(&exchange.role)
        .bind(exchange.category.as_str())
        .bind(&exchange.content)
        .bind(&exchange.response)
        .bind(&exchange.model_name)
        .bind(&exchange.provider)
        .bind(&created_at)
        .fetch_one(&self.pool)
        .await
        .context("inserting exchange")?;

        debug!(id, asked_by = exchange.asked_by, "stored exchange");

        self.get(id)
            .await?
            .ok_or_else(|| anyhow::anyhow!("Exchange not found after creation"))
    }

    #[instrument(skip(self))]
    async fn list_exchanges(&self, query: ExchangeQuery) -> Result<Vec<AiExchange>> {
        let mut qb: sqlx::QueryBuilder<sqlx::Sqlite> = sqlx::QueryBuilder::new(
            "SELECT id, asked_by, role, category, content, response, model_name, provider, created_at \
             FROM ai_exchanges WHERE 1 = 1",
        );

        if let Some(category) = query.category {
            qb.push(" AND category = ");
            qb.push_bind(category.as_str());
        }
        if let Some(asked_by) = query.asked_by {
            qb.push(" AND asked_by = ");
            qb.push_bind(asked_by);
        }
        qb.push(" ORDER BY id DESC LIMIT ");
        qb.push_bind(page_size(query.limit));

        qb.build_query_as::<AiExchange>()
            .fetch_all(&self.pool)
            .await
            .context("listing exchanges")
    }
}
