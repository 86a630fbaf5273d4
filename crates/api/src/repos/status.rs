//! Database reachability, used by the health endpoint.

use anyhow::Result;
use async_trait::async_trait;
use sqlx::{Pool, Postgres};

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait StatusRepo: Send + Sync {
    /// Round-trip a trivial query.
    async fn ping(&self) -> Result<()>;
}

#[derive(Clone)]
pub struct PgStatusRepo {
    pool: Pool<Postgres>,
}

impl PgStatusRepo {
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl StatusRepo for PgStatusRepo {
    async fn ping(&self) -> Result<()> {
        let one: i32 = sqlx::query_scalar("SELECT 1").fetch_one(&self.pool).await?;
        anyhow::ensure!(one == 1, "unexpected health check result: {one}");
        Ok(())
    }
}
