//! Car repository for PostgreSQL.

use anyhow::Result;
use async_trait::async_trait;
use sqlx::{Pool, Postgres, QueryBuilder};
use uuid::Uuid;

use crate::models::{Car, CarClass, CarDraft};

/// Which cars to list.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CarFilter {
    pub include_inactive: bool,
    pub class: Option<CarClass>,
}

/// Repository for the car fleet.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait CarRepo: Send + Sync {
    /// List cars ordered by brand and model.
    async fn list(&self, filter: CarFilter) -> Result<Vec<Car>>;

    /// Find a car by ID, active or not.
    async fn find_by_id(&self, id: Uuid) -> Result<Option<Car>>;

    /// Find a car that can currently be booked.
    async fn find_active(&self, id: Uuid) -> Result<Option<Car>>;

    async fn create(&self, draft: CarDraft) -> Result<Car>;

    /// Replace all editable fields. Returns None if the car does not exist.
    async fn update(&self, id: Uuid, draft: CarDraft) -> Result<Option<Car>>;

    /// Hard delete (returns true if a car was deleted).
    async fn delete(&self, id: Uuid) -> Result<bool>;
}

/// PostgreSQL implementation of CarRepo.
#[derive(Clone)]
pub struct PgCarRepo {
    pool: Pool<Postgres>,
}

impl PgCarRepo {
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl CarRepo for PgCarRepo {
    async fn list(&self, filter: CarFilter) -> Result<Vec<Car>> {
        let mut query = QueryBuilder::<Postgres>::new("SELECT * FROM cars WHERE TRUE");
        if !filter.include_inactive {
            query.push(" AND is_active");
        }
        if let Some(class) = filter.class {
            query.push(" AND class = ").push_bind(class);
        }
        query.push(" ORDER BY brand, model, year DESC");

        let cars = query.build_query_as::<Car>().fetch_all(&self.pool).await?;
        Ok(cars)
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Option<Car>> {
        let car = sqlx::query_as::<_, Car>("SELECT * FROM cars WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(car)
    }

    async fn find_active(&self, id: Uuid) -> Result<Option<Car>> {
        let car = sqlx::query_as::<_, Car>("SELECT * FROM cars WHERE id = $1 AND is_active")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(car)
    }

    async fn create(&self, draft: CarDraft) -> Result<Car> {
        let car = sqlx::query_as::<_, Car>(
            r#"
            INSERT INTO cars
                (brand, model, year, class, fuel_type, transmission,
                 price_per_day, deposit_amount, features, is_active)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
            RETURNING *
            "#,
        )
        .bind(draft.brand)
        .bind(draft.model)
        .bind(draft.year)
        .bind(draft.class)
        .bind(draft.fuel_type)
        .bind(draft.transmission)
        .bind(draft.price_per_day)
        .bind(draft.deposit_amount)
        .bind(draft.features)
        .bind(draft.is_active)
        .fetch_one(&self.pool)
        .await?;
        Ok(car)
    }

    async fn update(&self, id: Uuid, draft: CarDraft) -> Result<Option<Car>> {
        let car = sqlx::query_as::<_, Car>(
            r#"
            UPDATE cars SET
                brand = $2, model = $3, year = $4, class = $5, fuel_type = $6,
                transmission = $7, price_per_day = $8, deposit_amount = $9,
                features = $10, is_active = $11, updated_at = now()
            WHERE id = $1
            RETURNING *
            "#,
        )
        .bind(id)
        .bind(draft.brand)
        .bind(draft.model)
        .bind(draft.year)
        .bind(draft.class)
        .bind(draft.fuel_type)
        .bind(draft.transmission)
        .bind(draft.price_per_day)
        .bind(draft.deposit_amount)
        .bind(draft.features)
        .bind(draft.is_active)
        .fetch_optional(&self.pool)
        .await?;
        Ok(car)
    }

    async fn delete(&self, id: Uuid) -> Result<bool> {
        let result = sqlx::query("DELETE FROM cars WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }
}
