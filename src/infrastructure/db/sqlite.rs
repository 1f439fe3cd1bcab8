use crate::domain::error::{AppError, Result};
use crate::domain::product::{CleanRow, Product, RateTable};
use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use sqlx::{
    sqlite::{SqliteConnectOptions, SqlitePoolOptions},
    Pool, QueryBuilder, Sqlite,
};
use std::str::FromStr;

use super::ProductSink;

pub struct SqliteRepository {
    pool: Pool<Sqlite>,
}

impl SqliteRepository {
    pub async fn init(database_url: &str, max_connections: u32) -> Result<Self> {
        let options = SqliteConnectOptions::from_str(database_url)
            .map_err(|e| {
                AppError::DatabaseError(format!("Failed to parse connection string: {}", e))
            })?
            .create_if_missing(true);

        // In-memory databases live only as long as their connection.
        let pool = SqlitePoolOptions::new()
            .max_connections(max_connections.max(1))
            .idle_timeout(None)
            .max_lifetime(None)
            .connect_with(options)
            .await
            .map_err(|e| AppError::DatabaseError(format!("Failed to connect: {}", e)))?;

        sqlx::query(
            "CREATE TABLE IF NOT EXISTS products (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                name VARCHAR(255) NOT NULL,
                price REAL NOT NULL,
                expiration DATE NOT NULL,
                currency_rates TEXT NOT NULL DEFAULT '{}',
                created_at DATETIME NOT NULL DEFAULT CURRENT_TIMESTAMP,
                updated_at DATETIME NOT NULL DEFAULT CURRENT_TIMESTAMP
            )",
        )
        .execute(&pool)
        .await
        .map_err(|e| AppError::DatabaseError(format!("Failed to create table: {}", e)))?;

        Ok(Self { pool })
    }

    /// Writes all rows in one transaction; either every row lands or none.
    pub async fn insert_products(&self, rows: &[CleanRow]) -> Result<u64> {
        if rows.is_empty() {
            return Ok(0);
        }

        let now = Utc::now();
        let encoded = rows
            .iter()
            .map(|row| encode_rates(&row.currency_rates))
            .collect::<Result<Vec<_>>>()?;

        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| AppError::DatabaseError(format!("Failed to open transaction: {}", e)))?;

        let mut builder: QueryBuilder<Sqlite> = QueryBuilder::new(
            "INSERT INTO products (name, price, expiration, currency_rates, created_at, updated_at) ",
        );
        builder.push_values(rows.iter().zip(encoded), |mut b, (row, rates)| {
            b.push_bind(row.name.clone())
                .push_bind(row.price)
                .push_bind(row.expiration)
                .push_bind(rates)
                .push_bind(now)
                .push_bind(now);
        });

        let result = builder
            .build()
            .execute(&mut *tx)
            .await
            .map_err(|e| AppError::DatabaseError(format!("Failed to insert products: {}", e)))?;

        tx.commit()
            .await
            .map_err(|e| AppError::DatabaseError(format!("Failed to commit products: {}", e)))?;

        Ok(result.rows_affected())
    }

    pub async fn create_product(&self, row: &CleanRow) -> Result<Product> {
        let now = Utc::now();
        let rates = encode_rates(&row.currency_rates)?;

        let result = sqlx::query(
            "INSERT INTO products (name, price, expiration, currency_rates, created_at, updated_at)
             VALUES (?, ?, ?, ?, ?, ?)",
        )
        .bind(&row.name)
        .bind(row.price)
        .bind(row.expiration)
        .bind(&rates)
        .bind(now)
        .bind(now)
        .execute(&self.pool)
        .await
        .map_err(|e| AppError::DatabaseError(format!("Failed to save product: {}", e)))?;

        let id = result.last_insert_rowid();
        self.find_product(id)
            .await?
            .ok_or_else(|| AppError::Internal(format!("Product {} vanished after insert", id)))
    }

    pub async fn find_product(&self, id: i64) -> Result<Option<Product>> {
        let entity = sqlx::query_as::<_, ProductEntity>(
            "SELECT id, name, price, expiration, currency_rates, created_at, updated_at
             FROM products WHERE id = ?",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| AppError::DatabaseError(format!("Failed to fetch product: {}", e)))?;

        entity.map(Product::try_from).transpose()
    }

    pub async fn list_products(&self, limit: i64, offset: i64) -> Result<Vec<Product>> {
        sqlx::query_as::<_, ProductEntity>(
            "SELECT id, name, price, expiration, currency_rates, created_at, updated_at
             FROM products ORDER BY id DESC LIMIT ? OFFSET ?",
        )
        .bind(limit)
        .bind(offset)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| AppError::DatabaseError(format!("Failed to list products: {}", e)))?
        .into_iter()
        .map(Product::try_from)
        .collect()
    }

    pub async fn delete_product(&self, id: i64) -> Result<bool> {
        let result = sqlx::query("DELETE FROM products WHERE id = ?")
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(|e| AppError::DatabaseError(format!("Failed to delete product: {}", e)))?;

        Ok(result.rows_affected() > 0)
    }

    pub async fn count_products(&self) -> Result<i64> {
        sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM products")
            .fetch_one(&self.pool)
            .await
            .map_err(|e| AppError::DatabaseError(format!("Failed to count products: {}", e)))
    }
}

#[async_trait]
impl ProductSink for SqliteRepository {
    async fn insert_many(&self, rows: &[CleanRow]) -> Result<()> {
        self.insert_products(rows).await.map(|_| ())
    }
}

fn encode_rates(rates: &RateTable) -> Result<String> {
    serde_json::to_string(rates)
        .map_err(|e| AppError::Internal(format!("Failed to encode currency rates: {}", e)))
}

// Internal entity for database mapping
#[derive(sqlx::FromRow)]
struct ProductEntity {
    id: i64,
    name: String,
    price: f64,
    expiration: NaiveDate,
    currency_rates: String,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl TryFrom<ProductEntity> for Product {
    type Error = AppError;

    fn try_from(e: ProductEntity) -> Result<Self> {
        let currency_rates: RateTable = serde_json::from_str(&e.currency_rates).map_err(|err| {
            AppError::DatabaseError(format!(
                "Corrupt currency_rates for product {}: {}",
                e.id, err
            ))
        })?;

        Ok(Self {
            id: e.id,
            name: e.name,
            price: e.price,
            expiration: e.expiration,
            currency_rates,
            created_at: e.created_at,
            updated_at: e.updated_at,
        })
    }
}
