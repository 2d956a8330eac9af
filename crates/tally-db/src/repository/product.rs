//! # Product Repository
//!
//! SQLite operations for products.
//!
//! ## Key Operations
//! - Insert with a unique barcode
//! - Lookups by ID, single and batched (the pricing catalog)
//! - Price replacement

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{FromRow, QueryBuilder, Sqlite, SqlitePool};
use tracing::debug;

use tally_core::{Money, Product};

use crate::error::{DbError, DbResult};
use crate::pool::Database;
use crate::store::ProductStore;

#[derive(Debug, FromRow)]
struct ProductRow {
    id: String,
    name: String,
    unit_price: i64,
    barcode: String,
    created_at: DateTime<Utc>,
}

impl From<ProductRow> for Product {
    fn from(row: ProductRow) -> Self {
        Product {
            id: row.id,
            name: row.name,
            unit_price: Money::from_minor(row.unit_price),
            barcode: row.barcode,
            created_at: row.created_at,
        }
    }
}

/// Repository for product database operations.
///
/// ## Usage
/// ```rust,ignore
/// let repo = ProductRepository::new(pool);
/// let product = repo.get_by_id("uuid-here").await?;
/// ```
#[derive(Debug, Clone)]
pub struct ProductRepository {
    pool: SqlitePool,
}

impl ProductRepository {
    /// Creates a new ProductRepository.
    pub fn new(pool: SqlitePool) -> Self {
        ProductRepository { pool }
    }

    /// Inserts a new product.
    ///
    /// ## Returns
    /// * `Err(DbError::UniqueViolation)` - barcode already exists
    pub async fn insert(&self, product: &Product) -> DbResult<()> {
        debug!(id = %product.id, barcode = %product.barcode, "Inserting product");

        sqlx::query(
            r#"
            INSERT INTO products (id, name, unit_price, barcode, created_at)
            VALUES (?1, ?2, ?3, ?4, ?5)
            "#,
        )
        .bind(&product.id)
        .bind(&product.name)
        .bind(product.unit_price.minor())
        .bind(&product.barcode)
        .bind(product.created_at)
        .execute(&self.pool)
        .await
        .map_err(|err| match DbError::from(err) {
            DbError::UniqueViolation { field, .. } => DbError::UniqueViolation {
                field,
                value: product.barcode.clone(),
            },
            other => other,
        })?;

        Ok(())
    }

    /// Gets a product by ID.
    pub async fn get_by_id(&self, id: &str) -> DbResult<Option<Product>> {
        let row: Option<ProductRow> = sqlx::query_as(
            r#"
            SELECT id, name, unit_price, barcode, created_at
            FROM products
            WHERE id = ?1
            "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(Product::from))
    }

    /// Gets every product whose ID is in `ids`.
    pub async fn get_many(&self, ids: &[String]) -> DbResult<Vec<Product>> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }

        let mut builder: QueryBuilder<Sqlite> = QueryBuilder::new(
            "SELECT id, name, unit_price, barcode, created_at FROM products WHERE id IN (",
        );
        let mut separated = builder.separated(", ");
        for id in ids {
            separated.push_bind(id);
        }
        separated.push_unseparated(") ORDER BY rowid");

        let rows: Vec<ProductRow> = builder.build_query_as().fetch_all(&self.pool).await?;

        debug!(requested = ids.len(), found = rows.len(), "Loaded products");
        Ok(rows.into_iter().map(Product::from).collect())
    }

    /// Lists every product, oldest first.
    pub async fn list(&self) -> DbResult<Vec<Product>> {
        let rows: Vec<ProductRow> = sqlx::query_as(
            "SELECT id, name, unit_price, barcode, created_at FROM products ORDER BY rowid",
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.into_iter().map(Product::from).collect())
    }

    /// Replaces a product's unit price.
    ///
    /// Receipt lines keep the price they were added at; only new lines see
    /// the new price.
    pub async fn update_price(&self, id: &str, unit_price: Money) -> DbResult<()> {
        debug!(id = %id, unit_price = %unit_price, "Updating product price");

        let result = sqlx::query("UPDATE products SET unit_price = ?2 WHERE id = ?1")
            .bind(id)
            .bind(unit_price.minor())
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("Product", id));
        }

        Ok(())
    }

    /// Counts products (for diagnostics and the seed tool).
    pub async fn count(&self) -> DbResult<i64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM products")
            .fetch_one(&self.pool)
            .await?;

        Ok(count)
    }
}

#[async_trait]
impl ProductStore for Database {
    async fn insert_product(&self, product: &Product) -> DbResult<()> {
        self.products().insert(product).await
    }

    async fn get_product(&self, id: &str) -> DbResult<Option<Product>> {
        self.products().get_by_id(id).await
    }

    async fn get_products(&self, ids: &[String]) -> DbResult<Vec<Product>> {
        self.products().get_many(ids).await
    }

    async fn list_products(&self) -> DbResult<Vec<Product>> {
        self.products().list().await
    }

    async fn update_product_price(&self, id: &str, unit_price: Money) -> DbResult<()> {
        self.products().update_price(id, unit_price).await
    }

    async fn count_products(&self) -> DbResult<i64> {
        self.products().count().await
    }
}
