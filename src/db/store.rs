//! Local store: holdings CRUD and the catalog singletons.
//!
//! Every method is a single statement or a single transaction; SQLite linearizes
//! concurrent callers, so no extra locking happens here.

use serde::{de::DeserializeOwned, Serialize};
use sqlx::{Row, SqlitePool};

use crate::errors::AppError;
use crate::models::{Catalog, CatalogMeta, Holding};

/// Key of the stored catalog snapshot.
pub const KEY_CATALOG: &str = "catalog";
/// Key of the catalog change-detection metadata.
pub const KEY_CATALOG_META: &str = "catalog_meta";

/// Persistent store over the `holdings` and `kv` collections.
#[derive(Clone)]
pub struct LocalStore {
    pool: SqlitePool,
}

impl LocalStore {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    // ==================== HOLDING OPERATIONS ====================

    /// List all holdings. Order is unspecified; callers sort as needed.
    pub async fn list_holdings(&self) -> Result<Vec<Holding>, AppError> {
        let rows = sqlx::query(
            "SELECT id, company_id, company_name, voucher_type, expiry, amount, count, shares, note, created_at, updated_at FROM holdings",
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.iter().map(holding_from_row).collect())
    }

    /// Get a holding by ID.
    pub async fn get_holding(&self, id: &str) -> Result<Option<Holding>, AppError> {
        let row = sqlx::query(
            "SELECT id, company_id, company_name, voucher_type, expiry, amount, count, shares, note, created_at, updated_at FROM holdings WHERE id = ?",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.as_ref().map(holding_from_row))
    }

    /// Insert or replace a holding by ID. No validation happens here.
    pub async fn put_holding(&self, holding: &Holding) -> Result<(), AppError> {
        sqlx::query(
            r#"INSERT INTO holdings (
                id, company_id, company_name, voucher_type, expiry,
                amount, count, shares, note, created_at, updated_at
            ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            ON CONFLICT(id) DO UPDATE SET
                company_id = excluded.company_id,
                company_name = excluded.company_name,
                voucher_type = excluded.voucher_type,
                expiry = excluded.expiry,
                amount = excluded.amount,
                count = excluded.count,
                shares = excluded.shares,
                note = excluded.note,
                created_at = excluded.created_at,
                updated_at = excluded.updated_at"#,
        )
        .bind(&holding.id)
        .bind(&holding.company_id)
        .bind(&holding.company_name)
        .bind(&holding.voucher_type)
        .bind(&holding.expiry)
        .bind(holding.amount)
        .bind(holding.count)
        .bind(holding.shares)
        .bind(&holding.note)
        .bind(holding.created_at)
        .bind(holding.updated_at)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    /// Delete a holding. Deleting a missing ID is a no-op.
    pub async fn delete_holding(&self, id: &str) -> Result<(), AppError> {
        let result = sqlx::query("DELETE FROM holdings WHERE id = ?")
            .bind(id)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            tracing::debug!("Delete of unknown holding {} ignored", id);
        }
        Ok(())
    }

    // ==================== CATALOG OPERATIONS ====================

    /// Get the last stored catalog snapshot.
    pub async fn get_catalog(&self) -> Result<Option<Catalog>, AppError> {
        self.kv_get(KEY_CATALOG).await
    }

    /// Replace the stored catalog wholesale.
    pub async fn set_catalog(&self, catalog: &Catalog) -> Result<(), AppError> {
        self.kv_set(KEY_CATALOG, catalog).await
    }

    /// Get the catalog sync metadata.
    pub async fn get_catalog_meta(&self) -> Result<Option<CatalogMeta>, AppError> {
        self.kv_get(KEY_CATALOG_META).await
    }

    /// Replace the catalog sync metadata.
    pub async fn set_catalog_meta(&self, meta: &CatalogMeta) -> Result<(), AppError> {
        self.kv_set(KEY_CATALOG_META, meta).await
    }

    /// Empty both collections in one transaction.
    pub async fn clear_all(&self) -> Result<(), AppError> {
        let mut tx = self.pool.begin().await?;

        sqlx::query("DELETE FROM holdings").execute(&mut *tx).await?;
        sqlx::query("DELETE FROM kv").execute(&mut *tx).await?;

        tx.commit().await?;

        tracing::info!("Local store cleared");
        Ok(())
    }

    // ==================== KV HELPERS ====================

    async fn kv_get<T: DeserializeOwned>(&self, key: &str) -> Result<Option<T>, AppError> {
        let row = sqlx::query("SELECT value FROM kv WHERE key = ?")
            .bind(key)
            .fetch_optional(&self.pool)
            .await?;

        let Some(row) = row else {
            return Ok(None);
        };

        let text: String = row.get("value");
        serde_json::from_str(&text).map(Some).map_err(|e| {
            tracing::error!("Stored value for {} is unreadable: {:?}", key, e);
            AppError::StorageUnavailable(format!("Stored value for {} is unreadable: {}", key, e))
        })
    }

    async fn kv_set<T: Serialize>(&self, key: &str, value: &T) -> Result<(), AppError> {
        let text = serde_json::to_string(value)
            .map_err(|e| AppError::Internal(format!("Failed to encode {}: {}", key, e)))?;

        sqlx::query(
            "INSERT INTO kv (key, value) VALUES (?, ?) ON CONFLICT(key) DO UPDATE SET value = excluded.value",
        )
        .bind(key)
        .bind(&text)
        .execute(&self.pool)
        .await?;

        Ok(())
    }
}

// Helper functions for row conversion

fn holding_from_row(row: &sqlx::sqlite::SqliteRow) -> Holding {
    Holding {
        id: row.get("id"),
        company_id: row.get("company_id"),
        company_name: row.get("company_name"),
        voucher_type: row.get("voucher_type"),
        expiry: row.get("expiry"),
        amount: row.get("amount"),
        count: row.get("count"),
        shares: row.get("shares"),
        note: row.get("note"),
        created_at: row.get("created_at"),
        updated_at: row.get("updated_at"),
    }
}
