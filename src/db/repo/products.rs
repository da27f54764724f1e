//! Product catalog operations for the repository.

use crate::domain::{Decimal, Product, ProductId, TimeMs};
use sqlx::sqlite::{SqliteConnection, SqliteRow};
use sqlx::Row;

use super::{opt_canonical, parse_opt_decimal, Repository};

fn product_from_row(row: &SqliteRow) -> Result<Product, sqlx::Error> {
    Ok(Product {
        id: ProductId::new(row.get::<String, _>("id")),
        barcode: row.get("barcode"),
        title: row.get("title"),
        current_price: parse_opt_decimal("current_price", row.get("current_price"))?,
        min_price: parse_opt_decimal("min_price", row.get("min_price"))?,
        auto_pilot: row.get::<i64, _>("auto_pilot") != 0,
    })
}

impl Repository {
    /// Insert or replace a product record.
    ///
    /// # Errors
    /// Returns an error if the upsert fails.
    pub async fn upsert_product(&self, product: &Product, now: TimeMs) -> Result<(), sqlx::Error> {
        sqlx::query(
            r#"
            INSERT INTO products (id, barcode, title, current_price, min_price, auto_pilot, updated_at)
            VALUES (?, ?, ?, ?, ?, ?, ?)
            ON CONFLICT(id) DO UPDATE SET
                barcode = excluded.barcode,
                title = excluded.title,
                current_price = excluded.current_price,
                min_price = excluded.min_price,
                auto_pilot = excluded.auto_pilot,
                updated_at = excluded.updated_at
            "#,
        )
        .bind(product.id.as_str())
        .bind(product.barcode.as_deref())
        .bind(product.title.as_deref())
        .bind(opt_canonical(product.current_price))
        .bind(opt_canonical(product.min_price))
        .bind(product.auto_pilot as i64)
        .bind(now.as_ms())
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    pub async fn get_product(&self, id: &ProductId) -> Result<Option<Product>, sqlx::Error> {
        let row = sqlx::query(
            "SELECT id, barcode, title, current_price, min_price, auto_pilot FROM products WHERE id = ?",
        )
        .bind(id.as_str())
        .fetch_optional(&self.pool)
        .await?;

        row.as_ref().map(product_from_row).transpose()
    }

    /// All products, ordered by id.
    pub async fn list_products(&self) -> Result<Vec<Product>, sqlx::Error> {
        let rows = sqlx::query(
            "SELECT id, barcode, title, current_price, min_price, auto_pilot FROM products ORDER BY id ASC",
        )
        .fetch_all(&self.pool)
        .await?;

        rows.iter().map(product_from_row).collect()
    }

    /// Products flagged for autonomous repricing, ordered by id.
    pub async fn list_auto_pilot_products(&self) -> Result<Vec<Product>, sqlx::Error> {
        let rows = sqlx::query(
            r#"
            SELECT id, barcode, title, current_price, min_price, auto_pilot
            FROM products
            WHERE auto_pilot = 1
            ORDER BY id ASC
            "#,
        )
        .fetch_all(&self.pool)
        .await?;

        rows.iter().map(product_from_row).collect()
    }
}

/// Returns false when the product does not exist.
pub(super) async fn update_current_price_on(
    conn: &mut SqliteConnection,
    id: &ProductId,
    price: Decimal,
    now: TimeMs,
) -> Result<bool, sqlx::Error> {
    let result = sqlx::query("UPDATE products SET current_price = ?, updated_at = ? WHERE id = ?")
        .bind(price.to_canonical_string())
        .bind(now.as_ms())
        .bind(id.as_str())
        .execute(&mut *conn)
        .await?;

    Ok(result.rows_affected() > 0)
}
