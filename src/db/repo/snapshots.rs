//! Price snapshot operations for the repository.

use crate::domain::{BuyboxStatus, PriceSnapshot, ProductId, TimeMs};
use sqlx::sqlite::{SqliteConnection, SqliteRow};
use sqlx::Row;

use super::{opt_canonical, parse_enum, parse_opt_decimal, Repository};

fn snapshot_from_row(row: &SqliteRow) -> Result<PriceSnapshot, sqlx::Error> {
    Ok(PriceSnapshot {
        product_id: ProductId::new(row.get::<String, _>("product_id")),
        checked_at: TimeMs::new(row.get("checked_at")),
        our_price: parse_opt_decimal("our_price", row.get("our_price"))?,
        competitor_min_price: parse_opt_decimal(
            "competitor_min_price",
            row.get("competitor_min_price"),
        )?,
        buybox_status: parse_enum::<BuyboxStatus>(
            "buybox_status",
            &row.get::<String, _>("buybox_status"),
        )?,
    })
}

pub(super) async fn insert_snapshot_on(
    conn: &mut SqliteConnection,
    snapshot: &PriceSnapshot,
) -> Result<i64, sqlx::Error> {
    let result = sqlx::query(
        r#"
        INSERT INTO price_snapshots (product_id, checked_at, our_price, competitor_min_price, buybox_status)
        VALUES (?, ?, ?, ?, ?)
        "#,
    )
    .bind(snapshot.product_id.as_str())
    .bind(snapshot.checked_at.as_ms())
    .bind(opt_canonical(snapshot.our_price))
    .bind(opt_canonical(snapshot.competitor_min_price))
    .bind(snapshot.buybox_status.as_str())
    .execute(&mut *conn)
    .await?;

    Ok(result.last_insert_rowid())
}

impl Repository {
    /// Append a snapshot. Snapshots are never updated.
    pub async fn insert_snapshot(&self, snapshot: &PriceSnapshot) -> Result<i64, sqlx::Error> {
        let mut conn = self.pool.acquire().await?;
        insert_snapshot_on(&mut conn, snapshot).await
    }

    /// Newest snapshots first; ties on `checked_at` resolve by insertion order.
    pub async fn recent_snapshots(
        &self,
        product_id: &ProductId,
        limit: i64,
    ) -> Result<Vec<PriceSnapshot>, sqlx::Error> {
        let rows = sqlx::query(
            r#"
            SELECT product_id, checked_at, our_price, competitor_min_price, buybox_status
            FROM price_snapshots
            WHERE product_id = ?
            ORDER BY checked_at DESC, id DESC
            LIMIT ?
            "#,
        )
        .bind(product_id.as_str())
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;

        rows.iter().map(snapshot_from_row).collect()
    }

    pub async fn latest_snapshot(
        &self,
        product_id: &ProductId,
    ) -> Result<Option<PriceSnapshot>, sqlx::Error> {
        Ok(self.recent_snapshots(product_id, 1).await?.into_iter().next())
    }

    /// The snapshot just before the latest one.
    pub async fn previous_snapshot(
        &self,
        product_id: &ProductId,
    ) -> Result<Option<PriceSnapshot>, sqlx::Error> {
        Ok(self.recent_snapshots(product_id, 2).await?.into_iter().nth(1))
    }
}
