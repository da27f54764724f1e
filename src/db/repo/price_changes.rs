//! Append-only price change log for the repository.

use crate::domain::{ChangeMethod, Decimal, PriceChange, PriceSnapshot, ProductId, TimeMs};
use sqlx::sqlite::{SqliteConnection, SqliteRow};
use sqlx::Row;
use tracing::warn;

use super::products::update_current_price_on;
use super::snapshots::insert_snapshot_on;
use super::{opt_canonical, parse_decimal, parse_enum, parse_opt_decimal, Repository};

fn change_from_row(row: &SqliteRow) -> Result<PriceChange, sqlx::Error> {
    let raw: String = row.get("raw_response");
    let raw_response = serde_json::from_str(&raw).unwrap_or_else(|e| {
        warn!(error = %e, "Stored raw response is not JSON, keeping it as a string");
        serde_json::Value::String(raw)
    });
    Ok(PriceChange {
        id: row.get("id"),
        product_id: ProductId::new(row.get::<String, _>("product_id")),
        old_price: parse_opt_decimal("old_price", row.get("old_price"))?,
        new_price: parse_decimal("new_price", &row.get::<String, _>("new_price"))?,
        method: parse_enum::<ChangeMethod>("method", &row.get::<String, _>("method"))?,
        raw_response,
        changed_at: TimeMs::new(row.get("changed_at")),
    })
}

async fn insert_price_change_on(
    conn: &mut SqliteConnection,
    product_id: &ProductId,
    old_price: Option<Decimal>,
    new_price: Decimal,
    method: ChangeMethod,
    raw_response: &serde_json::Value,
    changed_at: TimeMs,
) -> Result<PriceChange, sqlx::Error> {
    let is_downward = old_price.map(|old| new_price < old).unwrap_or(false);
    let result = sqlx::query(
        r#"
        INSERT INTO price_changes (product_id, old_price, new_price, method, is_downward, raw_response, changed_at)
        VALUES (?, ?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(product_id.as_str())
    .bind(opt_canonical(old_price))
    .bind(new_price.to_canonical_string())
    .bind(method.as_str())
    .bind(is_downward as i64)
    .bind(raw_response.to_string())
    .bind(changed_at.as_ms())
    .execute(&mut *conn)
    .await?;

    Ok(PriceChange {
        id: result.last_insert_rowid(),
        product_id: product_id.clone(),
        old_price,
        new_price,
        method,
        raw_response: raw_response.clone(),
        changed_at,
    })
}

impl Repository {
    /// Append a price change entry. Entries are never mutated.
    pub async fn append_price_change(
        &self,
        product_id: &ProductId,
        old_price: Option<Decimal>,
        new_price: Decimal,
        method: ChangeMethod,
        raw_response: &serde_json::Value,
        changed_at: TimeMs,
    ) -> Result<PriceChange, sqlx::Error> {
        let mut conn = self.pool.acquire().await?;
        insert_price_change_on(
            &mut conn,
            product_id,
            old_price,
            new_price,
            method,
            raw_response,
            changed_at,
        )
        .await
    }

    /// Record a price the marketplace already accepted: change log entry,
    /// catalog price and refreshed snapshot commit together or not at all.
    ///
    /// The change is stamped with `snapshot.checked_at`.
    pub async fn record_applied_price(
        &self,
        old_price: Option<Decimal>,
        new_price: Decimal,
        method: ChangeMethod,
        raw_response: &serde_json::Value,
        snapshot: &PriceSnapshot,
    ) -> Result<PriceChange, sqlx::Error> {
        let product_id = &snapshot.product_id;
        let now = snapshot.checked_at;

        let mut tx = self.pool.begin().await?;
        let change = insert_price_change_on(
            &mut tx,
            product_id,
            old_price,
            new_price,
            method,
            raw_response,
            now,
        )
        .await?;
        update_current_price_on(&mut tx, product_id, new_price, now).await?;
        insert_snapshot_on(&mut tx, snapshot).await?;
        tx.commit().await?;

        Ok(change)
    }

    /// Most recent changes first.
    pub async fn list_price_changes(
        &self,
        product_id: &ProductId,
        limit: i64,
    ) -> Result<Vec<PriceChange>, sqlx::Error> {
        let rows = sqlx::query(
            r#"
            SELECT id, product_id, old_price, new_price, method, raw_response, changed_at
            FROM price_changes
            WHERE product_id = ?
            ORDER BY changed_at DESC, id DESC
            LIMIT ?
            "#,
        )
        .bind(product_id.as_str())
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;

        rows.iter().map(change_from_row).collect()
    }

    /// Timestamp of the latest change that lowered the price, any method.
    pub async fn last_downward_change_at(
        &self,
        product_id: &ProductId,
    ) -> Result<Option<TimeMs>, sqlx::Error> {
        let row = sqlx::query(
            r#"
            SELECT MAX(changed_at) AS last_at
            FROM price_changes
            WHERE product_id = ? AND is_downward = 1
            "#,
        )
        .bind(product_id.as_str())
        .fetch_one(&self.pool)
        .await?;

        Ok(row.get::<Option<i64>, _>("last_at").map(TimeMs::new))
    }
}

#[cfg(test)]
mod tests {
    use super::super::test_support::temp_repo;
    use super::*;
    use serde_json::json;

    fn d(s: &str) -> Decimal {
        Decimal::from_str_canonical(s).unwrap()
    }

    #[tokio::test]
    async fn test_append_and_list_newest_first() {
        let (_dir, repo) = temp_repo().await;
        let id = ProductId::new("SKU-1");
        repo.append_price_change(
            &id,
            Some(d("200")),
            d("199.5"),
            ChangeMethod::AutoPilot,
            &json!({"batchRequestId": "b1"}),
            TimeMs::new(1_000),
        )
        .await
        .unwrap();
        let second = repo
            .append_price_change(
                &id,
                Some(d("199.5")),
                d("210"),
                ChangeMethod::Manual,
                &json!({"batchRequestId": "b2"}),
                TimeMs::new(2_000),
            )
            .await
            .unwrap();

        let changes = repo.list_price_changes(&id, 10).await.unwrap();
        assert_eq!(changes.len(), 2);
        assert_eq!(changes[0], second);
        assert_eq!(changes[1].method, ChangeMethod::AutoPilot);
        assert_eq!(changes[1].raw_response["batchRequestId"], "b1");
    }

    #[tokio::test]
    async fn test_last_downward_change_ignores_increases_and_unknown_old() {
        let (_dir, repo) = temp_repo().await;
        let id = ProductId::new("SKU-1");
        assert!(repo.last_downward_change_at(&id).await.unwrap().is_none());

        let raw = json!({});
        repo.append_price_change(&id, Some(d("200")), d("190"), ChangeMethod::Manual, &raw, TimeMs::new(1_000))
            .await
            .unwrap();
        repo.append_price_change(&id, Some(d("190")), d("195"), ChangeMethod::AutoPilot, &raw, TimeMs::new(2_000))
            .await
            .unwrap();
        repo.append_price_change(&id, None, d("100"), ChangeMethod::Manual, &raw, TimeMs::new(3_000))
            .await
            .unwrap();

        assert_eq!(
            repo.last_downward_change_at(&id).await.unwrap(),
            Some(TimeMs::new(1_000))
        );
    }

    fn product() -> crate::domain::Product {
        crate::domain::Product {
            id: ProductId::new("SKU-1"),
            barcode: Some("BC-1".to_string()),
            title: None,
            current_price: Some(d("200")),
            min_price: None,
            auto_pilot: true,
        }
    }

    fn snapshot_at(price: &str, ms: i64) -> PriceSnapshot {
        PriceSnapshot {
            product_id: ProductId::new("SKU-1"),
            checked_at: TimeMs::new(ms),
            our_price: Some(d(price)),
            competitor_min_price: Some(d("180")),
            buybox_status: crate::domain::BuyboxStatus::Unknown,
        }
    }

    #[tokio::test]
    async fn test_record_applied_price_writes_everything() {
        let (_dir, repo) = temp_repo().await;
        let product = product();
        repo.upsert_product(&product, TimeMs::new(0)).await.unwrap();

        let snapshot = snapshot_at("179.5", 5_000);
        let change = repo
            .record_applied_price(
                product.current_price,
                d("179.5"),
                ChangeMethod::AutoPilot,
                &json!({"batchRequestId": "b1"}),
                &snapshot,
            )
            .await
            .unwrap();

        assert_eq!(change.changed_at, TimeMs::new(5_000));
        assert_eq!(repo.list_price_changes(&product.id, 10).await.unwrap(), vec![change]);
        assert_eq!(
            repo.get_product(&product.id).await.unwrap().unwrap().current_price,
            Some(d("179.5"))
        );
        assert_eq!(repo.latest_snapshot(&product.id).await.unwrap(), Some(snapshot));
        assert_eq!(
            repo.last_downward_change_at(&product.id).await.unwrap(),
            Some(TimeMs::new(5_000))
        );
    }

    #[tokio::test]
    async fn test_record_applied_price_rolls_back_on_failure() {
        let (_dir, repo) = temp_repo().await;
        let product = product();
        repo.upsert_product(&product, TimeMs::new(0)).await.unwrap();

        // The last statement of the transaction fails.
        sqlx::query("DROP TABLE price_snapshots")
            .execute(repo.pool())
            .await
            .unwrap();

        let result = repo
            .record_applied_price(
                product.current_price,
                d("179.5"),
                ChangeMethod::Manual,
                &json!({"batchRequestId": "b1"}),
                &snapshot_at("179.5", 5_000),
            )
            .await;
        assert!(result.is_err());

        assert!(repo.list_price_changes(&product.id, 10).await.unwrap().is_empty());
        assert_eq!(
            repo.get_product(&product.id).await.unwrap().unwrap().current_price,
            Some(d("200"))
        );
    }
}
