//! Alert sink operations for the repository.

use crate::domain::{AlertCandidate, AlertType, ProductId, Severity, TimeMs};
use sqlx::sqlite::SqliteRow;
use sqlx::Row;

use super::{parse_enum, AlertRecord, Repository};

fn alert_from_row(row: &SqliteRow) -> Result<AlertRecord, sqlx::Error> {
    let metadata: String = row.get("metadata_json");
    Ok(AlertRecord {
        id: row.get("id"),
        product_id: ProductId::new(row.get::<String, _>("product_id")),
        alert_type: parse_enum::<AlertType>("alert_type", &row.get::<String, _>("alert_type"))?,
        severity: parse_enum::<Severity>("severity", &row.get::<String, _>("severity"))?,
        message: row.get("message"),
        metadata: serde_json::from_str(&metadata)
            .map_err(|e| sqlx::Error::Decode(Box::new(e)))?,
        read: row.get::<i64, _>("is_read") != 0,
        created_at: TimeMs::new(row.get("created_at")),
    })
}

impl Repository {
    /// Persist an alert candidate as unread. Returns the alert id.
    pub async fn record_alert(
        &self,
        product_id: &ProductId,
        candidate: &AlertCandidate,
        created_at: TimeMs,
    ) -> Result<i64, sqlx::Error> {
        let metadata = serde_json::Value::Object(
            candidate
                .metadata
                .iter()
                .map(|(k, v)| (k.clone(), v.clone()))
                .collect(),
        )
        .to_string();
        let result = sqlx::query(
            r#"
            INSERT INTO alerts (product_id, alert_type, severity, message, metadata_json, is_read, created_at)
            VALUES (?, ?, ?, ?, ?, 0, ?)
            "#,
        )
        .bind(product_id.as_str())
        .bind(candidate.alert_type.as_str())
        .bind(candidate.severity.as_str())
        .bind(&candidate.message)
        .bind(metadata)
        .bind(created_at.as_ms())
        .execute(&self.pool)
        .await?;

        Ok(result.last_insert_rowid())
    }

    /// Newest alerts first.
    pub async fn list_alerts(
        &self,
        unread_only: bool,
        limit: i64,
    ) -> Result<Vec<AlertRecord>, sqlx::Error> {
        let rows = sqlx::query(
            r#"
            SELECT id, product_id, alert_type, severity, message, metadata_json, is_read, created_at
            FROM alerts
            WHERE (? = 0 OR is_read = 0)
            ORDER BY created_at DESC, id DESC
            LIMIT ?
            "#,
        )
        .bind(unread_only as i64)
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;

        rows.iter().map(alert_from_row).collect()
    }

    /// Returns false when no alert has this id. Marking twice is harmless.
    pub async fn mark_alert_read(&self, alert_id: i64) -> Result<bool, sqlx::Error> {
        let result = sqlx::query("UPDATE alerts SET is_read = 1 WHERE id = ?")
            .bind(alert_id)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }
}

#[cfg(test)]
mod tests {
    use super::super::test_support::temp_repo;
    use super::*;
    use std::collections::BTreeMap;

    fn candidate(alert_type: AlertType, severity: Severity) -> AlertCandidate {
        let mut metadata = BTreeMap::new();
        metadata.insert("ourPrice".to_string(), serde_json::json!(150.0));
        AlertCandidate {
            alert_type,
            severity,
            message: format!("{} fired", alert_type),
            metadata,
        }
    }

    #[tokio::test]
    async fn test_record_list_and_mark_read() {
        let (_dir, repo) = temp_repo().await;
        let id = ProductId::new("SKU-1");
        let first = repo
            .record_alert(&id, &candidate(AlertType::LostBuybox, Severity::Warn), TimeMs::new(1))
            .await
            .unwrap();
        let second = repo
            .record_alert(&id, &candidate(AlertType::PriceWar, Severity::Critical), TimeMs::new(2))
            .await
            .unwrap();

        let all = repo.list_alerts(false, 50).await.unwrap();
        assert_eq!(all.iter().map(|a| a.id).collect::<Vec<_>>(), vec![second, first]);
        assert_eq!(all[0].alert_type, AlertType::PriceWar);
        assert_eq!(all[0].metadata["ourPrice"], serde_json::json!(150.0));
        assert!(!all[0].read);

        assert!(repo.mark_alert_read(first).await.unwrap());
        assert!(repo.mark_alert_read(first).await.unwrap());
        assert!(!repo.mark_alert_read(9_999).await.unwrap());

        let unread = repo.list_alerts(true, 50).await.unwrap();
        assert_eq!(unread.len(), 1);
        assert_eq!(unread[0].id, second);
        assert_eq!(repo.list_alerts(false, 50).await.unwrap().len(), 2);
    }
}
