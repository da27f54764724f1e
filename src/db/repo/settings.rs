//! Global settings and per-product override operations for the repository.

use crate::domain::{
    AlertThresholds, GlobalSettings, MinProfit, MinProfitType, ProductId, ProductSettings,
    ServiceFee, ServiceFeeType, TimeMs, VatMode,
};
use sqlx::sqlite::SqliteRow;
use sqlx::Row;

use super::{opt_canonical, parse_decimal, parse_enum, parse_opt_decimal, Repository};

const SETTINGS_COLUMNS: &str = "cost_price, fee_rate, service_fee_type, service_fee_value, \
     shipping_cost, handling_cost, vat_rate, vat_mode, min_profit_type, min_profit_value, \
     undercut_step, alert_threshold_absolute, alert_threshold_percent, cooldown_minutes, \
     competitor_drop_pct";

fn global_from_row(row: &SqliteRow) -> Result<GlobalSettings, sqlx::Error> {
    let dec = |column: &str| parse_decimal(column, &row.get::<String, _>(column));
    Ok(GlobalSettings {
        cost_price: dec("cost_price")?,
        fee_rate: dec("fee_rate")?,
        service_fee: ServiceFee {
            fee_type: parse_enum("service_fee_type", &row.get::<String, _>("service_fee_type"))?,
            value: dec("service_fee_value")?,
        },
        shipping_cost: dec("shipping_cost")?,
        handling_cost: dec("handling_cost")?,
        vat_rate: dec("vat_rate")?,
        vat_mode: parse_enum("vat_mode", &row.get::<String, _>("vat_mode"))?,
        min_profit: MinProfit {
            profit_type: parse_enum("min_profit_type", &row.get::<String, _>("min_profit_type"))?,
            value: dec("min_profit_value")?,
        },
        undercut_step: dec("undercut_step")?,
        alert_thresholds: AlertThresholds {
            absolute: dec("alert_threshold_absolute")?,
            percent: dec("alert_threshold_percent")?,
        },
        cooldown_minutes: row.get("cooldown_minutes"),
        competitor_drop_pct: dec("competitor_drop_pct")?,
    })
}

fn product_settings_from_row(row: &SqliteRow) -> Result<ProductSettings, sqlx::Error> {
    let dec = |column: &str| parse_opt_decimal(column, row.get(column));

    let service_fee = match (
        row.get::<Option<String>, _>("service_fee_type"),
        dec("service_fee_value")?,
    ) {
        (Some(fee_type), Some(value)) => Some(ServiceFee {
            fee_type: parse_enum::<ServiceFeeType>("service_fee_type", &fee_type)?,
            value,
        }),
        _ => None,
    };
    let min_profit = match (
        row.get::<Option<String>, _>("min_profit_type"),
        dec("min_profit_value")?,
    ) {
        (Some(profit_type), Some(value)) => Some(MinProfit {
            profit_type: parse_enum::<MinProfitType>("min_profit_type", &profit_type)?,
            value,
        }),
        _ => None,
    };
    let vat_mode = row
        .get::<Option<String>, _>("vat_mode")
        .map(|raw| parse_enum::<VatMode>("vat_mode", &raw))
        .transpose()?;

    Ok(ProductSettings {
        cost_price: dec("cost_price")?,
        fee_rate: dec("fee_rate")?,
        service_fee,
        shipping_cost: dec("shipping_cost")?,
        handling_cost: dec("handling_cost")?,
        vat_rate: dec("vat_rate")?,
        vat_mode,
        min_profit,
        undercut_step: dec("undercut_step")?,
        alert_threshold_absolute: dec("alert_threshold_absolute")?,
        alert_threshold_percent: dec("alert_threshold_percent")?,
        cooldown_minutes: row.get("cooldown_minutes"),
        competitor_drop_pct: dec("competitor_drop_pct")?,
    })
}

impl Repository {
    /// Global settings, or the built-in defaults when none were ever saved.
    pub async fn get_global_settings(&self) -> Result<GlobalSettings, sqlx::Error> {
        let sql = format!("SELECT {} FROM global_settings WHERE id = 1", SETTINGS_COLUMNS);
        let row = sqlx::query(&sql).fetch_optional(&self.pool).await?;
        match row {
            Some(row) => global_from_row(&row),
            None => Ok(GlobalSettings::default()),
        }
    }

    /// Replace the single global settings row. Callers validate first.
    pub async fn put_global_settings(
        &self,
        settings: &GlobalSettings,
        now: TimeMs,
    ) -> Result<(), sqlx::Error> {
        let sql = format!(
            r#"
            INSERT OR REPLACE INTO global_settings (id, {}, updated_at)
            VALUES (1, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#,
            SETTINGS_COLUMNS
        );
        sqlx::query(&sql)
            .bind(settings.cost_price.to_canonical_string())
            .bind(settings.fee_rate.to_canonical_string())
            .bind(settings.service_fee.fee_type.as_str())
            .bind(settings.service_fee.value.to_canonical_string())
            .bind(settings.shipping_cost.to_canonical_string())
            .bind(settings.handling_cost.to_canonical_string())
            .bind(settings.vat_rate.to_canonical_string())
            .bind(settings.vat_mode.as_str())
            .bind(settings.min_profit.profit_type.as_str())
            .bind(settings.min_profit.value.to_canonical_string())
            .bind(settings.undercut_step.to_canonical_string())
            .bind(settings.alert_thresholds.absolute.to_canonical_string())
            .bind(settings.alert_thresholds.percent.to_canonical_string())
            .bind(settings.cooldown_minutes)
            .bind(settings.competitor_drop_pct.to_canonical_string())
            .bind(now.as_ms())
            .execute(&self.pool)
            .await?;

        Ok(())
    }

    pub async fn get_product_settings(
        &self,
        product_id: &ProductId,
    ) -> Result<Option<ProductSettings>, sqlx::Error> {
        let sql = format!(
            "SELECT {} FROM product_settings WHERE product_id = ?",
            SETTINGS_COLUMNS
        );
        let row = sqlx::query(&sql)
            .bind(product_id.as_str())
            .fetch_optional(&self.pool)
            .await?;

        row.as_ref().map(product_settings_from_row).transpose()
    }

    /// Fetch the override record, creating an empty one (inherit everything)
    /// on first access.
    pub async fn get_or_create_product_settings(
        &self,
        product_id: &ProductId,
        now: TimeMs,
    ) -> Result<ProductSettings, sqlx::Error> {
        sqlx::query(
            "INSERT INTO product_settings (product_id, updated_at) VALUES (?, ?) ON CONFLICT(product_id) DO NOTHING",
        )
        .bind(product_id.as_str())
        .bind(now.as_ms())
        .execute(&self.pool)
        .await?;

        Ok(self
            .get_product_settings(product_id)
            .await?
            .unwrap_or_default())
    }

    /// Replace the override record. Callers validate first.
    pub async fn put_product_settings(
        &self,
        product_id: &ProductId,
        settings: &ProductSettings,
        now: TimeMs,
    ) -> Result<(), sqlx::Error> {
        let sql = format!(
            r#"
            INSERT OR REPLACE INTO product_settings (product_id, {}, updated_at)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#,
            SETTINGS_COLUMNS
        );
        sqlx::query(&sql)
            .bind(product_id.as_str())
            .bind(opt_canonical(settings.cost_price))
            .bind(opt_canonical(settings.fee_rate))
            .bind(settings.service_fee.map(|f| f.fee_type.as_str()))
            .bind(opt_canonical(settings.service_fee.map(|f| f.value)))
            .bind(opt_canonical(settings.shipping_cost))
            .bind(opt_canonical(settings.handling_cost))
            .bind(opt_canonical(settings.vat_rate))
            .bind(settings.vat_mode.map(|m| m.as_str()))
            .bind(settings.min_profit.map(|m| m.profit_type.as_str()))
            .bind(opt_canonical(settings.min_profit.map(|m| m.value)))
            .bind(opt_canonical(settings.undercut_step))
            .bind(opt_canonical(settings.alert_threshold_absolute))
            .bind(opt_canonical(settings.alert_threshold_percent))
            .bind(settings.cooldown_minutes)
            .bind(opt_canonical(settings.competitor_drop_pct))
            .bind(now.as_ms())
            .execute(&self.pool)
            .await?;

        Ok(())
    }
}
