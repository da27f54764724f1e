use super::AppState;
use crate::domain::ProductId;
use crate::error::AppError;
use crate::orchestration::{BatchResponse, ProductSuggestion, RepriceOutcome};
use axum::extract::State;
use axum::Json;
use serde::Deserialize;
use std::collections::BTreeSet;

/// Either a single product or a list of products.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub enum ProductSelector {
    Many {
        #[serde(rename = "productIds")]
        product_ids: Vec<ProductId>,
    },
    One {
        #[serde(rename = "productId")]
        product_id: ProductId,
    },
}

impl ProductSelector {
    /// Deduplicated ids in ascending order.
    pub fn normalize(self) -> Result<Vec<ProductId>, AppError> {
        let ids: BTreeSet<ProductId> = match self {
            ProductSelector::Many { product_ids } => product_ids.into_iter().collect(),
            ProductSelector::One { product_id } => BTreeSet::from([product_id]),
        };
        let ids: Vec<ProductId> = ids
            .into_iter()
            .filter(|id| !id.as_str().trim().is_empty())
            .collect();
        if ids.is_empty() {
            return Err(AppError::BadRequest(
                "productId or a non-empty productIds is required".into(),
            ));
        }
        Ok(ids)
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BatchRequest {
    #[serde(flatten)]
    pub selector: ProductSelector,
    #[serde(default)]
    pub bypass_cooldown: bool,
}

pub async fn post_suggestions(
    State(state): State<AppState>,
    Json(body): Json<BatchRequest>,
) -> Result<Json<BatchResponse<ProductSuggestion>>, AppError> {
    let ids = body.selector.normalize()?;
    Ok(Json(state.manual.suggest_many(ids, body.bypass_cooldown).await))
}

pub async fn post_reprice(
    State(state): State<AppState>,
    Json(body): Json<BatchRequest>,
) -> Result<Json<BatchResponse<RepriceOutcome>>, AppError> {
    let ids = body.selector.normalize()?;
    tracing::info!(
        products = ids.len(),
        bypass_cooldown = body.bypass_cooldown,
        "Manual reprice requested"
    );
    Ok(Json(state.manual.reprice_many(ids, body.bypass_cooldown).await))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(body: serde_json::Value) -> BatchRequest {
        serde_json::from_value(body).unwrap()
    }

    #[test]
    fn test_single_id_selector() {
        let req = parse(serde_json::json!({"productId": "A"}));
        assert!(!req.bypass_cooldown);
        assert_eq!(req.selector.normalize().unwrap(), vec![ProductId::new("A")]);
    }

    #[test]
    fn test_many_ids_are_deduplicated_and_ordered() {
        let req = parse(serde_json::json!({
            "productIds": ["B", "A", "B"],
            "bypassCooldown": true
        }));
        assert!(req.bypass_cooldown);
        assert_eq!(
            req.selector.normalize().unwrap(),
            vec![ProductId::new("A"), ProductId::new("B")]
        );
    }

    #[test]
    fn test_empty_selection_rejected() {
        let req = parse(serde_json::json!({"productIds": []}));
        assert!(matches!(req.selector.normalize(), Err(AppError::BadRequest(_))));
    }

    #[test]
    fn test_missing_selector_fails_to_parse() {
        let result: Result<BatchRequest, _> =
            serde_json::from_value(serde_json::json!({"bypassCooldown": true}));
        assert!(result.is_err());
    }
}
