//! GraphQL documents and response shapes for the storefront admin API.
//!
//! A batch becomes one request with one aliased `inventoryAdjustQuantities`
//! field per adjustment (`adjust_0`, `adjust_1`, ...), so every entry's
//! `userErrors` can be traced back to the adjustment that caused them.

use std::collections::HashMap;
use std::fmt::Write as _;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value, json};

use stocksync_core::{RemoteInventoryItemId, Sku};
use stocksync_inventory::AdjustmentBatch;

use super::{AdjustmentResult, PerItemError, RemoteError, RemoteVariant, VariantPage};

/// Variants requested per catalogue page (the API maximum).
pub const VARIANT_PAGE_SIZE: usize = 250;

/// Quantity name adjusted by every mutation.
pub const ADJUSTED_QUANTITY: &str = "available";

const VARIANTS_QUERY: &str = r#"query StocksyncVariants($first: Int!, $after: String) {
  productVariants(first: $first, after: $after) {
    nodes { sku inventoryItem { id } }
    pageInfo { hasNextPage endCursor }
  }
}"#;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GraphqlRequest {
    pub query: String,
    pub variables: Value,
}

#[derive(Debug, Deserialize)]
struct GraphqlResponse<T> {
    data: Option<T>,
    #[serde(default)]
    errors: Vec<GraphqlErrorMessage>,
}

#[derive(Debug, Deserialize)]
struct GraphqlErrorMessage {
    message: String,
}

fn alias(index: usize) -> String {
    format!("adjust_{index}")
}

/// Build the batched adjustment mutation for `batch`.
pub fn adjustment_request(batch: &AdjustmentBatch, reason: &str, reference: Option<&str>) -> GraphqlRequest {
    let n = batch.len();
    let mut query = String::with_capacity(64 + n * 128);
    query.push_str("mutation StocksyncAdjust(");
    for i in 0..n {
        if i > 0 {
            query.push_str(", ");
        }
        let _ = write!(query, "$input_{i}: InventoryAdjustQuantitiesInput!");
    }
    query.push_str(") {\n");
    for i in 0..n {
        let _ = writeln!(
            query,
            "  {}: inventoryAdjustQuantities(input: $input_{i}) {{ userErrors {{ field message }} }}",
            alias(i)
        );
    }
    query.push('}');

    let mut variables = Map::with_capacity(n);
    for (i, adjustment) in batch.adjustments().iter().enumerate() {
        let mut input = json!({
            "reason": reason,
            "name": ADJUSTED_QUANTITY,
            "changes": [{
                "delta": adjustment.delta,
                "inventoryItemId": adjustment.inventory_item_id.to_global_id(),
                "locationId": adjustment.location_id.to_global_id(),
            }],
        });
        if let (Some(reference), Some(obj)) = (reference, input.as_object_mut()) {
            obj.insert("referenceDocumentUri".to_string(), Value::String(reference.to_string()));
        }
        variables.insert(format!("input_{i}"), input);
    }

    GraphqlRequest {
        query,
        variables: Value::Object(variables),
    }
}

#[derive(Debug, Deserialize)]
struct AdjustPayload {
    #[serde(rename = "userErrors", default)]
    user_errors: Vec<UserError>,
}

#[derive(Debug, Deserialize)]
struct UserError {
    #[serde(default)]
    field: Option<Vec<String>>,
    message: String,
}

/// Interpret the response to [`adjustment_request`].
///
/// Adjustments whose alias carries no `userErrors` count as applied. An alias
/// that is missing or `null` counts as failed. A response with no `data` at
/// all is a batch-level failure.
pub fn parse_adjustment_response(batch: &AdjustmentBatch, body: &[u8]) -> Result<AdjustmentResult, RemoteError> {
    let response: GraphqlResponse<HashMap<String, Option<AdjustPayload>>> =
        serde_json::from_slice(body).map_err(|e| RemoteError::Decode(e.to_string()))?;

    let top_level: Vec<String> = response.errors.into_iter().map(|e| e.message).collect();
    let Some(data) = response.data else {
        return Err(if top_level.is_empty() {
            RemoteError::Decode("response carries neither data nor errors".to_string())
        } else {
            RemoteError::Graphql(top_level)
        });
    };

    let mut result = AdjustmentResult::default();
    for (i, adjustment) in batch.adjustments().iter().enumerate() {
        let item_error = |field: Vec<String>, message: String| PerItemError {
            sku: adjustment.sku.clone(),
            inventory_item_id: adjustment.inventory_item_id.clone(),
            field,
            message,
        };

        match data.get(&alias(i)) {
            Some(Some(payload)) if payload.user_errors.is_empty() => result.applied += 1,
            Some(Some(payload)) => result.errors.extend(
                payload
                    .user_errors
                    .iter()
                    .map(|ue| item_error(ue.field.clone().unwrap_or_default(), ue.message.clone())),
            ),
            _ => {
                let message = if top_level.is_empty() {
                    "mutation returned no result".to_string()
                } else {
                    top_level.join("; ")
                };
                result.errors.push(item_error(Vec::new(), message));
            }
        }
    }
    Ok(result)
}

/// Request for one page of the store's product variants.
pub fn variants_request(cursor: Option<&str>) -> GraphqlRequest {
    GraphqlRequest {
        query: VARIANTS_QUERY.to_string(),
        variables: json!({ "first": VARIANT_PAGE_SIZE, "after": cursor }),
    }
}

#[derive(Debug, Deserialize)]
struct VariantsData {
    #[serde(rename = "productVariants")]
    product_variants: VariantConnection,
}

#[derive(Debug, Deserialize)]
struct VariantConnection {
    #[serde(default)]
    nodes: Vec<VariantNode>,
    #[serde(rename = "pageInfo")]
    page_info: PageInfo,
}

#[derive(Debug, Deserialize)]
struct VariantNode {
    sku: Option<String>,
    #[serde(rename = "inventoryItem")]
    inventory_item: Option<ItemRef>,
}

#[derive(Debug, Deserialize)]
struct ItemRef {
    id: String,
}

#[derive(Debug, Deserialize)]
struct PageInfo {
    #[serde(rename = "hasNextPage")]
    has_next_page: bool,
    #[serde(rename = "endCursor")]
    end_cursor: Option<String>,
}

/// Interpret the response to [`variants_request`].
///
/// Variants without an inventory item are dropped; blank SKUs become `None`.
pub fn parse_variants_response(body: &[u8]) -> Result<VariantPage, RemoteError> {
    let response: GraphqlResponse<VariantsData> =
        serde_json::from_slice(body).map_err(|e| RemoteError::Decode(e.to_string()))?;

    let Some(data) = response.data else {
        let messages: Vec<String> = response.errors.into_iter().map(|e| e.message).collect();
        return Err(if messages.is_empty() {
            RemoteError::Decode("response carries neither data nor errors".to_string())
        } else {
            RemoteError::Graphql(messages)
        });
    };

    let connection = data.product_variants;
    let variants = connection
        .nodes
        .into_iter()
        .filter_map(|node| {
            let item = RemoteInventoryItemId::parse(node.inventory_item?.id).ok()?;
            Some(RemoteVariant {
                sku: node.sku.and_then(|s| Sku::parse(s).ok()),
                inventory_item_id: item,
            })
        })
        .collect();

    Ok(VariantPage {
        variants,
        next_cursor: connection
            .page_info
            .end_cursor
            .filter(|_| connection.page_info.has_next_page),
    })
}
