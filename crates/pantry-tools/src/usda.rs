//! USDA FoodData Central nutrition lookup adapter.
//!
//! Searches the Branded Foods dataset by UPC. An exact `gtinUpc` match is
//! preferred; otherwise the first hit is taken. Only the key nutrients are
//! surfaced, capped at ten entries.

use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use serde_json::{Map, Value};

use pantry_core::error::{PantryError, Result};
use pantry_core::product::{NutrientAmount, ProductRecord, ToolSource, UpcField};
use pantry_core::tool::{ToolAdapter, ToolDescriptor, ToolPayload, ToolResponse};
use pantry_core::upc::validate_upc_a;

use crate::http::{is_retryable_status, require_digits};

const BASE_URL: &str = "https://api.nal.usda.gov/fdc/v1/foods/search";
const PAGE_SIZE: u32 = 25;
const MAX_NUTRIENTS: usize = 10;

/// Nutrient names worth surfacing; matched by substring.
const KEY_NUTRIENTS: &[&str] = &[
    "Energy",
    "Protein",
    "Total lipid (fat)",
    "Carbohydrate",
    "Total Sugars",
    "Fiber",
    "Sodium",
];

/// `nutrition-lookup` against USDA FoodData Central.
#[derive(Clone)]
pub struct UsdaFdcAdapter {
    client: Client,
    api_key: String,
    base_url: String,
}

impl UsdaFdcAdapter {
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            client: Client::new(),
            api_key: api_key.into(),
            base_url: BASE_URL.to_string(),
        }
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }
}

#[async_trait]
impl ToolAdapter for UsdaFdcAdapter {
    fn descriptor(&self) -> ToolDescriptor {
        ToolDescriptor::single_string_arg(
            "nutrition-lookup",
            "Searches the USDA FoodData Central branded foods database for nutrition facts \
             using a 12-digit UPC code.",
            "upc",
            "The 12-digit UPC code to search for",
        )
    }

    async fn invoke(&self, arguments: &Map<String, Value>) -> Result<ToolResponse> {
        let upc = require_digits(arguments, "upc")?;

        let page_size = PAGE_SIZE.to_string();
        let response = self
            .client
            .get(&self.base_url)
            .query(&[
                ("query", upc.as_str()),
                ("dataType", "Branded"),
                ("pageSize", page_size.as_str()),
                ("sortOrder", "asc"),
                ("api_key", self.api_key.as_str()),
            ])
            .send()
            .await
            .map_err(|err| {
                PantryError::upstream(
                    "usda-fdc",
                    None,
                    format!("USDA FDC request failed: {err}"),
                    err.is_connect() || err.is_timeout(),
                )
            })?;

        let status = response.status();
        if !status.is_success() {
            let body = response
                .text()
                .await
                .unwrap_or_else(|_| "failed to read USDA FDC error body".to_string());
            return Err(PantryError::upstream(
                "usda-fdc",
                Some(status.as_u16()),
                body,
                is_retryable_status(status),
            ));
        }

        let parsed: FdcSearchResponse = response.json().await.map_err(|err| {
            PantryError::upstream(
                "usda-fdc",
                None,
                format!("failed to parse USDA FDC response: {err}"),
                false,
            )
        })?;

        Ok(into_response(&upc, parsed))
    }
}

/// Maps the search body into the adapter response.
fn into_response(upc: &str, parsed: FdcSearchResponse) -> ToolResponse {
    if parsed.foods.is_empty() {
        return ToolResponse::NotFound(format!(
            "UPC {upc} is not catalogued in USDA FoodData Central"
        ));
    }

    let exact = parsed
        .foods
        .iter()
        .position(|food| food.gtin_upc.as_deref() == Some(upc));
    let food = match exact {
        Some(index) => &parsed.foods[index],
        None => &parsed.foods[0],
    };

    ToolResponse::Success(ToolPayload::Product(normalize(upc, food)))
}

fn normalize(upc: &str, food: &FdcFood) -> ProductRecord {
    // Prefer the UPC reported by the record itself when it validates.
    let record_upc = food.gtin_upc.as_deref().unwrap_or(upc);
    let upc_field = match validate_upc_a(record_upc).normalized {
        Some(code) => UpcField::Code(code),
        None => UpcField::Unknown,
    };

    let mut nutrients = std::collections::BTreeMap::new();
    for nutrient in &food.food_nutrients {
        if nutrients.len() >= MAX_NUTRIENTS {
            break;
        }
        let Some(name) = nutrient.nutrient_name.as_deref() else {
            continue;
        };
        if !KEY_NUTRIENTS.iter().any(|key| name.contains(key)) {
            continue;
        }
        if let Some(value) = nutrient.value {
            nutrients.insert(
                name.to_string(),
                NutrientAmount {
                    amount: value,
                    unit: nutrient.unit_name.clone().unwrap_or_default(),
                },
            );
        }
    }

    ProductRecord {
        upc: upc_field,
        name: food
            .description
            .clone()
            .filter(|d| !d.trim().is_empty())
            .unwrap_or_else(|| format!("Unnamed product {upc}")),
        brand: food
            .brand_owner
            .clone()
            .or_else(|| food.brand_name.clone())
            .filter(|b| !b.trim().is_empty()),
        categories: food
            .food_category
            .clone()
            .filter(|c| !c.trim().is_empty())
            .map(|c| vec![c])
            .unwrap_or_default(),
        ingredients: food
            .ingredients
            .as_deref()
            .map(|text| {
                text.split(',')
                    .map(str::trim)
                    .filter(|item| !item.is_empty())
                    .map(str::to_string)
                    .collect()
            })
            .unwrap_or_default(),
        nutrients,
        allergens: Default::default(),
        grade: None,
        source: ToolSource::UsdaFdc,
    }
}

#[derive(Debug, Deserialize)]
struct FdcSearchResponse {
    #[serde(default)]
    foods: Vec<FdcFood>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct FdcFood {
    #[serde(default)]
    description: Option<String>,
    #[serde(default)]
    brand_owner: Option<String>,
    #[serde(default)]
    brand_name: Option<String>,
    #[serde(default)]
    gtin_upc: Option<String>,
    #[serde(default)]
    ingredients: Option<String>,
    #[serde(default)]
    food_category: Option<String>,
    #[serde(default)]
    food_nutrients: Vec<FdcNutrient>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct FdcNutrient {
    #[serde(default)]
    nutrient_name: Option<String>,
    #[serde(default)]
    value: Option<f64>,
    #[serde(default)]
    unit_name: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn canned_search() -> FdcSearchResponse {
        serde_json::from_value(serde_json::json!({
            "totalHits": 2,
            "foods": [
                {
                    "description": "HOT CHIPS, SIMILAR FLAVOR",
                    "brandOwner": "Other Brand",
                    "gtinUpc": "99999999990",
                    "foodNutrients": []
                },
                {
                    "description": "HOT FRIES",
                    "brandOwner": "Frito-Lay",
                    "brandName": "Andy Capp's",
                    "gtinUpc": "028400433303",
                    "ingredients": "Corn meal, vegetable oil, salt",
                    "foodCategory": "Snacks",
                    "foodNutrients": [
                        { "nutrientName": "Energy", "value": 500.0, "unitName": "KCAL" },
                        { "nutrientName": "Protein", "value": 5.0, "unitName": "G" },
                        { "nutrientName": "Vitamin D (D2 + D3)", "value": 0.0, "unitName": "UG" }
                    ]
                }
            ]
        }))
        .unwrap()
    }

    #[test]
    fn exact_gtin_match_is_preferred_over_first_hit() {
        let response = into_response("028400433303", canned_search());
        let ToolResponse::Success(ToolPayload::Product(record)) = response else {
            panic!("expected a product payload");
        };
        assert_eq!(record.name, "HOT FRIES");
        assert_eq!(record.brand.as_deref(), Some("Frito-Lay"));
        assert_eq!(record.upc, UpcField::Code("028400433303".into()));
        assert_eq!(record.source, ToolSource::UsdaFdc);
    }

    #[test]
    fn key_nutrients_are_kept_and_others_dropped() {
        let ToolResponse::Success(ToolPayload::Product(record)) =
            into_response("028400433303", canned_search())
        else {
            panic!("expected a product payload");
        };
        assert_eq!(record.nutrients["Energy"].amount, 500.0);
        assert_eq!(record.nutrients["Protein"].unit, "G");
        assert!(!record.nutrients.keys().any(|k| k.contains("Vitamin")));
    }

    #[test]
    fn no_exact_match_falls_back_to_first_result() {
        let response = into_response("036000291452", canned_search());
        let ToolResponse::Success(ToolPayload::Product(record)) = response else {
            panic!("expected a product payload");
        };
        assert_eq!(record.name, "HOT CHIPS, SIMILAR FLAVOR");
        // The record's own gtin fails UPC-A validation, so it is unknown.
        assert_eq!(record.upc, UpcField::Unknown);
    }

    #[test]
    fn empty_foods_is_not_found() {
        let parsed: FdcSearchResponse =
            serde_json::from_value(serde_json::json!({ "foods": [] })).unwrap();
        assert!(matches!(
            into_response("028400433303", parsed),
            ToolResponse::NotFound(_)
        ));
    }
}
