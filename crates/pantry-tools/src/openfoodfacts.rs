//! OpenFoodFacts product lookup adapter.
//!
//! Fetches a product by UPC from the OpenFoodFacts v2 API and normalizes
//! it into the canonical `ProductRecord`. A catalogue miss (`status != 1`)
//! is a first-class not-found response.

use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use serde_json::{Map, Value};

use pantry_core::error::{PantryError, Result};
use pantry_core::product::{NutrientAmount, ProductRecord, ToolSource, UpcField};
use pantry_core::tool::{ToolAdapter, ToolDescriptor, ToolPayload, ToolResponse};
use pantry_core::upc::validate_upc_a;

use crate::http::{is_retryable_status, require_digits};

const BASE_URL: &str = "https://world.openfoodfacts.org/api/v2/product";

/// Nutriment keys worth surfacing, with display name and unit.
const NUTRIMENT_KEYS: &[(&str, &str, &str)] = &[
    ("energy-kcal_100g", "Energy", "kcal"),
    ("proteins_100g", "Protein", "g"),
    ("fat_100g", "Total Fat", "g"),
    ("carbohydrates_100g", "Carbohydrates", "g"),
    ("sugars_100g", "Sugars", "g"),
    ("fiber_100g", "Fiber", "g"),
    ("sodium_100g", "Sodium", "g"),
];

/// `product-facts-lookup` against the OpenFoodFacts database.
#[derive(Clone)]
pub struct OpenFoodFactsAdapter {
    client: Client,
    base_url: String,
}

impl OpenFoodFactsAdapter {
    pub fn new() -> Self {
        Self {
            client: Client::new(),
            base_url: BASE_URL.to_string(),
        }
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }
}

impl Default for OpenFoodFactsAdapter {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ToolAdapter for OpenFoodFactsAdapter {
    fn descriptor(&self) -> ToolDescriptor {
        ToolDescriptor::single_string_arg(
            "product-facts-lookup",
            "Looks up product information (name, brand, ingredients, allergens, nutrition \
             grade) from the OpenFoodFacts database using a UPC code.",
            "upc",
            "The UPC code to look up, digits only preferred",
        )
    }

    async fn invoke(&self, arguments: &Map<String, Value>) -> Result<ToolResponse> {
        let upc = require_digits(arguments, "upc")?;
        let url = format!("{}/{upc}.json", self.base_url);

        let response = self.client.get(&url).send().await.map_err(|err| {
            PantryError::upstream(
                "openfoodfacts",
                None,
                format!("OpenFoodFacts request failed: {err}"),
                err.is_connect() || err.is_timeout(),
            )
        })?;

        let status = response.status();
        // The v2 API reports unknown products as status 0 in the body, but
        // some deployments answer 404 directly.
        if status == reqwest::StatusCode::NOT_FOUND {
            return Ok(not_found(&upc));
        }
        if !status.is_success() {
            let body = response
                .text()
                .await
                .unwrap_or_else(|_| "failed to read OpenFoodFacts error body".to_string());
            return Err(PantryError::upstream(
                "openfoodfacts",
                Some(status.as_u16()),
                body,
                is_retryable_status(status),
            ));
        }

        let parsed: OffResponse = response.json().await.map_err(|err| {
            PantryError::upstream(
                "openfoodfacts",
                None,
                format!("failed to parse OpenFoodFacts response: {err}"),
                false,
            )
        })?;

        Ok(into_response(&upc, parsed))
    }
}

fn not_found(upc: &str) -> ToolResponse {
    ToolResponse::NotFound(format!(
        "UPC {upc} is not catalogued on OpenFoodFacts"
    ))
}

/// Maps the raw API body into the adapter response.
fn into_response(upc: &str, parsed: OffResponse) -> ToolResponse {
    match (parsed.status, parsed.product) {
        (1, Some(product)) => {
            ToolResponse::Success(ToolPayload::Product(normalize(upc, product)))
        }
        _ => not_found(upc),
    }
}

fn normalize(upc: &str, product: OffProduct) -> ProductRecord {
    let validation = validate_upc_a(upc);
    let upc_field = match validation.normalized {
        Some(code) => UpcField::Code(code),
        None => UpcField::Unknown,
    };

    let name = product
        .product_name
        .filter(|n| !n.trim().is_empty())
        .unwrap_or_else(|| format!("Unnamed product {upc}"));
    let brand = product
        .brand_owner
        .or(product.brands)
        .filter(|b| !b.trim().is_empty());

    let mut nutrients = std::collections::BTreeMap::new();
    for (key, label, unit) in NUTRIMENT_KEYS {
        if let Some(amount) = product.nutriments.get(*key).and_then(Value::as_f64) {
            nutrients.insert(
                (*label).to_string(),
                NutrientAmount {
                    amount,
                    unit: (*unit).to_string(),
                },
            );
        }
    }

    ProductRecord {
        upc: upc_field,
        name,
        brand,
        categories: split_list(product.categories.as_deref()),
        ingredients: split_list(product.ingredients_text.as_deref()),
        nutrients,
        allergens: product
            .allergens_tags
            .iter()
            .map(|tag| tag.trim_start_matches("en:").to_string())
            .filter(|tag| !tag.is_empty())
            .collect(),
        grade: product
            .nutrition_grades
            .filter(|g| !g.trim().is_empty())
            .map(|g| g.to_uppercase()),
        source: ToolSource::OpenFoodFacts,
    }
}

/// Splits OpenFoodFacts' comma-separated text fields into trimmed items.
fn split_list(text: Option<&str>) -> Vec<String> {
    text.map(|t| {
        t.split(',')
            .map(str::trim)
            .filter(|item| !item.is_empty())
            .map(str::to_string)
            .collect()
    })
    .unwrap_or_default()
}

#[derive(Debug, Deserialize)]
struct OffResponse {
    #[serde(default)]
    status: i64,
    #[serde(default)]
    product: Option<OffProduct>,
}

#[derive(Debug, Default, Deserialize)]
struct OffProduct {
    #[serde(default)]
    product_name: Option<String>,
    #[serde(default)]
    brands: Option<String>,
    #[serde(default)]
    brand_owner: Option<String>,
    #[serde(default)]
    categories: Option<String>,
    #[serde(default)]
    ingredients_text: Option<String>,
    #[serde(default)]
    nutrition_grades: Option<String>,
    #[serde(default)]
    allergens_tags: Vec<String>,
    #[serde(default)]
    nutriments: Map<String, Value>,
}
