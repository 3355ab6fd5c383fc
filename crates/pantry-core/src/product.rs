//! Normalized product record.
//!
//! Every lookup adapter maps its upstream schema into [`ProductRecord`]
//! before returning, so the planning loop only ever reasons over one shape.

use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};

/// The UPC attached to a product record: either a validated 12-digit
/// UPC-A string or explicitly unknown.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "code", rename_all = "snake_case")]
pub enum UpcField {
    Code(String),
    Unknown,
}

impl UpcField {
    pub fn as_code(&self) -> Option<&str> {
        match self {
            Self::Code(code) => Some(code),
            Self::Unknown => None,
        }
    }
}

/// Which tool produced a record or passage.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ToolSource {
    OpenFoodFacts,
    UsdaFdc,
    WebSearch,
    Retrieval,
    Validator,
}

impl std::fmt::Display for ToolSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Self::OpenFoodFacts => "OpenFoodFacts",
            Self::UsdaFdc => "USDA FoodData Central",
            Self::WebSearch => "web search",
            Self::Retrieval => "product knowledge base",
            Self::Validator => "UPC validator",
        };
        write!(f, "{name}")
    }
}

/// A single nutrient measurement.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NutrientAmount {
    pub amount: f64,
    pub unit: String,
}

/// Canonical normalized product shape shared by all lookup adapters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProductRecord {
    pub upc: UpcField,
    pub name: String,
    #[serde(default)]
    pub brand: Option<String>,
    #[serde(default)]
    pub categories: Vec<String>,
    #[serde(default)]
    pub ingredients: Vec<String>,
    #[serde(default)]
    pub nutrients: BTreeMap<String, NutrientAmount>,
    #[serde(default)]
    pub allergens: BTreeSet<String>,
    /// Letter grade where the source provides one (e.g. Nutri-Score).
    #[serde(default)]
    pub grade: Option<String>,
    pub source: ToolSource,
}

impl ProductRecord {
    /// The anchor session memory keeps for follow-up resolution.
    pub fn product_ref(&self) -> ProductRef {
        ProductRef {
            upc: self.upc.as_code().map(str::to_string),
            name: Some(self.name.clone()),
        }
    }

    /// One-line rendering used in evidence and progress descriptions.
    pub fn summary(&self) -> String {
        let upc = self.upc.as_code().unwrap_or("unknown UPC");
        match &self.brand {
            Some(brand) => format!("{} ({brand}, UPC {upc}) via {}", self.name, self.source),
            None => format!("{} (UPC {upc}) via {}", self.name, self.source),
        }
    }
}

/// Reference to the most recently resolved product in a session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProductRef {
    pub upc: Option<String>,
    pub name: Option<String>,
}

impl std::fmt::Display for ProductRef {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match (&self.name, &self.upc) {
            (Some(name), Some(upc)) => write!(f, "{name} (UPC {upc})"),
            (Some(name), None) => write!(f, "{name}"),
            (None, Some(upc)) => write!(f, "UPC {upc}"),
            (None, None) => write!(f, "unknown product"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record() -> ProductRecord {
        ProductRecord {
            upc: UpcField::Code("028400433303".into()),
            name: "Hot Chips".into(),
            brand: Some("Frito-Lay".into()),
            categories: vec!["Snacks".into()],
            ingredients: vec!["potatoes".into(), "oil".into()],
            nutrients: BTreeMap::new(),
            allergens: BTreeSet::new(),
            grade: None,
            source: ToolSource::OpenFoodFacts,
        }
    }

    #[test]
    fn product_ref_carries_upc_and_name() {
        let anchor = record().product_ref();
        assert_eq!(anchor.upc.as_deref(), Some("028400433303"));
        assert_eq!(anchor.name.as_deref(), Some("Hot Chips"));
        assert_eq!(anchor.to_string(), "Hot Chips (UPC 028400433303)");
    }

    #[test]
    fn summary_names_the_source() {
        assert_eq!(
            record().summary(),
            "Hot Chips (Frito-Lay, UPC 028400433303) via OpenFoodFacts"
        );
    }
}
