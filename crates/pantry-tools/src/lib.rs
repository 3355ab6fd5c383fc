//! Tool adapters and the dispatch layer.
//!
//! Every capability the planner can invoke lives here behind the
//! `ToolAdapter` trait from `pantry-core`: the two product databases, web
//! search, the local hybrid retriever, and the in-process UPC tools. The
//! [`dispatch::ToolDispatcher`] owns the shared timeout/retry contract.

pub mod dispatch;
pub mod http;
pub mod openfoodfacts;
pub mod retrieval;
pub mod usda;
pub mod validator;
pub mod web_search;

pub use dispatch::ToolDispatcher;
pub use openfoodfacts::OpenFoodFactsAdapter;
pub use retrieval::RetrievalAdapter;
pub use usda::UsdaFdcAdapter;
pub use validator::{CheckDigitAdapter, UpcValidatorAdapter};
pub use web_search::TavilySearchAdapter;
