//! Shared command helpers: config discovery and engine wiring.

use std::path::Path;
use std::sync::Arc;

use anyhow::{Context, Result, bail};
use tracing::{debug, info};

use pantry_core::config::PantryConfig;
use pantry_core::tool::ToolAdapter;
use pantry_engine::{ClaudePlanner, PantryEngine};
use pantry_retrieval::{Corpus, Embedder, HashEmbedder, HttpEmbedder, HybridRetriever};
use pantry_tools::{
    CheckDigitAdapter, OpenFoodFactsAdapter, RetrievalAdapter, TavilySearchAdapter,
    UpcValidatorAdapter, UsdaFdcAdapter,
};

/// Loads config from the explicit path, the default location, or defaults.
pub fn load_config(path: Option<&Path>) -> Result<PantryConfig> {
    let config = match path {
        Some(path) => PantryConfig::load(path)
            .with_context(|| format!("failed to load config from {}", path.display()))?,
        None => match default_config_path() {
            Some(path) if path.exists() => PantryConfig::load(&path)
                .with_context(|| format!("failed to load config from {}", path.display()))?,
            _ => PantryConfig::default(),
        },
    };
    Ok(config.with_env_fallback())
}

fn default_config_path() -> Option<std::path::PathBuf> {
    dirs::config_dir().map(|dir| dir.join("pantry").join("config.toml"))
}

/// Builds the full engine: planner plus every tool the config allows.
pub async fn build_engine(config: &PantryConfig) -> Result<PantryEngine> {
    let planner = Arc::new(ClaudePlanner::from_config(&config.api)?);

    let mut adapters: Vec<Arc<dyn ToolAdapter>> = vec![
        Arc::new(UpcValidatorAdapter),
        Arc::new(CheckDigitAdapter),
        Arc::new(OpenFoodFactsAdapter::new()),
    ];
    if let Some(key) = &config.api.usda_api_key {
        adapters.push(Arc::new(UsdaFdcAdapter::new(key.clone())));
    } else {
        info!("USDA_API_KEY not configured, nutrition-lookup disabled");
    }
    if let Some(key) = &config.api.tavily_api_key {
        adapters.push(Arc::new(TavilySearchAdapter::new(key.clone())));
    } else {
        info!("TAVILY_API_KEY not configured, web-search disabled");
    }
    if let Some(retriever) = build_retriever(config).await? {
        adapters.push(Arc::new(RetrievalAdapter::new(Arc::new(retriever))));
    }

    Ok(PantryEngine::new(config, planner, adapters))
}

/// Builds the hybrid retriever when a corpus directory is configured.
pub async fn build_retriever(config: &PantryConfig) -> Result<Option<HybridRetriever>> {
    let Some(corpus_dir) = &config.retrieval.corpus_dir else {
        debug!("no corpus_dir configured, retrieval disabled");
        return Ok(None);
    };
    let corpus = Corpus::load_dir(
        corpus_dir,
        config.retrieval.chunk_size,
        config.retrieval.chunk_overlap,
    )
    .with_context(|| format!("failed to load corpus from {}", corpus_dir.display()))?;
    if corpus.is_empty() {
        bail!("corpus directory {} holds no .txt documents", corpus_dir.display());
    }

    let embedder: Arc<dyn Embedder> = match &config.api.openai_api_key {
        Some(key) => Arc::new(HttpEmbedder::new(
            key.clone(),
            config.api.embedding_model.clone(),
        )),
        None => {
            info!("OPENAI_API_KEY not configured, using the local hash embedder");
            Arc::new(HashEmbedder::default())
        }
    };

    let retriever = HybridRetriever::build(corpus, embedder, &config.retrieval).await?;
    Ok(Some(retriever))
}
