//! `pantry retrieve`: query the hybrid retriever directly.

use anyhow::{Result, bail};

use pantry_core::config::PantryConfig;

use super::utils::build_retriever;

pub async fn run(config: &PantryConfig, query: &str) -> Result<()> {
    let Some(retriever) = build_retriever(config).await? else {
        bail!("no corpus configured; set retrieval.corpus_dir in the config file");
    };

    let passages = retriever.retrieve(query).await?;
    if passages.is_empty() {
        println!("no passages matched");
        return Ok(());
    }
    for passage in passages {
        println!(
            "[{:.3}] {} (lex {:.3}, sem {:.3})",
            passage.combined_score,
            passage.document_id,
            passage.lexical_score,
            passage.semantic_score
        );
        let preview: String = passage.text.chars().take(200).collect();
        println!("    {}", preview.replace('\n', " "));
    }
    Ok(())
}
