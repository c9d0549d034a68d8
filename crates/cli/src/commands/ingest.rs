//! `crabdesk ingest` — Load FAQ entries into the knowledge base.

use crabdesk_config::AppConfig;
use crabdesk_core::Error;
use crabdesk_core::knowledge::{FaqDocument, FaqItem};
use crabdesk_core::provider::EmbeddingRequest;
use std::path::PathBuf;

pub async fn run(file: PathBuf) -> Result<(), Box<dyn std::error::Error>> {
    let config = AppConfig::load().map_err(Error::from)?;
    let state = crabdesk_gateway::build_state(config).await?;

    let raw = std::fs::read_to_string(&file)
        .map_err(|e| format!("Failed to read {}: {e}", file.display()))?;
    let items: Vec<FaqItem> = serde_json::from_str(&raw)
        .map_err(|e| format!("Failed to parse {}: {e}", file.display()))?;

    if items.is_empty() {
        return Err(format!("{} contains no FAQ items", file.display()).into());
    }

    let inputs: Vec<String> = items
        .iter()
        .map(|it| format!("{}\n{}", it.question, it.answer))
        .collect();

    let embeddings = state
        .provider
        .embed(EmbeddingRequest {
            model: state.config.embedding_model.clone(),
            inputs,
        })
        .await
        .map_err(|e| format!("Embedding failed: {e}"))?;

    let documents: Vec<FaqDocument> = items
        .into_iter()
        .zip(embeddings)
        .map(|(item, embedding)| FaqDocument {
            question: item.question,
            answer: item.answer,
            embedding,
        })
        .collect();

    let ingested = state.index.upsert(documents).await?;
    let total = state.index.count().await?;

    println!("Ingested {ingested} FAQ entries from {}", file.display());
    println!("Knowledge base now holds {total} entries");

    Ok(())
}
