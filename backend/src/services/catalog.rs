//! Crop knowledge base loading

use shared::KnowledgeBase;

use crate::config::CatalogConfig;
use crate::error::{AppError, AppResult};

/// Load and validate the knowledge base, from `catalog.path` when set or
/// the bundled catalog otherwise
pub fn load_knowledge_base(config: &CatalogConfig) -> AppResult<KnowledgeBase> {
    let kb = match &config.path {
        Some(path) => {
            let json = std::fs::read_to_string(path).map_err(|e| {
                AppError::Configuration(format!("cannot read crop catalog {}: {}", path, e))
            })?;
            KnowledgeBase::from_json(&json)?
        }
        None => KnowledgeBase::builtin()?,
    };

    tracing::info!(
        version = %kb.version,
        crops = kb.crops.len(),
        source = config.path.as_deref().unwrap_or("builtin"),
        "Crop knowledge base loaded"
    );
    Ok(kb)
}
