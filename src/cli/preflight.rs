//! Pre-flight checks before expensive operations.
//!
//! Validates that required configuration is available before starting
//! operations that would otherwise fail midway.

use crate::config::{ArtifactStoreProvider, Settings};
use crate::error::{LaerError, Result};

/// Requirements for different operations.
#[derive(Debug, Clone, Copy)]
pub enum Operation {
    /// Chatting requires an API key and a usable artifact store.
    Chat,
    /// Serving requires the same as chatting.
    Serve,
    /// Artifact inspection requires only the store.
    Artifacts,
}

/// Run pre-flight checks for the given operation.
///
/// Returns Ok(()) if all checks pass, or an error describing what's missing.
pub fn check(operation: Operation, settings: &Settings) -> Result<()> {
    match operation {
        Operation::Chat | Operation::Serve => {
            check_api_key()?;
            check_store_path(settings)?;
        }
        Operation::Artifacts => {
            check_store_path(settings)?;
        }
    }
    Ok(())
}

/// Check if OpenAI API key is configured.
fn check_api_key() -> Result<()> {
    match std::env::var("OPENAI_API_KEY") {
        Ok(key) if !key.is_empty() => Ok(()),
        Ok(_) => Err(LaerError::Config(
            "OPENAI_API_KEY is empty. Set it with: export OPENAI_API_KEY='sk-...'".to_string(),
        )),
        Err(_) => Err(LaerError::Config(
            "OPENAI_API_KEY not set. Set it with: export OPENAI_API_KEY='sk-...'".to_string(),
        )),
    }
}

/// Check that the artifact store location is usable.
fn check_store_path(settings: &Settings) -> Result<()> {
    if settings.artifacts.provider == ArtifactStoreProvider::Memory {
        return Ok(());
    }

    let path = settings.artifacts_db_path();
    let parent = path.parent().unwrap_or(std::path::Path::new("."));
    std::fs::create_dir_all(parent).map_err(|e| {
        LaerError::Config(format!(
            "Artifact store directory {:?} is not writable: {}",
            parent, e
        ))
    })?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_memory_store_needs_no_path() {
        let mut settings = Settings::default();
        settings.artifacts.provider = ArtifactStoreProvider::Memory;
        settings.artifacts.sqlite_path = "/nonexistent/denied/store.db".to_string();
        assert!(check_store_path(&settings).is_ok());
    }
}
