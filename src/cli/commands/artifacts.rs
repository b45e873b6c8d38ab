//! Inspect the artifact store from the command line.

use crate::artifact::open_store;
use crate::cli::output::content_preview;
use crate::cli::preflight::{self, Operation};
use crate::cli::{ArtifactsAction, Output};
use crate::config::Settings;
use crate::error::{LaerError, Result};
use uuid::Uuid;

/// Run the artifacts command.
pub async fn run_artifacts(action: &ArtifactsAction, settings: Settings) -> Result<()> {
    preflight::check(Operation::Artifacts, &settings)?;
    let store = open_store(&settings)?;

    match action {
        ArtifactsAction::List => {
            let artifacts = store.list_latest().await?;
            if artifacts.is_empty() {
                Output::info("No artifacts stored yet.");
                return Ok(());
            }

            Output::header(&format!("Artifacts ({})", artifacts.len()));
            for artifact in artifacts {
                Output::artifact_line(
                    &artifact.title,
                    &artifact.artifact_id.to_string(),
                    artifact.kind.as_str(),
                    &artifact.created_at.format("%Y-%m-%d %H:%M").to_string(),
                );
            }
        }

        ArtifactsAction::Show { id } => {
            let artifact_id = parse_id(id)?;
            let version = store
                .get_latest(artifact_id)
                .await?
                .ok_or_else(|| LaerError::ArtifactNotFound(id.clone()))?;

            Output::header(&version.title);
            Output::kv("Artifact", &version.artifact_id.to_string());
            Output::kv("Version", &version.version_id.to_string());
            Output::kv("Kind", version.kind.as_str());
            if let Some(owner) = &version.owner {
                Output::kv("Owner", owner);
            }
            Output::kv(
                "Created",
                &version.created_at.format("%Y-%m-%d %H:%M:%S").to_string(),
            );
            println!();
            match serde_json::from_str::<serde_json::Value>(&version.content)
                .and_then(|v| serde_json::to_string_pretty(&v))
            {
                Ok(pretty) => println!("{}", pretty),
                Err(_) => println!("{}", version.content),
            }
        }

        ArtifactsAction::Versions { id } => {
            let artifact_id = parse_id(id)?;
            let versions = store.get_all_versions(artifact_id).await?;
            if versions.is_empty() {
                return Err(LaerError::ArtifactNotFound(id.clone()));
            }

            Output::header(&format!("Versions of {} ({})", id, versions.len()));
            for (i, version) in versions.iter().enumerate() {
                println!(
                    "  {}. {} | {} | {}",
                    i + 1,
                    version.created_at.format("%Y-%m-%d %H:%M:%S"),
                    version.version_id,
                    content_preview(&version.content, 60)
                );
            }
        }
    }

    Ok(())
}

fn parse_id(id: &str) -> Result<Uuid> {
    Uuid::parse_str(id)
        .map_err(|_| LaerError::InvalidInput(format!("'{}' is not a valid artifact id", id)))
}
