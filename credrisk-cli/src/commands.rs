//! CLI subcommand handlers.

use crate::{Commands, ConfigAction};
use credrisk_core::{PipelineConfig, RecordSourceConfig};
use credrisk_ml::data::DataApiCollection;
use credrisk_ml::{DataIngestionArtifact, TrainingPipeline, push_csv};
use std::path::{Path, PathBuf};

/// Handle a CLI subcommand.
pub fn handle_command(command: Commands, config: PipelineConfig) -> anyhow::Result<()> {
    match command {
        Commands::Run => {
            let pipeline = TrainingPipeline::new(config)?;
            let artifacts = pipeline.run()?;
            print_json(&artifacts)
        }
        Commands::Ingest => {
            let pipeline = TrainingPipeline::new(config)?;
            let artifact = pipeline.start_data_ingestion()?;
            print_json(&artifact)
        }
        Commands::Validate { train, test } => {
            let pipeline = TrainingPipeline::new(config)?;
            let ingestion = DataIngestionArtifact {
                feature_store_file_path: pipeline.layout().feature_store_file.clone(),
                train_file_path: train,
                test_file_path: test,
            };
            let artifact = pipeline.start_data_validation(ingestion)?;
            print_json(&artifact)
        }
        Commands::Push { csv } => handle_push(&config, &csv),
        Commands::Config { action } => match action {
            ConfigAction::Show => {
                print!("{}", toml::to_string_pretty(&config)?);
                Ok(())
            }
        },
    }
}

fn handle_push(config: &PipelineConfig, csv: &Path) -> anyhow::Result<()> {
    let RecordSourceConfig::DataApi {
        endpoint,
        keyspace,
        collection,
        token,
    } = &config.source
    else {
        anyhow::bail!("push needs a data_api source; configure [source] with type = \"data_api\"");
    };
    let collection = DataApiCollection::new(endpoint, keyspace, collection, token.as_deref())?;
    let inserted = push_csv(&collection, csv)?;
    println!("Inserted {inserted} records into {}", collection.url());
    Ok(())
}

fn print_json<T: serde::Serialize>(value: &T) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

/// Anchor relative paths of the configuration at `workspace`.
pub fn resolve_paths(mut config: PipelineConfig, workspace: &Path) -> PipelineConfig {
    let anchor = |p: &PathBuf| -> PathBuf { workspace.join(p) };
    config.artifact_dir = anchor(&config.artifact_dir);
    config.validation.schema_file = anchor(&config.validation.schema_file);
    match &mut config.source {
        RecordSourceConfig::Csv { path } | RecordSourceConfig::Jsonl { path } => {
            *path = anchor(&*path);
        }
        RecordSourceConfig::DataApi { .. } => {}
    }
    config
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_resolve_paths_anchors_relative_only() {
        let mut config = PipelineConfig::default();
        config.validation.schema_file = PathBuf::from("/etc/credrisk/schema.yaml");
        let resolved = resolve_paths(config, Path::new("/work"));
        assert_eq!(resolved.artifact_dir, PathBuf::from("/work/Artifacts"));
        assert_eq!(
            resolved.validation.schema_file,
            PathBuf::from("/etc/credrisk/schema.yaml")
        );
        match resolved.source {
            RecordSourceConfig::Csv { path } => assert_eq!(
                path,
                PathBuf::from("/work/credit_data/SouthGermanCreditData.csv")
            ),
            other => panic!("unexpected source: {other:?}"),
        }
    }

    #[test]
    fn test_push_requires_data_api_source() {
        let err = handle_push(&PipelineConfig::default(), Path::new("data.csv")).unwrap_err();
        assert!(err.to_string().contains("data_api"));
    }
}
