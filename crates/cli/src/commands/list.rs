//! List command handler.

use clap::Args;
use pia_core::{config::AppConfig, AppResult};
use pia_prompt::{list_prompts, load_prompt};

/// List prompts in the workspace
#[derive(Args, Debug)]
pub struct ListCommand {
    /// Output as JSON
    #[arg(long)]
    pub json: bool,
}

/// One row of `pia list`.
#[derive(Debug, PartialEq)]
struct PromptSummary {
    id: String,
    name: Option<String>,
    description: Option<String>,
}

impl ListCommand {
    pub fn execute(&self, config: &AppConfig) -> AppResult<()> {
        tracing::info!("Executing list command");

        let summaries = summarize(config)?;

        if self.json {
            let rows: Vec<serde_json::Value> = summaries
                .iter()
                .map(|s| {
                    serde_json::json!({
                        "id": s.id,
                        "name": s.name,
                        "description": s.description,
                    })
                })
                .collect();
            println!("{}", serde_json::to_string_pretty(&rows)?);
            return Ok(());
        }

        if summaries.is_empty() {
            println!("No prompts found in {}", config.workspace.display());
            return Ok(());
        }

        for summary in summaries {
            match (&summary.name, &summary.description) {
                (Some(name), Some(description)) => {
                    println!("{}\t{} - {}", summary.id, name, description)
                }
                (Some(name), None) => println!("{}\t{}", summary.id, name),
                _ => println!("{}\t(invalid)", summary.id),
            }
        }

        Ok(())
    }
}

/// Load every prompt in the workspace. Documents that fail to load are
/// still listed, without a name.
fn summarize(config: &AppConfig) -> AppResult<Vec<PromptSummary>> {
    let ids = list_prompts(&config.workspace)?;
    Ok(ids
        .into_iter()
        .map(|id| match load_prompt(&config.workspace, &id) {
            Ok(definition) => PromptSummary {
                name: Some(definition.name),
                description: definition.description,
                id,
            },
            Err(e) => {
                tracing::warn!("Skipping prompt {}: {}", id, e);
                PromptSummary {
                    id,
                    name: None,
                    description: None,
                }
            }
        })
        .collect())
}
