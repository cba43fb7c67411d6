//! Vars command handler.

use clap::Args;
use pia_core::{config::AppConfig, AppResult};
use pia_prompt::{dedupe, load_prompt};

/// List the variables a prompt uses
#[derive(Args, Debug)]
pub struct VarsCommand {
    /// Prompt ID
    pub id: String,

    /// Drop repeated names, keeping first occurrence order
    #[arg(short, long)]
    pub unique: bool,

    /// Output as JSON
    #[arg(long)]
    pub json: bool,
}

impl VarsCommand {
    pub fn execute(&self, config: &AppConfig) -> AppResult<()> {
        tracing::info!("Executing vars command");

        let definition = load_prompt(&config.workspace, &self.id)?;
        let mut names = definition
            .main_candidate()?
            .get_all_variable_placeholders()?;
        if self.unique {
            names = dedupe(names);
        }
        tracing::debug!("Found {} placeholders", names.len());

        if self.json {
            println!("{}", serde_json::to_string_pretty(&names)?);
        } else {
            for name in names {
                println!("{}", name);
            }
        }

        Ok(())
    }
}
