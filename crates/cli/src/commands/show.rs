//! Show command handler.

use clap::Args;
use pia_core::{config::AppConfig, AppResult};
use pia_prompt::load_prompt;

/// Print a prompt's template as an instruct document
#[derive(Args, Debug)]
pub struct ShowCommand {
    /// Prompt ID (file stem under .pia/prompts)
    pub id: String,

    /// Omit `# Role` headings
    #[arg(long)]
    pub no_headers: bool,
}

impl ShowCommand {
    pub fn execute(&self, config: &AppConfig) -> AppResult<()> {
        tracing::info!("Executing show command");
        tracing::debug!("Show options: {:?}", self);

        let definition = load_prompt(&config.workspace, &self.id)?;
        let include_headers = config.include_role_headers && !self.no_headers;

        print!("{}", definition.to_instruct_document(include_headers)?);
        Ok(())
    }
}
