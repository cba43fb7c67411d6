//! Render command handler.
//!
//! Compiles a prompt's main candidate with the prompt's default variables
//! overlaid by `--var` values. Missing variables render as empty text
//! unless `--strict` is given.

use clap::Args;
use pia_core::{config::AppConfig, AppError, AppResult};
use pia_prompt::{load_prompt, PromptDefinition, Variables};

/// Compile a prompt with variables
#[derive(Args, Debug)]
pub struct RenderCommand {
    /// Prompt ID
    pub id: String,

    /// Variable binding, repeatable (e.g. --var topic=rust)
    #[arg(long = "var", value_name = "KEY=VALUE", value_parser = parse_key_val)]
    pub vars: Vec<(String, String)>,

    /// Fail if any placeholder has no value
    #[arg(long)]
    pub strict: bool,

    /// Output the compiled messages as JSON
    #[arg(long)]
    pub json: bool,

    /// Omit `# Role` headings
    #[arg(long)]
    pub no_headers: bool,
}

impl RenderCommand {
    pub fn execute(&self, config: &AppConfig) -> AppResult<()> {
        tracing::info!("Executing render command");
        tracing::debug!("Render options: {:?}", self);

        let definition = load_prompt(&config.workspace, &self.id)?;
        let include_headers = config.include_role_headers && !self.no_headers;

        println!("{}", self.render(&definition, include_headers)?);
        Ok(())
    }

    fn render(&self, definition: &PromptDefinition, include_headers: bool) -> AppResult<String> {
        let overrides: Variables = self.vars.iter().cloned().collect();

        if self.strict {
            let bound = definition
                .main_candidate()?
                .with_variables(definition.resolve_vars(&overrides));
            if let Some(missing) = bound.unbound_variables()?.into_iter().next() {
                return Err(AppError::missing_variable(missing, &definition.name));
            }
        }

        let compiled = definition.compile(&overrides)?;
        if self.json {
            Ok(serde_json::to_string_pretty(&compiled.into_messages())?)
        } else {
            Ok(compiled.to_instruct_with(include_headers))
        }
    }
}

/// Parse a `KEY=VALUE` pair. The value may itself contain `=`.
fn parse_key_val(s: &str) -> Result<(String, String), String> {
    let (key, value) = s
        .split_once('=')
        .ok_or_else(|| format!("invalid KEY=VALUE: no `=` found in `{}`", s))?;
    if key.is_empty() {
        return Err(format!("invalid KEY=VALUE: empty key in `{}`", s));
    }
    Ok((key.to_string(), value.to_string()))
}
