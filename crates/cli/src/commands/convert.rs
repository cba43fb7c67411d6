//! Convert command handler.
//!
//! Converts instruct text to message JSON and back. Reads stdin unless
//! `--input` names a file.

use clap::{Args, ValueEnum};
use pia_core::{config::AppConfig, AppError, AppResult};
use pia_prompt::InstructDocument;
use std::path::PathBuf;

#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
pub enum ConvertTarget {
    /// `{"attributes": {...}, "messages": [...]}`
    Json,
    /// Front matter plus `# Role` sections
    Instruct,
}

/// Convert between instruct text and message JSON
#[derive(Args, Debug)]
pub struct ConvertCommand {
    /// Input file (default: stdin)
    #[arg(short, long)]
    pub input: Option<PathBuf>,

    /// Output format
    #[arg(long, value_enum)]
    pub to: ConvertTarget,

    /// Omit `# Role` headings when writing instruct text
    #[arg(long)]
    pub no_headers: bool,
}

impl ConvertCommand {
    pub fn execute(&self, config: &AppConfig) -> AppResult<()> {
        tracing::info!("Executing convert command");
        tracing::debug!("Convert options: {:?}", self);

        let input = self.read_input()?;
        let include_headers = config.include_role_headers && !self.no_headers;
        let output = convert(&input, self.to, include_headers)?;

        match self.to {
            ConvertTarget::Json => println!("{}", output),
            ConvertTarget::Instruct => print!("{}", output),
        }
        Ok(())
    }

    fn read_input(&self) -> AppResult<String> {
        match &self.input {
            Some(path) => std::fs::read_to_string(path).map_err(|e| {
                AppError::Other(format!("Failed to read input file {:?}: {}", path, e))
            }),
            None => Ok(std::io::read_to_string(std::io::stdin())?),
        }
    }
}

fn convert(input: &str, to: ConvertTarget, include_headers: bool) -> AppResult<String> {
    match to {
        ConvertTarget::Json => {
            let document = InstructDocument::parse(input);
            tracing::debug!("Parsed {} messages", document.messages.len());
            Ok(serde_json::to_string_pretty(&document)?)
        }
        ConvertTarget::Instruct => {
            Ok(InstructDocument::from_json(input)?.to_text(include_headers))
        }
    }
}
