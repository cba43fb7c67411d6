//! Prompt loader for instruct documents stored in the workspace.

use crate::definition::PromptDefinition;
use pia_core::{AppError, AppResult};
use std::path::{Path, PathBuf};

/// Prompt documents directory, relative to the workspace root.
pub const PROMPTS_DIR: &str = ".pia/prompts";

/// File extension of prompt documents.
pub const PROMPT_EXTENSION: &str = "md";

/// Path of the document for `prompt_id`.
pub fn prompt_path(workspace_path: &Path, prompt_id: &str) -> PathBuf {
    workspace_path
        .join(PROMPTS_DIR)
        .join(format!("{}.{}", prompt_id, PROMPT_EXTENSION))
}

/// Load a prompt definition by ID from the workspace.
///
/// This function reads `.pia/prompts/<id>.md`, an instruct document whose
/// front matter names and describes the prompt.
///
/// # Example
/// ```no_run
/// use pia_prompt::load_prompt;
/// use std::path::Path;
///
/// # fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let prompt = load_prompt(Path::new("."), "brainstorm")?;
/// println!("Loaded prompt: {}", prompt.name);
/// # Ok(())
/// # }
/// ```
pub fn load_prompt(workspace_path: &Path, prompt_id: &str) -> AppResult<PromptDefinition> {
    validate_id(prompt_id)?;
    let prompt_file = prompt_path(workspace_path, prompt_id);

    tracing::debug!("Loading prompt from: {:?}", prompt_file);

    if !prompt_file.exists() {
        return Err(AppError::Prompt(format!(
            "Prompt file not found: {:?}",
            prompt_file
        )));
    }

    let contents = std::fs::read_to_string(&prompt_file).map_err(|e| {
        AppError::Prompt(format!(
            "Failed to read prompt file {:?}: {}",
            prompt_file, e
        ))
    })?;

    let definition = PromptDefinition::from_instruct_document(&contents, prompt_id)?;
    validate_prompt(&definition)?;

    tracing::info!("Loaded prompt: {} ({})", prompt_id, definition.name);

    Ok(definition)
}

/// List all available prompt IDs in the workspace, sorted.
pub fn list_prompts(workspace_path: &Path) -> AppResult<Vec<String>> {
    let prompts_dir = workspace_path.join(PROMPTS_DIR);

    if !prompts_dir.exists() {
        return Ok(Vec::new());
    }

    let mut prompt_ids: Vec<String> = walkdir::WalkDir::new(&prompts_dir)
        .max_depth(1)
        .into_iter()
        .filter_map(|e| e.ok())
        .filter(|entry| {
            entry.file_type().is_file()
                && entry.path().extension().and_then(|s| s.to_str()) == Some(PROMPT_EXTENSION)
        })
        .filter_map(|entry| {
            entry
                .path()
                .file_stem()
                .and_then(|s| s.to_str())
                .map(str::to_string)
        })
        .collect();

    prompt_ids.sort();
    Ok(prompt_ids)
}

fn validate_id(prompt_id: &str) -> AppResult<()> {
    if prompt_id.is_empty() {
        return Err(AppError::Prompt("Prompt ID cannot be empty".to_string()));
    }

    if prompt_id.contains(['/', '\\']) || prompt_id.starts_with('.') {
        return Err(AppError::Prompt(format!("Invalid prompt ID: {}", prompt_id)));
    }

    Ok(())
}

/// Validate a loaded prompt definition.
fn validate_prompt(def: &PromptDefinition) -> AppResult<()> {
    if def.name.trim().is_empty() {
        return Err(AppError::Prompt("Prompt name cannot be empty".to_string()));
    }

    let messages = def.main_candidate()?.raw().compile()?.into_messages();
    if messages.is_empty() {
        return Err(AppError::Prompt(format!(
            "Prompt {} has no messages",
            def.name
        )));
    }

    for message in &messages {
        message.validate()?;
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    fn create_test_prompt(dir: &Path, id: &str, content: &str) -> PathBuf {
        let path = prompt_path(dir, id);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(&path, content).unwrap();
        path
    }

    const VALID: &str = "---\nname: Brainstorm Ideas\ndescription: Ideas for a project\n---\n\n# System\nBrainstorm ideas for ${projectTitle}.";

    #[test]
    fn test_load_valid_prompt() {
        let temp_dir = TempDir::new().unwrap();
        create_test_prompt(temp_dir.path(), "brainstorm", VALID);

        let prompt = load_prompt(temp_dir.path(), "brainstorm").unwrap();
        assert_eq!(prompt.name, "Brainstorm Ideas");
        assert_eq!(prompt.description.as_deref(), Some("Ideas for a project"));
        assert_eq!(prompt.input_variables().unwrap(), vec!["projectTitle"]);
    }

    #[test]
    fn test_loaded_document_keeps_extra_keys() {
        let temp_dir = TempDir::new().unwrap();
        let document = "---\nname: Tagged\nauthor: ada\nrevision: 3\n---\n\n# User\nHi";
        create_test_prompt(temp_dir.path(), "tagged", document);

        let prompt = load_prompt(temp_dir.path(), "tagged").unwrap();
        assert_eq!(prompt.to_instruct_document(true).unwrap(), document);
    }

    #[test]
    fn test_load_uses_id_when_unnamed() {
        let temp_dir = TempDir::new().unwrap();
        create_test_prompt(temp_dir.path(), "plain", "# User\nHi");

        let prompt = load_prompt(temp_dir.path(), "plain").unwrap();
        assert_eq!(prompt.name, "plain");
    }

    #[test]
    fn test_load_nonexistent_prompt() {
        let temp_dir = TempDir::new().unwrap();
        assert!(load_prompt(temp_dir.path(), "nonexistent").is_err());
    }

    #[test]
    fn test_load_empty_prompt() {
        let temp_dir = TempDir::new().unwrap();
        create_test_prompt(temp_dir.path(), "empty", "---\nname: Empty\n---\n\n");

        let err = load_prompt(temp_dir.path(), "empty").unwrap_err();
        assert!(err.to_string().contains("has no messages"));
    }

    #[test]
    fn test_rejects_path_like_ids() {
        let temp_dir = TempDir::new().unwrap();
        assert!(load_prompt(temp_dir.path(), "../secret").is_err());
        assert!(load_prompt(temp_dir.path(), "").is_err());
    }

    #[test]
    fn test_list_prompts() {
        let temp_dir = TempDir::new().unwrap();
        create_test_prompt(temp_dir.path(), "zeta", VALID);
        create_test_prompt(temp_dir.path(), "alpha", VALID);
        fs::write(temp_dir.path().join(PROMPTS_DIR).join("notes.txt"), "x").unwrap();

        let prompts = list_prompts(temp_dir.path()).unwrap();
        assert_eq!(prompts, vec!["alpha", "zeta"]);
    }

    #[test]
    fn test_list_prompts_without_directory() {
        let temp_dir = TempDir::new().unwrap();
        assert!(list_prompts(temp_dir.path()).unwrap().is_empty());
    }
}
