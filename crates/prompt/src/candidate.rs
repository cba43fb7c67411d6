//! Candidate prompts: named compilers bound to a set of variables.
//!
//! A candidate's compiler receives a [`CompileContext`] and reads variables
//! through it instead of string interpolation. The same compiler can then be
//! rendered two ways:
//!
//! - bound (`with_variables`): variables resolve to their values, and an
//!   unbound variable is an error;
//! - template (`raw`): every variable resolves to its `${name}` placeholder,
//!   recovering the prompt's template text without the source.
//!
//! # Example
//! ```
//! use pia_prompt::{CandidatePrompt, Message, Variables};
//!
//! let greet = CandidatePrompt::new("basic", |ctx| {
//!     Ok(vec![Message::user(format!("Please greet {}.", ctx.var("name")?))].into())
//! });
//!
//! let vars = Variables::from([("name".to_string(), "James".to_string())]);
//! let bound = greet.with_variables(vars).compile().unwrap();
//! assert_eq!(bound.into_messages(), vec![Message::user("Please greet James.")]);
//!
//! let template = greet.raw().compile().unwrap();
//! assert_eq!(template.into_messages(), vec![Message::user("Please greet ${name}.")]);
//! ```

use crate::instruct::{instruct_to_messages, messages_to_instruct};
use crate::message::Message;
use crate::vars::{
    dedupe, extract_placeholders, placeholder, substitute_messages_lenient, Variables,
};
use pia_core::{AppError, AppResult};
use serde::Serialize;
use std::borrow::Cow;
use std::fmt;
use std::sync::Arc;

/// Output of a compiler: chat messages or plain instruct text.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum Compiled {
    Messages(Vec<Message>),
    Text(String),
}

impl Compiled {
    /// Instruct text form; messages are flattened with role headings.
    pub fn to_instruct(&self) -> String {
        self.to_instruct_with(true)
    }

    pub fn to_instruct_with(&self, include_role_headers: bool) -> String {
        match self {
            Self::Messages(messages) => messages_to_instruct(messages, None, include_role_headers),
            Self::Text(text) => text.clone(),
        }
    }

    /// Message form; text is parsed as an instruct document.
    pub fn into_messages(self) -> Vec<Message> {
        match self {
            Self::Messages(messages) => messages,
            Self::Text(text) => instruct_to_messages(&text).messages,
        }
    }
}

impl From<Vec<Message>> for Compiled {
    fn from(messages: Vec<Message>) -> Self {
        Self::Messages(messages)
    }
}

impl From<String> for Compiled {
    fn from(text: String) -> Self {
        Self::Text(text)
    }
}

impl From<&str> for Compiled {
    fn from(text: &str) -> Self {
        Self::Text(text.to_string())
    }
}

/// How variables resolve during a compile.
#[derive(Debug, Clone)]
pub enum Bindings {
    /// Every variable resolves to its placeholder token.
    Template,
    /// Variables resolve to bound values.
    Bound(Arc<Variables>),
}

impl Default for Bindings {
    fn default() -> Self {
        Self::Bound(Arc::default())
    }
}

/// Variable access handed to a compiler.
#[derive(Debug, Clone, Copy)]
pub struct CompileContext<'a> {
    prompt: &'a str,
    bindings: &'a Bindings,
}

impl<'a> CompileContext<'a> {
    /// Resolve `name` strictly.
    ///
    /// Template mode yields `${name}`. Bound mode yields the value, or
    /// [`AppError::MissingVariable`] when `name` is unbound.
    pub fn resolve_strict(&self, name: &str) -> AppResult<Cow<'a, str>> {
        match self.bindings {
            Bindings::Template => Ok(Cow::Owned(placeholder(name))),
            Bindings::Bound(vars) => vars
                .get(name)
                .map(|value| Cow::Borrowed(value.as_str()))
                .ok_or_else(|| AppError::missing_variable(name, self.prompt)),
        }
    }

    /// Shorthand for [`CompileContext::resolve_strict`].
    pub fn var(&self, name: &str) -> AppResult<Cow<'a, str>> {
        self.resolve_strict(name)
    }

    pub fn is_template(&self) -> bool {
        matches!(self.bindings, Bindings::Template)
    }

    /// Bound variables, `None` in template mode.
    pub fn variables(&self) -> Option<&'a Variables> {
        match self.bindings {
            Bindings::Template => None,
            Bindings::Bound(vars) => Some(vars.as_ref()),
        }
    }

    pub fn prompt_name(&self) -> &'a str {
        self.prompt
    }
}

type Compiler = dyn Fn(&CompileContext<'_>) -> AppResult<Compiled> + Send + Sync;

/// A named prompt compiler plus its variable bindings.
///
/// Views are values: `with_variables` and `raw` return new candidates that
/// share the compiler and never affect the candidate they came from.
#[derive(Clone)]
pub struct CandidatePrompt {
    name: String,
    compiler: Arc<Compiler>,
    bindings: Bindings,
}

impl CandidatePrompt {
    /// Create a candidate bound to no variables.
    pub fn new<F>(name: impl Into<String>, compiler: F) -> Self
    where
        F: Fn(&CompileContext<'_>) -> AppResult<Compiled> + Send + Sync + 'static,
    {
        Self {
            name: name.into(),
            compiler: Arc::new(compiler),
            bindings: Bindings::default(),
        }
    }

    /// A candidate backed by an instruct document, such as a prompt edited
    /// in a text editor.
    ///
    /// Its template form is the parsed document as written. Its bound form
    /// substitutes placeholders leniently, so unbound ones become empty.
    /// Front matter is ignored.
    pub fn from_instruct_text(name: impl Into<String>, text: &str) -> Self {
        let messages: Arc<Vec<Message>> = Arc::new(instruct_to_messages(text).messages);
        Self::new(name, move |ctx| {
            let compiled = match ctx.variables() {
                None => messages.as_ref().clone(),
                Some(vars) => substitute_messages_lenient(&messages, vars),
            };
            Ok(Compiled::Messages(compiled))
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn bindings(&self) -> &Bindings {
        &self.bindings
    }

    pub fn is_raw(&self) -> bool {
        matches!(self.bindings, Bindings::Template)
    }

    /// A copy bound to exactly `variables`. Earlier bindings are discarded,
    /// not merged.
    pub fn with_variables(&self, variables: Variables) -> Self {
        Self {
            bindings: Bindings::Bound(Arc::new(variables)),
            ..self.clone()
        }
    }

    /// A copy that renders placeholders instead of values.
    pub fn raw(&self) -> Self {
        Self {
            bindings: Bindings::Template,
            ..self.clone()
        }
    }

    /// Run the compiler. A failed compile produces no output at all.
    pub fn compile(&self) -> AppResult<Compiled> {
        let ctx = CompileContext {
            prompt: &self.name,
            bindings: &self.bindings,
        };
        tracing::trace!(prompt = %self.name, raw = self.is_raw(), "Compiling candidate prompt");
        (self.compiler)(&ctx)
    }

    /// Placeholders in the template form, in order, duplicates kept.
    pub fn get_all_variable_placeholders(&self) -> AppResult<Vec<String>> {
        let template = self.raw().compile()?;
        Ok(extract_placeholders(&template.to_instruct()))
    }

    /// Unique placeholders with no value in the current bindings.
    pub fn unbound_variables(&self) -> AppResult<Vec<String>> {
        let names = dedupe(self.get_all_variable_placeholders()?);
        Ok(match &self.bindings {
            Bindings::Template => names,
            Bindings::Bound(vars) => names
                .into_iter()
                .filter(|name| !vars.contains_key(name))
                .collect(),
        })
    }
}

impl fmt::Debug for CandidatePrompt {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CandidatePrompt")
            .field("name", &self.name)
            .field("bindings", &self.bindings)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn vars(pairs: &[(&str, &str)]) -> Variables {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    fn greeting() -> CandidatePrompt {
        CandidatePrompt::new("Greet the user", |ctx| {
            Ok(vec![
                Message::system("You write short greetings."),
                Message::user(format!(
                    "Please write a greeting message for {} in {}.",
                    ctx.var("name")?,
                    ctx.var("language")?
                )),
            ]
            .into())
        })
    }

    #[test]
    fn test_bound_compile() {
        let compiled = greeting()
            .with_variables(vars(&[("name", "James"), ("language", "French")]))
            .compile()
            .unwrap();
        assert_eq!(
            compiled.into_messages()[1],
            Message::user("Please write a greeting message for James in French.")
        );
    }

    #[test]
    fn test_raw_compile_emits_placeholders() {
        let compiled = greeting()
            .with_variables(vars(&[("name", "James")]))
            .raw()
            .compile()
            .unwrap();
        assert!(compiled.to_instruct().contains("${name}"));
        assert!(compiled.to_instruct().contains("${language}"));
    }

    #[test]
    fn test_missing_variable_is_an_error() {
        let err = greeting().compile().unwrap_err();
        match err {
            AppError::MissingVariable { variable, prompt } => {
                assert_eq!(variable, "name");
                assert_eq!(prompt, "Greet the user");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_empty_value_is_bound() {
        let compiled = greeting()
            .with_variables(vars(&[("name", ""), ("language", "")]))
            .compile();
        assert!(compiled.is_ok());
    }

    #[test]
    fn test_with_variables_replaces_bindings() {
        let first = greeting().with_variables(vars(&[("name", "A"), ("language", "B")]));
        let second = first.with_variables(vars(&[("name", "C")]));

        // not merged with the earlier binding
        assert!(matches!(
            second.compile(),
            Err(AppError::MissingVariable { ref variable, .. }) if variable == "language"
        ));
        // the earlier view is untouched
        assert!(first.compile().is_ok());
    }

    #[test]
    fn test_raw_does_not_affect_original() {
        let bound = greeting().with_variables(vars(&[("name", "A"), ("language", "B")]));
        let raw = bound.raw();
        assert!(raw.is_raw());
        assert!(!bound.is_raw());
        assert!(!bound.compile().unwrap().to_instruct().contains("${"));
    }

    #[test]
    fn test_get_all_variable_placeholders() {
        let candidate = CandidatePrompt::new("twice", |ctx| {
            Ok(format!("{} then {} then {}", ctx.var("a")?, ctx.var("b")?, ctx.var("a")?).into())
        });
        assert_eq!(
            candidate.get_all_variable_placeholders().unwrap(),
            vec!["a", "b", "a"]
        );
    }

    #[test]
    fn test_text_compiler() {
        let candidate = CandidatePrompt::new("summary", |ctx| {
            Ok(format!("Summarize:\n{}\n\nSummary:", ctx.var("notes")?).into())
        });
        let compiled = candidate
            .with_variables(vars(&[("notes", "derivatives")]))
            .compile()
            .unwrap();
        assert_eq!(compiled, Compiled::Text("Summarize:\nderivatives\n\nSummary:".into()));
        assert_eq!(
            compiled.into_messages(),
            vec![Message::system("Summarize:\nderivatives\n\nSummary:")]
        );
    }

    #[test]
    fn test_from_instruct_text() {
        let candidate = CandidatePrompt::from_instruct_text(
            "edited",
            "---\nname: Greeting\n---\n\n# System\nGreet ${name}.\n\n# User\n${ greeting }",
        );

        let raw = candidate.raw().compile().unwrap().into_messages();
        assert_eq!(
            raw,
            vec![Message::system("Greet ${name}."), Message::user("${ greeting }")]
        );

        // lenient: unbound placeholders become empty
        let bound = candidate
            .with_variables(vars(&[("name", "Ada")]))
            .compile()
            .unwrap()
            .into_messages();
        assert_eq!(bound, vec![Message::system("Greet Ada."), Message::user("")]);
    }

    #[test]
    fn test_unbound_variables() {
        let candidate = CandidatePrompt::from_instruct_text("edited", "${a} ${b} ${a}");
        assert_eq!(candidate.unbound_variables().unwrap(), vec!["a", "b"]);
        assert_eq!(
            candidate
                .with_variables(vars(&[("a", "1")]))
                .unbound_variables()
                .unwrap(),
            vec!["b"]
        );
    }

    #[test]
    fn test_views_are_send_and_sync() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<CandidatePrompt>();
    }
}
