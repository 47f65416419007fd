//! Typed stage descriptors and prompt templates.

use std::collections::HashMap;
use std::sync::LazyLock;

use regex::Regex;

use crate::ai::ChatMessage;

static RE_PLACEHOLDER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\{([a-z][a-z0-9_]*)\}").unwrap());

/// Prompt text with `{name}` placeholders filled from pipeline variables.
/// Substituted values are never re-scanned.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PromptTemplate {
    source: String,
}

impl PromptTemplate {
    pub fn new(source: impl Into<String>) -> Self {
        Self {
            source: source.into(),
        }
    }

    /// Placeholder names in order of first appearance.
    pub fn placeholders(&self) -> Vec<String> {
        let mut names: Vec<String> = Vec::new();
        for caps in RE_PLACEHOLDER.captures_iter(&self.source) {
            let name = caps[1].to_string();
            if !names.contains(&name) {
                names.push(name);
            }
        }
        names
    }

    /// Renders the template. Returns the first unknown placeholder as the error.
    pub fn render(&self, variables: &HashMap<String, String>) -> Result<String, String> {
        let mut output = String::with_capacity(self.source.len());
        let mut last = 0;
        for caps in RE_PLACEHOLDER.captures_iter(&self.source) {
            let whole = caps.get(0).map(|m| m.range()).unwrap_or(0..0);
            let name = &caps[1];
            let value = variables.get(name).ok_or_else(|| name.to_string())?;
            output.push_str(&self.source[last..whole.start]);
            output.push_str(value);
            last = whole.end;
        }
        output.push_str(&self.source[last..]);
        Ok(output)
    }
}

/// How a stage produces its text.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StageMode {
    /// Packages the rendered task as a confirmation artifact without calling
    /// the inference backend.
    Confirm,
    /// Sends the rendered task to the inference backend.
    Infer,
}

/// Post-processing applied to a stage's raw text before it is recorded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OutputPolicy {
    /// Recorded as returned (trimmed).
    Verbatim,
    /// Must be a Markdown section under `heading`.
    Section { heading: &'static str },
    /// A section under `heading`, placed after the dependency's recorded
    /// output, which is copied verbatim.
    AfterDependency {
        dependency: &'static str,
        heading: &'static str,
    },
}

/// One unit of pipeline work. Built fresh for every run.
#[derive(Debug, Clone)]
pub struct Stage {
    pub name: &'static str,
    pub role: &'static str,
    pub goal: &'static str,
    pub backstory: &'static str,
    pub task: PromptTemplate,
    pub expected_output: &'static str,
    /// Stages whose output must exist before this one runs, passed as context.
    pub depends_on: Vec<&'static str>,
    pub mode: StageMode,
    pub output: OutputPolicy,
}

impl Stage {
    /// The system and user messages for an inference call.
    pub fn messages(&self, rendered_task: &str, context: &[&str]) -> Vec<ChatMessage> {
        let system = format!(
            "You are {}. {}\nYour personal goal is: {}",
            self.role, self.backstory, self.goal
        );

        let mut user = format!(
            "Current Task: {}\n\nThis is the expected criteria for your final answer: {}\n\
             You MUST return the actual complete content as the final answer, not a summary.",
            rendered_task, self.expected_output
        );
        if !context.is_empty() {
            user.push_str("\n\nThis is the context you're working with:\n");
            user.push_str(&context.join("\n\n"));
        }

        vec![ChatMessage::system(system), ChatMessage::user(user)]
    }
}
