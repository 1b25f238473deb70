//! crates/promptsmith_core/src/normalizer.rs
//!
//! The Response Normalizer: turns whatever JSON the remote model returned into a
//! copy-ready prompt string and a list of follow-up questions.
//!
//! The model is asked for a flat `{prompt, follow_up_questions}` object, but in
//! practice it also answers with a multi-field shape under a variety of key
//! spellings, or with something else entirely. [`normalize`] is total over JSON
//! values: it never fails and never returns an empty prompt.

use crate::domain::NormalizedResult;
use serde_json::{Map, Value};

/// The canonical key for a ready-made prompt.
pub const PROMPT_KEY: &str = "prompt";

const ROLE_KEYS: &[&str] = &["role", "Role", "AI Role", "ai_role", "aiRole", "persona"];
const CONTEXT_KEYS: &[&str] = &["context", "Context", "background", "Background"];
const TASK_KEYS: &[&str] = &["task", "Task", "objective", "Objective", "goal"];
const CONSTRAINT_KEYS: &[&str] = &["constraints", "Constraints", "rules", "Rules", "requirements"];
const OUTPUT_FORMAT_KEYS: &[&str] = &[
    "outputFormat",
    "output_format",
    "Output Format",
    "OutputFormat",
    "format",
    "Format",
];
const FOLLOW_UP_KEYS: &[&str] = &[
    "follow_up_questions",
    "followUpQuestions",
    "Follow-up Questions",
    "Follow-Up Questions",
    "followUps",
    "follow_ups",
    "questions",
];

//=========================================================================================
// Payload Classification
//=========================================================================================

/// A single rendered field that may be prose or a list of items.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FieldValue {
    Text(String),
    List(Vec<String>),
}

impl FieldValue {
    fn render(&self, label: &str) -> String {
        match self {
            FieldValue::Text(text) => format!("{}: {}", label, text),
            FieldValue::List(items) => {
                let bullets: Vec<String> = items.iter().map(|item| format!("- {}", item)).collect();
                format!("{}:\n{}", label, bullets.join("\n"))
            }
        }
    }
}

/// The multi-field shape, with every field optional.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct StructuredPrompt {
    pub role: Option<String>,
    pub context: Option<String>,
    pub task: Option<String>,
    pub constraints: Option<FieldValue>,
    pub output_format: Option<FieldValue>,
    pub follow_ups: Vec<String>,
}

impl StructuredPrompt {
    fn from_object(object: &Map<String, Value>) -> Self {
        Self {
            role: lookup_text(object, ROLE_KEYS),
            context: lookup_text(object, CONTEXT_KEYS),
            task: lookup_text(object, TASK_KEYS),
            constraints: lookup_text_or_list(object, CONSTRAINT_KEYS),
            output_format: lookup_text_or_list(object, OUTPUT_FORMAT_KEYS),
            follow_ups: lookup_follow_ups(object),
        }
    }

    fn has_content(&self) -> bool {
        self.role.is_some()
            || self.context.is_some()
            || self.task.is_some()
            || self.constraints.is_some()
            || self.output_format.is_some()
    }

    /// Assembles the present fields into labelled sections; missing fields are omitted.
    pub fn render(&self) -> String {
        let mut sections: Vec<String> = Vec::new();
        if let Some(role) = &self.role {
            sections.push(format!("Role: {}", role));
        }
        if let Some(context) = &self.context {
            sections.push(format!("Context: {}", context));
        }
        if let Some(task) = &self.task {
            sections.push(format!("Task: {}", task));
        }
        if let Some(constraints) = &self.constraints {
            sections.push(constraints.render("Constraints"));
        }
        if let Some(format) = &self.output_format {
            sections.push(format.render("Output Format"));
        }
        sections.join("\n\n")
    }
}

/// The closed set of shapes the remote payload is read as.
#[derive(Debug, Clone, PartialEq)]
pub enum RemotePayload {
    Flat { prompt: String, follow_ups: Vec<String> },
    Structured(StructuredPrompt),
    Unknown(Value),
}

impl RemotePayload {
    /// A non-empty canonical `prompt` wins over any multi-field content.
    pub fn classify(raw: &Value) -> Self {
        let Some(object) = raw.as_object() else {
            return RemotePayload::Unknown(raw.clone());
        };

        if let Some(prompt) = object.get(PROMPT_KEY).and_then(non_empty_text) {
            return RemotePayload::Flat {
                prompt,
                follow_ups: lookup_follow_ups(object),
            };
        }

        let structured = StructuredPrompt::from_object(object);
        if structured.has_content() {
            RemotePayload::Structured(structured)
        } else {
            RemotePayload::Unknown(raw.clone())
        }
    }
}

//=========================================================================================
// Normalization
//=========================================================================================

/// Converts an arbitrary JSON payload into a display-ready prompt.
pub fn normalize(raw: &Value) -> NormalizedResult {
    match RemotePayload::classify(raw) {
        RemotePayload::Flat { prompt, follow_ups } => NormalizedResult {
            prompt_text: prompt,
            follow_up_questions: follow_ups,
        },
        RemotePayload::Structured(structured) => {
            let rendered = structured.render();
            let prompt_text = if rendered.trim().is_empty() {
                fallback_text(raw)
            } else {
                rendered
            };
            NormalizedResult {
                prompt_text,
                follow_up_questions: structured.follow_ups,
            }
        }
        RemotePayload::Unknown(value) => NormalizedResult {
            prompt_text: fallback_text(&value),
            follow_up_questions: value.as_object().map(lookup_follow_ups).unwrap_or_default(),
        },
    }
}

/// Plain text stays as-is; everything else is shown pretty-printed.
fn fallback_text(raw: &Value) -> String {
    if let Some(text) = non_empty_text(raw) {
        return text;
    }
    serde_json::to_string_pretty(raw).unwrap_or_else(|_| raw.to_string())
}

//=========================================================================================
// Key Probing
//=========================================================================================

fn non_empty_text(value: &Value) -> Option<String> {
    value
        .as_str()
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
}

fn lookup_text(object: &Map<String, Value>, keys: &[&str]) -> Option<String> {
    keys.iter()
        .filter_map(|key| object.get(*key))
        .find_map(non_empty_text)
}

fn lookup_text_or_list(object: &Map<String, Value>, keys: &[&str]) -> Option<FieldValue> {
    keys.iter()
        .filter_map(|key| object.get(*key))
        .find_map(|value| match value {
            Value::Array(items) => {
                let rendered: Vec<String> = items.iter().filter_map(list_item_text).collect();
                (!rendered.is_empty()).then_some(FieldValue::List(rendered))
            }
            other => non_empty_text(other).map(FieldValue::Text),
        })
}

fn list_item_text(item: &Value) -> Option<String> {
    match item {
        Value::String(_) => non_empty_text(item),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

/// Only string elements are kept; the first alias holding at least one wins.
fn lookup_follow_ups(object: &Map<String, Value>) -> Vec<String> {
    keys_to_arrays(object, FOLLOW_UP_KEYS)
        .map(|items| items.iter().filter_map(non_empty_text).collect::<Vec<_>>())
        .find(|questions| !questions.is_empty())
        .unwrap_or_default()
}

fn keys_to_arrays<'a>(
    object: &'a Map<String, Value>,
    keys: &'a [&'a str],
) -> impl Iterator<Item = &'a Vec<Value>> + 'a {
    keys.iter()
        .filter_map(move |key| object.get(*key))
        .filter_map(Value::as_array)
}
