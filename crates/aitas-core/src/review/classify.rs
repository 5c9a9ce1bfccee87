//! Category inference.
//!
//! Asks the reasoning capability to place a task title into one of the
//! existing categories, or to propose a new subcategory when none fits.
//! Every parse failure degrades toward the default category rather than
//! an error; the pipeline only fails here when no categories exist at
//! all.

use serde_json::Value;

use crate::category::{fallback_category, Category};
use crate::provider::ProviderChain;
use crate::review::extract_json_block;

const CLASSIFY_SYSTEM_PROMPT: &str =
    "You are a task classifier that outputs JSON only. Respond with exactly \
     the JSON shape you are instructed to produce, no prose around it.";

/// What inference decided for a task.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InferenceDecision {
    /// Place the task into an existing category
    Existing { category_id: String },
    /// No fit; a new subcategory was proposed and the task goes to the
    /// default category in the meantime
    NewSubcategory {
        name: String,
        parent_id: Option<String>,
        reason: String,
        fallback_id: String,
    },
    /// Unusable response; the task goes to the default category
    Fallback { fallback_id: String },
}

impl InferenceDecision {
    /// The category the task is assigned to, and whether it got there
    /// through the fallback path.
    pub fn assignment(&self) -> (&str, bool) {
        match self {
            InferenceDecision::Existing { category_id } => (category_id, false),
            InferenceDecision::NewSubcategory { fallback_id, .. } => (fallback_id, true),
            InferenceDecision::Fallback { fallback_id } => (fallback_id, true),
        }
    }
}

fn build_classify_prompt(title: &str, description: Option<&str>, categories: &[Category]) -> String {
    let mut parts: Vec<String> = Vec::new();
    parts.push("Classify the following task into one of the existing categories.".to_string());
    parts.push(String::new());
    parts.push(format!("Task title: {title}"));
    if let Some(desc) = description {
        parts.push(format!("Task description: {desc}"));
    }
    parts.push(String::new());
    parts.push("Existing categories:".to_string());
    for category in categories {
        parts.push(format!("- id: {} name: {}", category.id, category.name));
    }
    parts.push(String::new());
    parts.push(
        "If one category fits, answer with action \"existing\" and its id. If none \
         fits, answer with action \"new_subcategory\" and propose a name."
            .to_string(),
    );
    parts.push("Respond with this JSON shape only:".to_string());
    parts.push(
        r#"{
  "action": "existing" | "new_subcategory",
  "categoryId": "id of the chosen category (for existing)",
  "newSubcategory": { "name": "proposed name", "parentCategoryId": "optional parent id", "reason": "one line" }
}"#
        .to_string(),
    );
    parts.join("\n")
}

/// Map a raw response onto a decision, validating ids against the known
/// categories. A `categoryId` that matches nothing is retried as a name
/// match before giving up.
fn parse_classify_response(text: &str, categories: &[Category], fallback_id: &str) -> InferenceDecision {
    let fallback = || InferenceDecision::Fallback {
        fallback_id: fallback_id.to_string(),
    };

    let Some(block) = extract_json_block(text) else {
        return fallback();
    };
    let Ok(parsed) = serde_json::from_str::<Value>(block) else {
        return fallback();
    };

    match parsed.get("action").and_then(Value::as_str) {
        Some("existing") => {
            let Some(wanted) = parsed.get("categoryId").and_then(Value::as_str) else {
                return fallback();
            };
            if categories.iter().any(|c| c.id == wanted) {
                return InferenceDecision::Existing {
                    category_id: wanted.to_string(),
                };
            }
            // Some models echo the name where the id belongs.
            if let Some(by_name) = categories.iter().find(|c| c.name == wanted) {
                return InferenceDecision::Existing {
                    category_id: by_name.id.clone(),
                };
            }
            fallback()
        }
        Some("new_subcategory") => {
            let Some(name) = parsed
                .pointer("/newSubcategory/name")
                .and_then(Value::as_str)
                .filter(|n| !n.trim().is_empty())
            else {
                return fallback();
            };
            let parent_id = parsed
                .pointer("/newSubcategory/parentCategoryId")
                .and_then(Value::as_str)
                .filter(|id| categories.iter().any(|c| &c.id == id))
                .map(|id| id.to_string());
            let reason = parsed
                .pointer("/newSubcategory/reason")
                .and_then(Value::as_str)
                .unwrap_or("no reason given")
                .to_string();
            InferenceDecision::NewSubcategory {
                name: name.trim().to_string(),
                parent_id,
                reason,
                fallback_id: fallback_id.to_string(),
            }
        }
        _ => fallback(),
    }
}

/// Infer a category for a task title.
///
/// Returns `None` when no categories exist; the caller treats that as a
/// hard pipeline error. Backend failures degrade to the fallback
/// decision.
pub async fn infer_category(
    chain: &ProviderChain,
    title: &str,
    description: Option<&str>,
    categories: &[Category],
) -> Option<InferenceDecision> {
    let fallback_id = fallback_category(categories)?.id.clone();

    let prompt = build_classify_prompt(title, description, categories);
    let text = match chain.complete(CLASSIFY_SYSTEM_PROMPT, &prompt).await {
        Ok(text) => text,
        Err(e) => {
            tracing::debug!(error = %e, "classification call failed, falling back to default category");
            return Some(InferenceDecision::Fallback { fallback_id });
        }
    };

    Some(parse_classify_response(&text, categories, &fallback_id))
}
