//! Weighted AI review.
//!
//! Every non-sanctuary task is evaluated along four independent
//! perspectives (necessity, feasibility, decomposition, efficiency),
//! each scored 0-100 by the reasoning capability. The overall score is
//! a weighted mean over the active [`ReviewWeights`]. Sanctuary tasks
//! short-circuit to a fixed all-100 result without any backend call.
//!
//! Backend failures of any kind (timeout, bad status, unparseable JSON)
//! degrade to a neutral 50 per perspective and are never surfaced as
//! errors.

pub mod classify;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::category::Category;
use crate::provider::ProviderChain;
use crate::scoring::ScoreLabel;
use crate::task::{PortfolioType, SuperGoal, Task};

/// Neutral score used whenever a perspective cannot be evaluated.
const NEUTRAL_SCORE: u8 = 50;

/// AI personality profile. A pure lookup key: it selects the default
/// review weights and the register used in prompts, nothing more.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Personality {
    /// Polite, balanced assistant
    Standard,
    /// Laid-back, lenient; leads with feasibility
    Yuru,
    /// Strict, efficiency-first; leads with necessity
    Maji,
}

impl Personality {
    pub fn as_str(&self) -> &'static str {
        match self {
            Personality::Standard => "standard",
            Personality::Yuru => "yuru",
            Personality::Maji => "maji",
        }
    }

    pub fn parse(s: &str) -> Personality {
        match s {
            "yuru" => Personality::Yuru,
            "maji" => Personality::Maji,
            _ => Personality::Standard,
        }
    }

    /// Default review weights for this profile.
    pub fn default_weights(&self) -> ReviewWeights {
        match self {
            Personality::Standard => ReviewWeights {
                necessity: 1.0,
                feasibility: 1.0,
                decomposition: 1.0,
                efficiency: 1.0,
            },
            // Lenient: feasibility first, necessity judged softly.
            Personality::Yuru => ReviewWeights {
                necessity: 0.5,
                feasibility: 1.5,
                decomposition: 1.0,
                efficiency: 1.0,
            },
            // Strict: necessity first, pushes back on goal deviation.
            Personality::Maji => ReviewWeights {
                necessity: 1.5,
                feasibility: 0.75,
                decomposition: 1.0,
                efficiency: 1.25,
            },
        }
    }

    fn prompt_register(&self) -> &'static str {
        match self {
            Personality::Standard => {
                "Tone: warm but precise. Evaluate all perspectives evenly."
            }
            Personality::Yuru => {
                "Tone: casual and lenient. Lead with feasibility and keep \
                 suggestions low-pressure."
            }
            Personality::Maji => {
                "Tone: businesslike and strict. Lead with necessity and call \
                 out deviation from the linked goal."
            }
        }
    }

    fn sanctuary_message(&self) -> &'static str {
        match self {
            Personality::Yuru => "This is precious time. Enjoy it as it is!",
            _ => "This activity is protected as a sanctuary. Review was skipped.",
        }
    }
}

impl Default for Personality {
    fn default() -> Self {
        Personality::Standard
    }
}

/// Non-negative multipliers for the four perspectives.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct ReviewWeights {
    pub necessity: f64,
    pub feasibility: f64,
    pub decomposition: f64,
    pub efficiency: f64,
}

impl Default for ReviewWeights {
    fn default() -> Self {
        Personality::Standard.default_weights()
    }
}

/// One scored evaluation axis.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Perspective {
    /// 0-100
    pub score: u8,
    /// One-line summary
    pub summary: String,
    /// Optional improvement suggestion
    pub suggestion: Option<String>,
}

impl Perspective {
    fn neutral() -> Self {
        Perspective {
            score: NEUTRAL_SCORE,
            summary: "Could not evaluate".to_string(),
            suggestion: None,
        }
    }

    fn sanctuary() -> Self {
        Perspective {
            score: 100,
            summary: "Sanctuary task".to_string(),
            suggestion: None,
        }
    }
}

/// The cached result of a weighted review.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReviewResult {
    pub necessity: Perspective,
    pub feasibility: Perspective,
    pub decomposition: Perspective,
    pub efficiency: Perspective,
    /// Subtask titles proposed by the decomposition perspective
    pub suggested_sub_tasks: Vec<String>,
    /// Weighted mean of the four scores
    pub overall_score: u8,
    /// True when the review was short-circuited for a sanctuary task
    pub is_sanctuary: bool,
    /// Shown instead of critique for sanctuary tasks
    pub sanctuary_message: Option<String>,
    pub reviewed_at: DateTime<Utc>,
}

impl ReviewResult {
    /// The fixed result for sanctuary tasks: every perspective scores
    /// 100 and no backend call is made.
    pub fn sanctuary(personality: Personality, now: DateTime<Utc>) -> Self {
        ReviewResult {
            necessity: Perspective::sanctuary(),
            feasibility: Perspective::sanctuary(),
            decomposition: Perspective::sanctuary(),
            efficiency: Perspective::sanctuary(),
            suggested_sub_tasks: Vec::new(),
            overall_score: 100,
            is_sanctuary: true,
            sanctuary_message: Some(personality.sanctuary_message().to_string()),
            reviewed_at: now,
        }
    }

    /// The neutral result used when the backend call or parse fails.
    pub fn neutral(now: DateTime<Utc>) -> Self {
        ReviewResult {
            necessity: Perspective::neutral(),
            feasibility: Perspective::neutral(),
            decomposition: Perspective::neutral(),
            efficiency: Perspective::neutral(),
            suggested_sub_tasks: Vec::new(),
            overall_score: NEUTRAL_SCORE,
            is_sanctuary: false,
            sanctuary_message: None,
            reviewed_at: now,
        }
    }
}

/// Sanctuary detection: recharge portfolio, an existing flag, or a
/// case-insensitive keyword match against the title.
pub fn is_sanctuary(task: &Task, keywords: &[String]) -> bool {
    if task.portfolio == PortfolioType::Recharge {
        return true;
    }
    if task.is_sanctuary {
        return true;
    }
    let title = task.title.to_lowercase();
    keywords
        .iter()
        .any(|k| !k.is_empty() && title.contains(&k.to_lowercase()))
}

/// Everything the review prompt needs, assembled by the pipeline.
pub struct ReviewContext<'a> {
    pub task: &'a Task,
    pub category_name: Option<&'a str>,
    pub super_goal: Option<&'a SuperGoal>,
    pub today_task_count: u32,
    pub care_mode_active: bool,
    pub personality: Personality,
    pub wellness_label: Option<ScoreLabel>,
}

const REVIEW_SYSTEM_PROMPT: &str =
    "You are a task review AI that outputs JSON only. Respond with exactly \
     the JSON shape you are instructed to produce, no prose around it.";

fn build_review_prompt(ctx: &ReviewContext<'_>) -> String {
    let task = ctx.task;
    let mut parts: Vec<String> = Vec::new();

    parts.push(
        "You are a task review AI. Evaluate the following task from four perspectives."
            .to_string(),
    );
    parts.push(String::new());
    parts.push("[Task]".to_string());
    parts.push(format!("Title: {}", task.title));
    if let Some(desc) = &task.description {
        parts.push(format!("Description: {desc}"));
    }
    parts.push(format!(
        "Category: {}",
        ctx.category_name.unwrap_or("uncategorized")
    ));
    parts.push(format!("Portfolio: {}", task.portfolio.as_str()));
    if let Some(due) = task.due_date {
        parts.push(format!("Due: {due}"));
    }
    parts.push(String::new());

    if let Some(goal) = ctx.super_goal {
        parts.push("[Linked long-term goal]".to_string());
        parts.push(format!("Title: {}", goal.title));
        if let Some(desc) = &goal.description {
            parts.push(format!("Description: {desc}"));
        }
        if let Some(target) = goal.target_date {
            parts.push(format!("Target date: {target}"));
        }
        parts.push(String::new());
    }

    parts.push("[Situation]".to_string());
    parts.push(format!("Tasks today: {}", ctx.today_task_count));
    if ctx.care_mode_active {
        parts.push("Care mode: ON (the user is worn out)".to_string());
    }
    if let Some(label) = ctx.wellness_label {
        parts.push(format!("User condition: {}. {}", label.as_str(), label.guidance()));
    }
    parts.push(String::new());

    parts.push("[Perspectives]".to_string());
    parts.push(format!(
        "1. necessity: {}",
        if task.portfolio == PortfolioType::Drive {
            "judge alignment with the linked goal strictly"
        } else {
            "check whether this is essential to keep daily life running"
        }
    ));
    parts.push(format!(
        "2. feasibility: judge against today's task load{}",
        if ctx.care_mode_active {
            " (care mode is active)"
        } else {
            ""
        }
    ));
    parts.push(
        "3. decomposition: if the title is abstract, propose smallest-unit subtasks".to_string(),
    );
    parts.push("4. efficiency: propose shortcuts or a more efficient approach".to_string());
    parts.push(String::new());
    parts.push(ctx.personality.prompt_register().to_string());
    parts.push(String::new());

    parts.push("Respond with this JSON shape only:".to_string());
    parts.push(
        r#"{
  "necessity": { "score": 0-100, "summary": "one line", "suggestion": "improvement" },
  "feasibility": { "score": 0-100, "summary": "one line", "suggestion": "improvement" },
  "decomposition": { "score": 0-100, "summary": "one line", "suggestion": "improvement", "suggestedSubTasks": ["subtask 1"] },
  "efficiency": { "score": 0-100, "summary": "one line", "suggestion": "improvement" }
}"#
        .to_string(),
    );

    parts.join("\n")
}

/// Extract the first balanced `{...}` block from a response that may be
/// wrapped in prose or a markdown fence.
pub(crate) fn extract_json_block(text: &str) -> Option<&str> {
    let start = text.find('{')?;
    let mut depth = 0usize;
    let mut in_string = false;
    let mut escaped = false;
    for (offset, ch) in text[start..].char_indices() {
        if escaped {
            escaped = false;
            continue;
        }
        match ch {
            '\\' if in_string => escaped = true,
            '"' => in_string = !in_string,
            '{' if !in_string => depth += 1,
            '}' if !in_string => {
                depth -= 1;
                if depth == 0 {
                    return Some(&text[start..start + offset + ch.len_utf8()]);
                }
            }
            _ => {}
        }
    }
    None
}

fn clamp_score(value: &serde_json::Value) -> u8 {
    value
        .as_f64()
        .map(|v| v.clamp(0.0, 100.0).round() as u8)
        .unwrap_or(NEUTRAL_SCORE)
}

fn parse_perspective(value: Option<&serde_json::Value>) -> Perspective {
    let Some(obj) = value.and_then(|v| v.as_object()) else {
        return Perspective::neutral();
    };
    Perspective {
        score: obj.get("score").map(clamp_score).unwrap_or(NEUTRAL_SCORE),
        summary: obj
            .get("summary")
            .and_then(|v| v.as_str())
            .unwrap_or("No summary")
            .to_string(),
        suggestion: obj
            .get("suggestion")
            .and_then(|v| v.as_str())
            .map(|s| s.to_string()),
    }
}

struct ParsedReview {
    necessity: Perspective,
    feasibility: Perspective,
    decomposition: Perspective,
    efficiency: Perspective,
    suggested_sub_tasks: Vec<String>,
}

fn parse_review_response(text: &str) -> Option<ParsedReview> {
    let block = extract_json_block(text)?;
    let parsed: serde_json::Value = serde_json::from_str(block).ok()?;

    let suggested_sub_tasks = parsed
        .pointer("/decomposition/suggestedSubTasks")
        .and_then(|v| v.as_array())
        .map(|items| {
            items
                .iter()
                .filter_map(|s| s.as_str())
                .map(|s| s.to_string())
                .collect()
        })
        .unwrap_or_default();

    Some(ParsedReview {
        necessity: parse_perspective(parsed.get("necessity")),
        feasibility: parse_perspective(parsed.get("feasibility")),
        decomposition: parse_perspective(parsed.get("decomposition")),
        efficiency: parse_perspective(parsed.get("efficiency")),
        suggested_sub_tasks,
    })
}

/// Weighted mean of the four perspective scores. 50 when the weights
/// sum to zero.
fn overall_score(parsed: &ParsedReview, weights: &ReviewWeights) -> u8 {
    let total = weights.necessity + weights.feasibility + weights.decomposition + weights.efficiency;
    if total <= 0.0 {
        return NEUTRAL_SCORE;
    }
    let weighted = f64::from(parsed.necessity.score) * weights.necessity
        + f64::from(parsed.feasibility.score) * weights.feasibility
        + f64::from(parsed.decomposition.score) * weights.decomposition
        + f64::from(parsed.efficiency.score) * weights.efficiency;
    (weighted / total).round() as u8
}

/// Run the weighted review for a task.
///
/// Sanctuary tasks short-circuit to the fixed all-100 result without
/// calling the chain. Any backend or parse failure yields the neutral
/// all-50 result.
pub async fn execute_review(
    chain: &ProviderChain,
    ctx: &ReviewContext<'_>,
    weights: &ReviewWeights,
    now: DateTime<Utc>,
) -> ReviewResult {
    if ctx.task.is_sanctuary {
        return ReviewResult::sanctuary(ctx.personality, now);
    }

    let prompt = build_review_prompt(ctx);
    let text = match chain.complete(REVIEW_SYSTEM_PROMPT, &prompt).await {
        Ok(text) => text,
        Err(e) => {
            tracing::debug!(task_id = %ctx.task.id, error = %e, "review call failed, using neutral result");
            return ReviewResult::neutral(now);
        }
    };

    match parse_review_response(&text) {
        Some(parsed) => {
            let overall = overall_score(&parsed, weights);
            ReviewResult {
                necessity: parsed.necessity,
                feasibility: parsed.feasibility,
                decomposition: parsed.decomposition,
                efficiency: parsed.efficiency,
                suggested_sub_tasks: parsed.suggested_sub_tasks,
                overall_score: overall,
                is_sanctuary: false,
                sanctuary_message: None,
                reviewed_at: now,
            }
        }
        None => {
            tracing::debug!(task_id = %ctx.task.id, "review response unparseable, using neutral result");
            ReviewResult::neutral(now)
        }
    }
}

/// Resolve the category name for the prompt.
pub fn category_name_for<'a>(task: &Task, categories: &'a [Category]) -> Option<&'a str> {
    let id = task.category_id.as_deref()?;
    categories
        .iter()
        .find(|c| c.id == id)
        .map(|c| c.name.as_str())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    use crate::error::ProviderError;
    use crate::provider::CompletionProvider;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::sync::Arc;

    struct CountingProvider {
        calls: Arc<AtomicU32>,
        response: String,
    }

    #[async_trait]
    impl CompletionProvider for CountingProvider {
        fn name(&self) -> &str {
            "counting"
        }

        async fn complete(&self, _system: &str, _prompt: &str) -> Result<String, ProviderError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(self.response.clone())
        }
    }

    fn chain_with(calls: Arc<AtomicU32>, response: &str) -> ProviderChain {
        ProviderChain::from_providers(vec![(
            Box::new(CountingProvider {
                calls,
                response: response.to_string(),
            }),
            Duration::from_secs(1),
        )])
    }

    fn context(task: &Task) -> ReviewContext<'_> {
        ReviewContext {
            task,
            category_name: None,
            super_goal: None,
            today_task_count: 3,
            care_mode_active: false,
            personality: Personality::Standard,
            wellness_label: None,
        }
    }

    #[test]
    fn recharge_portfolio_is_sanctuary() {
        let mut task = Task::new("Evening walk");
        task.portfolio = PortfolioType::Recharge;
        assert!(is_sanctuary(&task, &[]));
    }

    #[test]
    fn keyword_match_is_case_insensitive() {
        let task = Task::new("Guitar Practice");
        let keywords = vec!["practice".to_string()];
        assert!(is_sanctuary(&task, &keywords));
        assert!(!is_sanctuary(&task, &["piano".to_string()]));
    }

    #[tokio::test]
    async fn sanctuary_review_makes_no_backend_call() {
        let calls = Arc::new(AtomicU32::new(0));
        let chain = chain_with(calls.clone(), "{}");

        let mut task = Task::new("Evening walk");
        task.is_sanctuary = true;
        let result = execute_review(&chain, &context(&task), &ReviewWeights::default(), Utc::now())
            .await;

        assert!(result.is_sanctuary);
        assert_eq!(result.necessity.score, 100);
        assert_eq!(result.feasibility.score, 100);
        assert_eq!(result.decomposition.score, 100);
        assert_eq!(result.efficiency.score, 100);
        assert_eq!(result.overall_score, 100);
        assert_eq!(calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn parses_scores_and_subtasks() {
        let calls = Arc::new(AtomicU32::new(0));
        let response = r#"Here you go:
{
  "necessity": { "score": 80, "summary": "Useful" },
  "feasibility": { "score": 60, "summary": "Doable", "suggestion": "Start small" },
  "decomposition": { "score": 40, "summary": "Too broad", "suggestedSubTasks": ["Outline", "Draft"] },
  "efficiency": { "score": 100, "summary": "Fine" }
}"#;
        let chain = chain_with(calls, response);
        let task = Task::new("Write report");

        let result = execute_review(&chain, &context(&task), &ReviewWeights::default(), Utc::now())
            .await;
        assert_eq!(result.necessity.score, 80);
        assert_eq!(result.feasibility.suggestion.as_deref(), Some("Start small"));
        assert_eq!(result.suggested_sub_tasks, vec!["Outline", "Draft"]);
        // Equal weights: (80 + 60 + 40 + 100) / 4
        assert_eq!(result.overall_score, 70);
        assert!(!result.is_sanctuary);
    }

    #[tokio::test]
    async fn out_of_range_scores_are_clamped() {
        let calls = Arc::new(AtomicU32::new(0));
        let response = r#"{
  "necessity": { "score": 250, "summary": "s" },
  "feasibility": { "score": -10, "summary": "s" },
  "decomposition": { "score": "high", "summary": "s" },
  "efficiency": { "score": 50, "summary": "s" }
}"#;
        let chain = chain_with(calls, response);
        let task = Task::new("t");
        let result = execute_review(&chain, &context(&task), &ReviewWeights::default(), Utc::now())
            .await;
        assert_eq!(result.necessity.score, 100);
        assert_eq!(result.feasibility.score, 0);
        assert_eq!(result.decomposition.score, 50);
    }

    #[tokio::test]
    async fn garbage_response_yields_neutral_result() {
        let calls = Arc::new(AtomicU32::new(0));
        let chain = chain_with(calls, "I cannot answer that.");
        let task = Task::new("t");
        let result = execute_review(&chain, &context(&task), &ReviewWeights::default(), Utc::now())
            .await;
        assert_eq!(result.overall_score, 50);
        assert_eq!(result.necessity.score, 50);
        assert!(!result.is_sanctuary);
    }

    #[test]
    fn weighted_overall_follows_weights() {
        let parsed = ParsedReview {
            necessity: Perspective {
                score: 100,
                summary: String::new(),
                suggestion: None,
            },
            feasibility: Perspective {
                score: 0,
                summary: String::new(),
                suggestion: None,
            },
            decomposition: Perspective {
                score: 0,
                summary: String::new(),
                suggestion: None,
            },
            efficiency: Perspective {
                score: 0,
                summary: String::new(),
                suggestion: None,
            },
            suggested_sub_tasks: Vec::new(),
        };

        let weights = ReviewWeights {
            necessity: 3.0,
            feasibility: 1.0,
            decomposition: 0.0,
            efficiency: 0.0,
        };
        assert_eq!(overall_score(&parsed, &weights), 75);

        let zero = ReviewWeights {
            necessity: 0.0,
            feasibility: 0.0,
            decomposition: 0.0,
            efficiency: 0.0,
        };
        assert_eq!(overall_score(&parsed, &zero), 50);
    }

    #[test]
    fn json_block_extraction_handles_fences_and_nesting() {
        let fenced = "```json\n{\"a\": {\"b\": 1}}\n```";
        assert_eq!(extract_json_block(fenced), Some("{\"a\": {\"b\": 1}}"));
        let with_brace_in_string = r#"{"a": "contains } brace"}"#;
        assert_eq!(
            extract_json_block(with_brace_in_string),
            Some(with_brace_in_string)
        );
        assert_eq!(extract_json_block("no json here"), None);
    }

    #[test]
    fn personality_weight_lookup() {
        assert_eq!(Personality::parse("yuru"), Personality::Yuru);
        let yuru = Personality::Yuru.default_weights();
        assert!(yuru.feasibility > yuru.necessity);
        let maji = Personality::Maji.default_weights();
        assert!(maji.necessity > maji.feasibility);
    }
}
