//! Post-council analysis: variance detection across member answers and
//! optional debiasing protocols.
//!
//! Both run through the same endpoint layer as the council itself. Analyzer
//! output is model-generated JSON and therefore untrusted: malformed or
//! missing JSON is recovered locally with a deterministic fallback payload,
//! never propagated as an error.

use std::sync::Arc;

use futures::future::join_all;
use serde::Deserialize;
use tracing::warn;

use crate::domain::models::{Completion, Turn};
use crate::infrastructure::endpoints::Endpoint;

/// Agreement/disagreement report across council answers.
#[derive(Debug, Clone)]
pub struct VarianceReport {
    pub agreement_summary: String,
    pub disagreement_points: Vec<String>,
    pub confidence_signals: Vec<String>,
}

impl VarianceReport {
    /// Render the report as markdown.
    pub fn format(&self) -> String {
        let mut lines = vec!["## Variance Analysis".to_string(), String::new()];

        lines.push("### Agreement".to_string());
        if self.agreement_summary.is_empty() {
            lines.push("_No data_".to_string());
        } else {
            lines.push(self.agreement_summary.clone());
        }
        lines.push(String::new());

        if !self.disagreement_points.is_empty() {
            lines.push("### Points of Disagreement".to_string());
            for point in &self.disagreement_points {
                lines.push(format!("- {point}"));
            }
            lines.push(String::new());
        }

        if !self.confidence_signals.is_empty() {
            lines.push("### Signals to Watch".to_string());
            for signal in &self.confidence_signals {
                lines.push(format!("! {signal}"));
            }
        }

        lines.join("\n")
    }
}

const VARIANCE_SYSTEM_PROMPT: &str = "\
You are analyzing responses from multiple AI models to the same question.
Your task is to identify:
1. Where do the models AGREE? (These are more likely to be reliable)
2. Where do they DISAGREE? (These need human judgment)
3. What confidence signals should the user pay attention to?

Respond in this exact JSON format:
{
  \"agreement_summary\": \"Brief summary of where models agree\",
  \"disagreement_points\": [\"Point 1\", \"Point 2\"],
  \"confidence_signals\": [\"Signal 1\", \"Signal 2\"]
}

Be concise. Focus on actionable differences.";

#[derive(Debug, Default, Deserialize)]
struct VarianceVerdict {
    #[serde(default)]
    agreement_summary: String,
    #[serde(default)]
    disagreement_points: Vec<String>,
    #[serde(default)]
    confidence_signals: Vec<String>,
}

/// Ask the analyst endpoint where the successful completions agree and
/// disagree. Never fails: analyst errors and malformed JSON fall back to a
/// deterministic payload.
pub async fn analyze_variance(
    completions: &[Completion],
    analyst: &Arc<dyn Endpoint>,
) -> VarianceReport {
    let successful: Vec<&Completion> = completions.iter().filter(|c| c.ok()).collect();
    if successful.is_empty() {
        return VarianceReport {
            agreement_summary: "No responses to analyze.".to_string(),
            disagreement_points: Vec::new(),
            confidence_signals: Vec::new(),
        };
    }

    let mut context = vec!["Here are the responses from different models:\n".to_string()];
    for completion in &successful {
        context.push(format!(
            "### {} ({}):\n{}\n",
            completion.endpoint, completion.model, completion.content
        ));
    }

    let turns = [Turn::user(context.join("\n"))];
    let result = analyst.complete(&turns, VARIANCE_SYSTEM_PROMPT).await;

    let verdict = if result.ok() {
        match extract_json_object(&result.content)
            .and_then(|json| serde_json::from_str::<VarianceVerdict>(&json).ok())
        {
            Some(verdict) => verdict,
            None => {
                warn!("failed to parse variance analysis JSON, using fallback");
                VarianceVerdict {
                    agreement_summary:
                        "Automatic analysis could not be parsed. Review the responses manually."
                            .to_string(),
                    disagreement_points: Vec::new(),
                    confidence_signals: vec!["Automatic analysis failed".to_string()],
                }
            }
        }
    } else {
        VarianceVerdict {
            agreement_summary: format!(
                "Analysis failed: {}",
                result.error.as_deref().unwrap_or("unknown error")
            ),
            disagreement_points: Vec::new(),
            confidence_signals: vec!["Error during variance analysis".to_string()],
        }
    };

    VarianceReport {
        agreement_summary: verdict.agreement_summary,
        disagreement_points: verdict.disagreement_points,
        confidence_signals: verdict.confidence_signals,
    }
}

/// Locate a JSON object inside model output, tolerating markdown fences and
/// surrounding prose.
fn extract_json_object(text: &str) -> Option<String> {
    let without_fences: String = text
        .trim()
        .lines()
        .filter(|line| !line.trim_start().starts_with("```"))
        .collect::<Vec<_>>()
        .join("\n");

    let start = without_fences.find('{')?;
    let end = without_fences.rfind('}')?;
    if end < start {
        return None;
    }
    Some(without_fences[start..=end].to_string())
}

/// Result of one debiasing technique.
#[derive(Debug, Clone)]
pub struct DebiasResult {
    pub technique: String,
    pub analysis: String,
    pub error: Option<String>,
}

impl DebiasResult {
    pub const fn ok(&self) -> bool {
        self.error.is_none()
    }
}

/// Named debiasing techniques and their prompt payloads.
const DEBIASING_PROMPTS: [(&str, &str); 6] = [
    (
        "premortem",
        "Run a pre-mortem on this decision or plan. Assume a year has passed and it \
         turned out to be a disaster. Describe the five most likely reasons it failed. \
         Be specific and realistic.",
    ),
    (
        "counterargs",
        "Give the three strongest counterarguments against the recommendation above. \
         Present them as a smart, competent person who genuinely disagrees would. Do not \
         weaken them; state each in its strongest form.",
    ),
    (
        "uncertainty",
        "For each key claim in the answer above: rate its confidence (0-100%), say what \
         could change that rating, and mark which parts are facts versus opinion or \
         speculation. Format: [CLAIM] -> [X%] | [what could change it]",
    ),
    (
        "assumptions",
        "What hidden assumptions does the answer above make? List every assumption that \
         must hold for the recommendation to be sound, and rate how risky each would be \
         if it turned out false.",
    ),
    (
        "reference_class",
        "What is the reference class for this situation -- how do similar cases usually \
         go, statistically? Is this case genuinely exceptional or typical? What are the \
         base rates for success and failure in comparable situations?",
    ),
    (
        "change_mind",
        "What would have to happen, or what information would you need, to flip this \
         recommendation to its opposite? Be concrete about the data, events, or \
         arguments that would be convincing.",
    ),
];

/// Names of all registered debiasing techniques, in registry order.
pub fn available_techniques() -> Vec<&'static str> {
    DEBIASING_PROMPTS.iter().map(|(name, _)| *name).collect()
}

fn debias_prompt(technique: &str) -> Option<&'static str> {
    DEBIASING_PROMPTS
        .iter()
        .find(|(name, _)| *name == technique)
        .map(|(_, prompt)| *prompt)
}

async fn run_single_debiasing(
    technique: String,
    original: &str,
    endpoint: &Arc<dyn Endpoint>,
    user_context: &str,
) -> DebiasResult {
    let Some(prompt) = debias_prompt(&technique) else {
        return DebiasResult {
            analysis: String::new(),
            error: Some(format!("Unknown technique: {technique}")),
            technique,
        };
    };

    let mut parts = Vec::new();
    if !user_context.is_empty() {
        parts.push(format!("User context: {user_context}"));
    }
    parts.push(format!("Original answer:\n\n{original}"));
    parts.push("---".to_string());
    parts.push(prompt.to_string());

    let turns = [Turn::user(parts.join("\n\n"))];
    let response = endpoint.complete(&turns, "").await;

    if response.ok() {
        DebiasResult {
            technique,
            analysis: response.content,
            error: None,
        }
    } else {
        DebiasResult {
            technique,
            analysis: String::new(),
            error: response.error,
        }
    }
}

/// Run the requested debiasing techniques concurrently against one answer.
/// Unknown technique names are skipped with a warning; one technique's
/// failure never affects the others.
pub async fn run_debiasing(
    original: &str,
    techniques: &[String],
    endpoint: &Arc<dyn Endpoint>,
    user_context: &str,
) -> Vec<DebiasResult> {
    let valid: Vec<String> = techniques
        .iter()
        .filter(|t| debias_prompt(t).is_some())
        .cloned()
        .collect();

    if valid.is_empty() {
        warn!(requested = ?techniques, "no valid debiasing techniques");
        return Vec::new();
    }

    join_all(
        valid
            .into_iter()
            .map(|technique| run_single_debiasing(technique, original, endpoint, user_context)),
    )
    .await
}

/// Render debiasing results as markdown.
pub fn format_debias_results(results: &[DebiasResult]) -> String {
    if results.is_empty() {
        return "## Debiasing\n\n_No debiasing results._".to_string();
    }

    let mut lines = vec!["## Debiasing".to_string(), String::new()];
    for result in results {
        lines.push(format!("### {}", result.technique));
        if result.ok() {
            lines.push(result.analysis.clone());
        } else {
            lines.push(format!(
                "_Error: {}_",
                result.error.as_deref().unwrap_or("unknown")
            ));
        }
        lines.push(String::new());
    }

    lines.join("\n")
}
