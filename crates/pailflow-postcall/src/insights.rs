use async_trait::async_trait;
use pailflow_core::types::{Insights, QaPair, QuestionAssessment};
use tracing::warn;

use crate::error::Result;

/// The surface `extract_insights` needs from an LLM provider — deliberately
/// narrower than `pailflow_pipeline::node::llm::LlmEngine` (a single-turn
/// prompt/completion call, no chat history) so this crate doesn't have to
/// depend on `pailflow-pipeline` for one method.
#[async_trait]
pub trait InsightsLlm: Send + Sync {
    async fn complete_json(&self, prompt: &str) -> Result<LlmCompletion>;
}

pub struct LlmCompletion {
    pub text: String,
    pub model: String,
    pub prompt_tokens: u64,
    pub completion_tokens: u64,
}

const DEFAULT_PROMPT_TEMPLATE: &str = r#"Analyze this conversation transcript and provide a comprehensive assessment.

Conversation Transcript:
{qa_text}

Please provide a JSON response with the following structure:
{
    "overall_score": <number 0-10>,
    "competency_scores": {"<competency_name>": <score 0-10>, ...},
    "strengths": ["<strength1>", ...],
    "weaknesses": ["<weakness1>", ...],
    "question_assessments": [
        {"question": "<question text>", "answer": "<answer text>", "score": <number 0-10>, "notes": "<brief assessment notes>"},
        ...
    ]
}

Return ONLY valid JSON, no additional text."#;

fn qa_text(qa_pairs: &[QaPair]) -> String {
    qa_pairs
        .iter()
        .enumerate()
        .map(|(i, qa)| format!("Q{}: {}\nA{}: {}", i + 1, qa.question, i + 1, qa.answer))
        .collect::<Vec<_>>()
        .join("\n\n")
}

/// Builds the final prompt given an optional user-supplied analysis prompt,
/// substituting `{transcript}` or `{qa_text}` placeholders, or appending the
/// transcript when neither placeholder is present (spec.md §4.4 step 3).
fn build_prompt(analysis_prompt: Option<&str>, transcript: &str, qa_pairs: &[QaPair]) -> String {
    let qa_text = qa_text(qa_pairs);
    match analysis_prompt {
        Some(prompt) if prompt.contains("{transcript}") => {
            prompt.replace("{transcript}", transcript)
        }
        Some(prompt) if prompt.contains("{qa_text}") => prompt.replace("{qa_text}", &qa_text),
        Some(prompt) => format!("{prompt}\n\nConversation Transcript:\n{qa_text}"),
        None => DEFAULT_PROMPT_TEMPLATE.replace("{qa_text}", &qa_text),
    }
}

/// Outcome of one insight-extraction attempt, carrying whatever usage the
/// LLM call reported so the caller can feed it to the usage tracker.
pub struct ExtractedInsights {
    pub insights: Insights,
    pub model: Option<String>,
    pub prompt_tokens: u64,
    pub completion_tokens: u64,
}

/// Implements spec.md §4.4 step 3 end to end: build prompt, call the LLM,
/// validate/clamp the response, or fall back to placeholder insights on any
/// parse or validation failure.
pub async fn extract_insights(
    llm: &dyn InsightsLlm,
    transcript: &str,
    qa_pairs: &[QaPair],
    analysis_prompt: Option<&str>,
) -> ExtractedInsights {
    let prompt = build_prompt(analysis_prompt, transcript, qa_pairs);

    let completion = match llm.complete_json(&prompt).await {
        Ok(completion) => completion,
        Err(err) => {
            warn!(error = %err, "LLM call failed — using placeholder insights");
            return ExtractedInsights {
                insights: placeholder_insights(qa_pairs),
                model: None,
                prompt_tokens: 0,
                completion_tokens: 0,
            };
        }
    };

    match serde_json::from_str::<serde_json::Value>(&completion.text) {
        Ok(raw) => ExtractedInsights {
            insights: validate_insights(raw, qa_pairs),
            model: Some(completion.model),
            prompt_tokens: completion.prompt_tokens,
            completion_tokens: completion.completion_tokens,
        },
        Err(err) => {
            warn!(error = %err, "LLM returned unparsable JSON — using placeholder insights");
            ExtractedInsights {
                insights: placeholder_insights(qa_pairs),
                model: Some(completion.model),
                prompt_tokens: completion.prompt_tokens,
                completion_tokens: completion.completion_tokens,
            }
        }
    }
}

fn clamp_score(v: f64) -> f64 {
    v.clamp(0.0, 10.0)
}

/// Normalizes a raw LLM JSON response (spec.md §4.4 step 3 validation
/// rules), grounded on `extract_insights.py::_validate_insights`.
fn validate_insights(raw: serde_json::Value, qa_pairs: &[QaPair]) -> Insights {
    let mut insights: Insights = serde_json::from_value(raw.clone()).unwrap_or_default();

    insights.overall_score = clamp_score(insights.overall_score);
    for score in insights.competency_scores.values_mut() {
        *score = clamp_score(*score);
    }

    if insights.question_assessments.len() != qa_pairs.len() {
        insights.question_assessments = qa_pairs
            .iter()
            .map(|qa| {
                let matching = insights
                    .question_assessments
                    .iter()
                    .find(|a| a.question == qa.question);
                match matching {
                    Some(a) => QuestionAssessment {
                        question: a.question.clone(),
                        answer: a.answer.clone(),
                        score: clamp_score(a.score),
                        notes: a.notes.clone(),
                    },
                    None => QuestionAssessment {
                        question: qa.question.clone(),
                        answer: qa.answer.clone(),
                        score: 0.0,
                        notes: String::new(),
                    },
                }
            })
            .collect();
    } else {
        for assessment in &mut insights.question_assessments {
            assessment.score = clamp_score(assessment.score);
        }
    }

    // `extra` already carries every unrecognized top-level key via
    // `#[serde(flatten)]` on `Insights`, preserving custom schema extensions.
    insights
}

/// Builds placeholder insights when AI analysis is unavailable or fails
/// (spec.md §4.4 step 3 fallback), text ported verbatim from
/// `extract_insights.py::_create_placeholder_insights`.
pub fn placeholder_insights(qa_pairs: &[QaPair]) -> Insights {
    let question_assessments = qa_pairs
        .iter()
        .map(|qa| {
            let notes = if qa.question == "Full Interview Transcript" {
                "No structured Q&A pairs found in transcript - full transcript used as fallback"
            } else {
                "Assessment pending - AI analysis unavailable"
            };
            QuestionAssessment {
                question: qa.question.clone(),
                answer: qa.answer.clone(),
                score: 0.0,
                notes: notes.to_string(),
            }
        })
        .collect();

    Insights {
        overall_score: 0.0,
        competency_scores: Default::default(),
        strengths: vec!["Analysis pending - AI analysis unavailable".to_string()],
        weaknesses: vec!["Analysis pending - AI analysis unavailable".to_string()],
        question_assessments,
        extra: Default::default(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct StaticLlm(&'static str);

    #[async_trait]
    impl InsightsLlm for StaticLlm {
        async fn complete_json(&self, _prompt: &str) -> Result<LlmCompletion> {
            Ok(LlmCompletion {
                text: self.0.to_string(),
                model: "gpt-4.1".to_string(),
                prompt_tokens: 100,
                completion_tokens: 50,
            })
        }
    }

    struct FailingLlm;

    #[async_trait]
    impl InsightsLlm for FailingLlm {
        async fn complete_json(&self, _prompt: &str) -> Result<LlmCompletion> {
            Err(crate::error::PostCallError::Llm("timeout".to_string()))
        }
    }

    fn sample_pairs() -> Vec<QaPair> {
        vec![
            QaPair {
                question: "Q1".to_string(),
                answer: "A1".to_string(),
                question_id: None,
            },
            QaPair {
                question: "Q2".to_string(),
                answer: "A2".to_string(),
                question_id: None,
            },
        ]
    }

    #[tokio::test]
    async fn invalid_json_falls_back_to_placeholder() {
        let result =
            extract_insights(&StaticLlm("not json"), "transcript", &sample_pairs(), None).await;
        assert_eq!(result.insights.overall_score, 0.0);
        assert_eq!(result.insights.question_assessments.len(), 2);
        assert!(result
            .insights
            .question_assessments
            .iter()
            .all(|a| a.notes == "Assessment pending - AI analysis unavailable"));
    }

    #[tokio::test]
    async fn llm_failure_falls_back_to_placeholder() {
        let result = extract_insights(&FailingLlm, "transcript", &sample_pairs(), None).await;
        assert_eq!(result.insights.overall_score, 0.0);
        assert!(result.model.is_none());
    }

    #[tokio::test]
    async fn out_of_range_scores_are_clamped() {
        let json = serde_json::json!({
            "overall_score": 15.0,
            "competency_scores": {"clarity": -3.0},
            "strengths": ["good"],
            "weaknesses": [],
            "question_assessments": [
                {"question": "Q1", "answer": "A1", "score": 99.0, "notes": "n1"},
                {"question": "Q2", "answer": "A2", "score": -5.0, "notes": "n2"}
            ]
        });
        let result = extract_insights(
            &StaticLlm(Box::leak(json.to_string().into_boxed_str())),
            "transcript",
            &sample_pairs(),
            None,
        )
        .await;
        assert_eq!(result.insights.overall_score, 10.0);
        assert_eq!(*result.insights.competency_scores.get("clarity").unwrap(), 0.0);
        assert_eq!(result.insights.question_assessments[0].score, 10.0);
        assert_eq!(result.insights.question_assessments[1].score, 0.0);
    }

    #[tokio::test]
    async fn mismatched_assessment_count_is_rebuilt_from_qa_pairs() {
        let json = serde_json::json!({
            "overall_score": 7.0,
            "competency_scores": {},
            "strengths": [],
            "weaknesses": [],
            "question_assessments": [
                {"question": "Q1", "answer": "A1", "score": 8.0, "notes": "good"}
            ]
        });
        let result = extract_insights(
            &StaticLlm(Box::leak(json.to_string().into_boxed_str())),
            "transcript",
            &sample_pairs(),
            None,
        )
        .await;
        assert_eq!(result.insights.question_assessments.len(), 2);
        assert_eq!(result.insights.question_assessments[0].notes, "good");
        assert_eq!(result.insights.question_assessments[1].score, 0.0);
    }

    #[tokio::test]
    async fn unknown_fields_are_preserved_in_extra() {
        let json = serde_json::json!({
            "overall_score": 5.0,
            "competency_scores": {},
            "strengths": [],
            "weaknesses": [],
            "question_assessments": [],
            "person_name": "Alex"
        });
        let result = extract_insights(
            &StaticLlm(Box::leak(json.to_string().into_boxed_str())),
            "transcript",
            &[],
            None,
        )
        .await;
        assert_eq!(result.insights.extra.get("person_name").unwrap(), "Alex");
    }
}
