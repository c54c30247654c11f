use pailflow_core::types::WorkflowThreadId;
use pailflow_pricing::calculate_llm_cost;
use pailflow_store::PailflowStore;
use pailflow_usage::{create_usage_transaction, TransactionOutcome, TransactionStore, UserStore};
use tracing::{info, instrument, warn};

use crate::error::Result;
use crate::insights::{extract_insights, InsightsLlm};
use crate::notify::{post_webhook, send_email, EmailSender};
use crate::parse::parse_transcript;
use crate::summary::build_template_summary;

/// Turns a finished session's transcript into structured results and side
/// effects (spec.md §4.4, the Post-Call Pipeline). Every step is gated so
/// the whole function can be re-entered safely — see the module-level
/// idempotence note in spec.md §4.4.
#[instrument(skip(store, users, transactions, llm, http_client, email_sender), fields(workflow_thread_id = %thread_id))]
pub async fn run_post_call(
    store: &PailflowStore,
    users: &UserStore,
    transactions: &TransactionStore,
    llm: &dyn InsightsLlm,
    http_client: &reqwest::Client,
    email_sender: Option<&dyn EmailSender>,
    rate_per_minute: f64,
    thread_id: &WorkflowThreadId,
) -> Result<()> {
    let Some(mut thread) = store.workflow_threads.get(thread_id)? else {
        warn!("workflow thread missing — nothing to post-process");
        return Ok(());
    };

    // Step 1: fetch transcript.
    let transcript_text = thread.transcript_text.clone().unwrap_or_default();
    if transcript_text.trim().is_empty() {
        info!("empty transcript — short-circuiting post-call pipeline");
        return Ok(());
    }

    // Step 2: parse to Q/A pairs.
    let bot_speaker_name = thread
        .bot_config
        .get("name")
        .and_then(serde_json::Value::as_str)
        .unwrap_or("Bot")
        .to_string();
    let qa_pairs = parse_transcript(&transcript_text, &bot_speaker_name);

    // Step 3: extract insights.
    let analysis_prompt = thread
        .metadata
        .get("analysis_prompt")
        .and_then(serde_json::Value::as_str)
        .map(String::from);
    let extracted = extract_insights(llm, &transcript_text, &qa_pairs, analysis_prompt.as_deref()).await;

    // Step 4: record LLM cost.
    if let Some(model) = extracted.model.as_deref() {
        if extracted.prompt_tokens > 0 || extracted.completion_tokens > 0 {
            let cost = calculate_llm_cost(model, extracted.prompt_tokens, extracted.completion_tokens)?;
            let trace_id = thread
                .usage_stats
                .posthog_trace_id
                .clone()
                .unwrap_or_else(|| uuid::Uuid::new_v4().to_string());
            pailflow_usage::update_workflow_usage_cost(store, thread_id, cost, Some(&trace_id))?;
        }
    }

    // Step 5: generate summary.
    let candidate_name = thread
        .metadata
        .get("candidate_name")
        .and_then(serde_json::Value::as_str)
        .unwrap_or("Unknown")
        .to_string();
    let role = thread
        .metadata
        .get("candidate_role")
        .and_then(serde_json::Value::as_str)
        .unwrap_or("Unknown")
        .to_string();
    let summary_format_prompt = thread
        .metadata
        .get("summary_format_prompt")
        .and_then(serde_json::Value::as_str);

    let candidate_summary = match summary_format_prompt {
        Some(prompt) => match llm.complete_json(prompt).await {
            Ok(completion) => completion.text,
            Err(err) => {
                warn!(error = %err, "summary-format LLM call failed — falling back to template");
                build_template_summary(&candidate_name, &role, &extracted.insights, &qa_pairs)
            }
        },
        None => build_template_summary(&candidate_name, &role, &extracted.insights, &qa_pairs),
    };

    // Step 6: email.
    if !thread.email_sent {
        if let (Some(to), Some(sender)) = (thread.email_results_to.as_deref(), email_sender) {
            let interview_type = thread
                .metadata
                .get("interview_type")
                .and_then(serde_json::Value::as_str)
                .unwrap_or("Interview");
            match send_email(sender, to, &candidate_name, interview_type, &candidate_summary).await {
                Ok(()) => thread.email_sent = true,
                Err(err) => warn!(error = %err, "email delivery failed"),
            }
        }
    }

    // Step 7: webhook.
    if !thread.webhook_sent {
        if let Some(url) = thread.webhook_callback_url.clone() {
            let body = serde_json::json!({
                "workflow_thread_id": thread.workflow_thread_id.to_string(),
                "room_name": thread.room_name,
                "qa_pairs": qa_pairs,
                "insights": extracted.insights,
                "candidate_summary": candidate_summary,
                "usage_stats": thread.usage_stats,
            });
            match post_webhook(http_client, &url, &body).await {
                Ok(delivered) => thread.webhook_sent = delivered,
                Err(err) => warn!(error = %err, "webhook delivery errored"),
            }
        }
    }

    // Step 9: persist final state (step 8, transaction creation, runs after
    // duration is known — see below, matching the original's ordering where
    // the secondary transaction attempt follows result persistence).
    thread.qa_pairs = qa_pairs;
    thread.insights = Some(extracted.insights);
    thread.candidate_summary = Some(candidate_summary);
    thread.transcript_processed = true;
    store.workflow_threads.update(&thread)?;

    // Step 8: secondary usage-transaction attempt (idempotent, §4.7).
    if thread.bot_duration_s.unwrap_or(0) > 0 {
        match create_usage_transaction(users, transactions, &thread, rate_per_minute) {
            Ok(TransactionOutcome::Created { transaction_id, .. }) => {
                info!(transaction_id, "secondary usage transaction created");
            }
            Ok(other) => tracing::debug!(?other, "usage transaction already handled"),
            Err(err) => warn!(error = %err, "secondary usage transaction attempt failed"),
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use pailflow_core::types::WorkflowThread;
    use rusqlite::Connection;

    struct StubLlm;

    #[async_trait]
    impl InsightsLlm for StubLlm {
        async fn complete_json(&self, _prompt: &str) -> Result<crate::insights::LlmCompletion> {
            Ok(crate::insights::LlmCompletion {
                text: serde_json::json!({
                    "overall_score": 8.0,
                    "competency_scores": {},
                    "strengths": ["clear"],
                    "weaknesses": [],
                    "question_assessments": [
                        {"question": "What is your name?", "answer": "Alex.", "score": 8.0, "notes": "good"}
                    ]
                })
                .to_string(),
                model: "gpt-4.1".to_string(),
                prompt_tokens: 200,
                completion_tokens: 80,
            })
        }
    }

    fn thread_with_transcript() -> WorkflowThread {
        let mut thread = WorkflowThread::new("room-1", "https://meet.example/room-1");
        thread.bot_config = serde_json::json!({"name": "Bot"}).as_object().unwrap().clone();
        thread.transcript_text = Some(
            "[t] Bot: What is your name?\n[t] Participant 1: Alex.\n".to_string(),
        );
        thread.bot_duration_s = Some(60);
        thread
    }

    #[tokio::test]
    async fn empty_transcript_short_circuits() {
        let store = PailflowStore::open_in_memory(None).unwrap();
        let users = UserStore::new(Connection::open_in_memory().unwrap()).unwrap();
        let transactions = TransactionStore::new(Connection::open_in_memory().unwrap()).unwrap();
        let thread = WorkflowThread::new("room-2", "https://meet.example/room-2");
        let id = thread.workflow_thread_id.clone();
        store.workflow_threads.create(&thread).unwrap();

        let client = reqwest::Client::new();
        run_post_call(&store, &users, &transactions, &StubLlm, &client, None, 0.15, &id)
            .await
            .unwrap();

        let updated = store.workflow_threads.get(&id).unwrap().unwrap();
        assert!(!updated.transcript_processed);
    }

    #[tokio::test]
    async fn full_run_persists_results_and_transaction() {
        let store = PailflowStore::open_in_memory(None).unwrap();
        let users = UserStore::new(Connection::open_in_memory().unwrap()).unwrap();
        let transactions = TransactionStore::new(Connection::open_in_memory().unwrap()).unwrap();
        users.create("unkey-1", 5.0).unwrap();

        let mut thread = thread_with_transcript();
        thread.unkey_key_id = Some("unkey-1".to_string());
        let id = thread.workflow_thread_id.clone();
        store.workflow_threads.create(&thread).unwrap();

        let client = reqwest::Client::new();
        run_post_call(&store, &users, &transactions, &StubLlm, &client, None, 0.15, &id)
            .await
            .unwrap();

        let updated = store.workflow_threads.get(&id).unwrap().unwrap();
        assert!(updated.transcript_processed);
        assert_eq!(updated.qa_pairs.len(), 1);
        assert!(updated.insights.is_some());
        assert!(updated.candidate_summary.is_some());
        assert!(transactions.exists_for_thread(id.as_str()).unwrap());
        assert!(updated.usage_stats.total_cost_usd > 0.0);
    }

    #[tokio::test]
    async fn rerunning_is_idempotent_on_transaction() {
        let store = PailflowStore::open_in_memory(None).unwrap();
        let users = UserStore::new(Connection::open_in_memory().unwrap()).unwrap();
        let transactions = TransactionStore::new(Connection::open_in_memory().unwrap()).unwrap();
        users.create("unkey-1", 5.0).unwrap();

        let mut thread = thread_with_transcript();
        thread.unkey_key_id = Some("unkey-1".to_string());
        let id = thread.workflow_thread_id.clone();
        store.workflow_threads.create(&thread).unwrap();

        let client = reqwest::Client::new();
        run_post_call(&store, &users, &transactions, &StubLlm, &client, None, 0.15, &id)
            .await
            .unwrap();
        run_post_call(&store, &users, &transactions, &StubLlm, &client, None, 0.15, &id)
            .await
            .unwrap();

        let user = users.get_by_unkey_id("unkey-1").unwrap().unwrap();
        // Only one transaction's worth of debit applied despite two runs.
        assert!((user.credit_balance - 4.85).abs() < 1e-6);
    }
}
