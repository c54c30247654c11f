use pailflow_core::types::WorkflowThreadId;
use pailflow_store::PailflowStore;
use tracing::instrument;

use crate::error::Result;

/// Accumulates LLM/STT cost onto a WorkflowThread's `usage_stats`
/// (spec.md §4.6).
///
/// This is a plain read-modify-write, not a row-level transaction or
/// atomic JSON increment. The only concurrent writers — the pipeline's
/// metrics tap during the call and the post-call pipeline afterward — are
/// temporally disjoint except for occasional metric bursts, so the race is
/// accepted rather than engineered around.
#[instrument(skip(store), fields(workflow_thread_id = %thread_id, cost_usd))]
pub fn update_workflow_usage_cost(
    store: &PailflowStore,
    thread_id: &WorkflowThreadId,
    cost_usd: f64,
    trace_id: Option<&str>,
) -> Result<bool> {
    let Some(mut thread) = store.workflow_threads.get(thread_id)? else {
        return Ok(false);
    };

    thread.usage_stats.total_cost_usd += cost_usd;
    if let Some(trace_id) = trace_id {
        thread.usage_stats.posthog_trace_id = Some(trace_id.to_string());
    }

    store.workflow_threads.update(&thread)?;
    Ok(true)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pailflow_core::types::WorkflowThread;

    #[test]
    fn missing_thread_returns_false() {
        let store = PailflowStore::open_in_memory(None).unwrap();
        let result =
            update_workflow_usage_cost(&store, &WorkflowThreadId::new(), 0.01, None).unwrap();
        assert!(!result);
    }

    #[test]
    fn cost_accumulates_and_is_nondecreasing() {
        let store = PailflowStore::open_in_memory(None).unwrap();
        let thread = WorkflowThread::new("room", "https://meet.example/room");
        store.workflow_threads.create(&thread).unwrap();

        update_workflow_usage_cost(&store, &thread.workflow_thread_id, 0.01, None).unwrap();
        let after_first = store
            .workflow_threads
            .get(&thread.workflow_thread_id)
            .unwrap()
            .unwrap()
            .usage_stats
            .total_cost_usd;

        update_workflow_usage_cost(&store, &thread.workflow_thread_id, 0.02, Some("trace-1"))
            .unwrap();
        let after_second = store
            .workflow_threads
            .get(&thread.workflow_thread_id)
            .unwrap()
            .unwrap();

        assert!(after_second.usage_stats.total_cost_usd >= after_first);
        assert_eq!(
            after_second.usage_stats.total_cost_usd,
            0.01_f64 + 0.02_f64
        );
        assert_eq!(
            after_second.usage_stats.posthog_trace_id.as_deref(),
            Some("trace-1")
        );
    }
}
