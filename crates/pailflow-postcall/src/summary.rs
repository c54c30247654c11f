use pailflow_core::types::{Insights, QaPair};

/// Deterministic candidate-summary template (spec.md §4.4 step 5),
/// grounded on `generate_summary.py`'s plain-text template.
pub fn build_template_summary(candidate_name: &str, role: &str, insights: &Insights, qa_pairs: &[QaPair]) -> String {
    let mut summary = format!(
        "Candidate Interview Summary\n\n\
         Candidate: {candidate_name}\n\
         Position: {role}\n\n\
         Overall Assessment:\n\
         - Overall Score: {:.1}/10\n\
         - Questions Answered: {}\n\n\
         Competency Scores:\n",
        insights.overall_score,
        qa_pairs.len()
    );

    for (competency, score) in &insights.competency_scores {
        summary.push_str(&format!("- {competency}: {score:.1}/10\n"));
    }

    summary.push_str("\nStrengths:\n");
    if insights.strengths.is_empty() {
        summary.push_str("- To be assessed\n");
    } else {
        for s in &insights.strengths {
            summary.push_str(&format!("- {s}\n"));
        }
    }

    summary.push_str("\nAreas for Improvement:\n");
    if insights.weaknesses.is_empty() {
        summary.push_str("- To be assessed\n");
    } else {
        for w in &insights.weaknesses {
            summary.push_str(&format!("- {w}\n"));
        }
    }

    summary.push_str("\nDetailed Q&A:\n");
    for (i, qa) in qa_pairs.iter().enumerate() {
        let answer_preview: String = qa.answer.chars().take(200).collect();
        summary.push_str(&format!("\n{}. {}\n   Answer: {}...\n", i + 1, qa.question, answer_preview));
    }

    summary
}
