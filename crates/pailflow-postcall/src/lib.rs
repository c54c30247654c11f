pub mod error;
pub mod insights;
pub mod notify;
pub mod parse;
pub mod pipeline;
pub mod summary;

pub use error::{PostCallError, Result};
pub use insights::{extract_insights, placeholder_insights, ExtractedInsights, InsightsLlm, LlmCompletion};
pub use notify::{post_webhook, send_email, EmailSender};
pub use parse::parse_transcript;
pub use pipeline::run_post_call;
pub use summary::build_template_summary;
