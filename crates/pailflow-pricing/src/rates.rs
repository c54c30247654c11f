use std::collections::HashMap;
use std::sync::OnceLock;

/// One model's per-token pricing, in dollars per `unit` tokens (spec.md §4.5).
///
/// `cached_input` is carried even though nothing in this crate reads it yet —
/// it mirrors the upstream pricing table 1:1 so a future prompt-caching
/// surcharge doesn't need a schema change.
#[derive(Debug, Clone, Copy)]
pub struct ModelRate {
    pub input: f64,
    pub output: f64,
    #[allow(dead_code)]
    pub cached_input: Option<f64>,
    pub unit: f64,
}

const fn rate(input: f64, output: f64) -> ModelRate {
    ModelRate {
        input,
        output,
        cached_input: None,
        unit: 1_000_000.0,
    }
}

const fn rate_cached(input: f64, output: f64, cached_input: f64) -> ModelRate {
    ModelRate {
        input,
        output,
        cached_input: Some(cached_input),
        unit: 1_000_000.0,
    }
}

static MODEL_RATES: OnceLock<HashMap<&'static str, ModelRate>> = OnceLock::new();

/// The full model pricing table, ported verbatim from the original's
/// `MODEL_PRICING` (GPT-5/4.1/4o/realtime/audio/o-series/legacy tiers).
pub fn model_rates() -> &'static HashMap<&'static str, ModelRate> {
    MODEL_RATES.get_or_init(|| {
        HashMap::from([
            // GPT-5 series
            ("gpt-5.1", rate_cached(1.25, 10.00, 0.125)),
            ("gpt-5", rate_cached(1.25, 10.00, 0.125)),
            ("gpt-5-mini", rate_cached(0.25, 2.00, 0.025)),
            ("gpt-5-nano", rate_cached(0.05, 0.40, 0.005)),
            ("gpt-5.1-chat-latest", rate_cached(1.25, 10.00, 0.125)),
            ("gpt-5-chat-latest", rate_cached(1.25, 10.00, 0.125)),
            ("gpt-5.1-codex-max", rate_cached(1.25, 10.00, 0.125)),
            ("gpt-5.1-codex", rate_cached(1.25, 10.00, 0.125)),
            ("gpt-5-codex", rate_cached(1.25, 10.00, 0.125)),
            ("gpt-5-pro", rate(15.00, 120.00)),
            ("gpt-5.1-codex-mini", rate_cached(0.25, 2.00, 0.025)),
            ("gpt-5-search-api", rate_cached(1.25, 10.00, 0.125)),
            // GPT-4.1 series
            ("gpt-4.1", rate_cached(2.00, 8.00, 0.50)),
            ("gpt-4.1-mini", rate_cached(0.40, 1.60, 0.10)),
            ("gpt-4.1-nano", rate_cached(0.10, 0.40, 0.025)),
            // GPT-4o series
            ("gpt-4o", rate_cached(2.50, 10.00, 1.25)),
            ("gpt-4o-2024-05-13", rate(5.00, 15.00)),
            ("gpt-4o-mini", rate_cached(0.15, 0.60, 0.075)),
            // GPT realtime series
            ("gpt-realtime", rate_cached(4.00, 16.00, 0.40)),
            ("gpt-realtime-mini", rate_cached(0.60, 2.40, 0.06)),
            ("gpt-4o-realtime-preview", rate_cached(5.00, 20.00, 2.50)),
            (
                "gpt-4o-mini-realtime-preview",
                rate_cached(0.60, 2.40, 0.30),
            ),
            // GPT audio series
            ("gpt-audio", rate(2.50, 10.00)),
            ("gpt-audio-mini", rate(0.60, 2.40)),
            ("gpt-4o-audio-preview", rate(2.50, 10.00)),
            ("gpt-4o-mini-audio-preview", rate(0.15, 0.60)),
            // O-series
            ("o1", rate_cached(15.00, 60.00, 7.50)),
            ("o1-pro", rate(150.00, 600.00)),
            ("o1-mini", rate_cached(1.10, 4.40, 0.55)),
            ("o3", rate_cached(2.00, 8.00, 0.50)),
            ("o3-pro", rate(20.00, 80.00)),
            ("o3-mini", rate_cached(1.10, 4.40, 0.55)),
            ("o3-deep-research", rate_cached(10.00, 40.00, 2.50)),
            ("o4-mini", rate_cached(1.10, 4.40, 0.275)),
            ("o4-mini-deep-research", rate_cached(2.00, 8.00, 0.50)),
            // Other
            ("codex-mini-latest", rate_cached(1.50, 6.00, 0.375)),
            ("computer-use-preview", rate(3.00, 12.00)),
            // Legacy
            ("chatgpt-4o-latest", rate(5.00, 15.00)),
            ("gpt-4-turbo-2024-04-09", rate(10.00, 30.00)),
            ("gpt-4-0125-preview", rate(10.00, 30.00)),
            ("gpt-4-1106-preview", rate(10.00, 30.00)),
            ("gpt-4-1106-vision-preview", rate(10.00, 30.00)),
            ("gpt-4-0613", rate(30.00, 60.00)),
            ("gpt-4-0314", rate(30.00, 60.00)),
            ("gpt-4-32k", rate(60.00, 120.00)),
            ("gpt-3.5-turbo", rate(0.50, 1.50)),
            ("gpt-3.5-turbo-0125", rate(0.50, 1.50)),
            ("gpt-3.5-turbo-1106", rate(1.00, 2.00)),
            ("gpt-3.5-turbo-0613", rate(1.50, 2.00)),
            ("gpt-3.5-0301", rate(1.50, 2.00)),
            ("gpt-3.5-turbo-instruct", rate(1.50, 2.00)),
            ("gpt-3.5-turbo-16k-0613", rate(3.00, 4.00)),
            ("davinci-002", rate(2.00, 2.00)),
            ("babbage-002", rate(0.40, 0.40)),
        ])
    })
}

/// Deepgram Nova-2 STT pricing, per minute.
pub const DEEPGRAM_NOVA2_PER_MIN: f64 = 0.0058;
/// Speaker diarization surcharge, per minute.
pub const DEEPGRAM_DIARIZATION_PER_MIN: f64 = 0.0020;
pub const DEEPGRAM_TOTAL_PER_MIN: f64 = DEEPGRAM_NOVA2_PER_MIN + DEEPGRAM_DIARIZATION_PER_MIN;
