mod error;
mod rates;

pub use error::{PricingError, Result};
pub use rates::{model_rates, ModelRate, DEEPGRAM_DIARIZATION_PER_MIN, DEEPGRAM_NOVA2_PER_MIN, DEEPGRAM_TOTAL_PER_MIN};

/// Default customer rate for bot-call minutes, used when no override is
/// configured (spec.md §4.5, `placement.bot_call_rate_per_minute`).
pub const DEFAULT_BOT_CALL_RATE_PER_MINUTE: f64 = 0.15;

fn round6(value: f64) -> f64 {
    (value * 1_000_000.0).round() / 1_000_000.0
}

/// Cost of one LLM call, given token counts (spec.md §4.5 "LLM usage cost").
pub fn calculate_llm_cost(model: &str, prompt_tokens: u64, completion_tokens: u64) -> Result<f64> {
    let rate = model_rates()
        .get(model)
        .ok_or_else(|| PricingError::UnknownModel(model.to_string()))?;

    let input_cost = (prompt_tokens as f64 / rate.unit) * rate.input;
    let output_cost = (completion_tokens as f64 / rate.unit) * rate.output;
    Ok(round6(input_cost + output_cost))
}

/// Cost of Deepgram STT usage (Nova-2 + diarization) over `duration_seconds`.
pub fn calculate_stt_cost(duration_seconds: i64) -> Result<f64> {
    if duration_seconds < 0 {
        return Err(PricingError::NegativeDuration(duration_seconds));
    }
    let minutes = duration_seconds as f64 / 60.0;
    Ok(round6(minutes * DEEPGRAM_TOTAL_PER_MIN))
}

/// Customer cost for a bot call of `duration_seconds`, at `rate_per_minute`
/// (spec.md §4.5 "bot call cost", configurable via
/// `placement.bot_call_rate_per_minute`).
pub fn calculate_bot_call_cost(duration_seconds: i64, rate_per_minute: f64) -> Result<f64> {
    if duration_seconds < 0 {
        return Err(PricingError::NegativeDuration(duration_seconds));
    }
    let minutes = duration_seconds as f64 / 60.0;
    Ok(round6(minutes * rate_per_minute))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn gpt4o_pricing_matches_known_example() {
        let cost = calculate_llm_cost("gpt-4o", 1000, 500).unwrap();
        assert_eq!(cost, 0.0075);
    }

    #[test]
    fn gpt5_pricing_matches_known_example() {
        let cost = calculate_llm_cost("gpt-5", 1000, 500).unwrap();
        assert_eq!(cost, 0.00625);
    }

    #[test]
    fn unknown_model_errors() {
        let err = calculate_llm_cost("not-a-real-model", 10, 10).unwrap_err();
        assert!(matches!(err, PricingError::UnknownModel(_)));
    }

    #[test]
    fn stt_cost_one_minute() {
        let cost = calculate_stt_cost(60).unwrap();
        assert_eq!(cost, 0.0078);
    }

    #[test]
    fn stt_cost_rejects_negative_duration() {
        assert!(calculate_stt_cost(-1).is_err());
    }

    #[test]
    fn bot_call_cost_default_rate() {
        let cost = calculate_bot_call_cost(120, DEFAULT_BOT_CALL_RATE_PER_MINUTE).unwrap();
        assert_eq!(cost, 0.30);
    }

    #[test]
    fn bot_call_cost_rejects_negative_duration() {
        assert!(calculate_bot_call_cost(-5, DEFAULT_BOT_CALL_RATE_PER_MINUTE).is_err());
    }
}
