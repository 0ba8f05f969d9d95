//! Resource usage accumulated over one request.

use serde::{Deserialize, Serialize};

use brandgate_core::GenerationUsage;

/// Token and call totals across every attempt of a request.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RequestUsage {
    pub tokens_in: u32,
    pub tokens_out: u32,

    /// Generator calls made, failed ones included
    pub llm_calls: u32,

    /// Provider of the last call that reported one
    pub provider: String,

    /// Model of the last call that reported one
    pub model: String,

    pub estimated_cost_usd: f64,
}

impl RequestUsage {
    /// Record a generator call. `usage` is `None` when the call failed
    /// before reporting tokens.
    pub fn record_call(&mut self, usage: Option<&GenerationUsage>) {
        self.llm_calls += 1;

        let Some(usage) = usage else {
            return;
        };

        self.tokens_in = self.tokens_in.saturating_add(usage.tokens_in);
        self.tokens_out = self.tokens_out.saturating_add(usage.tokens_out);
        if !usage.provider.is_empty() {
            self.provider = usage.provider.clone();
        }
        if !usage.model.is_empty() {
            self.model = usage.model.clone();
        }
        self.estimated_cost_usd += estimate_cost(usage.tokens_in, usage.tokens_out, &usage.model);
    }

    pub fn total_tokens(&self) -> u32 {
        self.tokens_in.saturating_add(self.tokens_out)
    }
}

/// Estimate USD cost of a call from per-million-token pricing.
pub fn estimate_cost(tokens_in: u32, tokens_out: u32, model: &str) -> f64 {
    let (input_rate, output_rate) = match model {
        m if m.contains("sonnet") => (3.0, 15.0),
        m if m.contains("opus") => (5.0, 25.0),
        m if m.contains("haiku") => (1.0, 5.0),
        m if m.contains("gpt-4o-mini") => (0.15, 0.6),
        m if m.contains("gpt-4o") => (2.5, 10.0),
        _ => (3.0, 15.0), // Default to Sonnet pricing
    };

    (tokens_in as f64 / 1_000_000.0) * input_rate + (tokens_out as f64 / 1_000_000.0) * output_rate
}
