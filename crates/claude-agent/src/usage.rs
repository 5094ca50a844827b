use crate::types::ResultMessage;
use serde::Serialize;

// ─── UsageStats ───────────────────────────────────────────────────────────

/// Cost and token totals accumulated over a chat session.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct UsageStats {
    pub total_cost_usd: f64,
    pub input_tokens: u64,
    pub output_tokens: u64,
    pub cache_read_tokens: u64,
    /// Agentic turns reported by the CLI (tool round-trips included).
    pub turns: u64,
    /// User messages sent.
    pub queries: u64,
}

impl UsageStats {
    pub fn record(&mut self, result: &ResultMessage) {
        self.total_cost_usd += result.total_cost_usd;
        self.input_tokens += result.usage.input_tokens;
        self.output_tokens += result.usage.output_tokens;
        self.cache_read_tokens += result.usage.cache_read_input_tokens.unwrap_or(0);
        self.turns += u64::from(result.num_turns.max(1));
        self.queries += 1;
    }

    /// One-line summary: `💰 $0.0123 | 📥 1,200 in | 📤 340 out | 🔄 3 turns`.
    pub fn summary_line(&self) -> String {
        format!(
            "💰 ${:.4} | 📥 {} in | 📤 {} out | 🔄 {} turns",
            self.total_cost_usd,
            thousands(self.input_tokens),
            thousands(self.output_tokens),
            self.turns
        )
    }
}

fn thousands(n: u64) -> String {
    let digits = n.to_string();
    let mut out = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, ch) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            out.push(',');
        }
        out.push(ch);
    }
    out
}

// ─── Tests ────────────────────────────────────────────────────────────────
