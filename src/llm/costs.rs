//! Per-token USD prices for the models we run against.
//!
//! Prices drift; unknown models fall back to zero so cost logging never
//! blocks a call.

use rust_decimal::Decimal;
use rust_decimal_macros::dec;

/// (input, output) cost per token for a model id.
pub fn model_cost(model: &str) -> (Decimal, Decimal) {
    // Published per-1M-token prices, divided down.
    match model {
        m if m.starts_with("gpt-4o-mini") => (dec!(0.00000015), dec!(0.0000006)),
        m if m.starts_with("gpt-4o") => (dec!(0.0000025), dec!(0.00001)),
        m if m.starts_with("claude-sonnet") || m.contains("sonnet") => {
            (dec!(0.000003), dec!(0.000015))
        }
        m if m.contains("haiku") => (dec!(0.0000008), dec!(0.000004)),
        _ => (Decimal::ZERO, Decimal::ZERO),
    }
}
