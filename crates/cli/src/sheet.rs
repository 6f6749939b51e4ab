use std::collections::BTreeSet;

use console::style;
use dialoguer::{Confirm, theme::ColorfulTheme};
use onepay_sdk::{CardNetwork, PaymentSheet, PaymentSummary, SheetRequest, SheetResult};

/// Currencies without minor units
const ZERO_DECIMAL_CURRENCIES: &[&str] = &[
    "bif", "clp", "djf", "gnf", "jpy", "kmf", "krw", "mga", "pyg", "rwf", "ugx", "vnd", "vuv",
    "xaf", "xof", "xpf",
];

/// Payment sheet asking for authorization in the terminal
///
/// Stands in for the platform sheet when paying from the command line, for
/// example against a test backend.
pub struct TerminalPaymentSheet {
    /// Authorize without prompting
    auto_confirm: bool,
}

impl TerminalPaymentSheet {
    pub fn new(auto_confirm: bool) -> Self {
        Self { auto_confirm }
    }
}

/// Render an amount in minor units, e.g. `1000 usd` as `10.00 USD`
pub fn format_amount(amount_minor_units: u64, currency: &str) -> String {
    let code = currency.to_ascii_uppercase();
    if ZERO_DECIMAL_CURRENCIES.contains(&currency.to_ascii_lowercase().as_str()) {
        format!("{} {}", amount_minor_units, code)
    } else {
        format!(
            "{}.{:02} {}",
            amount_minor_units / 100,
            amount_minor_units % 100,
            code
        )
    }
}

fn prompt_for(request: &SheetRequest<'_>) -> String {
    let merchant = request
        .merchant
        .display_name
        .as_deref()
        .unwrap_or(request.merchant.merchant_identifier.as_str());

    match request.summary {
        Some(PaymentSummary {
            amount_minor_units,
            currency,
            label,
        }) => {
            let amount = format_amount(*amount_minor_units, currency);
            match label {
                Some(label) => format!("Pay {} to {} for {}?", amount, merchant, label),
                None => format!("Pay {} to {}?", amount, merchant),
            }
        }
        None => format!("Authorize payment to {}?", merchant),
    }
}

impl PaymentSheet for TerminalPaymentSheet {
    fn can_make_payments(&self, networks: &BTreeSet<CardNetwork>) -> bool {
        !networks.is_empty()
    }

    async fn present(&self, request: SheetRequest<'_>) -> SheetResult {
        let prompt = prompt_for(&request);

        if self.auto_confirm {
            println!("{} {}", style("✓").green(), prompt);
            return SheetResult::Completed;
        }

        let answer = tokio::task::spawn_blocking(move || {
            Confirm::with_theme(&ColorfulTheme::default())
                .with_prompt(prompt)
                .default(false)
                .interact_opt()
        })
        .await;

        match answer {
            Ok(Ok(Some(true))) => SheetResult::Completed,
            Ok(Ok(Some(false))) | Ok(Ok(None)) => SheetResult::Canceled,
            Ok(Err(e)) => SheetResult::Failed(Box::new(e)),
            Err(e) => SheetResult::Failed(Box::new(e)),
        }
    }
}
