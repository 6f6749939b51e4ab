use console::style;
use onepay_sdk::{Checkout, PaymentIntentRequest, PaymentOutcome, checkout::CHARITY_METADATA_KEY};

use crate::{Context, sheet::TerminalPaymentSheet};

#[derive(Debug, Clone, PartialEq, clap::Args)]
pub struct PayCommand {
    /// Amount in minor units (e.g. 1000 for $10.00)
    #[arg(long, short = 'a')]
    pub amount: u64,

    /// Three-letter currency code (defaults to the manifest's, then "usd")
    #[arg(long, short = 'c')]
    pub currency: Option<String>,

    /// Charity receiving the payment
    #[arg(long)]
    pub charity: Option<String>,

    /// Extra metadata sent to the backend, as key=value
    #[arg(long = "metadata", value_parser = parse_key_value)]
    pub metadata: Vec<(String, String)>,

    /// Authorize without prompting
    #[arg(long, short = 'y', default_value = "false")]
    pub yes: bool,
}

fn parse_key_value(value: &str) -> Result<(String, String), String> {
    let (key, value) = value
        .split_once('=')
        .ok_or_else(|| format!("Invalid metadata '{}': expected key=value", value))?;
    if key.trim().is_empty() {
        return Err(format!("Invalid metadata '{}': empty key", value));
    }
    Ok((key.trim().to_string(), value.to_string()))
}

impl PayCommand {
    pub fn request(&self, ctx: &Context) -> PaymentIntentRequest {
        let currency = self
            .currency
            .clone()
            .unwrap_or_else(|| ctx.manifest.currency());

        let mut request = PaymentIntentRequest::new(self.amount, currency);
        if let Some(ref charity) = self.charity {
            request = request.with_metadata(CHARITY_METADATA_KEY, charity);
        }
        for (key, value) in &self.metadata {
            request = request.with_metadata(key, value);
        }
        request
    }

    pub async fn execute(&self, ctx: &Context) -> Result<(), String> {
        let config = ctx.manifest.payment_config(|key| std::env::var(key).ok())?;
        let checkout =
            Checkout::new(config, TerminalPaymentSheet::new(self.yes)).map_err(|e| e.to_string())?;

        let request = self.request(ctx);

        match checkout.pay(&request).await {
            Ok(outcome) => {
                if let Some(line) = report(&outcome)? {
                    println!("{}", line);
                }
                Ok(())
            }
            Err(e) => {
                tracing::debug!(error = %e, "Payment attempt failed");
                Err(e.user_message().unwrap_or_else(|| e.to_string()))
            }
        }
    }
}

/// Line to print for a finished payment
///
/// Cancellation is silent and failures become the command error.
fn report(outcome: &PaymentOutcome) -> Result<Option<String>, String> {
    match outcome {
        PaymentOutcome::Completed => Ok(Some(format!(
            "{} {}",
            style("✓").green(),
            outcome.user_message().unwrap_or_default()
        ))),
        PaymentOutcome::Canceled => {
            tracing::debug!("Payment canceled");
            Ok(None)
        }
        PaymentOutcome::Failed { .. } => Err(outcome
            .user_message()
            .unwrap_or_else(|| outcome.to_string())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::manifest::Manifest;

    fn context(manifest: &str) -> Context {
        Context::new(Manifest::parse(manifest).unwrap())
    }

    #[test]
    fn test_request_uses_manifest_currency() {
        let ctx = context("[payment]\ncurrency = \"eur\"\n");
        let cmd = PayCommand {
            amount: 1000,
            currency: None,
            charity: Some("International Aid".to_string()),
            metadata: vec![("campaign".to_string(), "winter".to_string())],
            yes: true,
        };

        let request = cmd.request(&ctx);
        assert_eq!(request.currency(), "eur");
        assert_eq!(
            request.metadata().get("charity").map(String::as_str),
            Some("International Aid")
        );
        assert_eq!(
            request.metadata().get("campaign").map(String::as_str),
            Some("winter")
        );
    }

    #[test]
    fn test_report_outcomes() {
        let completed = report(&PaymentOutcome::Completed).unwrap().unwrap();
        assert!(completed.contains("Payment complete!"));

        assert_eq!(report(&PaymentOutcome::Canceled), Ok(None));

        assert_eq!(
            report(&PaymentOutcome::failed("Your card was declined.")),
            Err("Payment failed: Your card was declined.".to_string())
        );
    }

    #[test]
    fn test_parse_key_value() {
        assert_eq!(
            parse_key_value("campaign=winter=2024").unwrap(),
            ("campaign".to_string(), "winter=2024".to_string())
        );
        assert!(parse_key_value("campaign").is_err());
        assert!(parse_key_value("=x").is_err());
    }
}
