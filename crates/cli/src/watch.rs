use console::style;
use futures::StreamExt;
use onepay_sdk::{BalanceSubscription, DocumentPath};

use crate::Context;

#[derive(Debug, Clone, PartialEq, clap::Args)]
pub struct WatchCommand {
    /// Document to follow: an id in the configured collection, or a full collection/document path
    pub document: String,
}

impl WatchCommand {
    fn document_path(&self, subscription: &BalanceSubscription) -> Result<DocumentPath, String> {
        if self.document.contains('/') {
            self.document
                .parse::<DocumentPath>()
                .map_err(|e| e.to_string())
        } else {
            subscription
                .document_path(&self.document)
                .map_err(|e| e.to_string())
        }
    }

    pub async fn execute(&self, ctx: &Context) -> Result<(), String> {
        let config = ctx
            .manifest
            .document_store_config(|key| std::env::var(key).ok())?;
        let field = config.field.clone();
        let subscription = BalanceSubscription::new(config);
        let path = self.document_path(&subscription)?;

        println!(
            "{} {} {}",
            style("Watching").dim(),
            style(&path).cyan(),
            style(format!("({})", field)).dim()
        );
        println!("{}", style("Press Ctrl+C to stop").dim());

        let mut balances = subscription.subscribe(path);

        loop {
            tokio::select! {
                _ = tokio::signal::ctrl_c() => {
                    balances.unsubscribe();
                    return Ok(());
                }
                snapshot = balances.next() => match snapshot {
                    Some(snapshot) => {
                        println!(
                            "{} {}",
                            style(snapshot.received_at.format("%H:%M:%S")).dim(),
                            style(snapshot.value).bold()
                        );
                    }
                    None => break,
                },
            }
        }

        match balances.last_error() {
            Some(error) => Err(format!("Subscription ended: {}", error)),
            None => {
                println!("{}", style("Subscription closed by the document store").dim());
                Ok(())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use onepay_sdk::DocumentStoreConfig;

    use super::*;

    #[test]
    fn test_document_path_resolution() {
        let subscription =
            BalanceSubscription::new(DocumentStoreConfig::parse("https://docs.example.com").unwrap());

        let cmd = WatchCommand {
            document: "user-42".to_string(),
        };
        assert_eq!(
            cmd.document_path(&subscription).unwrap().to_string(),
            "payments/user-42"
        );

        let cmd = WatchCommand {
            document: "ledgers/main".to_string(),
        };
        assert_eq!(
            cmd.document_path(&subscription).unwrap().to_string(),
            "ledgers/main"
        );

        let cmd = WatchCommand {
            document: "a/b/c".to_string(),
        };
        assert!(cmd.document_path(&subscription).is_err());
    }
}
