use crate::api::AnalyzeRequest;
use crate::args::{AnalyzeArgs, TransactionFields};
use crate::commands::{apply_fields, Out};
use crate::error::{ErrorType, IntoResult};
use crate::ledger::ensure_balanced;
use crate::model::{Balance, Transaction};
use crate::{Ledger, Result};
use anyhow::bail;
use serde::Serialize;

/// What the AI service made of the input, normalized into a pending transaction.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Analysis {
    pub transaction: Transaction,
    pub balance: Balance,
    /// Whether the pending transaction was added to the ledger.
    pub saved: bool,
}

/// Sends a note or a receipt photo to the AI extraction service and shows the transaction it
/// describes. With `--yes` the transaction is added, subject to the same balance check as
/// `piggy add`.
///
/// A failed extraction adds nothing and can simply be retried.
pub async fn analyze(ledger: &Ledger, args: &AnalyzeArgs) -> Result<Out<Analysis>> {
    let categories = ledger.categories();
    let request = match (args.text_input(), args.image_path()) {
        (Some(text), _) => AnalyzeRequest::text(text, categories),
        (None, Some(path)) => AnalyzeRequest::image_file(path, categories)
            .await
            .pub_result(ErrorType::Request)?,
        (None, None) => bail!("Either a text or an image is needed"),
    };
    let mut draft = ledger.analyze(&request).await?;
    if let Some(split) = args.split() {
        let fields = TransactionFields::default().with_split(split);
        apply_fields(&mut draft, &fields, &ledger.current_user());
    }
    let pending = ledger.normalize(draft);
    let balance = Balance::new(&pending);

    if !args.yes() {
        let message = format!(
            "Found '{}' at {} for {} on {} ({}). Run again with --yes to save it",
            pending.item, pending.merchant, pending.amount, pending.date, pending.category
        );
        return Ok(Out::new(
            message,
            Analysis {
                transaction: pending,
                balance,
                saved: false,
            },
        ));
    }

    ensure_balanced(&pending)?;
    let added = ledger.add_transaction(pending.to_draft()).await;
    let transaction = ledger.find(&added.id).unwrap_or(added);
    Ok(Out::new(
        format!("Saved '{}' for {}", transaction.item, transaction.amount),
        Analysis {
            transaction,
            balance,
            saved: true,
        },
    ))
}
