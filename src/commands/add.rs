use crate::args::AddArgs;
use crate::commands::{apply_fields, Out};
use crate::ledger::ensure_balanced;
use crate::model::{Amount, Draft, Transaction};
use crate::{Ledger, Result};

/// Adds a transaction and resyncs. An amount that is not a number is taken as 0. Fails without
/// touching anything if a custom split does not add up to the amount.
///
/// On success, the structure holds the transaction as it stands after the resync, or the
/// optimistic local record if the remote store does not have it.
pub async fn add(ledger: &Ledger, args: &AddArgs) -> Result<Out<Transaction>> {
    let mut draft = Draft {
        amount: Some(Amount::coerce_str(args.amount())),
        ..Draft::default()
    };
    apply_fields(&mut draft, args.fields(), &ledger.current_user());
    let preview = ledger.normalize(draft);
    ensure_balanced(&preview)?;

    let added = ledger.add_transaction(preview.to_draft()).await;
    Ok(match ledger.find(&added.id) {
        Some(synced) => {
            let row = synced
                .row_index
                .map(|row| format!(" in row {row}"))
                .unwrap_or_default();
            Out::new(
                format!("Added '{}' for {}{row}", synced.item, synced.amount),
                synced,
            )
        }
        None => Out::new(
            format!(
                "Added '{}' for {}, but the spreadsheet does not show it yet",
                added.item, added.amount
            ),
            added,
        ),
    })
}
