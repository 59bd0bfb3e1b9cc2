//! Update command handler.

use crate::args::UpdateArgs;
use crate::commands::{apply_fields, Out};
use crate::error::{ErrorType, IntoResult};
use crate::ledger::ensure_balanced;
use crate::model::{Amount, Transaction};
use crate::{Ledger, Result};
use anyhow::anyhow;

/// Changes the given fields of one transaction, keeping the rest.
///
/// The local record is replaced at once. The spreadsheet row is overwritten only when the
/// transaction has already been synced, and there is no resync afterwards. A new amount that is
/// not a number is taken as 0. The stored category is kept even if it has since left the category
/// list.
///
/// # Errors
///
/// - Returns an error if no transaction has the id.
/// - Returns an error if the result has a custom split that does not add up to the amount.
pub async fn update(ledger: &Ledger, args: &UpdateArgs) -> Result<Out<Transaction>> {
    let existing = ledger
        .find(args.id())
        .ok_or_else(|| anyhow!("No transaction with id '{}'", args.id()))
        .pub_result(ErrorType::Request)?;
    let mut draft = existing.to_draft();
    if let Some(amount) = args.amount() {
        draft.amount = Some(Amount::coerce_str(amount));
    }
    apply_fields(&mut draft, args.fields(), &ledger.current_user());
    let preview = ledger.normalize(draft);
    ensure_balanced(&preview)?;

    let updated = ledger.update_transaction(preview.to_draft()).await?;
    let message = match updated.row_index {
        Some(row) => format!("Updated '{}' in row {row}", updated.id),
        None => format!("Updated '{}' locally, it has not been synced yet", updated.id),
    };
    Ok(Out::new(message, updated))
}
