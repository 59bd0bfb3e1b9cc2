//! Delete command handler.

use crate::args::DeleteArgs;
use crate::commands::Out;
use crate::model::Transaction;
use crate::{Ledger, Result};

/// Deletes one transaction by id and resyncs.
///
/// If the spreadsheet refuses the delete, the error is returned after the resync, so the local
/// copy still matches the spreadsheet.
pub async fn delete(ledger: &Ledger, args: &DeleteArgs) -> Result<Out<Transaction>> {
    Ok(match ledger.delete_transaction(args.id()).await? {
        Some(removed) => Out::new(format!("Deleted '{}'", removed.id), removed),
        None => Out::new_message(format!("No transaction with id '{}'", args.id())),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test::TestEnv;

    #[tokio::test]
    async fn test_delete() {
        let env = TestEnv::new().await;
        let ledger = env.ledger().await;
        ledger.start().await;
        let out = delete(&ledger, &DeleteArgs::new("row-6")).await.unwrap();
        assert_eq!(out.message(), "Deleted 'row-6'");
        assert!(ledger.find("row-6").is_none());
        assert_eq!(env.get_state().rows.len(), 6);
    }

    #[tokio::test]
    async fn test_delete_unknown() {
        let env = TestEnv::new().await;
        let ledger = env.ledger().await;
        let out = delete(&ledger, &DeleteArgs::new("nope")).await.unwrap();
        assert_eq!(out.message(), "No transaction with id 'nope'");
        assert!(out.structure().is_none());
    }
}
