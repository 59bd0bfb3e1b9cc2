use crate::commands::{plural, Out};
use crate::ledger::SyncReport;
use crate::{Ledger, Result};

/// Fetches every transaction and the category list from the remote store, replacing the local
/// transactions. Refused while another sync started by the user is running.
pub async fn sync(ledger: &Ledger) -> Result<Out<SyncReport>> {
    let report = ledger.manual_sync().await?;
    let categories = if report.categories_replaced {
        format!("{} from the spreadsheet", plural(report.categories, "category", "categories"))
    } else {
        format!(
            "kept {} ({} list)",
            plural(report.categories, "category", "categories"),
            report.category_source
        )
    };
    let message = format!(
        "Synced {}, {categories}",
        plural(report.transactions, "transaction", "transactions")
    );
    Ok(Out::new(message, report))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::TestRemoteState;
    use crate::test::TestEnv;

    #[tokio::test]
    async fn test_sync() {
        let env = TestEnv::new().await;
        let ledger = env.ledger().await;
        let out = sync(&ledger).await.unwrap();
        assert_eq!(
            out.message(),
            "Synced 6 transactions, 8 categories from the spreadsheet"
        );
        assert_eq!(out.structure().unwrap().transactions, 6);
    }

    #[tokio::test]
    async fn test_sync_unreachable() {
        let env = TestEnv::new().await;
        let mut state = TestRemoteState::seeded();
        state.fail_reads = true;
        env.set_state(state);
        let ledger = env.ledger().await;
        let out = sync(&ledger).await.unwrap();
        assert_eq!(
            out.message(),
            "Synced 0 transactions, kept 8 categories (built_in list)"
        );
    }
}
