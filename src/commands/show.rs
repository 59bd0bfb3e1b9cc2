//! Read-only views of the ledger.

use crate::args::ListArgs;
use crate::commands::{describe, plural, Out};
use crate::model::{Filter, Summary, Transaction};
use crate::{Ledger, Result};

/// Lists the transactions that match `args`, most recent first.
pub async fn list(ledger: &Ledger, args: &ListArgs) -> Result<Out<Vec<Transaction>>> {
    let filter = Filter {
        category: args.category().map(str::to_string),
        search: args.search().map(str::to_string),
        from: args.from(),
        to: args.to(),
        limit: args.limit(),
    };
    let found = ledger.transactions(&filter);
    let mut message = format!("Found {}", plural(found.len(), "transaction", "transactions"));
    for t in &found {
        message.push_str("\n  ");
        message.push_str(&describe(t));
    }
    Ok(Out::new(message, found))
}

/// Spending today and this month, which leave out income, and the three most recent transactions.
pub async fn summary(ledger: &Ledger) -> Result<Out<Summary>> {
    let summary = ledger.summary();
    let mut message = format!(
        "Today ({}): {}\nThis month: {}\nRecent:",
        summary.today, summary.today_total, summary.month_total
    );
    if summary.recent.is_empty() {
        message.push_str(" none");
    }
    for t in &summary.recent {
        message.push_str("\n  ");
        message.push_str(&describe(t));
    }
    Ok(Out::new(message, summary))
}

pub async fn categories(ledger: &Ledger) -> Result<Out<Vec<String>>> {
    let categories = ledger.categories();
    let message = format!(
        "{}: {}",
        plural(categories.len(), "category", "categories"),
        categories.join(", ")
    );
    Ok(Out::new(message, categories))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test::TestEnv;
    use chrono::NaiveDate;

    #[tokio::test]
    async fn test_list_filters() {
        let env = TestEnv::new().await;
        let ledger = env.ledger().await;
        ledger.start().await;

        let out = list(&ledger, &ListArgs::default()).await.unwrap();
        let ids: Vec<&str> = out
            .structure()
            .unwrap()
            .iter()
            .map(|t| t.id.as_str())
            .collect();
        assert_eq!(
            ids,
            vec!["seed-06", "row-6", "seed-04", "seed-03", "seed-02", "seed-01"]
        );
        assert!(out.message().starts_with("Found 6 transactions\n  2025-10-06"));

        let args = ListArgs::new(
            None,
            Some("PXMART".to_string()),
            None,
            None,
            None,
        );
        assert_eq!(list(&ledger, &args).await.unwrap().structure().unwrap().len(), 0);
        let args = ListArgs::new(Some("居家".to_string()), None, None, None, None);
        let found = list(&ledger, &args).await.unwrap();
        assert_eq!(found.structure().unwrap()[0].id, "seed-04");

        let day = NaiveDate::from_ymd_opt(2025, 10, 3);
        let args = ListArgs::new(None, None, day, day, Some(1));
        let found = list(&ledger, &args).await.unwrap();
        assert_eq!(found.message().lines().count(), 2);
        assert_eq!(found.structure().unwrap()[0].id, "seed-04");
    }

    #[tokio::test]
    async fn test_summary_without_transactions() {
        let env = TestEnv::new().await;
        let ledger = env.ledger().await;
        let out = summary(&ledger).await.unwrap();
        assert!(out.message().contains("This month: $0"));
        assert!(out.message().ends_with("Recent: none"));
    }

    #[tokio::test]
    async fn test_summary_recent() {
        let env = TestEnv::new().await;
        let ledger = env.ledger().await;
        ledger.start().await;
        let out = summary(&ledger).await.unwrap();
        let recent = &out.structure().unwrap().recent;
        assert_eq!(recent.len(), 3);
        assert_eq!(recent[0].id, "seed-06");
    }

    #[tokio::test]
    async fn test_categories() {
        let env = TestEnv::new().await;
        let ledger = env.ledger().await;
        let out = categories(&ledger).await.unwrap();
        assert_eq!(
            out.message(),
            "8 categories: 餐飲, 薪資, 娛樂, 購物, 交通, 居家, 個人, 其他"
        );
    }
}
