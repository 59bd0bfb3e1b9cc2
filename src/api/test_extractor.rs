//! Implements the `Extractor` trait without the AI service.
//!
//! Note: like `TestRemote`, this is compiled into the production binary so that the `analyze`
//! command can run end to end in test mode. It answers with a simple heuristic, wrapped in code
//! fences the way a language model often does.

use crate::api::{AnalyzeRequest, Extractor, InputType};
use crate::model::today;
use crate::Result;
use serde_json::json;

const RECEIPT_MERCHANT: &str = "全聯福利中心";
const RECEIPT_DESCRIPTION: &str = "鮮奶 x1 $95\n吐司 x1 $45";
const RECEIPT_AMOUNT: u32 = 140;
const INCOME_HINTS: &[&str] = &["收入", "薪", "income", "salary"];

#[derive(Debug, Clone, Default)]
pub(crate) struct TestExtractor {
    /// When set, returned verbatim for every request.
    response: Option<String>,
}

impl TestExtractor {
    #[cfg(test)]
    pub(crate) fn with_response(response: impl Into<String>) -> Self {
        Self {
            response: Some(response.into()),
        }
    }
}

#[async_trait::async_trait]
impl Extractor for TestExtractor {
    async fn analyze(&self, request: &AnalyzeRequest) -> Result<String> {
        if let Some(response) = &self.response {
            return Ok(response.clone());
        }
        let date = today().format("%Y-%m-%d").to_string();
        let answer = match request.input_type {
            InputType::Image => json!({
                "merchant": RECEIPT_MERCHANT,
                "description": RECEIPT_DESCRIPTION,
                "amount": RECEIPT_AMOUNT,
                "category": pick_category(&request.categories, &["居家", "購物"]),
                "type": "支出",
                "date": date,
            }),
            InputType::Text => {
                let text = request.text.as_deref().unwrap_or_default().trim();
                let amount = match first_number(text) {
                    Some(amount) => amount,
                    None => return Ok("I could not find an amount in that text.".to_string()),
                };
                let lower = text.to_lowercase();
                let income = INCOME_HINTS.iter().any(|hint| lower.contains(hint));
                let category = request
                    .categories
                    .iter()
                    .find(|c| text.contains(c.as_str()))
                    .cloned()
                    .unwrap_or_else(|| pick_category(&request.categories, &["餐飲"]));
                json!({
                    "merchant": "",
                    "description": text,
                    "amount": amount,
                    "category": category,
                    "type": if income { "收入" } else { "支出" },
                    "date": date,
                })
            }
        };
        Ok(format!("```json\n{answer:#}\n```"))
    }
}

/// The first of `preferred` that is in `categories`, else the first category, else nothing.
fn pick_category(categories: &[String], preferred: &[&str]) -> String {
    preferred
        .iter()
        .find(|p| categories.iter().any(|c| c == *p))
        .map(|p| p.to_string())
        .or_else(|| categories.first().cloned())
        .unwrap_or_default()
}

/// The first run of digits in `text`, allowing thousands separators and a decimal point.
fn first_number(text: &str) -> Option<String> {
    let start = text.find(|c: char| c.is_ascii_digit())?;
    let number: String = text[start..]
        .chars()
        .take_while(|c| c.is_ascii_digit() || *c == ',' || *c == '.')
        .filter(|c| *c != ',')
        .collect();
    Some(number.trim_end_matches('.').to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::extract;
    use crate::model::{Amount, TransactionType};

    fn categories() -> Vec<String> {
        vec!["餐飲".to_string(), "薪資".to_string(), "其他".to_string()]
    }

    #[test]
    fn test_first_number() {
        assert_eq!(first_number("午餐 120 元").as_deref(), Some("120"));
        assert_eq!(first_number("NT$1,250.5 dinner").as_deref(), Some("1250.5"));
        assert_eq!(first_number("no digits"), None);
    }

    #[tokio::test]
    async fn test_text_lunch() {
        let request = AnalyzeRequest::text("午餐 120 元", categories());
        let draft = extract(&TestExtractor::default(), &request).await.unwrap();
        assert_eq!(draft.amount, Some(Amount::from(120)));
        assert_eq!(draft.category.as_deref(), Some("餐飲"));
        assert_eq!(draft.kind.as_deref(), Some("支出"));
        assert_eq!(draft.item.as_deref(), Some("午餐 120 元"));
    }

    #[tokio::test]
    async fn test_text_salary() {
        let request = AnalyzeRequest::text("十月薪資 52,000", categories());
        let draft = extract(&TestExtractor::default(), &request).await.unwrap();
        assert_eq!(draft.amount, Some(Amount::from(52000)));
        assert_eq!(draft.category.as_deref(), Some("薪資"));
        assert_eq!(
            draft.kind.as_deref(),
            Some(TransactionType::Income.to_string().as_str())
        );
    }

    #[tokio::test]
    async fn test_text_without_amount_fails() {
        let request = AnalyzeRequest::text("something happened", categories());
        assert!(extract(&TestExtractor::default(), &request).await.is_err());
    }

    #[tokio::test]
    async fn test_image_receipt() {
        let request = AnalyzeRequest::image(b"jpeg bytes", "image/jpeg", categories());
        let draft = extract(&TestExtractor::default(), &request).await.unwrap();
        assert_eq!(draft.amount, Some(Amount::from(140)));
        assert_eq!(draft.merchant.as_deref(), Some(RECEIPT_MERCHANT));
        assert_eq!(draft.category.as_deref(), Some("餐飲"));
    }
}
