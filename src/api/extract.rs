//! Turns free text or a receipt photo into a `Draft` with the help of the AI extraction service.
//!
//! The service makes a best-effort guess at each field. Its answer may be wrapped in code fences or
//! surrounded by chatter, and any field may be missing or malformed, so the response is parsed
//! tolerantly here and defaulted by the `Normalizer` later.

use crate::api::Extractor;
use crate::error::{ErrorType, IntoResult};
use crate::model::draft::text;
use crate::model::{Amount, Draft, TransactionType};
use crate::{utils, Result};
use anyhow::{bail, Context};
use base64::Engine;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::path::Path;
use tracing::{debug, trace};

const DEFAULT_MIME_TYPE: &str = "image/jpeg";
const BASE64_MARKER: &str = "base64,";

#[derive(Debug, Clone, Copy, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum InputType {
    Text,
    Image,
}

serde_plain::derive_display_from_serialize!(InputType);

/// The request body sent to the AI extraction service.
#[derive(Debug, Clone, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalyzeRequest {
    pub input_type: InputType,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub image_base64: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mime_type: Option<String>,
    /// The category whitelist the service should choose from.
    pub categories: Vec<String>,
}

impl AnalyzeRequest {
    pub fn text(text: impl Into<String>, categories: Vec<String>) -> Self {
        Self {
            input_type: InputType::Text,
            text: Some(text.into()),
            image_base64: None,
            mime_type: None,
            categories,
        }
    }

    pub fn image(bytes: &[u8], mime_type: impl Into<String>, categories: Vec<String>) -> Self {
        let encoded = base64::engine::general_purpose::STANDARD.encode(bytes);
        Self::image_data(&encoded, mime_type, categories)
    }

    /// Builds an image request from base64 text, which may be a `data:` URL.
    pub fn image_data(data: &str, mime_type: impl Into<String>, categories: Vec<String>) -> Self {
        let data = match data.split_once(BASE64_MARKER) {
            Some((_, encoded)) => encoded,
            None => data,
        };
        Self {
            input_type: InputType::Image,
            text: None,
            image_base64: Some(data.trim().to_string()),
            mime_type: Some(mime_type.into()),
            categories,
        }
    }

    /// Reads an image from `path`, inferring its MIME type from the file extension.
    pub async fn image_file(path: &Path, categories: Vec<String>) -> Result<Self> {
        let bytes = utils::read_bytes(path).await?;
        Ok(Self::image(&bytes, mime_type_for(path), categories))
    }
}

/// The MIME type of an image file, judged by its extension. Unknown extensions are assumed to be
/// JPEG, which is what phone cameras produce.
pub fn mime_type_for(path: &Path) -> &'static str {
    let extension = path
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_lowercase())
        .unwrap_or_default();
    match extension.as_str() {
        "png" => "image/png",
        "webp" => "image/webp",
        "gif" => "image/gif",
        "heic" => "image/heic",
        "heif" => "image/heif",
        _ => DEFAULT_MIME_TYPE,
    }
}

/// The fields the AI extraction service guesses, after tolerant parsing.
#[derive(Debug, Clone, Default, Eq, PartialEq, Serialize, Deserialize)]
pub struct ExtractionResponse {
    pub merchant: Option<String>,
    pub description: Option<String>,
    pub amount: Amount,
    pub category: Option<String>,
    pub kind: TransactionType,
    pub date: Option<String>,
}

impl ExtractionResponse {
    /// Reads the service's answer. The only hard requirement is an `amount` field, without which
    /// nothing useful was extracted. The type is income only when the service explicitly says so.
    pub fn from_value(value: &Value) -> Result<Self> {
        let obj = value
            .as_object()
            .context("The AI response is not a JSON object")?;
        let amount = match obj.get("amount") {
            Some(amount) if !amount.is_null() => Amount::coerce(amount).abs(),
            _ => bail!("The AI response has no amount"),
        };
        let kind = match text(obj, "type").map(|t| TransactionType::coerce(&t)) {
            Some(TransactionType::Income) => TransactionType::Income,
            _ => TransactionType::Expense,
        };
        Ok(Self {
            merchant: text(obj, "merchant"),
            description: text(obj, "description"),
            amount,
            category: text(obj, "category"),
            kind,
            date: text(obj, "date"),
        })
    }

    /// A draft with no split information, so that it defaults to an equal split among everyone.
    pub fn into_draft(self) -> Draft {
        Draft {
            date: self.date,
            kind: Some(self.kind.to_string()),
            category: self.category,
            amount: Some(self.amount),
            merchant: self.merchant,
            item: self.description,
            ..Draft::default()
        }
    }
}

/// Asks the service to analyze `request` and converts its answer into a `Draft`. Every failure is
/// an `Extraction` error, which the user may retry.
pub async fn extract(extractor: &dyn Extractor, request: &AnalyzeRequest) -> Result<Draft> {
    debug!("Sending a {} request to the AI service", request.input_type);
    let body = extractor
        .analyze(request)
        .await
        .pub_result(ErrorType::Extraction)?;
    trace!("AI response: {body}");
    let value = clean_json_response(&body).pub_result(ErrorType::Extraction)?;
    let response = ExtractionResponse::from_value(&value).pub_result(ErrorType::Extraction)?;
    Ok(response.into_draft())
}

/// Parses a JSON object out of model output. Code fences are stripped first. If that does not
/// parse, the first balanced `{...}` in the text is tried.
pub(crate) fn clean_json_response(text: &str) -> Result<Value> {
    if text.trim().is_empty() {
        bail!("The AI response is empty");
    }
    let cleaned = text.replace("```json", "").replace("```", "");
    if let Ok(value) = serde_json::from_str::<Value>(cleaned.trim()) {
        return Ok(value);
    }
    if let Some(object) = first_object(text) {
        if let Ok(value) = serde_json::from_str::<Value>(object) {
            return Ok(value);
        }
    }
    bail!("The AI response is not in the expected format")
}

/// Finds the first brace-balanced object in `text`, ignoring braces inside string literals.
fn first_object(text: &str) -> Option<&str> {
    let start = text.find('{')?;
    let mut depth = 0usize;
    let mut in_string = false;
    let mut escaped = false;
    for (offset, c) in text[start..].char_indices() {
        if in_string {
            match c {
                _ if escaped => escaped = false,
                '\\' => escaped = true,
                '"' => in_string = false,
                _ => {}
            }
            continue;
        }
        match c {
            '"' => in_string = true,
            '{' => depth += 1,
            '}' => {
                depth -= 1;
                if depth == 0 {
                    return Some(&text[start..start + offset + 1]);
                }
            }
            _ => {}
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::TestExtractor;
    use serde_json::json;
    use std::path::PathBuf;

    #[test]
    fn test_clean_plain_json() {
        let value = clean_json_response(r#"{"amount": 120}"#).unwrap();
        assert_eq!(value["amount"], 120);
    }

    #[test]
    fn test_clean_fenced_json() {
        let text = "```json\n{\"amount\": 120, \"merchant\": \"麵店\"}\n```";
        let value = clean_json_response(text).unwrap();
        assert_eq!(value["merchant"], "麵店");
    }

    #[test]
    fn test_clean_embedded_object() {
        let text = "Sure! Here is the data: {\"amount\": 99, \"description\": \"a {brace} inside\"} \
            and another {\"amount\": 1}. Hope that helps!";
        let value = clean_json_response(text).unwrap();
        assert_eq!(value["amount"], 99);
        assert_eq!(value["description"], "a {brace} inside");
    }

    #[test]
    fn test_clean_garbage() {
        assert!(clean_json_response("").is_err());
        assert!(clean_json_response("no json here").is_err());
        assert!(clean_json_response("{ \"amount\": ").is_err());
    }

    #[test]
    fn test_response_requires_amount() {
        assert!(ExtractionResponse::from_value(&json!({"merchant": "x"})).is_err());
        assert!(ExtractionResponse::from_value(&json!({"amount": null})).is_err());
        assert!(ExtractionResponse::from_value(&json!([1])).is_err());
    }

    #[test]
    fn test_response_income_only_when_explicit() {
        let income = ExtractionResponse::from_value(&json!({"amount": 5, "type": "收入"})).unwrap();
        assert_eq!(income.kind, TransactionType::Income);
        let shared = ExtractionResponse::from_value(&json!({"amount": 5, "type": "公帳"})).unwrap();
        assert_eq!(shared.kind, TransactionType::Expense);
        let missing = ExtractionResponse::from_value(&json!({"amount": 5})).unwrap();
        assert_eq!(missing.kind, TransactionType::Expense);
    }

    #[test]
    fn test_response_malformed_amount_is_zero() {
        let response = ExtractionResponse::from_value(&json!({"amount": "a lot"})).unwrap();
        assert!(response.amount.is_zero());
    }

    #[test]
    fn test_into_draft() {
        let draft = ExtractionResponse::from_value(&json!({
            "merchant": "?",
            "description": "午餐",
            "amount": 120,
            "category": "餐飲",
            "type": "支出",
            "date": "2024-05-01"
        }))
        .unwrap()
        .into_draft();
        assert_eq!(draft.item.as_deref(), Some("午餐"));
        assert_eq!(draft.amount, Some(Amount::from(120)));
        assert_eq!(draft.kind.as_deref(), Some("支出"));
        assert!(draft.split_with.is_none());
        assert!(draft.payer_id.is_none());
    }

    #[test]
    fn test_image_request() {
        let request = AnalyzeRequest::image(b"hello", "image/png", vec!["餐飲".to_string()]);
        assert_eq!(request.image_base64.as_deref(), Some("aGVsbG8="));
        let json = serde_json::to_value(&request).unwrap();
        assert_eq!(json["inputType"], "image");
        assert_eq!(json["mimeType"], "image/png");
        assert!(json.get("text").is_none());
    }

    #[test]
    fn test_image_data_strips_data_url() {
        let request = AnalyzeRequest::image_data("data:image/png;base64,aGVsbG8=", "image/png", vec![]);
        assert_eq!(request.image_base64.as_deref(), Some("aGVsbG8="));
    }

    #[test]
    fn test_mime_type_for() {
        assert_eq!(mime_type_for(&PathBuf::from("r.PNG")), "image/png");
        assert_eq!(mime_type_for(&PathBuf::from("r.jpeg")), "image/jpeg");
        assert_eq!(mime_type_for(&PathBuf::from("receipt")), "image/jpeg");
    }

    #[tokio::test]
    async fn test_image_file() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("receipt.webp");
        utils::write(&path, b"hello").await.unwrap();
        let request = AnalyzeRequest::image_file(&path, vec![]).await.unwrap();
        assert_eq!(request.mime_type.as_deref(), Some("image/webp"));
        assert_eq!(request.image_base64.as_deref(), Some("aGVsbG8="));
    }

    #[tokio::test]
    async fn test_extract_failure_is_extraction_error() {
        let extractor = TestExtractor::with_response("I could not read that receipt.");
        let request = AnalyzeRequest::text("??", vec![]);
        let e = extract(&extractor, &request).await.unwrap_err();
        assert_eq!(e.to_string(), "extraction error");
    }

    #[tokio::test]
    async fn test_extract_fenced_response() {
        let extractor = TestExtractor::with_response(
            "```json\n{\"merchant\":\"麵店\",\"description\":\"午餐\",\"amount\":120,\
             \"category\":\"餐飲\",\"type\":\"支出\",\"date\":\"2024-05-01\"}\n```",
        );
        let request = AnalyzeRequest::text("午餐 120 元", vec!["餐飲".to_string()]);
        let draft = extract(&extractor, &request).await.unwrap();
        assert_eq!(draft.merchant.as_deref(), Some("麵店"));
        assert_eq!(draft.amount, Some(Amount::from(120)));
    }
}
