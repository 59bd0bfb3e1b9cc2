use crate::model::{Amount, SplitType};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::BTreeMap;

/// A partial transaction of unknown trustworthiness. Every field is optional. A `Draft` comes from
/// a user form, from the AI extraction service, from a remote row or from a previously saved
/// mirror, and only becomes a `Transaction` by passing through the `Normalizer`.
#[derive(Debug, Default, Clone, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Draft {
    pub id: Option<String>,
    pub row_index: Option<u32>,
    /// Free-text date, parsed during normalization.
    pub date: Option<String>,
    /// Free-text type label, coerced during normalization.
    #[serde(rename = "type")]
    pub kind: Option<String>,
    pub category: Option<String>,
    pub amount: Option<Amount>,
    pub merchant: Option<String>,
    pub item: Option<String>,
    pub map_url: Option<String>,
    pub payer_id: Option<String>,
    pub split_type: Option<SplitType>,
    pub split_with: Option<Vec<String>>,
    pub split_details: Option<BTreeMap<String, Amount>>,
}

impl Draft {
    /// Extracts a draft from an untyped JSON object using the camelCase field names of a
    /// serialized `Transaction`. Fields of the wrong shape are treated as absent. A value that is
    /// not an object yields an empty draft.
    pub fn from_value(value: &Value) -> Self {
        let obj = match value.as_object() {
            Some(obj) => obj,
            None => return Draft::default(),
        };
        Draft {
            id: text(obj, "id"),
            row_index: obj.get("rowIndex").and_then(parse_row_index),
            date: text(obj, "date"),
            kind: text(obj, "type"),
            category: text(obj, "category"),
            amount: obj
                .get("amount")
                .filter(|v| !v.is_null())
                .map(Amount::coerce),
            merchant: text(obj, "merchant"),
            item: text(obj, "item").or_else(|| text(obj, "description")),
            map_url: text(obj, "mapUrl"),
            payer_id: text(obj, "payerId"),
            split_type: text(obj, "splitType").map(|s| SplitType::coerce(&s)),
            split_with: obj.get("splitWith").and_then(Value::as_array).map(|a| {
                a.iter()
                    .filter_map(scalar_text)
                    .collect::<Vec<String>>()
            }),
            split_details: obj.get("splitDetails").and_then(Value::as_object).map(|m| {
                m.iter()
                    .map(|(k, v)| (k.clone(), Amount::coerce(v)))
                    .collect::<BTreeMap<String, Amount>>()
            }),
        }
    }
}

/// Reads `key` as text. Numbers are accepted and rendered, blank strings count as absent.
pub(crate) fn text(obj: &Map<String, Value>, key: &str) -> Option<String> {
    obj.get(key).and_then(scalar_text)
}

pub(crate) fn scalar_text(value: &Value) -> Option<String> {
    let s = match value {
        Value::String(s) => s.trim().to_string(),
        Value::Number(n) => n.to_string(),
        Value::Bool(b) => b.to_string(),
        Value::Null | Value::Array(_) | Value::Object(_) => return None,
    };
    if s.is_empty() {
        None
    } else {
        Some(s)
    }
}

/// Reads a positive row position from a number or a numeric string.
pub(crate) fn parse_row_index(value: &Value) -> Option<u32> {
    let n = match value {
        Value::Number(n) => n.as_u64(),
        Value::String(s) => s.trim().parse::<u64>().ok(),
        _ => None,
    }?;
    u32::try_from(n).ok().filter(|n| *n > 0)
}
