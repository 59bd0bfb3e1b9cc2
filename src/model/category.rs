use serde_json::Value;

/// The category used when a transaction has none, or one we do not recognize.
pub const FALLBACK_CATEGORY: &str = "其他";

/// The built-in category list, used until the remote store provides one.
pub const DEFAULT_CATEGORIES: &[&str] = &[
    "餐飲",
    "薪資",
    "娛樂",
    "購物",
    "交通",
    "居家",
    "個人",
    FALLBACK_CATEGORY,
];

/// Field names under which a category entry may carry its name when the remote store sends
/// objects instead of strings.
const NAME_KEYS: &[&str] = &["分類", "名稱", "name", "label"];

pub fn default_categories() -> Vec<String> {
    DEFAULT_CATEGORIES.iter().map(|s| s.to_string()).collect()
}

/// Coerces one entry of a remote category list into a name. Returns `None` for entries that are
/// empty or that look like a stray JSON blob, e.g. a transaction row returned by mistake.
pub fn coerce_category(entry: &Value) -> Option<String> {
    let name = match entry {
        Value::String(s) => s.clone(),
        Value::Object(obj) => NAME_KEYS
            .iter()
            .filter_map(|key| obj.get(*key))
            .filter_map(Value::as_str)
            .find(|s| !s.trim().is_empty())
            .unwrap_or_default()
            .to_string(),
        Value::Number(n) => n.to_string(),
        Value::Null | Value::Bool(_) | Value::Array(_) => String::new(),
    };
    let name = name.trim();
    if name.is_empty() || name.contains('{') {
        None
    } else {
        Some(name.to_string())
    }
}
