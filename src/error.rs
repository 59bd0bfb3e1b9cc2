use serde::{Deserialize, Serialize};

pub type Error = anyhow::Error;
pub type Result<T> = std::result::Result<T, Error>;

/// The family of failure that reached the user. Each variant is attached as context to the
/// underlying error so that the CLI output says where things went wrong.
#[derive(Debug, Clone, Copy, Eq, PartialEq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorType {
    /// The home directory or `config.json` is missing or invalid.
    Config,
    /// The remote store could not be reached or rejected a request.
    Remote,
    /// The AI extraction service failed or returned something unusable. These are retryable.
    Extraction,
    /// The local mirror could not be read or written.
    Storage,
    /// The request itself is invalid, e.g. an unknown transaction id or an unbalanced split.
    Request,
}

serde_plain::derive_display_from_serialize!(ErrorType);
serde_plain::derive_fromstr_from_deserialize!(ErrorType);

/// Tags a result's error with an `ErrorType` before it is handed back to the user.
pub trait IntoResult<T> {
    fn pub_result(self, error_type: ErrorType) -> Result<T>;
}

impl<T, E> IntoResult<T> for std::result::Result<T, E>
where
    E: Into<anyhow::Error>,
{
    fn pub_result(self, error_type: ErrorType) -> Result<T> {
        self.map_err(|e| e.into().context(format!("{error_type} error")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::anyhow;

    #[test]
    fn test_pub_result_adds_type() {
        let r: std::result::Result<(), anyhow::Error> = Err(anyhow!("boom"));
        let e = r.pub_result(ErrorType::Remote).unwrap_err();
        assert_eq!(e.to_string(), "remote error");
        assert_eq!(format!("{e:#}"), "remote error: boom");
    }

    #[test]
    fn test_error_type_display() {
        assert_eq!(ErrorType::Extraction.to_string(), "extraction");
        assert_eq!(
            "storage".parse::<ErrorType>().unwrap(),
            ErrorType::Storage
        );
    }
}
