use thiserror::Error;

use crate::constants::SDK_VERSION;

/// Errors raised by the core hex, unit and user operation helpers.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CoreError {
    /// Not `0x` followed by an even number of hex digits.
    #[error("value `{0}` is not a valid hex string")]
    InvalidHex(String),

    #[error("address `{0}` is invalid")]
    InvalidAddress(String),

    /// A decimal amount that cannot be scaled to an integer.
    #[error("number `{value}` is not a valid decimal number: {reason}")]
    InvalidDecimal { value: String, reason: &'static str },

    /// Required fields that were still unset when the operation was resolved.
    #[error("user operation is missing fields: {}", .0.join(", "))]
    MissingFields(Vec<&'static str>),
}

/// Trailing line appended to every caller-facing error message.
pub fn version_line() -> String {
    format!("Version: mw@{SDK_VERSION}")
}

/// Renders a short message with optional meta messages and details, ending
/// with the SDK version.
///
/// ```text
/// Execution reverted with reason: AA21 didn't pay prefund
///
/// Request Arguments:
///   sender: 0x...
///
/// Details: ...
/// Version: mw@0.1.0
/// ```
pub fn format_error_message(
    short_message: &str,
    meta_messages: &[String],
    details: Option<&str>,
) -> String {
    let mut message = short_message.to_string();
    if !meta_messages.is_empty() {
        message.push_str("\n\n");
        message.push_str(&meta_messages.join("\n"));
    }
    message.push_str("\n\n");
    if let Some(details) = details.filter(|d| !d.is_empty() && *d != short_message) {
        message.push_str("Details: ");
        message.push_str(details);
        message.push('\n');
    }
    message.push_str(&version_line());
    message
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_fields_are_listed() {
        let err = CoreError::MissingFields(vec!["sender", "nonce"]);
        assert_eq!(err.to_string(), "user operation is missing fields: sender, nonce");
    }

    #[test]
    fn formatted_messages_end_with_version() {
        let message = format_error_message(
            "Execution reverted",
            &["Request Arguments:".into(), "  sender: 0x01".into()],
            Some("AA21 didn't pay prefund"),
        );
        assert!(message.starts_with("Execution reverted\n\nRequest Arguments:\n  sender: 0x01"));
        assert!(message.contains("Details: AA21 didn't pay prefund\n"));
        assert!(message.ends_with(&format!("Version: mw@{SDK_VERSION}")));

        let bare = format_error_message("boom", &[], Some("boom"));
        assert_eq!(bare, format!("boom\n\nVersion: mw@{SDK_VERSION}"));
    }
}
