//! Token extraction from the markup fragment.

use std::fmt;

use once_cell::sync::Lazy;
use regex::Regex;

use crate::token::TokenError;

static INPUT_ELEMENT: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?is)<input\b([^>]*)>").expect("input element pattern"));

static VALUE_ATTRIBUTE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"(?is)(?:^|\s)value\s*=\s*(?:"([^"]*)"|'([^']*)'|([^\s"'=<>`/]+))"#)
        .expect("value attribute pattern")
});

/// Session-bound anti-forgery token. The value is kept out of `Debug`
/// output so it does not end up in logs.
#[derive(Clone, PartialEq, Eq)]
pub struct AntiForgeryToken(String);

impl AntiForgeryToken {
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn into_inner(self) -> String {
        self.0
    }
}

impl fmt::Debug for AntiForgeryToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "AntiForgeryToken(<{} chars>)", self.0.len())
    }
}

/// Read the `value` attribute of the first `<input>` element in `markup`.
pub fn extract_token(markup: &str) -> Result<AntiForgeryToken, TokenError> {
    let attributes = INPUT_ELEMENT
        .captures(markup)
        .and_then(|c| c.get(1))
        .ok_or(TokenError::Missing)?
        .as_str();

    let value = VALUE_ATTRIBUTE
        .captures(attributes)
        .and_then(|c| c.get(1).or_else(|| c.get(2)).or_else(|| c.get(3)))
        .map(|m| m.as_str().trim())
        .filter(|v| !v.is_empty())
        .ok_or(TokenError::Missing)?;

    Ok(AntiForgeryToken::new(unescape(value)))
}

fn unescape(value: &str) -> String {
    if !value.contains('&') {
        return value.to_string();
    }
    value
        .replace("&quot;", "\"")
        .replace("&#39;", "'")
        .replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&amp;", "&")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hidden_field() {
        let markup = r#"<input name="__RequestVerificationToken" type="hidden" value="CfDJ8abc-_123" />"#;
        assert_eq!(extract_token(markup).unwrap().as_str(), "CfDJ8abc-_123");
    }

    #[test]
    fn test_first_input_wins() {
        let markup = r#"<div><INPUT type='hidden' value='first'><input value="second"></div>"#;
        assert_eq!(extract_token(markup).unwrap().as_str(), "first");
    }

    #[test]
    fn test_unquoted_and_multiline() {
        let markup = "<input\n  type=hidden\n  value=tok123\n>";
        assert_eq!(extract_token(markup).unwrap().as_str(), "tok123");
    }

    #[test]
    fn test_data_value_is_not_value() {
        let markup = r#"<input data-value="nope" value="yes">"#;
        assert_eq!(extract_token(markup).unwrap().as_str(), "yes");
    }

    #[test]
    fn test_entities_decoded() {
        let markup = r#"<input value="a&amp;b">"#;
        assert_eq!(extract_token(markup).unwrap().as_str(), "a&b");
    }

    #[test]
    fn test_missing_element() {
        assert!(matches!(extract_token("<html><body>signed out</body></html>"), Err(TokenError::Missing)));
        assert!(matches!(extract_token(""), Err(TokenError::Missing)));
    }

    #[test]
    fn test_first_input_without_value_fails() {
        let markup = r#"<input type="hidden"><input value="later">"#;
        assert!(matches!(extract_token(markup), Err(TokenError::Missing)));
    }

    #[test]
    fn test_empty_value_fails() {
        assert!(matches!(extract_token(r#"<input value="">"#), Err(TokenError::Missing)));
    }

    #[test]
    fn test_debug_redacts() {
        let token = AntiForgeryToken::new("secret");
        assert_eq!(format!("{:?}", token), "AntiForgeryToken(<6 chars>)");
    }
}
