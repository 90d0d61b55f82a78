// Small string validation helpers shared across services.

/// Ensure a base URL ends with exactly one trailing slash
pub fn ensure_trailing_slash(s: &str) -> String {
    if s.ends_with('/') {
        s.to_string()
    } else {
        format!("{}/", s)
    }
}

/// Trim a field, rejecting empty values when required
pub fn trim_and_validate_field(field: &str, required: bool) -> Result<String, String> {
    let trimmed = field.trim().to_string();
    if trimmed.is_empty() && required {
        return Err("Field cannot be empty".to_string());
    }
    Ok(trimmed)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn trailing_slash_is_appended_once() {
        assert_eq!(ensure_trailing_slash("http://x.io/a"), "http://x.io/a/");
        assert_eq!(ensure_trailing_slash("http://x.io/a/"), "http://x.io/a/");
    }

    #[test]
    fn required_fields_reject_whitespace() {
        assert!(trim_and_validate_field("   ", true).is_err());
        assert_eq!(trim_and_validate_field(" ok ", true).unwrap(), "ok");
        assert_eq!(trim_and_validate_field("", false).unwrap(), "");
    }
}
