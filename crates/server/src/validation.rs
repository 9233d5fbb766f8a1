use mirrorlens_core::error::ApiError;
use regex::Regex;
use std::collections::HashSet;
use std::sync::LazyLock;

static CONTENT_ID_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[A-Za-z0-9_-]{1,64}$").unwrap());

/// Reject ids that could not be upstream content ids before any request is made.
pub fn validate_content_id<'a>(field: &str, value: Option<&'a str>) -> Result<&'a str, ApiError> {
    let value = value.map(str::trim).unwrap_or_default();
    if value.is_empty() {
        return Err(ApiError::BadRequest(format!("missing required parameter: {field}")));
    }
    if !CONTENT_ID_RE.is_match(value) {
        return Err(ApiError::BadRequest(format!(
            "{field} must match ^[A-Za-z0-9_-]{{1,64}}$"
        )));
    }
    Ok(value)
}

/// Deduplicate and trim poster ids, dropping blanks.
pub fn normalize_ids(ids: &[String]) -> Vec<String> {
    let mut seen = HashSet::new();
    let mut out = Vec::new();
    for raw in ids {
        let id = raw.trim();
        if id.is_empty() {
            continue;
        }
        if seen.insert(id.to_string()) {
            out.push(id.to_string());
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn content_ids() {
        assert_eq!(validate_content_id("id", Some(" 81234 ")).unwrap(), "81234");
        assert_eq!(validate_content_id("id", Some("0A_b-9")).unwrap(), "0A_b-9");

        for bad in [None, Some(""), Some("   "), Some("../etc"), Some("a b"), Some("x&y=1")] {
            let err = validate_content_id("id", bad).unwrap_err();
            assert_eq!(err.status_code(), 400, "{bad:?}");
        }
        assert!(validate_content_id("id", Some(&"9".repeat(65))).is_err());
    }

    #[test]
    fn ids_are_trimmed_and_deduplicated() {
        let ids = ["3".to_string(), " 3 ".into(), "".into(), "9".into()];
        assert_eq!(normalize_ids(&ids), vec!["3", "9"]);
    }
}
