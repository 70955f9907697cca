use chrono::{DateTime, Utc};

/// Platform limit for model, endpoint-config and endpoint names.
pub const MAX_NAME_LEN: usize = 63;

const TIMESTAMP_FORMAT: &str = "%Y-%m-%d-%H-%M-%S-%3f";

/// Reduce an arbitrary identifier to the platform's name alphabet:
/// ASCII alphanumerics separated by single hyphens, never starting or
/// ending with one.
pub fn sanitize(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    for ch in raw.chars() {
        if ch.is_ascii_alphanumeric() {
            out.push(ch.to_ascii_lowercase());
        } else if !out.is_empty() && !out.ends_with('-') {
            out.push('-');
        }
    }
    while out.ends_with('-') {
        out.pop();
    }
    out
}

/// Name shared by the model, endpoint config and endpoint of one deployment:
/// the sanitized base truncated to fit, then a millisecond timestamp.
pub fn resource_name(base: &str, now: DateTime<Utc>) -> String {
    let stamp = now.format(TIMESTAMP_FORMAT).to_string();
    let mut base = sanitize(base);
    if base.is_empty() {
        base.push_str("model");
    }
    base.truncate(MAX_NAME_LEN - stamp.len() - 1);
    while base.ends_with('-') {
        base.pop();
    }
    format!("{base}-{stamp}")
}

/// Check a user-supplied name before any remote call is made.
pub fn validate_name(name: &str) -> Result<(), String> {
    if name.is_empty() || name.len() > MAX_NAME_LEN {
        return Err(format!("name must be 1-{MAX_NAME_LEN} characters, got {}", name.len()));
    }
    if name.starts_with('-') || name.ends_with('-') {
        return Err("name must start and end with a letter or digit".to_string());
    }
    if let Some(bad) = name.chars().find(|c| !(c.is_ascii_alphanumeric() || *c == '-')) {
        return Err(format!("invalid character '{bad}' in name"));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn fixed_time() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 2, 11, 16, 20, 36).unwrap()
            + chrono::Duration::milliseconds(123)
    }

    #[test]
    fn test_resource_name_is_deterministic() {
        let name = resource_name("huggingface-llm-mistral-7b-v3", fixed_time());
        assert_eq!(name, "huggingface-llm-mistral-7b-v3-2025-02-11-16-20-36-123");
        assert_eq!(name, resource_name("huggingface-llm-mistral-7b-v3", fixed_time()));
    }

    #[test]
    fn test_resource_name_truncates_long_ids() {
        let long = "meta-textgeneration-llama-3-1-405b-instruct-fp8-extra-long-suffix";
        let name = resource_name(long, fixed_time());
        assert!(name.len() <= MAX_NAME_LEN, "{name} is {} chars", name.len());
        assert!(name.ends_with("-2025-02-11-16-20-36-123"));
        assert!(validate_name(&name).is_ok());
    }

    #[test]
    fn test_sanitize_collapses_invalid_runs() {
        assert_eq!(sanitize("Mistral_7B..v3/"), "mistral-7b-v3");
        assert_eq!(sanitize("--a--b--"), "a-b");
        assert_eq!(sanitize("___"), "");
    }

    #[test]
    fn test_resource_name_empty_base() {
        assert_eq!(
            resource_name("***", fixed_time()),
            "model-2025-02-11-16-20-36-123"
        );
    }

    #[test]
    fn test_validate_name() {
        assert!(validate_name("my-endpoint-1").is_ok());
        assert!(validate_name("").is_err());
        assert!(validate_name("-leading").is_err());
        assert!(validate_name("has_underscore").is_err());
        assert!(validate_name(&"a".repeat(64)).is_err());
    }
}
