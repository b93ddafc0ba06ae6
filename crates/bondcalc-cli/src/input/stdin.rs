use serde::de::DeserializeOwned;
use std::io::{self, Read};

/// Deserialize a JSON request piped on stdin.
///
/// `Ok(None)` when stdin is a terminal or carries only whitespace, so the
/// caller can fall back to flags.
pub fn read_stdin<T: DeserializeOwned>() -> Result<Option<T>, Box<dyn std::error::Error>> {
    if atty::is(atty::Stream::Stdin) {
        return Ok(None);
    }

    let mut buffer = String::new();
    io::stdin().read_to_string(&mut buffer)?;
    parse_request(&buffer)
}

fn parse_request<T: DeserializeOwned>(raw: &str) -> Result<Option<T>, Box<dyn std::error::Error>> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Ok(None);
    }

    tracing::debug!(bytes = trimmed.len(), "read request from stdin");
    let request = serde_json::from_str(trimmed)
        .map_err(|e| format!("Failed to parse stdin request: {e}"))?;
    Ok(Some(request))
}

#[cfg(test)]
mod tests {
    use super::*;
    use bondcalc_core::yields::YieldInput;

    #[test]
    fn test_blank_input_falls_back() {
        let parsed: Option<YieldInput> = parse_request("  \n").unwrap();
        assert!(parsed.is_none());
    }

    #[test]
    fn test_typed_request() {
        let parsed: Option<YieldInput> = parse_request(
            r#"{ "cashflows": ["50", "1050"], "market_price": "980", "payment_frequency": 1 }"#,
        )
        .unwrap();
        assert_eq!(parsed.map(|y| y.cashflows.len()), Some(2));
    }

    #[test]
    fn test_malformed_request_is_error() {
        let err = parse_request::<YieldInput>("{ not json").unwrap_err();
        assert!(err.to_string().contains("stdin"));
    }
}
