use crate::error::ApiError;

/// Parse a comma-separated id list such as `1,2,3` from a path segment.
/// Blank items are ignored; at least one id is required.
pub fn parse_ids(raw: &str) -> Result<Vec<u64>, ApiError> {
    let mut ids = Vec::new();
    for part in raw.split(',').map(str::trim).filter(|p| !p.is_empty()) {
        let id = part
            .parse::<u64>()
            .map_err(|_| ApiError::bad_request(format!("invalid id '{part}'")))?;
        if id == 0 {
            return Err(ApiError::bad_request("id cannot be 0"));
        }
        ids.push(id);
    }
    if ids.is_empty() {
        return Err(ApiError::bad_request("no ids given"));
    }
    Ok(ids)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_lists() {
        assert_eq!(parse_ids("1,2, 3").unwrap(), vec![1, 2, 3]);
        assert_eq!(parse_ids("7").unwrap(), vec![7]);
        assert_eq!(parse_ids("4,,5,").unwrap(), vec![4, 5]);
    }

    #[test]
    fn rejects_bad_input() {
        assert!(parse_ids("").is_err());
        assert!(parse_ids("a,1").is_err());
        assert!(parse_ids("0").is_err());
        assert!(parse_ids("-1").is_err());
    }
}
