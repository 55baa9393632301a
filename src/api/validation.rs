use super::ApiError;

const MAX_TERM_LEN: usize = 120;

pub fn validate_query_id(id: i32) -> Result<i32, ApiError> {
    if id <= 0 {
        return Err(ApiError::validation(format!(
            "Invalid query ID: {}. ID must be a positive integer",
            id
        )));
    }
    Ok(id)
}

/// Reject empty or absurdly long search terms before anything is
/// persisted or any paid call happens. Normalization proper (case-fold)
/// lives in the service layer.
pub fn validate_search_term<'a>(label: &str, term: &'a str) -> Result<&'a str, ApiError> {
    let trimmed = term.trim();
    if trimmed.is_empty() {
        return Err(ApiError::validation(format!("{label} cannot be empty")));
    }
    if trimmed.len() > MAX_TERM_LEN {
        return Err(ApiError::validation(format!(
            "{label} must be {MAX_TERM_LEN} characters or less"
        )));
    }
    Ok(trimmed)
}

pub fn validate_max_details(max_details: Option<i64>) -> Result<Option<i64>, ApiError> {
    const MAX_DETAILS_CAP: i64 = 100;

    if let Some(n) = max_details
        && n > MAX_DETAILS_CAP
    {
        return Err(ApiError::validation(format!(
            "max_details must be {MAX_DETAILS_CAP} or less"
        )));
    }
    Ok(max_details)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_query_id() {
        assert!(validate_query_id(1).is_ok());
        assert!(validate_query_id(12345).is_ok());
        assert!(validate_query_id(0).is_err());
        assert!(validate_query_id(-1).is_err());
    }

    #[test]
    fn test_validate_search_term() {
        assert!(validate_search_term("City", "Austin").is_ok());
        assert!(validate_search_term("City", "  trimmed  ").is_ok());
        assert!(validate_search_term("City", "").is_err());
        assert!(validate_search_term("City", "   ").is_err());
        assert!(validate_search_term("Category", "x".repeat(121).as_str()).is_err());
    }

    #[test]
    fn test_validate_max_details() {
        assert!(validate_max_details(None).is_ok());
        assert!(validate_max_details(Some(0)).is_ok());
        assert!(validate_max_details(Some(-3)).is_ok());
        assert!(validate_max_details(Some(100)).is_ok());
        assert!(validate_max_details(Some(101)).is_err());
    }
}
