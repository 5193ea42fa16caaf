use thiserror::Error;

/// Errors surfaced by the analytics core and the data provider.
///
/// Clonable so a single in-flight fetch can hand the same outcome to every
/// coalesced waiter.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum AnalysisError {
    #[error("Unknown symbol: {0}")]
    InvalidSymbol(String),

    #[error("Network error: {0}")]
    Network(String),

    #[error("Payment required: {0}")]
    PaymentRequired(String),

    #[error("Failed to parse upstream payload: {0}")]
    DataParsing(String),

    #[error("Insufficient data: {0}")]
    InsufficientData(String),

    #[error("Rate limited by upstream: {0}")]
    RateLimit(String),

    #[error("Not supported: {0}")]
    NotSupported(String),

    #[error("{0}")]
    Unknown(String),
}

impl AnalysisError {
    pub fn payment_required_for(interval: &str) -> Self {
        AnalysisError::PaymentRequired(format!(
            "the '{}' interval requires a paid API tier; set the API key or use daily data",
            interval
        ))
    }
}

pub type AnalysisResult<T> = Result<T, AnalysisError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_messages() {
        let err = AnalysisError::InvalidSymbol("XYZ".to_string());
        assert!(err.to_string().contains("XYZ"));

        let err = AnalysisError::payment_required_for("4h");
        assert!(err.to_string().contains("4h"));
        assert!(err.to_string().to_lowercase().contains("payment required"));
    }

    #[test]
    fn test_errors_are_clonable() {
        let err = AnalysisError::RateLimit("429".to_string());
        assert_eq!(err.clone(), err);
    }
}
