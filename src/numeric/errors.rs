// ============================================================================
// Numeric Errors
// Error types for integer tick arithmetic
// ============================================================================

use thiserror::Error;

/// Errors that can occur during tick arithmetic.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Error)]
pub enum NumericError {
    /// Result exceeded i64::MAX
    #[error("arithmetic overflow: result exceeded maximum value")]
    Overflow,
    /// Result below i64::MIN
    #[error("arithmetic underflow: result below minimum value")]
    Underflow,
    /// Tick size was zero or negative
    #[error("invalid tick size: must be positive")]
    InvalidTickSize,
}

/// Result type alias for numeric operations
pub type NumericResult<T> = Result<T, NumericError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        assert_eq!(
            NumericError::Overflow.to_string(),
            "arithmetic overflow: result exceeded maximum value"
        );
        assert_eq!(
            NumericError::InvalidTickSize.to_string(),
            "invalid tick size: must be positive"
        );
    }

    #[test]
    fn test_error_equality() {
        assert_eq!(NumericError::Overflow, NumericError::Overflow);
        assert_ne!(NumericError::Overflow, NumericError::Underflow);
    }
}
