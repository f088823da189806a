//! Validation related error types

use thiserror::Error;

/// Validation, configuration and lifecycle errors
#[derive(Error, Debug)]
pub enum ValidationError {
    /// Invalid configuration
    #[error("Invalid configuration: {message}")]
    InvalidConfiguration { message: String },

    /// Invalid input parameter
    #[error("Invalid parameter '{parameter}': {reason}")]
    InvalidParameter { parameter: String, reason: String },

    /// Operation not allowed in the current lifecycle state
    #[error("Invalid state for '{operation}': {state}")]
    InvalidState { operation: String, state: String },
}

impl ValidationError {
    /// Create an invalid configuration error
    pub fn invalid_configuration(message: &str) -> Self {
        Self::InvalidConfiguration {
            message: message.to_string(),
        }
    }

    /// Create an invalid parameter error
    pub fn invalid_parameter(parameter: &str, reason: &str) -> Self {
        Self::InvalidParameter {
            parameter: parameter.to_string(),
            reason: reason.to_string(),
        }
    }

    /// Create an invalid state error
    pub fn invalid_state(operation: &str, state: &str) -> Self {
        Self::InvalidState {
            operation: operation.to_string(),
            state: state.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_invalid_configuration_error() {
        let error = ValidationError::invalid_configuration("Bad config");
        assert!(error.to_string().contains("Invalid configuration"));
        assert!(error.to_string().contains("Bad config"));
    }

    #[test]
    fn test_invalid_parameter_error() {
        let error = ValidationError::invalid_parameter("ttl_secs", "must be greater than zero");
        assert!(error.to_string().contains("ttl_secs"));
        assert!(error.to_string().contains("greater than zero"));
    }

    #[test]
    fn test_invalid_state_error() {
        let error = ValidationError::invalid_state("set_data_loader", "stopped");
        assert!(error.to_string().contains("set_data_loader"));
        assert!(error.to_string().contains("stopped"));
    }
}
