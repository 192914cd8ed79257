//! Error types for the payroll simulation engine.
//!
//! This module provides strongly-typed errors using the `thiserror` crate
//! for all error conditions that can occur while resolving rule
//! configuration and computing payroll line items.

use std::fmt;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Identifies one of the three configuration layers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConfigLayer {
    /// Federal rules shared by every organization.
    Global,
    /// Rules shared by every organization of one sector.
    Sector,
    /// The organization's own inline configuration.
    Organization,
}

impl fmt::Display for ConfigLayer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ConfigLayer::Global => "global",
            ConfigLayer::Sector => "sector",
            ConfigLayer::Organization => "organization",
        };
        f.write_str(name)
    }
}

/// The main error type for the payroll simulation engine.
///
/// Configuration-layer errors (`ConfigNotFound`, `ConfigFetchFailed`,
/// `InvalidRule`) abort a whole simulation. Calculator-level errors
/// (`MissingRequiredRule`, `CalculationError`) are scoped to the line item
/// that raised them.
///
/// # Example
///
/// ```
/// use payroll_engine::error::EngineError;
///
/// let error = EngineError::ConfigNotFound {
///     org_slug: "trf-demo".to_string(),
/// };
/// assert_eq!(error.to_string(), "Organization configuration not found: trf-demo");
/// ```
#[derive(Debug, Error)]
pub enum EngineError {
    /// No organization record matches the requested slug.
    #[error("Organization configuration not found: {org_slug}")]
    ConfigNotFound {
        /// The organization slug that was requested.
        org_slug: String,
    },

    /// The configuration store failed while fetching a layer.
    #[error("Failed to fetch {layer} configuration: {message}")]
    ConfigFetchFailed {
        /// The layer whose fetch failed.
        layer: ConfigLayer,
        /// A description of the store failure.
        message: String,
    },

    /// A configured rule value is malformed.
    #[error("Invalid rule '{rule}': {message}")]
    InvalidRule {
        /// The path of the malformed rule.
        rule: String,
        /// A description of what made the rule invalid.
        message: String,
    },

    /// A rule needed by a calculator has no value and no documented fallback.
    #[error("Missing required rule: {rule}")]
    MissingRequiredRule {
        /// The path of the missing rule.
        rule: String,
    },

    /// A caller-supplied parameter looks like leftover state from another request.
    #[error("Stale parameter '{field}' detected with value {value}")]
    StaleParameterDetected {
        /// The parameter field.
        field: String,
        /// The out-of-range value.
        value: Decimal,
    },

    /// A caller-supplied parameter is outside its valid domain.
    #[error("Invalid parameter '{field}': {message}")]
    InvalidParameters {
        /// The parameter field.
        field: String,
        /// A description of what made the parameter invalid.
        message: String,
    },

    /// A general calculation error occurred.
    #[error("Calculation error: {message}")]
    CalculationError {
        /// A description of the calculation error.
        message: String,
    },
}

impl EngineError {
    /// Returns a stable machine-readable code for this error.
    pub fn code(&self) -> &'static str {
        match self {
            EngineError::ConfigNotFound { .. } => "CONFIG_NOT_FOUND",
            EngineError::ConfigFetchFailed { .. } => "CONFIG_FETCH_FAILED",
            EngineError::InvalidRule { .. } => "INVALID_RULE",
            EngineError::MissingRequiredRule { .. } => "MISSING_REQUIRED_RULE",
            EngineError::StaleParameterDetected { .. } => "STALE_PARAMETER",
            EngineError::InvalidParameters { .. } => "INVALID_PARAMETERS",
            EngineError::CalculationError { .. } => "CALCULATION_ERROR",
        }
    }

    /// Shorthand for a [`EngineError::MissingRequiredRule`].
    pub fn missing(rule: impl Into<String>) -> Self {
        EngineError::MissingRequiredRule { rule: rule.into() }
    }

    /// Shorthand for an [`EngineError::InvalidRule`].
    pub fn invalid_rule(rule: impl Into<String>, message: impl Into<String>) -> Self {
        EngineError::InvalidRule {
            rule: rule.into(),
            message: message.into(),
        }
    }
}

/// A type alias for Results that return EngineError.
pub type EngineResult<T> = Result<T, EngineError>;
