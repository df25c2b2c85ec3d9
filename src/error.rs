//! Error types for the shared-memory bridge.
//!
//! This module provides error handling for the pitlink bridge library. All
//! errors implement the `std::error::Error` trait and include structured
//! context for debugging and recovery guidance.
//!
//! ## Error Categories
//!
//! - **Region Errors**: a named shared-memory block could not be opened or read
//! - **Decode Errors**: block bytes did not match the expected record layout
//! - **Schema Errors**: the block header carries an incompatible layout version
//! - **Collector Errors**: authentication or upload against the remote collector failed
//! - **Config Errors**: an invalid or unreadable bridge configuration
//! - **Windows API Errors**: platform-specific mapping failures
//!
//! ## Recovery and Retry
//!
//! Errors can classify themselves as retryable:
//!
//! ```rust
//! use pitlink::BridgeError;
//!
//! let error = BridgeError::region_unavailable("$rFactor2SMMP_Scoring$");
//! if error.is_retryable() {
//!     println!("Can retry this operation");
//!     for suggestion in error.recovery_suggestions() {
//!         println!("  - {}", suggestion);
//!     }
//! }
//! ```
//!
//! Transient producer absence never surfaces through this type during
//! steady-state polling; the engine reports it as a paused snapshot instead.
//! These errors cover genuine faults: misconfiguration, incompatible layouts,
//! platform limits, and collector I/O.

use std::time::Duration;
use thiserror::Error;

#[cfg(windows)]
use windows_core as core;

/// Result type alias for bridge operations.
pub type Result<T, E = BridgeError> = std::result::Result<T, E>;

/// Main error type for bridge operations.
#[derive(Error, Debug)]
#[non_exhaustive]
pub enum BridgeError {
    #[error("Shared memory region '{name}' unavailable")]
    Region {
        name: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    #[error("Decode error in {context}: {details}")]
    Decode { context: String, details: String },

    #[error("Block schema version mismatch: expected {expected}, found {found}")]
    Schema { expected: u32, found: u32 },

    #[error("Operation timed out after {duration:?}")]
    Timeout { duration: Duration },

    #[error("Invalid configuration: {reason}")]
    Config { reason: String },

    #[error("Collector request failed during {operation}")]
    Collector {
        operation: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    #[error("Engine lifecycle error: {reason}")]
    Lifecycle { reason: String },

    #[error("{feature} is only available on {required_platform}")]
    UnsupportedPlatform { feature: String, required_platform: String },

    #[error("Windows API error: {operation}")]
    #[cfg(windows)]
    WindowsApi {
        operation: String,
        #[source]
        source: core::Error,
    },
}

impl BridgeError {
    /// Returns whether this error is potentially recoverable through retry.
    pub fn is_retryable(&self) -> bool {
        match self {
            BridgeError::Region { .. } => true,
            BridgeError::Timeout { .. } => true,
            BridgeError::Collector { .. } => true,
            BridgeError::Decode { .. } => false,
            BridgeError::Schema { .. } => false,
            BridgeError::Config { .. } => false,
            BridgeError::Lifecycle { .. } => false,
            BridgeError::UnsupportedPlatform { .. } => false,
            #[cfg(windows)]
            BridgeError::WindowsApi { .. } => true,
        }
    }

    /// Returns suggested recovery actions for this error.
    pub fn recovery_suggestions(&self) -> Vec<&'static str> {
        match self {
            BridgeError::Region { .. } => vec![
                "Ensure the simulator is running and a session is loaded",
                "Check that the shared memory plugin is enabled",
                "For dedicated servers, pass the correct process id suffix",
            ],
            BridgeError::Decode { .. } => vec![
                "Verify the producer plugin version matches the supported layout",
                "Capture the raw block bytes for inspection",
            ],
            BridgeError::Schema { .. } => vec![
                "Update the producer plugin to a compatible version",
                "Update this library to a matching schema version",
            ],
            BridgeError::Timeout { .. } => vec![
                "Increase the configured timeout",
                "Check system load",
            ],
            BridgeError::Config { .. } => vec![
                "Review the bridge configuration document",
                "Check collector URL and credential fields",
            ],
            BridgeError::Collector { .. } => vec![
                "Check network connectivity to the collector",
                "Verify collector credentials",
            ],
            BridgeError::Lifecycle { .. } => vec![
                "Stop the engine before starting it again",
                "Check start/stop call ordering",
            ],
            BridgeError::UnsupportedPlatform { .. } => vec![
                "Live shared memory access requires Windows",
                "Use the in-memory block provider for cross-platform testing",
            ],
            #[cfg(windows)]
            BridgeError::WindowsApi { .. } => vec![
                "Check Windows permissions for shared memory access",
                "Verify the simulator process is still alive",
            ],
        }
    }

    /// Helper constructor for an unavailable region without a source error.
    pub fn region_unavailable(name: impl Into<String>) -> Self {
        BridgeError::Region { name: name.into(), source: None }
    }

    /// Helper constructor for an unavailable region with a source error.
    pub fn region_unavailable_with_source(
        name: impl Into<String>,
        source: Box<dyn std::error::Error + Send + Sync>,
    ) -> Self {
        BridgeError::Region { name: name.into(), source: Some(source) }
    }

    /// Helper constructor for decode errors.
    pub fn decode(context: impl Into<String>, details: impl Into<String>) -> Self {
        BridgeError::Decode { context: context.into(), details: details.into() }
    }

    /// Helper constructor for configuration errors.
    pub fn config(reason: impl Into<String>) -> Self {
        BridgeError::Config { reason: reason.into() }
    }

    /// Helper constructor for collector errors.
    pub fn collector(
        operation: impl Into<String>,
        source: Box<dyn std::error::Error + Send + Sync>,
    ) -> Self {
        BridgeError::Collector { operation: operation.into(), source: Some(source) }
    }

    /// Helper constructor for lifecycle errors.
    pub fn lifecycle(reason: impl Into<String>) -> Self {
        BridgeError::Lifecycle { reason: reason.into() }
    }

    /// Helper constructor for Windows API errors.
    #[cfg(windows)]
    pub fn windows_api_error(operation: impl Into<String>, source: core::Error) -> Self {
        BridgeError::WindowsApi { operation: operation.into(), source }
    }

    /// Helper constructor for unsupported platform errors.
    pub fn unsupported_platform(
        feature: impl Into<String>,
        required_platform: impl Into<String>,
    ) -> Self {
        BridgeError::UnsupportedPlatform {
            feature: feature.into(),
            required_platform: required_platform.into(),
        }
    }
}

impl From<reqwest::Error> for BridgeError {
    fn from(err: reqwest::Error) -> Self {
        BridgeError::Collector { operation: "http request".to_string(), source: Some(Box::new(err)) }
    }
}

impl From<serde_yaml_ng::Error> for BridgeError {
    fn from(err: serde_yaml_ng::Error) -> Self {
        BridgeError::Config { reason: err.to_string() }
    }
}

#[cfg(windows)]
impl From<core::Error> for BridgeError {
    fn from(err: core::Error) -> Self {
        BridgeError::WindowsApi {
            operation: "Unknown Windows operation".to_string(),
            source: err,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[cfg(test)]
    mod property_tests {
        use super::*;
        use proptest::prelude::*;

        proptest! {
          #[test]
          fn error_messages_contain_their_context(
            name in "\\$[A-Za-z0-9_]+\\$",
            context in "\\w+",
            details in ".*",
            expected in 1u32..10u32,
            found in 1u32..10u32,
            reason in ".*"
          ) {
            let region = BridgeError::region_unavailable(name.clone());
            prop_assert!(region.to_string().contains(&name));

            let decode = BridgeError::decode(context.clone(), details.clone());
            let decode_msg = decode.to_string();
            prop_assert!(decode_msg.contains(&context));
            prop_assert!(decode_msg.contains(&details));

            let schema = BridgeError::Schema { expected, found };
            let schema_msg = schema.to_string();
            prop_assert!(schema_msg.contains(&expected.to_string()));
            prop_assert!(schema_msg.contains(&found.to_string()));

            let config = BridgeError::config(reason.clone());
            prop_assert!(config.to_string().contains(&reason));

            prop_assert!(!region.to_string().is_empty());
            prop_assert!(!decode_msg.is_empty());
            prop_assert!(!schema_msg.is_empty());
          }

          #[test]
          fn source_chains_are_traversable(
            base_message in ".*",
            layers in 1usize..4usize
          ) {
            let mut current: Box<dyn std::error::Error + Send + Sync> =
              Box::new(std::io::Error::other(base_message.clone()));
            for _ in 0..layers {
              current = Box::new(BridgeError::Region {
                name: "$rFactor2SMMP_Scoring$".to_string(),
                source: Some(current),
              });
            }

            let mut depth = 0;
            let mut found_base = false;
            let mut node = std::error::Error::source(current.as_ref());
            while let Some(source) = node {
              depth += 1;
              if source.to_string().contains(&base_message) {
                found_base = true;
              }
              node = std::error::Error::source(source);
              if depth > 10 {
                break;
              }
            }

            prop_assert_eq!(depth, layers);
            prop_assert!(found_base, "Base message '{}' not found in chain", base_message);
          }
        }
    }

    #[test]
    fn error_constructors_validation() {
        let region = BridgeError::region_unavailable("$rFactor2SMMP_Telemetry$");
        assert!(matches!(region, BridgeError::Region { .. }));

        let decode = BridgeError::decode("scoring", "body truncated");
        assert!(matches!(decode, BridgeError::Decode { .. }));

        let lifecycle = BridgeError::lifecycle("already started");
        assert!(matches!(lifecycle, BridgeError::Lifecycle { .. }));
    }

    #[test]
    fn error_traits_validation() {
        fn assert_send_sync_static<T: Send + Sync + 'static>() {}
        assert_send_sync_static::<BridgeError>();

        let error = BridgeError::region_unavailable("$rFactor2SMMP_Rules$");
        let _: &dyn std::error::Error = &error;
    }

    #[test]
    fn retryability_classification() {
        let region = BridgeError::region_unavailable("$rFactor2SMMP_Scoring$");
        let timeout = BridgeError::Timeout { duration: Duration::from_secs(1) };
        let schema = BridgeError::Schema { expected: 1, found: 2 };
        let config = BridgeError::config("missing collector url");

        assert!(region.is_retryable());
        assert!(timeout.is_retryable());
        assert!(!schema.is_retryable());
        assert!(!config.is_retryable());

        for suggestion in region.recovery_suggestions() {
            assert!(suggestion.len() > 5);
        }
        assert!(!schema.recovery_suggestions().is_empty());
    }

    #[test]
    fn yaml_conversion_maps_to_config() {
        let err = serde_yaml_ng::from_str::<u32>("not-a-number").unwrap_err();
        let bridge_err: BridgeError = err.into();
        assert!(matches!(bridge_err, BridgeError::Config { .. }));
        assert!(!bridge_err.is_retryable());
    }
}
