// Copyright 2025 Kore Ledger, SL
// SPDX-License-Identifier: Apache-2.0

//! # Logging
//!
//! Installs the global `tracing` subscriber. Filtering follows `RUST_LOG`, falling back to the
//! given directive when it is unset or invalid.
//!

use tracing_subscriber::{prelude::*, util::TryInitError, EnvFilter};

/// Directive used when `RUST_LOG` is not set.
pub const DEFAULT_DIRECTIVE: &str = "info";

/// Installs a compact stdout subscriber as the global default.
///
/// # Errors
///
/// Fails when a global subscriber is already installed.
///
pub fn init(default_directive: &str) -> Result<(), TryInitError> {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_directive));
    tracing_subscriber::registry()
        .with(filter)
        .with(
            tracing_subscriber::fmt::layer()
                .compact()
                .with_target(true)
                .with_level(true),
        )
        .try_init()
}

#[cfg(test)]
mod tests {

    use super::*;

    #[test]
    fn test_second_init_fails() {
        let _ = init(DEFAULT_DIRECTIVE);
        assert!(init(DEFAULT_DIRECTIVE).is_err());
    }
}
