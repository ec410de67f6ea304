// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! Observability module for structured logging and tracing.
//!
//! All diagnostic and operational logging goes through typed message structs
//! with a `Display` implementation, so log text lives in one place per
//! subsystem:
//!
//! * `messages::session` - session lifecycle, pool sizing, terminate and abort
//! * `messages::processor` - processor resolution, creation and task runs
//! * `messages::injection` - configuration attribute injection
//!
//! # Usage
//!
//! ```rust
//! use pipeline_session::observability::messages::processor::ProcessorTypeResolved;
//! use pipeline_session::observability::messages::StructuredLog;
//!
//! ProcessorTypeResolved {
//!     requested: "SGE",
//!     resolved: "sge",
//! }
//! .log();
//! ```

pub mod messages;

use tracing_subscriber::{fmt, EnvFilter};

/// Install the global fmt subscriber.
///
/// The filter is read from `RUST_LOG` and falls back to `default_filter`.
/// Logs go to stderr so task output on stdout stays clean. Calling this more
/// than once is harmless; later calls are ignored.
pub fn init_tracing(default_filter: &str) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter));

    let _ = fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_writer(std::io::stderr)
        .try_init();
}
