// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! Centralized message types for structured logging.
//!
//! Each message type implements `Display` for the human-readable line and,
//! where the event is worth a span or structured fields, `StructuredLog`.
//!
//! # Usage Pattern
//!
//! ```rust
//! use pipeline_session::observability::messages::session::SessionStarted;
//! use pipeline_session::observability::messages::StructuredLog;
//!
//! let msg = SessionStarted {
//!     run_id: "4f7c9a52-1d2e-4c3b-9a8f-0e6d5b4a3c21",
//!     pool_size: 4,
//!     default_processor: "local",
//! };
//!
//! let span = msg.span("session");
//! let _guard = span.enter();
//! msg.log();
//! ```

pub mod injection;
pub mod processor;
pub mod session;

use tracing::Span;

/// A message that knows its own log level and structured fields.
pub trait StructuredLog: std::fmt::Display {
    /// Emit the message at its fixed level with structured fields attached.
    fn log(&self);

    /// Build a span carrying the same fields, named `name`.
    fn span(&self, name: &str) -> Span;
}
