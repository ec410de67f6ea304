// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

mod config;
mod processor;
mod session;

pub use config::ConfigError;
pub use processor::{AttributeError, ProcessorTypeNotFound, SubmitError};
pub use session::{LatchError, SessionError};
