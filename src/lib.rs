// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

pub mod backends;   // built-in task processors
pub mod config;     // run configuration
pub mod errors;     // error handling
pub mod observability;
pub mod session;    // coordinator, latch, resolver, injector
pub mod traits;     // processor contract
