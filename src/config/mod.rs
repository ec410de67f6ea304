// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

mod loader;
mod run_config;
mod value;

pub mod consts;

pub use loader::load_config;
pub use run_config::RunConfig;
pub use value::{render_value, value_type_name};
