// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// PrintDown Core: types, device directives, configuration, and error
// definitions shared across all crates.

pub mod config;
pub mod directive;
pub mod error;
pub mod types;

pub use config::AppConfig;
pub use directive::{Alignment, Directive, StyleKind};
pub use error::{DecodeError, DeviceError, PrintdownError};
pub use types::*;
