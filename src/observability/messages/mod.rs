// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! Centralized message types for structured logging.
//!
//! * `engine` - executor lifecycle and per-block outcomes
//! * `registry` - task registry mutations and failed requests

use tracing::Span;

pub mod engine;
pub mod registry;

/// A message that knows its own level and structured fields.
pub trait StructuredLog {
    /// Emit the message as a `tracing` event at its level.
    fn log(&self);

    /// A span carrying the same fields, for work done on behalf of the message.
    fn span(&self, name: &str) -> Span;
}
