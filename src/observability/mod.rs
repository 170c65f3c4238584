// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! Observability module for structured logging and tracing.
//!
//! Every diagnostic and operational log line of the engine is a message type with a
//! `Display` implementation, so wording lives in one place and call sites stay free
//! of format strings.
//!
//! Messages are organized by subsystem:
//! * `messages::engine` - block executor lifecycle and block outcomes
//! * `messages::registry` - task registration, reconfiguration and removal
//!
//! # Usage
//!
//! ```rust
//! use parblock::observability::messages::StructuredLog;
//! use parblock::observability::messages::registry::RegistryCleared;
//!
//! let msg = RegistryCleared { task_count: 3 };
//! tracing::info!("{}", msg);
//! msg.log();
//! ```

pub mod messages;
