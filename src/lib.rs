// SPDX-License-Identifier: GPL-3.0-only

//! Turn `Code snippet` markers in exported chats into fenced code blocks.
//!
//! Chat exports (for example from Gemini) replace diagram blocks with a bare
//! `Code snippet` line followed by the diagram source. This crate rewrites
//! those markers into ```` ```mermaid ```` fences so the diagrams render again.
//!
//! # Overview
//!
//! 1. [`transform`] holds the pure text transform. It does no I/O.
//! 2. [`files`] reads and writes documents, one at a time or a whole
//!    directory tree.
//!
//! # Example
//!
//! ```
//! use mdfence::transform::transform_text;
//!
//! let exported = "Here is the flow:\nCode snippet\ngraph LR; A-->B\n\nDone.\n";
//! let cleaned = transform_text(exported);
//!
//! assert_eq!(
//!     cleaned,
//!     "Here is the flow:\n```mermaid\ngraph LR; A-->B\n```\n\nDone.\n"
//! );
//! ```
//!
//! # Modules
//!
//! - [`transform`]: marker detection and fence insertion
//! - [`files`]: single-file and batch directory processing

#![deny(missing_docs)]

pub mod files;
pub mod transform;
