//! Core CDF reader module.
//!
//! Parsing proceeds in layers. [`buf`] provides the random-access
//! byte view every other layer reads through. [`format`] decodes the
//! magic prelude and the on-disk record graph. [`codec`] expands
//! compressed payloads. [`shape`], [`data`], [`variable`] and
//! [`attribute`] realise the consumer-facing surface, and [`reader`]
//! orchestrates the whole open.
//!
//! ```text
//! File structure:
//! ┌──────────────────┐
//! │ Magic (8 bytes)  │ ← format::magic
//! ├──────────────────┤
//! │ CDR → GDR        │ ← reader::CdfReader
//! ├──────────────────┤
//! │ VDR / ADR / AEDR │ ← format::descriptor
//! │ linked lists     │
//! ├──────────────────┤
//! │ VXR → VVR / CVVR │ ← variable::Variable
//! │ record blocks    │
//! └──────────────────┘
//! ```

pub mod attribute;
pub mod buf;
pub mod codec;
pub mod data;
pub mod format;
pub mod reader;
pub mod shape;
pub mod types;
pub mod variable;

pub use attribute::{GlobalAttribute, VariableAttribute};
pub use buf::{Buf, Pointer};
pub use reader::{CdfContent, CdfReader};
pub use types::error::{CdfError, Result};
pub use variable::Variable;
