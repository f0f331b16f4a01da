//! Foundation types shared by every crate in the toolchain.
//!
//! This crate holds nothing specific to any one pipeline stage: source
//! positions ([`span::Span`]), the four stage error kinds ([`error`]), and
//! a typed-index vector ([`index_vec::IndexVec`]) used by the virtual
//! machine's heaps. Everything here is plain data with no dependency on
//! the lexer, parser, checker, or VM crates above it.

pub mod error;
pub mod index_vec;
pub mod span;

pub use index_vec::{Idx, IndexVec};
pub use span::Span;

pub use rustc_hash::FxHashMap;
pub use rustc_hash::FxHashSet;
