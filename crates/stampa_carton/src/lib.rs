//! Carton - The shared toolbox for the stampa compiler.
//!
//! This crate provides the foundational utilities every other stampa crate
//! leans on: HTML tag configuration tables, casing helpers, and source
//! ranges. Nothing here knows about templates or ASTs.

pub mod dom_tag_config;
pub mod general;
pub mod source_range;

pub use dom_tag_config::*;
pub use general::*;
pub use source_range::SourceRange;

// Re-export compact_str::CompactString as the crate-wide small string type
pub use compact_str::CompactString;
pub use compact_str::CompactString as String;

// Re-export smallvec for stack-optimized collections
pub use smallvec::{smallvec, SmallVec};

// Re-export rustc-hash for fast hash maps/sets
pub use rustc_hash::{FxHashMap, FxHashSet};

// Re-export phf for compile-time perfect hash sets
pub use phf::{phf_map, phf_set, Map as PhfMap, Set as PhfSet};
