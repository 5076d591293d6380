// src/merge/mod.rs
//! Batch CSV merge pipeline: groups yearly per-municipality exports by
//! (entity code, category), concatenates them in year order, and rewrites
//! Japanese date notations into ISO form.

pub mod classify;
pub mod dates;
pub mod engine;
pub mod group;
pub mod table;

pub use engine::{merge_directory, GroupFailure, GroupReport, MergeOptions, RunReport, OUTPUT_DIR};
pub use group::{scan_directory, SourceFile, SourceGroup};
