//! # image-localizer
//!
//! Scans a JavaScript/TypeScript codebase for string literals that point at
//! externally hosted images, downloads each image once into a local asset
//! directory, and rewrites the literals to the local web path.
//!
//! ## Architecture
//!
//! - **[`config`]** — Configuration loading, validation, and source file enumeration
//! - **[`classifier`]** — Heuristic "is this an external image URL" predicate
//! - **[`filename`]** — Deterministic hashed filenames for downloaded images
//! - **[`fetcher`]** — Blocking, streamed HTTP download behind the `AssetFetcher` trait
//! - **[`rewriter`]** — Tree-sitter parsing, candidate walking, and per-file rewriting
//! - **[`record`]** — Run-scoped URL → local path mapping
//! - **[`run`]** — Run driver and summary counters

pub mod classifier;
pub mod config;
pub mod fetcher;
pub mod filename;
pub mod logging;
pub mod record;
pub mod rewriter;
pub mod run;
