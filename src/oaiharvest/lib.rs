//! # oaiharvest
//!
//! Harvests metadata records from OAI-PMH providers and writes each record as
//! an XML file to a local directory.
//!
//! The OAI-PMH protocol itself (verbs, resumption tokens, selective harvesting)
//! belongs to a protocol client behind the [`source::RecordSource`] trait. This
//! crate owns what happens to the records afterwards.
//!
//! ## Layers
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │  CLI (main.rs, args.rs)                                     │
//! │  - Parses arguments, resolves providers, prints summaries   │
//! │  - The ONLY place that knows about stdout/stderr/exit codes │
//! └─────────────────────────────────────────────────────────────┘
//!                              │
//!                              ▼
//! ┌─────────────────────────────────────────────────────────────┐
//! │  Harvester (harvest.rs)                                     │
//! │  - One linear pass over a record stream                     │
//! │  - Fail-fast or keep-going, sequential or on a worker pool  │
//! └─────────────────────────────────────────────────────────────┘
//!                 │                              │
//!                 ▼                              ▼
//! ┌───────────────────────────────┐  ┌──────────────────────────┐
//! │  Sources (source/)            │  │  Stores (store/)         │
//! │  - RecordSource trait         │  │  - RecordStore trait     │
//! │  - JSON-lines record dumps    │  │  - DirectoryStore        │
//! └───────────────────────────────┘  │  - InMemoryStore         │
//!                                    └──────────────────────────┘
//!                                                │
//!                                                ▼
//!                                    ┌──────────────────────────┐
//!                                    │  path.rs, content.rs     │
//!                                    │  - File layout, escaping │
//!                                    │  - Entity/EOL handling   │
//!                                    └──────────────────────────┘
//! ```
//!
//! ## On-disk layout
//!
//! One file per (identifier, metadataPrefix):
//! `<root>/[<subdirs>/]<escaped-identifier>.<metadataPrefix>.xml`, UTF-8 with
//! `\n` line endings. See [`path`] for the escaping rules. Re-harvesting
//! overwrites files in place.
//!
//! ## Module Overview
//!
//! - [`harvest`]: the `Harvester` trait and the store-backed harvester
//! - [`store`]: storage abstraction and implementations
//! - [`source`]: the record source boundary
//! - [`path`]: record file paths
//! - [`content`]: payload normalization
//! - [`model`]: `Header`, `Record`
//! - [`config`]: store settings and the provider configuration file
//! - [`error`]: error types

pub mod config;
pub mod content;
pub mod error;
pub mod harvest;
pub mod model;
pub mod path;
pub mod source;
pub mod store;
