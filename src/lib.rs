//! Library name resolution and token-budgeted documentation bundles for AI
//! agents and LLMs.
//!
//! `context-docs` turns a free-text library name into a canonical
//! `/owner/name` id using a refreshable registry, then assembles documentation
//! for that id from prioritized sources (GitHub, official docs, package
//! registries), ranks it by a quality heuristic and cuts it to a token budget.
//! Results are memoized in a TTL cache keyed on the request shape.

pub mod aggregate;
pub mod cache;
pub mod clock;
pub mod config;
pub mod error;
pub mod fetch;
pub mod registry;
pub mod resolver;
pub mod service;
pub mod telemetry;
pub mod types;

pub use config::Settings;
pub use error::{DocsError, ErrorKind};
pub use service::DocsService;
