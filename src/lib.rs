//! FHIR Class-Library Generator
//!
//! Ingests the FHIR XML Schema (XSD) corpus and emits a complete, type-safe
//! Rust source library: one module per schema type plus the cross-cutting
//! artifacts (constants registry, type map, module index, shared traits,
//! serialization codecs, response parser, test scaffolding).
//!
//! ## Architecture
//!
//! ```text
//! *.xsd ──> ingest (TypeStub arena)
//!             │
//!             ▼
//!         graph::resolve ── register ─> link ─> cycle check
//!             │
//!             ▼
//!         TypeGraph (frozen, read-only)
//!             │
//!             ▼
//!         emit (per type, per artifact kind)
//!             │
//!             ▼
//!         Builder (phase ordering) ──> ArtifactWriter
//! ```
//!
//! Resolution is deliberately two-phase so the frozen graph is independent of
//! filesystem enumeration order: every stub is registered before any
//! reference is linked. Once `resolve()` returns, the graph is immutable and
//! emission is pure: the same corpus always produces byte-identical output.

pub mod builder;
pub mod config;
pub mod emit;
pub mod error;
pub mod graph;
pub mod ingest;
pub mod writer;

pub use builder::{BuildState, Builder};
pub use config::Config;
pub use error::{
    BuildError, ConfigurationError, EmissionError, SchemaIntegrityError, SchemaParseError,
};
pub use graph::{Property, Type, TypeGraph, TypeKind};
pub use ingest::{ingest, StubArena, TypeStub};
pub use writer::{ArtifactWriter, FsWriter, MemoryWriter};
