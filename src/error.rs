//! Error taxonomy for the generation pipeline
//!
//! Every error here is fatal: the pipeline never retries and never recovers
//! silently. Benign conditions (unnamed schema elements, skipped umbrella
//! documents) are tracing events, not errors.

use std::path::PathBuf;

use thiserror::Error;

/// A schema document could not be read or parsed. Aborts ingestion.
#[derive(Error, Debug)]
pub enum SchemaParseError {
    #[error("unable to read schema document {path}: {source}")]
    Unreadable {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("schema document {path} is not well-formed XML: {detail}")]
    Malformed { path: PathBuf, detail: String },

    #[error("schema document {path} has root element <{found}>, expected <xs:schema>")]
    UnexpectedRoot { path: PathBuf, found: String },

    #[error("base schema document not found at expected path {path}")]
    MissingBaseDocument { path: PathBuf },
}

/// The stub set violates a graph invariant. Aborts resolution.
#[derive(Error, Debug)]
pub enum SchemaIntegrityError {
    #[error(
        "duplicate registration of type {namespace}::{name} (declared in {first} and {second})"
    )]
    DuplicateType {
        namespace: String,
        name: String,
        first: PathBuf,
        second: PathBuf,
    },

    #[error("type {referrer} extends unknown base type {missing}")]
    UnresolvedBase { referrer: String, missing: String },

    #[error("property {referrer}.{property} references unknown type {missing}")]
    UnresolvedProperty {
        referrer: String,
        property: String,
        missing: String,
    },

    #[error("inheritance cycle through {members:?} is not whitelisted")]
    InheritanceCycle { members: Vec<String> },
}

/// A render function failed, or the writer refused an artifact.
/// Aborts the current build phase.
#[derive(Error, Debug)]
pub enum EmissionError {
    #[error("no template registered for ({type_kind}, {artifact_kind})")]
    NoTemplate {
        type_kind: String,
        artifact_kind: String,
    },

    #[error("failed to render {artifact_kind} for type {type_name}: {detail}")]
    RenderFailed {
        type_name: String,
        artifact_kind: String,
        detail: String,
    },

    #[error("failed to write artifact {path}: {source}")]
    WriteFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Invalid configuration, detected before any ingestion begins.
#[derive(Error, Debug)]
pub enum ConfigurationError {
    #[error("schema source path is not set")]
    MissingSourcePath,

    #[error("schema source path {0} does not exist or is not a directory")]
    BadSourcePath(PathBuf),

    #[error("output path is not set")]
    MissingOutputPath,

    #[error("invalid configuration: {0}")]
    Invalid(String),
}

/// Top-level build error: the sum of every fatal condition a run can hit.
#[derive(Error, Debug)]
pub enum BuildError {
    #[error(transparent)]
    Configuration(#[from] ConfigurationError),

    #[error(transparent)]
    Parse(#[from] SchemaParseError),

    #[error(transparent)]
    Integrity(#[from] SchemaIntegrityError),

    #[error(transparent)]
    Emission(#[from] EmissionError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type for orchestrator-level operations
pub type Result<T> = std::result::Result<T, BuildError>;
