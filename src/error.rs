//! Rich diagnostic error types for gql-probe.
//!
//! Each subsystem defines its own error type with miette `#[diagnostic]` derives,
//! providing error codes, help text, and source chains so users know exactly what
//! went wrong and how to fix it.

use miette::Diagnostic;
use thiserror::Error;

/// Top-level error type for gql-probe.
///
/// Each variant wraps a subsystem-specific error, preserving the full diagnostic
/// chain (error codes, help text) through to the user.
#[derive(Debug, Error, Diagnostic)]
pub enum ProbeError {
    #[error(transparent)]
    #[diagnostic(transparent)]
    Schema(#[from] SchemaError),

    #[error(transparent)]
    #[diagnostic(transparent)]
    Memory(#[from] MemoryError),

    #[error(transparent)]
    #[diagnostic(transparent)]
    Synth(#[from] SynthError),

    #[error(transparent)]
    #[diagnostic(transparent)]
    Transport(#[from] TransportError),

    #[error(transparent)]
    #[diagnostic(transparent)]
    Sink(#[from] SinkError),

    #[error(transparent)]
    #[diagnostic(transparent)]
    Config(#[from] ConfigError),
}

/// Convenience result alias for top-level operations.
pub type ProbeResult<T> = std::result::Result<T, ProbeError>;

// ---------------------------------------------------------------------------
// Schema errors
// ---------------------------------------------------------------------------

#[derive(Debug, Error, Diagnostic)]
pub enum SchemaError {
    #[error("no operations found: the query type has no non-trivial fields")]
    #[diagnostic(
        code(gql_probe::schema::no_operations),
        help(
            "Exploration starts from root fields that take arguments or return \
             object types. Check that the endpoint exposes a query type and that \
             introspection is not filtered."
        )
    )]
    NoOperations,

    #[error("schema does not declare a query type")]
    #[diagnostic(
        code(gql_probe::schema::missing_query_type),
        help("Declare `type Query {{ ... }}` or a `schema {{ query: ... }}` block.")
    )]
    MissingQueryType,

    #[error("unknown type: \"{name}\"")]
    #[diagnostic(
        code(gql_probe::schema::unknown_type),
        help(
            "A type reference points to a type that is not defined in the schema. \
             Make sure the schema document is complete."
        )
    )]
    UnknownType { name: String },

    #[error("schema parse error at line {line}: {message}")]
    #[diagnostic(
        code(gql_probe::schema::parse),
        help("The SDL document could not be parsed. Check the syntax around the reported line.")
    )]
    Parse { line: usize, message: String },

    #[error("introspection failed: {message}")]
    #[diagnostic(
        code(gql_probe::schema::introspection),
        help(
            "The introspection query was rejected or returned no data. Check the URL \
             and headers, or pass a schema file with --schema."
        )
    )]
    Introspection { message: String },
}

pub type SchemaResult<T> = std::result::Result<T, SchemaError>;

// ---------------------------------------------------------------------------
// Memory errors
// ---------------------------------------------------------------------------

#[derive(Debug, Error, Diagnostic)]
pub enum MemoryError {
    #[error("memory tokenizer produced an empty token for key \"{key}\"")]
    #[diagnostic(
        code(gql_probe::memory::empty_token),
        help(
            "A custom tokenizer must never return empty strings. \
             Filter empty pieces before returning them."
        )
    )]
    EmptyToken { key: String },
}

pub type MemoryResult<T> = std::result::Result<T, MemoryError>;

// ---------------------------------------------------------------------------
// Synthesis errors
// ---------------------------------------------------------------------------

#[derive(Debug, Error, Diagnostic)]
pub enum SynthError {
    #[error("cannot synthesize request for \"{endpoint}\": parent has no non-null results")]
    #[diagnostic(
        code(gql_probe::synth::missing_parent_results),
        help(
            "Nested endpoints are only reachable through a prior request whose parent \
             path resolved to data. This indicates an expansion bug; please report it."
        )
    )]
    MissingParentResults { endpoint: String },

    #[error("cannot synthesize input of type \"{name}\"")]
    #[diagnostic(
        code(gql_probe::synth::unknown_type),
        help("The argument type is not an input type known to the schema.")
    )]
    UnknownType { name: String },

    #[error(transparent)]
    #[diagnostic(transparent)]
    Memory(#[from] MemoryError),
}

pub type SynthResult<T> = std::result::Result<T, SynthError>;

// ---------------------------------------------------------------------------
// Transport errors
// ---------------------------------------------------------------------------

#[derive(Debug, Error, Diagnostic)]
pub enum TransportError {
    #[error("request to {url} failed: {message}")]
    #[diagnostic(
        code(gql_probe::transport::request),
        help("Check that the endpoint is reachable and accepts POST requests.")
    )]
    Request { url: String, message: String },

    #[error("could not decode response (status {status}): {message}")]
    #[diagnostic(
        code(gql_probe::transport::decode),
        help("The server did not answer with a JSON GraphQL response.")
    )]
    Decode { status: u16, message: String },
}

pub type TransportResult<T> = std::result::Result<T, TransportError>;

// ---------------------------------------------------------------------------
// Sink errors
// ---------------------------------------------------------------------------

#[derive(Debug, Error, Diagnostic)]
pub enum SinkError {
    #[error("I/O error writing {path}")]
    #[diagnostic(
        code(gql_probe::sink::io),
        help(
            "A filesystem operation failed. Check that the output directory is \
             writable and that the disk is not full."
        )
    )]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("serialization error: {message}")]
    #[diagnostic(
        code(gql_probe::sink::serialize),
        help("A report could not be encoded as JSON.")
    )]
    Serialize { message: String },

    #[error("refusing to clear {path}: it does not hold output of a previous run")]
    #[diagnostic(
        code(gql_probe::sink::foreign_directory),
        help(
            "The output directory is emptied before each run. Pick a new or empty \
             directory, or one written by an earlier run."
        )
    )]
    ForeignDirectory { path: String },
}

pub type SinkResult<T> = std::result::Result<T, SinkError>;

// ---------------------------------------------------------------------------
// Config errors
// ---------------------------------------------------------------------------

#[derive(Debug, Error, Diagnostic)]
pub enum ConfigError {
    #[error("failed to read config file: {path}")]
    #[diagnostic(
        code(gql_probe::config::read),
        help("Check that the file exists and is readable.")
    )]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to write config file: {path}")]
    #[diagnostic(
        code(gql_probe::config::write),
        help("Ensure you have write permissions to the target directory.")
    )]
    Write {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse {path}: {message}")]
    #[diagnostic(
        code(gql_probe::config::parse),
        help("The file must be valid TOML (config) or JSON (input seed data).")
    )]
    Parse { path: String, message: String },

    #[error("invalid configuration: {message}")]
    #[diagnostic(
        code(gql_probe::config::invalid),
        help("Fix the offending value in the config file or on the command line.")
    )]
    Invalid { message: String },
}

pub type ConfigResult<T> = std::result::Result<T, ConfigError>;
