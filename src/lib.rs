// thiserror's #[error("...{field}...")] format strings reference struct fields,
// but the compiler doesn't see through the derive macro and reports false positives.
#![allow(unused_assignments)]

//! # gql-probe
//!
//! Schema-driven exploration and fuzzing for GraphQL APIs. No hand-written
//! test cases: the probe walks the schema outward from the root fields,
//! synthesizes plausible requests, executes them, and learns from the values
//! it sees so later arguments look increasingly realistic.
//!
//! ## Architecture
//!
//! - **Schema** (`schema`): typed view of the API, loaded from introspection or SDL
//! - **Endpoint graph** (`graph`): discovered fields, their history, and expansion
//! - **Fuzzy memory** (`memory`): scalar values recalled by label similarity
//! - **Synthesis** (`synth`): selections and memory-guided arguments for one endpoint
//! - **Ranking** (`rank`): guessability and exploration priority
//! - **Exploration** (`explore`): the pick → synthesize → execute → learn → expand loop
//! - **Transport and sinks** (`transport`, `sink`): HTTP execution and result output
//!
//! ## Library usage
//!
//! ```no_run
//! use gql_probe::config::ProbeConfig;
//! use gql_probe::explore::Explorer;
//! use gql_probe::sink::LogSink;
//! use gql_probe::transport::HttpTransport;
//!
//! let config = ProbeConfig::with_url("http://localhost:4000/graphql");
//! let schema = config.load_schema().unwrap();
//! let transport = HttpTransport::new(&config.url, config.headers.clone(), config.timeout());
//! let mut explorer = Explorer::new(&config, schema, Box::new(transport), Box::new(LogSink)).unwrap();
//! let summary = explorer.run().unwrap();
//! println!("{} of {} fields reached", summary.coverage.discovered_fields, summary.coverage.total_fields);
//! ```

pub mod config;
pub mod coverage;
pub mod document;
pub mod error;
pub mod explore;
pub mod graph;
pub mod memory;
pub mod outcome;
pub mod rank;
pub mod schema;
pub mod sink;
pub mod synth;
pub mod transport;
