//! The exploration loop.
//!
//! Each iteration picks an endpoint with probability proportional to
//! `1 / rank`, synthesizes a request for it, executes it, remembers the
//! response data, reports the outcome and grows the graph from whatever the
//! response proved reachable. Everything runs on one thread; the only wait is
//! the request itself.

pub mod ingest;

use std::time::Instant;

use rand::SeedableRng;
use rand::distributions::{Distribution, WeightedIndex};
use rand::rngs::StdRng;
use serde::Serialize;

use crate::config::ProbeConfig;
use crate::coverage::Coverage;
use crate::document::Document;
use crate::error::{MemoryResult, ProbeResult, SchemaError};
use crate::graph::{EndpointGraph, EndpointId};
use crate::memory::FuzzyMemory;
use crate::outcome::{Outcome, Response};
use crate::rank::{field_guessability, rank};
use crate::schema::Schema;
use crate::sink::{IterationReport, OutcomeSink};
use crate::synth::{SynthesisOptions, Synthesizer};
use crate::transport::Transport;

/// Decides whether a response counts as a failure.
pub type FailurePredicate = Box<dyn Fn(&Response) -> bool>;

/// What one iteration did.
#[derive(Debug, Clone, PartialEq)]
pub struct Step {
    pub sequence: usize,
    pub endpoint: EndpointId,
    pub failed: bool,
    /// Endpoints added to the graph by this iteration.
    pub discovered: Vec<EndpointId>,
}

/// Totals for a finished run.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RunSummary {
    pub iterations: usize,
    pub failures: usize,
    pub endpoints: usize,
    pub remembered: usize,
    pub coverage: Coverage,
}

/// An endpoint with its current priority, for listings.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RankedEndpoint {
    pub id: String,
    pub guessability: f64,
    pub rank: f64,
    pub results: usize,
}

/// Owns every piece of exploration state and drives the loop.
pub struct Explorer {
    schema: Schema,
    graph: EndpointGraph,
    memory: FuzzyMemory,
    options: SynthesisOptions,
    rng: StdRng,
    seed: u64,
    count: usize,
    exit_on_failure: bool,
    transport: Box<dyn Transport>,
    sink: Box<dyn OutcomeSink>,
    is_failure: FailurePredicate,
    sequence: usize,
}

impl Explorer {
    /// Set up an explorer for `schema`.
    ///
    /// Fails if the schema offers nothing to explore, or if the configured
    /// seed data cannot be remembered.
    pub fn new(
        config: &ProbeConfig,
        schema: Schema,
        transport: Box<dyn Transport>,
        sink: Box<dyn OutcomeSink>,
    ) -> ProbeResult<Self> {
        let graph = EndpointGraph::from_schema(&schema)?;
        let seed = config.seed.unwrap_or_else(rand::random);

        let mut explorer = Self {
            schema,
            graph,
            memory: FuzzyMemory::default(),
            options: config.synthesis.clone(),
            rng: StdRng::seed_from_u64(seed),
            seed,
            count: config.count,
            exit_on_failure: config.exit_on_failure,
            transport,
            sink,
            is_failure: Box::new(Response::has_errors),
            sequence: 0,
        };

        let seeded = explorer.ingest(&config.input)?;
        tracing::info!(
            seed,
            endpoints = explorer.graph.len(),
            seeded,
            "explorer initialized"
        );
        Ok(explorer)
    }

    /// Replace the failure rule (default: the response reports errors).
    pub fn with_failure_predicate(mut self, predicate: impl Fn(&Response) -> bool + 'static) -> Self {
        self.is_failure = Box::new(predicate);
        self
    }

    pub fn schema(&self) -> &Schema {
        &self.schema
    }

    pub fn graph(&self) -> &EndpointGraph {
        &self.graph
    }

    pub fn memory(&self) -> &FuzzyMemory {
        &self.memory
    }

    /// Seed of the random stream; pass it back in to replay a run.
    pub fn seed(&self) -> u64 {
        self.seed
    }

    /// Iterations executed so far.
    pub fn iterations(&self) -> usize {
        self.sequence
    }

    /// Remember every scalar in `data`; returns how many entries were new.
    pub fn ingest(&mut self, data: &serde_json::Value) -> MemoryResult<usize> {
        ingest::ingest(&self.schema, &mut self.memory, data)
    }

    pub fn guessability(&self, e: EndpointId) -> MemoryResult<f64> {
        field_guessability(&self.schema, &self.memory, &self.graph.get(e).field)
    }

    pub fn rank(&self, e: EndpointId) -> MemoryResult<f64> {
        Ok(rank(&self.graph, e, self.guessability(e)?))
    }

    /// Every endpoint with its guessability and rank, in discovery order.
    pub fn ranked_endpoints(&self) -> MemoryResult<Vec<RankedEndpoint>> {
        self.graph
            .ids()
            .map(|e| {
                let guessability = self.guessability(e)?;
                Ok(RankedEndpoint {
                    id: self.graph.id(e),
                    guessability,
                    rank: rank(&self.graph, e, guessability),
                    results: self.graph.get(e).results().len(),
                })
            })
            .collect()
    }

    pub fn coverage(&self) -> Coverage {
        Coverage::compute(&self.schema, &self.graph)
    }

    /// Request text the explorer would send for `e` next.
    pub fn synthesize(&mut self, e: EndpointId) -> ProbeResult<Document> {
        let mut synth = Synthesizer::new(&self.schema, &self.memory, &self.options, &mut self.rng);
        Ok(synth.synthesize(&self.graph, e)?)
    }

    /// Weighted pick with weight `1 / rank`.
    fn pick(&mut self) -> ProbeResult<EndpointId> {
        let ids: Vec<EndpointId> = self.graph.ids().collect();
        let mut weights = Vec::with_capacity(ids.len());
        for &e in &ids {
            weights.push(1.0 / self.rank(e)?);
        }
        // Ranks are strictly positive, so only an empty graph can fail here.
        let dist = WeightedIndex::new(&weights).map_err(|_| SchemaError::NoOperations)?;
        Ok(ids[dist.sample(&mut self.rng)])
    }

    fn execute(&mut self, document: Document) -> ProbeResult<Outcome> {
        let request = document.to_string();
        let started = Instant::now();
        let result = self.transport.execute(&request);
        let elapsed_ms = started.elapsed().as_millis() as u64;

        match result {
            Ok(response) => {
                if let Some(data) = &response.data {
                    self.ingest(data)?;
                }
                let failed = (self.is_failure)(&response);
                Ok(Outcome::from_response(document, response, elapsed_ms, failed))
            }
            Err(e) => {
                tracing::warn!(error = %e, "request failed");
                Ok(Outcome::from_transport_error(document, e.to_string(), elapsed_ms))
            }
        }
    }

    /// Run one iteration.
    ///
    /// If the request failed and the explorer stops on failure, the graph is
    /// not expanded.
    pub fn step(&mut self) -> ProbeResult<Step> {
        let e = self.pick()?;
        let endpoint = self.graph.id(e);

        let document = self.synthesize(e)?;
        tracing::debug!(endpoint = %endpoint, request = %document, "request synthesized");

        let outcome = self.execute(document)?;
        let failed = outcome.failed;
        self.sequence += 1;
        let sequence = self.sequence;
        self.graph.append(e, outcome);

        if let Some(outcome) = self.graph.get(e).results().last() {
            self.sink.record(&IterationReport {
                sequence,
                endpoint: &endpoint,
                outcome,
            })?;
            tracing::info!(
                iteration = sequence,
                endpoint = %endpoint,
                status = outcome.status,
                elapsed_ms = outcome.elapsed_ms,
                "{}",
                outcome.summary()
            );
        }

        let discovered = if failed && self.exit_on_failure {
            Vec::new()
        } else {
            self.graph.expand(e, &self.schema)
        };

        Ok(Step {
            sequence,
            endpoint: e,
            failed,
            discovered,
        })
    }

    /// Run the configured number of iterations, then hand the memory and
    /// coverage snapshots to the sink.
    pub fn run(&mut self) -> ProbeResult<RunSummary> {
        tracing::info!(count = self.count, seed = self.seed, "exploration started");

        let mut failures = 0;
        for _ in 0..self.count {
            let step = self.step()?;
            if step.failed {
                failures += 1;
                if self.exit_on_failure {
                    tracing::info!(iteration = step.sequence, "stopping at first failure");
                    break;
                }
            }
        }

        let memory = self.memory.serialize();
        let coverage = self.coverage();
        self.sink.finish(&memory, &coverage)?;

        let summary = RunSummary {
            iterations: self.sequence,
            failures,
            endpoints: self.graph.len(),
            remembered: memory.len(),
            coverage,
        };
        tracing::info!(
            iterations = summary.iterations,
            failures = summary.failures,
            endpoints = summary.endpoints,
            discovered = summary.coverage.discovered_fields,
            total = summary.coverage.total_fields,
            "exploration finished"
        );
        Ok(summary)
    }
}

impl std::fmt::Debug for Explorer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Explorer")
            .field("seed", &self.seed)
            .field("iterations", &self.sequence)
            .field("endpoints", &self.graph.len())
            .field("memory", &self.memory)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{TransportError, TransportResult};
    use crate::sink::LogSink;
    use crate::transport::decode;
    use std::cell::RefCell;
    use std::rc::Rc;

    const SDL: &str = r#"
        type Query {
          hello: String
          login(username: String!, password: String!): Boolean
          customers(limit: Int, offset: Int): [Customer]
        }
        union Customer = Individual | Company
        type Individual { id: ID! name: String contracts: [Contract] }
        type Company { id: ID! name: String form: String contracts: [Contract] }
        type Contract { id: ID! }
    "#;

    /// Answers by the first root field named in the request.
    struct Canned {
        log: Rc<RefCell<Vec<String>>>,
    }

    impl Transport for Canned {
        fn execute(&self, request: &str) -> TransportResult<Response> {
            self.log.borrow_mut().push(request.to_string());
            let body = if request.contains("login") {
                r#"{ "data": { "login": null }, "errors": [{ "message": "Invalid credentials", "path": ["login"] }] }"#
            } else if request.contains("customers") {
                r#"{ "data": { "customers": [
                    { "__typename": "Individual", "id": "4", "name": "Siegmeyer", "contracts": [{ "__typename": "Contract", "id": "41" }] },
                    { "__typename": "Company", "id": "5", "name": "Darkmoon", "form": "Covenant", "contracts": [] }
                ] } }"#
            } else {
                r#"{ "data": { "hello": "Hello world!" } }"#
            };
            decode(200, body)
        }
    }

    struct Unreachable;

    impl Transport for Unreachable {
        fn execute(&self, _request: &str) -> TransportResult<Response> {
            Err(TransportError::Request {
                url: "http://localhost".into(),
                message: "connection refused".into(),
            })
        }
    }

    fn config(seed: u64, count: usize) -> ProbeConfig {
        ProbeConfig {
            seed: Some(seed),
            count,
            ..ProbeConfig::with_url("http://localhost/graphql")
        }
    }

    fn explorer(config: &ProbeConfig) -> (Explorer, Rc<RefCell<Vec<String>>>) {
        let log = Rc::new(RefCell::new(Vec::new()));
        let explorer = Explorer::new(
            config,
            Schema::from_sdl(SDL).unwrap(),
            Box::new(Canned { log: log.clone() }),
            Box::new(LogSink),
        )
        .unwrap();
        (explorer, log)
    }

    #[test]
    fn same_seed_same_requests() {
        let (mut a, log_a) = explorer(&config(42, 30));
        let (mut b, log_b) = explorer(&config(42, 30));
        a.run().unwrap();
        b.run().unwrap();
        assert_eq!(*log_a.borrow(), *log_b.borrow());
        assert_eq!(log_a.borrow().len(), 30);
    }

    #[test]
    fn graph_grows_from_responses() {
        let (mut explorer, _) = explorer(&config(1, 60));
        let summary = explorer.run().unwrap();
        assert_eq!(summary.iterations, 60);

        let graph = explorer.graph();
        assert!(graph.find("customers.contracts<Individual>").is_some());
        assert!(graph.find("customers.contracts<Company>").is_some());
        assert!(summary.coverage.discovered_fields >= 5);
        assert!(!explorer.memory().is_empty());
    }

    #[test]
    fn seed_data_is_remembered() {
        let mut cfg = config(3, 0);
        cfg.input = serde_json::json!({ "username": "artorias", "password": "sif" });
        let (explorer, _) = explorer(&cfg);
        assert_eq!(explorer.memory().len(), 2);

        let login = explorer.graph().find("login").unwrap();
        assert!(explorer.guessability(login).unwrap() > 0.0);
    }

    #[test]
    fn stops_at_first_failure() {
        let mut cfg = config(5, 50);
        cfg.exit_on_failure = true;
        let (explorer, _) = explorer(&cfg);
        let mut explorer = explorer.with_failure_predicate(|_| true);

        let summary = explorer.run().unwrap();
        assert_eq!(summary.iterations, 1);
        assert_eq!(summary.failures, 1);
        assert_eq!(explorer.graph().len(), 3);
    }

    #[test]
    fn transport_failures_are_recorded_not_raised() {
        let mut explorer = Explorer::new(
            &config(9, 4),
            Schema::from_sdl(SDL).unwrap(),
            Box::new(Unreachable),
            Box::new(LogSink),
        )
        .unwrap();
        let summary = explorer.run().unwrap();
        assert_eq!(summary.failures, 4);

        let outcome = explorer.graph().outcomes().next().unwrap();
        assert_eq!(outcome.status, 0);
        assert!(outcome.failed);
        assert!(outcome.transport_error.as_deref().unwrap().contains("connection refused"));
        assert!(outcome.errors.is_none());
    }

    #[test]
    fn lists_ranked_endpoints() {
        let (explorer, _) = explorer(&config(2, 0));
        let ranked = explorer.ranked_endpoints().unwrap();
        let ids: Vec<&str> = ranked.iter().map(|r| r.id.as_str()).collect();
        assert_eq!(ids, vec!["hello", "login", "customers"]);
        assert_eq!(ranked[0].rank, 8.0);
        assert_eq!(ranked[1].rank, 12.0 + 7.0);
    }
}
