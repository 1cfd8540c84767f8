//! Outcome sinks: where per-iteration reports and end-of-run snapshots go.

use std::path::{Path, PathBuf};

use serde::Serialize;

use crate::coverage::Coverage;
use crate::error::{SinkError, SinkResult};
use crate::memory::SerializedEntry;
use crate::outcome::Outcome;

/// Everything known about one iteration, as handed to a sink.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct IterationReport<'a> {
    /// 1-based iteration number.
    pub sequence: usize,
    /// Dotted id of the endpoint that was exercised.
    pub endpoint: &'a str,
    #[serde(flatten)]
    pub outcome: &'a Outcome,
}

/// Receives iteration reports as they happen and the final snapshot.
pub trait OutcomeSink {
    fn record(&mut self, report: &IterationReport<'_>) -> SinkResult<()>;

    fn finish(&mut self, memory: &[SerializedEntry], coverage: &Coverage) -> SinkResult<()>;
}

/// Writes one JSON file per iteration plus memory and coverage snapshots.
///
/// Layout:
/// ```text
/// <dir>/1.json  1.graphql  2.json  2.graphql ...
/// <dir>/memory.json
/// <dir>/coverage.json
/// ```
#[derive(Debug)]
pub struct DirectorySink {
    dir: PathBuf,
}

impl DirectorySink {
    /// Use `dir` for output, removing whatever a previous run left there.
    ///
    /// A non-empty directory is only cleared if it holds a memory snapshot
    /// or numbered reports.
    pub fn create(dir: impl Into<PathBuf>) -> SinkResult<Self> {
        let dir = dir.into();
        if dir.exists() {
            if !is_previous_output(&dir)? {
                return Err(SinkError::ForeignDirectory {
                    path: dir.display().to_string(),
                });
            }
            std::fs::remove_dir_all(&dir).map_err(|source| SinkError::Io {
                path: dir.display().to_string(),
                source,
            })?;
        }
        std::fs::create_dir_all(&dir).map_err(|source| SinkError::Io {
            path: dir.display().to_string(),
            source,
        })?;
        Ok(Self { dir })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn write(&self, file: &str, contents: &str) -> SinkResult<()> {
        let path = self.dir.join(file);
        std::fs::write(&path, contents).map_err(|source| SinkError::Io {
            path: path.display().to_string(),
            source,
        })
    }

    fn write_json<T: Serialize + ?Sized>(&self, file: &str, value: &T) -> SinkResult<()> {
        let json = serde_json::to_string_pretty(value).map_err(|e| SinkError::Serialize {
            message: e.to_string(),
        })?;
        self.write(file, &json)
    }
}

/// Whether `dir` is empty or looks like the output of an earlier run.
fn is_previous_output(dir: &Path) -> SinkResult<bool> {
    let io_err = |source: std::io::Error| SinkError::Io {
        path: dir.display().to_string(),
        source,
    };
    let mut empty = true;
    for entry in std::fs::read_dir(dir).map_err(io_err)? {
        empty = false;
        let name = entry.map_err(io_err)?.file_name();
        let name = name.to_string_lossy();
        let report_stem = name
            .strip_suffix(".json")
            .or_else(|| name.strip_suffix(".graphql"));
        if name == "memory.json" || report_stem.is_some_and(|stem| stem.parse::<usize>().is_ok()) {
            return Ok(true);
        }
    }
    Ok(empty)
}

impl OutcomeSink for DirectorySink {
    fn record(&mut self, report: &IterationReport<'_>) -> SinkResult<()> {
        self.write(&format!("{}.graphql", report.sequence), &report.outcome.operation)?;
        self.write_json(&format!("{}.json", report.sequence), report)
    }

    fn finish(&mut self, memory: &[SerializedEntry], coverage: &Coverage) -> SinkResult<()> {
        self.write_json("memory.json", memory)?;
        self.write_json("coverage.json", coverage)?;
        tracing::info!(dir = %self.dir.display(), "results written");
        Ok(())
    }
}

/// Persists nothing; payloads go to the debug log.
#[derive(Debug, Default)]
pub struct LogSink;

impl OutcomeSink for LogSink {
    fn record(&mut self, report: &IterationReport<'_>) -> SinkResult<()> {
        if let Some(data) = &report.outcome.data {
            tracing::debug!(sequence = report.sequence, endpoint = report.endpoint, %data, "response data");
        }
        Ok(())
    }

    fn finish(&mut self, memory: &[SerializedEntry], coverage: &Coverage) -> SinkResult<()> {
        tracing::info!(
            remembered = memory.len(),
            discovered = coverage.discovered_fields,
            total = coverage.total_fields,
            "run finished"
        );
        Ok(())
    }
}
