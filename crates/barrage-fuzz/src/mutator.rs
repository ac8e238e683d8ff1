//! External mutation tool driver.
//!
//! The mutation tool (Radamsa-compatible command line) is file-based
//! and byte-oriented: valid samples go in as one file per leaf, fuzzed
//! cases come out as numbered files. Its mutation catalogue is part of
//! the tool's observable behaviour, so it is never reimplemented
//! in-process.

use std::fs;
use std::path::PathBuf;
use std::process::Command;

use barrage_core::{EngineError, Node};
use indexmap::IndexMap;
use tempfile::TempDir;
use tracing::debug;

use crate::collector::ValueBuckets;

/// Per-key fuzzed byte strings, `cases` entries per key, plus the
/// wildcard stream fuzzed from the union of all leaves.
#[derive(Debug)]
pub struct FuzzSets {
    pub by_key: IndexMap<Vec<u8>, Vec<Vec<u8>>>,
    pub wildcard: Vec<Vec<u8>>,
}

/// Handle to a verified mutation binary.
#[derive(Debug, Clone)]
pub struct Mutator {
    path: PathBuf,
}

impl Mutator {
    /// Verify that the binary at `path` can be executed at all, by
    /// running its `--help`. An unusable toolchain aborts the scenario
    /// before any traffic is sent.
    pub fn new(path: impl Into<PathBuf>) -> Result<Mutator, EngineError> {
        let path = path.into();
        let output = Command::new(&path)
            .arg("--help")
            .output()
            .map_err(|e| unavailable(&path, &e.to_string()))?;
        if !output.status.success() {
            return Err(unavailable(
                &path,
                &format!("--help exited with {}", output.status),
            ));
        }
        Ok(Mutator { path })
    }

    /// Fuzz every key's sample list, producing `cases` outputs per key.
    /// Keys without samples of their own are fuzzed from the catch-all
    /// bucket; the wildcard stream always is.
    pub fn fuzz_values(
        &self,
        buckets: &ValueBuckets,
        cases: usize,
    ) -> Result<FuzzSets, EngineError> {
        let mut by_key = IndexMap::new();
        for key in buckets.by_key.keys() {
            let fuzzed = self.fuzz_samples(buckets.samples_for(key), cases)?;
            by_key.insert(key.clone(), fuzzed);
        }
        let wildcard = self.fuzz_samples(&buckets.all, cases)?;
        Ok(FuzzSets { by_key, wildcard })
    }

    /// One mutation-tool invocation over one sample list.
    fn fuzz_samples(&self, samples: &[Node], cases: usize) -> Result<Vec<Vec<u8>>, EngineError> {
        // Scratch directories are removed on every exit path, including
        // the error returns below, when the `TempDir`s drop.
        let sample_dir = scratch_dir(&self.path)?;
        let output_dir = scratch_dir(&self.path)?;

        for (index, sample) in samples.iter().enumerate() {
            let file = sample_dir.path().join(format!("{}.case", index + 1));
            fs::write(&file, sample.stringify())
                .map_err(|e| unavailable(&self.path, &e.to_string()))?;
        }

        let pattern = output_dir.path().join("%n.fuzz");
        debug!(
            tool = %self.path.display(),
            samples = samples.len(),
            cases,
            "running mutation tool"
        );
        let status = Command::new(&self.path)
            .arg("-o")
            .arg(&pattern)
            .arg("-n")
            .arg(cases.to_string())
            .arg("-r")
            .arg(sample_dir.path())
            .status()
            .map_err(|e| unavailable(&self.path, &e.to_string()))?;
        if !status.success() {
            return Err(unavailable(&self.path, &format!("exited with {status}")));
        }

        // Outputs are numbered 1..=cases; read in that order so rounds
        // are deterministic. Contents are raw bytes and intentionally
        // may not be valid UTF-8.
        let mut fuzzed = Vec::with_capacity(cases);
        for n in 1..=cases {
            let file = output_dir.path().join(format!("{n}.fuzz"));
            let bytes = fs::read(&file).map_err(|e| {
                unavailable(&self.path, &format!("missing output {}: {e}", file.display()))
            })?;
            fuzzed.push(bytes);
        }
        Ok(fuzzed)
    }
}

fn scratch_dir(tool: &std::path::Path) -> Result<TempDir, EngineError> {
    TempDir::new().map_err(|e| unavailable(tool, &format!("cannot create scratch dir: {e}")))
}

fn unavailable(path: &std::path::Path, message: &str) -> EngineError {
    EngineError::ToolchainUnavailable {
        tool: path.display().to_string(),
        message: message.to_string(),
    }
}
