use std::fs::File;
use std::path::{Path, PathBuf};

use anyhow::Context;
use serde::Serialize;

use crate::calibration::driver::SegmentResult;

#[derive(Debug, Serialize)]
struct SolutionRow {
    beta: f64,
    gamma: f64,
    delta: f64,
    fitness: f64,
}

/// Best-solution records, one CSV row per segment in `beta,gamma,delta,fitness` order.
///
/// Creating the writer truncates any file left by a previous run.
pub struct SolutionWriter {
    path: PathBuf,
    writer: csv::Writer<File>,
}

impl SolutionWriter {
    pub fn create(out_dir: impl AsRef<Path>, name: &str) -> anyhow::Result<Self> {
        std::fs::create_dir_all(out_dir.as_ref()).context("create solutions dir failed")?;
        let path = out_dir.as_ref().join(format!("{}.csv", name));
        let writer = csv::Writer::from_path(&path)
            .with_context(|| format!("create solutions file failed (path={:?})", path))?;
        Ok(Self { path, writer })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn append(&mut self, result: &SegmentResult) -> anyhow::Result<()> {
        self.writer
            .serialize(SolutionRow {
                beta: result.params.beta,
                gamma: result.params.gamma,
                delta: result.params.delta,
                fitness: result.fitness,
            })
            .with_context(|| format!("write solution for segment {} failed", result.index))?;
        self.writer.flush().context("flush solutions file failed")?;
        Ok(())
    }
}
