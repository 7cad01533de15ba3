use std::path::PathBuf;

use anyhow::Context;
use clap::Parser;
use tracing_subscriber::EnvFilter;

use sirdcal::io::convergence_log::write_convergence_log;
use sirdcal::io::series::load_observed_csv;
use sirdcal::io::solutions::SolutionWriter;
use sirdcal::{CalibrationConfig, Driver, LossMetric, Topology};

/// Fit SIRD rates (beta, gamma, delta) to an observed series, one PSO run per segment.
#[derive(Parser, Debug)]
#[command(name = "sirdcal")]
#[command(about = "Segmented SIRD calibration with particle swarm optimization", long_about = None)]
struct Cli {
    /// Processed daily series (totale_positivi, dimessi_guariti, deceduti, suscettibili)
    #[arg(long)]
    data: String,
    /// Directory for solution CSVs and convergence logs
    #[arg(long, default_value = "data/solutions")]
    out_dir: PathBuf,
    /// JSON calibration config; flags below override it
    #[arg(long)]
    config: Option<PathBuf>,
    /// Ten one-week segments instead of one ten-week window
    #[arg(long)]
    shorter_weeks: bool,
    #[arg(long)]
    seed: Option<u64>,
    #[arg(long)]
    generations: Option<usize>,
    #[arg(long)]
    population_size: Option<usize>,
    #[arg(long)]
    topology: Option<Topology>,
    #[arg(long)]
    loss: Option<LossMetric>,
    /// Objective weights for S,I,R,D, e.g. `0,1,1,1`
    #[arg(long, value_delimiter = ',')]
    weights: Option<Vec<f64>>,
    /// Print the best solution of every segment
    #[arg(long)]
    display: bool,
}

impl Cli {
    fn calibration_config(&self) -> anyhow::Result<CalibrationConfig> {
        let mut cfg = match &self.config {
            Some(path) => CalibrationConfig::from_json_file(path)?,
            None if self.shorter_weeks => CalibrationConfig::shorter_weeks(),
            None => CalibrationConfig::default(),
        };
        if self.shorter_weeks && self.config.is_some() {
            cfg.name = "shorter_weeks".to_string();
            cfg.days = 7;
            cfg.segments = 10;
        }
        if let Some(seed) = self.seed { cfg.seed = seed; }
        if let Some(g) = self.generations { cfg.max_generations = g; }
        if let Some(n) = self.population_size { cfg.population_size = n; }
        if let Some(t) = self.topology { cfg.topology = t; }
        if let Some(l) = self.loss { cfg.loss = l; }
        if let Some(w) = &self.weights { cfg.weights = w.clone(); }
        Ok(cfg)
    }
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("sirdcal=info")))
        .init();

    let cli = Cli::parse();
    let cfg = cli.calibration_config()?;
    let driver = Driver::new(cfg.clone()).context("invalid calibration config")?;

    let series = load_observed_csv(&cli.data)?;
    tracing::info!(rows = series.len(), path = %cli.data, "loaded observed series");

    let mut solutions = SolutionWriter::create(&cli.out_dir, &cfg.name)?;
    let results = driver.run_with(&series, |result| -> anyhow::Result<()> {
        solutions.append(result)?;
        write_convergence_log(&cli.out_dir, &cfg.name, cfg.days, result)?;
        if cli.display {
            println!(
                "Best solution: [{}, {}, {}] with fitness: {}",
                result.params.beta, result.params.gamma, result.params.delta, result.fitness
            );
        }
        Ok(())
    })?;

    tracing::info!(segments = results.len(), path = ?solutions.path(), "calibration finished");
    Ok(())
}
