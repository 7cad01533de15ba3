use anyhow::Context;

use crate::calibration::driver::SegmentResult;
use crate::calibration::pso::Termination;

/// Writes one segment's convergence curve as `generation,min_fitness` rows after a
/// `key=value` header. Returns the path of the new file.
pub fn write_convergence_log(
    out_dir: impl AsRef<std::path::Path>,
    name: &str,
    days: usize,
    result: &SegmentResult,
) -> anyhow::Result<std::path::PathBuf> {
    use std::io::Write;

    std::fs::create_dir_all(out_dir.as_ref()).context("create convergence log dir failed")?;
    let path = out_dir.as_ref().join(format!("convergence_{}_segment{}.txt", name, result.index));
    let mut f = std::fs::File::create(&path)
        .with_context(|| format!("create convergence log file failed (path={:?})", path))?;

    let termination = match result.termination {
        Termination::GenerationLimitReached => "generation_limit_reached",
        Termination::Stopped => "stopped",
    };

    writeln!(f, "name={}", name)?;
    writeln!(f, "segment={}", result.index)?;
    writeln!(f, "lag={}", result.lag)?;
    writeln!(f, "days={}", days)?;
    writeln!(f, "generations={}", result.history.len().saturating_sub(1))?;
    writeln!(f, "beta={:.6}", result.params.beta)?;
    writeln!(f, "gamma={:.6}", result.params.gamma)?;
    writeln!(f, "delta={:.6}", result.params.delta)?;
    writeln!(f, "r0={:.6}", result.r0)?;
    writeln!(f, "fitness={:.6e}", result.fitness)?;
    writeln!(f, "termination={}", termination)?;
    writeln!(f)?;
    writeln!(f, "generation,min_fitness")?;

    for (generation, value) in result.history.iter().enumerate() {
        anyhow::ensure!(!value.is_nan(), "NaN fitness at generation {}", generation);
        writeln!(f, "{},{:.6e}", generation, value)?;
    }

    Ok(path)
}
