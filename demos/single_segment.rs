use sirdcal::{CalibrationConfig, Driver, InitialConditions, ObservedSeries, SirdModel, SirdParams};

fn main() -> anyhow::Result<()> {
    // Synthetic "observed" series from known rates; the swarm should land close to them.
    let population = 1_000_000.0;
    let truth = SirdParams::new(0.25, 0.08, 0.005);
    let init = InitialConditions { population, s: 990_000.0, i: 9_000.0, r: 900.0, d: 100.0 };

    let days = 40;
    let traj = SirdModel::new(truth, population)?.simulate(&init, days, 0.99)?;
    let counts: Vec<_> = traj
        .states
        .iter()
        .map(|st| sirdcal::CompartmentState {
            s: st.s * population,
            i: st.i * population,
            r: st.r * population,
            d: st.d * population,
        })
        .collect();
    let series = ObservedSeries::from_states(&counts);

    let cfg = CalibrationConfig {
        name: "demo".to_string(),
        population,
        lag: 0,
        days: 14,
        segments: 2,
        max_generations: 60,
        population_size: 40,
        ..CalibrationConfig::default()
    };

    let driver = Driver::new(cfg)?;
    println!("segment,lag,beta,gamma,delta,r0,fitness");
    for r in driver.run(&series)? {
        println!(
            "{},{},{:.4},{:.4},{:.4},{:.3},{:.3e}",
            r.index, r.lag, r.params.beta, r.params.gamma, r.params.delta, r.r0, r.fitness
        );
    }
    println!("truth: beta={} gamma={} delta={} r0={:.3}", truth.beta, truth.gamma, truth.delta, truth.r0());

    Ok(())
}
