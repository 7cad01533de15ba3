use sirdcal::calibration::driver::prepare_segment;
use sirdcal::{
    CalibrationConfig, CalibrationError, CompartmentState, Driver, InitialConditions, InsufficientDataPolicy,
    ObservedSeries, SirdModel, SirdParams, Termination, Topology,
};

const POPULATION: f64 = 1_000_000.0;

fn synthetic_series(days: usize) -> ObservedSeries {
    let init = InitialConditions { population: POPULATION, s: 990_000.0, i: 9_000.0, r: 900.0, d: 100.0 };
    let traj = SirdModel::new(SirdParams::new(0.25, 0.08, 0.005), POPULATION)
        .unwrap()
        .simulate(&init, days, 0.99)
        .unwrap();
    let counts: Vec<CompartmentState> = traj
        .states
        .iter()
        .map(|st| CompartmentState {
            s: st.s * POPULATION,
            i: st.i * POPULATION,
            r: st.r * POPULATION,
            d: st.d * POPULATION,
        })
        .collect();
    ObservedSeries::from_states(&counts)
}

fn small_config() -> CalibrationConfig {
    CalibrationConfig {
        name: "test".to_string(),
        population: POPULATION,
        lag: 0,
        days: 7,
        segments: 3,
        population_size: 16,
        max_generations: 12,
        ..CalibrationConfig::default()
    }
}

#[test]
fn segments_advance_by_window_length() {
    let series = synthetic_series(30);
    let results = Driver::new(small_config()).unwrap().run(&series).unwrap();

    assert_eq!(results.len(), 3);
    assert_eq!(results.iter().map(|r| r.lag).collect::<Vec<_>>(), vec![0, 7, 14]);
    for (k, r) in results.iter().enumerate() {
        assert_eq!(r.index, k);
        assert_eq!(r.history.len(), 13);
        assert_eq!(r.termination, Termination::GenerationLimitReached);
        for v in r.params.to_vec() {
            assert!((0.001..=1.0).contains(&v));
        }
        assert!(r.fitness.is_finite() && r.fitness >= 0.0);
        assert!((r.r0 - r.params.r0()).abs() < 1e-12);
    }
}

#[test]
fn runs_are_reproducible() {
    let series = synthetic_series(30);
    let cfg = CalibrationConfig { topology: Topology::Star, ..small_config() };
    let a = Driver::new(cfg.clone()).unwrap().run(&series).unwrap();
    let b = Driver::new(cfg).unwrap().run(&series).unwrap();
    assert_eq!(a, b);
}

#[test]
fn series_exhaustion_fails_or_stops_by_policy() {
    let series = synthetic_series(30);
    let cfg = CalibrationConfig { segments: 5, max_generations: 2, ..small_config() };

    let err = Driver::new(cfg.clone()).unwrap().run(&series).unwrap_err();
    assert_eq!(err, CalibrationError::InsufficientData { needed: 36, available: 30 });

    let stopping = CalibrationConfig { on_insufficient_data: InsufficientDataPolicy::Stop, ..cfg };
    let results = Driver::new(stopping).unwrap().run(&series).unwrap();
    assert_eq!(results.len(), 4);
}

#[test]
fn observed_mass_loss_is_rejected_before_optimizing() {
    let mut series = synthetic_series(30);
    series.susceptible[5] = 0.0;
    let cfg = small_config();

    match prepare_segment(&cfg, &series, 0) {
        Err(CalibrationError::ConservationViolation { day, .. }) => assert_eq!(day, 5),
        other => panic!("expected ConservationViolation, got {:?}", other),
    }
    assert!(Driver::new(cfg).unwrap().run(&series).is_err());
}

#[test]
fn reference_window_is_shifted_one_day() {
    let series = synthetic_series(30);
    let problem = prepare_segment(&small_config(), &series, 3).unwrap();
    assert_eq!(problem.initial.s, series.susceptible[3]);
    assert_eq!(problem.reference.len(), 7);
    assert_eq!(problem.reference.i[0], series.infected[4] / POPULATION);
    assert_eq!(problem.reference.i[6], series.infected[10] / POPULATION);
}

#[test]
fn invalid_configuration_is_rejected_up_front() {
    let cfg = CalibrationConfig { weights: vec![1.0, 1.0], ..small_config() };
    assert!(matches!(Driver::new(cfg), Err(CalibrationError::InvalidConfiguration(_))));
}

#[test]
fn raised_stop_handle_skips_segments() {
    let series = synthetic_series(30);
    let driver = Driver::new(small_config()).unwrap();
    driver.stop_handle().stop();
    assert!(driver.run(&series).unwrap().is_empty());
}

#[test]
fn callback_sees_every_segment_in_order() {
    let series = synthetic_series(30);
    let driver = Driver::new(small_config()).unwrap();
    let mut seen = Vec::new();
    let results = driver
        .run_with(&series, |r| -> anyhow::Result<()> {
            seen.push(r.index);
            Ok(())
        })
        .unwrap();
    assert_eq!(seen, vec![0, 1, 2]);
    assert_eq!(results.len(), 3);
}

#[test]
fn huge_segment_count_stops_when_series_runs_out() {
    let series = synthetic_series(30);
    let cfg = CalibrationConfig {
        segments: 1 << 50,
        max_generations: 2,
        on_insufficient_data: InsufficientDataPolicy::Stop,
        ..small_config()
    };
    let results = Driver::new(cfg).unwrap().run(&series).unwrap();
    assert_eq!(results.len(), 4);
}

#[test]
fn huge_lag_reports_insufficient_data() {
    let series = synthetic_series(30);
    let cfg = CalibrationConfig { lag: usize::MAX - 3, max_generations: 2, ..small_config() };
    let err = Driver::new(cfg).unwrap().run(&series).unwrap_err();
    assert_eq!(err, CalibrationError::InsufficientData { needed: usize::MAX, available: 30 });
}

#[test]
fn segments_start_from_different_populations() {
    let series = synthetic_series(30);
    let cfg = CalibrationConfig { segments: 2, max_generations: 0, ..small_config() };
    let a = Driver::new(cfg.clone()).unwrap().run(&series).unwrap();
    let b = Driver::new(cfg).unwrap().run(&series).unwrap();
    assert_eq!(a, b);
    assert_ne!(a[0].params, a[1].params);
    assert_eq!(a[0].history.len(), 1);
}
