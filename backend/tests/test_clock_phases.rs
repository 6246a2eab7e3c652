//! Tests for shot-clock phase buckets
//!
//! Bucket ranges must partition [0, duration] with no gaps or overlap.

use possession_sim_core::core::phases::DEFAULT_SHOT_CLOCK;
use possession_sim_core::{ClockPhases, PhaseError};

fn assert_partition(phases: &ClockPhases) {
    let n = phases.num_buckets();
    let (first_lo, _) = phases.range(0).unwrap();
    let (_, last_hi) = phases.range(n - 1).unwrap();
    assert_eq!(first_lo, 0.0);
    assert_eq!(last_hi, phases.duration());
    for b in 1..n {
        let (_, prev_hi) = phases.range(b - 1).unwrap();
        let (lo, hi) = phases.range(b).unwrap();
        assert_eq!(prev_hi, lo, "gap or overlap between bucket {} and {}", b - 1, b);
        assert!(lo < hi);
    }
    assert!(phases.range(n).is_none());
}

#[test]
fn test_uniform_partition() {
    for n in 1..=6 {
        let phases = ClockPhases::uniform(DEFAULT_SHOT_CLOCK, n).unwrap();
        assert_eq!(phases.num_buckets(), n);
        assert_partition(&phases);
    }
}

#[test]
fn test_every_clock_value_lands_in_its_range() {
    let phases = ClockPhases::uniform(24.0, 3).unwrap();
    let mut clock = 0.0;
    while clock <= 24.0 {
        let bucket = phases.bucket(clock).unwrap();
        let (lo, hi) = phases.range(bucket).unwrap();
        assert!(clock >= lo, "clock {} below bucket {} range", clock, bucket);
        assert!(clock < hi || (bucket == 2 && clock == 24.0));
        clock += 0.1;
    }
}

#[test]
fn test_clock_beyond_duration_maps_to_last_bucket() {
    let phases = ClockPhases::uniform(24.0, 3).unwrap();
    assert_eq!(phases.bucket(24.0).unwrap(), 2);
    assert_eq!(phases.bucket(30.0).unwrap(), 2);
}

#[test]
fn test_quantile_boundaries() {
    // 30 values: 10 near 5s, 10 near 12s, 10 near 20s
    let mut clocks = Vec::new();
    for i in 0..10 {
        clocks.push(4.0 + 0.1 * i as f64);
        clocks.push(11.0 + 0.1 * i as f64);
        clocks.push(19.0 + 0.1 * i as f64);
    }
    let phases = ClockPhases::quantile(&clocks, 3, 24.0).unwrap();
    assert_partition(&phases);
    assert_eq!(phases.bucket(4.5).unwrap(), 0);
    assert_eq!(phases.bucket(11.5).unwrap(), 1);
    assert_eq!(phases.bucket(19.5).unwrap(), 2);
}

#[test]
fn test_quantile_collapse_falls_back_to_uniform() {
    let clocks = vec![12.0; 50];
    let phases = ClockPhases::quantile(&clocks, 3, 24.0).unwrap();
    assert_eq!(phases, ClockPhases::uniform(24.0, 3).unwrap());
}

#[test]
fn test_invalid_layouts_rejected() {
    assert_eq!(
        ClockPhases::from_boundaries(0.0, vec![]),
        Err(PhaseError::InvalidDuration(0.0))
    );
    assert!(matches!(
        ClockPhases::from_boundaries(24.0, vec![10.0, 5.0]),
        Err(PhaseError::InvalidBoundaries { .. })
    ));
    assert!(matches!(
        ClockPhases::from_boundaries(24.0, vec![0.0, 12.0]),
        Err(PhaseError::InvalidBoundaries { .. })
    ));
    assert!(matches!(
        ClockPhases::from_boundaries(24.0, vec![12.0, 24.0]),
        Err(PhaseError::InvalidBoundaries { .. })
    ));
}
