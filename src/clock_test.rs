use super::*;

#[test]
fn age_is_elapsed_seconds() {
    assert!((age(10.5, 10.0) - 0.5).abs() < f64::EPSILON);
}

#[test]
fn age_clamps_on_regression() {
    assert!(age(5.0, 9.0).abs() < f64::EPSILON);
}

#[test]
fn system_clock_is_past_epoch_and_monotonic() {
    let clock = SystemClock::new();
    let a = clock.now();
    let b = clock.now();
    assert!(a > 1_600_000_000.0);
    assert!(b >= a);
}

#[test]
fn manual_clock_clones_share_reading() {
    let clock = ManualClock::new(1.0);
    let other = clock.clone();
    clock.advance(2.5);
    assert!((other.now() - 3.5).abs() < f64::EPSILON);
}

#[test]
fn manual_clock_can_go_backwards() {
    let clock = ManualClock::new(10.0);
    clock.set(4.0);
    assert!((clock.now() - 4.0).abs() < f64::EPSILON);
}
