use super::*;
use crate::engine::throttle::Throttler;
use crate::participant::{Color, Point};
use serde_json::json;
use std::time::Duration;

const STALE: f64 = 120.0;

fn reconciler(id: &str) -> Reconciler {
    Reconciler::new(CursorState::new(ParticipantId::new(id), Point::new(0.5, 0.5), 0.0), STALE)
}

fn remote(id: &str, x: f64, y: f64, drawing: bool, t: f64) -> CursorState {
    CursorState {
        id: ParticipantId::new(id),
        x,
        y,
        drawing,
        color: Color::new("#00ff00"),
        last_update: t,
    }
}

fn row(id: &str, x: f64, y: f64, drawing: bool, t: f64) -> serde_json::Value {
    WireUpdate::from_state(&remote(id, x, y, drawing, t)).to_value()
}

// =============================================================
// Remote updates
// =============================================================

#[test]
fn remote_drawing_updates_synthesize_one_segment() {
    let mut r = reconciler("local");
    r.apply_remote(remote("B", 0.0, 0.0, true, 0.0));
    let out = r.apply_remote(remote("B", 0.1, 0.0, true, 0.05));
    assert_eq!(out, RemoteOutcome::Accepted { segment: true });

    let b = ParticipantId::new("B");
    let segments: Vec<&TrailSegment> = r.ledger().segments_of(&b).collect();
    assert_eq!(segments.len(), 1);
    assert_eq!(segments[0].from, Point::new(0.0, 0.0));
    assert_eq!(segments[0].to, Point::new(0.1, 0.0));
    assert!((segments[0].created_at - 0.05).abs() < f64::EPSILON);
    assert_eq!(segments[0].color, Color::new("#00ff00"));
}

#[test]
fn first_sighting_never_draws() {
    let mut r = reconciler("local");
    let out = r.apply_remote(remote("B", 0.3, 0.3, true, 1.0));
    assert_eq!(out, RemoteOutcome::Accepted { segment: false });
    assert!(r.ledger().is_empty());
}

#[test]
fn pen_down_row_only_sets_anchor() {
    let mut r = reconciler("local");
    r.apply_remote(remote("B", 0.1, 0.1, false, 1.0));
    let out = r.apply_remote(remote("B", 0.4, 0.4, true, 1.1));
    assert_eq!(out, RemoteOutcome::Accepted { segment: false });
    r.apply_remote(remote("B", 0.5, 0.4, true, 1.2));
    let segs: Vec<(Point, Point)> = r
        .ledger()
        .segments_of(&ParticipantId::new("B"))
        .map(|s| (s.from, s.to))
        .collect();
    assert_eq!(segs, [(Point::new(0.4, 0.4), Point::new(0.5, 0.4))]);
}

#[test]
fn idle_movement_does_not_draw() {
    let mut r = reconciler("local");
    r.apply_remote(remote("B", 0.1, 0.1, false, 1.0));
    r.apply_remote(remote("B", 0.2, 0.2, false, 1.1));
    r.apply_remote(remote("B", 0.3, 0.2, true, 1.2));
    r.apply_remote(remote("B", 0.4, 0.2, false, 1.3));
    assert!(r.ledger().is_empty());
}

#[test]
fn stationary_drawing_update_does_not_draw() {
    let mut r = reconciler("local");
    r.apply_remote(remote("B", 0.1, 0.1, true, 1.0));
    let out = r.apply_remote(remote("B", 0.1, 0.1, true, 1.1));
    assert_eq!(out, RemoteOutcome::Accepted { segment: false });
}

#[test]
fn duplicate_and_stale_updates_do_not_draw_twice() {
    let mut r = reconciler("local");
    r.apply_remote(remote("B", 0.0, 0.0, true, 0.0));
    r.apply_remote(remote("B", 0.1, 0.0, true, 0.05));
    assert_eq!(r.apply_remote(remote("B", 0.1, 0.0, true, 0.05)), RemoteOutcome::Ignored);
    assert_eq!(r.apply_remote(remote("B", 0.0, 0.0, true, 0.0)), RemoteOutcome::Ignored);
    assert_eq!(r.ledger().len(), 1);
}

#[test]
fn own_row_is_treated_as_echo() {
    let mut r = reconciler("local");
    let out = r.apply_remote(remote("local", 0.9, 0.9, true, 5.0));
    assert_eq!(out, RemoteOutcome::Echo);
    assert!(r.table().is_empty());
    assert_eq!(r.local_state().position(), Point::new(0.5, 0.5));
}

// =============================================================
// Batches
// =============================================================

#[test]
fn malformed_rows_are_dropped_without_touching_others() {
    let mut r = reconciler("local");
    r.apply_rows(&[row("A", 0.1, 0.1, false, 1.0), row("B", 0.2, 0.2, true, 1.0)]);

    let batch = [
        json!({"id": "A", "x": "nope"}),
        row("B", 0.3, 0.2, true, 2.0),
        json!(null),
        row("C", 0.5, 0.5, false, 2.0),
    ];
    let summary = r.apply_rows(&batch);
    assert_eq!(summary, BatchSummary { accepted: 2, ignored: 0, rejected: 2, segments: 1 });

    let a = r.table().get(&ParticipantId::new("A")).unwrap();
    assert!((a.x - 0.1).abs() < f64::EPSILON);
    assert_eq!(r.table().len(), 3);
}

#[test]
fn full_table_redelivery_is_idempotent() {
    let mut r = reconciler("local");
    let table = [row("A", 0.1, 0.1, true, 1.0), row("local", 0.5, 0.5, false, 1.0)];
    let first = r.apply_rows(&table);
    assert_eq!(first.accepted, 1);
    let second = r.apply_rows(&table);
    assert_eq!(second, BatchSummary { accepted: 0, ignored: 2, rejected: 0, segments: 0 });
}

// =============================================================
// Snapshot
// =============================================================

#[test]
fn snapshot_includes_local_and_remote_cursors_in_id_order() {
    let mut r = reconciler("m-local");
    r.apply_remote(remote("z", 0.1, 0.1, false, 1.0));
    r.apply_remote(remote("a", 0.1, 0.1, false, 1.0));
    let snap = r.get_snapshot(2.0);
    let ids: Vec<&str> = snap.cursors.iter().map(|c| c.id.as_str()).collect();
    assert_eq!(ids, ["a", "m-local", "z"]);
    assert_eq!(snap.local_id, ParticipantId::new("m-local"));
    assert!(snap.cursor(&ParticipantId::new("z")).is_some());
}

#[test]
fn snapshot_prunes_expired_segments() {
    let mut r = reconciler("local");
    r.handle_pointer(PointerSample::down(0.1, 0.1, 0.0));
    r.handle_pointer(PointerSample::moved(0.2, 0.1, 0.1));
    assert_eq!(r.get_snapshot(30.0).segments.len(), 1);
    assert!(r.get_snapshot(61.0).segments.is_empty());
    assert!(r.ledger().is_empty());
}

#[test]
fn silent_participant_disappears_entirely() {
    let mut r = reconciler("local");
    r.apply_remote(remote("B", 0.0, 0.0, true, 0.0));
    r.apply_remote(remote("B", 0.1, 0.0, true, 10.0));
    r.apply_remote(remote("C", 0.5, 0.5, false, 100.0));

    let before = r.get_snapshot(50.0);
    let b = ParticipantId::new("B");
    assert!(before.cursor(&b).is_some());
    assert_eq!(before.segments_of(&b).count(), 1);

    let after = r.get_snapshot(10.0 + STALE + 1.0);
    assert!(after.cursor(&b).is_none());
    assert_eq!(after.segments_of(&b).count(), 0);
    assert!(after.cursor(&ParticipantId::new("C")).is_some());
}

#[test]
fn idle_participant_outlives_their_faded_trail() {
    let mut r = reconciler("local");
    r.apply_remote(remote("B", 0.0, 0.0, true, 0.0));
    r.apply_remote(remote("B", 0.1, 0.0, true, 1.0));
    r.apply_remote(remote("B", 0.1, 0.0, false, 2.0));
    assert_eq!(r.get_snapshot(3.0).segments.len(), 1);

    let snap = r.get_snapshot(90.0);
    assert!(snap.cursor(&ParticipantId::new("B")).is_some());
    assert!(snap.segments.is_empty());
}

#[test]
fn snapshot_segments_ordered_by_owner_then_time() {
    let mut r = reconciler("m");
    r.apply_remote(remote("z", 0.0, 0.0, true, 0.0));
    r.apply_remote(remote("z", 0.1, 0.0, true, 0.1));
    r.handle_pointer(PointerSample::down(0.1, 0.1, 0.0));
    r.handle_pointer(PointerSample::moved(0.2, 0.1, 0.2));
    r.handle_pointer(PointerSample::moved(0.3, 0.1, 0.3));
    r.apply_remote(remote("a", 0.0, 0.0, true, 0.0));
    r.apply_remote(remote("a", 0.1, 0.0, true, 0.4));

    let snap = r.get_snapshot(1.0);
    let order: Vec<(&str, f64)> = snap
        .segments
        .iter()
        .map(|v| (v.segment.owner.as_str(), v.segment.created_at))
        .collect();
    assert_eq!(order, [("a", 0.4), ("m", 0.2), ("m", 0.3), ("z", 0.1)]);
}

#[test]
fn snapshot_alphas_are_in_unit_range_under_clock_regression() {
    let mut r = reconciler("local");
    r.handle_pointer(PointerSample::down(0.1, 0.1, 10.0));
    r.handle_pointer(PointerSample::moved(0.2, 0.1, 10.5));
    for now in [0.0, 10.0, 11.0, 40.0, 70.0] {
        for v in r.get_snapshot(now).segments {
            assert!((0.0..=1.0).contains(&v.alpha));
        }
    }
}

// =============================================================
// End to end
// =============================================================

#[test]
fn local_stroke_reaches_peer_with_expected_alpha() {
    let mut a = reconciler("A");
    let mut peer = reconciler("P");
    let mut throttle = Throttler::new(Duration::from_millis(40));
    let mut outbound = Vec::new();

    a.handle_pointer(PointerSample::moved(0.1, 0.1, 0.0));
    a.handle_pointer(PointerSample::down(0.1, 0.1, 0.0));
    outbound.extend(throttle.offer(a.local_state().clone(), 0.0));
    a.handle_pointer(PointerSample::moved(0.2, 0.1, 0.02));
    outbound.extend(throttle.offer(a.local_state().clone(), 0.02));
    outbound.extend(throttle.poll(0.04));
    assert_eq!(outbound.len(), 2);

    let rows: Vec<serde_json::Value> = outbound
        .iter()
        .map(|s| WireUpdate::from_state(s).to_value())
        .collect();
    for row in &rows {
        peer.apply_rows(std::slice::from_ref(row));
    }

    let a_id = ParticipantId::new("A");
    let snap = peer.get_snapshot(1.0);
    let from_a: Vec<&VisibleSegment> = snap.segments_of(&a_id).collect();
    assert_eq!(from_a.len(), 1);
    assert_eq!(from_a[0].segment.from, Point::new(0.1, 0.1));
    assert_eq!(from_a[0].segment.to, Point::new(0.2, 0.1));
    assert!((from_a[0].alpha - (1.0 - 0.98 / 60.0)).abs() < 1e-9);
    assert!((from_a[0].alpha - 0.983).abs() < 0.002);

    let local_snap = a.get_snapshot(1.0);
    assert_eq!(local_snap.segments.len(), 1);
}

#[test]
fn quick_stroke_inside_one_interval_still_reaches_peer() {
    let mut a = reconciler("A");
    let mut peer = reconciler("P");
    let mut throttle = Throttler::new(Duration::from_millis(40));
    let mut outbound = Vec::new();

    a.handle_pointer(PointerSample::moved(0.1, 0.1, 0.0));
    outbound.extend(throttle.offer(a.local_state().clone(), 0.0));
    a.handle_pointer(PointerSample::down(0.1, 0.1, 0.1));
    outbound.extend(throttle.offer(a.local_state().clone(), 0.1));
    a.handle_pointer(PointerSample::moved(0.2, 0.1, 0.11));
    outbound.extend(throttle.offer(a.local_state().clone(), 0.11));
    a.handle_pointer(PointerSample::moved(0.3, 0.1, 0.12));
    outbound.extend(throttle.offer(a.local_state().clone(), 0.12));
    a.handle_pointer(PointerSample::up(0.3, 0.1, 0.13));
    outbound.extend(throttle.offer(a.local_state().clone(), 0.13));
    assert!(!throttle.has_pending());

    let published: Vec<(f64, bool)> = outbound.iter().map(|s| (s.x, s.drawing)).collect();
    assert_eq!(published, [(0.1, false), (0.1, true), (0.3, true), (0.3, false)]);

    for state in &outbound {
        peer.apply_rows(&[WireUpdate::from_state(state).to_value()]);
    }

    // The held move coalesces into one segment spanning the same path.
    let a_id = ParticipantId::new("A");
    let local: Vec<VisibleSegment> = a.get_snapshot(1.0).segments;
    let seen: Vec<VisibleSegment> = peer.get_snapshot(1.0).segments_of(&a_id).cloned().collect();
    assert_eq!(local.len(), 2);
    assert_eq!(seen.len(), 1);
    assert_eq!(seen[0].segment.from, local[0].segment.from);
    assert_eq!(seen[0].segment.to, local[1].segment.to);
    assert_eq!(peer.get_snapshot(1.0).cursor(&a_id).map(|c| c.drawing), Some(false));
}

#[test]
fn segments_of_accepts_a_temporary_id() {
    let mut r = reconciler("m");
    r.apply_remote(remote("b", 0.0, 0.0, true, 1.0));
    r.apply_remote(remote("b", 0.2, 0.0, true, 2.0));
    let snap = r.get_snapshot(3.0);
    assert_eq!(snap.segments_of(&ParticipantId::new("b")).count(), 1);
    assert_eq!(snap.segments_of(&ParticipantId::new("m")).count(), 0);
}
