use super::*;

#[test]
fn color_from_id_is_deterministic() {
    let id = ParticipantId::new("alice");
    assert_eq!(Color::from_id(&id), Color::from_id(&ParticipantId::new("alice")));
}

#[test]
fn color_from_id_is_hex_rgb() {
    let color = Color::from_id(&ParticipantId::random());
    let s = color.as_str();
    assert_eq!(s.len(), 7);
    assert!(s.starts_with('#'));
    assert!(s[1..].chars().all(|c| c.is_ascii_hexdigit()));
}

#[test]
fn distinct_ids_usually_get_distinct_colors() {
    let a = Color::from_id(&ParticipantId::new("a"));
    let b = Color::from_id(&ParticipantId::new("b"));
    assert_ne!(a, b);
}

#[test]
fn hsl_primary_hues() {
    assert_eq!(hsl_to_rgb(0.0, 1.0, 0.5), (255, 0, 0));
    assert_eq!(hsl_to_rgb(120.0, 1.0, 0.5), (0, 255, 0));
    assert_eq!(hsl_to_rgb(240.0, 1.0, 0.5), (0, 0, 255));
}

#[test]
fn random_ids_are_unique() {
    assert_ne!(ParticipantId::random(), ParticipantId::random());
}

#[test]
fn participant_ids_order_lexically() {
    let mut ids = vec![ParticipantId::new("b"), ParticipantId::new("a"), ParticipantId::new("c")];
    ids.sort();
    let names: Vec<&str> = ids.iter().map(ParticipantId::as_str).collect();
    assert_eq!(names, ["a", "b", "c"]);
}

#[test]
fn from_screen_normalizes_and_clamps() {
    let p = Point::from_screen(200.0, 50.0, 800.0, 100.0);
    assert!((p.x - 0.25).abs() < f64::EPSILON);
    assert!((p.y - 0.5).abs() < f64::EPSILON);

    let clamped = Point::from_screen(-10.0, 500.0, 800.0, 100.0);
    assert_eq!(clamped, Point::new(0.0, 1.0));
}

#[test]
fn from_screen_degenerate_surface_maps_to_origin() {
    assert_eq!(Point::from_screen(10.0, 10.0, 0.0, 0.0), Point::new(0.0, 0.0));
    assert_eq!(Point::from_screen(f64::NAN, 10.0, 100.0, 100.0).x, 0.0);
}

#[test]
fn new_cursor_is_idle_with_derived_color() {
    let id = ParticipantId::new("p1");
    let state = CursorState::new(id.clone(), Point::new(0.3, 0.4), 7.0);
    assert!(!state.drawing);
    assert_eq!(state.color, Color::from_id(&id));
    assert_eq!(state.position(), Point::new(0.3, 0.4));
    assert!((state.last_update - 7.0).abs() < f64::EPSILON);
}
