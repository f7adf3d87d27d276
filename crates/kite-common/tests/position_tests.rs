use super::*;

#[test]
fn test_line_map_offsets() {
    let map = LineMap::build("val x = 5\nx + 1\r\nprintln(x)");
    assert_eq!(map.line_count(), 3);
    assert_eq!(map.offset_to_position(0), Position::new(0, 0));
    assert_eq!(map.offset_to_position(10), Position::new(1, 0));
    assert_eq!(map.offset_to_position(12), Position::new(1, 2));
    assert_eq!(map.offset_to_position(17), Position::new(2, 0));
    assert_eq!(map.position_to_offset(Position::new(2, 3)), Some(20));
    assert_eq!(map.position_to_offset(Position::new(9, 0)), None);
}

#[test]
fn test_offset_past_end_clamps() {
    let map = LineMap::build("ab\ncd");
    assert_eq!(map.offset_to_position(99), Position::new(1, 2));
}

#[test]
fn test_span_merge_and_contains() {
    let a = Span::new(4, 8);
    let b = Span::new(2, 5);
    let merged = a.merge(b);
    assert_eq!(merged, Span::new(2, 8));
    assert!(merged.contains(7));
    assert!(!merged.contains(8));
    assert!(Span::at(3).is_empty());
}
