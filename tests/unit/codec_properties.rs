//! Property tests for the wire codec.

use proptest::prelude::*;
use zkbot_motion::codec::{
    build_jog, build_move, effective_feedrate, gripper_angle, parse_estop_reply,
    parse_position_reply, Axis, Direction, EstopState, Position,
};
use zkbot_motion::StepBuilder;

fn axis() -> impl Strategy<Value = Axis> {
    prop_oneof![Just(Axis::X), Just(Axis::Y), Just(Axis::Z)]
}

proptest! {
    /// The effective feedrate always lies in the controller range.
    #[test]
    fn feedrate_always_clamped(feedrate in any::<f64>(), multiplier in any::<f64>()) {
        let f = effective_feedrate(feedrate, multiplier);
        prop_assert!((1..=500).contains(&f));
    }

    /// The gripper angle always lies in the servo range.
    #[test]
    fn gripper_angle_always_clamped(angle in any::<f64>()) {
        prop_assert!(gripper_angle(angle) <= 180);
    }

    /// A single-axis step yields a frame naming only that axis.
    #[test]
    fn single_axis_frame(axis in axis(), value in -400.0f64..400.0, feed in 1.0f64..500.0) {
        let builder = StepBuilder::linear().feedrate(feed);
        let step = match axis {
            Axis::X => builder.x(value),
            Axis::Y => builder.y(value),
            Axis::Z => builder.z(value),
        }
        .build();

        let frame = build_move(&step, 1.0).unwrap().unwrap();
        let text = frame.as_text().unwrap();
        let payload = text
            .strip_prefix("0x550xAA ")
            .and_then(|t| t.strip_suffix(" 0xAA0x55"))
            .unwrap();
        let words: Vec<&str> = payload.split(' ').collect();

        prop_assert_eq!(words.len(), 3);
        prop_assert_eq!(words[0], "G01");
        prop_assert!(words[1].starts_with(axis.letter()));
        prop_assert!(words[2].starts_with('F'));
    }

    /// Formatted positions parse back to the same coordinates.
    #[test]
    fn position_reply_round_trip(
        x in -400.0f64..400.0,
        y in -400.0f64..400.0,
        z in -300.0f64..300.0,
    ) {
        let reply = format!("{x},{y},{z},ok\r\n");
        prop_assert_eq!(parse_position_reply(reply.as_bytes()), Some(Position::new(x, y, z)));
    }

    /// Reply parsers never panic.
    #[test]
    fn reply_parsers_are_total(bytes in proptest::collection::vec(any::<u8>(), 0..120)) {
        let _ = parse_estop_reply(&bytes);
        let _ = parse_position_reply(&bytes);
    }

    /// Jog frames stay well formed for any feed value.
    #[test]
    fn jog_frame_shape(axis in axis(), positive in any::<bool>(), feed in 50u16..=800) {
        let direction = if positive { Direction::Positive } else { Direction::Negative };
        let frame = build_jog(axis, direction, feed);
        let text = frame.as_text().unwrap();
        let feed_word = format!("F{feed}0xfd0xfc");
        prop_assert!(text.starts_with("0xff0xfe0x0"));
        prop_assert!(text.ends_with(&feed_word));
    }
}

#[test]
fn estop_replies() {
    assert_eq!(parse_estop_reply(b"ok\r\n"), EstopState::Normal);
    assert_eq!(parse_estop_reply(b"error\r\n"), EstopState::Active);
    assert_eq!(parse_estop_reply(b"ok error"), EstopState::Active);
    assert_eq!(parse_estop_reply(b""), EstopState::Unknown);
    assert_eq!(parse_estop_reply(b"\xff\xfe"), EstopState::Unknown);
}
