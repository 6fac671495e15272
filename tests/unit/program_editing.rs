//! Unit tests for program editing and the JSON program format.

use proptest::prelude::*;
use zkbot_motion::error::{Error, ProgramError};
use zkbot_motion::program::{load, save, MoveCommand, Program, Step};
use zkbot_motion::{ProgramBuilder, StepBuilder};

fn sample() -> Program {
    ProgramBuilder::new("sample")
        .move_to(1.0, 0.0, 0.0, 100.0)
        .move_to(2.0, 0.0, 0.0, 100.0)
        .move_to(3.0, 0.0, 0.0, 100.0)
        .build()
}

fn xs(program: &Program) -> Vec<Option<f64>> {
    program.iter().map(|s| s.x).collect()
}

/// Test the editing operations used by a program editor.
#[test]
fn test_editing_operations() {
    let mut program = sample();

    assert_eq!(program.move_up(2).unwrap(), 1);
    assert_eq!(xs(&program), vec![Some(1.0), Some(3.0), Some(2.0)]);

    assert_eq!(program.move_up(0).unwrap(), 0);
    assert_eq!(program.move_down(2).unwrap(), 2);

    let copy = program.duplicate(0).unwrap();
    assert_eq!(copy, 1);
    assert_eq!(program.len(), 4);

    let removed = program.delete(1).unwrap();
    assert_eq!(removed.x, Some(1.0));
    assert!(program.delete(10).is_err());

    let pasted = program.paste(None, Step::wait(1.0)).unwrap();
    assert_eq!(pasted, program.len() - 1);
    assert!(program.get(pasted).unwrap().is_pure_wait());

    program.clear();
    assert!(program.is_empty());
}

/// Test that absent fields are omitted and `null` reads as absent.
#[test]
fn test_json_format() {
    let program = ProgramBuilder::new("fmt")
        .step(StepBuilder::rapid().z(5.0).gripper(30.0).build())
        .build();

    let json = String::from_utf8(save(&program).unwrap()).unwrap();
    assert!(json.contains("\"G00\""));
    assert!(json.contains("\"do0\""));
    assert!(!json.contains("\"x\""));

    let loaded = load(json.as_bytes()).unwrap();
    assert_eq!(loaded, program);

    let with_nulls = br#"{"name": "n", "steps": [{"cmd": "G01", "x": null, "y": 2.0, "f": 50, "delay": 0}]}"#;
    let loaded = load(with_nulls).unwrap();
    let step = loaded.get(0).unwrap();
    assert_eq!(step.cmd, MoveCommand::LinearMove);
    assert_eq!(step.x, None);
    assert_eq!(step.y, Some(2.0));
    assert_eq!(step.feedrate, 50.0);
}

/// Test that malformed JSON is rejected.
#[test]
fn test_malformed_program() {
    assert!(load(b"{\"name\": 3}").is_err());
    assert!(load(b"not json").is_err());
}

/// Test that a NaN coordinate is refused instead of saved as `null`.
#[test]
fn test_non_finite_not_saved() {
    let mut step = Step::linear(Some(1.0), Some(2.0), None, 100.0);
    step.y = Some(f64::NAN);
    let program = Program::with_steps("bad", vec![step]);

    assert!(matches!(
        save(&program),
        Err(Error::Program(ProgramError::NonFiniteField { index: 0, field: "y" }))
    ));
}

fn coordinate() -> impl Strategy<Value = Option<f64>> {
    proptest::option::of(-1000.0f64..1000.0)
}

fn any_step() -> impl Strategy<Value = Step> {
    (
        prop_oneof![Just(MoveCommand::RapidMove), Just(MoveCommand::LinearMove)],
        coordinate(),
        coordinate(),
        coordinate(),
        0.0f64..1000.0,
        0.0f64..60.0,
        proptest::option::of(0.0f64..180.0),
    )
        .prop_map(|(cmd, x, y, z, feedrate, delay, gripper_angle)| Step {
            cmd,
            x,
            y,
            z,
            feedrate,
            delay,
            gripper_angle,
        })
}

proptest! {
    /// Saving then loading gives back the same program, bit for bit.
    #[test]
    fn save_load_round_trip(name in "[a-z_]{1,16}", steps in proptest::collection::vec(any_step(), 0..12)) {
        let program = Program::with_steps(name, steps);
        let loaded = load(&save(&program).unwrap()).unwrap();
        prop_assert_eq!(loaded, program);
    }
}
