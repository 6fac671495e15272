//! Command codec.
//!
//! Pure translation between program steps and wire frames, and between raw
//! replies and typed values. Nothing in this module touches the port.

mod encode;
mod frame;
mod reply;

pub use encode::{
    build_gripper, build_jog, build_jog_stop, build_move, build_query_estop,
    build_query_position, decompose, effective_feedrate, gripper_angle, Action, Axis, Direction,
    MANUAL_END, MANUAL_START, MAX_FEEDRATE, MIN_FEEDRATE, POSITION_QUERY, TEXT_END, TEXT_START,
};
pub use frame::{EstopState, Frame, Position, Reply, FRAME_CAPACITY, REPLY_CAPACITY};
pub use reply::{parse_estop_reply, parse_position_reply, try_parse_position_reply};
