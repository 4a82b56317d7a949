//! Core gameplay systems for the dungeon crawler, rewritten in Rust.
//!
//! The crate covers the pieces of the game with actual logic in them: the
//! articulated body/weapon tree with its damage propagation, the XML body
//! blueprints the authoring side produces, and the room/hall/wave level
//! structure.  Rendering, camera work and input wiring are intentionally
//! kept outside of the crate so that the code remains testable and easy to
//! drive from a headless harness.

pub mod blueprint;
pub mod body;
pub mod easing;
pub mod level;
pub mod pose;

pub use blueprint::{BodyBlueprint, PartBlueprint};
pub use body::{
    AppendageKind, BodyError, BodyPart, BodyTree, Circle, NodeId, PartKind, SwingDirection,
    WeaponAction, WeaponKind,
};
pub use easing::swing_ease;
pub use level::{Bullet, Direction, Enemy, Extent, Hall, HallId, Level, Room, RoomId, Wave};
pub use pose::{poses_of, PartPose, PoseModel};
