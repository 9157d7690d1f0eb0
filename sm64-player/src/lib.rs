//! SM64 Player - The rate adapter between a 60Hz host and the 30Hz engine
//!
//! - `MarioPlayer`: lifecycle, tick schedule and host-space kinematics
//! - Input translation from host controls and camera
//! - Host-space view of the engine mesh

pub mod input;
pub mod player;
pub mod view;

pub use input::*;
pub use player::*;
pub use view::*;
