#![cfg_attr(not(feature = "std"), no_std)]

#[cfg(feature = "alloc")]
extern crate alloc;

pub mod clock;
pub use clock::{Clock, Duration, Instant};

pub mod dispatch;

mod error;
pub use error::*;

mod link;
pub use link::*;

pub mod protocol;

pub mod robot;
pub use robot::{OperatingState, RandomWalk, Robot, RobotConfig, State};
