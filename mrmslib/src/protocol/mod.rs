/// Size of the frame buffer, in bytes. The last slot is never written,
/// so a frame carries at most `MAX_MESSAGE_SIZE - 1` bytes.
pub const MAX_MESSAGE_SIZE: usize = 16;

/// The rate the peer microcontroller expects unless told otherwise.
pub const BAUD_RATE: u32 = 115200;

mod baud;
pub use baud::*;

pub mod frame;
pub use frame::{FieldType, Frame, FrameError};

pub mod opcode;
pub use opcode::{Opcode, Sender};

pub mod messages;
pub use messages::{DecodeError, Message};
