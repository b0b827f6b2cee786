//! Turning inbound frames into state changes.

use crate::protocol::{Frame, FrameError, Opcode, Sender};
use crate::robot::OperatingState;

/// Exit code for a byte that is not an opcode at all.
pub const EXIT_UNRECOGNIZED: i32 = 13;

/// An inbound frame the robot can't act on.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum DispatchError {
    /// The frame had no opcode to read.
    Frame(FrameError),
    /// Only the robot ever sends this opcode.
    WrongDirection(Opcode),
    /// Not an opcode at all.
    Unrecognized(u8),
}

impl DispatchError {
    /// Process exit code for this error, when it is fatal.
    pub const fn exit_code(&self) -> i32 {
        match self {
            Self::Frame(e) => e.exit_code(),
            Self::WrongDirection(Opcode::RedRoomReport) => 12,
            Self::WrongDirection(_) => 11,
            Self::Unrecognized(_) => EXIT_UNRECOGNIZED,
        }
    }
}

#[cfg(feature = "std")]
impl std::error::Error for DispatchError {}

impl core::fmt::Display for DispatchError {
    fn fmt(&self, f: &mut core::fmt::Formatter) -> core::fmt::Result {
        match self {
            Self::Frame(e) => write!(f, "no message id: {}", e),
            Self::WrongDirection(op) => write!(f, "impossible message id {}, robot only", op),
            Self::Unrecognized(b) => write!(f, "impossible message id: {}", b),
        }
    }
}

impl From<FrameError> for DispatchError {
    fn from(other: FrameError) -> Self {
        Self::Frame(other)
    }
}

/// Read the opcode from `frame` and look up the state it asks for.
///
/// Only the opcode byte is consumed. This never has side effects;
/// applying the result is up to the caller.
pub fn dispatch<const CAP: usize>(frame: &mut Frame<CAP>) -> Result<OperatingState, DispatchError> {
    let id = frame.read_u8()?;
    let op = Opcode::from_u8(id).ok_or(DispatchError::Unrecognized(id))?;
    if op.sender() != Sender::Peer {
        return Err(DispatchError::WrongDirection(op));
    }

    OperatingState::from_opcode(op).ok_or(DispatchError::WrongDirection(op))
}

#[cfg(test)]
mod test {
    use super::*;

    fn inbound(bytes: &[u8]) -> Frame {
        let mut frame = Frame::new();
        for b in bytes {
            frame.push_raw(*b).unwrap();
        }
        frame
    }

    #[test]
    fn state_commands() {
        assert_eq!(dispatch(&mut inbound(b"I")), Ok(OperatingState::Idle));
        assert_eq!(
            dispatch(&mut inbound(b"L")),
            Ok(OperatingState::LineFollowing)
        );
        assert_eq!(dispatch(&mut inbound(b"R")), Ok(OperatingState::RedRoom));
    }

    #[test]
    fn typed_frame() {
        let mut frame = Frame::<16>::new();
        frame.append_u8(b'R').unwrap();
        assert_eq!(dispatch(&mut frame), Ok(OperatingState::RedRoom));
    }

    #[test]
    fn trailing_bytes_ignored() {
        let mut frame = inbound(b"Lxyz");
        assert_eq!(dispatch(&mut frame), Ok(OperatingState::LineFollowing));
        assert_eq!(frame.remaining(), 3);
    }

    #[test]
    fn robot_opcodes() {
        let err = dispatch(&mut inbound(b"l")).unwrap_err();
        assert_eq!(err, DispatchError::WrongDirection(Opcode::LinePosition));
        assert_eq!(err.exit_code(), 11);

        let err = dispatch(&mut inbound(b"r")).unwrap_err();
        assert_eq!(err, DispatchError::WrongDirection(Opcode::RedRoomReport));
        assert_eq!(err.exit_code(), 12);
    }

    #[test]
    fn unrecognized() {
        for b in [0u8, b'x', b'i', 0xff] {
            let err = dispatch(&mut inbound(&[b])).unwrap_err();
            assert_eq!(err, DispatchError::Unrecognized(b));
            assert_eq!(err.exit_code(), 13);
        }
    }

    #[test]
    fn empty_frame() {
        let err = dispatch(&mut Frame::<16>::new()).unwrap_err();
        assert!(matches!(err, DispatchError::Frame(FrameError::Underrun { .. })));
    }
}
