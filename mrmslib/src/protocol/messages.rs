//! Typed messages, built on [Frame] fields.

use super::frame::{Frame, FrameError};
use super::opcode::{Opcode, Sender};
use crate::robot::OperatingState;

/// A decoded message, from either side.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Message {
    /// 'I', 'L', 'R' (peer): switch the robot's operating state.
    SetState(OperatingState),
    /// 'l' (robot): horizontal position of the line.
    LinePosition { x: u16 },
}

/// An error decoding a [Message].
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum DecodeError {
    Frame(FrameError),
    /// Not an opcode at all.
    Unrecognized(u8),
    /// A known opcode with no payload layout yet.
    Unsupported(Opcode),
}

#[cfg(feature = "std")]
impl std::error::Error for DecodeError {}

impl core::fmt::Display for DecodeError {
    fn fmt(&self, f: &mut core::fmt::Formatter) -> core::fmt::Result {
        match self {
            Self::Frame(e) => write!(f, "{}", e),
            Self::Unrecognized(b) => write!(f, "unrecognized message id: {}", b),
            Self::Unsupported(op) => write!(f, "no layout for message {}", op),
        }
    }
}

impl From<FrameError> for DecodeError {
    fn from(other: FrameError) -> Self {
        Self::Frame(other)
    }
}

impl Message {
    pub const fn opcode(&self) -> Opcode {
        match self {
            Self::SetState(state) => state.opcode(),
            Self::LinePosition { .. } => Opcode::LinePosition,
        }
    }

    pub const fn sender(&self) -> Sender {
        self.opcode().sender()
    }

    /// Append this message to the end of `frame`.
    pub fn write_to<const CAP: usize>(&self, frame: &mut Frame<CAP>) -> Result<(), FrameError> {
        frame.append_u8(self.opcode().as_u8())?;
        match self {
            Self::SetState(_) => Ok(()),
            Self::LinePosition { x } => frame.append_u16(*x),
        }
    }

    /// Reset `frame` and fill it with just this message.
    pub fn frame<const CAP: usize>(&self, frame: &mut Frame<CAP>) -> Result<(), FrameError> {
        frame.reset();
        self.write_to(frame)
    }

    /// Read one message from the read cursor of `frame`.
    pub fn read_from<const CAP: usize>(frame: &mut Frame<CAP>) -> Result<Self, DecodeError> {
        let id = frame.read_u8()?;
        let op = Opcode::from_u8(id).ok_or(DecodeError::Unrecognized(id))?;
        match op {
            Opcode::Idle => Ok(Self::SetState(OperatingState::Idle)),
            Opcode::LineFollowing => Ok(Self::SetState(OperatingState::LineFollowing)),
            Opcode::RedRoom => Ok(Self::SetState(OperatingState::RedRoom)),
            Opcode::LinePosition => Ok(Self::LinePosition {
                x: frame.read_u16()?,
            }),
            Opcode::RedRoomReport => Err(DecodeError::Unsupported(op)),
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::protocol::FieldType;

    use quickcheck::{Arbitrary, Gen};
    use quickcheck_macros::quickcheck;

    impl Arbitrary for Message {
        fn arbitrary(g: &mut Gen) -> Self {
            if bool::arbitrary(g) {
                let state = *g
                    .choose(&[
                        OperatingState::Idle,
                        OperatingState::LineFollowing,
                        OperatingState::RedRoom,
                    ])
                    .unwrap();
                Message::SetState(state)
            } else {
                Message::LinePosition {
                    x: u16::arbitrary(g),
                }
            }
        }
    }

    #[quickcheck]
    fn roundtrip(msg: Message) -> bool {
        let mut frame = Frame::<16>::new();
        msg.frame(&mut frame).is_ok() && Message::read_from(&mut frame) == Ok(msg)
    }

    #[quickcheck]
    fn roundtrip_over_the_wire(msg: Message) -> bool {
        let mut frame = Frame::<16>::new();
        if msg.frame(&mut frame).is_err() {
            return false;
        }

        let mut received = Frame::<16>::new();
        for b in frame.as_bytes() {
            received.push_raw(*b).unwrap();
        }
        Message::read_from(&mut received) == Ok(msg)
    }

    #[test]
    fn line_position_layout() {
        let mut frame = Frame::<16>::new();
        Message::LinePosition { x: 80 }.frame(&mut frame).unwrap();
        assert_eq!(frame.as_bytes(), b"l\x50\x00");
        assert_eq!(frame.fields(), &[FieldType::U8, FieldType::U16]);
    }

    #[test]
    fn frame_starts_over() {
        let mut frame = Frame::<16>::new();
        Message::LinePosition { x: 1 }.frame(&mut frame).unwrap();
        Message::SetState(OperatingState::Idle)
            .frame(&mut frame)
            .unwrap();
        assert_eq!(frame.as_bytes(), b"I");
    }

    #[test]
    fn two_in_one_burst() {
        let mut frame = Frame::<16>::new();
        for b in b"l\x01\x00l\x02\x00" {
            frame.push_raw(*b).unwrap();
        }
        assert_eq!(
            Message::read_from(&mut frame),
            Ok(Message::LinePosition { x: 1 })
        );
        assert_eq!(
            Message::read_from(&mut frame),
            Ok(Message::LinePosition { x: 2 })
        );
        assert_eq!(frame.remaining(), 0);
    }

    #[test]
    fn split_burst() {
        let mut frame = Frame::<16>::new();
        frame.push_raw(b'l').unwrap();
        frame.push_raw(0x01).unwrap();
        assert!(matches!(
            Message::read_from(&mut frame),
            Err(DecodeError::Frame(FrameError::Underrun { .. }))
        ));
    }

    #[test]
    fn unknown_and_unsupported() {
        let mut frame = Frame::<16>::new();
        frame.push_raw(b'?').unwrap();
        assert_eq!(
            Message::read_from(&mut frame),
            Err(DecodeError::Unrecognized(b'?'))
        );

        frame.reset();
        frame.push_raw(b'r').unwrap();
        assert_eq!(
            Message::read_from(&mut frame),
            Err(DecodeError::Unsupported(Opcode::RedRoomReport))
        );
    }
}
