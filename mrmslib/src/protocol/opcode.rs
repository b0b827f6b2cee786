//! The first byte of every message.

/// Which end of the link sends a message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[repr(u8)]
pub enum Sender {
    /// The microcontroller driving the motors.
    Peer = 0,
    /// This side, the one with the camera.
    Robot = 1,
}

/// Every message identifier either side knows about.
///
/// Upper case letters are commands from the peer, lower case letters
/// are reports from the robot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[repr(u8)]
pub enum Opcode {
    /// 'I' Set state: idle
    Idle = b'I',
    /// 'L' Set state: line following
    LineFollowing = b'L',
    /// 'R' Set state: red room
    RedRoom = b'R',
    /// 'l' Line position update
    LinePosition = b'l',
    /// 'r' Red room report
    RedRoomReport = b'r',
}

impl Opcode {
    /// All known opcodes.
    pub const ALL: [Opcode; 5] = [
        Opcode::Idle,
        Opcode::LineFollowing,
        Opcode::RedRoom,
        Opcode::LinePosition,
        Opcode::RedRoomReport,
    ];

    pub const fn from_u8(byte: u8) -> Option<Self> {
        match byte {
            b'I' => Some(Self::Idle),
            b'L' => Some(Self::LineFollowing),
            b'R' => Some(Self::RedRoom),
            b'l' => Some(Self::LinePosition),
            b'r' => Some(Self::RedRoomReport),
            _ => None,
        }
    }

    pub const fn as_u8(&self) -> u8 {
        *self as u8
    }

    /// The only side allowed to send this opcode.
    pub const fn sender(&self) -> Sender {
        match self {
            Self::Idle | Self::LineFollowing | Self::RedRoom => Sender::Peer,
            Self::LinePosition | Self::RedRoomReport => Sender::Robot,
        }
    }

    pub const fn name(&self) -> &'static str {
        match self {
            Self::Idle => "idle",
            Self::LineFollowing => "line following",
            Self::RedRoom => "red room",
            Self::LinePosition => "line position",
            Self::RedRoomReport => "red room report",
        }
    }
}

impl From<Opcode> for u8 {
    fn from(op: Opcode) -> u8 {
        op.as_u8()
    }
}

impl TryFrom<u8> for Opcode {
    type Error = u8;

    fn try_from(byte: u8) -> Result<Self, Self::Error> {
        Self::from_u8(byte).ok_or(byte)
    }
}

impl core::fmt::Display for Opcode {
    fn fmt(&self, f: &mut core::fmt::Formatter) -> core::fmt::Result {
        write!(f, "'{}' ({})", self.as_u8() as char, self.name())
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn table_roundtrip() {
        for op in Opcode::ALL {
            assert_eq!(Opcode::from_u8(op.as_u8()), Some(op));
        }
    }

    #[test]
    fn unknown_bytes() {
        let known = Opcode::ALL.map(|op| op.as_u8());
        for b in 0..=255u8 {
            if !known.contains(&b) {
                assert_eq!(Opcode::try_from(b), Err(b));
            }
        }
    }

    #[test]
    fn directions() {
        assert_eq!(Opcode::Idle.sender(), Sender::Peer);
        assert_eq!(Opcode::LineFollowing.sender(), Sender::Peer);
        assert_eq!(Opcode::RedRoom.sender(), Sender::Peer);
        assert_eq!(Opcode::LinePosition.sender(), Sender::Robot);
        assert_eq!(Opcode::RedRoomReport.sender(), Sender::Robot);
    }
}
