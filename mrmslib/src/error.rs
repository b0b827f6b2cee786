use crate::dispatch::DispatchError;
use crate::protocol::FrameError;

/// Exit code for an I/O failure on the link (sysexits `EX_IOERR`).
pub const EXIT_LINK: i32 = 74;

/// An error on the underlying transport.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum LinkError<E> {
    /// EOF in underlying stream.
    UnexpectedEof,
    /// Other IO error in underlying stream.
    Io(E),
}

#[cfg(feature = "std")]
impl<E> std::error::Error for LinkError<E> where E: core::fmt::Debug {}

impl<E> core::fmt::Display for LinkError<E>
where
    E: core::fmt::Debug,
{
    fn fmt(&self, f: &mut core::fmt::Formatter) -> core::fmt::Result {
        match self {
            Self::UnexpectedEof => write!(f, "unexpected eof"),
            Self::Io(e) => write!(f, "io error: {:?}", e),
        }
    }
}

impl<E> From<E> for LinkError<E> {
    fn from(other: E) -> Self {
        Self::Io(other)
    }
}

/// Anything that stops the robot. There is no way to resynchronize
/// the link, so none of these are recovered from in place.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Fatal<E> {
    /// A frame could not be built or read.
    Frame(FrameError),
    /// The peer sent something it never should.
    Dispatch(DispatchError),
    /// The transport failed.
    Link(LinkError<E>),
}

impl<E> Fatal<E> {
    /// Process exit code identifying what went wrong.
    pub const fn exit_code(&self) -> i32 {
        match self {
            Self::Frame(e) => e.exit_code(),
            Self::Dispatch(e) => e.exit_code(),
            Self::Link(_) => EXIT_LINK,
        }
    }

    /// True if the link lost sync with the peer, rather than failing.
    pub const fn is_desync(&self) -> bool {
        matches!(self, Self::Dispatch(_))
    }
}

#[cfg(feature = "std")]
impl<E> std::error::Error for Fatal<E> where E: core::fmt::Debug {}

impl<E> core::fmt::Display for Fatal<E>
where
    E: core::fmt::Debug,
{
    fn fmt(&self, f: &mut core::fmt::Formatter) -> core::fmt::Result {
        match self {
            Self::Frame(e) => write!(f, "{}", e),
            Self::Dispatch(e) => write!(f, "{}", e),
            Self::Link(e) => write!(f, "{}", e),
        }
    }
}

impl<E> From<FrameError> for Fatal<E> {
    fn from(other: FrameError) -> Self {
        Self::Frame(other)
    }
}

impl<E> From<DispatchError> for Fatal<E> {
    fn from(other: DispatchError) -> Self {
        Self::Dispatch(other)
    }
}

impl<E> From<LinkError<E>> for Fatal<E> {
    fn from(other: LinkError<E>) -> Self {
        Self::Link(other)
    }
}
