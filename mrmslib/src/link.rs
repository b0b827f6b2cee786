use crate::error::{Fatal, LinkError};
use crate::protocol::Frame;

/// Byte-level access to a serial channel.
///
/// This is implemented for anything that implements the
/// [embedded_io] [Read][embedded_io::Read],
/// [ReadReady][embedded_io::ReadReady] and [Write][embedded_io::Write]
/// traits.
pub trait Transport: embedded_io::ErrorType {
    /// Returns [true] if a byte can be read without blocking.
    fn available(&mut self) -> Result<bool, LinkError<Self::Error>>;

    /// Read one byte, blocking until there is one.
    fn read_byte(&mut self) -> Result<u8, LinkError<Self::Error>>;

    /// Read whatever is there into `buf`. Returns the number of bytes
    /// read, which is 0 if the read timed out.
    fn read_into(&mut self, buf: &mut [u8]) -> Result<usize, LinkError<Self::Error>>;

    fn write_byte(&mut self, byte: u8) -> Result<(), LinkError<Self::Error>> {
        self.write_bytes(&[byte])
    }

    /// Write all of `bytes`, and flush.
    fn write_bytes(&mut self, bytes: &[u8]) -> Result<(), LinkError<Self::Error>>;
}

impl<T> Transport for T
where
    T: embedded_io::Read + embedded_io::ReadReady + embedded_io::Write,
{
    fn available(&mut self) -> Result<bool, LinkError<Self::Error>> {
        Ok(self.read_ready()?)
    }

    fn read_byte(&mut self) -> Result<u8, LinkError<Self::Error>> {
        let mut byte = [0u8];
        self.read_exact(&mut byte).map_err(|e| match e {
            embedded_io::ReadExactError::UnexpectedEof => LinkError::UnexpectedEof,
            embedded_io::ReadExactError::Other(e) => LinkError::Io(e),
        })?;
        Ok(byte[0])
    }

    fn read_into(&mut self, buf: &mut [u8]) -> Result<usize, LinkError<Self::Error>> {
        use embedded_io::Error;
        match self.read(buf) {
            Ok(amt) => Ok(amt),
            Err(e) if e.kind() == embedded_io::ErrorKind::TimedOut => Ok(0),
            Err(e) => Err(LinkError::Io(e)),
        }
    }

    fn write_bytes(&mut self, bytes: &[u8]) -> Result<(), LinkError<Self::Error>> {
        self.write_all(bytes)?;
        self.flush()?;
        Ok(())
    }
}

/// Frames over a [Transport].
///
/// Frames have no length or delimiter on the wire. An inbound frame is
/// whatever burst of bytes is waiting when it is read, so a message
/// the peer is still sending can end up split over two frames.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Link<T> {
    port: T,
    verbose: bool,
}

impl<T> Link<T> {
    pub fn new(port: T) -> Self {
        Self::new_verbose(port, false)
    }

    /// Create a link that logs every frame it reads or writes.
    pub fn new_verbose(port: T, verbose: bool) -> Self {
        Self { port, verbose }
    }

    /// Release the underlying port.
    pub fn free(self) -> T {
        self.port
    }

    /// Get the underlying port.
    pub fn port(&self) -> &T {
        &self.port
    }

    /// Get the underlying port, mutably.
    ///
    /// Reading from this directly will swallow bytes meant for the
    /// next frame.
    pub fn port_mut(&mut self) -> &mut T {
        &mut self.port
    }
}

impl<T> Link<T>
where
    T: Transport,
{
    pub fn available(&mut self) -> Result<bool, LinkError<T::Error>> {
        self.port.available()
    }

    pub fn read_byte(&mut self) -> Result<u8, LinkError<T::Error>> {
        self.port.read_byte()
    }

    pub fn read_into(&mut self, buf: &mut [u8]) -> Result<usize, LinkError<T::Error>> {
        self.port.read_into(buf)
    }

    pub fn write_byte(&mut self, byte: u8) -> Result<(), LinkError<T::Error>> {
        self.port.write_byte(byte)
    }

    pub fn write_bytes(&mut self, bytes: &[u8]) -> Result<(), LinkError<T::Error>> {
        self.port.write_bytes(bytes)
    }

    /// Read the waiting burst of bytes into a new frame.
    pub fn read_message(&mut self) -> Result<Frame, Fatal<T::Error>> {
        let mut frame = Frame::new();
        self.read_message_into(&mut frame)?;
        Ok(frame)
    }

    /// Reset `frame` and fill it with the waiting burst of bytes.
    ///
    /// This stops as soon as nothing more is available. A burst that
    /// doesn't fit in the frame is a fatal overflow.
    pub fn read_message_into<const CAP: usize>(
        &mut self,
        frame: &mut Frame<CAP>,
    ) -> Result<(), Fatal<T::Error>> {
        frame.reset();
        while self.port.available()? {
            frame.push_raw(self.port.read_byte()?)?;
        }

        if self.verbose {
            tracing::info!("Inbound {}", frame);
        } else {
            tracing::trace!("Inbound {}", frame);
        }
        Ok(())
    }

    /// Write the written part of `frame`.
    pub fn write_message<const CAP: usize>(
        &mut self,
        frame: &Frame<CAP>,
    ) -> Result<(), LinkError<T::Error>> {
        if self.verbose {
            tracing::info!("Outbound {}", frame);
        } else {
            tracing::trace!("Outbound {}", frame);
        }
        self.port.write_bytes(frame.as_bytes())
    }
}
