use mrmslib::protocol::BaudRate;

#[derive(clap::Args, Debug, Clone)]
pub struct SerialPortArgs {
    /// Serial device, or host:port with --tcp.
    #[arg(default_value_t = default_serial_port())]
    pub port: String,
    #[arg(short, long, default_value_t = BaudRate::default())]
    pub baud: BaudRate,
    /// Connect to a simulator over TCP instead.
    #[arg(long)]
    pub tcp: bool,
}

#[derive(Debug)]
pub enum SerialPort {
    Serial(std::io::BufWriter<Box<dyn serialport::SerialPort>>),
    Tcp(std::io::BufWriter<std::net::TcpStream>),
}

pub fn default_serial_port() -> String {
    if let Ok(infos) = serialport::available_ports() {
        for info in infos {
            #[cfg(target_os = "macos")]
            if info.port_name.ends_with(".Bluetooth-Incoming-Port") {
                // these ports are almost always *not* what we want
                continue;
            }

            #[cfg(target_os = "macos")]
            if info.port_name.starts_with("/dev/tty.") {
                // use cu. ports instead
                continue;
            }

            return info.port_name.clone();
        }
    }

    // the Raspberry Pi's primary UART
    "/dev/serial0".to_owned()
}

impl std::io::Read for SerialPort {
    fn read(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
        match self {
            Self::Serial(port) => port.get_mut().read(buf),
            Self::Tcp(port) => port.get_mut().read(buf),
        }
    }
}

impl std::io::Write for SerialPort {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        match self {
            Self::Serial(port) => port.write(buf),
            Self::Tcp(port) => port.write(buf),
        }
    }

    fn flush(&mut self) -> std::io::Result<()> {
        match self {
            Self::Serial(port) => port.flush(),
            Self::Tcp(port) => port.flush(),
        }
    }
}

impl embedded_io::ErrorType for SerialPort {
    type Error = std::io::Error;
}

impl embedded_io::Read for SerialPort {
    fn read(&mut self, buf: &mut [u8]) -> Result<usize, Self::Error> {
        std::io::Read::read(self, buf)
    }
}

impl embedded_io::ReadReady for SerialPort {
    fn read_ready(&mut self) -> Result<bool, Self::Error> {
        match self {
            Self::Serial(port) => Ok(port.get_ref().bytes_to_read()? > 0),
            Self::Tcp(port) => {
                // a closed socket also counts, so the next read sees eof
                let stream = port.get_ref();
                stream.set_nonblocking(true)?;
                let ready = match stream.peek(&mut [0u8]) {
                    Ok(_) => Ok(true),
                    Err(e) if e.kind() == std::io::ErrorKind::WouldBlock => Ok(false),
                    Err(e) => Err(e),
                };
                stream.set_nonblocking(false)?;
                ready
            }
        }
    }
}

impl embedded_io::Write for SerialPort {
    fn write(&mut self, buf: &[u8]) -> Result<usize, Self::Error> {
        std::io::Write::write(self, buf)
    }

    fn flush(&mut self) -> Result<(), Self::Error> {
        std::io::Write::flush(self)
    }
}

impl SerialPortArgs {
    pub fn open(&self) -> anyhow::Result<SerialPort> {
        let port = if self.tcp {
            std::net::TcpStream::connect(&self.port)
                .map(|port| SerialPort::Tcp(std::io::BufWriter::new(port)))
                .map_err(anyhow::Error::from)
        } else {
            serialport::new(&self.port, self.baud.get())
                .timeout(std::time::Duration::from_secs(1))
                .open()
                .map(|port| SerialPort::Serial(std::io::BufWriter::new(port)))
                .map_err(anyhow::Error::from)
        };

        port.map_err(|e| {
            tracing::error!("Unable to open {}: {}. Rights?", self.port, e);
            e
        })
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use mrmslib::{Link, Transport};

    fn pair() -> (SerialPort, std::net::TcpStream) {
        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        let client = std::net::TcpStream::connect(listener.local_addr().unwrap()).unwrap();
        let (server, _) = listener.accept().unwrap();
        (SerialPort::Tcp(std::io::BufWriter::new(client)), server)
    }

    #[test]
    fn tcp_availability() {
        use std::io::Write;

        let (port, mut peer) = pair();
        let mut link = Link::new(port);
        assert!(!link.available().unwrap());

        peer.write_all(b"L").unwrap();
        peer.flush().unwrap();
        while !link.available().unwrap() {
            std::thread::sleep(std::time::Duration::from_millis(1));
        }
        assert_eq!(link.read_byte().unwrap(), b'L');
    }

    #[test]
    fn tcp_closed_is_eof() {
        let (mut port, peer) = pair();
        drop(peer);
        while !port.available().unwrap() {
            std::thread::sleep(std::time::Duration::from_millis(1));
        }
        assert!(matches!(
            port.read_byte(),
            Err(mrmslib::LinkError::UnexpectedEof)
        ));
    }

    #[test]
    fn tcp_write_flushes() {
        use std::io::Read;

        let (port, mut peer) = pair();
        let mut link = Link::new(port);
        link.write_bytes(b"l\x28\x00").unwrap();

        let mut buf = [0u8; 3];
        peer.read_exact(&mut buf).unwrap();
        assert_eq!(&buf, b"l\x28\x00");
    }

    #[test]
    fn open_failure() {
        let args = SerialPortArgs {
            port: "/dev/does-not-exist".to_owned(),
            baud: BaudRate::default(),
            tcp: false,
        };
        assert!(args.open().is_err());
    }
}
