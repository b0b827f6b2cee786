use mrmslib::clock::StdClock;
use mrmslib::protocol::{Frame, Message};
use mrmslib::{Clock, Duration, Fatal, Link, LinkError, OperatingState, Transport};

use crate::common::SerialPort;
use crate::debug::DebugArgs;

#[derive(clap::Args, Debug)]
pub struct SimulateOpts {
    #[arg(default_value = "localhost:8855")]
    bind: String,
    #[command(flatten)]
    debug: DebugArgs,
    /// How long to follow the line before going to the red room.
    #[arg(long, default_value_t = 2000)]
    line_ms: u64,
    /// How long to stay in the red room before idling.
    #[arg(long, default_value_t = 1000)]
    red_room_ms: u64,
}

impl crate::ToolRun for SimulateOpts {
    fn run(&self) -> anyhow::Result<()> {
        self.debug.init();

        let listener = std::net::TcpListener::bind(&self.bind)?;
        tracing::info!("Listening on {}", self.bind);

        loop {
            let (stream, addr) = listener.accept()?;
            tracing::info!("Connected to {}", addr);

            let port = SerialPort::Tcp(std::io::BufWriter::new(stream));
            let link = Link::new_verbose(port, self.debug.verbose());
            match Simulator::new(link, self).simulate() {
                Ok(()) => tracing::info!("Done with {}", addr),
                // an expected error, at disconnect
                Err(Fatal::Link(LinkError::UnexpectedEof)) => {
                    tracing::info!("Disconnected from {}", addr)
                }
                Err(e) => tracing::warn!("Lost {}: {}", addr, e),
            }
        }
    }
}

struct Simulator<'a, T> {
    link: Link<T>,
    clock: StdClock,
    frame: Frame,
    opts: &'a SimulateOpts,
    positions: usize,
}

impl<'a, T> Simulator<'a, T>
where
    T: Transport,
    T::Error: core::fmt::Debug,
{
    fn new(link: Link<T>, opts: &'a SimulateOpts) -> Self {
        Self {
            link,
            clock: StdClock::new(),
            frame: Frame::new(),
            opts,
            positions: 0,
        }
    }

    fn simulate(&mut self) -> Result<(), Fatal<T::Error>> {
        self.command(OperatingState::LineFollowing)?;
        self.watch(Duration::millis(self.opts.line_ms))?;
        self.command(OperatingState::RedRoom)?;
        self.watch(Duration::millis(self.opts.red_room_ms))?;
        self.command(OperatingState::Idle)?;
        tracing::info!("Saw {} position updates", self.positions);
        Ok(())
    }

    fn command(&mut self, state: OperatingState) -> Result<(), Fatal<T::Error>> {
        tracing::info!("Sending {}", state);
        Message::SetState(state).frame(&mut self.frame)?;
        self.link.write_message(&self.frame)?;
        Ok(())
    }

    /// Print every position update that arrives in the next `span`.
    fn watch(&mut self, span: Duration) -> Result<(), Fatal<T::Error>> {
        let end = self.clock.now() + span;
        while self.clock.now() < end {
            if !self.link.available()? {
                std::thread::sleep(std::time::Duration::from_millis(1));
                continue;
            }

            self.link.read_message_into(&mut self.frame)?;
            while self.frame.remaining() > 0 {
                match Message::read_from(&mut self.frame) {
                    Ok(Message::LinePosition { x }) => {
                        self.positions += 1;
                        println!("{}", x);
                    }
                    Ok(other) => tracing::warn!("Robot sent {:?}", other),
                    Err(e) => {
                        // usually an update split over two bursts
                        tracing::debug!("Dropping rest of burst: {}", e);
                        break;
                    }
                }
            }
        }
        Ok(())
    }
}
