use std::io::Write;

use mrmslib::clock::StdClock;
use mrmslib::{Duration, Fatal, Link, Robot, RobotConfig, State};
use rand::rngs::StdRng;
use rand::SeedableRng;

use crate::common::{SerialPort, SerialPortArgs};
use crate::debug::DebugArgs;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, clap::ValueEnum)]
pub enum StartState {
    /// Echo everything received to stdout.
    UartEcho,
    /// Obey commands until told to idle.
    UartMessages,
    Idle,
    LineFollowing,
    RedRoom,
}

impl From<StartState> for State {
    fn from(other: StartState) -> Self {
        match other {
            StartState::UartEcho => State::UartEcho,
            StartState::UartMessages => State::UartMessages,
            StartState::Idle => State::Idle,
            StartState::LineFollowing => State::LineFollowing,
            StartState::RedRoom => State::RedRoom,
        }
    }
}

#[derive(clap::Args, Debug)]
pub struct RunOpts {
    #[command(flatten)]
    port: SerialPortArgs,
    #[command(flatten)]
    debug: DebugArgs,
    #[arg(long, value_enum, default_value_t = StartState::UartMessages)]
    state: StartState,
    /// Seed for the line position walk. Random if not given.
    #[arg(long)]
    seed: Option<u64>,
    /// Minimum time between position updates.
    #[arg(long, default_value_t = 100)]
    interval_ms: u64,
    #[arg(long, default_value_t = 40)]
    start_position: u16,
    /// Start over on a desynchronized link instead of exiting.
    #[arg(long)]
    restart: bool,
}

type StdRobot = Robot<SerialPort, StdClock, StdRng>;

impl crate::ToolRun for RunOpts {
    fn run(&self) -> anyhow::Result<()> {
        self.debug.init();

        let port = self.port.open()?;
        if self.port.tcp {
            tracing::info!("Connected to {}", self.port.port);
        } else {
            tracing::info!("Opened {} at {} baud", self.port.port, self.port.baud);
        }

        let rng = match self.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        let link = Link::new_verbose(port, self.debug.verbose());
        let mut robot = self.robot(link, StdClock::new(), rng);

        let stdout = std::io::stdout();
        loop {
            let mut out = stdout.lock();
            let res = robot.run(|b| {
                if let Err(e) = out.write_all(&[b]).and_then(|_| out.flush()) {
                    tracing::warn!("Echo failed: {}", e);
                }
            });

            match next(res, self.restart) {
                Next::Done => {
                    tracing::info!("Link test done");
                    return Ok(());
                }
                Next::Restart(e) => {
                    tracing::warn!("{}, starting over in {}", e, self.start_state());
                    robot = self.restart(robot);
                }
                Next::Exit(e) => {
                    tracing::error!("{}", e);
                    std::process::exit(e.exit_code());
                }
            }
        }
    }
}

/// What the supervisor does once the robot stops.
#[derive(Debug)]
enum Next<E> {
    Done,
    Restart(Fatal<E>),
    /// Exit with the error's exit code.
    Exit(Fatal<E>),
}

// only a desynchronized link can be started over, framing and link
// failures always exit
fn next<E>(res: Result<(), Fatal<E>>, restart: bool) -> Next<E> {
    match res {
        Ok(()) => Next::Done,
        Err(e) if restart && e.is_desync() => Next::Restart(e),
        Err(e) => Next::Exit(e),
    }
}

impl RunOpts {
    fn start_state(&self) -> State {
        self.state.into()
    }

    fn config(&self) -> RobotConfig {
        RobotConfig {
            emit_interval: Duration::millis(self.interval_ms),
            start_position: self.start_position,
            ..Default::default()
        }
    }

    fn robot(&self, link: Link<SerialPort>, clock: StdClock, rng: StdRng) -> StdRobot {
        Robot::new(link, clock, rng, self.start_state(), &self.config())
    }

    /// Rebuild `robot` in the startup state, on the same link.
    fn restart(&self, robot: StdRobot) -> StdRobot {
        let (link, clock, rng) = robot.free();
        self.robot(link, clock, rng)
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use clap::Parser;
    use mrmslib::dispatch::DispatchError;
    use mrmslib::protocol::{FieldType, FrameError};
    use mrmslib::LinkError;

    type IoFatal = Fatal<std::io::Error>;

    #[derive(Parser, Debug)]
    struct Cli {
        #[command(flatten)]
        run: RunOpts,
    }

    #[test]
    fn defaults() {
        let cli = Cli::try_parse_from(["run", "/dev/ttyAMA0"]).unwrap();
        assert_eq!(cli.run.start_state(), State::UartMessages);
        assert_eq!(cli.run.config(), RobotConfig::default());
        assert_eq!(cli.run.port.baud.get(), 115200);
        assert!(!cli.run.restart);
    }

    #[test]
    fn options() {
        let cli = Cli::try_parse_from([
            "run",
            "localhost:8855",
            "--tcp",
            "--state",
            "red-room",
            "--interval-ms",
            "250",
            "--start-position",
            "10",
            "--seed",
            "3",
            "--restart",
        ])
        .unwrap();
        assert_eq!(cli.run.start_state(), State::RedRoom);
        assert_eq!(cli.run.config().emit_interval, Duration::millis(250));
        assert_eq!(cli.run.config().start_position, 10);
        assert_eq!(cli.run.seed, Some(3));
        assert!(cli.run.port.tcp);
        assert!(cli.run.restart);
    }

    #[test]
    fn desync_restarts_only_when_asked() {
        let desync = || IoFatal::Dispatch(DispatchError::Unrecognized(b'?'));
        assert!(matches!(next(Err(desync()), true), Next::Restart(_)));
        match next(Err(desync()), false) {
            Next::Exit(e) => assert_eq!(e.exit_code(), 13),
            other => panic!("unexpected {:?}", other),
        }
        assert!(matches!(next::<std::io::Error>(Ok(()), true), Next::Done));
    }

    #[test]
    fn framing_and_link_fatals_exit() {
        let overflow = IoFatal::Frame(FrameError::Overflow {
            field: FieldType::Raw,
            at: 15,
        });
        match next(Err(overflow), true) {
            Next::Exit(e) => assert_eq!(e.exit_code(), 75),
            other => panic!("unexpected {:?}", other),
        }

        let eof = IoFatal::Link(LinkError::UnexpectedEof);
        match next(Err(eof), true) {
            Next::Exit(e) => assert_eq!(e.exit_code(), 74),
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn restart_goes_back_to_startup_state() {
        use std::io::Write;

        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap().to_string();
        let cli = Cli::try_parse_from(["run", &addr, "--tcp", "--state", "idle", "--restart"])
            .unwrap();
        let port = cli.run.port.open().unwrap();
        let (mut peer, _) = listener.accept().unwrap();

        let mut robot = cli
            .run
            .robot(Link::new(port), StdClock::new(), StdRng::seed_from_u64(1));

        peer.write_all(b"R").unwrap();
        while robot.state() != State::RedRoom {
            robot.tick().unwrap();
        }

        peer.write_all(b"?").unwrap();
        let err = loop {
            if let Err(e) = robot.tick() {
                break e;
            }
        };
        assert_eq!(robot.state(), State::RedRoom);

        let e = match next(Err(err), cli.run.restart) {
            Next::Restart(e) => e,
            other => panic!("unexpected {:?}", other),
        };
        assert!(matches!(
            e,
            Fatal::Dispatch(DispatchError::Unrecognized(b'?'))
        ));

        let robot = cli.run.restart(robot);
        assert_eq!(robot.state(), cli.run.start_state());
        assert_eq!(robot.state(), State::Idle);
    }
}
