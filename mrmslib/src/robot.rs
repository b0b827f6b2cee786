//! The robot's state machine.
//!
//! A [Robot] owns everything that used to be ambient: the link to the
//! peer, the clock, the current state and the time of the next
//! position update. It is driven by calling [Robot::tick] in a loop,
//! or by handing control to [Robot::run].

use core::convert::Infallible;

use rand::{Rng, RngCore};

use crate::clock::{Clock, Duration, Instant};
use crate::dispatch::{dispatch, DispatchError};
use crate::error::Fatal;
use crate::link::{Link, Transport};
use crate::protocol::{Frame, Message, Opcode};

/// The states a peer can ask for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum OperatingState {
    Idle,
    LineFollowing,
    RedRoom,
}

impl OperatingState {
    /// The opcode a peer sends to select this state.
    pub const fn opcode(&self) -> Opcode {
        match self {
            Self::Idle => Opcode::Idle,
            Self::LineFollowing => Opcode::LineFollowing,
            Self::RedRoom => Opcode::RedRoom,
        }
    }

    pub const fn from_opcode(op: Opcode) -> Option<Self> {
        match op {
            Opcode::Idle => Some(Self::Idle),
            Opcode::LineFollowing => Some(Self::LineFollowing),
            Opcode::RedRoom => Some(Self::RedRoom),
            _ => None,
        }
    }

    pub const fn name(&self) -> &'static str {
        State::from_operating(*self).name()
    }
}

impl core::fmt::Display for OperatingState {
    fn fmt(&self, f: &mut core::fmt::Formatter) -> core::fmt::Result {
        write!(f, "{}", self.name())
    }
}

/// Every state the robot can be in.
///
/// The link tests can only be chosen at startup. Once left, they are
/// never entered again.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum State {
    /// Echo every inbound byte.
    UartEcho,
    /// Obey commands until told to idle, following the line when asked.
    UartMessages,
    Idle,
    LineFollowing,
    RedRoom,
}

impl State {
    const fn from_operating(state: OperatingState) -> Self {
        match state {
            OperatingState::Idle => Self::Idle,
            OperatingState::LineFollowing => Self::LineFollowing,
            OperatingState::RedRoom => Self::RedRoom,
        }
    }

    pub const fn is_diagnostic(&self) -> bool {
        matches!(self, Self::UartEcho | Self::UartMessages)
    }

    pub const fn operating(&self) -> Option<OperatingState> {
        match self {
            Self::Idle => Some(OperatingState::Idle),
            Self::LineFollowing => Some(OperatingState::LineFollowing),
            Self::RedRoom => Some(OperatingState::RedRoom),
            _ => None,
        }
    }

    pub const fn name(&self) -> &'static str {
        match self {
            Self::UartEcho => "uart-echo",
            Self::UartMessages => "uart-messages",
            Self::Idle => "idle",
            Self::LineFollowing => "line-following",
            Self::RedRoom => "red-room",
        }
    }
}

impl From<OperatingState> for State {
    fn from(other: OperatingState) -> Self {
        Self::from_operating(other)
    }
}

impl core::fmt::Display for State {
    fn fmt(&self, f: &mut core::fmt::Formatter) -> core::fmt::Result {
        write!(f, "{}", self.name())
    }
}

/// Startup configuration for a [Robot].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct RobotConfig {
    /// Minimum time between position updates.
    pub emit_interval: Duration,
    pub start_position: u16,
    /// Largest change in position per update, either way.
    pub max_step: u16,
    pub min_position: u16,
    pub max_position: u16,
}

impl Default for RobotConfig {
    fn default() -> Self {
        Self {
            emit_interval: Duration::millis(100),
            start_position: 40,
            max_step: 5,
            min_position: 0,
            max_position: 80,
        }
    }
}

/// A bounded random walk, standing in for where the line really is.
#[derive(Debug, Clone)]
pub struct RandomWalk<R> {
    rng: R,
    position: i32,
    step: i32,
    min: i32,
    max: i32,
}

impl<R> RandomWalk<R>
where
    R: RngCore,
{
    pub fn new(rng: R, config: &RobotConfig) -> Self {
        let (min, max) = if config.min_position <= config.max_position {
            (config.min_position, config.max_position)
        } else {
            (config.max_position, config.min_position)
        };
        let (min, max) = (min as i32, max as i32);

        Self {
            rng,
            position: (config.start_position as i32).clamp(min, max),
            step: config.max_step as i32,
            min,
            max,
        }
    }

    pub fn position(&self) -> u16 {
        self.position as u16
    }

    /// Release the random number generator.
    pub fn free(self) -> R {
        self.rng
    }

    /// Take one step, and return the new position.
    pub fn next(&mut self) -> u16 {
        let delta = self.rng.gen_range(-self.step..=self.step);
        self.position = (self.position + delta).clamp(self.min, self.max);
        self.position()
    }
}

/// The robot side of the link.
#[derive(Debug)]
pub struct Robot<T, C, R> {
    link: Link<T>,
    clock: C,
    walk: RandomWalk<R>,
    state: State,
    frame: Frame,
    interval: Duration,
    next_emit: Option<Instant>,
}

impl<T, C, R> Robot<T, C, R>
where
    T: Transport,
    C: Clock,
    R: RngCore,
{
    pub fn new(link: Link<T>, clock: C, rng: R, state: State, config: &RobotConfig) -> Self {
        Self {
            link,
            clock,
            walk: RandomWalk::new(rng, config),
            state,
            frame: Frame::new(),
            interval: config.emit_interval,
            next_emit: None,
        }
    }

    pub fn state(&self) -> State {
        self.state
    }

    pub fn set_state(&mut self, state: State) {
        if state != self.state {
            tracing::info!("State {} -> {}", self.state, state);
        }
        self.state = state;
    }

    pub fn position(&self) -> u16 {
        self.walk.position()
    }

    pub fn link(&self) -> &Link<T> {
        &self.link
    }

    pub fn link_mut(&mut self) -> &mut Link<T> {
        &mut self.link
    }

    pub fn clock_mut(&mut self) -> &mut C {
        &mut self.clock
    }

    /// Release the link, the clock and the random number generator.
    pub fn free(self) -> (Link<T>, C, R) {
        (self.link, self.clock, self.walk.free())
    }

    /// Dispatch an inbound frame, and switch to the state it asks for.
    pub fn handle_frame<const CAP: usize>(
        &mut self,
        frame: &mut Frame<CAP>,
    ) -> Result<OperatingState, DispatchError> {
        let next = dispatch(frame)?;
        self.set_state(next.into());
        Ok(next)
    }

    /// If the peer has sent anything, read it as one frame and obey it.
    pub fn handle_inbound(&mut self) -> Result<Option<OperatingState>, Fatal<T::Error>> {
        if !self.link.available()? {
            return Ok(None);
        }

        self.link.read_message_into(&mut self.frame)?;
        let next = dispatch(&mut self.frame)?;
        self.set_state(next.into());
        Ok(Some(next))
    }

    /// Move the line, and tell the peer where it is now.
    pub fn emit_position(&mut self) -> Result<u16, Fatal<T::Error>> {
        let x = self.walk.next();
        Message::LinePosition { x }.frame(&mut self.frame)?;
        self.link.write_message(&self.frame)?;
        tracing::debug!(x, "Line position");
        Ok(x)
    }

    fn emit_due(&mut self) -> bool {
        let now = self.clock.now();
        match self.next_emit {
            Some(next) if now < next => false,
            _ => {
                self.next_emit = Some(now + self.interval);
                true
            }
        }
    }

    /// One pass of the main loop: send a position update if one is due,
    /// then handle at most one inbound burst.
    pub fn tick(&mut self) -> Result<(), Fatal<T::Error>> {
        if self.emits_positions() && self.emit_due() {
            self.emit_position()?;
        }
        self.handle_inbound()?;
        Ok(())
    }

    fn emits_positions(&self) -> bool {
        self.state == State::LineFollowing
    }

    /// Hand every inbound byte to `sink`, forever.
    pub fn run_echo<F>(&mut self, mut sink: F) -> Result<Infallible, Fatal<T::Error>>
    where
        F: FnMut(u8),
    {
        loop {
            if self.link.available()? {
                sink(self.link.read_byte()?);
            }
        }
    }

    /// Run until the peer asks for [State::Idle].
    pub fn run_messages(&mut self) -> Result<(), Fatal<T::Error>> {
        while self.state != State::Idle {
            self.tick()?;
        }
        Ok(())
    }

    /// Run the loop for the current state. Only the link tests ever
    /// return successfully.
    pub fn run<F>(&mut self, sink: F) -> Result<(), Fatal<T::Error>>
    where
        F: FnMut(u8),
    {
        match self.state {
            State::UartEcho => match self.run_echo(sink)? {},
            State::UartMessages => self.run_messages(),
            _ => loop {
                self.tick()?;
            },
        }
    }
}
