use std::sync::mpsc::{Receiver, RecvError, RecvTimeoutError};
use std::time::{Duration, Instant};

/// What the worker loop wakes up for
#[derive(Debug)]
pub enum TimerEvent<M> {
    Command(M),
    Tick,
    Disconnected,
}

/// Source of commands for the worker loop
pub trait CommandSource<M>: Send + 'static {
    fn recv(&self) -> Result<M, RecvError>;
    /// Block for up to `timeout` waiting for a command.
    fn recv_timeout(&self, timeout: Duration) -> Result<M, RecvTimeoutError>;
}

/// Command source backed by an mpsc channel
pub struct ChannelCommandSource<M> {
    rx: Receiver<M>,
}

impl<M> ChannelCommandSource<M> {
    pub fn new(rx: Receiver<M>) -> Self {
        Self { rx }
    }
}

impl<M: Send + 'static> CommandSource<M> for ChannelCommandSource<M> {
    fn recv(&self) -> Result<M, RecvError> {
        self.rx.recv()
    }

    fn recv_timeout(&self, timeout: Duration) -> Result<M, RecvTimeoutError> {
        self.rx.recv_timeout(timeout)
    }
}

/// Configurable ticker interface
pub trait Ticker: Send + 'static {
    fn interval(&self) -> Duration;
}

/// Fixed interval ticker
#[derive(Clone, Copy, Debug)]
pub struct FixedTicker {
    interval: Duration,
}

impl FixedTicker {
    pub fn new(interval: Duration) -> Self {
        Self { interval }
    }
}

impl Ticker for FixedTicker {
    fn interval(&self) -> Duration {
        self.interval
    }
}

/// Runner that advances the worker one command/tick at a time.
///
/// Ticks only fire while armed. `disarm` drops the pending deadline before
/// returning, so no tick from a cancelled schedule can be yielded afterwards.
pub struct Runner<M, E: CommandSource<M>, T: Ticker> {
    source: E,
    ticker: T,
    next_tick: Option<Instant>,
    _marker: std::marker::PhantomData<fn() -> M>,
}

impl<M, E: CommandSource<M>, T: Ticker> Runner<M, E, T> {
    pub fn new(source: E, ticker: T) -> Self {
        Self {
            source,
            ticker,
            next_tick: None,
            _marker: std::marker::PhantomData,
        }
    }

    /// Schedule the next tick one interval from now
    pub fn arm(&mut self) {
        self.next_tick = Some(Instant::now() + self.ticker.interval());
    }

    pub fn disarm(&mut self) {
        self.next_tick = None;
    }

    pub fn is_armed(&self) -> bool {
        self.next_tick.is_some()
    }

    /// Blocks until the next command, or until the armed tick is due
    pub fn step(&mut self) -> TimerEvent<M> {
        let Some(due) = self.next_tick else {
            return match self.source.recv() {
                Ok(cmd) => TimerEvent::Command(cmd),
                Err(RecvError) => TimerEvent::Disconnected,
            };
        };

        let timeout = due.saturating_duration_since(Instant::now());
        match self.source.recv_timeout(timeout) {
            Ok(cmd) => TimerEvent::Command(cmd),
            Err(RecvTimeoutError::Timeout) => {
                let interval = self.ticker.interval();
                let now = Instant::now();
                // skip missed periods instead of bursting
                let next = due + interval;
                self.next_tick = Some(if next <= now { now + interval } else { next });
                TimerEvent::Tick
            }
            Err(RecvTimeoutError::Disconnected) => TimerEvent::Disconnected,
        }
    }
}
