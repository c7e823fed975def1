//! Process-wide timer service.
//!
//! The composition root spawns one [`TimerService`] and passes cloned
//! [`TimerHandle`]s to whatever needs to start, stop or observe the timer.
//! All timer state lives on the worker thread; handles only send commands
//! and read the last published [`TimerView`].

use chrono::NaiveDate;
use std::sync::mpsc::{self, Sender};
use std::sync::{Arc, PoisonError, RwLock};
use std::thread::JoinHandle;
use tracing::{debug, info};

use crate::clock::Clock;
use crate::error::ServiceError;
use crate::runtime::{ChannelCommandSource, Runner, Ticker, TimerEvent};
use crate::session::{SessionEntry, SessionLog, SubjectId};
use crate::timer::{StudyTimer, TimerState, TimerView};

#[derive(Debug)]
enum Command {
    Start {
        subject_id: SubjectId,
        reply: Sender<()>,
    },
    Stop {
        reply: Sender<Option<SessionEntry>>,
    },
    Reset {
        reply: Sender<()>,
    },
    SessionLog {
        reply: Sender<Vec<SessionEntry>>,
    },
    TotalForDay {
        day: NaiveDate,
        reply: Sender<u64>,
    },
    TotalAllTime {
        reply: Sender<u64>,
    },
    Shutdown,
}

/// Cloneable handle to the running timer
#[derive(Debug, Clone)]
pub struct TimerHandle {
    tx: Sender<Command>,
    view: Arc<RwLock<TimerView>>,
}

impl TimerHandle {
    fn request<R>(&self, build: impl FnOnce(Sender<R>) -> Command) -> Result<R, ServiceError> {
        let (reply, rx) = mpsc::channel();
        self.tx
            .send(build(reply))
            .map_err(|_| ServiceError::Stopped)?;
        rx.recv().map_err(|_| ServiceError::Stopped)
    }

    /// Starts timing `subject_id`. An already active session is dropped
    /// without being recorded.
    pub fn start_timer(&self, subject_id: impl Into<SubjectId>) -> Result<(), ServiceError> {
        let subject_id = subject_id.into();
        self.request(|reply| Command::Start { subject_id, reply })
    }

    pub fn stop_timer(&self) -> Result<u64, ServiceError> {
        Ok(self.stop_session()?.map_or(0, |entry| entry.elapsed_ms))
    }

    /// Stops the active session and returns the entry the worker recorded,
    /// `None` if the timer was idle when the command ran.
    pub fn stop_session(&self) -> Result<Option<SessionEntry>, ServiceError> {
        self.request(|reply| Command::Stop { reply })
    }

    pub fn reset_timer(&self) -> Result<(), ServiceError> {
        self.request(|reply| Command::Reset { reply })
    }

    pub fn session_log(&self) -> Result<Vec<SessionEntry>, ServiceError> {
        self.request(|reply| Command::SessionLog { reply })
    }

    pub fn total_study_time_for_day(&self, day: NaiveDate) -> Result<u64, ServiceError> {
        self.request(|reply| Command::TotalForDay { day, reply })
    }

    pub fn total_study_time_for_all_time(&self) -> Result<u64, ServiceError> {
        self.request(|reply| Command::TotalAllTime { reply })
    }

    /// Last published snapshot; refreshed after every command and tick
    pub fn view(&self) -> TimerView {
        self.view
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn elapsed_time(&self) -> u64 {
        self.view().elapsed_ms
    }

    pub fn is_timer_active(&self) -> bool {
        self.view().state == TimerState::Active
    }

    pub fn current_subject_id(&self) -> Option<SubjectId> {
        self.view().current_subject_id
    }
}

/// Owner of the timer worker thread
pub struct TimerService {
    handle: TimerHandle,
    worker: Option<JoinHandle<SessionLog>>,
}

impl TimerService {
    pub fn spawn<C: Clock, T: Ticker>(timer: StudyTimer<C>, ticker: T) -> Self {
        let (tx, rx) = mpsc::channel();
        let view = Arc::new(RwLock::new(timer.view()));
        let published = Arc::clone(&view);
        let runner = Runner::new(ChannelCommandSource::new(rx), ticker);

        let worker = std::thread::spawn(move || run_worker(timer, runner, published));
        info!("timer service started");

        Self {
            handle: TimerHandle { tx, view },
            worker: Some(worker),
        }
    }

    pub fn handle(&self) -> TimerHandle {
        self.handle.clone()
    }

    /// Cancels ticks, stops the worker and returns the final session log.
    /// An active session is discarded unrecorded.
    pub fn shutdown(mut self) -> Result<SessionLog, ServiceError> {
        self.stop_worker()
    }

    fn stop_worker(&mut self) -> Result<SessionLog, ServiceError> {
        let Some(worker) = self.worker.take() else {
            return Err(ServiceError::Stopped);
        };
        let _ = self.handle.tx.send(Command::Shutdown);
        let log = worker.join().map_err(|_| ServiceError::WorkerPanicked)?;
        info!(sessions = log.len(), "timer service stopped");
        Ok(log)
    }
}

impl Drop for TimerService {
    fn drop(&mut self) {
        if self.worker.is_some() {
            let _ = self.stop_worker();
        }
    }
}

fn run_worker<C: Clock, T: Ticker>(
    mut timer: StudyTimer<C>,
    mut runner: Runner<Command, ChannelCommandSource<Command>, T>,
    view: Arc<RwLock<TimerView>>,
) -> SessionLog {
    let publish = |timer: &StudyTimer<C>| {
        *view.write().unwrap_or_else(PoisonError::into_inner) = timer.view();
    };

    loop {
        match runner.step() {
            TimerEvent::Tick => {
                if let Some(schedule) = timer.current_schedule() {
                    timer.tick(schedule);
                    publish(&timer);
                }
            }
            TimerEvent::Command(cmd) => match cmd {
                Command::Start { subject_id, reply } => {
                    runner.disarm();
                    timer.start_timer(subject_id);
                    runner.arm();
                    publish(&timer);
                    let _ = reply.send(());
                }
                Command::Stop { reply } => {
                    runner.disarm();
                    let entry = timer.stop_session();
                    publish(&timer);
                    let _ = reply.send(entry);
                }
                Command::Reset { reply } => {
                    timer.reset_timer();
                    publish(&timer);
                    let _ = reply.send(());
                }
                Command::SessionLog { reply } => {
                    let _ = reply.send(timer.session_log().entries());
                }
                Command::TotalForDay { day, reply } => {
                    let _ = reply.send(timer.total_study_time_for_day(day));
                }
                Command::TotalAllTime { reply } => {
                    let _ = reply.send(timer.total_study_time_for_all_time());
                }
                Command::Shutdown => break,
            },
            TimerEvent::Disconnected => break,
        }
    }

    runner.disarm();
    if let Some(subject) = timer.current_subject_id() {
        debug!(%subject, "discarding active session at shutdown");
    }
    timer.into_log()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;
    use crate::runtime::FixedTicker;
    use assert_matches::assert_matches;
    use chrono::{Duration as ChronoDuration, Local, TimeZone};
    use std::time::{Duration, Instant};

    fn spawn_manual() -> (ManualClock, TimerService) {
        let clock = ManualClock::new(Local.with_ymd_and_hms(2024, 9, 1, 8, 30, 0).unwrap());
        let timer = StudyTimer::new(clock.clone());
        let service = TimerService::spawn(timer, FixedTicker::new(Duration::from_millis(5)));
        (clock, service)
    }

    fn wait_for(handle: &TimerHandle, pred: impl Fn(&TimerView) -> bool) -> bool {
        let deadline = Instant::now() + Duration::from_secs(2);
        while Instant::now() < deadline {
            if pred(&handle.view()) {
                return true;
            }
            std::thread::sleep(Duration::from_millis(2));
        }
        false
    }

    #[test]
    fn test_commands_round_trip_through_worker() {
        let (clock, service) = spawn_manual();
        let handle = service.handle();

        handle.start_timer("q1").unwrap();
        assert!(handle.is_timer_active());
        assert_eq!(handle.current_subject_id(), Some(SubjectId::from("q1")));
        assert_eq!(handle.elapsed_time(), 0);

        clock.advance(ChronoDuration::seconds(3));
        assert_eq!(handle.stop_timer().unwrap(), 3000);
        assert!(!handle.is_timer_active());
        assert_eq!(handle.elapsed_time(), 0);

        let log = handle.session_log().unwrap();
        assert_eq!(log.len(), 1);
        assert_eq!(log[0].subject_id.as_str(), "q1");
        assert_eq!(handle.total_study_time_for_all_time().unwrap(), 3000);
        assert_eq!(
            handle
                .total_study_time_for_day(clock.now().date_naive())
                .unwrap(),
            3000
        );
    }

    #[test]
    fn test_ticks_publish_elapsed() {
        let (clock, service) = spawn_manual();
        let handle = service.handle();

        handle.start_timer("q1").unwrap();
        clock.advance(ChronoDuration::seconds(2));

        assert!(wait_for(&handle, |v| v.elapsed_ms == 2000));
    }

    #[test]
    fn test_stop_session_reports_subject_from_worker() {
        let (clock, service) = spawn_manual();
        let first = service.handle();
        let second = service.handle();

        first.start_timer("q1").unwrap();
        // another consumer switches subject before the stop lands
        second.start_timer("q2").unwrap();
        clock.advance(ChronoDuration::seconds(2));

        let entry = first.stop_session().unwrap().unwrap();
        assert_eq!(entry.subject_id.as_str(), "q2");
        assert_eq!(entry.elapsed_ms, 2000);
        assert_eq!(second.stop_session().unwrap(), None);
        assert_eq!(second.stop_timer().unwrap(), 0);
    }

    #[test]
    fn test_reset_through_handle() {
        let (clock, service) = spawn_manual();
        let handle = service.handle();

        handle.start_timer("q1").unwrap();
        clock.advance(ChronoDuration::seconds(4));
        assert!(wait_for(&handle, |v| v.elapsed_ms == 4000));

        handle.reset_timer().unwrap();
        assert_eq!(handle.elapsed_time(), 0);
        assert!(handle.is_timer_active());
        assert!(handle.session_log().unwrap().is_empty());
    }

    #[test]
    fn test_shutdown_returns_log_and_stops_handles() {
        let (clock, service) = spawn_manual();
        let handle = service.handle();

        handle.start_timer("q1").unwrap();
        clock.advance(ChronoDuration::seconds(1));
        handle.stop_timer().unwrap();
        handle.start_timer("q2").unwrap();

        let log = service.shutdown().unwrap();
        assert_eq!(log.len(), 1);
        assert_eq!(log.last().unwrap().subject_id.as_str(), "q1");

        assert_matches!(handle.stop_timer(), Err(ServiceError::Stopped));
        assert_matches!(handle.start_timer("q3"), Err(ServiceError::Stopped));
    }

    #[test]
    fn test_drop_shuts_down_worker() {
        let (_, service) = spawn_manual();
        let handle = service.handle();
        drop(service);
        assert_matches!(handle.session_log(), Err(ServiceError::Stopped));
    }
}
