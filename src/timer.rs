use chrono::{DateTime, Local, NaiveDate};
use serde::Serialize;
use std::time::Duration;
use tracing::debug;

use crate::clock::{elapsed_ms, Clock, SystemClock};
use crate::session::{ActiveSession, SessionEntry, SessionLog, SubjectId};

/// Default period of the live elapsed refresh
pub const TICK_INTERVAL: Duration = Duration::from_secs(1);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, strum_macros::Display)]
#[strum(serialize_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum TimerState {
    #[default]
    Idle,
    Active,
}

/// Handle for the recurring tick of one session.
///
/// Every `start_timer` invalidates the previous handle before issuing a new
/// one, so a tick delivered with a stale handle is a no-op.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TickSchedule {
    id: u64,
    period: Duration,
}

impl TickSchedule {
    pub fn id(&self) -> u64 {
        self.id
    }

    pub fn period(&self) -> Duration {
        self.period
    }
}

/// Read-only projection of the timer for display
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct TimerView {
    pub state: TimerState,
    pub current_subject_id: Option<SubjectId>,
    pub started_at: Option<DateTime<Local>>,
    pub elapsed_ms: u64,
    pub logged_sessions: usize,
}

/// Study-session timer: at most one active session, stopped sessions go to
/// the log.
///
/// Calling [`StudyTimer::start_timer`] while a session is active abandons that
/// session without recording it and without any warning. Callers that want
/// the partial time kept must call [`StudyTimer::stop_timer`] first.
#[derive(Debug)]
pub struct StudyTimer<C: Clock = SystemClock> {
    clock: C,
    tick_period: Duration,
    active: Option<ActiveSession>,
    schedule: Option<TickSchedule>,
    next_schedule_id: u64,
    log: SessionLog,
}

impl StudyTimer<SystemClock> {
    pub fn system() -> Self {
        Self::new(SystemClock)
    }
}

impl<C: Clock> StudyTimer<C> {
    pub fn new(clock: C) -> Self {
        Self::with_log(clock, SessionLog::new())
    }

    pub fn with_log(clock: C, log: SessionLog) -> Self {
        Self {
            clock,
            tick_period: TICK_INTERVAL,
            active: None,
            schedule: None,
            next_schedule_id: 0,
            log,
        }
    }

    pub fn with_tick_period(mut self, period: Duration) -> Self {
        self.tick_period = period;
        self
    }

    pub fn tick_period(&self) -> Duration {
        self.tick_period
    }

    pub fn start_timer(&mut self, subject_id: impl Into<SubjectId>) -> TickSchedule {
        let subject_id = subject_id.into();
        self.cancel_schedule();

        if let Some(previous) = self.active.take() {
            debug!(
                previous = %previous.subject_id,
                next = %subject_id,
                "superseding active session without recording it"
            );
        }

        let now = self.clock.now();
        debug!(subject = %subject_id, "session started");
        self.active = Some(ActiveSession::new(subject_id, now));

        let schedule = TickSchedule {
            id: self.next_schedule_id,
            period: self.tick_period,
        };
        self.next_schedule_id += 1;
        self.schedule = Some(schedule);

        // first tick fires right away
        self.tick(schedule);
        schedule
    }

    /// Stops and records the active session; returns its duration in ms.
    pub fn stop_timer(&mut self) -> u64 {
        self.stop_session().map_or(0, |entry| entry.elapsed_ms)
    }

    /// Like [`StudyTimer::stop_timer`], but hands back the recorded entry.
    /// `None` when nothing was active.
    pub fn stop_session(&mut self) -> Option<SessionEntry> {
        self.cancel_schedule();

        let session = self.active.take()?;
        let now = self.clock.now();
        let elapsed = elapsed_ms(session.started_at, now);
        debug!(subject = %session.subject_id, elapsed_ms = elapsed, "session stopped");

        let entry = SessionEntry {
            subject_id: session.subject_id,
            started_at: session.started_at,
            ended_at: now,
            elapsed_ms: elapsed,
        };
        self.log.push(entry.clone());
        Some(entry)
    }

    /// Restarts timing of the active subject from now. The tick schedule and
    /// the log are left alone.
    pub fn reset_timer(&mut self) {
        let now = self.clock.now();
        if let Some(session) = self.active.as_mut() {
            session.started_at = now;
            session.elapsed_ms = 0;
        }
    }

    /// Refreshes the live elapsed reading. Returns false for a tick that
    /// belongs to a cancelled schedule.
    pub fn tick(&mut self, schedule: TickSchedule) -> bool {
        if self.schedule != Some(schedule) {
            return false;
        }
        let now = self.clock.now();
        match self.active.as_mut() {
            Some(session) => {
                session.elapsed_ms = elapsed_ms(session.started_at, now);
                true
            }
            None => false,
        }
    }

    pub fn current_schedule(&self) -> Option<TickSchedule> {
        self.schedule
    }

    pub fn state(&self) -> TimerState {
        if self.active.is_some() {
            TimerState::Active
        } else {
            TimerState::Idle
        }
    }

    pub fn is_timer_active(&self) -> bool {
        self.active.is_some()
    }

    /// Live elapsed ms as of the last tick, 0 when idle
    pub fn elapsed_time(&self) -> u64 {
        self.active.as_ref().map_or(0, |s| s.elapsed_ms)
    }

    pub fn current_subject_id(&self) -> Option<&SubjectId> {
        self.active.as_ref().map(|s| &s.subject_id)
    }

    pub fn active_session(&self) -> Option<&ActiveSession> {
        self.active.as_ref()
    }

    pub fn session_log(&self) -> &SessionLog {
        &self.log
    }

    pub fn into_log(self) -> SessionLog {
        self.log
    }

    pub fn total_study_time_for_day(&self, day: NaiveDate) -> u64 {
        self.log.total_for_day(day)
    }

    pub fn total_study_time_for_all_time(&self) -> u64 {
        self.log.total_all_time()
    }

    pub fn view(&self) -> TimerView {
        TimerView {
            state: self.state(),
            current_subject_id: self.current_subject_id().cloned(),
            started_at: self.active.as_ref().map(|s| s.started_at),
            elapsed_ms: self.elapsed_time(),
            logged_sessions: self.log.len(),
        }
    }

    fn cancel_schedule(&mut self) {
        if let Some(schedule) = self.schedule.take() {
            debug!(schedule = schedule.id, "tick schedule cancelled");
        }
    }
}
