// Library surface for the CLI, integration tests and embedding.
pub mod app_dirs;
pub mod clock;
pub mod config;
pub mod error;
pub mod format;
pub mod repl;
pub mod report;
pub mod runtime;
pub mod service;
pub mod session;
pub mod timer;

pub use clock::{Clock, ManualClock, SystemClock};
pub use error::{Error, ServiceError};
pub use service::{TimerHandle, TimerService};
pub use session::{SessionEntry, SessionLog, SubjectId};
pub use timer::{StudyTimer, TimerState, TimerView, TICK_INTERVAL};
