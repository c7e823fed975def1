//! Line-oriented command front end over a [`TimerHandle`].

use std::io::{BufRead, Write};
use std::path::PathBuf;

use crate::clock::Clock;
use crate::error::{Error, ParseError};
use crate::format::{format_duration, format_elapsed};
use crate::report::{ReportFormat, StudyReport};
use crate::service::TimerHandle;
use crate::session::SubjectId;

pub const HELP: &str = "\
commands:
  start <id>     start timing <id> (an active session is dropped unrecorded)
  stop           stop and record the active session
  reset          restart the active session from zero
  status         show the live timer
  today          total study time today
  total          total study time overall
  log            list recorded sessions
  report [path]  print a summary, or write a report to path
  help           show this help
  quit           exit";

#[derive(Debug, Clone, PartialEq)]
pub enum ReplCommand {
    Start(SubjectId),
    Stop,
    Reset,
    Status,
    Today,
    Total,
    Log,
    Report(Option<PathBuf>),
    Help,
    Quit,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Flow {
    Continue,
    Quit,
}

pub fn parse_line(line: &str) -> Result<ReplCommand, ParseError> {
    let line = line.trim();
    let (word, rest) = match line.split_once(char::is_whitespace) {
        Some((word, rest)) => (word, rest.trim()),
        None => (line, ""),
    };

    let no_arg = |cmd: ReplCommand| {
        if rest.is_empty() {
            Ok(cmd)
        } else {
            Err(ParseError::UnexpectedArgument {
                command: word.to_string(),
                argument: rest.to_string(),
            })
        }
    };

    match word.to_ascii_lowercase().as_str() {
        "" => Err(ParseError::Empty),
        "start" => {
            if rest.is_empty() {
                Err(ParseError::MissingSubject(word.to_string()))
            } else {
                Ok(ReplCommand::Start(SubjectId::from(rest)))
            }
        }
        "stop" => no_arg(ReplCommand::Stop),
        "reset" => no_arg(ReplCommand::Reset),
        "status" => no_arg(ReplCommand::Status),
        "today" => no_arg(ReplCommand::Today),
        "total" => no_arg(ReplCommand::Total),
        "log" => no_arg(ReplCommand::Log),
        "report" => Ok(ReplCommand::Report(
            (!rest.is_empty()).then(|| PathBuf::from(rest)),
        )),
        "help" | "?" => no_arg(ReplCommand::Help),
        "quit" | "exit" => no_arg(ReplCommand::Quit),
        _ => Err(ParseError::Unknown(word.to_string())),
    }
}

/// Executes commands against a running timer
pub struct Repl<C: Clock> {
    handle: TimerHandle,
    clock: C,
    report_format: ReportFormat,
}

impl<C: Clock> Repl<C> {
    pub fn new(handle: TimerHandle, clock: C, report_format: ReportFormat) -> Self {
        Self {
            handle,
            clock,
            report_format,
        }
    }

    pub fn execute<W: Write>(&self, cmd: ReplCommand, out: &mut W) -> Result<Flow, Error> {
        match cmd {
            ReplCommand::Start(subject) => {
                self.handle.start_timer(subject.clone())?;
                writeln!(out, "started {subject}")?;
            }
            ReplCommand::Stop => {
                match self.handle.stop_session()? {
                    Some(entry) => writeln!(
                        out,
                        "stopped {} after {}",
                        entry.subject_id,
                        format_elapsed(entry.elapsed_ms)
                    )?,
                    None => writeln!(out, "no active session")?,
                }
            }
            ReplCommand::Reset => {
                self.handle.reset_timer()?;
                writeln!(out, "reset")?;
            }
            ReplCommand::Status => {
                let view = self.handle.view();
                match view.current_subject_id {
                    Some(subject) => writeln!(
                        out,
                        "{subject} {} ({} logged)",
                        format_elapsed(view.elapsed_ms),
                        view.logged_sessions
                    )?,
                    None => writeln!(out, "idle ({} logged)", view.logged_sessions)?,
                }
            }
            ReplCommand::Today => {
                let today = self.clock.now().date_naive();
                let total = self.handle.total_study_time_for_day(today)?;
                writeln!(out, "today {}", format_duration(total))?;
            }
            ReplCommand::Total => {
                let total = self.handle.total_study_time_for_all_time()?;
                writeln!(out, "total {}", format_duration(total))?;
            }
            ReplCommand::Log => {
                let entries = self.handle.session_log()?;
                if entries.is_empty() {
                    writeln!(out, "no sessions recorded")?;
                }
                for entry in entries {
                    writeln!(
                        out,
                        "{} {} {}",
                        entry.started_at.format("%Y-%m-%d %H:%M:%S"),
                        entry.subject_id,
                        format_elapsed(entry.elapsed_ms)
                    )?;
                }
            }
            ReplCommand::Report(path) => {
                let report = StudyReport::from_entries(&self.handle.session_log()?);
                match path {
                    Some(path) => {
                        report.save(self.report_format, &path)?;
                        writeln!(out, "report written to {}", path.display())?;
                    }
                    None => writeln!(out, "{}", report.summary())?,
                }
            }
            ReplCommand::Help => writeln!(out, "{HELP}")?,
            ReplCommand::Quit => return Ok(Flow::Quit),
        }
        Ok(Flow::Continue)
    }

    /// Reads commands until EOF or `quit`. Parse errors are reported and
    /// skipped.
    pub fn run<R: BufRead, W: Write>(&self, input: R, out: &mut W) -> Result<(), Error> {
        for line in input.lines() {
            let line = line?;
            if line.trim().is_empty() {
                continue;
            }
            match parse_line(&line) {
                Ok(cmd) => {
                    if self.execute(cmd, out)? == Flow::Quit {
                        break;
                    }
                }
                Err(err) => writeln!(out, "error: {err}")?,
            }
            out.flush()?;
        }
        Ok(())
    }
}
