use chrono::{DateTime, Local};
use clap::Parser;
use std::{
    error::Error,
    io::{self, stdin},
    path::PathBuf,
};
use studyclock::{
    app_dirs::AppDirs,
    config::{Config, ConfigStore, FileConfigStore},
    repl::Repl,
    report::{ReportFormat, StudyReport},
    runtime::FixedTicker,
    Clock, StudyTimer, SystemClock, TimerService,
};
use tracing_subscriber::EnvFilter;

/// per-question study timer with a session log and report export
#[derive(Parser, Debug, Clone)]
#[clap(
    version,
    about,
    long_about = "Times study sessions per question. Commands are read line by line from stdin (type 'help'). Starting a new session while one is running drops the running one without recording it."
)]
pub struct Cli {
    /// config file to use instead of the default location
    #[clap(short = 'c', long)]
    config: Option<PathBuf>,

    /// live refresh period in milliseconds
    #[clap(short = 't', long)]
    tick_ms: Option<u64>,

    /// keep at most this many sessions in the log (oldest dropped first)
    #[clap(short = 'm', long)]
    max_log_entries: Option<usize>,

    /// format for written reports
    #[clap(short = 'f', long, value_enum)]
    format: Option<ReportFormat>,

    /// write a report of the whole session log here on exit
    #[clap(short = 'o', long)]
    out: Option<PathBuf>,

    /// write a dated report on exit to the configured report dir (or the default state dir)
    #[clap(short = 'r', long)]
    save_report: bool,

    /// write the effective settings back to the config file
    #[clap(long)]
    save_config: bool,

    /// verbose logging to stderr
    #[clap(short = 'd', long)]
    debug: bool,
}

impl Cli {
    /// CLI flags take precedence over the stored config
    fn apply_to(&self, mut cfg: Config) -> Config {
        if let Some(tick_ms) = self.tick_ms {
            cfg.tick_interval_ms = tick_ms;
        }
        if let Some(max) = self.max_log_entries {
            cfg.max_log_entries = Some(max);
        }
        if let Some(format) = self.format {
            cfg.report_format = format;
        }
        cfg
    }

    fn config_store(&self) -> FileConfigStore {
        match &self.config {
            Some(path) => FileConfigStore::with_path(path),
            None => FileConfigStore::new(),
        }
    }
}

fn init_tracing(debug: bool) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        if debug {
            EnvFilter::new("debug")
        } else {
            EnvFilter::new("warn")
        }
    });
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(io::stderr)
        .init();
}

fn main() -> Result<(), Box<dyn Error>> {
    let cli = Cli::parse();
    init_tracing(cli.debug);

    let store = cli.config_store();
    let cfg = cli.apply_to(store.load());
    cfg.validate()?;
    if cli.save_config {
        store.save(&cfg)?;
    }

    let clock = SystemClock;
    let timer =
        StudyTimer::with_log(clock, cfg.new_log()).with_tick_period(cfg.tick_interval());
    let service = TimerService::spawn(timer, FixedTicker::new(cfg.tick_interval()));

    let repl = Repl::new(service.handle(), clock, cfg.report_format);
    let mut stdout = io::stdout().lock();
    repl.run(stdin().lock(), &mut stdout)?;
    drop(repl);

    let log = service.shutdown()?;
    if let Some(out) = report_path(&cli, &cfg, clock.now()) {
        StudyReport::from_entries(&log.entries()).save(cfg.report_format, &out)?;
    }

    Ok(())
}

/// `--out` wins; otherwise a dated file when a report dir is configured or
/// `--save-report` is given. The file name is stamped with `now`.
fn report_path(cli: &Cli, cfg: &Config, now: DateTime<Local>) -> Option<PathBuf> {
    if let Some(out) = &cli.out {
        return Some(out.clone());
    }
    let dir = match &cfg.report_dir {
        Some(dir) => dir.clone(),
        None if cli.save_report => AppDirs::report_dir()?,
        None => return None,
    };
    let name = format!(
        "study-{}.{}",
        now.format("%Y%m%d-%H%M%S"),
        cfg.report_format.extension()
    );
    Some(dir.join(name))
}
