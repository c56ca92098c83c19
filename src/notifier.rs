//! Logging and progress output for a run.
//!
//! [`Notifier`] puts `env_logger` (text logs) and `indicatif` (spinner/bars)
//! behind one verbosity switch:
//! - [`VerbosityLevel::Quiet`]: warnings only, a live spinner for status and
//!   progress bars for long steps (reading layers, warming views).
//! - [`VerbosityLevel::Info`]/[`VerbosityLevel::Debug`]/[`VerbosityLevel::Trace`]:
//!   plain log lines, no bars.
//!
//! Library code logs through the `log` macros; [`Notifier::init_logging`]
//! installs the global logger at the matching level.

use env_logger::Env;
use indicatif::{MultiProgress, ProgressBar, ProgressStyle};
use log::{debug, info, warn, LevelFilter};
use std::cell::RefCell;
use std::time::Duration;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VerbosityLevel {
    Quiet = 0,
    Info = 1,
    Debug = 2,
    Trace = 3,
}

impl From<u8> for VerbosityLevel {
    fn from(level: u8) -> Self {
        match level {
            0 => VerbosityLevel::Quiet,
            1 => VerbosityLevel::Info,
            2 => VerbosityLevel::Debug,
            _ => VerbosityLevel::Trace,
        }
    }
}

impl VerbosityLevel {
    pub fn log_filter(self) -> LevelFilter {
        match self {
            VerbosityLevel::Quiet => LevelFilter::Warn,
            VerbosityLevel::Info => LevelFilter::Info,
            VerbosityLevel::Debug => LevelFilter::Debug,
            VerbosityLevel::Trace => LevelFilter::Trace,
        }
    }
}

pub struct Notifier {
    verbosity: VerbosityLevel,
    multi_progress: Option<MultiProgress>,
    spinner: RefCell<Option<ProgressBar>>,
}

impl Notifier {
    pub fn new(verbosity_level: u8) -> Self {
        let verbosity = VerbosityLevel::from(verbosity_level);
        let multi_progress = (verbosity == VerbosityLevel::Quiet).then(MultiProgress::new);

        Self {
            verbosity,
            multi_progress,
            spinner: RefCell::new(None),
        }
    }

    /// A notifier that never draws, for tests and library callers.
    pub fn silent() -> Self {
        Self {
            verbosity: VerbosityLevel::Info,
            multi_progress: None,
            spinner: RefCell::new(None),
        }
    }

    /// Installs the global logger. Later calls are ignored.
    pub fn init_logging(&self) {
        let _ = env_logger::Builder::from_env(Env::default())
            .filter_level(self.verbosity.log_filter())
            .try_init();
    }

    pub fn use_progress_bars(&self) -> bool {
        self.multi_progress.is_some()
    }

    /// Status line: spinner message in quiet mode, info log otherwise.
    pub fn info(&self, message: &str) {
        let Some(multi_progress) = &self.multi_progress else {
            info!("{}", message);
            return;
        };

        let mut spinner = self.spinner.borrow_mut();
        let spinner = spinner.get_or_insert_with(|| {
            let bar = multi_progress.add(ProgressBar::new_spinner());
            if let Ok(style) = ProgressStyle::default_spinner().template("{spinner:.green} {msg}") {
                bar.set_style(style);
            }
            bar.enable_steady_tick(Duration::from_millis(100));
            bar
        });
        spinner.set_message(message.to_string());
    }

    pub fn debug(&self, message: &str) {
        debug!("{}", message);
    }

    pub fn warn(&self, message: &str) {
        warn!("{}", message);
    }

    /// Prints a line of program output without tearing the progress display.
    pub fn println(&self, message: impl AsRef<str>) {
        match &self.multi_progress {
            Some(multi_progress) => {
                if multi_progress.println(message.as_ref()).is_err() {
                    println!("{}", message.as_ref());
                }
            }
            None => println!("{}", message.as_ref()),
        }
    }

    /// A bar for `length` steps in quiet mode; `None` when logging instead.
    pub fn progress_bar(&self, length: u64, message: &str) -> Option<ProgressBar> {
        let multi_progress = self.multi_progress.as_ref()?;
        let bar = multi_progress.add(ProgressBar::new(length));
        if let Ok(style) = ProgressStyle::default_bar()
            .template("{spinner:.green} [{elapsed_precise}] {bar:40.cyan/blue} {pos:>7}/{len:7} {msg}")
        {
            bar.set_style(style.progress_chars("=> "));
        }
        bar.set_message(message.to_string());
        Some(bar)
    }

    /// Step counter for the logging modes.
    pub fn progress(&self, current: u64, total: u64, message: &str) {
        if self.multi_progress.is_none() && (current % 100 == 0 || current == total) {
            info!("{}: {}/{}", message, current, total);
        }
    }

    /// Clears the spinner once a run is over.
    pub fn finish(&self) {
        if let Some(spinner) = self.spinner.borrow_mut().take() {
            spinner.finish_and_clear();
        }
    }
}
