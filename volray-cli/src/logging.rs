//! Logging. And terminal progress bars. And their cooperation.

use std::sync::LazyLock;

use anyhow::Context as _;
use log::Log as _;

use volray::util::YieldProgress;

/// A [`clap::Args`] struct for options controlling log output to stderr.
#[derive(Clone, Debug, clap::Args)]
#[allow(clippy::module_name_repetitions)]
pub struct LoggingArgs {
    /// Additional logging to stderr.
    #[arg(long = "verbose", short = 'v')]
    pub verbose: bool,

    /// Remove timestamps from logs so that they are closer to deterministic.
    #[arg(long = "simplify-log-format", hide = true)]
    pub simplify_log_format: bool,
}

/// Install a [`log`] global logger based on user-provided `options`.
pub fn install(options: &LoggingArgs) -> Result<(), anyhow::Error> {
    use log::LevelFilter::{Error, Info, Off, Trace};

    let &LoggingArgs {
        verbose,
        simplify_log_format,
    } = options;

    let stderr_logger = *simplelog::WriteLogger::new(
        match verbose {
            false => Info,
            true => Trace,
        },
        // Note: This has no target filters because `VolrayLogger` calls
        // `util::log::standard_filter` to do it.
        simplelog::ConfigBuilder::new()
            .set_target_level(Off)
            .set_location_level(Off)
            .set_time_level(if simplify_log_format { Off } else { Error })
            .build(),
        std::io::stderr(),
    );
    let max_level = simplelog::SharedLogger::level(&stderr_logger);

    log::set_boxed_logger(Box::new(VolrayLogger { stderr_logger }))
        .context("failed to initialize logging")?;
    log::set_max_level(max_level);
    Ok(())
}

/// [`log::Log`] implementation that [`install()`] registers globally.
struct VolrayLogger {
    stderr_logger: simplelog::WriteLogger<std::io::Stderr>,
}

impl log::Log for VolrayLogger {
    fn enabled(&self, metadata: &log::Metadata<'_>) -> bool {
        volray::util::log::standard_filter(metadata) && self.stderr_logger.enabled(metadata)
    }

    fn log(&self, record: &log::Record<'_>) {
        if !volray::util::log::standard_filter(record.metadata()) {
            return;
        }
        suspend_indicatif_in(|| self.stderr_logger.log(record));
    }

    fn flush(&self) {
        suspend_indicatif_in(|| self.stderr_logger.flush())
    }
}

fn suspend_indicatif_in<R>(f: impl FnOnce() -> R) -> R {
    COOPERATIVE_PROGRESS.suspend(f)
}

static COOPERATIVE_PROGRESS: LazyLock<indicatif::MultiProgress> =
    LazyLock::new(indicatif::MultiProgress::new);

/// Constructs a percentage progress bar which cooperates with logging to share stderr
/// cleanly.
pub fn new_progress_bar(prefix: &'static str) -> indicatif::ProgressBar {
    let pb = indicatif::ProgressBar::new(100)
        .with_style(common_progress_style())
        .with_prefix(prefix);
    COOPERATIVE_PROGRESS.add(pb)
}

/// [`indicatif::ProgressStyle`] for progress bars we display.
pub fn common_progress_style() -> indicatif::ProgressStyle {
    #![allow(clippy::literal_string_with_formatting_args)]
    indicatif::ProgressStyle::default_bar()
        .template("{prefix:10} [{elapsed}] {wide_bar} {pos:>6}% {msg:36}")
        .unwrap_or_else(|_| indicatif::ProgressStyle::default_bar())
}

/// Returns a [`YieldProgress`] that reports to `bar` and yields to the Tokio scheduler.
pub fn yield_progress_for_bar(bar: &indicatif::ProgressBar) -> YieldProgress {
    let bar = bar.clone();
    yield_progress::Builder::new()
        .yield_using(|_| tokio::task::yield_now())
        .progress_using(move |info| {
            bar.set_position((info.fraction() * 100.0) as u64);
            bar.set_message(String::from(info.label_str()));
        })
        .build()
}
