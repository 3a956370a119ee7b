//! Generic logger utility functions

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

// External imports
use log::{self, info};
use colored::{ColoredString, Colorize};
use thiserror::Error;

// Internal imports
use crate::session;

// Re-exports
pub use log::LevelFilter;

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// Limits how often a repeating condition is allowed to produce a log message.
///
/// Time is supplied by the caller so that the throttle follows the control
/// loop's clock rather than the wall clock. The first event always passes.
#[derive(Debug, Clone, Copy)]
pub struct Throttle {
    /// Minimum time between two accepted events.
    ///
    /// Units: seconds
    period_s: f64,

    /// Time at which the last event was accepted.
    last_s: Option<f64>
}

// ---------------------------------------------------------------------------
// ENUMERATIONS
// ---------------------------------------------------------------------------

/// Errors associated with initialising the logger.
#[derive(Debug, Error)]
pub enum LoggerInitError {
    #[error("Expected a log level less than `INFO`, found `{0}`")]
    InvalidMinLogLevel(log::LevelFilter),

    #[error("Error initialising the log file: {0}")]
    LogFileInitError(std::io::Error),

    #[error("An error occured while setting up the logger: {0}")]
    FernInitError(log::SetLoggerError)
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl Throttle {
    /// Create a new throttle which accepts at most one event per `period_s`.
    pub fn new(period_s: f64) -> Self {
        Self {
            period_s,
            last_s: None
        }
    }

    /// Returns `true` if an event happening at `now_s` should be reported,
    /// and if so records it as the last reported event.
    pub fn ready(&mut self, now_s: f64) -> bool {
        let ready = match self.last_s {
            Some(last) => now_s > last + self.period_s,
            None => true
        };

        if ready {
            self.last_s = Some(now_s);
        }

        ready
    }
}

// ---------------------------------------------------------------------------
// PUBLIC FUNCTIONS
// ---------------------------------------------------------------------------

/// Initialise the logger for this execution.
/// 
/// # Notes
/// 
/// - `min_level` must be greater than `log::Level::Info`.
/// 
/// # Safety
/// 
/// - This function must only be called once to prevent corrupting logs.
pub fn logger_init(
    min_level: self::LevelFilter, 
    session: &session::Session
) -> Result<(), LoggerInitError> {

    if min_level < log::Level::Info {
        return Err(LoggerInitError::InvalidMinLogLevel(min_level))
    }

    // Setup the logger using fern's builder pattern
    fern::Dispatch::new()
        .format(|out, message, record| {

            // If debug or trace include the target, otherwise don't include it
            if record.level() > log::Level::Info {
                out.finish(format_args!(
                    "[{:10.6} {}] {}: {}",
                    session::get_elapsed_seconds(),
                    level_to_str(record.level()),
                    record.target(),
                    message
                ))
            }
            else {
                out.finish(format_args!(
                    "[{:10.6} {}] {}",
                    session::get_elapsed_seconds(),
                    level_to_str(record.level()),
                    message
                ))
            }

        })
        .level(min_level)
        .level_for("zmq", LevelFilter::Info)
        .chain(std::io::stdout())
        .chain(
            fern::log_file(session.log_file_path.clone())
                .map_err(LoggerInitError::LogFileInitError)?
        )
        .apply()
        .map_err(LoggerInitError::FernInitError)?;
    
    info!("Logging initialised");
    info!("    Session epoch: {}", session::get_epoch());
    info!("    Log level: {:?}", min_level);
    info!("    Log file path: {:?}", session.log_file_path);

    Ok(())
}

// ---------------------------------------------------------------------------
// PRIVATE FUNCTIONS
// ---------------------------------------------------------------------------

/// Get the string representation of a log level
fn level_to_str(level: log::Level) -> ColoredString {
    match level {
        log::Level::Trace => "TRC".dimmed().italic(),
        log::Level::Debug => "DBG".dimmed(),
        log::Level::Info  => "INF".normal(),
        log::Level::Warn  => "WRN".yellow(),
        log::Level::Error => "ERR".red().bold()
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_throttle_first_event_passes() {
        let mut throttle = Throttle::new(5.0);

        assert!(throttle.ready(0.0));
        assert!(!throttle.ready(0.01));
    }

    #[test]
    fn test_throttle_period_boundary() {
        let mut throttle = Throttle::new(5.0);

        // Exactly one period later is still inside the window
        assert!(throttle.ready(0.0));
        assert!(!throttle.ready(5.0));
        assert!(throttle.ready(5.25));
        assert!(!throttle.ready(10.25));
    }

    #[test]
    fn test_throttle_continuous_events() {
        let mut throttle = Throttle::new(5.0);

        // An event every 250 ms for 12 s is reported at 0, 5.25 and 10.5 s.
        let mut reported = vec![];
        for i in 0..48 {
            let t = i as f64 * 0.25;
            if throttle.ready(t) {
                reported.push(i);
            }
        }

        assert_eq!(reported, vec![0, 21, 42]);
    }
}
