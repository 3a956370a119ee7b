//! Telemetry sinks for steering records
//!
//! Publication is best effort. A sink which can't deliver a record returns an
//! error, which lateral control logs and otherwise ignores.

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

// Internal
use comms_if::tm::SteerRecord;

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// A sink which discards every record.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullSink;

/// A sink which keeps every record in memory.
#[derive(Debug, Default, Clone)]
pub struct RecordingSink {
    pub records: Vec<SteerRecord>,
}

// ---------------------------------------------------------------------------
// ENUMERATIONS
// ---------------------------------------------------------------------------

#[derive(Debug, thiserror::Error)]
pub enum TelemetryError {
    #[error("The record was dropped: {0}")]
    Dropped(String),
}

// ---------------------------------------------------------------------------
// TRAITS
// ---------------------------------------------------------------------------

/// Destination for steering records.
///
/// Implementations must not block the control cycle.
pub trait TelemetrySink {
    fn publish(&mut self, record: &SteerRecord) -> Result<(), TelemetryError>;
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl TelemetrySink for NullSink {
    fn publish(&mut self, _record: &SteerRecord) -> Result<(), TelemetryError> {
        Ok(())
    }
}

impl TelemetrySink for RecordingSink {
    fn publish(&mut self, record: &SteerRecord) -> Result<(), TelemetryError> {
        self.records.push(*record);
        Ok(())
    }
}

impl<T: TelemetrySink + ?Sized> TelemetrySink for Box<T> {
    fn publish(&mut self, record: &SteerRecord) -> Result<(), TelemetryError> {
        (**self).publish(record)
    }
}

impl<T: TelemetrySink> TelemetrySink for Option<T> {
    fn publish(&mut self, record: &SteerRecord) -> Result<(), TelemetryError> {
        match self {
            Some(s) => s.publish(record),
            None => Ok(())
        }
    }
}
