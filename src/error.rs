// src/error.rs
//
// Error taxonomy for the detection engine. Three categories with
// different handling policies:
//   - ParseError:  one bad record; skip it, log, keep the cycle going.
//   - StoreError:  backing store trouble; abort the current cycle,
//                  retry on the next tick.
//   - NotifyError: best-effort alerting; logged and swallowed, never
//                  rolls back a persisted violation.

use thiserror::Error;

#[derive(Debug, Clone, Error)]
pub enum ParseError {
    #[error("malformed timestamp {0:?}")]
    Timestamp(String),

    #[error("malformed coordinate {0:?}")]
    Coordinate(String),
}

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("store unreachable: {0}")]
    Unreachable(String),

    #[error("store rejected request: {0}")]
    Rejected(String),

    #[error("violation id space exhausted after {attempts} attempts")]
    IdSpaceExhausted { attempts: u32 },
}

#[derive(Debug, Error)]
#[error("notification failed: {0}")]
pub struct NotifyError(pub String);
