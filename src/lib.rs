//! Scope 2 emissions self-assessment service.
//!
//! The library exposes the assessment workflow (submission intake, admin
//! approval state machine, notification side effects, and certificate
//! rendering) so both the HTTP binary and the tests drive the same facade.

pub mod config;
pub mod error;
pub mod telemetry;
pub mod workflows;
