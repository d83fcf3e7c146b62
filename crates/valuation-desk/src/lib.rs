//! Valuation Desk reconciles bank-property valuation submissions pulled from
//! three independently stored form families into one consistent working set,
//! and enforces the review workflow (submitter -> manager/admin review ->
//! approval, rejection, or rework) on top of it.

pub mod config;
pub mod error;
pub mod telemetry;
pub mod workflows;
