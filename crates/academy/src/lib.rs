//! Cohort scheduling, admissions, and assessment grading for multi-tier academic programs.
//!
//! Every operation takes the acting [`access::Actor`] explicitly; authentication happens
//! upstream and arrives here already resolved.

pub mod access;
pub mod assessments;
pub mod catalog;
pub mod clock;
pub mod cohorts;
pub mod config;
pub mod error;
pub mod ids;
pub mod notify;
pub mod services;
pub mod store;
pub mod telemetry;

pub use services::{program_router, ProgramServices};
