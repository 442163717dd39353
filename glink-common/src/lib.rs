//! # GuardianLink Common Library
//!
//! Shared core for the GuardianLink mentor/student/parent progress tracker:
//! - Domain records (students, notes, tasks, meetings, notifications)
//! - Risk classification and transition evaluation
//! - Note visibility rules
//! - Meeting lifecycle state machine
//! - Notification fan-out policy
//! - Domain event types (DomainEvent enum) and EventBus
//!
//! The document store, identity provider and UI are external collaborators;
//! this crate hands them plain data and decisions.

pub mod config;
pub mod error;
pub mod events;
pub mod meetings;
pub mod model;
pub mod notes;
pub mod notify;
pub mod risk;

pub use error::{Error, Result};
pub use model::Role;
