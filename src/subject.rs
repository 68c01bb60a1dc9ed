//! Subjects: observers that are also observables.
//!
//! - [`Subject`]: multicasts every notification to the observers registered
//!   at the moment of dispatch.
//! - [`BehaviorSubject`]: additionally caches the latest value and replays it
//!   to new subscribers.

mod behavior_subject;
mod snapshot;
mod subject_core;

pub use behavior_subject::BehaviorSubject;
pub(crate) use snapshot::Snapshot;
pub use subject_core::Subject;
