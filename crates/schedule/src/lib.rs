//! On-call computation.
//!
//! All shift arithmetic is integer division on seconds since a
//! rotation's start, carried out in the schedule's IANA timezone.
//! Overrides always win over rotation results on their layer.

pub mod calculator;
pub mod error;
pub mod handoff;

pub use calculator::{
    LayerOncall, OncallShift, OncallSnapshot, ShiftSource, oncall_at, upcoming_shifts,
};
pub use error::ScheduleError;
pub use handoff::{HandoffSummary, acknowledge_handoff, handoff_summary};
