//! Mission lifecycle: the outer orchestration loop around QA sessions.

pub mod finalize;
pub mod record;
pub mod runner;

pub use finalize::{
    NullReflections, ReflectionSource, build_debrief, collect_reflections, compute_awards,
};
pub use record::{
    Award, Mission, MissionEvent, MissionEventKind, MissionRecord, MissionState, MissionStatus,
    Reflection,
};
pub use runner::{MissionCancel, MissionRunner};
