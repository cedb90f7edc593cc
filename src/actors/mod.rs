pub mod refresh_supervisor;

pub use refresh_supervisor::{RefreshStats, RefreshSupervisor, RefreshSupervisorArgs, RefreshSupervisorMessage};
