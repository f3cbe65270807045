//! Local notification scheduling.
//!
//! - [`TriggerScheduler`]: computes and (re)installs every future notification
//! - [`DeliveryListener`]: renews the inactivity reminder after delivery
//! - [`ChannelRegistry`]: one-time delivery channel setup
//! - [`memory`]: in-memory adapters for every port

mod channels;
mod keys;
mod listener;
pub mod memory;
mod routine;
mod scheduler;
pub mod settings;
mod timer_warning;
mod trigger;

pub use channels::{ChannelId, ChannelRegistry, ChannelSpec, Importance};
pub use keys::{is_routine_key, TriggerKey, INACTIVITY_KEY, ROUTINE_KEY_PREFIX};
pub use listener::{DeliveryListener, ListenerAction};
pub use routine::{collapse_schedules, CollapsedRoutine};
pub use scheduler::{
    InactivityHalt, InactivityOutcome, InactivityState, RoutineHalt, RoutineOutcome,
    SchedulerConfig, TimerWarningOutcome, TriggerScheduler,
};
pub use timer_warning::TimerWarningSet;
pub use trigger::{Repeat, ScheduledTrigger};
