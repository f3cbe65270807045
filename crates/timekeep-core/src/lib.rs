//! # Timekeep Core Library
//!
//! Notification scheduling for the Timekeep time tracker. Everything a host
//! app needs to keep local notifications in step with its data lives here;
//! the CLI and mobile shells are thin layers over the same library.
//!
//! ## Architecture
//!
//! - **Trigger Scheduler**: recomputes timer warnings, the inactivity
//!   reminder and routine-start reminders from settings and stores
//! - **Delivery Listener**: renews the inactivity reminder each time it fires
//! - **Ports**: settings, sessions, routines and the platform trigger store
//!   are injected traits with in-memory and SQLite adapters
//! - **Storage**: SQLite adapter and TOML-based configuration
//!
//! ## Key Components
//!
//! - [`SchedulerContext`]: composition root routing app events to the scheduler
//! - [`TriggerScheduler`]: the scheduling algorithms
//! - [`Database`]: SQLite implementation of every port
//! - [`Config`]: Application configuration management

pub mod context;
pub mod error;
pub mod events;
pub mod notify;
pub mod ports;
pub mod storage;
pub mod time;

pub use context::{Ports, SchedulerContext};
pub use error::{ConfigError, CoreError, DatabaseError, NotifyError, ValidationError};
pub use events::{DeliveryEvent, DeliveryOrigin};
pub use notify::{
    ChannelId, ChannelRegistry, DeliveryListener, InactivityOutcome, RoutineOutcome,
    ScheduledTrigger, SchedulerConfig, TimerWarningOutcome, TriggerScheduler,
};
pub use ports::{RoutineSchedule, RoutineType, RunningSession};
pub use storage::{Config, Database};
pub use time::{Clock, DayFilter, SystemClock, TimeOfDay};
