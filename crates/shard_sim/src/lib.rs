//! # shard_sim
//!
//! The simulation core of a shard. Everything that happens over time lives
//! here: units travelling, buildings under construction, mines extracting
//! and combat ticking, all driven by an injectable [`Clock`].
//!
//! ## Module map
//!
//! - [`clock`]: wall and synthetic clocks.
//! - [`timer`]: repeating background timers that survive failing ticks.
//! - [`registry`]: the user aggregates and the unit/building owner indexes.
//! - [`schedule`]: pending travel and construction completions, and running
//!   extraction timers, keyed by entity.
//! - [`travel`], [`construction`], [`extraction`], [`combat`]: the state
//!   machines and periodic processes.
//! - [`config`]: shard configuration.
//! - [`requests`]: command payloads and views.
//! - [`service`]: the command entry point used by the controller layer.

pub mod clock;
pub mod combat;
pub mod config;
pub mod construction;
pub mod extraction;
pub mod registry;
pub mod requests;
pub mod schedule;
pub mod service;
pub mod timer;
pub mod travel;
pub mod world;

pub use clock::{Clock, ManualClock, SystemClock};
pub use config::{ConfigError, SHARD_CONFIG_ENV, ShardConfig, Timings};
pub use registry::Registry;
pub use requests::{BuildingRequest, Caller, UnitLocation, UnitRequest, UnitUpdate, UserRequest};
pub use schedule::{Completion, Outcome, Schedule};
pub use service::ShardService;
pub use timer::{Tick, TimerHandle, spawn_repeating};
pub use world::World;
