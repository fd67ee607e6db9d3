//! Background jobs for the Switchboard API.

pub mod sweeper;

pub use sweeper::{sweeper_task, SweeperConfig, SweeperMetrics, SweeperSnapshot};
