//! Action dispatch for classified calls
//!
//! Turns a frozen classification into telephony actions:
//! - `EventBus` carries control and hangup events on separate queues
//! - `ActionDispatcher` maps each classification to its action
//! - `ControlExecutor` actuates navigation requests against telephony
//! - `CallTerminationCoordinator` is the single consumer of hangup events

pub mod bus;
pub mod dispatcher;
pub mod termination;

pub use bus::{ControlExecutor, EventBus, EventBusReceivers};
pub use dispatcher::ActionDispatcher;
pub use termination::CallTerminationCoordinator;
