//! The television model: observed state, input navigation, power sequencing and
//! the reconciliation poller.

mod hooks;
mod planner;
mod poller;
mod sequencer;
mod state;

pub use hooks::AccessoryHooks;
pub use planner::InputDescriptor;
pub use planner::InputType;
pub use planner::KeyAction;
pub use planner::MAX_CURSOR_STEPS;
pub use planner::NavigationPlan;
pub use planner::plan;
pub use poller::Poller;
pub use poller::PollerHandle;
pub use sequencer::Television;
pub use state::DeviceState;
pub use state::PowerPhase;
pub use state::Snapshot;
pub use state::StateObserver;
pub use state::WatchPublisher;
