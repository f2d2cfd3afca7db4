mod loop_controller;
mod state;
#[cfg(test)]
mod tests;

pub use loop_controller::{LoopController, LoopControllerBuilder};
pub use state::{
    LoopSnapshot, RunState, STATUS_RECOGNIZING, STATUS_SERVICE_UNREACHABLE, STATUS_STOPPED,
    STATUS_WAITING,
};
