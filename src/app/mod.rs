pub mod keyboard_input;

mod orchestrator;
mod renderer;
mod runtime;
mod types;


pub use orchestrator::FacewatchApp;
pub use renderer::{format_entry, EventRenderer};
pub use types::{Command, ShutdownReason};
