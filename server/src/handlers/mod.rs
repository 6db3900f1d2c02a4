//! Request handlers for signal ingress and replays.

mod replay;
mod signal;

pub use replay::*;
pub use signal::*;
