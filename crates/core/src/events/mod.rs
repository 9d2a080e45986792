//! Domain events module.
//!
//! The transaction write boundary emits events through a sink; the job queue
//! consumes them. Core recompute functions never depend on the sink.

mod domain_event;
mod sink;

pub use domain_event::*;
pub use sink::*;
