//! Timeline - step-indexed scripted events
//!
//! Each level can carry a script: an ordered mapping from (possibly
//! fractional) step numbers to queues of command lines. The interpreter
//! advances a cursor by the frame's delta and executes everything due,
//! driving cutscenes, conditional logic, and loops without ever blocking
//! the frame loop.

pub mod command;
pub mod expr;
mod interp;
mod program;

pub use command::{Command, parse_line};
pub use expr::Value;
pub use interp::CommandHost;
pub use program::{ScriptStep, Step, Timeline, TimelineScript};
