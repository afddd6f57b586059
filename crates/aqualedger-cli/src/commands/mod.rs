pub mod add;
pub mod common;
pub mod completions;
pub mod list;
pub mod log;
pub mod queue;
pub mod show;
pub mod status;
pub mod sync;
pub mod transition;
