mod date_serde;
mod settings;
mod task;

pub use settings::{PaceType, Settings, WorkingDays};
pub use task::{Plan, Stats, Task};
