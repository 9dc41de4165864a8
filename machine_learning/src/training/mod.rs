mod builder;
mod config;
mod phase;
mod trainer;
mod window;

pub use builder::{TrainerBuilder, configure_optimizers};
pub use config::TrainerConfig;
pub use phase::Phase;
pub use trainer::{PassStats, StepReport, TestSummary, WindowedTrainer};
pub use window::{Window, WindowPlan, WindowTail, window_labels};
