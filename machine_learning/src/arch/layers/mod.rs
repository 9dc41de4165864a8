mod conv1d;
mod dense;
mod pool;

pub use conv1d::Conv1d;
pub use dense::Dense;
pub use pool::GlobalAvgPool;
