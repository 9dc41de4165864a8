mod bce;
mod loss_fn;

pub use bce::BceWithLogits;
pub use loss_fn::LossFn;
