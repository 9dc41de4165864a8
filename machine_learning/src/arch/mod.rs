pub mod activations;
mod cnn;
pub mod layers;
pub mod loss;
mod model;

pub use cnn::{ActFnSpec, CnnConfig, ConvSpec, SeizureCnn};
pub use model::{Model, ModelOutput, ParamGroup};
