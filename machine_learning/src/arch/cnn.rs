use std::mem;

use ndarray::{Array1, Array3, ArrayView1, ArrayView3, Axis};
use ndarray_rand::RandomExt;
use rand::Rng;
use rand_distr::Normal;
use serde::{Deserialize, Serialize};

use super::{
    Model, ModelOutput, ParamGroup,
    activations::ActFn,
    layers::{Conv1d, Dense, GlobalAvgPool},
};
use crate::{MlErr, Result};

/// The activation applied after a convolution.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActFnSpec {
    #[default]
    Relu,
    Sigmoid,
}

/// One convolutional block of the network.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConvSpec {
    pub filters: usize,
    pub kernel: usize,
    #[serde(default)]
    pub act_fn: ActFnSpec,
}

impl ConvSpec {
    pub fn new(filters: usize, kernel: usize) -> Self {
        Self {
            filters,
            kernel,
            act_fn: ActFnSpec::default(),
        }
    }
}

/// The shape of a `SeizureCnn`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CnnConfig {
    pub in_channels: usize,
    pub convs: Vec<ConvSpec>,
}

impl CnnConfig {
    /// Checks that the network can be built.
    pub fn validate(&self) -> Result<()> {
        if self.in_channels == 0 {
            return Err(MlErr::InvalidInput("the model needs at least one input channel"));
        }

        if self.convs.is_empty() {
            return Err(MlErr::InvalidInput(
                "the model needs at least one convolutional layer",
            ));
        }

        if self.convs.iter().any(|c| c.filters == 0 || c.kernel == 0) {
            return Err(MlErr::InvalidInput(
                "convolutions need at least one filter and a non empty kernel",
            ));
        }

        Ok(())
    }

    /// Returns the minimum window length, in samples, the network accepts.
    pub fn receptive_field(&self) -> usize {
        self.convs.iter().map(|c| c.kernel - 1).sum::<usize>() + 1
    }
}

/// A small 1-D convolutional seizure classifier.
///
/// `conv -> ... -> conv -> global average pool -> dense`, with a single logit per window.
/// The output of the last convolution is handed back as the auxiliary feature map.
#[derive(Debug, Clone)]
pub struct SeizureCnn {
    convs: Vec<Conv1d>,
    pool: GlobalAvgPool,
    head: Dense,
}

impl SeizureCnn {
    /// Creates a new `SeizureCnn`.
    ///
    /// # Arguments
    /// * `config` - The shape of the network.
    ///
    /// # Returns
    /// A new `SeizureCnn` or an error if the config is invalid.
    pub fn new(config: &CnnConfig) -> Result<Self> {
        config.validate()?;

        let mut in_channels = config.in_channels;
        let mut convs = Vec::with_capacity(config.convs.len());

        for spec in &config.convs {
            let act_fn = match spec.act_fn {
                ActFnSpec::Relu => ActFn::relu(),
                ActFnSpec::Sigmoid => ActFn::sigmoid(1.),
            };

            convs.push(Conv1d::new(in_channels, spec.filters, spec.kernel, Some(act_fn)));
            in_channels = spec.filters;
        }

        Ok(Self {
            convs,
            pool: GlobalAvgPool::new(),
            head: Dense::new((in_channels, 1)),
        })
    }

    /// Draws a fresh set of parameters.
    ///
    /// Convolution weights follow a Kaiming normal distribution, the head follows LeCun's, and
    /// every bias starts at zero.
    ///
    /// # Arguments
    /// * `rng` - A random number generator.
    ///
    /// # Returns
    /// A flat parameter buffer of length `size()`.
    pub fn init_params<R: Rng + ?Sized>(&self, rng: &mut R) -> Result<Vec<f32>> {
        let mut params = Vec::with_capacity(self.size());

        for conv in &self.convs {
            let fan_in = conv.in_channels() * conv.kernel();
            let std_dev = (2. / fan_in as f32).sqrt();
            push_normal(&mut params, conv.weight_size(), std_dev, rng)?;
            params.extend(std::iter::repeat_n(0., conv.out_channels()));
        }

        let (fan_in, outputs) = self.head.dim();
        push_normal(&mut params, self.head.weight_size(), (1. / fan_in as f32).sqrt(), rng)?;
        params.extend(std::iter::repeat_n(0., outputs));

        Ok(params)
    }
}

fn push_normal<R: Rng + ?Sized>(
    params: &mut Vec<f32>,
    n: usize,
    std_dev: f32,
    rng: &mut R,
) -> Result<()> {
    let normal = Normal::new(0., std_dev)
        .map_err(|_| MlErr::InvalidInput("the initialization deviation is not finite"))?;

    params.extend(Array1::<f32>::random_using(n, normal, rng));
    Ok(())
}

impl Model for SeizureCnn {
    fn size(&self) -> usize {
        self.convs.iter().map(Conv1d::size).sum::<usize>() + self.head.size()
    }

    fn param_groups(&self) -> Vec<ParamGroup> {
        let mut groups = Vec::with_capacity(2 * self.convs.len() + 2);

        for (i, conv) in self.convs.iter().enumerate() {
            groups.push(ParamGroup::new(format!("convs.{i}.weight"), conv.weight_size()));
            groups.push(ParamGroup::new(format!("convs.{i}.bias"), conv.out_channels()));
        }

        groups.push(ParamGroup::new("head.weight", self.head.weight_size()));
        groups.push(ParamGroup::new("head.bias", self.head.dim().1));
        groups
    }

    fn forward(&mut self, params: &[f32], x: ArrayView3<f32>) -> Result<ModelOutput> {
        if params.len() != self.size() {
            return Err(MlErr::SizeMismatch {
                what: "model params",
                got: params.len(),
                expected: self.size(),
            });
        }

        let mut rest = params;
        let mut maps: Option<Array3<f32>> = None;

        for conv in &mut self.convs {
            let (layer_params, tail) = rest.split_at(conv.size());
            rest = tail;

            let input = maps.as_ref().map_or(x, |m| m.view());
            let output = conv.forward(layer_params, input)?;
            maps = Some(output);
        }

        let maps = maps.ok_or(MlErr::InvalidInput(
            "the model needs at least one convolutional layer",
        ))?;

        let pooled = self.pool.forward(maps.view())?;
        let logits = self.head.forward(rest, pooled.view())?;

        Ok(ModelOutput { logits, maps })
    }

    fn backward(
        &mut self,
        params: &[f32],
        grad: &mut [f32],
        d_logits: ArrayView1<f32>,
    ) -> Result<()> {
        let size = self.size();

        if params.len() != size || grad.len() != size {
            return Err(MlErr::SizeMismatch {
                what: "model grad",
                got: grad.len().min(params.len()),
                expected: size,
            });
        }

        let head_start = size - self.head.size();
        let (conv_params, head_params) = params.split_at(head_start);
        let (conv_grad, head_grad) = grad.split_at_mut(head_start);

        let d = d_logits.insert_axis(Axis(1)).to_owned();
        let d = self.head.backward(head_params, head_grad, d)?;
        let mut d = self.pool.backward(d.view());

        let mut end = head_start;
        let mut grad_rest = conv_grad;

        for conv in self.convs.iter_mut().rev() {
            let start = end - conv.size();
            let (grad_head, layer_grad) = mem::take(&mut grad_rest).split_at_mut(start);
            d = conv.backward(&conv_params[start..end], layer_grad, d)?;

            grad_rest = grad_head;
            end = start;
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;
    use rand::{SeedableRng, rngs::StdRng};

    fn config() -> CnnConfig {
        CnnConfig {
            in_channels: 2,
            convs: vec![ConvSpec::new(3, 3), ConvSpec::new(2, 2)],
        }
    }

    #[test]
    fn param_groups_cover_the_whole_buffer() {
        let model = SeizureCnn::new(&config()).unwrap();
        let groups = model.param_groups();

        assert_eq!(groups.iter().map(|g| g.len).sum::<usize>(), model.size());
        assert_eq!(groups[0].name, "convs.0.weight");
        assert_eq!(groups[0].len, 3 * 2 * 3);
        assert_eq!(groups.last().unwrap().name, "head.bias");
    }

    #[test]
    fn forward_shapes() {
        let mut model = SeizureCnn::new(&config()).unwrap();
        let params = model.init_params(&mut StdRng::seed_from_u64(42)).unwrap();
        let x = Array3::ones((4, 2, 40));

        let out = model.forward(&params, x.view()).unwrap();

        assert_eq!(out.logits.dim(), (4, 1));
        assert_eq!(out.maps.dim(), (4, 2, 37));
        assert_eq!(config().receptive_field(), 4);
    }

    #[test]
    fn invalid_configs_are_rejected() {
        let mut cfg = config();
        cfg.convs.clear();
        assert!(SeizureCnn::new(&cfg).is_err());

        let mut cfg = config();
        cfg.convs[1].kernel = 0;
        assert!(SeizureCnn::new(&cfg).is_err());
    }

    #[test]
    fn backward_matches_finite_differences() {
        // Smooth activations, so no pre-activation sits on a ReLU kink.
        let mut cfg = config();
        for conv in &mut cfg.convs {
            conv.act_fn = ActFnSpec::Sigmoid;
        }

        let mut model = SeizureCnn::new(&cfg).unwrap();
        let params = model.init_params(&mut StdRng::seed_from_u64(7)).unwrap();
        let x = Array3::from_shape_fn((2, 2, 12), |(b, c, t)| ((b * 5 + c * 3 + t) as f32 * 0.7).sin());

        let out = model.forward(&params, x.view()).unwrap();
        let mut grad = vec![0.; model.size()];
        // loss = sum of logits
        let d = Array1::ones(out.logits.nrows());
        model.backward(&params, &mut grad, d.view()).unwrap();

        let eps = 1e-3;
        for i in 0..params.len() {
            let mut plus = params.clone();
            plus[i] += eps;
            let mut minus = params.clone();
            minus[i] -= eps;

            let lp = model.forward(&plus, x.view()).unwrap().logits.sum();
            let lm = model.forward(&minus, x.view()).unwrap().logits.sum();

            assert_abs_diff_eq!(grad[i], (lp - lm) / (2. * eps), epsilon = 2e-2);
        }
    }
}
