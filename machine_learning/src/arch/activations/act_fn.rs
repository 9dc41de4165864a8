use ndarray::{Array, ArrayBase, Data, Dimension};

use super::{Relu, Sigmoid};

/// An element-wise activation function.
#[derive(Clone, Debug)]
pub enum ActFn {
    Sigmoid(Sigmoid),
    Relu(Relu),
}

impl ActFn {
    pub fn sigmoid(amp: f32) -> Self {
        ActFn::Sigmoid(Sigmoid::new(amp))
    }

    pub fn relu() -> Self {
        ActFn::Relu(Relu)
    }

    pub fn f(&self, z: f32) -> f32 {
        match self {
            ActFn::Sigmoid(a) => a.f(z),
            ActFn::Relu(a) => a.f(z),
        }
    }

    pub fn df(&self, z: f32) -> f32 {
        match self {
            ActFn::Sigmoid(a) => a.df(z),
            ActFn::Relu(a) => a.df(z),
        }
    }

    /// Applies the activation to every pre-activation in `z`.
    pub fn activate<S, D>(&self, z: &ArrayBase<S, D>) -> Array<f32, D>
    where
        S: Data<Elem = f32>,
        D: Dimension,
    {
        z.mapv(|z| self.f(z))
    }

    /// Turns `d`, a derivative with respect to the activations, into one with respect to the
    /// pre-activations `z`.
    pub fn chain<D: Dimension>(&self, d: &mut Array<f32, D>, z: &Array<f32, D>) {
        d.zip_mut_with(z, |d, &z| *d *= self.df(z));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    #[test]
    fn relu_blocks_negative_derivatives() {
        let relu = ActFn::relu();
        let z = array![[-1., 2.], [0., 3.]];
        let mut d = array![[5., 5.], [5., 5.]];

        relu.chain(&mut d, &z);

        assert_eq!(relu.activate(&z), array![[0., 2.], [0., 3.]]);
        assert_eq!(d, array![[0., 5.], [0., 5.]]);
    }
}
