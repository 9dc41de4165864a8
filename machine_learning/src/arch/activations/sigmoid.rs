#[derive(Clone, Debug)]
pub struct Sigmoid {
    amp: f32,
}

impl Default for Sigmoid {
    fn default() -> Self {
        Self::new(1.)
    }
}

impl Sigmoid {
    pub fn new(amp: f32) -> Self {
        Self { amp }
    }

    pub fn f(&self, z: f32) -> f32 {
        self.amp / (1. + (-z).exp())
    }

    pub fn df(&self, z: f32) -> f32 {
        let s = 1. / (1. + (-z).exp());
        self.amp * s * (1. - s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    #[test]
    fn saturates_without_nans() {
        let s = Sigmoid::default();

        assert_abs_diff_eq!(s.f(0.), 0.5);
        assert_abs_diff_eq!(s.f(1000.), 1.);
        assert_abs_diff_eq!(s.f(-1000.), 0.);
        assert_abs_diff_eq!(s.df(0.), 0.25);
        assert_abs_diff_eq!(s.df(-1000.), 0.);
    }
}
