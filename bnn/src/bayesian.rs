//! The probabilistic model: a two-layer Bayesian network whose weights and
//! biases are independent Gaussian posteriors parameterized by mean and
//! log-variance.

use ndarray::{Array1, Array2};
use ndarray_rand::RandomExt;
use rand::Rng;
use rand_distr::StandardNormal;

use crate::ConcreteNet;
use crate::{BnnErr, Result};

/// Input dimensionality of the function under test.
pub const NDIM: usize = 2;

const HIDDEN: usize = 50;
const OUTPUT: usize = 1;

/// One dense layer with Gaussian weight and bias posteriors.
///
/// Tensors use the `(in, out)` layout; the posterior std is
/// `exp(0.5 · logvar)`.
#[derive(Debug, Clone)]
pub struct BayesianDense {
    pub(crate) weight_mu: Array2<f64>,
    pub(crate) weight_logvar: Array2<f64>,
    pub(crate) bias_mu: Array1<f64>,
    pub(crate) bias_logvar: Array1<f64>,
}

impl BayesianDense {
    /// Creates a layer with all posterior means and log-variances at zero,
    /// i.e. every parameter starts as a standard normal.
    pub fn new(in_features: usize, out_features: usize) -> Self {
        Self {
            weight_mu: Array2::zeros((in_features, out_features)),
            weight_logvar: Array2::zeros((in_features, out_features)),
            bias_mu: Array1::zeros(out_features),
            bias_logvar: Array1::zeros(out_features),
        }
    }

    /// Rebuilds a layer from persisted tensors.
    ///
    /// # Errors
    /// Returns `BnnErr::SizeMismatch` when the mean and log-variance tensors
    /// disagree on a shape.
    pub fn from_parts(
        weight_mu: Array2<f64>,
        weight_logvar: Array2<f64>,
        bias_mu: Array1<f64>,
        bias_logvar: Array1<f64>,
    ) -> Result<Self> {
        if weight_logvar.dim() != weight_mu.dim() {
            return Err(BnnErr::SizeMismatch {
                what: "weight logvar",
                got: weight_logvar.len(),
                expected: weight_mu.len(),
            });
        }
        if bias_logvar.len() != bias_mu.len() {
            return Err(BnnErr::SizeMismatch {
                what: "bias logvar",
                got: bias_logvar.len(),
                expected: bias_mu.len(),
            });
        }
        if bias_mu.len() != weight_mu.ncols() {
            return Err(BnnErr::SizeMismatch {
                what: "bias",
                got: bias_mu.len(),
                expected: weight_mu.ncols(),
            });
        }

        Ok(Self {
            weight_mu,
            weight_logvar,
            bias_mu,
            bias_logvar,
        })
    }

    pub fn in_features(&self) -> usize {
        self.weight_mu.nrows()
    }

    pub fn out_features(&self) -> usize {
        self.weight_mu.ncols()
    }

    /// Posterior std of the weights.
    pub(crate) fn weight_std(&self) -> Array2<f64> {
        self.weight_logvar.mapv(|lv| (0.5 * lv).exp())
    }

    /// Posterior std of the biases.
    pub(crate) fn bias_std(&self) -> Array1<f64> {
        self.bias_logvar.mapv(|lv| (0.5 * lv).exp())
    }

    /// Draws one concrete weight/bias pair from the posterior.
    pub fn sample_weights<R: Rng>(&self, rng: &mut R) -> (Array2<f64>, Array1<f64>) {
        let eps_w: Array2<f64> = Array2::random_using(self.weight_mu.raw_dim(), StandardNormal, rng);
        let eps_b: Array1<f64> = Array1::random_using(self.bias_mu.raw_dim(), StandardNormal, rng);
        (
            &self.weight_mu + &(self.weight_std() * eps_w),
            &self.bias_mu + &(self.bias_std() * eps_b),
        )
    }

    /// Closed-form KL divergence of the posterior to the standard normal
    /// prior, summed over every parameter of the layer.
    pub fn kl(&self) -> f64 {
        kl_sum(self.weight_mu.iter().zip(self.weight_logvar.iter()))
            + kl_sum(self.bias_mu.iter().zip(self.bias_logvar.iter()))
    }
}

fn kl_sum<'a, I>(params: I) -> f64
where
    I: Iterator<Item = (&'a f64, &'a f64)>,
{
    0.5 * params
        .map(|(mu, lv)| lv.exp() + mu * mu - 1.0 - lv)
        .sum::<f64>()
}

/// The full probabilistic model for the function under test.
#[derive(Debug, Clone)]
pub struct BayesianNet {
    pub(crate) l1: BayesianDense,
    pub(crate) l2: BayesianDense,
}

impl BayesianNet {
    /// Creates the untrained model: `NDIM → HIDDEN → OUTPUT` with a ReLU
    /// between the layers.
    pub fn new() -> Self {
        Self {
            l1: BayesianDense::new(NDIM, HIDDEN),
            l2: BayesianDense::new(HIDDEN, OUTPUT),
        }
    }

    /// Rebuilds a model from persisted layers.
    ///
    /// # Errors
    /// Returns `BnnErr::SizeMismatch` when the layer boundary does not line
    /// up.
    pub fn from_layers(l1: BayesianDense, l2: BayesianDense) -> Result<Self> {
        if l2.in_features() != l1.out_features() {
            return Err(BnnErr::SizeMismatch {
                what: "layer boundary",
                got: l2.in_features(),
                expected: l1.out_features(),
            });
        }
        Ok(Self { l1, l2 })
    }

    /// Input dimensionality of the model.
    pub fn ndim(&self) -> usize {
        self.l1.in_features()
    }

    /// KL divergence of the whole posterior to the prior.
    pub fn kl(&self) -> f64 {
        self.l1.kl() + self.l2.kl()
    }

    /// Forward pass with freshly sampled weights, the reparameterized pass
    /// used for evaluation.
    pub fn forward<R: Rng>(&self, x: &Array2<f64>, rng: &mut R) -> Array2<f64> {
        let (w1, b1) = self.l1.sample_weights(rng);
        let (w2, b2) = self.l2.sample_weights(rng);

        let mut hidden = x.dot(&w1) + &b1;
        hidden.mapv_inplace(|z| z.max(0.0));
        hidden.dot(&w2) + &b2
    }

    /// Draws one deterministic network from the posterior.
    pub fn sample_network<R: Rng>(&self, rng: &mut R) -> ConcreteNet {
        let (w1, b1) = self.l1.sample_weights(rng);
        let (w2, b2) = self.l2.sample_weights(rng);
        ConcreteNet::from_parts(w1, b1, w2, b2)
    }
}

impl Default for BayesianNet {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;
    use rand::{SeedableRng, rngs::StdRng};

    #[test]
    fn kl_of_the_prior_posterior_is_zero() {
        let net = BayesianNet::new();
        assert!(net.kl().abs() < 1e-12);
    }

    #[test]
    fn kl_grows_when_the_posterior_moves() {
        let mut net = BayesianNet::new();
        net.l1.weight_mu[[0, 0]] = 2.0;
        assert!(net.kl() > 1.0);
    }

    #[test]
    fn sampled_network_has_the_model_shape() {
        let net = BayesianNet::new();
        let mut rng = StdRng::seed_from_u64(3);

        let concrete = net.sample_network(&mut rng);
        assert_eq!(concrete.ndim(), NDIM);
        assert_eq!(concrete.output_dim(), OUTPUT);

        let out = concrete.forward(&array![[0.1, -0.2]]);
        assert_eq!(out.dim(), (1, 1));
        assert!(out[[0, 0]].is_finite());
    }

    #[test]
    fn sampling_is_deterministic_per_seed() {
        let net = BayesianNet::new();
        let a = net.sample_network(&mut StdRng::seed_from_u64(11));
        let b = net.sample_network(&mut StdRng::seed_from_u64(11));
        assert_eq!(a.w1, b.w1);
        assert_eq!(a.b2, b.b2);
    }

    #[test]
    fn mismatched_layers_are_rejected() {
        let l1 = BayesianDense::new(2, 8);
        let l2 = BayesianDense::new(9, 1);
        assert!(matches!(
            BayesianNet::from_layers(l1, l2),
            Err(BnnErr::SizeMismatch { .. })
        ));
    }
}
