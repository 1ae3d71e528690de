//! Variational training of the probabilistic model.
//!
//! Gradients flow to the posterior means and log-variances through the
//! reparameterization trick: a draw `w = mu + exp(0.5·logvar)·eps` gives
//! `∂w/∂mu = 1` and `∂w/∂logvar = ½·eps·std`.

use std::num::NonZeroUsize;

use log::info;
use ndarray::{Array, Array1, Array2, Axis, Dimension};
use ndarray_rand::RandomExt;
use rand::{Rng, seq::SliceRandom};
use rand_distr::StandardNormal;

use crate::{BayesianNet, FutDataset, Result, bayesian::BayesianDense, optimizer::Adam};

/// Hyperparameters of one training run.
#[derive(Debug, Clone)]
pub struct TrainConfig {
    pub epochs: usize,
    pub batch_size: NonZeroUsize,
    /// Weight of the KL term in the ELBO loss.
    pub kl_weight: f64,
    pub learning_rate: f64,
    /// Fraction of the dataset held out for the test-loss history.
    pub test_fraction: f64,
}

impl Default for TrainConfig {
    fn default() -> Self {
        Self {
            epochs: 2,
            batch_size: NonZeroUsize::new(32).unwrap(),
            kl_weight: 1e-6,
            learning_rate: 0.01,
            test_fraction: 0.1,
        }
    }
}

/// Per-batch loss histories of a training run.
#[derive(Debug, Clone)]
pub struct TrainReport {
    pub train_loss: Vec<f64>,
    pub test_loss: Vec<f64>,
}

/// Trains the model in place over shuffled mini-batches.
///
/// # Arguments
/// * `net` - The model to train.
/// * `dataset` - Standardized inputs and targets.
/// * `config` - Hyperparameters.
/// * `rng` - Source of randomness for the split, the shuffles and the
///   posterior draws; seeding it makes the whole run deterministic.
///
/// # Returns
/// The per-batch train- and test-loss histories.
pub fn train<R: Rng>(
    net: &mut BayesianNet,
    dataset: &FutDataset,
    config: &TrainConfig,
    rng: &mut R,
) -> Result<TrainReport> {
    let ((train_x, train_y), (test_x, test_y)) = dataset.split(config.test_fraction, rng);

    let mut opt1 = DenseAdam::new(&net.l1, config.learning_rate);
    let mut opt2 = DenseAdam::new(&net.l2, config.learning_rate);

    let mut train_loss = Vec::new();
    let mut test_loss = Vec::new();

    for epoch in 0..config.epochs {
        for (x, y) in shuffled_batches(&train_x, &train_y, config.batch_size.get(), rng) {
            let loss = train_batch(net, &x, &y, config.kl_weight, &mut opt1, &mut opt2, rng)?;
            train_loss.push(loss);

            let eval = net.forward(&test_x, rng);
            test_loss.push(mse(&eval, &test_y) + config.kl_weight * net.kl());
        }

        info!(
            epoch = epoch + 1,
            train_loss = train_loss.last().copied().unwrap_or(f64::NAN),
            test_loss = test_loss.last().copied().unwrap_or(f64::NAN);
            "epoch finished"
        );
    }

    Ok(TrainReport {
        train_loss,
        test_loss,
    })
}

/// One reparameterized draw of a layer, keeping the noise for the backward
/// pass.
struct DenseDraw {
    weights: Array2<f64>,
    biases: Array1<f64>,
    eps_w: Array2<f64>,
    eps_b: Array1<f64>,
}

impl DenseDraw {
    fn new<R: Rng>(layer: &BayesianDense, rng: &mut R) -> Self {
        let eps_w: Array2<f64> =
            Array2::random_using(layer.weight_mu.raw_dim(), StandardNormal, rng);
        let eps_b: Array1<f64> = Array1::random_using(layer.bias_mu.raw_dim(), StandardNormal, rng);

        Self {
            weights: &layer.weight_mu + &(layer.weight_std() * &eps_w),
            biases: &layer.bias_mu + &(layer.bias_std() * &eps_b),
            eps_w,
            eps_b,
        }
    }
}

/// Gradients with respect to the variational parameters of one layer.
struct DenseGrads {
    weight_mu: Array2<f64>,
    weight_logvar: Array2<f64>,
    bias_mu: Array1<f64>,
    bias_logvar: Array1<f64>,
}

/// Adam state for one layer, one instance per variational tensor.
struct DenseAdam {
    weight_mu: Adam,
    weight_logvar: Adam,
    bias_mu: Adam,
    bias_logvar: Adam,
}

impl DenseAdam {
    fn new(layer: &BayesianDense, learning_rate: f64) -> Self {
        Self {
            weight_mu: Adam::new(layer.weight_mu.len(), learning_rate),
            weight_logvar: Adam::new(layer.weight_logvar.len(), learning_rate),
            bias_mu: Adam::new(layer.bias_mu.len(), learning_rate),
            bias_logvar: Adam::new(layer.bias_logvar.len(), learning_rate),
        }
    }

    fn step(&mut self, layer: &mut BayesianDense, grads: &DenseGrads) -> Result<()> {
        self.weight_mu
            .update(flat(&grads.weight_mu), flat_mut(&mut layer.weight_mu))?;
        self.weight_logvar
            .update(flat(&grads.weight_logvar), flat_mut(&mut layer.weight_logvar))?;
        self.bias_mu
            .update(flat(&grads.bias_mu), flat_mut(&mut layer.bias_mu))?;
        self.bias_logvar
            .update(flat(&grads.bias_logvar), flat_mut(&mut layer.bias_logvar))?;
        Ok(())
    }
}

#[allow(clippy::too_many_arguments)]
fn train_batch<R: Rng>(
    net: &mut BayesianNet,
    x: &Array2<f64>,
    y: &Array2<f64>,
    kl_weight: f64,
    opt1: &mut DenseAdam,
    opt2: &mut DenseAdam,
    rng: &mut R,
) -> Result<f64> {
    let draw1 = DenseDraw::new(&net.l1, rng);
    let draw2 = DenseDraw::new(&net.l2, rng);

    // Forward.
    let z1 = x.dot(&draw1.weights) + &draw1.biases;
    let a1 = z1.mapv(|z| z.max(0.0));
    let z2 = a1.dot(&draw2.weights) + &draw2.biases;

    let diff = &z2 - y;
    let loss = diff.mapv(|d| d * d).mean().unwrap_or(0.0) + kl_weight * net.kl();

    // Backward: mean-squared error over all output elements.
    let d2 = &diff * (2.0 / z2.len() as f64);

    let d_w2 = a1.t().dot(&d2);
    let d_b2 = d2.sum_axis(Axis(0));
    let d_a1 = d2.dot(&draw2.weights.t());

    let mask = z1.mapv(|z| if z > 0.0 { 1.0 } else { 0.0 });
    let d1 = d_a1 * mask;
    let d_w1 = x.t().dot(&d1);
    let d_b1 = d1.sum_axis(Axis(0));

    let g1 = variational_grads(&net.l1, &draw1, &d_w1, &d_b1, kl_weight);
    let g2 = variational_grads(&net.l2, &draw2, &d_w2, &d_b2, kl_weight);

    opt1.step(&mut net.l1, &g1)?;
    opt2.step(&mut net.l2, &g2)?;

    Ok(loss)
}

fn variational_grads(
    layer: &BayesianDense,
    draw: &DenseDraw,
    d_w: &Array2<f64>,
    d_b: &Array1<f64>,
    kl_weight: f64,
) -> DenseGrads {
    let w_std = layer.weight_std();
    let b_std = layer.bias_std();

    // KL gradients: ∂KL/∂mu = mu, ∂KL/∂logvar = ½(exp(logvar) − 1).
    let kl_w_lv = layer.weight_logvar.mapv(|lv| 0.5 * kl_weight * (lv.exp() - 1.0));
    let kl_b_lv = layer.bias_logvar.mapv(|lv| 0.5 * kl_weight * (lv.exp() - 1.0));

    DenseGrads {
        weight_mu: d_w + &(&layer.weight_mu * kl_weight),
        weight_logvar: (d_w * &draw.eps_w * &w_std) * 0.5 + kl_w_lv,
        bias_mu: d_b + &(&layer.bias_mu * kl_weight),
        bias_logvar: (d_b * &draw.eps_b * &b_std) * 0.5 + kl_b_lv,
    }
}

fn shuffled_batches<R: Rng>(
    x: &Array2<f64>,
    y: &Array2<f64>,
    batch_size: usize,
    rng: &mut R,
) -> Vec<(Array2<f64>, Array2<f64>)> {
    let mut indices: Vec<usize> = (0..x.nrows()).collect();
    indices.shuffle(rng);

    indices
        .chunks(batch_size)
        .map(|chunk| (x.select(Axis(0), chunk), y.select(Axis(0), chunk)))
        .collect()
}

fn mse(pred: &Array2<f64>, truth: &Array2<f64>) -> f64 {
    (pred - truth).mapv(|d| d * d).mean().unwrap_or(0.0)
}

// Owned arrays in this crate are standard layout, the flat view always exists.
fn flat<D: Dimension>(a: &Array<f64, D>) -> &[f64] {
    a.as_slice().unwrap()
}

fn flat_mut<D: Dimension>(a: &mut Array<f64, D>) -> &mut [f64] {
    a.as_slice_mut().unwrap()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::FutDataset;
    use rand::{SeedableRng, rngs::StdRng};

    fn config() -> TrainConfig {
        TrainConfig {
            epochs: 2,
            batch_size: NonZeroUsize::new(32).unwrap(),
            ..TrainConfig::default()
        }
    }

    #[test]
    fn report_has_one_entry_per_batch() {
        let dataset = FutDataset::new(256);
        let mut net = BayesianNet::new();
        let mut rng = StdRng::seed_from_u64(42);

        let report = train(&mut net, &dataset, &config(), &mut rng).unwrap();

        // 256 rows, 25 held out, 231 training rows in batches of 32, twice.
        let batches_per_epoch = 231usize.div_ceil(32);
        assert_eq!(report.train_loss.len(), 2 * batches_per_epoch);
        assert_eq!(report.test_loss.len(), report.train_loss.len());
        assert!(report.train_loss.iter().all(|l| l.is_finite()));
        assert!(report.test_loss.iter().all(|l| l.is_finite()));
    }

    #[test]
    fn training_is_deterministic_per_seed() {
        let dataset = FutDataset::new(64);

        let mut net_a = BayesianNet::new();
        let report_a = train(
            &mut net_a,
            &dataset,
            &config(),
            &mut StdRng::seed_from_u64(9),
        )
        .unwrap();

        let mut net_b = BayesianNet::new();
        let report_b = train(
            &mut net_b,
            &dataset,
            &config(),
            &mut StdRng::seed_from_u64(9),
        )
        .unwrap();

        assert_eq!(report_a.train_loss, report_b.train_loss);
        assert_eq!(net_a.l1.weight_mu, net_b.l1.weight_mu);
    }

    #[test]
    fn training_moves_the_posterior() {
        let dataset = FutDataset::new(64);
        let mut net = BayesianNet::new();
        let mut rng = StdRng::seed_from_u64(1);

        train(&mut net, &dataset, &config(), &mut rng).unwrap();

        let moved = net.l1.weight_mu.iter().any(|&m| m != 0.0);
        assert!(moved);
    }
}
