//! Training data for the function under test.

use log::debug;
use ndarray::{Array1, Array2, Axis};
use rand::{Rng, seq::SliceRandom};

/// The ground-truth function the model learns.
///
/// `f(a, b) = a²/5 − b³/10`
pub fn target(a: f64, b: f64) -> f64 {
    a * a / 5.0 - b.powi(3) / 10.0
}

/// Half-width of the square input region the grid covers.
const DOMAIN: f64 = 6.0;

/// Per-column standardization, matching the usual zero-mean unit-variance
/// scaling. Constant columns keep a std of 1 so the transform stays finite.
#[derive(Debug, Clone)]
pub struct Scaler {
    mean: Array1<f64>,
    std: Array1<f64>,
}

impl Scaler {
    /// Fits the scaler to the columns of `data`.
    pub fn fit(data: &Array2<f64>) -> Self {
        let n = data.nrows().max(1) as f64;
        let mean = data.sum_axis(Axis(0)) / n;
        let mut std = data.std_axis(Axis(0), 0.0);
        std.mapv_inplace(|s| if s > 0.0 { s } else { 1.0 });
        Self { mean, std }
    }

    /// Maps raw values into the standardized space.
    pub fn transform(&self, x: &Array2<f64>) -> Array2<f64> {
        (x - &self.mean) / &self.std
    }

    /// Maps standardized values back to the raw space.
    pub fn inverse_transform(&self, x: &Array2<f64>) -> Array2<f64> {
        x * &self.std + &self.mean
    }
}

/// The training set for the function under test: a square grid over
/// `[-DOMAIN, DOMAIN]²` with standardized inputs and targets.
///
/// Also owns the mapping from the explorer's normalized `[0,1]` request
/// domain into the standardized input range.
pub struct FutDataset {
    inputs: Array2<f64>,
    targets: Array2<f64>,
    input_scaler: Scaler,
    target_scaler: Scaler,
    input_min: f64,
    input_max: f64,
}

impl FutDataset {
    /// Builds the dataset with roughly `size` rows.
    ///
    /// `size` is truncated down to the nearest perfect square so the grid
    /// stays regular.
    ///
    /// # Panics
    /// Panics if `size < 4`, the grid needs at least two points per axis.
    pub fn new(size: usize) -> Self {
        assert!(size >= 4, "dataset size must be at least 4");

        let root = (size as f64).sqrt() as usize;
        let len = root * root;
        if len != size {
            debug!(requested = size, actual = len; "truncated dataset size to a square");
        }

        let axis = linspace(-DOMAIN, DOMAIN, root);
        let mut flat_inputs = Vec::with_capacity(len * 2);
        let mut flat_targets = Vec::with_capacity(len);
        for &a in &axis {
            for &b in &axis {
                flat_inputs.push(a);
                flat_inputs.push(b);
                flat_targets.push(target(a, b));
            }
        }

        // Shapes match the vec lengths by construction.
        let raw_inputs = Array2::from_shape_vec((len, 2), flat_inputs).unwrap();
        let raw_targets = Array2::from_shape_vec((len, 1), flat_targets).unwrap();

        let input_scaler = Scaler::fit(&raw_inputs);
        let target_scaler = Scaler::fit(&raw_targets);
        let inputs = input_scaler.transform(&raw_inputs);
        let targets = target_scaler.transform(&raw_targets);

        let input_min = inputs.iter().fold(f64::INFINITY, |m, &v| m.min(v));
        let input_max = inputs.iter().fold(f64::NEG_INFINITY, |m, &v| m.max(v));

        Self {
            inputs,
            targets,
            input_scaler,
            target_scaler,
            input_min,
            input_max,
        }
    }

    /// Returns the number of rows.
    pub fn len(&self) -> usize {
        self.inputs.nrows()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Standardized inputs, one row per sample.
    pub fn inputs(&self) -> &Array2<f64> {
        &self.inputs
    }

    /// Standardized targets, one row per sample.
    pub fn targets(&self) -> &Array2<f64> {
        &self.targets
    }

    pub fn input_scaler(&self) -> &Scaler {
        &self.input_scaler
    }

    pub fn target_scaler(&self) -> &Scaler {
        &self.target_scaler
    }

    /// Maps a request from the explorer's normalized `[0,1]` domain into the
    /// standardized input domain of the model.
    pub fn transform_request(&self, point: &[f64]) -> Array2<f64> {
        let range = self.input_max - self.input_min;
        let row: Vec<f64> = point.iter().map(|p| self.input_min + p * range).collect();
        Array1::from_vec(row).insert_axis(Axis(0))
    }

    /// Maps one raw target value into the standardized target space.
    pub fn standardize_target(&self, value: f64) -> f64 {
        self.target_scaler
            .transform(&Array2::from_elem((1, 1), value))[[0, 0]]
    }

    /// Splits the rows into shuffled train and test partitions.
    ///
    /// # Arguments
    /// * `test_fraction` - Fraction of rows held out for testing; the test
    ///   partition always keeps at least one row, and so does the train one.
    /// * `rng` - Source of randomness for the shuffle.
    ///
    /// # Returns
    /// `((train_x, train_y), (test_x, test_y))`.
    #[allow(clippy::type_complexity)]
    pub fn split<R: Rng>(
        &self,
        test_fraction: f64,
        rng: &mut R,
    ) -> ((Array2<f64>, Array2<f64>), (Array2<f64>, Array2<f64>)) {
        let n = self.len();
        let test_len = ((n as f64 * test_fraction) as usize).clamp(1, n - 1);

        let mut indices: Vec<usize> = (0..n).collect();
        indices.shuffle(rng);
        let (test_idx, train_idx) = indices.split_at(test_len);

        let train = (
            self.inputs.select(Axis(0), train_idx),
            self.targets.select(Axis(0), train_idx),
        );
        let test = (
            self.inputs.select(Axis(0), test_idx),
            self.targets.select(Axis(0), test_idx),
        );
        (train, test)
    }
}

fn linspace(lo: f64, hi: f64, n: usize) -> Vec<f64> {
    let step = (hi - lo) / (n - 1) as f64;
    (0..n).map(|i| lo + step * i as f64).collect()
}
