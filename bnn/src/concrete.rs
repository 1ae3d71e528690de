use ndarray::{Array1, Array2};

use crate::{BnnErr, Result};

/// One deterministic network drawn from the posterior.
///
/// Pure inference: `relu(x·w1 + b1)·w2 + b2`, nothing is mutated by a
/// forward pass.
#[derive(Debug, Clone)]
pub struct ConcreteNet {
    pub(crate) w1: Array2<f64>,
    pub(crate) b1: Array1<f64>,
    pub(crate) w2: Array2<f64>,
    pub(crate) b2: Array1<f64>,
}

impl ConcreteNet {
    /// Builds a network from raw tensors, validating that the shapes chain.
    ///
    /// # Errors
    /// Returns `BnnErr::SizeMismatch` when a bias length or a layer boundary
    /// does not line up.
    pub fn new(
        w1: Array2<f64>,
        b1: Array1<f64>,
        w2: Array2<f64>,
        b2: Array1<f64>,
    ) -> Result<Self> {
        if b1.len() != w1.ncols() {
            return Err(BnnErr::SizeMismatch {
                what: "hidden bias",
                got: b1.len(),
                expected: w1.ncols(),
            });
        }
        if w2.nrows() != w1.ncols() {
            return Err(BnnErr::SizeMismatch {
                what: "layer boundary",
                got: w2.nrows(),
                expected: w1.ncols(),
            });
        }
        if b2.len() != w2.ncols() {
            return Err(BnnErr::SizeMismatch {
                what: "output bias",
                got: b2.len(),
                expected: w2.ncols(),
            });
        }

        Ok(Self::from_parts(w1, b1, w2, b2))
    }

    /// Internal constructor for tensors whose shapes are consistent by
    /// construction.
    pub(crate) fn from_parts(
        w1: Array2<f64>,
        b1: Array1<f64>,
        w2: Array2<f64>,
        b2: Array1<f64>,
    ) -> Self {
        Self { w1, b1, w2, b2 }
    }

    /// Input dimensionality of the network.
    pub fn ndim(&self) -> usize {
        self.w1.nrows()
    }

    /// Output dimensionality of the network.
    pub fn output_dim(&self) -> usize {
        self.w2.ncols()
    }

    /// Forward pass over a batch of rows.
    pub fn forward(&self, x: &Array2<f64>) -> Array2<f64> {
        let mut hidden = x.dot(&self.w1) + &self.b1;
        hidden.mapv_inplace(|z| z.max(0.0));
        hidden.dot(&self.w2) + &self.b2
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    #[test]
    fn forward_matches_hand_computation() {
        let net = ConcreteNet::new(
            array![[1.0, 0.0], [0.0, -1.0]],
            array![0.5, 0.5],
            array![[1.0], [2.0]],
            array![0.25],
        )
        .unwrap();

        // z1 = (1.5, -1.5), relu = (1.5, 0), out = 1.5 + 0.25
        let out = net.forward(&array![[1.0, 2.0]]);
        assert_eq!(out.dim(), (1, 1));
        assert!((out[[0, 0]] - 1.75).abs() < 1e-12);
    }

    #[test]
    fn mismatched_shapes_are_rejected() {
        let res = ConcreteNet::new(
            array![[1.0, 0.0], [0.0, 1.0]],
            array![0.0],
            array![[1.0], [1.0]],
            array![0.0],
        );
        assert!(matches!(
            res,
            Err(BnnErr::SizeMismatch { what: "hidden bias", .. })
        ));
    }
}
