use bnn::{ConcreteNet, FutDataset, target};

use crate::{ExplorationErr, Result};

/// Classification capability handed to the request/response loop.
///
/// Implementations close over whatever state they need, one concrete model
/// and a fixed validity threshold in the real case.
pub trait Classifier {
    /// Classifies one candidate point as valid or invalid.
    fn classify(&mut self, point: &[f64]) -> Result<bool>;
}

/// The production classifier: a forward pass through one sampled network
/// compared against the validity threshold.
///
/// The threshold is captured at construction time and never read from
/// anywhere else.
pub struct ValidityClassifier<'d> {
    net: ConcreteNet,
    dataset: &'d FutDataset,
    threshold: f64,
}

impl<'d> ValidityClassifier<'d> {
    pub fn new(net: ConcreteNet, dataset: &'d FutDataset, threshold: f64) -> Self {
        Self {
            net,
            dataset,
            threshold,
        }
    }

    /// Releases the network once the round is over.
    pub fn into_net(self) -> ConcreteNet {
        self.net
    }
}

impl Classifier for ValidityClassifier<'_> {
    /// A point is valid when the sampled network's prediction is close to
    /// the ground truth: squared error below the threshold, both sides in
    /// the standardized target space.
    fn classify(&mut self, point: &[f64]) -> Result<bool> {
        if point.len() != self.net.ndim() {
            return Err(ExplorationErr::DimensionMismatch {
                got: point.len(),
                expected: self.net.ndim(),
            });
        }

        let model_x = self.dataset.transform_request(point);
        let prediction = self.net.forward(&model_x)[[0, 0]];

        let true_x = self.dataset.input_scaler().inverse_transform(&model_x);
        let truth = target(true_x[[0, 0]], true_x[[0, 1]]);
        let truth_std = self.dataset.standardize_target(truth);

        let error = (prediction - truth_std).powi(2);
        Ok(error < self.threshold)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bnn::BayesianNet;
    use rand::{SeedableRng, rngs::StdRng};

    #[test]
    fn wrong_dimensionality_is_rejected() {
        let dataset = FutDataset::new(64);
        let net = BayesianNet::new().sample_network(&mut StdRng::seed_from_u64(5));
        let mut classifier = ValidityClassifier::new(net, &dataset, 0.5);

        assert!(matches!(
            classifier.classify(&[0.5]),
            Err(ExplorationErr::DimensionMismatch { got: 1, expected: 2 })
        ));
    }

    #[test]
    fn an_exact_model_classifies_everything_valid() {
        // A network with zero weights predicts the standardized mean.
        // With a huge threshold every point is valid, with a zero threshold
        // none is; this pins the comparison direction.
        let dataset = FutDataset::new(64);
        let net = BayesianNet::new().sample_network(&mut StdRng::seed_from_u64(5));

        let mut permissive = ValidityClassifier::new(net.clone(), &dataset, f64::INFINITY);
        assert!(permissive.classify(&[0.5, 0.5]).unwrap());

        let mut strict = ValidityClassifier::new(net, &dataset, 0.0);
        assert!(!strict.classify(&[0.5, 0.5]).unwrap());
    }
}
