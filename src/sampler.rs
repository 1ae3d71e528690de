use bnn::{BayesianNet, ConcreteNet};
use rand::Rng;

/// Sampling capability handed to the session lifecycle: one draw per round.
pub trait NetworkSampler {
    /// Draws the concrete network for the next round.
    fn sample(&mut self) -> ConcreteNet;
}

/// Draws concrete networks from a trained posterior.
pub struct PosteriorSampler<R> {
    net: BayesianNet,
    rng: R,
}

impl<R: Rng> PosteriorSampler<R> {
    pub fn new(net: BayesianNet, rng: R) -> Self {
        Self { net, rng }
    }

    /// The underlying probabilistic model.
    pub fn bayesian(&self) -> &BayesianNet {
        &self.net
    }
}

impl<R: Rng> NetworkSampler for PosteriorSampler<R> {
    fn sample(&mut self) -> ConcreteNet {
        self.net.sample_network(&mut self.rng)
    }
}
