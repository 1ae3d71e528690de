use bnn::ConcreteNet;
use log::info;

use crate::session::Sample;

/// Optional observer for finished rounds.
///
/// Purely observational: implementations must not fail the run, and the
/// lifecycle never waits on them beyond the call itself.
pub trait SampleSink {
    /// Called once per round with the collected samples and the network
    /// that classified them.
    fn on_round(&mut self, round: usize, samples: &[Sample], net: &ConcreteNet);
}

/// The default sink: a per-round summary in the log.
pub struct LogSink;

impl SampleSink for LogSink {
    fn on_round(&mut self, round: usize, samples: &[Sample], _net: &ConcreteNet) {
        let valid = samples.iter().filter(|s| s.valid).count();
        info!(
            round = round,
            taken = samples.len(),
            valid = valid;
            "round summary"
        );
    }
}
