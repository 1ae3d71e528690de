//! The per-round session loop and the outer exploration lifecycle.

use std::{
    fs,
    net::SocketAddr,
    num::NonZeroUsize,
    path::{Path, PathBuf},
};

use bnn::{FutDataset, artifact};
use comms::{ConnectConfig, ExplorerLink, establish};
use log::{debug, info};
use tokio::io::{AsyncRead, AsyncWrite};

use crate::{Classifier, NetworkSampler, Result, SampleSink, ValidityClassifier};

/// One classified point: the request as it arrived and the response sent
/// back.
#[derive(Debug, Clone, PartialEq)]
pub struct Sample {
    pub point: Vec<f64>,
    pub valid: bool,
}

/// One persisted round.
#[derive(Debug, Clone)]
pub struct RoundArtifact {
    pub round: usize,
    pub path: PathBuf,
}

/// Runs one session to completion: classify every request the explorer
/// sends until it closes the connection.
///
/// The returned samples preserve arrival order; no request is ever
/// re-classified. The explorer closing the stream at a frame boundary is
/// the expected end of the session, not an error.
pub async fn run_session<S, C>(link: &mut ExplorerLink<S>, classifier: &mut C) -> Result<Vec<Sample>>
where
    S: AsyncRead + AsyncWrite + Unpin,
    C: Classifier + ?Sized,
{
    let mut samples = Vec::new();

    while let Some(point) = link.recv_request().await? {
        let valid = classifier.classify(&point)?;
        link.send_response(valid).await?;
        samples.push(Sample { point, valid });
    }

    debug!(taken = samples.len(); "session ended");
    Ok(samples)
}

/// Runs the full exploration: one session per sampled network, strictly in
/// round order, persisting every concrete network.
///
/// # Arguments
/// * `rounds` - Number of networks to explore.
/// * `ndim` - Dimensionality of the candidate points.
/// * `endpoint` - The explorer's address; a fresh connection is opened for
///   every round.
/// * `connect` - Connect-phase retry budget, applied per round.
/// * `sampler` - Draws one concrete network per round.
/// * `dataset` - Owns the request transform and the ground truth scalers.
/// * `threshold` - Validity threshold captured by each round's classifier.
/// * `ensemble_dir` - Where the per-round artifacts land, indexed by round.
/// * `sink` - Optional observer for finished rounds.
///
/// # Returns
/// One artifact per round, indices `0..rounds`.
///
/// # Errors
/// The first fatal round error aborts the run; the round's connection is
/// closed before the error propagates.
#[allow(clippy::too_many_arguments)]
pub async fn run_exploration<Smp>(
    rounds: usize,
    ndim: NonZeroUsize,
    endpoint: SocketAddr,
    connect: &ConnectConfig,
    sampler: &mut Smp,
    dataset: &FutDataset,
    threshold: f64,
    ensemble_dir: &Path,
    mut sink: Option<&mut dyn SampleSink>,
) -> Result<Vec<RoundArtifact>>
where
    Smp: NetworkSampler + ?Sized,
{
    fs::create_dir_all(ensemble_dir)?;

    let mut artifacts = Vec::with_capacity(rounds);
    for round in 0..rounds {
        let net = sampler.sample();
        debug!(round = round; "sampled network, establishing session");

        let mut link = establish(endpoint, ndim, connect).await?;
        let mut classifier = ValidityClassifier::new(net, dataset, threshold);
        let samples = run_session(&mut link, &mut classifier).await?;

        // The link is closed before the round's artifact is written.
        drop(link);

        let net = classifier.into_net();
        let path = ensemble_dir.join(format!("network_{round}.safetensors"));
        artifact::save_concrete(&net, &path)?;
        info!(round = round, taken = samples.len(); "round persisted");

        if let Some(sink) = sink.as_deref_mut() {
            sink.on_round(round, &samples, &net);
        }

        artifacts.push(RoundArtifact { round, path });
    }

    Ok(artifacts)
}
