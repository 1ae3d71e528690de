use std::{env, fs, num::NonZeroUsize, path::Path, process::ExitCode};

use bnn::{BayesianNet, FutDataset, artifact};
use log::{error, info};
use rand::{SeedableRng, rngs::StdRng};

use bnn_exploration::{
    ExplorationErr, LogSink, PosteriorSampler, Result, RunConfig, run_exploration,
};

/// Dimensionality of the candidate points for this problem domain.
const NDIM: NonZeroUsize = NonZeroUsize::new(bnn::NDIM).unwrap();

/// What the process should do. Defaults to `Explore` when no mode is given.
#[derive(Debug, Clone, Copy)]
enum Mode {
    /// Generate a new model, train it and save it.
    Train,
    /// Explore an existing model, training one first if none is saved.
    Explore,
    /// Train and explore in one run.
    Full,
}

fn parse_mode(arg: Option<&str>) -> Result<Mode> {
    match arg {
        None | Some("explore") => Ok(Mode::Explore),
        Some("train") => Ok(Mode::Train),
        Some("full") => Ok(Mode::Full),
        Some(other) => Err(ExplorationErr::UnknownMode(other.to_string())),
    }
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> ExitCode {
    env_logger::init();

    match run().await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("{e}");
            ExitCode::FAILURE
        }
    }
}

async fn run() -> Result<()> {
    let mut args = env::args().skip(1);
    let mode = parse_mode(args.next().as_deref())?;
    let config = match args.next() {
        Some(path) => RunConfig::load(Path::new(&path))?,
        None => RunConfig::default(),
    };

    let dataset = FutDataset::new(config.dataset_size);
    let mut rng = match config.seed {
        Some(seed) => StdRng::seed_from_u64(seed),
        None => StdRng::from_os_rng(),
    };

    let model_path = config.model_path();
    let do_train = match mode {
        Mode::Train | Mode::Full => true,
        Mode::Explore => {
            if model_path.is_file() {
                info!("pre-trained model exists");
                false
            } else {
                info!("pre-trained model does not exist");
                true
            }
        }
    };

    let net = if do_train {
        info!("generating and training model");
        let mut net = BayesianNet::new();
        let report = bnn::train(&mut net, &dataset, &config.train.to_config(), &mut rng)?;
        fs::create_dir_all(&config.model_dir)?;
        artifact::save_bayesian(&net, &model_path)?;
        info!(batches = report.train_loss.len(); "model training complete");
        net
    } else {
        artifact::load_bayesian(&model_path)?
    };

    if matches!(mode, Mode::Explore | Mode::Full) {
        info!("beginning exploration");

        let mut sampler = PosteriorSampler::new(net, rng);
        let mut sink = LogSink;
        let artifacts = run_exploration(
            config.num_networks,
            NDIM,
            config.endpoint,
            &config.connect.to_config(),
            &mut sampler,
            &dataset,
            config.threshold,
            &config.ensemble_dir(),
            Some(&mut sink),
        )
        .await?;

        info!(rounds = artifacts.len(); "exploration complete");
    }

    Ok(())
}
