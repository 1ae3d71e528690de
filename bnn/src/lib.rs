pub mod artifact;
pub mod bayesian;
pub mod concrete;
pub mod dataset;
pub mod error;
pub mod optimizer;
pub mod train;

pub use bayesian::{BayesianDense, BayesianNet, NDIM};
pub use concrete::ConcreteNet;
pub use dataset::{FutDataset, Scaler, target};
pub use error::{BnnErr, Result};
pub use train::{TrainConfig, TrainReport, train};
