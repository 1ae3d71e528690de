//! Persisted model artifacts.
//!
//! Both the trained probabilistic model and the per-round concrete networks
//! are stored as safetensors files with `f64` tensors. Artifacts are
//! immutable after creation.

use std::{fs, path::Path};

use ndarray::{Array1, Array2};
use safetensors::{
    SafeTensors, serialize_to_file,
    tensor::{Dtype, TensorView},
};

use crate::{BayesianDense, BayesianNet, BnnErr, ConcreteNet, Result};

const BAYESIAN_TENSORS: [&str; 8] = [
    "l1.weight_mu",
    "l1.weight_logvar",
    "l1.bias_mu",
    "l1.bias_logvar",
    "l2.weight_mu",
    "l2.weight_logvar",
    "l2.bias_mu",
    "l2.bias_logvar",
];

/// Saves the trained probabilistic model at `path`.
pub fn save_bayesian(net: &BayesianNet, path: &Path) -> Result<()> {
    let tensors = [
        ("l1.weight_mu", view2(&net.l1.weight_mu)?),
        ("l1.weight_logvar", view2(&net.l1.weight_logvar)?),
        ("l1.bias_mu", view1(&net.l1.bias_mu)?),
        ("l1.bias_logvar", view1(&net.l1.bias_logvar)?),
        ("l2.weight_mu", view2(&net.l2.weight_mu)?),
        ("l2.weight_logvar", view2(&net.l2.weight_logvar)?),
        ("l2.bias_mu", view1(&net.l2.bias_mu)?),
        ("l2.bias_logvar", view1(&net.l2.bias_logvar)?),
    ];

    serialize_to_file(tensors, &None, path)?;
    Ok(())
}

/// Loads a probabilistic model persisted by `save_bayesian`.
pub fn load_bayesian(path: &Path) -> Result<BayesianNet> {
    let bytes = fs::read(path)?;
    let st = SafeTensors::deserialize(&bytes)?;

    let [l1_wm, l1_wl, l1_bm, l1_bl, l2_wm, l2_wl, l2_bm, l2_bl] = BAYESIAN_TENSORS;
    let l1 = BayesianDense::from_parts(
        tensor2(&st, l1_wm)?,
        tensor2(&st, l1_wl)?,
        tensor1(&st, l1_bm)?,
        tensor1(&st, l1_bl)?,
    )?;
    let l2 = BayesianDense::from_parts(
        tensor2(&st, l2_wm)?,
        tensor2(&st, l2_wl)?,
        tensor1(&st, l2_bm)?,
        tensor1(&st, l2_bl)?,
    )?;

    BayesianNet::from_layers(l1, l2)
}

/// Saves one round's concrete network at `path`.
pub fn save_concrete(net: &ConcreteNet, path: &Path) -> Result<()> {
    let tensors = [
        ("w1", view2(&net.w1)?),
        ("b1", view1(&net.b1)?),
        ("w2", view2(&net.w2)?),
        ("b2", view1(&net.b2)?),
    ];

    serialize_to_file(tensors, &None, path)?;
    Ok(())
}

/// Loads a concrete network persisted by `save_concrete`.
pub fn load_concrete(path: &Path) -> Result<ConcreteNet> {
    let bytes = fs::read(path)?;
    let st = SafeTensors::deserialize(&bytes)?;

    ConcreteNet::new(
        tensor2(&st, "w1")?,
        tensor1(&st, "b1")?,
        tensor2(&st, "w2")?,
        tensor1(&st, "b2")?,
    )
}

fn view2(arr: &Array2<f64>) -> Result<TensorView<'_>> {
    // Owned arrays in this crate are standard layout, the flat view exists.
    let bytes = bytemuck::cast_slice(arr.as_slice().unwrap());
    Ok(TensorView::new(Dtype::F64, arr.shape().to_vec(), bytes)?)
}

fn view1(arr: &Array1<f64>) -> Result<TensorView<'_>> {
    let bytes = bytemuck::cast_slice(arr.as_slice().unwrap());
    Ok(TensorView::new(Dtype::F64, arr.shape().to_vec(), bytes)?)
}

fn bad(name: &str) -> BnnErr {
    BnnErr::BadArtifact {
        name: name.to_string(),
    }
}

fn values(view: &TensorView<'_>, name: &str, len: usize) -> Result<Vec<f64>> {
    if view.dtype() != Dtype::F64 || view.data().len() != len * size_of::<f64>() {
        return Err(bad(name));
    }
    Ok(bytemuck::pod_collect_to_vec(view.data()))
}

fn tensor2(st: &SafeTensors, name: &str) -> Result<Array2<f64>> {
    let view = st.tensor(name).map_err(|_| bad(name))?;
    let [rows, cols] = view.shape() else {
        return Err(bad(name));
    };

    let data = values(&view, name, rows * cols)?;
    Array2::from_shape_vec((*rows, *cols), data).map_err(|_| bad(name))
}

fn tensor1(st: &SafeTensors, name: &str) -> Result<Array1<f64>> {
    let view = st.tensor(name).map_err(|_| bad(name))?;
    let [len] = view.shape() else {
        return Err(bad(name));
    };

    let data = values(&view, name, *len)?;
    Ok(Array1::from_vec(data))
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    #[test]
    fn bayesian_round_trips() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bnn.safetensors");

        let mut net = BayesianNet::new();
        net.l1.weight_mu[[0, 0]] = 1.25;
        net.l2.bias_logvar[0] = -0.5;

        save_bayesian(&net, &path).unwrap();
        let loaded = load_bayesian(&path).unwrap();

        assert_eq!(loaded.l1.weight_mu, net.l1.weight_mu);
        assert_eq!(loaded.l1.weight_logvar, net.l1.weight_logvar);
        assert_eq!(loaded.l2.bias_logvar, net.l2.bias_logvar);
    }

    #[test]
    fn concrete_round_trips() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("network_0.safetensors");

        let net = ConcreteNet::new(
            array![[1.0, -2.0], [0.25, 4.0]],
            array![0.5, -0.5],
            array![[2.0], [-3.0]],
            array![0.125],
        )
        .unwrap();

        save_concrete(&net, &path).unwrap();
        let loaded = load_concrete(&path).unwrap();

        assert_eq!(loaded.w1, net.w1);
        assert_eq!(loaded.b1, net.b1);
        assert_eq!(loaded.w2, net.w2);
        assert_eq!(loaded.b2, net.b2);
    }

    #[test]
    fn missing_tensors_are_reported() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("partial.safetensors");

        let net = ConcreteNet::new(
            array![[1.0, 0.0], [0.0, 1.0]],
            array![0.0, 0.0],
            array![[1.0], [1.0]],
            array![0.0],
        )
        .unwrap();
        save_concrete(&net, &path).unwrap();

        assert!(matches!(
            load_bayesian(&path),
            Err(BnnErr::BadArtifact { .. })
        ));
    }
}
