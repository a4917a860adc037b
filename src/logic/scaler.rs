//! Feature standardization
//!
//! Per-column `(x - mean) / std`, fitted on the training split only and
//! replayed unchanged on the held-out split and at inference time.

use ndarray::{Array1, Array2, ArrayView1, ArrayView2, Axis};
use serde::{Deserialize, Serialize};

use crate::error::ClassifierError;

/// Standard deviations below this are treated as zero variance
const ZERO_VARIANCE_EPSILON: f64 = 1e-12;

/// Scale substituted for zero-variance columns
const STD_FLOOR: f64 = 1.0;

/// Fitted per-feature statistics
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScalerState {
    pub mean: Vec<f64>,
    pub std: Vec<f64>,
}

impl ScalerState {
    pub fn n_features(&self) -> usize {
        self.mean.len()
    }
}

#[derive(Debug, Clone, Default)]
pub struct StandardScaler {
    state: Option<ScalerState>,
}

impl StandardScaler {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_state(state: ScalerState) -> Self {
        Self { state: Some(state) }
    }

    /// Compute column means and population standard deviations
    pub fn fit(&mut self, x: ArrayView2<f64>) -> Result<&ScalerState, ClassifierError> {
        if x.nrows() == 0 {
            return Err(ClassifierError::Training("cannot fit scaler on an empty matrix".into()));
        }

        let mean: Array1<f64> = x
            .mean_axis(Axis(0))
            .ok_or_else(|| ClassifierError::Training("cannot fit scaler on an empty matrix".into()))?;
        let std: Vec<f64> = x
            .std_axis(Axis(0), 0.0)
            .iter()
            .map(|&s| if s < ZERO_VARIANCE_EPSILON { STD_FLOOR } else { s })
            .collect();

        Ok(&*self.state.insert(ScalerState { mean: mean.to_vec(), std }))
    }

    pub fn state(&self) -> Result<&ScalerState, ClassifierError> {
        self.state.as_ref().ok_or(ClassifierError::NotFitted("StandardScaler"))
    }

    pub fn transform(&self, x: ArrayView2<f64>) -> Result<Array2<f64>, ClassifierError> {
        let state = self.state()?;
        check_width(state, x.ncols())?;

        let mut scaled = x.to_owned();
        for (j, mut column) in scaled.axis_iter_mut(Axis(1)).enumerate() {
            let (mean, std) = (state.mean[j], state.std[j]);
            column.mapv_inplace(|v| (v - mean) / std);
        }
        Ok(scaled)
    }

    pub fn transform_row(&self, row: ArrayView1<f64>) -> Result<Array1<f64>, ClassifierError> {
        let state = self.state()?;
        check_width(state, row.len())?;

        Ok(row
            .iter()
            .zip(state.mean.iter().zip(&state.std))
            .map(|(v, (mean, std))| (v - mean) / std)
            .collect())
    }

    pub fn fit_transform(&mut self, x: ArrayView2<f64>) -> Result<Array2<f64>, ClassifierError> {
        self.fit(x)?;
        self.transform(x)
    }
}

fn check_width(state: &ScalerState, width: usize) -> Result<(), ClassifierError> {
    if width != state.n_features() {
        return Err(ClassifierError::Training(format!(
            "scaler fitted on {} features, got {}",
            state.n_features(),
            width
        )));
    }
    Ok(())
}
