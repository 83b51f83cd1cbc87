use std::fmt::Display;

use burn::tensor::{backend::Backend, Tensor};

/// Largest elementwise difference accepted between the in-memory model and the exported graph
pub const PARITY_TOLERANCE: f64 = 1e-4;

/// Model output copied to the host
#[derive(Debug, Clone, PartialEq)]
pub struct Logits {
    shape: Vec<usize>,
    values: Vec<f32>,
}

impl Logits {
    /// Build from a shape and row-major values
    pub fn new(shape: Vec<usize>, values: Vec<f32>) -> Result<Self, ParityError> {
        let expected: usize = shape.iter().product();

        if expected != values.len() {
            return Err(ParityError::LengthMismatch {
                shape,
                len: values.len(),
            });
        }

        Ok(Self { shape, values })
    }

    /// Copy a tensor to the host
    pub fn from_tensor<B: Backend, const D: usize>(tensor: Tensor<B, D>) -> Self {
        let data = tensor.into_data().convert::<f32>();

        Self {
            shape: data.shape.dims.to_vec(),
            values: data.value,
        }
    }

    /// Dimensions
    pub fn shape(&self) -> &[usize] {
        &self.shape
    }

    /// Row-major values
    pub fn values(&self) -> &[f32] {
        &self.values
    }
}

/// Outcome of a parity check
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verdict {
    /// Within tolerance
    Pass,

    /// Outside tolerance (or not comparable because of NaN)
    Warn,
}

/// The result of comparing two runtimes on the same input
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ParityReport {
    /// Maximum absolute elementwise difference, NaN if any difference was NaN
    pub max_abs_diff: f64,

    /// The tolerance used
    pub tolerance: f64,

    /// Whether the difference is below the tolerance
    pub verdict: Verdict,
}

impl ParityReport {
    /// Log the outcome, as a warning when parity failed
    pub fn log(&self) {
        match self.verdict {
            Verdict::Pass => info!("{}", self),
            Verdict::Warn => warn!("{}", self),
        }
    }
}

impl Display for ParityReport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self.verdict {
            Verdict::Pass => write!(
                f,
                "Parity check: PASS (max diff: {:.2e} < {:.0e})",
                self.max_abs_diff, self.tolerance
            ),
            Verdict::Warn => write!(
                f,
                "Parity check: WARNING (max diff: {:.2e} >= {:.0e})",
                self.max_abs_diff, self.tolerance
            ),
        }
    }
}

/// Compare logits from the reference runtime with logits from the portable graph
pub fn compare(
    reference: &Logits,
    portable: &Logits,
    tolerance: f64,
) -> Result<ParityReport, ParityError> {
    if reference.shape != portable.shape {
        return Err(ParityError::ShapeMismatch {
            reference: reference.shape.clone(),
            portable: portable.shape.clone(),
        });
    }

    let mut max_abs_diff = 0.0f64;

    for (a, b) in reference.values.iter().zip(&portable.values) {
        let diff = (*a as f64 - *b as f64).abs();

        if diff.is_nan() {
            max_abs_diff = f64::NAN;
            break;
        }

        max_abs_diff = max_abs_diff.max(diff);
    }

    // NaN compares false, so it never passes
    let verdict = if max_abs_diff < tolerance {
        Verdict::Pass
    } else {
        Verdict::Warn
    };

    Ok(ParityReport {
        max_abs_diff,
        tolerance,
        verdict,
    })
}

/// What to do when parity fails
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ParityPolicy {
    /// Log a warning and keep the artifacts
    #[default]
    Permissive,

    /// Fail the export
    Strict,
}

impl ParityPolicy {
    /// Apply the policy to a report
    pub fn enforce(&self, report: &ParityReport) -> Result<(), ParityError> {
        match (self, report.verdict) {
            (ParityPolicy::Strict, Verdict::Warn) => Err(ParityError::Diverged {
                max_abs_diff: report.max_abs_diff,
                tolerance: report.tolerance,
            }),
            _ => Ok(()),
        }
    }
}

/// Parity Error
#[derive(thiserror::Error, Debug, PartialEq)]
pub enum ParityError {
    /// The runtimes disagree on the output shape
    #[error("logit shapes differ: reference {reference:?}, portable {portable:?}")]
    ShapeMismatch {
        /// Shape from the reference runtime
        reference: Vec<usize>,

        /// Shape from the portable graph
        portable: Vec<usize>,
    },

    /// Values do not fill the shape
    #[error("{len} values do not fit shape {shape:?}")]
    LengthMismatch {
        /// The declared shape
        shape: Vec<usize>,

        /// The number of values
        len: usize,
    },

    /// Parity failed under the strict policy
    #[error(
        "exported graph diverges from the reference model: max diff {max_abs_diff:e} >= {tolerance:e}"
    )]
    Diverged {
        /// Maximum absolute difference
        max_abs_diff: f64,

        /// The tolerance used
        tolerance: f64,
    },
}
