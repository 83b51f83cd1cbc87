use std::fmt::Display;

use rand::{rngs::StdRng, seq::SliceRandom, SeedableRng};

/// The unique string token that identifies the training partition
pub static TRAIN: &str = "train";

/// The unique string token that identifies the validation partition
pub static VAL: &str = "val";

/// The unique string token that identifies the test partition
pub static TEST: &str = "test";

/// Fractions of the records that go to the training and validation partitions. The test
/// partition receives the remainder.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SplitRatios {
    train: f64,
    val: f64,
}

impl SplitRatios {
    /// Validate and build a pair of ratios
    pub fn new(train: f64, val: f64) -> Result<Self, SplitError> {
        let valid = train.is_finite()
            && val.is_finite()
            && train >= 0.0
            && val >= 0.0
            && train + val <= 1.0;

        if !valid {
            return Err(SplitError::InvalidRatios(train, val));
        }

        Ok(Self { train, val })
    }

    /// Training fraction
    pub fn train(&self) -> f64 {
        self.train
    }

    /// Validation fraction
    pub fn val(&self) -> f64 {
        self.val
    }
}

impl Default for SplitRatios {
    fn default() -> Self {
        Self {
            train: 0.8,
            val: 0.1,
        }
    }
}

/// Three disjoint partitions of a record list
#[derive(Debug, Clone, PartialEq)]
pub struct Split<T> {
    /// Records used to update model weights
    pub train: Vec<T>,

    /// Records used for checkpoint selection
    pub val: Vec<T>,

    /// Held-out records
    pub test: Vec<T>,
}

impl<T> Split<T> {
    /// Take one partition, dropping the others
    pub fn take(self, selector: SplitSelector) -> Vec<T> {
        match selector {
            SplitSelector::Train => self.train,
            SplitSelector::Val => self.val,
            SplitSelector::Test => self.test,
        }
    }
}

/// Shuffle `records` with a generator seeded from `seed` and cut them into train/val/test.
///
/// Boundaries are `floor(n * train)` and `floor(n * (train + val))`, so the same seed always
/// reproduces the same partitions and every record lands in exactly one of them.
pub fn split<T>(mut records: Vec<T>, ratios: SplitRatios, seed: u64) -> Split<T> {
    let mut rng = StdRng::seed_from_u64(seed);
    records.shuffle(&mut rng);

    let total = records.len();
    let train_end = ((total as f64) * ratios.train).floor() as usize;
    let val_end = ((total as f64) * (ratios.train + ratios.val)).floor() as usize;

    // Clamp to valid range for float rounding at the upper edge
    let train_end = train_end.min(total);
    let val_end = val_end.clamp(train_end, total);

    let test = records.split_off(val_end);
    let val = records.split_off(train_end);

    debug!(
        "Dataset split: train={}, val={}, test={}",
        records.len(),
        val.len(),
        test.len()
    );

    Split {
        train: records,
        val,
        test,
    }
}

/// Selects one partition by name
#[derive(Debug, Clone, Copy, Eq, PartialEq, Hash)]
pub enum SplitSelector {
    /// The training partition
    Train,

    /// The validation partition
    Val,

    /// The test partition
    Test,
}

impl TryFrom<&str> for SplitSelector {
    type Error = SplitError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        if value == TRAIN {
            Ok(SplitSelector::Train)
        } else if value == VAL {
            Ok(SplitSelector::Val)
        } else if value == TEST {
            Ok(SplitSelector::Test)
        } else {
            Err(SplitError::UnknownSplit(value.to_string()))
        }
    }
}

impl Display for SplitSelector {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            SplitSelector::Train => TRAIN,
            SplitSelector::Val => VAL,
            SplitSelector::Test => TEST,
        };

        write!(f, "{}", name)
    }
}

/// Split Error
#[derive(thiserror::Error, Debug, PartialEq)]
pub enum SplitError {
    /// Ratios that are negative, not finite, or sum above one
    #[error("invalid split ratios train={0} val={1}")]
    InvalidRatios(f64, f64),

    /// No partition found for the given string
    #[error("no split found for {0}, expected train, val or test")]
    UnknownSplit(String),
}
