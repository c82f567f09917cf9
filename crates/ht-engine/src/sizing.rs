//! Training and validation set sizes derived from fit inputs.

use ht_types::{validation_error, TunerResult};

use crate::model::InputExtent;

pub const DEFAULT_BATCH_SIZE: usize = 32;

/// Extra batches added when the input only reports a batch count.
///
/// Empirical correction kept for compatibility with existing result
/// records; it has no derivation behind it.
pub const BATCH_COUNT_CORRECTION: usize = 2;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DatasetSizes {
    pub training: usize,
    pub validation: usize,
}

impl DatasetSizes {
    /// Derive sizes from the training input, its batch size, and the
    /// validation strategy. Explicit validation labels take priority over a
    /// split fraction.
    pub fn derive(
        input: InputExtent,
        batch_size: usize,
        validation_labels: Option<usize>,
        validation_split: Option<f64>,
    ) -> TunerResult<Self> {
        let training = training_size(input, batch_size);

        if let Some(validation) = validation_labels {
            return Ok(Self {
                training,
                validation,
            });
        }

        match validation_split {
            Some(split) if split != 0.0 => Self::split(training, split),
            _ => Ok(Self {
                training,
                validation: 0,
            }),
        }
    }

    /// Carve `split` of `total` out as validation; sizes always add up to
    /// `total`.
    pub fn split(total: usize, split: f64) -> TunerResult<Self> {
        if !(0.0..1.0).contains(&split) {
            return Err(validation_error!(
                "validation_split must be in [0, 1), got {}",
                split
            ));
        }
        let validation = (total as f64 * split) as usize;
        Ok(Self {
            training: total - validation,
            validation,
        })
    }
}

pub fn training_size(input: InputExtent, batch_size: usize) -> usize {
    match input {
        InputExtent::Samples(n) => n,
        InputExtent::Batches(n) => n
            .saturating_add(BATCH_COUNT_CORRECTION)
            .saturating_mul(batch_size),
    }
}
