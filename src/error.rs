//! Error types for the planning core.
//! Every variant is a precondition violation; nothing here is transient.

use thiserror::Error;

use crate::Hz;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum PlanError {
    #[error("no frequencies supplied")]
    EmptyInput,

    #[error("receiver bandwidth must be positive (got {bandwidth} Hz)")]
    InvalidBandwidth { bandwidth: Hz },

    #[error("invalid frequency {frequency} Hz: frequencies must be positive")]
    InvalidFrequency { frequency: Hz },

    #[error(
        "invalid recorder budget: total={total}, min per device={min_per_device}, max per device={max_per_device}"
    )]
    InvalidBudgetRange {
        total: i64,
        min_per_device: i64,
        max_per_device: i64,
    },

    #[error("{needed} receivers needed, more than the {limit} a plan may hold")]
    TooManyReceivers { needed: u64, limit: u64 },

    #[error("frequency {frequency} Hz falls outside every receiver window")]
    UncoveredFrequency { frequency: Hz },
}

pub type PlanResult<T> = Result<T, PlanError>;
