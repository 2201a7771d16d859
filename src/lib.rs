//! Receiver and recorder planning for trunk-recorder deployments.
//!
//! The core is two pure steps: [`partition()`] places receivers over a system's frequencies and
//! [`allocate()`] sizes each receiver's digital recorder budget. The remaining modules fetch the
//! inputs from RadioReference, ask the operator for upload settings and write the outputs.

pub mod allocate;
pub mod analysis;
pub mod config;
pub mod coverage;
pub mod error;
pub mod feed;
pub mod output;
pub mod partition;
pub mod plan;
pub mod prompts;
pub mod radioreference;
pub mod recorder_config;
pub mod uploads;

pub use allocate::{RecorderBudget, allocate};
pub use error::{PlanError, PlanResult};
pub use partition::partition;
pub use plan::{AllocationPlan, Hz, Receiver};
