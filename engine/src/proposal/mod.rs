//! Proposal construction and verification.

pub mod handler;
pub mod space;

pub use handler::{FillState, LanePlan, Prepared, ProposalVerdict};
pub use space::{lane_budget, BlockSpace};
