//! `blocklane-engine`: lane-partitioned block construction and
//! verification with a top-of-block auction.
//!
//! Block space is split into ordered lanes. Each lane admits its own
//! transactions and fills its own share of the block; an auction on the
//! first lane sells guaranteed top-of-block placement of a bundle.
//!
//! ## Architecture
//!
//! - [`registry`]: the ordered, validated set of lanes
//! - [`params`]: governance-controlled auction parameters
//! - [`auction`]: bid validation, cleared-bid history, escrow split
//! - [`mempool`]: transaction arena with per-lane ordered indexes
//! - [`lanes`]: auction, free, and base lane rules
//! - [`proposal`]: block construction and verification
//! - [`block_engine::BlockEngine`]: the entry points the node calls
//! - [`config`]: engine configuration, loadable from JSON

pub mod error;
pub mod config;
pub mod params;
pub mod registry;
pub mod verifier;
pub mod auction;
pub mod mempool;
pub mod lanes;
pub mod proposal;
pub mod block_engine;

// Re-export key types for convenience
pub use auction::ClearedBid;
pub use block_engine::BlockEngine;
pub use config::{EngineConfig, GenesisState, TieBreak};
pub use error::EngineError;
pub use lanes::{FreeClassifier, LaneKind};
pub use params::AuctionParams;
pub use proposal::ProposalVerdict;
pub use registry::{Lane, LaneRegistry};
pub use verifier::{Ed25519Verifier, TxVerifier};
