//! Top-of-block auction: bids, bundle validation, and settlement.

pub mod bid;
pub mod escrow;
pub mod validator;

pub use bid::{bundle_digest, AuctionBid, ClearedBid, ClearedBids};
pub use escrow::{distribute, settle_bid, EscrowSplit};
pub use validator::{validate_bid, BidCandidate, ValidationContext};
