//! Transaction wire format.
//!
//! ## Wire Format (little-endian)
//!
//! ```text
//! body:
//!   [signer: 32 bytes]
//!   [nonce: 8 bytes]
//!   [fee: Coin]
//!   [gas_limit: 8 bytes]
//!   [timeout_height: 8 bytes]      0 = no timeout
//!   [msg_count: 4 bytes] then per message [tag: 1 byte][payload]
//!     0x01 Send        { to: 32, amount: Coin }
//!     0x02 Delegate    { validator: 32, amount: Coin }
//!     0x03 Redelegate  { src: 32, dst: 32, amount: Coin }
//!     0x04 AuctionBid  { bidder: 32, bid: Coin, count: 4, count × var bytes }
//! [signature: 64 bytes]  over the body bytes
//! ```

use alloc::vec::Vec;

use crate::codec::{self, Reader};
use crate::coin::Coin;
use crate::crypto;
use crate::error::CodecError;
use crate::types::{Address, BlockHeight, Hash};

const TAG_SEND: u8 = 0x01;
const TAG_DELEGATE: u8 = 0x02;
const TAG_REDELEGATE: u8 = 0x03;
const TAG_AUCTION_BID: u8 = 0x04;

/// Maximum number of messages in one transaction.
pub const MAX_MSGS: usize = 64;

pub const MSG_SEND: &str = "/bank.MsgSend";
pub const MSG_DELEGATE: &str = "/staking.MsgDelegate";
pub const MSG_BEGIN_REDELEGATE: &str = "/staking.MsgBeginRedelegate";
pub const MSG_AUCTION_BID: &str = "/auction.MsgAuctionBid";

/// Bid for top-of-block placement of `transactions`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MsgAuctionBid {
    pub bidder: Address,
    pub bid: Coin,
    /// Raw signed transactions, in the order they must appear in the block.
    pub transactions: Vec<Vec<u8>>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Msg {
    Send { to: Address, amount: Coin },
    Delegate { validator: Address, amount: Coin },
    Redelegate {
        src: Address,
        dst: Address,
        amount: Coin,
    },
    AuctionBid(MsgAuctionBid),
}

impl Msg {
    pub fn type_url(&self) -> &'static str {
        match self {
            Self::Send { .. } => MSG_SEND,
            Self::Delegate { .. } => MSG_DELEGATE,
            Self::Redelegate { .. } => MSG_BEGIN_REDELEGATE,
            Self::AuctionBid(_) => MSG_AUCTION_BID,
        }
    }

    /// Coins this message moves out of the signer, and where they land.
    ///
    /// Delegated coins leave the spendable balance; the validator address
    /// is credited so a simulation can account for them. Redelegation moves
    /// bonded stake and spends nothing. The bid payment is settled
    /// separately and is not reported here.
    pub fn transfer(&self) -> Option<(&Address, &Coin)> {
        match self {
            Self::Send { to, amount } => Some((to, amount)),
            Self::Delegate { validator, amount } => Some((validator, amount)),
            Self::Redelegate { .. } | Self::AuctionBid(_) => None,
        }
    }

    fn encode_into(&self, buf: &mut Vec<u8>) {
        match self {
            Self::Send { to, amount } => {
                codec::write_u8(buf, TAG_SEND);
                codec::write_address(buf, to);
                codec::write_coin(buf, amount);
            }
            Self::Delegate { validator, amount } => {
                codec::write_u8(buf, TAG_DELEGATE);
                codec::write_address(buf, validator);
                codec::write_coin(buf, amount);
            }
            Self::Redelegate { src, dst, amount } => {
                codec::write_u8(buf, TAG_REDELEGATE);
                codec::write_address(buf, src);
                codec::write_address(buf, dst);
                codec::write_coin(buf, amount);
            }
            Self::AuctionBid(bid) => {
                codec::write_u8(buf, TAG_AUCTION_BID);
                codec::write_address(buf, &bid.bidder);
                codec::write_coin(buf, &bid.bid);
                codec::write_u32(buf, bid.transactions.len() as u32);
                for tx in &bid.transactions {
                    codec::write_var_bytes(buf, tx);
                }
            }
        }
    }

    fn decode_from(r: &mut Reader<'_>) -> Result<Self, CodecError> {
        let tag = r.read_u8()?;
        let msg = match tag {
            TAG_SEND => Self::Send {
                to: r.read_address()?,
                amount: r.read_coin()?,
            },
            TAG_DELEGATE => Self::Delegate {
                validator: r.read_address()?,
                amount: r.read_coin()?,
            },
            TAG_REDELEGATE => Self::Redelegate {
                src: r.read_address()?,
                dst: r.read_address()?,
                amount: r.read_coin()?,
            },
            TAG_AUCTION_BID => {
                let bidder = r.read_address()?;
                let bid = r.read_coin()?;
                let count = r.read_count()?;
                let mut transactions = Vec::with_capacity(count.min(64));
                for _ in 0..count {
                    transactions.push(r.read_var_bytes()?);
                }
                Self::AuctionBid(MsgAuctionBid {
                    bidder,
                    bid,
                    transactions,
                })
            }
            other => return Err(CodecError::UnknownMessage(other)),
        };
        Ok(msg)
    }
}

/// The signed portion of a transaction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TxBody {
    pub signer: Address,
    pub nonce: u64,
    pub fee: Coin,
    pub gas_limit: u64,
    /// Last height is `timeout_height - 1`; `0` means the tx never times out.
    pub timeout_height: BlockHeight,
    pub msgs: Vec<Msg>,
}

impl TxBody {
    pub fn encode(&self) -> Vec<u8> {
        let mut buf = Vec::with_capacity(128);
        codec::write_address(&mut buf, &self.signer);
        codec::write_u64(&mut buf, self.nonce);
        codec::write_coin(&mut buf, &self.fee);
        codec::write_u64(&mut buf, self.gas_limit);
        codec::write_u64(&mut buf, self.timeout_height);
        codec::write_u32(&mut buf, self.msgs.len() as u32);
        for msg in &self.msgs {
            msg.encode_into(&mut buf);
        }
        buf
    }

    fn decode_from(r: &mut Reader<'_>) -> Result<Self, CodecError> {
        let signer = r.read_address()?;
        let nonce = r.read_u64()?;
        let fee = r.read_coin()?;
        let gas_limit = r.read_u64()?;
        let timeout_height = r.read_u64()?;
        let count = r.read_count()?;
        if count == 0 || count > MAX_MSGS {
            return Err(CodecError::InvalidField(alloc::format!(
                "message count {} outside 1..={}",
                count, MAX_MSGS
            )));
        }
        let mut msgs = Vec::with_capacity(count);
        for _ in 0..count {
            msgs.push(Msg::decode_from(r)?);
        }
        Ok(Self {
            signer,
            nonce,
            fee,
            gas_limit,
            timeout_height,
            msgs,
        })
    }

    /// Sign the body and return the raw transaction bytes.
    #[cfg(feature = "std")]
    pub fn sign(&self, signing_key: &ed25519_dalek::SigningKey) -> Vec<u8> {
        let mut raw = self.encode();
        let signature = crypto::sign_ed25519(&raw, signing_key);
        raw.extend_from_slice(&signature);
        raw
    }
}

/// A decoded transaction with its signature and the exact signed bytes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SignedTx {
    pub body: TxBody,
    pub signature: [u8; 64],
    /// The body bytes as received, which the signature covers.
    pub signed_bytes: Vec<u8>,
}

impl SignedTx {
    /// Decode a raw transaction. Trailing bytes are rejected.
    pub fn decode(raw: &[u8]) -> Result<Self, CodecError> {
        let mut r = Reader::new(raw);
        let body = TxBody::decode_from(&mut r)?;
        let body_len = r.position();
        let signature = r.read_signature()?;
        r.finish()?;
        Ok(Self {
            body,
            signature,
            signed_bytes: raw[..body_len].to_vec(),
        })
    }

    /// True if the signature verifies against the signer's key.
    pub fn verify_signature(&self) -> bool {
        crypto::verify_ed25519(&self.signed_bytes, &self.signature, &self.body.signer)
    }

    pub fn signer(&self) -> &Address {
        &self.body.signer
    }

    /// The bid message, if this transaction carries exactly one message
    /// and that message is a bid.
    pub fn auction_bid(&self) -> Option<&MsgAuctionBid> {
        match self.body.msgs.as_slice() {
            [Msg::AuctionBid(bid)] => Some(bid),
            _ => None,
        }
    }

    /// True if any message is a bid, whether or not the tx is a
    /// well-formed bid transaction.
    pub fn contains_bid(&self) -> bool {
        self.body.msgs.iter().any(|m| matches!(m, Msg::AuctionBid(_)))
    }
}

/// Decode `raw` and pair it with its hash.
pub fn decode_with_hash(raw: &[u8]) -> Result<(Hash, SignedTx), CodecError> {
    let tx = SignedTx::decode(raw)?;
    Ok((crypto::tx_hash(raw), tx))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crypto::deterministic_keypair;

    fn body(signer: Address, msgs: Vec<Msg>) -> TxBody {
        TxBody {
            signer,
            nonce: 3,
            fee: Coin::new(25, "stake"),
            gas_limit: 50_000,
            timeout_height: 0,
            msgs,
        }
    }

    #[test]
    fn test_decode_signed_send() {
        let (addr, sk) = deterministic_keypair(1);
        let send = Msg::Send {
            to: [2u8; 32],
            amount: Coin::new(1000, "stake"),
        };
        let raw = body(addr, vec![send.clone()]).sign(&sk);

        let tx = SignedTx::decode(&raw).unwrap();
        assert_eq!(tx.body.signer, addr);
        assert_eq!(tx.body.nonce, 3);
        assert_eq!(tx.body.msgs, vec![send]);
        assert!(tx.verify_signature());
        assert!(tx.auction_bid().is_none());
    }

    #[test]
    fn test_nested_transactions_survive_encoding() {
        let (addr, sk) = deterministic_keypair(1);
        let inner = body(addr, vec![Msg::Delegate {
            validator: [9u8; 32],
            amount: Coin::new(5, "stake"),
        }])
        .sign(&sk);
        let bid = MsgAuctionBid {
            bidder: addr,
            bid: Coin::new(100, "stake"),
            transactions: vec![inner.clone(), inner.clone()],
        };
        let raw = body(addr, vec![Msg::AuctionBid(bid)]).sign(&sk);

        let tx = SignedTx::decode(&raw).unwrap();
        let decoded = tx.auction_bid().unwrap();
        assert_eq!(decoded.transactions, vec![inner.clone(), inner]);
        assert!(tx.contains_bid());
    }

    #[test]
    fn test_bid_with_extra_message_is_not_a_bid_tx() {
        let (addr, _) = deterministic_keypair(1);
        let tx = SignedTx {
            body: body(addr, vec![
                Msg::AuctionBid(MsgAuctionBid {
                    bidder: addr,
                    bid: Coin::new(1, "stake"),
                    transactions: vec![],
                }),
                Msg::Send {
                    to: addr,
                    amount: Coin::new(1, "stake"),
                },
            ]),
            signature: [0u8; 64],
            signed_bytes: vec![],
        };
        assert!(tx.auction_bid().is_none());
        assert!(tx.contains_bid());
    }

    #[test]
    fn test_tampered_body_fails_signature() {
        let (addr, sk) = deterministic_keypair(1);
        let mut raw = body(addr, vec![Msg::Send {
            to: [2u8; 32],
            amount: Coin::new(1000, "stake"),
        }])
        .sign(&sk);
        // nonce lives right after the signer
        raw[32] ^= 0x01;
        let tx = SignedTx::decode(&raw).unwrap();
        assert!(!tx.verify_signature());
    }

    #[test]
    fn test_decode_rejects_trailing_bytes() {
        let (addr, sk) = deterministic_keypair(1);
        let mut raw = body(addr, vec![Msg::Redelegate {
            src: [1u8; 32],
            dst: [2u8; 32],
            amount: Coin::new(1, "stake"),
        }])
        .sign(&sk);
        raw.push(0);
        assert_eq!(SignedTx::decode(&raw), Err(CodecError::TrailingBytes(1)));
    }

    #[test]
    fn test_decode_rejects_empty_and_unknown() {
        let (addr, sk) = deterministic_keypair(1);
        let raw = body(addr, vec![]).sign(&sk);
        assert!(matches!(SignedTx::decode(&raw), Err(CodecError::InvalidField(_))));

        let send = Msg::Send {
            to: [2u8; 32],
            amount: Coin::new(1, "stake"),
        };
        let mut raw = body(addr, vec![send]).encode();
        // The first tag follows signer(32) nonce(8) fee(4+5+16) gas(8) timeout(8) count(4).
        raw[85] = 0x7f;
        raw.extend_from_slice(&[0u8; 64]);
        assert_eq!(SignedTx::decode(&raw), Err(CodecError::UnknownMessage(0x7f)));
    }

    #[test]
    fn test_type_urls() {
        let coin = Coin::new(1, "stake");
        let send = Msg::Send {
            to: [0; 32],
            amount: coin.clone(),
        };
        let delegate = Msg::Delegate {
            validator: [0; 32],
            amount: coin,
        };
        assert_eq!(send.type_url(), MSG_SEND);
        assert_eq!(delegate.type_url(), MSG_DELEGATE);
    }
}
