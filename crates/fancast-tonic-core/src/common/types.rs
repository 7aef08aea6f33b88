//! # Common Log Types
//!
//! Shared aliases for positions in the append-only message log. Both the
//! server's log and its per-subscription dispatchers speak in terms of
//! [`SeqNo`], so the alias lives here with the rest of the protocol
//! contract.

/// Zero-based position of a note in the append-only log, assigned at append
/// time. The log length doubles as the next sequence number to be assigned.
///
/// Sequence numbers are internal bookkeeping: they are never serialized
/// onto the wire.
pub type SeqNo = u64;
