//! Lock-free inbound event transport.
//!
//! Each virtual core owns one [`Mailbox`]: a set of bounded single-producer/
//! single-consumer bucket rings, one per producer slot. Every peer core
//! writes into its own ring, which makes the whole very much a
//! multi-producer/single-consumer queue while keeping each ring's cursors
//! uncontended. Enqueues of multi-bucket events are all-or-nothing, so the
//! consumer never observes a torn event.

pub mod mpsc;
pub mod spsc;

// Layer 2: Third-party crate imports
use thiserror::Error;

pub use mpsc::Mailbox;
pub use spsc::BucketRing;

/// An enqueue could not fit into the ring.
///
/// This is a transient condition: the producing pipe keeps the batch and
/// retries on its next flush. It is never surfaced to actor code.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("mailbox ring is full")]
pub struct QueueFull;
