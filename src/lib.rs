//! Real-time queueing primitives for no-std embedded targets.
//!
//! # Highlights
//! - Wait-free SPSC ring buffer with fixed capacity.
//! - No allocation, no locks, no dynamic dispatch.
//! - Elements may own resources; queued elements are dropped with the ring.
//!
//! # Quick start
//! ```
//! # #[cfg(not(feature = "loom"))]
//! # fn main() {
//! use ph_ring::RingBuffer;
//!
//! let ring = RingBuffer::<u32, 64>::new();
//! let mut producer = ring.producer();
//! let mut consumer = ring.consumer();
//!
//! producer.try_push(42).unwrap();
//! assert_eq!(consumer.front(), Some(&42));
//! assert_eq!(consumer.try_pop(), Some(42));
//! assert_eq!(consumer.try_pop(), None);
//! # }
//! # #[cfg(feature = "loom")]
//! # fn main() {}
//! ```
//!
//! Across threads, hand each handle to its own thread:
//! ```
//! # #[cfg(not(feature = "loom"))]
//! # fn main() {
//! use ph_ring::RingBuffer;
//!
//! let ring = RingBuffer::<u64, 16>::new();
//! std::thread::scope(|s| {
//!     let mut producer = ring.producer();
//!     let mut consumer = ring.consumer();
//!     s.spawn(move || {
//!         for i in 0..1000u64 {
//!             let mut item = i;
//!             while let Err(full) = producer.try_push(item) {
//!                 item = full.into_inner();
//!                 std::hint::spin_loop();
//!             }
//!         }
//!     });
//!     let mut sum = 0;
//!     let mut received = 0;
//!     while received < 1000 {
//!         if let Some(v) = consumer.try_pop() {
//!             sum += v;
//!             received += 1;
//!         }
//!     }
//!     assert_eq!(sum, 999 * 1000 / 2);
//! });
//! # }
//! # #[cfg(feature = "loom")]
//! # fn main() {}
//! ```
//!
//! # No-std
//! The crate is `#![no_std]` by default. Tests require `std`.
//! Targets without native CAS can enable one of the `portable-atomic*` features.
//!
//! # Safety and concurrency
//! This crate is SPSC by design: exactly one producer and one consumer may be active.
//! `producer()`/`consumer()` panic if called while another handle of the same kind is alive.
//! Using unsafe to bypass these constraints is undefined behavior.
//!
//! # Semantics
//! - Usable capacity is `N - 1`; `N < 2` does not compile.
//! - A rejected push returns the input untouched inside [`PushError::Full`].
//! - An empty ring yields `None` from `try_pop`/`front`.
//! - `size_approx`, `is_empty` and `is_full` are snapshots that may be stale on return.
#![no_std]

mod error;
pub mod ring_buffer;
mod sync;

pub use error::PushError;
pub use ring_buffer::{Consumer, Drain, Producer, RingBuffer};

#[cfg(test)]
extern crate std;
