//! # serial-idle-rx
//!
//! A `no_std`, zero-allocation driver core for receiving variable-length
//! serial data through a circular DMA buffer. The DMA engine writes bytes
//! autonomously; on every idle-line, half-transfer or transfer-complete
//! interrupt the core works out how much new data arrived, splits it across
//! the buffer's wrap boundary and pushes it into a bounded byte sink,
//! counting whatever the sink could not take.
//!
//! ## Architecture
//!
//! | Layer | Module | Purpose |
//! |-------|--------|---------|
//! | Hardware | [`dma`] | `RxDma` trait: remaining count, idle flag, line errors |
//! | Sink | [`sink`] | `RxSink` trait: the bounded queue capability pair |
//! | Core | [`reception`] | `ReceptionContext`: cursor arithmetic and extraction |
//! | Accounting | [`stats`] | received / dropped / overflow counters |
//! | Sharing | [`shared`] | `critical-section` wrapper for ISR + thread access |
//! | Queue | [`queue`] | Lock-free SPSC byte ring (feature-gated) |
//! | Simulation | [`sim`] | Software DMA engine for hosts and tests |
//! | Hosted | [`hosted`] | Consumer thread fed by a notification channel (`std`) |
//!
//! ## Quick start
//!
//! ```ignore
//! use core::ptr::addr_of_mut;
//! use serial_idle_rx::queue::{ByteQueue, Producer};
//! use serial_idle_rx::shared::SharedReception;
//!
//! static mut QUEUE: ByteQueue<256> = ByteQueue::new();
//! static RX: SharedReception<Usart1Dma, Producer<'static, 256>, 64> =
//!     SharedReception::new(Usart1Dma::new());
//!
//! // At startup. A `static` never moves, so the DMA engine can be armed
//! // over the buffer inside it.
//! let (producer, mut consumer) = unsafe { (*addr_of_mut!(QUEUE)).split() };
//! RX.init();
//! RX.bind_sink(producer);
//!
//! // In the USART idle-line and DMA HT/TC interrupts:
//! RX.on_notification();
//!
//! // In the main loop:
//! let mut buf = [0u8; 128];
//! let n = consumer.pop_slice(&mut buf);
//! ```
//!
//! ## Features
//!
//! | Feature | Default | Enables |
//! |---------|---------|---------|
//! | `queue` | yes | [`queue::ByteQueue`] with `embedded-io` consumer |
//! | `critical-section` | yes | [`shared::SharedReception`] |
//! | `heapless` | no | `RxSink` for `heapless::spsc::Producer<u8, N>` |
//! | `defmt` | no | Logging and `defmt::Format` derives |
//! | `std` | no | [`hosted`] consumer thread |

#![cfg_attr(not(feature = "std"), no_std)]
#![warn(unsafe_op_in_unsafe_fn)]

mod trace;

pub mod constants;
pub mod dma;
pub mod sink;
pub mod stats;
pub mod reception;
pub mod sim;

#[cfg(feature = "critical-section")]
pub mod shared;

#[cfg(feature = "queue")]
pub mod queue;

#[cfg(feature = "std")]
pub mod hosted;


pub use dma::{LineError, RxDma};
pub use reception::{Extraction, ReceptionContext};
pub use sink::{NullSink, RxSink};
pub use stats::Statistics;
