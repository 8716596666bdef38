//! Per-channel reception state and the idle-line extraction algorithm.
//!
//! [`ReceptionContext`] owns the circular DMA buffer and a cursor marking the
//! next byte not yet handed to the sink. Every notification from the
//! hardware (idle line, DMA half transfer, DMA transfer complete) runs
//! [`on_notification()`](ReceptionContext::on_notification), which diffs the
//! DMA write offset against the cursor and forwards the new span.
//!
//! ## Wrap handling
//!
//! ```text
//!  linear (w > cursor)              wrap (w < cursor)
//!  ┌────┬──────────┬────────┐       ┌──────┬──────────┬─────┐
//!  │    │ segment  │        │       │  B   │          │  A  │
//!  └────┴──────────┴────────┘       └──────┴──────────┴─────┘
//!       cursor     w                0      w          cursor C
//! ```
//!
//! Segment A is offered first. If the sink takes only part of it, segment B
//! is not offered: the cursor stops where the sink stopped and the rest is
//! counted as dropped.
//!
//! ## Placement
//!
//! The DMA engine writes into the context's own buffer, so the context must
//! not move while the engine is armed. Every method that can arm or feed the
//! engine takes `Pin<&mut Self>`: pin the context where it will live (a
//! `static` through [`SharedReception`](crate::shared::SharedReception),
//! `Box::pin`, or `core::pin::pin!`) and then call
//! [`init()`](ReceptionContext::init). Dropping the context stops the engine.
//!
//! ```
//! use core::pin::pin;
//! use serial_idle_rx::sim::SimulatedUart;
//! use serial_idle_rx::{NullSink, ReceptionContext};
//!
//! let mut rx = pin!(ReceptionContext::<SimulatedUart, NullSink, 16>::new(SimulatedUart::new()));
//! rx.as_mut().init();
//! rx.dma().receive(b"ping");
//! assert_eq!(rx.as_mut().on_notification().received, 4);
//! ```
//!
//! An unpinned context cannot be armed:
//!
//! ```compile_fail
//! # use serial_idle_rx::sim::SimulatedUart;
//! # use serial_idle_rx::{NullSink, ReceptionContext};
//! let mut rx = ReceptionContext::<SimulatedUart, NullSink, 16>::new(SimulatedUart::new());
//! rx.init();
//! ```
//!
//! and an armed one cannot be moved out of its pin:
//!
//! ```compile_fail
//! # use core::pin::pin;
//! # use serial_idle_rx::sim::SimulatedUart;
//! # use serial_idle_rx::{NullSink, ReceptionContext};
//! let mut rx = pin!(ReceptionContext::<SimulatedUart, NullSink, 16>::new(SimulatedUart::new()));
//! rx.as_mut().init();
//! let moved = core::mem::replace(&mut *rx, ReceptionContext::new(SimulatedUart::new()));
//! ```

use core::marker::PhantomPinned;
use core::pin::Pin;
use core::sync::atomic::{compiler_fence, Ordering};

use crate::dma::{write_offset, LineError, RxDma};
use crate::sink::RxSink;
use crate::stats::Statistics;
use crate::trace::{debug, trace, warn};

/// Outcome of a single [`on_notification()`](ReceptionContext::on_notification) call.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Extraction {
    /// Bytes between the cursor and the DMA write offset.
    pub received: usize,
    /// Bytes the sink accepted (equal to `received` when no sink is bound).
    pub accepted: usize,
    /// Line error reported by the UART during this notification.
    pub line_error: Option<LineError>,
}

impl Extraction {
    /// Bytes lost in this notification.
    pub fn dropped(&self) -> usize {
        self.received - self.accepted
    }

    /// Whether the notification found no new data.
    pub fn is_empty(&self) -> bool {
        self.received == 0
    }
}

/// Reception state for one UART channel.
///
/// # Type Parameters
///
/// - `D`: The hardware receiver ([`RxDma`]).
/// - `S`: The sink bytes are forwarded into ([`RxSink`]).
/// - `C`: Capacity of the circular DMA buffer in bytes. Must be ≥ 1.
pub struct ReceptionContext<D, S, const C: usize>
where
    D: RxDma,
    S: RxSink,
{
    buffer: [u8; C],
    /// Offset of the next byte not yet handed to the sink.
    cursor: usize,
    sink: Option<S>,
    stats: Statistics,
    dma: D,
    _pinned: PhantomPinned,
}

impl<D, S, const C: usize> ReceptionContext<D, S, C>
where
    D: RxDma,
    S: RxSink,
{
    /// Create a context around a hardware receiver. Reception is not armed
    /// until [`init()`](Self::init).
    ///
    /// # Panics
    ///
    /// If `C` is 0. In a `static` initializer this is a compile error.
    pub const fn new(dma: D) -> Self {
        assert!(C >= 1, "DMA buffer must hold at least one byte");

        ReceptionContext {
            buffer: [0; C],
            cursor: 0,
            sink: None,
            stats: Statistics::new(),
            dma,
            _pinned: PhantomPinned,
        }
    }

    fn fields(self: Pin<&mut Self>) -> &mut Self {
        // SAFETY: callers only assign fields in place. Nothing is moved out
        // of the context, so the buffer stays where the engine was armed.
        unsafe { self.get_unchecked_mut() }
    }

    /// Reset the channel and start circular reception.
    ///
    /// Zeroes the cursor and statistics, clears stale idle and line-error
    /// flags, unbinds any sink and arms the DMA engine over the buffer.
    pub fn init(self: Pin<&mut Self>) {
        let this = self.fields();
        this.cursor = 0;
        this.stats = Statistics::new();
        this.sink = None;

        if this.dma.is_idle_pending() {
            this.dma.clear_idle();
        }
        let _ = this.dma.take_line_error();

        // SAFETY: the context is pinned, so the buffer keeps this address
        // until drop, and `Drop` stops the engine before the memory goes.
        unsafe { this.dma.start_circular(this.buffer.as_mut_ptr(), C) };
        debug!("serial rx armed: {=usize} byte circular buffer", C);
    }

    /// Install a sink, returning the one it replaces.
    ///
    /// Binding may happen before or after [`init()`](Self::init). On a target
    /// where notifications run in an interrupt, call this with that interrupt
    /// masked, or go through [`SharedReception`](crate::shared::SharedReception).
    pub fn bind_sink(self: Pin<&mut Self>, sink: S) -> Option<S> {
        self.fields().sink.replace(sink)
    }

    /// Remove the sink. New data is then counted as received and discarded.
    pub fn unbind_sink(self: Pin<&mut Self>) -> Option<S> {
        self.fields().sink.take()
    }

    /// The bound sink, if any.
    pub fn sink(&self) -> Option<&S> {
        self.sink.as_ref()
    }

    /// Mutable access to the bound sink, if any.
    pub fn sink_mut(self: Pin<&mut Self>) -> Option<&mut S> {
        self.fields().sink.as_mut()
    }

    /// The hardware receiver.
    ///
    /// Only shared access is handed out: the armed engine stays inside the
    /// context that owns its buffer.
    pub fn dma(&self) -> &D {
        &self.dma
    }

    /// Offset of the next byte not yet handed to the sink, in `[0, C)`.
    pub fn cursor(&self) -> usize {
        self.cursor
    }

    /// Capacity of the circular buffer.
    pub const fn capacity(&self) -> usize {
        C
    }

    /// Snapshot of the counters.
    pub fn statistics(&self) -> Statistics {
        self.stats
    }

    /// Zero all counters.
    ///
    /// Not atomic with respect to a concurrent notification; suspend
    /// notifications (or use [`SharedReception`](crate::shared::SharedReception))
    /// when the epoch boundary must be exact.
    pub fn reset_statistics(self: Pin<&mut Self>) {
        self.fields().stats = Statistics::new();
    }

    /// Forward everything the DMA engine wrote since the last call.
    ///
    /// Call from the UART idle-line interrupt and the DMA half-transfer and
    /// transfer-complete interrupts. Redundant calls are cheap: when the write
    /// offset has not moved, only the idle flag is cleared.
    ///
    /// Never blocks. Must not be re-entered for the same channel.
    pub fn on_notification(self: Pin<&mut Self>) -> Extraction {
        let this = self.fields();
        let w = write_offset(C, this.dma.remaining());
        // Buffer reads below must observe the DMA writes up to `w`.
        compiler_fence(Ordering::Acquire);

        let mut outcome = Extraction::default();

        if w != this.cursor {
            let total = if w > this.cursor {
                w - this.cursor
            } else {
                (C - this.cursor) + w
            };
            this.stats.record_received(total);

            let accepted = match this.sink.as_mut() {
                None => {
                    this.cursor = w;
                    total
                }
                Some(sink) => {
                    let (cursor, accepted) = drain(&this.buffer, this.cursor, w, sink);
                    this.cursor = cursor;
                    accepted
                }
            };

            if accepted < total {
                this.stats.record_dropped(total - accepted);
                warn!(
                    "serial rx overflow: {=usize} of {=usize} bytes dropped",
                    total - accepted,
                    total
                );
            }

            outcome.received = total;
            outcome.accepted = accepted;
        } else {
            trace!("serial rx notification without new data");
        }

        if let Some(err) = this.dma.take_line_error() {
            this.stats.record_line_error();
            warn!("serial rx line error: {}", err);
            outcome.line_error = Some(err);
        }

        if this.dma.is_idle_pending() {
            this.dma.clear_idle();
        }

        outcome
    }
}

impl<D, S, const C: usize> Drop for ReceptionContext<D, S, C>
where
    D: RxDma,
    S: RxSink,
{
    fn drop(&mut self) {
        self.dma.stop();
    }
}

/// Offer `[cursor, w)` (modulo `buffer.len()`) to `sink`, at most two segments.
///
/// Returns the new cursor and the number of bytes accepted. Stops at the
/// first segment the sink does not take in full.
fn drain<S: RxSink + ?Sized>(buffer: &[u8], cursor: usize, w: usize, sink: &mut S) -> (usize, usize) {
    let capacity = buffer.len();
    let mut cursor = cursor;
    let mut accepted = 0;

    let (first, second) = if w > cursor {
        (cursor..w, 0..0)
    } else {
        (cursor..capacity, 0..w)
    };

    for segment in [first, second] {
        let len = segment.len();
        if len == 0 {
            continue;
        }

        let request = len.min(sink.available());
        let taken = if request == 0 {
            0
        } else {
            let taken = sink.write(&buffer[segment.start..segment.start + request]);
            debug_assert!(taken <= request, "sink reported more bytes than offered");
            taken.min(request)
        };

        accepted += taken;
        cursor = (cursor + taken) % capacity;

        if taken < len {
            break;
        }
    }

    (cursor, accepted)
}
