//! Hardware capability surface consumed by the reception core.
//!
//! [`RxDma`] abstracts one UART receiver paired with one DMA channel running
//! in circular mode. The core never touches registers directly; a board
//! support crate implements this trait for its peripheral, and
//! [`sim::SimulatedUart`](crate::sim::SimulatedUart) implements it in
//! software for hosts and tests.
//!
//! ## Write offset
//!
//! DMA engines count *down*: the remaining-count register starts at the
//! buffer length and reloads when it hits zero. The absolute write offset is
//! therefore `C - remaining`, see [`write_offset()`].

use core::fmt;

/// A receive-side line error reported by the UART.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum LineError {
    /// The receiver lost a byte because the DMA request was not serviced in time.
    Overrun,
    /// Stop bit not detected.
    Framing,
    /// Noise detected on a received bit.
    Noise,
    /// Parity mismatch.
    Parity,
}

impl fmt::Display for LineError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let msg = match self {
            LineError::Overrun => "receiver overrun",
            LineError::Framing => "framing error",
            LineError::Noise => "noise detected",
            LineError::Parity => "parity error",
        };
        f.write_str(msg)
    }
}

/// One UART receiver feeding a circular DMA buffer.
///
/// All methods are called from the notification handler and must be
/// non-blocking.
pub trait RxDma {
    /// Arm continuous wrap-around reception into `buffer[..len]`.
    ///
    /// Implementations enable the idle-line interrupt and the DMA
    /// half-transfer and transfer-complete interrupts, then start the
    /// channel in circular mode.
    ///
    /// # Safety
    ///
    /// `buffer` must be valid for writes of `len` bytes, and must stay at
    /// that address and stay allocated until [`stop()`](Self::stop) returns,
    /// `start_circular` is called again, or the engine is dropped.
    unsafe fn start_circular(&mut self, buffer: *mut u8, len: usize);

    /// Halt the channel. Once this returns the engine no longer writes into
    /// the buffer it was armed with.
    fn stop(&mut self);

    /// The DMA channel's remaining-count register.
    fn remaining(&self) -> usize;

    /// Whether the UART idle-line flag is set.
    fn is_idle_pending(&self) -> bool;

    /// Clear the UART idle-line flag.
    fn clear_idle(&mut self);

    /// Read and clear a pending line error, if any.
    fn take_line_error(&mut self) -> Option<LineError> {
        None
    }
}

impl<T: RxDma + ?Sized> RxDma for &mut T {
    unsafe fn start_circular(&mut self, buffer: *mut u8, len: usize) {
        // SAFETY: forwarded; the caller upholds the same contract.
        unsafe { (**self).start_circular(buffer, len) }
    }

    fn stop(&mut self) {
        (**self).stop()
    }

    fn remaining(&self) -> usize {
        (**self).remaining()
    }

    fn is_idle_pending(&self) -> bool {
        (**self).is_idle_pending()
    }

    fn clear_idle(&mut self) {
        (**self).clear_idle()
    }

    fn take_line_error(&mut self) -> Option<LineError> {
        (**self).take_line_error()
    }
}

/// Convert a DMA remaining count into a write offset in `[0, capacity)`.
///
/// A count of zero is the instant between the last transfer and the
/// circular reload, which is offset 0. A count larger than the buffer can
/// only come from a misconfigured channel and is also read as offset 0.
#[inline]
pub const fn write_offset(capacity: usize, remaining: usize) -> usize {
    if remaining == 0 || remaining >= capacity {
        0
    } else {
        capacity - remaining
    }
}
