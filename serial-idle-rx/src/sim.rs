//! Software model of a UART receiver with a circular DMA channel.
//!
//! [`SimulatedUart`] implements [`RxDma`] without hardware: bytes handed to
//! [`receive()`](SimulatedUart::receive) are written into the armed buffer
//! exactly as a DMA engine would, the remaining count goes down and reloads,
//! and the idle-line flag is raised at the end of each burst.
//!
//! ```text
//! receive(b"..")  ──write──►  [ circular buffer ]  ──on_notification()──►  sink
//!                 remaining -= n, idle = true
//! ```
//!
//! The wire side (`receive`, `advance`, `set_idle`, `inject_line_error`)
//! takes `&self`, like a peripheral that changes state on its own. That is
//! what lets a test drive the engine through
//! [`ReceptionContext::dma()`](crate::ReceptionContext::dma) while the
//! context keeps sole ownership of it.

use core::cell::Cell;

use crate::dma::{LineError, RxDma};

/// DMA interrupt raised while a burst was being written.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum DmaIrq {
    /// The write position crossed the middle of the buffer.
    HalfTransfer,
    /// The write position reached the end of the buffer and reloaded.
    TransferComplete,
}

/// A software UART receiver feeding a circular DMA buffer.
pub struct SimulatedUart {
    buffer: *mut u8,
    len: usize,
    /// Absolute write position in `[0, len)`.
    pos: Cell<usize>,
    idle: Cell<bool>,
    idle_clears: Cell<usize>,
    line_error: Cell<Option<LineError>>,
}

// SAFETY: `buffer` is only written while armed, and the `start_circular`
// contract keeps the target alive and in place until `stop()` or drop. The
// engine is `!Sync`, so the writes never race between threads.
unsafe impl Send for SimulatedUart {}

impl SimulatedUart {
    /// Create an unarmed receiver.
    pub const fn new() -> Self {
        SimulatedUart {
            buffer: core::ptr::null_mut(),
            len: 0,
            pos: Cell::new(0),
            idle: Cell::new(false),
            idle_clears: Cell::new(0),
            line_error: Cell::new(None),
        }
    }

    /// Whether the engine is armed over a buffer.
    pub fn is_armed(&self) -> bool {
        !self.buffer.is_null()
    }

    /// Length of the armed buffer (0 when unarmed).
    pub fn armed_len(&self) -> usize {
        self.len
    }

    /// Current absolute write position.
    pub fn position(&self) -> usize {
        self.pos.get()
    }

    /// How many times the idle flag has been cleared.
    pub fn idle_clears(&self) -> usize {
        self.idle_clears.get()
    }

    /// The latched line error, without clearing it.
    pub fn pending_line_error(&self) -> Option<LineError> {
        self.line_error.get()
    }

    /// Raise the idle-line flag without delivering data.
    pub fn set_idle(&self) {
        self.idle.set(true);
    }

    /// Latch a line error, reported by the next notification.
    pub fn inject_line_error(&self, err: LineError) {
        self.line_error.set(Some(err));
    }

    /// Write a burst into the buffer and raise the idle flag.
    ///
    /// Bytes are dropped if the receiver is not armed. Returns the number
    /// of bytes written.
    pub fn receive(&self, bytes: &[u8]) -> usize {
        let mut written = 0;
        while written < bytes.len() {
            let (n, _) = self.receive_until_irq(&bytes[written..]);
            if n == 0 {
                break;
            }
            written += n;
        }
        if written > 0 {
            self.idle.set(true);
        }
        written
    }

    /// Write bytes up to and including the next half/complete boundary.
    ///
    /// Returns how many bytes were written and the interrupt raised at the
    /// boundary, if one was reached. The idle flag is not touched: the line
    /// is still busy while a burst is in flight.
    pub fn receive_until_irq(&self, bytes: &[u8]) -> (usize, Option<DmaIrq>) {
        if !self.is_armed() {
            return (0, None);
        }

        let half = self.len / 2;
        let mut pos = self.pos.get();
        let mut written = 0;
        let mut irq = None;
        for &byte in bytes {
            // SAFETY: `pos < len`, and the `start_circular` contract keeps
            // `buffer[..len]` valid while armed.
            unsafe { self.buffer.add(pos).write_volatile(byte) };
            written += 1;
            pos += 1;

            if pos == self.len {
                pos = 0;
                irq = Some(DmaIrq::TransferComplete);
                break;
            }
            if half > 0 && pos == half {
                irq = Some(DmaIrq::HalfTransfer);
                break;
            }
        }
        self.pos.set(pos);
        (written, irq)
    }

    /// Move the write position forward by `n` without changing buffer contents.
    pub fn advance(&self, n: usize) {
        if self.is_armed() {
            self.pos.set((self.pos.get() + n) % self.len);
            if n > 0 {
                self.idle.set(true);
            }
        }
    }
}

impl Default for SimulatedUart {
    fn default() -> Self {
        Self::new()
    }
}

impl RxDma for SimulatedUart {
    unsafe fn start_circular(&mut self, buffer: *mut u8, len: usize) {
        self.buffer = buffer;
        self.len = len;
        self.pos.set(0);
    }

    fn stop(&mut self) {
        self.buffer = core::ptr::null_mut();
        self.len = 0;
        self.pos.set(0);
    }

    fn remaining(&self) -> usize {
        self.len - self.pos.get()
    }

    fn is_idle_pending(&self) -> bool {
        self.idle.get()
    }

    fn clear_idle(&mut self) {
        self.idle.set(false);
        self.idle_clears.set(self.idle_clears.get() + 1);
    }

    fn take_line_error(&mut self) -> Option<LineError> {
        self.line_error.take()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Arm `uart` over `buf`. Each test keeps `buf` alive past its last write.
    fn arm(uart: &mut SimulatedUart, buf: &mut [u8]) {
        // SAFETY: callers keep `buf` in place for the rest of the test and
        // stop writing before it goes out of scope.
        unsafe { uart.start_circular(buf.as_mut_ptr(), buf.len()) };
    }

    #[test]
    fn unarmed_drops_bytes() {
        let uart = SimulatedUart::new();
        assert!(!uart.is_armed());
        assert_eq!(uart.receive(b"abc"), 0);
        assert!(!uart.is_idle_pending());
        assert_eq!(uart.remaining(), 0);
    }

    #[test]
    fn receive_writes_and_counts_down() {
        let mut buf = [0u8; 8];
        let mut uart = SimulatedUart::new();
        arm(&mut uart, &mut buf);
        assert_eq!(uart.remaining(), 8);

        assert_eq!(uart.receive(b"abc"), 3);
        assert_eq!(uart.remaining(), 5);
        assert!(uart.is_idle_pending());
        uart.stop();
        assert_eq!(&buf[..3], b"abc");
    }

    #[test]
    fn receive_wraps_around() {
        let mut buf = [0u8; 4];
        let mut uart = SimulatedUart::new();
        arm(&mut uart, &mut buf);

        uart.receive(b"abcdef");
        assert_eq!(uart.position(), 2);
        uart.stop();
        assert_eq!(&buf, b"efcd");
    }

    #[test]
    fn irq_boundaries() {
        let mut buf = [0u8; 8];
        let mut uart = SimulatedUart::new();
        arm(&mut uart, &mut buf);

        assert_eq!(uart.receive_until_irq(b"0123456789"), (4, Some(DmaIrq::HalfTransfer)));
        assert_eq!(uart.receive_until_irq(b"456789"), (4, Some(DmaIrq::TransferComplete)));
        assert_eq!(uart.receive_until_irq(b"89"), (2, None));
        assert!(!uart.is_idle_pending());
        assert_eq!(uart.position(), 2);
    }

    #[test]
    fn stopped_engine_writes_nothing() {
        let mut buf = [0u8; 4];
        let mut uart = SimulatedUart::new();
        arm(&mut uart, &mut buf);
        uart.stop();

        assert!(!uart.is_armed());
        assert_eq!(uart.receive(b"abcd"), 0);
        assert_eq!(buf, [0; 4]);
    }

    #[test]
    fn clear_idle_is_counted() {
        let mut uart = SimulatedUart::new();
        uart.set_idle();
        uart.clear_idle();
        assert!(!uart.is_idle_pending());
        assert_eq!(uart.idle_clears(), 1);
    }

    #[test]
    fn line_error_is_taken_once() {
        let mut uart = SimulatedUart::new();
        uart.inject_line_error(LineError::Parity);
        assert_eq!(uart.pending_line_error(), Some(LineError::Parity));
        assert_eq!(uart.take_line_error(), Some(LineError::Parity));
        assert_eq!(uart.take_line_error(), None);
    }
}
