//! Reception counters.
//!
//! The counters are written only by
//! [`ReceptionContext::on_notification()`](crate::ReceptionContext::on_notification).
//! A snapshot taken while notifications are enabled may mix fields from two
//! different invocations; use [`SharedReception`](crate::shared::SharedReception)
//! when an exact epoch boundary matters.

/// Snapshot of a channel's reception counters.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Statistics {
    /// Bytes offered to the sink (or discarded, when none is bound).
    pub received: u64,
    /// Bytes the sink could not accept.
    pub dropped: u64,
    /// Notifications that lost at least one byte.
    pub overflow_count: u64,
    /// Line errors (overrun, framing, noise, parity) reported by the UART.
    pub line_errors: u64,
}

impl Statistics {
    /// All counters at zero.
    pub const fn new() -> Self {
        Statistics {
            received: 0,
            dropped: 0,
            overflow_count: 0,
            line_errors: 0,
        }
    }

    /// Bytes that made it into the sink.
    pub fn delivered(&self) -> u64 {
        self.received.saturating_sub(self.dropped)
    }

    /// Fraction of received bytes that were dropped, in `[0.0, 1.0]`.
    pub fn loss_ratio(&self) -> f32 {
        if self.received == 0 {
            0.0
        } else {
            self.dropped as f32 / self.received as f32
        }
    }

    pub(crate) fn record_received(&mut self, bytes: usize) {
        self.received = self.received.wrapping_add(bytes as u64);
    }

    pub(crate) fn record_dropped(&mut self, bytes: usize) {
        self.dropped = self.dropped.wrapping_add(bytes as u64);
        self.overflow_count = self.overflow_count.wrapping_add(1);
    }

    pub(crate) fn record_line_error(&mut self) {
        self.line_errors = self.line_errors.wrapping_add(1);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_is_zeroed() {
        assert_eq!(Statistics::new(), Statistics::default());
        assert_eq!(Statistics::new().received, 0);
    }

    #[test]
    fn drop_counts_one_overflow_per_call() {
        let mut s = Statistics::new();
        s.record_received(10);
        s.record_dropped(6);
        s.record_received(3);
        s.record_dropped(3);

        assert_eq!(s.received, 13);
        assert_eq!(s.dropped, 9);
        assert_eq!(s.overflow_count, 2);
        assert_eq!(s.delivered(), 4);
    }

    #[test]
    fn loss_ratio_handles_empty() {
        assert_eq!(Statistics::new().loss_ratio(), 0.0);

        let mut s = Statistics::new();
        s.record_received(8);
        s.record_dropped(2);
        assert_eq!(s.loss_ratio(), 0.25);
    }

    #[test]
    fn fields_are_independent() {
        let mut s = Statistics::new();
        s.record_line_error();
        assert_eq!(s.line_errors, 1);
        assert_eq!(s.received, 0);
        assert_eq!(s.dropped, 0);
        assert_eq!(s.overflow_count, 0);
    }
}
