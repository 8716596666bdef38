//! Interrupt-safe sharing of a reception context.
//!
//! On a microcontroller the context is touched from two places: the
//! notification interrupt, and the main loop (binding the sink, reading
//! statistics). [`SharedReception`] puts the context behind a
//! [`critical_section::Mutex`] so each access runs with interrupts masked.
//! That gives the guarantees the bare context leaves to the caller:
//!
//! - [`bind_sink()`](SharedReception::bind_sink) can never interleave with an
//!   in-flight extraction.
//! - [`statistics()`](SharedReception::statistics) is a consistent snapshot of
//!   all counters.
//! - [`take_statistics()`](SharedReception::take_statistics) reads and zeroes
//!   in one step, so no update is lost at the epoch boundary.
//!
//! ## Usage
//!
//! ```ignore
//! static RX: SharedReception<Usart2Dma, Producer<'static, 256>, 64> =
//!     SharedReception::new(Usart2Dma::new());
//!
//! // startup
//! RX.init();
//! RX.bind_sink(producer);
//!
//! #[interrupt]
//! fn USART2() { RX.on_notification(); }
//!
//! #[interrupt]
//! fn DMA1_CH6() { RX.on_notification(); }
//! ```

use core::cell::RefCell;
use core::pin::Pin;

use critical_section::Mutex;

use crate::dma::RxDma;
use crate::reception::{Extraction, ReceptionContext};
use crate::sink::RxSink;
use crate::stats::Statistics;

/// A [`ReceptionContext`] guarded by a critical section.
///
/// Every method takes `&'static self`: the wrapper lives in a `static` (or
/// is leaked), so the context inside never moves and can be armed in place.
pub struct SharedReception<D, S, const C: usize>
where
    D: RxDma,
    S: RxSink,
{
    inner: Mutex<RefCell<ReceptionContext<D, S, C>>>,
}

impl<D, S, const C: usize> SharedReception<D, S, C>
where
    D: RxDma,
    S: RxSink,
{
    /// Create a shared context, suitable for a `static`.
    pub const fn new(dma: D) -> Self {
        SharedReception {
            inner: Mutex::new(RefCell::new(ReceptionContext::new(dma))),
        }
    }

    /// Run `f` with exclusive access to the context, interrupts masked.
    pub fn with<R>(&'static self, f: impl FnOnce(Pin<&mut ReceptionContext<D, S, C>>) -> R) -> R {
        critical_section::with(|cs| {
            let mut ctx = self.inner.borrow_ref_mut(cs);
            // SAFETY: `self` is borrowed for `'static`, so it is never moved
            // or freed, and neither is the context inside it.
            f(unsafe { Pin::new_unchecked(&mut *ctx) })
        })
    }

    /// See [`ReceptionContext::init()`].
    pub fn init(&'static self) {
        self.with(|ctx| ctx.init())
    }

    /// See [`ReceptionContext::bind_sink()`].
    pub fn bind_sink(&'static self, sink: S) -> Option<S> {
        self.with(|ctx| ctx.bind_sink(sink))
    }

    /// See [`ReceptionContext::unbind_sink()`].
    pub fn unbind_sink(&'static self) -> Option<S> {
        self.with(|ctx| ctx.unbind_sink())
    }

    /// See [`ReceptionContext::on_notification()`].
    pub fn on_notification(&'static self) -> Extraction {
        self.with(|ctx| ctx.on_notification())
    }

    /// Consistent snapshot of all counters.
    pub fn statistics(&'static self) -> Statistics {
        self.with(|ctx| ctx.statistics())
    }

    /// Zero all counters.
    pub fn reset_statistics(&'static self) {
        self.with(|ctx| ctx.reset_statistics())
    }

    /// Read and zero all counters in one critical section.
    pub fn take_statistics(&'static self) -> Statistics {
        self.with(|mut ctx| {
            let stats = ctx.statistics();
            ctx.as_mut().reset_statistics();
            stats
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sim::SimulatedUart;
    use crate::sink::NullSink;

    extern crate std;
    use std::boxed::Box;

    /// Sink that accepts everything and keeps a running count.
    #[derive(Default)]
    struct Tally(usize);

    impl RxSink for Tally {
        fn available(&self) -> usize {
            usize::MAX
        }

        fn write(&mut self, data: &[u8]) -> usize {
            self.0 += data.len();
            data.len()
        }
    }

    static RX: SharedReception<SimulatedUart, Tally, 32> = SharedReception::new(SimulatedUart::new());

    fn leaked<S: RxSink + 'static, const C: usize>() -> &'static SharedReception<SimulatedUart, S, C> {
        Box::leak(Box::new(SharedReception::new(SimulatedUart::new())))
    }

    #[test]
    fn static_context_forwards_data() {
        RX.init();
        assert!(RX.bind_sink(Tally::default()).is_none());

        RX.with(|ctx| ctx.dma().receive(b"shared"));
        let outcome = RX.on_notification();

        assert_eq!(outcome.accepted, 6);
        assert_eq!(RX.with(|ctx| ctx.sink().map(|t| t.0)), Some(6));
        assert_eq!(RX.statistics().received, 6);
    }

    #[test]
    fn take_statistics_resets() {
        let rx = leaked::<NullSink, 16>();
        rx.init();
        rx.bind_sink(NullSink);
        rx.with(|ctx| ctx.dma().receive(b"lost"));
        rx.on_notification();

        let stats = rx.take_statistics();
        assert_eq!(stats.received, 4);
        assert_eq!(stats.dropped, 4);
        assert_eq!(stats.overflow_count, 1);
        assert_eq!(rx.statistics(), Statistics::new());
    }

    #[test]
    fn unbind_returns_sink() {
        let rx = leaked::<Tally, 16>();
        rx.bind_sink(Tally(3));
        assert_eq!(rx.unbind_sink().map(|t| t.0), Some(3));

        rx.reset_statistics();
        assert_eq!(rx.statistics(), Statistics::new());
    }
}
