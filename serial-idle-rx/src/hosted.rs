//! Hosted runtime: reception on a dedicated thread fed by a channel.
//!
//! On a host there is no interrupt controller. A feeder thread (a simulated
//! peer, or code polling a real device) sends [`Event`]s over a channel, and
//! one reception thread applies them in order. That thread is the only code
//! that touches the [`ReceptionContext`], which keeps the single-producer
//! rule of the interrupt design without any locking.
//!
//! ```text
//! feeder thread ──Event──► mpsc ──► reception thread ──► sink ──► consumer
//!                                   (SimulatedUart +
//!                                    on_notification)
//! ```
//!
//! Wire bytes ([`Event::Receive`]) are written through the [`SimulatedUart`]
//! and trigger a notification at every half/complete boundary they cross,
//! then one idle-line notification at the end of the burst, the same
//! sequence of interrupts the hardware would raise.

use std::boxed::Box;
use std::io;
use std::pin::Pin;
use std::sync::mpsc::{self, Receiver, Sender};
use std::thread::{self, JoinHandle};
use std::vec::Vec;

use crate::dma::LineError;
use crate::reception::{Extraction, ReceptionContext};
use crate::sim::SimulatedUart;
use crate::sink::RxSink;
use crate::trace::debug;

/// Join handle of a [`spawn()`]ed reception thread.
pub type ReceptionHandle<S, const C: usize> = JoinHandle<Pin<Box<ReceptionContext<SimulatedUart, S, C>>>>;

/// Which hardware condition raised a notification.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Notification {
    /// The line went idle after receiving data.
    IdleLine,
    /// The DMA write position crossed the middle of the buffer.
    HalfTransfer,
    /// The DMA write position wrapped to the start of the buffer.
    TransferComplete,
}

/// Message from the feeder thread to the reception thread.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Event {
    /// Bytes arriving on the wire, followed by an idle line.
    Receive(Vec<u8>),
    /// A bare hardware notification.
    Notify(Notification),
    /// A line error latched by the UART, reported with the next notification.
    LineError(LineError),
    /// Stop the reception thread.
    Shutdown,
}

/// Apply events to `ctx` until [`Event::Shutdown`] arrives or every sender
/// is dropped.
///
/// `on_extraction` is called after every notification that found new data,
/// e.g. to wake a consumer.
pub fn run<S, const C: usize>(
    mut ctx: Pin<&mut ReceptionContext<SimulatedUart, S, C>>,
    events: &Receiver<Event>,
    mut on_extraction: impl FnMut(&Extraction),
) where
    S: RxSink,
{
    let mut notify = |ctx: Pin<&mut ReceptionContext<SimulatedUart, S, C>>| {
        let outcome = ctx.on_notification();
        if !outcome.is_empty() || outcome.line_error.is_some() {
            on_extraction(&outcome);
        }
    };

    while let Ok(event) = events.recv() {
        match event {
            Event::Receive(bytes) => {
                let mut offset = 0;
                while offset < bytes.len() {
                    let (n, irq) = ctx.dma().receive_until_irq(&bytes[offset..]);
                    if n == 0 {
                        break;
                    }
                    offset += n;
                    if irq.is_some() {
                        notify(ctx.as_mut());
                    }
                }
                ctx.dma().set_idle();
                notify(ctx.as_mut());
            }
            Event::Notify(_) => notify(ctx.as_mut()),
            Event::LineError(err) => ctx.dma().inject_line_error(err),
            Event::Shutdown => break,
        }
    }
    debug!("hosted reception loop finished");
}

/// Start a reception thread.
///
/// The pinned context is initialized on the new thread, then `sink` is
/// bound. The join handle returns the context for inspection once the
/// thread stops.
pub fn spawn<S, F, const C: usize>(
    mut ctx: Pin<Box<ReceptionContext<SimulatedUart, S, C>>>,
    sink: Option<S>,
    on_extraction: F,
) -> io::Result<(Sender<Event>, ReceptionHandle<S, C>)>
where
    S: RxSink + Send + 'static,
    F: FnMut(&Extraction) + Send + 'static,
{
    let (tx, rx) = mpsc::channel();
    let handle = thread::Builder::new()
        .name("serial-rx".into())
        .spawn(move || {
            ctx.as_mut().init();
            if let Some(sink) = sink {
                ctx.as_mut().bind_sink(sink);
            }
            run(ctx.as_mut(), &rx, on_extraction);
            ctx
        })?;
    Ok((tx, handle))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::pin::pin;
    use std::sync::{Arc, Mutex};

    /// Sink collecting bytes behind a shared handle.
    #[derive(Clone, Default)]
    struct Collect(Arc<Mutex<Vec<u8>>>);

    impl RxSink for Collect {
        fn available(&self) -> usize {
            usize::MAX
        }

        fn write(&mut self, data: &[u8]) -> usize {
            self.0.lock().unwrap().extend_from_slice(data);
            data.len()
        }
    }

    #[test]
    fn long_burst_notifies_at_each_boundary() {
        let mut ctx = pin!(ReceptionContext::<SimulatedUart, Collect, 16>::new(SimulatedUart::new()));
        ctx.as_mut().init();
        let sink = Collect::default();
        ctx.as_mut().bind_sink(sink.clone());

        let (tx, rx) = mpsc::channel();
        let burst: Vec<u8> = (0..40u8).collect();
        tx.send(Event::Receive(burst.clone())).unwrap();
        tx.send(Event::Shutdown).unwrap();

        let mut calls = 0;
        run(ctx.as_mut(), &rx, |_| calls += 1);

        // 40 bytes through a 16-byte buffer: HT, TC, HT, TC, HT. The closing
        // idle-line notification finds nothing new.
        assert_eq!(calls, 5);
        assert_eq!(*sink.0.lock().unwrap(), burst);
        assert_eq!(ctx.statistics().received, 40);
        assert_eq!(ctx.statistics().dropped, 0);
        assert_eq!(ctx.cursor(), 40 % 16);
    }

    #[test]
    fn line_error_surfaces_on_next_notification() {
        let mut ctx = pin!(ReceptionContext::<SimulatedUart, Collect, 16>::new(SimulatedUart::new()));
        ctx.as_mut().init();

        let (tx, rx) = mpsc::channel();
        tx.send(Event::LineError(LineError::Framing)).unwrap();
        tx.send(Event::Notify(Notification::IdleLine)).unwrap();
        drop(tx);

        let mut seen = None;
        run(ctx.as_mut(), &rx, |outcome| seen = outcome.line_error);

        assert_eq!(seen, Some(LineError::Framing));
        assert_eq!(ctx.statistics().line_errors, 1);
    }

    #[test]
    fn spawned_thread_returns_context() {
        let sink = Collect::default();
        let ctx = Box::pin(ReceptionContext::<SimulatedUart, Collect, 32>::new(SimulatedUart::new()));
        let (tx, handle) = spawn(ctx, Some(sink.clone()), |_| {}).unwrap();

        tx.send(Event::Receive(b"over the wire".to_vec())).unwrap();
        tx.send(Event::Shutdown).unwrap();

        let ctx = handle.join().unwrap();
        assert_eq!(ctx.statistics().received, 13);
        assert_eq!(&*sink.0.lock().unwrap(), b"over the wire");
    }
}
