//! The bounded byte sink the reception core pushes into.
//!
//! [`RxSink`] is the whole contract between the extraction algorithm and
//! whatever queue the application drains: a free-space query and a bulk
//! write that reports how much it actually took.
//!
//! # Contract
//!
//! - Both methods run in interrupt context: non-blocking, bounded time.
//! - [`write()`](RxSink::write) copies the bytes out before returning. The
//!   source region belongs to the DMA engine and is overwritten on its next
//!   lap.
//! - The returned count is exact. The core advances its cursor by it, so a
//!   sink that over- or under-reports desynchronises the stream.

/// A capacity-limited byte sink.
pub trait RxSink {
    /// Free capacity in bytes.
    fn available(&self) -> usize;

    /// Copy up to `data.len()` bytes into the sink.
    ///
    /// Returns the number of bytes accepted, which may be less than
    /// requested (for example if a consumer raced the preceding
    /// [`available()`](Self::available) call).
    fn write(&mut self, data: &[u8]) -> usize;
}

impl<T: RxSink + ?Sized> RxSink for &mut T {
    fn available(&self) -> usize {
        (**self).available()
    }

    fn write(&mut self, data: &[u8]) -> usize {
        (**self).write(data)
    }
}

/// A sink with no capacity: every byte offered to it is dropped.
///
/// Unlike an unbound context (which discards silently), a context bound to
/// `NullSink` records every byte as dropped and every notification as an
/// overflow.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullSink;

impl RxSink for NullSink {
    fn available(&self) -> usize {
        0
    }

    fn write(&mut self, _data: &[u8]) -> usize {
        0
    }
}

#[cfg(feature = "heapless")]
impl<const N: usize> RxSink for heapless::spsc::Producer<'_, u8, N> {
    fn available(&self) -> usize {
        self.capacity() - self.len()
    }

    fn write(&mut self, data: &[u8]) -> usize {
        let mut written = 0;
        for &byte in data {
            if self.enqueue(byte).is_err() {
                break;
            }
            written += 1;
        }
        written
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Counting {
        free: usize,
        taken: usize,
    }

    impl RxSink for Counting {
        fn available(&self) -> usize {
            self.free
        }

        fn write(&mut self, data: &[u8]) -> usize {
            let n = data.len().min(self.free);
            self.free -= n;
            self.taken += n;
            n
        }
    }

    #[test]
    fn null_sink_takes_nothing() {
        let mut sink = NullSink;
        assert_eq!(sink.available(), 0);
        assert_eq!(sink.write(b"abc"), 0);
    }

    fn offer<S: RxSink>(mut sink: S, data: &[u8]) -> usize {
        let n = data.len().min(sink.available());
        sink.write(&data[..n])
    }

    #[test]
    fn borrowed_sink_forwards() {
        let mut inner = Counting { free: 3, taken: 0 };
        assert_eq!(offer(&mut inner, b"hello"), 3);
        assert_eq!(offer(&mut inner, b"again"), 0);
        assert_eq!(inner.taken, 3);
        assert_eq!(inner.free, 0);
    }

    #[test]
    fn dyn_sink_forwards() {
        let mut inner = Counting { free: 8, taken: 0 };
        let dyn_sink: &mut dyn RxSink = &mut inner;
        assert_eq!(dyn_sink.write(b"abcd"), 4);
        assert_eq!(dyn_sink.available(), 4);
    }

    #[cfg(feature = "heapless")]
    #[test]
    fn heapless_producer_stops_when_full() {
        let mut q: heapless::spsc::Queue<u8, 4> = heapless::spsc::Queue::new(); // capacity 3
        let (mut producer, mut consumer) = q.split();

        assert_eq!(producer.available(), 3);
        assert_eq!(producer.write(b"abcde"), 3);
        assert_eq!(producer.available(), 0);

        assert_eq!(consumer.dequeue(), Some(b'a'));
        assert_eq!(producer.available(), 1);
    }
}
