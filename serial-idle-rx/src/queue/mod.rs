//! Built-in bounded byte queue.
//!
//! [`ByteQueue`] is the default destination for received bytes: the
//! reception interrupt owns the [`Producer`] (bound as the context's
//! [`RxSink`]) and the application's main loop owns the [`Consumer`].
//!
//! ```text
//! on_notification() ──► Producer ──► [ ByteQueue<N> ] ──► Consumer ──► main loop
//!   (ISR context)         RxSink                        embedded_io::Read
//! ```
//!
//! The consumer also implements [`embedded_io::Read`] and
//! [`embedded_io::ReadReady`], so it plugs into any code written against
//! those traits. `read()` waits for data per the `embedded-io` contract; poll
//! `read_ready()` first from a loop that must not wait.

pub mod spsc;

pub use spsc::{ByteQueue, Consumer, Producer};

use core::convert::Infallible;

use crate::sink::RxSink;

impl<const N: usize> RxSink for Producer<'_, N> {
    fn available(&self) -> usize {
        self.free()
    }

    fn write(&mut self, data: &[u8]) -> usize {
        self.push_slice(data)
    }
}

impl<const N: usize> embedded_io::ErrorType for Consumer<'_, N> {
    type Error = Infallible;
}

impl<const N: usize> embedded_io::Read for Consumer<'_, N> {
    fn read(&mut self, buf: &mut [u8]) -> Result<usize, Self::Error> {
        if buf.is_empty() {
            return Ok(0);
        }
        loop {
            let n = self.pop_slice(buf);
            if n > 0 {
                return Ok(n);
            }
            core::hint::spin_loop();
        }
    }
}

impl<const N: usize> embedded_io::ReadReady for Consumer<'_, N> {
    fn read_ready(&mut self) -> Result<bool, Self::Error> {
        Ok(!self.is_empty())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use embedded_io::{Read, ReadReady};

    #[test]
    fn producer_is_a_sink() {
        let mut q: ByteQueue<8> = ByteQueue::new();
        let (mut producer, _consumer) = q.split();

        assert_eq!(RxSink::available(&producer), 7);
        assert_eq!(RxSink::write(&mut producer, b"0123456789"), 7);
        assert_eq!(RxSink::available(&producer), 0);
    }

    #[test]
    fn consumer_reads_through_embedded_io() {
        let mut q: ByteQueue<8> = ByteQueue::new();
        let (mut producer, mut consumer) = q.split();

        assert_eq!(consumer.read_ready(), Ok(false));
        producer.push_slice(b"ping");
        assert_eq!(consumer.read_ready(), Ok(true));

        let mut buf = [0u8; 16];
        assert_eq!(consumer.read(&mut buf), Ok(4));
        assert_eq!(&buf[..4], b"ping");
        assert_eq!(consumer.read(&mut []), Ok(0));
    }

    #[test]
    fn read_exact_across_wrap() {
        let mut q: ByteQueue<4> = ByteQueue::new();
        let (mut producer, mut consumer) = q.split();

        producer.push_slice(b"ab");
        let mut two = [0u8; 2];
        consumer.read_exact(&mut two).unwrap();
        producer.push_slice(b"cde");

        let mut three = [0u8; 3];
        consumer.read_exact(&mut three).unwrap();
        assert_eq!(&three, b"cde");
    }
}
