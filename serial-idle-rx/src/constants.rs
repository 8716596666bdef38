/// Default capacity of the circular DMA receive buffer, in bytes.
///
/// Size it to hold at least the largest burst expected between two
/// notifications; the half-transfer interrupt fires every `C / 2` bytes.
pub const DEFAULT_DMA_BUFFER_SIZE: usize = 64;

/// Default number of slots in the byte queue (usable capacity is one less).
pub const DEFAULT_QUEUE_SIZE: usize = 256;
