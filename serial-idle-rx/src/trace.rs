//! Logging for the reception path.
//!
//! Enable with `--features defmt`. Without it every macro expands to
//! nothing, so the interrupt handler carries no formatting cost.

#[cfg(feature = "defmt")]
#[allow(unused_imports)]
pub(crate) use defmt::{debug, error, info, trace, warn};

#[cfg(not(feature = "defmt"))]
#[allow(unused_macros)]
macro_rules! trace_noop {
    ($($arg:tt)*) => {};
}

#[cfg(not(feature = "defmt"))]
#[allow(unused_macros)]
macro_rules! debug_noop {
    ($($arg:tt)*) => {};
}

#[cfg(not(feature = "defmt"))]
#[allow(unused_macros)]
macro_rules! info_noop {
    ($($arg:tt)*) => {};
}

#[cfg(not(feature = "defmt"))]
#[allow(unused_macros)]
macro_rules! warn_noop {
    ($($arg:tt)*) => {};
}

#[cfg(not(feature = "defmt"))]
#[allow(unused_macros)]
macro_rules! error_noop {
    ($($arg:tt)*) => {};
}

#[cfg(not(feature = "defmt"))]
#[allow(unused_imports)]
pub(crate) use {
    debug_noop as debug, error_noop as error, info_noop as info, trace_noop as trace,
    warn_noop as warn,
};

#[cfg(all(test, not(feature = "defmt")))]
mod tests {
    use super::{debug, error, info, trace, warn};

    #[test]
    fn every_level_accepts_format_args() {
        trace!("trace {=usize}", 1usize);
        debug!("debug {=usize}", 2usize);
        info!("info");
        warn!("warn {=usize} of {=usize}", 3usize, 4usize);
        error!("error {}", "x");
    }
}
