//! Error kinds the engine raises, grouped into the same four categories a
//! parameter/config-store check macro would guard against.

use core::fmt;

/// Everything the engine can fail with. No external error-derive crate is
/// pulled in here — this crate stays usable from a bare `no_std` firmware
/// image with no allocator-backed error machinery, so one hand-written
/// enum covers every failure instead of a `thiserror`-derived tree.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FreqGenError {
    /// Frequency <= 0, duty outside (0, 1), or a channel/block count out of range.
    InvalidArg(&'static str),
    /// The solved (P, NH, NL) or the sized buffer can't be represented by the hardware.
    Size(&'static str),
    /// No free GPIO, no sufficiently wide free channel run, or a buffer allocation failed.
    NoMem(&'static str),
    /// The peripheral rejected a configuration, install, start, or stop request.
    Hardware(&'static str),
}

impl fmt::Display for FreqGenError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FreqGenError::InvalidArg(msg) => write!(f, "invalid argument: {msg}"),
            FreqGenError::Size(msg) => write!(f, "size error: {msg}"),
            FreqGenError::NoMem(msg) => write!(f, "no memory: {msg}"),
            FreqGenError::Hardware(msg) => write!(f, "hardware error: {msg}"),
        }
    }
}

#[cfg(feature = "std")]
impl std::error::Error for FreqGenError {}
