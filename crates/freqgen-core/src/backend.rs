//! The peripheral seam: everything the engine needs from a remote-control
//! transmitter-style peripheral — independent of whether that's real RMT
//! silicon, a PIO state machine wired up by `freqgen-hal-rp2040`, or the
//! in-memory simulator `freqgen-console` tests against — is captured here
//! as a small set of methods returning one crate-local error type, rather
//! than exposing register-level detail to callers.

use crate::error::FreqGenError;

/// One peripheral channel's configuration, applied once per `alloc`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChannelConfig {
    pub mem_blocks: u8,
    pub prescaler: u8,
    pub loop_enable: bool,
    pub carrier_enable: bool,
}

/// Hardware contract the engine drives. A channel index is always in
/// `0..8` and always the *primary* channel of whichever generator owns it
/// (chained neighbor blocks are addressed implicitly by `mem_blocks`).
///
/// Implementors own the actual peripheral-local memory; the engine never
/// reads or writes it directly except through `write_items`/`first_word`.
pub trait RmtBackend {
    /// Install/configure the driver for `channel`. Must leave the channel
    /// stopped with its completion interrupt masked.
    fn configure(&mut self, channel: u8, config: ChannelConfig) -> Result<(), FreqGenError>;

    /// Copy `items` (already 32-bit-packed, terminator included) into the
    /// channel's peripheral-local memory starting at offset 0.
    fn write_items(&mut self, channel: u8, items: &[u32]) -> Result<(), FreqGenError>;

    /// Issue the start command in looping mode.
    fn start(&mut self, channel: u8) -> Result<(), FreqGenError>;

    /// Issue the stop command. Implementations must write a zero word at
    /// offset 0 of the channel's memory as a side effect — the
    /// terminator-as-state contract below depends on it.
    fn stop(&mut self, channel: u8) -> Result<(), FreqGenError>;

    /// The first 32-bit word currently in `channel`'s peripheral memory.
    /// Used by [`crate::lifecycle::Engine::state`]: non-zero means busy.
    /// Never read the peripheral's own start/run bit for this — it
    /// auto-clears at the end of the first loop iteration.
    fn first_word(&self, channel: u8) -> u32;

    /// Tear down the driver instance for `channel`, releasing whatever
    /// peripheral-local resources `configure` claimed.
    fn uninstall(&mut self, channel: u8) -> Result<(), FreqGenError>;
}
