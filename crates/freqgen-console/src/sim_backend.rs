//! Software `RmtBackend`: a desktop-testable stand-in for real
//! remote-control-transmitter silicon. Every invariant that depends on
//! hardware-observable state (the terminator-as-state contract in
//! particular) is exercised against this simulator rather than a flashed
//! board.

use freqgen_core::backend::{ChannelConfig, RmtBackend};
use freqgen_core::error::FreqGenError;

#[derive(Debug, Clone, Default)]
struct SimChannel {
    configured: bool,
    config: Option<ChannelConfig>,
    memory: Vec<u32>,
}

/// In-memory peripheral: each of the 8 channels gets its own `Vec<u32>`
/// standing in for its private RMT RAM block.
pub struct SimBackend {
    channels: [SimChannel; 8],
}

impl SimBackend {
    pub fn new() -> Self {
        Self { channels: Default::default() }
    }
}

impl Default for SimBackend {
    fn default() -> Self {
        Self::new()
    }
}

impl RmtBackend for SimBackend {
    fn configure(&mut self, channel: u8, config: ChannelConfig) -> Result<(), FreqGenError> {
        let slot = self.channels.get_mut(channel as usize).ok_or(FreqGenError::InvalidArg("channel out of range"))?;
        log::debug!("sim-rmt: configuring channel {channel} ({config:?})");
        slot.configured = true;
        slot.config = Some(config);
        slot.memory.clear();
        Ok(())
    }

    fn write_items(&mut self, channel: u8, items: &[u32]) -> Result<(), FreqGenError> {
        let slot = self.channels.get_mut(channel as usize).ok_or(FreqGenError::InvalidArg("channel out of range"))?;
        if !slot.configured {
            return Err(FreqGenError::Hardware("channel not configured"));
        }
        slot.memory = items.to_vec();
        Ok(())
    }

    fn start(&mut self, channel: u8) -> Result<(), FreqGenError> {
        let slot = self.channels.get(channel as usize).ok_or(FreqGenError::InvalidArg("channel out of range"))?;
        if slot.memory.is_empty() {
            return Err(FreqGenError::Hardware("no items programmed"));
        }
        log::debug!("sim-rmt: starting channel {channel} in loop mode");
        Ok(())
    }

    fn stop(&mut self, channel: u8) -> Result<(), FreqGenError> {
        let slot = self.channels.get_mut(channel as usize).ok_or(FreqGenError::InvalidArg("channel out of range"))?;
        log::debug!("sim-rmt: stopping channel {channel}, writing terminator at offset 0");
        if let Some(word) = slot.memory.first_mut() {
            *word = 0;
        } else {
            slot.memory.push(0);
        }
        Ok(())
    }

    fn first_word(&self, channel: u8) -> u32 {
        self.channels.get(channel as usize).and_then(|s| s.memory.first().copied()).unwrap_or(0)
    }

    fn uninstall(&mut self, channel: u8) -> Result<(), FreqGenError> {
        if let Some(slot) = self.channels.get_mut(channel as usize) {
            *slot = SimChannel::default();
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stop_writes_terminator_even_on_empty_memory() {
        let mut backend = SimBackend::new();
        backend.configure(0, ChannelConfig { mem_blocks: 1, prescaler: 1, loop_enable: true, carrier_enable: false }).unwrap();
        backend.stop(0).unwrap();
        assert_eq!(backend.first_word(0), 0);
    }

    #[test]
    fn write_then_stop_clears_only_the_first_word() {
        let mut backend = SimBackend::new();
        backend.configure(0, ChannelConfig { mem_blocks: 1, prescaler: 1, loop_enable: true, carrier_enable: false }).unwrap();
        backend.write_items(0, &[0xDEAD_BEEF, 0x1234_5678]).unwrap();
        assert_eq!(backend.first_word(0), 0xDEAD_BEEF);
        backend.stop(0).unwrap();
        assert_eq!(backend.first_word(0), 0);
    }
}
