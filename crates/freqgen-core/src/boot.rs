//! Boot sequence driver: the one producer allowed to populate the
//! registry/pools before the command loop begins.

use crate::arbiter::GpioSelector;
use crate::backend::RmtBackend;
use crate::config::{ConfigStore, TxMode, AUTOBOOT_FLAG};
use crate::lifecycle::Engine;

/// Runs the boot-time auto-resume sequence: if the auto-boot flag is set,
/// opens a read-only transaction, iterates channels 7->0 performing an
/// `info` + `alloc` + register equivalent to `load` followed by `start`
/// for every non-empty record, then closes the transaction.
///
/// Persistent-store errors encountered here are self-healing rather than
/// fatal: they're surfaced to the caller for logging, and the auto-boot
/// flag is reset to disabled so a corrupt or unreadable record doesn't
/// wedge every subsequent boot.
pub fn auto_resume<B, S>(engine: &mut Engine<B>, store: &mut S) -> Result<(), S::Error>
where
    B: RmtBackend,
    S: ConfigStore,
{
    let flag = match store.load_flag(AUTOBOOT_FLAG) {
        Ok(f) => f,
        Err(e) => {
            log::warn!("boot: failed to read autoboot flag, leaving auto-resume disabled");
            let _ = store.save_flag(AUTOBOOT_FLAG, 0);
            return Err(e);
        }
    };
    if flag == 0 {
        log::debug!("boot: autoboot flag clear, skipping auto-resume");
        return Ok(());
    }

    let tx = match store.begin(TxMode::ReadOnly) {
        Ok(tx) => tx,
        Err(e) => {
            log::warn!("boot: failed to open read-only transaction, disabling autoboot");
            let _ = store.save_flag(AUTOBOOT_FLAG, 0);
            return Err(e);
        }
    };

    for channel in crate::lifecycle::Registry::channels_descending() {
        let record = match store.load_record(&tx, channel) {
            Ok(r) => r,
            Err(e) => {
                log::warn!("boot: failed to read record for channel {channel}, disabling autoboot");
                let _ = store.end(tx, false);
                let _ = store.save_flag(AUTOBOOT_FLAG, 0);
                return Err(e);
            }
        };
        if record.is_empty() {
            continue;
        }
        resume_one(engine, channel, record.freq, record.duty, record.gpio);
    }

    store.end(tx, false)
}

fn resume_one<B: RmtBackend>(engine: &mut Engine<B>, channel: u8, freq: f64, duty: f64, gpio: GpioSelector) {
    let plan = match engine.info(freq, duty) {
        Ok(p) => p,
        Err(e) => {
            log::warn!("boot: channel {channel} record no longer solvable: {e}");
            return;
        }
    };
    let handle = match engine.alloc(plan, gpio) {
        Ok(h) => h,
        Err(e) => {
            log::warn!("boot: channel {channel} failed to allocate: {e}");
            return;
        }
    };
    if let Some(displaced) = engine.register(handle) {
        let _ = engine.free(displaced);
    }
    if let Err(e) = engine.start(channel) {
        log::warn!("boot: channel {channel} failed to start: {e}");
    }
}

#[cfg(test)]
mod tests {
    extern crate std;
    use super::*;
    use crate::backend::ChannelConfig;
    use crate::error::FreqGenError;
    use std::collections::BTreeMap;
    use std::vec::Vec as StdVec;

    struct SimBackend {
        memory: StdVec<StdVec<u32>>,
    }

    impl SimBackend {
        fn new() -> Self {
            Self { memory: std::vec![StdVec::new(); 8] }
        }
    }

    impl RmtBackend for SimBackend {
        fn configure(&mut self, _channel: u8, _config: ChannelConfig) -> Result<(), FreqGenError> {
            Ok(())
        }
        fn write_items(&mut self, channel: u8, items: &[u32]) -> Result<(), FreqGenError> {
            self.memory[channel as usize] = items.to_vec();
            Ok(())
        }
        fn start(&mut self, _channel: u8) -> Result<(), FreqGenError> {
            Ok(())
        }
        fn stop(&mut self, channel: u8) -> Result<(), FreqGenError> {
            if let Some(w) = self.memory[channel as usize].first_mut() {
                *w = 0;
            }
            Ok(())
        }
        fn first_word(&self, channel: u8) -> u32 {
            self.memory[channel as usize].first().copied().unwrap_or(0)
        }
        fn uninstall(&mut self, _channel: u8) -> Result<(), FreqGenError> {
            Ok(())
        }
    }

    #[derive(Debug, PartialEq, Eq)]
    struct StoreError;

    struct MapStore {
        records: BTreeMap<u8, crate::config::ChannelRecord>,
        flags: BTreeMap<std::string::String, u32>,
    }

    impl ConfigStore for MapStore {
        type Tx = ();
        type Error = StoreError;

        fn begin(&mut self, _mode: TxMode) -> Result<Self::Tx, Self::Error> {
            Ok(())
        }
        fn end(&mut self, _tx: Self::Tx, _commit: bool) -> Result<(), Self::Error> {
            Ok(())
        }
        fn load_record(&self, _tx: &Self::Tx, channel: u8) -> Result<crate::config::ChannelRecord, Self::Error> {
            Ok(self.records.get(&channel).copied().unwrap_or(crate::config::ChannelRecord::empty()))
        }
        fn save_record(&mut self, _tx: &mut Self::Tx, channel: u8, record: crate::config::ChannelRecord) -> Result<(), Self::Error> {
            self.records.insert(channel, record);
            Ok(())
        }
        fn erase_record(&mut self, channel: u8) -> Result<(), Self::Error> {
            self.records.remove(&channel);
            Ok(())
        }
        fn load_flag(&self, name: &str) -> Result<u32, Self::Error> {
            Ok(*self.flags.get(name).unwrap_or(&0))
        }
        fn save_flag(&mut self, name: &str, value: u32) -> Result<(), Self::Error> {
            self.flags.insert(name.into(), value);
            Ok(())
        }
    }

    #[test]
    fn autoload_resumes_descending_and_starts_every_persisted_channel() {
        let mut store = MapStore { records: BTreeMap::new(), flags: BTreeMap::new() };
        store.records.insert(3, crate::config::ChannelRecord { freq: 1000.0, duty: 0.5, gpio: GpioSelector::Pin(5) });
        store.records.insert(7, crate::config::ChannelRecord { freq: 1000.0, duty: 0.5, gpio: GpioSelector::Pin(6) });
        store.flags.insert(AUTOBOOT_FLAG.into(), 1);

        let mut engine = Engine::new(SimBackend::new());
        auto_resume(&mut engine, &mut store).unwrap();

        assert!(engine.registry().get(3).is_some());
        assert!(engine.registry().get(7).is_some());
        assert_eq!(engine.state(3), Some(crate::lifecycle::RunState::Busy));
        assert_eq!(engine.state(7), Some(crate::lifecycle::RunState::Busy));
    }

    #[test]
    fn flag_clear_skips_resume_entirely() {
        let mut store = MapStore { records: BTreeMap::new(), flags: BTreeMap::new() };
        store.records.insert(2, crate::config::ChannelRecord { freq: 1000.0, duty: 0.5, gpio: GpioSelector::Pin(5) });

        let mut engine = Engine::new(SimBackend::new());
        auto_resume(&mut engine, &mut store).unwrap();
        assert!(engine.registry().get(2).is_none());
    }
}
