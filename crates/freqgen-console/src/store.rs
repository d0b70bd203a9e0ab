//! JSON-backed `ConfigStore`: a desktop-friendly stand-in for a flash-
//! resident key-value namespace. Its transaction contract (`begin`/`end`
//! bracketing a batch of record reads/writes, committed or rolled back as
//! a whole) maps onto reading the whole file into memory at `begin` and
//! conditionally rewriting it at `end`, guarded by an in-process mutex
//! standing in for a real partition's own per-handle serialization.

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use freqgen_core::arbiter::GpioSelector;
use freqgen_core::config::{ChannelRecord, ConfigStore, TxMode};
use serde::{Deserialize, Serialize};

#[derive(Debug, Serialize, Deserialize, Clone, Copy, Default)]
struct StoredRecord {
    freq: f64,
    duty: f64,
    /// `None` mirrors `GpioSelector::None`; `Some(pin)` mirrors `GpioSelector::Pin(pin)`.
    gpio: Option<u32>,
}

impl From<ChannelRecord> for StoredRecord {
    fn from(r: ChannelRecord) -> Self {
        let gpio = match r.gpio {
            GpioSelector::None => None,
            GpioSelector::Pin(p) => Some(p),
        };
        Self { freq: r.freq, duty: r.duty, gpio }
    }
}

impl From<StoredRecord> for ChannelRecord {
    fn from(r: StoredRecord) -> Self {
        let gpio = match r.gpio {
            None => GpioSelector::None,
            Some(p) => GpioSelector::Pin(p),
        };
        ChannelRecord { freq: r.freq, duty: r.duty, gpio }
    }
}

#[derive(Debug, Serialize, Deserialize, Default)]
struct FileContents {
    /// Keyed by channel number (0-7).
    records: BTreeMap<u8, StoredRecord>,
    flags: BTreeMap<String, u32>,
}

/// An open transaction: the file contents read at `begin`, mutated
/// in-place by `save_record`/`load_record`, and written back (or
/// discarded) at `end`.
pub struct Tx {
    mode: TxMode,
    contents: FileContents,
}

/// A single JSON file namespace, guarded the way a real flash partition
/// serializes concurrent opens — here, one in-process mutex since this
/// crate is single-threaded at the command loop.
pub struct JsonStore {
    path: PathBuf,
    lock: Mutex<()>,
}

impl JsonStore {
    pub fn new(path: impl AsRef<Path>) -> Self {
        Self { path: path.as_ref().to_path_buf(), lock: Mutex::new(()) }
    }

    fn read(&self) -> FileContents {
        fs::read_to_string(&self.path)
            .ok()
            .and_then(|s| serde_json::from_str(&s).ok())
            .unwrap_or_default()
    }

    fn write(&self, contents: &FileContents) -> std::io::Result<()> {
        let json = serde_json::to_string_pretty(contents).expect("FileContents always serializes");
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(&self.path, json)
    }
}

impl ConfigStore for JsonStore {
    type Tx = Tx;
    type Error = anyhow::Error;

    fn begin(&mut self, mode: TxMode) -> Result<Tx, Self::Error> {
        let _guard = self.lock.lock().expect("store mutex poisoned");
        Ok(Tx { mode, contents: self.read() })
    }

    fn end(&mut self, tx: Tx, commit: bool) -> Result<(), Self::Error> {
        let _guard = self.lock.lock().expect("store mutex poisoned");
        if commit && tx.mode == TxMode::ReadWrite {
            self.write(&tx.contents)?;
        }
        Ok(())
    }

    fn load_record(&self, tx: &Tx, channel: u8) -> Result<ChannelRecord, Self::Error> {
        Ok(tx.contents.records.get(&channel).copied().map(ChannelRecord::from).unwrap_or(ChannelRecord::empty()))
    }

    fn save_record(&mut self, tx: &mut Tx, channel: u8, record: ChannelRecord) -> Result<(), Self::Error> {
        tx.contents.records.insert(channel, record.into());
        Ok(())
    }

    fn erase_record(&mut self, channel: u8) -> Result<(), Self::Error> {
        let _guard = self.lock.lock().expect("store mutex poisoned");
        let mut contents = self.read();
        contents.records.remove(&channel);
        self.write(&contents)?;
        Ok(())
    }

    fn load_flag(&self, name: &str) -> Result<u32, Self::Error> {
        let _guard = self.lock.lock().expect("store mutex poisoned");
        Ok(self.read().flags.get(name).copied().unwrap_or(0))
    }

    fn save_flag(&mut self, name: &str, value: u32) -> Result<(), Self::Error> {
        let _guard = self.lock.lock().expect("store mutex poisoned");
        let mut contents = self.read();
        contents.flags.insert(name.to_string(), value);
        self.write(&contents)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use freqgen_core::config::AUTOBOOT_FLAG;

    #[test]
    fn round_trips_a_record_through_a_committed_transaction() {
        let dir = tempfile::tempdir().unwrap();
        let mut store = JsonStore::new(dir.path().join("freqgen.json"));

        let mut tx = store.begin(TxMode::ReadWrite).unwrap();
        let record = ChannelRecord { freq: 440.0, duty: 0.5, gpio: GpioSelector::Pin(18) };
        store.save_record(&mut tx, 3, record).unwrap();
        store.end(tx, true).unwrap();

        let tx = store.begin(TxMode::ReadOnly).unwrap();
        let loaded = store.load_record(&tx, 3).unwrap();
        assert_eq!(loaded, record);
        store.end(tx, false).unwrap();
    }

    #[test]
    fn uncommitted_transaction_leaves_no_trace() {
        let dir = tempfile::tempdir().unwrap();
        let mut store = JsonStore::new(dir.path().join("freqgen.json"));

        let mut tx = store.begin(TxMode::ReadWrite).unwrap();
        store.save_record(&mut tx, 1, ChannelRecord { freq: 100.0, duty: 0.5, gpio: GpioSelector::None }).unwrap();
        store.end(tx, false).unwrap();

        let tx = store.begin(TxMode::ReadOnly).unwrap();
        assert!(store.load_record(&tx, 1).unwrap().is_empty());
    }

    #[test]
    fn missing_channel_reports_empty() {
        let dir = tempfile::tempdir().unwrap();
        let store = JsonStore::new(dir.path().join("freqgen.json"));
        let mut store = store;
        let tx = store.begin(TxMode::ReadOnly).unwrap();
        assert!(store.load_record(&tx, 5).unwrap().is_empty());
    }

    #[test]
    fn autoboot_flag_persists_across_stores() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("freqgen.json");
        let mut store = JsonStore::new(&path);
        store.save_flag(AUTOBOOT_FLAG, 1).unwrap();

        let store2 = JsonStore::new(&path);
        assert_eq!(store2.load_flag(AUTOBOOT_FLAG).unwrap(), 1);
    }
}
