//! Interactive command shell: reads lines via `rustyline`, dispatches each
//! through a `clap` derive parser, and drives a
//! [`freqgen_core::lifecycle::Engine`] wired to the in-memory
//! [`sim_backend::SimBackend`] and a JSON-backed [`store::JsonStore`].

pub mod commands;
pub mod sim_backend;
pub mod store;

use std::path::PathBuf;

use clap::Parser;
use freqgen_core::arbiter::GpioSelector;
use freqgen_core::config::{ChannelRecord, ConfigStore, TxMode, AUTOBOOT_FLAG};
use freqgen_core::error::FreqGenError;
use freqgen_core::lifecycle::{Engine, RunState};

use commands::Command;
use sim_backend::SimBackend;
use store::JsonStore;

pub fn default_store_path() -> PathBuf {
    directories::ProjectDirs::from("io", "freqgen", "freqgen-console")
        .map(|dirs| dirs.data_dir().join("freqgen.json"))
        .unwrap_or_else(|| PathBuf::from("freqgen.json"))
}

pub struct App {
    engine: Engine<SimBackend>,
    store: JsonStore,
}

impl App {
    pub fn new(store_path: PathBuf) -> Self {
        Self { engine: Engine::new(SimBackend::new()), store: JsonStore::new(store_path) }
    }

    /// Boot sequence: initialize the store (implicit — `JsonStore` is
    /// lazily created on first write), then if the auto-boot flag is set,
    /// resume every persisted channel, descending, and start it.
    pub fn boot(&mut self) {
        if let Err(e) = freqgen_core::boot::auto_resume(&mut self.engine, &mut self.store) {
            log::warn!("boot: auto-resume failed, autoboot disabled: {e}");
        }
    }

    fn channel_range(channel: Option<u8>) -> Vec<u8> {
        match channel {
            Some(c) => vec![c],
            None => (0..8).collect(),
        }
    }

    fn channel_range_descending(channel: Option<u8>) -> Vec<u8> {
        match channel {
            Some(c) => vec![c],
            None => (0..8).rev().collect(),
        }
    }

    pub fn run(&mut self, command: Command) -> Result<(), FreqGenError> {
        match command {
            Command::Params { frequency, duty } => {
                let plan = self.engine.info(frequency, duty)?;
                print_plan(frequency, &plan);
                Ok(())
            }
            Command::Create { frequency, duty, gpio } => {
                let plan = self.engine.info(frequency, duty)?;
                let selector = gpio.map(GpioSelector::Pin).unwrap_or(GpioSelector::None);
                let handle = self.engine.alloc(plan, selector)?;
                let channel = handle.channel();
                if let Some(displaced) = self.engine.register(handle) {
                    self.engine.free(displaced)?;
                }
                println!("Created generator on channel {channel:02}");
                Ok(())
            }
            Command::Delete { channel, nvs } => {
                for c in Self::channel_range(channel) {
                    self.engine.delete(c)?;
                    if nvs {
                        let _ = self.store.erase_record(c);
                    }
                }
                Ok(())
            }
            Command::List { extended, nvs } => {
                self.list(extended, nvs);
                Ok(())
            }
            Command::Start { channel } => {
                for c in Self::channel_range(channel) {
                    if self.engine.registry().get(c).is_some() {
                        self.engine.start(c)?;
                    }
                }
                Ok(())
            }
            Command::Stop { channel } => {
                for c in Self::channel_range(channel) {
                    if self.engine.registry().get(c).is_some() {
                        self.engine.stop(c)?;
                    }
                }
                Ok(())
            }
            Command::Save { channel } => {
                let mut tx = self.store.begin(TxMode::ReadWrite).map_err(|_| FreqGenError::Hardware("store error"))?;
                for c in Self::channel_range(channel) {
                    if let Some(handle) = self.engine.registry().get(c) {
                        let record = ChannelRecord { freq: handle.plan().freq_actual, duty: handle.plan().duty_actual, gpio: GpioSelector::Pin(handle.gpio()) };
                        let _ = self.store.save_record(&mut tx, c, record);
                    }
                }
                self.store.end(tx, true).map_err(|_| FreqGenError::Hardware("store error"))?;
                Ok(())
            }
            Command::Load { channel } => {
                let tx = self.store.begin(TxMode::ReadOnly).map_err(|_| FreqGenError::Hardware("store error"))?;
                for c in Self::channel_range_descending(channel) {
                    let record = self.store.load_record(&tx, c).map_err(|_| FreqGenError::Hardware("store error"))?;
                    if record.is_empty() {
                        continue;
                    }
                    // `load` always replaces an existing occupant even if
                    // its configuration is identical — see DESIGN.md.
                    self.engine.delete(c)?;
                    let plan = self.engine.info(record.freq, record.duty)?;
                    let handle = self.engine.alloc(plan, record.gpio)?;
                    self.engine.register(handle);
                }
                self.store.end(tx, false).map_err(|_| FreqGenError::Hardware("store error"))?;
                Ok(())
            }
            Command::Autoload { yes, no } => {
                if yes && no {
                    return Err(FreqGenError::InvalidArg("--yes and --no are mutually exclusive"));
                }
                if yes || no {
                    self.store.save_flag(AUTOBOOT_FLAG, if yes { 1 } else { 0 }).map_err(|_| FreqGenError::Hardware("store error"))?;
                } else {
                    let flag = self.store.load_flag(AUTOBOOT_FLAG).unwrap_or(0);
                    println!("autoload: {}", if flag != 0 { "yes" } else { "no" });
                }
                Ok(())
            }
            Command::Exit | Command::Quit => {
                std::process::exit(0);
            }
        }
    }

    fn list(&mut self, extended: bool, nvs: bool) {
        if nvs {
            self.list_nvs();
            return;
        }
        for handle in self.engine.registry().iter() {
            let channel = handle.channel();
            let state = match self.engine.state(channel) {
                Some(RunState::Busy) => "started",
                Some(RunState::Idle) => "stopped",
                None => "uninit",
            };
            let plan = handle.plan();
            print!(
                "Channel: {channel:02} [{state}]\tGPIO: {:02}\tFreq.: {:.2} Hz\tDC.: {:.0}%\tBlocks: {}",
                handle.gpio(),
                plan.freq_actual,
                100.0 * plan.duty_actual,
                plan.mem_blocks
            );
            if extended {
                print!("\tPrescaler: {}\tNrep: {}\tJitter: {:.3e}s", plan.prescaler, plan.nrep, plan.jitter_seconds);
            }
            println!();
        }
    }

    fn list_nvs(&mut self) {
        let Ok(tx) = self.store.begin(TxMode::ReadOnly) else {
            println!("failed to open config store");
            return;
        };
        for c in 0..8u8 {
            let Ok(record) = self.store.load_record(&tx, c) else { continue };
            if record.is_empty() {
                continue;
            }
            let gpio = match record.gpio {
                GpioSelector::Pin(p) => p,
                GpioSelector::None => 0,
            };
            println!("Channel: {c:02} [nvs]\tGPIO: {gpio:02}\tFreq.: {:.2} Hz\tDC.: {:.0}%\tBlocks: 0", record.freq, 100.0 * record.duty);
        }
        let _ = self.store.end(tx, false);
    }

    /// Whether `channel` currently has a registered generator. Exposed for
    /// integration tests driving the REPL surface end to end.
    pub fn channel_occupied(&self, channel: u8) -> bool {
        self.engine.registry().get(channel).is_some()
    }

    /// The run state of a registered channel, if any. Exposed for tests.
    pub fn channel_state(&self, channel: u8) -> Option<RunState> {
        self.engine.state(channel)
    }
}

fn print_plan(requested: f64, plan: &freqgen_core::plan::Plan) {
    println!(
        "Freq.: {:.2} Hz (requested)\tActual: {:.2} Hz\tDC.: {:.0}%\tPrescaler: {}\tN: {}\tBlocks: {}\tJitter: {:.3e}s",
        requested,
        plan.freq_actual,
        100.0 * plan.duty_actual,
        plan.prescaler,
        plan.n(),
        plan.mem_blocks,
        plan.jitter_seconds
    );
}

/// Splits an interactive line into whitespace-separated tokens (no quoting
/// support), then dispatches it through the `clap`-derived command
/// surface.
pub fn dispatch(app: &mut App, line: &str) {
    let line = line.trim();
    if line.is_empty() {
        return;
    }
    let tokens: Vec<&str> = line.split_whitespace().collect();
    match commands::Line::try_parse_from(tokens.iter().copied()) {
        Err(e) if matches!(e.kind(), clap::error::ErrorKind::InvalidSubcommand | clap::error::ErrorKind::UnknownArgument) => {
            println!("Unrecognized command");
        }
        Err(e) => {
            // Malformed arguments for a known command.
            print!("{e}");
        }
        Ok(parsed) => match app.run(parsed.command) {
            Ok(()) => {}
            Err(e) => println!("Command returned non-zero error code: {e}"),
        },
    }
}
