#![no_std]
#![no_main]

use core::mem::MaybeUninit;

use embedded_alloc::Heap;
use freqgen_core::arbiter::GpioSelector;
use freqgen_core::config::{ChannelRecord, ConfigStore, TxMode};
use freqgen_core::error::FreqGenError;
use freqgen_core::lifecycle::Engine;
use rp2040_hal::clocks::init_clocks_and_plls;
use rp2040_hal::pac;
use rp2040_hal::Sio;
use rp2040_hal::Watchdog;

use freqgen_hal_rp2040::PicoRmtBackend;

use panic_probe as _;

#[link_section = ".boot2"]
#[used]
pub static BOOT2: [u8; 256] = rp2040_boot2::BOOT_LOADER_GENERIC_03H;

const XTAL_FREQ_HZ: u32 = 12_000_000u32;

#[global_allocator]
static HEAP: Heap = Heap::empty();

/// No on-target flash partitioning scheme is wired up yet, so persisted
/// auto-resume configuration isn't available on this target: `ConfigStore`
/// is left as a fully typed, deliberately unimplemented stub rather than a
/// silent gap (see DESIGN.md). A follow-up could back this with
/// `embedded-storage` over a reserved flash region the way `rp2040-hal`'s
/// own flash examples do.
struct UnsupportedStore;

impl ConfigStore for UnsupportedStore {
    type Tx = ();
    type Error = FreqGenError;

    fn begin(&mut self, _mode: TxMode) -> Result<Self::Tx, Self::Error> {
        todo!("no flash-backed ConfigStore is wired up for this target yet")
    }
    fn end(&mut self, _tx: Self::Tx, _commit: bool) -> Result<(), Self::Error> {
        todo!()
    }
    fn load_record(&self, _tx: &Self::Tx, _channel: u8) -> Result<ChannelRecord, Self::Error> {
        todo!()
    }
    fn save_record(&mut self, _tx: &mut Self::Tx, _channel: u8, _record: ChannelRecord) -> Result<(), Self::Error> {
        todo!()
    }
    fn erase_record(&mut self, _channel: u8) -> Result<(), Self::Error> {
        todo!()
    }
    fn load_flag(&self, _name: &str) -> Result<u32, Self::Error> {
        todo!()
    }
    fn save_flag(&mut self, _name: &str, _value: u32) -> Result<(), Self::Error> {
        todo!()
    }
}

#[rp2040_hal::entry]
fn main() -> ! {
    {
        const HEAP_SIZE: usize = 8 * 1024;
        static mut HEAP_MEM: [MaybeUninit<u8>; HEAP_SIZE] = [MaybeUninit::uninit(); HEAP_SIZE];
        unsafe { HEAP.init(HEAP_MEM.as_ptr() as usize, HEAP_SIZE) }
    }

    let mut pac = pac::Peripherals::take().unwrap();
    let mut watchdog = Watchdog::new(pac.WATCHDOG);
    let _clocks = init_clocks_and_plls(
        XTAL_FREQ_HZ,
        pac.XOSC,
        pac.CLOCKS,
        pac.PLL_SYS,
        pac.PLL_USB,
        &mut pac.RESETS,
        &mut watchdog,
    )
    .ok()
    .unwrap();

    let sio = Sio::new(pac.SIO);
    let _pins = rp2040_hal::gpio::Pins::new(pac.IO_BANK0, pac.PADS_BANK0, sio.gpio_bank0, &mut pac.RESETS);

    let backend = PicoRmtBackend::new(freqgen_hal_rp2040::claim_lanes(pac.PIO0, pac.PIO1, pac.DMA, &mut pac.RESETS));
    let mut engine = Engine::new(backend);

    // No persisted auto-resume configuration exists on this target yet
    // (see `UnsupportedStore`), so boot straight to a single fixed demo
    // channel: 1 kHz, 50% duty, on the pool's first managed pad.
    if let Ok(plan) = engine.info(1_000.0, 0.5) {
        if let Ok(handle) = engine.alloc(plan, GpioSelector::None) {
            let channel = handle.channel();
            engine.register(handle);
            let _ = engine.start(channel);
        }
    }

    defmt::info!("freqgen-rp2040 running");
    loop {
        cortex_m::asm::wfi();
    }
}
