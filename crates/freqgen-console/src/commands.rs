//! The console's command surface, one `clap`-derived subcommand variant
//! per verb.

use clap::{Parser, Subcommand};

#[derive(Parser, Debug)]
#[command(name = "", no_binary_name = true, disable_help_flag = false)]
pub struct Line {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Compute and print a Plan without allocating anything.
    Params {
        #[arg(short = 'f', long = "freq")]
        frequency: f64,
        #[arg(short = 'd', long = "duty", default_value_t = 0.5)]
        duty: f64,
    },
    /// Compute a Plan, allocate resources, and register the generator.
    Create {
        #[arg(short = 'f', long = "freq")]
        frequency: f64,
        #[arg(short = 'd', long = "duty", default_value_t = 0.5)]
        duty: f64,
        #[arg(short = 'g', long = "gpio")]
        gpio: Option<u32>,
    },
    /// Stop, unregister, and free one or all channels.
    Delete {
        #[arg(short = 'c', long = "channel")]
        channel: Option<u8>,
        #[arg(short = 'n', long = "nvs")]
        nvs: bool,
    },
    /// List registered generators or persisted records.
    List {
        #[arg(short = 'x', long = "extended")]
        extended: bool,
        #[arg(short = 'n', long = "nvs")]
        nvs: bool,
    },
    /// Start one or all registered generators.
    Start {
        #[arg(short = 'c', long = "channel")]
        channel: Option<u8>,
    },
    /// Stop one or all registered generators.
    Stop {
        #[arg(short = 'c', long = "channel")]
        channel: Option<u8>,
    },
    /// Persist (freq, duty, gpio) for one or all registered generators.
    Save {
        #[arg(short = 'c', long = "channel")]
        channel: Option<u8>,
    },
    /// Reload one or all persisted generators, iterating channels descending.
    Load {
        #[arg(short = 'c', long = "channel")]
        channel: Option<u8>,
    },
    /// Set or report the boot-time auto-resume flag.
    Autoload {
        #[arg(short = 'y', long = "yes")]
        yes: bool,
        #[arg(short = 'n', long = "no")]
        no: bool,
    },
    /// Exit the console.
    Exit,
    Quit,
}
