//! Hardware-independent engine for a multi-channel RMT-style square-wave
//! frequency generator: the frequency solver, symbol encoder, resource
//! arbiter, and generator lifecycle, plus the `ConfigStore`/`RmtBackend`
//! seams its two collaborator crates (`freqgen-hal-rp2040`,
//! `freqgen-console`) implement.
//!
//! `no_std` + `alloc`, with no heap-allocating std runtime assumed, so
//! this crate links into a bare-metal firmware image as readily as a
//! desktop binary.

#![cfg_attr(not(feature = "std"), no_std)]

extern crate alloc;

pub mod arbiter;
pub mod backend;
pub mod boot;
pub mod config;
pub mod encoder;
pub mod error;
pub mod lifecycle;
pub mod plan;
pub mod solver;

pub use arbiter::{ChannelPool, GpioPool, GpioSelector};
pub use backend::{ChannelConfig, RmtBackend};
pub use boot::auto_resume;
pub use config::{ChannelRecord, ConfigStore, TxMode, AUTOBOOT_FLAG};
pub use error::FreqGenError;
pub use lifecycle::{info, Engine, GeneratorHandle, Registry, RunState};
pub use plan::Plan;
pub use solver::F_APB;
