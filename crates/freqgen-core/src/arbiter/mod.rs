//! Resource arbiter — GPIO pad pool and RMT-style channel pool.

pub mod channel;
pub mod gpio;

pub use channel::ChannelPool;
pub use gpio::{GpioPool, GpioSelector};
