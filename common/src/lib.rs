#[cfg(feature = "logger")]
pub mod logger;

#[cfg(feature = "ip")]
pub mod ip;

#[cfg(feature = "gate")]
pub mod gate;
