//! USB gadget network mode selection
//!
//! The gadget can expose its network link as CDC-NCM, CDC-ECM or RNDIS.
//! This module only records which one should be used; the gadget setup
//! script reads the records at boot and configures the hardware.
//!
//! Two records are kept:
//! ```text
//!   temporary  (mode_tmp.cfg)  trial override, wins while present
//!   permanent  (mode.cfg)      durable baseline
//! ```
//!
//! Use [`UsbModeRegistry`] for all reads and writes; it owns the precedence
//! and write ordering rules and serializes access to the [`ModeStore`].

pub mod registry;
pub mod store;
pub mod types;

pub use registry::UsbModeRegistry;
pub use store::{FileModeStore, MemoryModeStore, ModeStore};
pub use types::{
    mode_name, ModeSlot, UsbMode, UsbModeStatus, ABSENT_MODE_VALUE, UNKNOWN_MODE_NAME,
};

use thiserror::Error;

/// Mode registry error
#[derive(Error, Debug)]
pub enum UsbModeError {
    #[error("Invalid USB mode value: {0}")]
    InvalidMode(i32),

    #[error("Invalid USB mode '{0}', supported: cdc_ncm, cdc_ecm, rndis")]
    InvalidName(String),

    #[error("Failed to write {slot} mode record: {source}")]
    WriteFailure {
        slot: ModeSlot,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to remove {slot} mode record: {source}")]
    RemoveFailure {
        slot: ModeSlot,
        #[source]
        source: std::io::Error,
    },
}
