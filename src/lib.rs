//! usb-netmode - USB gadget network mode service
//!
//! Records which network function (CDC-NCM, CDC-ECM or RNDIS) the USB gadget
//! should expose and serves that choice over an HTTP API. Changes can be
//! trialled as a temporary override or committed permanently; the gadget
//! setup applies the effective mode on its next start.

pub mod config;
pub mod error;
pub mod state;
pub mod usb_mode;
pub mod utils;
pub mod web;

pub use error::{AppError, Result};
