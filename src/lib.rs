//! This crate provides an interface for communicating with and
//! controlling the EA Elektro-Automatik PS 2000 series of programmable
//! power supplies over their object-based serial telegram protocol.
//!
//! It supports `no-std` environments by use of the `no_std` feature flag.
//!
//! Example PSU model numbers which this should work with:
//! * PS 2042-06B
//! * PS 2042-10B
//! * PS 2042-20B
//! * PS 2084-03B
//! * PS 2084-05B
//! * PS 2342-10B (triple; pass nodes `[0, 1]` to address both outputs)
//!
//! The core is generic over the transport: anything implementing
//! [`embedded_io::Read`] and [`embedded_io::Write`] works, from a real
//! serial port wrapper to a mock. See `demos/psctl.rs` for wiring up the
//! `serialport` crate.
//!
//! The serial port used for PSU comms should be configured like so:
//! * Baud rate: 115200
//! * Data bits: 8
//! * Stop bits: 1
//! * Parity: Odd
//! * Read timeout: 60 ms (this also enforces the device's minimum
//!   command interval of 50 ms)

#![cfg_attr(feature = "no_std", no_std)]

pub mod error;
pub mod objects;
pub mod psu;
pub mod scaling;
pub mod telegram;
pub mod types;

#[cfg(test)]
mod mock_serial;
