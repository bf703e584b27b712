//! ESP32 firmware-specific modules for klima-rs
//!
//! This crate contains hardware-specific code that cannot compile on desktop
//! targets: peripheral bring-up, WiFi join and SNTP query, the LEDC status
//! LED, and timer-based deep sleep.

#![no_std]

pub mod config;
pub mod hardware;
pub mod rgb_led;
pub mod sleep;
pub mod sntp;
pub mod time_sync;
pub mod wifi;
