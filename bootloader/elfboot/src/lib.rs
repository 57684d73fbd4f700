//! Second-stage loader core: pulls an ELF kernel off raw disk sectors,
//! places each program segment at its physical address, and jumps to the
//! kernel entry point.
//!
//! Everything that touches hardware goes through the capabilities in
//! [`port`], [`memory`], and [`loader::Trampoline`], so the same code runs in
//! the boot binary and in hosted tests.

#![cfg_attr(not(test), no_std)]

#[cfg(any(test, feature = "mock"))]
extern crate alloc;

pub mod ata;
pub mod config;
pub mod disk;
pub mod elf;
pub mod error;
pub mod gdt;
pub mod loader;
pub mod memory;
pub mod port;

#[cfg(any(test, feature = "mock"))]
pub mod mock;

pub use error::LoadError;
