//! WebAssembly bindings for the libz80 emulator.
//!
//! This module provides JavaScript-callable interfaces to the Z80 engine,
//! assembler and disassembler for browser front panels.

pub mod api;

pub use api::EmulatorZ80;
