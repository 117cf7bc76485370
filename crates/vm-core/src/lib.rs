//! Core virtual machine crate for Tiny16.
//!
//! Tiny16 is a 16-bit register machine: a fixed-size byte-addressable
//! memory, twelve named registers, and a 12-opcode instruction set with a
//! calling convention built entirely from stack pushes and pops. Hosts
//! poke bytecode into [`Memory`], wrap it in a [`Cpu`], and drive execution
//! one [`Cpu::step`] at a time.

/// Bounds-checked byte-addressable memory.
pub mod memory;
pub use memory::Memory;

/// Architectural register file.
pub mod registers;
pub use registers::{Register, RegisterFile, REGISTER_COUNT};

/// Stable one-byte opcode enumeration.
pub mod opcode;
pub use opcode::{Opcode, OPCODE_COUNT};

/// Error taxonomy for engine operations.
pub mod error;
pub use error::VmError;

/// Fetch/decode/execute engine and calling convention.
pub mod cpu;
pub use cpu::{Cpu, Instruction, StepOutcome};

#[cfg(test)]
use proptest as _;
#[cfg(test)]
use rstest as _;
