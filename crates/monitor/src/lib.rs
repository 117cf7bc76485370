//! Host harness library for the Tiny16 virtual machine.
//!
//! Provides the bytecode program builder used to hand-assemble images, the
//! bundled demonstration program, and the register/memory dump formatting
//! consumed by the `tiny16-mon` binary.

/// Bytecode program builder and the bundled demonstration program.
pub mod program;
pub use program::{demo_program, ProgramBuilder, DEMO_SUBROUTINE_ADDR};

/// Register and memory dump formatting.
pub mod dump;
pub use dump::{format_memory, format_registers};

#[cfg(test)]
use tempfile as _;
