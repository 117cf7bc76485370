//! Text renderings of machine state for the monitor's output.

use std::fmt::Write;

use vm_core::{Cpu, Register, VmError};

/// Renders every register as one `name: 0xNNNN` line.
#[must_use]
pub fn format_registers(cpu: &Cpu) -> String {
    let mut out = String::new();
    for register in Register::ALL {
        let value = cpu.registers().get(register);
        // Infallible for String targets.
        let _ = writeln!(out, "{}: {value:#06x}", register.name());
    }
    out
}

/// Renders `count` bytes starting at `addr` as a single hex-dump line.
///
/// # Errors
///
/// Returns [`VmError::OutOfBounds`] when the requested range does not fit
/// in memory.
pub fn format_memory(cpu: &Cpu, addr: u16, count: usize) -> Result<String, VmError> {
    let bytes = cpu.memory().view(addr, count)?;

    let mut out = format!("{addr:#06x}:");
    for byte in bytes {
        let _ = write!(out, " {byte:#04x}");
    }
    Ok(out)
}
