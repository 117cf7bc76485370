//! Architectural register file for the Tiny16 core.

use crate::error::VmError;

/// Number of architectural registers.
pub const REGISTER_COUNT: usize = 12;

/// Architectural register identifier.
///
/// The discriminant is the register's position in the canonical name list;
/// its byte offset into the 24-byte register store is `index * 2`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
#[repr(u8)]
#[allow(missing_docs)]
pub enum Register {
    Ip = 0,
    Acc = 1,
    R1 = 2,
    R2 = 3,
    R3 = 4,
    R4 = 5,
    R5 = 6,
    R6 = 7,
    R7 = 8,
    R8 = 9,
    Sp = 10,
    Fp = 11,
}

impl Register {
    /// Ordered list of all architectural registers.
    pub const ALL: [Self; REGISTER_COUNT] = [
        Self::Ip,
        Self::Acc,
        Self::R1,
        Self::R2,
        Self::R3,
        Self::R4,
        Self::R5,
        Self::R6,
        Self::R7,
        Self::R8,
        Self::Sp,
        Self::Fp,
    ];

    /// General-purpose registers saved and restored by the calling
    /// convention, in push order.
    pub const GENERAL: [Self; 8] = [
        Self::R1,
        Self::R2,
        Self::R3,
        Self::R4,
        Self::R5,
        Self::R6,
        Self::R7,
        Self::R8,
    ];

    /// Returns the array index for this register (`0..=11`).
    #[must_use]
    pub const fn index(self) -> usize {
        self as usize
    }

    /// Returns the byte offset of this register within the 24-byte store.
    #[must_use]
    pub const fn offset(self) -> usize {
        self.index() * 2
    }

    /// Returns the operand byte that encodes this register in bytecode.
    #[must_use]
    pub const fn operand(self) -> u8 {
        self as u8
    }

    /// Decodes an index into an architectural register.
    #[must_use]
    pub const fn from_index(index: u8) -> Option<Self> {
        match index {
            0 => Some(Self::Ip),
            1 => Some(Self::Acc),
            2 => Some(Self::R1),
            3 => Some(Self::R2),
            4 => Some(Self::R3),
            5 => Some(Self::R4),
            6 => Some(Self::R5),
            7 => Some(Self::R6),
            8 => Some(Self::R7),
            9 => Some(Self::R8),
            10 => Some(Self::Sp),
            11 => Some(Self::Fp),
            _ => None,
        }
    }

    /// Decodes a raw operand byte, reducing it modulo the register count.
    ///
    /// Out-of-range index bytes wrap rather than error; this is the wire
    /// format's documented behavior and is preserved as-is.
    #[must_use]
    pub const fn from_operand(byte: u8) -> Self {
        #[allow(clippy::cast_possible_truncation)]
        let index = byte % (REGISTER_COUNT as u8);
        match Self::from_index(index) {
            Some(register) => register,
            // Unreachable: index is always < REGISTER_COUNT after reduction.
            None => Self::Ip,
        }
    }

    /// Resolves a register name from the canonical name list.
    #[must_use]
    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL
            .iter()
            .copied()
            .find(|register| register.name() == name)
    }

    /// Returns the canonical lowercase name of this register.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Ip => "ip",
            Self::Acc => "acc",
            Self::R1 => "r1",
            Self::R2 => "r2",
            Self::R3 => "r3",
            Self::R4 => "r4",
            Self::R5 => "r5",
            Self::R6 => "r6",
            Self::R7 => "r7",
            Self::R8 => "r8",
            Self::Sp => "sp",
            Self::Fp => "fp",
        }
    }
}

/// Fixed set of named 16-bit registers.
///
/// All values are unsigned 16-bit and wrap modulo 65536; `sp` and `fp`
/// start two bytes below the top of memory (the stack grows toward
/// address 0) and everything else starts at 0.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
pub struct RegisterFile {
    words: [u16; REGISTER_COUNT],
}

impl RegisterFile {
    /// Creates a register file for a memory of `memory_len` bytes.
    #[must_use]
    pub fn new(memory_len: usize) -> Self {
        let stack_origin = u16::try_from(memory_len.saturating_sub(2)).unwrap_or(u16::MAX - 1);

        let mut words = [0; REGISTER_COUNT];
        words[Register::Sp.index()] = stack_origin;
        words[Register::Fp.index()] = stack_origin;
        Self { words }
    }

    /// Reads a register.
    #[must_use]
    pub const fn get(&self, register: Register) -> u16 {
        self.words[register.index()]
    }

    /// Writes a register.
    pub const fn set(&mut self, register: Register, value: u16) {
        self.words[register.index()] = value;
    }

    /// Reads a register by name.
    ///
    /// # Errors
    ///
    /// Returns [`VmError::InvalidRegister`] when `name` is not one of the
    /// twelve recognized names.
    pub fn get_named(&self, name: &str) -> Result<u16, VmError> {
        let register = Register::from_name(name).ok_or_else(|| VmError::InvalidRegister {
            name: name.to_string(),
        })?;
        Ok(self.get(register))
    }

    /// Writes a register by name.
    ///
    /// # Errors
    ///
    /// Returns [`VmError::InvalidRegister`] when `name` is not one of the
    /// twelve recognized names.
    pub fn set_named(&mut self, name: &str, value: u16) -> Result<(), VmError> {
        let register = Register::from_name(name).ok_or_else(|| VmError::InvalidRegister {
            name: name.to_string(),
        })?;
        self.set(register, value);
        Ok(())
    }
}
