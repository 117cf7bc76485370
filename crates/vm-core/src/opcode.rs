//! Stable one-byte opcode enumeration for the Tiny16 instruction set.

/// Number of defined opcodes.
pub const OPCODE_COUNT: usize = 12;

/// One-byte opcode values shared by everything that writes bytecode and the
/// engine that decodes it.
///
/// The discriminants are the wire values; any byte not listed here decodes
/// to nothing (see [`crate::cpu::StepOutcome::UnknownOpcode`]).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
#[repr(u8)]
pub enum Opcode {
    /// `reg := lit16`
    MovLitReg = 0x10,
    /// `dst := src`
    MovRegReg = 0x11,
    /// `memory[addr16] := src`
    MovRegMem = 0x12,
    /// `dst := memory[addr16]`
    MovMemReg = 0x13,
    /// `acc := (a + b) mod 65536`
    AddRegReg = 0x14,
    /// `if lit16 != acc { ip := addr16 }`
    JmpNotEq = 0x15,
    /// Push a literal word.
    PshLit = 0x17,
    /// Push a register's value.
    PshReg = 0x18,
    /// Pop into a register.
    Pop = 0x1A,
    /// Save state and jump to a literal address.
    CalLit = 0x5E,
    /// Save state and jump to an address held in a register.
    CalReg = 0x5F,
    /// Restore state saved by the matching call.
    Ret = 0x60,
}

impl Opcode {
    /// Ordered list of all defined opcodes.
    pub const ALL: [Self; OPCODE_COUNT] = [
        Self::MovLitReg,
        Self::MovRegReg,
        Self::MovRegMem,
        Self::MovMemReg,
        Self::AddRegReg,
        Self::JmpNotEq,
        Self::PshLit,
        Self::PshReg,
        Self::Pop,
        Self::CalLit,
        Self::CalReg,
        Self::Ret,
    ];

    /// Returns the stable wire byte for this opcode.
    #[must_use]
    pub const fn as_u8(self) -> u8 {
        self as u8
    }

    /// Decodes a wire byte into an opcode.
    ///
    /// `None` means the byte matches no defined instruction.
    #[must_use]
    pub const fn from_u8(byte: u8) -> Option<Self> {
        match byte {
            0x10 => Some(Self::MovLitReg),
            0x11 => Some(Self::MovRegReg),
            0x12 => Some(Self::MovRegMem),
            0x13 => Some(Self::MovMemReg),
            0x14 => Some(Self::AddRegReg),
            0x15 => Some(Self::JmpNotEq),
            0x17 => Some(Self::PshLit),
            0x18 => Some(Self::PshReg),
            0x1A => Some(Self::Pop),
            0x5E => Some(Self::CalLit),
            0x5F => Some(Self::CalReg),
            0x60 => Some(Self::Ret),
            _ => None,
        }
    }

    /// Returns the assembly mnemonic for this opcode.
    #[must_use]
    pub const fn mnemonic(self) -> &'static str {
        match self {
            Self::MovLitReg => "mov_lit_reg",
            Self::MovRegReg => "mov_reg_reg",
            Self::MovRegMem => "mov_reg_mem",
            Self::MovMemReg => "mov_mem_reg",
            Self::AddRegReg => "add_reg_reg",
            Self::JmpNotEq => "jmp_not_eq",
            Self::PshLit => "psh_lit",
            Self::PshReg => "psh_reg",
            Self::Pop => "pop",
            Self::CalLit => "cal_lit",
            Self::CalReg => "cal_reg",
            Self::Ret => "ret",
        }
    }

    /// Returns the number of operand bytes that follow this opcode in the
    /// instruction stream.
    #[must_use]
    pub const fn operand_bytes(self) -> usize {
        match self {
            Self::MovLitReg | Self::MovMemReg => 3,
            Self::MovRegReg | Self::AddRegReg => 2,
            Self::MovRegMem => 3,
            Self::JmpNotEq => 4,
            Self::PshLit | Self::CalLit => 2,
            Self::PshReg | Self::Pop | Self::CalReg => 1,
            Self::Ret => 0,
        }
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashSet;

    use super::{Opcode, OPCODE_COUNT};

    #[test]
    fn wire_bytes_round_trip_for_every_opcode() {
        assert_eq!(Opcode::ALL.len(), OPCODE_COUNT);

        for opcode in Opcode::ALL {
            assert_eq!(Opcode::from_u8(opcode.as_u8()), Some(opcode));
        }
    }

    #[test]
    fn wire_bytes_are_distinct() {
        let bytes: HashSet<u8> = Opcode::ALL.iter().map(|opcode| opcode.as_u8()).collect();
        assert_eq!(bytes.len(), OPCODE_COUNT);
    }

    #[test]
    fn gaps_in_the_value_range_decode_to_nothing() {
        assert_eq!(Opcode::from_u8(0x00), None);
        assert_eq!(Opcode::from_u8(0x0F), None);
        assert_eq!(Opcode::from_u8(0x16), None);
        assert_eq!(Opcode::from_u8(0x19), None);
        assert_eq!(Opcode::from_u8(0x5D), None);
        assert_eq!(Opcode::from_u8(0x61), None);
        assert_eq!(Opcode::from_u8(0xFF), None);
    }

    #[test]
    fn operand_widths_match_the_declared_shapes() {
        assert_eq!(Opcode::MovLitReg.operand_bytes(), 3);
        assert_eq!(Opcode::JmpNotEq.operand_bytes(), 4);
        assert_eq!(Opcode::Ret.operand_bytes(), 0);
    }

    #[test]
    fn mnemonics_are_distinct() {
        let names: HashSet<&str> = Opcode::ALL.iter().map(|opcode| opcode.mnemonic()).collect();
        assert_eq!(names.len(), OPCODE_COUNT);
    }
}
