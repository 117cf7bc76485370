//! Hand-assembled bytecode images.
//!
//! Programs are raw bytes written at absolute addresses; there is no
//! loader, header, or relocation. The builder grows its image on demand so
//! code can be placed anywhere in the address space.

use vm_core::{Opcode, Register};

/// Address of the demonstration program's subroutine.
pub const DEMO_SUBROUTINE_ADDR: u16 = 0x3000;

/// Cursor-positioned writer that assembles bytecode at absolute addresses.
#[derive(Debug, Default, Clone)]
pub struct ProgramBuilder {
    bytes: Vec<u8>,
    cursor: usize,
}

impl ProgramBuilder {
    /// Creates an empty builder with the cursor at address 0.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Moves the cursor to an absolute address.
    pub fn at(&mut self, addr: u16) -> &mut Self {
        self.cursor = usize::from(addr);
        self
    }

    /// Returns the assembled image, sized to the highest written byte.
    #[must_use]
    pub fn into_bytes(self) -> Vec<u8> {
        self.bytes
    }

    fn emit_byte(&mut self, byte: u8) -> &mut Self {
        if self.cursor >= self.bytes.len() {
            self.bytes.resize(self.cursor + 1, 0);
        }
        self.bytes[self.cursor] = byte;
        self.cursor += 1;
        self
    }

    fn emit_word(&mut self, word: u16) -> &mut Self {
        let [hi, lo] = word.to_be_bytes();
        self.emit_byte(hi).emit_byte(lo)
    }

    fn emit_register(&mut self, register: Register) -> &mut Self {
        self.emit_byte(register.operand())
    }

    /// `dst := value`
    pub fn mov_lit_reg(&mut self, value: u16, dst: Register) -> &mut Self {
        self.emit_byte(Opcode::MovLitReg.as_u8())
            .emit_word(value)
            .emit_register(dst)
    }

    /// `dst := src`
    pub fn mov_reg_reg(&mut self, src: Register, dst: Register) -> &mut Self {
        self.emit_byte(Opcode::MovRegReg.as_u8())
            .emit_register(src)
            .emit_register(dst)
    }

    /// `memory[addr] := src`
    pub fn mov_reg_mem(&mut self, src: Register, addr: u16) -> &mut Self {
        self.emit_byte(Opcode::MovRegMem.as_u8())
            .emit_register(src)
            .emit_word(addr)
    }

    /// `dst := memory[addr]`
    pub fn mov_mem_reg(&mut self, addr: u16, dst: Register) -> &mut Self {
        self.emit_byte(Opcode::MovMemReg.as_u8())
            .emit_word(addr)
            .emit_register(dst)
    }

    /// `acc := lhs + rhs`
    pub fn add_reg_reg(&mut self, lhs: Register, rhs: Register) -> &mut Self {
        self.emit_byte(Opcode::AddRegReg.as_u8())
            .emit_register(lhs)
            .emit_register(rhs)
    }

    /// `if value != acc { ip := target }`
    pub fn jmp_not_eq(&mut self, value: u16, target: u16) -> &mut Self {
        self.emit_byte(Opcode::JmpNotEq.as_u8())
            .emit_word(value)
            .emit_word(target)
    }

    /// Push a literal word.
    pub fn psh_lit(&mut self, value: u16) -> &mut Self {
        self.emit_byte(Opcode::PshLit.as_u8()).emit_word(value)
    }

    /// Push a register's value.
    pub fn psh_reg(&mut self, src: Register) -> &mut Self {
        self.emit_byte(Opcode::PshReg.as_u8()).emit_register(src)
    }

    /// Pop into a register.
    pub fn pop(&mut self, dst: Register) -> &mut Self {
        self.emit_byte(Opcode::Pop.as_u8()).emit_register(dst)
    }

    /// Save state and jump to a literal address.
    pub fn cal_lit(&mut self, target: u16) -> &mut Self {
        self.emit_byte(Opcode::CalLit.as_u8()).emit_word(target)
    }

    /// Save state and jump to an address held in a register.
    pub fn cal_reg(&mut self, src: Register) -> &mut Self {
        self.emit_byte(Opcode::CalReg.as_u8()).emit_register(src)
    }

    /// Return from a subroutine.
    pub fn ret(&mut self) -> &mut Self {
        self.emit_byte(Opcode::Ret.as_u8())
    }
}

/// Builds the bundled demonstration program.
///
/// The main routine pushes three literals and an argument count of zero,
/// seeds `r1`/`r4`, and calls the subroutine at [`DEMO_SUBROUTINE_ADDR`],
/// which pushes temporaries and clobbers `r1`/`r8` before returning. The
/// return restores the caller's registers and the trailing push lands just
/// above the three surviving literals.
#[must_use]
pub fn demo_program() -> Vec<u8> {
    let mut builder = ProgramBuilder::new();

    builder
        .psh_lit(0x3333)
        .psh_lit(0x2222)
        .psh_lit(0x1111)
        .mov_lit_reg(0x1234, Register::R1)
        .mov_lit_reg(0x4546, Register::R4)
        .psh_lit(0x0000)
        .cal_lit(DEMO_SUBROUTINE_ADDR)
        .psh_lit(0x4444);

    builder
        .at(DEMO_SUBROUTINE_ADDR)
        .psh_lit(0x0102)
        .psh_lit(0x0304)
        .psh_lit(0x0506)
        .mov_lit_reg(0x0708, Register::R1)
        .mov_lit_reg(0x090A, Register::R8)
        .ret();

    builder.into_bytes()
}

#[cfg(test)]
mod tests {
    use vm_core::{Opcode, Register};

    use super::{demo_program, ProgramBuilder, DEMO_SUBROUTINE_ADDR};

    #[test]
    fn builder_emits_opcodes_with_big_endian_operands() {
        let mut builder = ProgramBuilder::new();
        builder
            .mov_lit_reg(0x1234, Register::R1)
            .psh_reg(Register::R4)
            .ret();

        assert_eq!(
            builder.into_bytes(),
            vec![
                Opcode::MovLitReg.as_u8(),
                0x12,
                0x34,
                Register::R1.operand(),
                Opcode::PshReg.as_u8(),
                Register::R4.operand(),
                Opcode::Ret.as_u8(),
            ]
        );
    }

    #[test]
    fn cursor_repositioning_zero_fills_the_gap() {
        let mut builder = ProgramBuilder::new();
        builder.ret().at(0x0004).ret();

        assert_eq!(
            builder.into_bytes(),
            vec![Opcode::Ret.as_u8(), 0, 0, 0, Opcode::Ret.as_u8()]
        );
    }

    #[test]
    fn demo_program_main_routine_matches_the_hand_assembled_image() {
        let image = demo_program();

        assert_eq!(
            &image[..22],
            &[
                Opcode::PshLit.as_u8(),
                0x33,
                0x33,
                Opcode::PshLit.as_u8(),
                0x22,
                0x22,
                Opcode::PshLit.as_u8(),
                0x11,
                0x11,
                Opcode::MovLitReg.as_u8(),
                0x12,
                0x34,
                Register::R1.operand(),
                Opcode::MovLitReg.as_u8(),
                0x45,
                0x46,
                Register::R4.operand(),
                Opcode::PshLit.as_u8(),
                0x00,
                0x00,
                Opcode::CalLit.as_u8(),
                0x30,
            ]
        );
    }

    #[test]
    fn demo_program_subroutine_sits_at_its_absolute_address() {
        let image = demo_program();
        let sub = usize::from(DEMO_SUBROUTINE_ADDR);

        assert_eq!(image[sub], Opcode::PshLit.as_u8());
        assert_eq!(image[sub + 9], Opcode::MovLitReg.as_u8());
        assert_eq!(image[sub + 17], Opcode::Ret.as_u8());
        assert_eq!(image.len(), sub + 18);
    }
}
