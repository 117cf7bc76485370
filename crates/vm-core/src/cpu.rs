//! Fetch/decode/execute engine and the stack-based calling convention.
//!
//! The engine owns one [`Memory`] and one [`RegisterFile`] exclusively.
//! [`Cpu::step`] runs exactly one instruction to completion: it fetches the
//! opcode byte at `ip`, decodes the operands that opcode declares, applies
//! the register/memory effects, and returns. Subroutine call and return are
//! built entirely from stack pushes and pops; there is no hardware call
//! stack (see [`Cpu::step`] and the module tests for the frame layout).

use crate::error::VmError;
use crate::memory::Memory;
use crate::opcode::Opcode;
use crate::registers::{Register, RegisterFile};

/// Transient decode result: an opcode plus the operands fetched for it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
pub enum Instruction {
    /// `dst := value`
    MovLitReg {
        /// Literal operand.
        value: u16,
        /// Destination register.
        dst: Register,
    },
    /// `dst := src`
    MovRegReg {
        /// Source register.
        src: Register,
        /// Destination register.
        dst: Register,
    },
    /// `memory[addr] := src`
    MovRegMem {
        /// Source register.
        src: Register,
        /// Absolute destination address.
        addr: u16,
    },
    /// `dst := memory[addr]`
    MovMemReg {
        /// Absolute source address.
        addr: u16,
        /// Destination register.
        dst: Register,
    },
    /// `acc := (lhs + rhs) mod 65536`
    AddRegReg {
        /// First addend register.
        lhs: Register,
        /// Second addend register.
        rhs: Register,
    },
    /// `if value != acc { ip := target }`
    JmpNotEq {
        /// Literal compared against the accumulator.
        value: u16,
        /// Absolute jump target.
        target: u16,
    },
    /// Push a literal word onto the stack.
    PshLit {
        /// Pushed literal.
        value: u16,
    },
    /// Push a register's value onto the stack.
    PshReg {
        /// Source register.
        src: Register,
    },
    /// Pop the top of the stack into a register.
    Pop {
        /// Destination register.
        dst: Register,
    },
    /// Save caller state and jump to a literal address.
    CalLit {
        /// Absolute subroutine address.
        target: u16,
    },
    /// Save caller state and jump to an address held in a register.
    CalReg {
        /// Register holding the subroutine address.
        src: Register,
    },
    /// Restore the state saved by the matching call.
    Ret,
}

/// Outcome of one completed [`Cpu::step`] call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
pub enum StepOutcome {
    /// A defined instruction was decoded and executed.
    Executed(Opcode),
    /// The fetched byte matched no defined instruction.
    ///
    /// Exactly one byte was consumed and no operands were fetched, so
    /// decoding can desynchronize on subsequent steps if the intended
    /// instruction had operands. Hosts should treat this as a diagnosable
    /// event rather than success.
    UnknownOpcode {
        /// The unrecognized opcode byte.
        opcode: u8,
        /// Address the byte was fetched from.
        addr: u16,
    },
}

/// The execution engine: registers, memory, and the frame accounting used
/// by the calling convention.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
pub struct Cpu {
    memory: Memory,
    registers: RegisterFile,
    /// Bytes pushed minus popped since the most recent call boundary (or
    /// program start). Wrapping arithmetic; transient underflow is an
    /// accounting artifact of `pop_state` and is never read as negative.
    frame_byte_count: u16,
}

impl Cpu {
    /// Creates an engine owning `memory`, with `sp`/`fp` placed two bytes
    /// below the top of that memory and all other registers zeroed.
    #[must_use]
    pub fn new(memory: Memory) -> Self {
        let registers = RegisterFile::new(memory.len());
        Self {
            memory,
            registers,
            frame_byte_count: 0,
        }
    }

    /// Returns the engine's memory for inspection.
    #[must_use]
    pub const fn memory(&self) -> &Memory {
        &self.memory
    }

    /// Returns the engine's memory for host-side program poking.
    pub const fn memory_mut(&mut self) -> &mut Memory {
        &mut self.memory
    }

    /// Returns the register file for inspection.
    #[must_use]
    pub const fn registers(&self) -> &RegisterFile {
        &self.registers
    }

    /// Returns the register file for host-side seeding.
    pub const fn registers_mut(&mut self) -> &mut RegisterFile {
        &mut self.registers
    }

    /// Reads the byte at `ip`, then advances `ip` by 1.
    fn fetch_byte(&mut self) -> Result<u8, VmError> {
        let ip = self.registers.get(Register::Ip);
        let byte = self.memory.read_byte(ip)?;
        self.registers.set(Register::Ip, ip.wrapping_add(1));
        Ok(byte)
    }

    /// Reads the big-endian word at `ip`, then advances `ip` by 2.
    fn fetch_word(&mut self) -> Result<u16, VmError> {
        let ip = self.registers.get(Register::Ip);
        let word = self.memory.read_word(ip)?;
        self.registers.set(Register::Ip, ip.wrapping_add(2));
        Ok(word)
    }

    /// Fetches one register operand byte, wrapping out-of-range indices
    /// modulo the register count.
    fn fetch_register(&mut self) -> Result<Register, VmError> {
        Ok(Register::from_operand(self.fetch_byte()?))
    }

    /// Writes `value` at `sp`, then moves `sp` down one word.
    ///
    /// # Errors
    ///
    /// Returns [`VmError::OutOfBounds`] when `sp` addresses outside memory.
    pub fn push(&mut self, value: u16) -> Result<(), VmError> {
        let sp = self.registers.get(Register::Sp);
        self.memory.write_word(sp, value)?;
        self.registers.set(Register::Sp, sp.wrapping_sub(2));
        self.frame_byte_count = self.frame_byte_count.wrapping_add(2);
        Ok(())
    }

    /// Moves `sp` up one word and reads the value there.
    ///
    /// # Errors
    ///
    /// Returns [`VmError::OutOfBounds`] when the restored `sp` addresses
    /// outside memory.
    pub fn pop(&mut self) -> Result<u16, VmError> {
        let sp = self.registers.get(Register::Sp).wrapping_add(2);
        self.registers.set(Register::Sp, sp);
        self.frame_byte_count = self.frame_byte_count.wrapping_sub(2);
        self.memory.read_word(sp)
    }

    /// Saves caller state before a call transfers control.
    ///
    /// Pushes `r1..r8`, then `ip` (the return address), then a marker word
    /// of `frame_byte_count + 2`. `fp` then addresses the marker word and
    /// frame accounting restarts from zero for the callee.
    fn push_state(&mut self) -> Result<(), VmError> {
        for register in Register::GENERAL {
            self.push(self.registers.get(register))?;
        }
        self.push(self.registers.get(Register::Ip))?;
        self.push(self.frame_byte_count.wrapping_add(2))?;

        self.registers
            .set(Register::Fp, self.registers.get(Register::Sp));
        self.frame_byte_count = 0;
        Ok(())
    }

    /// Reverses the matching `push_state`.
    ///
    /// Resets `sp` to `fp` (discarding any callee leftovers), pops the
    /// marker word, return address, and `r8..r1`, then pops the caller's
    /// argument count and discards that many further words. `fp` is
    /// re-linked to `saved_fp + marker`, which lands on the enclosing
    /// frame's marker word for arbitrarily deep nesting.
    fn pop_state(&mut self) -> Result<(), VmError> {
        let saved_fp = self.registers.get(Register::Fp);
        self.registers.set(Register::Sp, saved_fp);

        let marker = self.pop()?;
        self.frame_byte_count = marker;

        let return_address = self.pop()?;
        self.registers.set(Register::Ip, return_address);

        for register in Register::GENERAL.iter().rev().copied() {
            let value = self.pop()?;
            self.registers.set(register, value);
        }

        let n_args = self.pop()?;
        for _ in 0..n_args {
            self.pop()?;
        }

        self.registers
            .set(Register::Fp, saved_fp.wrapping_add(marker));
        Ok(())
    }

    /// Fetches the operands declared by `opcode`.
    fn decode(&mut self, opcode: Opcode) -> Result<Instruction, VmError> {
        let instruction = match opcode {
            Opcode::MovLitReg => Instruction::MovLitReg {
                value: self.fetch_word()?,
                dst: self.fetch_register()?,
            },
            Opcode::MovRegReg => Instruction::MovRegReg {
                src: self.fetch_register()?,
                dst: self.fetch_register()?,
            },
            Opcode::MovRegMem => Instruction::MovRegMem {
                src: self.fetch_register()?,
                addr: self.fetch_word()?,
            },
            Opcode::MovMemReg => Instruction::MovMemReg {
                addr: self.fetch_word()?,
                dst: self.fetch_register()?,
            },
            Opcode::AddRegReg => Instruction::AddRegReg {
                lhs: self.fetch_register()?,
                rhs: self.fetch_register()?,
            },
            Opcode::JmpNotEq => Instruction::JmpNotEq {
                value: self.fetch_word()?,
                target: self.fetch_word()?,
            },
            Opcode::PshLit => Instruction::PshLit {
                value: self.fetch_word()?,
            },
            Opcode::PshReg => Instruction::PshReg {
                src: self.fetch_register()?,
            },
            Opcode::Pop => Instruction::Pop {
                dst: self.fetch_register()?,
            },
            Opcode::CalLit => Instruction::CalLit {
                target: self.fetch_word()?,
            },
            Opcode::CalReg => Instruction::CalReg {
                src: self.fetch_register()?,
            },
            Opcode::Ret => Instruction::Ret,
        };
        Ok(instruction)
    }

    /// Applies the effects of one decoded instruction.
    fn execute(&mut self, instruction: Instruction) -> Result<(), VmError> {
        match instruction {
            Instruction::MovLitReg { value, dst } => {
                self.registers.set(dst, value);
            }
            Instruction::MovRegReg { src, dst } => {
                let value = self.registers.get(src);
                self.registers.set(dst, value);
            }
            Instruction::MovRegMem { src, addr } => {
                self.memory.write_word(addr, self.registers.get(src))?;
            }
            Instruction::MovMemReg { addr, dst } => {
                let value = self.memory.read_word(addr)?;
                self.registers.set(dst, value);
            }
            Instruction::AddRegReg { lhs, rhs } => {
                let sum = self
                    .registers
                    .get(lhs)
                    .wrapping_add(self.registers.get(rhs));
                self.registers.set(Register::Acc, sum);
            }
            Instruction::JmpNotEq { value, target } => {
                if value != self.registers.get(Register::Acc) {
                    self.registers.set(Register::Ip, target);
                }
            }
            Instruction::PshLit { value } => {
                self.push(value)?;
            }
            Instruction::PshReg { src } => {
                self.push(self.registers.get(src))?;
            }
            Instruction::Pop { dst } => {
                let value = self.pop()?;
                self.registers.set(dst, value);
            }
            Instruction::CalLit { target } => {
                self.push_state()?;
                self.registers.set(Register::Ip, target);
            }
            Instruction::CalReg { src } => {
                // Read the target before push_state in case src is sp or fp.
                let target = self.registers.get(src);
                self.push_state()?;
                self.registers.set(Register::Ip, target);
            }
            Instruction::Ret => {
                self.pop_state()?;
            }
        }
        Ok(())
    }

    /// Runs exactly one instruction to completion.
    ///
    /// An opcode byte matching no defined instruction consumes only itself
    /// and is reported as [`StepOutcome::UnknownOpcode`].
    ///
    /// # Errors
    ///
    /// Returns [`VmError::OutOfBounds`] when a fetch or an instruction's
    /// memory effect touches an address outside memory; the step is aborted
    /// at that point.
    pub fn step(&mut self) -> Result<StepOutcome, VmError> {
        let addr = self.registers.get(Register::Ip);
        let byte = self.fetch_byte()?;

        let Some(opcode) = Opcode::from_u8(byte) else {
            return Ok(StepOutcome::UnknownOpcode { opcode: byte, addr });
        };

        let instruction = self.decode(opcode)?;
        self.execute(instruction)?;
        Ok(StepOutcome::Executed(opcode))
    }
}
