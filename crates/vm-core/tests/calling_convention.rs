//! Call/return coverage for the stack-based calling convention: frame
//! layout, register save/restore, argument discarding, and nesting.

#![allow(clippy::pedantic, clippy::nursery)]

use proptest as _;
use rstest as _;
#[cfg(feature = "serde")]
use serde as _;
use thiserror as _;

use vm_core::{Cpu, Memory, Opcode, Register, StepOutcome};

const MEMORY_SIZE: usize = 0x1_0000;
const STACK_ORIGIN: u16 = 0xFFFE;

fn boot_at(origin: u16, program: &[u8]) -> Cpu {
    let mut memory = Memory::new(MEMORY_SIZE);
    memory.load(origin, program).expect("program fits");
    Cpu::new(memory)
}

fn load(cpu: &mut Cpu, addr: u16, bytes: &[u8]) {
    cpu.memory_mut().load(addr, bytes).expect("program fits");
}

fn step_ok(cpu: &mut Cpu) -> StepOutcome {
    cpu.step().expect("step must succeed")
}

fn seed_sentinels(cpu: &mut Cpu) {
    for (offset, register) in (1_u16..).zip(Register::GENERAL) {
        cpu.registers_mut().set(register, 0xA000 + offset);
    }
}

#[test]
fn call_and_return_restore_registers_and_pointers() {
    // psh 0x0000 (argument count); cal 0x3000; subroutine clobbers r1 and
    // r8 then returns.
    let mut cpu = boot_at(
        0,
        &[
            Opcode::PshLit.as_u8(),
            0x00,
            0x00,
            Opcode::CalLit.as_u8(),
            0x30,
            0x00,
        ],
    );
    load(
        &mut cpu,
        0x3000,
        &[
            Opcode::MovLitReg.as_u8(),
            0x07,
            0x08,
            Register::R1.operand(),
            Opcode::MovLitReg.as_u8(),
            0x09,
            0x0A,
            Register::R8.operand(),
            Opcode::Ret.as_u8(),
        ],
    );
    seed_sentinels(&mut cpu);

    step_ok(&mut cpu); // psh
    step_ok(&mut cpu); // cal
    assert_eq!(cpu.registers().get(Register::Ip), 0x3000);

    step_ok(&mut cpu); // mov r1
    step_ok(&mut cpu); // mov r8
    assert_eq!(cpu.registers().get(Register::R1), 0x0708);
    assert_eq!(cpu.registers().get(Register::R8), 0x090A);

    step_ok(&mut cpu); // ret

    // Registers are restored, execution resumes after the call's operands,
    // and the stack pointers are back at their pre-call values.
    assert_eq!(cpu.registers().get(Register::R1), 0xA001);
    assert_eq!(cpu.registers().get(Register::R8), 0xA008);
    assert_eq!(cpu.registers().get(Register::Ip), 6);
    assert_eq!(cpu.registers().get(Register::Sp), STACK_ORIGIN);
    assert_eq!(cpu.registers().get(Register::Fp), STACK_ORIGIN);
}

#[test]
fn call_through_a_register_saves_state_the_same_way() {
    let mut cpu = boot_at(
        0,
        &[
            Opcode::PshLit.as_u8(),
            0x00,
            0x00,
            Opcode::CalReg.as_u8(),
            Register::R3.operand(),
        ],
    );
    load(&mut cpu, 0x2000, &[Opcode::Ret.as_u8()]);
    cpu.registers_mut().set(Register::R3, 0x2000);

    step_ok(&mut cpu);
    step_ok(&mut cpu);
    assert_eq!(cpu.registers().get(Register::Ip), 0x2000);

    step_ok(&mut cpu);
    assert_eq!(cpu.registers().get(Register::Ip), 5);
    assert_eq!(cpu.registers().get(Register::R3), 0x2000);
    assert_eq!(cpu.registers().get(Register::Sp), STACK_ORIGIN);
    assert_eq!(cpu.registers().get(Register::Fp), STACK_ORIGIN);
}

#[test]
fn return_discards_caller_supplied_arguments() {
    // Two argument words and their count word all disappear on return.
    let mut cpu = boot_at(
        0,
        &[
            Opcode::PshLit.as_u8(),
            0x11,
            0x11,
            Opcode::PshLit.as_u8(),
            0x22,
            0x22,
            Opcode::PshLit.as_u8(),
            0x00,
            0x02,
            Opcode::CalLit.as_u8(),
            0x30,
            0x00,
        ],
    );
    load(&mut cpu, 0x3000, &[Opcode::Ret.as_u8()]);

    for _ in 0..5 {
        step_ok(&mut cpu);
    }

    assert_eq!(cpu.registers().get(Register::Ip), 12);
    assert_eq!(cpu.registers().get(Register::Sp), STACK_ORIGIN);
    assert_eq!(cpu.registers().get(Register::Fp), STACK_ORIGIN);
}

#[test]
fn callee_temporaries_are_discarded_by_the_frame_reset() {
    // The callee pushes without popping; ret snaps sp back to fp before
    // unwinding the saved block.
    let mut cpu = boot_at(
        0,
        &[
            Opcode::PshLit.as_u8(),
            0x00,
            0x00,
            Opcode::CalLit.as_u8(),
            0x30,
            0x00,
        ],
    );
    load(
        &mut cpu,
        0x3000,
        &[
            Opcode::PshLit.as_u8(),
            0x01,
            0x02,
            Opcode::PshLit.as_u8(),
            0x03,
            0x04,
            Opcode::Ret.as_u8(),
        ],
    );

    for _ in 0..5 {
        step_ok(&mut cpu);
    }

    assert_eq!(cpu.registers().get(Register::Ip), 6);
    assert_eq!(cpu.registers().get(Register::Sp), STACK_ORIGIN);
    assert_eq!(cpu.registers().get(Register::Fp), STACK_ORIGIN);
}

#[test]
fn nested_calls_chain_frame_pointers_through_the_stack() {
    // main calls A; A calls B; both levels restore their caller exactly.
    let mut cpu = boot_at(
        0,
        &[
            Opcode::PshLit.as_u8(),
            0x00,
            0x00,
            Opcode::CalLit.as_u8(),
            0x40,
            0x00,
        ],
    );
    // A: clobber r1, call B, then return.
    load(
        &mut cpu,
        0x4000,
        &[
            Opcode::MovLitReg.as_u8(),
            0xAA,
            0xAA,
            Register::R1.operand(),
            Opcode::PshLit.as_u8(),
            0x00,
            0x00,
            Opcode::CalLit.as_u8(),
            0x50,
            0x00,
            Opcode::MovRegReg.as_u8(),
            Register::R1.operand(),
            Register::R2.operand(),
            Opcode::Ret.as_u8(),
        ],
    );
    // B: clobber r1 and return.
    load(
        &mut cpu,
        0x5000,
        &[
            Opcode::MovLitReg.as_u8(),
            0xBB,
            0xBB,
            Register::R1.operand(),
            Opcode::Ret.as_u8(),
        ],
    );
    cpu.registers_mut().set(Register::R1, 0x1111);

    step_ok(&mut cpu); // psh
    step_ok(&mut cpu); // cal A
    step_ok(&mut cpu); // A: mov r1 := 0xAAAA
    step_ok(&mut cpu); // A: psh
    step_ok(&mut cpu); // A: cal B

    let inner_fp = cpu.registers().get(Register::Fp);
    assert!(inner_fp < STACK_ORIGIN - 20);

    step_ok(&mut cpu); // B: mov r1 := 0xBBBB
    step_ok(&mut cpu); // B: ret

    // B's return restored A's r1 and resumed after A's call.
    assert_eq!(cpu.registers().get(Register::R1), 0xAAAA);
    assert_eq!(cpu.registers().get(Register::Ip), 0x400A);

    step_ok(&mut cpu); // A: mov r2 := r1
    step_ok(&mut cpu); // A: ret

    assert_eq!(cpu.registers().get(Register::R1), 0x1111);
    assert_eq!(cpu.registers().get(Register::Ip), 6);
    assert_eq!(cpu.registers().get(Register::Sp), STACK_ORIGIN);
}

#[test]
fn sibling_calls_carry_the_consumed_count_word_in_frame_accounting() {
    // Known quirk preserved from the reference semantics: each completed
    // call leaves the consumed argument-count word in the caller's frame
    // accounting, so a second sibling call re-links fp two bytes past the
    // true origin (wrapping at the top of the address space).
    let mut cpu = boot_at(
        0,
        &[
            Opcode::PshLit.as_u8(),
            0x00,
            0x00,
            Opcode::CalLit.as_u8(),
            0x30,
            0x00,
            Opcode::PshLit.as_u8(),
            0x00,
            0x00,
            Opcode::CalLit.as_u8(),
            0x30,
            0x00,
        ],
    );
    load(&mut cpu, 0x3000, &[Opcode::Ret.as_u8()]);

    step_ok(&mut cpu);
    step_ok(&mut cpu);
    step_ok(&mut cpu); // first ret
    assert_eq!(cpu.registers().get(Register::Sp), STACK_ORIGIN);
    assert_eq!(cpu.registers().get(Register::Fp), STACK_ORIGIN);

    step_ok(&mut cpu);
    step_ok(&mut cpu);
    step_ok(&mut cpu); // second ret
    assert_eq!(cpu.registers().get(Register::Sp), STACK_ORIGIN);
    assert_eq!(cpu.registers().get(Register::Fp), 0x0000);
}

#[test]
fn end_to_end_demonstration_program() {
    // The canonical scenario: three literals stay below the call frame,
    // the callee's register clobbers are undone, and the trailing push
    // lands above the surviving literals.
    let mut cpu = boot_at(
        0,
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
            Opcode::PshLit.as_u8(),
            0x00,
            0x00,
            Opcode::CalLit.as_u8(),
            0x30,
            0x00,
            Opcode::PshLit.as_u8(),
            0x44,
            0x44,
        ],
    );
    load(
        &mut cpu,
        0x3000,
        &[
            Opcode::PshLit.as_u8(),
            0x01,
            0x02,
            Opcode::MovLitReg.as_u8(),
            0x07,
            0x08,
            Register::R1.operand(),
            Opcode::Ret.as_u8(),
        ],
    );

    // main: psh, psh, psh, mov, psh, cal; sub: psh, mov, ret; main: psh.
    for _ in 0..10 {
        step_ok(&mut cpu);
    }

    assert_eq!(cpu.registers().get(Register::R1), 0x1234);
    assert_eq!(cpu.registers().get(Register::Ip), 22);

    // Stack layout from the top of memory down.
    assert_eq!(cpu.memory().read_word(0xFFFE), Ok(0x3333));
    assert_eq!(cpu.memory().read_word(0xFFFC), Ok(0x2222));
    assert_eq!(cpu.memory().read_word(0xFFFA), Ok(0x1111));
    assert_eq!(cpu.memory().read_word(0xFFF8), Ok(0x4444));
    assert_eq!(cpu.registers().get(Register::Sp), 0xFFF6);
    assert_eq!(cpu.registers().get(Register::Fp), STACK_ORIGIN);
}
