//! # CPU State and Execution
//!
//! This module contains the [`Cpu`] struct, the Z80 execution engine, and its
//! fetch-decode-execute loop.
//!
//! ## CPU State
//!
//! The CPU owns:
//! - **Registers**: a [`CpuState`] with the main and shadow sets, IX/IY, SP, PC,
//!   I, R, the flags and the interrupt flip-flops
//! - **Memory**: any [`MemoryBus`] implementation
//! - **Board**: the 256-byte port space plus the reserved display, storage and
//!   SIO ports (see [`crate::devices`])
//!
//! ## Execution Model
//!
//! - [`Cpu::step`] executes exactly one instruction at PC and reports the next
//!   PC, whether the CPU halted, and the board events the instruction raised.
//! - [`Cpu::run`] repeats `step` until HALT or a step budget runs out.
//! - [`Cpu::interrupt`] and [`Cpu::nmi`] service interrupts between steps.
//!
//! Every instruction is decoded through the shared [`CATALOG`] before any state
//! is touched, so an unknown opcode leaves the CPU exactly as it was.

use log::{trace, warn};

use crate::addressing::IndexRegister;
use crate::devices::{Board, BoardConfig, BoardEvent, PortSpace};
use crate::instructions::{self, Flow, Loc};
use crate::opcodes::{EncodingSpace, CATALOG};
use crate::state::{CpuState, Flags, InterruptMode};
use crate::{ExecutionError, MemoryBus};

/// Whether the CPU can keep going after a step.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StepStatus {
    Running,
    /// A `halt` was executed; only an interrupt resumes execution
    Halted,
}

/// Outcome of one [`Cpu::step`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StepResult {
    /// Address of the instruction that was executed
    pub address: u16,
    /// PC after the instruction
    pub next_pc: u16,
    pub status: StepStatus,
    /// Board events raised by the instruction, in order
    pub events: Vec<BoardEvent>,
}

/// Outcome of [`Cpu::run`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunSummary {
    /// Instructions executed
    pub steps: usize,
    pub status: StepStatus,
    pub events: Vec<BoardEvent>,
}

/// Z80 CPU state and execution context.
///
/// Generic over the memory implementation via the [`MemoryBus`] trait.
///
/// # Examples
///
/// ```
/// use libz80::{Cpu, FlatMemory, StepStatus};
///
/// let mut memory = FlatMemory::new();
/// memory.load(0x0000, &[0x3E, 0x05, 0x3C, 0x76]); // ld a,5 / inc a / halt
///
/// let mut cpu = Cpu::new(memory);
/// let summary = cpu.run(10).unwrap();
///
/// assert_eq!(summary.status, StepStatus::Halted);
/// assert_eq!(cpu.a(), 0x06);
/// assert_eq!(cpu.pc(), 0x0004);
/// ```
pub struct Cpu<M: MemoryBus> {
    /// Register file
    pub(crate) state: CpuState,

    /// Memory bus implementation
    pub(crate) memory: M,

    /// Port space and reserved ports
    pub(crate) board: Board,

    /// Events raised by the instruction in progress
    pub(crate) events: Vec<BoardEvent>,

    /// Address of the instruction in progress
    pub(crate) origin: u16,

    /// Next operand byte of the instruction in progress
    pub(crate) cursor: u16,

    /// Set by `halt`, cleared by an interrupt or an explicit PC change
    pub(crate) halted: bool,
}

impl<M: MemoryBus> Cpu<M> {
    /// Creates a CPU with zeroed registers and the default board layout.
    pub fn new(memory: M) -> Self {
        Self::with_config(memory, BoardConfig::default())
    }

    /// Creates a CPU on a board with custom reserved ports.
    pub fn with_config(memory: M, config: BoardConfig) -> Self {
        Self {
            state: CpuState::new(),
            memory,
            board: Board::new(config),
            events: Vec::new(),
            origin: 0,
            cursor: 0,
            halted: false,
        }
    }

    /// Executes the instruction at PC.
    ///
    /// A halted CPU does not advance: the step reports [`StepStatus::Halted`]
    /// again without executing anything.
    ///
    /// # Errors
    ///
    /// [`ExecutionError::UnknownOpcode`] when the bytes at PC do not decode in
    /// any of the seven encoding spaces. Nothing is modified in that case.
    ///
    /// # Examples
    ///
    /// ```
    /// use libz80::{Cpu, ExecutionError, FlatMemory};
    ///
    /// let mut memory = FlatMemory::new();
    /// memory.load(0x0000, &[0xED, 0x00]);
    ///
    /// let mut cpu = Cpu::new(memory);
    /// match cpu.step() {
    ///     Err(ExecutionError::UnknownOpcode { address, bytes }) => {
    ///         assert_eq!(address, 0x0000);
    ///         assert_eq!(bytes, vec![0xED, 0x00]);
    ///     }
    ///     other => panic!("unexpected {:?}", other),
    /// }
    /// assert_eq!(cpu.pc(), 0x0000);
    /// ```
    pub fn step(&mut self) -> Result<StepResult, ExecutionError> {
        let address = self.state.pc;
        if self.halted {
            return Ok(StepResult {
                address,
                next_pc: address,
                status: StepStatus::Halted,
                events: Vec::new(),
            });
        }

        let memory = &self.memory;
        let descriptor = CATALOG
            .decode(|addr| memory.read(addr), address)
            .map_err(|unknown| {
                warn!(
                    "unknown opcode {:02X?} at {:04X}h",
                    unknown.bytes, address
                );
                ExecutionError::UnknownOpcode {
                    address,
                    bytes: unknown.bytes,
                }
            })?;
        trace!("{:04X}h  {}", address, descriptor.template);

        let prefix_len = descriptor.space.prefix().len() as u16;
        self.state.bump_r(if prefix_len == 0 { 1 } else { 2 });
        self.origin = address;
        self.cursor = address.wrapping_add(prefix_len + 1);
        self.events.clear();

        let opcode = descriptor.opcode_byte();
        let flow = match descriptor.space {
            EncodingSpace::Main => instructions::execute_main(self, opcode),
            EncodingSpace::Bit => instructions::execute_bit(self, opcode),
            EncodingSpace::Misc => instructions::execute_misc(self, opcode),
            EncodingSpace::Ix => instructions::execute_index(self, IndexRegister::Ix, opcode),
            EncodingSpace::Iy => instructions::execute_index(self, IndexRegister::Iy, opcode),
            EncodingSpace::IxBit | EncodingSpace::IyBit => {
                let reg = match descriptor.space {
                    EncodingSpace::IxBit => IndexRegister::Ix,
                    _ => IndexRegister::Iy,
                };
                let displacement = self.memory.read(address.wrapping_add(2)) as i8;
                self.cursor = address.wrapping_add(4);
                instructions::execute_index_bit(self, reg, displacement, opcode)
            }
        }?;

        let following = address.wrapping_add(descriptor.size as u16);
        let (next_pc, status) = match flow {
            Flow::Next => (following, StepStatus::Running),
            Flow::Jump(target) => (target, StepStatus::Running),
            Flow::Repeat => (address, StepStatus::Running),
            Flow::Halt => {
                self.halted = true;
                (following, StepStatus::Halted)
            }
        };
        self.state.pc = next_pc;

        Ok(StepResult {
            address,
            next_pc,
            status,
            events: std::mem::take(&mut self.events),
        })
    }

    /// Sets PC to `address` and executes one instruction there.
    pub fn step_at(&mut self, address: u16) -> Result<StepResult, ExecutionError> {
        self.set_pc(address);
        self.step()
    }

    /// Steps until HALT or until `max_steps` instructions have run.
    pub fn run(&mut self, max_steps: usize) -> Result<RunSummary, ExecutionError> {
        let mut summary = RunSummary {
            steps: 0,
            status: StepStatus::Running,
            events: Vec::new(),
        };
        while summary.steps < max_steps {
            let executed = !self.halted;
            let result = self.step()?;
            if executed {
                summary.steps += 1;
            }
            summary.events.extend(result.events);
            summary.status = result.status;
            if result.status == StepStatus::Halted {
                break;
            }
        }
        Ok(summary)
    }

    /// Raises the maskable interrupt with `data_bus` as the byte the
    /// interrupting device places on the bus.
    ///
    /// Returns `Ok(false)` without doing anything when interrupts are disabled.
    ///
    /// # Errors
    ///
    /// In mode 0 only `rst` opcodes are accepted from the bus; any other byte
    /// is reported as [`ExecutionError::UnknownOpcode`].
    pub fn interrupt(&mut self, data_bus: u8) -> Result<bool, ExecutionError> {
        if !self.state.iff1 {
            return Ok(false);
        }

        let target = match self.state.interrupt_mode {
            InterruptMode::Mode0 if data_bus & 0xC7 == 0xC7 => (data_bus & 0x38) as u16,
            InterruptMode::Mode0 => {
                return Err(ExecutionError::UnknownOpcode {
                    address: self.state.pc,
                    bytes: vec![data_bus],
                })
            }
            InterruptMode::Mode1 => 0x0038,
            InterruptMode::Mode2 => {
                let table = u16::from_be_bytes([self.state.i, data_bus]);
                self.memory.read_word(table)
            }
        };

        self.state.iff1 = false;
        self.state.iff2 = false;
        self.state.bump_r(1);
        self.halted = false;
        let pc = self.state.pc;
        self.push_word(pc);
        self.state.pc = target;
        trace!(
            "interrupt (IM {}) from {:04X}h to {:04X}h",
            self.state.interrupt_mode.number(),
            pc,
            target
        );
        Ok(true)
    }

    /// Raises the non-maskable interrupt.
    pub fn nmi(&mut self) {
        self.state.iff2 = self.state.iff1;
        self.state.iff1 = false;
        self.state.bump_r(1);
        self.halted = false;
        let pc = self.state.pc;
        self.push_word(pc);
        self.state.pc = 0x0066;
        trace!("NMI from {:04X}h", pc);
    }

    /// Zeroes registers and flags and clears HALT. Memory and ports are kept.
    pub fn reset(&mut self) {
        self.state = CpuState::new();
        self.halted = false;
    }

    /// Zeroes the whole memory image.
    pub fn reset_ram(&mut self) {
        self.memory.clear();
    }

    /// Zeroes every port latch.
    pub fn reset_ports(&mut self) {
        self.board.reset();
    }

    // ========== Accessors ==========

    pub fn state(&self) -> &CpuState {
        &self.state
    }

    pub fn state_mut(&mut self) -> &mut CpuState {
        &mut self.state
    }

    pub fn memory(&self) -> &M {
        &self.memory
    }

    pub fn memory_mut(&mut self) -> &mut M {
        &mut self.memory
    }

    pub fn ports(&self) -> &PortSpace {
        self.board.ports()
    }

    /// Mutable port space, used by a storage device to supply data.
    pub fn ports_mut(&mut self) -> &mut PortSpace {
        self.board.ports_mut()
    }

    pub fn board_config(&self) -> &BoardConfig {
        self.board.config()
    }

    pub fn is_halted(&self) -> bool {
        self.halted
    }

    /// Returns the accumulator.
    pub fn a(&self) -> u8 {
        self.state.a
    }

    pub fn set_a(&mut self, value: u8) {
        self.state.a = value;
    }

    /// Returns the flags packed as the F register (`S Z - H - PV N C`).
    ///
    /// # Examples
    ///
    /// ```
    /// use libz80::{Cpu, FlatMemory};
    ///
    /// let mut cpu = Cpu::new(FlatMemory::new());
    /// cpu.set_f(0xC1);
    /// assert!(cpu.flags().s && cpu.flags().z && cpu.flags().c);
    /// assert_eq!(cpu.f(), 0xC1);
    /// ```
    pub fn f(&self) -> u8 {
        self.state.flags.to_byte()
    }

    pub fn set_f(&mut self, value: u8) {
        self.state.flags = Flags::from_byte(value);
    }

    pub fn flags(&self) -> Flags {
        self.state.flags
    }

    pub fn bc(&self) -> u16 {
        self.state.bc()
    }

    pub fn de(&self) -> u16 {
        self.state.de()
    }

    pub fn hl(&self) -> u16 {
        self.state.hl()
    }

    pub fn ix(&self) -> u16 {
        self.state.ix
    }

    pub fn iy(&self) -> u16 {
        self.state.iy
    }

    pub fn sp(&self) -> u16 {
        self.state.sp
    }

    pub fn set_sp(&mut self, value: u16) {
        self.state.sp = value;
    }

    /// Returns the program counter.
    pub fn pc(&self) -> u16 {
        self.state.pc
    }

    /// Moves PC. A pending HALT is released.
    pub fn set_pc(&mut self, value: u16) {
        self.state.pc = value;
        self.halted = false;
    }

    // ========== Instruction helpers ==========

    pub(crate) fn fetch_byte(&mut self) -> u8 {
        let value = self.memory.read(self.cursor);
        self.cursor = self.cursor.wrapping_add(1);
        value
    }

    pub(crate) fn fetch_word(&mut self) -> u16 {
        let value = self.memory.read_word(self.cursor);
        self.cursor = self.cursor.wrapping_add(2);
        value
    }

    /// Reads a displacement byte and returns `IX+d` or `IY+d`.
    pub(crate) fn fetch_indexed_address(&mut self, reg: IndexRegister) -> u16 {
        let displacement = self.fetch_byte() as i8;
        self.state.index(reg).wrapping_add(displacement as u16)
    }

    pub(crate) fn register_fault(&self, index: u8) -> ExecutionError {
        ExecutionError::RegisterIndex {
            address: self.origin,
            index,
        }
    }

    /// Fault for an opcode that decoded but has no handler.
    pub(crate) fn unknown_opcode(&self) -> ExecutionError {
        let len = self.cursor.wrapping_sub(self.origin).clamp(1, 4);
        ExecutionError::UnknownOpcode {
            address: self.origin,
            bytes: (0..len)
                .map(|i| self.memory.read(self.origin.wrapping_add(i)))
                .collect(),
        }
    }

    /// Operand for 3-bit register field `index` (`b c d e h l (hl) a`).
    pub(crate) fn reg_loc(&self, index: u8) -> Result<Loc, ExecutionError> {
        match index {
            6 => Ok(Loc::Mem(self.state.hl())),
            0..=7 => Ok(Loc::Reg(index)),
            _ => Err(self.register_fault(index)),
        }
    }

    /// Operand for register field `index` under a DD/FD prefix: `h`/`l`
    /// become the index halves and `(hl)` becomes `(ix+d)`.
    pub(crate) fn index_loc(&mut self, reg: IndexRegister, index: u8) -> Result<Loc, ExecutionError> {
        match index {
            4 => Ok(Loc::IndexHalf(reg, true)),
            5 => Ok(Loc::IndexHalf(reg, false)),
            6 => Ok(Loc::Mem(self.fetch_indexed_address(reg))),
            _ => self.reg_loc(index),
        }
    }

    pub(crate) fn read_loc(&self, loc: Loc) -> Result<u8, ExecutionError> {
        let s = &self.state;
        Ok(match loc {
            Loc::Reg(0) => s.b,
            Loc::Reg(1) => s.c,
            Loc::Reg(2) => s.d,
            Loc::Reg(3) => s.e,
            Loc::Reg(4) => s.h,
            Loc::Reg(5) => s.l,
            Loc::Reg(7) => s.a,
            Loc::Reg(index) => return Err(self.register_fault(index)),
            Loc::IndexHalf(reg, high) => {
                let [hi, lo] = s.index(reg).to_be_bytes();
                if high {
                    hi
                } else {
                    lo
                }
            }
            Loc::Mem(addr) => self.memory.read(addr),
        })
    }

    pub(crate) fn write_loc(&mut self, loc: Loc, value: u8) -> Result<(), ExecutionError> {
        let s = &mut self.state;
        match loc {
            Loc::Reg(0) => s.b = value,
            Loc::Reg(1) => s.c = value,
            Loc::Reg(2) => s.d = value,
            Loc::Reg(3) => s.e = value,
            Loc::Reg(4) => s.h = value,
            Loc::Reg(5) => s.l = value,
            Loc::Reg(7) => s.a = value,
            Loc::Reg(index) => return Err(self.register_fault(index)),
            Loc::IndexHalf(reg, high) => {
                let [hi, lo] = s.index(reg).to_be_bytes();
                let word = if high {
                    u16::from_be_bytes([value, lo])
                } else {
                    u16::from_be_bytes([hi, value])
                };
                s.set_index(reg, word);
            }
            Loc::Mem(addr) => self.memory.write(addr, value),
        }
        Ok(())
    }

    /// Register pair `p` of the `bc de hl sp` group; `hl` is replaced by the
    /// index register when one is given.
    pub(crate) fn pair(&self, p: u8, index: Option<IndexRegister>) -> Result<u16, ExecutionError> {
        let s = &self.state;
        match p {
            0 => Ok(s.bc()),
            1 => Ok(s.de()),
            2 => Ok(index.map_or_else(|| s.hl(), |reg| s.index(reg))),
            3 => Ok(s.sp),
            _ => Err(self.register_fault(p)),
        }
    }

    pub(crate) fn set_pair(
        &mut self,
        p: u8,
        index: Option<IndexRegister>,
        value: u16,
    ) -> Result<(), ExecutionError> {
        let s = &mut self.state;
        match (p, index) {
            (0, _) => s.set_bc(value),
            (1, _) => s.set_de(value),
            (2, Some(reg)) => s.set_index(reg, value),
            (2, None) => s.set_hl(value),
            (3, _) => s.sp = value,
            _ => return Err(self.register_fault(p)),
        }
        Ok(())
    }

    /// HL, IX or IY.
    pub(crate) fn hl_or_index(&self, index: Option<IndexRegister>) -> u16 {
        index.map_or_else(|| self.state.hl(), |reg| self.state.index(reg))
    }

    pub(crate) fn set_hl_or_index(&mut self, index: Option<IndexRegister>, value: u16) {
        match index {
            Some(reg) => self.state.set_index(reg, value),
            None => self.state.set_hl(value),
        }
    }

    /// Condition code `cc`: `nz z nc c po pe p m`.
    pub(crate) fn condition(&self, cc: u8) -> Result<bool, ExecutionError> {
        let f = &self.state.flags;
        match cc {
            0 => Ok(!f.z),
            1 => Ok(f.z),
            2 => Ok(!f.c),
            3 => Ok(f.c),
            4 => Ok(!f.pv),
            5 => Ok(f.pv),
            6 => Ok(!f.s),
            7 => Ok(f.s),
            _ => Err(self.register_fault(cc)),
        }
    }

    /// Pushes a word, high byte first, so it lands low-then-high in memory.
    pub(crate) fn push_word(&mut self, value: u16) {
        self.state.sp = self.state.sp.wrapping_sub(2);
        self.memory.write_word(self.state.sp, value);
    }

    pub(crate) fn pop_word(&mut self) -> u16 {
        let value = self.memory.read_word(self.state.sp);
        self.state.sp = self.state.sp.wrapping_add(2);
        value
    }

    pub(crate) fn port_in(&mut self, port: u8) -> u8 {
        let (value, event) = self.board.input(port);
        self.events.extend(event);
        value
    }

    pub(crate) fn port_out(&mut self, port: u8, value: u8) {
        let i = self.state.i;
        let memory = &self.memory;
        let event = self
            .board
            .output(port, value, i, |addr| memory.read_word(addr));
        self.events.extend(event);
    }
}
