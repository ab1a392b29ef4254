//! # CPU Register State
//!
//! Plain data for the Z80 register file: the main and shadow 8-bit registers,
//! the 16-bit index, stack and program counter registers, the flag set and the
//! interrupt flip-flops. The execution engine owns one [`CpuState`]; hosts read
//! and edit it through [`crate::Cpu::state`] and [`crate::Cpu::state_mut`].

use crate::addressing::IndexRegister;

/// Bit positions of the flags within the F register.
pub mod flag_bits {
    pub const S: u8 = 0x80;
    pub const Z: u8 = 0x40;
    pub const H: u8 = 0x10;
    pub const PV: u8 = 0x04;
    pub const N: u8 = 0x02;
    pub const C: u8 = 0x01;
}

/// The six architectural flags.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Flags {
    /// Sign (bit 7 of the result)
    pub s: bool,
    /// Zero
    pub z: bool,
    /// Half carry (carry out of bit 3, or bit 11 for 16-bit adds)
    pub h: bool,
    /// Parity (logic, rotates) or signed overflow (arithmetic)
    pub pv: bool,
    /// Last operation was a subtraction
    pub n: bool,
    /// Carry
    pub c: bool,
}

impl Flags {
    /// Packs the flags as the F register: `S Z - H - PV N C`.
    pub fn to_byte(self) -> u8 {
        use flag_bits::*;
        let mut f = 0;
        if self.s {
            f |= S;
        }
        if self.z {
            f |= Z;
        }
        if self.h {
            f |= H;
        }
        if self.pv {
            f |= PV;
        }
        if self.n {
            f |= N;
        }
        if self.c {
            f |= C;
        }
        f
    }

    /// Unpacks an F register value. Bits 3 and 5 are ignored.
    pub fn from_byte(f: u8) -> Self {
        use flag_bits::*;
        Self {
            s: f & S != 0,
            z: f & Z != 0,
            h: f & H != 0,
            pv: f & PV != 0,
            n: f & N != 0,
            c: f & C != 0,
        }
    }

    /// Sets S and Z from an 8-bit result.
    pub(crate) fn set_sz(&mut self, value: u8) {
        self.s = value & 0x80 != 0;
        self.z = value == 0;
    }

    /// Sets S, Z and PV (even parity) from an 8-bit result.
    pub(crate) fn set_szp(&mut self, value: u8) {
        self.set_sz(value);
        self.pv = value.count_ones() % 2 == 0;
    }
}

/// Shadow register set swapped in by `ex af,af'` and `exx`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ShadowRegisters {
    pub a: u8,
    pub flags: Flags,
    pub b: u8,
    pub c: u8,
    pub d: u8,
    pub e: u8,
    pub h: u8,
    pub l: u8,
}

/// Maskable interrupt response mode set by `im`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum InterruptMode {
    /// Execute the instruction on the data bus (an `rst`)
    #[default]
    Mode0,
    /// `rst 38h`
    Mode1,
    /// Vectored through the table at `I:data`
    Mode2,
}

impl InterruptMode {
    pub fn number(self) -> u8 {
        match self {
            InterruptMode::Mode0 => 0,
            InterruptMode::Mode1 => 1,
            InterruptMode::Mode2 => 2,
        }
    }
}

/// Complete Z80 register file.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct CpuState {
    pub a: u8,
    pub b: u8,
    pub c: u8,
    pub d: u8,
    pub e: u8,
    pub h: u8,
    pub l: u8,
    /// Interrupt vector base
    pub i: u8,
    /// Memory refresh counter; bit 7 is only changed by `ld r,a`
    pub r: u8,
    pub ix: u16,
    pub iy: u16,
    pub pc: u16,
    pub sp: u16,
    pub flags: Flags,
    pub shadow: ShadowRegisters,
    /// Interrupt enable flip-flop
    pub iff1: bool,
    /// Copy of IFF1 kept across a non-maskable interrupt
    pub iff2: bool,
    pub interrupt_mode: InterruptMode,
}

impl CpuState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn bc(&self) -> u16 {
        u16::from_be_bytes([self.b, self.c])
    }

    pub fn de(&self) -> u16 {
        u16::from_be_bytes([self.d, self.e])
    }

    pub fn hl(&self) -> u16 {
        u16::from_be_bytes([self.h, self.l])
    }

    pub fn af(&self) -> u16 {
        u16::from_be_bytes([self.a, self.flags.to_byte()])
    }

    pub fn set_bc(&mut self, value: u16) {
        [self.b, self.c] = value.to_be_bytes();
    }

    pub fn set_de(&mut self, value: u16) {
        [self.d, self.e] = value.to_be_bytes();
    }

    pub fn set_hl(&mut self, value: u16) {
        [self.h, self.l] = value.to_be_bytes();
    }

    pub fn set_af(&mut self, value: u16) {
        let [a, f] = value.to_be_bytes();
        self.a = a;
        self.flags = Flags::from_byte(f);
    }

    /// Value of IX or IY.
    pub fn index(&self, reg: IndexRegister) -> u16 {
        match reg {
            IndexRegister::Ix => self.ix,
            IndexRegister::Iy => self.iy,
        }
    }

    pub fn set_index(&mut self, reg: IndexRegister, value: u16) {
        match reg {
            IndexRegister::Ix => self.ix = value,
            IndexRegister::Iy => self.iy = value,
        }
    }

    /// Advances the low seven bits of R by `fetches`, keeping bit 7.
    pub(crate) fn bump_r(&mut self, fetches: u8) {
        self.r = (self.r & 0x80) | (self.r.wrapping_add(fetches) & 0x7F);
    }

    /// `ex af,af'`
    pub(crate) fn exchange_af(&mut self) {
        std::mem::swap(&mut self.a, &mut self.shadow.a);
        std::mem::swap(&mut self.flags, &mut self.shadow.flags);
    }

    /// `exx`
    pub(crate) fn exchange_general(&mut self) {
        std::mem::swap(&mut self.b, &mut self.shadow.b);
        std::mem::swap(&mut self.c, &mut self.shadow.c);
        std::mem::swap(&mut self.d, &mut self.shadow.d);
        std::mem::swap(&mut self.e, &mut self.shadow.e);
        std::mem::swap(&mut self.h, &mut self.shadow.h);
        std::mem::swap(&mut self.l, &mut self.shadow.l);
    }
}
