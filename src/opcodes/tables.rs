//! Instruction tables for the seven encoding spaces.
//!
//! The Z80 opcode map is regular enough that most of each table is generated
//! from the `x`/`y`/`z` octal fields of the opcode byte (`xx yyy zzz`) and the
//! register, pair, condition and ALU lists below. Irregular rows are listed
//! explicitly.

use super::{categorize, EncodingSpace, InstructionDescriptor};
use crate::addressing::IndexRegister;

/// 8-bit register operands indexed by the `z`/`y` fields.
const R8: [&str; 8] = ["b", "c", "d", "e", "h", "l", "(hl)", "a"];
/// Register pairs indexed by the `p` field (SP table).
const RP: [&str; 4] = ["bc", "de", "hl", "sp"];
/// Register pairs indexed by the `p` field for push/pop (AF table).
const RP2: [&str; 4] = ["bc", "de", "hl", "af"];
/// Condition codes indexed by the `y` field.
const CC: [&str; 8] = ["nz", "z", "nc", "c", "po", "pe", "p", "m"];
/// ALU operations; the operand follows directly.
const ALU: [&str; 8] = [
    "add a,", "adc a,", "sub ", "sbc a,", "and ", "xor ", "or ", "cp ",
];
/// Rotate and shift operations indexed by the `y` field of CB opcodes.
const ROT: [&str; 8] = ["rlc", "rrc", "rl", "rr", "sla", "sra", "sll", "srl"];

fn x(byte: u8) -> u8 {
    byte >> 6
}
fn y(byte: u8) -> u8 {
    (byte >> 3) & 7
}
fn z(byte: u8) -> u8 {
    byte & 7
}

/// Collects descriptors for one encoding space.
struct TableBuilder {
    space: EncodingSpace,
    entries: Vec<InstructionDescriptor>,
}

impl TableBuilder {
    fn new(space: EncodingSpace) -> Self {
        Self {
            space,
            entries: Vec::with_capacity(256),
        }
    }

    fn push(&mut self, byte: u8, template: String, alternate: Option<String>, duplicate: bool) {
        let opcode = self
            .space
            .prefix()
            .iter()
            .fold(0u32, |acc, &b| (acc << 8) | b as u32);
        let opcode = (opcode << 8) | byte as u32;
        let size = super::encoded_size(self.space, &template);
        self.entries.push(InstructionDescriptor {
            category: categorize(&template),
            template,
            alternate,
            opcode,
            size,
            space: self.space,
            duplicate,
        });
    }

    fn op(&mut self, byte: u8, template: impl Into<String>) {
        self.push(byte, template.into(), None, false);
    }

    fn alt(&mut self, byte: u8, template: impl Into<String>, alternate: impl Into<String>) {
        self.push(byte, template.into(), Some(alternate.into()), false);
    }

    /// A second encoding of an instruction already present in the table.
    /// Decoded and executed, never chosen by the assembler.
    fn dup(&mut self, byte: u8, template: impl Into<String>) {
        self.push(byte, template.into(), None, true);
    }

    fn finish(self) -> Vec<InstructionDescriptor> {
        self.entries
    }
}

/// Unprefixed opcodes. The four prefix bytes have no entry.
pub(super) fn main_table() -> Vec<InstructionDescriptor> {
    let mut t = TableBuilder::new(EncodingSpace::Main);

    for byte in 0x00..=0x3Fu8 {
        let (y, z, p, q) = (y(byte), z(byte), y(byte) >> 1, y(byte) & 1);
        match z {
            0 => match y {
                0 => t.op(byte, "nop"),
                1 => t.op(byte, "ex af,af'"),
                2 => t.op(byte, "djnz o"),
                3 => t.op(byte, "jr o"),
                _ => t.op(byte, format!("jr {},o", CC[(y - 4) as usize])),
            },
            1 if q == 0 => t.op(byte, format!("ld {},nn", RP[p as usize])),
            1 => t.op(byte, format!("add hl,{}", RP[p as usize])),
            2 => t.op(
                byte,
                [
                    "ld (bc),a",
                    "ld a,(bc)",
                    "ld (de),a",
                    "ld a,(de)",
                    "ld (nn),hl",
                    "ld hl,(nn)",
                    "ld (nn),a",
                    "ld a,(nn)",
                ][y as usize],
            ),
            3 if q == 0 => t.op(byte, format!("inc {}", RP[p as usize])),
            3 => t.op(byte, format!("dec {}", RP[p as usize])),
            4 => t.op(byte, format!("inc {}", R8[y as usize])),
            5 => t.op(byte, format!("dec {}", R8[y as usize])),
            6 => t.op(byte, format!("ld {},n", R8[y as usize])),
            _ => t.op(
                byte,
                ["rlca", "rrca", "rla", "rra", "daa", "cpl", "scf", "ccf"][y as usize],
            ),
        }
    }

    for byte in 0x40..=0x7Fu8 {
        if byte == 0x76 {
            t.op(byte, "halt");
        } else {
            t.op(
                byte,
                format!("ld {},{}", R8[y(byte) as usize], R8[z(byte) as usize]),
            );
        }
    }

    for byte in 0x80..=0xBFu8 {
        t.op(
            byte,
            format!("{}{}", ALU[y(byte) as usize], R8[z(byte) as usize]),
        );
    }

    for byte in 0xC0..=0xFFu8 {
        let (y, z, p, q) = (y(byte), z(byte), y(byte) >> 1, y(byte) & 1);
        match z {
            0 => t.op(byte, format!("ret {}", CC[y as usize])),
            1 if q == 0 => t.op(byte, format!("pop {}", RP2[p as usize])),
            1 => t.op(byte, ["ret", "exx", "jp (hl)", "ld sp,hl"][p as usize]),
            2 => t.op(byte, format!("jp {},nn", CC[y as usize])),
            3 => match y {
                0 => t.op(byte, "jp nn"),
                1 => {} // CB prefix
                2 => t.op(byte, "out (n),a"),
                3 => t.op(byte, "in a,(n)"),
                4 => t.op(byte, "ex (sp),hl"),
                5 => t.op(byte, "ex de,hl"),
                6 => t.op(byte, "di"),
                _ => t.op(byte, "ei"),
            },
            4 => t.op(byte, format!("call {},nn", CC[y as usize])),
            5 if q == 0 => t.op(byte, format!("push {}", RP2[p as usize])),
            5 if p == 0 => t.op(byte, "call nn"),
            5 => {} // DD, ED, FD prefixes
            6 => t.op(byte, format!("{}n", ALU[y as usize])),
            _ => t.op(byte, format!("rst {:02X}h", y * 8)),
        }
    }

    t.finish()
}

/// CB-prefixed rotates, shifts and bit operations.
pub(super) fn bit_table() -> Vec<InstructionDescriptor> {
    let mut t = TableBuilder::new(EncodingSpace::Bit);
    for byte in 0x00..=0xFFu8 {
        let (y, r) = (y(byte), R8[z(byte) as usize]);
        match x(byte) {
            0 if y == 6 => t.alt(byte, format!("sll {}", r), format!("sl1 {}", r)),
            0 => t.op(byte, format!("{} {}", ROT[y as usize], r)),
            1 => t.op(byte, format!("bit {},{}", y, r)),
            2 => t.op(byte, format!("res {},{}", y, r)),
            _ => t.op(byte, format!("set {},{}", y, r)),
        }
    }
    t.finish()
}

/// ED-prefixed miscellaneous and block instructions.
pub(super) fn misc_table() -> Vec<InstructionDescriptor> {
    let mut t = TableBuilder::new(EncodingSpace::Misc);

    for byte in 0x40..=0x7Fu8 {
        let (y, z, p, q) = (y(byte), z(byte), y(byte) >> 1, y(byte) & 1);
        let rp = RP[p as usize];
        match z {
            0 if y == 6 => t.alt(byte, "in (c)", "in f,(c)"),
            0 => t.op(byte, format!("in {},(c)", R8[y as usize])),
            1 if y == 6 => t.op(byte, "out (c),0"),
            1 => t.op(byte, format!("out (c),{}", R8[y as usize])),
            2 if q == 0 => t.op(byte, format!("sbc hl,{}", rp)),
            2 => t.op(byte, format!("adc hl,{}", rp)),
            3 if p == 2 && q == 0 => t.dup(byte, "ld (nn),hl"),
            3 if p == 2 => t.dup(byte, "ld hl,(nn)"),
            3 if q == 0 => t.op(byte, format!("ld (nn),{}", rp)),
            3 => t.op(byte, format!("ld {},(nn)", rp)),
            4 if y == 0 => t.op(byte, "neg"),
            4 => t.dup(byte, "neg"),
            5 if y == 0 => t.op(byte, "retn"),
            5 if y == 1 => t.op(byte, "reti"),
            5 => t.dup(byte, "retn"),
            6 => {
                let mode = [0, 0, 1, 2, 0, 0, 1, 2][y as usize];
                if matches!(y, 0 | 2 | 3) {
                    t.op(byte, format!("im {}", mode));
                } else {
                    t.dup(byte, format!("im {}", mode));
                }
            }
            _ => match y {
                0 => t.op(byte, "ld i,a"),
                1 => t.op(byte, "ld r,a"),
                2 => t.op(byte, "ld a,i"),
                3 => t.op(byte, "ld a,r"),
                4 => t.op(byte, "rrd"),
                5 => t.op(byte, "rld"),
                _ => {}
            },
        }
    }

    const BLOCK: [[&str; 4]; 4] = [
        ["ldi", "cpi", "ini", "outi"],
        ["ldd", "cpd", "ind", "outd"],
        ["ldir", "cpir", "inir", "otir"],
        ["lddr", "cpdr", "indr", "otdr"],
    ];
    for (row, names) in BLOCK.iter().enumerate() {
        for (col, name) in names.iter().enumerate() {
            t.op(0xA0 | ((row as u8) << 3) | col as u8, *name);
        }
    }

    t.finish()
}

/// Spellings that replace `hl`, `h`, `l` and `(hl)` in index register rows.
struct IndexNames {
    full: &'static str,
    high: &'static str,
    low: &'static str,
    high_alt: &'static str,
    low_alt: &'static str,
    indexed: &'static str,
}

impl IndexNames {
    fn for_register(reg: IndexRegister) -> Self {
        match reg {
            IndexRegister::Ix => Self {
                full: "ix",
                high: "ixh",
                low: "ixl",
                high_alt: "xh",
                low_alt: "xl",
                indexed: "(ix+o)",
            },
            IndexRegister::Iy => Self {
                full: "iy",
                high: "iyh",
                low: "iyl",
                high_alt: "yh",
                low_alt: "yl",
                indexed: "(iy+o)",
            },
        }
    }

    /// Operand name for register index `r` when half registers are in play.
    fn half(&self, r: u8, alternate: bool) -> &'static str {
        match (r, alternate) {
            (4, false) => self.high,
            (5, false) => self.low,
            (4, true) => self.high_alt,
            (5, true) => self.low_alt,
            _ => R8[r as usize],
        }
    }
}

/// DD- or FD-prefixed index register instructions.
pub(super) fn index_table(reg: IndexRegister) -> Vec<InstructionDescriptor> {
    let space = match reg {
        IndexRegister::Ix => EncodingSpace::Ix,
        IndexRegister::Iy => EncodingSpace::Iy,
    };
    let n = IndexNames::for_register(reg);
    let mut t = TableBuilder::new(space);
    let ir = n.full;

    for (p, &rp) in RP.iter().enumerate() {
        let rp = if rp == "hl" { ir } else { rp };
        t.op(((p as u8) << 4) | 0x09, format!("add {},{}", ir, rp));
    }
    t.op(0x21, format!("ld {},nn", ir));
    t.op(0x22, format!("ld (nn),{}", ir));
    t.op(0x23, format!("inc {}", ir));
    t.op(0x2A, format!("ld {},(nn)", ir));
    t.op(0x2B, format!("dec {}", ir));
    for (byte, r) in [(0x24u8, 4u8), (0x2C, 5)] {
        t.alt(byte, format!("inc {}", n.half(r, false)), format!("inc {}", n.half(r, true)));
        t.alt(
            byte + 1,
            format!("dec {}", n.half(r, false)),
            format!("dec {}", n.half(r, true)),
        );
        t.alt(
            byte + 2,
            format!("ld {},n", n.half(r, false)),
            format!("ld {},n", n.half(r, true)),
        );
    }
    t.op(0x34, format!("inc {}", n.indexed));
    t.op(0x35, format!("dec {}", n.indexed));
    t.op(0x36, format!("ld {},n", n.indexed));

    for byte in 0x40..=0x7Fu8 {
        let (dst, src) = (y(byte), z(byte));
        if byte == 0x76 {
            continue;
        }
        if dst == 6 {
            t.op(byte, format!("ld {},{}", n.indexed, R8[src as usize]));
        } else if src == 6 {
            t.op(byte, format!("ld {},{}", R8[dst as usize], n.indexed));
        } else if matches!(dst, 4 | 5) || matches!(src, 4 | 5) {
            t.alt(
                byte,
                format!("ld {},{}", n.half(dst, false), n.half(src, false)),
                format!("ld {},{}", n.half(dst, true), n.half(src, true)),
            );
        }
    }

    for byte in 0x80..=0xBFu8 {
        let alu = ALU[y(byte) as usize];
        match z(byte) {
            r @ (4 | 5) => t.alt(
                byte,
                format!("{}{}", alu, n.half(r, false)),
                format!("{}{}", alu, n.half(r, true)),
            ),
            6 => t.op(byte, format!("{}{}", alu, n.indexed)),
            _ => {}
        }
    }

    t.op(0xE1, format!("pop {}", ir));
    t.op(0xE3, format!("ex (sp),{}", ir));
    t.op(0xE5, format!("push {}", ir));
    t.op(0xE9, format!("jp ({})", ir));
    t.op(0xF9, format!("ld sp,{}", ir));

    t.finish()
}

/// DDCB/FDCB-prefixed indexed bit instructions. The displacement byte sits
/// between the prefix pair and the opcode byte indexed here.
pub(super) fn index_bit_table(reg: IndexRegister) -> Vec<InstructionDescriptor> {
    let space = match reg {
        IndexRegister::Ix => EncodingSpace::IxBit,
        IndexRegister::Iy => EncodingSpace::IyBit,
    };
    let indexed = IndexNames::for_register(reg).indexed;
    let mut t = TableBuilder::new(space);

    for byte in 0x00..=0xFFu8 {
        let (y, z) = (y(byte), z(byte));
        let copy = R8[z as usize];
        match x(byte) {
            0 => {
                let rot = ROT[y as usize];
                let (template, alternate) = if z == 6 {
                    (format!("{} {}", rot, indexed), format!("sl1 {}", indexed))
                } else {
                    (
                        format!("{} {},{}", rot, indexed, copy),
                        format!("sl1 {},{}", indexed, copy),
                    )
                };
                if y == 6 {
                    t.alt(byte, template, alternate);
                } else {
                    t.op(byte, template);
                }
            }
            1 if z == 6 => t.op(byte, format!("bit {},{}", y, indexed)),
            1 => t.dup(byte, format!("bit {},{}", y, indexed)),
            op => {
                let name = if op == 2 { "res" } else { "set" };
                if z == 6 {
                    t.op(byte, format!("{} {},{}", name, y, indexed));
                } else {
                    t.op(byte, format!("{} {},{},{}", name, y, indexed, copy));
                }
            }
        }
    }

    t.finish()
}
