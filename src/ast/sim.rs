//! The typed view of a 32-bit instruction word.
//!
//! [`SimInstr::encode`] and [`SimInstr::decode`] are the two halves of the bit layout
//! shared by the assembler and the simulator. Both directions use the shifts and masks
//! defined in this module, and both consult the same [descriptor table] to select a layout.
//!
//! ```text
//! R: | opcode:6 | rs:5 | rt:5 | rd:5 | shamt:5 | funct:6 |
//! I: | opcode:6 | rs:5 | rt:5 |         imm:16           |
//! J: | opcode:6 |               target:26                |
//! ```
//!
//! [descriptor table]: crate::isa

use crate::isa::{self, Format, ITemplate, InstrDesc};

use super::{Funct, Imm16, Opcode, Reg, Shamt, Target26};

const OPCODE_SHIFT: u32 = 26;
const RS_SHIFT: u32 = 21;
const RT_SHIFT: u32 = 16;
const RD_SHIFT: u32 = 11;
const SHAMT_SHIFT: u32 = 6;
const REG_MASK: u32 = 0x1F;
const PAYLOAD_MASK: u32 = 0x03FF_FFFF;

/// Fields of an R-type word.
#[derive(Debug, PartialEq, Eq, Hash, Clone, Copy)]
#[allow(missing_docs)]
pub struct RFields {
    pub rs: Reg,
    pub rt: Reg,
    pub rd: Reg,
    pub shamt: Shamt,
    pub funct: Funct,
}
/// Fields of an I-type word.
#[derive(Debug, PartialEq, Eq, Hash, Clone, Copy)]
#[allow(missing_docs)]
pub struct IFields {
    pub rs: Reg,
    pub rt: Reg,
    pub imm: Imm16,
}
/// Fields of a J-type word.
#[derive(Debug, PartialEq, Eq, Hash, Clone, Copy)]
#[allow(missing_docs)]
pub struct JFields {
    pub target: Target26,
}

/// The operand fields of an instruction word, by layout.
#[derive(Debug, PartialEq, Eq, Hash, Clone, Copy)]
pub enum Fields {
    /// R-type fields.
    R(RFields),
    /// I-type fields.
    I(IFields),
    /// J-type fields.
    J(JFields),
    /// The opcode is not in the descriptor table, so no fields are known.
    ///
    /// This holds the low 26 bits of the word undecoded.
    Unknown(u32),
}

/// A decoded instruction word.
///
/// Decoding is total: every `u32` decodes to a `SimInstr`,
/// and re-encoding it gives back the same word.
///
/// ```
/// use mips_ensemble::ast::sim::{Fields, SimInstr};
/// use mips_ensemble::ast::reg_consts::{T0, T1, T2};
///
/// let instr = SimInstr::decode(0x01484820);
/// let Fields::R(r) = instr.fields else { unreachable!() };
/// assert_eq!((r.rs, r.rt, r.rd, r.funct.get()), (T2, T0, T1, 0x20));
/// assert_eq!(instr.to_string(), "add $t1, $t2, $t0");
/// assert_eq!(instr.encode(), 0x01484820);
/// ```
#[derive(Debug, PartialEq, Eq, Hash, Clone, Copy)]
pub struct SimInstr {
    /// The primary opcode.
    pub opcode: Opcode,
    /// The operand template for this opcode (`None` if unknown).
    pub template: Option<ITemplate>,
    /// The operand fields.
    pub fields: Fields,
}

fn reg_at(word: u32, shift: u32) -> Reg {
    Reg(((word >> shift) & REG_MASK) as u8)
}
fn reg_bits(reg: Reg, shift: u32) -> u32 {
    u32::from(reg.reg_no()) << shift
}

impl SimInstr {
    /// Creates an R-type instruction from its descriptor.
    pub fn r(desc: &InstrDesc, rd: Reg, rs: Reg, rt: Reg) -> Self {
        let funct = Funct::new_trunc(desc.funct.unwrap_or(0));
        Self {
            opcode: Opcode::new_trunc(desc.opcode),
            template: Some(desc.template),
            fields: Fields::R(RFields { rs, rt, rd, shamt: Shamt::new_trunc(0), funct }),
        }
    }
    /// Creates an I-type instruction from its descriptor.
    pub fn i(desc: &InstrDesc, rs: Reg, rt: Reg, imm: Imm16) -> Self {
        Self {
            opcode: Opcode::new_trunc(desc.opcode),
            template: Some(desc.template),
            fields: Fields::I(IFields { rs, rt, imm }),
        }
    }
    /// Creates a J-type instruction from its descriptor.
    pub fn j(desc: &InstrDesc, target: Target26) -> Self {
        Self {
            opcode: Opcode::new_trunc(desc.opcode),
            template: Some(desc.template),
            fields: Fields::J(JFields { target }),
        }
    }

    /// Decodes a word into its typed view.
    pub fn decode(word: u32) -> Self {
        let opcode = Opcode::new_trunc((word >> OPCODE_SHIFT) as u8);
        let template = isa::opcode_to_template(opcode.get());

        let fields = match template.map(ITemplate::format) {
            Some(Format::R) => Fields::R(RFields {
                rs: reg_at(word, RS_SHIFT),
                rt: reg_at(word, RT_SHIFT),
                rd: reg_at(word, RD_SHIFT),
                shamt: Shamt::new_trunc((word >> SHAMT_SHIFT) as u8),
                funct: Funct::new_trunc(word as u8),
            }),
            Some(Format::I) => Fields::I(IFields {
                rs: reg_at(word, RS_SHIFT),
                rt: reg_at(word, RT_SHIFT),
                imm: Imm16::new_trunc(word as u16),
            }),
            Some(Format::J) => Fields::J(JFields {
                target: Target26::new_trunc(word),
            }),
            None => Fields::Unknown(word & PAYLOAD_MASK),
        };

        Self { opcode, template, fields }
    }

    /// Encodes this instruction into a word.
    pub fn encode(&self) -> u32 {
        let opcode = u32::from(self.opcode.get()) << OPCODE_SHIFT;
        let payload = match self.fields {
            Fields::R(RFields { rs, rt, rd, shamt, funct }) => {
                reg_bits(rs, RS_SHIFT)
                | reg_bits(rt, RT_SHIFT)
                | reg_bits(rd, RD_SHIFT)
                | u32::from(shamt.get()) << SHAMT_SHIFT
                | u32::from(funct.get())
            },
            Fields::I(IFields { rs, rt, imm }) => {
                reg_bits(rs, RS_SHIFT)
                | reg_bits(rt, RT_SHIFT)
                | u32::from(imm.get())
            },
            Fields::J(JFields { target }) => target.get(),
            Fields::Unknown(raw) => raw & PAYLOAD_MASK,
        };

        opcode | payload
    }

    /// Finds the descriptor which executes this instruction.
    ///
    /// This is `None` if the opcode is unknown or if the funct of an R-type word
    /// does not select a supported operation.
    pub fn desc(&self) -> Option<&'static InstrDesc> {
        match self.fields {
            Fields::R(r) => isa::lookup_opcode(self.opcode.get(), r.funct.get()),
            Fields::I(_) | Fields::J(_) => isa::lookup_opcode(self.opcode.get(), 0),
            Fields::Unknown(_) => None,
        }
    }
}
impl std::fmt::Display for SimInstr {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let Some(desc) = self.desc() else {
            return write!(f, ".word {:#010x}", self.encode());
        };
        let name = desc.mnemonic;

        match (desc.template, self.fields) {
            (ITemplate::RdRsRt, Fields::R(r)) => write!(f, "{name} {}, {}, {}", r.rd, r.rs, r.rt),
            (ITemplate::RsRtImm, Fields::I(i)) => write!(f, "{name} {}, {}, {:#06x}", i.rs, i.rt, i.imm),
            (ITemplate::RtImmRs, Fields::I(i)) => write!(f, "{name} {}, {:#06x}({})", i.rt, i.imm, i.rs),
            (ITemplate::JImm, Fields::J(j)) => write!(f, "{name} {:#010x}", j.target),
            _ => write!(f, ".word {:#010x}", self.encode()),
        }
    }
}

#[cfg(test)]
mod tests {
    use rand::rngs::StdRng;
    use rand::{Rng, SeedableRng};

    use crate::ast::reg_consts::*;
    use crate::ast::{Imm16, Reg, Target26};
    use crate::isa::{ITemplate, Op, INSTRUCTIONS};

    use super::{Fields, IFields, JFields, SimInstr};

    #[test]
    fn test_decode_r() {
        let instr = SimInstr::decode(0x01484820);
        assert_eq!(instr.opcode.get(), 0x00);
        assert_eq!(instr.template, Some(ITemplate::RdRsRt));
        let Fields::R(r) = instr.fields else { panic!("expected R fields, got {:?}", instr.fields) };
        assert_eq!(r.rs, T2);
        assert_eq!(r.rt, T0);
        assert_eq!(r.rd, T1);
        assert_eq!(r.shamt.get(), 0);
        assert_eq!(r.funct.get(), 0x20);
        assert_eq!(instr.desc().map(|d| d.op), Some(Op::Add));
    }

    #[test]
    fn test_decode_i_and_j() {
        // lw $t1, 48($zero)
        let instr = SimInstr::decode(0x8C090030);
        assert_eq!(instr.template, Some(ITemplate::RtImmRs));
        assert_eq!(instr.fields, Fields::I(IFields { rs: ZERO, rt: T1, imm: Imm16::new_trunc(48) }));

        // beq $t1, $t2, -4
        let instr = SimInstr::decode(0x312AFFFC);
        assert_eq!(instr.template, Some(ITemplate::RsRtImm));
        let Fields::I(i) = instr.fields else { panic!("expected I fields") };
        assert_eq!((i.rs, i.rt, i.imm.sext()), (T1, T2, -4));

        // j 0x2345678
        let instr = SimInstr::decode(0x0A345678);
        assert_eq!(instr.template, Some(ITemplate::JImm));
        assert_eq!(instr.fields, Fields::J(JFields { target: Target26::new_trunc(0x2345678) }));
    }

    #[test]
    fn test_decode_unknown() {
        // addi is not modeled
        let instr = SimInstr::decode(0x2128_0001);
        assert_eq!(instr.opcode.get(), 0x08);
        assert_eq!(instr.template, None);
        assert_eq!(instr.fields, Fields::Unknown(0x0128_0001));
        assert_eq!(instr.desc(), None);
        assert_eq!(instr.encode(), 0x2128_0001);

        // opcode 0 with a funct other than add is decodable but not executable
        let instr = SimInstr::decode(0x0000_0000);
        assert_eq!(instr.template, Some(ITemplate::RdRsRt));
        assert_eq!(instr.desc(), None);
        assert_eq!(instr.to_string(), ".word 0x00000000");
    }

    #[test]
    fn test_encode_matches_layout() {
        let add = SimInstr::r(Op::Add.desc(), T0, T1, T2);
        assert_eq!(add.encode(), (9 << 21) | (10 << 16) | (8 << 11) | 0x20);
        assert_eq!(add.encode(), 0x012A4020);

        let sw = SimInstr::i(Op::Sw.desc(), T2, T1, Imm16::new_trunc(12));
        assert_eq!(sw.encode(), (0x2B << 26) | (10 << 21) | (9 << 16) | 12);

        let j = SimInstr::j(Op::J.desc(), Target26::new_trunc(0x0A));
        assert_eq!(j.encode(), 0x0800000A);
    }

    #[test]
    fn test_field_round_trip() {
        let mut rng = StdRng::seed_from_u64(0x2110);
        let mut reg = || Reg(rng.gen_range(0..32));

        for desc in &INSTRUCTIONS {
            for _ in 0..64 {
                let instr = match desc.template {
                    ITemplate::RdRsRt => SimInstr::r(desc, reg(), reg(), reg()),
                    ITemplate::RtImmRs | ITemplate::RsRtImm => SimInstr::i(desc, reg(), reg(), Imm16::new_trunc(0)),
                    ITemplate::JImm => SimInstr::j(desc, Target26::new_trunc(0)),
                };
                assert_eq!(SimInstr::decode(instr.encode()), instr);
            }
        }

        for imm in [0, 1, 0x7FFF, 0x8000, 0xFFFF] {
            let instr = SimInstr::i(Op::Beq.desc(), S0, S1, Imm16::new_trunc(imm));
            assert_eq!(SimInstr::decode(instr.encode()), instr);
        }
        for target in [0, 0x10, 0x03FF_FFFF] {
            let instr = SimInstr::j(Op::J.desc(), Target26::new_trunc(target));
            assert_eq!(SimInstr::decode(instr.encode()), instr);
        }
    }

    #[test]
    fn test_word_round_trip() {
        let mut rng = StdRng::seed_from_u64(0x4D495053);
        for _ in 0..10_000 {
            let word: u32 = rng.gen();
            assert_eq!(SimInstr::decode(word).encode(), word, "{word:#010x}");
        }
    }

    #[test]
    fn test_disassembly() {
        let fmt = |w| SimInstr::decode(w).to_string();

        assert_eq!(fmt(0x014B4820), "add $t1, $t2, $t3");
        assert_eq!(fmt(0x8C090030), "lw $t1, 0x0030($zero)");
        assert_eq!(fmt(0xAD090004), "sw $t1, 0x0004($t0)");
        assert_eq!(fmt(0x312A0010), "beq $t1, $t2, 0x0010");
        assert_eq!(fmt(0x0800000A), "j 0x0000000a");
        assert_eq!(fmt(0xFC00_0000), ".word 0xfc000000");
    }
}
