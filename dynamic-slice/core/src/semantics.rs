//! Data-driven x86 / x86-64 instruction semantics.
//!
//! Every known mnemonic maps to a [`Handler`] that says which textual
//! arguments are read or written and which implicit operands (stack slots,
//! flags, index registers, syscall arguments) the instruction touches.
//! Mnemonics missing from the table decode with no operands.

use phf::phf_map;
use tracing::{error, trace, warn};

use crate::architecture::{ArchDescription, Architecture};
use crate::backend::Backend;
use crate::eval;
use crate::instruction::Instruction;
use crate::operand::{Direction, Operand};
use crate::resolver::Classifier;
use crate::Hex;

/// Argument shapes: one direction per textual argument, in order.
pub mod shape {
    use crate::operand::Direction;

    const S_: Direction = Direction::SOURCE;
    const D_: Direction = Direction::DESTINATION;
    const B_: Direction = Direction::BOTH;

    pub const NONE: &[Direction] = &[];
    pub const S: &[Direction] = &[S_];
    pub const D: &[Direction] = &[D_];
    pub const B: &[Direction] = &[B_];
    pub const DS: &[Direction] = &[D_, S_];
    pub const BS: &[Direction] = &[B_, S_];
    pub const BB: &[Direction] = &[B_, B_];
    pub const SS: &[Direction] = &[S_, S_];
    pub const DSS: &[Direction] = &[D_, S_, S_];
    pub const BSS: &[Direction] = &[B_, S_, S_];
}

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum StringOp {
    Move,
    Store,
    Load,
    Scan,
    Compare,
}

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum Handler {
    Shape(&'static [Direction]),
    /// `xor eax,eax` style: identical sources only write the destination.
    SelfClearing,
    LoadAddress,
    Blend { variable: bool },
    Multiply,
    Divide,
    CompareExchange,
    /// `cbw`, `cwde`, `cdqe`
    ConvertExtend,
    /// `cwd`, `cdq`, `cqo`
    ConvertSplit,
    Lahf,
    Sahf,
    Aad,
    Loop,
    String(StringOp, Option<u64>),
    Push,
    Pop,
    PushFlags,
    PopFlags,
    PushAll(u64),
    PopAll(u64),
    Call,
    Return,
    FarReturn,
    InterruptReturn,
    Enter,
    Leave,
    Syscall,
    Interrupt,
}

use Handler::Shape;

static TABLE: phf::Map<&'static str, Handler> = phf_map! {
    "aaa" => Shape(shape::NONE),
    "aad" => Handler::Aad,
    "aam" => Shape(shape::NONE),
    "aas" => Shape(shape::NONE),
    "adc" => Shape(shape::BS),
    "add" => Shape(shape::BS),
    "addpd" => Shape(shape::BS),
    "addps" => Shape(shape::BS),
    "addsd" => Shape(shape::BS),
    "addss" => Shape(shape::BS),
    "addsubpd" => Shape(shape::BS),
    "addsubps" => Shape(shape::BS),
    "and" => Shape(shape::BS),
    "andn" => Shape(shape::DSS),
    "andnpd" => Shape(shape::BS),
    "andnps" => Shape(shape::BS),
    "andpd" => Shape(shape::BS),
    "andps" => Shape(shape::BS),
    "arpl" => Shape(shape::NONE),
    "blendpd" => Handler::Blend { variable: false },
    "blendps" => Handler::Blend { variable: false },
    "blendvpd" => Handler::Blend { variable: true },
    "blendvps" => Handler::Blend { variable: true },
    "bound" => Shape(shape::NONE),
    "bsf" => Shape(shape::DS),
    "bsr" => Shape(shape::DS),
    "bswap" => Shape(shape::B),
    "bt" => Shape(shape::SS),
    "btc" => Shape(shape::BS),
    "btr" => Shape(shape::BS),
    "bts" => Shape(shape::BS),
    "call" => Handler::Call,
    "callf" => Handler::Call,
    "calln" => Handler::Call,
    "cbw" => Handler::ConvertExtend,
    "cdq" => Handler::ConvertSplit,
    "cdqe" => Handler::ConvertExtend,
    "clc" => Shape(shape::NONE),
    "cld" => Shape(shape::NONE),
    "cli" => Shape(shape::NONE),
    "clts" => Shape(shape::NONE),
    "cmc" => Shape(shape::NONE),
    "cmova" => Shape(shape::DS),
    "cmovae" => Shape(shape::DS),
    "cmovb" => Shape(shape::DS),
    "cmovbe" => Shape(shape::DS),
    "cmove" => Shape(shape::DS),
    "cmovg" => Shape(shape::DS),
    "cmovge" => Shape(shape::DS),
    "cmovl" => Shape(shape::DS),
    "cmovle" => Shape(shape::DS),
    "cmovne" => Shape(shape::DS),
    "cmovno" => Shape(shape::DS),
    "cmovnp" => Shape(shape::DS),
    "cmovns" => Shape(shape::DS),
    "cmovo" => Shape(shape::DS),
    "cmovp" => Shape(shape::DS),
    "cmovs" => Shape(shape::DS),
    "cmp" => Shape(shape::SS),
    "cmppd" => Shape(shape::BSS),
    "cmpps" => Shape(shape::BSS),
    "cmps" => Handler::String(StringOp::Compare, None),
    "cmpsb" => Handler::String(StringOp::Compare, Some(1)),
    "cmpsd" => Handler::String(StringOp::Compare, Some(4)),
    "cmpsq" => Handler::String(StringOp::Compare, Some(8)),
    "cmpss" => Shape(shape::BSS),
    "cmpsw" => Handler::String(StringOp::Compare, Some(2)),
    "cmpxchg" => Handler::CompareExchange,
    "comisd" => Shape(shape::SS),
    "comiss" => Shape(shape::SS),
    "cqo" => Handler::ConvertSplit,
    "cvtdq2pd" => Shape(shape::DS),
    "cvtdq2ps" => Shape(shape::DS),
    "cvtpd2dq" => Shape(shape::DS),
    "cvtpd2pi" => Shape(shape::DS),
    "cvtpd2ps" => Shape(shape::DS),
    "cvtpi2pd" => Shape(shape::DS),
    "cvtpi2ps" => Shape(shape::DS),
    "cvtps2dq" => Shape(shape::DS),
    "cvtps2pd" => Shape(shape::DS),
    "cvtps2pi" => Shape(shape::DS),
    "cvtsd2si" => Shape(shape::DS),
    "cvtsd2ss" => Shape(shape::DS),
    "cvtsi2sd" => Shape(shape::DS),
    "cvtsi2ss" => Shape(shape::DS),
    "cvtss2sd" => Shape(shape::DS),
    "cvtss2si" => Shape(shape::DS),
    "cvttpd2dq" => Shape(shape::DS),
    "cvttpd2pi" => Shape(shape::DS),
    "cvttps2dq" => Shape(shape::DS),
    "cvttps2pi" => Shape(shape::DS),
    "cvttsd2si" => Shape(shape::DS),
    "cvttss2si" => Shape(shape::DS),
    "cwd" => Handler::ConvertSplit,
    "cwde" => Handler::ConvertExtend,
    "daa" => Shape(shape::NONE),
    "das" => Shape(shape::NONE),
    "dec" => Shape(shape::B),
    "div" => Handler::Divide,
    "divpd" => Shape(shape::BS),
    "divps" => Shape(shape::BS),
    "divsd" => Shape(shape::BS),
    "divss" => Shape(shape::BS),
    "dppd" => Shape(shape::BSS),
    "dpps" => Shape(shape::BSS),
    "endbr32" => Shape(shape::NONE),
    "endbr64" => Shape(shape::NONE),
    "enter" => Handler::Enter,
    "extractps" => Shape(shape::DSS),
    "fimul" => Shape(shape::S),
    "fwait" => Shape(shape::NONE),
    "haddpd" => Shape(shape::BS),
    "haddps" => Shape(shape::BS),
    "hlt" => Shape(shape::NONE),
    "hsubpd" => Shape(shape::BS),
    "hsubps" => Shape(shape::BS),
    "idiv" => Handler::Divide,
    "imul" => Handler::Multiply,
    "in" => Shape(shape::NONE),
    "inc" => Shape(shape::B),
    "insb" => Shape(shape::NONE),
    "insd" => Shape(shape::NONE),
    "insertps" => Shape(shape::BSS),
    "insw" => Shape(shape::NONE),
    "int" => Handler::Interrupt,
    "int1" => Shape(shape::NONE),
    "int3" => Shape(shape::NONE),
    "into" => Shape(shape::NONE),
    "iret" => Handler::InterruptReturn,
    "iretd" => Handler::InterruptReturn,
    "iretq" => Handler::InterruptReturn,
    "ja" => Shape(shape::S),
    "jae" => Shape(shape::S),
    "jb" => Shape(shape::S),
    "jbe" => Shape(shape::S),
    "jc" => Shape(shape::S),
    "jcxz" => Shape(shape::S),
    "je" => Shape(shape::S),
    "jecxz" => Shape(shape::S),
    "jeq" => Shape(shape::S),
    "jg" => Shape(shape::S),
    "jge" => Shape(shape::S),
    "jl" => Shape(shape::S),
    "jle" => Shape(shape::S),
    "jmp" => Shape(shape::S),
    "jmpf" => Shape(shape::S),
    "jmpn" => Shape(shape::S),
    "jnc" => Shape(shape::S),
    "jne" => Shape(shape::S),
    "jno" => Shape(shape::S),
    "jnp" => Shape(shape::S),
    "jns" => Shape(shape::S),
    "jnz" => Shape(shape::S),
    "jo" => Shape(shape::S),
    "jp" => Shape(shape::S),
    "jpe" => Shape(shape::S),
    "jpo" => Shape(shape::S),
    "jrcxz" => Shape(shape::S),
    "js" => Shape(shape::S),
    "jz" => Shape(shape::S),
    "lahf" => Handler::Lahf,
    "lar" => Shape(shape::NONE),
    "lddqu" => Shape(shape::DS),
    "lds" => Shape(shape::DS),
    "lea" => Handler::LoadAddress,
    "leave" => Handler::Leave,
    "les" => Shape(shape::DS),
    "lgs" => Shape(shape::DS),
    "lldt" => Shape(shape::S),
    "lods" => Handler::String(StringOp::Load, None),
    "lodsb" => Handler::String(StringOp::Load, Some(1)),
    "lodsd" => Handler::String(StringOp::Load, Some(4)),
    "lodsq" => Handler::String(StringOp::Load, Some(8)),
    "lodsw" => Handler::String(StringOp::Load, Some(2)),
    "loop" => Handler::Loop,
    "loope" => Handler::Loop,
    "loopne" => Handler::Loop,
    "lsl" => Shape(shape::NONE),
    "lss" => Shape(shape::DS),
    "ltr" => Shape(shape::S),
    "lzcnt" => Shape(shape::DS),
    "maskmovdqu" => Shape(shape::SS),
    "maskmovq" => Shape(shape::SS),
    "maxpd" => Shape(shape::BS),
    "maxps" => Shape(shape::BS),
    "maxsd" => Shape(shape::BS),
    "maxss" => Shape(shape::BS),
    "minpd" => Shape(shape::BS),
    "minps" => Shape(shape::BS),
    "minsd" => Shape(shape::BS),
    "minss" => Shape(shape::BS),
    "mov" => Shape(shape::DS),
    "movabs" => Shape(shape::DS),
    "movapd" => Shape(shape::DS),
    "movaps" => Shape(shape::DS),
    "movbe" => Shape(shape::DS),
    "movd" => Shape(shape::DS),
    "movddup" => Shape(shape::DS),
    "movdq2q" => Shape(shape::DS),
    "movdqa" => Shape(shape::DS),
    "movdqu" => Shape(shape::DS),
    "movhlps" => Shape(shape::BS),
    "movhpd" => Shape(shape::BS),
    "movhps" => Shape(shape::BS),
    "movlhps" => Shape(shape::BS),
    "movlpd" => Shape(shape::BS),
    "movlps" => Shape(shape::BS),
    "movmskpd" => Shape(shape::DS),
    "movmskps" => Shape(shape::DS),
    "movntdq" => Shape(shape::DS),
    "movntdqa" => Shape(shape::DS),
    "movnti" => Shape(shape::DS),
    "movntpd" => Shape(shape::DS),
    "movntps" => Shape(shape::DS),
    "movntq" => Shape(shape::DS),
    "movntsd" => Shape(shape::DS),
    "movntss" => Shape(shape::DS),
    "movq" => Shape(shape::DS),
    "movq2dq" => Shape(shape::DS),
    "movs" => Handler::String(StringOp::Move, None),
    "movsb" => Handler::String(StringOp::Move, Some(1)),
    "movsd" => Handler::String(StringOp::Move, Some(4)),
    "movshdup" => Shape(shape::DS),
    "movsldup" => Shape(shape::DS),
    "movsq" => Handler::String(StringOp::Move, Some(8)),
    "movss" => Shape(shape::DS),
    "movsw" => Handler::String(StringOp::Move, Some(2)),
    "movsx" => Shape(shape::DS),
    "movsxd" => Shape(shape::DS),
    "movupd" => Shape(shape::DS),
    "movups" => Shape(shape::DS),
    "movzx" => Shape(shape::DS),
    "mpsadbw" => Shape(shape::BSS),
    "mul" => Handler::Multiply,
    "mulpd" => Shape(shape::BS),
    "mulps" => Shape(shape::BS),
    "mulsd" => Shape(shape::BS),
    "mulss" => Shape(shape::BS),
    "neg" => Shape(shape::B),
    "nop" => Shape(shape::NONE),
    "not" => Shape(shape::B),
    "or" => Shape(shape::BS),
    "orpd" => Shape(shape::BS),
    "orps" => Shape(shape::BS),
    "out" => Shape(shape::NONE),
    "outsb" => Shape(shape::NONE),
    "outsd" => Shape(shape::NONE),
    "outsw" => Shape(shape::NONE),
    "pabsb" => Shape(shape::DS),
    "pabsd" => Shape(shape::DS),
    "pabsw" => Shape(shape::DS),
    "packssdw" => Shape(shape::BS),
    "packsswb" => Shape(shape::BS),
    "packusdw" => Shape(shape::BS),
    "packuswb" => Shape(shape::BS),
    "paddb" => Shape(shape::BS),
    "paddd" => Shape(shape::BS),
    "paddq" => Shape(shape::BS),
    "paddsb" => Shape(shape::BS),
    "paddsw" => Shape(shape::BS),
    "paddusb" => Shape(shape::BS),
    "paddusw" => Shape(shape::BS),
    "paddw" => Shape(shape::BS),
    "palignr" => Shape(shape::BSS),
    "pand" => Shape(shape::BS),
    "pandn" => Shape(shape::BS),
    "pause" => Shape(shape::NONE),
    "pavgb" => Shape(shape::BS),
    "pavgw" => Shape(shape::BS),
    "pblendvb" => Handler::Blend { variable: true },
    "pblendw" => Handler::Blend { variable: false },
    "pcmpeqb" => Shape(shape::BS),
    "pcmpeqd" => Shape(shape::BS),
    "pcmpeqq" => Shape(shape::BS),
    "pcmpeqw" => Shape(shape::BS),
    "pcmpestri" => Shape(shape::SS),
    "pcmpestrm" => Shape(shape::SS),
    "pcmpgtb" => Shape(shape::BS),
    "pcmpgtd" => Shape(shape::BS),
    "pcmpgtq" => Shape(shape::BS),
    "pcmpgtw" => Shape(shape::BS),
    "pcmpistri" => Shape(shape::SS),
    "pcmpistrm" => Shape(shape::SS),
    "pextrb" => Shape(shape::DSS),
    "pextrd" => Shape(shape::DSS),
    "pextrq" => Shape(shape::DSS),
    "pextrw" => Shape(shape::DSS),
    "phaddd" => Shape(shape::BS),
    "phaddsw" => Shape(shape::BS),
    "phaddw" => Shape(shape::BS),
    "phminposuw" => Shape(shape::DS),
    "phsubd" => Shape(shape::BS),
    "phsubsw" => Shape(shape::BS),
    "phsubw" => Shape(shape::BS),
    "pinsrb" => Shape(shape::BSS),
    "pinsrd" => Shape(shape::BSS),
    "pinsrq" => Shape(shape::BSS),
    "pinsrw" => Shape(shape::BSS),
    "pmaddubsw" => Shape(shape::BS),
    "pmaddwd" => Shape(shape::BS),
    "pmaxsb" => Shape(shape::BS),
    "pmaxsd" => Shape(shape::BS),
    "pmaxsw" => Shape(shape::BS),
    "pmaxub" => Shape(shape::BS),
    "pmaxud" => Shape(shape::BS),
    "pmaxuw" => Shape(shape::BS),
    "pminsb" => Shape(shape::BS),
    "pminsd" => Shape(shape::BS),
    "pminsw" => Shape(shape::BS),
    "pminub" => Shape(shape::BS),
    "pminud" => Shape(shape::BS),
    "pminuw" => Shape(shape::BS),
    "pmovmskb" => Shape(shape::DS),
    "pmovsxbd" => Shape(shape::DS),
    "pmovsxbq" => Shape(shape::DS),
    "pmovsxbw" => Shape(shape::DS),
    "pmovsxdq" => Shape(shape::DS),
    "pmovsxwd" => Shape(shape::DS),
    "pmovsxwq" => Shape(shape::DS),
    "pmovzxbd" => Shape(shape::DS),
    "pmovzxbq" => Shape(shape::DS),
    "pmovzxbw" => Shape(shape::DS),
    "pmovzxdq" => Shape(shape::DS),
    "pmovzxwd" => Shape(shape::DS),
    "pmovzxwq" => Shape(shape::DS),
    "pmuldq" => Shape(shape::BS),
    "pmulhrsw" => Shape(shape::BS),
    "pmulhuw" => Shape(shape::BS),
    "pmulhw" => Shape(shape::BS),
    "pmulld" => Shape(shape::BS),
    "pmullw" => Shape(shape::BS),
    "pmuludq" => Shape(shape::BS),
    "pop" => Handler::Pop,
    "popa" => Handler::PopAll(2),
    "popad" => Handler::PopAll(4),
    "popcnt" => Shape(shape::DS),
    "popf" => Handler::PopFlags,
    "popfd" => Handler::PopFlags,
    "popfq" => Handler::PopFlags,
    "por" => Shape(shape::BS),
    "psadbw" => Shape(shape::BS),
    "pshufb" => Shape(shape::BS),
    "pshufd" => Shape(shape::DSS),
    "pshufhw" => Shape(shape::DSS),
    "pshuflw" => Shape(shape::DSS),
    "pshufw" => Shape(shape::DSS),
    "psignb" => Shape(shape::BS),
    "psignd" => Shape(shape::BS),
    "psignw" => Shape(shape::BS),
    "pslld" => Shape(shape::BS),
    "pslldq" => Shape(shape::BS),
    "psllq" => Shape(shape::BS),
    "psllw" => Shape(shape::BS),
    "psrad" => Shape(shape::BS),
    "psraw" => Shape(shape::BS),
    "psrld" => Shape(shape::BS),
    "psrldq" => Shape(shape::BS),
    "psrlq" => Shape(shape::BS),
    "psrlw" => Shape(shape::BS),
    "psubb" => Shape(shape::BS),
    "psubd" => Shape(shape::BS),
    "psubq" => Shape(shape::BS),
    "psubsb" => Shape(shape::BS),
    "psubsw" => Shape(shape::BS),
    "psubusb" => Shape(shape::BS),
    "psubusw" => Shape(shape::BS),
    "psubw" => Shape(shape::BS),
    "ptest" => Shape(shape::SS),
    "punpckhbw" => Shape(shape::BS),
    "punpckhdq" => Shape(shape::BS),
    "punpckhqdq" => Shape(shape::BS),
    "punpckhwd" => Shape(shape::BS),
    "punpcklbw" => Shape(shape::BS),
    "punpckldq" => Shape(shape::BS),
    "punpcklqdq" => Shape(shape::BS),
    "punpcklwd" => Shape(shape::BS),
    "push" => Handler::Push,
    "pusha" => Handler::PushAll(2),
    "pushad" => Handler::PushAll(4),
    "pushf" => Handler::PushFlags,
    "pushfd" => Handler::PushFlags,
    "pushfq" => Handler::PushFlags,
    "pxor" => Handler::SelfClearing,
    "rcl" => Shape(shape::BS),
    "rcr" => Shape(shape::BS),
    "ret" => Handler::Return,
    "retf" => Handler::FarReturn,
    "retn" => Handler::Return,
    "rol" => Shape(shape::BS),
    "ror" => Shape(shape::BS),
    "roundpd" => Shape(shape::DSS),
    "roundps" => Shape(shape::DSS),
    "roundsd" => Shape(shape::DSS),
    "roundss" => Shape(shape::DSS),
    "sahf" => Handler::Sahf,
    "sal" => Shape(shape::BS),
    "sar" => Shape(shape::BS),
    "sbb" => Shape(shape::BS),
    "scas" => Handler::String(StringOp::Scan, None),
    "scasb" => Handler::String(StringOp::Scan, Some(1)),
    "scasd" => Handler::String(StringOp::Scan, Some(4)),
    "scasq" => Handler::String(StringOp::Scan, Some(8)),
    "scasw" => Handler::String(StringOp::Scan, Some(2)),
    "seta" => Shape(shape::D),
    "setae" => Shape(shape::D),
    "setb" => Shape(shape::D),
    "setbe" => Shape(shape::D),
    "sete" => Shape(shape::D),
    "setg" => Shape(shape::D),
    "setge" => Shape(shape::D),
    "setl" => Shape(shape::D),
    "setle" => Shape(shape::D),
    "setne" => Shape(shape::D),
    "setno" => Shape(shape::D),
    "setnp" => Shape(shape::D),
    "setns" => Shape(shape::D),
    "seto" => Shape(shape::D),
    "setp" => Shape(shape::D),
    "setpe" => Shape(shape::D),
    "setpo" => Shape(shape::D),
    "sets" => Shape(shape::D),
    "shl" => Shape(shape::BS),
    "shld" => Shape(shape::BSS),
    "shr" => Shape(shape::BS),
    "shrd" => Shape(shape::BSS),
    "shufpd" => Shape(shape::BSS),
    "shufps" => Shape(shape::BSS),
    "sldt" => Shape(shape::D),
    "sqrtpd" => Shape(shape::DS),
    "sqrtps" => Shape(shape::DS),
    "sqrtsd" => Shape(shape::DS),
    "sqrtss" => Shape(shape::DS),
    "stc" => Shape(shape::NONE),
    "std" => Shape(shape::NONE),
    "sti" => Shape(shape::NONE),
    "stos" => Handler::String(StringOp::Store, None),
    "stosb" => Handler::String(StringOp::Store, Some(1)),
    "stosd" => Handler::String(StringOp::Store, Some(4)),
    "stosq" => Handler::String(StringOp::Store, Some(8)),
    "stosw" => Handler::String(StringOp::Store, Some(2)),
    "str" => Shape(shape::D),
    "sub" => Handler::SelfClearing,
    "subpd" => Shape(shape::BS),
    "subps" => Shape(shape::BS),
    "subsd" => Shape(shape::BS),
    "subss" => Shape(shape::BS),
    "syscall" => Handler::Syscall,
    "sysenter" => Handler::Syscall,
    "test" => Shape(shape::SS),
    "tzcnt" => Shape(shape::DS),
    "ucomisd" => Shape(shape::SS),
    "ucomiss" => Shape(shape::SS),
    "ud2" => Shape(shape::NONE),
    "unpckhpd" => Shape(shape::BS),
    "unpckhps" => Shape(shape::BS),
    "unpcklpd" => Shape(shape::BS),
    "unpcklps" => Shape(shape::BS),
    "verr" => Shape(shape::NONE),
    "verw" => Shape(shape::NONE),
    "vmovapd" => Shape(shape::DS),
    "vmovaps" => Shape(shape::DS),
    "vmovd" => Shape(shape::DS),
    "vmovdqa" => Shape(shape::DS),
    "vmovdqu" => Shape(shape::DS),
    "vmovq" => Shape(shape::DS),
    "vmovupd" => Shape(shape::DS),
    "vmovups" => Shape(shape::DS),
    "vpcmpeqb" => Shape(shape::DSS),
    "vpminub" => Shape(shape::DSS),
    "vpmovmskb" => Shape(shape::DS),
    "vpor" => Shape(shape::DSS),
    "vpunpcklbw" => Shape(shape::DSS),
    "vpunpckldq" => Shape(shape::DSS),
    "vpunpcklqdq" => Shape(shape::DSS),
    "vpunpcklwd" => Shape(shape::DSS),
    "vpxor" => Handler::SelfClearing,
    "vxorps" => Handler::SelfClearing,
    "xadd" => Shape(shape::BB),
    "xchg" => Shape(shape::BB),
    "xor" => Handler::SelfClearing,
    "xorpd" => Handler::SelfClearing,
    "xorps" => Handler::SelfClearing,
};

const PREFIXES: &[&str] = &[
    "rep", "repe", "repz", "repne", "repnz", "lock", "bnd", "notrack",
];

const PUSH_ALL_WORD: [&str; 8] = ["ax", "cx", "dx", "bx", "sp", "bp", "si", "di"];
const PUSH_ALL_DWORD: [&str; 8] = ["eax", "ecx", "edx", "ebx", "esp", "ebp", "esi", "edi"];

/// Look up the semantics of `mnemonic`.
pub fn handler(mnemonic: &str) -> Option<Handler> {
    TABLE.get(mnemonic).copied()
}

fn split_word(text: &str) -> (&str, &str) {
    let text = text.trim_start();
    match text.split_once(char::is_whitespace) {
        Some((word, rest)) => (word, rest.trim()),
        None => (text.trim_end(), ""),
    }
}

fn argument(c: &mut Classifier<'_>, args: &[&str], index: usize, direction: Direction) {
    match args.get(index) {
        Some(arg) => c.argument(arg, direction),
        None => trace!(index, "missing operand"),
    }
}

fn apply_shape(c: &mut Classifier<'_>, args: &[&str], shape: &[Direction]) {
    for (index, direction) in shape.iter().enumerate() {
        argument(c, args, index, *direction);
    }
}

/// Add `width` bytes of stack at `sp + offset`.
fn stack_slot(c: &mut Classifier<'_>, offset: i64, width: u64, direction: Direction) {
    let sp = c.arch().stack_pointer;
    let expression = match offset {
        0 => format!("[{sp}]"),
        o if o < 0 => format!("[{sp}-{:#x}]", o.unsigned_abs()),
        o => format!("[{sp}+{o:#x}]"),
    };
    c.memory(&expression, width, direction);
}

fn sized_accumulator(arch: &ArchDescription, width: u64) -> &'static str {
    match width {
        1 => "al",
        2 => "ax",
        4 => "eax",
        _ => arch.accumulator,
    }
}

fn is_vector_register(arg: &str) -> bool {
    arg.starts_with("xmm") || arg.starts_with("ymm")
}

impl Handler {
    pub(crate) fn apply(self, c: &mut Classifier<'_>, args: &[&str], last_return: u64) {
        let arch = c.arch();
        let width = arch.pointer_width;
        let w = width as i64;

        match self {
            Shape(shape) => apply_shape(c, args, shape),
            Handler::SelfClearing => match args {
                [dst, a, b] if a == b => c.argument(dst, Direction::DESTINATION),
                [_, _, _] => apply_shape(c, args, shape::DSS),
                [dst, src] if dst == src => c.argument(dst, Direction::DESTINATION),
                _ => apply_shape(c, args, shape::BS),
            },
            Handler::LoadAddress => {
                argument(c, args, 0, Direction::DESTINATION);
                match args.get(1) {
                    Some(expression) => c.memory(expression, 0, Direction::SOURCE),
                    None => trace!(index = 1, "missing operand"),
                }
            }
            Handler::Blend { variable } => {
                argument(c, args, 0, Direction::BOTH);
                argument(c, args, 1, Direction::SOURCE);
                if variable {
                    match args.get(2) {
                        Some(mask) => c.argument(mask, Direction::SOURCE),
                        None => c.register("xmm0", Direction::SOURCE),
                    }
                }
            }
            Handler::Multiply => match args.len() {
                1 => {
                    argument(c, args, 0, Direction::SOURCE);
                    c.register(arch.accumulator, Direction::BOTH);
                    c.register(arch.data, Direction::DESTINATION);
                }
                2 => apply_shape(c, args, shape::BS),
                _ => apply_shape(c, args, shape::DSS),
            },
            Handler::Divide => {
                argument(c, args, 0, Direction::SOURCE);
                c.register(arch.accumulator, Direction::BOTH);
                c.register(arch.data, Direction::BOTH);
            }
            Handler::CompareExchange => {
                argument(c, args, 0, Direction::BOTH);
                argument(c, args, 1, Direction::SOURCE);
                c.register(arch.accumulator, Direction::BOTH);
            }
            Handler::ConvertExtend => c.register(arch.accumulator, Direction::BOTH),
            Handler::ConvertSplit => {
                c.register(arch.accumulator, Direction::SOURCE);
                c.register(arch.data, Direction::DESTINATION);
            }
            Handler::Lahf => {
                c.register("eflags", Direction::SOURCE);
                c.register("ah", Direction::DESTINATION);
            }
            Handler::Sahf => {
                c.register("ah", Direction::SOURCE);
                c.register("eflags", Direction::DESTINATION);
            }
            Handler::Aad => {
                c.register("ah", Direction::SOURCE);
                c.register("al", Direction::BOTH);
            }
            Handler::Loop => {
                argument(c, args, 0, Direction::SOURCE);
                c.register(arch.counter, Direction::BOTH);
            }
            Handler::String(op, width) => string_op(c, args, op, width),
            Handler::Push => {
                stack_slot(c, -w, width, Direction::DESTINATION);
                c.register(arch.stack_pointer, Direction::DESTINATION);
                argument(c, args, 0, Direction::SOURCE);
            }
            Handler::Pop => {
                stack_slot(c, 0, width, Direction::SOURCE);
                c.register(arch.stack_pointer, Direction::DESTINATION);
                argument(c, args, 0, Direction::DESTINATION);
            }
            Handler::PushFlags => {
                stack_slot(c, -w, width, Direction::DESTINATION);
                c.register(arch.stack_pointer, Direction::DESTINATION);
                c.register("eflags", Direction::SOURCE);
            }
            Handler::PopFlags => {
                stack_slot(c, 0, width, Direction::SOURCE);
                c.register(arch.stack_pointer, Direction::DESTINATION);
                c.register("eflags", Direction::DESTINATION);
            }
            Handler::PushAll(slot) | Handler::PopAll(slot) if arch.pointer_width != 4 => {
                trace!(slot, "pusha/popa are invalid in 64-bit mode");
            }
            Handler::PushAll(slot) => {
                let registers = if slot == 2 { PUSH_ALL_WORD } else { PUSH_ALL_DWORD };
                for (i, register) in registers.iter().enumerate() {
                    stack_slot(c, -((i as i64 + 1) * slot as i64), slot, Direction::DESTINATION);
                    c.register(register, Direction::SOURCE);
                }
                c.register(arch.stack_pointer, Direction::DESTINATION);
            }
            Handler::PopAll(slot) => {
                let registers = if slot == 2 { PUSH_ALL_WORD } else { PUSH_ALL_DWORD };
                // The saved stack pointer slot is discarded.
                for (i, register) in registers.iter().rev().enumerate() {
                    stack_slot(c, i as i64 * slot as i64, slot, Direction::SOURCE);
                    if i != 3 {
                        c.register(register, Direction::DESTINATION);
                    }
                }
                c.register(arch.stack_pointer, Direction::DESTINATION);
            }
            Handler::Call => {
                argument(c, args, 0, Direction::SOURCE);
                c.register(arch.instruction_pointer, Direction::DESTINATION);
                c.register(arch.stack_pointer, Direction::DESTINATION);
                stack_slot(c, -w, width, Direction::DESTINATION);
            }
            Handler::Return | Handler::FarReturn | Handler::InterruptReturn => {
                c.register(arch.instruction_pointer, Direction::DESTINATION);
                c.register(arch.stack_pointer, Direction::DESTINATION);
                stack_slot(c, 0, width, Direction::SOURCE);
                if self != Handler::Return {
                    stack_slot(c, w, width, Direction::SOURCE);
                }
                if self == Handler::InterruptReturn {
                    stack_slot(c, 2 * w, width, Direction::SOURCE);
                }
            }
            Handler::Enter => {
                stack_slot(c, -w, width, Direction::DESTINATION);
                c.register(arch.frame_pointer, Direction::BOTH);
                c.register(arch.stack_pointer, Direction::DESTINATION);
            }
            Handler::Leave => {
                c.register(arch.frame_pointer, Direction::DESTINATION);
                c.register(arch.stack_pointer, Direction::DESTINATION);
                c.memory(&format!("[{}]", arch.frame_pointer), width, Direction::SOURCE);
            }
            Handler::Syscall => syscall(c, last_return),
            Handler::Interrupt => match args.first() {
                Some(&"0x80") if arch.legacy_syscall_gate => syscall(c, last_return),
                _ => trace!(?args, "interrupt without modelled semantics"),
            },
        }
    }
}

fn string_op(c: &mut Classifier<'_>, args: &[&str], op: StringOp, width: Option<u64>) {
    let arch = c.arch();

    // SSE instructions share the `movsd` and `cmpsd` mnemonics.
    if args.iter().any(|a| is_vector_register(a)) {
        let shape = match op {
            StringOp::Compare => shape::BSS,
            _ => shape::DS,
        };
        return apply_shape(c, args, shape);
    }

    let si = arch.source_index;
    let di = arch.destination_index;

    if !args.is_empty() {
        match op {
            StringOp::Move => {
                argument(c, args, 0, Direction::DESTINATION);
                argument(c, args, 1, Direction::SOURCE);
            }
            StringOp::Store | StringOp::Load => apply_shape(c, args, shape::DS),
            StringOp::Scan | StringOp::Compare => apply_shape(c, args, shape::SS),
        }
    } else {
        let width = width.unwrap_or(arch.pointer_width);
        let source = format!("[{si}]");
        let destination = format!("[{di}]");
        let accumulator = sized_accumulator(arch, width);
        match op {
            StringOp::Move => {
                c.memory(&source, width, Direction::SOURCE);
                c.memory(&destination, width, Direction::DESTINATION);
            }
            StringOp::Store => {
                c.memory(&destination, width, Direction::DESTINATION);
                c.register(accumulator, Direction::SOURCE);
            }
            StringOp::Load => {
                c.memory(&source, width, Direction::SOURCE);
                c.register(accumulator, Direction::DESTINATION);
            }
            StringOp::Scan => {
                c.register(accumulator, Direction::SOURCE);
                c.memory(&destination, width, Direction::SOURCE);
            }
            StringOp::Compare => {
                c.memory(&source, width, Direction::SOURCE);
                c.memory(&destination, width, Direction::SOURCE);
            }
        }
    }

    if matches!(op, StringOp::Move | StringOp::Load | StringOp::Compare) {
        c.register(si, Direction::BOTH);
    }
    if matches!(op, StringOp::Move | StringOp::Store | StringOp::Scan | StringOp::Compare) {
        c.register(di, Direction::BOTH);
    }
}

fn syscall(c: &mut Classifier<'_>, last_return: u64) {
    let arch = c.arch();
    let number = c.evaluate(&format!("${}", arch.syscall_number));

    if number == arch.read_syscall && arch.signed(last_return) > 0 {
        c.memory(
            &format!("[{}]", arch.read_buffer),
            last_return,
            Direction::DESTINATION,
        );
    }

    let Some(syscall) = arch.syscall(number) else {
        trace!(number, "unknown syscall");
        return;
    };

    c.register(arch.syscall_number, Direction::DESTINATION);
    for register in arch.syscall_arguments.iter().take(syscall.arguments) {
        c.register(register, Direction::SOURCE);
    }
    c.instruction().annotate(&format!("<{}>", syscall.name));
}

/// Decodes instructions for one architecture and carries the per-session
/// decode state.
#[derive(Debug)]
pub struct Semantics {
    arch: &'static ArchDescription,
    monitor_stack: bool,
    last_return: u64,
}

impl Semantics {
    pub fn new(arch: Architecture) -> Self {
        Self {
            arch: arch.description(),
            monitor_stack: false,
            last_return: 0,
        }
    }

    pub fn arch(&self) -> &'static ArchDescription {
        self.arch
    }

    pub fn monitor_stack(&self) -> bool {
        self.monitor_stack
    }

    pub fn set_monitor_stack(&mut self, monitor: bool) {
        self.monitor_stack = monitor;
    }

    /// Return-register value recorded before the last backward step.
    pub fn last_return(&self) -> u64 {
        self.last_return
    }

    pub fn record_return(&mut self, backend: &dyn Backend) {
        let expression = format!("${}", self.arch.return_register);
        self.last_return = backend.evaluate_expression(&expression).unwrap_or_else(|err| {
            warn!(%expression, error = %err, "failed to read return register");
            0
        });
    }

    /// Operands never added to the tracked set: immediates, and stack /
    /// frame / instruction pointers unless the stack is monitored.
    pub fn is_ignored(&self, operand: &Operand) -> bool {
        if operand.is_immediate() {
            return true;
        }
        match operand.as_register() {
            Some(register) => !self.monitor_stack && self.arch.is_pointer_group(&register.group()),
            None => false,
        }
    }

    pub fn decode(&self, backend: &dyn Backend, pc: u64) -> Instruction {
        let text = backend.disassemble(pc).unwrap_or_else(|err| {
            warn!(pc = %Hex(pc), error = %err, "failed to disassemble");
            String::new()
        });
        let (body, comment) = text.split_once('#').unwrap_or((text.as_str(), ""));
        let body = body.trim();
        let target = eval::number(comment.trim()).map(|(target, _)| target);

        let mut prefix: Option<&str> = None;
        let (mut mnemonic, mut rest) = split_word(body);
        while PREFIXES.contains(&mnemonic) && !rest.is_empty() {
            if prefix.is_none() || mnemonic.starts_with("rep") {
                prefix = Some(mnemonic);
            }
            (mnemonic, rest) = split_word(rest);
        }

        let mut instruction = Instruction::new(pc, body, prefix, mnemonic);
        if PREFIXES.contains(&mnemonic) {
            error!(pc = %Hex(pc), text = body, "prefix without an instruction");
            return instruction;
        }

        let args: Vec<&str> = if rest.is_empty() {
            Vec::new()
        } else {
            rest.split(',').map(str::trim).collect()
        };

        match handler(mnemonic) {
            Some(handler) => {
                let mut classifier =
                    Classifier::new(self.arch, backend, &mut instruction).with_target(target);
                handler.apply(&mut classifier, &args, self.last_return);
                if prefix.map_or(false, |p| p.starts_with("rep"))
                    && matches!(handler, Handler::String(..))
                {
                    classifier.register(self.arch.counter, Direction::BOTH);
                }
            }
            None => trace!(pc = %Hex(pc), %mnemonic, text = body, "unknown mnemonic"),
        }

        instruction
    }
}
