use std::hash::{Hash, Hasher};

use crate::error::SliceError;

#[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct X86;

#[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct X86_64;

#[non_exhaustive]
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum Architecture {
    X86(X86),
    X86_64(X86_64),
}

impl Architecture {
    /// Pick an architecture from the name a backend reports, e.g. `i386` or
    /// `i386:x86-64`.
    pub fn from_name(name: &str) -> Result<Self, SliceError> {
        let lowered = name.to_ascii_lowercase();
        if lowered.contains("x86-64") || lowered.contains("x86_64") || lowered.contains("amd64") {
            Ok(Self::X86_64(X86_64))
        } else if lowered.starts_with("i386")
            || lowered.starts_with("i486")
            || lowered.starts_with("i586")
            || lowered.starts_with("i686")
            || lowered == "x86"
        {
            Ok(Self::X86(X86))
        } else {
            Err(SliceError::UnsupportedArchitecture(name.to_owned()))
        }
    }

    pub fn description(&self) -> &'static ArchDescription {
        match self {
            Self::X86(_) => &X86_DESCRIPTION,
            Self::X86_64(_) => &X86_64_DESCRIPTION,
        }
    }
}

impl From<X86> for Architecture {
    fn from(arch: X86) -> Self {
        Self::X86(arch)
    }
}

impl From<X86_64> for Architecture {
    fn from(arch: X86_64) -> Self {
        Self::X86_64(arch)
    }
}

/// A set of register names that alias the same storage. The first name is
/// the canonical (widest) one.
#[derive(Debug, Copy, Clone)]
pub struct RegisterGroup {
    names: &'static [&'static str],
}

impl RegisterGroup {
    pub const fn new(names: &'static [&'static str]) -> Self {
        Self { names }
    }

    pub fn canonical(&self) -> &'static str {
        self.names[0]
    }

    pub fn names(&self) -> &'static [&'static str] {
        self.names
    }

    pub fn contains(&self, name: &str) -> bool {
        self.names.iter().any(|n| *n == name)
    }
}

impl PartialEq for RegisterGroup {
    fn eq(&self, other: &Self) -> bool {
        self.canonical() == other.canonical()
    }
}

impl Eq for RegisterGroup {}

impl Hash for RegisterGroup {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.canonical().hash(state)
    }
}

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct Syscall {
    pub number: u64,
    pub name: &'static str,
    pub arguments: usize,
}

/// Everything the semantics table and the resolver need to know about a
/// target.
#[derive(Debug)]
pub struct ArchDescription {
    pub name: &'static str,
    pub pointer_width: u64,
    pub registers: &'static [RegisterGroup],
    /// Pseudo registers that always read as zero (`eiz`, `riz`).
    pub zero_registers: &'static [&'static str],
    pub stack_pointer: &'static str,
    pub frame_pointer: &'static str,
    pub instruction_pointer: &'static str,
    pub source_index: &'static str,
    pub destination_index: &'static str,
    pub counter: &'static str,
    pub accumulator: &'static str,
    pub data: &'static str,
    pub return_register: &'static str,
    pub syscall_number: &'static str,
    pub syscall_arguments: &'static [&'static str],
    pub syscalls: &'static [Syscall],
    pub read_syscall: u64,
    pub read_buffer: &'static str,
    /// `int 0x80` enters the kernel on this target.
    pub legacy_syscall_gate: bool,
}

impl ArchDescription {
    /// Exact register lookup by any of its aliases.
    pub fn register(&self, name: &str) -> Option<(&'static str, RegisterGroup)> {
        self.registers.iter().find_map(|group| {
            group
                .names()
                .iter()
                .find(|n| **n == name)
                .map(|n| (*n, *group))
        })
    }

    /// Longest register name that `text` starts with.
    pub fn register_prefix(&self, text: &str) -> Option<(&'static str, RegisterGroup)> {
        self.registers
            .iter()
            .flat_map(|group| group.names().iter().map(move |n| (*n, *group)))
            .filter(|(n, _)| text.starts_with(n))
            .max_by_key(|(n, _)| n.len())
    }

    pub fn zero_register_prefix(&self, text: &str) -> Option<&'static str> {
        self.zero_registers
            .iter()
            .copied()
            .find(|n| text.starts_with(n))
    }

    pub fn is_zero_register(&self, name: &str) -> bool {
        self.zero_registers.contains(&name)
    }

    pub fn group(&self, name: &str) -> Option<RegisterGroup> {
        self.register(name).map(|(_, group)| group)
    }

    /// Stack, frame and instruction pointer families.
    pub fn is_pointer_group(&self, group: &RegisterGroup) -> bool {
        [self.stack_pointer, self.frame_pointer, self.instruction_pointer]
            .iter()
            .any(|name| group.contains(name))
    }

    pub fn syscall(&self, number: u64) -> Option<&'static Syscall> {
        self.syscalls.iter().find(|s| s.number == number)
    }

    /// Interpret a register value as a signed quantity of pointer width.
    pub fn signed(&self, value: u64) -> i64 {
        match self.pointer_width {
            4 => value as u32 as i32 as i64,
            _ => value as i64,
        }
    }
}

macro_rules! groups {
    ($([$($name:literal),+]),+ $(,)?) => {
        &[$(RegisterGroup::new(&[$($name),+])),+]
    };
}

static X86_REGISTERS: &[RegisterGroup] = groups![
    ["eax", "ax", "ah", "al"],
    ["ebx", "bx", "bh", "bl"],
    ["ecx", "cx", "ch", "cl"],
    ["edx", "dx", "dh", "dl"],
    ["esi", "si"],
    ["edi", "di"],
    ["ebp", "bp"],
    ["esp", "sp"],
    ["eip", "ip"],
    ["eflags"],
    ["cs"],
    ["ds"],
    ["es"],
    ["fs"],
    ["gs"],
    ["ss"],
    ["ymm0", "xmm0"],
    ["ymm1", "xmm1"],
    ["ymm2", "xmm2"],
    ["ymm3", "xmm3"],
    ["ymm4", "xmm4"],
    ["ymm5", "xmm5"],
    ["ymm6", "xmm6"],
    ["ymm7", "xmm7"],
    ["mm0"],
    ["mm1"],
    ["mm2"],
    ["mm3"],
    ["mm4"],
    ["mm5"],
    ["mm6"],
    ["mm7"],
    ["st"],
];

static X86_64_REGISTERS: &[RegisterGroup] = groups![
    ["rax", "eax", "ax", "ah", "al"],
    ["rbx", "ebx", "bx", "bh", "bl"],
    ["rcx", "ecx", "cx", "ch", "cl"],
    ["rdx", "edx", "dx", "dh", "dl"],
    ["rsi", "esi", "si", "sil"],
    ["rdi", "edi", "di", "dil"],
    ["rbp", "ebp", "bp", "bpl"],
    ["rsp", "esp", "sp", "spl"],
    ["rip", "eip", "ip"],
    ["r8", "r8d", "r8w", "r8b", "r8l"],
    ["r9", "r9d", "r9w", "r9b", "r9l"],
    ["r10", "r10d", "r10w", "r10b", "r10l"],
    ["r11", "r11d", "r11w", "r11b", "r11l"],
    ["r12", "r12d", "r12w", "r12b", "r12l"],
    ["r13", "r13d", "r13w", "r13b", "r13l"],
    ["r14", "r14d", "r14w", "r14b", "r14l"],
    ["r15", "r15d", "r15w", "r15b", "r15l"],
    ["rflags", "eflags"],
    ["cs"],
    ["ds"],
    ["es"],
    ["fs"],
    ["gs"],
    ["ss"],
    ["ymm0", "xmm0"],
    ["ymm1", "xmm1"],
    ["ymm2", "xmm2"],
    ["ymm3", "xmm3"],
    ["ymm4", "xmm4"],
    ["ymm5", "xmm5"],
    ["ymm6", "xmm6"],
    ["ymm7", "xmm7"],
    ["ymm8", "xmm8"],
    ["ymm9", "xmm9"],
    ["ymm10", "xmm10"],
    ["ymm11", "xmm11"],
    ["ymm12", "xmm12"],
    ["ymm13", "xmm13"],
    ["ymm14", "xmm14"],
    ["ymm15", "xmm15"],
    ["mm0"],
    ["mm1"],
    ["mm2"],
    ["mm3"],
    ["mm4"],
    ["mm5"],
    ["mm6"],
    ["mm7"],
    ["st"],
];

macro_rules! syscalls {
    ($(($number:literal, $name:literal, $arguments:literal)),+ $(,)?) => {
        &[$(Syscall { number: $number, name: $name, arguments: $arguments }),+]
    };
}

static X86_SYSCALLS: &[Syscall] = syscalls![
    (1, "exit", 1),
    (2, "fork", 0),
    (3, "read", 3),
    (4, "write", 3),
    (5, "open", 3),
    (6, "close", 1),
    (7, "waitpid", 3),
    (8, "creat", 2),
    (9, "link", 2),
    (10, "unlink", 1),
    (11, "execve", 3),
    (12, "chdir", 1),
    (13, "time", 1),
    (19, "lseek", 3),
    (20, "getpid", 0),
    (33, "access", 2),
    (37, "kill", 2),
    (38, "rename", 2),
    (39, "mkdir", 2),
    (40, "rmdir", 1),
    (41, "dup", 1),
    (42, "pipe", 1),
    (45, "brk", 1),
    (54, "ioctl", 3),
    (55, "fcntl", 3),
    (63, "dup2", 2),
    (64, "getppid", 0),
    (78, "gettimeofday", 2),
    (85, "readlink", 3),
    (90, "mmap", 1),
    (91, "munmap", 2),
    (102, "socketcall", 2),
    (106, "stat", 2),
    (108, "fstat", 2),
    (114, "wait4", 4),
    (120, "clone", 5),
    (122, "uname", 1),
    (125, "mprotect", 3),
    (140, "_llseek", 5),
    (145, "readv", 3),
    (146, "writev", 3),
    (162, "nanosleep", 2),
    (174, "rt_sigaction", 4),
    (175, "rt_sigprocmask", 4),
    (180, "pread64", 4),
    (181, "pwrite64", 4),
    (183, "getcwd", 2),
    (192, "mmap2", 6),
    (195, "stat64", 2),
    (197, "fstat64", 2),
    (199, "getuid32", 0),
    (224, "gettid", 0),
    (240, "futex", 6),
    (243, "set_thread_area", 1),
    (252, "exit_group", 1),
    (258, "set_tid_address", 1),
    (265, "clock_gettime", 2),
    (295, "openat", 4),
    (355, "getrandom", 3),
];

static X86_64_SYSCALLS: &[Syscall] = syscalls![
    (0, "read", 3),
    (1, "write", 3),
    (2, "open", 3),
    (3, "close", 1),
    (4, "stat", 2),
    (5, "fstat", 2),
    (6, "lstat", 2),
    (7, "poll", 3),
    (8, "lseek", 3),
    (9, "mmap", 6),
    (10, "mprotect", 3),
    (11, "munmap", 2),
    (12, "brk", 1),
    (13, "rt_sigaction", 4),
    (14, "rt_sigprocmask", 4),
    (15, "rt_sigreturn", 0),
    (16, "ioctl", 3),
    (17, "pread64", 4),
    (18, "pwrite64", 4),
    (19, "readv", 3),
    (20, "writev", 3),
    (21, "access", 2),
    (22, "pipe", 1),
    (23, "select", 5),
    (24, "sched_yield", 0),
    (25, "mremap", 5),
    (26, "msync", 3),
    (27, "mincore", 3),
    (28, "madvise", 3),
    (32, "dup", 1),
    (33, "dup2", 2),
    (35, "nanosleep", 2),
    (39, "getpid", 0),
    (41, "socket", 3),
    (42, "connect", 3),
    (43, "accept", 3),
    (44, "sendto", 6),
    (45, "recvfrom", 6),
    (46, "sendmsg", 3),
    (47, "recvmsg", 3),
    (48, "shutdown", 2),
    (49, "bind", 3),
    (50, "listen", 2),
    (51, "getsockname", 3),
    (52, "getpeername", 3),
    (54, "setsockopt", 5),
    (55, "getsockopt", 5),
    (56, "clone", 5),
    (57, "fork", 0),
    (58, "vfork", 0),
    (59, "execve", 3),
    (60, "exit", 1),
    (61, "wait4", 4),
    (62, "kill", 2),
    (63, "uname", 1),
    (72, "fcntl", 3),
    (78, "getdents", 3),
    (79, "getcwd", 2),
    (80, "chdir", 1),
    (82, "rename", 2),
    (83, "mkdir", 2),
    (84, "rmdir", 1),
    (87, "unlink", 1),
    (89, "readlink", 3),
    (96, "gettimeofday", 2),
    (97, "getrlimit", 2),
    (102, "getuid", 0),
    (104, "getgid", 0),
    (107, "geteuid", 0),
    (108, "getegid", 0),
    (110, "getppid", 0),
    (137, "statfs", 2),
    (158, "arch_prctl", 2),
    (186, "gettid", 0),
    (201, "time", 1),
    (202, "futex", 6),
    (217, "getdents64", 3),
    (218, "set_tid_address", 1),
    (228, "clock_gettime", 2),
    (231, "exit_group", 1),
    (257, "openat", 4),
    (262, "newfstatat", 4),
    (273, "set_robust_list", 2),
    (302, "prlimit64", 4),
    (318, "getrandom", 3),
];

pub static X86_DESCRIPTION: ArchDescription = ArchDescription {
    name: "i386",
    pointer_width: 4,
    registers: X86_REGISTERS,
    zero_registers: &["eiz"],
    stack_pointer: "esp",
    frame_pointer: "ebp",
    instruction_pointer: "eip",
    source_index: "esi",
    destination_index: "edi",
    counter: "ecx",
    accumulator: "eax",
    data: "edx",
    return_register: "eax",
    syscall_number: "eax",
    syscall_arguments: &["ebx", "ecx", "edx", "esi", "edi", "ebp"],
    syscalls: X86_SYSCALLS,
    read_syscall: 3,
    read_buffer: "ecx",
    legacy_syscall_gate: true,
};

pub static X86_64_DESCRIPTION: ArchDescription = ArchDescription {
    name: "i386:x86-64",
    pointer_width: 8,
    registers: X86_64_REGISTERS,
    zero_registers: &["riz", "eiz"],
    stack_pointer: "rsp",
    frame_pointer: "rbp",
    instruction_pointer: "rip",
    source_index: "rsi",
    destination_index: "rdi",
    counter: "rcx",
    accumulator: "rax",
    data: "rdx",
    return_register: "rax",
    syscall_number: "rax",
    syscall_arguments: &["rdi", "rsi", "rdx", "r10", "r8", "r9"],
    syscalls: X86_64_SYSCALLS,
    read_syscall: 0,
    read_buffer: "rsi",
    legacy_syscall_gate: false,
};
