use dslice::prelude::*;
use dslice_replay::ReplayBackend;

fn replay(json: &str) -> ReplayBackend {
    ReplayBackend::from_reader(json.as_bytes()).unwrap()
}

fn pcs(slicer: &Slicer) -> Vec<u64> {
    slicer
        .session()
        .state()
        .instructions()
        .iter()
        .map(Instruction::pc)
        .collect()
}

static LOCAL_VARIABLE: &str = r#"{
    "arch": "i386",
    "steps": [
        {"pc": "0x8048400", "asm": "mov    DWORD PTR [ebp-0x8],0x5",
         "registers": {"ebp": "0xbfff0100", "esp": "0xbfff00f0"},
         "writes": [["0xbfff00f8", 5], ["0xbfff00f9", 0], ["0xbfff00fa", 0], ["0xbfff00fb", 0]],
         "file": "count.c", "line": 3},
        {"pc": "0x8048407", "asm": "mov    eax,DWORD PTR [ebp-0x8]", "file": "count.c", "line": 4},
        {"pc": "0x804840a", "asm": "add    eax,0x1", "registers": {"eax": 5}, "file": "count.c", "line": 4},
        {"pc": "0x804840d", "asm": "mov    DWORD PTR [ebp-0x4],eax", "registers": {"eax": 6},
         "writes": [["0xbfff00fc", 6], ["0xbfff00fd", 0], ["0xbfff00fe", 0], ["0xbfff00ff", 0]],
         "file": "count.c", "line": 4},
        {"pc": "0x8048410", "asm": "nop", "file": "count.c", "line": 5}
    ]
}"#;

#[test]
fn slice_follows_values_through_memory() {
    let mut slicer = Slicer::new(
        replay(LOCAL_VARIABLE),
        HookRegistry::new(),
        SliceConfig::default(),
    )
    .unwrap();
    assert_eq!(
        slicer
            .session_mut()
            .add_expression("DWORD PTR [ebp-0x4]")
            .unwrap(),
        4
    );

    assert_eq!(slicer.compute(StepMode::Run).unwrap(), Outcome::OperandExhausted);
    assert_eq!(pcs(&slicer), vec![0x804840d, 0x804840a, 0x8048407, 0x8048400]);

    let state = slicer.session().state();
    assert!(state.tracked().is_empty());

    let load = &state.instructions()[2];
    assert_eq!(load.location().map(|l| l.line), Some(4));
    let stored: Vec<u64> = load
        .sources()
        .iter()
        .filter(|o| o.is_memory())
        .map(Operand::value)
        .collect();
    assert_eq!(stored, vec![5, 0, 0, 0]);

    let path = std::env::temp_dir().join(format!("dslice-{}.txt", std::process::id()));
    slicer.session().save(&path).unwrap();
    let saved = std::fs::read_to_string(&path).unwrap();
    std::fs::remove_file(&path).unwrap();
    let lines: Vec<&str> = saved.lines().collect();
    assert_eq!(lines.len(), 4);
    assert_eq!(lines[0], "count.c:4  0x804840d: mov    DWORD PTR [ebp-0x4],eax");
}

static NULL_STORE: &str = r#"{
    "arch": "i386:x86-64",
    "signal": 11,
    "executable": [["0x401000", "0x402000"]],
    "memory": [["0x7ffe00e8", 0], ["0x7ffe00e9", 0], ["0x7ffe00ea", 0], ["0x7ffe00eb", 0],
               ["0x7ffe00ec", 0], ["0x7ffe00ed", 0], ["0x7ffe00ee", 0], ["0x7ffe00ef", 0]],
    "steps": [
        {"pc": "0x401000", "asm": "mov    rax,QWORD PTR [rbp-0x18]", "registers": {"rbp": "0x7ffe0100"}},
        {"pc": "0x401004", "asm": "mov    DWORD PTR [rax],0x1", "registers": {"rax": 0}}
    ]
}"#;

#[test]
fn segfault_is_traced_to_the_pointer_load() {
    let (mut slicer, report) = Slicer::crashed(
        replay(NULL_STORE),
        HookRegistry::new(),
        SliceConfig::default(),
    )
    .unwrap();
    assert_eq!(
        report,
        SeedReport::InvalidAccess {
            signal: Signal::SegmentationFault,
            seeded: 1,
            monitor_stack: false,
        }
    );

    assert_eq!(slicer.compute(StepMode::Run).unwrap(), Outcome::HistoryExhausted);
    assert_eq!(pcs(&slicer), vec![0x401004, 0x401000]);

    let addresses: Vec<u64> = slicer
        .session()
        .state()
        .tracked()
        .iter()
        .filter_map(Operand::address)
        .collect();
    assert_eq!(addresses, (0x7ffe00e8..0x7ffe00f0).collect::<Vec<u64>>());
}

#[cfg(feature = "plugins")]
static CANARY: &str = r#"{
    "arch": "i386",
    "signal": 6,
    "memory": [["0xbfff00f4", 0], ["0xbfff00f5", 42], ["0xbfff00f6", 59], ["0xbfff00f7", 76]],
    "steps": [
        {"pc": "0x80484a0", "asm": "mov    DWORD PTR [ebp-0xc],eax",
         "registers": {"ebp": "0xbfff0100", "esp": "0xbfff00e0", "eax": "0x4c3b2a00"},
         "file": "vuln.c", "line": 5, "frames": [{"function": "main", "file": "vuln.c"}]},
        {"pc": "0x80484a3", "asm": "mov    BYTE PTR [ebp-0xc],0x41", "writes": [["0xbfff00f4", 65]],
         "file": "vuln.c", "line": 7, "frames": [{"function": "main", "file": "vuln.c"}]},
        {"pc": "0x80484a7", "asm": "mov    edx,DWORD PTR [ebp-0xc]",
         "file": "vuln.c", "line": 9, "frames": [{"function": "main", "file": "vuln.c"}]},
        {"pc": "0x80484aa", "asm": "xor    edx,DWORD PTR gs:0x14",
         "file": "vuln.c", "line": 9, "frames": [{"function": "main", "file": "vuln.c"}]},
        {"pc": "0x80484b1", "asm": "je     0x80484b8",
         "file": "vuln.c", "line": 9, "frames": [{"function": "main", "file": "vuln.c"}]},
        {"pc": "0x80484b3", "asm": "call   0x8048340 <__stack_chk_fail@plt>",
         "file": "vuln.c", "line": 9, "frames": [{"function": "main", "file": "vuln.c"}]},
        {"pc": "0x8048340", "asm": "push   ebp",
         "frames": [{"function": "__stack_chk_fail"}, {"function": "main", "file": "vuln.c"}]},
        {"pc": "0x8048341", "asm": "call   0x8048350 <raise>",
         "frames": [{"function": "__stack_chk_fail"}, {"function": "main", "file": "vuln.c"}]}
    ]
}"#;

#[cfg(feature = "plugins")]
#[test]
fn stack_protector_abort_finds_the_overflow() {
    let mut hooks = HookRegistry::new();
    dslice::plugins::register_all(&mut hooks);

    let (mut slicer, report) =
        Slicer::crashed(replay(CANARY), hooks, SliceConfig::default()).unwrap();
    assert_eq!(report, SeedReport::Abort);
    assert_eq!(pcs(&slicer), vec![0x80484aa]);

    assert_eq!(slicer.compute(StepMode::Run).unwrap(), Outcome::Stopped);
    assert_eq!(pcs(&slicer), vec![0x80484aa, 0x80484a7, 0x80484a3]);

    let culprit = &slicer.session().state().instructions()[2];
    assert!(culprit.comment().contains("Cause of stack corruption"));
    assert_eq!(culprit.location().map(|l| l.line), Some(7));
}

#[cfg(feature = "plugins")]
#[test]
fn abort_triage_ignores_other_signals() {
    let mut hooks = HookRegistry::new();
    dslice::plugins::register_all(&mut hooks);

    let recording = CANARY.replace(r#""signal": 6"#, r#""signal": 15"#);
    let (slicer, report) =
        Slicer::crashed(replay(&recording), hooks, SliceConfig::default()).unwrap();
    assert!(!report.is_handled());
    assert!(slicer.session().state().tracked().is_empty());
    assert!(slicer.session().state().instructions().is_empty());
}

#[cfg(feature = "plugins")]
static HEAP_OVERFLOW: &str = r#"{
    "arch": "i386",
    "signal": 6,
    "memory": [["0x804b00c", 17], ["0x804b00d", 0], ["0x804b00e", 0], ["0x804b00f", 0],
               ["0x804b100", 0], ["0x804b101", 0], ["0x804b102", 0], ["0x804b103", 0]],
    "steps": [
        {"pc": "0x8048500", "asm": "nop",
         "registers": {"eax": "0x804b008", "ebx": "0x804b100", "edx": 17,
                       "ebp": "0xbfff0100", "esp": "0xbfff00e0"},
         "file": "user.c", "line": 11, "frames": [{"function": "main", "file": "user.c"}]},
        {"pc": "0x8048501", "asm": "mov    DWORD PTR [ebx],0x41414141",
         "writes": [["0x804b100", 65], ["0x804b101", 65], ["0x804b102", 65], ["0x804b103", 65]],
         "file": "user.c", "line": 12, "frames": [{"function": "main", "file": "user.c"}]},
        {"pc": "0x8048600", "asm": "mov    ecx,DWORD PTR [ebx]",
         "file": "malloc.c", "line": 4100,
         "frames": [{"function": "_int_free", "file": "malloc.c"}, {"function": "main", "file": "user.c"}]},
        {"pc": "0x8048602", "asm": "mov    DWORD PTR [eax+0x4],ecx", "registers": {"ecx": "0x41414141"},
         "writes": [["0x804b00c", 65], ["0x804b00d", 65], ["0x804b00e", 65], ["0x804b00f", 65]],
         "file": "malloc.c", "line": 4101,
         "frames": [{"function": "_int_free", "file": "malloc.c"}, {"function": "main", "file": "user.c"}]},
        {"pc": "0x8048605", "asm": "cmp    edx,DWORD PTR [eax+0x4]",
         "file": "malloc.c", "line": 4105,
         "frames": [{"function": "_int_free", "file": "malloc.c"}, {"function": "main", "file": "user.c"}]},
        {"pc": "0x8048608", "asm": "jbe    0x8048612",
         "file": "malloc.c", "line": 4105,
         "frames": [{"function": "_int_free", "file": "malloc.c"}, {"function": "main", "file": "user.c"}]},
        {"pc": "0x804860a", "asm": "call   0x8048700 <__malloc_assert>",
         "file": "malloc.c", "line": 4106,
         "frames": [{"function": "_int_free", "file": "malloc.c"}, {"function": "main", "file": "user.c"}]},
        {"pc": "0x8048700", "asm": "push   ebp",
         "frames": [{"function": "__malloc_assert", "file": "assert.c"},
                    {"function": "_int_free", "file": "malloc.c"}, {"function": "main", "file": "user.c"}]},
        {"pc": "0x8048701", "asm": "call   0x8048750 <raise>",
         "frames": [{"function": "__malloc_assert", "file": "assert.c"},
                    {"function": "_int_free", "file": "malloc.c"}, {"function": "main", "file": "user.c"}]}
    ]
}"#;

#[cfg(feature = "plugins")]
#[test]
fn heap_abort_skips_allocator_writes() {
    let mut hooks = HookRegistry::new();
    dslice::plugins::register_all(&mut hooks);

    let (mut slicer, report) =
        Slicer::crashed(replay(HEAP_OVERFLOW), hooks, SliceConfig::default()).unwrap();
    assert_eq!(report, SeedReport::Abort);
    assert_eq!(pcs(&slicer), vec![0x8048605]);

    assert_eq!(slicer.compute(StepMode::Run).unwrap(), Outcome::Stopped);
    assert_eq!(pcs(&slicer), vec![0x8048605, 0x8048602, 0x8048600, 0x8048501]);

    let instructions = slicer.session().state().instructions();
    assert!(!instructions[1].comment().contains("Cause of"));
    let culprit = &instructions[3];
    assert!(culprit.comment().contains("Cause of heap corruption"));
    assert_eq!(culprit.location().map(|l| l.file.as_str()), Some("user.c"));
    assert_eq!(culprit.location().map(|l| l.line), Some(12));
}
