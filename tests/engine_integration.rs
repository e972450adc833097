//! End-to-end tests for the include-rewriting patch driven by the engine.
//!
//! Covers first-vs-later occurrence handling, generated-file renames, failure
//! on missing table entries, counter isolation and determinism.

use cpp_translator::patch::includes::{PREAMBLE, TRAILER};
use cpp_translator::{
    Capture, EngineError, IncludeTable, IncludesPatch, Patch, PatchContext, PatchEngine,
    PatchError, PatchState, SearchPattern, SourceFile,
};
use proptest::prelude::*;
use std::sync::Arc;

const ARM_BASE_INFO: &str = r#"//===-- ARMBaseInfo.cpp - ARM Base encoding information------------===//
#include "ARMBaseInfo.h"
#include "llvm/ADT/ArrayRef.h"
#include "llvm/ADT/SmallVector.h"
#include "llvm/Support/Regex.h"

using namespace llvm;
namespace llvm {
namespace ARMSysReg {
const MClassSysReg *lookupMClassSysRegBy8bitSYSmValue(unsigned SYSm) {
  return lookupMClassSysRegByM2M3Encoding8((1 << 8) | (SYSm & 0xFF));
}
} // end namespace ARMSysReg
} // end namespace llvm
"#;

const ARM_DISASSEMBLER: &str = r#"#include "MCTargetDesc/ARMAddressingModes.h"
#include "MCTargetDesc/ARMBaseInfo.h"
#include "llvm/MC/MCDisassembler/MCDisassembler.h"

#define DEBUG_TYPE "arm-disassembler"

static DecodeStatus DecodeGPRRegisterClass(MCInst &Inst, unsigned RegNo) {
  return MCDisassembler::Success;
}

#include "ARMGenDisassemblerTables.inc"

static DecodeStatus decodeInstruction(MCInst &MI) {
  return MCDisassembler::Fail;
}
"#;

fn arm_engine() -> PatchEngine {
    let table = Arc::new(IncludeTable::builtin().unwrap());
    PatchEngine::new()
        .with_patch(IncludesPatch::new(0, "ARM", table))
        .unwrap()
}

/// Table with a single profile "A" that knows "X.ext" and "Y.ext".
fn scenario_table() -> Arc<IncludeTable> {
    let mut table = IncludeTable::new();
    table.insert("A", "X.ext", b"#include \"x_specific.h\"\n\n".to_vec());
    table.insert("A", "Y.ext", b"#include \"y_specific.h\"\n\n".to_vec());
    table.insert("B", "W.ext", b"#include \"w_specific.h\"\n\n".to_vec());
    Arc::new(table)
}

fn full_block(specific: &[u8]) -> Vec<u8> {
    [PREAMBLE, specific, TRAILER].concat()
}

#[test]
fn arm_base_info_is_translated() {
    let engine = arm_engine();
    let files = vec![SourceFile::new("ARMBaseInfo.cpp", ARM_BASE_INFO)];

    let out = engine.run(&files).unwrap();
    assert_eq!(out.len(), 1);

    let table = IncludeTable::builtin().unwrap();
    let mut expected = b"//===-- ARMBaseInfo.cpp - ARM Base encoding information------------===//\n".to_vec();
    expected.extend(full_block(table.lookup("ARM", "ARMBaseInfo.cpp").unwrap()));
    expected.extend_from_slice(b"\nusing namespace llvm;\n");

    let output = &out[0].output;
    assert!(output.starts_with(&expected), "got:\n{}", String::from_utf8_lossy(output));
    assert!(output.ends_with(b"} // end namespace llvm\n"));
    assert!(!String::from_utf8_lossy(output).contains("llvm/ADT"));
    assert_eq!(out[0].replacements, 4);
}

#[test]
fn generated_tables_include_is_renamed_in_place() {
    let engine = arm_engine();
    let files = vec![SourceFile::new("ARMDisassembler.cpp", ARM_DISASSEMBLER)];

    let out = engine.run(&files).unwrap();
    let text = String::from_utf8(out[0].output.clone()).unwrap();

    assert!(text.starts_with("#include <stdio.h>\n"));
    assert!(text.contains("#define GET_INSTRINFO_MC_DESC\n#include \"ARMGenInstrInfo.inc\"\n"));
    assert!(text.contains(
        "  return MCDisassembler::Success;\n}\n\n#include \"ARMGenDisassemblerTables.inc\"\n\n\nstatic DecodeStatus decodeInstruction"
    ));
    assert!(!text.contains("MCTargetDesc/"));
    assert_eq!(text.matches("#include <stdio.h>").count(), 1);
}

#[test]
fn scenario_first_match_full_block_second_empty() {
    let patch = IncludesPatch::new(0, "A", scenario_table());
    let engine = PatchEngine::new().with_patch(patch).unwrap();
    let mut state = PatchState::new();

    let out = engine
        .translate("X.ext", b"#include \"one.h\"\n#include \"two.h\"\n", &mut state)
        .unwrap();

    assert_eq!(out.output, full_block(b"#include \"x_specific.h\"\n\n"));
    assert_eq!(state.count("includes", "X.ext"), 2);
}

#[test]
fn scenario_marker_override_regardless_of_position() {
    let engine = PatchEngine::new()
        .with_patch(IncludesPatch::new(0, "A", scenario_table()))
        .unwrap();

    for src in [
        "#include \"GenAsmWriter.inc\"\n#include \"other.h\"\n",
        "#include \"other.h\"\n#include \"GenAsmWriter.inc\"\n",
    ] {
        let mut state = PatchState::new();
        let out = engine.translate("Y.ext", src.as_bytes(), &mut state).unwrap();
        let text = String::from_utf8(out.output).unwrap();

        assert!(text.contains("#include \"AGenAsmWriter.inc\"\n\n"), "{text}");
        // The counter advanced for the marker match too.
        assert_eq!(state.count("includes", "Y.ext"), 2);
    }
}

#[test]
fn scenario_missing_entry_aborts_without_output() {
    let engine = PatchEngine::new()
        .with_patch(IncludesPatch::new(0, "B", scenario_table()))
        .unwrap();
    let files = vec![
        SourceFile::new("W.ext", "#include \"w.h\"\n"),
        SourceFile::new("Z.ext", "#include \"z.h\"\nint z;\n"),
    ];

    let err = engine.run(&files).unwrap_err();
    match err {
        EngineError::Patch {
            filename,
            source: PatchError::UnknownFileForProfile { profile, .. },
        } => {
            assert_eq!(filename, "Z.ext");
            assert_eq!(profile, "B");
        }
        other => panic!("unexpected error: {other}"),
    }
}

#[test]
fn unknown_profile_names_the_profile() {
    let engine = PatchEngine::new()
        .with_patch(IncludesPatch::new(0, "MIPS", scenario_table()))
        .unwrap();
    let files = vec![SourceFile::new("X.ext", "#include \"x.h\"\n")];

    let err = engine.run(&files).unwrap_err();
    let message = err.to_string();
    assert!(message.contains("unknown profile 'MIPS'"), "{message}");
    assert!(message.starts_with("X.ext: "));
}

#[test]
fn preflight_rejects_uncovered_batch() {
    let engine = arm_engine();
    let files = vec![
        SourceFile::new("ARMBaseInfo.cpp", ARM_BASE_INFO),
        SourceFile::new("ARMAsmPrinter.cpp", "#include \"ARMAsmPrinter.h\"\n"),
    ];
    let err = engine.preflight(&files).unwrap_err();

    match err {
        EngineError::Coverage(coverage) => {
            assert_eq!(coverage.errors.len(), 1);
            assert!(coverage.errors[0].to_string().contains("ARMAsmPrinter.cpp"));
        }
        other => panic!("unexpected error: {other}"),
    }

    let covered = vec![
        SourceFile::new("ARMBaseInfo.cpp", ARM_BASE_INFO),
        SourceFile::new("ARMInstPrinter.h", "#include \"llvm/MC/MCInstPrinter.h\"\n"),
    ];
    assert!(engine.preflight(&covered).is_ok());
}

#[test]
fn preflight_skips_files_that_never_consult_the_table() {
    let engine = arm_engine();
    let files = vec![
        SourceFile::new("ARMBaseInfo.cpp", ARM_BASE_INFO),
        // Generated fragment without any include.
        SourceFile::new("ARMGenSystemRegister.inc", "static const int SysRegs[] = {0, 1};\n"),
        // Only a generated-table include: renamed, never looked up.
        SourceFile::new(
            "ARMGenTables.cpp",
            "#include \"ARMGenDisassemblerTables.inc\"\n",
        ),
    ];

    engine.preflight(&files).unwrap();
    let out = engine.run(&files).unwrap();
    assert_eq!(out[1].output, files[1].contents);
    assert_eq!(out[2].output, b"#include \"ARMGenDisassemblerTables.inc\"\n\n");

    // An unknown profile is still rejected even when no file needs a lookup.
    let mips = PatchEngine::new()
        .with_patch(IncludesPatch::new(0, "MIPS", Arc::new(IncludeTable::builtin().unwrap())))
        .unwrap();
    assert!(matches!(
        mips.preflight(&files[1..2]),
        Err(EngineError::Coverage(_))
    ));
}

#[test]
fn counters_are_per_file() {
    let engine = PatchEngine::new()
        .with_patch(IncludesPatch::new(0, "A", scenario_table()))
        .unwrap();
    let mut state = PatchState::new();

    for _ in 0..3 {
        engine.translate("Y.ext", b"#include \"y.h\"\n", &mut state).unwrap();
    }
    let out = engine.translate("X.ext", b"#include \"x.h\"\n", &mut state).unwrap();

    assert_eq!(out.output, full_block(b"#include \"x_specific.h\"\n\n"));
    assert_eq!(state.count("includes", "Y.ext"), 3);
    assert_eq!(state.count("includes", "X.ext"), 1);
}

#[test]
fn fresh_run_resets_counters() {
    let engine = arm_engine();
    let files = vec![SourceFile::new("ARMBaseInfo.cpp", ARM_BASE_INFO)];

    let first = engine.run(&files).unwrap();
    let second = engine.run(&files).unwrap();
    assert_eq!(first, second);
    assert_eq!(first[0].digest(), second[0].digest());
}

/// Counts includes without changing them.
struct IncludeAudit;

impl Patch for IncludeAudit {
    fn kind(&self) -> &'static str {
        "include-audit"
    }

    fn priority(&self) -> i32 {
        -1
    }

    fn profile(&self) -> &str {
        "A"
    }

    fn search_pattern(&self) -> SearchPattern {
        SearchPattern::new("(preproc_include) @include", "include")
    }

    fn compute_replacement(
        &self,
        captures: &[Capture<'_>],
        src: &[u8],
        ctx: &mut PatchContext<'_>,
    ) -> Result<Vec<u8>, PatchError> {
        ctx.advance(self.kind());
        Ok(captures[0].text(src).to_vec())
    }
}

#[test]
fn distinct_kinds_count_independently() {
    let engine = PatchEngine::new()
        .with_patch(IncludesPatch::new(0, "A", scenario_table()))
        .unwrap()
        .with_patch(IncludeAudit)
        .unwrap();
    assert_eq!(engine.patches()[0].kind(), "include-audit");

    let mut state = PatchState::new();
    let out = engine
        .translate("X.ext", b"#include <a.h>\n#include <b.h>\n#include <c.h>\n", &mut state)
        .unwrap();

    // The audit pass ran first, yet the includes patch still saw a first occurrence.
    assert_eq!(out.output, full_block(b"#include \"x_specific.h\"\n\n"));
    assert_eq!(state.count("include-audit", "X.ext"), 3);
    assert_eq!(state.count("includes", "X.ext"), 3);
}

#[test]
fn instances_of_one_kind_share_a_counter() {
    let table = scenario_table();
    let engine = PatchEngine::new()
        .with_patch(IncludesPatch::new(0, "A", Arc::clone(&table)))
        .unwrap()
        .with_patch(IncludesPatch::new(1, "B", table))
        .unwrap();
    let mut state = PatchState::new();

    // The "A" pass replaces both includes (block + delete). The "B" pass then
    // sees the five includes of that block as occurrences 3..=7 and deletes
    // them, leaving only blank lines and the macros.
    let out = engine
        .translate("X.ext", b"#include <a.h>\n#include <b.h>\n", &mut state)
        .unwrap();

    assert_eq!(out.output, [b"\n\n".as_slice(), TRAILER].concat());
    assert_eq!(state.count("includes", "X.ext"), 7);
}

fn include_lines(n: usize) -> String {
    (0..n).map(|i| format!("#include \"h{i}.h\"\n")).collect()
}

proptest! {
    #[test]
    fn only_first_include_survives(n in 1usize..12, body in "[a-z]{1,8}") {
        let engine = PatchEngine::new()
            .with_patch(IncludesPatch::new(0, "A", scenario_table()))
            .unwrap();
        let src = format!("{}\nint v_{body};\n", include_lines(n));
        let mut state = PatchState::new();

        let out = engine.translate("X.ext", src.as_bytes(), &mut state).unwrap();

        let mut expected = full_block(b"#include \"x_specific.h\"\n\n");
        expected.extend_from_slice(format!("\nint v_{body};\n").as_bytes());
        prop_assert_eq!(out.output, expected);
        prop_assert_eq!(state.count("includes", "X.ext"), n);
    }

    #[test]
    fn interleaved_files_do_not_interfere(order in proptest::collection::vec(any::<bool>(), 1..16)) {
        let engine = PatchEngine::new()
            .with_patch(IncludesPatch::new(0, "A", scenario_table()))
            .unwrap();
        let mut state = PatchState::new();
        let mut seen_x = false;
        let mut seen_y = false;

        for pick_x in order {
            let (name, seen, specific): (&str, &mut bool, &[u8]) = if pick_x {
                ("X.ext", &mut seen_x, &b"#include \"x_specific.h\"\n\n"[..])
            } else {
                ("Y.ext", &mut seen_y, &b"#include \"y_specific.h\"\n\n"[..])
            };

            let out = engine.translate(name, b"#include <a.h>\n", &mut state).unwrap();
            if *seen {
                prop_assert!(out.output.is_empty());
            } else {
                prop_assert_eq!(out.output, full_block(specific));
                *seen = true;
            }
        }
    }

    #[test]
    fn translation_is_deterministic(n in 0usize..6, markers in proptest::collection::vec(any::<bool>(), 0..6)) {
        let mut src = include_lines(n);
        for (i, is_writer) in markers.iter().enumerate() {
            let name = if *is_writer { "GenAsmWriter.inc" } else { "GenDisassemblerTables.inc" };
            src.push_str(&format!("int v{i};\n#include \"X{name}\"\n"));
        }
        let files = vec![SourceFile::new("X.ext", src)];
        let engine = PatchEngine::new()
            .with_patch(IncludesPatch::new(0, "A", scenario_table()))
            .unwrap();

        let first = engine.run(&files).unwrap();
        let second = engine.run(&files).unwrap();
        prop_assert_eq!(first, second);
    }
}
