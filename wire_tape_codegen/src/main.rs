// Copyright 2026 the Wire Tape Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

#![doc = "Code generator for `wire_tape` opcode tables.\n\n\
          This is a std-only build tool crate. It is not shipped as part of the core VM.\n"]

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result, bail};
use serde::Deserialize;

#[derive(Deserialize, Clone)]
struct Spec {
    version: u32,
    opcodes: Vec<OpcodeSpec>,
}

#[derive(Deserialize, Clone)]
struct OpcodeSpec {
    name: String,
    mnemonic: String,
    byte: String,
    #[serde(default)]
    flags: Vec<String>,
    doc: Option<String>,
    #[serde(default)]
    operands: Vec<OperandSpec>,
}

#[derive(Deserialize, Clone)]
struct OperandSpec {
    kind: String,
    role: String,
}

/// Static part of the generated file: operand and flag types shared by every opcode.
const PREAMBLE: &str = r#"/// Operand kinds used by the opcode table.
///
/// Every operand is stored little-endian in the bytecode, regardless of the runtime endianness.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum OperandKind {
    /// A field key id (`u16`).
    Key,
    /// An immediate `u8`.
    ImmU8,
    /// An immediate `u16`.
    ImmU16,
    /// An immediate `u32`.
    ImmU32,
    /// An immediate `i64`.
    ImmI64,
    /// An immediate `u64`.
    ImmU64,
    /// An immediate `f64` (IEEE-754 bits).
    ImmF64,
}

impl OperandKind {
    /// Encoded width in bytes.
    #[must_use]
    pub const fn width(self) -> usize {
        match self {
            Self::ImmU8 => 1,
            Self::Key | Self::ImmU16 => 2,
            Self::ImmU32 => 4,
            Self::ImmI64 | Self::ImmU64 | Self::ImmF64 => 8,
        }
    }
}

/// Operand roles used by the opcode table.
///
/// Roles are a best-effort description for disassembly/tooling.
#[allow(missing_docs, reason = "generated")]
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum OperandRole {
    Key,
    CountKey,
    Version,
    Bits,
    Fill,
    MaxLen,
    Count,
    Kind,
    Value,
    Factor,
    Offset,
    Poly,
    Init,
    XorOut,
    Flags,
}

/// Operand schema metadata (kind/role).
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct OperandSchema {
    /// Operand kind (wire type).
    pub kind: OperandKind,
    /// Operand role (how this operand is used).
    pub role: OperandRole,
}

impl OperandSchema {
    const fn new(kind: OperandKind, role: OperandRole) -> Self {
        Self { kind, role }
    }
}

/// Operand layout for an opcode (indices into `OPERANDS`).
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct OperandLayout {
    /// Start index in `OPERANDS`.
    pub start: u16,
    /// Number of operand entries.
    pub len: u8,
}

/// Optional per-opcode traits.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
#[repr(transparent)]
pub struct OpcodeFlags(u8);

impl OpcodeFlags {
    /// No flags set.
    pub const NONE: Self = Self(0);
    /// Rounds a partial byte up to the next boundary before executing.
    pub const ALIGNS: Self = Self(1 << 0);
    /// Binds a key to a single field value.
    pub const FIELD_IO: Self = Self(1 << 1);
    /// Opens an array scope.
    pub const ARRAY_START: Self = Self(1 << 2);

    /// Returns `true` if `other` is a subset of `self`.
    #[must_use]
    pub const fn contains(self, other: Self) -> bool {
        (self.0 & other.0) == other.0
    }
}

/// Per-opcode metadata used by decode, disasm, and verification.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct OpcodeInfo {
    /// Stable, parseable opcode name.
    pub mnemonic: &'static str,
    /// Encoded instruction size in bytes, including the opcode byte.
    pub size: u8,
    /// Optional per-opcode traits.
    pub flags: OpcodeFlags,
    /// Operand layout for this opcode.
    pub operands: OperandLayout,
}

"#;

/// Static tail of the generated file: table-backed accessors on `Opcode`.
const POSTAMBLE: &str = r#"
impl Opcode {
    /// Returns opcode metadata for this opcode.
    #[must_use]
    pub fn info(self) -> &'static OpcodeInfo {
        &OPCODE_INFO_BY_BYTE[usize::from(self as u8)]
    }

    /// Stable, parseable opcode name.
    ///
    /// This string is used by the disassembler output.
    #[must_use]
    pub fn mnemonic(self) -> &'static str {
        self.info().mnemonic
    }

    /// Encoded instruction size in bytes, including the opcode byte.
    #[must_use]
    pub fn size(self) -> usize {
        usize::from(self.info().size)
    }

    /// Returns operand schema descriptors for this opcode.
    #[must_use]
    pub fn operands(self) -> &'static [OperandSchema] {
        let layout = self.info().operands;
        let start = usize::from(layout.start);
        let end = start + usize::from(layout.len);
        &OPERANDS[start..end]
    }

    /// Returns `true` if a partial byte is rounded up before this opcode executes.
    #[must_use]
    pub fn aligns(self) -> bool {
        self.info().flags.contains(OpcodeFlags::ALIGNS)
    }

    /// Returns `true` if this opcode binds its key to a single field value.
    #[must_use]
    pub fn is_field_io(self) -> bool {
        self.info().flags.contains(OpcodeFlags::FIELD_IO)
    }

    /// Returns `true` if this opcode opens an array scope.
    #[must_use]
    pub fn is_array_start(self) -> bool {
        self.info().flags.contains(OpcodeFlags::ARRAY_START)
    }
}
"#;

const KNOWN_ROLES: &[&str] = &[
    "key", "count_key", "version", "bits", "fill", "max_len", "count", "kind", "value", "factor",
    "offset", "poly", "init", "xor_out", "flags",
];

fn parse_u8_hex(s: &str) -> Result<u8> {
    let s = s.trim();
    let raw = s
        .strip_prefix("0x")
        .or_else(|| s.strip_prefix("0X"))
        .unwrap_or(s);
    u8::from_str_radix(raw, 16).with_context(|| format!("invalid opcode byte '{s}'"))
}

fn fmt_hex_u8(b: u8) -> String {
    format!("0x{b:02X}")
}

fn sort_and_validate_ops(ops: &mut [(u8, OpcodeSpec)]) -> Result<()> {
    ops.sort_by(|(b0, o0), (b1, o1)| b0.cmp(b1).then_with(|| o0.name.cmp(&o1.name)));

    for w in ops.windows(2) {
        let (b0, o0) = &w[0];
        let (b1, o1) = &w[1];
        if b0 == b1 {
            bail!(
                "duplicate opcode byte {}: {} and {}",
                fmt_hex_u8(*b0),
                o0.name,
                o1.name
            );
        }
    }
    let mut names: Vec<&str> = ops.iter().map(|(_, o)| o.name.as_str()).collect();
    names.sort_unstable();
    for w in names.windows(2) {
        if w[0] == w[1] {
            bail!("duplicate opcode name '{}'", w[0]);
        }
    }
    Ok(())
}

fn operand_kind(kind: &str) -> Result<(&'static str, usize)> {
    Ok(match kind {
        "key" => ("OperandKind::Key", 2),
        "imm_u8" => ("OperandKind::ImmU8", 1),
        "imm_u16" => ("OperandKind::ImmU16", 2),
        "imm_u32" => ("OperandKind::ImmU32", 4),
        "imm_i64" => ("OperandKind::ImmI64", 8),
        "imm_u64" => ("OperandKind::ImmU64", 8),
        "imm_f64" => ("OperandKind::ImmF64", 8),
        other => bail!("unknown operand kind '{other}'"),
    })
}

fn operand_role_rust(role: &str) -> Result<String> {
    if !KNOWN_ROLES.contains(&role) {
        bail!("unknown operand role '{role}'");
    }
    let mut s = String::with_capacity("OperandRole::".len() + role.len());
    s.push_str("OperandRole::");
    let mut upper_next = true;
    for ch in role.chars() {
        if ch == '_' {
            upper_next = true;
            continue;
        }
        if upper_next {
            s.extend(ch.to_uppercase());
            upper_next = false;
        } else {
            s.push(ch);
        }
    }
    Ok(s)
}

fn opcode_flags(op: &OpcodeSpec) -> Result<u8> {
    let mut bits = 0u8;
    for flag in &op.flags {
        bits |= match flag.as_str() {
            "aligns" => 1 << 0,
            "field_io" => 1 << 1,
            "array_start" => 1 << 2,
            other => bail!("unknown flag '{other}' on opcode {}", op.name),
        };
    }
    Ok(bits)
}

fn generate(spec: Spec, src: &Path) -> Result<String> {
    if spec.version != 1 {
        bail!("unsupported opcodes.json version {}", spec.version);
    }

    let mut ops: Vec<(u8, OpcodeSpec)> = Vec::with_capacity(spec.opcodes.len());
    for op in spec.opcodes {
        let b = parse_u8_hex(&op.byte)?;
        ops.push((b, op));
    }
    sort_and_validate_ops(&mut ops)?;

    let mut out = String::new();
    out.push_str("// Copyright 2026 the Wire Tape Authors\n");
    out.push_str("// SPDX-License-Identifier: Apache-2.0 OR MIT\n\n");
    out.push_str("// @generated by wire_tape_codegen. Do not edit by hand.\n");
    let _ = src;
    out.push('\n');
    out.push_str(PREAMBLE);

    let mut operands: Vec<String> = Vec::new();
    let mut rows: Vec<(u16, u8, usize, u8)> = Vec::with_capacity(ops.len());
    for (_, op) in &ops {
        let start: u16 = operands
            .len()
            .try_into()
            .context("too many operands to index in u16")?;
        let mut size = 1usize;
        for operand in &op.operands {
            let (kind, width) = operand_kind(&operand.kind)
                .with_context(|| format!("bad operand on opcode {}", op.name))?;
            let role = operand_role_rust(&operand.role)
                .with_context(|| format!("bad operand on opcode {}", op.name))?;
            size += width;
            operands.push(format!("OperandSchema::new({kind}, {role})"));
        }
        let len: u8 = op
            .operands
            .len()
            .try_into()
            .with_context(|| format!("too many operands for opcode {}", op.name))?;
        rows.push((start, len, size, opcode_flags(op)?));
    }

    out.push_str("/// Flat operand schema table indexed by `OperandLayout`.\n");
    out.push_str("pub const OPERANDS: &[OperandSchema] = &[\n");
    for operand in &operands {
        out.push_str(&format!("    {operand},\n"));
    }
    out.push_str("];\n\n");

    let max_byte = ops.iter().map(|(b, _)| *b).max().unwrap_or_default();
    let mut by_byte: Vec<Option<usize>> = vec![None; usize::from(max_byte) + 1];
    for (i, (b, _)) in ops.iter().enumerate() {
        by_byte[usize::from(*b)] = Some(i);
    }

    out.push_str("/// Metadata indexed by opcode byte.\n");
    out.push_str("pub const OPCODE_INFO_BY_BYTE: &[OpcodeInfo] = &[\n");
    for (byte, slot) in by_byte.iter().enumerate() {
        match slot {
            Some(i) => {
                let (_, op) = &ops[*i];
                let (start, len, size, flags) = rows[*i];
                out.push_str(&format!(
                    "    OpcodeInfo {{ mnemonic: \"{}\", size: {}, flags: OpcodeFlags(0x{:02X}), operands: OperandLayout {{ start: {}, len: {} }} }}, // 0x{:02X} {}\n",
                    op.mnemonic, size, flags, start, len, byte, op.name
                ));
            }
            None => {
                out.push_str(&format!(
                    "    OpcodeInfo {{ mnemonic: \"<invalid>\", size: 0, flags: OpcodeFlags::NONE, operands: OperandLayout {{ start: 0, len: 0 }} }}, // 0x{byte:02X}\n"
                ));
            }
        }
    }
    out.push_str("];\n\n");

    out.push_str("/// Layout bytecode opcodes.\n");
    out.push_str("#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]\n");
    out.push_str("#[repr(u8)]\n");
    out.push_str("pub enum Opcode {\n");
    for (b, op) in &ops {
        let doc = op
            .doc
            .as_deref()
            .with_context(|| format!("missing doc for opcode {}", op.name))?;
        for line in doc.lines() {
            out.push_str(&format!("    /// {line}\n"));
        }
        out.push_str(&format!("    {} = {},\n", op.name, fmt_hex_u8(*b)));
    }
    out.push_str("}\n\n");

    out.push_str("impl Opcode {\n");
    out.push_str("    /// Decodes an opcode byte.\n");
    out.push_str("    #[must_use]\n");
    out.push_str("    pub fn from_u8(b: u8) -> Option<Self> {\n");
    out.push_str("        Some(match b {\n");
    for (b, op) in &ops {
        out.push_str(&format!(
            "            {} => Self::{},\n",
            fmt_hex_u8(*b),
            op.name
        ));
    }
    out.push_str("            _ => return None,\n");
    out.push_str("        })\n");
    out.push_str("    }\n");
    out.push_str("}\n");
    out.push_str(POSTAMBLE);

    Ok(out)
}

fn main() -> Result<()> {
    let mut args = std::env::args().skip(1);
    let spec_path: PathBuf = args
        .next()
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from("wire_tape/opcodes.json"));
    let out_path: PathBuf = args
        .next()
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from("wire_tape/src/opcodes_gen.rs"));
    if args.next().is_some() {
        bail!("usage: wire_tape_codegen [spec.json] [opcodes_out.rs]");
    }

    let json =
        fs::read_to_string(&spec_path).with_context(|| format!("read {}", spec_path.display()))?;
    let spec: Spec =
        serde_json::from_str(&json).with_context(|| format!("parse {}", spec_path.display()))?;
    let rendered = generate(spec, &spec_path)?;

    if let Some(parent) = out_path.parent() {
        fs::create_dir_all(parent).with_context(|| format!("create {}", parent.display()))?;
    }
    fs::write(&out_path, rendered.as_bytes())
        .with_context(|| format!("write {}", out_path.display()))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::{Spec, generate};
    use std::fs;
    use std::path::PathBuf;

    fn normalize_newlines(s: &str) -> String {
        // On Windows, git autocrlf can check in generated `.rs` files with `\r\n` line endings.
        s.replace("\r\n", "\n").replace('\r', "\n")
    }

    fn load_spec() -> (PathBuf, Spec) {
        let workspace_root = PathBuf::from(env!("CARGO_MANIFEST_DIR"));
        let workspace_root = workspace_root.parent().expect("workspace root");
        let spec_path = workspace_root.join("wire_tape/opcodes.json");
        let json = fs::read_to_string(&spec_path).expect("read opcodes.json");
        let spec: Spec = serde_json::from_str(&json).expect("parse opcodes.json");
        (workspace_root.to_path_buf(), spec)
    }

    #[test]
    fn generated_file_is_up_to_date() {
        let (root, spec) = load_spec();
        let spec_path = root.join("wire_tape/opcodes.json");
        let rendered = generate(spec, &spec_path).expect("render opcodes_gen.rs");
        let existing = fs::read_to_string(root.join("wire_tape/src/opcodes_gen.rs"))
            .expect("read opcodes_gen.rs");
        assert_eq!(
            normalize_newlines(&rendered),
            normalize_newlines(&existing),
            "opcodes_gen.rs is out of date; re-run: cargo run -p wire_tape_codegen"
        );
    }

    #[test]
    fn rejects_duplicate_bytes() {
        let (root, mut spec) = load_spec();
        let mut dup = spec.opcodes[1].clone();
        dup.name = "Duplicate".into();
        spec.opcodes.push(dup);
        let err = generate(spec, &root).expect_err("duplicate byte must be rejected");
        assert!(err.to_string().contains("duplicate opcode byte"), "{err}");
    }

    #[test]
    fn rejects_unknown_roles() {
        let (root, mut spec) = load_spec();
        let op = spec
            .opcodes
            .iter_mut()
            .find(|o| !o.operands.is_empty())
            .expect("an opcode with operands");
        op.operands[0].role = "mystery".into();
        let err = generate(spec, &root).expect_err("unknown role must be rejected");
        assert!(format!("{err:#}").contains("unknown operand role"), "{err:#}");
    }
}
