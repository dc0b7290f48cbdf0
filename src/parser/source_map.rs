//! Source mapping for solc-compiled EVM bytecode.
//!
//! Translates program counters to source ranges using the compressed
//! `s:l:f:j[:m]` source map solc emits next to the runtime bytecode.

use super::opcode::push_size;
use crate::utils::error::ArtifactError;
use log::debug;
use serde::{Deserialize, Serialize};
use std::fmt::Write as _;

/// Jump annotation carried by a source map entry
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Jump {
    /// Jump into a function
    In,
    /// Return from a function
    Out,
    Regular,
}

impl Jump {
    fn from_marker(marker: &str) -> Self {
        match marker {
            "i" => Jump::In,
            "o" => Jump::Out,
            _ => Jump::Regular,
        }
    }
}

/// One contiguous pc range mapped to a source range
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceMapEntry {
    pub pc_range_start: usize,
    /// Exclusive
    pub pc_range_end: usize,
    /// Index into the source list
    pub file: usize,
    pub offset: usize,
    pub length: usize,
    pub jump: Jump,
}

/// A location in the source code
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceLocation {
    pub file: String,
    pub offset: usize,
    pub length: usize,
    /// 1-based, only when the source text is known
    pub line: Option<usize>,
    pub column: Option<usize>,
}

/// Sorted, non-overlapping pc → source table for one contract
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SourceMap {
    entries: Vec<SourceMapEntry>,
    files: Vec<String>,
}

impl SourceMap {
    /// Expand a compressed solc source map against the bytecode it describes
    ///
    /// **Public** - called once when a contract is registered
    ///
    /// # Arguments
    /// * `map` - Compressed source map (`deployedSourceMap` or `sourceMap`)
    /// * `bytecode` - Runtime or creation bytecode the map describes
    /// * `files` - Source list; the map's file index points into it
    ///
    /// # Errors
    /// * `ArtifactError::InvalidSourceMap` - A field is not an integer
    pub fn from_compressed(
        map: &str,
        bytecode: &[u8],
        files: Vec<String>,
    ) -> Result<Self, ArtifactError> {
        let boundaries = instruction_boundaries(bytecode);

        let mut entries: Vec<SourceMapEntry> = Vec::new();
        let (mut s, mut l, mut f) = (-1i64, -1i64, -1i64);
        let mut jump = Jump::Regular;

        for (index, item) in map.split(';').enumerate() {
            let Some(&(pc, size)) = boundaries.get(index) else {
                break;
            };

            let mut fields = item.split(':');
            s = parse_field(fields.next(), s, index)?;
            l = parse_field(fields.next(), l, index)?;
            f = parse_field(fields.next(), f, index)?;
            if let Some(marker) = fields.next().filter(|m| !m.is_empty()) {
                jump = Jump::from_marker(marker);
            }

            if s < 0 || l < 0 || f < 0 {
                continue;
            }

            let entry = SourceMapEntry {
                pc_range_start: pc,
                pc_range_end: pc + size,
                file: f as usize,
                offset: s as usize,
                length: l as usize,
                jump,
            };

            match entries.last_mut() {
                Some(last)
                    if last.pc_range_end == entry.pc_range_start
                        && last.file == entry.file
                        && last.offset == entry.offset
                        && last.length == entry.length
                        && last.jump == entry.jump =>
                {
                    last.pc_range_end = entry.pc_range_end;
                }
                _ => entries.push(entry),
            }
        }

        debug!(
            "Expanded source map: {} instructions into {} ranges",
            boundaries.len(),
            entries.len()
        );

        Ok(Self { entries, files })
    }

    pub fn entries(&self) -> &[SourceMapEntry] {
        &self.entries
    }

    pub fn files(&self) -> &[String] {
        &self.files
    }

    /// Find the entry whose pc range contains `pc`
    pub fn entry_for(&self, pc: usize) -> Option<&SourceMapEntry> {
        let after = self.entries.partition_point(|e| e.pc_range_start <= pc);
        let entry = self.entries.get(after.checked_sub(1)?)?;
        (pc < entry.pc_range_end).then_some(entry)
    }

    /// Resolve a program counter to a source location (without line info)
    pub fn resolve(&self, pc: usize) -> Option<SourceLocation> {
        let entry = self.entry_for(pc)?;
        let file = self
            .files
            .get(entry.file)
            .cloned()
            .unwrap_or_else(|| format!("<source {}>", entry.file));
        Some(SourceLocation {
            file,
            offset: entry.offset,
            length: entry.length,
            line: None,
            column: None,
        })
    }
}

/// Parse one numeric field, inheriting the previous value when empty
///
/// **Private** - internal helper for from_compressed
fn parse_field(field: Option<&str>, previous: i64, index: usize) -> Result<i64, ArtifactError> {
    match field {
        None | Some("") => Ok(previous),
        Some(value) => value.parse::<i64>().map_err(|e| ArtifactError::InvalidSourceMap {
            index,
            reason: format!("'{}': {}", value, e),
        }),
    }
}

/// (pc, size) of every instruction in the bytecode
fn instruction_boundaries(bytecode: &[u8]) -> Vec<(usize, usize)> {
    let mut boundaries = Vec::new();
    let mut pc = 0;
    while pc < bytecode.len() {
        let size = 1 + push_size(bytecode[pc]);
        boundaries.push((pc, size));
        pc += size;
    }
    boundaries
}

/// Decode hex bytecode, tolerating unlinked library placeholders
///
/// Placeholders (`__$…$__` or `__Name___…`) are read as the zero address.
pub fn parse_bytecode(code: &str) -> Result<Vec<u8>, ArtifactError> {
    let digits = code.trim().strip_prefix("0x").unwrap_or(code.trim());
    let cleaned: String = digits
        .chars()
        .map(|c| if c.is_ascii_hexdigit() { c } else { '0' })
        .collect();
    hex::decode(cleaned).map_err(|e| ArtifactError::InvalidBytecode(e.to_string()))
}

/// 1-based (line, column) of a byte offset
pub fn line_column(source: &str, offset: usize) -> (usize, usize) {
    let offset = offset.min(source.len());
    let before = &source.as_bytes()[..offset];
    let line = before.iter().filter(|b| **b == b'\n').count() + 1;
    let line_start = before.iter().rposition(|b| *b == b'\n').map_or(0, |p| p + 1);
    (line, offset - line_start + 1)
}

/// Render the source lines covering `offset..offset + length`
///
/// Lines inside the range are marked with `>`; `pad` lines of context are
/// shown on each side.
pub fn render_excerpt(source: &str, offset: usize, length: usize, pad: usize) -> String {
    let (first, _) = line_column(source, offset);
    let (last, _) = line_column(source, offset.saturating_add(length.saturating_sub(1)));

    let lines: Vec<&str> = source.lines().collect();
    let from = first.saturating_sub(pad).max(1);
    let to = (last + pad).min(lines.len().max(1));
    let width = to.to_string().len();

    let mut out = String::new();
    for number in from..=to {
        let text = lines.get(number - 1).copied().unwrap_or("");
        let marker = if (first..=last).contains(&number) { '>' } else { ' ' };
        let _ = writeln!(out, "{} {:>width$} | {}", marker, number, text, width = width);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    // PUSH1 0x80 PUSH1 0x40 MSTORE CALLVALUE DUP1 ISZERO
    const CODE: [u8; 9] = [0x60, 0x80, 0x60, 0x40, 0x52, 0x34, 0x80, 0x15, 0x00];

    #[test]
    fn test_expand_and_resolve() {
        let map = "10:20:0:-;;;30:5::i;:::o;-1:-1:-1;";
        let sm = SourceMap::from_compressed(map, &CODE, vec!["Token.sol".to_string()]).unwrap();

        // first three instructions share 10:20 and merge into pc 0..5
        assert_eq!(sm.entries()[0].pc_range_start, 0);
        assert_eq!(sm.entries()[0].pc_range_end, 5);

        let loc = sm.resolve(3).unwrap();
        assert_eq!(loc.file, "Token.sol");
        assert_eq!((loc.offset, loc.length), (10, 20));

        let callvalue = sm.entry_for(5).unwrap();
        assert_eq!((callvalue.offset, callvalue.length, callvalue.jump), (30, 5, Jump::In));
        assert_eq!(sm.entry_for(6).unwrap().jump, Jump::Out);

        // file -1 is a gap
        assert!(sm.resolve(7).is_none());
        assert!(sm.resolve(100).is_none());
    }

    #[test]
    fn test_entries_sorted_and_disjoint() {
        let map = "1:1:0;2:1:0;2:1:0;3:1:0;4:1:0;5:1:0";
        let sm = SourceMap::from_compressed(map, &CODE, vec!["A.sol".to_string()]).unwrap();
        for pair in sm.entries().windows(2) {
            assert!(pair[0].pc_range_end <= pair[1].pc_range_start);
        }
    }

    #[test]
    fn test_invalid_field() {
        let err = SourceMap::from_compressed("1:x:0", &CODE, vec![]).unwrap_err();
        assert!(matches!(err, ArtifactError::InvalidSourceMap { index: 0, .. }));
    }

    #[test]
    fn test_parse_bytecode_with_placeholder() {
        let code = "0x73__$d8a7c1a1b3e2f5c6d7e8f9a0b1c2d3e4f5$__00";
        let bytes = parse_bytecode(code).unwrap();
        assert_eq!(bytes.len(), 22);
        assert_eq!(bytes[0], 0x73);
    }

    #[test]
    fn test_line_column() {
        let src = "line one\nline two\nline three";
        assert_eq!(line_column(src, 0), (1, 1));
        assert_eq!(line_column(src, 9), (2, 1));
        assert_eq!(line_column(src, 14), (2, 6));
    }

    #[test]
    fn test_render_excerpt() {
        let src = "a\nb\nrequire(x);\nd\ne\nf";
        let offset = src.find("require").unwrap();
        let excerpt = render_excerpt(src, offset, 11, 1);
        assert_eq!(excerpt, "  2 | b\n> 3 | require(x);\n  4 | d\n");
    }
}
