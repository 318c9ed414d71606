// SPDX-License-Identifier: Apache-2.0
// Copyright 2025 itsakeyfut
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! Transaction trace format
//!
//! One access per line, fields separated by whitespace. `#` starts a
//! comment. Numbers are decimal or `0x`-prefixed hex.
//!
//! ```text
//! # cycle  target  op     operands
//!   0      i       r      0x40000000 4          # fetch 4 bytes
//!   2      d       r      0x40000100 8 0xb      # 8-byte load, ASI 0xB
//!   3      d       w      0x40000100 0x1234 0xa # 32-bit store
//!   9      i       flush                        # flush both caches
//!  12      snoop   0x40000100 4 2               # address, length, master
//! ```
//!
//! Data reads default to ASI 0xA. Cycles must not decrease.

use crate::core::control::Channel;
use crate::core::error::{Result, SimError};
use crate::core::mmu_cache::{DataExtension, Extension, InstructionExtension, SnoopRequest, Transaction};
use crate::core::timing::TickCount;
use std::path::Path;

/// Operation of one trace line
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TraceOp {
    Access {
        channel: Channel,
        trans: Transaction,
    },
    Snoop(SnoopRequest),
}

/// One trace line
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TraceEntry {
    /// Earliest cycle the operation is issued
    pub cycle: TickCount,
    pub op: TraceOp,
}

/// Read and parse a trace file
pub fn load_trace<P: AsRef<Path>>(path: P) -> Result<Vec<TraceEntry>> {
    let contents = std::fs::read_to_string(path.as_ref())?;
    let entries = parse_trace(&contents)?;
    log::info!(
        "Loaded {} trace entries from {}",
        entries.len(),
        path.as_ref().display()
    );
    Ok(entries)
}

/// Parse trace text
///
/// # Example
///
/// ```
/// use sparcvp::core::platform::{parse_trace, TraceOp};
///
/// let trace = parse_trace("0 d r 0x40000000 4\n# done\n").unwrap();
/// assert_eq!(trace.len(), 1);
/// assert!(matches!(trace[0].op, TraceOp::Access { .. }));
/// ```
pub fn parse_trace(text: &str) -> Result<Vec<TraceEntry>> {
    let mut entries: Vec<TraceEntry> = Vec::new();

    for (number, raw) in text.lines().enumerate() {
        let line = number + 1;
        let content = raw.split('#').next().unwrap_or("").trim();
        if content.is_empty() {
            continue;
        }

        let entry = parse_line(content, line)?;
        if let Some(last) = entries.last() {
            if entry.cycle < last.cycle {
                return Err(parse_error(
                    line,
                    format!("cycle {} is before cycle {}", entry.cycle, last.cycle),
                ));
            }
        }
        entries.push(entry);
    }

    Ok(entries)
}

fn parse_line(content: &str, line: usize) -> Result<TraceEntry> {
    let fields: Vec<&str> = content.split_whitespace().collect();
    let arg = |i: usize, what: &str| field(&fields, i, what, line);

    let cycle = parse_number(arg(0, "cycle")?, line)?;
    let target = arg(1, "target")?;

    if target.eq_ignore_ascii_case("snoop") {
        expect_fields(&fields, 5, line)?;
        let snoop = SnoopRequest {
            address: parse_u32(arg(2, "address")?, line)?,
            length: parse_u32(arg(3, "length")?, line)?,
            master_id: parse_u32(arg(4, "master id")?, line)?,
        };
        return Ok(TraceEntry {
            cycle,
            op: TraceOp::Snoop(snoop),
        });
    }

    let channel = match target.to_ascii_lowercase().as_str() {
        "i" => Channel::Instruction,
        "d" => Channel::Data,
        other => return Err(parse_error(line, format!("unknown target '{}'", other))),
    };
    let op = arg(2, "operation")?.to_ascii_lowercase();

    let trans = match op.as_str() {
        "flush" => {
            expect_fields(&fields, 3, line)?;
            Transaction::read(0, 0).with_extension(extension(channel, None, true))
        }
        "r" => {
            let address = parse_u32(arg(3, "address")?, line)?;
            let size = parse_u32(arg(4, "size")?, line)? as usize;
            if !matches!(size, 1 | 2 | 4 | 8) {
                return Err(parse_error(line, format!("unsupported size {}", size)));
            }
            let asi = optional_asi(&fields, 5, line)?;
            Transaction::read(address, size).with_extension(extension(channel, asi, false))
        }
        "w" => {
            let address = parse_u32(arg(3, "address")?, line)?;
            let value = parse_u32(arg(4, "value")?, line)?;
            let asi = optional_asi(&fields, 5, line)?;
            Transaction::write_word(address, value).with_extension(extension(channel, asi, false))
        }
        other => {
            return Err(parse_error(line, format!("unknown operation '{}'", other)));
        }
    };

    Ok(TraceEntry {
        cycle,
        op: TraceOp::Access {
            channel,
            trans: trans.with_id(line as u64),
        },
    })
}

fn field<'a>(fields: &[&'a str], index: usize, what: &str, line: usize) -> Result<&'a str> {
    fields
        .get(index)
        .copied()
        .ok_or_else(|| parse_error(line, format!("missing {}", what)))
}

fn extension(channel: Channel, asi: Option<u8>, flush: bool) -> Extension {
    match channel {
        Channel::Instruction => Extension::Instruction(InstructionExtension {
            flush,
            ..InstructionExtension::default()
        }),
        Channel::Data => {
            let mut ext = asi.map(DataExtension::with_asi).unwrap_or_default();
            ext.flush = flush;
            Extension::Data(ext)
        }
    }
}

fn optional_asi(fields: &[&str], index: usize, line: usize) -> Result<Option<u8>> {
    expect_fields(fields, index + 1, line)?;
    match fields.get(index) {
        None => Ok(None),
        Some(text) => {
            let value = parse_u32(text, line)?;
            u8::try_from(value)
                .map(Some)
                .map_err(|_| parse_error(line, format!("ASI 0x{:X} out of range", value)))
        }
    }
}

/// Reject trailing fields past `max`
fn expect_fields(fields: &[&str], max: usize, line: usize) -> Result<()> {
    if fields.len() > max {
        return Err(parse_error(
            line,
            format!("unexpected field '{}'", fields[max]),
        ));
    }
    Ok(())
}

fn parse_number(text: &str, line: usize) -> Result<u64> {
    let parsed = match text.strip_prefix("0x").or_else(|| text.strip_prefix("0X")) {
        Some(hex) => u64::from_str_radix(&hex.replace('_', ""), 16),
        None => text.replace('_', "").parse::<u64>(),
    };
    parsed.map_err(|_| parse_error(line, format!("invalid number '{}'", text)))
}

fn parse_u32(text: &str, line: usize) -> Result<u32> {
    let value = parse_number(text, line)?;
    u32::try_from(value).map_err(|_| parse_error(line, format!("'{}' exceeds 32 bits", text)))
}

fn parse_error(line: usize, message: String) -> SimError {
    SimError::TraceParse { line, message }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::mmu_cache::Command;
    use std::io::Write;

    #[test]
    fn test_parse_accesses() {
        let trace = parse_trace(
            "# header\n\
             0 i r 0x40000000 4\n\
             \n\
             2 d r 0x40000100 8 0xb   # load\n\
             3 D W 0x40000100 0x1234\n",
        )
        .unwrap();

        assert_eq!(trace.len(), 3);
        assert_eq!(trace[0].cycle, 0);

        match &trace[1].op {
            TraceOp::Access { channel, trans } => {
                assert_eq!(*channel, Channel::Data);
                assert_eq!(trans.command, Command::Read);
                assert_eq!(trans.data.len(), 8);
                assert_eq!(trans.id, 4);
                assert!(matches!(
                    trans.extension,
                    Some(Extension::Data(DataExtension { asi: 0xB, .. }))
                ));
            }
            op => panic!("unexpected {:?}", op),
        }

        match &trace[2].op {
            TraceOp::Access { trans, .. } => {
                assert_eq!(trans.command, Command::Write);
                assert_eq!(trans.word(), 0x1234);
                assert!(matches!(
                    trans.extension,
                    Some(Extension::Data(DataExtension { asi: 0xA, .. }))
                ));
            }
            op => panic!("unexpected {:?}", op),
        }
    }

    #[test]
    fn test_parse_flush_and_snoop() {
        let trace = parse_trace("1 i flush\n4 snoop 0x40000010 16 2\n").unwrap();

        match &trace[0].op {
            TraceOp::Access { trans, .. } => assert!(matches!(
                trans.extension,
                Some(Extension::Instruction(InstructionExtension { flush: true, .. }))
            )),
            op => panic!("unexpected {:?}", op),
        }
        assert_eq!(
            trace[1].op,
            TraceOp::Snoop(SnoopRequest {
                master_id: 2,
                address: 0x4000_0010,
                length: 16
            })
        );
    }

    #[test]
    fn test_parse_errors_carry_line() {
        let cases = [
            ("0 x r 0 4", "unknown target"),
            ("0 d r 0 3", "unsupported size"),
            ("0 d q 0 4", "unknown operation"),
            ("0 d r 0x1_0000_0000 4", "exceeds 32 bits"),
            ("0 d r 0 4 0x100", "out of range"),
            ("0 d r 0 4 0xa extra", "unexpected field"),
            ("0 d r", "missing address"),
            ("zz d r 0 4", "invalid number"),
        ];
        for (text, expected) in cases {
            let input = format!("# comment\n{}\n", text);
            match parse_trace(&input) {
                Err(SimError::TraceParse { line, message }) => {
                    assert_eq!(line, 2, "{}", text);
                    assert!(message.contains(expected), "{}: {}", text, message);
                }
                other => panic!("{}: unexpected {:?}", text, other),
            }
        }
    }

    #[test]
    fn test_cycles_must_not_decrease() {
        let err = parse_trace("5 d r 0 4\n4 d r 0 4\n").unwrap_err();
        assert!(matches!(err, SimError::TraceParse { line: 2, .. }));
    }

    #[test]
    fn test_load_trace_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "0 d r 0x40000000 4").unwrap();
        writeln!(file, "1 d w 0x40000000 7").unwrap();

        let trace = load_trace(file.path()).unwrap();
        assert_eq!(trace.len(), 2);
        assert!(matches!(load_trace("/nonexistent/trace.txt"), Err(SimError::Io(_))));
    }
}
