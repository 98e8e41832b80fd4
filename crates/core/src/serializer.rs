//! Output serializers, keyed by format name.
//!
//! `nquads` passes canonical lines through; `nt` drops the graph position,
//! merging all graphs. Both re-encode for the output stream: characters the
//! target encoding cannot represent are substituted with
//! `\uXXXX`/`\UXXXXXXXX` references.

use std::io::Write;

use regex::Regex;

use crate::error::{QuinceError, Result};
use crate::grammar;

pub const SUPPORTED_FORMATS: &[&str] = &["nquads", "nt"];

/// Byte encoding of the output stream.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputEncoding {
    Utf8,
    Ascii,
}

impl OutputEncoding {
    /// Encode one line for this encoding, substituting numeric character
    /// references for anything unrepresentable.
    fn encode(self, line: &str) -> String {
        match self {
            OutputEncoding::Utf8 => line.to_string(),
            OutputEncoding::Ascii => {
                let mut out = String::with_capacity(line.len());
                for c in line.chars() {
                    if c.is_ascii() {
                        out.push(c);
                    } else {
                        let code = c as u32;
                        if code <= 0xFFFF {
                            out.push_str(&format!("\\u{code:04X}"));
                        } else {
                            out.push_str(&format!("\\U{code:08X}"));
                        }
                    }
                }
                out
            }
        }
    }
}

/// A line-at-a-time quad serializer.
pub trait Serializer {
    fn on_start(&mut self) -> Result<()> {
        Ok(())
    }

    /// Emit one canonical stored line.
    fn on_line(&mut self, line: &str) -> Result<()>;

    fn on_end(&mut self) -> Result<()> {
        Ok(())
    }
}

impl std::fmt::Debug for dyn Serializer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("<dyn Serializer>")
    }
}

/// Look up a serializer for `format`, writing to `out`.
pub fn create_serializer(
    format: &str,
    out: Box<dyn Write>,
    encoding: OutputEncoding,
) -> Result<Box<dyn Serializer>> {
    match format {
        "nquads" => Ok(Box::new(NQuadsSerializer { out, encoding })),
        "nt" => Ok(Box::new(NTriplesSerializer {
            out,
            encoding,
            line: grammar::nquad_line_regex(),
        })),
        other => Err(QuinceError::NoSerializer(other.to_string())),
    }
}

/// Pass-through serializer; the stored line is already canonical NQuads.
struct NQuadsSerializer {
    out: Box<dyn Write>,
    encoding: OutputEncoding,
}

impl Serializer for NQuadsSerializer {
    fn on_line(&mut self, line: &str) -> Result<()> {
        self.out.write_all(self.encoding.encode(line).as_bytes())?;
        Ok(())
    }
}

/// Drops the graph position, emitting `S P O .` — effectively merging all
/// graphs. Lines that do not parse as quads are skipped.
struct NTriplesSerializer {
    out: Box<dyn Write>,
    encoding: OutputEncoding,
    line: Regex,
}

impl Serializer for NTriplesSerializer {
    fn on_line(&mut self, line: &str) -> Result<()> {
        if let Some(caps) = self.line.captures(line) {
            let triple = format!("{} {} {} .\n", &caps["s"], &caps["p"], &caps["o"]);
            self.out.write_all(self.encoding.encode(&triple).as_bytes())?;
        }
        Ok(())
    }
}
