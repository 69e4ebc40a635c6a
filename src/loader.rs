//! Reads LS-8 program text into a memory image.
//!
//! One instruction word per line, written as an 8-bit binary literal.
//! Anything after `#` is a comment and blank lines are ignored:
//!
//! ```text
//! 10000010 # LDI R0,8
//! 00000000
//! 00001000
//! 01000111 # PRN R0
//! 00000000
//! 00000001 # HLT
//! ```

use std::fs;
use std::path::Path;

use log::debug;

use crate::error::{Ls8Error, Result};

pub fn parse_program(source: &str) -> Result<Vec<u8>> {
    let mut program = Vec::new();
    for (number, line) in source.lines().enumerate() {
        let word = line.split('#').next().unwrap_or_default().trim();
        if word.is_empty() {
            continue;
        }
        program.push(parse_word(word).ok_or_else(|| Ls8Error::Parse {
            line: number + 1,
            text: word.to_string(),
        })?);
    }
    Ok(program)
}

fn parse_word(word: &str) -> Option<u8> {
    if word.len() > 8 || !word.bytes().all(|b| b == b'0' || b == b'1') {
        return None;
    }
    u8::from_str_radix(word, 2).ok()
}

pub fn load_program_file<P: AsRef<Path>>(path: P) -> Result<Vec<u8>> {
    let path = path.as_ref();
    let source = fs::read_to_string(path)?;
    let program = parse_program(&source)?;
    debug!("parsed {} bytes from {}", program.len(), path.display());
    Ok(program)
}
