use anyhow::{bail, ensure, Context, Result};
use std::fmt;
use std::io::Read;
use std::path::Path;

use yamal::{Yamal, YamalConfig};

/// Open an initialised file for writing in the closable mode it was created with.
pub fn open_writer(path: &Path, aux_thread: bool) -> Result<Yamal> {
    let closable = {
        let ro = Yamal::open_ro_with_config(path, YamalConfig::from_env())
            .with_context(|| format!("open {} (is it initialised? try `yamal init`)", path.display()))?;
        ro.closable()
    };
    let cfg = YamalConfig::from_env()
        .with_closable(closable)
        .with_aux_thread(aux_thread)
        .build();
    Yamal::open_with_config(path, cfg).with_context(|| format!("open {}", path.display()))
}

/// Read-only handle without the background thread.
pub fn open_reader(path: &Path) -> Result<Yamal> {
    Yamal::open_ro_with_config(path, YamalConfig::from_env())
        .with_context(|| format!("open {} read-only", path.display()))
}

/// Payload bytes for `write --value`: `-` is stdin, `@path` a whole file,
/// `hex:..` hex digits, anything else the literal UTF-8 text.
pub fn read_value(arg: &str) -> Result<Vec<u8>> {
    if arg == "-" {
        let mut buf = Vec::new();
        std::io::stdin()
            .lock()
            .read_to_end(&mut buf)
            .context("read value from stdin")?;
        return Ok(buf);
    }
    if let Some(file) = arg.strip_prefix('@') {
        return std::fs::read(file).with_context(|| format!("read value file {}", file));
    }
    if let Some(digits) = arg.strip_prefix("hex:") {
        return parse_hex(digits);
    }
    Ok(arg.as_bytes().to_vec())
}

pub fn parse_hex(digits: &str) -> Result<Vec<u8>> {
    let digits = digits.trim();
    if let Some(pos) = digits.find(|c: char| !c.is_ascii_hexdigit()) {
        bail!("hex value has a non-hex character at {}", pos);
    }
    ensure!(
        digits.len() % 2 == 0,
        "hex value has an odd number of digits ({})",
        digits.len()
    );
    digits
        .as_bytes()
        .chunks(2)
        .map(|pair| -> Result<u8> { Ok(u8::from_str_radix(std::str::from_utf8(pair)?, 16)?) })
        .collect()
}

/// Message payload as printed by `dump`.
pub struct Body<'a> {
    pub data: &'a [u8],
    pub hex: bool,
}

impl fmt::Display for Body<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.hex {
            return self.data.iter().try_for_each(|b| write!(f, "{:02x}", b));
        }
        match std::str::from_utf8(self.data) {
            Ok(text) => f.write_str(text),
            // Не-UTF-8: экранируем как b"..."
            Err(_) => write!(f, "b\"{}\"", self.data.escape_ascii()),
        }
    }
}

pub fn list_name(list: usize) -> &'static str {
    match list {
        yamal::LIST_DATA => "data",
        yamal::LIST_ANNS => "anns",
        yamal::LIST_SUBS => "subs",
        yamal::LIST_INDX => "indx",
        _ => "?",
    }
}
