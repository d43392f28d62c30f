//! Log output that stays readable while the terminal is in raw mode.

use std::io::{self, Write};

use crossterm::terminal;

/// `MakeWriter` for the fmt layer: stdout, with `\n` turned into `\r\n`
/// while raw mode is on.
pub fn terminal_line() -> TerminalLine {
    TerminalLine {
        raw: terminal::is_raw_mode_enabled().unwrap_or(false),
        out: io::stdout(),
    }
}

pub struct TerminalLine {
    raw: bool,
    out: io::Stdout,
}

impl Write for TerminalLine {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        if !self.raw {
            return self.out.write(buf);
        }
        self.out.write_all(&crlf(buf))?;
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        self.out.flush()
    }
}

/// Prefixes every bare `\n` with `\r`.
fn crlf(buf: &[u8]) -> Vec<u8> {
    let mut out = Vec::with_capacity(buf.len() + 8);
    for (idx, &byte) in buf.iter().enumerate() {
        if byte == b'\n' && (idx == 0 || buf[idx - 1] != b'\r') {
            out.push(b'\r');
        }
        out.push(byte);
    }
    out
}
