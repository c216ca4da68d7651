//! Terminal input and colored output.

use std::io::{self, BufRead, Write};

use kvchat_core::LineSource;

const PROMPT: &str = "\x1b[1;34m->\x1b[0m ";
const GREEN: &[u8] = b"\x1b[0;32m";
const RESET: &[u8] = b"\x1b[0m";

/// Reads lines after printing the `->` prompt.
pub(crate) struct PromptedLines<R, W> {
    reader: R,
    prompt_out: W,
}

impl<R: BufRead, W: Write> PromptedLines<R, W> {
    pub(crate) fn new(reader: R, prompt_out: W) -> Self {
        Self { reader, prompt_out }
    }
}

impl<R: BufRead, W: Write> LineSource for PromptedLines<R, W> {
    fn read_line(&mut self) -> io::Result<Option<String>> {
        self.prompt_out.write_all(PROMPT.as_bytes())?;
        self.prompt_out.flush()?;

        let mut line = String::new();
        if self.reader.read_line(&mut line)? == 0 {
            return Ok(None);
        }
        Ok(Some(line))
    }
}

/// Writes every chunk in green.
pub(crate) struct Green<W> {
    inner: W,
}

impl<W: Write> Green<W> {
    pub(crate) fn new(inner: W) -> Self {
        Self { inner }
    }
}

impl<W: Write> Write for Green<W> {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.inner.write_all(GREEN)?;
        self.inner.write_all(buf)?;
        self.inner.write_all(RESET)?;
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        self.inner.flush()
    }
}
