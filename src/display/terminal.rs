// Output sink for the render loop; keeps escape sequences out of the rendering core.

use std::io::{self, Write};

pub trait TerminalSink {
    fn clear_screen(&mut self) -> io::Result<()>;
    fn write_line(&mut self, line: &str) -> io::Result<()>;
    fn flush(&mut self) -> io::Result<()>;
}

impl<S: TerminalSink + ?Sized> TerminalSink for &mut S {
    fn clear_screen(&mut self) -> io::Result<()> {
        (**self).clear_screen()
    }

    fn write_line(&mut self, line: &str) -> io::Result<()> {
        (**self).write_line(line)
    }

    fn flush(&mut self) -> io::Result<()> {
        (**self).flush()
    }
}

/// ANSI terminal: clear screen and move the cursor home before each frame.
pub struct AnsiTerminal<W> {
    out: W,
}

impl AnsiTerminal<io::Stdout> {
    pub fn stdout() -> Self {
        Self::new(io::stdout())
    }
}

impl<W: Write> AnsiTerminal<W> {
    pub fn new(out: W) -> Self {
        Self { out }
    }

    pub fn into_inner(self) -> W {
        self.out
    }
}

impl<W: Write> TerminalSink for AnsiTerminal<W> {
    fn clear_screen(&mut self) -> io::Result<()> {
        self.out.write_all(b"\x1b[2J\x1b[H")
    }

    fn write_line(&mut self, line: &str) -> io::Result<()> {
        writeln!(self.out, "{}", line)
    }

    fn flush(&mut self) -> io::Result<()> {
        self.out.flush()
    }
}

/// In-memory sink; each `flush` closes one frame.
#[derive(Debug, Default)]
pub struct CaptureSink {
    pub clears: usize,
    pub frames: Vec<Vec<String>>,
    pending: Vec<String>,
}

impl CaptureSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn last_frame(&self) -> Option<&[String]> {
        self.frames.last().map(Vec::as_slice)
    }
}

impl TerminalSink for CaptureSink {
    fn clear_screen(&mut self) -> io::Result<()> {
        self.clears += 1;
        Ok(())
    }

    fn write_line(&mut self, line: &str) -> io::Result<()> {
        self.pending.push(line.to_string());
        Ok(())
    }

    fn flush(&mut self) -> io::Result<()> {
        self.frames.push(std::mem::take(&mut self.pending));
        Ok(())
    }
}
