use std::io::BufWriter;
use std::io::Cursor;
use std::io::Write;

enum Sink {
    Buffer(Cursor<Vec<u8>>),
    Stream(BufWriter<Box<dyn Write>>),
}

impl Write for Sink {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        match self {
            Sink::Buffer(inner) => inner.write(buf),
            Sink::Stream(inner) => inner.write(buf),
        }
    }

    fn flush(&mut self) -> std::io::Result<()> {
        match self {
            Sink::Buffer(_) => Ok(()),
            Sink::Stream(inner) => inner.flush(),
        }
    }

    fn write_all(&mut self, buf: &[u8]) -> std::io::Result<()> {
        match self {
            Sink::Buffer(inner) => inner.write_all(buf),
            Sink::Stream(inner) => inner.write_all(buf),
        }
    }
}

/// Collects the regular and the error output of the tools. Tests use the
/// buffered version to inspect the output of the compilation steps, the
/// command line tools write to stdout and stderr.
pub struct DiagnosticEmitter {
    out: Sink,
    err: Sink,
}

impl DiagnosticEmitter {
    pub fn new(out: Box<dyn Write>, err: Box<dyn Write>) -> Self {
        Self {
            out: Sink::Stream(BufWriter::new(out)),
            err: Sink::Stream(BufWriter::new(err)),
        }
    }

    pub fn log_to_buffer() -> Self {
        Self {
            out: Sink::Buffer(Cursor::new(Vec::new())),
            err: Sink::Buffer(Cursor::new(Vec::new())),
        }
    }

    pub fn out(&mut self, msg: &str) {
        self.out
            .write_all(msg.as_bytes())
            .expect("Failed to write to output buffer.");
    }

    pub fn out_ln(&mut self, msg: &str) {
        self.out(msg);
        self.out("\n");
    }

    pub fn err(&mut self, msg: &str) {
        self.err
            .write_all(msg.as_bytes())
            .expect("Failed to write to error buffer.");
    }

    pub fn err_ln(&mut self, msg: &str) {
        self.err(msg);
        self.err("\n");
    }

    /// The complete regular output so far, empty string when the emitter
    /// writes to a stream instead of a buffer.
    pub fn out_buffer(&self) -> String {
        match &self.out {
            Sink::Buffer(inner) => core::str::from_utf8(inner.get_ref())
                .expect("Failed to convert bytes to utf-8 string")
                .to_owned(),
            Sink::Stream(_) => String::new(),
        }
    }

    /// The complete error output so far, empty string when the emitter
    /// writes to a stream instead of a buffer.
    pub fn err_buffer(&self) -> String {
        match &self.err {
            Sink::Buffer(inner) => core::str::from_utf8(inner.get_ref())
                .expect("Failed to convert bytes to utf-8 string")
                .to_owned(),
            Sink::Stream(_) => String::new(),
        }
    }

    pub fn error(&mut self, line: u32, message: &str) {
        self.report(line, "", message);
    }

    pub fn report(&mut self, line: u32, item: &str, message: &str) {
        self.err(&format!("[line {line}] Error {item}: {message}\n"));
    }

    pub fn flush(&mut self) {
        self.out.flush().expect("Failed to flush output buffer.");
        self.err.flush().expect("Failed to flush error buffer.");
    }
}

impl Drop for DiagnosticEmitter {
    fn drop(&mut self) {
        self.flush();
    }
}
