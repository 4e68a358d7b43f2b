//! Log output routing.
//!
//! Log lines go to standard error until a task view is running. While it
//! runs they go to the view's writer, so they are printed above the spinners
//! instead of through them.

use std::io::{self, Write};
use std::sync::{Arc, Mutex};

use tracing_subscriber::fmt::MakeWriter;

#[cfg(test)]
#[path = "logging_tests.rs"]
mod tests;

/// Shared destination of the log subscriber.
#[derive(Clone, Default)]
pub struct LogTarget {
    /// Writer of the running view, standard error when `None`
    writer: Arc<Mutex<Option<Box<dyn Write + Send>>>>,
}

impl LogTarget {
    /// Sends the following log lines to `writer`.
    pub fn redirect(&self, writer: Box<dyn Write + Send>) {
        if let Ok(mut current) = self.writer.lock() {
            *current = Some(writer);
        }
    }

    /// Sends the following log lines to standard error again.
    pub fn reset(&self) {
        if let Ok(mut current) = self.writer.lock() {
            if let Some(mut writer) = current.take() {
                let _ = writer.flush();
            }
        }
    }
}

/// Writer handed out for a single log event.
pub struct LogWriter<'a> {
    /// Where the event goes
    target: &'a LogTarget,
}

impl Write for LogWriter<'_> {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        match self.target.writer.lock() {
            Ok(mut current) => match current.as_mut() {
                Some(writer) => writer.write(buf),
                None => io::stderr().write(buf),
            },
            Err(_) => io::stderr().write(buf),
        }
    }

    fn flush(&mut self) -> io::Result<()> {
        match self.target.writer.lock() {
            Ok(mut current) => match current.as_mut() {
                Some(writer) => writer.flush(),
                None => io::stderr().flush(),
            },
            Err(_) => io::stderr().flush(),
        }
    }
}

impl<'a> MakeWriter<'a> for LogTarget {
    type Writer = LogWriter<'a>;

    fn make_writer(&'a self) -> Self::Writer {
        LogWriter { target: self }
    }
}

/// Redirects the log lines for as long as it lives.
pub struct Redirected<'a> {
    /// Target restored on drop
    target: &'a LogTarget,
}

impl<'a> Redirected<'a> {
    /// Sends the log lines of `target` to `writer` until the guard is dropped.
    pub fn new(target: &'a LogTarget, writer: Box<dyn Write + Send>) -> Self {
        target.redirect(writer);
        Self { target }
    }
}

impl Drop for Redirected<'_> {
    fn drop(&mut self) {
        self.target.reset();
    }
}
