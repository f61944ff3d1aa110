use crate::messages::{RecordingState, ServerState};
use crossterm::style::Stylize;
use parking_lot::Mutex;
use std::io::{self, Write};
use std::sync::Arc;
use tracing_subscriber::fmt::MakeWriter;

const CLEAR_LINE: &str = "\r\x1b[K";

struct Inner {
    out: Box<dyn Write + Send>,
    last: ServerState,
}

/// Single in-place status line with log output scrolling above it
///
/// Cloning is cheap; every clone writes to the same sink, and writes are
/// serialized so a log line never lands in the middle of the status line.
#[derive(Clone)]
pub struct StatusLine {
    inner: Arc<Mutex<Inner>>,
}

impl StatusLine {
    pub fn stdout() -> Self {
        Self::new(Box::new(io::stdout()))
    }

    pub fn new(out: Box<dyn Write + Send>) -> Self {
        Self {
            inner: Arc::new(Mutex::new(Inner {
                out,
                last: ServerState::default(),
            })),
        }
    }

    /// Overwrite the current line with `state`
    pub fn render(&self, state: &ServerState) {
        let mut inner = self.inner.lock();
        inner.last = state.clone();
        draw(&mut inner);
    }

    /// Redraw the last rendered state without replacing it
    pub fn redraw(&self) {
        let mut inner = self.inner.lock();
        draw(&mut inner);
    }

    /// Print `message` above the status line, then redraw it
    pub fn log(&self, message: &str) {
        let mut inner = self.inner.lock();
        let _ = writeln!(inner.out, "{CLEAR_LINE}{message}");
        draw(&mut inner);
    }

    /// Print a plain line without redrawing the status line
    pub fn println(&self, line: &str) {
        let mut inner = self.inner.lock();
        let _ = writeln!(inner.out, "{CLEAR_LINE}{line}");
        let _ = inner.out.flush();
    }

    /// Leave the status line in place and move to a fresh line
    pub fn finish(&self) {
        let mut inner = self.inner.lock();
        let _ = writeln!(inner.out);
        let _ = inner.out.flush();
    }
}

fn draw(inner: &mut Inner) {
    let line = format_status(&inner.last);
    let _ = write!(inner.out, "{CLEAR_LINE}{line}");
    let _ = inner.out.flush();
}

pub fn format_status(state: &ServerState) -> String {
    let symbol = match state.state {
        RecordingState::Recording => "●".red(),
        RecordingState::Processing => "◐".yellow(),
        _ => "○".green(),
    };
    let pipeline = state.pipeline.as_deref().unwrap_or("-");
    format!(
        "{symbol} [{:<10}] Pipeline: {pipeline}",
        state.state.as_str()
    )
}

/// Buffers one tracing event and hands it to [`StatusLine::log`] on drop
pub struct LogWriter {
    status: StatusLine,
    buf: Vec<u8>,
}

impl Write for LogWriter {
    fn write(&mut self, bytes: &[u8]) -> io::Result<usize> {
        self.buf.extend_from_slice(bytes);
        Ok(bytes.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

impl Drop for LogWriter {
    fn drop(&mut self) {
        if self.buf.is_empty() {
            return;
        }
        let text = String::from_utf8_lossy(&self.buf);
        self.status.log(text.trim_end_matches('\n'));
    }
}

impl<'a> MakeWriter<'a> for StatusLine {
    type Writer = LogWriter;

    fn make_writer(&'a self) -> Self::Writer {
        LogWriter {
            status: self.clone(),
            buf: Vec::new(),
        }
    }
}


#[cfg(test)]
mod tests {
    use super::testing::captured;
    use super::*;

    fn state(name: &str, pipeline: Option<&str>) -> ServerState {
        ServerState {
            state: RecordingState::parse(name),
            pipeline: pipeline.map(str::to_string),
        }
    }

    #[test]
    fn test_status_format() {
        let line = format_status(&state("recording", Some("brainstorm")));
        assert!(line.contains("●"));
        assert!(line.ends_with(" [recording ] Pipeline: brainstorm"));

        let line = format_status(&state("processing", None));
        assert!(line.contains("◐"));
        assert!(line.ends_with(" [processing] Pipeline: -"));

        let line = format_status(&state("idle", None));
        assert!(line.contains("○"));
        assert!(line.ends_with(" [idle      ] Pipeline: -"));
    }

    #[test]
    fn test_render_clears_line_first() {
        let (status, buf) = captured();
        status.render(&state("idle", None));
        let out = buf.contents();
        assert!(out.starts_with(CLEAR_LINE));
        assert!(out.contains("[idle      ]"));
    }

    #[test]
    fn test_log_prints_above_and_redraws() {
        let (status, buf) = captured();
        status.render(&state("recording", Some("translate")));
        status.log("[WS] Connected");

        let out = buf.contents();
        let (before, after) = out.split_once("[WS] Connected\n").unwrap();
        assert!(before.ends_with(CLEAR_LINE));
        assert!(after.starts_with(CLEAR_LINE));
        assert!(after.contains("[recording ] Pipeline: translate"));
    }

    #[test]
    fn test_redraw_keeps_last_rendered_state() {
        let (status, buf) = captured();
        status.render(&state("processing", Some("translate")));
        status.redraw();

        let out = buf.contents();
        assert_eq!(out.matches("[processing] Pipeline: translate").count(), 2);
        assert!(!out.contains("[unknown   ]"));
    }

    #[test]
    fn test_log_writer_routes_through_log() {
        let (status, buf) = captured();
        {
            let mut writer = status.make_writer();
            writer.write_all(b"INFO something happened\n").unwrap();
        }
        let out = buf.contents();
        assert!(out.contains("INFO something happened\n"));
        assert!(out.ends_with("Pipeline: -"));
    }
}
