// ── Logging ───────────────────────────────────────────────────────────────────
//
// `log` facade backed by env_logger.  A plugin has no usable stderr, so the
// logger writes into a `HostSink`, which hands complete lines to the platform
// (X-Plane's Log.txt, the Windows debugger, or stderr in tests).

use std::io::{self, Write};

use log::{LevelFilter, Record};

/// One complete log line, newline included.
pub type EmitFn = fn(&str);

/// Line-buffered `Write` adapter in front of an `EmitFn`.
pub struct HostSink {
    emit: EmitFn,
    line: Vec<u8>,
}

impl HostSink {
    pub fn new(emit: EmitFn) -> Self {
        Self {
            emit,
            line: Vec::new(),
        }
    }

    fn emit_line(&mut self) {
        {
            let text = String::from_utf8_lossy(&self.line);
            (self.emit)(&text);
        }
        self.line.clear();
    }
}

impl Write for HostSink {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        for chunk in buf.split_inclusive(|&b| b == b'\n') {
            self.line.extend_from_slice(chunk);
            if chunk.ends_with(b"\n") {
                self.emit_line();
            }
        }
        Ok(buf.len())
    }

    /// Emits a trailing partial line, terminated.
    fn flush(&mut self) -> io::Result<()> {
        if !self.line.is_empty() {
            self.line.push(b'\n');
            self.emit_line();
        }
        Ok(())
    }
}

/// `movevr [LEVEL] message`.
fn write_line(out: &mut dyn Write, record: &Record<'_>) -> io::Result<()> {
    writeln!(out, "movevr [{}] {}", record.level(), record.args())
}

/// Install the global logger, writing through `emit`.
///
/// Returns `false` if a logger was already installed (e.g. the plugin was
/// stopped and started again in the same process); the existing one keeps
/// running and only the level is updated.
pub fn init_with(level: LevelFilter, emit: EmitFn) -> bool {
    let installed = env_logger::Builder::new()
        .filter_level(level)
        .format(|buf, record| write_line(buf, record))
        .target(env_logger::Target::Pipe(Box::new(HostSink::new(emit))))
        .try_init()
        .is_ok();
    log::set_max_level(level);
    installed
}

/// Install the global logger on the platform's debug output.
pub fn init(level: LevelFilter) -> bool {
    init_with(level, crate::platform::emit)
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;

    thread_local! {
        static LINES: RefCell<Vec<String>> = const { RefCell::new(Vec::new()) };
    }

    fn capture(line: &str) {
        LINES.with(|l| l.borrow_mut().push(line.to_owned()));
    }

    fn captured() -> Vec<String> {
        LINES.with(|l| l.borrow_mut().drain(..).collect())
    }

    #[test]
    fn sink_emits_whole_lines_only() {
        let mut sink = HostSink::new(capture);
        sink.write_all(b"first li").expect("write");
        assert!(captured().is_empty());

        sink.write_all(b"ne\nsecond\nthi").expect("write");
        assert_eq!(captured(), vec!["first line\n", "second\n"]);

        sink.flush().expect("flush");
        assert_eq!(captured(), vec!["thi\n"]);
        sink.flush().expect("flush");
        assert!(captured().is_empty());
    }

    #[test]
    fn lines_carry_the_plugin_prefix() {
        let mut out = Vec::new();
        write_line(
            &mut out,
            &Record::builder()
                .args(format_args!("window registry ready"))
                .level(log::Level::Warn)
                .build(),
        )
        .expect("format");
        assert_eq!(
            String::from_utf8(out).expect("utf8"),
            "movevr [WARN] window registry ready\n"
        );
    }
}
