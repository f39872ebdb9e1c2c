//! Append-only call log
//!
//! One text file per traced process, `<dir>/<prefix>_<pid>.log`, with one
//! record per line:
//!
//! ```text
//! [Image:/usr/bin/app] [Function:parse_args]
//! [Image:/usr/bin/app] [Called:parse_args]
//! ```
//!
//! `Function` lines are routines found relevant at image load, `Called` lines
//! are first observed entries. The coverage reporter reads both back.
//!
//! Components are escaped so any name survives a write and read: `\\` and `\]`
//! stand for a backslash and a bracket, `\n` and `\r` for line breaks, and
//! whitespace at either end of a component is written as `\u{..}`.

use regex::Regex;
use std::fmt;
use std::fs::{self, OpenOptions};
use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};
use std::sync::{LazyLock, Mutex, PoisonError};
use thiserror::Error;

/// Errors raised while opening or writing a call log
#[derive(Error, Debug)]
pub enum LogError {
    #[error("Failed to create log directory {path}: {source}")]
    CreateDir {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Failed to open log file {path}: {source}")]
    Open {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, LogError>;

static DEFINITION_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\[Image:((?:[^\]\\]|\\.)*)\] \[Function:((?:[^\]\\]|\\.)*)\]")
        .expect("definition pattern is valid")
});

static CALL_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\[Image:((?:[^\]\\]|\\.)*)\] \[Called:((?:[^\]\\]|\\.)*)\]")
        .expect("call pattern is valid")
});

fn escape_component(text: &str) -> String {
    let last = text.chars().count().saturating_sub(1);
    let mut out = String::with_capacity(text.len());
    for (i, c) in text.chars().enumerate() {
        match c {
            '\\' => out.push_str("\\\\"),
            ']' => out.push_str("\\]"),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            // Trimming on read must not eat edge whitespace
            c if c.is_whitespace() && (i == 0 || i == last) => out.extend(c.escape_unicode()),
            c => out.push(c),
        }
    }
    out
}

/// Undo [`escape_component`], `None` on a malformed escape
fn unescape_component(raw: &str) -> Option<String> {
    let mut out = String::with_capacity(raw.len());
    let mut chars = raw.chars();
    while let Some(c) = chars.next() {
        if c != '\\' {
            out.push(c);
            continue;
        }
        match chars.next()? {
            '\\' => out.push('\\'),
            ']' => out.push(']'),
            'n' => out.push('\n'),
            'r' => out.push('\r'),
            'u' => {
                if chars.next()? != '{' {
                    return None;
                }
                let mut hex = String::new();
                loop {
                    match chars.next()? {
                        '}' => break,
                        d => hex.push(d),
                    }
                }
                let code = u32::from_str_radix(&hex, 16).ok()?;
                out.push(char::from_u32(code)?);
            }
            _ => return None,
        }
    }
    Some(out)
}

/// A single call log line
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LogRecord {
    /// A relevant routine discovered when its image loaded
    Definition { image: String, function: String },
    /// First observed entry into a routine
    Call { image: String, function: String },
}

impl LogRecord {
    pub fn definition(image: &str, function: &str) -> Self {
        LogRecord::Definition {
            image: image.to_string(),
            function: function.to_string(),
        }
    }

    pub fn call(image: &str, function: &str) -> Self {
        LogRecord::Call {
            image: image.to_string(),
            function: function.to_string(),
        }
    }

    pub fn image(&self) -> &str {
        match self {
            LogRecord::Definition { image, .. } | LogRecord::Call { image, .. } => image,
        }
    }

    pub fn function(&self) -> &str {
        match self {
            LogRecord::Definition { function, .. } | LogRecord::Call { function, .. } => function,
        }
    }

    /// Parse a log line, returning `None` for anything that is not a record
    ///
    /// Both components are trimmed and unescaped; a record with an empty
    /// component or a malformed escape is dropped.
    pub fn parse(line: &str) -> Option<Self> {
        let (caps, is_definition) = match DEFINITION_RE.captures(line) {
            Some(caps) => (caps, true),
            None => (CALL_RE.captures(line)?, false),
        };

        let image = caps.get(1)?.as_str().trim();
        let function = caps.get(2)?.as_str().trim();
        if image.is_empty() || function.is_empty() {
            return None;
        }
        let image = unescape_component(image)?;
        let function = unescape_component(function)?;

        Some(if is_definition {
            Self::Definition { image, function }
        } else {
            Self::Call { image, function }
        })
    }
}

impl fmt::Display for LogRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LogRecord::Definition { image, function } => {
                write!(
                    f,
                    "[Image:{}] [Function:{}]",
                    escape_component(image),
                    escape_component(function)
                )
            }
            LogRecord::Call { image, function } => {
                write!(
                    f,
                    "[Image:{}] [Called:{}]",
                    escape_component(image),
                    escape_component(function)
                )
            }
        }
    }
}

/// Build the log path for a process: `<dir>/<prefix>_<pid>.log`
pub fn log_path(dir: &Path, prefix: &str, pid: u32) -> PathBuf {
    dir.join(format!("{}_{}.log", prefix, pid))
}

/// Thread-safe line sink
///
/// Each record is written and terminated under one lock, so lines from
/// concurrent threads never interleave.
pub struct CallLog {
    writer: Mutex<BufWriter<Box<dyn Write + Send>>>,
    path: Option<PathBuf>,
}

impl fmt::Debug for CallLog {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CallLog").field("path", &self.path).finish()
    }
}

impl CallLog {
    /// Open (append) the log file for `pid`, creating `dir` if needed
    pub fn open(dir: &Path, prefix: &str, pid: u32) -> Result<Self> {
        fs::create_dir_all(dir).map_err(|source| LogError::CreateDir {
            path: dir.to_path_buf(),
            source,
        })?;

        let path = log_path(dir, prefix, pid);
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)
            .map_err(|source| LogError::Open {
                path: path.clone(),
                source,
            })?;

        tracing::debug!("call log opened at {}", path.display());
        Ok(Self::with_path(file, Some(path)))
    }

    /// Wrap an arbitrary writer (stdout, an in-memory buffer, a pipe)
    pub fn from_writer<W: Write + Send + 'static>(writer: W) -> Self {
        Self::with_path(writer, None)
    }

    fn with_path<W: Write + Send + 'static>(writer: W, path: Option<PathBuf>) -> Self {
        let writer: Box<dyn Write + Send> = Box::new(writer);
        Self {
            writer: Mutex::new(BufWriter::new(writer)),
            path,
        }
    }

    /// Path of the backing file, if file-backed
    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    /// Append one record
    pub fn write(&self, record: &LogRecord) -> Result<()> {
        let mut writer = self.writer.lock().unwrap_or_else(PoisonError::into_inner);
        writeln!(writer, "{}", record)?;
        Ok(())
    }

    pub fn flush(&self) -> Result<()> {
        self.writer
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .flush()?;
        Ok(())
    }

    /// Close the sink, discarding buffered lines instead of flushing them
    ///
    /// After a fork the child holds a copy of the parent's buffer. Those lines
    /// are still pending in the parent, so the child must not write them.
    pub fn abandon(self) {
        let inherited = {
            let mut writer = self.writer.lock().unwrap_or_else(PoisonError::into_inner);
            let sink: Box<dyn Write + Send> = Box::new(io::sink());
            std::mem::replace(&mut *writer, BufWriter::new(sink))
        };
        let (_, buffered) = inherited.into_parts();
        tracing::debug!(
            "abandoned call log {:?} with {} buffered bytes",
            self.path,
            buffered.map(|b| b.len()).unwrap_or(0)
        );
    }
}

impl Drop for CallLog {
    fn drop(&mut self) {
        if let Err(e) = self.flush() {
            tracing::warn!("failed to flush call log on drop: {}", e);
        }
    }
}

/// Read a whole log file into records, skipping non-record lines
pub fn read_records(path: &Path) -> std::io::Result<Vec<LogRecord>> {
    let content = fs::read_to_string(path)?;
    Ok(content.lines().filter_map(LogRecord::parse).collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use tempfile::TempDir;

    /// Writer that shares its buffer so tests can inspect output
    #[derive(Clone, Default)]
    struct SharedBuf(Arc<Mutex<Vec<u8>>>);

    impl Write for SharedBuf {
        fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
            self.0.lock().unwrap().extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> std::io::Result<()> {
            Ok(())
        }
    }

    #[test]
    fn test_record_display() {
        assert_eq!(
            LogRecord::definition("prog", "foo").to_string(),
            "[Image:prog] [Function:foo]"
        );
        assert_eq!(
            LogRecord::call("prog", "foo").to_string(),
            "[Image:prog] [Called:foo]"
        );
    }

    #[test]
    fn test_parse_definition_and_call() {
        assert_eq!(
            LogRecord::parse("[Image:prog] [Function:bar]"),
            Some(LogRecord::definition("prog", "bar"))
        );
        assert_eq!(
            LogRecord::parse("[Image:/lib/libc.so.6] [Called:memcpy]"),
            Some(LogRecord::call("/lib/libc.so.6", "memcpy"))
        );
    }

    #[test]
    fn test_parse_trims_components() {
        assert_eq!(
            LogRecord::parse("[Image: prog ] [Called: foo ]"),
            Some(LogRecord::call("prog", "foo"))
        );
    }

    #[test]
    fn test_parse_rejects_empty_components() {
        assert_eq!(LogRecord::parse("[Image:] [Called:foo]"), None);
        assert_eq!(LogRecord::parse("[Image:prog] [Function:  ]"), None);
    }

    #[test]
    fn test_parse_ignores_noise() {
        assert_eq!(LogRecord::parse(""), None);
        assert_eq!(LogRecord::parse("Pin: tool started"), None);
        assert_eq!(LogRecord::parse("[Image:prog]"), None);
    }

    #[test]
    fn test_parse_with_leading_text() {
        assert_eq!(
            LogRecord::parse("12:00:01 [Image:prog] [Called:foo]"),
            Some(LogRecord::call("prog", "foo"))
        );
    }

    #[test]
    fn test_bracket_in_name_round_trips() {
        let record = LogRecord::call("prog", "f]x");
        assert_eq!(record.to_string(), r"[Image:prog] [Called:f\]x]");
        assert_eq!(LogRecord::parse(&record.to_string()), Some(record));
    }

    #[test]
    fn test_newline_in_name_stays_on_one_line() {
        let record = LogRecord::call("prog", "x]\n[Image:evil] [Called:forged");
        let line = record.to_string();
        assert_eq!(line.lines().count(), 1);
        assert_eq!(LogRecord::parse(&line), Some(record));
    }

    #[test]
    fn test_edge_whitespace_and_backslash_round_trip() {
        for record in [
            LogRecord::definition(" padded ", "tab\t"),
            LogRecord::call("C:\\bin\\app.exe", "\\"),
            LogRecord::call("img", "\r\n"),
            LogRecord::definition("img", "operator new(unsigned long)"),
        ] {
            assert_eq!(LogRecord::parse(&record.to_string()), Some(record));
        }
    }

    #[test]
    fn test_parse_rejects_malformed_escapes() {
        assert_eq!(LogRecord::parse(r"[Image:prog] [Called:a\q]"), None);
        assert_eq!(LogRecord::parse(r"[Image:prog] [Called:a\u{zz}]"), None);
        assert_eq!(LogRecord::parse(r"[Image:prog] [Called:a\u{d800}]"), None);
    }

    #[test]
    fn test_abandon_discards_buffered_lines() {
        let buf = SharedBuf::default();
        let log = CallLog::from_writer(buf.clone());
        log.write(&LogRecord::call("img", "pending")).unwrap();
        log.abandon();

        assert!(buf.0.lock().unwrap().is_empty());
    }

    #[test]
    fn test_drop_flushes_buffered_lines() {
        let buf = SharedBuf::default();
        {
            let log = CallLog::from_writer(buf.clone());
            log.write(&LogRecord::call("img", "pending")).unwrap();
        }
        let out = String::from_utf8(buf.0.lock().unwrap().clone()).unwrap();
        assert_eq!(out, "[Image:img] [Called:pending]\n");
    }

    #[test]
    fn test_accessors() {
        let record = LogRecord::call("img", "f");
        assert_eq!(record.image(), "img");
        assert_eq!(record.function(), "f");
    }

    #[test]
    fn test_log_path() {
        let path = log_path(Path::new("/var/log/calls"), "callsift", 4242);
        assert_eq!(path, PathBuf::from("/var/log/calls/callsift_4242.log"));
    }

    #[test]
    fn test_writer_backed_log() {
        let buf = SharedBuf::default();
        let log = CallLog::from_writer(buf.clone());
        assert!(log.path().is_none());

        log.write(&LogRecord::definition("img", "a")).unwrap();
        log.write(&LogRecord::call("img", "a")).unwrap();
        log.flush().unwrap();

        let out = String::from_utf8(buf.0.lock().unwrap().clone()).unwrap();
        assert_eq!(out, "[Image:img] [Function:a]\n[Image:img] [Called:a]\n");
    }

    #[test]
    fn test_open_creates_dir_and_appends() {
        let tmp = TempDir::new().unwrap();
        let dir = tmp.path().join("nested").join("logs");

        {
            let log = CallLog::open(&dir, "trace", 7).unwrap();
            assert_eq!(log.path(), Some(dir.join("trace_7.log").as_path()));
            log.write(&LogRecord::call("img", "first")).unwrap();
        }
        {
            let log = CallLog::open(&dir, "trace", 7).unwrap();
            log.write(&LogRecord::call("img", "second")).unwrap();
        }

        let records = read_records(&dir.join("trace_7.log")).unwrap();
        assert_eq!(
            records,
            vec![
                LogRecord::call("img", "first"),
                LogRecord::call("img", "second")
            ]
        );
    }

    #[test]
    fn test_open_fails_when_dir_is_a_file() {
        let tmp = TempDir::new().unwrap();
        let blocker = tmp.path().join("blocker");
        fs::write(&blocker, "x").unwrap();

        let err = CallLog::open(&blocker, "trace", 1).unwrap_err();
        assert!(err.to_string().contains("blocker"));
    }

    #[test]
    fn test_concurrent_writes_do_not_interleave() {
        let buf = SharedBuf::default();
        let log = Arc::new(CallLog::from_writer(buf.clone()));

        let handles: Vec<_> = (0..8)
            .map(|t| {
                let log = Arc::clone(&log);
                std::thread::spawn(move || {
                    for i in 0..50 {
                        let func = format!("t{}_f{}", t, i);
                        log.write(&LogRecord::call("img", &func)).unwrap();
                    }
                })
            })
            .collect();
        for h in handles {
            h.join().unwrap();
        }
        log.flush().unwrap();

        let out = String::from_utf8(buf.0.lock().unwrap().clone()).unwrap();
        let lines: Vec<_> = out.lines().collect();
        assert_eq!(lines.len(), 400);
        assert!(lines.iter().all(|l| LogRecord::parse(l).is_some()));
    }
}
