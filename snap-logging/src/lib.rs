//! Logging for do-snapshot.
//!
//! Two halves: the [`LogSink`] handed to the adapter so its notices can be
//! captured without global state, and [`init_subscriber`] which builds the
//! process-wide `tracing` registry for the binary.

pub mod sink;

use std::{
    io::{self, Write},
    path::{Path, PathBuf},
};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{filter::Directive, fmt, fmt::MakeWriter, prelude::*, EnvFilter};

use snap_core::error::{Result, SnapError};

pub use sink::{LogSink, MemorySink, TracingSink};

// --- Custom "Tee" Writer ---
struct Tee<A, B> {
    a: A,
    b: B,
}

impl<A, B> Write for Tee<A, B>
where
    A: Write,
    B: Write,
{
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        let res_a = self.a.write(buf);
        let res_b = self.b.write(buf);
        res_a.or(res_b)
    }

    fn flush(&mut self) -> io::Result<()> {
        self.a.flush()?;
        self.b.flush()
    }
}

#[derive(Clone)]
struct MakeTee<A, B> {
    make_a: A,
    make_b: B,
}

impl<'a, A, B, W1, W2> MakeWriter<'a> for MakeTee<A, B>
where
    A: MakeWriter<'a, Writer = W1>,
    B: MakeWriter<'a, Writer = W2>,
    W1: Write + 'a,
    W2: Write + 'a,
{
    type Writer = Tee<W1, W2>;
    fn make_writer(&'a self) -> Self::Writer {
        Tee {
            a: self.make_a.make_writer(),
            b: self.make_b.make_writer(),
        }
    }
}

/// Where and how the binary writes its log.
#[derive(Debug, Clone)]
pub struct LogOptions {
    /// Default filter when `RUST_LOG` is unset ("info", "debug", ...).
    pub level: String,
    pub console: bool,
    pub file: Option<PathBuf>,
    pub json: bool,
}

impl Default for LogOptions {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            console: true,
            file: None,
            json: std::env::var("LOG_FORMAT").is_ok_and(|f| f == "json"),
        }
    }
}

impl LogOptions {
    /// Level implied by the `--trace` / `--quiet` switches.
    pub fn level_for(trace: bool, quiet: bool) -> &'static str {
        match (trace, quiet) {
            (true, _) => "debug",
            (false, true) => "error",
            (false, false) => "info",
        }
    }
}

/// Filter from `RUST_LOG`, falling back to `default_level`. HTTP internals
/// are capped at warn either way.
pub fn build_filter(default_level: &str) -> Result<EnvFilter> {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    ["hyper=warn", "reqwest=warn", "rustls=warn"]
        .into_iter()
        .try_fold(filter, |filter, directive| {
            directive
                .parse::<Directive>()
                .map(|d| filter.add_directive(d))
                .map_err(|e| SnapError::config(format!("Invalid log directive {directive}: {e}")))
        })
}

fn install<W>(writer: W, options: &LogOptions, ansi: bool) -> Result<()>
where
    W: for<'w> MakeWriter<'w> + Send + Sync + 'static,
{
    let registry = tracing_subscriber::registry().with(build_filter(&options.level)?);
    let layer = fmt::layer()
        .with_writer(writer)
        .with_ansi(ansi)
        .with_target(false);

    let result = if options.json {
        registry.with(layer.json()).try_init()
    } else {
        registry.with(layer).try_init()
    };

    result.map_err(|e| SnapError::Internal(format!("Failed to initialize tracing: {}", e)))
}

/// Initializes the global tracing subscriber.
///
/// The returned guard must be held for the lifetime of the process when a
/// log file is configured, otherwise buffered lines are lost on exit.
pub fn init_subscriber(options: &LogOptions) -> Result<Option<WorkerGuard>> {
    let Some(log_file) = options.file.as_deref() else {
        if options.console {
            install(io::stderr, options, true)?;
        }
        return Ok(None);
    };

    let log_dir = log_file
        .parent()
        .filter(|dir| !dir.as_os_str().is_empty())
        .unwrap_or_else(|| Path::new("."));
    let log_filename = log_file
        .file_name()
        .unwrap_or("do_snapshot.log".as_ref());
    std::fs::create_dir_all(log_dir)?;

    let file_appender = tracing_appender::rolling::daily(log_dir, log_filename);
    let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);

    if options.console {
        let tee_writer = MakeTee {
            make_a: io::stderr,
            make_b: non_blocking,
        };
        install(tee_writer, options, false)?;
    } else {
        install(non_blocking, options, false)?;
    }

    Ok(Some(guard))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_level_for_switches() {
        assert_eq!(LogOptions::level_for(true, true), "debug");
        assert_eq!(LogOptions::level_for(false, true), "error");
        assert_eq!(LogOptions::level_for(false, false), "info");
    }

    #[test]
    fn test_build_filter_accepts_level() {
        let filter = build_filter("debug").expect("filter should build");
        assert!(filter.to_string().contains("hyper=warn"));
    }

    #[test]
    fn test_tee_writes_to_both() {
        let mut tee = Tee {
            a: Vec::new(),
            b: Vec::new(),
        };
        tee.write_all(b"snapshot").unwrap();
        tee.flush().unwrap();
        assert_eq!(tee.a, b"snapshot");
        assert_eq!(tee.b, b"snapshot");
    }
}
