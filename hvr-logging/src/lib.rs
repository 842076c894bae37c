use std::{
    env,
    io::{self, Write},
    path::{Path, PathBuf},
};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::{
    filter::Directive, fmt::MakeWriter, prelude::*, registry, EnvFilter,
};

/// Where log lines are written
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogOutput {
    Console,
    File,
    Both,
    None,
}

impl LogOutput {
    fn parse(value: &str) -> Self {
        match value.to_ascii_lowercase().as_str() {
            "file" => LogOutput::File,
            "both" => LogOutput::Both,
            "none" | "off" => LogOutput::None,
            _ => LogOutput::Console,
        }
    }
}

/// Settings read from `HVR_LOG_*` environment variables
#[derive(Debug, Clone)]
pub struct LogSettings {
    pub level: String,
    pub output: LogOutput,
    pub json: bool,
    pub file: PathBuf,
}

impl LogSettings {
    pub fn from_env() -> Self {
        let file = env::var("HVR_LOG_FILE")
            .map(PathBuf::from)
            .ok()
            .or_else(|| hvr_core::paths::default_log_file().ok())
            .unwrap_or_else(|| env::temp_dir().join("hvr.log"));

        Self {
            level: env::var("HVR_LOG_LEVEL").unwrap_or_else(|_| "info".to_string()),
            output: LogOutput::parse(&env::var("HVR_LOG_OUTPUT").unwrap_or_default()),
            json: env::var("HVR_LOG_FORMAT").is_ok_and(|f| f.eq_ignore_ascii_case("json")),
            file,
        }
    }
}

// Writes every buffer to both sinks; succeeds if either one does.
struct Tee<A, B> {
    a: A,
    b: B,
}

impl<A: Write, B: Write> Write for Tee<A, B> {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        let res_a = self.a.write_all(buf).map(|_| buf.len());
        let res_b = self.b.write_all(buf).map(|_| buf.len());
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

impl<'a, A, B> MakeWriter<'a> for MakeTee<A, B>
where
    A: MakeWriter<'a>,
    B: MakeWriter<'a>,
{
    type Writer = Tee<A::Writer, B::Writer>;

    fn make_writer(&'a self) -> Self::Writer {
        Tee {
            a: self.make_a.make_writer(),
            b: self.make_b.make_writer(),
        }
    }
}

fn build_filter(level: &str) -> EnvFilter {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(level))
        .unwrap_or_else(|_| EnvFilter::new("info"));

    ["hyper=warn", "hyper_util=warn", "reqwest=warn", "rustls=warn"]
        .iter()
        .filter_map(|directive| directive.parse::<Directive>().ok())
        .fold(filter, |filter, directive| filter.add_directive(directive))
}

fn file_writer(
    path: &Path,
) -> Result<(tracing_appender::non_blocking::NonBlocking, WorkerGuard), String> {
    let dir = path.parent().unwrap_or_else(|| Path::new("."));
    let name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| "hvr.log".to_string());
    std::fs::create_dir_all(dir)
        .map_err(|e| format!("cannot create log directory {}: {}", dir.display(), e))?;
    let appender = RollingFileAppender::builder()
        .rotation(Rotation::DAILY)
        .filename_prefix(name)
        .build(dir)
        .map_err(|e| format!("cannot open log file {}: {}", path.display(), e))?;
    Ok(tracing_appender::non_blocking(appender))
}

/// Install the global subscriber described by `settings`.
///
/// The returned guard flushes the file writer on drop; hold it for the
/// lifetime of the process. An unusable log file is an error naming the path.
pub fn init_with(settings: &LogSettings) -> Result<Option<WorkerGuard>, String> {
    let subscriber = registry().with(build_filter(&settings.level));
    let mut guard = None;

    let result = match settings.output {
        LogOutput::None => return Ok(None),
        LogOutput::Console => {
            let layer = tracing_subscriber::fmt::layer().with_writer(io::stderr);
            if settings.json {
                subscriber.with(layer.json()).try_init()
            } else {
                subscriber.with(layer.compact()).try_init()
            }
        }
        LogOutput::File => {
            let (writer, file_guard) = file_writer(&settings.file)?;
            guard = Some(file_guard);
            let layer = tracing_subscriber::fmt::layer()
                .with_ansi(false)
                .with_writer(writer);
            if settings.json {
                subscriber.with(layer.json()).try_init()
            } else {
                subscriber.with(layer).try_init()
            }
        }
        LogOutput::Both => {
            let (writer, file_guard) = file_writer(&settings.file)?;
            guard = Some(file_guard);
            let tee = MakeTee {
                make_a: io::stderr,
                make_b: writer,
            };
            let layer = tracing_subscriber::fmt::layer()
                .with_ansi(false)
                .with_writer(tee);
            if settings.json {
                subscriber.with(layer.json()).try_init()
            } else {
                subscriber.with(layer).try_init()
            }
        }
    };

    result.map_err(|e| e.to_string())?;
    Ok(guard)
}
