use cfg_if::cfg_if;
use tracing_subscriber::{layer::SubscriberExt, EnvFilter};
use tracing_subscriber::util::SubscriberInitExt;

/// Per-frame controller decisions (mode switches, presses, toggles) at debug;
/// wgpu is chatty at info level.
const DEFAULT_FILTER: &str = "info,walkthrough::controller=debug,wgpu_core=warn,wgpu_hal=warn,naga=warn";

/// `RUST_LOG` when set and valid, otherwise `DEFAULT_FILTER`.
fn env_filter() -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER))
}

cfg_if! {
    if #[cfg(target_arch = "wasm32")] {
        pub fn init() {
            let wasm_layer = tracing_wasm::WASMLayer::new(tracing_wasm::WASMLayerConfig::default());

            tracing_subscriber::registry()
                .with(env_filter())
                .with(wasm_layer)
                .init();

            #[cfg(feature = "console_error_panic_hook")]
            console_error_panic_hook::set_once();
            tracing::info!("browser logging ready");
        }
    } else {
        use std::ffi::OsString;
        use std::io;
        use std::panic::PanicHookInfo;
        use std::path::{Path, PathBuf};

        use once_cell::sync::OnceCell;
        use tracing_appender::non_blocking::WorkerGuard;
        use tracing_subscriber::fmt;

        static FILE_GUARD: OnceCell<WorkerGuard> = OnceCell::new();

        const DEFAULT_LOG_FILE: &str = "logs/walkthrough.log";

        /// Split a log path into the directory and file prefix the daily roller wants.
        fn log_file_location(path: &str) -> (PathBuf, OsString) {
            let path = Path::new(path);
            let dir = match path.parent() {
                Some(dir) if !dir.as_os_str().is_empty() => dir.to_path_buf(),
                _ => PathBuf::from("."),
            };
            let file = path.file_name().map(OsString::from).unwrap_or_else(|| OsString::from("walkthrough.log"));
            (dir, file)
        }

        fn panic_message(info: &PanicHookInfo<'_>) -> String {
            let payload = info
                .payload()
                .downcast_ref::<&str>()
                .copied()
                .or_else(|| info.payload().downcast_ref::<String>().map(String::as_str))
                .unwrap_or("<non-string panic>");
            match info.location() {
                Some(loc) => format!("panic at {}:{}:{} {payload}", loc.file(), loc.line(), loc.column()),
                None => format!("panic {payload}"),
            }
        }

        /// stderr plus a daily rolling file (`RUST_LOG_FILE`, default `logs/walkthrough.log`).
        /// The file writer's guard lives for the rest of the process.
        pub fn init() {
            let console_layer = fmt::layer()
                .with_writer(io::stderr)
                .with_target(true)
                .with_file(true)
                .with_line_number(true)
                .compact();

            let requested = std::env::var("RUST_LOG_FILE").unwrap_or_else(|_| DEFAULT_LOG_FILE.to_string());
            let (dir, file) = log_file_location(&requested);
            let (writer, guard) = tracing_appender::non_blocking(tracing_appender::rolling::daily(&dir, &file));
            let _ = FILE_GUARD.set(guard);

            let file_layer = fmt::layer()
                .with_writer(writer)
                .with_ansi(false)
                .with_target(true)
                .with_file(true)
                .with_line_number(true)
                .compact();

            tracing_subscriber::registry()
                .with(env_filter())
                .with(console_layer)
                .with(file_layer)
                .init();

            std::panic::set_hook(Box::new(|info| {
                let backtrace = std::backtrace::Backtrace::force_capture();
                tracing::error!("{}\nBacktrace:\n{backtrace}", panic_message(info));
            }));
            tracing::info!(dir = %dir.display(), file = ?file, "logging to file");
        }

    }
}
