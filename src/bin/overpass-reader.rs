//! Standalone device reader process.
//!
//! Runs with direct access to `/dev/input` (the user must be in the
//! `input` group) and prints one JSON event per line on stdout for the
//! consuming process to parse. All diagnostics go to stderr so stdout
//! stays a clean protocol stream.

#[cfg(target_os = "linux")]
fn main() {
    use overpass::reader::{self, ReaderConfig};
    use std::io;

    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .target(env_logger::Target::Stderr)
        .init();

    let config = ReaderConfig::detected();
    let shutdown = reader::install_shutdown_flag();

    let stdout = io::stdout();
    let mut out = stdout.lock();

    if let Err(e) = reader::run(&config, &shutdown, &mut out) {
        log::error!("{e}");
        std::process::exit(1);
    }
}

#[cfg(not(target_os = "linux"))]
fn main() {
    eprintln!("overpass-reader only runs on Linux; use a native cursor probe instead");
    std::process::exit(2);
}
