//! Entry point: parse arguments, initialise logging, install the signal
//! handler, and hand off to the reconnect loop.

use std::process::ExitCode;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use ttx_acquire::config::Config;
use ttx_acquire::supervisor;

fn main() -> ExitCode {
    let config = match Config::from_args() {
        Ok(c) => c,
        Err(e) => {
            eprintln!("configuration error: {e}");
            return ExitCode::FAILURE;
        }
    };

    if let Err(e) = stderrlog::new()
        .module(module_path!())
        .module("ttx_acquire")
        .quiet(false)
        .verbosity(config.verbose as usize)
        .timestamp(stderrlog::Timestamp::Second)
        .init()
    {
        eprintln!("failed to initialise logging: {e}");
        return ExitCode::FAILURE;
    }

    let running = Arc::new(AtomicBool::new(true));
    {
        let running = running.clone();
        if let Err(e) = ctrlc::set_handler(move || {
            running.store(false, Ordering::Relaxed);
        }) {
            eprintln!("failed to install signal handler: {e}");
            return ExitCode::FAILURE;
        }
    }

    match supervisor::run(&config, running) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("fatal: {e}");
            ExitCode::FAILURE
        }
    }
}
