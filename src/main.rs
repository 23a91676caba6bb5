//! depsort - Deterministic dependency ordering for setup pipelines

use std::process::ExitCode;

fn main() -> ExitCode {
    if let Err(e) = depsort::cli::run() {
        eprintln!("Error: {:#}", e);
        ExitCode::FAILURE
    } else {
        ExitCode::SUCCESS
    }
}
