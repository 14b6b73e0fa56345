use std::{env, process::ExitCode};

use clap::Parser;
use tracing_subscriber::EnvFilter;

use classify_rs::{
    config::{program_name, usage},
    Config, InferenceOutput,
};

fn main() -> ExitCode {
    // stdout is reserved for the JSON document.
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    let output = match Config::try_parse() {
        Ok(config) => classify_rs::run(&config),
        Err(err) => {
            tracing::debug!(kind = ?err.kind(), "argument parsing failed");
            let argv0 = env::args_os().next();
            InferenceOutput::error(usage(&program_name(argv0.as_deref())))
        }
    };

    println!("{}", output.to_json_line());
    output.exit_code()
}
