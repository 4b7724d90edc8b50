mod cli;
mod config;
mod error;
mod events;
mod logging;
mod report;

use std::fs;
use std::io;
use std::process::ExitCode;
use std::thread;

use chrono::Local;
use clap::Parser;
use log::LevelFilter;
use readbatch_core::parse_accounts;
use readbatch_engine::{EngineHandle, StopHandle};
use readbatch_logging::{batch_error, batch_info, batch_warn};

use crate::cli::Args;
use crate::config::AppConfig;
use crate::error::AppError;
use crate::events::{wait_for_run, EventPrinter};
use crate::report::{write_report, ReportContext};

fn main() -> ExitCode {
    let args = Args::parse();
    let level = if args.verbose {
        LevelFilter::Debug
    } else {
        LevelFilter::Info
    };
    logging::initialize(args.log, level);

    match run(&args) {
        Ok(code) => code,
        Err(err) => {
            batch_error!("{}", err);
            eprintln!("error: {err}");
            ExitCode::FAILURE
        }
    }
}

fn run(args: &Args) -> Result<ExitCode, AppError> {
    let mut config = AppConfig::load(args.config.as_deref())?;
    config.apply_args(args);
    config.validate()?;

    let raw = fs::read_to_string(&args.accounts).map_err(|source| AppError::Read {
        path: args.accounts.clone(),
        source,
    })?;
    let accounts = parse_accounts(&raw)?;
    let settings = config.run_settings();
    batch_info!(
        "{} account(s), book mode {}, api {}",
        accounts.len(),
        settings.mode.label(),
        config.api_url
    );

    let engine = EngineHandle::new(config.engine_config())?;
    stop_on_ctrl_c(engine.stop_handle());
    engine.start_run(accounts, settings);

    let mut printer = EventPrinter::new(io::stdout());
    let outcome = wait_for_run(&engine, &mut printer)?;

    let context = ReportContext {
        generated_at: Local::now(),
        api_url: &config.api_url,
        include_passwords: args.include_passwords,
    };
    let path = write_report(&config.output_dir, &context, &outcome.records)?;
    batch_info!("result report written to {:?}", path);
    println!("report: {}", path.display());

    if outcome.is_clean() {
        Ok(ExitCode::SUCCESS)
    } else {
        Ok(ExitCode::from(2))
    }
}

/// Ctrl-C acts as the stop button. Later presses are repeated stops.
fn stop_on_ctrl_c(stop: StopHandle) {
    thread::spawn(move || {
        let runtime = match tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
        {
            Ok(runtime) => runtime,
            Err(err) => {
                batch_warn!("ctrl-c handling unavailable: {}", err);
                return;
            }
        };
        runtime.block_on(async {
            while tokio::signal::ctrl_c().await.is_ok() {
                batch_warn!("ctrl-c received, stopping the run");
                eprintln!("stopping: no new accounts will start, polling halts");
                stop.stop();
            }
        });
    });
}
