// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

use std::env;
use std::process::ExitCode;
use std::sync::Arc;
use std::time::Instant;

use anyhow::Context;
use pipeline_session::config::load_config;
use pipeline_session::errors::{SessionError, SubmitError};
use pipeline_session::observability::init_tracing;
use pipeline_session::session::{ExitStatus, ProcessorResolver, RunState, Session};
use pipeline_session::traits::{TaskProcessor, TaskSpec};

fn main() -> ExitCode {
    init_tracing("info");

    match run() {
        Ok(code) => code,
        Err(e) => {
            eprintln!("❌ {:#}", e);
            ExitCode::FAILURE
        }
    }
}

fn run() -> anyhow::Result<ExitCode> {
    let args: Vec<String> = env::args().collect();
    if args.len() < 3 {
        let program = program_name(&args);
        eprintln!("Usage: {} <config.(yaml|toml)> <command> [command ...]", program);
        eprintln!("Example: {} run.yaml \"echo hello\" \"sleep 1\"", program);
        return Ok(ExitCode::from(2));
    }

    let config_file = &args[1];
    let commands = &args[2..];
    let start_time = Instant::now();

    let config = load_config(config_file)
        .with_context(|| format!("loading configuration from {}", config_file))?;
    let session = Arc::new(
        Session::from_config(config, ProcessorResolver::new()).context("starting session")?,
    );

    println!("🚀 Session {}", session.run_id());
    println!("📋 Configuration: {}", config_file);
    println!("🔧 Processor: {}", session.default_processor_type().name());
    println!("⚙️  Pool Size: {}", session.pool_size());

    // Ctrl-C aborts; the main thread then sees the latch release
    let handle = session.handle();
    let signalled = Arc::clone(&session);
    handle.spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            eprintln!("\n🛑 Interrupted, aborting session");
            if let Err(e) = signalled.abort() {
                eprintln!("❌ {}", e);
            }
        }
    });

    let submitted = match session.create_processor(None, false) {
        Ok(processor) => submit_all(processor.as_ref(), commands)?,
        Err(SessionError::NotRunning(RunState::Aborted)) => 0,
        Err(e) => return Err(e).context("creating processor"),
    };
    if submitted < commands.len() {
        eprintln!("⚠️  Submitted {} of {} commands before the abort", submitted, commands.len());
    }

    session.await_completion();
    let status = session.conclude()?;

    println!("\n📊 Session Report:");
    println!("{}", serde_json::to_string_pretty(&session.report())?);
    println!("\n⏱️  Total Time: {:?}", start_time.elapsed());

    Ok(exit_code(status))
}

/// Submit every command as `task-N`, in order.
///
/// Stops at the first command refused because the session was aborted and
/// returns how many were submitted.
fn submit_all(processor: &dyn TaskProcessor, commands: &[String]) -> anyhow::Result<usize> {
    for (i, command) in commands.iter().enumerate() {
        match processor.submit(TaskSpec::new(format!("task-{}", i + 1), command.as_str())) {
            Ok(_) => {}
            Err(SubmitError::SessionAborted) => return Ok(i),
            Err(e) => return Err(e).with_context(|| format!("submitting '{}'", command)),
        }
    }
    Ok(commands.len())
}

fn program_name(args: &[String]) -> &str {
    args.first().map(String::as_str).unwrap_or("pipeline-session")
}

fn exit_code(status: ExitStatus) -> ExitCode {
    match status.code() {
        Some(code) => ExitCode::from(u8::try_from(code).unwrap_or(1)),
        None => ExitCode::SUCCESS,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_yaml::Mapping;

    fn commands(count: usize) -> Vec<String> {
        (0..count).map(|i| format!("echo {}", i)).collect()
    }

    #[test]
    fn test_program_name_without_argv() {
        assert_eq!(program_name(&[]), "pipeline-session");
        assert_eq!(program_name(&["/usr/bin/ps".to_string()]), "/usr/bin/ps");
    }

    #[test]
    fn test_submit_all_stops_after_abort_without_failing() {
        let session = Session::new(Some(Mapping::new())).unwrap();
        let processor = session.create_processor_of("nope", None, false).unwrap();

        assert_eq!(submit_all(processor.as_ref(), &commands(2)).unwrap(), 2);
        session.await_completion();

        session.abort().unwrap();
        assert_eq!(submit_all(processor.as_ref(), &commands(3)).unwrap(), 0);
        assert_eq!(session.conclude().unwrap(), ExitStatus::Aborted);
        assert_eq!(session.task_count(), 2);
    }

    #[test]
    fn test_submit_all_reports_other_refusals() {
        let session = Session::new(Some(Mapping::new())).unwrap();
        let processor = session.create_processor_of("nope", None, false).unwrap();
        processor.terminate();

        let err = submit_all(processor.as_ref(), &commands(1)).unwrap_err();
        assert!(err.to_string().contains("echo 0"), "{:#}", err);
        session.terminate().unwrap();
    }
}
