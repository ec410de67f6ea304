// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

use std::sync::mpsc;
use std::sync::{Arc, Barrier};
use std::thread;
use std::time::{Duration, Instant};

use serde_yaml::Mapping;

use crate::backends::stub::{Event, EventLog, RecordingProcessor};
use crate::backends::ProcessorKind;
use crate::errors::{ConfigError, SessionError, SubmitError};
use crate::session::{ExitStatus, ProcessorResolver, RunState, Session};
use crate::traits::{ProcessorId, TaskRun, TaskSpec};

const RECORDING: &str = "test.Recording";

fn mapping(yaml: &str) -> Mapping {
    serde_yaml::from_str(yaml).unwrap()
}

/// A session whose default processor type records every lifecycle call.
fn recording_session(extra_task_yaml: &str) -> (Session, EventLog) {
    let events = EventLog::default();
    let mut resolver = ProcessorResolver::new();
    resolver.register(RECORDING, RecordingProcessor::factory(Arc::clone(&events)));

    let yaml = format!(
        "poolSize: 2\ntask:\n  processor: {}\n{}",
        RECORDING, extra_task_yaml
    );
    let session = Session::with_resolver(Some(mapping(&yaml)), resolver).unwrap();
    (session, events)
}

#[test]
fn test_absent_config_is_rejected() {
    let err = Session::new(None).unwrap_err();
    assert!(matches!(err, SessionError::Config(ConfigError::Missing)));
}

#[test]
fn test_missing_sections_default_to_empty() {
    let session = Session::new(Some(Mapping::new())).unwrap();

    assert!(session.config().task().is_empty());
    assert!(session.config().env().is_empty());
    assert_eq!(
        session.default_processor_type().kind(),
        Some(ProcessorKind::Local)
    );
    assert_eq!(session.state(), RunState::Running);
    assert!(!session.is_aborted());
}

#[test]
fn test_await_on_fresh_session_returns() {
    let session = Session::new(Some(Mapping::new())).unwrap();
    session.await_completion();
    assert_eq!(session.task_count(), 0);
}

#[test]
fn test_pool_size_and_identity_from_config() {
    let session = Session::new(Some(mapping(
        "poolSize: 3\nsession:\n  uniqueId: 4f7c9a52-1d2e-4c3b-9a8f-0e6d5b4a3c21\n",
    )))
    .unwrap();

    assert_eq!(session.pool_size(), 3);
    assert_eq!(
        session.run_id().to_string(),
        "4f7c9a52-1d2e-4c3b-9a8f-0e6d5b4a3c21"
    );
}

#[test]
fn test_generated_identities_differ() {
    let a = Session::new(Some(Mapping::new())).unwrap();
    let b = Session::new(Some(Mapping::new())).unwrap();
    assert_ne!(a.run_id(), b.run_id());
    assert!(a.pool_size() >= 1);
}

#[test]
fn test_invalid_construction_input() {
    for yaml in [
        "poolSize: 0\n",
        "poolSize: -2\n",
        "poolSize: lots\n",
        "session.uniqueId: not-a-uuid\n",
        "task: [a, b]\n",
    ] {
        let err = Session::new(Some(mapping(yaml))).unwrap_err();
        assert!(matches!(err, SessionError::Config(_)), "{}: {:?}", yaml, err);
    }
}

#[test]
fn test_unknown_default_processor_fails_construction() {
    let err = Session::new(Some(mapping("task:\n  processor: bogus.Type\n"))).unwrap_err();
    match err {
        SessionError::ProcessorType(not_found) => assert_eq!(not_found.name, "bogus.Type"),
        other => panic!("unexpected error: {:?}", other),
    }
}

#[test]
fn test_registry_and_ledger_keep_creation_order() {
    let (session, _events) = recording_session("");

    let processors: Vec<_> = (0..3)
        .map(|_| session.create_processor(None, false).unwrap())
        .collect();
    let ids: Vec<_> = session.processors().iter().map(|p| p.id()).collect();
    assert_eq!(ids, vec![ProcessorId(0), ProcessorId(1), ProcessorId(2)]);

    for processor in &processors {
        for task in ["first", "second"] {
            processor
                .submit(TaskSpec::new(format!("{}-{}", processor.id(), task), "true"))
                .unwrap();
        }
    }
    session.await_completion();

    let ledger = session.task_ledger();
    assert_eq!(ledger.len(), 3);
    let flattened: Vec<(ProcessorId, String)> = ledger
        .iter()
        .flat_map(|(id, runs)| runs.iter().map(move |run| (*id, run.name.clone())))
        .collect();
    assert_eq!(
        flattened,
        vec![
            (ProcessorId(0), "#0-first".to_string()),
            (ProcessorId(0), "#0-second".to_string()),
            (ProcessorId(1), "#1-first".to_string()),
            (ProcessorId(1), "#1-second".to_string()),
            (ProcessorId(2), "#2-first".to_string()),
            (ProcessorId(2), "#2-second".to_string()),
        ]
    );
    assert_eq!(session.task_count(), 6);

    assert_eq!(session.terminate().unwrap(), ExitStatus::Terminated);
}

#[test]
fn test_concurrent_creation_assigns_dense_ids() {
    let (session, _events) = recording_session("");
    let session = Arc::new(session);

    let handles: Vec<_> = (0..8)
        .map(|_| {
            let session = Arc::clone(&session);
            thread::spawn(move || session.create_processor(None, false).unwrap().id())
        })
        .collect();
    let mut ids: Vec<_> = handles.into_iter().map(|h| h.join().unwrap()).collect();
    ids.sort();

    assert_eq!(ids, (0..8).map(ProcessorId).collect::<Vec<_>>());
    session.terminate().unwrap();
}

#[test]
fn test_task_section_is_injected_and_mismatches_are_tolerated() {
    let (session, _events) = recording_session("  queue: short\n  memory: 4\n  extra: ignored\n");

    session.create_processor(None, false).unwrap();

    let report = session.report();
    let injection = &report.processors[0].injection;
    assert_eq!(injection.applied, vec!["queue"]);
    assert_eq!(injection.ignored, vec!["extra"]);
    assert_eq!(injection.failures.len(), 1);
    assert_eq!(injection.failures[0].key, "memory");
    assert_eq!(injection.failures[0].value_type, "integer");
}

#[test]
fn test_record_task_for_unknown_processor_fails() {
    let (session, _events) = recording_session("");
    session.create_processor(None, false).unwrap();

    let stray = TaskRun {
        id: session.context().next_task_id(),
        processor: ProcessorId(5),
        name: "stray".to_string(),
        command: "true".to_string(),
    };
    let err = session.record_task(ProcessorId(5), stray).unwrap_err();
    assert!(matches!(err, SessionError::UnknownProcessor(ProcessorId(5))));
    assert_eq!(session.task_count(), 0);
}

#[test]
fn test_record_task_rejects_run_claiming_another_processor() {
    let (session, _events) = recording_session("");
    session.create_processor(None, false).unwrap();

    let misfiled = TaskRun {
        id: session.context().next_task_id(),
        processor: ProcessorId(7),
        name: "misfiled".to_string(),
        command: "true".to_string(),
    };
    let err = session.record_task(ProcessorId(0), misfiled).unwrap_err();
    assert!(matches!(
        err,
        SessionError::ProcessorMismatch {
            processor: ProcessorId(0),
            claimed: ProcessorId(7)
        }
    ));
    assert_eq!(session.task_count(), 0);
    assert!(session.task_ledger().is_empty());
}

#[test]
fn test_concurrent_recording_keeps_per_processor_order() {
    const TASKS_PER_THREAD: usize = 50;

    let (session, _events) = recording_session("");
    let processors: Vec<_> = (0..4)
        .map(|_| session.create_processor(None, false).unwrap())
        .collect();

    let handles: Vec<_> = processors
        .iter()
        .map(|processor| {
            let processor = Arc::clone(processor);
            thread::spawn(move || {
                for i in 0..TASKS_PER_THREAD {
                    processor
                        .submit(TaskSpec::new(format!("{}-{}", processor.id(), i), "true"))
                        .unwrap();
                }
            })
        })
        .collect();
    for handle in handles {
        handle.join().unwrap();
    }
    session.await_completion();

    let ledger = session.task_ledger();
    assert_eq!(ledger.len(), processors.len());
    for (id, runs) in &ledger {
        let names: Vec<_> = runs.iter().map(|run| run.name.clone()).collect();
        let expected: Vec<_> = (0..TASKS_PER_THREAD)
            .map(|i| format!("{}-{}", id, i))
            .collect();
        assert_eq!(names, expected, "ledger order for {}", id);
        assert!(runs.iter().all(|run| run.processor == *id));
    }
    assert_eq!(session.task_count(), processors.len() * TASKS_PER_THREAD);

    session.terminate().unwrap();
}

#[test]
fn test_abort_flag_is_visible_inside_terminate_hooks() {
    let (session, events) = recording_session("");
    session.create_processor(None, false).unwrap();
    session.create_processor(None, true).unwrap();

    assert_eq!(session.abort().unwrap(), ExitStatus::Aborted);
    assert_eq!(ExitStatus::Aborted.code(), Some(10));
    assert!(session.is_aborted());
    assert_eq!(session.state(), RunState::Aborted);

    assert_eq!(
        *events.lock(),
        vec![
            Event::Terminated {
                processor: ProcessorId(0),
                saw_aborted: true
            },
            Event::Terminated {
                processor: ProcessorId(1),
                saw_aborted: true
            },
        ]
    );
}

#[test]
fn test_every_concurrent_abort_sees_the_flag() {
    let (session, _events) = recording_session("");
    session.create_processor(None, false).unwrap();
    let session = Arc::new(session);
    let start = Arc::new(Barrier::new(8));

    let handles: Vec<_> = (0..8)
        .map(|_| {
            let session = Arc::clone(&session);
            let start = Arc::clone(&start);
            thread::spawn(move || {
                start.wait();
                let status = session.abort().unwrap();
                (status, session.is_aborted())
            })
        })
        .collect();

    for handle in handles {
        assert_eq!(handle.join().unwrap(), (ExitStatus::Aborted, true));
    }
    assert_eq!(session.state(), RunState::Aborted);
}

#[test]
fn test_lifecycle_transitions() {
    let (session, _events) = recording_session("");
    assert_eq!(session.abort().unwrap(), ExitStatus::Aborted);
    // Idempotent
    assert_eq!(session.abort().unwrap(), ExitStatus::Aborted);
    assert!(matches!(
        session.terminate().unwrap_err(),
        SessionError::InvalidTransition {
            from: RunState::Aborted,
            to: RunState::Terminated
        }
    ));

    let (session, _events) = recording_session("");
    assert_eq!(session.terminate().unwrap(), ExitStatus::Terminated);
    assert!(matches!(
        session.terminate().unwrap_err(),
        SessionError::InvalidTransition {
            from: RunState::Terminated,
            to: RunState::Terminated
        }
    ));
    assert!(matches!(
        session.abort().unwrap_err(),
        SessionError::InvalidTransition {
            from: RunState::Terminated,
            to: RunState::Aborted
        }
    ));
    assert!(!session.is_aborted());
    assert!(matches!(
        session.create_processor(None, false).unwrap_err(),
        SessionError::NotRunning(RunState::Terminated)
    ));
}

#[test]
fn test_conclude_follows_the_run() {
    let (session, _events) = recording_session("");
    assert_eq!(session.conclude().unwrap(), ExitStatus::Terminated);
    assert!(matches!(
        session.conclude().unwrap_err(),
        SessionError::InvalidTransition {
            from: RunState::Terminated,
            to: RunState::Terminated
        }
    ));

    // An abort that lands before the caller gets to terminate wins
    let (session, _events) = recording_session("");
    session.create_processor(None, false).unwrap();
    session.abort().unwrap();
    assert_eq!(session.conclude().unwrap(), ExitStatus::Aborted);
    assert_eq!(session.conclude().unwrap().code(), Some(10));
    assert_eq!(session.state(), RunState::Aborted);
}

#[test]
fn test_bound_processors_are_told_first_and_joined_last() {
    let (session, events) = recording_session("");
    session.create_processor(None, true).unwrap();
    session.create_processor(None, false).unwrap();
    session.create_processor(None, false).unwrap();

    session.terminate().unwrap();

    assert_eq!(
        *events.lock(),
        vec![
            Event::SessionTerminating(ProcessorId(0)),
            Event::Joined(ProcessorId(1)),
            Event::Joined(ProcessorId(2)),
            Event::Joined(ProcessorId(0)),
        ]
    );
}

#[test]
fn test_unknown_processor_name_leaves_session_usable() {
    let session = Session::new(Some(Mapping::new())).unwrap();

    let err = session
        .create_processor_of("bogus.Type", None, false)
        .unwrap_err();
    assert!(matches!(err, SessionError::ProcessorType(ref e) if e.name == "bogus.Type"));

    let nope = session.create_processor_of("NOPE", None, false).unwrap();
    assert_eq!(nope.id(), ProcessorId(0));
    assert_eq!(nope.type_name(), "nope");
    nope.submit(TaskSpec::new("noop", "true")).unwrap();
    session.await_completion();
    session.terminate().unwrap();
}

#[test]
fn test_submit_after_abort_is_rejected() {
    let (session, _events) = recording_session("");
    let processor = session.create_processor(None, false).unwrap();
    session.abort().unwrap();

    let err = processor.submit(TaskSpec::new("late", "true")).unwrap_err();
    assert!(matches!(err, SubmitError::SessionAborted));
    assert_eq!(session.task_count(), 0);
}

#[test]
fn test_terminate_from_inside_a_runtime_is_refused() {
    let (session, _events) = recording_session("");
    let session = Arc::new(session);

    let inner = Arc::clone(&session);
    let result = session
        .handle()
        .block_on(async move { inner.terminate() });
    assert!(matches!(result, Err(SessionError::TerminateFromWorker)));
    assert_eq!(session.state(), RunState::Running);
}

#[test]
fn test_local_tasks_run_before_await_returns() {
    let dir = tempfile::tempdir().unwrap();
    let session = Session::new(Some(mapping(
        "task:\n  processor: local\nenv:\n  MARKER: done\n",
    )))
    .unwrap();
    let local = session.create_processor(None, false).unwrap();

    for name in ["a", "b", "c"] {
        let target = dir.path().join(name);
        local
            .submit(TaskSpec::new(
                name,
                format!("sleep 0.1 && echo \"$MARKER\" > '{}'", target.display()),
            ))
            .unwrap();
    }
    session.await_completion();

    for name in ["a", "b", "c"] {
        let written = std::fs::read_to_string(dir.path().join(name)).unwrap();
        assert_eq!(written.trim(), "done");
    }
    assert_eq!(session.context().latch().outstanding(), 0);
    assert_eq!(session.terminate().unwrap(), ExitStatus::Terminated);

    let report = session.report();
    assert_eq!(report.state, RunState::Terminated);
    assert_eq!(report.task_count, 3);
}

#[test]
fn test_abort_cancels_long_running_local_task() {
    let session = Arc::new(Session::new(Some(Mapping::new())).unwrap());
    let local = session.create_processor(None, false).unwrap();
    local.submit(TaskSpec::new("long", "sleep 30")).unwrap();

    let started = Instant::now();
    assert_eq!(session.abort().unwrap(), ExitStatus::Aborted);

    let (tx, rx) = mpsc::channel();
    let waiter = {
        let session = Arc::clone(&session);
        thread::spawn(move || {
            session.await_completion();
            tx.send(()).unwrap();
        })
    };
    rx.recv_timeout(Duration::from_secs(10))
        .expect("aborted task still outstanding");
    waiter.join().unwrap();

    assert!(started.elapsed() < Duration::from_secs(10));
    assert_eq!(session.task_count(), 1);
}
