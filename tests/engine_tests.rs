// ABOUTME: Integration tests for the step executor and workflow runner
// ABOUTME: Tests dispatch, loop composition, fail-fast runs, waits and capability calls

use serde_json::{json, Value};
use std::time::Duration;

use stepflow::capabilities::{CellValue, ElementQuery};
use stepflow::engine::{
    ExecutionContext, ExecutionError, ExecutorSettings, StepExecutor, StepOutcome, WorkflowRunner,
};
use stepflow::parser::{Step, StepType, Workflow, WorkflowLoader};

mod common;
use common::{Event, Recorder, TestEnvironment, TestWorkflowBuilder};

fn load(description: Value) -> Workflow {
    WorkflowLoader::new().load_value(description).unwrap()
}

fn runner(recorder: &Recorder) -> WorkflowRunner {
    WorkflowRunner::new(StepExecutor::new(recorder.capabilities()))
}

async fn run_single(recorder: &Recorder, description: Value) -> Result<StepOutcome, ExecutionError> {
    let workflow = load(json!([description]));
    StepExecutor::new(recorder.capabilities())
        .execute(&workflow.steps[0])
        .await
}

#[tokio::test]
async fn test_condition_truth_tables() {
    let recorder = Recorder::new();
    let cases = [
        ("and", json!([true, true]), true),
        ("and", json!([true, false]), false),
        ("and", json!([]), true),
        ("or", json!([false, true]), true),
        ("or", json!([false, false]), false),
        ("or", json!([]), false),
    ];

    for (operator, conditions, expected) in cases {
        let outcome = run_single(
            &recorder,
            json!({"type": "condition", "payload": {"operator": operator, "conditions": conditions}}),
        )
        .await
        .unwrap();
        assert_eq!(
            outcome,
            StepOutcome::Evaluated(expected),
            "{} over {}",
            operator,
            conditions
        );
    }
}

#[tokio::test]
async fn test_condition_invalid_operator() {
    let err = run_single(
        &Recorder::new(),
        json!({"type": "condition", "payload": {"operator": "xor", "conditions": [true]}}),
    )
    .await
    .unwrap_err();

    assert!(matches!(
        err.root_cause(),
        ExecutionError::InvalidOperator { operator } if operator == "xor"
    ));
}

#[tokio::test]
async fn test_loop_runs_body_in_order() {
    let recorder = Recorder::new();
    let workflow = load(
        TestWorkflowBuilder::new()
            .repeat(json!(2), TestWorkflowBuilder::new().click().input("a"))
            .build(),
    );

    let result = runner(&recorder).run(&workflow).await.unwrap();

    assert_eq!(recorder.names(), vec!["click", "type", "click", "type"]);
    assert_eq!(result.outcome(0), Some(StepOutcome::Completed));

    let paths: Vec<String> = result.trace.iter().map(|t| t.path.clone()).collect();
    assert_eq!(
        paths,
        vec![
            "steps[0]",
            "steps[0].iter[0].steps[0]",
            "steps[0].iter[0].steps[1]",
            "steps[0].iter[1].steps[0]",
            "steps[0].iter[1].steps[1]",
        ]
    );
    assert_eq!(result.trace[3].iteration, Some(1));
}

#[tokio::test]
async fn test_loop_count_coercion() {
    let body = || TestWorkflowBuilder::new().click();
    let cases = [
        (json!(0), 0),
        (json!(-3), 0),
        (json!(null), 0),
        (json!("3"), 3),
        (json!(2.7), 2),
    ];

    for (count, expected) in cases {
        let recorder = Recorder::new();
        let workflow = load(TestWorkflowBuilder::new().repeat(count.clone(), body()).build());
        runner(&recorder).run(&workflow).await.unwrap();
        assert_eq!(recorder.events().len(), expected, "count {}", count);
    }
}

#[tokio::test]
async fn test_nested_loops_compose() {
    let recorder = Recorder::new();
    let workflow = load(
        TestWorkflowBuilder::new()
            .repeat(
                json!(2),
                TestWorkflowBuilder::new()
                    .input("outer")
                    .repeat(json!(3), TestWorkflowBuilder::new().click()),
            )
            .build(),
    );

    runner(&recorder).run(&workflow).await.unwrap();
    assert_eq!(
        recorder.names(),
        vec!["type", "click", "click", "click", "type", "click", "click", "click"]
    );
}

#[tokio::test]
async fn test_loop_failure_aborts_remaining_iterations() {
    let recorder = Recorder::new().failing_keyboard();
    let workflow = load(
        TestWorkflowBuilder::new()
            .repeat(json!(3), TestWorkflowBuilder::new().click().input("x").click())
            .click()
            .build(),
    );

    let err = runner(&recorder).run(&workflow).await.unwrap_err();
    assert_eq!(recorder.names(), vec!["click", "type"]);
    assert_eq!(err.path().unwrap().to_string(), "steps[0].iter[0].steps[1]");
    assert!(matches!(
        err,
        ExecutionError::StepFailed { step_type: StepType::Input, .. }
    ));
}

#[tokio::test]
async fn test_runner_is_fail_fast() {
    let recorder = Recorder::new();
    let workflow = load(
        TestWorkflowBuilder::new()
            .click()
            .condition("xor", json!([true]))
            .input("never")
            .build(),
    );
    let context = ExecutionContext::new("fail_fast".to_string());

    let err = runner(&recorder)
        .run_with_context(&workflow, &context)
        .await
        .unwrap_err();

    assert!(matches!(err.root_cause(), ExecutionError::InvalidOperator { .. }));
    assert_eq!(err.path().unwrap().to_string(), "steps[1]");
    assert_eq!(recorder.names(), vec!["click"]);
    assert_eq!(context.trace_len(), 2);
}

#[tokio::test]
async fn test_file_copy_is_byte_identical() {
    let env = TestEnvironment::new();
    let src = env.path().join("input.bin");
    let dst = env.path().join("output.bin");
    let bytes: Vec<u8> = (0..=255u8).cycle().take(4096).collect();
    tokio::fs::write(&src, &bytes).await.unwrap();

    let recorder = Recorder::new();
    let workflow = load(TestWorkflowBuilder::new().file_copy(&src, &dst).build());
    runner(&recorder).run(&workflow).await.unwrap();

    assert_eq!(tokio::fs::read(&dst).await.unwrap(), bytes);
    assert_eq!(recorder.names(), vec!["read", "write"]);
}

#[tokio::test]
async fn test_file_copy_missing_parameter_touches_nothing() {
    for payload in [json!({"src": "a.txt"}), json!({"dst": "b.txt"}), json!({"src": "", "dst": "b.txt"})] {
        let recorder = Recorder::new();
        let err = run_single(&recorder, json!({"type": "file_copy", "payload": payload}))
            .await
            .unwrap_err();

        assert!(matches!(err.root_cause(), ExecutionError::MissingParameter { .. }));
        assert!(recorder.events().is_empty());
    }
}

#[tokio::test(start_paused = true)]
async fn test_wait_sleeps_for_seconds() {
    let recorder = Recorder::new();
    let workflow = load(TestWorkflowBuilder::new().wait(json!(2)).build());

    let started = tokio::time::Instant::now();
    runner(&recorder).run(&workflow).await.unwrap();
    let elapsed = started.elapsed();

    assert!(elapsed >= Duration::from_secs(2));
    assert!(elapsed < Duration::from_secs(3));
}

#[tokio::test(start_paused = true)]
async fn test_wait_non_positive_is_noop() {
    let recorder = Recorder::new();
    for seconds in [json!(0), json!(-5), json!("0")] {
        let workflow = load(TestWorkflowBuilder::new().wait(seconds).build());
        let started = tokio::time::Instant::now();
        runner(&recorder).run(&workflow).await.unwrap();
        assert_eq!(started.elapsed(), Duration::ZERO);
    }

    let workflow = load(json!([{"type": "wait"}]));
    runner(&recorder).run(&workflow).await.unwrap();
}

#[tokio::test]
async fn test_click_positions() {
    let recorder = Recorder::new().with_cursor(7, 9);
    let workflow = load(json!([
        {"type": "click"},
        {"type": "click", "payload": {"x": "15", "y": 25.9}},
        {"type": "click", "payload": {"x": 50}},
        {"type": "click", "payload": {"element": {"AutomationId": "okButton"}}}
    ]));

    runner(&recorder).run(&workflow).await.unwrap();

    let query = ElementQuery::from([("AutomationId".to_string(), "okButton".to_string())]);
    assert_eq!(
        recorder.events(),
        vec![
            Event::Click(None),
            Event::Click(Some((15, 25))),
            Event::Click(Some((50, 9))),
            Event::Locate(query),
            Event::Click(Some((120, 210))),
        ]
    );
}

#[tokio::test]
async fn test_input_types_text() {
    let recorder = Recorder::new();
    let workflow = load(json!([
        {"type": "input", "payload": {"text": "hello"}},
        {"type": "input", "payload": {"text": 42}},
        {"type": "input"}
    ]));

    runner(&recorder).run(&workflow).await.unwrap();
    assert_eq!(
        recorder.events(),
        vec![
            Event::Type("hello".to_string()),
            Event::Type("42".to_string()),
            Event::Type(String::new()),
        ]
    );
}

#[tokio::test]
async fn test_screenshot_saves_capture() {
    let env = TestEnvironment::new();
    let target = env.path().join("shot.png");
    let recorder = Recorder::new();

    run_single(
        &recorder,
        json!({"type": "screenshot", "payload": {"path": target.to_string_lossy()}}),
    )
    .await
    .unwrap();

    assert_eq!(recorder.names(), vec!["capture"]);
    let saved = image::open(&target).unwrap();
    assert_eq!((saved.width(), saved.height()), (4, 3));
}

#[tokio::test]
async fn test_excel_write_sets_cell() {
    let recorder = Recorder::new();
    let workflow = load(json!([
        {"type": "excel_write", "payload": {"path": "report.xlsx", "sheet": "Data", "cell": "B2", "value": 12.5}},
        {"type": "excel_write", "payload": {"path": "report.xlsx", "cell": "A1"}}
    ]));

    runner(&recorder).run(&workflow).await.unwrap();
    assert_eq!(
        recorder.events(),
        vec![
            Event::OpenWorkbook("report.xlsx".into()),
            Event::SetCell {
                sheet: Some("Data".to_string()),
                cell: "B2".to_string(),
                value: CellValue::Number(12.5),
            },
            Event::SaveWorkbook,
            Event::OpenWorkbook("report.xlsx".into()),
            Event::SetCell {
                sheet: None,
                cell: "A1".to_string(),
                value: CellValue::Empty,
            },
            Event::SaveWorkbook,
        ]
    );
}

#[tokio::test]
async fn test_excel_write_requires_path_and_cell() {
    let recorder = Recorder::new();
    for payload in [json!({"cell": "A1"}), json!({"path": "out.xlsx"})] {
        let err = run_single(&recorder, json!({"type": "excel_write", "payload": payload}))
            .await
            .unwrap_err();
        assert!(matches!(err.root_cause(), ExecutionError::MissingParameter { .. }));
    }
    assert!(recorder.events().is_empty());
}

#[tokio::test]
async fn test_excel_write_rejects_malformed_cell() {
    let recorder = Recorder::new();
    for cell in ["not a cell", "1A", "A0"] {
        let err = run_single(
            &recorder,
            json!({"type": "excel_write", "payload": {"path": "out.xlsx", "cell": cell, "value": 1}}),
        )
        .await
        .unwrap_err();
        assert!(
            matches!(
                err.root_cause(),
                ExecutionError::InvalidParameter { step_type: StepType::ExcelWrite, parameter, .. } if parameter == "cell"
            ),
            "{}: {}",
            cell,
            err
        );
    }
    assert!(recorder.events().is_empty());
}

#[tokio::test]
async fn test_notify_without_email_only_logs() {
    let recorder = Recorder::new();
    run_single(&recorder, json!({"type": "notify", "payload": {"message": "done"}}))
        .await
        .unwrap();
    assert!(recorder.events().is_empty());
}

#[tokio::test]
async fn test_notify_email_defaults() {
    let recorder = Recorder::new();
    let executor = StepExecutor::new(recorder.capabilities()).with_settings(ExecutorSettings {
        smtp_server: "mail.internal".to_string(),
        from_addr: "robot@example.com".to_string(),
        ..ExecutorSettings::default()
    });
    let workflow = load(json!([
        {"type": "notify", "payload": {"message": "report ready", "email": "ops@example.com"}},
        {"type": "notify", "payload": {
            "email": "dev@example.com",
            "subject": "Build",
            "smtp_server": "smtp.example.com",
            "from_addr": "ci@example.com"
        }}
    ]));

    WorkflowRunner::new(executor).run(&workflow).await.unwrap();

    let mails = recorder.mails();
    assert_eq!(mails.len(), 2);
    assert_eq!(mails[0].to_addr, "ops@example.com");
    assert_eq!(mails[0].subject, "Notification");
    assert_eq!(mails[0].smtp_server, "mail.internal");
    assert_eq!(mails[0].from_addr, "robot@example.com");
    assert_eq!(mails[0].body, "report ready");

    assert_eq!(mails[1].subject, "Build");
    assert_eq!(mails[1].smtp_server, "smtp.example.com");
    assert_eq!(mails[1].from_addr, "ci@example.com");
    assert_eq!(mails[1].body, "");
}

#[tokio::test]
async fn test_missing_capability_is_reported() {
    let executor = StepExecutor::new(stepflow::Capabilities::files_only());
    let err = executor.execute(&Step::bare(StepType::Click)).await.unwrap_err();

    assert!(matches!(
        err.root_cause(),
        ExecutionError::CapabilityUnavailable { capability: "pointer control", .. }
    ));
}

#[tokio::test]
async fn test_invalid_payload_value() {
    let err = run_single(
        &Recorder::new(),
        json!({"type": "wait", "payload": {"seconds": "soon"}}),
    )
    .await
    .unwrap_err();
    assert!(matches!(err.root_cause(), ExecutionError::InvalidParameter { .. }));
}
