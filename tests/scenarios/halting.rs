//! Test: halting rules - which outcomes stop a run and which don't

use crate::helpers::*;
use toolpipe::core::config::PipelineConfig;
use toolpipe::core::{FatalCause, StepOutcome};
use toolpipe::process::ProcessStatus;

/// Branch, style check with issues, commit, push: the warning doesn't stop anything
#[tokio::test]
async fn test_style_warning_does_not_halt() {
    let yaml = r#"
name: "Test: Style Warning"
steps:
  - id: "branch"
    command: ["branch"]
  - id: "style_check"
    name: "StyleCheck"
    command: ["pint", "--test"]
    classifier:
      kind: lenient
  - id: "commit"
    command: ["commit"]
  - id: "push"
    command: ["push"]
"#;
    let pipeline = PipelineConfig::from_yaml(yaml).unwrap().to_pipeline();

    let scenario = run_with_script(&pipeline, &[("pint", exit(1))]).await;

    assert_pipeline_completed(&scenario);
    assert_eq!(scenario.result.steps().len(), 4);
    assert_step_outcome(&scenario, "style_check", StepOutcome::Warning);
    assert_eq!(scenario.result.warning_count(), 1);
    assert_execution_order(&scenario, &["branch", "style_check", "commit", "push"]);
}

/// A strict first step failing stops the run with a single result
#[tokio::test]
async fn test_strict_first_step_failure() {
    let yaml = r#"
name: "Test: Branch Fails"
steps:
  - id: "branch"
    command: ["git", "checkout", "-b", "fix/x"]
  - id: "push"
    command: ["git", "push"]
"#;
    let pipeline = PipelineConfig::from_yaml(yaml).unwrap().to_pipeline();

    let scenario = run_with_script(&pipeline, &[("git checkout", exit(1))]).await;

    assert_pipeline_aborted(&scenario);
    assert_eq!(scenario.result.steps().len(), 1);
    assert_step_fatal(&scenario, "branch", FatalCause::ToolCrash);
    assert_eq!(scenario.calls.len(), 1);
}

/// Lint passes, analysis crashes: two results, failure
#[tokio::test]
async fn test_analysis_crash_after_lint() {
    let yaml = r#"
name: "Test: Analysis Crash"
steps:
  - id: "lint"
    name: "Lint"
    command: ["pint", "--test"]
    classifier:
      kind: lenient
  - id: "static_analysis"
    name: "StaticAnalysis"
    command: ["phpstan", "analyse"]
  - id: "tests"
    command: ["phpunit"]
"#;
    let pipeline = PipelineConfig::from_yaml(yaml).unwrap().to_pipeline();

    let scenario = run_with_script(&pipeline, &[("phpstan", exit(2))]).await;

    assert_pipeline_aborted(&scenario);
    assert_execution_order(&scenario, &["lint", "static_analysis"]);
    assert_step_outcome(&scenario, "lint", StepOutcome::Success);
    assert_step_fatal(&scenario, "static_analysis", FatalCause::ToolCrash);
    assert_eq!(scenario.result.not_attempted(), 1);
}

/// A timed out step is a timeout, not a crash, and it halts the run
#[tokio::test]
async fn test_timeout_halts() {
    let yaml = r#"
name: "Test: Timeout"
steps:
  - id: "slow"
    command: ["slow-tool"]
    timeout_secs: 1
    classifier:
      kind: tolerant
  - id: "after"
    command: ["after"]
"#;
    let pipeline = PipelineConfig::from_yaml(yaml).unwrap().to_pipeline();

    let scenario = run_with_script(
        &pipeline,
        &[("slow-tool", ProcessStatus::TimedOut { after_secs: 1 })],
    )
    .await;

    assert_pipeline_aborted(&scenario);
    assert_step_fatal(&scenario, "slow", FatalCause::Timeout);
    assert_execution_order(&scenario, &["slow"]);
}

/// A missing executable is a spawn failure
#[tokio::test]
async fn test_spawn_failure_halts() {
    let yaml = r#"
name: "Test: Missing Tool"
steps:
  - id: "missing"
    command: ["not-installed"]
  - id: "after"
    command: ["after"]
"#;
    let pipeline = PipelineConfig::from_yaml(yaml).unwrap().to_pipeline();

    let scenario = run_with_script(
        &pipeline,
        &[(
            "not-installed",
            ProcessStatus::SpawnFailed {
                reason: "No such file or directory".to_string(),
            },
        )],
    )
    .await;

    assert_pipeline_aborted(&scenario);
    assert_step_fatal(&scenario, "missing", FatalCause::SpawnFailure);
}

/// A warning halts the run when the step says so
#[tokio::test]
async fn test_warning_halts_when_not_continuing() {
    let yaml = r#"
name: "Test: Warning Halts"
steps:
  - id: "style"
    command: ["pint", "--test"]
    classifier:
      kind: lenient
    continue_on_warning: false
  - id: "after"
    command: ["after"]
"#;
    let pipeline = PipelineConfig::from_yaml(yaml).unwrap().to_pipeline();

    let scenario = run_with_script(&pipeline, &[("pint", exit(1))]).await;

    assert_pipeline_aborted(&scenario);
    assert_step_outcome(&scenario, "style", StepOutcome::Warning);
    assert_eq!(scenario.result.fatal_count(), 0);
    assert_eq!(
        scenario.result.halting_step().map(|s| s.step_id()),
        Some("style")
    );
}

/// Lenient codes outside the warning list are still fatal
#[tokio::test]
async fn test_lenient_unknown_code_is_fatal() {
    let yaml = r#"
name: "Test: Lenient Crash"
steps:
  - id: "style"
    command: ["pint", "--test"]
    classifier:
      kind: lenient
      warning_codes: [1]
"#;
    let pipeline = PipelineConfig::from_yaml(yaml).unwrap().to_pipeline();

    let scenario = run_with_script(&pipeline, &[("pint", exit(255))]).await;

    assert_pipeline_aborted(&scenario);
    assert_step_fatal(&scenario, "style", FatalCause::ToolCrash);
}
