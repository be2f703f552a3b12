//! Test: propose-fix and fix presets

use crate::helpers::*;
use toolpipe::core::preset::{fix_pipeline, propose_fix_pipeline, FixKind, ProposeFixOptions};
use toolpipe::core::{FatalCause, StepOutcome};

fn options(kind: FixKind) -> ProposeFixOptions {
    let mut options = ProposeFixOptions::new(kind);
    options.branch = format!("fix/{}-fixes-2024-01-01-00-00-00", kind);
    options
}

#[tokio::test]
async fn test_style_proposal_happy_path() {
    let pipeline = propose_fix_pipeline(&options(FixKind::Style));

    let scenario = run_with_script(&pipeline, &[]).await;

    assert_pipeline_completed(&scenario);
    assert_execution_order(
        &scenario,
        &["create_branch", "fixer", "stage_changes", "commit", "push", "pull_request"],
    );
    assert_eq!(
        scenario.calls[0],
        vec!["git", "checkout", "-b", "fix/style-fixes-2024-01-01-00-00-00"]
    );
    assert_eq!(
        scenario.calls[4],
        vec![
            "git",
            "push",
            "--set-upstream",
            "origin",
            "fix/style-fixes-2024-01-01-00-00-00"
        ]
    );
    let pr = &scenario.calls[5];
    assert_eq!(&pr[..3], ["gh", "pr", "create"]);
    assert!(pr.contains(&"Automated Style Fixes".to_string()));
}

/// Nothing to commit and leftover style issues are both warnings
#[tokio::test]
async fn test_style_fixer_and_commit_warnings_continue() {
    let pipeline = propose_fix_pipeline(&options(FixKind::Style));

    let scenario = run_with_script(
        &pipeline,
        &[("./vendor/bin/pint", exit(1)), ("git commit", exit(1))],
    )
    .await;

    assert_pipeline_completed(&scenario);
    assert_step_outcome(&scenario, "fixer", StepOutcome::Warning);
    assert_step_outcome(&scenario, "commit", StepOutcome::Warning);
    assert_step_outcome(&scenario, "pull_request", StepOutcome::Success);
}

#[tokio::test]
async fn test_analysis_fixer_failure_halts() {
    let pipeline = propose_fix_pipeline(&options(FixKind::Analysis));

    let scenario = run_with_script(&pipeline, &[("php", exit(1))]).await;

    assert_pipeline_aborted(&scenario);
    assert_execution_order(&scenario, &["create_branch", "prepare_baseline", "fixer"]);
    assert_step_fatal(&scenario, "fixer", FatalCause::ToolCrash);
    assert_eq!(scenario.calls[1], vec!["touch", "phpstan-baseline.neon"]);
    assert!(scenario.calls[2].contains(&"--generate-baseline".to_string()));
}

/// The baseline is only created once the branch exists
#[tokio::test]
async fn test_branch_failure_skips_baseline() {
    let pipeline = propose_fix_pipeline(&options(FixKind::Analysis));

    let scenario = run_with_script(&pipeline, &[("git checkout", exit(128))]).await;

    assert_pipeline_aborted(&scenario);
    assert_execution_order(&scenario, &["create_branch"]);
    assert!(scenario.calls.iter().all(|argv| argv[0] != "touch"));
}

#[tokio::test]
async fn test_push_failure_skips_pull_request() {
    let pipeline = propose_fix_pipeline(&options(FixKind::Style));

    let scenario = run_with_script(&pipeline, &[("git push", exit(128))]).await;

    assert_pipeline_aborted(&scenario);
    assert_step_fatal(&scenario, "push", FatalCause::ToolCrash);
    assert!(scenario.result.step("pull_request").is_none());
    assert!(scenario.calls.iter().all(|argv| argv[0] != "gh"));
}

#[tokio::test]
async fn test_fix_pipeline() {
    let scenario = run_with_script(&fix_pipeline(), &[]).await;

    assert_pipeline_completed(&scenario);
    assert_eq!(scenario.calls, vec![vec!["php", "vendor/bin/pint", "--verbose"]]);
}
