//! Test: strict quality gate

use crate::helpers::*;
use toolpipe::core::preset::{quality_pipeline, QualityOptions, QualityStage};
use toolpipe::core::{FatalCause, StepOutcome};

fn gate() -> QualityOptions {
    QualityOptions::default()
}

#[tokio::test]
async fn test_all_stages_pass() {
    let scenario = run_with_script(&quality_pipeline(gate()), &[]).await;

    assert_pipeline_completed(&scenario);
    assert_eq!(scenario.result.steps().len(), QualityStage::ALL.len());
    assert_eq!(scenario.result.success_count(), QualityStage::ALL.len());
    assert_eq!(
        scenario.calls.last().unwrap(),
        &vec!["php", "artisan", "links:check", "--all"]
    );
}

/// Every stage is strict, so the audit failing stops the test suites
#[tokio::test]
async fn test_audit_failure_stops_gate() {
    let scenario = run_with_script(&quality_pipeline(gate()), &[("composer", exit(1))]).await;

    assert_pipeline_aborted(&scenario);
    assert_execution_order(
        &scenario,
        &[
            "syntax_check",
            "phpstan_analysis",
            "phpmd_quality",
            "pint_formatting",
            "composer_audit",
        ],
    );
    assert_step_fatal(&scenario, "composer_audit", FatalCause::ToolCrash);
    assert_eq!(scenario.result.not_attempted(), 8);
}

#[tokio::test]
async fn test_syntax_error_stops_before_analysis() {
    // xargs exits 123 when any `php -l` call fails
    let scenario = run_with_script(&quality_pipeline(gate()), &[("sh -c", exit(123))]).await;

    assert_pipeline_aborted(&scenario);
    assert_execution_order(&scenario, &["syntax_check"]);
    assert_step_fatal(&scenario, "syntax_check", FatalCause::ToolCrash);
    assert!(scenario.calls[0][2].contains("php -l"));
}

#[tokio::test]
async fn test_single_stage() {
    let options = QualityOptions {
        stage: Some(QualityStage::FeatureTests),
        ..gate()
    };
    let scenario = run_with_script(&quality_pipeline(options), &[]).await;

    assert_pipeline_completed(&scenario);
    assert_execution_order(&scenario, &["feature_tests"]);
    assert!(scenario.calls[0].contains(&"tests/Feature/".to_string()));
}

#[tokio::test]
async fn test_browser_tests_stage() {
    let options = QualityOptions {
        stage: Some(QualityStage::E2eTests),
        ..gate()
    };
    let scenario = run_with_script(&quality_pipeline(options), &[("php artisan", exit(1))]).await;

    assert_pipeline_aborted(&scenario);
    assert_step_fatal(&scenario, "e2e_tests", FatalCause::ToolCrash);
    assert_eq!(
        scenario.calls[0],
        vec!["php", "artisan", "dusk", "--configuration=phpunit.strict.xml"]
    );
}

#[tokio::test]
async fn test_auto_fix_runs_before_gate() {
    let options = QualityOptions {
        auto_fix: true,
        ..gate()
    };
    let scenario = run_with_script(&quality_pipeline(options), &[]).await;

    assert_pipeline_completed(&scenario);
    assert_eq!(scenario.result.steps().len(), 6 + QualityStage::ALL.len());
    assert_eq!(
        &scenario.executed_steps()[..7],
        [
            "fix_formatting",
            "fix_dependencies",
            "clear_config",
            "clear_cache",
            "clear_routes",
            "clear_views",
            "syntax_check"
        ]
    );
    assert_eq!(
        scenario.calls[1],
        vec!["composer", "install", "--no-dev", "--optimize-autoloader"]
    );
}

/// A fix that fails is a warning; the gate still decides the run
#[tokio::test]
async fn test_failed_fixes_do_not_stop_gate() {
    let options = QualityOptions {
        auto_fix: true,
        ..gate()
    };
    let scenario = run_with_script(
        &quality_pipeline(options),
        &[
            ("./vendor/bin/pint --config=pint.strict.json", exit(1)),
            ("composer install", exit(2)),
        ],
    )
    .await;

    assert_pipeline_completed(&scenario);
    assert_step_outcome(&scenario, "fix_formatting", StepOutcome::Warning);
    assert_step_outcome(&scenario, "fix_dependencies", StepOutcome::Warning);
    assert_step_outcome(&scenario, "pint_formatting", StepOutcome::Success);
    assert_eq!(scenario.result.warning_count(), 2);
}
