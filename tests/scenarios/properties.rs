//! Test: properties that hold for any pipeline

use crate::helpers::*;
use toolpipe::core::{ExitClassifier, Pipeline, Step};
use toolpipe::execution::RunEvent;
use toolpipe::process::ProcessStatus;
use toolpipe::report::write_transcript;

fn pipeline_of(len: usize) -> Pipeline {
    (0..len).fold(Pipeline::new("numbered"), |pipeline, i| {
        pipeline.with_step(Step::new(
            format!("s{}", i),
            format!("Step {}", i),
            vec![format!("tool{}", i)],
        ))
    })
}

#[tokio::test]
async fn test_no_fatal_runs_every_step() {
    for len in 1..=5 {
        let scenario = run_with_script(&pipeline_of(len), &[]).await;
        assert_pipeline_completed(&scenario);
        assert_eq!(scenario.result.steps().len(), len);
    }
}

#[tokio::test]
async fn test_first_fatal_step_bounds_results() {
    let len = 5;
    for k in 1..=len {
        let failing = format!("tool{}", k - 1);
        let scenario = run_with_script(&pipeline_of(len), &[(failing.as_str(), exit(3))]).await;

        assert_pipeline_aborted(&scenario);
        assert_eq!(scenario.result.steps().len(), k);
        assert_eq!(scenario.calls.len(), k);
        assert!(scenario.result.steps()[k - 1].outcome().is_fatal());
    }
}

#[test]
fn test_classification_is_deterministic() {
    let statuses = [
        ProcessStatus::Exited { code: 0 },
        ProcessStatus::Exited { code: 1 },
        ProcessStatus::Exited { code: 2 },
        ProcessStatus::Terminated,
        ProcessStatus::TimedOut { after_secs: 5 },
    ];
    let rules = [
        ExitClassifier::Strict,
        ExitClassifier::lenient(),
        ExitClassifier::Tolerant,
    ];
    for rule in &rules {
        let step = Step::new("s", "S", vec!["tool".to_string()]).with_classifier(rule.clone());
        for status in &statuses {
            assert_eq!(step.classify(status), step.classify(status));
        }
    }
}

#[tokio::test]
async fn test_results_unchanged_by_reporting() {
    let scenario = run_with_script(&pipeline_of(3), &[("tool1", exit(1))]).await;
    let before = serde_json::to_string(&scenario.result).unwrap();

    let mut sink = Vec::new();
    write_transcript(&mut sink, &scenario.result, 5).unwrap();
    toolpipe::report::render_artifact(&scenario.result, toolpipe::report::ArtifactFormat::Json)
        .unwrap();

    assert_eq!(serde_json::to_string(&scenario.result).unwrap(), before);
}

#[tokio::test]
async fn test_events_match_results() {
    let scenario = run_with_script(&pipeline_of(4), &[("tool2", exit(9))]).await;

    let started = scenario
        .events
        .iter()
        .filter(|e| matches!(e, RunEvent::StepStarted { .. }))
        .count();
    let finished = scenario
        .events
        .iter()
        .filter(|e| matches!(e, RunEvent::StepFinished { .. }))
        .count();
    assert_eq!(started, scenario.result.steps().len());
    assert_eq!(finished, scenario.result.steps().len());

    assert!(matches!(
        scenario.events.first(),
        Some(RunEvent::PipelineStarted { total_steps: 4, .. })
    ));
    assert!(matches!(
        scenario.events.last(),
        Some(RunEvent::PipelineFinished { .. })
    ));
}
