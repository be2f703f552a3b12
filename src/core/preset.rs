//! Built-in pipelines for code-quality tooling
//!
//! Each fix kind carries its own fixer step, commit message and pull request
//! text, so the pipelines are assembled from data instead of branching on a
//! type string.

use crate::core::{classifier::ExitClassifier, Pipeline, Step};
use chrono::Local;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Static-analysis baseline the analysis fixer regenerates
pub const PHPSTAN_BASELINE: &str = "phpstan-baseline.neon";

fn argv(args: &[&str]) -> Vec<String> {
    args.iter().map(|s| s.to_string()).collect()
}

/// Kind of automated fix a propose-fix run applies
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FixKind {
    /// Code style fixes
    Style,
    /// Static-analysis baseline regeneration
    Analysis,
}

impl FixKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            FixKind::Style => "style",
            FixKind::Analysis => "analysis",
        }
    }

    /// The step that applies the fix
    pub fn fixer_step(&self) -> Step {
        match self {
            // Pint reports leftover issues through its exit code; the fixes it
            // applied are still worth committing.
            FixKind::Style => Step::new(
                "fixer",
                "Apply code style fixes",
                argv(&["./vendor/bin/pint"]),
            )
            .with_classifier(ExitClassifier::Tolerant),
            FixKind::Analysis => Step::new(
                "fixer",
                "Generate static analysis baseline",
                argv(&[
                    "php",
                    "-d",
                    "memory_limit=512M",
                    "./vendor/bin/phpstan",
                    "analyse",
                    "--generate-baseline",
                ]),
            ),
        }
    }

    pub fn commit_message(&self) -> &'static str {
        match self {
            FixKind::Style => "style: Apply automated code style fixes",
            FixKind::Analysis => "refactor: Generate PHPStan baseline",
        }
    }

    pub fn pull_request_title(&self) -> &'static str {
        match self {
            FixKind::Style => "Automated Style Fixes",
            FixKind::Analysis => "Automated Static Analysis Fixes: PHPStan Baseline",
        }
    }

    pub fn pull_request_body(&self) -> &'static str {
        match self {
            FixKind::Style => {
                "This PR was automatically generated by the AI agent to apply code style fixes found by Laravel Pint."
            }
            FixKind::Analysis => {
                "This PR was automatically generated by the AI agent to create a PHPStan baseline file for static analysis."
            }
        }
    }

    /// Step that readies the new branch for the fixer, if the kind needs one
    ///
    /// The analysis fixer needs the baseline file to exist, even if empty.
    /// `touch` leaves an existing baseline's content alone.
    pub fn preparation_step(&self) -> Option<Step> {
        match self {
            FixKind::Style => None,
            FixKind::Analysis => Some(Step::new(
                "prepare_baseline",
                "Ensure static analysis baseline exists",
                argv(&["touch", PHPSTAN_BASELINE]),
            )),
        }
    }

    /// Branch name for a fix created now
    pub fn branch_name(&self) -> String {
        format!(
            "fix/{}-fixes-{}",
            self.as_str(),
            Local::now().format("%Y-%m-%d-%H-%M-%S")
        )
    }
}

impl fmt::Display for FixKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Options for the propose-fix pipeline
#[derive(Debug, Clone)]
pub struct ProposeFixOptions {
    pub kind: FixKind,
    pub branch: String,
    pub base: String,
    pub remote: String,
}

impl ProposeFixOptions {
    pub fn new(kind: FixKind) -> Self {
        Self {
            kind,
            branch: kind.branch_name(),
            base: "main".to_string(),
            remote: "origin".to_string(),
        }
    }
}

/// Branch, fix, commit, push, then open a pull request
pub fn propose_fix_pipeline(options: &ProposeFixOptions) -> Pipeline {
    let kind = options.kind;
    let pipeline = Pipeline::new(format!("propose-fix-{}", kind))
        .with_variable("branch", options.branch.clone())
        .with_variable("base", options.base.clone())
        .with_variable("remote", options.remote.clone())
        .with_variable("commit_message", kind.commit_message())
        .with_variable("pr_title", kind.pull_request_title())
        .with_variable("pr_body", kind.pull_request_body())
        .with_step(Step::new(
            "create_branch",
            "Create branch",
            argv(&["git", "checkout", "-b", "{{ branch }}"]),
        ));
    kind.preparation_step()
        .into_iter()
        .fold(pipeline, Pipeline::with_step)
        .with_step(kind.fixer_step())
        .with_step(Step::new(
            "stage_changes",
            "Stage changes",
            argv(&["git", "add", "."]),
        ))
        // "nothing to commit" exits nonzero and must not stop the push
        .with_step(
            Step::new(
                "commit",
                "Commit changes",
                argv(&["git", "commit", "-m", "{{ commit_message }}"]),
            )
            .with_classifier(ExitClassifier::Tolerant),
        )
        .with_step(Step::new(
            "push",
            "Push branch",
            argv(&["git", "push", "--set-upstream", "{{ remote }}", "{{ branch }}"]),
        ))
        .with_step(Step::new(
            "pull_request",
            "Create pull request",
            argv(&[
                "gh",
                "pr",
                "create",
                "--base",
                "{{ base }}",
                "--head",
                "{{ branch }}",
                "--title",
                "{{ pr_title }}",
                "--body",
                "{{ pr_body }}",
            ]),
        ))
}

/// Run the style fixer in place
pub fn fix_pipeline() -> Pipeline {
    Pipeline::new("fix").with_step(Step::new(
        "pint",
        "Fix code style",
        argv(&["php", "vendor/bin/pint", "--verbose"]),
    ))
}

/// Source directories whose PHP files are syntax checked
const SYNTAX_CHECK_DIRS: [&str; 5] = ["app", "config", "database", "routes", "tests"];

/// Stages of the strict quality gate, in execution order
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QualityStage {
    SyntaxCheck,
    PhpstanAnalysis,
    PhpmdQuality,
    PintFormatting,
    ComposerAudit,
    UnitTests,
    FeatureTests,
    AiTests,
    SecurityTests,
    PerformanceTests,
    IntegrationTests,
    E2eTests,
    LinkChecker,
}

impl QualityStage {
    pub const ALL: [QualityStage; 13] = [
        QualityStage::SyntaxCheck,
        QualityStage::PhpstanAnalysis,
        QualityStage::PhpmdQuality,
        QualityStage::PintFormatting,
        QualityStage::ComposerAudit,
        QualityStage::UnitTests,
        QualityStage::FeatureTests,
        QualityStage::AiTests,
        QualityStage::SecurityTests,
        QualityStage::PerformanceTests,
        QualityStage::IntegrationTests,
        QualityStage::E2eTests,
        QualityStage::LinkChecker,
    ];

    pub fn id(&self) -> &'static str {
        match self {
            QualityStage::SyntaxCheck => "syntax_check",
            QualityStage::PhpstanAnalysis => "phpstan_analysis",
            QualityStage::PhpmdQuality => "phpmd_quality",
            QualityStage::PintFormatting => "pint_formatting",
            QualityStage::ComposerAudit => "composer_audit",
            QualityStage::UnitTests => "unit_tests",
            QualityStage::FeatureTests => "feature_tests",
            QualityStage::AiTests => "ai_tests",
            QualityStage::SecurityTests => "security_tests",
            QualityStage::PerformanceTests => "performance_tests",
            QualityStage::IntegrationTests => "integration_tests",
            QualityStage::E2eTests => "e2e_tests",
            QualityStage::LinkChecker => "link_checker",
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            QualityStage::SyntaxCheck => "Syntax check",
            QualityStage::PhpstanAnalysis => "Static analysis",
            QualityStage::PhpmdQuality => "Code quality",
            QualityStage::PintFormatting => "Code formatting",
            QualityStage::ComposerAudit => "Dependency audit",
            QualityStage::UnitTests => "Unit tests",
            QualityStage::FeatureTests => "Feature tests",
            QualityStage::AiTests => "AI tests",
            QualityStage::SecurityTests => "Security tests",
            QualityStage::PerformanceTests => "Performance tests",
            QualityStage::IntegrationTests => "Integration tests",
            QualityStage::E2eTests => "Browser tests",
            QualityStage::LinkChecker => "Link check",
        }
    }

    pub fn command(&self) -> Vec<String> {
        match self {
            QualityStage::SyntaxCheck => syntax_check(),
            QualityStage::PhpstanAnalysis => argv(&[
                "./vendor/bin/phpstan",
                "analyse",
                "--memory-limit=1G",
                "--configuration=phpstan.strict.neon",
            ]),
            QualityStage::PhpmdQuality => {
                argv(&["./vendor/bin/phpmd", "app", "xml", "phpmd.strict.xml"])
            }
            QualityStage::PintFormatting => {
                argv(&["./vendor/bin/pint", "--test", "--config=pint.strict.json"])
            }
            QualityStage::ComposerAudit => argv(&["composer", "audit"]),
            QualityStage::UnitTests => test_suite("tests/Unit/"),
            QualityStage::FeatureTests => test_suite("tests/Feature/"),
            QualityStage::AiTests => test_suite("tests/AI/"),
            QualityStage::SecurityTests => test_suite("tests/Security/"),
            QualityStage::PerformanceTests => test_suite("tests/Performance/"),
            QualityStage::IntegrationTests => test_suite("tests/Integration/"),
            QualityStage::E2eTests => argv(&[
                "php",
                "artisan",
                "dusk",
                "--configuration=phpunit.strict.xml",
            ]),
            QualityStage::LinkChecker => argv(&["php", "artisan", "links:check", "--all"]),
        }
    }

    pub fn step(&self) -> Step {
        Step::new(self.id(), self.name(), self.command())
    }
}

fn test_suite(path: &str) -> Vec<String> {
    argv(&[
        "php",
        "artisan",
        "test",
        path,
        "--configuration=phpunit.strict.xml",
    ])
}

/// `php -l` over every PHP file in the source directories
///
/// `php -l` takes one file per call, so the files are fanned out through
/// xargs, which exits nonzero if any file fails to parse. Missing
/// directories are skipped.
fn syntax_check() -> Vec<String> {
    let script = format!(
        "for d in {}; do [ -d \"$d\" ] && find \"$d\" -type f -name '*.php' -print0; done | xargs -0 -r -n1 php -l",
        SYNTAX_CHECK_DIRS.join(" ")
    );
    argv(&["sh", "-c", &script])
}

impl FromStr for QualityStage {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        QualityStage::ALL
            .iter()
            .copied()
            .find(|stage| stage.id() == s)
            .ok_or_else(|| {
                let ids: Vec<_> = QualityStage::ALL.iter().map(|s| s.id()).collect();
                format!("Unknown stage '{}'. Available: {}", s, ids.join(", "))
            })
    }
}

/// Fixes attempted before the gate when `--fix` is given
///
/// All tolerant: a fix that fails is reported as a warning and the gate
/// still runs.
pub fn auto_fix_steps() -> Vec<Step> {
    let fixes = [
        (
            "fix_formatting",
            "Fix code formatting",
            argv(&["./vendor/bin/pint", "--config=pint.strict.json"]),
        ),
        (
            "fix_dependencies",
            "Fix dependencies",
            argv(&["composer", "install", "--no-dev", "--optimize-autoloader"]),
        ),
        ("clear_config", "Clear config cache", artisan("config:clear")),
        ("clear_cache", "Clear application cache", artisan("cache:clear")),
        ("clear_routes", "Clear route cache", artisan("route:clear")),
        ("clear_views", "Clear compiled views", artisan("view:clear")),
    ];
    fixes
        .into_iter()
        .map(|(id, name, command)| {
            Step::new(id, name, command).with_classifier(ExitClassifier::Tolerant)
        })
        .collect()
}

fn artisan(command: &str) -> Vec<String> {
    argv(&["php", "artisan", command])
}

/// Options for the quality gate
#[derive(Debug, Clone, Copy, Default)]
pub struct QualityOptions {
    /// Run only this stage
    pub stage: Option<QualityStage>,
    /// Attempt the auto-fixes first
    pub auto_fix: bool,
}

/// The strict quality gate, optionally preceded by the auto-fixes
pub fn quality_pipeline(options: QualityOptions) -> Pipeline {
    let fixes = if options.auto_fix {
        auto_fix_steps()
    } else {
        Vec::new()
    };
    let stages = QualityStage::ALL
        .iter()
        .filter(|stage| options.stage.map_or(true, |only| only == **stage))
        .map(QualityStage::step);

    fixes
        .into_iter()
        .chain(stages)
        .fold(Pipeline::new("quality-check"), Pipeline::with_step)
}
