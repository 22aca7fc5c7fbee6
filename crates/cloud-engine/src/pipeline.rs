//! Ordered execution of the layout passes.
//!
//! [`PipelineRunner`] resolves the configured pass names once, then runs
//! them against a [`Layout`]. A run can be driven all at once with
//! [`PipelineRunner::run`] or one pass at a time through a
//! [`PipelineStepper`], which lets a host spread the work over frames and
//! show intermediate states.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use crate::clamp::clamp_to_sphere;
use crate::config::LayoutConfig;
use crate::density::{equalize, DensityReport};
use crate::diagnostics::Diagnostic;
use crate::error::ConfigError;
use crate::finish::{break_regularity, FinishReport};
use crate::layout::Layout;
use crate::observer::LayoutObserver;
use crate::perturb::{perturb_items, PerturbationReport};
use crate::placer::{place_items, PlacementReport};

/// The five layout passes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PassName {
    /// Initial placement around owning anchors
    Place,
    /// Pull items back inside the global sphere
    Clamp,
    /// Organic perturbation
    Perturb,
    /// Density equalization
    Equalize,
    /// Final regularity-breaking noise
    Finish,
}

impl PassName {
    /// Default execution order.
    pub const ALL: [PassName; 5] = [
        PassName::Place,
        PassName::Clamp,
        PassName::Perturb,
        PassName::Equalize,
        PassName::Finish,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            PassName::Place => "place",
            PassName::Clamp => "clamp",
            PassName::Perturb => "perturb",
            PassName::Equalize => "equalize",
            PassName::Finish => "finish",
        }
    }

    /// Parses a pass name, case-insensitively, accepting a few aliases.
    pub fn parse(name: &str) -> Option<Self> {
        match name.trim().to_ascii_lowercase().replace('-', "_").as_str() {
            "place" | "placement" | "placer" => Some(PassName::Place),
            "clamp" | "global_clamp" => Some(PassName::Clamp),
            "perturb" | "perturbation" | "organic" => Some(PassName::Perturb),
            "equalize" | "density" | "density_equalizer" => Some(PassName::Equalize),
            "finish" | "noise" | "final_noise" => Some(PassName::Finish),
            _ => None,
        }
    }
}

impl fmt::Display for PassName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// What a pass reported.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum PassOutcome {
    Placement(PlacementReport),
    Clamp { clamped: usize },
    Perturbation(PerturbationReport),
    Density(DensityReport),
    Finish(FinishReport),
    /// Switched off in `pipeline.enabled`
    Disabled,
}

/// One pass of a run.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PassRecord {
    pub pass: PassName,
    #[serde(flatten)]
    pub outcome: PassOutcome,
}

/// Everything a run reports besides the positions themselves.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct RunReport {
    pub passes: Vec<PassRecord>,
    pub diagnostics: Vec<Diagnostic>,
    /// The run stopped early on a [`CancelToken`]
    pub cancelled: bool,
}

impl RunReport {
    /// Outcome of the first run of `pass`, if it appeared in the plan.
    pub fn outcome(&self, pass: PassName) -> Option<&PassOutcome> {
        self.passes
            .iter()
            .find(|record| record.pass == pass)
            .map(|record| &record.outcome)
    }

    /// Whether `pass` actually executed.
    pub fn ran(&self, pass: PassName) -> bool {
        self.passes
            .iter()
            .any(|record| record.pass == pass && record.outcome != PassOutcome::Disabled)
    }

    /// Passes that executed, in order.
    pub fn executed(&self) -> Vec<PassName> {
        self.passes
            .iter()
            .filter(|record| record.outcome != PassOutcome::Disabled)
            .map(|record| record.pass)
            .collect()
    }

    pub fn placement(&self) -> Option<&PlacementReport> {
        match self.outcome(PassName::Place) {
            Some(PassOutcome::Placement(report)) => Some(report),
            _ => None,
        }
    }

    pub fn density(&self) -> Option<&DensityReport> {
        match self.outcome(PassName::Equalize) {
            Some(PassOutcome::Density(report)) => Some(report),
            _ => None,
        }
    }
}

/// Cooperative cancellation, checked between passes.
#[derive(Debug, Clone, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

#[derive(Debug, Clone, PartialEq)]
enum Step {
    Run(PassName),
    Unknown(String),
}

/// Runs the configured passes over layouts.
#[derive(Debug, Clone)]
pub struct PipelineRunner {
    config: LayoutConfig,
    steps: Vec<Step>,
    cancel: CancelToken,
}

impl PipelineRunner {
    /// Creates a runner after validating the configuration.
    pub fn new(config: LayoutConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        let steps = config
            .pipeline
            .passes
            .iter()
            .map(|name| match PassName::parse(name) {
                Some(pass) => Step::Run(pass),
                None => Step::Unknown(name.clone()),
            })
            .collect();

        Ok(Self {
            config,
            steps,
            cancel: CancelToken::new(),
        })
    }

    /// Creates a runner from a TOML configuration file.
    pub fn from_config_file(path: &Path) -> Result<Self, ConfigError> {
        Self::new(LayoutConfig::from_file(path)?)
    }

    /// Creates a runner with default configuration.
    pub fn with_defaults() -> Self {
        Self::new(LayoutConfig::default()).expect("Default config should always work")
    }

    /// Uses `token` for cancellation instead of the runner's own.
    pub fn with_cancel(mut self, token: CancelToken) -> Self {
        self.cancel = token;
        self
    }

    pub fn cancel_token(&self) -> CancelToken {
        self.cancel.clone()
    }

    pub fn config(&self) -> &LayoutConfig {
        &self.config
    }

    /// Recognized passes in execution order. Unknown names are left out.
    pub fn plan(&self) -> Vec<PassName> {
        self.steps
            .iter()
            .filter_map(|step| match step {
                Step::Run(pass) => Some(*pass),
                Step::Unknown(_) => None,
            })
            .collect()
    }

    /// Runs every pass to completion.
    pub fn run(&self, layout: &mut Layout, observer: &mut dyn LayoutObserver) -> RunReport {
        self.stepper(layout, observer).finish()
    }

    /// Prepares a run that executes one pass per [`PipelineStepper::step`].
    pub fn stepper<'a>(
        &'a self,
        layout: &'a mut Layout,
        observer: &'a mut dyn LayoutObserver,
    ) -> PipelineStepper<'a> {
        PipelineStepper {
            runner: self,
            layout,
            observer,
            next: 0,
            started: false,
            finished: false,
            report: RunReport::default(),
        }
    }
}

/// Result of a single [`PipelineStepper::step`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StepStatus {
    /// The pass executed
    Ran(PassName),
    /// A disabled or unknown pass was passed over
    Skipped,
    /// Nothing left to do
    Finished,
}

/// An in-progress run.
pub struct PipelineStepper<'a> {
    runner: &'a PipelineRunner,
    layout: &'a mut Layout,
    observer: &'a mut dyn LayoutObserver,
    next: usize,
    started: bool,
    finished: bool,
    report: RunReport,
}

impl<'a> PipelineStepper<'a> {
    /// Advances by one pass.
    pub fn step(&mut self) -> StepStatus {
        if self.finished {
            return StepStatus::Finished;
        }
        if !self.started {
            self.start();
            if self.finished {
                return StepStatus::Finished;
            }
        }
        if self.runner.cancel.is_cancelled() {
            tracing::info!("Layout cancelled after {} passes", self.next);
            self.report.cancelled = true;
            self.finished = true;
            return StepStatus::Finished;
        }

        let runner = self.runner;
        let Some(step) = runner.steps.get(self.next) else {
            self.complete();
            return StepStatus::Finished;
        };
        self.next += 1;

        match step {
            Step::Unknown(name) => {
                self.emit(Diagnostic::UnknownPass { name: name.clone() });
                StepStatus::Skipped
            }
            Step::Run(pass) if !runner.config.pipeline.enabled.is_enabled(*pass) => {
                tracing::debug!("Pass {} disabled", pass);
                self.report.passes.push(PassRecord {
                    pass: *pass,
                    outcome: PassOutcome::Disabled,
                });
                StepStatus::Skipped
            }
            Step::Run(pass) => {
                let outcome = self.execute(*pass);
                self.report.passes.push(PassRecord {
                    pass: *pass,
                    outcome,
                });
                self.observer.on_pass_complete(*pass, &self.layout.items);
                StepStatus::Ran(*pass)
            }
        }
    }

    /// Runs the remaining passes and returns the report.
    pub fn finish(mut self) -> RunReport {
        while self.step() != StepStatus::Finished {}
        self.report
    }

    /// Steps not yet taken, counting disabled and unknown ones.
    pub fn remaining(&self) -> usize {
        if self.finished {
            0
        } else {
            self.runner.steps.len() - self.next
        }
    }

    pub fn is_finished(&self) -> bool {
        self.finished
    }

    /// The layout as the last executed pass left it.
    pub fn layout(&self) -> &Layout {
        &*self.layout
    }

    /// The report so far.
    pub fn report(&self) -> &RunReport {
        &self.report
    }

    fn start(&mut self) {
        self.started = true;
        tracing::info!(
            "Layout run: {} anchors, {} items, radius {}",
            self.layout.anchors.len(),
            self.layout.items.len(),
            self.layout.sphere.radius
        );

        let setup = self.layout.setup_diagnostics().to_vec();
        for diagnostic in setup {
            self.emit(diagnostic);
        }
        if self.layout.anchors.is_empty() {
            self.emit(Diagnostic::NoAnchors);
            self.finished = true;
        } else if self.layout.items.is_empty() {
            self.emit(Diagnostic::NoItems);
            self.finished = true;
        }
    }

    fn complete(&mut self) {
        self.finished = true;
        tracing::info!(
            "Layout finished: {} of {} items placed, {} diagnostics",
            self.layout.placed_count(),
            self.layout.items.len(),
            self.report.diagnostics.len()
        );
    }

    fn execute(&mut self, pass: PassName) -> PassOutcome {
        let runner = self.runner;
        let config = &runner.config;
        match pass {
            PassName::Place => {
                let report = place_items(self.layout, config);
                for item_id in &report.exhausted {
                    self.emit(Diagnostic::PlacementExhausted {
                        item_id: item_id.clone(),
                    });
                }
                PassOutcome::Placement(report)
            }
            PassName::Clamp => {
                let sphere = self.layout.sphere;
                PassOutcome::Clamp {
                    clamped: clamp_to_sphere(&mut self.layout.items, &sphere),
                }
            }
            PassName::Perturb => PassOutcome::Perturbation(perturb_items(self.layout, config)),
            PassName::Equalize => {
                let report = equalize(self.layout, config);
                if report.hit_round_cap {
                    self.emit(Diagnostic::DensityNotConverged {
                        rounds: report.rounds,
                        empty_voxels: report.empty_after,
                    });
                }
                PassOutcome::Density(report)
            }
            PassName::Finish => PassOutcome::Finish(break_regularity(self.layout, config)),
        }
    }

    fn emit(&mut self, diagnostic: Diagnostic) {
        self.observer.on_diagnostic(&diagnostic);
        self.report.diagnostics.push(diagnostic);
    }
}
