use log::{debug, info, warn};
use ndarray::{Array1, Array2, Array3, ArrayView1, ArrayView2, ArrayView3, Axis, s};

use super::{Phase, TrainerConfig, WindowPlan, window_labels};
use crate::{
    MlErr, Result,
    arch::{
        Model,
        activations::Sigmoid,
        loss::{BceWithLogits, LossFn},
    },
    dataset::check_shapes,
    metrics::{MetricsSnapshot, PhaseMetrics, THRESHOLD},
    optimization::{LrScheduler, Optimizer, clip_grad_norm, l2_norm},
    telemetry::MetricSink,
};

/// The result of a windowed pass over one batch.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PassStats {
    /// The arithmetic mean of the per-window losses.
    pub loss: f32,
    pub windows: usize,
}

/// Everything reported at the end of a step.
#[derive(Debug, Clone, PartialEq)]
pub struct StepReport {
    pub phase: Phase,
    pub loss: f32,
    pub windows: usize,
    pub metrics: MetricsSnapshot,
    /// The L2 norm of each parameter group's gradient, only reported while training.
    pub grad_norms: Vec<(String, f32)>,
}

/// Everything reported at the end of the test phase.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TestSummary {
    pub pred0_count: usize,
    pub pred1_count: usize,
    pub steps: usize,
    /// The mean of the per-step AUROC, `None` if no step was reported.
    pub auc_avg: Option<f32>,
}

/// The test phase's tally, kept across steps until the phase ends.
#[derive(Debug, Default, Clone, Copy)]
struct TestTally {
    pred0: usize,
    pred1: usize,
    auroc_sum: f32,
    steps: usize,
}

/// Slides a fixed-size window over full recordings, classifying every window.
///
/// While training, the optimizer and the scheduler advance once per window rather than once per
/// batch, so a single pass makes several optimizer steps.
pub struct WindowedTrainer<M, O, S>
where
    M: Model,
    O: Optimizer,
    S: LrScheduler,
{
    model: M,
    optimizer: O,
    scheduler: S,
    params: Vec<f32>,
    grad: Vec<f32>,
    loss_fn: BceWithLogits,
    sigmoid: Sigmoid,
    config: TrainerConfig,

    metrics: [PhaseMetrics; 3],
    tally: TestTally,
    last_maps: Option<Array3<f32>>,
}

impl<M, O, S> WindowedTrainer<M, O, S>
where
    M: Model,
    O: Optimizer,
    S: LrScheduler,
{
    /// Creates a new `WindowedTrainer`.
    ///
    /// The optimizer's learning rate is overridden by the scheduler's initial one.
    ///
    /// # Arguments
    /// * `model` - The model to train.
    /// * `params` - The model's initial parameters.
    /// * `optimizer` - The optimizer, stepped once per training window.
    /// * `scheduler` - The learning rate schedule, advanced after every optimizer step.
    /// * `config` - The trainer's configuration.
    ///
    /// # Returns
    /// A new `WindowedTrainer`, or an error if the configuration is invalid or the parameters
    /// don't fit the model.
    pub fn new(
        model: M,
        params: Vec<f32>,
        mut optimizer: O,
        scheduler: S,
        config: TrainerConfig,
    ) -> Result<Self> {
        config.validate()?;

        if params.len() != model.size() {
            return Err(MlErr::SizeMismatch {
                what: "model params",
                got: params.len(),
                expected: model.size(),
            });
        }

        optimizer.set_learning_rate(scheduler.learning_rate());

        Ok(Self {
            grad: vec![0.; params.len()],
            model,
            optimizer,
            scheduler,
            params,
            loss_fn: BceWithLogits::new(),
            sigmoid: Sigmoid::default(),
            config,
            metrics: Default::default(),
            tally: TestTally::default(),
            last_maps: None,
        })
    }

    /// Runs every window of a batch through the model.
    ///
    /// Each window is labeled, scored with BCE-with-logits and fed to the phase's metrics. While
    /// training every window also makes an optimizer step with a clipped gradient, and while
    /// testing the predicted classes are tallied.
    ///
    /// # Arguments
    /// * `inputs` - The recordings, shaped `[batch, channels, time]`.
    /// * `targets` - The per-sample labels, shaped `[batch, time]`.
    /// * `phase` - The phase the pass belongs to.
    ///
    /// # Returns
    /// The mean window loss and the amount of windows, or an error if the shapes don't fit, the
    /// recording is shorter than a window or a loss isn't finite. Errors abort the pass and discard
    /// the phase's running metrics, so windows of a failed batch are never reported.
    pub fn run_windowed_pass(
        &mut self,
        inputs: ArrayView3<f32>,
        targets: ArrayView2<f32>,
        phase: Phase,
    ) -> Result<PassStats> {
        check_shapes(inputs, targets)?;

        let plan = self.config.plan(inputs.len_of(Axis(2)))?;
        let mut preds = (0, 0);

        let total_loss = match self.slide(inputs, targets, phase, &plan, &mut preds) {
            Ok(total_loss) => total_loss,
            Err(e) => {
                warn!(phase = phase.prefix(); "pass aborted, discarding its metrics: {e}");
                self.reset_phase(phase);
                return Err(e);
            }
        };

        if phase == Phase::Test {
            self.tally.pred0 += preds.0;
            self.tally.pred1 += preds.1;
        }

        Ok(PassStats {
            loss: total_loss / plan.len() as f32,
            windows: plan.len(),
        })
    }

    /// Runs every window of the plan, counting `(negative, positive)` predictions into `preds`.
    ///
    /// # Returns
    /// The sum of the window losses.
    fn slide(
        &mut self,
        inputs: ArrayView3<f32>,
        targets: ArrayView2<f32>,
        phase: Phase,
        plan: &WindowPlan,
        preds: &mut (usize, usize),
    ) -> Result<f32> {
        let batch = inputs.len_of(Axis(0));
        let mut total_loss = 0.;

        for window in plan.iter() {
            let x = inputs.slice(s![.., .., window.start..window.end]);
            let y = targets.slice(s![.., window.start..window.end]);

            let out = self.model.forward(&self.params, x)?;
            let logits = squeeze_logits(out.logits, batch)?;

            let labels = window_labels(y, self.config.sample_rate);
            let y = labels.mapv(f32::from);

            let loss = self.loss_fn.loss(logits.view(), y.view());
            if !loss.is_finite() {
                return Err(MlErr::NonFiniteLoss {
                    window: window.index,
                    offset: window.start,
                });
            }

            if phase == Phase::Train {
                self.optimize(logits.view(), y.view())?;
            }

            let probs = logits.mapv(|z| self.sigmoid.f(z));
            self.metrics[phase.index()].update(probs.view(), labels.view())?;

            let positives = probs.iter().filter(|&&p| p > THRESHOLD).count();
            preds.0 += batch - positives;
            preds.1 += positives;

            debug!(phase = phase.prefix(), window = window.index, offset = window.start, loss = loss; "window done");

            self.last_maps = Some(out.maps);
            total_loss += loss;
        }

        Ok(total_loss)
    }

    fn optimize(&mut self, logits: ArrayView1<f32>, y: ArrayView1<f32>) -> Result<()> {
        self.grad.fill(0.);

        let d = self.loss_fn.loss_prime(logits, y);
        self.model.backward(&self.params, &mut self.grad, d.view())?;

        let norm = clip_grad_norm(&mut self.grad, self.config.grad_clip_norm);
        self.optimizer.update_params(&mut self.params, &self.grad)?;

        let lr = self.scheduler.advance();
        self.optimizer.set_learning_rate(lr);

        debug!(grad_norm = norm, lr = lr; "optimizer step");
        Ok(())
    }

    /// Reports a finished step and resets the phase's metrics.
    ///
    /// Reports `{phase}_loss_step`, `{phase}_auc_step`, `{phase}_acc_step` and `{phase}_ap_step`
    /// when defined. Training also reports the gradient norm of every parameter group under its
    /// name, and testing adds the step's AUROC to the phase's tally.
    ///
    /// # Arguments
    /// * `phase` - The phase of the step.
    /// * `stats` - The stats of the step's pass.
    /// * `sink` - Where to report to.
    ///
    /// # Returns
    /// Everything that was reported.
    pub fn on_step_end<K: MetricSink + ?Sized>(
        &mut self,
        phase: Phase,
        stats: &PassStats,
        sink: &mut K,
    ) -> StepReport {
        let prefix = phase.prefix();
        let metrics = self.metrics[phase.index()].snapshot();

        sink.log_scalar(&format!("{prefix}_loss_step"), stats.loss);

        let scalars = [
            ("auc", metrics.auroc),
            ("acc", metrics.accuracy),
            ("ap", metrics.average_precision),
        ];

        for (name, value) in scalars {
            if let Some(value) = value {
                sink.log_scalar(&format!("{prefix}_{name}_step"), value);
            }
        }

        let grad_norms = match phase {
            Phase::Train => self.grad_norms(),
            _ => Vec::new(),
        };

        for (name, norm) in &grad_norms {
            sink.log_scalar(name, *norm);
        }

        if let (Phase::Test, Some(auroc)) = (phase, metrics.auroc) {
            self.tally.auroc_sum += auroc;
            self.tally.steps += 1;
        }

        self.reset_phase(phase);

        StepReport {
            phase,
            loss: stats.loss,
            windows: stats.windows,
            metrics,
            grad_norms,
        }
    }

    fn grad_norms(&self) -> Vec<(String, f32)> {
        let mut start = 0;
        let mut norms = Vec::new();

        for group in self.model.param_groups() {
            let end = start + group.len;
            let Some(grad) = self.grad.get(start..end) else {
                break;
            };

            norms.push((group.name, l2_norm(grad)));
            start = end;
        }

        norms
    }

    /// Runs a training pass over a batch and reports it.
    pub fn training_step<K: MetricSink + ?Sized>(
        &mut self,
        inputs: ArrayView3<f32>,
        targets: ArrayView2<f32>,
        sink: &mut K,
    ) -> Result<StepReport> {
        self.step(inputs, targets, Phase::Train, sink)
    }

    /// Runs a validation pass over a batch and reports it.
    pub fn validation_step<K: MetricSink + ?Sized>(
        &mut self,
        inputs: ArrayView3<f32>,
        targets: ArrayView2<f32>,
        sink: &mut K,
    ) -> Result<StepReport> {
        self.step(inputs, targets, Phase::Validate, sink)
    }

    /// Runs a test pass over a batch and reports it.
    pub fn test_step<K: MetricSink + ?Sized>(
        &mut self,
        inputs: ArrayView3<f32>,
        targets: ArrayView2<f32>,
        sink: &mut K,
    ) -> Result<StepReport> {
        self.step(inputs, targets, Phase::Test, sink)
    }

    fn step<K: MetricSink + ?Sized>(
        &mut self,
        inputs: ArrayView3<f32>,
        targets: ArrayView2<f32>,
        phase: Phase,
        sink: &mut K,
    ) -> Result<StepReport> {
        let stats = self.run_windowed_pass(inputs, targets, phase)?;
        Ok(self.on_step_end(phase, &stats, sink))
    }

    /// Reports `pred0_count`, `pred1_count` and `auc_avg` for the whole test phase, then resets
    /// the tally.
    pub fn on_test_phase_end<K: MetricSink + ?Sized>(&mut self, sink: &mut K) -> TestSummary {
        let tally = std::mem::take(&mut self.tally);

        let summary = TestSummary {
            pred0_count: tally.pred0,
            pred1_count: tally.pred1,
            steps: tally.steps,
            auc_avg: (tally.steps > 0).then(|| tally.auroc_sum / tally.steps as f32),
        };

        sink.log_scalar("pred0_count", summary.pred0_count as f32);
        sink.log_scalar("pred1_count", summary.pred1_count as f32);

        if let Some(auc_avg) = summary.auc_avg {
            sink.log_scalar("auc_avg", auc_avg);
        }

        info!(
            pred0 = summary.pred0_count,
            pred1 = summary.pred1_count,
            steps = summary.steps;
            "test phase finished"
        );

        summary
    }

    /// Clears the running metrics of a phase.
    pub fn reset_phase(&mut self, phase: Phase) {
        self.metrics[phase.index()].reset();
    }

    /// Returns the running metrics of a phase.
    pub fn metrics(&self, phase: Phase) -> &PhaseMetrics {
        &self.metrics[phase.index()]
    }

    pub fn params(&self) -> &[f32] {
        &self.params
    }

    /// Returns the clipped gradient of the last training window.
    pub fn grad(&self) -> &[f32] {
        &self.grad
    }

    pub fn model(&self) -> &M {
        &self.model
    }

    pub fn optimizer(&self) -> &O {
        &self.optimizer
    }

    pub fn scheduler(&self) -> &S {
        &self.scheduler
    }

    pub fn config(&self) -> &TrainerConfig {
        &self.config
    }

    /// Returns the auxiliary maps of the last window the model saw.
    pub fn last_feature_maps(&self) -> Option<ArrayView3<'_, f32>> {
        self.last_maps.as_ref().map(|m| m.view())
    }

    /// Consumes the trainer, returning the trained parameters.
    pub fn into_params(self) -> Vec<f32> {
        self.params
    }
}

/// Squeezes `[batch, 1]` logits down to `[batch]`.
fn squeeze_logits(logits: Array2<f32>, batch: usize) -> Result<Array1<f32>> {
    let (rows, cols) = logits.dim();

    if rows != batch || cols != 1 {
        return Err(MlErr::SizeMismatch {
            what: "model logits",
            got: logits.len(),
            expected: batch,
        });
    }

    Ok(logits.index_axis_move(Axis(1), 0))
}
