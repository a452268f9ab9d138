//! Fitting driver: initialisation, Markov chain blocks until the chain
//! is stationary, the sweep over block counts, and the final sampling run.
//!
//! 1. **Initialisation**: uniform random assignment, optionally refined
//!    by the greedy optimizer.
//! 2. **Burn-in**: Metropolis-Hastings steps in blocks of `block_size`
//!    until the entropy criterion reports a stationary chain.
//! 3. **Selection** (when K is not given): steps 1-2 for every candidate
//!    K, keeping the minimum-AIC model.
//! 4. **Sampling**: `num_samples` more steps from the selected model, or
//!    steps until a stop is requested when `num_samples <= 0`.
//!
//! Interrupts are only looked at between completed steps.

use crate::blockmodel::Blockmodel;
use crate::graph::UndirectedGraph;
use crate::greedy::{GreedyStrategy, DEFAULT_MAX_STEPS};
use crate::metropolis::MetropolisHastingsStrategy;
use crate::selection::{aic, bic, CandidateScore, ModelSelection};
use log::{debug, info};
use mcmc_util::chain::SampleBlock;
use mcmc_util::convergence::{EntropyConvergenceCriterion, DEFAULT_THRESHOLD, MIN_SAMPLES};
use mcmc_util::traits::ConvergenceCriterion;
use rand::rngs::SmallRng;
use rand::SeedableRng;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// How the assignment is initialised before sampling
#[derive(clap::ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum InitMethod {
    /// uniform random assignment refined by greedy optimization
    Greedy,
    /// uniform random assignment
    Random,
}

/// Options for fitting.
#[derive(Debug, Clone)]
pub struct FitOptions {
    /// Number of blocks; `None` sweeps candidates and selects by AIC. Default: None
    pub num_groups: Option<usize>,
    /// Largest K tried by the sweep; `None` means `floor(sqrt(n))`. Default: None
    pub max_groups: Option<usize>,
    /// Steps in the final sampling run; `<= 0` runs until stopped. Default: 100000
    pub num_samples: i64,
    /// Steps per convergence-check block. Default: 65536
    pub block_size: usize,
    /// Initialisation. Default: greedy
    pub init_method: InitMethod,
    /// Steps between progress lines. Default: 8192
    pub log_period: usize,
    /// Random seed. Default: 42
    pub seed: u64,
    /// Cap on greedy steps. Default: 1000
    pub greedy_max_steps: usize,
    /// Jensen-Shannon divergence below which a block counts as stationary. Default: 0.05
    pub convergence_threshold: f64,
}

impl Default for FitOptions {
    fn default() -> Self {
        FitOptions {
            num_groups: None,
            max_groups: None,
            num_samples: 100_000,
            block_size: 65_536,
            init_method: InitMethod::Greedy,
            log_period: 8192,
            seed: 42,
            greedy_max_steps: DEFAULT_MAX_STEPS,
            convergence_threshold: DEFAULT_THRESHOLD,
        }
    }
}

impl FitOptions {
    /// Reject settings that cannot run before any work starts
    pub fn validate(&self) -> anyhow::Result<()> {
        if self.num_groups == Some(0) {
            return Err(anyhow::anyhow!("the number of groups must be positive"));
        }
        if self.max_groups == Some(0) {
            return Err(anyhow::anyhow!("the maximum number of groups must be positive"));
        }
        if self.block_size < MIN_SAMPLES {
            return Err(anyhow::anyhow!(
                "block size must be at least {} to judge convergence",
                MIN_SAMPLES
            ));
        }
        if self.log_period == 0 {
            return Err(anyhow::anyhow!("log period must be positive"));
        }
        if self.greedy_max_steps == 0 {
            return Err(anyhow::anyhow!("greedy step cap must be positive"));
        }
        if !(self.convergence_threshold > 0.0) {
            return Err(anyhow::anyhow!("convergence threshold must be positive"));
        }
        Ok(())
    }
}

/// Flags raised from outside the sampling loop (e.g. signal handlers)
#[derive(Debug, Clone, Default)]
pub struct Interrupts {
    dump: Arc<AtomicBool>,
    stop: Arc<AtomicBool>,
}

impl Interrupts {
    pub fn new() -> Self {
        Self::default()
    }

    /// Flag that requests a dump of the best model so far
    pub fn dump_flag(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.dump)
    }

    /// Flag that requests sampling to end early
    pub fn stop_flag(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.stop)
    }

    pub fn request_dump(&self) {
        self.dump.store(true, Ordering::SeqCst);
    }

    pub fn request_stop(&self) {
        self.stop.store(true, Ordering::SeqCst);
    }

    /// Consume a pending dump request
    pub fn take_dump_request(&self) -> bool {
        self.dump.swap(false, Ordering::SeqCst)
    }

    pub fn stop_requested(&self) -> bool {
        self.stop.load(Ordering::SeqCst)
    }
}

/// Result of a fit
#[derive(Debug, Clone)]
pub struct FitOutcome<'g> {
    /// Highest-likelihood model of the selected block count
    pub model: Blockmodel<'g>,
    /// One entry per fitted candidate K
    pub scores: Vec<CandidateScore>,
    /// Whether a stop request cut the run short
    pub interrupted: bool,
}

/// Called with the best model so far whenever a dump is requested
pub type DumpFn<'a, 'g> = dyn FnMut(&Blockmodel<'g>) -> anyhow::Result<()> + 'a;

/// Fits blockmodels to one graph.
///
/// # Usage
///
/// ```ignore
/// let options = FitOptions::default();
/// let interrupts = Interrupts::new();
/// let mut on_dump = |model: &Blockmodel| writer.write(model, &mut out);
/// let mut fitter = BlockmodelFitter::new(&graph, options, interrupts, &mut on_dump)?;
/// let outcome = fitter.fit()?;
/// ```
pub struct BlockmodelFitter<'g, 'a> {
    graph: &'g UndirectedGraph,
    options: FitOptions,
    interrupts: Interrupts,
    on_dump: &'a mut DumpFn<'a, 'g>,
}

impl<'g, 'a> BlockmodelFitter<'g, 'a> {
    pub fn new(
        graph: &'g UndirectedGraph,
        options: FitOptions,
        interrupts: Interrupts,
        on_dump: &'a mut DumpFn<'a, 'g>,
    ) -> anyhow::Result<Self> {
        options.validate()?;
        if graph.num_vertices() == 0 {
            return Err(anyhow::anyhow!("the graph has no vertices"));
        }
        Ok(BlockmodelFitter {
            graph,
            options,
            interrupts,
            on_dump,
        })
    }

    pub fn options(&self) -> &FitOptions {
        &self.options
    }

    /// Run the whole procedure and return the best model
    pub fn fit(&mut self) -> anyhow::Result<FitOutcome<'g>> {
        let rng = SmallRng::seed_from_u64(self.options.seed);
        debug!("using random seed: {}", self.options.seed);

        let (selected, rng, scores) = match self.options.num_groups {
            Some(k) => {
                let (model, rng) = self.fit_for_group_count(k, rng)?;
                let score = CandidateScore::of(&model);
                info!("AIC = {:.4}, BIC = {:.4}", score.aic, score.bic);
                (model, rng, vec![score])
            }
            None => self.select_group_count(rng)?,
        };

        if self.interrupts.stop_requested() {
            return Ok(FitOutcome {
                model: selected,
                scores,
                interrupted: true,
            });
        }

        let mut sampler = MetropolisHastingsStrategy::new(rng);
        let mut model = selected;
        sampler.observe(&model);

        let completed = if self.options.num_samples > 0 {
            info!(
                "convergence condition satisfied, taking {} samples",
                self.options.num_samples
            );
            self.run_samples(&mut sampler, &mut model, self.options.num_samples as usize)?
        } else {
            info!("convergence condition satisfied, leaving the chain running until stopped");
            self.run_until_stopped(&mut sampler, &mut model)?;
            true
        };

        let best = sampler.take_best().unwrap_or(model);
        info!(
            "best log-likelihood {:.4} with {} types (AIC = {:.4}, BIC = {:.4})",
            best.log_likelihood(),
            best.num_types(),
            aic(&best),
            bic(&best)
        );

        Ok(FitOutcome {
            model: best,
            scores,
            interrupted: !completed || self.interrupts.stop_requested(),
        })
    }

    /// Fit every candidate K and keep the minimum-AIC model
    fn select_group_count(
        &mut self,
        mut rng: SmallRng,
    ) -> anyhow::Result<(Blockmodel<'g>, SmallRng, Vec<CandidateScore>)> {
        let mut selection = ModelSelection::new(self.graph.num_vertices(), self.options.max_groups);

        while let Some(k) = selection.next_candidate() {
            info!("trying with {} types", k);
            let (model, next_rng) = self.fit_for_group_count(k, rng)?;
            rng = next_rng;
            selection.record(model);

            if self.interrupts.stop_requested() {
                info!("stop requested, skipping the remaining candidates");
                break;
            }
        }

        let scores = selection.scores().to_vec();
        let best = selection
            .into_best()
            .ok_or_else(|| anyhow::anyhow!("no candidate model was fitted"))?;
        Ok((best, rng, scores))
    }

    /// Initialise a K-block model and run the chain until it is
    /// stationary. Returns the best model seen and the random stream.
    pub fn fit_for_group_count(
        &mut self,
        k: usize,
        rng: SmallRng,
    ) -> anyhow::Result<(Blockmodel<'g>, SmallRng)> {
        let mut sampler = MetropolisHastingsStrategy::new(rng);
        let mut model = Blockmodel::new(self.graph, k)?;
        model.randomize(sampler.rng_mut());

        if self.options.init_method == InitMethod::Greedy {
            info!("running greedy initialization");
            let mut greedy = GreedyStrategy::new(self.options.greedy_max_steps);
            let steps = greedy.optimize(&mut model);
            info!(
                "[{:>6}] ({:>2}) {:>12.4} after greedy initialization",
                steps,
                k,
                model.log_likelihood()
            );
        }
        sampler.observe(&model);

        info!("starting Markov chain");
        let mut criterion = EntropyConvergenceCriterion::new(self.options.convergence_threshold);
        let mut samples = SampleBlock::with_capacity(self.options.block_size);

        loop {
            let completed =
                self.run_block(&mut sampler, &mut model, self.options.block_size, &mut samples)?;
            if !completed {
                break;
            }

            let converged = criterion.check(samples.as_slice());
            let report = criterion.report();
            if !report.is_empty() {
                debug!("{}", report);
            }
            if converged {
                break;
            }
        }

        let best = sampler.take_best().unwrap_or(model);
        Ok((best, sampler.into_rng()))
    }

    /// `num_samples` more steps, in blocks of at most `block_size`.
    /// Returns `false` when a stop request ended the run early.
    fn run_samples(
        &mut self,
        sampler: &mut MetropolisHastingsStrategy<'g>,
        model: &mut Blockmodel<'g>,
        num_samples: usize,
    ) -> anyhow::Result<bool> {
        let mut samples = SampleBlock::with_capacity(self.options.block_size.min(num_samples));
        let mut remaining = num_samples;
        while remaining > 0 {
            let num_steps = remaining.min(self.options.block_size);
            if !self.run_block(sampler, model, num_steps, &mut samples)? {
                return Ok(false);
            }
            remaining -= num_steps;
        }
        Ok(true)
    }

    fn run_until_stopped(
        &mut self,
        sampler: &mut MetropolisHastingsStrategy<'g>,
        model: &mut Blockmodel<'g>,
    ) -> anyhow::Result<()> {
        #[cfg(unix)]
        info!("send SIGUSR1 to dump the current best state, SIGINT or SIGTERM to finish");

        let mut samples = SampleBlock::with_capacity(self.options.block_size);
        while self.run_block(sampler, model, self.options.block_size, &mut samples)? {}
        Ok(())
    }

    /// Take `num_steps` chain steps, collecting log-likelihoods into
    /// `samples`. Returns `false` when a stop request ended the block early.
    fn run_block(
        &mut self,
        sampler: &mut MetropolisHastingsStrategy<'g>,
        model: &mut Blockmodel<'g>,
        num_steps: usize,
        samples: &mut SampleBlock,
    ) -> anyhow::Result<bool> {
        samples.clear();

        for _ in 0..num_steps {
            if self.interrupts.stop_requested() {
                return Ok(false);
            }

            sampler.step(model);
            let log_l = model.log_likelihood();
            samples.push(log_l);

            if sampler.step_count() % self.options.log_period == 0 {
                info!(
                    "[{:>6}] ({:>2}) {:>12.4}\t({:.4})\t{}{:>8.4}",
                    sampler.step_count(),
                    model.num_types(),
                    log_l,
                    sampler.best_log_likelihood(),
                    if sampler.last_proposal_accepted() { '*' } else { ' ' },
                    sampler.acceptance_ratio()
                );
            }

            if self.interrupts.take_dump_request() {
                info!("dumping best state of the chain");
                let best = sampler.best_model().unwrap_or(&*model);
                (self.on_dump)(best)?;
            }
        }

        let drift = model.recompute();
        if drift > 1e-6 {
            debug!("recalibrated log-likelihood (drift {:.3e})", drift);
        }
        Ok(true)
    }
}
