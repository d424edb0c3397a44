use crate::{
    error::Error, harness_configuration::HarnessConfiguration, runner::Runner, scenario::Scenario,
};
use log::{debug, info, warn};
use serde::Serialize;
use std::{
    cmp,
    sync::{
        atomic::{AtomicU64, Ordering},
        Arc,
    },
    time::Duration,
};
use tokio::{sync::watch, task::JoinHandle, time};

/// One segment of a ramping schedule: over `duration`, the pool of virtual
/// users moves linearly towards `target_vus`.
#[derive(Debug, Clone)]
pub struct Stage {
    pub target_vus: usize,
    pub duration: Duration,
}

/// Ramp schedule for a load run, a configuration input kept outside the
/// scenario runner itself.
#[derive(Debug, Clone)]
pub struct LoadProfile {
    stages: Vec<Stage>,
    graceful_stop: Duration,
}

impl LoadProfile {
    pub fn new() -> Self {
        Self {
            stages: Vec::new(),
            graceful_stop: Duration::from_secs(30),
        }
    }

    pub fn stage(mut self, target_vus: usize, duration: Duration) -> Self {
        self.stages.push(Stage {
            target_vus,
            duration,
        });
        self
    }

    /// How long a stopping virtual user may keep running to let its in-flight
    /// iteration finish before it is aborted.
    pub fn graceful_stop(mut self, duration: Duration) -> Self {
        self.graceful_stop = duration;
        self
    }

    pub fn stages(&self) -> &[Stage] {
        &self.stages
    }

    pub fn graceful_stop_duration(&self) -> Duration {
        self.graceful_stop
    }
}

impl Default for LoadProfile {
    fn default() -> Self {
        Self::new()
    }
}

#[derive(Debug, Default)]
struct Counters {
    started: AtomicU64,
    passed: AtomicU64,
    failed: AtomicU64,
}

#[derive(Debug, Clone, Serialize)]
pub struct LoadSummary {
    pub iterations: u64,
    pub passed: u64,
    pub failed: u64,
    pub peak_vus: usize,
}

struct VirtualUser {
    stop: watch::Sender<bool>,
    handle: JoinHandle<()>,
}

/// Drives many isolated scenario runners concurrently following a ramping
/// schedule. Virtual users share no mutable state; each owns its runner and
/// its captured variables.
#[derive(Debug)]
pub struct LoadRunner {
    configuration: HarnessConfiguration,
}

impl LoadRunner {
    pub fn new(configuration: HarnessConfiguration) -> Self {
        Self { configuration }
    }

    pub async fn execute(
        &self,
        profile: &LoadProfile,
        scenario: Arc<Scenario>,
    ) -> Result<LoadSummary, Error> {
        if profile.stages().is_empty() {
            return Err(Error::Configuration(String::from(
                "load profile has no stages",
            )));
        }

        let seeded: Vec<String> = self
            .configuration
            .variables()
            .iter()
            .map(|(name, _)| name.clone())
            .collect();
        scenario.validate(&seeded)?;

        let counters = Arc::new(Counters::default());
        let mut pool: Vec<VirtualUser> = Vec::new();
        let mut draining: Vec<JoinHandle<()>> = Vec::new();
        let mut next_vu_id = 0usize;
        let mut peak_vus = 0usize;
        let mut previous_target = 0usize;

        for stage in profile.stages() {
            info!(
                "load stage: ramping to {} vus over {:?}",
                stage.target_vus, stage.duration
            );

            let ticks = cmp::max(1, stage.duration.as_secs()) as u32;
            let per_tick = stage.duration / ticks;

            for tick in 1..=ticks {
                let target = interpolate(previous_target, stage.target_vus, tick, ticks);
                self.scale(
                    &mut pool,
                    &mut draining,
                    &mut next_vu_id,
                    target,
                    &scenario,
                    &counters,
                );
                peak_vus = cmp::max(peak_vus, pool.len());
                time::sleep(per_tick).await;
            }

            previous_target = stage.target_vus;
        }

        self.scale(
            &mut pool,
            &mut draining,
            &mut next_vu_id,
            0,
            &scenario,
            &counters,
        );

        for mut handle in draining {
            if time::timeout(profile.graceful_stop_duration(), &mut handle)
                .await
                .is_err()
            {
                warn!("virtual user exceeded the graceful stop deadline, aborting");
                handle.abort();
            }
        }

        Ok(LoadSummary {
            iterations: counters.started.load(Ordering::SeqCst),
            passed: counters.passed.load(Ordering::SeqCst),
            failed: counters.failed.load(Ordering::SeqCst),
            peak_vus,
        })
    }

    fn scale(
        &self,
        pool: &mut Vec<VirtualUser>,
        draining: &mut Vec<JoinHandle<()>>,
        next_vu_id: &mut usize,
        target: usize,
        scenario: &Arc<Scenario>,
        counters: &Arc<Counters>,
    ) {
        while pool.len() < target {
            pool.push(self.spawn(*next_vu_id, scenario.clone(), counters.clone()));
            *next_vu_id += 1;
        }

        while pool.len() > target {
            // the newest virtual user is told to stop; it finishes its
            // in-flight iteration while draining
            if let Some(virtual_user) = pool.pop() {
                let _ = virtual_user.stop.send(true);
                draining.push(virtual_user.handle);
            }
        }
    }

    fn spawn(
        &self,
        vu_id: usize,
        scenario: Arc<Scenario>,
        counters: Arc<Counters>,
    ) -> VirtualUser {
        let (stop, stop_rx) = watch::channel(false);
        let runner = Runner::new(self.configuration.clone());

        let handle = tokio::spawn(async move {
            debug!("vu {} started", vu_id);

            while !*stop_rx.borrow() {
                // an iteration against an instant transport has no pending
                // await, so give the scheduler a turn between iterations
                tokio::task::yield_now().await;

                counters.started.fetch_add(1, Ordering::SeqCst);
                let report = runner.run(&scenario).await;

                if report.passed() {
                    counters.passed.fetch_add(1, Ordering::SeqCst);
                } else {
                    counters.failed.fetch_add(1, Ordering::SeqCst);
                    if let Some(failure) = &report.failure {
                        warn!("vu {}: iteration failed: {}", vu_id, failure);
                    }
                }
            }

            debug!("vu {} stopped", vu_id);
        });

        VirtualUser { stop, handle }
    }
}

fn interpolate(from: usize, to: usize, tick: u32, ticks: u32) -> usize {
    let progress = f64::from(tick) / f64::from(ticks);
    let from = from as f64;
    let to = to as f64;

    (from + (to - from) * progress).round() as usize
}
