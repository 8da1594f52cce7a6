use std::path::PathBuf;
use std::time::Duration;

use crate::catalog::{Catalog, Wallpaper};
use crate::command::{self, WALLPAPER_PLACEHOLDER};
use crate::effects::{EffectRegistry, SetRule};
use crate::error::{ValidationError, WallsError};
use crate::precache::EffectRunner;
use crate::process::{matching_pids, ProcessMatcher, Termination};
use crate::storage;
use crate::Result;

/// Time given to a freshly spawned display program before its predecessors
/// are terminated.
pub const SETTLE_DELAY: Duration = Duration::from_millis(500);

#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct SetOutcome {
    /// Pids of the display commands, in rule order
    pub spawned: Vec<u32>,
    /// Pids that received SIGTERM
    pub terminated: Vec<u32>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum SetState {
    Pending,
    RunningRule(usize),
    Done,
    Failed(usize),
}

pub struct WallpaperSetter<M> {
    runner: EffectRunner,
    matcher: M,
    settle_delay: Duration,
}

impl<M: ProcessMatcher> WallpaperSetter<M> {
    pub fn new(runner: EffectRunner, matcher: M) -> Self {
        Self {
            runner,
            matcher,
            settle_delay: SETTLE_DELAY,
        }
    }

    pub fn with_settle_delay(mut self, settle_delay: Duration) -> Self {
        self.settle_delay = settle_delay;
        self
    }

    /// Path a rule should display: the source image, or the artifact of the
    /// rule's effective effect, rendered first if it is missing.
    pub async fn resolve_target(
        &self,
        wallpaper: &Wallpaper,
        rule: &SetRule,
        registry: &EffectRegistry,
    ) -> Result<PathBuf> {
        let Some(effect) = rule.effective_effect(registry) else {
            return Ok(wallpaper.source_path.clone());
        };

        let template = registry.get(effect).ok_or_else(|| {
            WallsError::Validation(ValidationError::UnknownEffect {
                name: effect.to_string(),
            })
        })?;

        let path = self.runner.artifact_path(effect, wallpaper);
        if !storage::artifact_exists(&path)? {
            log::debug!(
                "effect {} not precached for wallpaper {}, precaching...",
                effect,
                wallpaper.id
            );
            self.runner
                .precache_effect(wallpaper, effect, template, false)
                .await?;
        }
        Ok(path)
    }

    /// Runs every set rule for wallpaper `id`, in order, stopping at the first failure.
    pub async fn set_wallpaper(
        &self,
        catalog: &Catalog,
        id: &str,
        registry: &EffectRegistry,
        rules: &[SetRule],
    ) -> Result<SetOutcome> {
        let wallpaper = catalog.find(id)?;
        if rules.is_empty() {
            return Err(WallsError::Validation(ValidationError::NoSetRules));
        }

        let mut state = SetState::Pending;
        log::debug!("set {}: {:?} with {} rules", wallpaper.id, state, rules.len());
        let mut outcome = SetOutcome::default();
        let mut settled = false;

        for (index, rule) in rules.iter().enumerate() {
            state = SetState::RunningRule(index);
            log::debug!("set {}: {:?}", wallpaper.id, state);

            if let Err(e) = self
                .run_rule(wallpaper, rule, registry, &mut settled, &mut outcome)
                .await
            {
                state = SetState::Failed(index);
                log::debug!("set {}: {:?}", wallpaper.id, state);
                return Err(e);
            }
        }

        state = SetState::Done;
        log::debug!("set {}: {:?}", wallpaper.id, state);
        log::info!("wallpaper set to {}", wallpaper.id);
        Ok(outcome)
    }

    async fn run_rule(
        &self,
        wallpaper: &Wallpaper,
        rule: &SetRule,
        registry: &EffectRegistry,
        settled: &mut bool,
        outcome: &mut SetOutcome,
    ) -> Result<()> {
        let target = self.resolve_target(wallpaper, rule, registry).await?;
        let target = target.to_string_lossy();
        let argv = command::substitute(&rule.command, &[(WALLPAPER_PLACEHOLDER, target.as_ref())]);

        let pid = command::spawn_detached(&argv)?;
        log::debug!("started process {}", pid);
        outcome.spawned.push(pid);

        let Some(name) = rule.pkill.as_deref() else {
            return Ok(());
        };

        if !*settled {
            tokio::time::sleep(self.settle_delay).await;
            *settled = true;
        }

        log::debug!("killing processes named {} except for {}", name, pid);
        let processes = self.matcher.list_processes()?;
        for target_pid in matching_pids(&processes, name, pid) {
            match self.matcher.terminate(target_pid)? {
                Termination::Signalled => {
                    log::debug!("killed process {}, exe {}", target_pid, name);
                    outcome.terminated.push(target_pid);
                }
                Termination::AlreadyExited => {}
            }
        }
        Ok(())
    }
}
