//! Effect precaching.
//!
//! Every (wallpaper, effect) pair maps to one artifact path under the cache
//! directory. An artifact that exists is considered fresh; `force` re-renders it.

use std::collections::BTreeSet;
use std::path::{Path, PathBuf};
use tokio::task::JoinSet;

use crate::catalog::{Catalog, Wallpaper};
use crate::command::{self, INPUT_PLACEHOLDER, OUTPUT_PLACEHOLDER};
use crate::effects::EffectRegistry;
use crate::error::{ErrorReporting, PrecacheError, WallsError};
use crate::storage::{self, artifact_path};
use crate::Result;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EffectOutcome {
    /// The artifact was already on disk
    Cached,
    /// The effect command ran and exited successfully
    Rendered,
}

/// Result of a best-effort batch precache.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct PrecacheReport {
    pub total: usize,
    pub failed: Vec<String>,
}

impl PrecacheReport {
    pub fn is_success(&self) -> bool {
        self.failed.is_empty()
    }
}

#[derive(Debug, Clone)]
pub struct EffectRunner {
    cache_dir: PathBuf,
}

impl EffectRunner {
    pub fn new(cache_dir: impl Into<PathBuf>) -> Self {
        Self {
            cache_dir: cache_dir.into(),
        }
    }

    pub fn cache_dir(&self) -> &Path {
        &self.cache_dir
    }

    pub fn artifact_path(&self, effect: &str, wallpaper: &Wallpaper) -> PathBuf {
        artifact_path(&self.cache_dir, effect, &wallpaper.source_path)
    }

    /// Ensures one effect's artifact exists for `wallpaper`.
    pub async fn precache_effect(
        &self,
        wallpaper: &Wallpaper,
        effect: &str,
        template: &[String],
        force: bool,
    ) -> Result<EffectOutcome> {
        let output_path = self.artifact_path(effect, wallpaper);
        if let Some(effect_dir) = output_path.parent() {
            storage::create_dir(effect_dir)?;
        }

        if storage::artifact_exists(&output_path)? {
            if !force {
                log::debug!("effect {} already applied to {}, skipping", effect, wallpaper.id);
                return Ok(EffectOutcome::Cached);
            }
            log::debug!("overwriting effect {} for {}", effect, wallpaper.id);
        } else {
            log::debug!("applying effect {} for {}", effect, wallpaper.id);
        }

        let input = wallpaper.source_path.to_string_lossy();
        let output = output_path.to_string_lossy();
        let argv = command::substitute(
            template,
            &[(INPUT_PLACEHOLDER, input.as_ref()), (OUTPUT_PLACEHOLDER, output.as_ref())],
        );

        command::run(&argv).await?;
        Ok(EffectOutcome::Rendered)
    }

    /// Applies every registered effect to `wallpaper` concurrently.
    ///
    /// All effects are attempted; the call fails if any of them failed.
    pub async fn precache_wallpaper(
        &self,
        wallpaper: &Wallpaper,
        registry: &EffectRegistry,
        force: bool,
    ) -> Result<()> {
        let mut tasks = JoinSet::new();
        for (effect, template) in registry.iter() {
            let runner = self.clone();
            let wallpaper = wallpaper.clone();
            let effect = effect.to_string();
            let template = template.to_vec();
            tasks.spawn(async move {
                let result = runner
                    .precache_effect(&wallpaper, &effect, &template, force)
                    .await;
                (effect, result)
            });
        }

        let total = tasks.len();
        let mut failed = 0;
        while let Some(joined) = tasks.join_next().await {
            match joined {
                Ok((_, Ok(_))) => {}
                Ok((effect, Err(e))) => {
                    e.log_error(&format!("applying effect {} to {}", effect, wallpaper.id));
                    failed += 1;
                }
                Err(e) => {
                    log::error!("effect task for {} did not complete: {}", wallpaper.id, e);
                    failed += 1;
                }
            }
        }

        if failed > 0 {
            return Err(WallsError::Precache(PrecacheError::EffectsFailed {
                id: wallpaper.id.clone(),
                failed,
                total,
            }));
        }
        Ok(())
    }

    pub async fn precache_one(
        &self,
        catalog: &Catalog,
        id: &str,
        registry: &EffectRegistry,
        force: bool,
    ) -> Result<()> {
        let wallpaper = catalog.find(id)?;
        self.precache_wallpaper(wallpaper, registry, force).await
    }

    /// Precaches every wallpaper concurrently. Failures are logged and
    /// reported but never abort the batch.
    pub async fn precache_all(
        &self,
        catalog: &Catalog,
        registry: &EffectRegistry,
        force: bool,
    ) -> PrecacheReport {
        log::info!(
            "precaching {} wallpapers with {} effects...",
            catalog.len(),
            registry.len()
        );

        let mut tasks = JoinSet::new();
        for wallpaper in catalog.wallpapers() {
            let runner = self.clone();
            let wallpaper = wallpaper.clone();
            let registry = registry.clone();
            tasks.spawn(async move {
                let result = runner.precache_wallpaper(&wallpaper, &registry, force).await;
                (wallpaper.id, result)
            });
        }

        let pending = catalog.wallpapers().iter().map(|wp| wp.id.clone()).collect();
        let report = gather(tasks, pending).await;

        log::info!("precaching complete");
        report
    }
}

/// Drains per-wallpaper tasks into a report. A wallpaper whose task never
/// reported back (panicked or aborted) counts as failed.
async fn gather(
    mut tasks: JoinSet<(String, Result<()>)>,
    mut pending: BTreeSet<String>,
) -> PrecacheReport {
    let mut report = PrecacheReport {
        total: pending.len(),
        failed: Vec::new(),
    };
    while let Some(joined) = tasks.join_next().await {
        match joined {
            Ok((id, result)) => {
                pending.remove(&id);
                if let Err(e) = result {
                    e.log_error(&format!("precaching wallpaper {}", id));
                    report.failed.push(id);
                }
            }
            Err(e) => {
                log::error!("precache task did not complete: {}", e);
            }
        }
    }
    report.failed.extend(pending);
    report.failed.sort();
    report
}
