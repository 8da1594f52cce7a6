use anyhow::{bail, Result};
use serde::Serialize;
use std::collections::BTreeMap;
use std::path::Path;
use walls_common::{
    add_directory, add_wallpaper, delete_wallpaper, Catalog, EffectRegistry, EffectRunner,
    ErrorReporting, HeaderProbe, SetRule, StorageLayout, SystemProcesses, Wallpaper,
    WallpaperSetter, WallsError,
};
use walls_config::Config;

/// Converts a library error into the message shown to the user.
pub fn report(e: WallsError) -> anyhow::Error {
    log::debug!("{:?}", e);
    anyhow::anyhow!(e.user_friendly_message())
}

/// Everything a command needs, loaded once per invocation.
pub struct Context {
    pub config: Config,
    pub layout: StorageLayout,
    pub catalog: Catalog,
    pub registry: EffectRegistry,
    pub rules: Vec<SetRule>,
}

impl Context {
    pub fn load(config_path: &Path) -> Result<Self> {
        let config = Config::load(config_path).map_err(report)?;
        let layout = config.storage_layout();
        layout.create_dirs().map_err(report)?;
        let catalog = Catalog::load(&layout.store_file()).map_err(report)?;
        let registry = config.effect_registry().map_err(report)?;
        let rules = config.set_rules();

        log::debug!(
            "{} wallpapers, {} effects, {} set rules",
            catalog.len(),
            registry.len(),
            rules.len()
        );

        Ok(Self {
            config,
            layout,
            catalog,
            registry,
            rules,
        })
    }

    fn runner(&self) -> EffectRunner {
        EffectRunner::new(self.layout.cache.clone())
    }

    fn save(&self) -> Result<()> {
        self.catalog.save(&self.layout.store_file()).map_err(report)
    }
}

pub async fn add(ctx: &mut Context, path: &Path, id: Option<&str>, precache: bool) -> Result<()> {
    let added = if path.is_dir() {
        if id.is_some() {
            log::warn!("--id is ignored when adding a directory");
        }
        add_directory(&mut ctx.catalog, &ctx.layout, &HeaderProbe, path).map_err(report)?
    } else {
        vec![add_wallpaper(&mut ctx.catalog, &ctx.layout, &HeaderProbe, path, id).map_err(report)?]
    };
    ctx.save()?;

    for wallpaper in &added {
        println!("Added {}", wallpaper.id);
    }

    if !precache || ctx.registry.is_empty() {
        return Ok(());
    }

    let runner = ctx.runner();
    let mut failed = 0;
    for wallpaper in &added {
        if let Err(e) = runner
            .precache_wallpaper(wallpaper, &ctx.registry, false)
            .await
        {
            e.log_error(&format!("precaching {}", wallpaper.id));
            failed += 1;
        }
    }
    if failed > 0 {
        bail!("{} of {} added wallpapers failed to precache", failed, added.len());
    }
    Ok(())
}

pub async fn precache(ctx: &Context, ids: &[String], force: bool, strict: bool) -> Result<()> {
    let runner = ctx.runner();

    if ids.is_empty() {
        let summary = runner.precache_all(&ctx.catalog, &ctx.registry, force).await;
        if !summary.is_success() {
            let message = format!(
                "{} of {} wallpapers failed to precache: {}",
                summary.failed.len(),
                summary.total,
                summary.failed.join(", ")
            );
            if strict {
                bail!(message);
            }
            log::warn!("{}", message);
        }
        return Ok(());
    }

    for id in ids {
        runner
            .precache_one(&ctx.catalog, id, &ctx.registry, force)
            .await
            .map_err(report)?;
        log::info!("precached {}", id);
    }
    Ok(())
}

#[derive(Debug, Serialize)]
struct WallpaperView<'a> {
    id: &'a str,
    path: &'a Path,
    original: &'a str,
    resolution: String,
    #[serde(rename = "type")]
    mime_type: &'a str,
    enabled: bool,
    tags: &'a BTreeMap<String, String>,
    /// Effect name to whether its artifact is on disk
    effects: BTreeMap<&'a str, bool>,
}

impl<'a> WallpaperView<'a> {
    fn new(wallpaper: &'a Wallpaper, registry: &'a EffectRegistry, layout: &StorageLayout) -> Self {
        let effects = registry
            .names()
            .map(|effect| (effect, layout.artifact_path(effect, wallpaper).exists()))
            .collect();

        Self {
            id: &wallpaper.id,
            path: &wallpaper.source_path,
            original: &wallpaper.original_filename,
            resolution: wallpaper.resolution.to_string(),
            mime_type: &wallpaper.mime_type,
            enabled: wallpaper.enabled,
            tags: &wallpaper.tags,
            effects,
        }
    }
}

fn render_long(view: &WallpaperView<'_>) -> String {
    let mut out = format!(
        "{}\n  path: {}\n  original: {}\n  resolution: {}\n  type: {}\n  enabled: {}",
        view.id,
        view.path.display(),
        view.original,
        view.resolution,
        view.mime_type,
        view.enabled
    );
    if !view.tags.is_empty() {
        let tags: Vec<String> = view
            .tags
            .iter()
            .map(|(key, value)| {
                if value.is_empty() {
                    key.clone()
                } else {
                    format!("{}={}", key, value)
                }
            })
            .collect();
        out.push_str(&format!("\n  tags: {}", tags.join(", ")));
    }
    for (effect, cached) in &view.effects {
        let status = if *cached { "precached" } else { "not precached" };
        out.push_str(&format!("\n  effect {}: {}", effect, status));
    }
    out
}

pub fn list(ctx: &Context, long: bool, json: bool) -> Result<()> {
    let wallpapers = ctx.catalog.wallpapers();

    match (long, json) {
        (false, false) => {
            for wallpaper in wallpapers {
                println!("{}", wallpaper.id);
            }
        }
        (false, true) => {
            let ids: Vec<&str> = wallpapers.iter().map(|wp| wp.id.as_str()).collect();
            println!("{}", serde_json::to_string_pretty(&ids)?);
        }
        (true, json) => {
            let views: Vec<WallpaperView<'_>> = wallpapers
                .iter()
                .map(|wp| WallpaperView::new(wp, &ctx.registry, &ctx.layout))
                .collect();
            if json {
                println!("{}", serde_json::to_string_pretty(&views)?);
            } else {
                let blocks: Vec<String> = views.iter().map(render_long).collect();
                println!("{}", blocks.join("\n\n"));
            }
        }
    }
    Ok(())
}

pub fn delete(ctx: &mut Context, id: &str, force: bool) -> Result<()> {
    let deleted = delete_wallpaper(&mut ctx.catalog, &ctx.layout, &ctx.registry, id, force)
        .map_err(report)?;

    if let Some(wallpaper) = deleted {
        ctx.save()?;
        println!("Deleted {}", wallpaper.id);
    }
    Ok(())
}

pub async fn set(ctx: &Context, id: Option<&str>) -> Result<()> {
    let id = match id {
        Some(id) => id.to_string(),
        None => {
            let current = if ctx.config.behavior.allow_repeat {
                None
            } else {
                ctx.layout.read_current()
            };
            match ctx.catalog.random_enabled(current.as_deref()) {
                Some(wallpaper) => {
                    log::debug!("randomly selected {}", wallpaper.id);
                    wallpaper.id.clone()
                }
                None => bail!("No enabled wallpapers to choose from"),
            }
        }
    };

    let setter = WallpaperSetter::new(ctx.runner(), SystemProcesses);
    setter
        .set_wallpaper(&ctx.catalog, &id, &ctx.registry, &ctx.rules)
        .await
        .map_err(report)?;

    ctx.layout.write_current(&id).map_err(report)?;
    Ok(())
}
