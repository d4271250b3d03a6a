//! Entry point for the Nova3D viewer: loads plugins, then the models named
//! on the command line.

mod config;

use std::path::Path;

use anyhow::{Context, Result};
use asset::{FontFace, GlyphAtlas};
use corelib::transform::Transform;
use corelib::vec3;
use engine::Application;

use crate::config::AppConfig;

/// Gap between neighbouring models, in world units.
const MODEL_SPACING: f32 = 2.5;

/// Models are laid out along X, centred on the origin.
fn model_transform(index: usize, count: usize) -> Transform {
    let offset = index as f32 - (count.saturating_sub(1)) as f32 / 2.0;
    Transform::from_translation(vec3(offset * MODEL_SPACING, 0.0, 0.0))
}

fn dump_atlas(font: &Path, pixel_size: u32, out: &Path) -> Result<()> {
    let face = FontFace::load(font, pixel_size)?;
    let atlas = GlyphAtlas::pack(&face.rasterize_ascii())?;
    atlas.texture.save_png(out)?;
    log::info!(
        "Wrote {}x{} atlas with {} glyphs to {}",
        atlas.width(),
        atlas.height(),
        atlas.glyphs.len(),
        out.display()
    );
    Ok(())
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let cfg = AppConfig::from_env()?;
    log::info!(
        "Starting Nova3D. Backend: {:?}, window_size={}x{}, models={}",
        cfg.backends,
        cfg.width,
        cfg.height,
        cfg.models.len()
    );

    if let Some(out) = &cfg.dump_atlas {
        return dump_atlas(&cfg.settings.font_path, cfg.settings.font_size, out);
    }

    let mut app = Application::new(cfg.settings.clone());
    let plugin_dir = cfg.plugin_dir()?;
    engine::plugin::load_plugin_dir(&mut app, &plugin_dir);
    if app.renderable_manager().is_empty() {
        log::warn!("No renderable factories registered; models cannot be loaded");
    }

    for (i, path) in cfg.models.iter().enumerate() {
        let transform = model_transform(i, cfg.models.len());
        if let Err(err) = app.load_model(path, transform) {
            log::error!("{:#}", anyhow::Error::new(err));
        }
    }

    platform::run(
        app,
        platform::RunConfig {
            width: cfg.width,
            height: cfg.height,
            backends: cfg.backends,
            overlay: cfg.overlay,
            ..Default::default()
        },
    )
    .context("viewer stopped")?;

    log::info!("Graceful shutdown. Bye!");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn models_are_centred_along_x() {
        assert_eq!(model_transform(0, 1).translation, corelib::Vec3::ZERO);
        assert_eq!(model_transform(0, 2).translation.x, -MODEL_SPACING / 2.0);
        assert_eq!(model_transform(1, 2).translation.x, MODEL_SPACING / 2.0);
        assert_eq!(model_transform(1, 3).translation.x, 0.0);
    }
}
