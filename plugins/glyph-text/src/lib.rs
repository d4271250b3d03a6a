//! Bitmap-font text plugin: rasterizes a font into a glyph atlas at
//! registration and draws text as textured quads.

mod layout;
mod renderer;

use anyhow::Context;
use engine::{Application, PluginError};

pub use layout::layout_text;
pub use renderer::GlyphTextRenderer;

pub fn register(app: &mut Application) -> Result<(), PluginError> {
    let settings = app.settings().clone();
    let renderer = GlyphTextRenderer::load(&settings.font_path, settings.font_size)
        .with_context(|| format!("text provider needs font {}", settings.font_path.display()))?;
    app.text_rendering_mut()
        .register_provider(Box::new(renderer));
    Ok(())
}

engine::export_plugin!(register);

#[cfg(test)]
mod tests {
    use super::*;
    use engine::{API_VERSION, EngineSettings};

    #[test]
    fn missing_font_fails_registration_without_provider() {
        let mut app = Application::new(EngineSettings {
            font_path: "fonts/missing.ttf".into(),
            font_size: 12,
        });
        let err = app
            .register_static("glyph_text", get_engine_version(), register)
            .unwrap_err();
        assert!(err.to_string().contains("missing.ttf"));
        assert!(!app.text_rendering().has_provider());
        assert_eq!(get_engine_version(), API_VERSION);
    }

    #[test]
    fn registered_font_serves_application_text() {
        let mut app = Application::new(EngineSettings {
            font_path: concat!(env!("CARGO_MANIFEST_DIR"), "/../../crates/asset/testdata/DejaVuSans.ttf").into(),
            font_size: 16,
        });
        app.register_static("glyph_text", get_engine_version(), register)
            .unwrap();
        assert!(app.text_rendering().has_provider());

        let mut list = engine::DrawList::new();
        assert!(app.draw_text("objects: 3", 1.0, 10.0, 10.0, &mut list));
        assert_eq!(list.len(), 1);
    }
}
