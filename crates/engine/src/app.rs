//! The host object handed to plugins.

use std::path::{Path, PathBuf};

use corelib::camera::Camera;
use corelib::transform::Transform;

use crate::draw::DrawList;
use crate::error::{EngineError, PluginError};
use crate::plugin::{PluginInfo, RegisterFn};
use crate::renderable::RenderableManager;
use crate::scene::{Scene, SceneId};
use crate::shader::ShaderManager;
use crate::text::TextRenderingService;
use crate::world::World;

/// Host-side knobs plugins may read while registering.
#[derive(Clone, Debug, PartialEq)]
pub struct EngineSettings {
    pub font_path: PathBuf,
    pub font_size: u32,
}

impl Default for EngineSettings {
    fn default() -> Self {
        Self {
            font_path: PathBuf::from("fonts/arial.ttf"),
            font_size: 12,
        }
    }
}

pub struct Application {
    settings: EngineSettings,
    world: World,
    shaders: ShaderManager,
    renderables: RenderableManager,
    text: TextRenderingService,
    scene: Scene,
    viewport: (u32, u32),
    plugins: Vec<PluginInfo>,
    // Declared last: objects created by plugin code must drop before the
    // libraries holding that code are unloaded.
    libraries: Vec<libloading::Library>,
}

impl Application {
    pub fn new(settings: EngineSettings) -> Self {
        Self {
            settings,
            world: World::new(Camera::default()),
            shaders: ShaderManager::with_builtins(),
            renderables: RenderableManager::new(),
            text: TextRenderingService::new(),
            scene: Scene::new(),
            viewport: (1280, 720),
            plugins: Vec::new(),
            libraries: Vec::new(),
        }
    }

    pub fn settings(&self) -> &EngineSettings {
        &self.settings
    }

    pub fn world(&self) -> &World {
        &self.world
    }

    pub fn world_mut(&mut self) -> &mut World {
        &mut self.world
    }

    pub fn shader_manager(&self) -> &ShaderManager {
        &self.shaders
    }

    pub fn shader_manager_mut(&mut self) -> &mut ShaderManager {
        &mut self.shaders
    }

    pub fn renderable_manager(&self) -> &RenderableManager {
        &self.renderables
    }

    pub fn renderable_manager_mut(&mut self) -> &mut RenderableManager {
        &mut self.renderables
    }

    pub fn text_rendering(&self) -> &TextRenderingService {
        &self.text
    }

    pub fn text_rendering_mut(&mut self) -> &mut TextRenderingService {
        &mut self.text
    }

    pub fn scene(&self) -> &Scene {
        &self.scene
    }

    pub fn scene_mut(&mut self) -> &mut Scene {
        &mut self.scene
    }

    pub fn plugins(&self) -> &[PluginInfo] {
        &self.plugins
    }

    pub fn has_plugin(&self, name: &str) -> bool {
        self.plugins.iter().any(|p| p.name == name)
    }

    /// Register a plugin linked into the host binary. Applies the same
    /// version check as dynamically loaded plugins.
    pub fn register_static(
        &mut self,
        name: &str,
        version: i32,
        register: RegisterFn,
    ) -> Result<(), PluginError> {
        crate::plugin::check_version(name, version)?;
        if self.has_plugin(name) {
            return Err(PluginError::AlreadyRegistered(name.to_owned()));
        }
        register(self)?;
        self.record_plugin(PluginInfo {
            name: name.to_owned(),
            version,
            path: None,
        });
        Ok(())
    }

    pub(crate) fn record_plugin(&mut self, info: PluginInfo) {
        log::info!("Plugin '{}' registered (API {})", info.name, info.version);
        self.plugins.push(info);
    }

    pub(crate) fn keep_library(&mut self, library: libloading::Library) {
        self.libraries.push(library);
    }

    /// Create a renderable for `path` and add it to the scene.
    pub fn load_model(&mut self, path: &Path, transform: Transform) -> Result<SceneId, EngineError> {
        let renderable = self.renderables.create(path)?;
        let id = self.scene.spawn(renderable, transform);
        log::info!("Loaded {} as object {:?}", path.display(), id);
        Ok(id)
    }

    /// Record the whole scene.
    pub fn draw_scene(&self, list: &mut DrawList) {
        self.scene.draw_all(&self.world, &self.shaders, list);
    }

    /// Record text through the active provider in the current viewport;
    /// `false` if no provider is registered.
    pub fn draw_text(&self, text: &str, scale: f32, x: f32, y: f32, list: &mut DrawList) -> bool {
        let (width, height) = self.viewport;
        self.text
            .render_text(text, scale, x, y, width as f32, height as f32, list)
    }

    pub fn viewport(&self) -> (u32, u32) {
        self.viewport
    }

    /// Track the drawable size; keeps the camera aspect in sync.
    pub fn set_viewport(&mut self, width: u32, height: u32) {
        self.viewport = (width.max(1), height.max(1));
        self.world.set_aspect(width, height);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::draw::DrawContext;
    use crate::renderable::{Renderable, RenderableFactory};
    use crate::text::TextRenderer;

    struct Marker;

    impl Renderable for Marker {
        fn draw(&self, ctx: &DrawContext<'_>, list: &mut DrawList) {
            assert!(ctx.shaders.get(crate::shader::BASIC_MESH_SHADER).is_some());
            list.push(crate::draw::DrawCommand::Text {
                shader: crate::shader::BASIC_TEXT_SHADER.to_owned(),
                atlas: std::sync::Arc::new(asset::GlyphAtlas::pack(&[]).unwrap()),
                uniforms: crate::draw::TextUniforms::new(ctx.world.model_matrix(), corelib::Vec3::ONE),
                vertices: Vec::new(),
            });
        }
    }

    struct MarkerFactory;

    impl RenderableFactory for MarkerFactory {
        fn name(&self) -> &str {
            "marker"
        }
        fn accept_extension(&self, ext: &str) -> bool {
            ext == "mark"
        }
        fn create(&self, _path: &Path) -> anyhow::Result<Box<dyn Renderable>> {
            Ok(Box::new(Marker))
        }
    }

    struct Silent;

    impl TextRenderer for Silent {
        fn name(&self) -> &str {
            "silent"
        }
        fn render_text(&self, _: &str, _: f32, _: f32, _: f32, w: f32, h: f32, _: &mut DrawList) {
            assert_eq!((w, h), (640.0, 480.0));
        }
    }

    #[test]
    fn loaded_models_are_drawn_with_their_transform() {
        let mut app = Application::new(EngineSettings::default());
        app.renderable_manager_mut().add_factory(Box::new(MarkerFactory));
        let offset = corelib::vec3(1.0, 2.0, 3.0);
        let id = app
            .load_model(Path::new("thing.mark"), Transform::from_translation(offset))
            .unwrap();
        assert!(app.scene().is_alive(id));

        let mut list = DrawList::new();
        app.draw_scene(&mut list);
        assert_eq!(list.len(), 1);
        let crate::draw::DrawCommand::Text { uniforms, .. } = &list.commands()[0] else {
            panic!("unexpected command");
        };
        assert_eq!(uniforms.projection[3][..3], offset.to_array());
    }

    #[test]
    fn text_uses_tracked_viewport() {
        let mut app = Application::new(EngineSettings::default());
        let mut list = DrawList::new();
        assert!(!app.draw_text("x", 1.0, 0.0, 0.0, &mut list));

        app.text_rendering_mut().register_provider(Box::new(Silent));
        app.set_viewport(640, 480);
        assert!(app.draw_text("x", 1.0, 0.0, 0.0, &mut list));
        assert!((app.world().camera.aspect - 4.0 / 3.0).abs() < 1e-6);
    }
}
