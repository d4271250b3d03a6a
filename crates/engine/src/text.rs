//! Screen-space text providers.

use crate::draw::DrawList;

pub trait TextRenderer: Send {
    fn name(&self) -> &str;

    /// Record `text` with its top-left pen position at (`x`, `y`) in a
    /// `width` x `height` pixel viewport; `scale` multiplies glyph metrics.
    #[allow(clippy::too_many_arguments)]
    fn render_text(
        &self,
        text: &str,
        scale: f32,
        x: f32,
        y: f32,
        width: f32,
        height: f32,
        list: &mut DrawList,
    );
}

/// Holds registered providers; the most recent registration is active.
#[derive(Default)]
pub struct TextRenderingService {
    providers: Vec<Box<dyn TextRenderer>>,
}

impl TextRenderingService {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register_provider(&mut self, provider: Box<dyn TextRenderer>) {
        log::info!("Registered text provider '{}'", provider.name());
        self.providers.push(provider);
    }

    pub fn provider(&self) -> Option<&dyn TextRenderer> {
        self.providers.last().map(|p| p.as_ref())
    }

    pub fn has_provider(&self) -> bool {
        !self.providers.is_empty()
    }

    /// Forward to the active provider. Returns `false` if none is registered.
    #[allow(clippy::too_many_arguments)]
    pub fn render_text(
        &self,
        text: &str,
        scale: f32,
        x: f32,
        y: f32,
        width: f32,
        height: f32,
        list: &mut DrawList,
    ) -> bool {
        match self.provider() {
            Some(provider) => {
                provider.render_text(text, scale, x, y, width, height, list);
                true
            }
            None => false,
        }
    }
}
