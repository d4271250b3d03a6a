//! Command-line configuration. Flags use the `--key=value` form.
//!
//! ```text
//! --gpu-backend=auto|vulkan|dx12|metal|gl
//! --size=WxH | --width=N --height=N
//! --model=PATH            (repeatable; bare arguments are models too)
//! --font=PATH --font-size=N
//! --plugin-dir=PATH       (default: next to the executable)
//! --overlay[=on|off]
//! --dump-atlas=PATH       (write the glyph atlas as PNG and exit)
//! ```

use std::path::PathBuf;

use anyhow::{Context, Result, bail};
use engine::EngineSettings;

#[derive(Clone, Debug, PartialEq)]
pub struct AppConfig {
    pub backends: wgpu::Backends,
    pub width: u32,
    pub height: u32,
    pub models: Vec<PathBuf>,
    pub settings: EngineSettings,
    pub plugin_dir: Option<PathBuf>,
    pub overlay: bool,
    pub dump_atlas: Option<PathBuf>,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            backends: wgpu::Backends::all(),
            width: 1280,
            height: 720,
            models: Vec::new(),
            settings: EngineSettings::default(),
            plugin_dir: None,
            overlay: true,
            dump_atlas: None,
        }
    }
}

impl AppConfig {
    pub fn from_env() -> Result<Self> {
        Self::parse(std::env::args().skip(1))
    }

    /// Parse arguments, program name excluded.
    pub fn parse<I, S>(args: I) -> Result<Self>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut cfg = Self::default();
        for arg in args {
            let arg = arg.as_ref();
            let Some(flag) = arg.strip_prefix("--") else {
                cfg.models.push(PathBuf::from(arg));
                continue;
            };
            let (key, value) = match flag.split_once('=') {
                Some((k, v)) => (k, Some(v)),
                None => (flag, None),
            };

            match (key, value) {
                ("gpu-backend", Some(v)) => cfg.backends = parse_backend(v),
                ("size", Some(v)) => {
                    let (w, h) = parse_size(v).with_context(|| format!("bad --size '{v}'"))?;
                    cfg.width = w;
                    cfg.height = h;
                }
                ("width", Some(v)) => cfg.width = parse_dim(key, v)?,
                ("height", Some(v)) => cfg.height = parse_dim(key, v)?,
                ("model", Some(v)) => cfg.models.push(PathBuf::from(v)),
                ("font", Some(v)) => cfg.settings.font_path = PathBuf::from(v),
                ("font-size", Some(v)) => cfg.settings.font_size = parse_dim(key, v)?,
                ("plugin-dir", Some(v)) => cfg.plugin_dir = Some(PathBuf::from(v)),
                ("overlay", None) => cfg.overlay = true,
                ("overlay", Some(v)) => cfg.overlay = parse_switch(v),
                ("dump-atlas", Some(v)) => cfg.dump_atlas = Some(PathBuf::from(v)),
                _ => log::warn!("Ignoring unknown argument '{}'", arg),
            }
        }
        Ok(cfg)
    }

    /// Where plugins are loaded from.
    pub fn plugin_dir(&self) -> Result<PathBuf> {
        if let Some(dir) = &self.plugin_dir {
            return Ok(dir.clone());
        }
        let exe = std::env::current_exe().context("cannot locate executable")?;
        exe.parent()
            .map(PathBuf::from)
            .context("executable has no parent directory")
    }
}

fn parse_backend(val: &str) -> wgpu::Backends {
    match val.to_ascii_lowercase().as_str() {
        "auto" => wgpu::Backends::all(),
        "vulkan" | "vk" => wgpu::Backends::VULKAN,
        "dx12" | "d3d12" => wgpu::Backends::DX12,
        "metal" | "mtl" => wgpu::Backends::METAL,
        "gl" | "opengl" | "gles" => wgpu::Backends::GL,
        other => {
            log::warn!("Unknown backend '{}', falling back to auto.", other);
            wgpu::Backends::all()
        }
    }
}

fn parse_size(v: &str) -> Option<(u32, u32)> {
    let (w, h) = v.split_once('x').or_else(|| v.split_once('X'))?;
    let w = w.parse::<u32>().ok()?;
    let h = h.parse::<u32>().ok()?;
    (w > 0 && h > 0).then_some((w, h))
}

fn parse_dim(key: &str, v: &str) -> Result<u32> {
    match v.parse::<u32>() {
        Ok(n) if n > 0 => Ok(n),
        _ => bail!("--{key} expects a positive integer, got '{v}'"),
    }
}

fn parse_switch(v: &str) -> bool {
    matches!(v.to_ascii_lowercase().as_str(), "1" | "true" | "on" | "yes")
}
