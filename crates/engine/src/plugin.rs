//! Plugin ABI and dynamic loading.
//!
//! A plugin is a `cdylib` exporting two unmangled functions:
//!
//! * `get_engine_version() -> i32`, the [`API_VERSION`] it was built against;
//! * `register_plugin(app: *mut Application, logger: *const HostLogger) -> i32`,
//!   returning [`STATUS_OK`] on success.
//!
//! Both are generated by [`export_plugin!`](crate::export_plugin). The host
//! and the plugin must be built by the same compiler from the same engine
//! sources; the version check is what catches a stale plugin.

use std::ffi::OsStr;
use std::path::{Path, PathBuf};

use libloading::{Library, Symbol};

use crate::API_VERSION;
use crate::app::Application;
use crate::error::PluginError;

pub const STATUS_OK: i32 = 0;
pub const STATUS_FAILED: i32 = 1;
pub const STATUS_NULL_HOST: i32 = 2;

const VERSION_SYMBOL: &str = "get_engine_version";
const REGISTER_SYMBOL: &str = "register_plugin";

/// Rust-side registration entry point of a plugin.
pub type RegisterFn = fn(&mut Application) -> Result<(), PluginError>;

type VersionSym = unsafe extern "C" fn() -> i32;
type RegisterSym = unsafe extern "C" fn(*mut Application, *const HostLogger) -> i32;

/// The host's logger, handed to a plugin so its `log` calls reach the same
/// sink. A `cdylib` carries its own copy of the `log` crate statics.
pub struct HostLogger {
    pub logger: &'static dyn log::Log,
    pub level: log::LevelFilter,
}

impl HostLogger {
    pub fn current() -> Self {
        Self {
            logger: log::logger(),
            level: log::max_level(),
        }
    }

    /// Install as this crate copy's logger. A no-op when one is already set,
    /// which is the case for plugins linked into the host.
    pub fn install(&self) {
        if log::set_logger(self.logger).is_ok() {
            log::set_max_level(self.level);
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PluginInfo {
    pub name: String,
    pub version: i32,
    /// `None` for plugins linked into the host.
    pub path: Option<PathBuf>,
}

pub(crate) fn check_version(name: &str, found: i32) -> Result<(), PluginError> {
    if found != API_VERSION {
        return Err(PluginError::VersionMismatch {
            name: name.to_owned(),
            expected: API_VERSION,
            found,
        });
    }
    Ok(())
}

/// Plugin name from a library path: file stem without the `lib` prefix.
pub fn plugin_name(path: &Path) -> String {
    let stem = path
        .file_stem()
        .and_then(OsStr::to_str)
        .unwrap_or("plugin");
    stem.strip_prefix("lib").unwrap_or(stem).to_owned()
}

/// `true` for the platform's shared-library extensions.
pub fn is_plugin_library(path: &Path) -> bool {
    matches!(
        path.extension().and_then(OsStr::to_str),
        Some("so" | "dll" | "dylib")
    )
}

/// Run the registration entry point exported by a plugin: logger first, then
/// the registration itself. Returns one of the `STATUS_*` codes.
///
/// # Safety
///
/// `app` and `logger` must be null or point to live values not otherwise
/// borrowed for the duration of the call.
pub unsafe fn run_exported_registration(
    app: *mut Application,
    logger: *const HostLogger,
    register: RegisterFn,
) -> i32 {
    if let Some(logger) = unsafe { logger.as_ref() } {
        logger.install();
    }
    let Some(app) = (unsafe { app.as_mut() }) else {
        return STATUS_NULL_HOST;
    };
    match register(app) {
        Ok(()) => STATUS_OK,
        Err(err) => {
            log::error!("Plugin registration failed: {err}");
            STATUS_FAILED
        }
    }
}

/// Export the plugin entry points for a registration function.
///
/// ```ignore
/// fn register(app: &mut engine::Application) -> Result<(), engine::PluginError> { Ok(()) }
/// engine::export_plugin!(register);
/// ```
#[macro_export]
macro_rules! export_plugin {
    ($register:path) => {
        #[unsafe(no_mangle)]
        pub extern "C" fn get_engine_version() -> i32 {
            $crate::API_VERSION
        }

        /// # Safety
        ///
        /// Called by the host loader with pointers it owns.
        #[unsafe(no_mangle)]
        #[allow(improper_ctypes_definitions)]
        pub unsafe extern "C" fn register_plugin(
            app: *mut $crate::Application,
            logger: *const $crate::HostLogger,
        ) -> i32 {
            unsafe { $crate::plugin::run_exported_registration(app, logger, $register) }
        }
    };
}

/// Open a plugin library, check its version and let it register.
pub fn load_plugin(app: &mut Application, path: &Path) -> Result<PluginInfo, PluginError> {
    let name = plugin_name(path);
    log::info!("Loading plugin '{}' from {}", name, path.display());
    if app.has_plugin(&name) {
        return Err(PluginError::AlreadyRegistered(name));
    }

    // SAFETY: loading runs the library's initialisers; plugins are trusted
    // code built alongside the host.
    let library = unsafe { Library::new(path) }.map_err(|source| PluginError::Open {
        path: path.to_path_buf(),
        source,
    })?;

    let version = {
        let get_version: Symbol<VersionSym> = unsafe { library.get(VERSION_SYMBOL.as_bytes()) }
            .map_err(|_| PluginError::MissingSymbol {
                path: path.to_path_buf(),
                symbol: VERSION_SYMBOL,
            })?;
        unsafe { get_version() }
    };
    check_version(&name, version)?;

    let status = {
        let register: Symbol<RegisterSym> = unsafe { library.get(REGISTER_SYMBOL.as_bytes()) }
            .map_err(|_| PluginError::MissingSymbol {
                path: path.to_path_buf(),
                symbol: REGISTER_SYMBOL,
            })?;
        let logger = HostLogger::current();
        unsafe { register(app as *mut Application, &logger) }
    };

    // Whatever the plugin registered points into the library; keep it
    // loaded even when registration reports failure.
    app.keep_library(library);
    if status != STATUS_OK {
        return Err(PluginError::RegistrationFailed { name, status });
    }

    let info = PluginInfo {
        name,
        version,
        path: Some(path.to_path_buf()),
    };
    app.record_plugin(info.clone());
    Ok(info)
}

/// Load every plugin library in `dir`, in file-name order. Failures are
/// logged and skipped; a missing directory loads nothing.
pub fn load_plugin_dir(app: &mut Application, dir: &Path) -> Vec<PluginInfo> {
    let entries = match std::fs::read_dir(dir) {
        Ok(entries) => entries,
        Err(err) => {
            log::warn!("Plugin directory {} unavailable: {}", dir.display(), err);
            return Vec::new();
        }
    };

    let mut paths: Vec<PathBuf> = entries
        .filter_map(|entry| entry.ok().map(|e| e.path()))
        .filter(|p| p.is_file() && is_plugin_library(p))
        .collect();
    paths.sort();

    let mut loaded = Vec::new();
    for path in paths {
        match load_plugin(app, &path) {
            Ok(info) => loaded.push(info),
            Err(err) => log::error!("Skipping plugin {}: {}", path.display(), err),
        }
    }
    log::info!("Loaded {} plugin(s) from {}", loaded.len(), dir.display());
    loaded
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::app::EngineSettings;

    fn ok_register(app: &mut Application) -> Result<(), PluginError> {
        app.shader_manager_mut()
            .add("PluginShader", crate::ShaderKind::Mesh, "// empty");
        Ok(())
    }

    fn failing_register(_: &mut Application) -> Result<(), PluginError> {
        Err(PluginError::Setup(anyhow::anyhow!("no font")))
    }

    #[test]
    fn plugin_names_drop_lib_prefix() {
        assert_eq!(plugin_name(Path::new("/x/libmodel_loader.so")), "model_loader");
        assert_eq!(plugin_name(Path::new("glyph_text.dll")), "glyph_text");
    }

    #[test]
    fn only_shared_libraries_are_candidates() {
        assert!(is_plugin_library(Path::new("a.so")));
        assert!(is_plugin_library(Path::new("a.dylib")));
        assert!(!is_plugin_library(Path::new("a.rlib")));
        assert!(!is_plugin_library(Path::new("a")));
    }

    #[test]
    fn version_mismatch_is_rejected() {
        let mut app = Application::new(EngineSettings::default());
        let err = app
            .register_static("stale", API_VERSION + 1, ok_register)
            .unwrap_err();
        assert!(matches!(err, PluginError::VersionMismatch { found, .. } if found == API_VERSION + 1));
        assert!(app.plugins().is_empty());
        assert!(app.shader_manager().get("PluginShader").is_none());
    }

    #[test]
    fn static_registration_runs_once() {
        let mut app = Application::new(EngineSettings::default());
        app.register_static("shaders", API_VERSION, ok_register).unwrap();
        assert!(app.shader_manager().get("PluginShader").is_some());
        assert!(matches!(
            app.register_static("shaders", API_VERSION, ok_register),
            Err(PluginError::AlreadyRegistered(_))
        ));
        assert_eq!(app.plugins().len(), 1);
    }

    #[test]
    fn exported_registration_maps_results_to_status() {
        let mut app = Application::new(EngineSettings::default());
        let logger = HostLogger::current();
        unsafe {
            assert_eq!(run_exported_registration(&mut app, &logger, ok_register), STATUS_OK);
            assert_eq!(
                run_exported_registration(&mut app, &logger, failing_register),
                STATUS_FAILED
            );
            assert_eq!(
                run_exported_registration(std::ptr::null_mut(), &logger, ok_register),
                STATUS_NULL_HOST
            );
        }
    }

    #[test]
    fn missing_directory_loads_nothing() {
        let mut app = Application::new(EngineSettings::default());
        assert!(load_plugin_dir(&mut app, Path::new("/definitely/not/here")).is_empty());
    }

    #[test]
    fn non_library_file_fails_to_open() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("libbroken.so");
        std::fs::write(&path, b"not an elf").unwrap();

        let mut app = Application::new(EngineSettings::default());
        assert!(matches!(
            load_plugin(&mut app, &path),
            Err(PluginError::Open { .. })
        ));
        // The directory scan logs and skips it.
        assert!(load_plugin_dir(&mut app, dir.path()).is_empty());
    }
}
