use super::broker::PluginBroker;
use super::declaration::{PluginDeclaration, DECLARATION_SYMBOL};
use super::listener::{Factory, Listener};
use crate::error::LoadError;
use crate::logger::Logger;
use libloading::Library;
use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;
use tokio::runtime::Handle;
use tracing::info;

/// Builds a [`PluginBroker`] from plugin paths.
///
/// A path is first looked up among the registered factories by name, and
/// otherwise opened as a native plugin module.
pub struct PluginLoader {
    logger: Logger,
    factories: HashMap<String, Factory>,
    queue_capacity: usize,
}

/// A resolved plugin, not yet built
struct Module {
    name: String,
    factory: Factory,
    library: Option<Arc<Library>>,
}

impl PluginLoader {
    pub fn new(logger: Logger) -> Self {
        Self {
            logger,
            factories: HashMap::new(),
            queue_capacity: 1,
        }
    }

    /// Register an in-process factory, loadable by `name`
    /// Closure type: `Fn(Logger) -> anyhow::Result<Box<dyn Listener>>`
    pub fn register<F>(mut self, name: &str, factory: F) -> Self
    where
        F: Fn(Logger) -> anyhow::Result<Box<dyn Listener>> + Send + Sync + 'static,
    {
        self.factories.insert(name.to_string(), Arc::new(factory));
        self
    }

    /// Results each plugin may have queued before sends block ( default: 1 )
    pub fn queue_capacity(mut self, capacity: usize) -> Self {
        self.queue_capacity = capacity.max(1);
        self
    }

    /// Load every plugin in order and start its worker.
    ///
    /// Fails as a whole: if one path cannot be loaded no broker is returned,
    /// and plugins already started see their channel close.
    pub fn load<I, P>(&self, paths: I) -> Result<PluginBroker, LoadError>
    where
        I: IntoIterator<Item = P>,
        P: AsRef<Path>,
    {
        if Handle::try_current().is_err() {
            return Err(LoadError::NoRuntime);
        }

        let mut broker = PluginBroker::new(self.queue_capacity);
        for path in paths {
            let path = path.as_ref();
            let module = self.open(path)?;
            let logger = self.logger.for_plugin(&module.name);

            // render the error while the module that made it is still loaded
            let listener = (module.factory)(logger.clone()).map_err(|err| LoadError::Init {
                path: path.to_path_buf(),
                message: format!("{err:#}"),
            })?;

            info!(plugin = %module.name, path = %path.display(), "plugin loaded");
            broker.add(module.name, listener, module.library, logger);
        }
        broker.seal();

        Ok(broker)
    }

    fn open(&self, path: &Path) -> Result<Module, LoadError> {
        let registered = path
            .to_str()
            .and_then(|name| self.factories.get_key_value(name));

        match registered {
            Some((name, factory)) => Ok(Module {
                name: name.clone(),
                factory: Arc::clone(factory),
                library: None,
            }),
            None => open_library(path),
        }
    }
}

/// Load plugin modules from the filesystem
pub fn load_plugins<I, P>(logger: Logger, paths: I) -> Result<PluginBroker, LoadError>
where
    I: IntoIterator<Item = P>,
    P: AsRef<Path>,
{
    PluginLoader::new(logger).load(paths)
}

fn open_library(path: &Path) -> Result<Module, LoadError> {
    if !path.exists() {
        return Err(LoadError::NotFound {
            path: path.to_path_buf(),
        });
    }

    // SAFETY: loading runs the module's initialisers; plugins are trusted code.
    let library = unsafe { Library::new(path) }.map_err(|source| LoadError::Open {
        path: path.to_path_buf(),
        source,
    })?;

    // SAFETY: `export_plugin!` emits this symbol as a `PluginDeclaration` static.
    let declaration = unsafe {
        library
            .get::<*const PluginDeclaration>(DECLARATION_SYMBOL.as_bytes())
            .map(|symbol| **symbol)
    }
    .map_err(|source| LoadError::MissingDeclaration {
        path: path.to_path_buf(),
        symbol: DECLARATION_SYMBOL,
        source,
    })?;

    if !declaration.is_compatible() {
        return Err(LoadError::Incompatible {
            path: path.to_path_buf(),
            rustc_version: declaration.rustc_version.to_string(),
            core_version: declaration.core_version.to_string(),
        });
    }

    Ok(Module {
        name: declaration.name.to_string(),
        factory: Arc::new(declaration.new),
        library: Some(Arc::new(library)),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::logger::tests::Captured;
    use crate::plugin::broker::tests::{drain, Recorder};
    use crate::result::tests::sample;
    use std::path::PathBuf;
    use std::process::Command;
    use std::time::Duration;
    use tokio::time::timeout;

    #[tokio::test]
    async fn loads_registered_plugins_in_order() {
        let (seen, observed) = async_channel::unbounded();
        let (first, second) = (seen.clone(), seen);
        let broker = PluginLoader::new(Logger::current())
            .register("first", move |_| {
                Ok(Box::new(Recorder {
                    name: "first",
                    seen: first.clone(),
                }))
            })
            .register("second", move |_| {
                Ok(Box::new(Recorder {
                    name: "second",
                    seen: second.clone(),
                }))
            })
            .load(["second", "first"])
            .unwrap();

        assert_eq!(broker.names().collect::<Vec<_>>(), vec!["second", "first"]);
        broker.send_result(&mut sample("x")).await.unwrap();
        broker.shutdown().await;

        let order: Vec<&str> = drain(&observed).iter().map(|(name, _)| *name).collect();
        assert_eq!(order, vec!["second", "first"]);
    }

    #[tokio::test]
    async fn one_bad_path_fails_the_whole_load() {
        let (seen, observed) = async_channel::unbounded();
        let loader = PluginLoader::new(Logger::current()).register("valid", move |_| {
            Ok(Box::new(Recorder {
                name: "valid",
                seen: seen.clone(),
            }))
        });

        let err = loader
            .load(["valid", "/nonexistent/libghost.so"])
            .unwrap_err();
        assert!(matches!(err, LoadError::NotFound { .. }));
        assert_eq!(err.path(), Some(Path::new("/nonexistent/libghost.so")));
        assert!(err.to_string().contains("/nonexistent/libghost.so"));

        // the factory holds a sender too
        drop(loader);
        let closed = timeout(Duration::from_secs(2), observed.recv())
            .await
            .expect("the started plugin shuts down");
        assert!(closed.is_err());
    }

    #[tokio::test]
    async fn factory_error_names_the_plugin() {
        let err = PluginLoader::new(Logger::current())
            .register("needs-key", |_| anyhow::bail!("missing API key"))
            .load(["needs-key"])
            .unwrap_err();

        match &err {
            LoadError::Init { path, message } => {
                assert_eq!(path, Path::new("needs-key"));
                assert_eq!(message, "missing API key");
            }
            other => panic!("unexpected error: {other}"),
        }
        assert!(err.to_string().contains("needs-key"));
    }

    #[tokio::test]
    async fn file_that_is_not_a_library() {
        let path = std::env::temp_dir().join(format!("httpfuzz-not-a-plugin-{}.so", std::process::id()));
        std::fs::write(&path, b"#!/bin/sh\necho nope\n").unwrap();

        let err = load_plugins(Logger::current(), [&path]).unwrap_err();
        let _ = std::fs::remove_file(&path);

        assert!(matches!(err, LoadError::Open { .. }));
        assert_eq!(err.path(), Some(path.as_path()));
    }

    #[tokio::test]
    async fn plugins_get_a_named_logger() {
        let (names, named) = async_channel::unbounded();
        let broker = PluginLoader::new(Logger::current())
            .register("auditor", move |logger| {
                let _ = names.try_send(logger.plugin().map(str::to_string));
                Ok(Box::new(crate::listeners::LogListener::new(logger)))
            })
            .load(["auditor"])
            .unwrap();

        assert_eq!(named.try_recv().unwrap(), Some("auditor".to_string()));
        assert!(broker.shutdown().await.is_empty());
    }

    #[tokio::test]
    async fn no_paths_means_an_empty_broker() {
        let broker = load_plugins(Logger::current(), Vec::<String>::new()).unwrap();
        assert!(broker.is_empty());
        broker.send_result(&mut sample("x")).await.unwrap();
        timeout(Duration::from_secs(1), broker.shutdown())
            .await
            .unwrap();
    }

    #[test]
    fn needs_a_runtime() {
        let err = load_plugins(Logger::current(), ["anything"]).unwrap_err();
        assert!(matches!(err, LoadError::NoRuntime));
        assert!(err.path().is_none());
    }

    /// Build the workspace's `result-logger` module with the compiler that
    /// built these tests, in a target dir of its own.
    fn result_logger() -> Option<PathBuf> {
        // target/<profile>/deps/<test binary>
        let exe = std::env::current_exe().ok()?;
        let profile_dir = exe.parent()?.parent()?;
        let release = profile_dir.ends_with("release");
        let target_dir = profile_dir.join("plugin-modules");

        let mut cargo = Command::new(env!("CARGO"));
        cargo
            .args(["build", "--quiet", "-p", "result-logger", "--manifest-path"])
            .arg(Path::new(env!("CARGO_MANIFEST_DIR")).join("Cargo.toml"))
            .arg("--target-dir")
            .arg(&target_dir);
        if release {
            cargo.arg("--release");
        }
        if !cargo.status().ok()?.success() {
            return None;
        }

        let module = target_dir
            .join(if release { "release" } else { "debug" })
            .join(libloading::library_filename("result_logger"));
        module.exists().then_some(module)
    }

    #[tokio::test]
    async fn native_module_logs_into_host_subscriber() {
        let Some(module) = result_logger() else {
            eprintln!("result-logger could not be built, skipping");
            return;
        };
        let captured = Captured::default();
        let broker = load_plugins(captured.logger(), [&module]).unwrap();
        assert_eq!(broker.names().collect::<Vec<_>>(), vec!["result-logger"]);

        broker.send_result(&mut sample("{{7*7}}")).await.unwrap();
        broker.send_result(&mut sample("<svg/onload=1>")).await.unwrap();
        assert!(broker.shutdown().await.is_empty());

        let text = captured.text();
        assert_eq!(text.matches("[result]").count(), 2);
        assert!(text.contains("payload=\"{{7*7}}\""));
        assert!(text.contains("payload=\"<svg/onload=1>\""));
        assert!(text.contains("plugin=\"result-logger\""));
        assert!(text.contains("2 results observed"));
    }

    #[tokio::test]
    async fn library_without_declaration() {
        let candidates = [
            "/lib/x86_64-linux-gnu/libm.so.6",
            "/usr/lib/x86_64-linux-gnu/libm.so.6",
            "/lib/aarch64-linux-gnu/libm.so.6",
            "/usr/lib/aarch64-linux-gnu/libm.so.6",
            "/lib64/libm.so.6",
            "/usr/lib64/libm.so.6",
            "/usr/lib/libm.so.6",
        ];
        let Some(libm) = candidates.iter().map(Path::new).find(|path| path.exists()) else {
            eprintln!("no libm found, skipping");
            return;
        };

        let err = load_plugins(Logger::current(), [libm]).unwrap_err();
        match &err {
            LoadError::MissingDeclaration { path, symbol, .. } => {
                assert_eq!(path, libm);
                assert_eq!(*symbol, DECLARATION_SYMBOL);
            }
            other => panic!("unexpected error: {other}"),
        }
        assert!(err.to_string().contains("httpfuzz_plugin_declaration"));
    }
}
