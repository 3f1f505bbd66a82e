use super::listener::Initializer;

/// Version of this crate a plugin was compiled against
pub const CORE_VERSION: &str = env!("CARGO_PKG_VERSION");

/// Compiler that built this crate
pub const RUSTC_VERSION: &str = env!("HTTPFUZZ_RUSTC_VERSION");

/// Name of the static a plugin module exports, see [`export_plugin!`](crate::export_plugin)
pub const DECLARATION_SYMBOL: &str = "httpfuzz_plugin_declaration";

/// What a plugin module exports so the loader can build its listener.
///
/// Trait objects have no stable ABI, so the host refuses declarations made by
/// a different compiler or a different version of this crate.
#[derive(Clone, Copy, Debug)]
pub struct PluginDeclaration {
    pub rustc_version: &'static str,
    pub core_version: &'static str,
    pub name: &'static str,
    pub new: Initializer,
}

impl PluginDeclaration {
    pub fn is_compatible(&self) -> bool {
        self.rustc_version == RUSTC_VERSION && self.core_version == CORE_VERSION
    }
}

/// Export a listener factory from a `cdylib` plugin.
///
/// ```ignore
/// httpfuzz::export_plugin!("reflections", Reflections::init);
/// ```
#[macro_export]
macro_rules! export_plugin {
    ($name:expr, $new:expr) => {
        #[doc(hidden)]
        #[no_mangle]
        #[allow(non_upper_case_globals)]
        pub static httpfuzz_plugin_declaration: $crate::plugin::PluginDeclaration =
            $crate::plugin::PluginDeclaration {
                rustc_version: $crate::plugin::RUSTC_VERSION,
                core_version: $crate::plugin::CORE_VERSION,
                name: $name,
                new: $new,
            };
    };
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::listeners::LogListener;

    crate::export_plugin!("log", LogListener::init);

    #[test]
    fn exported_declaration_matches_host() {
        assert_eq!(DECLARATION_SYMBOL, stringify!(httpfuzz_plugin_declaration));
        assert_eq!(httpfuzz_plugin_declaration.name, "log");
        assert!(httpfuzz_plugin_declaration.is_compatible());
    }

    #[test]
    fn foreign_compiler_is_rejected() {
        let declaration = PluginDeclaration {
            rustc_version: "rustc 1.0.0 (a59de37e9 2015-05-13)",
            ..httpfuzz_plugin_declaration
        };
        assert!(!declaration.is_compatible());
    }
}
