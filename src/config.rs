use std::path::Path;
use std::time::Duration;

use anyhow::anyhow;
use config::{Config, File, FileFormat};
use serde::Deserialize;
use tower_lsp::lsp_types::ClientCapabilities;

#[derive(Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct Settings {
    pub hover: bool,
    pub inlay_hints: bool,
    /// Hint-level diagnostics for subjects without any label
    pub unlabeled_diagnostics: bool,
    /// Look up labels of unlabeled http(s) IRIs in their namespace document
    pub external_fetch: bool,
    pub fetch_timeout_ms: u64,
    /// How long a hover waits for a pending external label
    pub hover_timeout_ms: u64,
    pub cache_ttl_secs: u64,
}

impl Settings {
    /// Defaults, then `~/.config/skoslens/settings.*`, then `<root>/.skoslens`,
    /// then the client's `initializationOptions` (JSON). Features the client
    /// cannot display are switched off.
    pub fn new(
        root_dir: &Path,
        capabilities: &ClientCapabilities,
        initialization_options: Option<&serde_json::Value>,
    ) -> anyhow::Result<Settings> {
        let expanded = shellexpand::tilde("~/.config/skoslens/settings");
        let mut builder = Config::builder()
            .add_source(File::with_name(&expanded).required(false))
            .add_source(
                File::with_name(&format!(
                    "{}/.skoslens",
                    root_dir
                        .to_str()
                        .ok_or(anyhow!("Can't convert root_dir to str"))?
                ))
                .format(FileFormat::Toml)
                .required(false),
            );
        if let Some(options) = initialization_options.filter(|options| options.is_object()) {
            builder = builder.add_source(File::from_str(&options.to_string(), FileFormat::Json));
        }

        let settings = builder
            .set_default("hover", true)?
            .set_default("inlay_hints", true)?
            .set_default("unlabeled_diagnostics", true)?
            .set_default("external_fetch", true)?
            .set_default("fetch_timeout_ms", 2000)?
            .set_default("hover_timeout_ms", 1500)?
            .set_default("cache_ttl_secs", 3600)?
            .set_override_option(
                "inlay_hints",
                match capabilities
                    .text_document
                    .as_ref()
                    .and_then(|it| it.inlay_hint.as_ref())
                {
                    None => Some(false),
                    Some(_) => None,
                },
            )?
            .build()
            .map_err(|err| anyhow!("Build err: {err}"))?;

        let settings = settings.try_deserialize::<Settings>()?;

        anyhow::Ok(settings)
    }

    pub fn fetch_timeout(&self) -> Duration {
        Duration::from_millis(self.fetch_timeout_ms)
    }

    pub fn hover_timeout(&self) -> Duration {
        Duration::from_millis(self.hover_timeout_ms)
    }

    pub fn cache_ttl(&self) -> Duration {
        Duration::from_secs(self.cache_ttl_secs)
    }
}

impl Default for Settings {
    fn default() -> Self {
        Settings {
            hover: true,
            inlay_hints: true,
            unlabeled_diagnostics: true,
            external_fetch: true,
            fetch_timeout_ms: 2000,
            hover_timeout_ms: 1500,
            cache_ttl_secs: 3600,
        }
    }
}
