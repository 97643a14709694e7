//! Language server front end.
//!
//! Maps LSP notifications and requests onto the [`Workspace`] and the
//! feature providers. After each change the server publishes diagnostics
//! right away, then looks up missing labels in the background; once new
//! labels arrive it republishes and asks the client to redraw inlay hints.

use std::path::PathBuf;
use std::sync::{Arc, PoisonError, RwLock};

use tower_lsp::jsonrpc::Result;
use tower_lsp::lsp_types::*;
use tower_lsp::{Client, LanguageServer, LspService, Server};
use tracing::{debug, info, warn};

use crate::config::Settings;
use crate::diagnostics;
use crate::fetch::{FetchCache, Fetcher, HttpSource};
use crate::hover::hover_response;
use crate::inlay_hints::inlay_hints_response;
use crate::workspace::{ChangeError, Snapshot, Workspace};

/// Options fixed on the command line.
#[derive(Clone, Copy, Debug, Default)]
pub struct ServerOptions {
    /// Never fetch labels over the network.
    pub offline: bool,
}

struct State {
    workspace: Workspace,
    settings: RwLock<Settings>,
    fetcher: RwLock<Fetcher>,
    inlay_hint_refresh: RwLock<bool>,
}

impl State {
    fn settings(&self) -> Settings {
        self.settings
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    fn fetcher(&self) -> Fetcher {
        self.fetcher
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    fn can_refresh_inlay_hints(&self) -> bool {
        *self
            .inlay_hint_refresh
            .read()
            .unwrap_or_else(PoisonError::into_inner)
    }
}

pub struct Backend {
    client: Client,
    options: ServerOptions,
    state: Arc<State>,
}

impl Backend {
    pub fn new(client: Client, options: ServerOptions) -> Self {
        Self {
            client,
            options,
            state: Arc::new(State {
                workspace: Workspace::new(),
                settings: RwLock::new(Settings::default()),
                fetcher: RwLock::new(Fetcher::disabled()),
                inlay_hint_refresh: RwLock::new(false),
            }),
        }
    }

    async fn publish(client: &Client, state: &State, snapshot: &Snapshot) {
        let diags = diagnostics::diagnostics(snapshot, &state.fetcher(), &state.settings());
        client
            .publish_diagnostics(
                snapshot.document.uri.clone(),
                diags,
                Some(snapshot.version()),
            )
            .await;
    }

    /// Publish diagnostics for `snapshot`, then fetch the labels it is
    /// missing without blocking the caller.
    async fn refresh(&self, snapshot: Arc<Snapshot>) {
        Self::publish(&self.client, &self.state, &snapshot).await;

        let fetcher = self.state.fetcher();
        if !fetcher.is_enabled() {
            return;
        }
        let missing: Vec<String> = snapshot
            .analysis
            .unlabeled_iris()
            .filter(|iri| fetcher.cached(iri).is_none())
            .map(String::from)
            .collect();
        if missing.is_empty() {
            return;
        }

        let client = self.client.clone();
        let state = self.state.clone();
        let uri = snapshot.document.uri.clone();
        tokio::spawn(async move {
            let resolved = fetcher.prefetch(missing.iter().map(String::as_str)).await;
            if resolved == 0 {
                return;
            }
            debug!(%uri, resolved, "external labels arrived");
            if let Some(current) = state.workspace.snapshot(&uri) {
                Self::publish(&client, &state, &current).await;
            }
            if state.can_refresh_inlay_hints() {
                if let Err(err) = client.inlay_hint_refresh().await {
                    debug!("inlay hint refresh failed: {err}");
                }
            }
        });
    }
}

fn root_dir(params: &InitializeParams) -> PathBuf {
    #[allow(deprecated)]
    let root_uri = params.root_uri.as_ref();
    params
        .workspace_folders
        .as_ref()
        .and_then(|folders| folders.first())
        .map(|folder| &folder.uri)
        .or(root_uri)
        .and_then(|uri| uri.to_file_path().ok())
        .or_else(|| std::env::current_dir().ok())
        .unwrap_or_default()
}

fn build_fetcher(settings: &Settings) -> Fetcher {
    if !settings.external_fetch {
        return Fetcher::disabled();
    }
    match HttpSource::new() {
        Ok(source) => Fetcher::new(
            Arc::new(FetchCache::new(settings.cache_ttl())),
            Arc::new(source),
        )
        .with_fetch_timeout(settings.fetch_timeout()),
        Err(err) => {
            warn!("external labels disabled: {err}");
            Fetcher::disabled()
        }
    }
}

pub fn capabilities(settings: &Settings) -> ServerCapabilities {
    ServerCapabilities {
        text_document_sync: Some(TextDocumentSyncCapability::Kind(
            TextDocumentSyncKind::INCREMENTAL,
        )),
        hover_provider: Some(HoverProviderCapability::Simple(settings.hover)),
        inlay_hint_provider: settings.inlay_hints.then_some(OneOf::Left(true)),
        ..Default::default()
    }
}

#[tower_lsp::async_trait]
impl LanguageServer for Backend {
    async fn initialize(&self, params: InitializeParams) -> Result<InitializeResult> {
        let root = root_dir(&params);
        let mut settings = match Settings::new(
            &root,
            &params.capabilities,
            params.initialization_options.as_ref(),
        ) {
            Ok(settings) => settings,
            Err(err) => {
                warn!("falling back to default settings: {err}");
                Settings::default()
            }
        };
        if self.options.offline {
            settings.external_fetch = false;
        }
        info!(root = %root.display(), ?settings, "initializing");

        let refresh_support = params
            .capabilities
            .workspace
            .as_ref()
            .and_then(|it| it.inlay_hint.as_ref())
            .and_then(|it| it.refresh_support)
            .unwrap_or(false);

        *self
            .state
            .fetcher
            .write()
            .unwrap_or_else(PoisonError::into_inner) = build_fetcher(&settings);
        *self
            .state
            .inlay_hint_refresh
            .write()
            .unwrap_or_else(PoisonError::into_inner) = refresh_support;
        let capabilities = capabilities(&settings);
        *self
            .state
            .settings
            .write()
            .unwrap_or_else(PoisonError::into_inner) = settings;

        Ok(InitializeResult {
            capabilities,
            server_info: Some(ServerInfo {
                name: env!("CARGO_PKG_NAME").to_string(),
                version: Some(env!("CARGO_PKG_VERSION").to_string()),
            }),
        })
    }

    async fn initialized(&self, _: InitializedParams) {
        self.client
            .log_message(MessageType::INFO, "skoslens initialized")
            .await;
    }

    async fn shutdown(&self) -> Result<()> {
        if let Some(cache) = self.state.fetcher().cache() {
            cache.clear();
        }
        Ok(())
    }

    async fn did_open(&self, params: DidOpenTextDocumentParams) {
        let document = params.text_document;
        let snapshot = self
            .state
            .workspace
            .open(document.uri, &document.text, document.version);
        self.refresh(snapshot).await;
    }

    async fn did_change(&self, params: DidChangeTextDocumentParams) {
        let uri = params.text_document.uri;
        match self.state.workspace.change(
            &uri,
            params.text_document.version,
            &params.content_changes,
        ) {
            Ok(snapshot) => self.refresh(snapshot).await,
            Err(ChangeError::StaleVersion { .. }) => {}
            Err(err) => warn!(%uri, "change not applied: {err}"),
        }
    }

    async fn did_close(&self, params: DidCloseTextDocumentParams) {
        let uri = params.text_document.uri;
        if self.state.workspace.close(&uri) {
            self.client.publish_diagnostics(uri, Vec::new(), None).await;
        }
    }

    async fn hover(&self, params: HoverParams) -> Result<Option<Hover>> {
        let position = params.text_document_position_params;
        let Some(snapshot) = self.state.workspace.snapshot(&position.text_document.uri) else {
            return Ok(None);
        };
        Ok(hover_response(
            &snapshot,
            &self.state.fetcher(),
            position.position,
            &self.state.settings(),
        )
        .await)
    }

    async fn inlay_hint(&self, params: InlayHintParams) -> Result<Option<Vec<InlayHint>>> {
        let Some(snapshot) = self.state.workspace.snapshot(&params.text_document.uri) else {
            return Ok(None);
        };
        Ok(inlay_hints_response(
            &snapshot,
            &self.state.fetcher(),
            params.range,
            &self.state.settings(),
        ))
    }
}

/// Serve LSP over stdin/stdout until the client exits.
pub async fn run_server(options: ServerOptions) {
    let stdin = tokio::io::stdin();
    let stdout = tokio::io::stdout();

    let (service, socket) = LspService::new(|client| Backend::new(client, options));
    Server::new(stdin, stdout, socket).serve(service).await;
}
