//! Serializes preview requests and swaps results into the display.

use std::collections::VecDeque;
use std::path::PathBuf;
use std::sync::Arc;

use glimpse_core::{
    BrowserConfig, CleanupHook, DispatchPolicy, Extension, HandlerConfig, HandlerError, HandlerId,
    Preview, PreviewObject, SearchQuery, ValidationError,
};
use glimpse_prefs::{Favorite, FavoritesStore, PreferredHandlerStore};
use glimpse_registry::HandlerRegistry;
use tokio::sync::mpsc;

use crate::error::PreviewError;
use crate::render::{self, CleanupGuard, Completion, RenderJob, RenderSource, Ticket};

/// Completions buffered between the background task and the interaction
/// thread. One render is outstanding at a time.
const COMPLETION_BUFFER: usize = 4;

/// Lifecycle of the current request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DisplayState {
    /// Nothing requested yet.
    #[default]
    Idle,
    /// A request is being resolved.
    Requested,
    /// A render runs in the background; the placeholder is shown.
    Rendering,
    /// A result (or fallback placeholder) is shown.
    Displayed,
}

/// What happened to a display request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DisplayOutcome {
    /// A render was started.
    Submitted(Ticket),
    /// The request waits until the current render completes.
    Deferred,
    /// The request was discarded because a render is in flight.
    Dropped,
    /// No handler applies; the "no preview" placeholder is shown.
    NoHandler,
    /// Nothing to display.
    Ignored,
}

struct Request {
    source: RenderSource,
    forced: Option<HandlerConfig>,
    cleanup: CleanupGuard,
}

impl Request {
    fn new(source: RenderSource) -> Self {
        Self {
            source,
            forced: None,
            cleanup: CleanupGuard::default(),
        }
    }
}

struct InFlight {
    ticket: Ticket,
    handler: HandlerId,
    source: RenderSource,
    cleanup: CleanupGuard,
}

/// Metadata of the displayed preview, used to decide on reuse.
struct ActivePreview {
    handler: HandlerId,
    paths: Vec<PathBuf>,
    reusable: bool,
}

/// The handler choice offered for the displayed selection.
#[derive(Default)]
struct Selection {
    source: Option<RenderSource>,
    extensions: Vec<Extension>,
    candidates: Vec<HandlerConfig>,
    selected: Option<usize>,
}

/// Drives preview rendering for one display area.
///
/// All methods run on the interaction thread. Each render is executed as a
/// single blocking task on the tokio runtime; its [`Completion`] comes back
/// through a channel and must be applied with [`apply`](Self::apply) (or
/// [`pump`](Self::pump)) to swap the result in. While a render is in
/// flight, new requests are handled according to the [`DispatchPolicy`].
pub struct PreviewOrchestrator {
    registry: Arc<HandlerRegistry>,
    preferred: Arc<PreferredHandlerStore>,
    favorites: Arc<FavoritesStore>,
    policy: DispatchPolicy,
    reuse_previews: bool,
    reuse_blocked: bool,

    state: DisplayState,
    next_ticket: u64,
    in_flight: Option<InFlight>,
    pending: VecDeque<Request>,

    shown: Preview,
    active: Option<ActivePreview>,
    request_cleanup: CleanupGuard,
    selection: Selection,
    favorite: Option<Favorite>,
    last_search: Option<SearchQuery>,

    completions_tx: mpsc::Sender<Completion>,
    completions_rx: mpsc::Receiver<Completion>,
}

impl PreviewOrchestrator {
    /// Create an orchestrator using the stores and settings of `config`.
    pub fn new(
        registry: Arc<HandlerRegistry>,
        preferred: Arc<PreferredHandlerStore>,
        favorites: Arc<FavoritesStore>,
        config: &BrowserConfig,
    ) -> Self {
        let (completions_tx, completions_rx) = mpsc::channel(COMPLETION_BUFFER);
        Self {
            registry,
            preferred,
            favorites,
            policy: config.dispatch_policy,
            reuse_previews: config.reuse_previews,
            reuse_blocked: false,
            state: DisplayState::Idle,
            next_ticket: 0,
            in_flight: None,
            pending: VecDeque::new(),
            shown: Preview::no_preview(),
            active: None,
            request_cleanup: CleanupGuard::default(),
            selection: Selection::default(),
            favorite: None,
            last_search: None,
            completions_tx,
            completions_rx,
        }
    }

    /// Create an orchestrator with stores at the locations named by `config`.
    pub fn from_config(registry: Arc<HandlerRegistry>, config: &BrowserConfig) -> Self {
        let preferred = Arc::new(PreferredHandlerStore::new(config.preferred_handlers_path()));
        let favorites = Arc::new(FavoritesStore::new(config.favorites_path(), config.autosave_favorites));
        Self::new(registry, preferred, favorites, config)
    }

    /// Display `paths`. The first path decides the candidate handlers.
    ///
    /// Fails if the first path is missing or a directory; nothing changes
    /// in that case.
    pub fn display(&mut self, paths: &[PathBuf]) -> Result<DisplayOutcome, PreviewError> {
        self.submit(Request::new(RenderSource::Files(paths.to_vec())))
    }

    /// Display `paths` and run `cleanup` once their preview is superseded,
    /// or right away if the request is discarded.
    pub fn display_with_cleanup(
        &mut self,
        paths: Vec<PathBuf>,
        cleanup: CleanupHook,
    ) -> Result<DisplayOutcome, PreviewError> {
        let mut request = Request::new(RenderSource::Files(paths));
        request.cleanup = CleanupGuard::new(cleanup);
        self.submit(request)
    }

    /// Display an in-memory object.
    pub fn display_object(&mut self, object: Arc<dyn PreviewObject>) -> Result<DisplayOutcome, PreviewError> {
        self.submit(Request::new(RenderSource::Object(object)))
    }

    /// Switch the displayed selection to candidate `index`, persist it as
    /// the preferred handler for every displayed extension and re-render.
    pub fn select_handler(&mut self, index: usize) -> Result<DisplayOutcome, PreviewError> {
        let source = self.selection.source.clone().ok_or(PreviewError::NothingDisplayed)?;
        let config = self
            .selection
            .candidates
            .get(index)
            .cloned()
            .ok_or(PreviewError::IndexOutOfRange {
                index,
                len: self.selection.candidates.len(),
            })?;

        self.persist_preferred(&config)?;
        self.favorite = None;

        let mut request = Request::new(source);
        request.forced = Some(config);
        self.submit(request)
    }

    /// Use `favorite` for the displayed selection and for later displays of
    /// the same extension.
    pub fn select_favorite(&mut self, favorite: Favorite) -> Result<DisplayOutcome, PreviewError> {
        let source = self.selection.source.clone().ok_or(PreviewError::NothingDisplayed)?;
        self.favorite = Some(favorite);
        self.submit(Request::new(source))
    }

    /// Replace the options of the candidate with the same id, persist it
    /// and rebuild the preview from scratch.
    pub fn customize_handler(&mut self, config: HandlerConfig) -> Result<DisplayOutcome, PreviewError> {
        let source = self.selection.source.clone().ok_or(PreviewError::NothingDisplayed)?;
        let index = self
            .selection
            .candidates
            .iter()
            .position(|c| c.id() == config.id())
            .ok_or_else(|| HandlerError::UnknownHandler {
                id: config.id().to_string(),
            })?;

        self.persist_preferred(&config)?;
        self.selection.candidates[index] = config.clone();
        self.favorite = None;
        self.reuse_blocked = true;

        let mut request = Request::new(source);
        request.forced = Some(config);
        self.submit(request)
    }

    /// Enable or disable in-place reuse of the displayed preview.
    pub fn set_reuse_previews(&mut self, enabled: bool) {
        self.reuse_previews = enabled;
        if !enabled {
            if let Some(active) = self.active.as_mut() {
                active.reusable = false;
            }
        }
    }

    /// Whether in-place reuse is enabled.
    pub fn reuse_previews(&self) -> bool {
        self.reuse_previews
    }

    /// The preview currently shown: content, a placeholder while rendering,
    /// or a fallback placeholder.
    pub fn preview(&self) -> &Preview {
        &self.shown
    }

    /// Mutable access to the shown preview, e.g. to start a search.
    pub fn preview_mut(&mut self) -> &mut Preview {
        &mut self.shown
    }

    /// Current lifecycle state.
    pub fn state(&self) -> DisplayState {
        self.state
    }

    /// Whether a render is in flight.
    pub fn is_busy(&self) -> bool {
        self.in_flight.is_some()
    }

    /// Number of deferred requests.
    pub fn pending_len(&self) -> usize {
        self.pending.len()
    }

    /// Candidate handlers for the displayed selection, best first.
    pub fn candidates(&self) -> &[HandlerConfig] {
        &self.selection.candidates
    }

    /// Index of the selected candidate; `None` when a favorite is in use.
    pub fn selected_index(&self) -> Option<usize> {
        self.selection.selected
    }

    /// The favorite in use, if any.
    pub fn current_favorite(&self) -> Option<&Favorite> {
        self.favorite.as_ref()
    }

    /// Extensions of the displayed files, lowercase and deduplicated.
    pub fn current_extensions(&self) -> &[Extension] {
        &self.selection.extensions
    }

    /// Favorites stored for the extension of the displayed selection.
    pub fn favorites(&self) -> Vec<Favorite> {
        self.selection
            .extensions
            .first()
            .map(|ext| self.favorites.list(ext))
            .unwrap_or_default()
    }

    /// Wait for the next completion without applying it.
    pub async fn next_completion(&mut self) -> Option<Completion> {
        if self.in_flight.is_none() {
            return None;
        }
        self.completions_rx.recv().await
    }

    /// Swap a completed render into the display and start the next
    /// deferred request, if any. Returns `false` for a stale completion.
    pub fn apply(&mut self, completion: Completion) -> bool {
        let Some(in_flight) = self.in_flight.take_if(|f| f.ticket == completion.ticket) else {
            tracing::debug!(target: "preview", ticket = %completion.ticket, "ignoring stale completion");
            return false;
        };

        let Completion { reusable, result, .. } = completion;
        let (mut preview, active) = match result {
            Ok(preview) => {
                let active = ActivePreview {
                    handler: in_flight.handler,
                    paths: in_flight.source.paths().to_vec(),
                    reusable,
                };
                (preview, Some(active))
            }
            Err(e) => {
                tracing::error!(
                    target: "preview",
                    handler = %in_flight.handler,
                    source = %in_flight.source,
                    error = %e,
                    "failed to create preview"
                );
                (Preview::failed(e.to_string()), None)
            }
        };

        self.transfer_search(&mut preview);
        self.shown = preview;
        self.active = active;
        self.request_cleanup = in_flight.cleanup;
        self.state = DisplayState::Displayed;
        tracing::debug!(target: "preview", ticket = %in_flight.ticket, "preview displayed");

        if let Some(next) = self.pending.pop_front() {
            self.start(next);
        }
        true
    }

    /// Wait for the in-flight render and apply it. Returns the ticket
    /// applied, or `None` if nothing was in flight.
    pub async fn pump(&mut self) -> Option<Ticket> {
        let completion = self.next_completion().await?;
        let ticket = completion.ticket();
        self.apply(completion).then_some(ticket)
    }

    /// Apply completions until nothing is in flight or deferred.
    pub async fn settle(&mut self) {
        while self.is_busy() {
            if self.pump().await.is_none() {
                break;
            }
        }
    }

    fn submit(&mut self, request: Request) -> Result<DisplayOutcome, PreviewError> {
        if let RenderSource::Files(paths) = &request.source {
            let Some(first) = paths.first() else {
                return Ok(DisplayOutcome::Ignored);
            };
            ValidationError::check_file(first)?;
        }

        if self.in_flight.is_some() {
            return Ok(self.defer(request));
        }
        Ok(self.start(request))
    }

    fn defer(&mut self, request: Request) -> DisplayOutcome {
        match self.policy {
            DispatchPolicy::Drop => {
                tracing::debug!(target: "preview", source = %request.source, "render in flight, dropping request");
                DisplayOutcome::Dropped
            }
            DispatchPolicy::ReplacePending => {
                if let Some(replaced) = self.pending.pop_back() {
                    tracing::debug!(target: "preview", source = %replaced.source, "replacing pending request");
                }
                self.pending.clear();
                self.pending.push_back(request);
                DisplayOutcome::Deferred
            }
            DispatchPolicy::Queue { capacity } => {
                if self.pending.len() < capacity {
                    self.pending.push_back(request);
                    DisplayOutcome::Deferred
                } else {
                    tracing::debug!(target: "preview", source = %request.source, capacity, "queue full, dropping request");
                    DisplayOutcome::Dropped
                }
            }
        }
    }

    fn start(&mut self, request: Request) -> DisplayOutcome {
        self.state = DisplayState::Requested;
        let Request {
            source,
            forced,
            cleanup,
        } = request;

        // A re-render of the displayed source keeps the resources it uses.
        let same_source = self
            .selection
            .source
            .as_ref()
            .is_some_and(|current| current.same_as(&source));
        let cleanup = if cleanup.is_empty() && same_source {
            std::mem::take(&mut self.request_cleanup)
        } else {
            cleanup
        };

        let (extensions, candidates) = self.resolve(&source);

        if candidates.is_empty() {
            tracing::debug!(target: "preview", source = %source, "no handler available");
            self.supersede(Preview::no_preview());
            self.request_cleanup = CleanupGuard::default();
            drop(cleanup);
            self.selection = Selection {
                source: Some(source),
                extensions,
                candidates,
                selected: None,
            };
            self.state = DisplayState::Displayed;
            return DisplayOutcome::NoHandler;
        }

        let (config, selected) = self.choose(&extensions, &candidates, forced);
        let reuse = self.can_reuse(&source, config.id());
        self.reuse_blocked = false;

        let previous = self.supersede(Preview::creating()).filter(|_| reuse);
        self.request_cleanup = CleanupGuard::default();

        self.next_ticket += 1;
        let ticket = Ticket(self.next_ticket);
        tracing::debug!(target: "preview", %ticket, handler = %config.id(), source = %source, reuse, "render submitted");

        self.in_flight = Some(InFlight {
            ticket,
            handler: config.id().clone(),
            source: source.clone(),
            cleanup,
        });
        self.selection = Selection {
            source: Some(source.clone()),
            extensions,
            candidates,
            selected,
        };
        self.state = DisplayState::Rendering;

        self.spawn(RenderJob {
            ticket,
            config,
            source,
            previous,
        });
        DisplayOutcome::Submitted(ticket)
    }

    fn spawn(&self, job: RenderJob) {
        let registry = Arc::clone(&self.registry);
        let tx = self.completions_tx.clone();
        let ticket = job.ticket;

        tokio::spawn(async move {
            let completion = match tokio::task::spawn_blocking(move || render::run(&registry, job)).await {
                Ok(completion) => completion,
                Err(e) => Completion::failed(ticket, HandlerError::render(format!("Render task failed: {e}"))),
            };
            if tx.send(completion).await.is_err() {
                tracing::debug!(target: "preview", %ticket, "orchestrator gone, discarding completion");
            }
        });
    }

    /// Candidate configurations for `source`, plus the extensions a
    /// preference applies to.
    fn resolve(&self, source: &RenderSource) -> (Vec<Extension>, Vec<HandlerConfig>) {
        match source {
            RenderSource::Files(paths) => {
                let ext = paths
                    .first()
                    .and_then(|p| Extension::from_path(p))
                    .unwrap_or_default();
                let preferred = self.preferred.get_content(&ext);
                let candidates = self
                    .registry
                    .files()
                    .resolve(&ext)
                    .into_iter()
                    .map(|id| match &preferred {
                        Some(config) if config.id() == &id => config.clone(),
                        _ => HandlerConfig::new(id),
                    })
                    .collect();

                let mut extensions = vec![ext];
                for path in paths.iter().skip(1) {
                    let other = Extension::from_path(path).unwrap_or_default();
                    if !extensions.contains(&other) {
                        extensions.push(other);
                    }
                }
                (extensions, candidates)
            }
            RenderSource::Object(object) => {
                let candidates = self
                    .registry
                    .objects()
                    .resolve_for_type(object.type_key())
                    .iter()
                    .cloned()
                    .map(HandlerConfig::new)
                    .collect();
                (Vec::new(), candidates)
            }
        }
    }

    /// Pick the configuration to render with: an explicit choice, then the
    /// favorite for this extension, then the stored preference, then the
    /// first candidate.
    fn choose(
        &mut self,
        extensions: &[Extension],
        candidates: &[HandlerConfig],
        forced: Option<HandlerConfig>,
    ) -> (HandlerConfig, Option<usize>) {
        if let Some(forced) = forced {
            if let Some(index) = candidates.iter().position(|c| c.id() == forced.id()) {
                return (forced, Some(index));
            }
        }

        let ext = extensions.first();
        if let Some(favorite) = &self.favorite {
            if ext == Some(favorite.extension()) {
                return (favorite.config().clone(), None);
            }
            tracing::debug!(target: "preview", favorite = favorite.name(), "favorite does not apply, clearing");
            self.favorite = None;
        }

        // Candidates already carry the stored options of the preferred handler.
        let index = ext
            .and_then(|ext| self.preferred.get_content(ext))
            .and_then(|preferred| candidates.iter().position(|c| c.id() == preferred.id()))
            .unwrap_or(0);
        (candidates[index].clone(), Some(index))
    }

    fn can_reuse(&self, source: &RenderSource, handler: &HandlerId) -> bool {
        if !self.reuse_previews || self.reuse_blocked {
            return false;
        }
        let RenderSource::Files(paths) = source else {
            return false;
        };
        paths.len() == 1
            && self
                .active
                .as_ref()
                .is_some_and(|active| active.reusable && &active.handler == handler && active.paths != *paths)
    }

    /// Show `next` and hand back the superseded preview. A superseded
    /// preview that is not claimed is dropped, which runs its cleanup.
    fn supersede(&mut self, next: Preview) -> Option<Preview> {
        let old = std::mem::replace(&mut self.shown, next);
        self.last_search = old.focus().and_then(|f| f.search.clone());
        self.active.take().map(|_| old)
    }

    fn transfer_search(&self, preview: &mut Preview) {
        let Some(search) = &self.last_search else {
            return;
        };
        if let Some(focus) = preview.focus_mut() {
            if focus.search.is_none() {
                focus.search = Some(search.clone());
            }
        }
    }

    fn persist_preferred(&self, config: &HandlerConfig) -> Result<(), PreviewError> {
        if self.selection.extensions.is_empty() {
            return Ok(());
        }
        self.preferred.set_content(&self.selection.extensions, config)?;
        Ok(())
    }
}

impl std::fmt::Debug for PreviewOrchestrator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PreviewOrchestrator")
            .field("state", &self.state)
            .field("policy", &self.policy)
            .field("reuse_previews", &self.reuse_previews)
            .field("pending", &self.pending.len())
            .field("shown", &self.shown)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn orchestrator(dir: &TempDir) -> PreviewOrchestrator {
        let config = BrowserConfig::in_dir(dir.path());
        PreviewOrchestrator::from_config(Arc::new(HandlerRegistry::default()), &config)
    }

    #[test]
    fn test_stale_completion_is_ignored() {
        let dir = TempDir::new().unwrap();
        let mut orch = orchestrator(&dir);

        let stale = Completion::failed(Ticket(7), HandlerError::render("late"));
        assert!(!orch.apply(stale));
        assert_eq!(orch.state(), DisplayState::Idle);
        assert_eq!(orch.preview().as_placeholder(), Some(&glimpse_core::Placeholder::NoPreview));
    }

    #[test]
    fn test_reuse_toggle() {
        let dir = TempDir::new().unwrap();
        let mut orch = orchestrator(&dir);
        assert!(orch.reuse_previews());
        orch.set_reuse_previews(false);
        assert!(!orch.reuse_previews());
        assert!(!orch.can_reuse(&RenderSource::Files(vec![dir.path().join("a")]), &HandlerId::new("x")));
    }
}
