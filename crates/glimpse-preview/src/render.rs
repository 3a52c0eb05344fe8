//! Work performed off the interaction thread.

use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;

use glimpse_core::{CleanupHook, HandlerConfig, HandlerError, Preview, PreviewObject};
use glimpse_registry::HandlerRegistry;

/// Identifies one submitted render.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Ticket(pub(crate) u64);

impl fmt::Display for Ticket {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// What a render shows.
#[derive(Clone)]
pub(crate) enum RenderSource {
    Files(Vec<PathBuf>),
    Object(Arc<dyn PreviewObject>),
}

impl RenderSource {
    pub(crate) fn same_as(&self, other: &Self) -> bool {
        match (self, other) {
            (Self::Files(a), Self::Files(b)) => a == b,
            (Self::Object(a), Self::Object(b)) => Arc::ptr_eq(a, b),
            _ => false,
        }
    }

    pub(crate) fn paths(&self) -> &[PathBuf] {
        match self {
            Self::Files(paths) => paths,
            Self::Object(_) => &[],
        }
    }
}

impl fmt::Display for RenderSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Files(paths) => match paths.as_slice() {
                [single] => write!(f, "{}", single.display()),
                [first, ..] => write!(f, "{} (+{} more)", first.display(), paths.len() - 1),
                [] => f.write_str("<no files>"),
            },
            Self::Object(object) => write!(f, "<{}>", object.type_key()),
        }
    }
}

impl fmt::Debug for RenderSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "RenderSource({self})")
    }
}

/// Runs a hook when dropped, unless it is empty.
///
/// Owned by the orchestrator for resources tied to a request (such as
/// extracted temp files) rather than to a particular preview.
#[derive(Default)]
pub(crate) struct CleanupGuard(Option<CleanupHook>);

impl CleanupGuard {
    pub(crate) fn new(hook: CleanupHook) -> Self {
        Self(Some(hook))
    }

    pub(crate) fn is_empty(&self) -> bool {
        self.0.is_none()
    }
}

impl Drop for CleanupGuard {
    fn drop(&mut self) {
        if let Some(hook) = self.0.take() {
            hook();
        }
    }
}

/// Everything the background task needs.
pub(crate) struct RenderJob {
    pub ticket: Ticket,
    pub config: HandlerConfig,
    pub source: RenderSource,
    pub previous: Option<Preview>,
}

/// Result of a background render, handed back to the interaction thread.
#[derive(Debug)]
pub struct Completion {
    pub(crate) ticket: Ticket,
    pub(crate) reusable: bool,
    pub(crate) result: Result<Preview, HandlerError>,
}

impl Completion {
    /// The render this completes.
    pub fn ticket(&self) -> Ticket {
        self.ticket
    }

    /// Whether the handler produced a preview.
    pub fn is_success(&self) -> bool {
        self.result.is_ok()
    }

    pub(crate) fn failed(ticket: Ticket, error: HandlerError) -> Self {
        Self {
            ticket,
            reusable: false,
            result: Err(error),
        }
    }
}

/// Instantiate the configured handler and invoke it.
pub(crate) fn run(registry: &HandlerRegistry, job: RenderJob) -> Completion {
    let RenderJob {
        ticket,
        config,
        source,
        previous,
    } = job;

    match source {
        RenderSource::Files(paths) => {
            let mut reusable = false;
            let result = render_files(registry, &config, &paths, previous, &mut reusable);
            Completion {
                ticket,
                reusable,
                result,
            }
        }
        RenderSource::Object(object) => {
            let result = registry
                .objects()
                .instantiate(&config)
                .and_then(|handler| handler.create(&*object));
            Completion {
                ticket,
                reusable: false,
                result,
            }
        }
    }
}

fn render_files(
    registry: &HandlerRegistry,
    config: &HandlerConfig,
    paths: &[PathBuf],
    previous: Option<Preview>,
    reusable: &mut bool,
) -> Result<Preview, HandlerError> {
    let handler = registry.files().instantiate(config)?;
    *reusable = handler.as_reusable().is_some();

    let first = paths
        .first()
        .ok_or_else(|| HandlerError::render("No files to display"))?;

    if let (Some(previous), Some(reuser)) = (previous, handler.as_reusable()) {
        tracing::debug!(target: "preview", handler = %config.id(), path = %first.display(), "reusing preview");
        return reuser.reuse(first, previous);
    }

    match handler.as_multi_file() {
        Some(multi) => multi.create_multi(paths),
        None => handler.create(first),
    }
}
