//! solvebook-editor-core: framework-free editor logic for the solution pages.
//!
//! This crate provides:
//! - `EditorInstance`: an edit/preview state machine with a debounced preview
//! - `FormSubmissionController`: validation and serialization into the host form
//! - `PageController`: the registry of a page's editors plus drafts and notices
//! - platform traits implemented by the browser crate and by `memory` for tests

pub mod autosave;
pub mod config;
pub mod editor;
pub mod error;
pub mod form;
pub mod memory;
pub mod messages;
pub mod page;
pub mod platform;
pub mod registry;
pub mod text;
pub mod timer;
pub mod types;

pub use autosave::{
    Autosaver, ClearPolicy, DRAFT_KEY_PREFIX, DraftScope, DraftSnapshot, DraftStore,
    MemoryDraftStore, unix_millis,
};
pub use config::{AutosaveConfig, EditorConfig, Placeholders};
pub use editor::EditorInstance;
pub use error::{ConfigError, EditorError, PlatformError};
pub use form::{
    FormBinding, FormSubmissionController, SessionState, SolutionDraft, SubmitOutcome,
};
pub use messages::{Locale, Messages};
pub use page::{PageController, PageKind};
pub use platform::{
    EditorMount, EditorSurface, HostForm, MountRequest, MountedEditor, Notifier, PreviewTarget,
    Subscription, TimerScheduler, ViewControls,
};
pub use registry::EditorRegistry;
pub use smol_str::SmolStr;
pub use solvebook_renderer::{RenderOptions, RenderPipeline, Renderer};
pub use text::EditorRope;
pub use timer::{DEFAULT_DEBOUNCE, DebounceSlot, TimerToken};
pub use types::{EditorId, EngineKind, ViewMode};
