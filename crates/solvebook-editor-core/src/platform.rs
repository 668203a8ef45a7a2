//! Platform abstraction traits for the editor.
//!
//! These traits are the seam between editor logic and a concrete host. The
//! browser crate implements them over the DOM; [`crate::memory`] implements
//! them in memory for native hosts and tests.

use std::any::Any;
use std::fmt;
use std::time::Duration;

use smol_str::SmolStr;

use crate::error::PlatformError;
use crate::timer::TimerToken;
use crate::types::{EditorId, EngineKind, ViewMode};

/// A platform resource (event listener, timer, DOM fixture) that is released
/// when dropped.
pub struct Subscription(#[allow(dead_code)] Box<dyn Any>);

impl Subscription {
    pub fn new<T: 'static>(handle: T) -> Self {
        Self(Box::new(handle))
    }
}

impl fmt::Debug for Subscription {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Subscription(..)")
    }
}

/// The text editing surface of one editor.
pub trait EditorSurface {
    fn value(&self) -> String;

    fn set_value(&mut self, text: &str) -> Result<(), PlatformError>;

    fn focus(&self) -> Result<(), PlatformError>;

    fn set_visible(&mut self, visible: bool);

    /// Whether the surface has finished initializing and accepts values.
    fn is_ready(&self) -> bool {
        true
    }
}

/// The element rendered HTML is written into.
pub trait PreviewTarget {
    /// Replace the whole content of the target.
    fn replace_html(&mut self, html: &str) -> Result<(), PlatformError>;

    fn set_visible(&mut self, visible: bool);
}

/// Edit/Preview toggle controls, if the host draws any.
pub trait ViewControls {
    /// Show `mode` as the active one.
    fn reflect(&mut self, mode: ViewMode);
}

/// What an editor asks the host to build.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MountRequest {
    pub id: EditorId,
    /// Element id of the container.
    pub container: SmolStr,
    pub placeholder: String,
    pub engine: EngineKind,
}

/// The fixtures a host built for one editor.
pub struct MountedEditor {
    pub surface: Box<dyn EditorSurface>,
    pub preview: Box<dyn PreviewTarget>,
    pub controls: Option<Box<dyn ViewControls>>,
    /// Released with the editor: event listeners, created DOM nodes.
    pub guards: Vec<Subscription>,
}

pub trait EditorMount {
    /// Build an editor under `request.container`.
    ///
    /// `Ok(None)` means the container does not exist.
    fn mount(&mut self, request: &MountRequest) -> Result<Option<MountedEditor>, PlatformError>;
}

/// Delivers debounce deadlines as callbacks.
///
/// When a timer fires the host calls back into the page with `(editor, token)`.
/// Dropping the returned subscription must cancel the timer.
pub trait TimerScheduler {
    fn schedule(&self, editor: &EditorId, token: TimerToken, delay: Duration)
    -> Option<Subscription>;
}

/// Shows user-facing messages (browser: `window.alert`).
pub trait Notifier {
    fn notify(&self, message: &str);
}

/// The host form the editors serialize into.
pub trait HostForm {
    /// Current value of the named field, `None` if there is no such field.
    fn field_value(&self, name: &str) -> Option<String>;

    /// Create the named field if it is missing.
    fn ensure_field(&mut self, name: &str) -> Result<(), PlatformError>;

    fn set_field_value(&mut self, name: &str, value: &str) -> Result<(), PlatformError>;

    fn focus_field(&self, _name: &str) -> Result<(), PlatformError> {
        Ok(())
    }
}
