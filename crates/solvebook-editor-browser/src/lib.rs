//! Browser DOM layer for the solvebook editor.
//!
//! Implements the platform traits of `solvebook-editor-core` over the DOM and
//! exports the wasm entry points the pages call. It assumes a
//! `wasm32-unknown-unknown` target environment.
//!
//! # Architecture
//!
//! - `mount`: builds toolbar, surface and preview inside a container
//! - `surface`: textarea and contenteditable surfaces, preview pane, toggles
//! - `form`: the host `<form>` and its serialization fields
//! - `storage`: drafts in `localStorage`
//! - `timers`: debounce deadlines as `setTimeout` callbacks
//! - `bindings`: `mountSolutionForm`, `renderMarkdown`, `renderInPlace`

pub use solvebook_editor_core;
pub use solvebook_editor_core::*;

pub mod bindings;
pub mod dom;
pub mod form;
pub mod mount;
pub mod storage;
pub mod surface;
pub mod timers;

pub use bindings::{SolutionForm, mount_solution_form, render_in_place, render_markdown};
pub use dom::AlertNotifier;
pub use form::DomForm;
pub use mount::DomMount;
pub use storage::LocalDraftStore;
pub use surface::{ContentEditableSurface, DomPreview, TextareaSurface, ToggleButtons};
pub use timers::GlooScheduler;

use wasm_bindgen::prelude::*;

/// Install the panic hook and console logging.
#[wasm_bindgen(start)]
pub fn init() {
    console_error_panic_hook::set_once();

    #[cfg(all(target_family = "wasm", target_os = "unknown"))]
    {
        use tracing::Level;
        use tracing::subscriber::set_global_default;
        use tracing_subscriber::Registry;
        use tracing_subscriber::layer::SubscriberExt;

        let console_level = if cfg!(debug_assertions) {
            Level::DEBUG
        } else {
            Level::INFO
        };
        let wasm_layer = tracing_wasm::WASMLayer::new(
            tracing_wasm::WASMLayerConfigBuilder::new()
                .set_max_level(console_level)
                .build(),
        );
        // A host page may already have installed a subscriber.
        let _ = set_global_default(Registry::default().with(wasm_layer));
    }
}
