use std::collections::VecDeque;
use std::path::{Path, PathBuf};

mod config;
mod error;
mod file_manager;
mod models;
mod outline;
mod panel;
mod sync;
mod ui_helpers;

pub use config::*;
pub use error::MapError;
pub use file_manager::*;
pub use models::*;
pub use outline::*;
pub use sync::*;

use panel::CanvasView;

const UNDO_LIMIT: usize = 200;

const WELCOME_TEXT: &str = "\
Mind Map
    Outline
        One node per line
        Indent to nest
    Diagram
        Click a node to fold it
        Right-click to style it
        Drag to pan, scroll to zoom
";

// ── Application state ─────────────────────────────────────────────────────────

pub struct MindMapApp {
    // Document
    pub(super) doc: OutlineDocument,
    pub(super) undo_stack: VecDeque<String>,

    // Parsed tree + interaction state layered on it
    pub(super) map: MindMap,
    pub(super) state: MapState,

    // Canvas camera
    pub(super) view: CanvasView,
    /// Line the editor cursor sat on last frame.
    pub(super) cursor_line: Option<usize>,

    // Settings
    pub(super) settings: Settings,
    pub(super) config_path: Option<PathBuf>,
    pub(super) show_settings_window: bool,
    pub(super) fullscreen: bool,

    // Status bar message
    pub(super) status: String,
}

impl MindMapApp {
    pub fn new(cc: &eframe::CreationContext<'_>) -> Self {
        let (settings, config_path, status) = match config_path() {
            Ok(path) => match Settings::load(&path) {
                Ok(s) => (s, Some(path), "Ready".to_owned()),
                Err(e) => {
                    tracing::warn!(error = %e, "falling back to default settings");
                    (Settings::default(), Some(path), format!("Settings not loaded: {e}"))
                }
            },
            Err(e) => {
                tracing::warn!(error = %e, "settings will not be persisted");
                (Settings::default(), None, "Ready".to_owned())
            }
        };
        let mut app = Self::with_settings(settings, config_path, WELCOME_TEXT);
        app.status = status;
        app.apply_visuals(&cc.egui_ctx);
        app
    }

    /// Build the app without a GUI context.
    pub fn with_settings(settings: Settings, config_path: Option<PathBuf>, text: &str) -> Self {
        let map = parse_outline(text, &settings.layout);
        MindMapApp {
            doc: OutlineDocument::new(text),
            undo_stack: VecDeque::new(),
            map,
            state: MapState::default(),
            view: CanvasView::default(),
            cursor_line: None,
            settings,
            config_path,
            show_settings_window: false,
            fullscreen: false,
            status: String::new(),
        }
    }

    // ── Text → map ────────────────────────────────────────────────────────────

    /// Replace the outline text (an editor change), keeping the old text for undo.
    pub(super) fn set_text(&mut self, text: String) {
        if text == self.doc.content {
            return;
        }
        let prev = std::mem::replace(&mut self.doc.content, text);
        self.push_undo(prev);
        self.doc.modified = true;
        self.reparse();
    }

    /// Record an edit already applied to `doc.content`.
    pub(super) fn text_edited(&mut self, prev: String) {
        if prev == self.doc.content {
            return;
        }
        self.push_undo(prev);
        self.doc.modified = true;
        self.reparse();
    }

    fn push_undo(&mut self, prev: String) {
        self.undo_stack.push_back(prev);
        if self.undo_stack.len() > UNDO_LIMIT {
            self.undo_stack.pop_front();
        }
    }

    /// Rebuild the map from the current text and carry state over to it.
    pub(super) fn reparse(&mut self) {
        let new = parse_outline(&self.doc.content, &self.settings.layout);
        debug_assert!(new.is_consistent());
        self.state.reconcile(&self.map, &new);
        self.view.remap_context(&self.map, &new);
        tracing::debug!(nodes = new.len(), depth = new.depth(), "map rebuilt");
        self.map = new;
    }

    pub(super) fn undo(&mut self) {
        if let Some(prev) = self.undo_stack.pop_back() {
            self.doc.content = prev;
            self.doc.modified = true;
            self.reparse();
            self.status = "Undo".to_owned();
        }
    }

    /// Rewrite the text with one indent unit per level.
    pub(super) fn normalize_indentation(&mut self) {
        let indent = " ".repeat(self.settings.layout.tab_width.max(1));
        let text = to_outline_text(&self.map, &indent);
        self.set_text(text);
        self.status = "Indentation normalized".to_owned();
    }

    // ── Map interaction ───────────────────────────────────────────────────────

    pub(super) fn toggle_node(&mut self, id: NodeId) {
        let collapsed = self.state.toggle_collapsed(&self.map, id);
        if let Some(node) = self.map.node(id) {
            tracing::debug!(key = %node.key, collapsed, "toggled node");
        }
    }

    pub(super) fn cursor_moved(&mut self, line: usize) {
        if self.cursor_line != Some(line) {
            self.cursor_line = Some(line);
            self.state.select_line(&self.map, line);
        }
    }

    // ── Document operations ───────────────────────────────────────────────────

    pub(super) fn open_document(&mut self, path: &Path) {
        match OutlineDocument::open(path) {
            Ok(doc) => {
                self.doc = doc;
                self.undo_stack.clear();
                self.state = MapState::default();
                self.cursor_line = None;
                self.reparse();
                self.view.request_fit();
                self.status = format!("Opened {}", path.display());
            }
            Err(e) => {
                tracing::error!(error = %e, "open failed");
                self.status = format!("Open failed: {e}");
            }
        }
    }

    pub(super) fn save_document(&mut self) {
        match self.doc.path.clone() {
            Some(path) => self.save_document_to(&path),
            None => self.save_document_as(),
        }
    }

    pub(super) fn save_document_as(&mut self) {
        let hint = self.doc.path.clone().unwrap_or_else(|| PathBuf::from("mindmap.txt"));
        if let Some(path) = rfd_save_file(&hint, "Outline", "txt") {
            self.save_document_to(&path);
        }
    }

    pub(super) fn save_document_to(&mut self, path: &Path) {
        match self.doc.save_to(path) {
            Ok(()) => self.status = format!("Saved {}", path.display()),
            Err(e) => {
                tracing::error!(error = %e, "save failed");
                self.status = format!("Save failed: {e}");
            }
        }
    }

    pub(super) fn new_document(&mut self) {
        self.doc = OutlineDocument::new("");
        self.undo_stack.clear();
        self.state = MapState::default();
        self.cursor_line = None;
        self.reparse();
        self.status = "New outline".to_owned();
    }

    pub(super) fn export_json(&mut self) {
        let hint = self.doc.path.as_ref()
            .map(|p| p.with_extension("json"))
            .unwrap_or_else(|| PathBuf::from("mindmap.json"));
        if let Some(dest) = rfd_save_file(&hint, "JSON", "json") {
            self.status = match export_map_json(&dest, &self.map, &self.state) {
                Ok(()) => format!("Exported {}", dest.display()),
                Err(e) => {
                    tracing::error!(error = %e, "export failed");
                    format!("Export failed: {e}")
                }
            };
        }
    }

    // ── Settings ──────────────────────────────────────────────────────────────

    /// Layout settings changed: relayout with the same state.
    pub(super) fn relayout(&mut self) {
        self.reparse();
    }

    pub(super) fn save_settings(&mut self) {
        let Some(path) = self.config_path.clone() else {
            self.status = "No settings location available".to_owned();
            return;
        };
        self.status = match self.settings.save(&path) {
            Ok(()) => format!("Settings saved to {}", path.display()),
            Err(e) => {
                tracing::error!(error = %e, "settings save failed");
                format!("Settings not saved: {e}")
            }
        };
    }

    pub(super) fn apply_visuals(&self, ctx: &egui::Context) {
        let visuals = if self.settings.view.dark_mode {
            egui::Visuals::dark()
        } else {
            egui::Visuals::light()
        };
        ctx.set_visuals(visuals);
    }
}

// ── eframe::App impl ──────────────────────────────────────────────────────────

impl eframe::App for MindMapApp {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        self.apply_visuals(ctx);

        // Keyboard shortcuts (checked before UI to avoid conflicts)
        self.handle_keyboard(ctx);

        self.draw_menu_bar(ctx);
        self.draw_status_bar(ctx);

        // Split pane: outline text on the left, diagram in the centre
        self.draw_editor_panel(ctx);
        self.draw_canvas_panel(ctx);

        self.draw_settings_window(ctx);
    }
}

// ── Tests ──────────────────────────────────────────────────────────────────────
