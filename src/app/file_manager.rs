use std::path::{Path, PathBuf};
use serde::Serialize;

use super::error::{MapError, Result};
use super::models::{MapEdge, MapNode, MindMap};
use super::sync::MapState;

// ── Outline document ──────────────────────────────────────────────────────────

/// The outline text being edited, plus where it lives on disk.
#[derive(Debug, Clone, Default)]
pub struct OutlineDocument {
    pub path: Option<PathBuf>,
    pub content: String,
    pub modified: bool,
}

impl OutlineDocument {
    pub fn new(content: impl Into<String>) -> Self {
        OutlineDocument { path: None, content: content.into(), modified: false }
    }

    pub fn open(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|source| MapError::Read { path: path.to_owned(), source })?;
        tracing::info!(path = %path.display(), bytes = content.len(), "opened outline");
        Ok(OutlineDocument { path: Some(path.to_owned()), content, modified: false })
    }

    /// Write to `path` and adopt it as the document's location.
    pub fn save_to(&mut self, path: &Path) -> Result<()> {
        std::fs::write(path, &self.content)
            .map_err(|source| MapError::Write { path: path.to_owned(), source })?;
        self.path = Some(path.to_owned());
        self.modified = false;
        tracing::info!(path = %path.display(), "saved outline");
        Ok(())
    }

    pub fn title(&self) -> String {
        let name = self.path.as_ref()
            .and_then(|p| p.file_name())
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| "untitled".to_owned());
        if self.modified {
            format!("● {name}")
        } else {
            name
        }
    }
}

// ── JSON export ───────────────────────────────────────────────────────────────

#[derive(Serialize)]
struct MapExport<'a> {
    nodes: &'a [MapNode],
    edges: &'a [MapEdge],
    state: &'a MapState,
}

/// Nodes, edges and collapse/style state as pretty JSON.
pub fn map_to_json(map: &MindMap, state: &MapState) -> Result<String> {
    let export = MapExport { nodes: &map.nodes, edges: &map.edges, state };
    Ok(serde_json::to_string_pretty(&export)?)
}

pub fn export_map_json(path: &Path, map: &MindMap, state: &MapState) -> Result<()> {
    let json = map_to_json(map, state)?;
    std::fs::write(path, json)
        .map_err(|source| MapError::Write { path: path.to_owned(), source })?;
    tracing::info!(path = %path.display(), nodes = map.len(), "exported map JSON");
    Ok(())
}

// ── Thin wrappers around rfd ──────────────────────────────────────────────────

pub fn rfd_open_outline() -> Option<PathBuf> {
    #[cfg(not(target_arch = "wasm32"))]
    {
        rfd::FileDialog::new()
            .add_filter("Outline", &["txt", "md", "outline"])
            .add_filter("All files", &["*"])
            .pick_file()
    }
    #[cfg(target_arch = "wasm32")]
    {
        None
    }
}

pub fn rfd_save_file(hint: &Path, filter: &str, ext: &str) -> Option<PathBuf> {
    #[cfg(not(target_arch = "wasm32"))]
    {
        let name = hint.file_name().and_then(|n| n.to_str()).unwrap_or("mindmap");
        rfd::FileDialog::new()
            .set_file_name(name)
            .add_filter(filter, &[ext])
            .save_file()
    }
    #[cfg(target_arch = "wasm32")]
    {
        let _ = (hint, filter, ext);
        None
    }
}
