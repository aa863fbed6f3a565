use std::collections::HashMap;

use egui::Color32;
use serde::{Deserialize, Serialize};

// ── NodeId ────────────────────────────────────────────────────────────────────

/// Index of a node inside `MindMap::nodes`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct NodeId(pub usize);

// ── MapNode / MapEdge ─────────────────────────────────────────────────────────

/// One outline line turned into a positioned diagram node.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MapNode {
    pub id: NodeId,
    /// Identity that survives reparsing as long as the label path is unchanged.
    pub key: String,
    pub label: String,
    /// 0-based line in the source text.
    pub line: usize,
    /// Nesting depth; roots are 0.
    pub level: usize,
    pub parent: Option<NodeId>,
    pub children: Vec<NodeId>,
    pub x: f32,
    pub y: f32,
}

impl MapNode {
    pub fn has_children(&self) -> bool {
        !self.children.is_empty()
    }
}

/// Parent → child link.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct MapEdge {
    pub source: NodeId,
    pub target: NodeId,
}

// ── MindMap ───────────────────────────────────────────────────────────────────

/// The parsed tree: nodes in line order plus one edge per non-root node.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MindMap {
    pub nodes: Vec<MapNode>,
    pub edges: Vec<MapEdge>,
}

impl MindMap {
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn node(&self, id: NodeId) -> Option<&MapNode> {
        self.nodes.get(id.0)
    }

    pub fn roots(&self) -> impl Iterator<Item = &MapNode> {
        self.nodes.iter().filter(|n| n.parent.is_none())
    }

    /// Ancestors of `id`, nearest first.
    pub fn ancestors(&self, id: NodeId) -> Vec<NodeId> {
        let mut out = Vec::new();
        let mut cur = self.node(id).and_then(|n| n.parent);
        while let Some(p) = cur {
            out.push(p);
            cur = self.node(p).and_then(|n| n.parent);
        }
        out
    }

    /// All descendants of `id` in pre-order (which is also line order).
    pub fn descendants(&self, id: NodeId) -> Vec<NodeId> {
        let mut out = Vec::new();
        fn walk(map: &MindMap, id: NodeId, out: &mut Vec<NodeId>) {
            if let Some(node) = map.node(id) {
                for &c in &node.children {
                    out.push(c);
                    walk(map, c, out);
                }
            }
        }
        walk(self, id, &mut out);
        out
    }

    /// The node produced by `line`, or the closest node above it.
    pub fn node_at_line(&self, line: usize) -> Option<NodeId> {
        let idx = self.nodes.partition_point(|n| n.line <= line);
        idx.checked_sub(1).map(NodeId)
    }

    pub fn find_by_key(&self, key: &str) -> Option<NodeId> {
        self.nodes.iter().find(|n| n.key == key).map(|n| n.id)
    }

    /// Deepest level plus one; 0 for an empty map.
    pub fn depth(&self) -> usize {
        self.nodes.iter().map(|n| n.level + 1).max().unwrap_or(0)
    }

    /// Index of the top-level branch `id` belongs to, counted across all roots'
    /// children. Roots themselves have no branch.
    pub fn branch_index(&self, id: NodeId) -> Option<usize> {
        if self.node(id)?.level == 0 {
            return None;
        }
        let chain = self.ancestors(id);
        // The ancestor one level below the root, or the node itself.
        let top = if chain.len() >= 2 { chain[chain.len() - 2] } else { id };
        self.nodes
            .iter()
            .filter(|n| n.level == 1)
            .position(|n| n.id == top)
    }

    /// `branch_index` for every node, computed in one pass over line order.
    pub fn branch_indices(&self) -> Vec<Option<usize>> {
        let mut out: Vec<Option<usize>> = Vec::with_capacity(self.nodes.len());
        let mut next = 0;
        for node in &self.nodes {
            let branch = match node.level {
                0 => None,
                1 => {
                    next += 1;
                    Some(next - 1)
                }
                // parents precede their children
                _ => node.parent.and_then(|p| out.get(p.0).copied().flatten()),
            };
            out.push(branch);
        }
        out
    }

    /// Key → id lookup for the whole map.
    pub fn key_index(&self) -> HashMap<&str, NodeId> {
        self.nodes.iter().map(|n| (n.key.as_str(), n.id)).collect()
    }

    /// Check that nodes, parent/child links and edges all agree.
    pub fn is_consistent(&self) -> bool {
        for (i, n) in self.nodes.iter().enumerate() {
            if n.id.0 != i {
                return false;
            }
            match n.parent {
                Some(p) => {
                    let Some(parent) = self.node(p) else { return false };
                    if !parent.children.contains(&n.id) || parent.level + 1 != n.level {
                        return false;
                    }
                    let incoming = self.edges.iter().filter(|e| e.target == n.id).count();
                    if incoming != 1 || !self.edges.contains(&MapEdge { source: p, target: n.id }) {
                        return false;
                    }
                }
                None => {
                    if n.level != 0 || self.edges.iter().any(|e| e.target == n.id) {
                        return false;
                    }
                }
            }
        }
        self.edges
            .iter()
            .all(|e| self.node(e.source).is_some() && self.node(e.target).is_some())
    }
}

// ── Styling ───────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum NodeShape {
    #[default]
    Rounded,
    Rect,
    Pill,
}

impl NodeShape {
    pub fn label(&self) -> &'static str {
        match self {
            NodeShape::Rounded => "Rounded",
            NodeShape::Rect    => "Rectangle",
            NodeShape::Pill    => "Pill",
        }
    }
    pub fn all() -> &'static [NodeShape] {
        &[NodeShape::Rounded, NodeShape::Rect, NodeShape::Pill]
    }
    pub fn corner_radius(&self, height: f32) -> f32 {
        match self {
            NodeShape::Rounded => 6.0,
            NodeShape::Rect    => 0.0,
            NodeShape::Pill    => height / 2.0,
        }
    }
}

/// Per-node style override chosen from the context menu.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct NodeStyle {
    /// RGB fill; `None` falls back to the branch palette.
    pub color: Option<[u8; 3]>,
    pub shape: NodeShape,
    pub bold: bool,
}

/// Style after palette fallback, ready to paint.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ResolvedStyle {
    pub fill: Color32,
    pub shape: NodeShape,
    pub bold: bool,
}

/// Node fill colours, one per top-level branch.
pub struct Palette;

impl Palette {
    pub const BRANCHES: [[u8; 3]; 8] = [
        [ 90, 160, 230],
        [240, 160,  70],
        [110, 190, 120],
        [220,  90, 110],
        [160, 120, 220],
        [ 70, 190, 190],
        [230, 200,  80],
        [200, 130, 170],
    ];
    pub const ROOT: [u8; 3] = [0, 122, 204];

    pub fn branch(index: usize) -> [u8; 3] {
        Self::BRANCHES[index % Self::BRANCHES.len()]
    }

    pub fn to_color(rgb: [u8; 3]) -> Color32 {
        Color32::from_rgb(rgb[0], rgb[1], rgb[2])
    }

    /// Black or white, whichever reads better on `fill`.
    pub fn text_on(fill: Color32) -> Color32 {
        let luma = 0.299 * fill.r() as f32 + 0.587 * fill.g() as f32 + 0.114 * fill.b() as f32;
        if luma > 150.0 { Color32::from_gray(20) } else { Color32::WHITE }
    }
}

// ── Settings ──────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LayoutSettings {
    /// Horizontal distance between nesting levels.
    pub h_spacing: f32,
    /// Vertical distance between rows.
    pub v_spacing: f32,
    pub tab_width: usize,
    /// Drop a leading `-`, `*` or `+` list marker from labels.
    pub strip_bullets: bool,
    /// Re-row visible nodes so collapsed subtrees leave no gaps.
    pub compact_collapsed: bool,
}

impl Default for LayoutSettings {
    fn default() -> Self {
        LayoutSettings {
            h_spacing: 220.0,
            v_spacing: 56.0,
            tab_width: 4,
            strip_bullets: true,
            compact_collapsed: true,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ViewSettings {
    pub dark_mode: bool,
    pub font_size: f32,
    /// Labels longer than this are shortened with an ellipsis.
    pub max_label_chars: usize,
    pub hover_highlight: bool,
}

impl Default for ViewSettings {
    fn default() -> Self {
        ViewSettings {
            dark_mode: true,
            font_size: 14.0,
            max_label_chars: 28,
            hover_highlight: true,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub layout: LayoutSettings,
    pub view: ViewSettings,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::app::outline::parse_outline;

    fn parse(text: &str) -> MindMap {
        parse_outline(text, &LayoutSettings::default())
    }

    #[test]
    fn test_consistent_after_parse() {
        assert!(parse("R\n  A\n    A1\n  B\nS\n  C").is_consistent());
        assert!(MindMap::default().is_consistent());
    }

    #[test]
    fn test_inconsistent_dangling_edge() {
        let mut map = parse("R\n  A");
        map.edges.push(MapEdge { source: NodeId(0), target: NodeId(99) });
        assert!(!map.is_consistent());
    }

    #[test]
    fn test_inconsistent_duplicate_incoming_edge() {
        let mut map = parse("R\n  A");
        map.edges.push(map.edges[0]);
        assert!(!map.is_consistent());
    }

    #[test]
    fn test_inconsistent_missing_child_link() {
        let mut map = parse("R\n  A\n  B");
        map.nodes[0].children.retain(|&c| c != NodeId(2));
        assert!(!map.is_consistent());
    }

    #[test]
    fn test_inconsistent_level_gap() {
        let mut map = parse("R\n  A\n    A1");
        map.nodes[2].level = 5;
        assert!(!map.is_consistent());
    }

    #[test]
    fn test_inconsistent_root_with_incoming_edge() {
        let mut map = parse("A\nB");
        map.edges.push(MapEdge { source: NodeId(0), target: NodeId(1) });
        assert!(!map.is_consistent());
    }

    #[test]
    fn test_inconsistent_id_out_of_place() {
        let mut map = parse("R\n  A");
        map.nodes[1].id = NodeId(7);
        assert!(!map.is_consistent());
    }

    #[test]
    fn test_branch_indices_match_branch_index() {
        let map = parse("R\n  A\n    A1\n      A2\n  B\nS\n  C\n    C1");
        let all = map.branch_indices();
        assert_eq!(all, vec![None, Some(0), Some(0), Some(0), Some(1), None, Some(2), Some(2)]);
        for node in &map.nodes {
            assert_eq!(all[node.id.0], map.branch_index(node.id));
        }
    }

    #[test]
    fn test_key_index_covers_every_node() {
        let map = parse("R\n  x\n  x\n    y");
        let index = map.key_index();
        assert_eq!(index.len(), map.len());
        for node in &map.nodes {
            assert_eq!(index.get(node.key.as_str()), Some(&node.id));
        }
    }
}
