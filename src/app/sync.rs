use std::collections::{BTreeMap, BTreeSet, HashSet};

use serde::{Deserialize, Serialize};

use super::models::{
    LayoutSettings, MindMap, NodeId, NodeStyle, Palette, ResolvedStyle,
};

// ── MapState ──────────────────────────────────────────────────────────────────

/// Interaction state layered on top of a parsed `MindMap`.
///
/// Collapse and style entries are keyed by `MapNode::key`, so they follow a
/// node across reparses while its label path stays the same. Hover and
/// selection hold ids into the current map and are remapped by `reconcile`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MapState {
    collapsed: BTreeSet<String>,
    styles: BTreeMap<String, NodeStyle>,
    #[serde(skip)]
    hovered: Option<NodeId>,
    #[serde(skip)]
    selected: Option<NodeId>,
}

impl MapState {
    /// Carry state from `old` over to a freshly parsed `new` map.
    pub fn reconcile(&mut self, old: &MindMap, new: &MindMap) {
        let index = new.key_index();
        self.collapsed.retain(|key| {
            index
                .get(key.as_str())
                .and_then(|&id| new.node(id))
                .is_some_and(|n| n.has_children())
        });
        self.styles.retain(|key, _| index.contains_key(key.as_str()));

        let remap = |id: Option<NodeId>| -> Option<NodeId> {
            let key = old.node(id?)?.key.as_str();
            index.get(key).copied()
        };
        self.hovered = remap(self.hovered);
        self.selected = remap(self.selected);
    }

    // ── Collapse / expand ─────────────────────────────────────────────────────

    pub fn is_collapsed(&self, map: &MindMap, id: NodeId) -> bool {
        map.node(id).is_some_and(|n| self.collapsed.contains(&n.key))
    }

    /// Flip the collapsed flag of a node with children; returns the new state.
    /// Leaves are never collapsed.
    pub fn toggle_collapsed(&mut self, map: &MindMap, id: NodeId) -> bool {
        let Some(node) = map.node(id) else { return false };
        if !node.has_children() {
            return false;
        }
        if self.collapsed.remove(&node.key) {
            false
        } else {
            self.collapsed.insert(node.key.clone());
            true
        }
    }

    pub fn expand_all(&mut self) {
        self.collapsed.clear();
    }

    pub fn collapse_all(&mut self, map: &MindMap) {
        self.collapse_to_level(map, 0);
    }

    /// Show nodes down to `level`; everything deeper is folded away.
    pub fn collapse_to_level(&mut self, map: &MindMap, level: usize) {
        self.collapsed = map
            .nodes
            .iter()
            .filter(|n| n.has_children() && n.level >= level)
            .map(|n| n.key.clone())
            .collect();
    }

    /// Keep the top `count` levels open: 1 shows only roots, 2 adds their
    /// children. 0 behaves like 1.
    pub fn show_levels(&mut self, map: &MindMap, count: usize) {
        self.collapse_to_level(map, count.saturating_sub(1));
    }

    pub fn collapsed_count(&self) -> usize {
        self.collapsed.len()
    }

    /// True if any ancestor of `id` is collapsed.
    pub fn is_hidden(&self, map: &MindMap, id: NodeId) -> bool {
        map.ancestors(id).into_iter().any(|a| self.is_collapsed(map, a))
    }

    // ── Hover / selection ─────────────────────────────────────────────────────

    pub fn hovered(&self) -> Option<NodeId> {
        self.hovered
    }

    pub fn set_hovered(&mut self, id: Option<NodeId>) {
        self.hovered = id;
    }

    pub fn selected(&self) -> Option<NodeId> {
        self.selected
    }

    pub fn set_selected(&mut self, id: Option<NodeId>) {
        self.selected = id;
    }

    /// Select the node for an editor cursor line.
    pub fn select_line(&mut self, map: &MindMap, line: usize) {
        self.selected = map.node_at_line(line);
    }

    // ── Styling ───────────────────────────────────────────────────────────────

    pub fn style(&self, map: &MindMap, id: NodeId) -> NodeStyle {
        map.node(id)
            .and_then(|n| self.styles.get(&n.key))
            .copied()
            .unwrap_or_default()
    }

    pub fn set_style(&mut self, map: &MindMap, id: NodeId, style: NodeStyle) {
        if let Some(node) = map.node(id) {
            if style == NodeStyle::default() {
                self.styles.remove(&node.key);
            } else {
                self.styles.insert(node.key.clone(), style);
            }
        }
    }

    pub fn clear_style(&mut self, map: &MindMap, id: NodeId) {
        if let Some(node) = map.node(id) {
            self.styles.remove(&node.key);
        }
    }

    pub fn styled_count(&self) -> usize {
        self.styles.len()
    }

    /// Override colour, else the root colour for roots, else the branch colour.
    pub fn resolved_style(&self, map: &MindMap, id: NodeId) -> ResolvedStyle {
        self.resolve_with_branch(map, id, map.branch_index(id))
    }

    fn resolve_with_branch(&self, map: &MindMap, id: NodeId, branch: Option<usize>) -> ResolvedStyle {
        let style = self.style(map, id);
        let rgb = style.color.unwrap_or_else(|| match branch {
            Some(b) => Palette::branch(b),
            None => Palette::ROOT,
        });
        ResolvedStyle {
            fill: Palette::to_color(rgb),
            shape: style.shape,
            bold: style.bold,
        }
    }

    // ── Visibility ────────────────────────────────────────────────────────────

    /// Nodes linked to the hovered one: itself, its ancestors and descendants.
    pub fn highlight_set(&self, map: &MindMap) -> HashSet<NodeId> {
        let mut set = HashSet::new();
        if let Some(h) = self.hovered.filter(|&h| map.node(h).is_some()) {
            set.insert(h);
            set.extend(map.ancestors(h));
            set.extend(map.descendants(h));
        }
        set
    }

    /// What the canvas should paint right now.
    pub fn visible(&self, map: &MindMap, layout: &LayoutSettings) -> VisibleMap {
        let highlight = self.highlight_set(map);
        let branches = map.branch_indices();
        let mut shown = vec![false; map.nodes.len()];
        let mut hidden_by: Vec<Option<NodeId>> = vec![None; map.nodes.len()];
        let mut out = VisibleMap { slots: vec![None; map.nodes.len()], ..Default::default() };

        // Line order is pre-order, so a parent is always decided before its children.
        for node in &map.nodes {
            let visible = match node.parent {
                None => true,
                Some(p) => shown[p.0] && !self.collapsed.contains(&map.nodes[p.0].key),
            };
            if !visible {
                // Credit the hidden node to its topmost collapsed ancestor.
                if let Some(p) = node.parent {
                    hidden_by[node.id.0] = if shown[p.0] { Some(p) } else { hidden_by[p.0] };
                }
                continue;
            }
            shown[node.id.0] = true;
            let row = out.nodes.len();
            out.slots[node.id.0] = Some(row);
            let y = if layout.compact_collapsed {
                row as f32 * layout.v_spacing
            } else {
                node.y
            };
            out.nodes.push(VisibleNode {
                id: node.id,
                x: node.x,
                y,
                collapsed: self.collapsed.contains(&node.key),
                hidden_descendants: 0,
                highlighted: highlight.contains(&node.id),
                selected: self.selected == Some(node.id),
                style: self.resolve_with_branch(map, node.id, branches[node.id.0]),
            });
        }

        let mut hidden_counts = vec![0usize; map.nodes.len()];
        for owner in hidden_by.iter().flatten() {
            hidden_counts[owner.0] += 1;
        }
        for vn in &mut out.nodes {
            vn.hidden_descendants = hidden_counts[vn.id.0];
        }

        out.edges = map
            .edges
            .iter()
            .filter(|e| shown[e.source.0] && shown[e.target.0])
            .map(|e| VisibleEdge {
                source: e.source,
                target: e.target,
                highlighted: highlight.contains(&e.source) && highlight.contains(&e.target),
            })
            .collect();
        out
    }
}

// ── VisibleMap ────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq)]
pub struct VisibleNode {
    pub id: NodeId,
    pub x: f32,
    pub y: f32,
    pub collapsed: bool,
    /// Descendants folded away beneath this node.
    pub hidden_descendants: usize,
    pub highlighted: bool,
    pub selected: bool,
    pub style: ResolvedStyle,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VisibleEdge {
    pub source: NodeId,
    pub target: NodeId,
    pub highlighted: bool,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct VisibleMap {
    pub nodes: Vec<VisibleNode>,
    pub edges: Vec<VisibleEdge>,
    /// Position in `nodes` for each map node id, `None` when hidden.
    slots: Vec<Option<usize>>,
}

impl VisibleMap {
    pub fn get(&self, id: NodeId) -> Option<&VisibleNode> {
        let row = self.slots.get(id.0).copied().flatten()?;
        self.nodes.get(row)
    }

    pub fn any_highlighted(&self) -> bool {
        self.nodes.iter().any(|n| n.highlighted)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::app::models::NodeShape;
    use crate::app::outline::parse_outline;

    const DOC: &str = "Root\n  A\n    A1\n    A2\n  B\n    B1\n      B1a\n";

    fn parse(text: &str) -> MindMap {
        parse_outline(text, &LayoutSettings::default())
    }

    fn id_of(map: &MindMap, label: &str) -> NodeId {
        map.nodes.iter().find(|n| n.label == label).map(|n| n.id).unwrap()
    }

    fn visible_labels(map: &MindMap, v: &VisibleMap) -> Vec<String> {
        v.nodes.iter().map(|n| map.nodes[n.id.0].label.clone()).collect()
    }

    #[test]
    fn test_toggle_leaf_is_noop() {
        let map = parse(DOC);
        let mut state = MapState::default();
        assert!(!state.toggle_collapsed(&map, id_of(&map, "A1")));
        assert_eq!(state.collapsed_count(), 0);
    }

    #[test]
    fn test_collapse_hides_subtree_and_edges() {
        let map = parse(DOC);
        let mut state = MapState::default();
        assert!(state.toggle_collapsed(&map, id_of(&map, "B")));
        let v = state.visible(&map, &LayoutSettings::default());
        assert_eq!(visible_labels(&map, &v), vec!["Root", "A", "A1", "A2", "B"]);
        assert_eq!(v.edges.len(), 4);
        for e in &v.edges {
            assert!(v.get(e.source).is_some() && v.get(e.target).is_some());
        }
        let b = v.get(id_of(&map, "B")).unwrap();
        assert!(b.collapsed);
        assert_eq!(b.hidden_descendants, 2);
        assert!(state.is_hidden(&map, id_of(&map, "B1a")));
    }

    #[test]
    fn test_toggle_twice_expands() {
        let map = parse(DOC);
        let mut state = MapState::default();
        let b = id_of(&map, "B");
        assert!(state.toggle_collapsed(&map, b));
        assert!(!state.toggle_collapsed(&map, b));
        assert_eq!(state.visible(&map, &LayoutSettings::default()).nodes.len(), map.len());
    }

    #[test]
    fn test_nested_collapse_counts_on_outer() {
        let map = parse(DOC);
        let mut state = MapState::default();
        state.toggle_collapsed(&map, id_of(&map, "B1"));
        state.toggle_collapsed(&map, id_of(&map, "B"));
        let v = state.visible(&map, &LayoutSettings::default());
        assert_eq!(v.get(id_of(&map, "B")).unwrap().hidden_descendants, 2);
        // expanding the outer node leaves the inner one folded
        state.toggle_collapsed(&map, id_of(&map, "B"));
        let v = state.visible(&map, &LayoutSettings::default());
        assert_eq!(visible_labels(&map, &v).last().map(String::as_str), Some("B1"));
        assert_eq!(v.get(id_of(&map, "B1")).unwrap().hidden_descendants, 1);
    }

    #[test]
    fn test_compact_rows_close_gaps() {
        let map = parse(DOC);
        let mut state = MapState::default();
        state.toggle_collapsed(&map, id_of(&map, "A"));
        let layout = LayoutSettings::default();
        let v = state.visible(&map, &layout);
        let b = v.get(id_of(&map, "B")).unwrap();
        assert_eq!(b.y, 2.0 * layout.v_spacing);

        let sparse = LayoutSettings { compact_collapsed: false, ..Default::default() };
        let v = state.visible(&map, &sparse);
        assert_eq!(v.get(id_of(&map, "B")).unwrap().y, map.nodes[id_of(&map, "B").0].y);
    }

    #[test]
    fn test_collapse_to_level() {
        let map = parse(DOC);
        let mut state = MapState::default();
        state.collapse_to_level(&map, 1);
        let v = state.visible(&map, &LayoutSettings::default());
        assert_eq!(visible_labels(&map, &v), vec!["Root", "A", "B"]);

        state.collapse_all(&map);
        let v = state.visible(&map, &LayoutSettings::default());
        assert_eq!(visible_labels(&map, &v), vec!["Root"]);
        assert_eq!(v.nodes[0].hidden_descendants, 6);

        state.expand_all();
        assert_eq!(state.visible(&map, &LayoutSettings::default()).nodes.len(), map.len());
    }

    #[test]
    fn test_show_levels_counts_from_one() {
        let map = parse(DOC);
        let mut state = MapState::default();
        state.show_levels(&map, 1);
        let v = state.visible(&map, &LayoutSettings::default());
        assert_eq!(visible_labels(&map, &v), vec!["Root"]);

        state.show_levels(&map, 2);
        let v = state.visible(&map, &LayoutSettings::default());
        assert_eq!(visible_labels(&map, &v), vec!["Root", "A", "B"]);

        state.show_levels(&map, 0);
        assert_eq!(state.visible(&map, &LayoutSettings::default()).nodes.len(), 1);
    }

    #[test]
    fn test_large_map_lookup_and_branch_colours() {
        let mut text = String::from("Root\n");
        for b in 0..200 {
            text.push_str(&format!("  branch {b}\n"));
            for l in 0..20 {
                text.push_str(&format!("    leaf {l}\n      detail\n"));
            }
        }
        let map = parse(&text);
        assert_eq!(map.len(), 1 + 200 * 41);

        let mut state = MapState::default();
        state.toggle_collapsed(&map, id_of(&map, "branch 3"));
        let v = state.visible(&map, &LayoutSettings::default());
        assert_eq!(v.nodes.len(), map.len() - 40);
        for node in &map.nodes {
            match v.get(node.id) {
                Some(vn) => {
                    assert_eq!(vn.id, node.id);
                    assert_eq!(vn.style, state.resolved_style(&map, node.id));
                }
                None => assert!(state.is_hidden(&map, node.id)),
            }
        }
        let last = map.nodes.last().unwrap().id;
        assert_eq!(v.get(last).unwrap().style.fill, Palette::to_color(Palette::branch(199)));
        assert!(v.get(NodeId(map.len())).is_none());
    }

    #[test]
    fn test_reconcile_large_map_keeps_state() {
        let mut text = String::from("Root\n");
        for b in 0..500 {
            text.push_str(&format!("  b{b}\n    c\n"));
        }
        let old = parse(&text);
        let mut state = MapState::default();
        state.collapse_to_level(&old, 1);
        state.set_hovered(Some(id_of(&old, "b499")));
        let new = parse(&format!("Root\n  new\n{}", &text["Root\n".len()..]));
        state.reconcile(&old, &new);
        assert_eq!(state.collapsed_count(), 500);
        assert_eq!(state.hovered(), Some(id_of(&new, "b499")));
    }

    #[test]
    fn test_reconcile_keeps_collapse_after_insert_above() {
        let old = parse(DOC);
        let mut state = MapState::default();
        state.toggle_collapsed(&old, id_of(&old, "B"));
        let new = parse("Root\n  Z\n  A\n    A1\n    A2\n  B\n    B1\n      B1a\n");
        state.reconcile(&old, &new);
        assert!(state.is_collapsed(&new, id_of(&new, "B")));
        assert!(!state.is_collapsed(&new, id_of(&new, "Z")));
    }

    #[test]
    fn test_reconcile_drops_collapse_when_children_removed() {
        let old = parse(DOC);
        let mut state = MapState::default();
        state.toggle_collapsed(&old, id_of(&old, "A"));
        let new = parse("Root\n  A\n  B\n");
        state.reconcile(&old, &new);
        assert_eq!(state.collapsed_count(), 0);
    }

    #[test]
    fn test_reconcile_drops_renamed_node_state() {
        let old = parse(DOC);
        let mut state = MapState::default();
        let style = NodeStyle { color: Some([1, 2, 3]), shape: NodeShape::Pill, bold: true };
        state.set_style(&old, id_of(&old, "A2"), style);
        assert_eq!(state.styled_count(), 1);
        let new = parse(&DOC.replace("A2", "A3"));
        state.reconcile(&old, &new);
        assert_eq!(state.styled_count(), 0);
    }

    #[test]
    fn test_reconcile_remaps_hover_and_clears_missing() {
        let old = parse(DOC);
        let mut state = MapState::default();
        state.set_hovered(Some(id_of(&old, "B1")));
        state.set_selected(Some(id_of(&old, "A1")));
        let new = parse("Root\n  X\n  B\n    B1\n");
        state.reconcile(&old, &new);
        assert_eq!(state.hovered(), Some(id_of(&new, "B1")));
        assert_eq!(state.selected(), None);
    }

    #[test]
    fn test_hover_highlights_lineage() {
        let map = parse(DOC);
        let mut state = MapState::default();
        state.set_hovered(Some(id_of(&map, "B1")));
        let v = state.visible(&map, &LayoutSettings::default());
        let lit: Vec<String> = v
            .nodes
            .iter()
            .filter(|n| n.highlighted)
            .map(|n| map.nodes[n.id.0].label.clone())
            .collect();
        assert_eq!(lit, vec!["Root", "B", "B1", "B1a"]);
        assert_eq!(v.edges.iter().filter(|e| e.highlighted).count(), 3);
    }

    #[test]
    fn test_no_hover_no_highlight() {
        let map = parse(DOC);
        let v = MapState::default().visible(&map, &LayoutSettings::default());
        assert!(!v.any_highlighted());
    }

    #[test]
    fn test_resolved_style_palette_and_override() {
        let map = parse(DOC);
        let mut state = MapState::default();
        let root = state.resolved_style(&map, id_of(&map, "Root"));
        assert_eq!(root.fill, Palette::to_color(Palette::ROOT));
        let a1 = state.resolved_style(&map, id_of(&map, "A1"));
        assert_eq!(a1.fill, Palette::to_color(Palette::branch(0)));
        let b1a = state.resolved_style(&map, id_of(&map, "B1a"));
        assert_eq!(b1a.fill, Palette::to_color(Palette::branch(1)));

        let b = id_of(&map, "B");
        state.set_style(&map, b, NodeStyle { color: Some([9, 9, 9]), ..Default::default() });
        assert_eq!(state.resolved_style(&map, b).fill, Palette::to_color([9, 9, 9]));
        state.clear_style(&map, b);
        assert_eq!(state.styled_count(), 0);
    }

    #[test]
    fn test_default_style_is_not_stored() {
        let map = parse(DOC);
        let mut state = MapState::default();
        state.set_style(&map, NodeId(0), NodeStyle::default());
        assert_eq!(state.styled_count(), 0);
    }

    #[test]
    fn test_select_line_picks_nearest_node_above() {
        let map = parse("Root\n\n  A\n\n");
        let mut state = MapState::default();
        state.select_line(&map, 1);
        assert_eq!(state.selected(), Some(NodeId(0)));
        state.select_line(&map, 4);
        assert_eq!(state.selected(), Some(NodeId(1)));
    }
}
