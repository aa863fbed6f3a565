use std::collections::HashMap;

use super::models::{LayoutSettings, MapEdge, MapNode, MindMap, NodeId};

// ── Line scanning ─────────────────────────────────────────────────────────────

/// Column width of the leading whitespace, with tabs advancing to the next
/// multiple of `tab_width`.
pub fn indent_width(line: &str, tab_width: usize) -> usize {
    let tab = tab_width.max(1);
    let mut col = 0;
    for ch in line.chars() {
        match ch {
            ' ' => col += 1,
            '\t' => col += tab - col % tab,
            c if c.is_whitespace() => col += 1,
            _ => break,
        }
    }
    col
}

/// Label text of a line, or `None` if the line produces no node.
fn line_label(line: &str, strip_bullets: bool) -> Option<&str> {
    let mut label = line.trim();
    if strip_bullets {
        for marker in ['-', '*', '+'] {
            if let Some(rest) = label.strip_prefix(marker) {
                if rest.is_empty() || rest.starts_with(char::is_whitespace) {
                    label = rest.trim_start();
                }
                break;
            }
        }
    }
    if label.is_empty() { None } else { Some(label) }
}

/// Escape the characters a key uses as separators, so labels containing
/// `/` or `#` cannot spell out another node's path.
fn escape_key_part(label: &str) -> String {
    let mut out = String::with_capacity(label.len());
    for ch in label.chars() {
        if matches!(ch, '\\' | '/' | '#') {
            out.push('\\');
        }
        out.push(ch);
    }
    out
}

// ── Parsing + layout ──────────────────────────────────────────────────────────

/// Turn indented outline text into positioned nodes and parent → child edges.
///
/// Each non-blank line becomes one node. Its parent is the closest preceding
/// line with strictly smaller indentation that is still an open ancestor, so a
/// dedent to an unseen column attaches to the nearest shallower ancestor.
/// Coordinates are a grid: `x` by level, `y` by line order.
pub fn parse_outline(text: &str, settings: &LayoutSettings) -> MindMap {
    let mut map = MindMap::default();
    // (indent, node) for the current ancestor chain
    let mut stack: Vec<(usize, NodeId)> = Vec::new();
    // (parent, label) → siblings seen so far with that label
    let mut seen: HashMap<(Option<NodeId>, String), usize> = HashMap::new();

    for (line_no, line) in text.lines().enumerate() {
        let Some(label) = line_label(line, settings.strip_bullets) else {
            continue;
        };
        let indent = indent_width(line, settings.tab_width);
        while stack.last().is_some_and(|&(i, _)| i >= indent) {
            stack.pop();
        }
        let parent = stack.last().map(|&(_, id)| id);
        let level = stack.len();
        let id = NodeId(map.nodes.len());

        let occurrence = seen.entry((parent, label.to_owned())).or_insert(0);
        let parent_key = parent.map(|p| map.nodes[p.0].key.as_str()).unwrap_or("");
        let key = format!("{parent_key}/{}#{occurrence}", escape_key_part(label));
        *occurrence += 1;

        let row = map.nodes.len();
        map.nodes.push(MapNode {
            id,
            key,
            label: label.to_owned(),
            line: line_no,
            level,
            parent,
            children: vec![],
            x: level as f32 * settings.h_spacing,
            y: row as f32 * settings.v_spacing,
        });
        if let Some(p) = parent {
            map.nodes[p.0].children.push(id);
            map.edges.push(MapEdge { source: p, target: id });
        }
        stack.push((indent, id));
    }

    tracing::trace!(nodes = map.nodes.len(), edges = map.edges.len(), "parsed outline");
    map
}

/// Render the tree back to text, one node per line, with canonical indentation.
pub fn to_outline_text(map: &MindMap, indent: &str) -> String {
    let mut out = String::new();
    for node in &map.nodes {
        for _ in 0..node.level {
            out.push_str(indent);
        }
        out.push_str(&node.label);
        out.push('\n');
    }
    out
}

/// 0-based line containing the character at `char_idx`.
pub fn line_of_char(text: &str, char_idx: usize) -> usize {
    text.chars().take(char_idx).filter(|&c| c == '\n').count()
}
