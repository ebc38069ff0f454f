use std::collections::{HashMap, HashSet};

use serde::Deserialize;

/// Distance from the origin to a level-1 branch node.
pub const BRANCH_RADIUS: f64 = 200.0;
/// Distance from a branch node to each of its leaves.
pub const LEAF_RADIUS: f64 = 120.0;
/// Angular window a branch's leaves are fanned into, centered on the
/// branch's outward angle.
pub const LEAF_WEDGE: f64 = std::f64::consts::FRAC_PI_2;

pub const ZOOM_STEP: f64 = 1.1;
pub const MIN_ZOOM: f64 = 0.2;
pub const MAX_ZOOM: f64 = 3.0;

/// The concept graph as it arrives from the structured endpoint: flat node
/// list plus directed connections, at most 15 nodes by contract.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ConceptGraph {
    pub nodes: Vec<ConceptNode>,
    pub connections: Vec<MapEdge>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ConceptNode {
    pub id: String,
    pub label: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct MapEdge {
    pub from: String,
    pub to: String,
}

/// A placed node. Coordinates are model-space and mutate directly under
/// drag gestures; there is no undo and no persistence.
#[derive(Debug, Clone, PartialEq)]
pub struct MapNode {
    pub id: String,
    pub label: String,
    pub x: f64,
    pub y: f64,
    pub level: u8,
}

/// Shared pan/zoom transform for the map canvas.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MapTransform {
    pub x: f64,
    pub y: f64,
    pub k: f64,
}

impl MapTransform {
    /// The framing applied right after a layout: roughly centers an
    /// 800x600 viewport on the origin.
    pub const FIT: MapTransform = MapTransform {
        x: 400.0,
        y: 300.0,
        k: 0.8,
    };

    pub fn pan(&mut self, dx: f64, dy: f64) {
        self.x += dx;
        self.y += dy;
    }

    pub fn zoom(&mut self, factor: f64) {
        self.k = (self.k * factor).clamp(MIN_ZOOM, MAX_ZOOM);
    }

    /// One wheel step in.
    pub fn zoom_in(&mut self) {
        self.zoom(ZOOM_STEP);
    }

    /// One wheel step out.
    pub fn zoom_out(&mut self) {
        self.zoom(1.0 / ZOOM_STEP);
    }
}

impl Default for MapTransform {
    fn default() -> Self {
        Self::FIT
    }
}

#[derive(Debug, Clone, Default)]
pub struct MindMap {
    pub nodes: Vec<MapNode>,
    pub edges: Vec<MapEdge>,
    pub transform: MapTransform,
}

impl MindMap {
    /// Moves a single node by a screen-space delta. The delta is divided by
    /// the current zoom so drag distance maps correctly to model space.
    pub fn drag(&mut self, id: &str, dx: f64, dy: f64) {
        let k = self.transform.k;
        if let Some(node) = self.nodes.iter_mut().find(|n| n.id == id) {
            node.x += dx / k;
            node.y += dy / k;
        }
    }

    pub fn fit_view(&mut self) {
        self.transform = MapTransform::FIT;
    }

    /// The canned Solar System map shown by the demo entry point, placed
    /// without a layout pass.
    pub fn demo() -> Self {
        let node = |id: &str, label: &str, x: f64, y: f64, level: u8| MapNode {
            id: id.to_string(),
            label: label.to_string(),
            x,
            y,
            level,
        };
        let edge = |from: &str, to: &str| MapEdge {
            from: from.to_string(),
            to: to.to_string(),
        };
        MindMap {
            nodes: vec![
                node("root", "Solar System", 0.0, 0.0, 0),
                node("sun", "The Sun", 0.0, -200.0, 1),
                node("planets", "Planets", 200.0, 0.0, 1),
                node("dwarf", "Dwarf Planets", 0.0, 200.0, 1),
                node("asteroids", "Asteroids", -200.0, 0.0, 1),
                node("p1", "Mercury", 250.0, -50.0, 2),
                node("p2", "Venus", 280.0, 0.0, 2),
                node("p3", "Earth", 250.0, 50.0, 2),
                node("p4", "Mars", 220.0, 100.0, 2),
            ],
            edges: vec![
                edge("root", "sun"),
                edge("root", "planets"),
                edge("root", "dwarf"),
                edge("root", "asteroids"),
                edge("planets", "p1"),
                edge("planets", "p2"),
                edge("planets", "p3"),
                edge("planets", "p4"),
            ],
            transform: MapTransform::FIT,
        }
    }
}

/// Picks the layout root: the unique node that never appears as an edge
/// target wins; if the graph has none or several of those, the first listed
/// node is used.
fn select_root(graph: &ConceptGraph) -> Option<&ConceptNode> {
    let targets: HashSet<&str> = graph.connections.iter().map(|c| c.to.as_str()).collect();
    let mut sources = graph.nodes.iter().filter(|n| !targets.contains(n.id.as_str()));
    match (sources.next(), sources.next()) {
        (Some(root), None) => Some(root),
        _ => graph.nodes.first(),
    }
}

/// Radial two-level layout: root at the origin, its children evenly spaced
/// on a circle of `BRANCH_RADIUS`, each child's own children fanned inside a
/// `LEAF_WEDGE` window around the child's outward angle at `LEAF_RADIUS`
/// from the child. Edges whose endpoints are unknown or unplaced are
/// dropped; nodes more than two hops from the root are not placed.
pub fn layout_radial(graph: &ConceptGraph) -> MindMap {
    let mut map = MindMap::default();
    let Some(root) = select_root(graph) else {
        return map;
    };

    let by_id: HashMap<&str, &ConceptNode> =
        graph.nodes.iter().map(|n| (n.id.as_str(), n)).collect();
    let mut placed: HashSet<&str> = HashSet::new();

    map.nodes.push(MapNode {
        id: root.id.clone(),
        label: root.label.clone(),
        x: 0.0,
        y: 0.0,
        level: 0,
    });
    placed.insert(root.id.as_str());

    let branches: Vec<&MapEdge> = graph
        .connections
        .iter()
        .filter(|c| c.from == root.id)
        .collect();
    let branch_count = branches.len();

    for (i, branch_edge) in branches.iter().enumerate() {
        let Some(branch) = by_id.get(branch_edge.to.as_str()) else {
            continue;
        };
        if !placed.insert(branch.id.as_str()) {
            continue;
        }
        let angle = i as f64 / branch_count as f64 * std::f64::consts::TAU;
        let bx = BRANCH_RADIUS * angle.cos();
        let by = BRANCH_RADIUS * angle.sin();
        map.nodes.push(MapNode {
            id: branch.id.clone(),
            label: branch.label.clone(),
            x: bx,
            y: by,
            level: 1,
        });

        let leaves: Vec<&MapEdge> = graph
            .connections
            .iter()
            .filter(|c| c.from == branch.id)
            .collect();
        let leaf_count = leaves.len();
        let start = angle - LEAF_WEDGE / 2.0;

        for (j, leaf_edge) in leaves.iter().enumerate() {
            let Some(leaf) = by_id.get(leaf_edge.to.as_str()) else {
                continue;
            };
            if !placed.insert(leaf.id.as_str()) {
                continue;
            }
            // (j + 1) / (count + 1) keeps siblings strictly interior to the
            // wedge, never exactly at its edges.
            let leaf_angle = start + (j + 1) as f64 * (LEAF_WEDGE / (leaf_count + 1) as f64);
            map.nodes.push(MapNode {
                id: leaf.id.clone(),
                label: leaf.label.clone(),
                x: bx + LEAF_RADIUS * leaf_angle.cos(),
                y: by + LEAF_RADIUS * leaf_angle.sin(),
                level: 2,
            });
        }
    }

    map.edges = graph
        .connections
        .iter()
        .filter(|c| placed.contains(c.from.as_str()) && placed.contains(c.to.as_str()))
        .cloned()
        .collect();
    map
}

#[cfg(test)]
mod tests {
    use super::*;

    fn graph(nodes: &[(&str, &str)], edges: &[(&str, &str)]) -> ConceptGraph {
        ConceptGraph {
            nodes: nodes
                .iter()
                .map(|(id, label)| ConceptNode {
                    id: id.to_string(),
                    label: label.to_string(),
                })
                .collect(),
            connections: edges
                .iter()
                .map(|(from, to)| MapEdge {
                    from: from.to_string(),
                    to: to.to_string(),
                })
                .collect(),
        }
    }

    /// Builds the 1-root / 4-branch graph with 5, 3, 3 and 2 leaves used by
    /// the layout contract.
    fn fan_graph() -> ConceptGraph {
        let mut nodes = vec![("root".to_string(), "Root".to_string())];
        let mut edges = Vec::new();
        for (b, leaf_count) in [5usize, 3, 3, 2].iter().enumerate() {
            let branch = format!("b{b}");
            edges.push((String::from("root"), branch.clone()));
            nodes.push((branch.clone(), format!("Branch {b}")));
            for l in 0..*leaf_count {
                let leaf = format!("b{b}l{l}");
                edges.push((branch.clone(), leaf.clone()));
                nodes.push((leaf, format!("Leaf {b}.{l}")));
            }
        }
        ConceptGraph {
            nodes: nodes
                .into_iter()
                .map(|(id, label)| ConceptNode { id, label })
                .collect(),
            connections: edges
                .into_iter()
                .map(|(from, to)| MapEdge { from, to })
                .collect(),
        }
    }

    fn node<'a>(map: &'a MindMap, id: &str) -> &'a MapNode {
        map.nodes.iter().find(|n| n.id == id).expect("node placed")
    }

    #[test]
    fn branch_angles_are_evenly_spaced() {
        let map = layout_radial(&fan_graph());
        assert_eq!(node(&map, "root").level, 0);
        assert_eq!(node(&map, "root").x, 0.0);

        for i in 0..4 {
            let expected = i as f64 / 4.0 * std::f64::consts::TAU;
            let b = node(&map, &format!("b{i}"));
            assert_eq!(b.level, 1);
            assert!((b.x - BRANCH_RADIUS * expected.cos()).abs() < 1e-9);
            assert!((b.y - BRANCH_RADIUS * expected.sin()).abs() < 1e-9);
        }
    }

    #[test]
    fn leaves_stay_strictly_inside_the_wedge() {
        let map = layout_radial(&fan_graph());
        for (b, leaf_count) in [5usize, 3, 3, 2].iter().enumerate() {
            let branch_angle = b as f64 / 4.0 * std::f64::consts::TAU;
            let parent = node(&map, &format!("b{b}"));
            for l in 0..*leaf_count {
                let leaf = node(&map, &format!("b{b}l{l}"));
                assert_eq!(leaf.level, 2);
                let (dx, dy) = (leaf.x - parent.x, leaf.y - parent.y);
                let dist = (dx * dx + dy * dy).sqrt();
                assert!((dist - LEAF_RADIUS).abs() < 1e-9);

                let angle = dy.atan2(dx);
                // Compare on the unit circle so branch 0's wedge spanning
                // negative angles is handled.
                let mut delta = angle - branch_angle;
                while delta > std::f64::consts::PI {
                    delta -= std::f64::consts::TAU;
                }
                while delta < -std::f64::consts::PI {
                    delta += std::f64::consts::TAU;
                }
                assert!(delta > -LEAF_WEDGE / 2.0 && delta < LEAF_WEDGE / 2.0);
            }
        }
    }

    #[test]
    fn dangling_edges_are_dropped_silently() {
        let g = graph(
            &[("a", "A"), ("b", "B")],
            &[("a", "b"), ("a", "ghost"), ("b", "ghost")],
        );
        let map = layout_radial(&g);
        assert_eq!(map.nodes.len(), 2);
        assert_eq!(map.edges, vec![MapEdge {
            from: "a".to_string(),
            to: "b".to_string(),
        }]);
    }

    #[test]
    fn root_is_the_unique_untargeted_node() {
        // "center" is listed last but is the only node nothing points at.
        let g = graph(
            &[("x", "X"), ("y", "Y"), ("center", "Center")],
            &[("center", "x"), ("center", "y")],
        );
        let map = layout_radial(&g);
        assert_eq!(node(&map, "center").level, 0);
        assert_eq!(node(&map, "x").level, 1);
    }

    #[test]
    fn ambiguous_root_falls_back_to_first_listed() {
        // Two untargeted nodes: policy falls back to list order.
        let g = graph(
            &[("a", "A"), ("b", "B"), ("c", "C")],
            &[("a", "c"), ("b", "c")],
        );
        let map = layout_radial(&g);
        assert_eq!(node(&map, "a").level, 0);
    }

    #[test]
    fn empty_graph_lays_out_nothing() {
        let map = layout_radial(&ConceptGraph::default());
        assert!(map.nodes.is_empty());
        assert!(map.edges.is_empty());
    }

    #[test]
    fn zoom_in_compounds_and_clamps() {
        let mut t = MapTransform { x: 0.0, y: 0.0, k: 1.0 };
        for n in 1..=5 {
            t.zoom_in();
            assert!((t.k - ZOOM_STEP.powi(n)).abs() < 1e-9);
        }
        for _ in 0..40 {
            t.zoom_in();
        }
        assert_eq!(t.k, MAX_ZOOM);

        t.zoom_out();
        assert!((t.k - MAX_ZOOM / ZOOM_STEP).abs() < 1e-9);
        for _ in 0..40 {
            t.zoom_out();
        }
        assert_eq!(t.k, MIN_ZOOM);
    }

    #[test]
    fn drag_is_scaled_by_inverse_zoom() {
        let mut map = MindMap::demo();
        map.transform.k = 2.0;
        let before = node(&map, "sun").clone();
        map.drag("sun", 10.0, -6.0);
        let after = node(&map, "sun");
        assert!((after.x - (before.x + 5.0)).abs() < 1e-9);
        assert!((after.y - (before.y - 3.0)).abs() < 1e-9);
    }

    #[test]
    fn graph_deserializes_from_wire_contract() {
        let json = r#"{
            "nodes": [{"id": "root", "label": "Water Cycle"},
                      {"id": "evap", "label": "Evaporation"}],
            "connections": [{"from": "root", "to": "evap"}]
        }"#;
        let g: ConceptGraph = serde_json::from_str(json).unwrap();
        assert_eq!(g.nodes.len(), 2);
        assert_eq!(g.connections[0].to, "evap");
    }
}
