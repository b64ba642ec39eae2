//! Graph Domain Integration Tests

use cim_domain_diagram::{
    aggregate::{Graph, GraphSnapshot},
    factories::{create_edge, create_node, EdgeOptions, NodeOptions, NodeUpdate},
    Bounds, Edge, Node, NodeType, Position2D,
};

fn add(graph: &mut Graph, node_type: NodeType, x: f64, y: f64) -> Node {
    let node = create_node(NodeOptions::new(node_type, Position2D::new(x, y)));
    graph.add_node(node.clone());
    node
}

fn connect(graph: &mut Graph, a: &Node, b: &Node) -> Edge {
    let edge = create_edge(EdgeOptions::new(a.id, a.ports[0].id, b.id, b.ports[0].id));
    assert!(graph.add_edge(edge.clone()));
    edge
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_connect_then_remove_node() {
        let mut graph = Graph::new();
        let n1 = add(&mut graph, NodeType::Rectangle, 0.0, 0.0);
        let n2 = add(&mut graph, NodeType::Diamond, 200.0, 0.0);
        connect(&mut graph, &n1, &n2);

        let connected: Vec<_> = graph.get_connected_nodes(n1.id).iter().map(|n| n.id).collect();
        assert_eq!(connected, vec![n2.id]);

        let removed = graph.remove_node(n1.id).unwrap();
        assert_eq!(removed.id, n1.id);
        assert!(graph.get_all_edges().is_empty());
        assert_eq!(graph.get_all_nodes().len(), 1);
        assert!(graph.get_connected_nodes(n2.id).is_empty());
        assert!(graph.indices_consistent());
    }

    #[test]
    fn test_added_node_is_stored_verbatim() {
        let mut graph = Graph::new();
        let node = add(&mut graph, NodeType::Cylinder, 12.0, 34.0);

        assert_eq!(graph.get_node(node.id), Some(&node));
        let matching = graph.get_all_nodes().iter().filter(|n| n.id == node.id).count();
        assert_eq!(matching, 1);
    }

    #[test]
    fn test_cascade_leaves_no_dangling_references() {
        let mut graph = Graph::new();
        let hub = add(&mut graph, NodeType::Circle, 0.0, 0.0);
        let spokes: Vec<Node> = (0..4)
            .map(|i| add(&mut graph, NodeType::Rectangle, 200.0, i as f64 * 100.0))
            .collect();
        for spoke in &spokes {
            connect(&mut graph, &hub, spoke);
        }
        connect(&mut graph, &spokes[0], &spokes[1]);

        graph.remove_node(hub.id);
        assert!(graph.get_all_edges().iter().all(|e| !e.touches(hub.id)));
        for spoke in &spokes {
            assert!(graph.get_connected_nodes(spoke.id).iter().all(|n| n.id != hub.id));
        }
        assert_eq!(graph.edge_count(), 1);
        assert!(graph.indices_consistent());
    }

    #[test]
    fn test_edge_rejected_for_missing_endpoint() {
        let mut graph = Graph::new();
        let a = add(&mut graph, NodeType::Rectangle, 0.0, 0.0);
        let ghost = create_node(NodeOptions::new(NodeType::Rectangle, Position2D::default()));

        let edge = create_edge(EdgeOptions::new(a.id, a.ports[0].id, ghost.id, ghost.ports[0].id));
        assert!(!graph.add_edge(edge));
        assert_eq!(graph.get_all_edges().len(), 0);
        assert!(graph.get_connected_nodes(a.id).is_empty());
    }

    #[test]
    fn test_cycle_and_topological_order() {
        let mut graph = Graph::new();
        let a = add(&mut graph, NodeType::Rectangle, 0.0, 0.0);
        let b = add(&mut graph, NodeType::Rectangle, 100.0, 0.0);
        let c = add(&mut graph, NodeType::Rectangle, 200.0, 0.0);
        connect(&mut graph, &a, &b);
        connect(&mut graph, &b, &c);

        let order = graph.topological_sort().unwrap();
        let rank = |id| order.iter().position(|x| *x == id).unwrap();
        for edge in graph.get_all_edges() {
            assert!(rank(edge.source.node_id) < rank(edge.target.node_id));
        }

        connect(&mut graph, &c, &a);
        assert!(graph.has_cycle());
        assert!(graph.topological_sort().is_none());
        // adjacency is undirected, so the cycle is also one component
        assert!(graph.is_connected());
    }

    #[test]
    fn test_directional_queries() {
        let mut graph = Graph::new();
        let a = add(&mut graph, NodeType::Rectangle, 0.0, 0.0);
        let b = add(&mut graph, NodeType::Rectangle, 100.0, 0.0);
        let edge = connect(&mut graph, &a, &b);

        assert_eq!(graph.get_outgoing_edges(a.id).len(), 1);
        assert!(graph.get_incoming_edges(a.id).is_empty());
        assert_eq!(graph.get_successors(a.id)[0].id, b.id);
        assert_eq!(graph.get_predecessors(b.id)[0].id, a.id);
        assert_eq!(graph.find_edge_between(b.id, a.id).map(|e| e.id), Some(edge.id));
    }

    #[test]
    fn test_spatial_queries() {
        let mut graph = Graph::new();
        assert!(graph.get_bounds().is_none());

        let low = add(&mut graph, NodeType::Rectangle, 0.0, 0.0);
        let high = create_node(
            NodeOptions::new(NodeType::Rectangle, Position2D::new(50.0, 20.0)).with_z_index(3),
        );
        graph.add_node(high.clone());
        add(&mut graph, NodeType::Rectangle, 1000.0, 1000.0);

        let bounds = graph.get_bounds().unwrap();
        assert_eq!(bounds.x, 0.0);
        assert_eq!(bounds.right(), 1120.0);

        let hit = graph.get_node_at_position(&Position2D::new(60.0, 30.0)).unwrap();
        assert_eq!(hit.id, high.id);
        let hit = graph.get_node_at_position(&Position2D::new(10.0, 10.0)).unwrap();
        assert_eq!(hit.id, low.id);

        let area = Bounds::new(0.0, 0.0, 200.0, 200.0);
        assert_eq!(graph.get_nodes_in_bounds(&area).len(), 2);
    }

    #[test]
    fn test_update_never_changes_id() {
        let mut graph = Graph::new();
        let node = add(&mut graph, NodeType::Oval, 0.0, 0.0);

        let updated = graph
            .update_node(node.id, NodeUpdate::position(Position2D::new(5.0, 5.0)))
            .unwrap();
        assert_eq!(updated.id, node.id);
        assert_eq!(updated.position, Position2D::new(5.0, 5.0));
        assert!(graph.update_node(create_node(NodeOptions::default()).id, NodeUpdate::default()).is_none());
    }

    #[test]
    fn test_clone_is_independent() {
        let mut graph = Graph::new();
        let a = add(&mut graph, NodeType::Rectangle, 0.0, 0.0);
        let b = add(&mut graph, NodeType::Rectangle, 100.0, 0.0);
        connect(&mut graph, &a, &b);

        let copy = graph.clone();
        graph.remove_node(a.id);
        assert_eq!(copy.node_count(), 2);
        assert_eq!(copy.edge_count(), 1);
        assert!(copy.indices_consistent());
    }

    #[test]
    fn test_json_round_trip() {
        let mut graph = Graph::new();
        let a = add(&mut graph, NodeType::Parallelogram, 0.0, 0.0);
        let b = add(&mut graph, NodeType::Hexagon, 100.0, 0.0);
        connect(&mut graph, &a, &b);

        let json = graph.to_json().unwrap();
        let back = Graph::from_json(json).unwrap();
        assert_eq!(back, graph);

        let snapshot: GraphSnapshot = back.to_snapshot();
        assert_eq!(snapshot.nodes.len(), 2);
        assert_eq!(snapshot.edges.len(), 1);
    }
}
