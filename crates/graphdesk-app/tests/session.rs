use graphdesk_app::{ActionError, GraphArgs, GraphSession, LinkIntent, Settings};
use graphdesk_core::{EdgeId, ElementId, GraphError, NodeId, Vec2, Viewport};
use graphdesk_events::{Event, SHARED_QUEUE_CAPACITY, Topic};
use graphdesk_graph::{EdgeData, GraphModel, NodeData};
use std::time::{Duration, Instant};

fn node(id: i64) -> ElementId {
    ElementId::Node(NodeId(id))
}

fn edge(id: i64) -> ElementId {
    ElementId::Edge(EdgeId(id))
}

/// Chain 1 - 2 - 3 - 4 along the x axis.
fn chain() -> GraphModel {
    let mut model = GraphModel::new();
    for i in 1..=4 {
        model
            .add_node(NodeData::new(
                NodeId(i),
                format!("n{i}"),
                Vec2::new((i - 1) as f32 * 100.0, 0.0),
            ))
            .unwrap();
    }
    for i in 1..=3 {
        model
            .add_edge(EdgeData::new(EdgeId(i), NodeId(i), NodeId(i + 1)))
            .unwrap();
    }
    model
}

fn session() -> GraphSession {
    GraphSession::new(chain(), Settings::default())
}

#[test]
fn test_undo_everything_restores_observable_state() {
    let mut s = session();
    let start = s.model().observable();

    s.move_nodes(&[(NodeId(1), Vec2::new(10.0, 10.0))]).unwrap();
    s.hide(&[node(2)]).unwrap();
    s.remove(&[node(4)]).unwrap();
    s.add_node(NodeData::new(NodeId(5), "n5", Vec2::new(500.0, 0.0)))
        .unwrap();
    s.add_edge(EdgeData::new(EdgeId(9), NodeId(5), NodeId(1)))
        .unwrap();
    assert_ne!(s.model().observable(), start);

    while s.undo().unwrap() {}

    assert_eq!(s.model().observable(), start);
    assert!(s.model().thick_border_nodes().is_empty());
}

#[test]
fn test_undo_then_redo_is_identity() {
    let mut s = session();
    s.move_nodes(&[(NodeId(2), Vec2::new(100.0, 50.0))]).unwrap();
    s.hide(&[node(3)]).unwrap();
    s.remove(&[node(1)]).unwrap();

    for _ in 0..3 {
        let before = s.model().observable();
        let tagged = s.model().thick_border_nodes();
        assert!(s.undo().unwrap());
        assert!(s.redo().unwrap());
        assert_eq!(s.model().observable(), before);
        assert_eq!(s.model().thick_border_nodes(), tagged);
        s.undo().unwrap();
    }
}

#[test]
fn test_new_action_clears_redo() {
    let mut s = session();
    s.move_nodes(&[(NodeId(1), Vec2::new(5.0, 5.0))]).unwrap();
    s.undo().unwrap();
    assert!(s.history().can_redo());

    s.move_nodes(&[(NodeId(1), Vec2::new(7.0, 7.0))]).unwrap();
    assert!(!s.history().can_redo());
    assert!(!s.redo().unwrap());
    assert_eq!(s.model().position(NodeId(1)), Some(Vec2::new(7.0, 7.0)));
}

#[test]
fn test_hide_tags_neighbours_and_show_all_clears() {
    let mut s = session();
    let hidden = s.hide(&[node(2)]).unwrap();

    assert!(hidden.contains(&node(2)));
    assert!(hidden.contains(&edge(1)));
    assert!(hidden.contains(&edge(2)));
    assert_eq!(s.model().thick_border_nodes(), vec![NodeId(1), NodeId(3)]);
    assert_eq!(s.history().undo_len(), 1);
    assert_eq!(
        s.history().undo_description().as_deref(),
        Some("batch(thickenBorder, hide)")
    );

    s.show_all().unwrap();
    assert!(s.model().thick_border_nodes().is_empty());
    assert!(s.model().hidden_elements().is_empty());
}

#[test]
fn test_show_untags_fully_revealed_neighbours() {
    let mut s = session();
    s.hide(&[node(2)]).unwrap();
    s.show(&[node(2)]).unwrap();

    assert!(s.model().thick_border_nodes().is_empty());
    assert!(s.model().is_visible(edge(1)));
    assert!(s.model().is_visible(edge(2)));

    s.undo().unwrap();
    assert_eq!(s.model().thick_border_nodes(), vec![NodeId(1), NodeId(3)]);
    assert!(!s.model().is_visible(node(2)));
}

#[test]
fn test_batch_of_three_is_one_undo() {
    let mut s = session();
    let before = s.model().observable();

    s.batch(vec![
        (
            "move".to_string(),
            GraphArgs::Positions(vec![(NodeId(1), Vec2::new(-50.0, 0.0))]),
        ),
        ("select".to_string(), GraphArgs::Selection(vec![node(3)])),
        ("remove".to_string(), GraphArgs::Elements(vec![node(4)])),
    ])
    .unwrap();
    assert_eq!(s.model().node_count(), 3);

    assert!(s.undo().unwrap());
    assert_eq!(s.model().observable(), before);
    assert!(s.model().selected().is_empty());
    assert!(!s.history().can_undo());
}

#[test]
fn test_stack_capacity_drops_oldest() {
    let mut settings = Settings::default();
    settings.undo.stack_size_limit = Some(2);
    let mut s = GraphSession::new(chain(), settings);

    for x in [10.0, 20.0, 30.0] {
        s.move_nodes(&[(NodeId(1), Vec2::new(x, 0.0))]).unwrap();
    }
    assert!(s.undo().unwrap());
    assert!(s.undo().unwrap());
    assert!(!s.undo().unwrap());
    assert_eq!(s.model().position(NodeId(1)), Some(Vec2::new(10.0, 0.0)));
}

#[test]
fn test_unregistered_action_leaves_stack_alone() {
    let mut s = session();
    let err = s.execute("explode", GraphArgs::Nodes(vec![NodeId(1)]));
    assert_eq!(err, Err(ActionError::Unregistered("explode".to_string())));
    assert!(!s.history().can_undo());
}

#[test]
fn test_custom_action_shares_the_stack() {
    let mut s = session();
    s.register_action(
        "nudge",
        |c, args, _| {
            let GraphArgs::Nodes(ids) = args.clone() else {
                return Err(ActionError::InvalidArgs {
                    action: "nudge".to_string(),
                    expected: "node",
                });
            };
            for id in ids {
                let p = c.model.position(id).ok_or(GraphError::UnknownNode(id))?;
                c.model.set_position(id, p + Vec2::new(10.0, 0.0))?;
            }
            Ok(args)
        },
        |c, args, _| {
            if let GraphArgs::Nodes(ids) = &args {
                for id in ids {
                    if let Some(p) = c.model.position(*id) {
                        c.model.set_position(*id, p - Vec2::new(10.0, 0.0))?;
                    }
                }
            }
            Ok(args)
        },
    );

    s.execute("nudge", GraphArgs::Nodes(vec![NodeId(2)])).unwrap();
    assert_eq!(s.model().position(NodeId(2)), Some(Vec2::new(110.0, 0.0)));
    s.undo().unwrap();
    assert_eq!(s.model().position(NodeId(2)), Some(Vec2::new(100.0, 0.0)));
}

fn drag_model() -> GraphModel {
    let mut model = GraphModel::new();
    model
        .add_node(NodeData::new(NodeId(1), "static", Vec2::new(200.0, 0.0)))
        .unwrap();
    model
        .add_node(NodeData::new(NodeId(2), "dragged", Vec2::new(0.0, 100.0)))
        .unwrap();
    model
}

#[test]
fn test_drag_snaps_on_release_and_is_undoable() {
    let mut s = GraphSession::new(drag_model(), Settings::default());
    let snaps = s.events().subscribe(Topic::Snap, "test");

    s.begin_drag(&[NodeId(2)]).unwrap();
    let update = s.drag_to(Vec2::new(198.0, 0.0)).unwrap();
    assert!(!update.locked);
    assert_eq!(update.result.offset(), Vec2::new(2.0, 0.0));

    let outcome = s.end_drag().unwrap();
    assert!(outcome.snapped);
    assert_eq!(s.model().position(NodeId(2)), Some(Vec2::new(200.0, 100.0)));

    let events: Vec<Event> = snaps.receiver.try_iter().collect();
    assert!(events.iter().any(|e| matches!(e, Event::NodeSnapped { node, .. } if *node == NodeId(2))));

    s.undo().unwrap();
    assert_eq!(s.model().position(NodeId(2)), Some(Vec2::new(0.0, 100.0)));
}

#[test]
fn test_drag_falls_back_to_grid() {
    let mut settings = Settings::default();
    settings.snap.geometric = false;
    settings.snap.distribution = false;
    settings.snap.grid = Some(25.0);
    let mut s = GraphSession::new(drag_model(), settings);

    s.begin_drag(&[NodeId(2)]).unwrap();
    s.drag_to(Vec2::new(13.0, 0.0)).unwrap();
    let outcome = s.end_drag().unwrap();

    // Top-left corner (-7, 80) rounds to (0, 75).
    assert!(outcome.snapped);
    assert_eq!(s.model().position(NodeId(2)), Some(Vec2::new(20.0, 95.0)));
}

#[test]
fn test_drag_not_recorded_when_disabled() {
    let mut settings = Settings::default();
    settings.undo.undoable_drag = false;
    let mut s = GraphSession::new(drag_model(), settings);

    s.begin_drag(&[NodeId(2)]).unwrap();
    s.drag_to(Vec2::new(50.0, 50.0)).unwrap();
    s.end_drag().unwrap();

    assert_eq!(s.model().position(NodeId(2)), Some(Vec2::new(50.0, 150.0)));
    assert!(!s.history().can_undo());
}

#[test]
fn test_drag_calls_without_begin_fail() {
    let mut s = session();
    assert_eq!(s.drag_to(Vec2::ZERO).unwrap_err(), ActionError::NoDrag);
    assert_eq!(s.end_drag().unwrap_err(), ActionError::NoDrag);
}

#[test]
fn test_panel_links_retarget_and_select() {
    let mut s = session();
    let view = s.describe(node(2)).unwrap();
    assert_eq!(view.neighbors.len(), 2);
    assert_eq!(view.siblings.len(), 3);

    let select = view.neighbors[0].clone();
    assert_eq!(select.intent, LinkIntent::Select);
    assert!(s.activate(&select).unwrap().is_none());
    assert_eq!(s.model().selected(), vec![node(1)]);

    let retarget = view.siblings[0].clone();
    let next = s.activate(&retarget).unwrap().unwrap();
    assert_eq!(next.target, retarget.target);
    assert_eq!(s.panel().current(), Some(retarget.target));
}

#[test]
fn test_deferred_refresh_drops_removed_ids() {
    let mut s = session();
    let t0 = Instant::now();

    s.request_panel_refresh(node(4), t0);
    s.remove(&[node(4)]).unwrap();
    assert!(s.flush_deferred(t0 + Duration::from_millis(300)).is_none());

    s.request_panel_refresh(node(1), t0);
    assert!(s.flush_deferred(t0 + Duration::from_millis(100)).is_none());
    let view = s.flush_deferred(t0 + Duration::from_millis(300)).unwrap();
    assert_eq!(view.target, node(1));
}

#[test]
fn test_subscriptions_are_enumerable() {
    let s = session();
    let sub = s.events().subscribe(Topic::History, "toolbar");

    let listed = s.events().subscriptions();
    assert_eq!(listed.len(), 1);
    assert_eq!(listed[0].label, "toolbar");

    assert!(s.events().unsubscribe(sub.id));
    assert!(s.events().subscriptions().is_empty());
}

#[test]
fn test_stack_changes_reach_history_subscribers() {
    let mut s = session();
    let sub = s.events().subscribe(Topic::History, "toolbar");

    s.move_nodes(&[(NodeId(1), Vec2::new(1.0, 1.0))]).unwrap();
    let events: Vec<Event> = sub.receiver.try_iter().collect();
    assert!(events.contains(&Event::UndoStackChanged {
        can_undo: true,
        can_redo: false,
        undo_description: Some("move".to_string()),
        redo_description: None,
    }));
}

/// Every tagged node borders something hidden, and every visible node that
/// borders something hidden is tagged.
fn assert_border_invariant(s: &GraphSession) {
    let model = s.model();
    for n in model.thick_border_nodes() {
        assert!(model.has_hidden_neighbor(n), "{} tagged without a hidden neighbour", n);
    }
    for n in model.nodes() {
        if n.visible && model.has_hidden_neighbor(n.id) {
            assert!(n.scratch.thick_border, "{} borders a hidden node but is untagged", n.id);
        }
    }
}

#[test]
fn test_border_tags_follow_every_operation() {
    let mut s = session();
    assert_border_invariant(&s);

    s.hide(&[node(2)]).unwrap();
    assert_border_invariant(&s);

    s.remove(&[node(2)]).unwrap();
    assert!(s.model().thick_border_nodes().is_empty());
    assert_border_invariant(&s);

    s.hide(&[node(4)]).unwrap();
    s.add_node(NodeData::new(NodeId(5), "n5", Vec2::new(0.0, 100.0)))
        .unwrap();
    s.add_edge(EdgeData::new(EdgeId(7), NodeId(5), NodeId(4)))
        .unwrap();
    assert_eq!(s.model().thick_border_nodes(), vec![NodeId(3), NodeId(5)]);
    assert_border_invariant(&s);

    s.remove(&[edge(3)]).unwrap();
    assert_eq!(s.model().thick_border_nodes(), vec![NodeId(5)]);
    assert_border_invariant(&s);

    s.move_nodes(&[(NodeId(1), Vec2::new(3.0, 3.0))]).unwrap();
    s.show_all().unwrap();
    assert_border_invariant(&s);

    while s.undo().unwrap() {
        assert_border_invariant(&s);
    }
    while s.redo().unwrap() {
        assert_border_invariant(&s);
    }
}

#[test]
fn test_remove_without_tag_changes_is_a_plain_action() {
    let mut s = session();
    s.remove(&[node(4)]).unwrap();
    assert_eq!(s.history().undo_description().as_deref(), Some("remove"));
}

#[test]
fn test_drag_skips_nodes_removed_mid_gesture() {
    let mut settings = Settings::default();
    settings.snap.geometric = false;
    settings.snap.distribution = false;
    let mut s = GraphSession::new(chain(), settings);

    s.begin_drag(&[NodeId(3), NodeId(2)]).unwrap();
    s.drag_to(Vec2::new(10.0, 0.0)).unwrap();
    s.remove(&[node(2)]).unwrap();
    let undo_before = s.history().undo_len();

    let outcome = s.end_drag().unwrap();
    assert_eq!(outcome.moves, vec![(NodeId(3), Vec2::new(210.0, 0.0))]);
    assert_eq!(s.model().position(NodeId(3)), Some(Vec2::new(210.0, 0.0)));
    assert_eq!(s.history().undo_len(), undo_before + 1);

    s.undo().unwrap();
    assert_eq!(s.model().position(NodeId(3)), Some(Vec2::new(200.0, 0.0)));
}

#[test]
fn test_move_with_unknown_node_changes_nothing() {
    let mut s = session();
    let err = s
        .move_nodes(&[
            (NodeId(1), Vec2::new(9.0, 9.0)),
            (NodeId(42), Vec2::ZERO),
        ])
        .unwrap_err();

    assert_eq!(
        err,
        ActionError::Graph(GraphError::UnknownNode(NodeId(42)))
    );
    assert_eq!(s.model().position(NodeId(1)), Some(Vec2::new(0.0, 0.0)));
    assert!(!s.history().can_undo());
}

#[test]
fn test_group_drag_offers_snap_to_every_node() {
    let mut model = drag_model();
    model
        .add_node(NodeData::new(NodeId(3), "follower", Vec2::new(0.0, 200.0)))
        .unwrap();
    let mut s = GraphSession::new(model, Settings::default());
    let snaps = s.events().subscribe(Topic::Snap, "test");

    s.begin_drag(&[NodeId(2), NodeId(3)]).unwrap();
    s.drag_to(Vec2::new(198.0, 0.0)).unwrap();

    let offered: Vec<NodeId> = snaps
        .receiver
        .try_iter()
        .filter_map(|e| match e {
            Event::SnapOffered { node, offset, .. } if offset == 2.0 => Some(node),
            _ => None,
        })
        .collect();
    assert_eq!(offered, vec![NodeId(2), NodeId(3)]);
}

#[test]
fn test_shared_event_queue_stays_bounded() {
    let mut s = session();
    for i in 0..1000 {
        s.move_nodes(&[(NodeId(1), Vec2::new(i as f32, 0.0))]).unwrap();
    }
    assert!(s.events().queued_len() <= SHARED_QUEUE_CAPACITY);
}

#[test]
fn test_non_positive_zoom_is_rejected() {
    let mut s = session();
    for zoom in [0.0, -1.0, f32::NAN] {
        let err = s
            .set_viewport(Viewport {
                zoom,
                pan: Vec2::ZERO,
            })
            .unwrap_err();
        assert!(matches!(err, ActionError::InvalidZoom(_)));
    }
    assert_eq!(s.viewport(), Viewport::default());

    s.set_viewport(Viewport {
        zoom: 2.0,
        pan: Vec2::new(5.0, 5.0),
    })
    .unwrap();
    assert_eq!(s.viewport().zoom, 2.0);
}
