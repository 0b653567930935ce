//! End-to-end workspace scenarios: stacks, shadows, serialization
//! round-trips, mutation resizes, and procedure propagation.

use std::rc::Rc;

use cairn_model::{
    catalog, ChangeEvent, IdPolicy, Mutation, MutationForm, Param, PortRef, ProcedureUpdate,
    Workspace,
};

fn workspace() -> Workspace {
    Workspace::new(Rc::new(catalog::standard()))
}

fn procedure_form(proccode: &str, params: &[(&str, &str, &str)]) -> MutationForm {
    Mutation::Procedure {
        proccode: proccode.to_string(),
        params: params
            .iter()
            .map(|(id, name, default)| Param {
                id: id.to_string(),
                name: name.to_string(),
                default: default.to_string(),
            })
            .collect(),
        warp: false,
    }
    .to_form()
}

#[test]
fn serialization_round_trip_is_stable() {
    let mut ws = workspace();
    let hat = ws.create_block("event_when_started").unwrap();
    let say = ws.create_block("looks_say").unwrap();
    let wait = ws.create_block("control_wait").unwrap();
    ws.connect(PortRef::next(hat.clone()), PortRef::previous(say.clone()))
        .unwrap();
    ws.connect(PortRef::next(say.clone()), PortRef::previous(wait))
        .unwrap();

    // Obscure the message shadow with a real reporter.
    let reporter = ws.create_block("operator_equals").unwrap();
    ws.connect(PortRef::input(say, "MESSAGE"), PortRef::output(reporter))
        .unwrap();

    let first = ws.serialize_block(&hat).unwrap();

    let mut other = workspace();
    let loaded = other.load_block(&first, IdPolicy::Keep).unwrap();
    let second = other.serialize_block(&loaded).unwrap();

    assert_eq!(first, second);
}

#[test]
fn duplication_reassigns_every_id() {
    let mut ws = workspace();
    let say = ws.create_block("looks_say").unwrap();
    let serialized = ws.serialize_block(&say).unwrap();

    let copy = ws.load_block(&serialized, IdPolicy::Fresh).unwrap();
    assert_ne!(copy, say);

    let original_shadow = &serialized.inputs["MESSAGE"].shadow;
    let copied = ws.serialize_block(&copy).unwrap();
    let copied_shadow = &copied.inputs["MESSAGE"].shadow;
    let (Some(original_shadow), Some(copied_shadow)) = (original_shadow, copied_shadow) else {
        panic!("expected a shadow in MESSAGE on both blocks");
    };
    assert_ne!(original_shadow.id, copied_shadow.id);
    assert_eq!(original_shadow.kind, copied_shadow.kind);
    assert_eq!(original_shadow.fields, copied_shadow.fields);
}

#[test]
fn loading_a_colliding_id_is_refused() {
    let mut ws = workspace();
    let say = ws.create_block("looks_say").unwrap();
    let serialized = ws.serialize_block(&say).unwrap();
    assert!(ws.load_block(&serialized, IdPolicy::Keep).is_err());
}

#[test]
fn growing_branches_adds_exactly_one_statement_input() {
    let mut ws = workspace();
    let if_block = ws.create_block("control_if").unwrap();
    let names = |ws: &Workspace| -> Vec<String> {
        ws.get(&if_block)
            .unwrap()
            .inputs()
            .iter()
            .map(|input| input.name().to_string())
            .collect()
    };
    assert_eq!(names(&ws), vec!["CONDITION", "SUBSTACK"]);

    let changed = ws
        .set_mutation(&if_block, &Mutation::Branches { count: 2 }.to_form())
        .unwrap();
    assert!(changed);
    assert_eq!(names(&ws), vec!["CONDITION", "SUBSTACK", "SUBSTACK2"]);
}

#[test]
fn shrinking_branches_sets_attached_children_free() {
    let mut ws = workspace();
    let if_else = ws.create_block("control_if_else").unwrap();
    let condition = ws.create_block("operator_equals").unwrap();
    let then_body = ws.create_block("looks_say").unwrap();
    let else_body = ws.create_block("control_wait").unwrap();
    ws.connect(
        PortRef::input(if_else.clone(), "CONDITION"),
        PortRef::output(condition.clone()),
    )
    .unwrap();
    ws.connect(
        PortRef::input(if_else.clone(), "SUBSTACK"),
        PortRef::previous(then_body.clone()),
    )
    .unwrap();
    ws.connect(
        PortRef::input(if_else.clone(), "SUBSTACK2"),
        PortRef::previous(else_body.clone()),
    )
    .unwrap();

    ws.set_mutation(&if_else, &Mutation::Branches { count: 1 }.to_form())
        .unwrap();

    // Surviving inputs keep their children; the removed branch's child is
    // now a top-level stack, not disposed.
    assert_eq!(ws.get(&condition).unwrap().parent(), Some(&if_else));
    assert_eq!(ws.get(&then_body).unwrap().parent(), Some(&if_else));
    assert!(ws.get(&else_body).unwrap().parent().is_none());
    assert!(ws.get(&if_else).unwrap().input("SUBSTACK2").is_none());
}

#[test]
fn procedure_propagation_rewrites_prototype_and_call_sites() {
    let mut ws = workspace();
    let definition = ws.create_block("procedures_definition").unwrap();
    let prototype = ws
        .connection_at(&PortRef::input(definition, "custom_block"))
        .unwrap()
        .target()
        .unwrap()
        .block
        .clone();

    let v1 = procedure_form("jump %s times", &[("arg0", "times", "10")]);
    ws.set_mutation(&prototype, &v1).unwrap();

    let call_a = ws.create_block("procedures_call").unwrap();
    let call_b = ws.create_block("procedures_call").unwrap();
    ws.set_mutation(&call_a, &v1).unwrap();
    ws.set_mutation(&call_b, &v1).unwrap();
    let before = ws.events().len();

    let v2 = procedure_form(
        "jump %s times fast %b",
        &[("arg0", "times", "10"), ("arg1", "fast", "false")],
    );
    let outcome = ws.propagate_procedure_mutation("jump %s times", &v2).unwrap();
    assert_eq!(outcome, ProcedureUpdate::Updated { call_sites: 2 });

    // Each call site gained the boolean slot, which spawns no shadow.
    for call in [&call_a, &call_b] {
        let block = ws.get(call).unwrap();
        let arg1 = block.input("arg1").unwrap();
        let conn = arg1.connection().unwrap();
        assert!(conn.accepts_only_boolean());
        assert!(!conn.is_attached());
    }

    // Everything recorded by the propagation shares one change-group.
    let tail = &ws.events().records()[before..];
    assert!(!tail.is_empty());
    let group = tail[0].group;
    assert!(group.is_some());
    assert!(tail.iter().all(|record| record.group == group));
}

#[test]
fn propagation_skips_call_sites_already_in_sync() {
    let mut ws = workspace();
    let definition = ws.create_block("procedures_definition").unwrap();
    let prototype = ws
        .connection_at(&PortRef::input(definition, "custom_block"))
        .unwrap()
        .target()
        .unwrap()
        .block
        .clone();
    let v1 = procedure_form("beep", &[]);
    ws.set_mutation(&prototype, &v1).unwrap();

    let v2 = procedure_form("beep", &[("arg0", "volume", "10")]);
    let stale = ws.create_block("procedures_call").unwrap();
    let fresh = ws.create_block("procedures_call").unwrap();
    ws.set_mutation(&stale, &v1).unwrap();
    ws.set_mutation(&fresh, &v2).unwrap();

    // "beep" calls match by proccode v1; propagate v2.
    let outcome = ws.propagate_procedure_mutation("beep", &v2).unwrap();
    assert_eq!(outcome, ProcedureUpdate::Updated { call_sites: 1 });
}

#[test]
fn propagation_without_definition_is_a_soft_outcome() {
    let mut ws = workspace();
    let call = ws.create_block("procedures_call").unwrap();
    let form = procedure_form("vanished", &[]);
    ws.set_mutation(&call, &form).unwrap();

    let outcome = ws.propagate_procedure_mutation("vanished", &form).unwrap();
    assert_eq!(outcome, ProcedureUpdate::MissingDefinition);
    // The call site is left exactly as it was.
    assert!(matches!(
        ws.get(&call).unwrap().mutation(),
        Some(Mutation::Procedure { proccode, .. }) if proccode == "vanished"
    ));
}

#[test]
fn attached_shadows_do_not_head_stacks() {
    let mut ws = workspace();
    let wait = ws.create_block("control_wait").unwrap();

    // The wait block and its spawned number shadow are both arena entries,
    // but only the wait block is a top block.
    assert_eq!(ws.len(), 2);
    let tops: Vec<_> = ws.top_blocks().map(|block| block.id().clone()).collect();
    assert_eq!(tops, vec![wait]);
}
