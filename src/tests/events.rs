use super::*;
use crate::error::CompileError;
use crate::ir::{FunctionAttrs, Instruction, OutputRecord, Program};
use pretty_assertions::assert_eq;
use serde_json::json;

#[test]
fn advancement_handler_gets_a_rearming_trampoline() {
    let mut program = Program::new();
    let var = program
        .define_from_text("E", "adv_event \"minecraft:inventory_changed\"", &[])
        .unwrap();
    let event = program.event(var).unwrap();
    let handler = program.add_function("H", FunctionAttrs::default()).unwrap();
    program
        .push_top(Instruction::add_event_condition(event, "stat.foo", "5").unwrap())
        .unwrap();
    program
        .push_top(Instruction::register_event_handler(handler, event).unwrap())
        .unwrap();
    let artifacts = program.compile().unwrap();

    let mut session = session(&config());
    session.emit_program(&artifacts).unwrap();
    let writer = session.writer();

    let adv = &writer.advancements["adv_H"];
    assert_eq!(adv.criteria.len(), 1);
    let criterion = &adv.criteria["H"];
    assert_eq!(criterion.trigger, "minecraft:inventory_changed");
    assert_eq!(
        serde_json::Value::Object(criterion.conditions.clone()),
        json!({ "stat": { "foo": "5" } })
    );
    assert_eq!(
        adv.rewards.as_ref().map(|r| r.function.as_str()),
        Some("ns:H_trampoline")
    );
    assert_eq!(
        writer.function("H_trampoline").unwrap(),
        strings(&["advancement revoke @s only ns:adv_H", "function ns:H"]).as_slice()
    );
    assert_eq!(writer.function("H"), Some(&[][..]));
}

#[test]
fn load_handlers_keep_registration_order() {
    let mut program = Program::new();
    let var = program
        .define("load", Instruction::create_tag_event("minecraft:load"))
        .unwrap();
    let load = program.event(var).unwrap();
    for name in ["F1", "F2"] {
        let func = program.add_function(name, FunctionAttrs::default()).unwrap();
        program
            .push_top(Instruction::register_event_handler(func, load).unwrap())
            .unwrap();
    }
    let artifacts = program.compile().unwrap();
    assert!(artifacts.records.iter().all(|record| matches!(
        record,
        OutputRecord::EventHandler { revoke: false, .. }
    )));

    let mut session = session(&config());
    session.emit_program(&artifacts).unwrap();
    let writer = session.writer();
    assert_eq!(
        writer.tag("functions", "minecraft", "load").unwrap(),
        strings(&["ns:F1", "ns:F2"]).as_slice()
    );
    assert_eq!(writer.tag("functions", "minecraft", "tick"), None);
    assert_eq!(writer.function("F1_trampoline"), None);
    assert!(writer.advancements.is_empty());
}

#[test]
fn user_tags_live_in_the_session_namespace() {
    let mut program = Program::new();
    let var = program
        .define("custom", Instruction::create_tag_event("custom"))
        .unwrap();
    let custom = program.event(var).unwrap();
    let var = program
        .define("tick", Instruction::create_tag_event("minecraft:tick"))
        .unwrap();
    let tick = program.event(var).unwrap();

    let listener = program.add_function("listener", FunctionAttrs::default()).unwrap();
    let ticker = program.add_function("ticker", FunctionAttrs::default()).unwrap();
    program
        .push_top(Instruction::register_event_handler(listener, custom).unwrap())
        .unwrap();
    program
        .push_top(Instruction::register_event_handler(ticker, tick).unwrap())
        .unwrap();
    program
        .push_body(ticker, Instruction::fire_tag_event(custom).unwrap())
        .unwrap();
    let artifacts = program.compile().unwrap();

    let mut session = session(&config());
    session.emit_program(&artifacts).unwrap();
    let writer = session.writer();
    assert_eq!(
        writer.tag("functions", "ns", "custom").unwrap(),
        strings(&["ns:listener"]).as_slice()
    );
    assert_eq!(
        writer.tag("functions", "minecraft", "tick").unwrap(),
        strings(&["ns:ticker"]).as_slice()
    );
    assert_eq!(
        writer.function("ticker").unwrap(),
        strings(&["function #ns:custom"]).as_slice()
    );
}

#[test]
fn only_used_functions_are_written() {
    let mut program = Program::new();
    let var = program
        .define("tick", Instruction::create_tag_event("minecraft:tick"))
        .unwrap();
    let tick = program.event(var).unwrap();
    let used = program.add_function("used", FunctionAttrs::default()).unwrap();
    program.add_function("unused", FunctionAttrs::default()).unwrap();
    program.add_function("kept", FunctionAttrs::pinned()).unwrap();
    program
        .push_top(Instruction::register_event_handler(used, tick).unwrap())
        .unwrap();
    let artifacts = program.compile().unwrap();

    let mut session = session(&config());
    session.emit_program(&artifacts).unwrap();
    let writer = session.writer();
    assert!(writer.function("used").is_some());
    assert!(writer.function("kept").is_some());
    assert_eq!(writer.function("unused"), None);
}

#[test]
fn setup_functions_join_the_load_tag_after_the_trampoline() {
    let mut config = config();
    config.setup_on_load = true;

    let mut program = Program::new();
    let init = program.add_function("init", FunctionAttrs::default()).unwrap();
    program
        .push_top(Instruction::mark_setup_function(init))
        .unwrap();
    let artifacts = program.compile().unwrap();

    let mut session = session(&config);
    session.emit_program(&artifacts).unwrap();
    let calls = session.create_up_down_functions("setup", "cleanup").unwrap();
    assert_eq!(
        calls,
        ("function ns:setup".to_string(), "function ns:cleanup".to_string())
    );

    let writer = session.writer();
    assert_eq!(
        writer.tag("functions", "minecraft", "load").unwrap(),
        strings(&["ns:setup_on_load_trampoline", "ns:init"]).as_slice()
    );
    assert_eq!(
        writer.function("setup_on_load_trampoline").unwrap(),
        strings(&["function ns:setup"]).as_slice()
    );
    assert!(writer.function("setup").is_some());
    assert!(writer.function("cleanup").is_some());
}

#[test]
fn handler_records_need_known_functions() {
    let mut session = session(&config());
    let err = session
        .add_event_handlers(&[OutputRecord::Setup {
            function: "ghost".into(),
        }])
        .unwrap_err();
    assert!(matches!(err, CompileError::NameNotFound { .. }));
}

#[test]
fn one_handler_cannot_listen_to_two_advancements() {
    let mut program = Program::new();
    let var = program
        .define("a", Instruction::create_advancement_event("minecraft:a"))
        .unwrap();
    let first = program.event(var).unwrap();
    let var = program
        .define("b", Instruction::create_advancement_event("minecraft:b"))
        .unwrap();
    let second = program.event(var).unwrap();
    let handler = program.add_function("H", FunctionAttrs::default()).unwrap();
    program
        .push_top(Instruction::add_event_condition(first, "stat.foo", "5").unwrap())
        .unwrap();
    for event in [first, second] {
        program
            .push_top(Instruction::register_event_handler(handler, event).unwrap())
            .unwrap();
    }
    let err = program.compile().unwrap_err();
    assert!(matches!(err.root(), CompileError::ScopeViolation { .. }));
    assert_eq!(err.insn(), Some("event_handler"));
}
