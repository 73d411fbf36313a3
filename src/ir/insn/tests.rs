use super::*;
use crate::error::CompileError;
use crate::ir::function::FunctionAttrs;
use crate::ir::output::{EventBinding, OutputRecord};
use crate::ir::program::Program;
use pretty_assertions::assert_eq;

fn event(program: &mut Program, insn: Instruction) -> EventHandle {
    let var = program.define("event", insn).unwrap();
    program.event(var).unwrap()
}

#[test]
fn operand_types_are_checked() {
    let err = Instruction::from_operands("adv_event", &[IrValue::Func(FuncId(0))]).unwrap_err();
    assert!(matches!(err.root(), CompileError::TypeMismatch { .. }));
    assert_eq!(err.insn(), Some("adv_event"));

    let err = Instruction::from_operands("adv_event", &[]).unwrap_err();
    assert!(matches!(err.root(), CompileError::ArityMismatch { .. }));
}

#[test]
fn conditions_cannot_target_tag_events() {
    let mut program = Program::new();
    let tick = event(&mut program, Instruction::create_tag_event("minecraft:tick"));
    let err = Instruction::add_event_condition(tick, "a", "b").unwrap_err();
    assert!(matches!(err.root(), CompileError::WrongEventKind { .. }));
}

#[test]
fn advancement_events_cannot_be_fired() {
    let mut program = Program::new();
    let adv = event(&mut program, Instruction::create_advancement_event("x"));
    let err = Instruction::fire_tag_event(adv).unwrap_err();
    assert!(matches!(
        err.root(),
        CompileError::WrongEventKind {
            expected: EventKind::Tag,
            found: EventKind::Advancement,
            ..
        }
    ));
}

#[test]
fn handlers_are_top_level_only() {
    let mut program = Program::new();
    let adv = event(&mut program, Instruction::create_advancement_event("x"));
    let func = program.add_function("h", FunctionAttrs::default()).unwrap();
    let insn = Instruction::register_event_handler(func, adv).unwrap();
    let err = program.push_preamble(func, insn).unwrap_err();
    assert!(matches!(err, CompileError::ScopeViolation { .. }));
}

#[test]
fn statements_are_placed_by_kind() {
    let mut program = Program::new();
    let tick = event(&mut program, Instruction::create_tag_event("minecraft:tick"));
    let func = program.add_function("f", FunctionAttrs::default()).unwrap();
    let fire = Instruction::fire_tag_event(tick).unwrap();
    assert!(matches!(
        program.push_top(fire.clone()),
        Err(CompileError::ScopeViolation { .. })
    ));
    assert!(matches!(
        program.push_body(func, Instruction::mark_setup_function(func)),
        Err(CompileError::ScopeViolation { .. })
    ));
    assert!(matches!(
        program
            .push_body(func, Instruction::create_tag_event("t"))
            .unwrap_err()
            .root(),
        CompileError::PhaseViolation { .. }
    ));
    program.push_body(func, fire).unwrap();
}

#[test]
fn inline_handlers_are_rejected() {
    let mut program = Program::new();
    let adv = event(&mut program, Instruction::create_advancement_event("x"));
    let func = program.add_function("h", FunctionAttrs::inline()).unwrap();
    program
        .push_top(Instruction::register_event_handler(func, adv).unwrap())
        .unwrap();
    let err = program.compile().unwrap_err();
    assert!(matches!(
        err.root(),
        CompileError::InlineHandlerNotAllowed { .. }
    ));
}

#[test]
fn conditions_reach_the_handler_record_in_order() {
    let mut program = Program::new();
    let adv = event(
        &mut program,
        Instruction::create_advancement_event("minecraft:tick"),
    );
    let func = program.add_function("h", FunctionAttrs::default()).unwrap();
    // Handler first: every preapply still lands before postapply reads the set.
    program
        .push_top(Instruction::register_event_handler(func, adv).unwrap())
        .unwrap();
    program
        .push_top(Instruction::add_event_condition(adv, "stat.foo", "5").unwrap())
        .unwrap();
    program
        .push_top(Instruction::add_event_condition(adv, "stat.bar", "6").unwrap())
        .unwrap();

    let artifacts = program.compile().unwrap();
    let OutputRecord::EventHandler {
        handler,
        event,
        revoke,
    } = &artifacts.records[0]
    else {
        panic!("expected a handler record");
    };
    assert_eq!(handler, "h");
    assert!(*revoke);
    let EventBinding::Advancement { conditions, .. } = event else {
        panic!("expected an advancement event");
    };
    let paths: Vec<String> = conditions.iter().map(|c| c.dotted_path()).collect();
    assert_eq!(paths, vec!["stat.foo", "stat.bar"]);
}

#[test]
fn unused_functions_are_dropped() {
    let mut program = Program::new();
    let load = event(&mut program, Instruction::create_tag_event("minecraft:load"));
    let used = program.add_function("used", FunctionAttrs::default()).unwrap();
    program.add_function("unused", FunctionAttrs::default()).unwrap();
    program.add_function("pinned", FunctionAttrs::pinned()).unwrap();
    program
        .push_top(Instruction::register_event_handler(used, load).unwrap())
        .unwrap();
    let artifacts = program.compile().unwrap();
    let names: Vec<&str> = artifacts.function_names().collect();
    assert_eq!(names, vec!["used", "pinned"]);
}

#[test]
fn bodies_emit_commands_in_program_order() {
    let mut program = Program::new();
    let ping = event(&mut program, Instruction::create_tag_event("ping"));
    let func = program.add_function("main", FunctionAttrs::pinned()).unwrap();
    program
        .push_body(func, Instruction::revoke_event_trigger(func))
        .unwrap();
    program
        .push_body(func, Instruction::fire_tag_event(ping).unwrap())
        .unwrap();
    let artifacts = program.compile().unwrap();
    let main = artifacts.function("main").unwrap();
    assert_eq!(
        main.commands,
        vec![
            Command::revoke_only(
                crate::commands::Selector::sender(),
                crate::commands::AdvancementRef::for_handler("main"),
            ),
            Command::FunctionTag(crate::commands::NsName("ping".into())),
        ]
    );
}

#[test]
fn compiling_twice_is_a_phase_violation() {
    let mut program = Program::new();
    program.compile().unwrap();
    assert!(matches!(
        program.compile(),
        Err(CompileError::PhaseViolation { .. })
    ));
    assert!(matches!(
        program.define("late", Instruction::create_tag_event("t")),
        Err(CompileError::Instruction { .. })
    ));
}

#[test]
fn conditions_after_closing_fail() {
    let mut program = Program::new();
    let adv = event(&mut program, Instruction::create_advancement_event("e"));
    program.compile().unwrap();
    let err = program
        .preamble_mut()
        .add_event_condition(adv, "late", "1")
        .unwrap_err();
    assert!(matches!(err, CompileError::PhaseViolation { .. }));
}

#[test]
fn signatures_list_argument_names() {
    let spec = Instruction::lookup("add_event_condition").unwrap();
    assert_eq!(
        spec.signature(),
        "add_event_condition event: advancement event path: string value: string"
    );
    assert_eq!(Instruction::catalogue().count(), 7);
}
