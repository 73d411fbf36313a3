pub mod events;

#[cfg(test)]
mod tests;

use crate::commands::Command;
use crate::error::{CompileError, CompileResult};
use crate::ir::event::{EventDef, EventHandle, EventKind};
use crate::ir::function::{FuncId, IrFunction};
use crate::ir::preamble::Preamble;
use crate::ir::program::IrValue;

pub use events::{
    AddEventCondition, CreateAdvEvent, CreateTagEvent, EventHandler, FireEvent,
    RevokeEventAdvancement, SetupFunction,
};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum InsnKind {
    Constructor,
    PreambleContributor,
    DirectEmitter,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ArgType {
    VirtualString,
    AdvEventRef,
    TagEventRef,
    EventRef,
    IrFunction,
    /// A function that is written out and can be referenced by name.
    VisibleFunction,
}

impl ArgType {
    pub fn describe(self) -> &'static str {
        match self {
            ArgType::VirtualString => "string",
            ArgType::AdvEventRef => "advancement event",
            ArgType::TagEventRef => "tag event",
            ArgType::EventRef => "event",
            ArgType::IrFunction => "function",
            ArgType::VisibleFunction => "visible function",
        }
    }

    fn check(self, insn: &InsnSpec, value: &IrValue) -> CompileResult<()> {
        let wanted_event = |expected: EventKind, handle: &EventHandle| {
            if handle.kind == expected {
                Ok(())
            } else {
                Err(CompileError::WrongEventKind {
                    insn: insn.name.to_string(),
                    event: format!("#{}", handle.id.index()),
                    expected,
                    found: handle.kind,
                })
            }
        };
        match (self, value) {
            (ArgType::VirtualString, IrValue::Str(_)) => Ok(()),
            (ArgType::EventRef, IrValue::Event(_)) => Ok(()),
            (ArgType::AdvEventRef, IrValue::Event(handle)) => {
                wanted_event(EventKind::Advancement, handle)
            }
            (ArgType::TagEventRef, IrValue::Event(handle)) => wanted_event(EventKind::Tag, handle),
            (ArgType::IrFunction | ArgType::VisibleFunction, IrValue::Func(_)) => Ok(()),
            (expected, found) => Err(CompileError::mismatch(
                expected.describe(),
                found.describe(),
            )),
        }
    }
}

/// Static description of an instruction: its operands and how to document them.
#[derive(Debug)]
pub struct InsnSpec {
    pub name: &'static str,
    pub kind: InsnKind,
    pub doc: &'static str,
    pub args: &'static [ArgType],
    pub argnames: &'static [&'static str],
    pub argdocs: &'static [&'static str],
    pub rettype: Option<ArgType>,
    /// Only allowed in the outermost compilation unit.
    pub top_preamble_only: bool,
}

impl InsnSpec {
    pub fn check_arity(&self, received: usize) -> CompileResult<()> {
        if received != self.args.len() {
            return Err(CompileError::ArityMismatch {
                what: self.name.to_string(),
                expected: self.args.len().to_string(),
                received,
            });
        }
        Ok(())
    }

    pub fn signature(&self) -> String {
        let mut out = self.name.to_string();
        for (name, ty) in self.argnames.iter().zip(self.args) {
            out.push_str(&format!(" {name}: {}", ty.describe()));
        }
        out
    }
}

pub(crate) struct Operands<'a> {
    spec: &'static InsnSpec,
    values: &'a [IrValue],
}

impl<'a> Operands<'a> {
    fn new(spec: &'static InsnSpec, values: &'a [IrValue]) -> CompileResult<Self> {
        spec.check_arity(values.len())?;
        for (ty, value) in spec.args.iter().zip(values) {
            ty.check(spec, value)?;
        }
        Ok(Self { spec, values })
    }

    pub(crate) fn string(&self, idx: usize) -> CompileResult<String> {
        match &self.values[idx] {
            IrValue::Str(text) => Ok(text.clone()),
            other => Err(self.mismatch(idx, other)),
        }
    }

    pub(crate) fn event(&self, idx: usize) -> CompileResult<EventHandle> {
        match &self.values[idx] {
            IrValue::Event(handle) => Ok(*handle),
            other => Err(self.mismatch(idx, other)),
        }
    }

    pub(crate) fn func(&self, idx: usize) -> CompileResult<FuncId> {
        match &self.values[idx] {
            IrValue::Func(id) => Ok(*id),
            other => Err(self.mismatch(idx, other)),
        }
    }

    fn mismatch(&self, idx: usize, found: &IrValue) -> CompileError {
        CompileError::mismatch(self.spec.args[idx].describe(), found.describe())
    }
}

/// Receives the artifacts that preamble contributors produce in `postapply`.
pub trait EmitOutput {
    fn write_event_handler(&mut self, handler: &IrFunction, event: &EventDef);
    fn write_setup_function(&mut self, func: &IrFunction);
}

const CATALOGUE: &[&InsnSpec] = &[
    &events::CREATE_ADV_EVENT,
    &events::CREATE_TAG_EVENT,
    &events::ADD_EVENT_CONDITION,
    &events::EVENT_HANDLER,
    &events::FIRE_EVENT,
    &events::REVOKE_EVENT_ADV,
    &events::SETUP_FUNCTION,
];

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Instruction {
    CreateAdvEvent(CreateAdvEvent),
    CreateTagEvent(CreateTagEvent),
    AddEventCondition(AddEventCondition),
    EventHandler(EventHandler),
    FireEvent(FireEvent),
    RevokeEventAdvancement(RevokeEventAdvancement),
    Setup(SetupFunction),
}

impl Instruction {
    pub fn lookup(name: &str) -> Option<&'static InsnSpec> {
        CATALOGUE.iter().copied().find(|spec| spec.name == name)
    }

    pub fn catalogue() -> impl Iterator<Item = &'static InsnSpec> {
        CATALOGUE.iter().copied()
    }

    /// Builds an instruction by name, checking operand count and types.
    pub fn from_operands(name: &str, values: &[IrValue]) -> CompileResult<Self> {
        let spec = Self::lookup(name).ok_or_else(|| CompileError::NameNotFound {
            what: "Instruction",
            name: name.to_string(),
        })?;
        let ops = Operands::new(spec, values).map_err(|err| err.in_insn(spec.name))?;
        let insn = match spec.name {
            "adv_event" => Instruction::CreateAdvEvent(CreateAdvEvent::read(&ops)?),
            "tag_event" => Instruction::CreateTagEvent(CreateTagEvent::read(&ops)?),
            "add_event_condition" => {
                Instruction::AddEventCondition(AddEventCondition::read(&ops)?)
            }
            "event_handler" => Instruction::EventHandler(EventHandler::read(&ops)?),
            "fire_event" => Instruction::FireEvent(FireEvent::read(&ops)?),
            "revoke_event_adv" => {
                Instruction::RevokeEventAdvancement(RevokeEventAdvancement::read(&ops)?)
            }
            "setupfn" => Instruction::Setup(SetupFunction::read(&ops)?),
            other => {
                return Err(CompileError::NameNotFound {
                    what: "Instruction",
                    name: other.to_string(),
                });
            }
        };
        Ok(insn)
    }

    pub fn create_advancement_event(name: impl Into<String>) -> Self {
        Instruction::CreateAdvEvent(CreateAdvEvent {
            event_name: name.into(),
        })
    }

    pub fn create_tag_event(name: impl Into<String>) -> Self {
        Instruction::CreateTagEvent(CreateTagEvent {
            tag_name: name.into(),
        })
    }

    pub fn add_event_condition(event: EventHandle, path: &str, value: &str) -> CompileResult<Self> {
        Self::from_operands(
            events::ADD_EVENT_CONDITION.name,
            &[
                IrValue::Event(event),
                IrValue::Str(path.to_string()),
                IrValue::Str(value.to_string()),
            ],
        )
    }

    pub fn register_event_handler(handler: FuncId, event: EventHandle) -> CompileResult<Self> {
        Self::from_operands(
            events::EVENT_HANDLER.name,
            &[IrValue::Func(handler), IrValue::Event(event)],
        )
    }

    pub fn fire_tag_event(event: EventHandle) -> CompileResult<Self> {
        Self::from_operands(events::FIRE_EVENT.name, &[IrValue::Event(event)])
    }

    pub fn revoke_event_trigger(handler: FuncId) -> Self {
        Instruction::RevokeEventAdvancement(RevokeEventAdvancement { func: handler })
    }

    pub fn mark_setup_function(func: FuncId) -> Self {
        Instruction::Setup(SetupFunction { func })
    }

    pub fn spec(&self) -> &'static InsnSpec {
        match self {
            Instruction::CreateAdvEvent(_) => &events::CREATE_ADV_EVENT,
            Instruction::CreateTagEvent(_) => &events::CREATE_TAG_EVENT,
            Instruction::AddEventCondition(_) => &events::ADD_EVENT_CONDITION,
            Instruction::EventHandler(_) => &events::EVENT_HANDLER,
            Instruction::FireEvent(_) => &events::FIRE_EVENT,
            Instruction::RevokeEventAdvancement(_) => &events::REVOKE_EVENT_ADV,
            Instruction::Setup(_) => &events::SETUP_FUNCTION,
        }
    }

    pub fn name(&self) -> &'static str {
        self.spec().name
    }

    pub fn kind(&self) -> InsnKind {
        self.spec().kind
    }

    fn no_phase(&self, phase: &str) -> CompileError {
        CompileError::phase(format!("`{}` has no {phase} phase", self.name())).in_insn(self.name())
    }

    pub fn construct(&self, preamble: &mut Preamble) -> CompileResult<IrValue> {
        let result = match self {
            Instruction::CreateAdvEvent(insn) => insn.construct(preamble),
            Instruction::CreateTagEvent(insn) => insn.construct(preamble),
            _ => return Err(self.no_phase("construct")),
        };
        result.map_err(|err| err.in_insn(self.name()))
    }

    pub fn declare(&self, preamble: &mut Preamble) -> CompileResult<()> {
        let result = match self {
            Instruction::AddEventCondition(_) => Ok(()),
            Instruction::EventHandler(insn) => insn.declare(preamble),
            Instruction::Setup(insn) => insn.declare(preamble),
            _ => return Err(self.no_phase("declare")),
        };
        result.map_err(|err| err.in_insn(self.name()))
    }

    pub fn preapply(&self, preamble: &mut Preamble) -> CompileResult<()> {
        let result = match self {
            Instruction::AddEventCondition(insn) => insn.preapply(preamble),
            Instruction::EventHandler(insn) => insn.preapply(preamble),
            Instruction::Setup(_) => Ok(()),
            _ => return Err(self.no_phase("preapply")),
        };
        result.map_err(|err| err.in_insn(self.name()))
    }

    pub fn postapply(
        &self,
        preamble: &Preamble,
        out: &mut dyn EmitOutput,
        top: bool,
    ) -> CompileResult<()> {
        let result = match self {
            Instruction::AddEventCondition(_) => Ok(()),
            Instruction::EventHandler(insn) => insn.postapply(preamble, out, top),
            Instruction::Setup(insn) => insn.postapply(preamble, out, top),
            _ => return Err(self.no_phase("postapply")),
        };
        result.map_err(|err| err.in_insn(self.name()))
    }

    pub fn get_command(&self, preamble: &Preamble, func: &IrFunction) -> CompileResult<Command> {
        let result = match self {
            Instruction::FireEvent(insn) => insn.get_command(preamble, func),
            Instruction::RevokeEventAdvancement(insn) => insn.get_command(preamble, func),
            _ => return Err(self.no_phase("emission")),
        };
        result.map_err(|err| err.in_insn(self.name()))
    }
}
