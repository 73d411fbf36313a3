use super::{ArgType, EmitOutput, InsnKind, InsnSpec, Operands};
use crate::commands::{AdvancementRef, Command, NsName, Selector};
use crate::error::{CompileError, CompileResult};
use crate::ir::event::{EventDef, EventHandle};
use crate::ir::function::{FuncId, IrFunction};
use crate::ir::preamble::Preamble;
use crate::ir::program::IrValue;

pub const CREATE_ADV_EVENT: InsnSpec = InsnSpec {
    name: "adv_event",
    kind: InsnKind::Constructor,
    doc: "Creates an advancement-based event object.",
    args: &[ArgType::VirtualString],
    argnames: &["event_name"],
    argdocs: &["The event name"],
    rettype: Some(ArgType::AdvEventRef),
    top_preamble_only: false,
};

pub const CREATE_TAG_EVENT: InsnSpec = InsnSpec {
    name: "tag_event",
    kind: InsnKind::Constructor,
    doc: "Creates a tag-based event object.",
    args: &[ArgType::VirtualString],
    argnames: &["tag_name"],
    argdocs: &["The function tag name"],
    rettype: Some(ArgType::TagEventRef),
    top_preamble_only: false,
};

pub const ADD_EVENT_CONDITION: InsnSpec = InsnSpec {
    name: "add_event_condition",
    kind: InsnKind::PreambleContributor,
    doc: "Add a condition to an event that must be true for the event handler to be invoked.",
    args: &[ArgType::AdvEventRef, ArgType::VirtualString, ArgType::VirtualString],
    argnames: &["event", "path", "value"],
    argdocs: &[
        "Event to add the condition to",
        "JSON path in the advancement",
        "Value that must match",
    ],
    rettype: None,
    top_preamble_only: false,
};

pub const EVENT_HANDLER: InsnSpec = InsnSpec {
    name: "event_handler",
    kind: InsnKind::PreambleContributor,
    doc: "Add an event handler to the given event specification.",
    args: &[ArgType::IrFunction, ArgType::EventRef],
    argnames: &["handler", "event"],
    argdocs: &["Event handler", "Event"],
    rettype: None,
    top_preamble_only: true,
};

pub const FIRE_EVENT: InsnSpec = InsnSpec {
    name: "fire_event",
    kind: InsnKind::DirectEmitter,
    doc: "Fires a tag-based event to all listeners.",
    args: &[ArgType::TagEventRef],
    argnames: &["event"],
    argdocs: &["Tag event to fire"],
    rettype: None,
    top_preamble_only: false,
};

pub const REVOKE_EVENT_ADV: InsnSpec = InsnSpec {
    name: "revoke_event_adv",
    kind: InsnKind::DirectEmitter,
    doc: "(Internal) Revokes an advancement to allow an event to re-fire.",
    args: &[ArgType::IrFunction],
    argnames: &["func"],
    argdocs: &["Handler"],
    rettype: None,
    top_preamble_only: false,
};

pub const SETUP_FUNCTION: InsnSpec = InsnSpec {
    name: "setupfn",
    kind: InsnKind::PreambleContributor,
    doc: "Tags a function as being part of the setup phase. It is called whenever the datapack is reloaded.",
    args: &[ArgType::VisibleFunction],
    argnames: &["func"],
    argdocs: &["The setup function"],
    rettype: None,
    top_preamble_only: true,
};

fn addressable<'p>(
    preamble: &'p Preamble,
    func: FuncId,
    insn: &'static str,
) -> CompileResult<&'p IrFunction> {
    let function = preamble.function(func)?;
    if function.is_inline() {
        return Err(CompileError::InlineHandlerNotAllowed {
            insn: insn.to_string(),
            function: function.global_name().to_string(),
        });
    }
    Ok(function)
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CreateAdvEvent {
    pub event_name: String,
}

impl CreateAdvEvent {
    pub(super) fn read(ops: &Operands<'_>) -> CompileResult<Self> {
        Ok(Self {
            event_name: ops.string(0)?,
        })
    }

    pub(super) fn construct(&self, preamble: &mut Preamble) -> CompileResult<IrValue> {
        let handle = preamble.create_event(EventDef::advancement(self.event_name.as_str()))?;
        Ok(IrValue::Event(handle))
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CreateTagEvent {
    pub tag_name: String,
}

impl CreateTagEvent {
    pub(super) fn read(ops: &Operands<'_>) -> CompileResult<Self> {
        Ok(Self {
            tag_name: ops.string(0)?,
        })
    }

    pub(super) fn construct(&self, preamble: &mut Preamble) -> CompileResult<IrValue> {
        let handle = preamble.create_event(EventDef::tag(self.tag_name.as_str()))?;
        Ok(IrValue::Event(handle))
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct AddEventCondition {
    pub event: EventHandle,
    pub path: String,
    pub value: String,
}

impl AddEventCondition {
    pub(super) fn read(ops: &Operands<'_>) -> CompileResult<Self> {
        Ok(Self {
            event: ops.event(0)?,
            path: ops.string(1)?,
            value: ops.string(2)?,
        })
    }

    pub(super) fn preapply(&self, preamble: &mut Preamble) -> CompileResult<()> {
        preamble.add_event_condition(self.event, &self.path, &self.value)
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct EventHandler {
    pub handler: FuncId,
    pub event: EventHandle,
}

impl EventHandler {
    pub(super) fn read(ops: &Operands<'_>) -> CompileResult<Self> {
        Ok(Self {
            handler: ops.func(0)?,
            event: ops.event(1)?,
        })
    }

    pub(super) fn declare(&self, preamble: &mut Preamble) -> CompileResult<()> {
        preamble.mark_used(self.handler)
    }

    pub(super) fn preapply(&self, preamble: &mut Preamble) -> CompileResult<()> {
        if !self.event.is_tag() {
            preamble.add_advancement_revoke(self.handler, self.event)?;
        }
        Ok(())
    }

    pub(super) fn postapply(
        &self,
        preamble: &Preamble,
        out: &mut dyn EmitOutput,
        _top: bool,
    ) -> CompileResult<()> {
        let handler = addressable(preamble, self.handler, EVENT_HANDLER.name)?;
        out.write_event_handler(handler, preamble.event(self.event)?);
        Ok(())
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FireEvent {
    pub event: EventHandle,
}

impl FireEvent {
    pub(super) fn read(ops: &Operands<'_>) -> CompileResult<Self> {
        Ok(Self {
            event: ops.event(0)?,
        })
    }

    pub(super) fn get_command(&self, preamble: &Preamble, _func: &IrFunction) -> CompileResult<Command> {
        let event = preamble.event(self.event)?;
        Ok(Command::FunctionTag(NsName(event.name().to_string())))
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RevokeEventAdvancement {
    pub func: FuncId,
}

impl RevokeEventAdvancement {
    pub(super) fn read(ops: &Operands<'_>) -> CompileResult<Self> {
        Ok(Self { func: ops.func(0)? })
    }

    pub(super) fn get_command(&self, preamble: &Preamble, _func: &IrFunction) -> CompileResult<Command> {
        // The advancement is named after the handler it triggers.
        let handler = preamble.function(self.func)?;
        Ok(Command::revoke_only(
            Selector::sender(),
            AdvancementRef::for_handler(handler.global_name()),
        ))
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SetupFunction {
    pub func: FuncId,
}

impl SetupFunction {
    pub(super) fn read(ops: &Operands<'_>) -> CompileResult<Self> {
        Ok(Self { func: ops.func(0)? })
    }

    pub(super) fn declare(&self, preamble: &mut Preamble) -> CompileResult<()> {
        preamble.mark_used(self.func)
    }

    pub(super) fn postapply(
        &self,
        preamble: &Preamble,
        out: &mut dyn EmitOutput,
        _top: bool,
    ) -> CompileResult<()> {
        let func = addressable(preamble, self.func, SETUP_FUNCTION.name)?;
        out.write_setup_function(func);
        Ok(())
    }
}
