use crate::commands::Command;
use crate::ir::event::{EventCondition, EventDef};
use crate::ir::function::IrFunction;
use crate::ir::insn::EmitOutput;

/// What a handler is bound to, as it stood when the preamble closed.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum EventBinding {
    Advancement {
        name: String,
        conditions: Vec<EventCondition>,
    },
    Tag {
        name: String,
    },
}

impl EventBinding {
    pub fn name(&self) -> &str {
        match self {
            EventBinding::Advancement { name, .. } | EventBinding::Tag { name } => name,
        }
    }
}

impl From<&EventDef> for EventBinding {
    fn from(def: &EventDef) -> Self {
        match def {
            EventDef::Advancement(adv) => EventBinding::Advancement {
                name: adv.name.clone(),
                conditions: adv.conditions.clone(),
            },
            EventDef::Tag(tag) => EventBinding::Tag {
                name: tag.name.clone(),
            },
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum OutputRecord {
    EventHandler {
        handler: String,
        event: EventBinding,
        /// The handler re-arms its one-shot trigger after running.
        revoke: bool,
    },
    Setup {
        function: String,
    },
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FunctionArtifact {
    pub name: String,
    pub commands: Vec<Command>,
}

/// Everything a compiled program hands to the session.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Artifacts {
    pub functions: Vec<FunctionArtifact>,
    pub records: Vec<OutputRecord>,
}

impl Artifacts {
    pub fn function(&self, name: &str) -> Option<&FunctionArtifact> {
        self.functions.iter().find(|func| func.name == name)
    }

    pub fn function_names(&self) -> impl Iterator<Item = &str> {
        self.functions.iter().map(|func| func.name.as_str())
    }
}

impl EmitOutput for Artifacts {
    fn write_event_handler(&mut self, handler: &IrFunction, event: &EventDef) {
        self.records.push(OutputRecord::EventHandler {
            handler: handler.global_name().to_string(),
            event: EventBinding::from(event),
            revoke: handler.needs_revoke(),
        });
    }

    fn write_setup_function(&mut self, func: &IrFunction) {
        self.records.push(OutputRecord::Setup {
            function: func.global_name().to_string(),
        });
    }
}
