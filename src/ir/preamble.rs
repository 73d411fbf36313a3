use tracing::trace;

use crate::error::{CompileError, CompileResult};
use crate::ir::event::{EventCondition, EventDef, EventHandle, EventId, EventKind};
use crate::ir::function::{FuncId, FunctionAttrs, IrFunction};

#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord)]
pub enum Phase {
    /// Constructors run and functions are created.
    Define,
    Declare,
    Apply,
    /// Postapply and final emission; nothing may change.
    Closed,
}

impl Phase {
    fn next(self) -> Option<Phase> {
        match self {
            Phase::Define => Some(Phase::Declare),
            Phase::Declare => Some(Phase::Apply),
            Phase::Apply => Some(Phase::Closed),
            Phase::Closed => None,
        }
    }
}

#[derive(Debug)]
pub struct Preamble {
    phase: Phase,
    events: Vec<EventDef>,
    functions: Vec<IrFunction>,
}

impl Default for Preamble {
    fn default() -> Self {
        Self::new()
    }
}

impl Preamble {
    pub fn new() -> Self {
        Self {
            phase: Phase::Define,
            events: Vec::new(),
            functions: Vec::new(),
        }
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn is_closed(&self) -> bool {
        self.phase == Phase::Closed
    }

    /// Moves to the phase directly after the current one.
    pub(crate) fn advance(&mut self, to: Phase) -> CompileResult<()> {
        if self.phase.next() != Some(to) {
            return Err(CompileError::phase(format!(
                "cannot enter {to:?} from {:?}",
                self.phase
            )));
        }
        trace!(from = ?self.phase, to = ?to, "preamble phase");
        self.phase = to;
        Ok(())
    }

    fn require(&self, phase: Phase, action: &str) -> CompileResult<()> {
        if self.phase != phase {
            return Err(CompileError::phase(format!(
                "{action} is only allowed in the {phase:?} phase (currently {:?})",
                self.phase
            )));
        }
        Ok(())
    }

    pub fn create_event(&mut self, def: EventDef) -> CompileResult<EventHandle> {
        self.require(Phase::Define, "creating an event")?;
        let handle = EventHandle {
            id: EventId(self.events.len() as u32),
            kind: def.kind(),
        };
        self.events.push(def);
        Ok(handle)
    }

    pub fn add_function(
        &mut self,
        name: impl Into<String>,
        attrs: FunctionAttrs,
    ) -> CompileResult<FuncId> {
        self.require(Phase::Define, "creating a function")?;
        let name = name.into();
        if self.functions.iter().any(|func| func.name == name) {
            return Err(CompileError::ScopeViolation {
                insn: "function".into(),
                message: format!("function `{name}` is already defined"),
            });
        }
        let id = FuncId(self.functions.len() as u32);
        self.functions.push(IrFunction::new(name, attrs));
        Ok(id)
    }

    pub fn event(&self, handle: EventHandle) -> CompileResult<&EventDef> {
        self.events
            .get(handle.id.index())
            .ok_or_else(|| CompileError::NameNotFound {
                what: "Event",
                name: format!("#{}", handle.id.0),
            })
    }

    pub fn function(&self, id: FuncId) -> CompileResult<&IrFunction> {
        self.functions
            .get(id.index())
            .ok_or_else(|| CompileError::NameNotFound {
                what: "Function",
                name: format!("#{}", id.0),
            })
    }

    fn function_mut(&mut self, id: FuncId) -> CompileResult<&mut IrFunction> {
        self.functions
            .get_mut(id.index())
            .ok_or_else(|| CompileError::NameNotFound {
                what: "Function",
                name: format!("#{}", id.0),
            })
    }

    pub fn functions(&self) -> impl Iterator<Item = (FuncId, &IrFunction)> {
        self.functions
            .iter()
            .enumerate()
            .map(|(idx, func)| (FuncId(idx as u32), func))
    }

    pub fn events(&self) -> &[EventDef] {
        &self.events
    }

    pub fn mark_used(&mut self, id: FuncId) -> CompileResult<()> {
        self.require(Phase::Declare, "marking a function as used")?;
        self.function_mut(id)?.used = true;
        Ok(())
    }

    pub fn add_event_condition(
        &mut self,
        handle: EventHandle,
        path: &str,
        value: &str,
    ) -> CompileResult<()> {
        self.require(Phase::Apply, "adding an event condition")?;
        let event = self
            .events
            .get_mut(handle.id.index())
            .ok_or_else(|| CompileError::NameNotFound {
                what: "Event",
                name: format!("#{}", handle.id.0),
            })?;
        match event {
            EventDef::Advancement(adv) => {
                adv.conditions.push(EventCondition::new(path, value));
                Ok(())
            }
            EventDef::Tag(tag) => Err(CompileError::WrongEventKind {
                insn: "add_event_condition".into(),
                event: tag.name.clone(),
                expected: EventKind::Advancement,
                found: EventKind::Tag,
            }),
        }
    }

    pub fn add_advancement_revoke(&mut self, id: FuncId, event: EventHandle) -> CompileResult<()> {
        self.require(Phase::Apply, "registering an advancement revoke")?;
        if event.is_tag() {
            return Err(CompileError::WrongEventKind {
                insn: "event_handler".into(),
                event: self.event(event)?.name().to_string(),
                expected: EventKind::Advancement,
                found: EventKind::Tag,
            });
        }
        let func = self.function_mut(id)?;
        // One function owns exactly one advancement, named after it.
        if let Some(existing) = func.revoke_events.first() {
            if *existing != event.id {
                return Err(CompileError::ScopeViolation {
                    insn: "event_handler".into(),
                    message: format!(
                        "`{}` already handles another advancement event",
                        func.global_name()
                    ),
                });
            }
            return Ok(());
        }
        func.revoke_events.push(event.id);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn phases_only_move_forward_one_step() {
        let mut preamble = Preamble::new();
        assert!(preamble.advance(Phase::Apply).is_err());
        preamble.advance(Phase::Declare).unwrap();
        preamble.advance(Phase::Apply).unwrap();
        preamble.advance(Phase::Closed).unwrap();
        assert!(matches!(
            preamble.advance(Phase::Closed),
            Err(CompileError::PhaseViolation { .. })
        ));
    }

    #[test]
    fn conditions_are_rejected_once_closed() {
        let mut preamble = Preamble::new();
        let event = preamble.create_event(EventDef::advancement("e")).unwrap();
        preamble.advance(Phase::Declare).unwrap();
        preamble.advance(Phase::Apply).unwrap();
        preamble.add_event_condition(event, "a.b", "1").unwrap();
        preamble.advance(Phase::Closed).unwrap();

        let err = preamble.add_event_condition(event, "a.c", "2").unwrap_err();
        assert!(matches!(err, CompileError::PhaseViolation { .. }));
        assert_eq!(preamble.event(event).unwrap().conditions().len(), 1);
    }

    #[test]
    fn duplicate_function_names_are_rejected() {
        let mut preamble = Preamble::new();
        preamble.add_function("f", FunctionAttrs::default()).unwrap();
        assert!(preamble.add_function("f", FunctionAttrs::default()).is_err());
    }

    #[test]
    fn revoke_registration_is_deduplicated() {
        let mut preamble = Preamble::new();
        let event = preamble.create_event(EventDef::advancement("e")).unwrap();
        let func = preamble.add_function("h", FunctionAttrs::default()).unwrap();
        preamble.advance(Phase::Declare).unwrap();
        preamble.advance(Phase::Apply).unwrap();
        preamble.add_advancement_revoke(func, event).unwrap();
        preamble.add_advancement_revoke(func, event).unwrap();
        assert_eq!(preamble.function(func).unwrap().revoke_events(), &[event.id]);
    }

    #[test]
    fn handler_owns_a_single_advancement() {
        let mut preamble = Preamble::new();
        let first = preamble.create_event(EventDef::advancement("minecraft:a")).unwrap();
        let second = preamble.create_event(EventDef::advancement("minecraft:b")).unwrap();
        let func = preamble.add_function("h", FunctionAttrs::default()).unwrap();
        preamble.advance(Phase::Declare).unwrap();
        preamble.advance(Phase::Apply).unwrap();
        preamble.add_advancement_revoke(func, first).unwrap();
        let err = preamble.add_advancement_revoke(func, second).unwrap_err();
        assert!(matches!(err, CompileError::ScopeViolation { .. }));
        assert_eq!(preamble.function(func).unwrap().revoke_events(), &[first.id]);
    }
}
