use crate::ir::event::EventId;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct FuncId(pub(crate) u32);

impl FuncId {
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct FunctionAttrs {
    /// Expanded at call sites; never written as a standalone function.
    pub inline: bool,
    /// Emitted even if nothing marks it as used.
    pub pinned: bool,
}

impl FunctionAttrs {
    pub fn inline() -> Self {
        Self {
            inline: true,
            pinned: false,
        }
    }

    pub fn pinned() -> Self {
        Self {
            inline: false,
            pinned: true,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct IrFunction {
    pub(crate) name: String,
    pub(crate) attrs: FunctionAttrs,
    pub(crate) used: bool,
    pub(crate) revoke_events: Vec<EventId>,
}

impl IrFunction {
    pub(crate) fn new(name: impl Into<String>, attrs: FunctionAttrs) -> Self {
        Self {
            name: name.into(),
            attrs,
            used: false,
            revoke_events: Vec::new(),
        }
    }

    /// Name the function is written under, before namespacing.
    pub fn global_name(&self) -> &str {
        &self.name
    }

    pub fn is_inline(&self) -> bool {
        self.attrs.inline
    }

    pub fn is_used(&self) -> bool {
        self.used
    }

    /// Advancement events this function has to revoke so they can fire again.
    pub fn revoke_events(&self) -> &[EventId] {
        &self.revoke_events
    }

    pub fn needs_revoke(&self) -> bool {
        !self.revoke_events.is_empty()
    }

    pub(crate) fn is_emitted(&self) -> bool {
        !self.attrs.inline && (self.used || self.attrs.pinned)
    }
}
