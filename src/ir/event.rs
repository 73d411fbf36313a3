use std::fmt;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum EventKind {
    Advancement,
    Tag,
}

impl fmt::Display for EventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EventKind::Advancement => write!(f, "an advancement"),
            EventKind::Tag => write!(f, "a tag"),
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct EventId(pub(crate) u32);

impl EventId {
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

/// Typed reference to an event owned by a preamble.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct EventHandle {
    pub id: EventId,
    pub kind: EventKind,
}

impl EventHandle {
    pub fn is_tag(&self) -> bool {
        matches!(self.kind, EventKind::Tag)
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct EventCondition {
    pub path: Vec<String>,
    pub value: String,
}

impl EventCondition {
    pub fn new(path: &str, value: impl Into<String>) -> Self {
        Self {
            path: path.split('.').map(str::to_string).collect(),
            value: value.into(),
        }
    }

    pub fn dotted_path(&self) -> String {
        self.path.join(".")
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct AdvancementEvent {
    pub name: String,
    pub conditions: Vec<EventCondition>,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TagEvent {
    pub name: String,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum EventDef {
    Advancement(AdvancementEvent),
    Tag(TagEvent),
}

impl EventDef {
    pub fn advancement(name: impl Into<String>) -> Self {
        EventDef::Advancement(AdvancementEvent {
            name: name.into(),
            conditions: Vec::new(),
        })
    }

    pub fn tag(name: impl Into<String>) -> Self {
        EventDef::Tag(TagEvent { name: name.into() })
    }

    pub fn name(&self) -> &str {
        match self {
            EventDef::Advancement(event) => &event.name,
            EventDef::Tag(event) => &event.name,
        }
    }

    pub fn kind(&self) -> EventKind {
        match self {
            EventDef::Advancement(_) => EventKind::Advancement,
            EventDef::Tag(_) => EventKind::Tag,
        }
    }

    pub fn conditions(&self) -> &[EventCondition] {
        match self {
            EventDef::Advancement(event) => &event.conditions,
            EventDef::Tag(_) => &[],
        }
    }
}
