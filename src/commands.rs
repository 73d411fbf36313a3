use serde_json::json;

use crate::error::CompileResult;
use crate::scope::Scope;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SelectorType {
    Sender,
    AllPlayers,
    AllEntities,
}

impl SelectorType {
    fn symbol(self) -> &'static str {
        match self {
            SelectorType::Sender => "@s",
            SelectorType::AllPlayers => "@a",
            SelectorType::AllEntities => "@e",
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Selector {
    Plain(SelectorType),
    /// Entities carrying the given literal tag.
    Tagged { kind: SelectorType, tag: String, limit: Option<u32> },
    /// The single entity that carries the namespace's persistent state.
    Tracked,
}

impl Selector {
    pub fn sender() -> Self {
        Selector::Plain(SelectorType::Sender)
    }

    pub fn all_players() -> Self {
        Selector::Plain(SelectorType::AllPlayers)
    }

    /// Every entity carrying the namespace's entity tag, stale copies included.
    pub fn namespace_entities(scope: &Scope) -> Self {
        Selector::Tagged {
            kind: SelectorType::AllEntities,
            tag: scope.entity_tag().to_string(),
            limit: None,
        }
    }

    pub fn resolve(&self, scope: &Scope) -> String {
        match self {
            Selector::Plain(kind) => kind.symbol().to_string(),
            Selector::Tagged { kind, tag, limit } => match limit {
                Some(limit) => format!("{}[tag={tag},limit={limit}]", kind.symbol()),
                None => format!("{}[tag={tag}]", kind.symbol()),
            },
            Selector::Tracked => Selector::Tagged {
                kind: SelectorType::AllEntities,
                tag: scope.entity_tag().to_string(),
                limit: Some(1),
            }
            .resolve(scope),
        }
    }
}

/// Resource location; unqualified names live in the scope's namespace.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct NsName(pub String);

impl NsName {
    pub fn split(&self) -> (Option<&str>, &str) {
        match self.0.split_once(':') {
            Some((namespace, name)) => (Some(namespace), name),
            None => (None, self.0.as_str()),
        }
    }

    pub fn resolve(&self, scope: &Scope) -> String {
        match self.split() {
            (Some(namespace), name) => format!("{namespace}:{name}"),
            (None, name) => format!("{}:{}", scope.namespace(), name),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct AdvancementRef(pub String);

impl AdvancementRef {
    /// Advancement that triggers the handler `handler`.
    pub fn for_handler(handler: &str) -> Self {
        AdvancementRef(advancement_name(handler))
    }
}

pub fn advancement_name(handler: &str) -> String {
    format!("adv_{handler}")
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ScoreRef {
    Var { name: String, args: Vec<String> },
    Mem(u64),
}

impl ScoreRef {
    pub fn var(name: impl Into<String>) -> Self {
        ScoreRef::Var {
            name: name.into(),
            args: Vec::new(),
        }
    }

    fn objective(&self, scope: &mut Scope) -> CompileResult<String> {
        match self {
            ScoreRef::Var { name, args } => {
                let args: Vec<&str> = args.iter().map(String::as_str).collect();
                scope.variable(name, &args)
            }
            ScoreRef::Mem(orig) => scope.memory(*orig),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum CmdPart {
    Text(String),
    /// Resolved with [`Scope::cmd_arg`].
    Arg { kind: String, value: String },
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Command {
    Raw(String),
    Function(String),
    FunctionTag(NsName),
    /// Re-arms a one-shot advancement for `target`.
    RevokeAdvancement {
        target: Selector,
        advancement: AdvancementRef,
    },
    SetConst { target: ScoreRef, value: i32 },
    /// Prints the tracked entity's NBT at `path` (the whole stack when `None`).
    StackDump { path: Option<String>, target: Selector },
    Templated(Vec<CmdPart>),
}

impl Command {
    pub fn raw(text: impl Into<String>) -> Self {
        Command::Raw(text.into())
    }

    pub fn function(name: impl Into<String>) -> Self {
        Command::Function(name.into())
    }

    pub fn revoke_only(target: Selector, advancement: AdvancementRef) -> Self {
        Command::RevokeAdvancement {
            target,
            advancement,
        }
    }

    pub fn resolve(&self, scope: &mut Scope) -> CompileResult<String> {
        Ok(match self {
            Command::Raw(text) => text.clone(),
            Command::Function(name) => format!("function {}", scope.function_name(name)?),
            Command::FunctionTag(tag) => format!("function #{}", tag.resolve(scope)),
            Command::RevokeAdvancement {
                target,
                advancement,
            } => {
                format!(
                    "advancement revoke {} only {}:{}",
                    target.resolve(scope),
                    scope.namespace(),
                    advancement.0
                )
            }
            Command::SetConst { target, value } => {
                let objective = target.objective(scope)?;
                format!(
                    "scoreboard players set {} {objective} {value}",
                    Selector::Tracked.resolve(scope)
                )
            }
            Command::StackDump { path, target } => {
                let nbt = match path {
                    Some(path) => scope.custom_nbt_path(&format!("stack.{path}")),
                    None => scope.custom_nbt_path("stack"),
                };
                let component = json!({
                    "nbt": nbt,
                    "entity": Selector::Tracked.resolve(scope),
                });
                format!("tellraw {} {}", target.resolve(scope), component)
            }
            Command::Templated(parts) => {
                let mut out = String::new();
                for part in parts {
                    match part {
                        CmdPart::Text(text) => out.push_str(text),
                        CmdPart::Arg { kind, value } => out.push_str(&scope.cmd_arg(kind, value)?),
                    }
                }
                out
            }
        })
    }
}

/// Ordered commands that become one function.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Subsequence {
    commands: Vec<Command>,
}

impl Subsequence {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_command(&mut self, command: Command) {
        self.commands.push(command);
    }

    pub fn get_commands(&self) -> &[Command] {
        &self.commands
    }

    pub fn resolve(&self, scope: &mut Scope) -> CompileResult<Vec<String>> {
        self.commands.iter().map(|cmd| cmd.resolve(scope)).collect()
    }
}

impl From<Vec<Command>> for Subsequence {
    fn from(commands: Vec<Command>) -> Self {
        Self { commands }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scope::BlockPos;
    use indexmap::IndexMap;
    use std::collections::HashMap;

    fn scope() -> Scope {
        let mut variables = IndexMap::new();
        variables.insert(
            "working_reg".to_string(),
            crate::scope::VariableEntry::fixed("a"),
        );
        Scope::new(
            "ns",
            "etag",
            variables,
            BlockPos::new(0, 0, 0),
            HashMap::new(),
            Vec::new(),
        )
    }

    #[test]
    fn revoke_targets_namespaced_advancement() {
        let mut scope = scope();
        let cmd = Command::revoke_only(Selector::sender(), AdvancementRef::for_handler("h"));
        assert_eq!(
            cmd.resolve(&mut scope).unwrap(),
            "advancement revoke @s only ns:adv_h"
        );
    }

    #[test]
    fn function_tags_default_to_scope_namespace() {
        let mut scope = scope();
        let local = Command::FunctionTag(NsName("ping".into()));
        let vanilla = Command::FunctionTag(NsName("minecraft:tick".into()));
        assert_eq!(local.resolve(&mut scope).unwrap(), "function #ns:ping");
        assert_eq!(vanilla.resolve(&mut scope).unwrap(), "function #minecraft:tick");
    }

    #[test]
    fn set_const_scores_tracked_entity() {
        let mut scope = scope();
        let cmd = Command::SetConst {
            target: ScoreRef::var("working_reg"),
            value: 0,
        };
        assert_eq!(
            cmd.resolve(&mut scope).unwrap(),
            "scoreboard players set @e[tag=ns_etag,limit=1] ns_a 0"
        );
    }

    #[test]
    fn templated_commands_resolve_arguments() {
        let mut scope = scope();
        let cmd = Command::Templated(vec![
            CmdPart::Text("tag @s add ".into()),
            CmdPart::Arg {
                kind: "tag".into(),
                value: "done".into(),
            },
        ]);
        assert_eq!(cmd.resolve(&mut scope).unwrap(), "tag @s add ns_tag_done");
    }
}
