use indexmap::IndexMap;
use tracing::debug;

use crate::commands::{
    advancement_name, AdvancementRef, Command, NsName, ScoreRef, Selector, Subsequence,
};
use crate::config::SessionConfig;
use crate::datapack::{Advancement, Writer};
use crate::error::CompileResult;
use crate::ir::event::EventCondition;
use crate::ir::{Artifacts, EventBinding, OutputRecord};
use crate::placer::{BlockMode, CommandBlock, CommandSequence, Placer};
use crate::scope::{Scope, VariableEntry};

pub const ENTITY_TAG: &str = "etag";
pub const SETUP_ON_LOAD_TRAMPOLINE: &str = "setup_on_load_trampoline";
pub const STACK_DUMP: &str = "stack_dump";

const TICK_TAG: &str = "minecraft:tick";
const LOAD_TAG: &str = "minecraft:load";

const WORKING_REGISTERS: [(&str, &str); 5] = [
    ("stack_register", "sr"),
    ("working_reg", "a"),
    ("working_reg_2", "b"),
    ("working_reg_3", "c"),
    ("success_tracker", "st"),
];

/// Registers zeroed by the install function.
const ZEROED_REGISTERS: [&str; 2] = ["working_reg", "success_tracker"];

pub fn trampoline_name(handler: &str) -> String {
    format!("{handler}_trampoline")
}

#[derive(Debug)]
struct TagGroup {
    namespace: String,
    name: String,
    members: Vec<String>,
}

pub struct Session<P, W> {
    scope: Scope,
    placer: P,
    writer: W,
    setup_on_load: bool,
    setup_hook: Option<Subsequence>,
    tags: IndexMap<String, TagGroup>,
}

impl<P: Placer, W: Writer> Session<P, W> {
    pub fn new(config: &SessionConfig, placer: P, writer: W) -> CompileResult<Self> {
        let mut variables: IndexMap<String, VariableEntry> = WORKING_REGISTERS
            .iter()
            .map(|(name, short)| (name.to_string(), VariableEntry::fixed(*short)))
            .collect();
        for (name, entry) in &config.variables {
            variables.insert(name.clone(), entry.clone());
        }
        let scope = Scope::new(
            config.namespace.clone(),
            ENTITY_TAG,
            variables,
            config.position,
            config.args.clone(),
            config.extern_names.iter().cloned(),
        )
        .with_collision_detection(config.detect_trim_collisions);

        let mut session = Self {
            scope,
            placer,
            writer,
            setup_on_load: config.setup_on_load,
            setup_hook: None,
            tags: IndexMap::new(),
        };
        for tag in [TICK_TAG, LOAD_TAG] {
            session.tag_group(&NsName(tag.to_string()));
        }
        if session.setup_on_load {
            session
                .scope
                .add_function_names([SETUP_ON_LOAD_TRAMPOLINE]);
            let member = session.scope.function_name(SETUP_ON_LOAD_TRAMPOLINE)?;
            session.tag_group(&NsName(LOAD_TAG.to_string())).members.push(member);
        }
        session.add_util_command_block()?;
        Ok(session)
    }

    pub fn scope(&self) -> &Scope {
        &self.scope
    }

    pub fn scope_mut(&mut self) -> &mut Scope {
        &mut self.scope
    }

    pub fn writer(&self) -> &W {
        &self.writer
    }

    pub fn placer(&self) -> &P {
        &self.placer
    }

    pub fn into_parts(self) -> (Scope, P, W) {
        (self.scope, self.placer, self.writer)
    }

    fn add_util_command_block(&mut self) -> CompileResult<()> {
        let mut seq = CommandSequence::new();
        seq.add_block(CommandBlock {
            command: Command::raw(""),
            conditional: false,
            mode: BlockMode::Repeat,
        });
        self.add_command_blocks(&[seq])?;

        let mut dump = Subsequence::new();
        dump.add_command(Command::StackDump {
            path: None,
            target: Selector::all_players(),
        });
        self.scope.add_function_names([STACK_DUMP]);
        self.add_subsequence(STACK_DUMP, &dump)
    }

    pub fn load_subroutine_table<I, S>(&mut self, known_functions: I)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.scope.add_function_names(known_functions);
    }

    pub fn add_subsequence(&mut self, name: &str, subsequence: &Subsequence) -> CompileResult<()> {
        let commands = subsequence.resolve(&mut self.scope)?;
        debug!(function = name, ?commands, "function");
        self.writer.write_function(name, &commands);
        Ok(())
    }

    pub fn add_command_blocks(&mut self, lines: &[CommandSequence]) -> CompileResult<()> {
        for line in lines {
            let resolved = line.resolve(&mut self.scope)?;
            debug!(blocks = resolved.len(), "command block line");
            self.placer.place(resolved);
        }
        Ok(())
    }

    fn tag_group(&mut self, tag: &NsName) -> &mut TagGroup {
        let key = tag.resolve(&self.scope);
        self.tags.entry(key).or_insert_with(|| {
            let namespace = tag.split().0.unwrap_or(self.scope.namespace()).to_string();
            TagGroup {
                namespace,
                name: tag.split().1.to_string(),
                members: Vec::new(),
            }
        })
    }

    /// Wires handler records to their events and writes every non-empty tag.
    pub fn add_event_handlers(&mut self, records: &[OutputRecord]) -> CompileResult<()> {
        for record in records {
            match record {
                OutputRecord::EventHandler {
                    handler,
                    event: EventBinding::Tag { name },
                    ..
                } => {
                    let member = self.scope.function_name(handler)?;
                    self.tag_group(&NsName(name.clone())).members.push(member);
                }
                OutputRecord::EventHandler {
                    handler,
                    event: EventBinding::Advancement { name, conditions },
                    revoke,
                } => self.add_event_handler(name, conditions, handler, *revoke)?,
                OutputRecord::Setup { function } => {
                    let member = self.scope.function_name(function)?;
                    self.tag_group(&NsName(LOAD_TAG.to_string())).members.push(member);
                }
            }
        }
        self.write_tags();
        Ok(())
    }

    fn write_tags(&mut self) {
        for group in self.tags.values().filter(|group| !group.members.is_empty()) {
            debug!(tag = %group.name, members = ?group.members, "tag");
            self.writer
                .write_tag("functions", &group.name, &group.members, &group.namespace);
        }
    }

    fn add_event_handler(
        &mut self,
        event_name: &str,
        conditions: &[EventCondition],
        handler: &str,
        revoke: bool,
    ) -> CompileResult<()> {
        let trampoline = trampoline_name(handler);
        self.scope.add_function_names([trampoline.clone()]);
        let mut adv = Advancement::new(advancement_name(handler));
        adv.event_criteria(handler, event_name, conditions);
        adv.reward_function(self.scope.function_name(&trampoline)?);
        debug!(advancement = %adv.name, trigger = event_name, "advancement");
        self.writer.write_advancement(&adv);

        let mut seq = Subsequence::new();
        if revoke {
            seq.add_command(Command::revoke_only(
                Selector::sender(),
                AdvancementRef::for_handler(handler),
            ));
        }
        seq.add_command(Command::function(handler));
        self.add_subsequence(&trampoline, &seq)
    }

    /// Writes every compiled function, then wires the handler records.
    pub fn emit_program(&mut self, artifacts: &Artifacts) -> CompileResult<()> {
        self.scope.add_function_names(artifacts.function_names());
        for func in &artifacts.functions {
            self.add_subsequence(&func.name, &Subsequence::from(func.commands.clone()))?;
        }
        self.add_event_handlers(&artifacts.records)
    }

    /// Extra commands appended to the install function.
    pub fn set_setup_hook(&mut self, hook: Subsequence) {
        self.setup_hook = Some(hook);
    }

    fn zero(&mut self, target: ScoreRef) -> CompileResult<String> {
        Command::SetConst { target, value: 0 }.resolve(&mut self.scope)
    }

    /// Commands that build the namespace's runtime state. Seals the scope.
    pub fn install_commands(&mut self) -> CompileResult<Vec<String>> {
        let hook = match self.setup_hook.take() {
            Some(hook) => {
                let resolved = hook.resolve(&mut self.scope);
                self.setup_hook = Some(hook);
                resolved?
            }
            None => Vec::new(),
        };

        let tag = self.scope.entity_tag().to_string();
        let item = r#"{id:"minecraft:stone",Count:1b,tag:{stack:[],globals:[],working:{int:0}}}"#;
        let nbt = format!(
            "{{Tags:[\"{tag}\"],ArmorItems:[{item}],NoAI:1b,Invisible:1b,Small:0b,\
             NoGravity:1b,Marker:1b,Invulnerable:1b,NoBasePlate:1b}}"
        );
        let stale = Selector::namespace_entities(&self.scope).resolve(&self.scope);
        let mut up = vec![
            format!("kill {stale}"),
            format!("summon armor_stand {} {nbt}", self.scope.util_block()),
        ];
        let objectives = self.scope.get_objectives()?;
        up.extend(
            objectives
                .iter()
                .map(|obj| format!("scoreboard objectives add {obj} dummy")),
        );
        self.scope.seal();

        let cells: Vec<u64> = self.scope.get_mem_locs().collect();
        for cell in cells {
            up.push(self.zero(ScoreRef::Mem(cell))?);
        }
        for register in ZEROED_REGISTERS {
            up.push(self.zero(ScoreRef::var(register))?);
        }
        up.extend(self.placer.output());
        up.extend(hook);
        Ok(up)
    }

    pub fn uninstall_commands(&self) -> CompileResult<Vec<String>> {
        let tracked = Selector::namespace_entities(&self.scope).resolve(&self.scope);
        let mut down = vec![format!("kill {tracked}")];
        down.extend(
            self.scope
                .get_objectives()?
                .iter()
                .map(|obj| format!("scoreboard objectives remove {obj}")),
        );
        down.extend(self.placer.cleanup());
        Ok(down)
    }

    /// Writes the install and uninstall functions and returns the commands
    /// that invoke them.
    pub fn create_up_down_functions(
        &mut self,
        setup: &str,
        cleanup: &str,
    ) -> CompileResult<(String, String)> {
        self.scope.add_function_names([setup, cleanup]);
        let up = self.install_commands()?;
        let down = self.uninstall_commands()?;
        debug!(function = setup, commands = up.len(), "install");
        self.writer.write_function(setup, &up);
        debug!(function = cleanup, commands = down.len(), "uninstall");
        self.writer.write_function(cleanup, &down);
        if self.setup_on_load {
            let call = Command::function(setup).resolve(&mut self.scope)?;
            self.writer.write_function(SETUP_ON_LOAD_TRAMPOLINE, &[call]);
            self.write_tags();
        }
        Ok((
            Command::function(setup).resolve(&mut self.scope)?,
            Command::function(cleanup).resolve(&mut self.scope)?,
        ))
    }
}
