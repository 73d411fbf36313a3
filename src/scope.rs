use std::collections::{HashMap, HashSet};
use std::fmt;
use std::str::FromStr;

use indexmap::{IndexMap, IndexSet};
use serde::{Deserialize, Deserializer};
use tracing::trace;

use crate::error::{CompileError, CompileResult};

/// Longest objective name the target accepts.
pub const OBJECTIVE_NAME_LIMIT: usize = 16;

/// Prefix given to subroutines resolved through the `func` argument kind.
pub const SUBROUTINE_PREFIX: &str = "sub_";

#[derive(Clone, Debug, PartialEq, Eq, Deserialize)]
#[serde(untagged)]
pub enum VariableEntry {
    Fixed(String),
    Templated {
        template: String,
        #[serde(deserialize_with = "template_options")]
        options: Vec<Vec<String>>,
    },
}

/// Accepts `["0", "1"]` as shorthand for `[["0"], ["1"]]`.
fn template_options<'de, D>(deserializer: D) -> Result<Vec<Vec<String>>, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum TemplateArgs {
        One(String),
        Many(Vec<String>),
    }

    Ok(Vec::<TemplateArgs>::deserialize(deserializer)?
        .into_iter()
        .map(|args| match args {
            TemplateArgs::One(arg) => vec![arg],
            TemplateArgs::Many(args) => args,
        })
        .collect())
}

impl VariableEntry {
    pub fn fixed(name: impl Into<String>) -> Self {
        VariableEntry::Fixed(name.into())
    }

    pub fn templated<I, O, S>(template: impl Into<String>, options: I) -> Self
    where
        I: IntoIterator<Item = O>,
        O: IntoIterator<Item = S>,
        S: Into<String>,
    {
        VariableEntry::Templated {
            template: template.into(),
            options: options
                .into_iter()
                .map(|args| args.into_iter().map(Into::into).collect())
                .collect(),
        }
    }

    fn fill(&self, name: &str, args: &[&str]) -> CompileResult<String> {
        match self {
            VariableEntry::Fixed(fixed) => {
                if !args.is_empty() {
                    return Err(CompileError::ArityMismatch {
                        what: name.to_string(),
                        expected: "0".into(),
                        received: args.len(),
                    });
                }
                Ok(fixed.clone())
            }
            VariableEntry::Templated { template, .. } => {
                let slots = template.matches("{}").count();
                if slots != args.len() {
                    return Err(CompileError::ArityMismatch {
                        what: name.to_string(),
                        expected: slots.to_string(),
                        received: args.len(),
                    });
                }
                let mut filled = String::with_capacity(template.len());
                let mut rest = template.as_str();
                for arg in args {
                    if let Some(pos) = rest.find("{}") {
                        filled.push_str(&rest[..pos]);
                        filled.push_str(arg);
                        rest = &rest[pos + 2..];
                    }
                }
                filled.push_str(rest);
                Ok(filled)
            }
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ArgKind {
    Tag,
    Arg,
    EntityLocal,
    Func,
}

impl FromStr for ArgKind {
    type Err = CompileError;

    fn from_str(kind: &str) -> Result<Self, Self::Err> {
        match kind {
            "tag" => Ok(ArgKind::Tag),
            "arg" => Ok(ArgKind::Arg),
            "entity_local" => Ok(ArgKind::EntityLocal),
            "func" => Ok(ArgKind::Func),
            other => Err(CompileError::UnknownArgumentKind {
                kind: other.to_string(),
            }),
        }
    }
}

/// Absolute block coordinates.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Deserialize)]
#[serde(from = "[i32; 3]")]
pub struct BlockPos {
    pub x: i32,
    pub y: i32,
    pub z: i32,
}

impl BlockPos {
    pub fn new(x: i32, y: i32, z: i32) -> Self {
        Self { x, y, z }
    }

    pub fn offset(self, dx: i32, dy: i32, dz: i32) -> Self {
        Self::new(self.x + dx, self.y + dy, self.z + dz)
    }
}

impl From<[i32; 3]> for BlockPos {
    fn from([x, y, z]: [i32; 3]) -> Self {
        Self::new(x, y, z)
    }
}

impl fmt::Display for BlockPos {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {} {}", self.x, self.y, self.z)
    }
}

#[derive(Debug, Clone)]
pub struct Scope {
    namespace: String,
    entity_tag: String,
    util_pos: BlockPos,
    variables: IndexMap<String, VariableEntry>,
    mem_locs: IndexSet<u64>,
    tags: IndexMap<String, String>,
    args: HashMap<String, String>,
    func_names: HashSet<String>,
    extern_names: HashSet<String>,
    detect_collisions: bool,
    sealed: bool,
}

impl Scope {
    pub fn new(
        namespace: impl Into<String>,
        tag_name: &str,
        variables: IndexMap<String, VariableEntry>,
        block_pos: BlockPos,
        args: HashMap<String, String>,
        extern_names: impl IntoIterator<Item = String>,
    ) -> Self {
        let namespace = namespace.into();
        let entity_tag = format!("{namespace}_{tag_name}");
        Self {
            entity_tag,
            namespace,
            util_pos: block_pos,
            variables,
            mem_locs: IndexSet::new(),
            tags: IndexMap::new(),
            args,
            func_names: HashSet::new(),
            extern_names: extern_names.into_iter().collect(),
            detect_collisions: false,
            sealed: false,
        }
    }

    /// Makes [`Scope::get_objectives`] reject objectives that trim to the same name.
    pub fn with_collision_detection(mut self, enabled: bool) -> Self {
        self.detect_collisions = enabled;
        self
    }

    pub fn namespace(&self) -> &str {
        &self.namespace
    }

    pub fn entity_tag(&self) -> &str {
        &self.entity_tag
    }

    pub fn util_block(&self) -> String {
        self.util_pos.to_string()
    }

    pub fn util_pos(&self) -> BlockPos {
        self.util_pos
    }

    pub fn custom_nbt_path(&self, path: &str) -> String {
        format!("ArmorItems[0].tag.{path}")
    }

    pub fn is_sealed(&self) -> bool {
        self.sealed
    }

    /// Freezes the allocation tables; only existing names resolve afterwards.
    pub fn seal(&mut self) {
        self.sealed = true;
    }

    fn allocation(&self, what: &str) -> CompileResult<()> {
        if self.sealed {
            return Err(CompileError::phase(format!(
                "cannot allocate {what} after the objective set was enumerated"
            )));
        }
        Ok(())
    }

    pub fn trim(obj_name: &str) -> String {
        match obj_name.char_indices().rev().nth(OBJECTIVE_NAME_LIMIT - 1) {
            Some((start, _)) => obj_name[start..].to_string(),
            None => obj_name.to_string(),
        }
    }

    fn untrimmed_variable(&self, name: &str, args: &[&str]) -> CompileResult<String> {
        let entry = self
            .variables
            .get(name)
            .ok_or_else(|| CompileError::NameNotFound {
                what: "Variable",
                name: name.to_string(),
            })?;
        Ok(format!("{}_{}", self.namespace, entry.fill(name, args)?))
    }

    pub fn variable(&self, name: &str, args: &[&str]) -> CompileResult<String> {
        Ok(Self::trim(&self.untrimmed_variable(name, args)?))
    }

    pub fn add_variable(&mut self, name: impl Into<String>, entry: VariableEntry) -> CompileResult<()> {
        let name = name.into();
        match self.variables.get(&name) {
            Some(existing) if *existing == entry => return Ok(()),
            Some(_) => self.allocation("a variable redefinition")?,
            None => {
                self.allocation("a variable")?;
                trace!(variable = %name, "variable registered");
            }
        }
        self.variables.insert(name, entry);
        Ok(())
    }

    pub fn entity_local(&mut self, name: &str) -> CompileResult<String> {
        if self.extern_names.contains(name) {
            return Ok(name.to_string());
        }
        let local = format!("el_{name}");
        if !self.variables.contains_key(&local) {
            self.add_variable(local.clone(), VariableEntry::Fixed(local.clone()))?;
        }
        self.variable(&local, &[])
    }

    fn memory_name(&self, orig: u64) -> String {
        format!("{}_x{:x}", self.namespace, orig)
    }

    pub fn memory(&mut self, orig: u64) -> CompileResult<String> {
        if !self.mem_locs.contains(&orig) {
            self.allocation("a memory cell")?;
            self.mem_locs.insert(orig);
            trace!(origin = orig, "memory cell allocated");
        }
        Ok(Self::trim(&self.memory_name(orig)))
    }

    pub fn get_mem_locs(&self) -> impl Iterator<Item = u64> + '_ {
        self.mem_locs.iter().copied()
    }

    fn untrimmed_objectives(&self) -> CompileResult<Vec<String>> {
        let mut objectives = Vec::new();
        for (name, entry) in &self.variables {
            match entry {
                VariableEntry::Templated { options, .. } => {
                    for args in options {
                        let args: Vec<&str> = args.iter().map(String::as_str).collect();
                        objectives.push(self.untrimmed_variable(name, &args)?);
                    }
                }
                VariableEntry::Fixed(_) => objectives.push(self.untrimmed_variable(name, &[])?),
            }
        }
        objectives.extend(self.mem_locs.iter().map(|loc| self.memory_name(*loc)));
        Ok(objectives)
    }

    pub fn get_objectives(&self) -> CompileResult<Vec<String>> {
        let untrimmed = self.untrimmed_objectives()?;
        if self.detect_collisions {
            let mut seen: HashMap<String, &str> = HashMap::new();
            for full in &untrimmed {
                let trimmed = Self::trim(full);
                if let Some(first) = seen.get(&trimmed) {
                    if *first != full.as_str() {
                        return Err(CompileError::NameCollision {
                            trimmed,
                            first: first.to_string(),
                            second: full.clone(),
                        });
                    }
                }
                seen.insert(trimmed, full.as_str());
            }
        }
        Ok(untrimmed.iter().map(|name| Self::trim(name)).collect())
    }

    pub fn add_function_names<I, S>(&mut self, names: I)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.func_names.extend(names.into_iter().map(Into::into));
    }

    pub fn has_function(&self, name: &str) -> bool {
        self.func_names.contains(name)
    }

    pub fn function_name(&self, name: &str) -> CompileResult<String> {
        if !self.func_names.contains(name) {
            return Err(CompileError::NameNotFound {
                what: "Function name",
                name: name.to_string(),
            });
        }
        Ok(format!("{}:{}", self.namespace, name))
    }

    pub fn tag(&mut self, val: &str) -> CompileResult<String> {
        if let Some(tag) = self.tags.get(val) {
            return Ok(tag.clone());
        }
        self.allocation("a tag")?;
        let tag = format!("{}_tag_{}", self.namespace, val);
        self.tags.insert(val.to_string(), tag.clone());
        Ok(tag)
    }

    pub fn cmd_arg(&mut self, kind: &str, val: &str) -> CompileResult<String> {
        match kind.parse::<ArgKind>()? {
            ArgKind::Tag => self.tag(val),
            ArgKind::Arg => self
                .args
                .get(val)
                .cloned()
                .ok_or_else(|| CompileError::MissingArgument {
                    name: val.to_string(),
                }),
            ArgKind::EntityLocal => self.entity_local(val),
            ArgKind::Func => self.function_name(&format!("{SUBROUTINE_PREFIX}{val}")),
        }
    }
}
