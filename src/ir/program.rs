use tracing::{debug, instrument, trace};

use crate::error::{CompileError, CompileResult};
use crate::ir::event::EventHandle;
use crate::ir::function::{FuncId, FunctionAttrs};
use crate::ir::insn::{InsnKind, Instruction};
use crate::ir::output::{Artifacts, FunctionArtifact};
use crate::ir::preamble::{Phase, Preamble};
use crate::ir::reader;

/// IR-level variable produced by a constructor instruction.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum IrValue {
    Str(String),
    Event(EventHandle),
    Func(FuncId),
}

impl IrValue {
    pub fn describe(&self) -> &'static str {
        match self {
            IrValue::Str(_) => "string",
            IrValue::Event(handle) if handle.is_tag() => "tag event",
            IrValue::Event(_) => "advancement event",
            IrValue::Func(_) => "function",
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct VarHandle(u32);

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Progress {
    Pending,
    Declared,
    Applied,
    Done,
}

#[derive(Debug)]
struct Statement {
    insn: Instruction,
    progress: Progress,
}

impl Statement {
    fn new(insn: Instruction) -> Self {
        Self {
            insn,
            progress: Progress::Pending,
        }
    }

    fn step(&mut self, from: Progress, to: Progress) -> CompileResult<()> {
        if self.progress != from {
            return Err(CompileError::phase(format!(
                "`{}` is {:?}, expected {:?}",
                self.insn.name(),
                self.progress,
                from
            )));
        }
        self.progress = to;
        Ok(())
    }
}

#[derive(Debug, Default)]
struct FunctionBody {
    preamble: Vec<Statement>,
    body: Vec<Statement>,
}

/// Top-level preamble first, then each function's preamble in creation order.
fn preamble_statements<'a>(
    top: &'a mut [Statement],
    bodies: &'a mut [FunctionBody],
) -> impl Iterator<Item = &'a mut Statement> {
    top.iter_mut()
        .chain(bodies.iter_mut().flat_map(|body| body.preamble.iter_mut()))
}

#[derive(Debug, Default)]
pub struct Program {
    preamble: Preamble,
    values: Vec<(String, IrValue)>,
    top: Vec<Statement>,
    bodies: Vec<FunctionBody>,
}

impl Program {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn preamble(&self) -> &Preamble {
        &self.preamble
    }

    pub fn preamble_mut(&mut self) -> &mut Preamble {
        &mut self.preamble
    }

    pub fn add_function(
        &mut self,
        name: impl Into<String>,
        attrs: FunctionAttrs,
    ) -> CompileResult<FuncId> {
        let id = self.preamble.add_function(name, attrs)?;
        self.bodies.push(FunctionBody::default());
        Ok(id)
    }

    /// Runs a constructor instruction now and records its value under `name`.
    pub fn define(&mut self, name: &str, insn: Instruction) -> CompileResult<VarHandle> {
        if insn.kind() != InsnKind::Constructor {
            return Err(CompileError::mismatch(
                "constructor instruction",
                insn.name(),
            ));
        }
        let value = insn.construct(&mut self.preamble)?;
        trace!(name, insn = insn.name(), "value defined");
        Ok(self.bind(name, value))
    }

    /// Records a value that exists without a constructor, e.g. a literal.
    pub fn bind(&mut self, name: &str, value: IrValue) -> VarHandle {
        let handle = VarHandle(self.values.len() as u32);
        self.values.push((name.to_string(), value));
        handle
    }

    /// Reads `text` as an instruction with `$N` referring to `moreargs` and defines it.
    pub fn define_from_text(
        &mut self,
        name: &str,
        text: &str,
        moreargs: &[IrValue],
    ) -> CompileResult<VarHandle> {
        let insn = reader::read_instruction(text, moreargs)?;
        self.define(name, insn)
    }

    pub fn value(&self, handle: VarHandle) -> CompileResult<&IrValue> {
        self.values
            .get(handle.0 as usize)
            .map(|(_, value)| value)
            .ok_or_else(|| CompileError::UnboundValue {
                name: format!("${}", handle.0),
            })
    }

    pub fn value_name(&self, handle: VarHandle) -> Option<&str> {
        self.values.get(handle.0 as usize).map(|(name, _)| name.as_str())
    }

    pub fn event(&self, handle: VarHandle) -> CompileResult<EventHandle> {
        match self.value(handle)? {
            IrValue::Event(event) => Ok(*event),
            other => Err(CompileError::mismatch("event", other.describe())),
        }
    }

    fn check_open(&self, insn: &Instruction) -> CompileResult<()> {
        if self.preamble.phase() != Phase::Define {
            return Err(CompileError::phase("the program has already been compiled")
                .in_insn(insn.name()));
        }
        if insn.kind() == InsnKind::Constructor {
            return Err(CompileError::phase(
                "constructors run when they are defined, not as statements",
            )
            .in_insn(insn.name()));
        }
        Ok(())
    }

    fn body_mut(&mut self, func: FuncId) -> CompileResult<&mut FunctionBody> {
        self.bodies
            .get_mut(func.index())
            .ok_or_else(|| CompileError::NameNotFound {
                what: "Function",
                name: format!("#{}", func.index()),
            })
    }

    /// Adds a preamble instruction to the outermost compilation unit.
    pub fn push_top(&mut self, insn: Instruction) -> CompileResult<()> {
        self.check_open(&insn)?;
        if insn.kind() != InsnKind::PreambleContributor {
            return Err(CompileError::ScopeViolation {
                insn: insn.name().into(),
                message: "only preamble instructions can appear at the top level".into(),
            });
        }
        self.top.push(Statement::new(insn));
        Ok(())
    }

    pub fn push_preamble(&mut self, func: FuncId, insn: Instruction) -> CompileResult<()> {
        self.check_open(&insn)?;
        let spec = insn.spec();
        if spec.kind != InsnKind::PreambleContributor {
            return Err(CompileError::ScopeViolation {
                insn: spec.name.into(),
                message: "not a preamble instruction".into(),
            });
        }
        if spec.top_preamble_only {
            return Err(CompileError::ScopeViolation {
                insn: spec.name.into(),
                message: "only allowed in the top-level preamble".into(),
            });
        }
        self.body_mut(func)?.preamble.push(Statement::new(insn));
        Ok(())
    }

    pub fn push_body(&mut self, func: FuncId, insn: Instruction) -> CompileResult<()> {
        self.check_open(&insn)?;
        if insn.kind() != InsnKind::DirectEmitter {
            return Err(CompileError::ScopeViolation {
                insn: insn.name().into(),
                message: "preamble instructions cannot appear in a function body".into(),
            });
        }
        self.body_mut(func)?.body.push(Statement::new(insn));
        Ok(())
    }

    /// Runs declare, preapply, postapply and emission in that order.
    ///
    /// Nothing is returned unless every phase succeeds.
    #[instrument(skip_all)]
    pub fn compile(&mut self) -> CompileResult<Artifacts> {
        if self.preamble.phase() != Phase::Define {
            return Err(CompileError::phase("the program has already been compiled"));
        }

        self.preamble.advance(Phase::Declare)?;
        debug!(statements = self.top.len(), "declare");
        for stmt in preamble_statements(&mut self.top, &mut self.bodies) {
            stmt.step(Progress::Pending, Progress::Declared)?;
            stmt.insn.declare(&mut self.preamble)?;
        }

        self.preamble.advance(Phase::Apply)?;
        debug!("preapply");
        for stmt in preamble_statements(&mut self.top, &mut self.bodies) {
            stmt.step(Progress::Declared, Progress::Applied)?;
            trace!(insn = stmt.insn.name(), "preapply");
            stmt.insn.preapply(&mut self.preamble)?;
        }

        self.preamble.advance(Phase::Closed)?;
        debug!("postapply");
        let mut artifacts = Artifacts::default();
        for stmt in &mut self.top {
            stmt.step(Progress::Applied, Progress::Done)?;
            stmt.insn.postapply(&self.preamble, &mut artifacts, true)?;
        }
        for body in &mut self.bodies {
            for stmt in &mut body.preamble {
                stmt.step(Progress::Applied, Progress::Done)?;
                stmt.insn.postapply(&self.preamble, &mut artifacts, false)?;
            }
        }

        for ((_, func), body) in self.preamble.functions().zip(&mut self.bodies) {
            if !func.is_emitted() {
                trace!(function = func.global_name(), "dropped");
                continue;
            }
            let mut commands = Vec::with_capacity(body.body.len());
            for stmt in &mut body.body {
                stmt.step(Progress::Pending, Progress::Done)?;
                commands.push(stmt.insn.get_command(&self.preamble, func)?);
            }
            artifacts.functions.push(FunctionArtifact {
                name: func.global_name().to_string(),
                commands,
            });
        }
        debug!(
            functions = artifacts.functions.len(),
            records = artifacts.records.len(),
            "emitted"
        );
        Ok(artifacts)
    }
}
