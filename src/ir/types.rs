use std::fmt;
use std::str::FromStr;

use crate::error::{CompileError, CompileResult};
use crate::ir::program::{IrValue, Program, VarHandle};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Operator {
    Assign,
    Add,
    Sub,
    Mul,
    Div,
    Mod,
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
}

impl Operator {
    pub fn symbol(self) -> &'static str {
        match self {
            Operator::Assign => "=",
            Operator::Add => "+",
            Operator::Sub => "-",
            Operator::Mul => "*",
            Operator::Div => "/",
            Operator::Mod => "%",
            Operator::Eq => "==",
            Operator::Ne => "!=",
            Operator::Lt => "<",
            Operator::Le => "<=",
            Operator::Gt => ">",
            Operator::Ge => ">=",
        }
    }
}

impl fmt::Display for Operator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.symbol())
    }
}

impl FromStr for Operator {
    type Err = CompileError;

    fn from_str(op: &str) -> Result<Self, Self::Err> {
        Ok(match op {
            "=" => Operator::Assign,
            "+" => Operator::Add,
            "-" => Operator::Sub,
            "*" => Operator::Mul,
            "/" => Operator::Div,
            "%" => Operator::Mod,
            "==" => Operator::Eq,
            "!=" => Operator::Ne,
            "<" => Operator::Lt,
            "<=" => Operator::Le,
            ">" => Operator::Gt,
            ">=" => Operator::Ge,
            other => {
                return Err(CompileError::UnsupportedOperator {
                    op: other.to_string(),
                    ty: "any".into(),
                });
            }
        })
    }
}

/// A user-defined type backed by `storage_size` scoreboard slots.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct NativeType {
    pub name: String,
    pub storage_size: usize,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Type {
    /// Compiler-only wrapper around an IR variable; takes no storage.
    IrBinding,
    String,
    Native(NativeType),
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum StringPayload {
    Literal(String),
    Dynamic(VarHandle),
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Instance {
    IrBinding { name: String, var: Option<VarHandle> },
    String { payload: Option<StringPayload> },
    /// A string literal appearing directly as an operand.
    LiteralString(String),
    Native { name: String, binding: Option<VarHandle> },
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Value {
    pub ty: Type,
    pub instance: Instance,
}

impl Value {
    pub fn literal(text: impl Into<String>) -> Self {
        Self {
            ty: Type::String,
            instance: Instance::LiteralString(text.into()),
        }
    }

    /// A string whose text is the IR string value bound to `handle`.
    pub fn dynamic_string(program: &Program, handle: VarHandle) -> CompileResult<Self> {
        match program.value(handle)? {
            IrValue::Str(_) => Ok(Self {
                ty: Type::String,
                instance: Instance::String {
                    payload: Some(StringPayload::Dynamic(handle)),
                },
            }),
            other => Err(CompileError::mismatch("string", other.describe())),
        }
    }

    pub fn new(ty: Type, name_hint: &str) -> Self {
        let instance = ty.allocate(name_hint);
        Self { ty, instance }
    }

    pub fn construct(&mut self, program: &mut Program, args: &[Value]) -> CompileResult<()> {
        self.ty.construct(program, &mut self.instance, args)
    }

    pub fn assign(&mut self, right: &Value) -> CompileResult<()> {
        self.ty
            .dispatch_operator(Operator::Assign, &mut self.instance, Some(right))
    }

    pub fn as_ir_variable(&self, program: &Program) -> CompileResult<IrValue> {
        self.ty.as_ir_variable(program, &self.instance)
    }

    fn display_name(&self) -> String {
        match &self.instance {
            Instance::IrBinding { name, .. } | Instance::Native { name, .. } => name.clone(),
            Instance::String { .. } => "string".into(),
            Instance::LiteralString(text) => format!("{text:?}"),
        }
    }
}

impl Type {
    pub fn name(&self) -> &str {
        match self {
            Type::IrBinding => "IRType",
            Type::String => "string",
            Type::Native(native) => &native.name,
        }
    }

    pub fn allocate(&self, name_hint: &str) -> Instance {
        match self {
            Type::IrBinding => Instance::IrBinding {
                name: name_hint.to_string(),
                var: None,
            },
            Type::String => Instance::String { payload: None },
            Type::Native(_) => Instance::Native {
                name: name_hint.to_string(),
                binding: None,
            },
        }
    }

    pub fn effective_storage_size(&self) -> usize {
        match self {
            Type::IrBinding | Type::String => 0,
            Type::Native(native) => native.storage_size,
        }
    }

    pub fn needs_storage(&self) -> bool {
        self.effective_storage_size() > 0
    }

    fn expect_same(&self, value: &Value) -> CompileResult<()> {
        if value.ty != *self {
            return Err(CompileError::mismatch(self.name(), value.ty.name()));
        }
        Ok(())
    }

    fn arity(&self, expected: &str, received: usize) -> CompileError {
        CompileError::ArityMismatch {
            what: format!("{} constructor", self.name()),
            expected: expected.into(),
            received,
        }
    }

    pub fn construct(
        &self,
        program: &mut Program,
        target: &mut Instance,
        args: &[Value],
    ) -> CompileResult<()> {
        match self {
            Type::IrBinding => {
                let Some(first) = args.first() else {
                    return Err(self.arity("at least 1", 0));
                };
                let Instance::IrBinding { name, var } = target else {
                    return Err(CompileError::mismatch(self.name(), "foreign instance"));
                };
                if first.ty == Type::String {
                    let Instance::LiteralString(text) = &first.instance else {
                        return Err(CompileError::mismatch("string literal", "dynamic string"));
                    };
                    let moreargs = args[1..]
                        .iter()
                        .map(|arg| arg.as_ir_variable(program))
                        .collect::<CompileResult<Vec<_>>>()?;
                    *var = Some(program.define_from_text(name, text, &moreargs)?);
                } else {
                    if args.len() != 1 {
                        return Err(self.arity("1", args.len()));
                    }
                    self.expect_same(first)?;
                    *var = Some(bound_var(first)?);
                }
                Ok(())
            }
            Type::String => match args {
                [] => Ok(()),
                [value] => self.dispatch_operator(Operator::Assign, target, Some(value)),
                _ => Err(self.arity("0 or 1", args.len())),
            },
            Type::Native(_) => match args {
                [] => Ok(()),
                [value] => self.dispatch_operator(Operator::Assign, target, Some(value)),
                _ => Err(self.arity("0 or 1", args.len())),
            },
        }
    }

    pub fn dispatch_operator(
        &self,
        op: Operator,
        left: &mut Instance,
        right: Option<&Value>,
    ) -> CompileResult<()> {
        if op != Operator::Assign {
            return Err(CompileError::UnsupportedOperator {
                op: op.to_string(),
                ty: self.name().to_string(),
            });
        }
        let right = right.ok_or_else(|| CompileError::ArityMismatch {
            what: format!("`{op}` on {}", self.name()),
            expected: "2".into(),
            received: 1,
        })?;
        match (self, left) {
            (Type::IrBinding, Instance::IrBinding { var, .. }) => {
                self.expect_same(right)?;
                *var = Some(bound_var(right)?);
                Ok(())
            }
            (Type::String, Instance::String { payload }) => {
                if let Instance::LiteralString(text) = &right.instance {
                    *payload = Some(StringPayload::Literal(text.clone()));
                    return Ok(());
                }
                self.expect_same(right)?;
                match &right.instance {
                    Instance::String {
                        payload: Some(source),
                    } => {
                        *payload = Some(source.clone());
                        Ok(())
                    }
                    _ => Err(CompileError::UnboundValue {
                        name: right.display_name(),
                    }),
                }
            }
            (Type::Native(_), Instance::Native { binding, .. }) => {
                self.expect_same(right)?;
                match &right.instance {
                    Instance::Native {
                        binding: Some(source),
                        ..
                    } => {
                        *binding = Some(*source);
                        Ok(())
                    }
                    _ => Err(CompileError::UnboundValue {
                        name: right.display_name(),
                    }),
                }
            }
            _ => Err(CompileError::mismatch(self.name(), "foreign instance")),
        }
    }

    pub fn as_ir_variable(&self, program: &Program, instance: &Instance) -> CompileResult<IrValue> {
        match instance {
            Instance::IrBinding { var: Some(var), .. } => program.value(*var).cloned(),
            Instance::String {
                payload: Some(StringPayload::Literal(text)),
            }
            | Instance::LiteralString(text) => Ok(IrValue::Str(text.clone())),
            Instance::String {
                payload: Some(StringPayload::Dynamic(var)),
            } => program.value(*var).cloned(),
            Instance::Native {
                binding: Some(var), ..
            } => program.value(*var).cloned(),
            Instance::IrBinding { name, var: None } | Instance::Native { name, binding: None } => {
                Err(CompileError::UnboundValue { name: name.clone() })
            }
            Instance::String { payload: None } => Err(CompileError::UnboundValue {
                name: "string".into(),
            }),
        }
    }
}

fn bound_var(value: &Value) -> CompileResult<VarHandle> {
    match &value.instance {
        Instance::IrBinding { var: Some(var), .. } => Ok(*var),
        _ => Err(CompileError::UnboundValue {
            name: value.display_name(),
        }),
    }
}

/// Scoreboard slots an aggregate of `fields` occupies.
pub fn aggregate_storage_size<'a>(fields: impl IntoIterator<Item = &'a Type>) -> usize {
    fields.into_iter().map(Type::effective_storage_size).sum()
}
