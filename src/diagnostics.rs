use crate::{error::CompileError, ir::Instruction};
use miette::{Diagnostic, Report};
use thiserror::Error;

#[derive(Debug, Error, Diagnostic, Clone)]
#[error("{message}")]
pub struct InsnDiagnostic {
    #[help]
    help: Option<String>,
    message: String,
}

impl InsnDiagnostic {
    pub fn from_error(err: &CompileError) -> Self {
        let help = err.insn().and_then(Instruction::lookup).map(|spec| {
            let mut help = format!("usage: {}", spec.signature());
            for (name, doc) in spec.argnames.iter().zip(spec.argdocs) {
                help.push_str(&format!("\n  {name}: {doc}"));
            }
            help
        });
        Self {
            help,
            message: err.to_string(),
        }
    }

    pub fn help(&self) -> Option<&str> {
        self.help.as_deref()
    }
}

pub fn report_compile_error(error: &CompileError) {
    if error.insn().is_some() {
        eprintln!("{:?}", Report::new(InsnDiagnostic::from_error(error)));
    } else {
        eprintln!("{:?}", Report::new(error.clone()));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn help_lists_instruction_arguments() {
        let err = CompileError::MissingArgument {
            name: "x".into(),
        }
        .in_insn("event_handler");
        let diagnostic = InsnDiagnostic::from_error(&err);
        let help = diagnostic.help().unwrap();
        assert!(help.starts_with("usage: event_handler"));
        assert!(help.contains("\n  handler: "));
    }

    #[test]
    fn plain_errors_have_no_usage() {
        let err = CompileError::phase("closed");
        assert_eq!(InsnDiagnostic::from_error(&err).help(), None);
    }
}
