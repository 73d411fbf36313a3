//! Reads single instruction descriptors such as
//! `add_event_condition $0 "stat.foo" 5`.
//!
//! Operands are quoted strings, bare words (both literal strings) or `$N`,
//! which refers to the N-th IR value supplied alongside the text.

use nom::{
    IResult,
    branch::alt,
    bytes::complete::{escaped_transform, is_not, tag},
    character::complete::{alpha1, alphanumeric1, char, digit1, multispace0, multispace1},
    combinator::{all_consuming, map, map_res, opt, recognize, value},
    multi::{many0, many0_count},
    sequence::{delimited, pair, preceded, terminated},
};

use crate::error::{CompileError, CompileResult};
use crate::ir::insn::Instruction;
use crate::ir::program::IrValue;

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum RawOperand {
    Literal(String),
    Ref(usize),
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RawInstruction {
    pub name: String,
    pub operands: Vec<RawOperand>,
}

fn identifier(input: &str) -> IResult<&str, &str> {
    recognize(pair(
        alt((alpha1, tag("_"))),
        many0_count(alt((alphanumeric1, tag("_")))),
    ))(input)
}

fn quoted(input: &str) -> IResult<&str, String> {
    let body = escaped_transform(
        is_not("\\\""),
        '\\',
        alt((
            value("\\", tag("\\")),
            value("\"", tag("\"")),
            value("\n", tag("n")),
        )),
    );
    map(delimited(char('"'), opt(body), char('"')), Option::unwrap_or_default)(input)
}

fn reference(input: &str) -> IResult<&str, usize> {
    preceded(char('$'), map_res(digit1, str::parse::<usize>))(input)
}

fn bare(input: &str) -> IResult<&str, String> {
    map(is_not(" \t\r\n\"$"), str::to_string)(input)
}

fn operand(input: &str) -> IResult<&str, RawOperand> {
    alt((
        map(reference, RawOperand::Ref),
        map(quoted, RawOperand::Literal),
        map(bare, RawOperand::Literal),
    ))(input)
}

fn instruction(input: &str) -> IResult<&str, RawInstruction> {
    map(
        delimited(
            multispace0,
            pair(identifier, many0(preceded(multispace1, operand))),
            multispace0,
        ),
        |(name, operands)| RawInstruction {
            name: name.to_string(),
            operands,
        },
    )(input)
}

pub fn parse_instruction(text: &str) -> CompileResult<RawInstruction> {
    match all_consuming(terminated(instruction, multispace0))(text) {
        Ok((_, raw)) => Ok(raw),
        Err(err) => Err(CompileError::Syntax {
            input: text.to_string(),
            message: match err {
                nom::Err::Error(e) | nom::Err::Failure(e) => {
                    format!("unexpected input at `{}`", e.input)
                }
                nom::Err::Incomplete(_) => "unexpected end of input".to_string(),
            },
        }),
    }
}

/// Parses `text` and builds the instruction it names.
pub fn read_instruction(text: &str, moreargs: &[IrValue]) -> CompileResult<Instruction> {
    let raw = parse_instruction(text)?;
    let operands = raw
        .operands
        .into_iter()
        .map(|operand| match operand {
            RawOperand::Literal(text) => Ok(IrValue::Str(text)),
            RawOperand::Ref(idx) => {
                moreargs
                    .get(idx)
                    .cloned()
                    .ok_or_else(|| CompileError::MissingArgument {
                        name: format!("${idx}"),
                    })
            }
        })
        .collect::<CompileResult<Vec<_>>>()?;
    Instruction::from_operands(&raw.name, &operands)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ir::event::{EventHandle, EventId, EventKind};

    #[test]
    fn parses_mixed_operands() {
        let raw = parse_instruction(r#"  add_event_condition $0 "stat.foo" 5 "#).unwrap();
        assert_eq!(raw.name, "add_event_condition");
        assert_eq!(
            raw.operands,
            vec![
                RawOperand::Ref(0),
                RawOperand::Literal("stat.foo".into()),
                RawOperand::Literal("5".into()),
            ]
        );
    }

    #[test]
    fn quoted_strings_unescape() {
        let raw = parse_instruction(r#"adv_event "say \"hi\"""#).unwrap();
        assert_eq!(raw.operands, vec![RawOperand::Literal("say \"hi\"".into())]);
        let empty = parse_instruction(r#"adv_event """#).unwrap();
        assert_eq!(empty.operands, vec![RawOperand::Literal(String::new())]);
    }

    #[test]
    fn bare_words_keep_namespaces() {
        let raw = parse_instruction("tag_event minecraft:tick").unwrap();
        assert_eq!(raw.operands, vec![RawOperand::Literal("minecraft:tick".into())]);
    }

    #[test]
    fn malformed_text_is_a_syntax_error() {
        assert!(matches!(
            parse_instruction("9lives"),
            Err(CompileError::Syntax { .. })
        ));
        assert!(matches!(
            parse_instruction(r#"adv_event "open"#),
            Err(CompileError::Syntax { .. })
        ));
    }

    #[test]
    fn references_resolve_against_moreargs() {
        let event = EventHandle {
            id: EventId(0),
            kind: EventKind::Advancement,
        };
        let insn = read_instruction(
            "add_event_condition $0 a.b 1",
            &[IrValue::Event(event)],
        )
        .unwrap();
        assert_eq!(insn.name(), "add_event_condition");
        assert!(matches!(
            read_instruction("fire_event $3", &[]),
            Err(CompileError::MissingArgument { .. })
        ));
        assert!(matches!(
            read_instruction("no_such_insn", &[]),
            Err(CompileError::NameNotFound { .. })
        ));
    }
}
