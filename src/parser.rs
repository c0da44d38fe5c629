//! Single-pass parser.
//!
//! The source is first reduced to a stream of "meaningful" characters —
//! whitespace and `/…` comments are dropped during scanning, so the parser
//! proper never sees them and adjacency rules (e.g. "a letter must precede
//! `{`") read the same whether or not a comment or blank separated the two
//! symbols in the original text, matching the source language.
//!
//! Forward jump targets (`[`, `(`, `?`) are resolved by backpatching: the
//! opener is emitted with a placeholder target, and the index of every
//! instruction still waiting on that target is recorded on the open
//! block's fixup lists; when the matching closer is reached, its own index
//! and the index just past it are both known, and every pending
//! placeholder is patched in place. The whole source is scanned exactly
//! once; no jump target is left unresolved once the scan completes.

use crate::ast::{BlockContext, Instruction, Name, Program};
use crate::error::{ParseError, ParseErrorKind};
use crate::span::Span;

fn is_symbol_char(c: char) -> bool {
    c.is_ascii_alphabetic() || "_{}[]()?;@=!&$%<>^+-*~#:/".contains(c)
}

struct MeaningfulChar {
    ch: char,
    line: usize,
    col: usize,
}

fn scan(source: &str) -> Result<(Vec<MeaningfulChar>, Vec<String>), ParseError> {
    let lines: Vec<String> = source.lines().map(str::to_string).collect();
    let mut out = Vec::new();
    for (line_idx, line) in lines.iter().enumerate() {
        let mut in_comment = false;
        for (col, ch) in line.chars().enumerate() {
            if in_comment {
                continue;
            }
            if ch == '/' {
                in_comment = true;
                continue;
            }
            if ch == ' ' || ch == '\t' {
                continue;
            }
            if !is_symbol_char(ch) {
                return Err(ParseError::new(
                    Span::new(line_idx + 1, col, line.clone()),
                    ParseErrorKind::UnknownSymbol(ch),
                ));
            }
            out.push(MeaningfulChar {
                ch,
                line: line_idx + 1,
                col,
            });
        }
    }
    Ok((out, lines))
}

enum OpenKind {
    Repeat { uid: u32 },
    While,
    Compare,
}

struct OpenBlock {
    kind: OpenKind,
    open_index: usize,
    span: Span,
    /// Indices of instructions whose jump target becomes "the index right
    /// after the closer" once this block closes.
    after_fixups: Vec<usize>,
    /// Indices of instructions (always `ContinueBlock` in a repeat) whose
    /// jump target becomes "the index of the closer itself".
    closer_fixups: Vec<usize>,
}

impl OpenBlock {
    fn opener_char(&self) -> char {
        match self.kind {
            OpenKind::Repeat { .. } => '[',
            OpenKind::While => '(',
            OpenKind::Compare => '?',
        }
    }

    fn closer_char(&self) -> char {
        match self.kind {
            OpenKind::Repeat { .. } => ']',
            OpenKind::While => ')',
            OpenKind::Compare => ';',
        }
    }
}

fn patch_after(instrs: &mut [Instruction], idx: usize, value: usize) {
    match &mut instrs[idx] {
        Instruction::StartRepeat { after, .. } => *after = value,
        Instruction::StartCompare { after, .. } => *after = value,
        Instruction::ExitBlock { target, .. } => *target = value,
        other => unreachable!("instruction {:?} is not a forward-jump fixup site", other),
    }
}

fn patch_closer(instrs: &mut [Instruction], idx: usize, value: usize) {
    match &mut instrs[idx] {
        Instruction::ContinueBlock { target, .. } => *target = value,
        other => unreachable!("instruction {:?} is not a closer fixup site", other),
    }
}

pub struct Parser {
    chars: Vec<MeaningfulChar>,
    lines: Vec<String>,
    pos: usize,
    next_uid: u32,
}

impl Parser {
    pub fn parse(source: &str) -> Result<Program, ParseError> {
        let (chars, lines) = scan(source)?;
        let mut parser = Parser {
            chars,
            lines,
            pos: 0,
            next_uid: 0,
        };
        let mut root = parser.parse_scope(None)?;
        let eof_span = parser.eof_span();
        root.push(Instruction::EndProcedure(eof_span));
        let mut all_procedures = Vec::new();
        Program::collect_procedures(&root, &mut all_procedures);
        Ok(Program { root, all_procedures })
    }

    fn fresh_uid(&mut self) -> u32 {
        let uid = self.next_uid;
        self.next_uid += 1;
        uid
    }

    fn line_text(&self, line: usize) -> String {
        self.lines.get(line - 1).cloned().unwrap_or_default()
    }

    fn peek(&self) -> Option<(char, usize, usize)> {
        self.chars.get(self.pos).map(|c| (c.ch, c.line, c.col))
    }

    fn advance(&mut self) -> Option<(char, usize, usize)> {
        let c = self.peek();
        if c.is_some() {
            self.pos += 1;
        }
        c
    }

    fn span_at(&self, line: usize, col: usize) -> Span {
        Span::new(line, col, self.line_text(line))
    }

    fn eof_span(&self) -> Span {
        match self.lines.last() {
            Some(last) => Span::new(self.lines.len(), last.chars().count(), last.clone()),
            None => Span::new(1, 0, String::new()),
        }
    }

    /// Consumes the name parameter following `op` (itself already consumed,
    /// at `op_span`): a letter, or `_` for "no name".
    fn read_name(&mut self, op: char, op_span: &Span) -> Result<Name, ParseError> {
        match self.advance() {
            None => Err(ParseError::new(
                op_span.clone(),
                ParseErrorKind::MissingNameAtEof { op },
            )),
            Some((c, line, col)) if c == '_' => {
                let _ = (line, col);
                Ok(None)
            }
            Some((c, _, _)) if c.is_ascii_alphabetic() => Ok(Some(c)),
            Some((found, line, col)) => Err(ParseError::new(
                self.span_at(line, col),
                ParseErrorKind::MissingNameAfter { op, found },
            )),
        }
    }

    fn make_param_instruction(op: char, name: Name, span: Span) -> Instruction {
        match op {
            '=' => Instruction::Assign(name, span),
            '&' => Instruction::CreateLocal(name, span),
            '!' => Instruction::DeleteVar(name, span),
            '$' => Instruction::PushVariable(name, span),
            '%' => Instruction::Reverse(name, span),
            '<' => Instruction::Output(name, span),
            '>' => Instruction::Input(name, span),
            '@' => Instruction::Call(name, span),
            _ => unreachable!("'{op}' is not a name-parameter opcode"),
        }
    }

    /// Finds the innermost open Repeat/While, skipping over any Compare
    /// frames (compare blocks are transparent to `#` and `:`).
    fn find_loop_context(open_blocks: &[OpenBlock]) -> Option<usize> {
        open_blocks
            .iter()
            .enumerate()
            .rev()
            .find(|(_, ob)| !matches!(ob.kind, OpenKind::Compare))
            .map(|(i, _)| i)
    }

    /// Parses one instruction-list scope: the root (when `closing` is
    /// `None`, terminated by end of input) or a procedure body (terminated
    /// by a matching `}`, whose opener span is `closing` — used to report
    /// an unclosed definition).
    fn parse_scope(&mut self, closing: Option<(char, Span)>) -> Result<Vec<Instruction>, ParseError> {
        let mut instrs: Vec<Instruction> = Vec::new();
        let mut open_blocks: Vec<OpenBlock> = Vec::new();

        loop {
            let Some((c, line, col)) = self.peek() else {
                if let Some(ob) = open_blocks.last() {
                    return Err(ParseError::new(
                        ob.span.clone(),
                        ParseErrorKind::UnbalancedOpener {
                            opener: ob.opener_char(),
                        },
                    ));
                }
                if let Some((opener, opener_span)) = closing {
                    return Err(ParseError::new(
                        opener_span,
                        ParseErrorKind::UnbalancedOpener { opener },
                    ));
                }
                return Ok(instrs);
            };
            let span = self.span_at(line, col);

            match c {
                '}' => {
                    if closing.is_none() {
                        return Err(ParseError::new(span, ParseErrorKind::UnmatchedCloser('}')));
                    }
                    if let Some(ob) = open_blocks.last() {
                        return Err(ParseError::new(
                            span,
                            ParseErrorKind::SpuriousCloser {
                                found: '}',
                                expected: ob.closer_char(),
                                opener: ob.opener_char(),
                            },
                        ));
                    }
                    self.advance();
                    return Ok(instrs);
                }
                '^' => {
                    self.advance();
                    instrs.push(Instruction::PushZero(span));
                }
                '+' => {
                    self.advance();
                    instrs.push(Instruction::Increment(span));
                }
                '-' => {
                    self.advance();
                    instrs.push(Instruction::Decrement(span));
                }
                '*' => {
                    self.advance();
                    instrs.push(Instruction::PopAdd(span));
                }
                '~' => {
                    self.advance();
                    instrs.push(Instruction::PopSub(span));
                }
                '=' | '!' | '&' | '$' | '%' | '<' | '>' | '@' => {
                    self.advance();
                    let name = self.read_name(c, &span)?;
                    instrs.push(Self::make_param_instruction(c, name, span));
                }
                '#' => {
                    self.advance();
                    match Self::find_loop_context(&open_blocks) {
                        None => instrs.push(Instruction::ExitBlock {
                            context: BlockContext::Procedure,
                            uid: None,
                            target: usize::MAX,
                            span,
                        }),
                        Some(i) => {
                            let cur_index = instrs.len();
                            let (context, uid) = match open_blocks[i].kind {
                                OpenKind::Repeat { uid } => (BlockContext::Repeat, Some(uid)),
                                OpenKind::While => (BlockContext::While, None),
                                OpenKind::Compare => unreachable!(),
                            };
                            instrs.push(Instruction::ExitBlock {
                                context,
                                uid,
                                target: 0,
                                span,
                            });
                            open_blocks[i].after_fixups.push(cur_index);
                        }
                    }
                }
                ':' => {
                    self.advance();
                    match Self::find_loop_context(&open_blocks) {
                        None => instrs.push(Instruction::ContinueBlock {
                            context: BlockContext::Procedure,
                            target: usize::MAX,
                            span,
                        }),
                        Some(i) => {
                            let cur_index = instrs.len();
                            match open_blocks[i].kind {
                                OpenKind::Repeat { .. } => {
                                    instrs.push(Instruction::ContinueBlock {
                                        context: BlockContext::Repeat,
                                        target: 0,
                                        span,
                                    });
                                    open_blocks[i].closer_fixups.push(cur_index);
                                }
                                OpenKind::While => {
                                    let target = open_blocks[i].open_index;
                                    instrs.push(Instruction::ContinueBlock {
                                        context: BlockContext::While,
                                        target,
                                        span,
                                    });
                                }
                                OpenKind::Compare => unreachable!(),
                            }
                        }
                    }
                }
                '(' => {
                    self.advance();
                    let open_index = instrs.len();
                    instrs.push(Instruction::StartWhile(span.clone()));
                    open_blocks.push(OpenBlock {
                        kind: OpenKind::While,
                        open_index,
                        span,
                        after_fixups: Vec::new(),
                        closer_fixups: Vec::new(),
                    });
                }
                ')' => {
                    self.advance();
                    match open_blocks.pop() {
                        Some(ob) if matches!(ob.kind, OpenKind::While) => {
                            instrs.push(Instruction::EndWhile {
                                target: ob.open_index,
                                span,
                            });
                            let after_index = instrs.len();
                            for idx in &ob.after_fixups {
                                patch_after(&mut instrs, *idx, after_index);
                            }
                        }
                        Some(ob) => {
                            return Err(ParseError::new(
                                span,
                                ParseErrorKind::SpuriousCloser {
                                    found: ')',
                                    expected: ob.closer_char(),
                                    opener: ob.opener_char(),
                                },
                            ));
                        }
                        None => {
                            return Err(ParseError::new(span, ParseErrorKind::UnmatchedCloser(')')));
                        }
                    }
                }
                ']' => {
                    self.advance();
                    match open_blocks.pop() {
                        Some(ob) if matches!(ob.kind, OpenKind::Repeat { .. }) => {
                            let uid = match ob.kind {
                                OpenKind::Repeat { uid } => uid,
                                _ => unreachable!(),
                            };
                            let closer_index = instrs.len();
                            instrs.push(Instruction::EndRepeat {
                                uid,
                                body_start: ob.open_index + 1,
                                span,
                            });
                            let after_index = instrs.len();
                            for idx in &ob.after_fixups {
                                patch_after(&mut instrs, *idx, after_index);
                            }
                            for idx in &ob.closer_fixups {
                                patch_closer(&mut instrs, *idx, closer_index);
                            }
                        }
                        Some(ob) => {
                            return Err(ParseError::new(
                                span,
                                ParseErrorKind::SpuriousCloser {
                                    found: ']',
                                    expected: ob.closer_char(),
                                    opener: ob.opener_char(),
                                },
                            ));
                        }
                        None => {
                            return Err(ParseError::new(span, ParseErrorKind::UnmatchedCloser(']')));
                        }
                    }
                }
                '?' => {
                    self.advance();
                    let name = self.read_name('?', &span)?;
                    let open_index = instrs.len();
                    instrs.push(Instruction::StartCompare {
                        name,
                        after: 0,
                        span: span.clone(),
                    });
                    open_blocks.push(OpenBlock {
                        kind: OpenKind::Compare,
                        open_index,
                        span,
                        after_fixups: vec![open_index],
                        closer_fixups: Vec::new(),
                    });
                }
                ';' => {
                    self.advance();
                    match open_blocks.pop() {
                        Some(ob) if matches!(ob.kind, OpenKind::Compare) => {
                            instrs.push(Instruction::EndCompare(span));
                            let after_index = instrs.len();
                            for idx in &ob.after_fixups {
                                patch_after(&mut instrs, *idx, after_index);
                            }
                        }
                        Some(ob) => {
                            return Err(ParseError::new(
                                span,
                                ParseErrorKind::SpuriousCloser {
                                    found: ';',
                                    expected: ob.closer_char(),
                                    opener: ob.opener_char(),
                                },
                            ));
                        }
                        None => {
                            return Err(ParseError::new(span, ParseErrorKind::UnmatchedCloser(';')));
                        }
                    }
                }
                '{' => {
                    return Err(ParseError::new(
                        span,
                        ParseErrorKind::MissingNameBefore {
                            opener: '{',
                            found: c,
                        },
                    ));
                }
                '[' => {
                    return Err(ParseError::new(
                        span,
                        ParseErrorKind::MissingNameBefore {
                            opener: '[',
                            found: c,
                        },
                    ));
                }
                letter if letter.is_ascii_alphabetic() => {
                    self.advance();
                    match self.peek() {
                        Some(('{', bline, bcol)) => {
                            self.advance();
                            let brace_span = self.span_at(bline, bcol);
                            let mut body = self.parse_scope(Some(('{', brace_span)))?;
                            body.push(Instruction::EndProcedure(span.clone()));
                            instrs.push(Instruction::DefineProcedure {
                                name: letter,
                                body,
                                span,
                            });
                        }
                        Some(('[', _, _)) => {
                            self.advance();
                            let uid = self.fresh_uid();
                            let open_index = instrs.len();
                            instrs.push(Instruction::StartRepeat {
                                name: Some(letter),
                                uid,
                                body_start: open_index + 1,
                                after: 0,
                                span: span.clone(),
                            });
                            open_blocks.push(OpenBlock {
                                kind: OpenKind::Repeat { uid },
                                open_index,
                                span,
                                after_fixups: vec![open_index],
                                closer_fixups: Vec::new(),
                            });
                        }
                        _ => {
                            return Err(ParseError::new(
                                span,
                                ParseErrorKind::StrayNameChar { ch: letter },
                            ));
                        }
                    }
                }
                '_' => {
                    return Err(ParseError::new(span, ParseErrorKind::StrayNameChar { ch: '_' }));
                }
                other => {
                    return Err(ParseError::new(span, ParseErrorKind::UnknownSymbol(other)));
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::Instruction::*;

    fn parse_ok(src: &str) -> Program {
        Parser::parse(src).unwrap_or_else(|e| panic!("parse failed: {e}"))
    }

    #[test]
    fn simple_arithmetic_parses() {
        let program = parse_ok("^+++ ^++ ~");
        assert!(matches!(program.root[0], PushZero(_)));
        assert!(matches!(program.root.last().unwrap(), EndProcedure(_)));
    }

    #[test]
    fn name_parameter_consumed() {
        let program = parse_ok("=x");
        assert!(matches!(&program.root[0], Assign(Some('x'), _)));
    }

    #[test]
    fn blank_name_parses() {
        let program = parse_ok("=_");
        assert!(matches!(&program.root[0], Assign(None, _)));
    }

    #[test]
    fn repeat_block_jump_targets_resolved() {
        let program = parse_ok("^ +++ =n ^ n[+]");
        let start_idx = program
            .root
            .iter()
            .position(|i| matches!(i, StartRepeat { .. }))
            .unwrap();
        match &program.root[start_idx] {
            StartRepeat {
                body_start, after, ..
            } => {
                assert_eq!(*body_start, start_idx + 1);
                assert!(*after > start_idx);
            }
            _ => unreachable!(),
        }
    }

    #[test]
    fn while_block_jump_targets_resolved() {
        let program = parse_ok("^ ( + # )");
        let start_idx = program
            .root
            .iter()
            .position(|i| matches!(i, StartWhile(_)))
            .unwrap();
        let end_idx = program
            .root
            .iter()
            .position(|i| matches!(i, EndWhile { .. }))
            .unwrap();
        match &program.root[end_idx] {
            EndWhile { target, .. } => assert_eq!(*target, start_idx),
            _ => unreachable!(),
        }
        match &program.root[start_idx + 2] {
            ExitBlock { target, context, .. } => {
                assert_eq!(*context, BlockContext::While);
                assert_eq!(*target, end_idx + 1);
            }
            _ => unreachable!(),
        }
    }

    #[test]
    fn compare_block_parses() {
        let program = parse_ok("^ =a ^ ?a + ;");
        assert!(program.root.iter().any(|i| matches!(i, StartCompare { .. })));
        assert!(program.root.iter().any(|i| matches!(i, EndCompare(_))));
    }

    #[test]
    fn procedure_definition_registers_body() {
        let program = parse_ok("F{ &x $x =y }  ^ =y @F");
        assert_eq!(program.all_procedures.len(), 1);
        assert_eq!(program.all_procedures[0].name, 'F');
        assert!(matches!(
            program.all_procedures[0].body.last().unwrap(),
            EndProcedure(_)
        ));
    }

    #[test]
    fn nested_procedure_inside_repeat_counts_as_one_slot() {
        let program = parse_ok("n[F{+}]");
        let start_idx = program
            .root
            .iter()
            .position(|i| matches!(i, StartRepeat { .. }))
            .unwrap();
        match &program.root[start_idx] {
            StartRepeat { body_start, .. } => {
                assert!(matches!(program.root[*body_start], DefineProcedure { .. }));
            }
            _ => unreachable!(),
        }
    }

    #[test]
    fn unknown_symbol_is_rejected() {
        let err = Parser::parse("^ ,").unwrap_err();
        assert!(matches!(err.kind, ParseErrorKind::UnknownSymbol(',')));
    }

    #[test]
    fn unbalanced_opener_reports_opener_position() {
        let err = Parser::parse("^ [ +").unwrap_err();
        assert!(matches!(
            err.kind,
            ParseErrorKind::UnbalancedOpener { opener: '[' }
        ));
    }

    #[test]
    fn mismatched_closer_names_both_symbols() {
        let err = Parser::parse("n[ + )").unwrap_err();
        match err.kind {
            ParseErrorKind::SpuriousCloser {
                found, expected, opener, ..
            } => {
                assert_eq!(found, ')');
                assert_eq!(expected, ']');
                assert_eq!(opener, '[');
            }
            other => panic!("unexpected error kind: {other:?}"),
        }
    }

    #[test]
    fn letter_outside_name_position_is_rejected() {
        let err = Parser::parse("^ x +").unwrap_err();
        assert!(matches!(err.kind, ParseErrorKind::StrayNameChar { ch: 'x' }));
    }

    #[test]
    fn comments_are_ignored() {
        let program = parse_ok("^ / this is a comment\n+");
        assert!(matches!(program.root[0], PushZero(_)));
        assert!(matches!(program.root[1], Increment(_)));
    }
}
