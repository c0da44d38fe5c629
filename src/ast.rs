//! The parsed program: instruction variants, procedures, and the block
//! contexts that give `#` and `:` their meaning.
//!
//! Instructions hold no back-pointer to their owning frame (see
//! `DESIGN.md`); the executor passes the active frame to each instruction
//! explicitly. Control-flow instructions carry an already-resolved target:
//! an index into the very instruction list they live in.

use crate::span::Span;

/// A name parameter: `None` stands for `_`, the literal blank name.
pub type Name = Option<char>;

/// What `#` and `:` act on. Compare blocks (`?…;`) are transparent to both
/// and so never appear here.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BlockContext {
    Procedure,
    Repeat,
    While,
}

#[derive(Debug, Clone)]
pub enum Instruction {
    PushZero(Span),
    Increment(Span),
    Decrement(Span),
    PopAdd(Span),
    PopSub(Span),
    Assign(Name, Span),
    CreateLocal(Name, Span),
    DeleteVar(Name, Span),
    PushVariable(Name, Span),
    Reverse(Name, Span),
    Output(Name, Span),
    Input(Name, Span),
    Call(Name, Span),
    /// `Y{…}`. Executing this registers `body` under `name` in the
    /// executor's procedure table; it has no other runtime effect.
    DefineProcedure {
        name: char,
        body: Vec<Instruction>,
        span: Span,
    },
    /// `Y[…]`. On execute, reads `name`; if negative, fails; if zero, jumps
    /// to `after`; otherwise seeds the repeat counter for `uid` and falls
    /// into the body starting at `body_start`.
    StartRepeat {
        name: Name,
        uid: u32,
        body_start: usize,
        after: usize,
        span: Span,
    },
    /// Decrements the counter for `uid`; jumps back to `body_start` unless
    /// it has reached zero, in which case it is removed and control falls
    /// through.
    EndRepeat {
        uid: u32,
        body_start: usize,
        span: Span,
    },
    StartWhile(Span),
    /// Unconditionally jumps back to the matching `StartWhile` at `target`.
    EndWhile { target: usize, span: Span },
    /// `?X;`. Jumps to `after` if the top of stack differs from `X`;
    /// otherwise falls through without consuming the stack.
    StartCompare { name: Name, after: usize, span: Span },
    EndCompare(Span),
    /// `#`. `context` names the innermost enclosing Repeat/While, found by
    /// looking through any intervening compare blocks; `Procedure` means no
    /// such block was open and this exits the current frame instead.
    ExitBlock {
        context: BlockContext,
        uid: Option<u32>,
        target: usize,
        span: Span,
    },
    /// `:`. `Procedure` means no enclosing loop was found; executing it is
    /// always a runtime error.
    ContinueBlock {
        context: BlockContext,
        target: usize,
        span: Span,
    },
    /// Synthetic sentinel appended to every instruction list (root and
    /// procedure bodies alike) by the parser.
    EndProcedure(Span),
}

impl Instruction {
    pub fn span(&self) -> &Span {
        match self {
            Instruction::PushZero(s)
            | Instruction::Increment(s)
            | Instruction::Decrement(s)
            | Instruction::PopAdd(s)
            | Instruction::PopSub(s)
            | Instruction::Assign(_, s)
            | Instruction::CreateLocal(_, s)
            | Instruction::DeleteVar(_, s)
            | Instruction::PushVariable(_, s)
            | Instruction::Reverse(_, s)
            | Instruction::Output(_, s)
            | Instruction::Input(_, s)
            | Instruction::Call(_, s)
            | Instruction::DefineProcedure { span: s, .. }
            | Instruction::StartRepeat { span: s, .. }
            | Instruction::EndRepeat { span: s, .. }
            | Instruction::StartWhile(s)
            | Instruction::EndWhile { span: s, .. }
            | Instruction::StartCompare { span: s, .. }
            | Instruction::EndCompare(s)
            | Instruction::ExitBlock { span: s, .. }
            | Instruction::ContinueBlock { span: s, .. }
            | Instruction::EndProcedure(s) => s,
        }
    }

    /// A short opcode-like name, used by `--showstack`.
    pub fn mnemonic(&self) -> &'static str {
        match self {
            Instruction::PushZero(_) => "push-zero",
            Instruction::Increment(_) => "increment",
            Instruction::Decrement(_) => "decrement",
            Instruction::PopAdd(_) => "pop-add",
            Instruction::PopSub(_) => "pop-sub",
            Instruction::Assign(..) => "assign",
            Instruction::CreateLocal(..) => "create-local",
            Instruction::DeleteVar(..) => "delete",
            Instruction::PushVariable(..) => "push-variable",
            Instruction::Reverse(..) => "reverse",
            Instruction::Output(..) => "output",
            Instruction::Input(..) => "input",
            Instruction::Call(..) => "call",
            Instruction::DefineProcedure { .. } => "define-procedure",
            Instruction::StartRepeat { .. } => "start-repeat",
            Instruction::EndRepeat { .. } => "end-repeat",
            Instruction::StartWhile(_) => "start-while",
            Instruction::EndWhile { .. } => "end-while",
            Instruction::StartCompare { .. } => "start-compare",
            Instruction::EndCompare(_) => "end-compare",
            Instruction::ExitBlock { .. } => "exit-block",
            Instruction::ContinueBlock { .. } => "continue-block",
            Instruction::EndProcedure(_) => "end-procedure",
        }
    }
}

/// A procedure body as registered by a `DefineProcedure` instruction: a
/// flat instruction list (ending in a synthetic `EndProcedure`) shared by
/// every call frame invoking it.
#[derive(Debug, Clone)]
pub struct Procedure {
    pub name: char,
    pub body: Vec<Instruction>,
}

/// The output of parsing: the root instruction list plus every procedure
/// body discovered anywhere in the source (including ones nested inside
/// loops), for `--showstack`. The executor does not consult
/// `all_procedures` directly — it only considers a procedure callable once
/// the corresponding `DefineProcedure` instruction has actually executed,
/// matching the source language's runtime-registration semantics.
#[derive(Debug, Clone)]
pub struct Program {
    pub root: Vec<Instruction>,
    pub all_procedures: Vec<Procedure>,
}

impl Program {
    pub fn collect_procedures(instructions: &[Instruction], out: &mut Vec<Procedure>) {
        for instr in instructions {
            if let Instruction::DefineProcedure { name, body, .. } = instr {
                out.push(Procedure {
                    name: *name,
                    body: body.clone(),
                });
                Self::collect_procedures(body, out);
            }
        }
    }
}
