//! `--debug` support: a [`vm::StepObserver`] that renders the current
//! source line and pauses for a keypress before every instruction.
//!
//! The original interpreter clears the screen and highlights the active
//! character with an ANSI background color; per spec §1 the screen-clear
//! and colorized terminal handling are out of scope, so this renders a
//! plain window (the current source line, with a caret under the active
//! column) instead.

use std::io::{self, Read, Write};

use crate::ast::Instruction;
use crate::vm::{StepObserver, Vm};

/// Renders to `out`, blocking on one byte from `keys` between steps. Tests
/// inject an in-memory `keys` source so they don't block on a real
/// terminal; the CLI passes real stdin.
pub struct ConsoleDebugger<'a> {
    out: &'a mut dyn Write,
    keys: &'a mut dyn Read,
}

impl<'a> ConsoleDebugger<'a> {
    pub fn new(out: &'a mut dyn Write, keys: &'a mut dyn Read) -> Self {
        ConsoleDebugger { out, keys }
    }

    fn render(&mut self, vm: &Vm, instr: &Instruction, call_depth: usize) -> io::Result<()> {
        let span = instr.span();
        writeln!(
            self.out,
            "[debug] line {}, column {}, depth {}",
            span.line, span.column, call_depth
        )?;
        let marker: String = (0..span.column).map(|_| ' ').collect();
        writeln!(self.out, "  {:>4} | {}", span.line, span.line_text)?;
        writeln!(self.out, "         {}^", marker)?;
        writeln!(self.out, "[debug] next: {}", instr.mnemonic())?;
        writeln!(self.out, "[debug] stack ({}): {:?}", vm.stack.len(), vm.stack)?;
        let mut procs: Vec<char> = vm.registered_procedures().collect();
        procs.sort_unstable();
        writeln!(self.out, "[debug] procedures defined so far: {:?}", procs)?;
        writeln!(self.out, "[debug] press any key to continue...")?;
        self.out.flush()
    }

    fn wait_for_key(&mut self) {
        let mut buf = [0u8; 1];
        let _ = self.keys.read(&mut buf);
    }
}

impl<'a> StepObserver for ConsoleDebugger<'a> {
    fn before_step(&mut self, vm: &Vm, instr: &Instruction, call_depth: usize) {
        // A rendering failure (e.g. a closed pipe) shouldn't take down the
        // interpreter; the worst case is a silently skipped debug frame.
        let _ = self.render(vm, instr, call_depth);
        self.wait_for_key();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::Parser;
    use crate::vm::BufferedInput;

    #[test]
    fn debugger_renders_every_step_and_runs_to_completion() {
        let program = Parser::parse("^+++ ^++ ~").unwrap();
        let mut vm = Vm::new();
        let mut input = BufferedInput::new("");
        let mut rendered: Vec<u8> = Vec::new();
        let mut out_sink: Vec<u8> = Vec::new();
        let mut keys = io::repeat(b' ').take(1024);
        let mut debugger = ConsoleDebugger::new(&mut rendered, &mut keys);
        vm.run_observed(&program, &mut input, &mut out_sink, &mut debugger)
            .expect("run failed");
        assert!(!rendered.is_empty());
        let text = String::from_utf8(rendered).unwrap();
        assert!(text.contains("[debug]"));
        assert!(text.contains("press any key"));
    }
}
