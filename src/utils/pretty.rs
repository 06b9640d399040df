//! Pretty printing utilities for the scan AST and the IR.

use pretty::{BoxAllocator, DocAllocator, DocBuilder};
use std::fmt;

/// Default line width for pretty printing.
pub const DEFAULT_WIDTH: usize = 80;

/// A pretty-printable value.
pub trait PrettyPrint {
    /// Convert to a pretty document.
    fn to_doc<'a, D: DocAllocator<'a>>(&self, allocator: &'a D) -> DocBuilder<'a, D>;

    /// Render into `out` with the given line width.
    fn render<W: fmt::Write + ?Sized>(&self, width: usize, out: &mut W) -> fmt::Result {
        let allocator = BoxAllocator;
        let result = self.to_doc(&allocator).render_fmt(width, out);
        result
    }

    /// Pretty print to a string with the given width.
    fn pretty_print(&self, width: usize) -> Result<String, fmt::Error> {
        let mut output = String::new();
        self.render(width, &mut output)?;
        Ok(output)
    }
}

/// Line-oriented formatter with indentation, used by the scan AST dump.
#[derive(Debug)]
pub struct CodeFormatter {
    output: String,
    indent_level: usize,
    indent_str: String,
    at_line_start: bool,
}

impl CodeFormatter {
    /// Create a new formatter with the given indent string.
    pub fn new(indent_str: &str) -> Self {
        Self {
            output: String::new(),
            indent_level: 0,
            indent_str: indent_str.to_string(),
            at_line_start: true,
        }
    }

    /// Create a formatter indenting by two spaces.
    pub fn default_indent() -> Self {
        Self::new("  ")
    }

    pub fn indent(&mut self) {
        self.indent_level += 1;
    }

    pub fn dedent(&mut self) {
        self.indent_level = self.indent_level.saturating_sub(1);
    }

    /// Write text, indenting at the start of every line.
    pub fn write(&mut self, s: &str) {
        for c in s.chars() {
            if c == '\n' {
                self.output.push('\n');
                self.at_line_start = true;
                continue;
            }
            if self.at_line_start {
                for _ in 0..self.indent_level {
                    self.output.push_str(&self.indent_str);
                }
                self.at_line_start = false;
            }
            self.output.push(c);
        }
    }

    pub fn writeln(&mut self, s: &str) {
        self.write(s);
        self.write("\n");
    }

    /// Get the formatted output.
    pub fn finish(self) -> String {
        self.output
    }

    pub fn output(&self) -> &str {
        &self.output
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_indents_nested_lines() {
        let mut fmt = CodeFormatter::default_indent();
        fmt.writeln("for (c1 = 0; c1 <= N - 1; c1++) {");
        fmt.indent();
        fmt.write("S0(c1);\n");
        fmt.dedent();
        fmt.writeln("}");
        let output = fmt.finish();
        assert_eq!(output, "for (c1 = 0; c1 <= N - 1; c1++) {\n  S0(c1);\n}\n");
    }

    #[test]
    fn test_dedent_saturates() {
        let mut fmt = CodeFormatter::new("    ");
        fmt.dedent();
        fmt.writeln("x");
        assert_eq!(fmt.output(), "x\n");
    }
}
