//! Code generation text helpers
//!
//! Small utilities shared by the source-emitting sinks.

/// Indentation helper
#[derive(Debug, Clone, Copy)]
pub struct Indent {
    level: usize,
    size: usize,
}

impl Indent {
    pub fn new(level: usize, size: usize) -> Self {
        Self { level, size }
    }

    pub fn render(&self) -> String {
        " ".repeat(self.level * self.size)
    }

    pub fn increment(&mut self) {
        self.level += 1;
    }

    pub fn decrement(&mut self) {
        self.level = self.level.saturating_sub(1);
    }
}

impl Default for Indent {
    fn default() -> Self {
        Self { level: 0, size: 4 }
    }
}

/// Line-oriented source builder that tracks indentation across blocks.
#[derive(Debug, Default)]
pub struct SourceWriter {
    out: String,
    indent: Indent,
}

impl SourceWriter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn line(&mut self, text: &str) -> &mut Self {
        if text.is_empty() {
            self.out.push('\n');
        } else {
            self.out.push_str(&self.indent.render());
            self.out.push_str(text);
            self.out.push('\n');
        }
        self
    }

    pub fn blank(&mut self) -> &mut Self {
        self.line("")
    }

    /// Write `header` and indent until the matching [`close`](Self::close).
    pub fn open(&mut self, header: &str) -> &mut Self {
        self.line(header);
        self.indent.increment();
        self
    }

    pub fn close(&mut self, footer: &str) -> &mut Self {
        self.indent.decrement();
        self.line(footer)
    }

    pub fn comment(&mut self, text: &str) -> &mut Self {
        self.line(&comment(text))
    }

    pub fn finish(self) -> String {
        self.out
    }
}

/// Generate comment
pub fn comment(text: &str) -> String {
    format!("// {}", text)
}

/// Quote `text` as a Rust string literal.
pub fn string_literal(text: &str) -> String {
    format!("{:?}", text)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_writer_indents_blocks() {
        let mut w = SourceWriter::new();
        w.comment("header")
            .open("fn f() {")
            .line("let x = 1;")
            .blank()
            .close("}");
        assert_eq!(w.finish(), "// header\nfn f() {\n    let x = 1;\n\n}\n");
    }

    #[test]
    fn test_string_literal_escapes() {
        assert_eq!(string_literal(r#"a"b\c"#), r#""a\"b\\c""#);
        assert_eq!(string_literal("[La.B;"), "\"[La.B;\"");
    }
}
