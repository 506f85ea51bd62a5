use std::fmt;
use std::rc::Rc;

/// Location of a piece of source text, used in stack traces.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SourceExtent {
    pub file: Rc<str>,
    pub line: u32,
    pub column: u32,
}

impl SourceExtent {
    pub fn new(file: Rc<str>, line: u32, column: u32) -> Self {
        Self { file, line, column }
    }
}

impl fmt::Display for SourceExtent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}:{}", self.file, self.line, self.column)
    }
}

/// The single runtime error type. The error kind (ReferenceError, TypeError,
/// RangeError, ...) is carried in the message, not as a distinct type. The
/// stack holds the source extents of the call sites active when the error
/// was raised, innermost first.
#[derive(Clone, Debug, thiserror::Error)]
#[error("{message}")]
pub struct RuntimeError {
    pub message: String,
    pub stack: Vec<SourceExtent>,
}

impl RuntimeError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            stack: Vec::new(),
        }
    }

    pub fn reference_error(message: impl fmt::Display) -> Self {
        Self::new(format!("ReferenceError: {message}"))
    }

    pub fn type_error(message: impl fmt::Display) -> Self {
        Self::new(format!("TypeError: {message}"))
    }

    pub fn range_error(message: impl fmt::Display) -> Self {
        Self::new(format!("RangeError: {message}"))
    }

    pub fn not_implemented(what: impl fmt::Display) -> Self {
        Self::new(format!("not implemented: {what}"))
    }

    pub fn with_stack(mut self, stack: Vec<SourceExtent>) -> Self {
        self.stack = stack;
        self
    }

    /// Message plus one indented line per stack frame.
    pub fn render(&self) -> String {
        let mut out = self.message.clone();
        for extent in &self.stack {
            out.push_str("\n    at ");
            out.push_str(&extent.to_string());
        }
        out
    }
}

impl From<crate::parser::ParseError> for RuntimeError {
    fn from(e: crate::parser::ParseError) -> Self {
        RuntimeError::new(e.to_string())
    }
}
