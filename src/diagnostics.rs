use crate::error::{ProblemCategory, ProblemKind};
use miette::SourceSpan;
use std::fmt;

/// Identifies the construct currently being parsed. Frames form a stack that
/// mirrors the nesting of the document; every recorded problem carries a
/// snapshot of it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParseFrame {
    /// A definition; `None` while its name is still undetermined.
    Definition(Option<String>),
    /// A constructor argument; `None` for an un-indexed one.
    ConstructorArg(Option<usize>),
    Property(String),
    Qualifier(String),
}

impl fmt::Display for ParseFrame {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ParseFrame::Definition(Some(name)) => write!(f, "definition '{name}'"),
            ParseFrame::Definition(None) => write!(f, "definition (unnamed)"),
            ParseFrame::ConstructorArg(Some(index)) => write!(f, "constructor-arg #{index}"),
            ParseFrame::ConstructorArg(None) => write!(f, "constructor-arg"),
            ParseFrame::Property(name) => write!(f, "property '{name}'"),
            ParseFrame::Qualifier(type_name) => write!(f, "qualifier '{type_name}'"),
        }
    }
}

/// One recorded problem: what went wrong, where in the source, and the parse
/// location trace at the time of recording.
#[derive(Debug, Clone, PartialEq)]
pub struct Problem {
    pub kind: ProblemKind,
    pub span: SourceSpan,
    pub frames: Vec<ParseFrame>,
}

impl Problem {
    pub fn category(&self) -> ProblemCategory {
        self.kind.category()
    }
}

impl fmt::Display for Problem {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.kind)?;
        if !self.frames.is_empty() {
            write!(f, " (in ")?;
            for (i, frame) in self.frames.iter().enumerate() {
                if i > 0 {
                    write!(f, " > ")?;
                }
                write!(f, "{frame}")?;
            }
            write!(f, ")")?;
        }
        Ok(())
    }
}

/// Frame stack plus problem sink, threaded through one parse pass. Problems
/// are accumulated, never thrown; the caller inspects them when the pass is
/// done.
#[derive(Debug, Default)]
pub struct Diagnostics {
    frames: Vec<ParseFrame>,
    problems: Vec<Problem>,
}

impl Diagnostics {
    pub fn new() -> Diagnostics {
        Diagnostics::default()
    }

    pub fn report(&mut self, kind: ProblemKind, span: SourceSpan) {
        log::debug!("recording parse problem: {kind}");
        self.problems.push(Problem {
            kind,
            span,
            frames: self.frames.clone(),
        });
    }

    pub fn push_frame(&mut self, frame: ParseFrame) {
        self.frames.push(frame);
    }

    pub fn pop_frame(&mut self) {
        self.frames.pop();
    }

    pub fn into_problems(self) -> Vec<Problem> {
        self.problems
    }
}
