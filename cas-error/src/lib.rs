//! Contains the common [`ErrorKind`] trait used by all errors to display user-facing error
//! messages, and the [`Error`] type that pairs a kind with the source text it points into.

// lets `#[derive(ErrorKind)]` output (which names `cas_error::EXPR`) compile inside this crate
extern crate self as cas_error;

use ariadne::{Color, Report, Source};
use std::{any::Any, fmt::{self, Debug, Display}, ops::Range};

/// The color to use to highlight expressions.
pub const EXPR: Color = Color::Rgb(52, 235, 152);

/// The source id used when an [`Error`] renders itself through [`Display`].
pub const SRC_ID: &str = "rule";

/// Represents any kind of error that can occur during some operation.
pub trait ErrorKind: Debug + Send {
    /// Returns `self` as [`Any`], so callers can downcast to the concrete kind.
    fn as_any(&self) -> &dyn Any;

    /// Builds the report for this error.
    fn build_report<'a>(
        &self,
        src_id: &'a str,
        spans: &[Range<usize>],
    ) -> Report<(&'a str, Range<usize>)>;
}

/// An error associated with regions of some source text that can be highlighted.
///
/// Unlike a parser error, the source text is not something the user typed; it is rendered from
/// the object that caused the error (for example, a rewrite rule), so the error owns it.
#[derive(Debug)]
pub struct Error {
    /// The text the spans point into.
    pub src: String,

    /// The regions of the source text that this error originated from, as character ranges.
    /// Never empty.
    pub spans: Vec<Range<usize>>,

    /// The kind of error that occurred.
    pub kind: Box<dyn ErrorKind>,
}

impl Error {
    /// Creates a new error with the given source text, spans and kind.
    ///
    /// If `spans` is empty, a single span covering the whole source is used instead.
    pub fn new(src: impl Into<String>, mut spans: Vec<Range<usize>>, kind: impl ErrorKind + 'static) -> Self {
        let src = src.into();
        if spans.is_empty() {
            spans.push(0..src.chars().count());
        }
        Self { src, spans, kind: Box::new(kind) }
    }

    /// Build a report from this error kind.
    pub fn build_report<'a>(&self, src_id: &'a str) -> Report<(&'a str, Range<usize>)> {
        self.kind.build_report(src_id, &self.spans)
    }

    /// Returns the concrete error kind, if it is a `T`.
    pub fn downcast_ref<T: ErrorKind + 'static>(&self) -> Option<&T> {
        self.kind.as_any().downcast_ref::<T>()
    }
}

impl Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut buf = Vec::new();
        self.build_report(SRC_ID)
            .write((SRC_ID, Source::from(&self.src)), &mut buf)
            .map_err(|_| fmt::Error)?;
        write!(f, "{}", String::from_utf8_lossy(&buf))
    }
}

impl std::error::Error for Error {}
