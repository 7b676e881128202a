use std::{fmt, io};
use std::sync::Arc;
use std::panic::Location;
use std::convert::Infallible;
use std::error::Error as StdError;

pub type Result<T, E = Error> = std::result::Result<T, E>;

/// An error: one or more details, the error that caused it, if any, and the
/// location it was raised at.
#[derive(Debug)]
pub struct Error {
    detail: Vec<Box<dyn ErrorDetail>>,
    prev: Option<Box<Error>>,
    _location: &'static Location<'static>,
}

pub trait ErrorDetail: fmt::Display + fmt::Debug + Send + Sync {
    fn context(&self) -> Vec<(Option<String>, String)> { vec![] }

    /// The typed failure this detail represents, if any.
    fn failure(&self) -> Option<&Failure> { None }

    fn failure_mut(&mut self) -> Option<&mut Failure> { None }
}

/// The typed failures raised by the node tree and the block renderer.
#[derive(Debug, Clone)]
pub enum Failure {
    /// A node with the same absolute localized canonical name exists.
    DuplicateIdentity { alcn: Arc<str> },
    /// A canonical name contained a directory separator.
    InvalidCanonicalName { name: Arc<str>, path: Arc<str> },
    /// A pipeline named a processor that isn't registered.
    ProcessorNotFound { name: Arc<str> },
    Render(RenderError),
    /// An external program needed by a processor could not be run.
    CommandNotFound { command: Arc<str>, processor: Arc<str>, dest: Option<Arc<str>> },
    /// A node's behavior doesn't implement the requested operation.
    UnsupportedOperation { alcn: Arc<str>, behavior: &'static str, operation: &'static str },
    /// A block (transitively) references itself.
    CyclicBlockReference { alcn: Arc<str>, block: Arc<str> },
}

/// A failure while rendering content for a node.
#[derive(Debug, Clone)]
pub struct RenderError {
    pub message: String,
    pub cause: Option<Box<Error>>,
    pub processor: Option<Arc<str>>,
    /// ALCN of the node the output is destined for.
    pub dest: Option<Arc<str>>,
    /// ALCN of the node whose content was being rendered.
    pub reference: Option<Arc<str>>,
    /// 1-based line in the content under render.
    pub line: Option<usize>,
}

impl RenderError {
    pub fn new<M: Into<String>>(message: M) -> Self {
        RenderError {
            message: message.into(),
            cause: None,
            processor: None,
            dest: None,
            reference: None,
            line: None,
        }
    }

    pub fn caused_by(mut self, cause: Error) -> Self {
        self.cause = Some(Box::new(cause));
        self
    }

    pub fn processor<P: Into<Arc<str>>>(mut self, name: P) -> Self {
        self.processor = Some(name.into());
        self
    }

    pub fn nodes(mut self, dest: Option<Arc<str>>, reference: Option<Arc<str>>) -> Self {
        self.dest = dest;
        self.reference = reference;
        self
    }

    pub fn line(mut self, line: Option<usize>) -> Self {
        self.line = line;
        self
    }
}

impl Error {
    #[track_caller]
    pub fn from_std<E>(error: E) -> Self
        where E: StdError + Send + Sync + 'static
    {
        Error::from(Box::new(error) as Box<dyn StdError + Send + Sync>)
    }

    pub fn from_detail(detail: &dyn ErrorDetail) -> Self {
        Error::from(MakeshiftError::from(detail))
    }

    pub fn chain(self, mut other: Error) -> Self {
        #[inline]
        fn _chain(error: Error, behind: &mut Error) {
            if let Some(prev) = behind.prev.as_mut() {
                _chain(error, prev);
            } else {
                behind.prev = Some(Box::new(error));
            }
        }

        _chain(self, &mut other);
        other
    }

    /// All typed failures in this error, outermost first, including the
    /// causes of render errors.
    pub fn failures(&self) -> Vec<&Failure> {
        fn _collect<'e>(error: &'e Error, out: &mut Vec<&'e Failure>) {
            for failure in error.detail.iter().filter_map(|d| d.failure()) {
                out.push(failure);
                if let Failure::Render(RenderError { cause: Some(cause), .. }) = failure {
                    _collect(cause, out);
                }
            }

            if let Some(prev) = &error.prev {
                _collect(prev, out);
            }
        }

        let mut failures = vec![];
        _collect(self, &mut failures);
        failures
    }

    /// The outermost typed failure, if any.
    pub fn failure(&self) -> Option<&Failure> {
        self.failures().into_iter().next()
    }

    /// The outermost render error, not looking into causes.
    pub fn render_error_mut(&mut self) -> Option<&mut RenderError> {
        for detail in self.detail.iter_mut() {
            if let Some(Failure::Render(e)) = detail.failure_mut() {
                return Some(e);
            }
        }

        self.prev.as_mut()?.render_error_mut()
    }

    /// The first source line attributed by any render error in this error.
    pub fn line(&self) -> Option<usize> {
        self.failures().into_iter().find_map(|f| match f {
            Failure::Render(e) => e.line,
            _ => None,
        })
    }
}

impl ErrorDetail for &(dyn StdError + Send + Sync) {
    fn context(&self) -> Vec<(Option<String>, String)> {
        let mut ctxt = vec![];
        let mut error = self.source();
        while let Some(e) = error {
            ctxt.push((None, e.to_string()));
            error = e.source();
        }

        ctxt
    }
}

impl ErrorDetail for Box<dyn StdError + Send + Sync> {
    fn context(&self) -> Vec<(Option<String>, String)> {
        let error: &(dyn StdError + Send + Sync) = &**self;
        error.context()
    }
}

macro_rules! impl_error_detail_with_std_error {
    ($T:ty) => {
        impl $crate::error::ErrorDetail for $T {
            fn context(&self) -> Vec<(Option<String>, String)> {
                let error: &(dyn std::error::Error + Send + Sync) = self;
                error.context()
            }
        }
    }
}

impl_error_detail_with_std_error!(io::Error);
impl_error_detail_with_std_error!(toml::de::Error);
impl_error_detail_with_std_error!(serde_json::Error);
impl_error_detail_with_std_error!(minijinja::Error);

impl ErrorDetail for String { }
impl ErrorDetail for &str { }

impl ErrorDetail for Failure {
    fn context(&self) -> Vec<(Option<String>, String)> {
        let mut ctxt = vec![];
        match self {
            Failure::Render(e) => {
                if let Some(processor) = &e.processor {
                    ctxt.push((Some("processor".into()), processor.to_string()));
                }

                if let Some(dest) = &e.dest {
                    ctxt.push((Some("destination node".into()), format!("<{dest}>")));
                }

                if let Some(reference) = &e.reference {
                    ctxt.push((Some("reference node".into()), format!("<{reference}>")));
                }

                if let Some(line) = e.line {
                    ctxt.push((Some("line".into()), line.to_string()));
                }

                if let Some(cause) = &e.cause {
                    ctxt.push((Some("caused by".into()), cause.to_string().trim_end().into()));
                }
            }
            Failure::CommandNotFound { processor, dest, .. } => {
                ctxt.push((Some("processor".into()), processor.to_string()));
                if let Some(dest) = dest {
                    ctxt.push((Some("destination node".into()), format!("<{dest}>")));
                }
            }
            Failure::InvalidCanonicalName { path, .. } => {
                ctxt.push((Some("path".into()), path.to_string()));
            }
            _ => { }
        }

        ctxt
    }

    fn failure(&self) -> Option<&Failure> {
        Some(self)
    }

    fn failure_mut(&mut self) -> Option<&mut Failure> {
        Some(self)
    }
}

impl fmt::Display for Failure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Failure::DuplicateIdentity { alcn } => {
                write!(f, "a node with the absolute lcn <{alcn}> already exists")
            }
            Failure::InvalidCanonicalName { name, .. } => {
                write!(f, "canonical name '{name}' must not contain a path separator")
            }
            Failure::ProcessorNotFound { name } => {
                write!(f, "unknown content processor '{name}'")
            }
            Failure::Render(e) => e.message.fmt(f),
            Failure::CommandNotFound { command, .. } => {
                write!(f, "the command '{command}' could not be executed")
            }
            Failure::UnsupportedOperation { alcn, behavior, operation } => {
                write!(f, "{behavior} node <{alcn}> does not support '{operation}'")
            }
            Failure::CyclicBlockReference { alcn, block } => {
                write!(f, "block '{block}' of <{alcn}> references itself")
            }
        }
    }
}

impl From<RenderError> for Failure {
    fn from(error: RenderError) -> Self {
        Failure::Render(error)
    }
}

impl From<RenderError> for Error {
    #[track_caller]
    fn from(error: RenderError) -> Self {
        Error::from(Failure::Render(error))
    }
}

impl Clone for Error {
    fn clone(&self) -> Self {
        Error {
            detail: self.detail.iter()
                .map(|detail| match detail.failure() {
                    Some(failure) => Box::new(failure.clone()) as Box<dyn ErrorDetail>,
                    None => Box::new(MakeshiftError::from(&**detail)),
                })
                .collect(),
            prev: self.prev.clone(),
            _location: self._location,
        }
    }
}

impl<T: ErrorDetail + 'static> From<T> for Error {
    #[track_caller]
    fn from(detail: T) -> Self {
        Error {
            prev: None,
            detail: vec![Box::new(detail)],
            _location: std::panic::Location::caller(),
        }
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        #[derive(Copy, Clone)] struct Indent(usize);

        impl fmt::Display for Indent {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                for _ in 0..(self.0 * 4) { write!(f, " ")? }
                Ok(())
            }
        }

        struct NestedError<'a>(Indent, &'a Error);

        impl fmt::Display for NestedError<'_> {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                let NestedError(indent, e) = self;

                for detail in &e.detail {
                    let indent_line = format!("\n{indent}");

                    writeln!(f, "{indent}{}", format!("{:#}", detail).replace('\n', &indent_line))?;
                    if let Some(prev) = &e.prev {
                        NestedError(Indent(indent.0 + 1), prev).fmt(f)?;
                    }

                    for (key, value) in detail.context() {
                        let value = value.replace('\n', &indent_line);
                        match key {
                            Some(key) => writeln!(f, "{indent}{key}: {value}")?,
                            None => writeln!(f, "{indent}{value}")?,
                        }
                    }

                    if std::env::var_os("RUST_BACKTRACE").is_some() {
                        writeln!(f, "{indent}[{}]", e._location)?;
                    }
                }

                Ok(())
            }
        }

        NestedError(Indent(0), self).fmt(f)
    }
}

#[derive(Debug)]
pub struct MakeshiftError {
    pub message: String,
    pub parameters: Vec<(Option<String>, String)>,
}

impl From<&dyn ErrorDetail> for MakeshiftError {
    #[inline]
    fn from(detail: &dyn ErrorDetail) -> Self {
        MakeshiftError {
            message: detail.to_string(),
            parameters: detail.context()
        }
    }
}

#[doc(hidden)]
#[macro_export]
macro_rules! err {
    ($($token:tt)*) => (Err($crate::error!($($token)*)));
}

#[doc(hidden)]
#[macro_export]
macro_rules! error {
    ($msg:expr, $($rest:tt)*) => (
        $crate::error::Error::from($crate::error::MakeshiftError {
            message: $msg.to_string(),
            parameters: {
                #[allow(unused_mut)]
                let mut v: Vec<(Option<String>, String)> = Vec::new();
                $crate::error!(@param v $($rest)*);
                v
            },
        })
    );

    ($msg:expr) => ( $crate::error!($msg,) );

    (@param $v:ident $key:expr => $value:expr, $($rest:tt)*) => {
        $crate::error!(@param $v $key => $value);
        $crate::error!(@param $v $($rest)*);
    };

    (@param $v:ident $key:expr => $value:expr) => {
        $v.push((Some($key.to_string()), $value.to_string()));
    };

    (@param $v:ident $value:expr, $($rest:tt)*) => {
        $crate::error!(@param $v $value);
        $crate::error!(@param $v $($rest)*);
    };

    (@param $v:ident $value:expr) => {
        $v.push((None, $value.to_string()));
    };

    (@param $v:ident $(,)?) => { };
}

impl fmt::Display for MakeshiftError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.message.fmt(f)
    }
}

impl ErrorDetail for MakeshiftError {
    fn context(&self) -> Vec<(Option<String>, String)> {
        self.parameters.clone()
    }
}

pub trait Chainable<T> {
    fn chain(self, other: impl Into<Error>) -> Result<T>;

    fn chain_with<F, E>(self, f: F) -> Result<T>
        where F: FnOnce() -> E, E: Into<Error>;
}

impl<T, E: Into<Error>> Chainable<T> for Result<T, E> {
    #[track_caller]
    fn chain(self, other: impl Into<Error>) -> Result<T> {
        match self {
            Ok(v) => Ok(v),
            Err(e) => Err(e.into().chain(other.into()))
        }
    }

    fn chain_with<F, Err>(self, f: F) -> Result<T>
        where F: FnOnce() -> Err, Err: Into<Error>,
     {
        match self {
            Ok(v) => Ok(v),
            Err(e) => Err(e.into().chain(f().into()))
        }
    }
}

impl ErrorDetail for Infallible {
    fn context(&self) -> Vec<(Option<String>, String)> { vec![] }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn failures_are_found_through_chains_and_causes() {
        let inner: Error = Failure::ProcessorNotFound { name: "nope".into() }.into();
        let render = RenderError::new("processor failed").caused_by(inner).line(Some(3));
        let error = Error::from(render).chain(error!("while rendering", "node" => "/index.html"));

        let failures = error.failures();
        assert_eq!(failures.len(), 2);
        assert!(matches!(failures[0], Failure::Render(_)));
        assert!(matches!(failures[1], Failure::ProcessorNotFound { name } if &**name == "nope"));
        assert_eq!(error.line(), Some(3));
    }

    #[test]
    fn clone_keeps_typed_failures() {
        let error: Error = Failure::CyclicBlockReference { alcn: "/a".into(), block: "b".into() }.into();
        let error = error.chain(error!("outer"));
        let cloned = error.clone();
        assert!(matches!(cloned.failure(), Some(Failure::CyclicBlockReference { .. })));
        assert_eq!(cloned.to_string(), error.to_string());
    }

    #[test]
    fn render_error_line_can_be_filled_in() {
        let mut error = Error::from(RenderError::new("no block"));
        assert_eq!(error.line(), None);
        error.render_error_mut().unwrap().line = Some(7);
        assert_eq!(error.line(), Some(7));
    }

    #[test]
    fn display_includes_context() {
        let error: Error = error!("failed to read", "path" => "a/b.page", "plain");
        let string = error.to_string();
        assert!(string.contains("failed to read"));
        assert!(string.contains("path: a/b.page"));
        assert!(string.contains("plain"));
    }
}
