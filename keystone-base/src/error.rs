// Every fallible path in the workspace funnels through this one type so that:
// 1. Errors carry a backtrace from the point they entered our code
// 2. There is one place to set a breakpoint to trap any error soon after it's created
// 3. Every error is emitted into the tracing system exactly once, at creation

use backtrace_error::DynBacktraceError;
use std::borrow::Cow;
use tracing::error;

#[cfg(test)]
use test_log::test;

#[derive(Debug)]
pub struct Error {
    msg: String,
    #[allow(dead_code)]
    inner: DynBacktraceError,
}
pub type Result<T> = std::result::Result<T, Error>;

struct SimpleErr(Cow<'static, str>);
impl std::fmt::Debug for SimpleErr {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}
impl std::fmt::Display for SimpleErr {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}
impl std::error::Error for SimpleErr {}

impl<E: std::error::Error + Send + Sync + 'static> From<E> for Error {
    fn from(err: E) -> Error {
        Error::new(err)
    }
}

impl std::fmt::Display for Error {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.msg)
    }
}

impl Error {
    pub fn new<E: std::error::Error + Send + Sync + 'static>(err: E) -> Error {
        error!(target: "keystone", "{:?}", err);
        let msg = err.to_string();
        let inner = DynBacktraceError::from(err);
        Error { msg, inner }
    }

    pub fn message(&self) -> &str {
        &self.msg
    }
}

pub fn err(msg: impl Into<Cow<'static, str>>) -> Error {
    let err = SimpleErr(msg.into());
    Error::new(err)
}

#[test]
fn test_error() {
    let e = err("test error");
    assert_eq!(e.message(), "test error");
    assert_eq!(e.to_string(), "test error");
}

#[test]
fn test_io_error_converts() {
    fn open_missing() -> Result<std::fs::File> {
        Ok(std::fs::File::open("/definitely/not/a/real/path")?)
    }
    assert!(open_missing().is_err());
}
