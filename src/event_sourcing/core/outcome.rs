use std::any::Any;
use std::fmt;
use std::panic::{self, AssertUnwindSafe};

// ============================================================================
// Outcome - Composable Success/Failure Result
// ============================================================================
//
// Two-variant result used by every operation that can fail for business
// or structural reasons. Steps chain with `then`, short-circuiting on the
// first failure. A panic raised inside a chained step is caught at the
// `then` boundary and converted into a failure that retains the original
// payload, so no fault unwinds across chain boundaries.
//
// ============================================================================

/// A panic payload captured at a [`Outcome::then`] boundary.
pub struct CapturedFault(Box<dyn Any + Send + 'static>);

impl CapturedFault {
    /// Human-readable message carried by the panic payload.
    pub fn message(&self) -> String {
        if let Some(s) = self.0.downcast_ref::<&str>() {
            (*s).to_string()
        } else if let Some(s) = self.0.downcast_ref::<String>() {
            s.clone()
        } else {
            "unexpected fault in chained step".to_string()
        }
    }

    /// Re-raise the original panic payload.
    pub fn resume(self) -> ! {
        panic::resume_unwind(self.0)
    }
}

impl fmt::Debug for CapturedFault {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("CapturedFault").field(&self.message()).finish()
    }
}

/// The failure half of an [`Outcome`]: one or more human-readable reasons,
/// plus the captured fault when the failure came from a panic.
#[derive(Debug)]
pub struct Failure {
    reasons: Vec<String>,
    cause: Option<CapturedFault>,
}

impl Failure {
    fn new(reasons: Vec<String>, cause: Option<CapturedFault>) -> Self {
        // A failure always carries at least one reason.
        let reasons = if reasons.is_empty() {
            vec!["operation failed".to_string()]
        } else {
            reasons
        };
        Self { reasons, cause }
    }

    pub fn reasons(&self) -> &[String] {
        &self.reasons
    }

    pub fn cause(&self) -> Option<&CapturedFault> {
        self.cause.as_ref()
    }

    /// Take ownership of the captured fault, e.g. to re-raise it.
    pub fn into_cause(self) -> Option<CapturedFault> {
        self.cause
    }
}

impl fmt::Display for Failure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.reasons.join("; "))
    }
}

impl std::error::Error for Failure {}

/// Result of an operation that can fail for business or structural reasons.
#[derive(Debug)]
pub enum Outcome<T> {
    Success(T),
    Failure(Failure),
}

impl<T> Outcome<T> {
    pub fn success(value: T) -> Self {
        Outcome::Success(value)
    }

    pub fn failure<I, S>(reasons: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Outcome::Failure(Failure::new(
            reasons.into_iter().map(Into::into).collect(),
            None,
        ))
    }

    fn from_fault(fault: CapturedFault) -> Self {
        let reason = fault.message();
        Outcome::Failure(Failure::new(vec![reason], Some(fault)))
    }

    pub fn is_success(&self) -> bool {
        matches!(self, Outcome::Success(_))
    }

    pub fn is_failure(&self) -> bool {
        matches!(self, Outcome::Failure(_))
    }

    /// Chain the next step.
    ///
    /// On success, invokes `f` with the value; a panic raised inside `f` is
    /// caught and converted into a failure carrying the panic message and
    /// the payload itself. On failure, returns the failure unchanged and
    /// never invokes `f`.
    pub fn then<U, F>(self, f: F) -> Outcome<U>
    where
        F: FnOnce(T) -> Outcome<U>,
    {
        match self {
            // The value moves into the closure, so no shared state is
            // observable after an unwind.
            Outcome::Success(value) => match panic::catch_unwind(AssertUnwindSafe(|| f(value))) {
                Ok(outcome) => outcome,
                Err(payload) => Outcome::from_fault(CapturedFault(payload)),
            },
            Outcome::Failure(failure) => Outcome::Failure(failure),
        }
    }

    /// Assertion-style accessor for callers certain of success.
    ///
    /// # Panics
    ///
    /// Panics when called on a failure.
    pub fn expect_success(self) -> T {
        match self {
            Outcome::Success(value) => value,
            Outcome::Failure(failure) => panic!("expected success, got failure: {failure}"),
        }
    }

    /// Assertion-style accessor for callers certain of failure.
    ///
    /// # Panics
    ///
    /// Panics when called on a success.
    pub fn expect_failure(self) -> Failure {
        match self {
            Outcome::Success(_) => panic!("expected failure, got success"),
            Outcome::Failure(failure) => failure,
        }
    }

    /// Bridge into a plain `Result` for `?`-style handling at boundaries.
    pub fn into_result(self) -> Result<T, Failure> {
        match self {
            Outcome::Success(value) => Ok(value),
            Outcome::Failure(failure) => Err(failure),
        }
    }
}

impl Outcome<()> {
    /// Success for unit-valued operations.
    pub fn done() -> Self {
        Outcome::Success(())
    }
}

// ============================================================================
// Unit Tests
// ============================================================================
