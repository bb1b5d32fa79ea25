//! Runtime invariant checks with contract-test bookkeeping.
//!
//! Session code asserts its topology invariants through [`assert_invariant!`].
//! Every checked invariant is recorded process-wide, because the checks run on
//! the session worker while the contract tests run on the test thread.
//!
//! ```rust,ignore
//! assert_invariant!(
//!     attached_inputs <= 1,
//!     "Session has at most one video input",
//!     "session::transaction"
//! );
//!
//! #[test]
//! fn contract_session_topology() {
//!     contract_test("session topology", &["Session has at most one video input"]);
//! }
//! ```

use std::collections::BTreeSet;
use std::sync::Mutex;

static INVARIANT_LOG: Mutex<BTreeSet<&'static str>> = Mutex::new(BTreeSet::new());

/// Assert an invariant and record that it was checked.
///
/// # Panics
/// Panics if the condition is false.
#[macro_export]
macro_rules! assert_invariant {
    ($condition:expr, $message:expr) => {
        $crate::invariant_ppt::__assert_invariant_impl($condition, $message, None)
    };
    ($condition:expr, $message:expr, $context:expr) => {
        $crate::invariant_ppt::__assert_invariant_impl($condition, $message, Some($context))
    };
}

#[doc(hidden)]
pub fn __assert_invariant_impl(condition: bool, message: &'static str, context: Option<&str>) {
    INVARIANT_LOG
        .lock()
        .unwrap_or_else(|poisoned| poisoned.into_inner())
        .insert(message);

    if !condition {
        let ctx = context.unwrap_or("unknown");
        log::error!("Invariant violated [{}]: {}", ctx, message);
        panic!("INVARIANT VIOLATION [{}]: {}", ctx, message);
    }
}

/// Invariants checked so far in this process.
pub fn checked_invariants() -> Vec<&'static str> {
    INVARIANT_LOG
        .lock()
        .unwrap_or_else(|poisoned| poisoned.into_inner())
        .iter()
        .copied()
        .collect()
}

/// Fail unless every listed invariant has been checked at least once.
///
/// # Panics
/// Panics naming the invariants that were never checked.
pub fn contract_test(test_name: &str, required_invariants: &[&str]) {
    let checked = checked_invariants();
    let missing: Vec<&str> = required_invariants
        .iter()
        .copied()
        .filter(|inv| !checked.iter().any(|c| c == inv))
        .collect();

    if !missing.is_empty() {
        panic!(
            "CONTRACT FAILURE [{}]: The following invariants were not checked:\n  - {}",
            test_name,
            missing.join("\n  - ")
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_checked_invariant_is_recorded() {
        assert_invariant!(true, "unit: recorded invariant", "invariant_ppt::tests");
        assert!(checked_invariants().contains(&"unit: recorded invariant"));
        contract_test("recorded", &["unit: recorded invariant"]);
    }

    #[test]
    #[should_panic(expected = "INVARIANT VIOLATION [tests]: unit: broken")]
    fn test_violation_panics() {
        assert_invariant!(false, "unit: broken", "tests");
    }

    #[test]
    #[should_panic(expected = "CONTRACT FAILURE")]
    fn test_unchecked_invariant_fails_contract() {
        contract_test("missing", &["unit: never asserted anywhere"]);
    }
}
