//! Process-wide policy for operations that traverse a matrix against its
//! layout (for example, slicing a row out of a compressed-by-column matrix).

use crate::errors::{AxialError, AxialResult};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::atomic::{AtomicU8, Ordering};

/// What to do when an operation would iterate along a matrix's minor axis.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum InefficientActionPolicy {
    /// Proceed silently.
    Ignore,
    /// Log a warning with the originating context, then proceed.
    Warn,
    /// Fail with an `InefficientAction` error.
    Error,
}

impl InefficientActionPolicy {
    pub fn name(self) -> &'static str {
        match self {
            InefficientActionPolicy::Ignore => "Ignore",
            InefficientActionPolicy::Warn => "Warn",
            InefficientActionPolicy::Error => "Error",
        }
    }

    fn from_u8(value: u8) -> InefficientActionPolicy {
        match value {
            0 => InefficientActionPolicy::Ignore,
            2 => InefficientActionPolicy::Error,
            _ => InefficientActionPolicy::Warn,
        }
    }
}

impl fmt::Display for InefficientActionPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

static POLICY: AtomicU8 = AtomicU8::new(InefficientActionPolicy::Warn as u8);

/// The current process-wide policy.
pub fn inefficient_action_policy() -> InefficientActionPolicy {
    InefficientActionPolicy::from_u8(POLICY.load(Ordering::Relaxed))
}

/// Sets the policy, returning the previous one.
pub fn set_inefficient_action_policy(policy: InefficientActionPolicy) -> InefficientActionPolicy {
    InefficientActionPolicy::from_u8(POLICY.swap(policy as u8, Ordering::Relaxed))
}

/// Runs `code` under the given policy, restoring the previous one after.
pub fn with_inefficient_action_policy<F, R>(policy: InefficientActionPolicy, code: F) -> R
where
    F: FnOnce() -> R,
{
    let before = set_inefficient_action_policy(policy);
    let result = code();
    set_inefficient_action_policy(before);
    result
}

/// Consults the policy for a minor-axis traversal described by `action`.
pub fn check_efficiency(action: &str, context: &str) -> AxialResult<()> {
    match inefficient_action_policy() {
        InefficientActionPolicy::Ignore => Ok(()),
        InefficientActionPolicy::Warn => {
            log::warn!("inefficient action: {} ({})", action, context);
            Ok(())
        }
        InefficientActionPolicy::Error => Err(AxialError::inefficient_action(format!(
            "{} ({})",
            action, context
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::ErrorKind;

    #[test]
    fn test_default_is_warn() {
        with_inefficient_action_policy(InefficientActionPolicy::Warn, || {
            assert_eq!(
                inefficient_action_policy(),
                InefficientActionPolicy::Warn
            );
        });
    }

    #[test]
    fn test_set_returns_previous() {
        let original = inefficient_action_policy();
        let previous = set_inefficient_action_policy(InefficientActionPolicy::Ignore);
        assert_eq!(previous, original);
        set_inefficient_action_policy(original);
    }

    #[test]
    fn test_check_respects_levels() {
        with_inefficient_action_policy(InefficientActionPolicy::Ignore, || {
            assert!(check_efficiency("row slice", "test").is_ok());
        });
        with_inefficient_action_policy(InefficientActionPolicy::Error, || {
            let error = check_efficiency("row slice", "test").unwrap_err();
            assert_eq!(error.kind(), ErrorKind::InefficientAction);
        });
    }

    #[test]
    fn test_with_policy_restores() {
        let original = inefficient_action_policy();
        with_inefficient_action_policy(InefficientActionPolicy::Error, || {
            assert_eq!(
                inefficient_action_policy(),
                InefficientActionPolicy::Error
            );
        });
        assert_eq!(inefficient_action_policy(), original);
    }
}
