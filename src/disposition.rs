//! Process exit disposition.
//!
//! Kept apart from severities and the recommendation: findings, however
//! severe, never change the exit code. Only a run that could not produce a
//! report fails.

use std::process::ExitCode;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Disposition {
    Success,
    InfrastructureFailure,
}

impl Disposition {
    pub fn from_outcome<T, E>(outcome: &std::result::Result<T, E>) -> Self {
        match outcome {
            Ok(_) => Disposition::Success,
            Err(_) => Disposition::InfrastructureFailure,
        }
    }

    pub fn code(self) -> u8 {
        match self {
            Disposition::Success => 0,
            Disposition::InfrastructureFailure => 1,
        }
    }

    pub fn exit_code(self) -> ExitCode {
        ExitCode::from(self.code())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_only_errors_fail() {
        let ok: Result<(), String> = Ok(());
        let err: Result<(), String> = Err("cannot write".to_string());
        assert_eq!(Disposition::from_outcome(&ok), Disposition::Success);
        assert_eq!(Disposition::from_outcome(&ok).code(), 0);
        assert_eq!(
            Disposition::from_outcome(&err),
            Disposition::InfrastructureFailure
        );
        assert_eq!(Disposition::from_outcome(&err).code(), 1);
    }
}
