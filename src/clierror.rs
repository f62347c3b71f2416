//! User facing command errors

use std::fmt;

/// A failed command, its inputs, and what the user can try next
#[derive(Debug)]
pub struct CliError {
    command: String,
    variables: String,
    cause: anyhow::Error,
    suggestion: String,
}

impl CliError {
    pub fn new(
        command: impl Into<String>,
        variables: &impl fmt::Debug,
        cause: impl Into<anyhow::Error>,
        suggestion: impl Into<String>,
    ) -> Self {
        Self {
            command: command.into(),
            variables: format!("{:?}", variables),
            cause: cause.into(),
            suggestion: suggestion.into(),
        }
    }
}

impl fmt::Display for CliError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "an error occurred invoking '{}'", self.command)?;
        writeln!(f, "with variables: {}", self.variables)?;
        writeln!(f, "caused by:")?;
        writeln!(f, "{:#}", self.cause)?;
        write!(f, "suggestion: {}", self.suggestion)
    }
}

// The cause is already part of Display; no `source`.
impl std::error::Error for CliError {}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug)]
    #[allow(dead_code)]
    struct Vars {
        bucket: Option<String>,
    }

    #[test]
    fn test_display() {
        let err = CliError::new(
            "account activate",
            &Vars {
                bucket: Some("my-bucket".to_string()),
            },
            anyhow::anyhow!("access denied").context("Unable to check S3 bucket"),
            "check your credentials",
        );

        assert_eq!(
            err.to_string(),
            "an error occurred invoking 'account activate'\n\
             with variables: Vars { bucket: Some(\"my-bucket\") }\n\
             caused by:\n\
             Unable to check S3 bucket: access denied\n\
             suggestion: check your credentials"
        );
    }

    #[test]
    fn test_wraps_into_anyhow() {
        let err: anyhow::Error =
            CliError::new("account activate", &(), anyhow::anyhow!("boom"), "retry").into();
        assert!(err.downcast_ref::<CliError>().is_some());
        assert!(err.to_string().contains("suggestion: retry"));
    }
}
