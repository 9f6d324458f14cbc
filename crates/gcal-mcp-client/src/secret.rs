//! Secret references in credential values.
//!
//! A credential value in `config.toml` is either the secret itself or a
//! pointer to it: `pass::path/in/store` (first line of `pass show`) or
//! `env::VAR_NAME`.

/// A parsed credential value.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SecretRef<'a> {
    /// Entry in the `pass` password store.
    Pass(&'a str),
    /// Environment variable.
    Env(&'a str),
    /// The secret itself.
    Plain(&'a str),
}

impl<'a> SecretRef<'a> {
    pub fn parse(value: &'a str) -> Self {
        if let Some(path) = value.strip_prefix("pass::") {
            Self::Pass(path)
        } else if let Some(var) = value.strip_prefix("env::") {
            Self::Env(var)
        } else {
            Self::Plain(value)
        }
    }

    /// Fetches the secret this value points to.
    pub fn resolve(self) -> Result<String, String> {
        match self {
            Self::Pass(path) => pass_show(path),
            Self::Env(var) => {
                std::env::var(var).map_err(|_| format!("environment variable `{}` is not set", var))
            }
            Self::Plain(value) => Ok(value.to_string()),
        }
    }
}

/// Resolves a credential value, following `pass::` and `env::` references.
pub fn resolve(value: &str) -> Result<String, String> {
    SecretRef::parse(value).resolve()
}

/// True when the value points elsewhere and is safe to print.
pub fn is_reference(value: &str) -> bool {
    !matches!(SecretRef::parse(value), SecretRef::Plain(_))
}

fn pass_show(path: &str) -> Result<String, String> {
    let output = std::process::Command::new("pass")
        .args(["show", path])
        .output()
        .map_err(|e| format!("failed to run `pass show {}`: {}", path, e))?;

    if !output.status.success() {
        return Err(format!(
            "`pass show {}` exited with {}: {}",
            path,
            output.status,
            String::from_utf8_lossy(&output.stderr).trim()
        ));
    }

    String::from_utf8_lossy(&output.stdout)
        .lines()
        .next()
        .map(str::to_string)
        .ok_or_else(|| format!("`pass show {}` printed nothing", path))
}
