//! XDG-compliant path resolution for ammie.

use std::path::PathBuf;

use miette::Diagnostic;
use thiserror::Error;

/// Errors from path resolution.
#[derive(Debug, Error, Diagnostic)]
pub enum PathError {
    #[error("cannot determine home directory")]
    #[diagnostic(
        code(ammie::paths::no_home),
        help("Set the HOME environment variable, or pass --config and --vocabulary-dir explicitly.")
    )]
    NoHome,
}

pub type PathResult<T> = std::result::Result<T, PathError>;

/// Global XDG-compliant directories for ammie.
#[derive(Debug, Clone)]
pub struct AmmiePaths {
    /// `$XDG_CONFIG_HOME/ammie/`
    pub config_dir: PathBuf,
    /// `$XDG_DATA_HOME/ammie/`
    pub data_dir: PathBuf,
}

impl AmmiePaths {
    /// Resolve XDG directories from environment variables with standard fallbacks.
    pub fn resolve() -> PathResult<Self> {
        Self::resolve_with(|name| std::env::var(name).ok())
    }

    /// Resolve using an explicit variable lookup.
    pub fn resolve_with(var: impl Fn(&str) -> Option<String>) -> PathResult<Self> {
        let home = var("HOME").map(PathBuf::from).ok_or(PathError::NoHome)?;

        let config_dir = var("XDG_CONFIG_HOME")
            .map(PathBuf::from)
            .unwrap_or_else(|| home.join(".config"))
            .join("ammie");

        let data_dir = var("XDG_DATA_HOME")
            .map(PathBuf::from)
            .unwrap_or_else(|| home.join(".local/share"))
            .join("ammie");

        Ok(Self {
            config_dir,
            data_dir,
        })
    }

    /// Path to the settings file.
    pub fn settings_file(&self) -> PathBuf {
        self.config_dir.join("ammie.toml")
    }

    /// Default vocabulary directory (the four JSON documents).
    pub fn vocabulary_dir(&self) -> PathBuf {
        self.data_dir.join("vocabulary")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn vars<'a>(pairs: &'a [(&'a str, &'a str)]) -> impl Fn(&str) -> Option<String> + 'a {
        move |name| {
            pairs
                .iter()
                .find(|(k, _)| *k == name)
                .map(|(_, v)| v.to_string())
        }
    }

    #[test]
    fn falls_back_to_home_layout() {
        let paths = AmmiePaths::resolve_with(vars(&[("HOME", "/home/a")])).unwrap();
        assert_eq!(paths.config_dir, PathBuf::from("/home/a/.config/ammie"));
        assert_eq!(
            paths.vocabulary_dir(),
            PathBuf::from("/home/a/.local/share/ammie/vocabulary")
        );
        assert_eq!(
            paths.settings_file(),
            PathBuf::from("/home/a/.config/ammie/ammie.toml")
        );
    }

    #[test]
    fn honours_xdg_overrides() {
        let paths = AmmiePaths::resolve_with(vars(&[
            ("HOME", "/home/a"),
            ("XDG_CONFIG_HOME", "/cfg"),
            ("XDG_DATA_HOME", "/data"),
        ]))
        .unwrap();
        assert_eq!(paths.config_dir, PathBuf::from("/cfg/ammie"));
        assert_eq!(paths.data_dir, PathBuf::from("/data/ammie"));
    }

    #[test]
    fn missing_home_is_an_error() {
        assert!(matches!(
            AmmiePaths::resolve_with(vars(&[])),
            Err(PathError::NoHome)
        ));
    }
}
