//! Working-directory resolution

use async_trait::async_trait;
use std::path::PathBuf;
use tracing::debug;

/// Asks the user which workspace root a new session should start in.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait FolderPicker: Send + Sync {
    /// Pick an index into `roots`; `None` when the prompt was dismissed.
    async fn choose(&self, roots: &[PathBuf]) -> Option<usize>;
}

/// Picker that always takes the first root, for hosts that cannot prompt.
#[derive(Debug, Default, Clone, Copy)]
pub struct FirstRootPicker;

#[async_trait]
impl FolderPicker for FirstRootPicker {
    async fn choose(&self, _roots: &[PathBuf]) -> Option<usize> {
        Some(0)
    }
}

/// Resolved working directory and the root it came from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedDir {
    /// Directory the process starts in
    pub path: PathBuf,
    /// Root index, only set when several roots exist
    pub origin_index: Option<usize>,
}

/// Resolve where a new session starts.
///
/// An explicit directory wins. Otherwise several roots go through the picker
/// (dismissal means the first root) and a single root is used as-is. Paths
/// that do not exist fall back to the home directory.
pub async fn resolve_working_dir(
    explicit: Option<PathBuf>,
    roots: &[PathBuf],
    picker: &dyn FolderPicker,
) -> ResolvedDir {
    if let Some(path) = explicit {
        return ResolvedDir {
            path: existing_or_home(path),
            origin_index: None,
        };
    }

    match roots {
        [] => ResolvedDir {
            path: home_dir(),
            origin_index: None,
        },
        [only] => ResolvedDir {
            path: existing_or_home(only.clone()),
            origin_index: None,
        },
        _ => {
            let index = picker
                .choose(roots)
                .await
                .filter(|&i| i < roots.len())
                .unwrap_or(0);
            ResolvedDir {
                path: existing_or_home(roots[index].clone()),
                origin_index: Some(index),
            }
        }
    }
}

fn existing_or_home(path: PathBuf) -> PathBuf {
    if path.is_dir() {
        path
    } else {
        debug!(path = %path.display(), "Working directory missing, using home");
        home_dir()
    }
}

fn home_dir() -> PathBuf {
    dirs::home_dir().unwrap_or_else(|| PathBuf::from("/"))
}
