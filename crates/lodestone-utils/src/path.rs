use std::{
    env,
    path::{Path, PathBuf},
};

use crate::error::{PathError, PathResult};

fn env_dir(var: &str) -> Option<PathBuf> {
    env::var_os(var)
        .filter(|value| !value.is_empty())
        .map(PathBuf::from)
}

/// `$HOME`, then `/home/$USER`, then the temp directory.
pub fn home_dir() -> PathBuf {
    env_dir("HOME")
        .or_else(|| env::var("USER").ok().map(|user| Path::new("/home").join(user)))
        .unwrap_or_else(env::temp_dir)
}

pub fn xdg_config_home() -> PathBuf {
    env_dir("XDG_CONFIG_HOME").unwrap_or_else(|| home_dir().join(".config"))
}

pub fn xdg_data_home() -> PathBuf {
    env_dir("XDG_DATA_HOME").unwrap_or_else(|| home_dir().join(".local/share"))
}

fn lookup(name: &str, path: &str) -> PathResult<String> {
    let dir = match name {
        "HOME" => Some(home_dir()),
        "XDG_CONFIG_HOME" => Some(xdg_config_home()),
        "XDG_DATA_HOME" => Some(xdg_data_home()),
        _ => None,
    };
    if let Some(dir) = dir {
        return Ok(dir.to_string_lossy().into_owned());
    }

    env::var(name).map_err(|_| PathError::UndefinedVariable {
        name: name.to_string(),
        path: path.to_string(),
    })
}

/// Expands `~`, `$VAR` and `${VAR}` in `path`.
///
/// XDG variables fall back to their usual defaults when unset. A `$` not followed by a
/// name is kept literally.
fn expand(path: &str) -> PathResult<String> {
    let mut out = String::with_capacity(path.len());
    let mut rest = path;

    if let Some(tail) = rest.strip_prefix('~') {
        if tail.is_empty() || tail.starts_with('/') {
            out.push_str(&home_dir().to_string_lossy());
            rest = tail;
        }
    }

    while let Some(pos) = rest.find('$') {
        out.push_str(&rest[..pos]);
        let after = &rest[pos + 1..];

        if let Some(braced) = after.strip_prefix('{') {
            let end = braced.find('}').ok_or_else(|| PathError::UnterminatedBrace {
                path: path.to_string(),
            })?;
            out.push_str(&lookup(&braced[..end], path)?);
            rest = &braced[end + 1..];
            continue;
        }

        let len = after
            .find(|c: char| !(c.is_ascii_alphanumeric() || c == '_'))
            .unwrap_or(after.len());
        if len == 0 {
            out.push('$');
        } else {
            out.push_str(&lookup(&after[..len], path)?);
        }
        rest = &after[len..];
    }

    out.push_str(rest);
    Ok(out)
}

/// Expands variables in a user supplied path and makes it absolute against the
/// current directory.
///
/// ```
/// use lodestone_utils::path::resolve_path;
///
/// assert_eq!(resolve_path("/srv/packs").unwrap(), std::path::Path::new("/srv/packs"));
/// assert!(resolve_path("  ").is_err());
/// ```
pub fn resolve_path(path: &str) -> PathResult<PathBuf> {
    let path = path.trim();
    if path.is_empty() {
        return Err(PathError::Empty);
    }

    let expanded = PathBuf::from(expand(path)?);
    if expanded.is_absolute() {
        return Ok(expanded);
    }
    env::current_dir()
        .map(|cwd| cwd.join(expanded))
        .map_err(PathError::CurrentDir)
}
