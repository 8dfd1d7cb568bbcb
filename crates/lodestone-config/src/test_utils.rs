use std::{env, ffi::OsString};

/// Puts the previous values of overridden variables back when dropped, even if the
/// test panicked.
pub struct EnvGuard {
    saved: Vec<(String, Option<OsString>)>,
}

impl EnvGuard {
    pub fn set(vars: &[(&str, &str)]) -> Self {
        let saved = vars
            .iter()
            .map(|(key, value)| {
                let previous = env::var_os(key);
                env::set_var(key, value);
                (key.to_string(), previous)
            })
            .collect();
        Self { saved }
    }
}

impl Drop for EnvGuard {
    fn drop(&mut self) {
        for (key, previous) in self.saved.drain(..).rev() {
            match previous {
                Some(value) => env::set_var(&key, value),
                None => env::remove_var(&key),
            }
        }
    }
}

/// Runs `f` with `vars` set in the process environment.
pub fn with_env<F: FnOnce()>(vars: Vec<(&str, &str)>, f: F) {
    let _guard = EnvGuard::set(&vars);
    f();
}
