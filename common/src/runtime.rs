/// Explicit presentation order for categorical keys.
///
/// Keys listed here sort first, in listed order. Everything else keeps the
/// order it was first seen in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Priority(&'static [&'static str]);

/// Baseline first, then the two runtimes being compared against it
pub const RUNTIMES: Priority = Priority(&["bare", "docker", "podman"]);
pub const COMPARED: Priority = Priority(&["docker", "podman"]);
pub const IO_MODES: Priority = Priority(&["direct", "overlay", "volume"]);

pub const BASELINE: &str = "bare";

impl Priority {
    pub fn rank(&self, key: &str) -> Option<usize> {
        self.0.iter().position(|x| *x == key)
    }

    pub fn keys(&self) -> &'static [&'static str] {
        self.0
    }

    /// Orders `keys` by this priority, unknown keys last in their given order
    pub fn sort<'a, I>(&self, keys: I) -> Vec<&'a str>
    where
        I: IntoIterator<Item = &'a str>,
    {
        let mut keys = keys.into_iter().collect::<Vec<_>>();
        keys.sort_by_key(|key| self.rank(key).unwrap_or(usize::MAX));
        keys
    }

    /// The listed keys that are present in `keys`, in listed order
    pub fn only<'a, I>(&self, keys: I) -> Vec<&'static str>
    where
        I: IntoIterator<Item = &'a str>,
    {
        let present = keys.into_iter().collect::<Vec<_>>();
        self.0
            .iter()
            .copied()
            .filter(|key| present.contains(key))
            .collect()
    }
}

/// Display name of a runtime
pub fn label(runtime: &str) -> &str {
    match runtime {
        "bare" => "Bare Metal",
        "docker" => "Docker",
        "podman" => "Podman",
        other => other,
    }
}

pub fn io_mode_label(mode: &str) -> &str {
    match mode {
        "direct" => "Direct",
        "overlay" => "Overlay FS",
        "volume" => "Volume Mount",
        other => other,
    }
}
