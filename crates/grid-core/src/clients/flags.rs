//! Rendered command-line flags.

use std::fmt;

/// One rendered setting.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FlagFragment {
    /// An enumerated option's flag, used as written.
    Verbatim(String),
    /// A freeform value for the first `%s` of `pattern`.
    Templated { pattern: String, value: String },
}

impl FlagFragment {
    /// The fragment as a single string (`--ipc-path /some/path`).
    pub fn render(&self) -> String {
        match self {
            FlagFragment::Verbatim(flag) => flag.clone(),
            FlagFragment::Templated { pattern, value } => pattern.replacen("%s", value, 1),
        }
    }

    /// The fragment split into process arguments.
    ///
    /// Templated patterns are split before substitution, so a value containing
    /// whitespace stays a single argument.
    pub fn argv(&self) -> Vec<String> {
        match self {
            FlagFragment::Verbatim(flag) => flag.split_whitespace().map(String::from).collect(),
            FlagFragment::Templated { pattern, value } => {
                let mut substituted = false;
                pattern
                    .split_whitespace()
                    .map(|token| {
                        if !substituted && token.contains("%s") {
                            substituted = true;
                            token.replacen("%s", value, 1)
                        } else {
                            token.to_string()
                        }
                    })
                    .collect()
            }
        }
    }
}

impl fmt::Display for FlagFragment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.render())
    }
}

/// Ordered flags for one client invocation. Spawning the process is up to the caller.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CliFlags {
    fragments: Vec<FlagFragment>,
}

impl CliFlags {
    /// Append `fragment`. An option whose flag is blank contributes nothing.
    pub(crate) fn push(&mut self, fragment: FlagFragment) {
        if matches!(&fragment, FlagFragment::Verbatim(flag) if flag.trim().is_empty()) {
            return;
        }
        self.fragments.push(fragment);
    }

    pub fn iter(&self) -> impl Iterator<Item = &FlagFragment> {
        self.fragments.iter()
    }

    pub fn len(&self) -> usize {
        self.fragments.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fragments.is_empty()
    }

    /// One string per setting.
    pub fn fragments(&self) -> Vec<String> {
        self.fragments.iter().map(FlagFragment::render).collect()
    }

    /// Flattened argument vector for a process launcher.
    pub fn to_argv(&self) -> Vec<String> {
        self.fragments.iter().flat_map(FlagFragment::argv).collect()
    }
}
