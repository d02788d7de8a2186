//! Config templating.
//!
//! Sample configs ship with every directive commented out. Rendering turns the
//! directives we have values for into active lines and copies everything else
//! through untouched:
//!
//! ```
//! use dcrinstall_core::template::{Override, render};
//!
//! let sample = "; rpcuser=\n; rpcuserx=keep\n";
//! let out = render(sample, &[Override::new("; rpcuser=", "alice")]);
//! assert_eq!(out, "rpcuser=alice\n; rpcuserx=keep\n");
//! ```

/// Replacement for one sample directive.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Override {
    /// Line prefix as it appears in the sample, e.g. `; rpcuser=`.
    pub directive: String,
    /// Value written after the uncommented directive.
    pub value: String,
}

impl Override {
    pub fn new(directive: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            directive: directive.into(),
            value: value.into(),
        }
    }

    fn active_line(&self) -> String {
        format!(
            "{}{}\n",
            self.directive.trim_start_matches([';', '#', ' ']),
            self.value
        )
    }
}

/// Render `sample` with `overrides` applied.
///
/// A line is rewritten when, after leading whitespace, it starts with an
/// override's directive; the first matching override wins. All other lines,
/// including a final line without a newline, are copied byte for byte.
pub fn render(sample: &str, overrides: &[Override]) -> String {
    let mut out = String::with_capacity(sample.len());
    for line in sample.split_inclusive('\n') {
        let trimmed = line.trim_start();
        match overrides.iter().find(|o| trimmed.starts_with(o.directive.as_str())) {
            Some(o) => out.push_str(&o.active_line()),
            None => out.push_str(line),
        }
    }
    out
}
