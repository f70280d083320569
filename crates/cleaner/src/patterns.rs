use anyhow::{Context, Result};
use regex::Regex;

/// Removal patterns tuned to artifacts seen in Gemini output.
///
/// Order matters: the bare backslash goes last so it does not eat the
/// escape sequences the earlier entries are looking for.
pub const DEFAULT_PATTERNS: [&str; 8] = [
    r"\\n",     // literal "\n"
    r"\n",      // real newline
    r#"\\""#,   // literal '\"'
    r"\\n\\n",
    r"\\u2013", // en-dash escape
    r"\*{1,2}", // * and **
    r"\\u00a7", // section-sign escape
    r"\\",
];

/// Ordered list of compiled removal patterns.
#[derive(Debug, Clone)]
pub struct CleaningPatterns {
    patterns: Vec<Regex>,
}

impl CleaningPatterns {
    /// Compile patterns in the given order. Fails on the first invalid one.
    pub fn new<I, S>(sources: I) -> Result<Self>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let patterns = sources
            .into_iter()
            .map(|source| {
                let source = source.as_ref();
                Regex::new(source).with_context(|| format!("Invalid cleaning pattern: {}", source))
            })
            .collect::<Result<Vec<_>>>()?;

        Ok(Self { patterns })
    }

    pub fn iter(&self) -> impl Iterator<Item = &Regex> {
        self.patterns.iter()
    }

    pub fn len(&self) -> usize {
        self.patterns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.patterns.is_empty()
    }
}

impl Default for CleaningPatterns {
    fn default() -> Self {
        Self {
            patterns: DEFAULT_PATTERNS
                .iter()
                .map(|p| Regex::new(p).expect("default cleaning patterns are valid"))
                .collect(),
        }
    }
}
