//! Allowlist of resource paths that get offline handling.

/// Resources that get cache-on-read and queue-on-write treatment by default.
pub const DEFAULT_OFFLINE_PATHS: [&str; 4] = [
  "/api/workouts",
  "/api/meals",
  "/api/weight-logs",
  "/api/plans",
];

/// Allowlist of resource-path prefixes that participate in offline handling.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OfflinePaths {
  prefixes: Vec<String>,
}

impl OfflinePaths {
  pub fn new<I, P>(prefixes: I) -> Self
  where
    I: IntoIterator<Item = P>,
    P: Into<String>,
  {
    Self {
      prefixes: prefixes
        .into_iter()
        .map(|p| {
          let prefix: String = p.into();
          prefix.trim_end_matches('/').to_string()
        })
        .filter(|p| !p.is_empty())
        .collect(),
    }
  }

  /// A prefix matches the path itself, its sub-resources and its query forms,
  /// but not sibling resources that merely share the leading characters.
  pub fn is_enabled(&self, path: &str) -> bool {
    self.prefixes.iter().any(|prefix| {
      path
        .strip_prefix(prefix.as_str())
        .is_some_and(|rest| rest.is_empty() || rest.starts_with('/') || rest.starts_with('?'))
    })
  }

  pub fn prefixes(&self) -> &[String] {
    &self.prefixes
  }
}

impl Default for OfflinePaths {
  fn default() -> Self {
    Self::new(DEFAULT_OFFLINE_PATHS)
  }
}
