use serde::{Deserialize, Serialize};

/// Per-table behaviour switches.
///
/// Plan reuse is on by default; everything else is off.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TableConfig {
    /// Log every statement at `DEBUG` on the `planorm.sql` target.
    pub debug: bool,
    /// Look up and store compiled plans in the registry.
    pub reuse: bool,
    /// Let unannotated fields take part in select/update without an explicit field list.
    pub use_name_when_tag_empty: bool,
    /// Bind record time fields in updates as Unix seconds instead of `YYYY-MM-DD hh:mm:ss`.
    pub to_timestamp: bool,
    /// Truncate logged SQL (in bytes). `None` means no truncation.
    pub max_sql_length: Option<usize>,
}

impl Default for TableConfig {
    fn default() -> Self {
        Self {
            debug: false,
            reuse: true,
            use_name_when_tag_empty: false,
            to_timestamp: false,
            max_sql_length: Some(200),
        }
    }
}

impl TableConfig {
    /// Create a configuration with defaults.
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_debug(mut self, debug: bool) -> Self {
        self.debug = debug;
        self
    }

    pub fn with_reuse(mut self, reuse: bool) -> Self {
        self.reuse = reuse;
        self
    }

    pub fn with_use_name_when_tag_empty(mut self, enabled: bool) -> Self {
        self.use_name_when_tag_empty = enabled;
        self
    }

    pub fn with_to_timestamp(mut self, enabled: bool) -> Self {
        self.to_timestamp = enabled;
        self
    }

    /// Set maximum SQL length to log.
    pub fn with_max_sql_length(mut self, len: usize) -> Self {
        self.max_sql_length = Some(len);
        self
    }

    /// Disable SQL truncation in logs.
    pub fn no_truncate(mut self) -> Self {
        self.max_sql_length = None;
        self
    }
}

/// Settings for a [`PlanRegistry`](crate::PlanRegistry).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RegistryConfig {
    /// Upper bound on cached plans, evicting the least recently used. `None` keeps every plan
    /// (default).
    pub plan_capacity: Option<usize>,
    /// Idle scratch buffers kept per buffer type.
    pub max_idle_buffers: usize,
}

impl Default for RegistryConfig {
    fn default() -> Self {
        Self {
            plan_capacity: None,
            max_idle_buffers: 64,
        }
    }
}

impl RegistryConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Bound the plan cache to `capacity` entries.
    pub fn with_plan_capacity(mut self, capacity: usize) -> Self {
        self.plan_capacity = Some(capacity);
        self
    }

    pub fn with_max_idle_buffers(mut self, n: usize) -> Self {
        self.max_idle_buffers = n;
        self
    }
}
