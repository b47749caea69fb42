//! Bracket configuration: group sizes and bye handling.

use super::models::CategoryId;
use std::collections::HashMap;

/// Default seats per group
pub const DEFAULT_GROUP_SIZE: usize = 5;

/// Line-follower robots compete head to head
pub const LINE_FOLLOWER_CATEGORY: CategoryId = 1;

/// Group size resolution per category
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GroupSizePolicy {
    pub default_size: usize,
    pub overrides: HashMap<CategoryId, usize>,
}

impl GroupSizePolicy {
    pub fn uniform(size: usize) -> Self {
        Self {
            default_size: size,
            overrides: HashMap::new(),
        }
    }

    pub fn with_override(mut self, category_id: CategoryId, size: usize) -> Self {
        self.overrides.insert(category_id, size);
        self
    }

    pub fn size_for(&self, category_id: CategoryId) -> usize {
        self.overrides
            .get(&category_id)
            .copied()
            .unwrap_or(self.default_size)
    }

    /// Parse `category:size` pairs separated by commas.
    ///
    /// Malformed entries are skipped with a warning.
    pub fn parse_overrides(spec: &str) -> HashMap<CategoryId, usize> {
        spec.split(',')
            .map(str::trim)
            .filter(|entry| !entry.is_empty())
            .filter_map(|entry| {
                let parsed = entry.split_once(':').and_then(|(category, size)| {
                    Some((category.trim().parse().ok()?, size.trim().parse().ok()?))
                });
                if parsed.is_none() {
                    log::warn!("Ignoring malformed group size override '{}'", entry);
                }
                parsed
            })
            .collect()
    }
}

impl Default for GroupSizePolicy {
    fn default() -> Self {
        Self::uniform(DEFAULT_GROUP_SIZE).with_override(LINE_FOLLOWER_CATEGORY, 2)
    }
}

/// Bracket configuration
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct BracketConfig {
    pub group_sizes: GroupSizePolicy,
    /// Complete single-member groups at creation instead of waiting for a
    /// manual winner
    pub auto_complete_byes: bool,
}

impl BracketConfig {
    /// Create configuration from environment variables
    ///
    /// Expected environment variables:
    /// - `GROUP_SIZE_DEFAULT`: Seats per group (default: 5)
    /// - `GROUP_SIZE_OVERRIDES`: Per-category sizes, e.g. `1:2,3:4` (default: `1:2`)
    /// - `AUTO_COMPLETE_BYES`: Auto-complete singleton groups (default: false)
    pub fn from_env() -> Self {
        let default_size = std::env::var("GROUP_SIZE_DEFAULT")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(DEFAULT_GROUP_SIZE);

        let overrides = match std::env::var("GROUP_SIZE_OVERRIDES") {
            Ok(spec) => GroupSizePolicy::parse_overrides(&spec),
            Err(_) => GroupSizePolicy::default().overrides,
        };

        let auto_complete_byes = std::env::var("AUTO_COMPLETE_BYES")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(false);

        Self {
            group_sizes: GroupSizePolicy {
                default_size,
                overrides,
            },
            auto_complete_byes,
        }
    }

    pub fn with_group_sizes(mut self, group_sizes: GroupSizePolicy) -> Self {
        self.group_sizes = group_sizes;
        self
    }

    pub fn with_auto_complete_byes(mut self, enabled: bool) -> Self {
        self.auto_complete_byes = enabled;
        self
    }
}
