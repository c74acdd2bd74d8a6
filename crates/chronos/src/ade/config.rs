//! Configuration tables: group paths and display-name lookups.
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::fs;
use std::path::Path;
use tracing::info;

use super::error::{ChronosError, Result};
use super::types::{GroupPath, RawSegment};
use crate::batch::BatchPlan;

/// Version tag of the built-in tables.
pub const BUILTIN_VERSION: &str = "2019-builtin";

/// Top-level timetable configuration, as stored on disk
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TimetableConfig {
    /// The remote IDs drift between academic years; tag tables so a stale
    /// file is recognisable in logs
    #[serde(default = "default_version")]
    pub version: String,
    pub groups: BTreeMap<String, Vec<RawSegment>>,
    #[serde(default)]
    pub rooms: HashMap<String, String>,
    #[serde(default)]
    pub classes: HashMap<String, String>,
    #[serde(default)]
    pub plan: Option<BatchPlan>,
}

fn default_version() -> String {
    "unversioned".to_string()
}

impl TimetableConfig {
    /// Loads a configuration file
    ///
    /// # Arguments
    /// * `path` - Path to a JSON configuration file
    ///
    /// # Returns
    /// * `Ok(TimetableConfig)` - Loaded configuration, with every group path
    ///   already checked to decode
    /// * `Err` - If the file can't be read, parsed or a path is malformed
    pub fn load_from_file(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path).map_err(|e| ChronosError::Config {
            message: format!("failed to read {}: {}", path.display(), e),
        })?;
        let config: TimetableConfig = serde_json::from_str(&content)?;

        // Fail at load time rather than halfway through a batch.
        config.group_table()?;

        info!(
            version = %config.version,
            groups = config.groups.len(),
            rooms = config.rooms.len(),
            classes = config.classes.len(),
            "Loaded timetable configuration from {}",
            path.display()
        );
        Ok(config)
    }

    /// The tables known to work against the remote application.
    pub fn builtin() -> Self {
        let category = |id: &str| RawSegment::Text(format!("'{id}'"));
        let branch = RawSegment::Number;
        let major = |leaf: u64| {
            vec![category("trainee"), branch(1), branch(13), branch(15), branch(leaf)]
        };

        let mut groups = BTreeMap::new();
        groups.insert("CSI".to_string(), major(17));
        groups.insert("GISTRE".to_string(), major(18));
        groups.insert("MTI".to_string(), major(19));
        groups.insert("SCIA".to_string(), major(20));
        groups.insert("SIGL".to_string(), major(21));
        groups.insert("SRS".to_string(), major(22));
        groups.insert("TCOM".to_string(), major(23));
        groups.insert("GITM".to_string(), major(906));
        groups.insert(
            "GRA".to_string(),
            vec![category("trainee"), branch(1), branch(13), branch(14), branch(1057)],
        );
        groups.insert(
            "GRB".to_string(),
            vec![category("trainee"), branch(1), branch(13), branch(14), branch(1058)],
        );
        for (name, leaf) in [("APPING1", 709), ("APPING2", 710), ("APPING3", 689)] {
            groups.insert(
                name.to_string(),
                vec![category("trainee"), branch(1), branch(661), branch(leaf)],
            );
        }

        TimetableConfig {
            version: BUILTIN_VERSION.to_string(),
            groups,
            rooms: HashMap::new(),
            classes: HashMap::new(),
            plan: None,
        }
    }

    /// Decodes every group path.
    pub fn group_table(&self) -> Result<GroupTable> {
        let mut paths = BTreeMap::new();
        for (name, raw) in &self.groups {
            let path = GroupPath::from_raw(raw).map_err(|e| ChronosError::Config {
                message: format!("group {name}: {e}"),
            })?;
            paths.insert(name.clone(), path);
        }
        Ok(GroupTable { paths })
    }

    pub fn lookups(&self) -> LookupTables {
        LookupTables {
            rooms: self.rooms.clone(),
            classes: self.classes.clone(),
        }
    }

    /// The batch plan, falling back to every known group.
    pub fn plan(&self) -> BatchPlan {
        self.plan.clone().unwrap_or_default()
    }
}

impl Default for TimetableConfig {
    fn default() -> Self {
        Self::builtin()
    }
}

/// Named groups and their decoded tree paths
#[derive(Debug, Clone, Default)]
pub struct GroupTable {
    paths: BTreeMap<String, GroupPath>,
}

impl GroupTable {
    /// Gets the path for a group
    pub fn resolve(&self, group: &str) -> Result<&GroupPath> {
        self.paths
            .get(group)
            .ok_or_else(|| ChronosError::UnknownGroup {
                group: group.to_string(),
            })
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.paths.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.paths.len()
    }

    pub fn is_empty(&self) -> bool {
        self.paths.is_empty()
    }
}

/// Code-to-display-name tables for rooms and classes
#[derive(Debug, Clone, Default)]
pub struct LookupTables {
    pub rooms: HashMap<String, String>,
    pub classes: HashMap<String, String>,
}

impl LookupTables {
    pub fn room<'a>(&'a self, code: &'a str) -> &'a str {
        self.rooms.get(code).map(String::as_str).unwrap_or(code)
    }

    pub fn class<'a>(&'a self, code: &'a str) -> &'a str {
        self.classes.get(code).map(String::as_str).unwrap_or(code)
    }
}
