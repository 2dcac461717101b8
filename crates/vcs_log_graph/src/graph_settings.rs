use anyhow::Context as _;
use schemars::JsonSchema;
use serde_derive::{Deserialize, Serialize};

/// Settings for the commit graph of the log view.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(default)]
pub struct VcsLogGraphSettings {
    /// Whether to collapse every linear branch when a graph is loaded.
    ///
    /// Default: false
    pub collapse_linear_branches_on_load: bool,
    /// Shortest run of commits that collapsing all branches hides.
    ///
    /// Default: 1
    pub min_linear_branch_len: usize,
}

const DEFAULT_MIN_LINEAR_BRANCH_LEN: usize = 1;

impl Default for VcsLogGraphSettings {
    fn default() -> Self {
        VcsLogGraphSettings {
            collapse_linear_branches_on_load: false,
            min_linear_branch_len: DEFAULT_MIN_LINEAR_BRANCH_LEN,
        }
    }
}

impl VcsLogGraphSettings {
    /// Settings must be a JSON object; the sequence form serde also accepts
    /// for structs is rejected.
    pub fn from_json(json: &str) -> anyhow::Result<Self> {
        let value: serde_json::Value =
            serde_json::from_str(json).context("parsing vcs log graph settings")?;
        if !value.is_object() {
            anyhow::bail!("Invalid vcs log graph settings: expected an object, got {value}");
        }
        let settings: VcsLogGraphSettings =
            serde_json::from_value(value).context("parsing vcs log graph settings")?;
        settings.validate()?;
        Ok(settings)
    }

    /// Validates the settings to ensure no unreasonable values are set.
    pub fn validate(&self) -> anyhow::Result<()> {
        if self.min_linear_branch_len == 0 {
            anyhow::bail!(
                "Invalid min_linear_branch_len: {}. It must be at least 1.",
                self.min_linear_branch_len
            );
        }
        Ok(())
    }

    pub fn json_schema() -> serde_json::Value {
        schemars::schema_for!(VcsLogGraphSettings).to_value()
    }
}
