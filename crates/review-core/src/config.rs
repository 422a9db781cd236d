use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fs;
use std::path::{Path, PathBuf};

use crate::{Result, runtime_dir, user_dir};

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct AppConfig {
    pub defaults: DefaultsConfig,
    pub sample: SampleConfig,
    pub ui: UiConfig,
    pub regex: RegexConfig,
    pub theme: ThemeConfig,
}

/// Session start values used when the command line leaves them out.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct DefaultsConfig {
    /// Flag letters active at startup. Empty by default; `"m"` gives the
    /// multiline-by-default behaviour.
    pub flags: String,
    pub pattern: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SampleConfig {
    pub paragraphs: usize,
    pub seed: Option<u64>,
}

impl Default for SampleConfig {
    fn default() -> Self {
        Self {
            paragraphs: 3,
            seed: None,
        }
    }
}

/// Whether the pattern runs against each input line or the joined text.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum MatchScope {
    #[default]
    Line,
    Text,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct UiConfig {
    pub match_scope: MatchScope,
    pub continuation_marker: String,
    pub keybindings_path: String,
    pub log_path: Option<String>,
    pub poll_interval_ms: u64,
}

impl Default for UiConfig {
    fn default() -> Self {
        Self {
            match_scope: MatchScope::Line,
            continuation_marker: "> ".to_string(),
            keybindings_path: "~/.review/keybindings.json".to_string(),
            log_path: None,
            poll_interval_ms: 100,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RegexConfig {
    /// Upper bound on compiled program size, in bytes.
    pub size_limit: usize,
}

impl Default for RegexConfig {
    fn default() -> Self {
        Self {
            size_limit: 10 * (1 << 20),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ThemeConfig {
    pub highlight: String,
    pub status: String,
    pub error: String,
}

impl Default for ThemeConfig {
    fn default() -> Self {
        Self {
            highlight: "White".to_string(),
            status: "Cyan".to_string(),
            error: "Red".to_string(),
        }
    }
}

impl AppConfig {
    pub fn user_settings_path() -> Option<PathBuf> {
        user_dir().map(|dir| dir.join("settings.json"))
    }

    pub fn project_settings_path(workspace: &Path) -> PathBuf {
        runtime_dir(workspace).join("settings.json")
    }

    pub fn project_local_settings_path(workspace: &Path) -> PathBuf {
        runtime_dir(workspace).join("settings.local.json")
    }

    /// Merges user, project and local settings over the defaults, later files
    /// winning key by key.
    pub fn load(workspace: &Path) -> Result<Self> {
        let mut merged = serde_json::to_value(Self::default())?;

        let mut paths = Vec::new();
        if let Some(user) = Self::user_settings_path() {
            paths.push(user);
        }
        paths.push(Self::project_settings_path(workspace));
        paths.push(Self::project_local_settings_path(workspace));

        for path in paths {
            if !path.exists() {
                continue;
            }
            let raw = fs::read_to_string(&path)?;
            let value: Value = serde_json::from_str(&raw)
                .map_err(|err| anyhow::anyhow!("invalid settings in {}: {err}", path.display()))?;
            overlay_settings(&mut merged, value);
        }

        Ok(serde_json::from_value(merged)?)
    }

    pub fn keybindings_path(&self) -> PathBuf {
        expand_home(&self.ui.keybindings_path)
    }

    pub fn log_path(&self) -> Option<PathBuf> {
        match &self.ui.log_path {
            Some(path) => Some(expand_home(path)),
            None => user_dir().map(|dir| dir.join("review.log")),
        }
    }
}

/// Expands a leading `~/` to the home directory.
pub fn expand_home(path: &str) -> PathBuf {
    if let Some(rest) = path.strip_prefix("~/")
        && let Some(home) = std::env::var_os("HOME").or_else(|| std::env::var_os("USERPROFILE"))
    {
        return Path::new(&home).join(rest);
    }
    PathBuf::from(path)
}

/// Layers `overlay` onto `base`. Objects merge key by key; any other overlay
/// value replaces what was there.
fn overlay_settings(base: &mut Value, overlay: Value) {
    let Value::Object(overlay_map) = overlay else {
        *base = overlay;
        return;
    };
    match base {
        Value::Object(base_map) => {
            for (key, value) in overlay_map {
                match base_map.get_mut(&key) {
                    Some(slot) => overlay_settings(slot, value),
                    None => {
                        base_map.insert(key, value);
                    }
                }
            }
        }
        other => *other = Value::Object(overlay_map),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use serde_json::json;

    proptest! {
        #[test]
        fn layered_settings_keep_untouched_defaults(
            flags in prop::option::of("[imsx]{0,3}"),
            scope in prop::option::of(prop_oneof![Just("line"), Just("text")]),
            poll in prop::option::of(1u64..1000),
        ) {
            let mut overlay = json!({"defaults": {}, "ui": {}});
            if let Some(flags) = &flags {
                overlay["defaults"]["flags"] = json!(flags);
            }
            if let Some(scope) = scope {
                overlay["ui"]["match_scope"] = json!(scope);
            }
            if let Some(poll) = poll {
                overlay["ui"]["poll_interval_ms"] = json!(poll);
            }

            let mut merged = serde_json::to_value(AppConfig::default()).unwrap();
            overlay_settings(&mut merged, overlay.clone());
            let once = merged.clone();
            overlay_settings(&mut merged, overlay);
            prop_assert_eq!(&merged, &once);

            let cfg: AppConfig = serde_json::from_value(merged).unwrap();
            prop_assert_eq!(cfg.defaults.flags, flags.unwrap_or_default());
            prop_assert_eq!(cfg.ui.match_scope == MatchScope::Text, scope == Some("text"));
            prop_assert_eq!(cfg.ui.poll_interval_ms, poll.unwrap_or(100));
            prop_assert_eq!(cfg.ui.continuation_marker.as_str(), "> ");
            prop_assert_eq!(cfg.sample.paragraphs, 3);
        }
    }

    #[test]
    fn scalar_overlay_replaces_unset_optional_paths() {
        let mut merged = serde_json::to_value(AppConfig::default()).unwrap();
        assert!(merged["ui"]["log_path"].is_null());
        overlay_settings(
            &mut merged,
            json!({"ui": {"log_path": "/tmp/review.log"}, "sample": {"seed": 9}}),
        );
        let cfg: AppConfig = serde_json::from_value(merged).unwrap();
        assert_eq!(cfg.ui.log_path.as_deref(), Some("/tmp/review.log"));
        assert_eq!(cfg.sample.seed, Some(9));
        assert_eq!(cfg.sample.paragraphs, 3);
    }

    #[test]
    fn defaults_start_with_no_flags_and_line_scope() {
        let cfg = AppConfig::default();
        assert!(cfg.defaults.flags.is_empty());
        assert_eq!(cfg.ui.match_scope, MatchScope::Line);
        assert_eq!(cfg.ui.continuation_marker, "> ");
    }

    #[test]
    fn project_settings_override_nested_keys_only() {
        let workspace = tempfile::tempdir().expect("workspace");
        let dir = runtime_dir(workspace.path());
        fs::create_dir_all(&dir).expect("runtime dir");
        fs::write(
            dir.join("settings.json"),
            r#"{"defaults":{"flags":"m"},"ui":{"match_scope":"text"}}"#,
        )
        .expect("settings");
        fs::write(
            dir.join("settings.local.json"),
            r#"{"ui":{"continuation_marker":"~ "}}"#,
        )
        .expect("local settings");

        let cfg = AppConfig::load(workspace.path()).expect("load");
        assert_eq!(cfg.defaults.flags, "m");
        assert_eq!(cfg.ui.match_scope, MatchScope::Text);
        assert_eq!(cfg.ui.continuation_marker, "~ ");
        assert_eq!(cfg.ui.poll_interval_ms, 100);
        assert_eq!(cfg.sample.paragraphs, 3);
    }

    #[test]
    fn malformed_settings_are_reported() {
        let workspace = tempfile::tempdir().expect("workspace");
        let dir = runtime_dir(workspace.path());
        fs::create_dir_all(&dir).expect("runtime dir");
        fs::write(dir.join("settings.json"), "{not json").expect("settings");
        let err = AppConfig::load(workspace.path()).expect_err("should fail");
        assert!(err.to_string().contains("invalid settings"));
    }

    #[test]
    fn expand_home_leaves_plain_paths_alone() {
        assert_eq!(expand_home("/tmp/x.json"), PathBuf::from("/tmp/x.json"));
        assert_eq!(expand_home("rel/x.json"), PathBuf::from("rel/x.json"));
    }
}
