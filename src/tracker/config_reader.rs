use std::fs;

use serde::{Deserialize, Serialize};

use crate::tracker::*;

/// The optional configuration file.
#[derive(Eq, PartialEq, Debug, Clone, Default, Serialize, Deserialize)]
pub struct SeatbookConfig {
    #[serde(rename = "storePath")]
    pub store_path: Option<String>,
    #[serde(rename = "exportTextBudget")]
    pub export_text_budget: Option<usize>,
    #[serde(rename = "clipboardCommand")]
    pub clipboard_command: Option<Vec<String>>,
    #[serde(rename = "defaultLayout")]
    pub default_layout: Option<SeatLayoutConfig>,
}

/// The configuration after applying the command line and the defaults.
#[derive(Eq, PartialEq, Debug, Clone)]
pub struct Settings {
    pub store_path: String,
    pub text_budget: usize,
    pub clipboard_command: Vec<String>,
    pub default_layout: SeatLayoutConfig,
}

impl Settings {
    pub const DEFAULT_STORE_PATH: &'static str = "seatbook.json";

    pub fn default_clipboard_command() -> Vec<String> {
        vec![
            "xclip".to_string(),
            "-selection".to_string(),
            "clipboard".to_string(),
        ]
    }
}

pub fn read_config(path: &str) -> AppResult<SeatbookConfig> {
    let contents = fs::read_to_string(path).context(ReadingFileSnafu { path })?;
    debug!("read_config: {:?}", contents);
    let config: SeatbookConfig =
        serde_json::from_str(&contents).context(ParsingConfigSnafu { path })?;
    Ok(config)
}

/// Resolves the settings. The command line wins over the configuration file.
pub fn resolve_settings(config: &SeatbookConfig, store_flag: &Option<String>) -> AppResult<Settings> {
    let default_layout = match config.default_layout.as_ref() {
        Some(l) => SeatLayoutConfig::new(l.rows, l.columns, &l.aisle_columns).context(SeatingSnafu)?,
        None => SeatLayoutConfig::DEFAULT_LAYOUT,
    };
    let text_budget = config
        .export_text_budget
        .unwrap_or(SessionContext::DEFAULT_TEXT_BUDGET);
    if text_budget == 0 {
        whatever!("exportTextBudget must be positive");
    }
    Ok(Settings {
        store_path: store_flag
            .clone()
            .or_else(|| config.store_path.clone())
            .unwrap_or_else(|| Settings::DEFAULT_STORE_PATH.to_string()),
        text_budget,
        clipboard_command: config
            .clipboard_command
            .clone()
            .unwrap_or_else(Settings::default_clipboard_command),
        default_layout,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn partial_config_falls_back_to_defaults() {
        let config: SeatbookConfig = serde_json::from_str(
            r#"{"exportTextBudget": 500, "defaultLayout": {"rows": 5, "columns": 6, "aisleColumns": [3, 9]}}"#,
        )
        .unwrap();
        let settings = resolve_settings(&config, &None).unwrap();
        assert_eq!(settings.store_path, "seatbook.json");
        assert_eq!(settings.text_budget, 500);
        assert_eq!(settings.clipboard_command[0], "xclip");
        assert_eq!(settings.default_layout.aisle_columns, vec![3]);
    }

    #[test]
    fn command_line_wins() {
        let config = SeatbookConfig {
            store_path: Some("a.json".to_string()),
            ..Default::default()
        };
        let settings = resolve_settings(&config, &Some("b.json".to_string())).unwrap();
        assert_eq!(settings.store_path, "b.json");
        assert_eq!(settings.text_budget, 2800);
        assert_eq!(settings.default_layout, SeatLayoutConfig::DEFAULT_LAYOUT);
    }

    #[test]
    fn invalid_values_are_rejected() {
        let config: SeatbookConfig =
            serde_json::from_str(r#"{"defaultLayout": {"rows": 50, "columns": 6}}"#).unwrap();
        assert!(resolve_settings(&config, &None).is_err());
        let config: SeatbookConfig = serde_json::from_str(r#"{"exportTextBudget": 0}"#).unwrap();
        assert!(resolve_settings(&config, &None).is_err());
        assert!(serde_json::from_str::<SeatbookConfig>(r#"{"exportTextBudget": "x"}"#).is_err());
    }

    #[test]
    fn config_file_is_read() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        fs::write(&path, r#"{"clipboardCommand": ["wl-copy"]}"#).unwrap();
        let config = read_config(path.to_str().unwrap()).unwrap();
        assert_eq!(config.clipboard_command, Some(vec!["wl-copy".to_string()]));
        assert!(read_config("/nonexistent/seatbook.json").is_err());
    }
}
