use anyhow::{anyhow, Context, Result};
use std::env;
use std::path::{Path, PathBuf};

use rulesplit::rules::{MatchSemantics, RuleSpec};

const PROJECT_CONFIG_NAME: &str = ".rulesplitrc";

/// Configuration file handler for rulesplit
#[derive(Debug, Default, Clone, PartialEq)]
pub struct ConfigFile {
    pub defaults: Option<String>,
    pub rules: Vec<RuleSpec>,
}

impl ConfigFile {
    /// Find project-level .rulesplitrc by walking up directory tree
    pub fn find_project_config() -> Option<PathBuf> {
        let mut current = std::env::current_dir().ok()?;
        loop {
            let config_path = current.join(PROJECT_CONFIG_NAME);
            if config_path.exists() {
                return Some(config_path);
            }
            if !current.pop() {
                // Reached filesystem root
                break;
            }
        }
        None
    }

    /// Get list of user config file locations in order of preference
    pub fn get_user_config_paths() -> Vec<PathBuf> {
        let mut paths = Vec::new();

        if cfg!(windows) {
            if let Ok(appdata) = env::var("APPDATA") {
                paths.push(PathBuf::from(appdata).join("rulesplit").join("config.ini"));
            }
            if let Ok(userprofile) = env::var("USERPROFILE") {
                paths.push(PathBuf::from(userprofile).join(PROJECT_CONFIG_NAME));
            }
        } else {
            let xdg_config = env::var("XDG_CONFIG_HOME")
                .map(PathBuf::from)
                .unwrap_or_else(|_| {
                    env::var("HOME")
                        .map(|h| PathBuf::from(h).join(".config"))
                        .unwrap_or_else(|_| PathBuf::from(".config"))
                });

            paths.push(xdg_config.join("rulesplit").join("config.ini"));

            if let Ok(home) = env::var("HOME") {
                paths.push(PathBuf::from(home).join(PROJECT_CONFIG_NAME));
            }
        }

        paths
    }

    /// Load configuration with proper precedence: project > user > defaults
    pub fn load() -> Result<Self> {
        let mut config = Self::default();

        if let Some(path) = Self::get_user_config_paths().into_iter().find(|p| p.exists()) {
            config = Self::merge_configs(config, Self::load_from_path(&path)?);
        }

        if let Some(project_path) = Self::find_project_config() {
            config = Self::merge_configs(config, Self::load_from_path(&project_path)?);
        }

        Ok(config)
    }

    /// Load configuration with optional custom config file path
    pub fn load_with_custom_path(custom_path: Option<&str>) -> Result<Self> {
        match custom_path {
            Some(path) => Self::load_from_path(Path::new(path)),
            None => Self::load(),
        }
    }

    /// Load configuration from a specific path
    pub fn load_from_path(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        Self::parse_ini_content(&content)
            .with_context(|| format!("Invalid config file: {}", path.display()))
    }

    /// Parse INI content from string
    fn parse_ini_content(content: &str) -> Result<Self> {
        let mut defaults = None;
        let mut rules = Vec::new();
        let mut current_section = String::new();

        for (line_no, line) in content.lines().enumerate() {
            let line = line.trim();

            if line.is_empty() || line.starts_with(';') || line.starts_with('#') {
                continue;
            }

            if line.starts_with('[') && line.ends_with(']') {
                current_section = line[1..line.len() - 1].trim().to_string();
                continue;
            }

            let Some((key, value)) = split_key_value(line) else {
                continue;
            };

            match current_section.as_str() {
                "" => {
                    if key == "defaults" {
                        defaults = Some(value.to_string());
                    }
                    // Ignore unknown root-level keys
                }
                "rules" => {
                    let rule = parse_rule_entry(key, value)
                        .with_context(|| format!("line {}", line_no + 1))?;
                    rules.push(rule);
                }
                _ => {
                    // Ignore unknown sections
                }
            }
        }

        Ok(Self { defaults, rules })
    }

    /// Merge two configuration objects, with the second taking precedence.
    /// A non-empty `[rules]` section replaces the base rules as a whole.
    fn merge_configs(base: Self, overlay: Self) -> Self {
        Self {
            defaults: overlay.defaults.or(base.defaults),
            rules: if overlay.rules.is_empty() {
                base.rules
            } else {
                overlay.rules
            },
        }
    }

    /// Show configuration information with precedence details
    pub fn show_config(custom_path: Option<&str>) {
        println!("Configuration precedence: CLI > project .rulesplitrc > user config > defaults\n");

        let project_config_path = Self::find_project_config();
        let user_config_paths = Self::get_user_config_paths();
        let user_config_path = user_config_paths.iter().find(|p| p.exists());

        match Self::load_with_custom_path(custom_path) {
            Ok(merged_config) => {
                let mut loaded_from = Vec::new();

                if let Some(path) = custom_path {
                    loaded_from.push(format!("Custom: {}", path));
                } else {
                    if let Some(project_path) = &project_config_path {
                        loaded_from.push(format!("Project: {}", project_path.display()));
                    }
                    if let Some(user_path) = user_config_path {
                        loaded_from.push(format!("User: {}", user_path.display()));
                    }
                }

                if loaded_from.is_empty() {
                    println!("No configuration files found. Using defaults.");
                } else {
                    println!("Configuration loaded from:");
                    for source in loaded_from {
                        println!("  {}", source);
                    }
                }

                if let Some(defaults) = &merged_config.defaults {
                    println!("\nActive defaults:");
                    println!("  defaults = {}", defaults);
                }

                if merged_config.rules.is_empty() {
                    println!(
                        "\nNo [rules] configured; the {} preset applies when the command line names no rules.",
                        rulesplit::presets::DEFAULT_PRESET
                    );
                } else {
                    println!("\nActive rules (checked in this order):");
                    for rule in &merged_config.rules {
                        println!("  {} = {}", rule.semantics.keyword(), rule.pattern);
                    }
                }
            }
            Err(e) => {
                eprintln!("Error loading configuration: {:#}", e);
            }
        }

        println!("\nConfiguration search locations (in precedence order):");
        if let Some(ref project_path) = project_config_path {
            println!("  1. Project: {} (found)", project_path.display());
        } else {
            println!("  1. Project: .rulesplitrc (searched up directory tree, not found)");
        }

        for (i, path) in user_config_paths.iter().enumerate() {
            let status = if path.exists() {
                "(found)"
            } else {
                "(not found)"
            };
            println!("  {}. User: {} {}", i + 2, path.display(), status);
        }

        if project_config_path.is_none() && user_config_path.is_none() && custom_path.is_none() {
            println!("\nExample configuration file (.rulesplitrc):");
            println!();
            println!("# Arguments applied to every rulesplit command");
            println!("defaults = --workers 8 --report");
            println!();
            println!("[rules]");
            println!("accept = ^[A-Z]{{1,2}}[0-9]");
            println!("reject = ^ZZ");
        }
    }

    /// Apply `defaults` to the raw command line, right after the program name
    pub fn process_args(&self, args: Vec<String>) -> Result<Vec<String>> {
        let Some(defaults) = &self.defaults else {
            return Ok(args);
        };

        let default_args = shell_words::split(defaults)
            .with_context(|| "Invalid defaults: failed to parse arguments".to_string())?;

        let mut args = args.into_iter();
        let mut result: Vec<String> = args.next().into_iter().collect();
        result.extend(default_args);
        result.extend(args);
        Ok(result)
    }
}

/// Read a rules file: the same `accept = REGEX` / `reject = REGEX` lines as
/// the `[rules]` section, with `#` and `;` comments.
pub fn load_rules_file(path: &Path) -> Result<Vec<RuleSpec>> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read rules file: {}", path.display()))?;

    let mut rules = Vec::new();
    for (line_no, line) in content.lines().enumerate() {
        let line = line.trim();
        if line.is_empty() || line.starts_with(';') || line.starts_with('#') || line == "[rules]" {
            continue;
        }

        let (key, value) = split_key_value(line).ok_or_else(|| {
            anyhow!(
                "{}:{}: expected 'accept = REGEX' or 'reject = REGEX'",
                path.display(),
                line_no + 1
            )
        })?;
        let rule = parse_rule_entry(key, value)
            .with_context(|| format!("{}:{}", path.display(), line_no + 1))?;
        rules.push(rule);
    }

    Ok(rules)
}

fn split_key_value(line: &str) -> Option<(&str, &str)> {
    let eq_pos = line.find('=')?;
    Some((line[..eq_pos].trim(), line[eq_pos + 1..].trim()))
}

fn parse_rule_entry(key: &str, value: &str) -> Result<RuleSpec> {
    let semantics: MatchSemantics = key.parse()?;
    if value.is_empty() {
        return Err(anyhow!("empty pattern for '{}'", key));
    }
    Ok(RuleSpec {
        pattern: value.to_string(),
        semantics,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::{NamedTempFile, TempDir};

    #[test]
    fn test_load_config_file() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "# comment").unwrap();
        writeln!(file, "defaults = --workers 8 --report").unwrap();
        writeln!(file).unwrap();
        writeln!(file, "[rules]").unwrap();
        writeln!(file, "accept = ^[A-Z]{{2}}=?").unwrap();
        writeln!(file, "reject = X$").unwrap();
        writeln!(file, "[other]").unwrap();
        writeln!(file, "ignored = yes").unwrap();

        let config = ConfigFile::load_from_path(file.path()).unwrap();
        assert_eq!(config.defaults.as_deref(), Some("--workers 8 --report"));
        assert_eq!(
            config.rules,
            vec![RuleSpec::accept("^[A-Z]{2}=?"), RuleSpec::reject("X$")]
        );
    }

    #[test]
    fn test_unknown_rule_keyword_is_an_error() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "[rules]").unwrap();
        writeln!(file, "maybe = abc").unwrap();

        let err = ConfigFile::load_from_path(file.path()).unwrap_err();
        let message = format!("{:#}", err);
        assert!(message.contains("line 2"));
        assert!(message.contains("maybe"));
    }

    #[test]
    fn test_process_args_with_defaults() {
        let config = ConfigFile {
            defaults: Some("--workers 8 --accept '^A B'".to_string()),
            rules: Vec::new(),
        };

        let args = vec!["rulesplit".to_string(), "data.csv".to_string()];
        let result = config.process_args(args).unwrap();
        assert_eq!(
            result,
            vec!["rulesplit", "--workers", "8", "--accept", "^A B", "data.csv"]
        );
    }

    #[test]
    fn test_process_args_without_defaults() {
        let config = ConfigFile::default();
        let args = vec!["rulesplit".to_string(), "data.csv".to_string()];
        assert_eq!(config.process_args(args.clone()).unwrap(), args);
    }

    #[test]
    fn test_process_args_bad_quoting() {
        let config = ConfigFile {
            defaults: Some("--accept 'unterminated".to_string()),
            rules: Vec::new(),
        };
        assert!(config.process_args(vec!["rulesplit".to_string()]).is_err());
    }

    #[test]
    fn test_config_merging() {
        let user_config = ConfigFile {
            defaults: Some("--user-defaults".to_string()),
            rules: vec![RuleSpec::accept("user")],
        };
        let project_config = ConfigFile {
            defaults: None,
            rules: vec![RuleSpec::accept("project"), RuleSpec::reject("x")],
        };

        let merged = ConfigFile::merge_configs(user_config.clone(), project_config);
        assert_eq!(merged.defaults.as_deref(), Some("--user-defaults"));
        assert_eq!(merged.rules.len(), 2);
        assert_eq!(merged.rules[0].pattern, "project");

        // An overlay without rules keeps the base rules
        let merged = ConfigFile::merge_configs(user_config, ConfigFile::default());
        assert_eq!(merged.rules, vec![RuleSpec::accept("user")]);
    }

    #[test]
    fn test_load_rules_file() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "; postcode rules").unwrap();
        writeln!(file, "accept = ^[A-Z]").unwrap();
        writeln!(file, "invalid = ^ZZ").unwrap();

        let rules = load_rules_file(file.path()).unwrap();
        assert_eq!(rules, vec![RuleSpec::accept("^[A-Z]"), RuleSpec::reject("^ZZ")]);
    }

    #[test]
    fn test_rules_file_line_without_keyword() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "^[A-Z]").unwrap();

        let err = load_rules_file(file.path()).unwrap_err();
        assert!(err.to_string().contains(":1: expected"));
    }

    #[test]
    fn test_project_config_discovery() {
        let temp_dir = TempDir::new().unwrap();
        let project_root = temp_dir.path().canonicalize().unwrap();
        let config_path = project_root.join(PROJECT_CONFIG_NAME);
        std::fs::write(&config_path, "[rules]\naccept = a\n").unwrap();

        let subdir = project_root.join("nested").join("deeper");
        std::fs::create_dir_all(&subdir).unwrap();

        let original_dir = std::env::current_dir().unwrap();
        std::env::set_current_dir(&subdir).unwrap();
        let found_config = ConfigFile::find_project_config();
        std::env::set_current_dir(&original_dir).unwrap();

        assert_eq!(found_config, Some(config_path));
    }

    #[test]
    fn test_user_config_paths() {
        let paths = ConfigFile::get_user_config_paths();
        assert!(!paths.is_empty());
        for path in &paths {
            let file_name = path.file_name().unwrap().to_string_lossy();
            assert!(
                file_name == "config.ini" || file_name == PROJECT_CONFIG_NAME,
                "Unexpected user config filename: {}",
                file_name
            );
        }
    }
}
