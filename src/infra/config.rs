use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::{
    cli::{AppContext, InitArgs, LayoutArgs},
    core::layout::{GapPolicy, LayoutRules, RuleSpec, default_rule_specs},
    parsers::ExtractorKind,
};

pub const CONFIG_FILE: &str = "cpplayout.toml";

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config
{
    /// Layout rules and gap policy
    pub layout: LayoutConfig,

    /// Defaults for `reorder` and `plan`
    pub reorder: ReorderConfig,

    /// Defaults for `batch`
    pub batch: BatchConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LayoutConfig
{
    pub gap_policy: GapPolicy,

    /// Rules in configuration order; lower priority sorts earlier
    pub rules: Vec<RuleSpec>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ReorderConfig
{
    pub extractor: ExtractorKind,
    pub header_extensions: Vec<String>,
    pub source_extensions: Vec<String>,

    /// Default output directory (None = overwrite the source)
    pub output_dir: Option<PathBuf>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BatchConfig
{
    /// Ignore patterns applied in addition to .gitignore
    pub ignore_patterns: Vec<String>,
}

impl Default for Config
{
    fn default() -> Self
    {
        Self {
            layout: LayoutConfig::default(),
            reorder: ReorderConfig::default(),
            batch: BatchConfig::default(),
        }
    }
}

impl Default for LayoutConfig
{
    fn default() -> Self
    {
        Self {
            gap_policy: GapPolicy::default(),
            rules: default_rule_specs(),
        }
    }
}

impl Default for ReorderConfig
{
    fn default() -> Self
    {
        Self {
            extractor: ExtractorKind::default(),
            header_extensions: ["h", "hpp", "hh", "hxx"]
                .map(String::from)
                .to_vec(),
            source_extensions: ["cpp", "cc", "cxx"]
                .map(String::from)
                .to_vec(),
            output_dir: None,
        }
    }
}

impl Default for BatchConfig
{
    fn default() -> Self
    {
        Self {
            ignore_patterns: vec![
                "build/**".to_string(),
                "cmake-build-*/**".to_string(),
                "third_party/**".to_string(),
                ".git/**".to_string(),
            ],
        }
    }
}

impl Config
{
    /// Rules from `--config` when given, else from `[layout]`, with CLI
    /// overrides applied on top
    pub fn layout_rules(
        &self,
        args: &LayoutArgs,
    ) -> Result<LayoutRules>
    {
        let rules = match &args.config
        {
            Some(path) => LayoutRules::load(path)?,
            None => LayoutRules::from_specs(&self.layout.rules, self.layout.gap_policy)?,
        };

        Ok(match args.gap_policy
        {
            Some(policy) => rules.with_gap_policy(policy),
            None => rules,
        })
    }

    pub fn extractor(
        &self,
        args: &LayoutArgs,
    ) -> ExtractorKind
    {
        args.extractor
            .unwrap_or(self.reorder.extractor)
    }

    pub fn is_header(
        &self,
        path: &Path,
    ) -> bool
    {
        has_extension(path, &self.reorder.header_extensions)
    }

    pub fn is_source(
        &self,
        path: &Path,
    ) -> bool
    {
        has_extension(path, &self.reorder.source_extensions)
    }
}

fn has_extension(
    path: &Path,
    extensions: &[String],
) -> bool
{
    path.extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| {
            extensions
                .iter()
                .any(|x| x.eq_ignore_ascii_case(e))
        })
}

pub fn load_config() -> Result<Config>
{
    let mut builder = config::Config::builder();

    // Load from config files in priority order
    let config_paths = ["cpplayout.toml", "cpplayout.yaml", "cpplayout.json", ".cpplayout.toml"];

    for path in &config_paths
    {
        if Path::new(path).exists()
        {
            builder = builder.add_source(config::File::with_name(path));
            break;
        }
    }

    // CPPLAYOUT__REORDER__EXTRACTOR=scanner style overrides
    builder = builder.add_source(
        config::Environment::with_prefix("CPPLAYOUT")
            .prefix_separator("__")
            .separator("__"),
    );

    let cfg = builder
        .build()
        .context("Failed to load configuration")?;
    let parsed: Config = cfg
        .try_deserialize()
        .context("Failed to parse configuration")?;

    Ok(parsed)
}

pub fn init(
    args: InitArgs,
    ctx: &AppContext,
) -> Result<()>
{
    let config_path = args
        .path
        .join(CONFIG_FILE);

    if config_path.exists() && !args.force
    {
        anyhow::bail!(
            "Config file already exists at {}. Use --force to overwrite.",
            config_path.display()
        );
    }

    let config = Config::default();
    let toml_string =
        toml::to_string_pretty(&config).context("Failed to serialize default config")?;

    if ctx.dry_run
    {
        println!("Would create config file at {}", config_path.display());
        return Ok(());
    }

    std::fs::write(&config_path, toml_string).context("Failed to write config file")?;

    if !ctx.quiet
    {
        println!("Created config file at {}", config_path.display());
    }
    Ok(())
}

#[cfg(test)]
mod tests
{
    use super::*;

    #[test]
    fn default_config_round_trips_through_toml()
    {
        let text = toml::to_string_pretty(&Config::default()).unwrap();
        assert!(text.contains("[layout]"));
        assert!(text.contains("gap_policy = \"hoist\""));

        let back: Config = toml::from_str(&text).unwrap();
        assert_eq!(back.layout.rules, default_rule_specs());
        assert_eq!(back.reorder.extractor, ExtractorKind::TreeSitter);
    }

    #[test]
    fn partial_config_fills_defaults()
    {
        let cfg: Config = toml::from_str("[reorder]\nextractor = \"scanner\"\n").unwrap();
        assert_eq!(cfg.reorder.extractor, ExtractorKind::Scanner);
        assert_eq!(cfg.layout.rules.len(), default_rule_specs().len());
        assert!(cfg.is_header(Path::new("a/b.HPP")));
        assert!(cfg.is_source(Path::new("b.cc")));
        assert!(!cfg.is_source(Path::new("b.h")));
    }

    #[test]
    fn cli_gap_policy_overrides_config()
    {
        let cfg = Config::default();
        let args = LayoutArgs {
            gap_policy: Some(GapPolicy::InPlace),
            ..Default::default()
        };
        assert_eq!(
            cfg.layout_rules(&args)
                .unwrap()
                .gap_policy,
            GapPolicy::InPlace
        );
    }
}
