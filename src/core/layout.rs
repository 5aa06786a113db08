//! Layout rules and the ordering they induce.
//!
//! A rule is a priority plus a conjunction of criteria; a declaration's
//! priority is the minimum over the rules it satisfies. Rule files use the
//! serde-facing `RuleSpec` shape and are compiled once into `LayoutRules`
//! (regexes included) before any file is read.

use std::path::Path;

use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::core::{
    error::EngineError,
    model::{Access, DeclarationRecord, DefinitionRecord},
};

/// Priority for declarations no rule matches: after every configured one
pub const NO_RULE_PRIORITY: i64 = i64::MAX;

/// Where the non-function content goes during reconstruction
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum,
)]
#[serde(rename_all = "snake_case")]
pub enum GapPolicy {
    /// Leading gap first, then all functions, then the remaining gaps
    #[default]
    Hoist,
    /// Gaps stay put; function slots are refilled in sorted order
    InPlace,
}

/// Rule criteria as written in a layout file
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CriteriaSpec {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub access: Option<Access>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub is_static: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub class: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub namespace: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name_pattern: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub special_member: Option<bool>,
}

/// One rule as written in a layout file
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RuleSpec {
    pub priority: i64,
    #[serde(default)]
    pub criteria: CriteriaSpec,
}

/// Top-level shape of a `--config` layout file
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct LayoutFile {
    pub rules: Vec<RuleSpec>,
    #[serde(default)]
    pub gap_policy: Option<GapPolicy>,
}

/// A single compiled predicate
#[derive(Debug, Clone)]
pub enum Criterion {
    Access(Access),
    IsStatic(bool),
    Class(String),
    Namespace(String),
    NamePattern(Regex),
    SpecialMember(bool),
}

impl Criterion {
    pub fn matches(&self, decl: &DeclarationRecord) -> bool {
        match self {
            Criterion::Access(a) => decl.access == *a,
            Criterion::IsStatic(s) => decl.is_static == *s,
            Criterion::Class(c) => decl.owning_class.as_deref() == Some(c.as_str()),
            Criterion::Namespace(n) => decl.namespace_path.as_deref() == Some(n.as_str()),
            Criterion::NamePattern(re) => re.is_match(&decl.simple_name),
            Criterion::SpecialMember(s) => decl.is_special_member() == *s,
        }
    }
}

/// Compiled rule: all criteria must hold
#[derive(Debug, Clone)]
pub struct LayoutRule {
    pub priority: i64,
    pub criteria: Vec<Criterion>,
}

impl LayoutRule {
    pub fn compile(spec: &RuleSpec) -> Result<Self, EngineError> {
        let c = &spec.criteria;
        let mut criteria = Vec::new();

        if let Some(access) = c.access {
            criteria.push(Criterion::Access(access));
        }
        if let Some(is_static) = c.is_static {
            criteria.push(Criterion::IsStatic(is_static));
        }
        if let Some(class) = &c.class {
            criteria.push(Criterion::Class(class.clone()));
        }
        if let Some(ns) = &c.namespace {
            criteria.push(Criterion::Namespace(ns.clone()));
        }
        if let Some(pattern) = &c.name_pattern {
            let re = Regex::new(pattern).map_err(|e| {
                EngineError::Config(format!(
                    "rule with priority {}: bad name_pattern `{pattern}`: {e}",
                    spec.priority
                ))
            })?;
            criteria.push(Criterion::NamePattern(re));
        }
        if let Some(special) = c.special_member {
            criteria.push(Criterion::SpecialMember(special));
        }

        Ok(Self {
            priority: spec.priority,
            criteria,
        })
    }

    pub fn matches(&self, decl: &DeclarationRecord) -> bool {
        self.criteria.iter().all(|c| c.matches(decl))
    }
}

/// Rule set plus gap policy, immutable after construction
#[derive(Debug, Clone)]
pub struct LayoutRules {
    rules: Vec<LayoutRule>,
    pub gap_policy: GapPolicy,
}

impl Default for LayoutRules {
    fn default() -> Self {
        // Compiling the built-ins cannot fail: no patterns
        let rules = default_rule_specs()
            .iter()
            .filter_map(|spec| LayoutRule::compile(spec).ok())
            .collect();
        Self {
            rules,
            gap_policy: GapPolicy::default(),
        }
    }
}

impl LayoutRules {
    /// Compile rule specs in configuration order
    pub fn from_specs(specs: &[RuleSpec], gap_policy: GapPolicy) -> Result<Self, EngineError> {
        let rules = specs
            .iter()
            .map(LayoutRule::compile)
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self { rules, gap_policy })
    }

    /// Read a JSON, TOML or YAML layout file (chosen by extension)
    pub fn load(path: &Path) -> Result<Self, EngineError> {
        let fail = |e: &dyn std::fmt::Display| EngineError::Config(format!("{}: {e}", path.display()));

        let ext = path
            .extension()
            .and_then(|e| e.to_str())
            .map(str::to_ascii_lowercase);

        let file: LayoutFile = match ext.as_deref() {
            Some("json") | Some("toml") => {
                let text = std::fs::read_to_string(path).map_err(|e| fail(&e))?;
                if ext.as_deref() == Some("json") {
                    serde_json::from_str(&text).map_err(|e| fail(&e))?
                } else {
                    toml::from_str(&text).map_err(|e| fail(&e))?
                }
            }
            // YAML and friends go through the config crate's format detection
            _ => config::Config::builder()
                .add_source(config::File::from(path))
                .build()
                .and_then(|c| c.try_deserialize())
                .map_err(|e| fail(&e))?,
        };

        Self::from_specs(&file.rules, file.gap_policy.unwrap_or_default())
    }

    pub fn rules(&self) -> &[LayoutRule] {
        &self.rules
    }

    pub fn with_gap_policy(mut self, gap_policy: GapPolicy) -> Self {
        self.gap_policy = gap_policy;
        self
    }
}

/// Built-in rules: public before protected before private before free
/// functions; constructors/destructors, then statics, first in each bucket
pub fn default_rule_specs() -> Vec<RuleSpec> {
    let mut specs = Vec::new();
    for (base, access) in [(10, Access::Public), (20, Access::Protected), (30, Access::Private)] {
        specs.push(RuleSpec {
            priority: base,
            criteria: CriteriaSpec {
                access: Some(access),
                special_member: Some(true),
                ..Default::default()
            },
        });
        specs.push(RuleSpec {
            priority: base + 1,
            criteria: CriteriaSpec {
                access: Some(access),
                is_static: Some(true),
                ..Default::default()
            },
        });
        specs.push(RuleSpec {
            priority: base + 2,
            criteria: CriteriaSpec {
                access: Some(access),
                ..Default::default()
            },
        });
    }
    specs.push(RuleSpec {
        priority: 40,
        criteria: CriteriaSpec {
            access: Some(Access::None),
            is_static: Some(true),
            ..Default::default()
        },
    });
    specs.push(RuleSpec {
        priority: 41,
        criteria: CriteriaSpec {
            access: Some(Access::None),
            ..Default::default()
        },
    });
    specs
}

/// Sort key: rule priority, then header position
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub struct OrderKey {
    pub priority: i64,
    pub tiebreak: usize,
}

pub fn order_key(decl: &DeclarationRecord, rules: &LayoutRules) -> OrderKey {
    let priority = rules
        .rules
        .iter()
        .filter(|r| r.matches(decl))
        .map(|r| r.priority)
        .min()
        .unwrap_or(NO_RULE_PRIORITY);

    OrderKey {
        priority,
        tiebreak: decl.header_order_index,
    }
}

/// Stable sort of matched definitions by `(priority, header index)`.
/// Unmatched definitions sort last, keeping their relative order.
pub fn sort_definitions(definitions: &mut [DefinitionRecord], rules: &LayoutRules) {
    definitions.sort_by_cached_key(|def| match &def.matched_declaration {
        Some(decl) => order_key(decl, rules),
        None => OrderKey {
            priority: i64::MAX,
            tiebreak: usize::MAX,
        },
    });
}
