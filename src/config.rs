//! Cleaning configuration: rule tables, date format, duplicate key and rank
//! criteria. Every section is optional; omitted sections fall back to the
//! defaults below, which reproduce the reference cleaning of the layoffs
//! dataset.

use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fs;
use std::path::Path;

use crate::constants::{DEFAULT_DATE_FORMAT, DEFAULT_NULL_MARKER};
use crate::domain::Field;
use crate::error::{CleanerError, Result};

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct CleaningConfig {
    pub input: InputConfig,
    pub dates: DateConfig,
    pub dedup: DedupConfig,
    pub normalize: NormalizeConfig,
    pub output: OutputConfig,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct InputConfig {
    /// Cells exactly equal to one of these are loaded as nulls
    pub null_markers: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct DateConfig {
    /// chrono strftime layout of the raw date column
    pub format: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct DedupConfig {
    /// Fields that together identify one logical event
    pub key: Vec<Field>,
    /// Preference order inside a duplicate group, most significant first
    pub rank: Vec<RankCriterion>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RankCriterion {
    pub field: Field,
    pub order: RankOrder,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RankOrder {
    /// Non-null, non-blank values before null/blank ones
    PresentFirst,
    /// Larger values first, nulls last
    Descending,
    /// Smaller values first, nulls last
    Ascending,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct NormalizeConfig {
    pub industry: FieldRules,
    pub location: FieldRules,
    pub country: FieldRules,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct FieldRules {
    /// Characters removed from the end of the value before rules apply
    pub strip_trailing: Option<String>,
    /// Applied in order; the first match wins
    pub rules: Vec<CanonicalRule>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CanonicalRule {
    #[serde(rename = "match")]
    pub kind: MatchKind,
    pub pattern: String,
    pub replacement: String,
    #[serde(default)]
    pub case_insensitive: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MatchKind {
    Prefix,
    Suffix,
    Exact,
    Contains,
    Regex,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct OutputConfig {
    /// Write the date/company/country/industry lookup sidecar next to the table
    pub write_indexes: bool,
}

impl Default for InputConfig {
    fn default() -> Self {
        Self {
            null_markers: vec![DEFAULT_NULL_MARKER.to_string()],
        }
    }
}

impl Default for DateConfig {
    fn default() -> Self {
        Self {
            format: DEFAULT_DATE_FORMAT.to_string(),
        }
    }
}

impl Default for DedupConfig {
    fn default() -> Self {
        Self {
            key: Field::ALL.to_vec(),
            rank: vec![
                RankCriterion { field: Field::Industry, order: RankOrder::PresentFirst },
                RankCriterion { field: Field::TotalLaidOff, order: RankOrder::PresentFirst },
                RankCriterion { field: Field::PercentageLaidOff, order: RankOrder::PresentFirst },
                RankCriterion { field: Field::FundsRaisedMillions, order: RankOrder::Descending },
                RankCriterion { field: Field::Date, order: RankOrder::Descending },
            ],
        }
    }
}

impl Default for NormalizeConfig {
    fn default() -> Self {
        Self {
            industry: FieldRules {
                strip_trailing: None,
                rules: vec![CanonicalRule::new(MatchKind::Prefix, "Crypto", "Crypto")],
            },
            location: FieldRules {
                strip_trailing: None,
                rules: vec![
                    CanonicalRule::new(MatchKind::Suffix, "sseldorf", "Dusseldorf"),
                    CanonicalRule::new(MatchKind::Prefix, "Florian", "Florianapolis"),
                    CanonicalRule::new(MatchKind::Exact, "Ferdericton", "Fredericton"),
                    CanonicalRule::new(MatchKind::Prefix, "Malm", "Malmo"),
                ],
            },
            country: FieldRules {
                strip_trailing: Some(".".to_string()),
                rules: vec![CanonicalRule::new(MatchKind::Prefix, "United States", "United States")],
            },
        }
    }
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self { write_indexes: true }
    }
}

impl CanonicalRule {
    pub fn new(kind: MatchKind, pattern: &str, replacement: &str) -> Self {
        Self {
            kind,
            pattern: pattern.to_string(),
            replacement: replacement.to_string(),
            case_insensitive: false,
        }
    }
}

impl CleaningConfig {
    /// Load a config file. A missing file is an error; use `Default` for built-ins.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let content = fs::read_to_string(path).map_err(|e| {
            CleanerError::Config(format!("Failed to read config file '{}': {}", path.display(), e))
        })?;
        Self::from_toml_str(&content)
    }

    pub fn from_toml_str(content: &str) -> Result<Self> {
        let config: CleaningConfig = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    pub fn to_toml_string(&self) -> Result<String> {
        toml::to_string_pretty(self).map_err(|e| CleanerError::Config(e.to_string()))
    }

    /// Reject configurations the pipeline cannot run deterministically with
    pub fn validate(&self) -> Result<()> {
        if self.dedup.key.is_empty() {
            return Err(CleanerError::Config("dedup.key must name at least one field".to_string()));
        }

        let mut seen = HashSet::new();
        for field in &self.dedup.key {
            if !seen.insert(field) {
                return Err(CleanerError::Config(format!("dedup.key lists '{}' twice", field)));
            }
        }

        let mut seen = HashSet::new();
        for criterion in &self.dedup.rank {
            if !seen.insert(criterion.field) {
                return Err(CleanerError::Config(format!(
                    "dedup.rank lists '{}' twice",
                    criterion.field
                )));
            }
        }

        if self.dates.format.trim().is_empty() {
            return Err(CleanerError::Config("dates.format must not be empty".to_string()));
        }
        let has_bad_item = chrono::format::StrftimeItems::new(&self.dates.format)
            .any(|item| matches!(item, chrono::format::Item::Error));
        if has_bad_item {
            return Err(CleanerError::Config(format!(
                "dates.format '{}' is not a valid strftime layout",
                self.dates.format
            )));
        }

        for (field, rules) in self.normalize.by_field() {
            for rule in &rules.rules {
                if rule.pattern.is_empty() {
                    return Err(CleanerError::Config(format!(
                        "normalize.{} has a rule with an empty pattern",
                        field
                    )));
                }
                if rule.kind == MatchKind::Regex {
                    regex::Regex::new(&rule.pattern).map_err(|e| {
                        CleanerError::Config(format!("normalize.{}: bad regex '{}': {}", field, rule.pattern, e))
                    })?;
                }
            }
        }

        Ok(())
    }
}

impl NormalizeConfig {
    pub fn by_field(&self) -> [(Field, &FieldRules); 3] {
        [
            (Field::Industry, &self.industry),
            (Field::Location, &self.location),
            (Field::Country, &self.country),
        ]
    }
}
