use regex::{Regex, RegexBuilder};

use crate::config::{CanonicalRule, FieldRules, MatchKind};
use crate::error::{CleanerError, Result};

/// Rewrites a categorical value to its canonical spelling
pub trait Canonicalizer: Send + Sync {
    /// Returns the canonical form, or `None` when the value is left as is
    fn canonicalize(&self, value: &str) -> Option<String>;
}

/// One compiled pattern-to-replacement rule
#[derive(Debug, Clone)]
pub struct CompiledRule {
    matcher: Matcher,
    replacement: String,
}

#[derive(Debug, Clone)]
enum Matcher {
    Prefix(String),
    Suffix(String),
    Exact(String),
    Contains(String),
    /// Lowercased pattern, compared against the lowercased value
    Folded(MatchKind, String),
    Regex(Regex),
}

impl CompiledRule {
    pub fn compile(rule: &CanonicalRule) -> Result<Self> {
        let matcher = match (rule.kind, rule.case_insensitive) {
            (MatchKind::Regex, case_insensitive) => {
                let regex = RegexBuilder::new(&rule.pattern)
                    .case_insensitive(case_insensitive)
                    .build()
                    .map_err(|e| CleanerError::Config(format!("bad regex '{}': {}", rule.pattern, e)))?;
                Matcher::Regex(regex)
            }
            (kind, true) => Matcher::Folded(kind, rule.pattern.to_lowercase()),
            (MatchKind::Prefix, false) => Matcher::Prefix(rule.pattern.clone()),
            (MatchKind::Suffix, false) => Matcher::Suffix(rule.pattern.clone()),
            (MatchKind::Exact, false) => Matcher::Exact(rule.pattern.clone()),
            (MatchKind::Contains, false) => Matcher::Contains(rule.pattern.clone()),
        };

        Ok(Self {
            matcher,
            replacement: rule.replacement.clone(),
        })
    }

    pub fn matches(&self, value: &str) -> bool {
        match &self.matcher {
            Matcher::Prefix(p) => value.starts_with(p.as_str()),
            Matcher::Suffix(p) => value.ends_with(p.as_str()),
            Matcher::Exact(p) => value == p,
            Matcher::Contains(p) => value.contains(p.as_str()),
            Matcher::Folded(kind, p) => {
                let folded = value.to_lowercase();
                match kind {
                    MatchKind::Prefix => folded.starts_with(p.as_str()),
                    MatchKind::Suffix => folded.ends_with(p.as_str()),
                    MatchKind::Exact => folded == *p,
                    MatchKind::Contains | MatchKind::Regex => folded.contains(p.as_str()),
                }
            }
            Matcher::Regex(regex) => regex.is_match(value),
        }
    }
}

/// Ordered rules for one field, plus optional trailing-character stripping
#[derive(Debug, Clone, Default)]
pub struct RuleTable {
    strip_trailing: Vec<char>,
    rules: Vec<CompiledRule>,
}

impl RuleTable {
    pub fn compile(config: &FieldRules) -> Result<Self> {
        let rules = config
            .rules
            .iter()
            .map(CompiledRule::compile)
            .collect::<Result<Vec<_>>>()?;

        Ok(Self {
            strip_trailing: config
                .strip_trailing
                .as_deref()
                .map(|chars| chars.chars().collect())
                .unwrap_or_default(),
            rules,
        })
    }
}

impl Canonicalizer for RuleTable {
    fn canonicalize(&self, value: &str) -> Option<String> {
        let stripped = value
            .trim_end_matches(|c: char| self.strip_trailing.contains(&c))
            .trim();

        let canonical = self
            .rules
            .iter()
            .find(|rule| rule.matches(stripped))
            .map(|rule| rule.replacement.as_str())
            .unwrap_or(stripped);

        (canonical != value).then(|| canonical.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn table(strip: Option<&str>, rules: Vec<CanonicalRule>) -> RuleTable {
        RuleTable::compile(&FieldRules {
            strip_trailing: strip.map(str::to_string),
            rules,
        })
        .unwrap()
    }

    #[test]
    fn prefix_rule_absorbs_variants() {
        let industry = table(None, vec![CanonicalRule::new(MatchKind::Prefix, "Crypto", "Crypto")]);

        assert_eq!(industry.canonicalize("Crypto Currency").as_deref(), Some("Crypto"));
        assert_eq!(industry.canonicalize("CryptoCurrency").as_deref(), Some("Crypto"));
        assert_eq!(industry.canonicalize("Crypto"), None);
        assert_eq!(industry.canonicalize("crypto"), None);
    }

    #[test]
    fn case_insensitive_rules_fold_case() {
        let mut rule = CanonicalRule::new(MatchKind::Prefix, "Crypto", "Crypto");
        rule.case_insensitive = true;
        let industry = table(None, vec![rule]);

        assert_eq!(industry.canonicalize("crypto assets").as_deref(), Some("Crypto"));
    }

    #[test]
    fn first_matching_rule_wins() {
        let location = table(
            None,
            vec![
                CanonicalRule::new(MatchKind::Suffix, "sseldorf", "Dusseldorf"),
                CanonicalRule::new(MatchKind::Contains, "ssel", "Brussels"),
            ],
        );
        assert_eq!(location.canonicalize("Düsseldorf").as_deref(), Some("Dusseldorf"));
        assert_eq!(location.canonicalize("Brussels"), None);
        assert_eq!(location.canonicalize("Bruxssel").as_deref(), Some("Brussels"));
    }

    #[test]
    fn exact_rule_needs_the_whole_value() {
        let location = table(None, vec![CanonicalRule::new(MatchKind::Exact, "Ferdericton", "Fredericton")]);
        assert_eq!(location.canonicalize("Ferdericton").as_deref(), Some("Fredericton"));
        assert_eq!(location.canonicalize("Ferdericton North"), None);
    }

    #[test]
    fn trailing_characters_are_stripped_before_matching() {
        let country = table(
            Some("."),
            vec![CanonicalRule::new(MatchKind::Prefix, "United States", "United States")],
        );

        assert_eq!(country.canonicalize("United States.").as_deref(), Some("United States"));
        assert_eq!(country.canonicalize("United States of America").as_deref(), Some("United States"));
        assert_eq!(country.canonicalize("Canada..").as_deref(), Some("Canada"));
        assert_eq!(country.canonicalize("Canada"), None);
    }

    #[test]
    fn regex_rule_rewrites_matching_values() {
        let mut rule = CanonicalRule::new(MatchKind::Regex, r"^(UK|U\.K\.)$", "United Kingdom");
        rule.case_insensitive = true;
        let country = table(None, vec![rule]);

        assert_eq!(country.canonicalize("uk").as_deref(), Some("United Kingdom"));
        assert_eq!(country.canonicalize("Ukraine"), None);
    }
}
