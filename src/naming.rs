//! Naming policies that turn a field name into a candidate column name.
//!
//! A [`NamingPolicies`] chain is tried in registration order: the first
//! policy whose output matches something wins. The same chain type drives
//! header resolution (field name → column) and enumeration matching (cell
//! text → member name).
//!
//! Every policy is total and maps an empty name to an empty name.

use std::{borrow::Cow, fmt, str::FromStr, sync::Arc};

use anyhow::{Result, anyhow};
use heck::{ToKebabCase, ToLowerCamelCase, ToSnakeCase};
use regex::Regex;

pub type PolicyFn = Arc<dyn Fn(&str) -> String + Send + Sync>;

#[derive(Clone)]
pub enum NamingPolicy {
    Exact,
    PascalToSnake,
    SnakeToPascal,
    SuppressSpaces,
    SuppressAndCapitalize,
    SnakeCase,
    KebabCase,
    LowerCamelCase,
    Replace { pattern: Regex, replacement: String },
    Custom(PolicyFn),
}

impl NamingPolicy {
    pub fn custom<F>(policy: F) -> Self
    where
        F: Fn(&str) -> String + Send + Sync + 'static,
    {
        NamingPolicy::Custom(Arc::new(policy))
    }

    pub fn replace(pattern: &str, replacement: impl Into<String>) -> Result<Self> {
        let pattern =
            Regex::new(pattern).map_err(|err| anyhow!("Invalid policy pattern '{pattern}': {err}"))?;
        Ok(NamingPolicy::Replace {
            pattern,
            replacement: replacement.into(),
        })
    }

    /// Built-in policies, in the order the CLI lists them.
    pub fn builtins() -> Vec<NamingPolicy> {
        vec![
            NamingPolicy::Exact,
            NamingPolicy::PascalToSnake,
            NamingPolicy::SnakeToPascal,
            NamingPolicy::SuppressSpaces,
            NamingPolicy::SuppressAndCapitalize,
            NamingPolicy::SnakeCase,
            NamingPolicy::KebabCase,
            NamingPolicy::LowerCamelCase,
        ]
    }

    pub fn apply<'a>(&self, name: &'a str) -> Cow<'a, str> {
        if name.is_empty() {
            return Cow::Borrowed(name);
        }
        match self {
            NamingPolicy::Exact => exact(name),
            NamingPolicy::PascalToSnake => pascal_to_snake(name),
            NamingPolicy::SnakeToPascal => snake_to_pascal(name),
            NamingPolicy::SuppressSpaces => suppress_spaces(name),
            NamingPolicy::SuppressAndCapitalize => suppress_and_capitalize(name),
            NamingPolicy::SnakeCase => reuse_if_unchanged(name, name.to_snake_case()),
            NamingPolicy::KebabCase => reuse_if_unchanged(name, name.to_kebab_case()),
            NamingPolicy::LowerCamelCase => reuse_if_unchanged(name, name.to_lower_camel_case()),
            NamingPolicy::Replace {
                pattern,
                replacement,
            } => pattern.replace_all(name, replacement.as_str()),
            NamingPolicy::Custom(policy) => Cow::Owned(policy(name)),
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            NamingPolicy::Exact => "exact",
            NamingPolicy::PascalToSnake => "pascal-to-snake",
            NamingPolicy::SnakeToPascal => "snake-to-pascal",
            NamingPolicy::SuppressSpaces => "suppress-spaces",
            NamingPolicy::SuppressAndCapitalize => "suppress-capitalize",
            NamingPolicy::SnakeCase => "snake",
            NamingPolicy::KebabCase => "kebab",
            NamingPolicy::LowerCamelCase => "lower-camel",
            NamingPolicy::Replace { .. } => "replace",
            NamingPolicy::Custom(_) => "custom",
        }
    }
}

impl fmt::Debug for NamingPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            NamingPolicy::Replace {
                pattern,
                replacement,
            } => f
                .debug_struct("Replace")
                .field("pattern", &pattern.as_str())
                .field("replacement", replacement)
                .finish(),
            other => f.write_str(other.label()),
        }
    }
}

impl fmt::Display for NamingPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for NamingPolicy {
    type Err = anyhow::Error;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let normalized = value.trim().to_ascii_lowercase().replace('_', "-");
        match normalized.as_str() {
            "exact" | "exact-match" => Ok(NamingPolicy::Exact),
            "pascal-to-snake" | "pascal-to-snake-case" => Ok(NamingPolicy::PascalToSnake),
            "snake-to-pascal" | "snake-case-to-pascal" => Ok(NamingPolicy::SnakeToPascal),
            "suppress-spaces" => Ok(NamingPolicy::SuppressSpaces),
            "suppress-capitalize" | "suppress-capitalise" | "suppress-and-capitalize" => {
                Ok(NamingPolicy::SuppressAndCapitalize)
            }
            "snake" | "snake-case" => Ok(NamingPolicy::SnakeCase),
            "kebab" | "kebab-case" => Ok(NamingPolicy::KebabCase),
            "lower-camel" | "camel" | "lower-camel-case" => Ok(NamingPolicy::LowerCamelCase),
            _ => Err(anyhow!(
                "Unknown naming policy '{value}'. Supported policies: {}",
                NamingPolicy::builtins()
                    .iter()
                    .map(NamingPolicy::label)
                    .collect::<Vec<_>>()
                    .join(", ")
            )),
        }
    }
}

/// Ordered chain of naming policies. A fresh chain holds only [`NamingPolicy::Exact`].
#[derive(Debug, Clone)]
pub struct NamingPolicies {
    policies: Vec<NamingPolicy>,
}

impl Default for NamingPolicies {
    fn default() -> Self {
        Self::new()
    }
}

impl NamingPolicies {
    pub fn new() -> Self {
        Self {
            policies: vec![NamingPolicy::Exact],
        }
    }

    /// Replaces the whole chain with a single policy.
    pub fn with_policy(mut self, policy: NamingPolicy) -> Self {
        self.policies.clear();
        self.policies.push(policy);
        self
    }

    pub fn add_policy(mut self, policy: NamingPolicy) -> Self {
        self.policies.push(policy);
        self
    }

    pub fn iter(&self) -> std::slice::Iter<'_, NamingPolicy> {
        self.policies.iter()
    }

    pub fn len(&self) -> usize {
        self.policies.len()
    }

    pub fn is_empty(&self) -> bool {
        self.policies.is_empty()
    }

    /// Candidate names for `name`, one per policy, in chain order.
    pub fn candidates<'a>(&'a self, name: &'a str) -> impl Iterator<Item = Cow<'a, str>> + 'a {
        self.policies.iter().map(move |policy| policy.apply(name))
    }

    /// Returns the first lookup hit over the chain's candidates for `name`.
    pub fn first_match<R>(&self, name: &str, mut lookup: impl FnMut(&str) -> Option<R>) -> Option<R> {
        self.candidates(name)
            .find_map(|candidate| lookup(candidate.as_ref()))
    }
}

impl From<Vec<NamingPolicy>> for NamingPolicies {
    fn from(policies: Vec<NamingPolicy>) -> Self {
        if policies.is_empty() {
            return Self::new();
        }
        Self { policies }
    }
}

impl<'a> IntoIterator for &'a NamingPolicies {
    type Item = &'a NamingPolicy;
    type IntoIter = std::slice::Iter<'a, NamingPolicy>;

    fn into_iter(self) -> Self::IntoIter {
        self.policies.iter()
    }
}

pub fn exact(input: &str) -> Cow<'_, str> {
    Cow::Borrowed(input)
}

/// `TimeOfDay` → `time_of_day`: every ASCII uppercase letter is lowercased and,
/// except at position 0, prefixed with `_`.
pub fn pascal_to_snake(input: &str) -> Cow<'_, str> {
    if !input.chars().any(|ch| ch.is_ascii_uppercase()) {
        return Cow::Borrowed(input);
    }
    let mut converted = String::with_capacity(input.len() + 4);
    for (idx, ch) in input.char_indices() {
        if ch.is_ascii_uppercase() {
            if idx > 0 {
                converted.push('_');
            }
            converted.push(ch.to_ascii_lowercase());
        } else {
            converted.push(ch);
        }
    }
    Cow::Owned(converted)
}

/// `coffee_with_milk` → `CoffeeWithMilk`: the first letter and every lowercase
/// letter following an underscore are uppercased, dropping that underscore.
pub fn snake_to_pascal(input: &str) -> Cow<'_, str> {
    let mut chars = input.chars().peekable();
    let mut converted = String::with_capacity(input.len());
    if let Some(first) = chars.next() {
        converted.push(first.to_ascii_uppercase());
    }
    while let Some(ch) = chars.next() {
        match (ch, chars.peek()) {
            ('_', Some(next)) if next.is_ascii_lowercase() => {
                converted.push(next.to_ascii_uppercase());
                chars.next();
            }
            _ => converted.push(ch),
        }
    }
    reuse_if_unchanged(input, converted)
}

pub fn suppress_spaces(input: &str) -> Cow<'_, str> {
    if !input.chars().any(char::is_whitespace) {
        return Cow::Borrowed(input);
    }
    Cow::Owned(input.chars().filter(|ch| !ch.is_whitespace()).collect())
}

/// `Americano with Milk` → `AmericanoWithMilk`. Words written entirely in
/// uppercase are kept as they are.
pub fn suppress_and_capitalize(input: &str) -> Cow<'_, str> {
    let converted = input
        .split_whitespace()
        .map(title_case_word)
        .collect::<String>();
    reuse_if_unchanged(input, converted)
}

fn title_case_word(word: &str) -> String {
    let has_lowercase = word.chars().any(char::is_lowercase);
    if !has_lowercase {
        return word.to_string();
    }
    let mut chars = word.chars();
    match chars.next() {
        Some(first) => first
            .to_uppercase()
            .chain(chars.flat_map(char::to_lowercase))
            .collect(),
        None => String::new(),
    }
}

fn reuse_if_unchanged(input: &str, converted: String) -> Cow<'_, str> {
    if converted == input {
        Cow::Borrowed(input)
    } else {
        Cow::Owned(converted)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pascal_to_snake_splits_on_uppercase() {
        assert_eq!(pascal_to_snake("CardType"), "card_type");
        assert_eq!(pascal_to_snake("TimeOfDay"), "time_of_day");
        assert!(matches!(pascal_to_snake("already_snake"), Cow::Borrowed(_)));
    }

    #[test]
    fn snake_to_pascal_joins_words() {
        assert_eq!(snake_to_pascal("card_type"), "CardType");
        assert_eq!(snake_to_pascal("coffee_with_milk"), "CoffeeWithMilk");
        assert_eq!(snake_to_pascal("item_2"), "Item_2");
    }

    #[test]
    fn suppress_policies_remove_whitespace() {
        assert_eq!(suppress_spaces("Societe Generale"), "SocieteGenerale");
        assert_eq!(suppress_spaces("Double Expresso"), "DoubleExpresso");
        assert_eq!(suppress_and_capitalize("societe generale"), "SocieteGenerale");
        assert_eq!(
            suppress_and_capitalize("Americano with Milk"),
            "AmericanoWithMilk"
        );
        assert_eq!(suppress_and_capitalize("NASA launch"), "NASALaunch");
    }

    #[test]
    fn every_builtin_keeps_empty_names_empty() {
        let mut policies = NamingPolicy::builtins();
        policies.push(NamingPolicy::replace("^", "x").unwrap());
        policies.push(NamingPolicy::custom(|_| "constant".to_string()));
        for policy in policies {
            assert_eq!(policy.apply(""), "", "policy {policy} altered an empty name");
        }
    }

    #[test]
    fn fresh_chain_is_exact_only() {
        let chain = NamingPolicies::new();
        assert_eq!(chain.len(), 1);
        assert!(matches!(chain.iter().next(), Some(NamingPolicy::Exact)));
    }

    #[test]
    fn with_policy_replaces_and_add_policy_appends() {
        let chain = NamingPolicies::new()
            .add_policy(NamingPolicy::PascalToSnake)
            .with_policy(NamingPolicy::SnakeCase)
            .add_policy(NamingPolicy::KebabCase);
        let labels = chain.iter().map(NamingPolicy::label).collect::<Vec<_>>();
        assert_eq!(labels, vec!["snake", "kebab"]);
    }

    #[test]
    fn first_match_stops_at_first_hit() {
        let chain = NamingPolicies::new()
            .add_policy(NamingPolicy::PascalToSnake)
            .add_policy(NamingPolicy::KebabCase);
        let columns = ["time-of-day", "time_of_day"];
        let hit = chain.first_match("TimeOfDay", |candidate| {
            columns.iter().position(|column| *column == candidate)
        });
        assert_eq!(hit, Some(1));
    }

    #[test]
    fn policy_names_parse_case_insensitively() {
        assert!(matches!(
            "Pascal_To_Snake".parse::<NamingPolicy>().unwrap(),
            NamingPolicy::PascalToSnake
        ));
        assert!("shout".parse::<NamingPolicy>().is_err());
    }
}
