//! Locator abstraction for component selection.
//!
//! A locator is an immutable, serializable predicate over nodes of the remote
//! component tree. It is evaluated remotely: this module only builds locators,
//! describes them for diagnostics, and defines their wire form.
//!
//! ```
//! use remote_fixtures::Locator;
//!
//! let save = Locator::and([Locator::by_type("Button"), Locator::by_text("Save")]);
//! assert_eq!(save.to_string(), "type 'Button' and text == \"Save\"");
//! ```

use regex::Regex;
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::fixture::Fixture;
use crate::result::FixtureResult;
use crate::transport::ComponentId;

/// How a text locator compares its text with a component's text
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TextMatch {
    /// Whole text must be equal
    #[default]
    Exact,
    /// Text must contain the needle
    Contains,
    /// Text must match a regular expression (unanchored)
    Pattern,
}

impl TextMatch {
    /// Compare `actual` against `expected` under this mode.
    ///
    /// # Errors
    ///
    /// Returns the regex error when a `Pattern` does not compile.
    pub fn matches(self, expected: &str, actual: &str) -> Result<bool, regex::Error> {
        Ok(self.compile(expected)?.is_match(actual))
    }

    /// Prepare `expected` once for comparison against many texts.
    ///
    /// # Errors
    ///
    /// Returns the regex error when a `Pattern` does not compile.
    pub fn compile(self, expected: &str) -> Result<TextPredicate, regex::Error> {
        Ok(match self {
            Self::Exact => TextPredicate::Exact(expected.to_string()),
            Self::Contains => TextPredicate::Contains(expected.to_string()),
            Self::Pattern => TextPredicate::Pattern(Regex::new(expected)?),
        })
    }

    const fn operator(self) -> &'static str {
        match self {
            Self::Exact => "==",
            Self::Contains => "contains",
            Self::Pattern => "matches",
        }
    }
}

/// A text comparison with its pattern already compiled
#[derive(Debug, Clone)]
pub enum TextPredicate {
    /// Whole text equality
    Exact(String),
    /// Substring
    Contains(String),
    /// Unanchored regular expression
    Pattern(Regex),
}

impl TextPredicate {
    /// Whether `actual` satisfies the comparison
    #[must_use]
    pub fn is_match(&self, actual: &str) -> bool {
        match self {
            Self::Exact(expected) => actual == expected,
            Self::Contains(needle) => actual.contains(needle.as_str()),
            Self::Pattern(regex) => regex.is_match(actual),
        }
    }
}

/// Predicate selecting nodes of the remote component tree
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(tag = "by", rename_all = "snake_case")]
pub enum Locator {
    /// Every component
    #[default]
    Any,
    /// Components of a widget kind (e.g. "Button")
    Type {
        /// Widget kind
        kind: String,
    },
    /// Components by visible text
    Text {
        /// Text to compare with
        text: String,
        /// Comparison mode
        matching: TextMatch,
    },
    /// Components carrying an attribute value
    Attribute {
        /// Attribute name
        name: String,
        /// Expected value
        value: String,
    },
    /// Structural path: each step is searched among descendants of the
    /// previous step's matches
    Path {
        /// Steps, outermost first
        steps: Vec<Locator>,
    },
    /// XPath expression, evaluated by the remote side only
    #[serde(rename = "xpath")]
    XPath {
        /// Expression
        expression: String,
    },
    /// The component a resolved label is attached to
    LabeledBy {
        /// The label component
        label: ComponentId,
    },
    /// All locators must match the same component
    All {
        /// Conjuncts
        of: Vec<Locator>,
    },
}

impl Locator {
    /// Match every component
    #[must_use]
    pub const fn any() -> Self {
        Self::Any
    }

    /// Match components of a widget kind
    #[must_use]
    pub fn by_type(kind: impl Into<String>) -> Self {
        Self::Type { kind: kind.into() }
    }

    /// Match components whose text equals `text`
    #[must_use]
    pub fn by_text(text: impl Into<String>) -> Self {
        Self::by_text_with(text, TextMatch::Exact)
    }

    /// Match components whose text contains `text`
    #[must_use]
    pub fn by_text_containing(text: impl Into<String>) -> Self {
        Self::by_text_with(text, TextMatch::Contains)
    }

    /// Match components whose text matches a regular expression
    #[must_use]
    pub fn by_text_matching(pattern: impl Into<String>) -> Self {
        Self::by_text_with(pattern, TextMatch::Pattern)
    }

    /// Match components by text with an explicit comparison mode
    #[must_use]
    pub fn by_text_with(text: impl Into<String>, matching: TextMatch) -> Self {
        Self::Text {
            text: text.into(),
            matching,
        }
    }

    /// Match components carrying `name=value`
    #[must_use]
    pub fn by_attribute(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self::Attribute {
            name: name.into(),
            value: value.into(),
        }
    }

    /// Match by XPath, evaluated remotely
    #[must_use]
    pub fn by_xpath(expression: impl Into<String>) -> Self {
        Self::XPath {
            expression: expression.into(),
        }
    }

    /// Match the component `label` describes.
    ///
    /// Anchors a search on a fixture that was itself resolved, e.g. a text
    /// field found through the label next to it. The label is looked up again
    /// on every evaluation, so a label that has gone away stops matching.
    #[must_use]
    pub fn by_label(label: &impl Fixture) -> Self {
        Self::LabeledBy {
            label: label.remote().id(),
        }
    }

    /// Structural path through the tree
    #[must_use]
    pub fn path(steps: impl IntoIterator<Item = Locator>) -> Self {
        Self::Path {
            steps: steps.into_iter().collect(),
        }
    }

    /// Conjunction of locators
    #[must_use]
    pub fn and(of: impl IntoIterator<Item = Locator>) -> Self {
        Self::All {
            of: of.into_iter().collect(),
        }
    }

    /// Narrow this locator with another predicate
    #[must_use]
    pub fn with(self, other: Locator) -> Self {
        match self {
            Self::All { mut of } => {
                of.push(other);
                Self::All { of }
            }
            Self::Any => other,
            first => Self::All {
                of: vec![first, other],
            },
        }
    }

    /// Human description used in diagnostics
    #[must_use]
    pub fn description(&self) -> String {
        self.to_string()
    }

    /// JSON wire form sent to the remote side
    pub fn to_query(&self) -> FixtureResult<String> {
        Ok(serde_json::to_string(self)?)
    }

    /// Parse the JSON wire form
    pub fn from_query(query: &str) -> FixtureResult<Self> {
        Ok(serde_json::from_str(query)?)
    }
}

impl fmt::Display for Locator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Any => write!(f, "any component"),
            Self::Type { kind } => write!(f, "type '{kind}'"),
            Self::Text { text, matching } => write!(f, "text {} {text:?}", matching.operator()),
            Self::Attribute { name, value } => write!(f, "attribute {name}={value:?}"),
            Self::XPath { expression } => write!(f, "xpath {expression}"),
            Self::LabeledBy { label } => write!(f, "labeled by {label}"),
            Self::Path { steps } => write_joined(f, steps, " > "),
            Self::All { of } => write_joined(f, of, " and "),
        }
    }
}

fn write_joined(f: &mut fmt::Formatter<'_>, parts: &[Locator], separator: &str) -> fmt::Result {
    if parts.is_empty() {
        return write!(f, "any component");
    }
    for (i, part) in parts.iter().enumerate() {
        if i > 0 {
            f.write_str(separator)?;
        }
        match part {
            Locator::Path { .. } | Locator::All { .. } => write!(f, "({part})")?,
            _ => write!(f, "{part}")?,
        }
    }
    Ok(())
}
