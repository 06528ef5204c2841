use regex::{Regex, RegexBuilder};
use serde::{Deserialize, Serialize};

/// Default per-step timeout when neither the step nor the suite overrides it
pub const DEFAULT_TIMEOUT_MS: u64 = 10000;

/// Default timeout for skip probes (short on purpose: absence is the common case)
pub const DEFAULT_PROBE_TIMEOUT_MS: u64 = 3000;

/// A single candidate query expression inside a selector strategy.
///
/// Compact string form used in YAML: `css=...` (also the bare default),
/// `text=...`, `pattern=/.../i`, `placeholder=...`, `role=...`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Locator {
    /// CSS selector
    Css(String),
    /// Exact visible text
    Text(String),
    /// Regex pattern on visible text
    TextPattern(String),
    /// Input placeholder attribute
    Placeholder(String),
    /// ARIA role
    Role(String),
}

impl Locator {
    pub fn parse(raw: &str) -> Self {
        let raw = raw.trim();
        if let Some(rest) = raw.strip_prefix("text=") {
            Locator::Text(rest.to_string())
        } else if let Some(rest) = raw.strip_prefix("pattern=") {
            Locator::TextPattern(rest.to_string())
        } else if let Some(rest) = raw.strip_prefix("placeholder=") {
            Locator::Placeholder(rest.to_string())
        } else if let Some(rest) = raw.strip_prefix("role=") {
            Locator::Role(rest.to_string())
        } else if let Some(rest) = raw.strip_prefix("css=") {
            Locator::Css(rest.to_string())
        } else {
            Locator::Css(raw.to_string())
        }
    }
}

impl std::fmt::Display for Locator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Locator::Css(s) => write!(f, "css={}", s),
            Locator::Text(s) => write!(f, "text={}", s),
            Locator::TextPattern(s) => write!(f, "pattern={}", s),
            Locator::Placeholder(s) => write!(f, "placeholder={}", s),
            Locator::Role(s) => write!(f, "role={}", s),
        }
    }
}

/// Ordered list of candidate locators. First visible match wins; candidates
/// earlier in the list are preferred when several are visible at once.
/// Immutable once parsed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "StrategyInput", into = "Vec<String>")]
pub struct SelectorStrategy {
    pub candidates: Vec<Locator>,
}

impl SelectorStrategy {
    pub fn new(candidates: Vec<Locator>) -> Self {
        Self { candidates }
    }
}

impl std::fmt::Display for SelectorStrategy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let parts: Vec<String> = self.candidates.iter().map(|c| c.to_string()).collect();
        write!(f, "[{}]", parts.join(" | "))
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum StrategyInput {
    Single(String),
    Many(Vec<String>),
}

impl From<StrategyInput> for SelectorStrategy {
    fn from(input: StrategyInput) -> Self {
        let raw = match input {
            StrategyInput::Single(s) => vec![s],
            StrategyInput::Many(v) => v,
        };
        SelectorStrategy {
            candidates: raw.iter().map(|s| Locator::parse(s)).collect(),
        }
    }
}

impl From<SelectorStrategy> for Vec<String> {
    fn from(strategy: SelectorStrategy) -> Self {
        strategy.candidates.iter().map(|c| c.to_string()).collect()
    }
}

/// A compiled text pattern: `/regex/` with an optional `i` flag, or a plain
/// string treated as a case-insensitive substring.
#[derive(Debug, Clone)]
pub struct TextPattern {
    raw: String,
    regex: Regex,
}

impl TextPattern {
    pub fn new(raw: &str) -> Result<Self, regex::Error> {
        let (body, case_insensitive) = if let Some(stripped) = raw.strip_prefix('/') {
            if let Some(body) = stripped.strip_suffix("/i") {
                (body.to_string(), true)
            } else if let Some(body) = stripped.strip_suffix('/') {
                (body.to_string(), false)
            } else {
                (regex::escape(raw), true)
            }
        } else {
            (regex::escape(raw), true)
        };

        let regex = RegexBuilder::new(&body)
            .case_insensitive(case_insensitive)
            .build()?;

        Ok(Self {
            raw: raw.to_string(),
            regex,
        })
    }

    pub fn is_match(&self, haystack: &str) -> bool {
        self.regex.is_match(haystack)
    }

    pub fn as_str(&self) -> &str {
        &self.raw
    }
}

impl PartialEq for TextPattern {
    fn eq(&self, other: &Self) -> bool {
        self.raw == other.raw
    }
}

impl std::fmt::Display for TextPattern {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.raw)
    }
}

impl Serialize for TextPattern {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.raw)
    }
}

impl<'de> Deserialize<'de> for TextPattern {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        TextPattern::new(&raw).map_err(serde::de::Error::custom)
    }
}

fn default_true() -> bool {
    true
}

/// A single user action within a scenario. Steps never mutate after parsing.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Step {
    Navigate(NavigateInput),
    Fill(FillParams),
    Click(ClickInput),
    WaitForText(WaitForTextInput),
    WaitForUrlChange(WaitForUrlInput),
}

impl Step {
    /// Human-readable label for events and reports
    pub fn display_name(&self) -> String {
        match self {
            Step::Navigate(input) => format!("navigate {}", input.clone().into_inner().url),
            Step::Fill(params) => format!("fill {}", params.target),
            Step::Click(input) => format!("click {}", input.clone().into_inner().target),
            Step::WaitForText(input) => {
                format!("waitForText {}", input.clone().into_inner().pattern)
            }
            Step::WaitForUrlChange(input) => {
                format!("waitForUrlChange {}", input.clone().into_inner().pattern)
            }
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum NavigateInput {
    Url(String),
    Params(NavigateParams),
}

impl NavigateInput {
    pub fn into_inner(self) -> NavigateParams {
        match self {
            Self::Url(url) => NavigateParams { url, timeout: None },
            Self::Params(p) => p,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NavigateParams {
    pub url: String,
    #[serde(default)]
    pub timeout: Option<u64>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FillParams {
    pub target: SelectorStrategy,
    pub value: String,
    #[serde(default = "default_true")]
    pub required: bool,
    #[serde(default)]
    pub timeout: Option<u64>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ClickInput {
    Shorthand(StrategyInput),
    Params(ClickParams),
}

impl ClickInput {
    pub fn into_inner(self) -> ClickParams {
        match self {
            Self::Shorthand(input) => ClickParams {
                target: input.into(),
                required: true,
                timeout: None,
            },
            Self::Params(p) => p,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClickParams {
    pub target: SelectorStrategy,
    #[serde(default = "default_true")]
    pub required: bool,
    #[serde(default)]
    pub timeout: Option<u64>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum WaitForTextInput {
    Pattern(TextPattern),
    Params(WaitForTextParams),
}

impl WaitForTextInput {
    pub fn into_inner(self) -> WaitForTextParams {
        match self {
            Self::Pattern(pattern) => WaitForTextParams {
                pattern,
                timeout: None,
            },
            Self::Params(p) => p,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WaitForTextParams {
    #[serde(alias = "text")]
    pub pattern: TextPattern,
    #[serde(default)]
    pub timeout: Option<u64>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum WaitForUrlInput {
    Pattern(TextPattern),
    Params(WaitForUrlParams),
}

impl WaitForUrlInput {
    pub fn into_inner(self) -> WaitForUrlParams {
        match self {
            Self::Pattern(pattern) => WaitForUrlParams {
                pattern,
                timeout: None,
            },
            Self::Params(p) => p,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WaitForUrlParams {
    #[serde(alias = "url")]
    pub pattern: TextPattern,
    #[serde(default)]
    pub timeout: Option<u64>,
}

/// One condition of a trailing assertion
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum AssertCondition {
    /// Pattern against the page's visible text
    Text(TextPattern),
    /// Pattern against the current URL
    Url(TextPattern),
}

impl std::fmt::Display for AssertCondition {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AssertCondition::Text(p) => write!(f, "text {}", p),
            AssertCondition::Url(p) => write!(f, "url {}", p),
        }
    }
}

/// Trailing pass/fail assertion of a scenario. Conditions are polled
/// together; any single match passes.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(try_from = "AssertionInput")]
pub struct Assertion {
    pub timeout: Option<u64>,
    pub any: Vec<AssertCondition>,
}

impl std::fmt::Display for Assertion {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let parts: Vec<String> = self.any.iter().map(|c| c.to_string()).collect();
        write!(f, "{}", parts.join(" or "))
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum AssertionInput {
    Pattern(String),
    Params(AssertionParams),
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AssertionParams {
    #[serde(default)]
    pub timeout: Option<u64>,
    pub any: Vec<AssertCondition>,
}

impl TryFrom<AssertionInput> for Assertion {
    type Error = regex::Error;

    fn try_from(input: AssertionInput) -> Result<Self, Self::Error> {
        match input {
            AssertionInput::Pattern(raw) => Ok(Assertion {
                timeout: None,
                any: vec![AssertCondition::Text(TextPattern::new(&raw)?)],
            }),
            AssertionInput::Params(params) => Ok(Assertion {
                timeout: params.timeout,
                any: params.any,
            }),
        }
    }
}

/// Probe checked before a scenario runs: when no candidate is visible the
/// scenario is skipped rather than failed (e.g. no out-of-stock item on the
/// page).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SkipProbe {
    pub target: SelectorStrategy,
    #[serde(default)]
    pub timeout: Option<u64>,
    #[serde(default)]
    pub reason: Option<String>,
}

/// Named ordered sequence of steps plus a trailing assertion
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Scenario {
    pub name: String,

    /// Capability that must be present in the shared context before this
    /// scenario may run (e.g. "login")
    #[serde(default)]
    pub requires: Option<String>,

    /// Capability granted to the shared context when this scenario passes
    #[serde(default)]
    pub establishes: Option<String>,

    #[serde(default)]
    pub skip_unless: Option<SkipProbe>,

    #[serde(default)]
    pub steps: Vec<Step>,

    pub assert: Assertion,
}

/// Ordered set of scenarios sharing browser/session state
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Group {
    pub name: String,

    /// Isolated groups share no state with the rest of the suite and may run
    /// on their own browser session in parallel
    #[serde(default)]
    pub isolated: bool,

    #[serde(default)]
    pub scenarios: Vec<Scenario>,
}

/// A parsed suite file
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Suite {
    #[serde(default)]
    pub name: Option<String>,

    #[serde(default)]
    pub base_url: Option<String>,

    /// Web browser type: "chromium", "firefox", "webkit"
    #[serde(default)]
    pub browser: Option<String>,

    #[serde(default, alias = "defaultTimeout")]
    pub default_timeout_ms: Option<u64>,

    #[serde(default)]
    pub groups: Vec<Group>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn locator_parse_forms() {
        assert_eq!(
            Locator::parse("text=Sign In"),
            Locator::Text("Sign In".to_string())
        );
        assert_eq!(
            Locator::parse("pattern=/sign ?in/i"),
            Locator::TextPattern("/sign ?in/i".to_string())
        );
        assert_eq!(
            Locator::parse("placeholder=Email"),
            Locator::Placeholder("Email".to_string())
        );
        assert_eq!(
            Locator::parse("role=button"),
            Locator::Role("button".to_string())
        );
        assert_eq!(
            Locator::parse("css=input[name=\"email\"]"),
            Locator::Css("input[name=\"email\"]".to_string())
        );
        // Bare strings are CSS selectors
        assert_eq!(
            Locator::parse("button[type=\"submit\"]"),
            Locator::Css("button[type=\"submit\"]".to_string())
        );
    }

    #[test]
    fn pattern_regex_with_flag() {
        let p = TextPattern::new("/already|exists|registered/i").unwrap();
        assert!(p.is_match("This email ALREADY has an account"));
        assert!(!p.is_match("welcome back"));
    }

    #[test]
    fn pattern_case_sensitive_regex() {
        let p = TextPattern::new("/Thank You/").unwrap();
        assert!(p.is_match("Thank You! Payment Successfully Done"));
        assert!(!p.is_match("thank you"));
    }

    #[test]
    fn pattern_plain_string_is_substring() {
        let p = TextPattern::new("out of stock").unwrap();
        assert!(p.is_match("Item is Out Of Stock today"));
        // Regex metacharacters in plain strings stay literal
        let q = TextPattern::new("2+2").unwrap();
        assert!(q.is_match("result 2+2 ok"));
        assert!(!q.is_match("result 22 ok"));
    }

    #[test]
    fn strategy_preserves_declared_order() {
        let input = StrategyInput::Many(vec![
            "text=Sign Up".to_string(),
            "text=Register".to_string(),
            "css=a.signup".to_string(),
        ]);
        let strategy: SelectorStrategy = input.into();
        assert_eq!(strategy.candidates.len(), 3);
        assert_eq!(strategy.candidates[0], Locator::Text("Sign Up".to_string()));
        assert_eq!(
            strategy.candidates[2],
            Locator::Css("a.signup".to_string())
        );
    }
}
