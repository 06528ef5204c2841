use super::types::{Step, Suite};
use anyhow::{Context, Result};
use std::path::Path;

/// Parse a YAML suite file
pub fn parse_suite_file(path: &Path) -> Result<Suite> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read file: {}", path.display()))?;

    parse_suite(&content).with_context(|| format!("Failed to parse suite: {}", path.display()))
}

/// Parse YAML content into a Suite
pub fn parse_suite(content: &str) -> Result<Suite> {
    let de = serde_yaml::Deserializer::from_str(content);
    let suite: Suite =
        serde_yaml::with::singleton_map_recursive::deserialize(de).context("Invalid suite YAML")?;
    validate(&suite)?;
    Ok(suite)
}

fn validate(suite: &Suite) -> Result<()> {
    for group in &suite.groups {
        for scenario in &group.scenarios {
            if scenario.assert.any.is_empty() {
                anyhow::bail!(
                    "Scenario '{}' in group '{}' has an empty assertion",
                    scenario.name,
                    group.name
                );
            }
            for step in &scenario.steps {
                let strategy = match step {
                    Step::Fill(p) => Some(&p.target),
                    Step::Click(input) => match input {
                        super::types::ClickInput::Params(p) => Some(&p.target),
                        // Shorthand always yields at least one candidate
                        super::types::ClickInput::Shorthand(_) => None,
                    },
                    _ => None,
                };
                if let Some(s) = strategy {
                    if s.candidates.is_empty() {
                        anyhow::bail!(
                            "Scenario '{}' has a step with an empty selector strategy",
                            scenario.name
                        );
                    }
                }
            }
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::types::{AssertCondition, Locator, Step};

    #[test]
    fn parse_minimal_suite() {
        let yaml = r#"
name: smoke
baseUrl: https://sqatest.desolint.com
defaultTimeout: 10000

groups:
  - name: login
    scenarios:
      - name: valid-login
        establishes: login
        steps:
          - navigate: /
          - click: text=Sign In
          - fill:
              target: ['css=input[name="email"]', 'css=input[type="email"]']
              value: hassanjamal577987@gmail.com
          - fill:
              target: ['css=input[name="password"]', 'css=input[type="password"]']
              value: sqatest123
          - click:
              target:
                - 'css=button[type="submit"]'
                - text=Sign In
                - text=Login
        assert: "/logout|sign out|my account/i"
"#;

        let suite = parse_suite(yaml).unwrap();
        assert_eq!(suite.name.as_deref(), Some("smoke"));
        assert_eq!(suite.default_timeout_ms, Some(10000));
        assert_eq!(suite.groups.len(), 1);

        let scenario = &suite.groups[0].scenarios[0];
        assert_eq!(scenario.establishes.as_deref(), Some("login"));
        assert_eq!(scenario.steps.len(), 5);
        assert_eq!(scenario.assert.any.len(), 1);
        assert!(matches!(scenario.assert.any[0], AssertCondition::Text(_)));

        // Shorthand click parses into a one-candidate strategy
        match &scenario.steps[1] {
            Step::Click(input) => {
                let params = input.clone().into_inner();
                assert_eq!(
                    params.target.candidates,
                    vec![Locator::Text("Sign In".to_string())]
                );
                assert!(params.required);
            }
            other => panic!("expected click, got {:?}", other),
        }

        // Fill strategies keep fallback order
        match &scenario.steps[2] {
            Step::Fill(params) => {
                assert_eq!(params.target.candidates.len(), 2);
                assert_eq!(
                    params.target.candidates[0],
                    Locator::Css("input[name=\"email\"]".to_string())
                );
            }
            other => panic!("expected fill, got {:?}", other),
        }
    }

    #[test]
    fn parse_optional_step_and_assert_alternatives() {
        let yaml = r#"
groups:
  - name: signup
    scenarios:
      - name: invalid-password
        steps:
          - fill:
              target: 'css=input[name="confirmPassword"]'
              value: secret
              required: false
        assert:
          timeout: 15000
          any:
            - text: "/invalid|incorrect|wrong|error/i"
            - url: "/login|signin/"
"#;

        let suite = parse_suite(yaml).unwrap();
        let scenario = &suite.groups[0].scenarios[0];

        match &scenario.steps[0] {
            Step::Fill(params) => assert!(!params.required),
            other => panic!("expected fill, got {:?}", other),
        }

        assert_eq!(scenario.assert.timeout, Some(15000));
        assert_eq!(scenario.assert.any.len(), 2);
        assert!(matches!(scenario.assert.any[1], AssertCondition::Url(_)));
    }

    #[test]
    fn parse_skip_probe_and_isolated_group() {
        let yaml = r#"
groups:
  - name: cart
    isolated: true
    scenarios:
      - name: out-of-stock
        skipUnless:
          target: "pattern=/out of stock|sold out|unavailable/i"
          timeout: 3000
          reason: no out-of-stock item on the page
        steps: []
        assert: "/out of stock/i"
"#;

        let suite = parse_suite(yaml).unwrap();
        assert!(suite.groups[0].isolated);
        let probe = suite.groups[0].scenarios[0].skip_unless.as_ref().unwrap();
        assert_eq!(probe.timeout, Some(3000));
        assert_eq!(
            probe.reason.as_deref(),
            Some("no out-of-stock item on the page")
        );
    }

    #[test]
    fn empty_assertion_is_rejected() {
        let yaml = r#"
groups:
  - name: g
    scenarios:
      - name: s
        steps: []
        assert:
          any: []
"#;
        assert!(parse_suite(yaml).is_err());
    }

    #[test]
    fn bad_regex_is_rejected() {
        let yaml = r#"
groups:
  - name: g
    scenarios:
      - name: s
        steps: []
        assert: "/unclosed(/i"
"#;
        assert!(parse_suite(yaml).is_err());
    }

    #[test]
    fn shipped_storefront_suite_parses() {
        let path = std::path::Path::new(env!("CARGO_MANIFEST_DIR")).join("flows/storefront.yaml");
        let suite = parse_suite_file(&path).unwrap();

        let group_names: Vec<&str> = suite.groups.iter().map(|g| g.name.as_str()).collect();
        assert_eq!(group_names, vec!["signup", "login", "cart", "payment"]);

        // Later groups depend on the login capability established earlier
        let login = &suite.groups[1];
        assert!(login
            .scenarios
            .iter()
            .any(|s| s.establishes.as_deref() == Some("login")));
        let payment = &suite.groups[3];
        assert!(payment
            .scenarios
            .iter()
            .all(|s| s.requires.as_deref() == Some("login")));
    }
}
