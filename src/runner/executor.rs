use anyhow::Result;
use std::time::{Duration, Instant};

use super::context::SharedContext;
use super::error::RunError;
use super::resolver::{self, Resolution, POLL_INTERVAL_MS};
use crate::driver::traits::BrowserDriver;
use crate::parser::types::{Assertion, Step};

/// Result of executing a single step.
///
/// Driver faults are not represented here; they surface as `Err` from
/// `execute` and terminate the scenario.
#[derive(Debug)]
pub enum StepResult {
    Ok,
    SkippedOptional { reason: String },
    FailedRequired(RunError),
}

/// Outcome of polling a trailing assertion
#[derive(Debug)]
pub enum AssertionOutcome {
    Matched { condition: String },
    TimedOut,
}

/// Execute a single step against the page.
///
/// Fill and click resolve their target first; an unresolved optional target
/// skips the step without side effects, an unresolved required target fails
/// the scenario. The wait kinds are always required: they define pass/fail.
pub async fn execute(
    step: &Step,
    ctx: &mut SharedContext,
    driver: &dyn BrowserDriver,
) -> Result<StepResult> {
    match step {
        Step::Navigate(input) => {
            let params = input.clone().into_inner();
            let url = ctx.substitute_vars(&params.url);
            driver.goto(&url).await?;
            Ok(StepResult::Ok)
        }

        Step::Fill(params) => {
            let value = ctx.substitute_vars(&params.value);
            let timeout_ms = params.timeout.unwrap_or(ctx.default_timeout_ms);

            match resolver::resolve(driver, &params.target, timeout_ms).await? {
                Resolution::Found { locator, .. } => {
                    driver.fill(&locator, &value).await?;
                    Ok(StepResult::Ok)
                }
                Resolution::NotFound => Ok(miss(&params.target.to_string(), params.required, timeout_ms)),
            }
        }

        Step::Click(input) => {
            let params = input.clone().into_inner();
            let timeout_ms = params.timeout.unwrap_or(ctx.default_timeout_ms);

            match resolver::resolve(driver, &params.target, timeout_ms).await? {
                Resolution::Found { locator, .. } => {
                    driver.click(&locator).await?;
                    Ok(StepResult::Ok)
                }
                Resolution::NotFound => Ok(miss(&params.target.to_string(), params.required, timeout_ms)),
            }
        }

        Step::WaitForText(input) => {
            let params = input.clone().into_inner();
            let timeout_ms = params.timeout.unwrap_or(ctx.default_timeout_ms);
            let deadline = Instant::now() + Duration::from_millis(timeout_ms);

            loop {
                let text = driver.visible_text().await?;
                if params.pattern.is_match(&text) {
                    return Ok(StepResult::Ok);
                }

                let now = Instant::now();
                if now >= deadline {
                    return Ok(StepResult::FailedRequired(RunError::AssertionTimeout {
                        condition: format!("text {}", params.pattern),
                        timeout_ms,
                    }));
                }
                tokio::time::sleep((deadline - now).min(Duration::from_millis(POLL_INTERVAL_MS)))
                    .await;
            }
        }

        Step::WaitForUrlChange(input) => {
            let params = input.clone().into_inner();
            let timeout_ms = params.timeout.unwrap_or(ctx.default_timeout_ms);
            let deadline = Instant::now() + Duration::from_millis(timeout_ms);

            loop {
                let url = driver.current_url().await?;
                if params.pattern.is_match(&url) {
                    return Ok(StepResult::Ok);
                }

                let now = Instant::now();
                if now >= deadline {
                    return Ok(StepResult::FailedRequired(RunError::AssertionTimeout {
                        condition: format!("url {}", params.pattern),
                        timeout_ms,
                    }));
                }
                tokio::time::sleep((deadline - now).min(Duration::from_millis(POLL_INTERVAL_MS)))
                    .await;
            }
        }
    }
}

fn miss(strategy: &str, required: bool, timeout_ms: u64) -> StepResult {
    if required {
        StepResult::FailedRequired(RunError::LocatorNotFound {
            strategy: strategy.to_string(),
            timeout_ms,
        })
    } else {
        StepResult::SkippedOptional {
            reason: format!("{} not present", strategy),
        }
    }
}

/// Poll a scenario's trailing assertion until one condition matches or the
/// timeout elapses. Conditions are checked in declared order each cycle.
pub async fn check_assertion(
    assertion: &Assertion,
    ctx: &SharedContext,
    driver: &dyn BrowserDriver,
) -> Result<AssertionOutcome> {
    use crate::parser::types::AssertCondition;

    let timeout_ms = assertion.timeout.unwrap_or(ctx.default_timeout_ms);
    let deadline = Instant::now() + Duration::from_millis(timeout_ms);

    loop {
        let needs_text = assertion
            .any
            .iter()
            .any(|c| matches!(c, AssertCondition::Text(_)));
        let needs_url = assertion
            .any
            .iter()
            .any(|c| matches!(c, AssertCondition::Url(_)));

        let text = if needs_text {
            driver.visible_text().await?
        } else {
            String::new()
        };
        let url = if needs_url {
            driver.current_url().await?
        } else {
            String::new()
        };

        for condition in &assertion.any {
            let matched = match condition {
                AssertCondition::Text(p) => p.is_match(&text),
                AssertCondition::Url(p) => p.is_match(&url),
            };
            if matched {
                return Ok(AssertionOutcome::Matched {
                    condition: condition.to_string(),
                });
            }
        }

        let now = Instant::now();
        if now >= deadline {
            return Ok(AssertionOutcome::TimedOut);
        }
        tokio::time::sleep((deadline - now).min(Duration::from_millis(POLL_INTERVAL_MS))).await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::driver::mock::{ClickEffect, MockDriver, MockPage};
    use crate::parser::types::{
        ClickInput, ClickParams, FillParams, StrategyInput, TextPattern, WaitForTextInput,
        WaitForTextParams,
    };

    fn ctx() -> SharedContext {
        SharedContext::new(None, Some(500))
    }

    fn strategy(candidates: &[&str]) -> crate::parser::types::SelectorStrategy {
        StrategyInput::Many(candidates.iter().map(|s| s.to_string()).collect()).into()
    }

    #[tokio::test]
    async fn fill_uses_first_visible_fallback() {
        let driver = MockDriver::new().with_page(
            "/",
            MockPage::new(&["css=input[type=\"email\"]"], ""),
        );

        let step = Step::Fill(FillParams {
            target: strategy(&["css=input[name=\"email\"]", "css=input[type=\"email\"]"]),
            value: "a@b.com".to_string(),
            required: true,
            timeout: Some(500),
        });

        let result = execute(&step, &mut ctx(), &driver).await.unwrap();
        assert!(matches!(result, StepResult::Ok));
        assert_eq!(
            driver.actions(),
            vec!["fill css=input[type=\"email\"]=a@b.com"]
        );
    }

    #[tokio::test]
    async fn optional_miss_skips_without_side_effects() {
        let driver = MockDriver::new();

        let step = Step::Fill(FillParams {
            target: strategy(&["css=input[name=\"confirmPassword\"]"]),
            value: "secret".to_string(),
            required: false,
            timeout: Some(200),
        });

        let result = execute(&step, &mut ctx(), &driver).await.unwrap();
        assert!(matches!(result, StepResult::SkippedOptional { .. }));
        assert!(driver.actions().is_empty());
    }

    #[tokio::test]
    async fn required_miss_fails_with_locator_not_found() {
        let driver = MockDriver::new();

        let step = Step::Click(ClickInput::Params(ClickParams {
            target: strategy(&["text=Sign In"]),
            required: true,
            timeout: Some(200),
        }));

        let result = execute(&step, &mut ctx(), &driver).await.unwrap();
        match result {
            StepResult::FailedRequired(RunError::LocatorNotFound { timeout_ms, .. }) => {
                assert_eq!(timeout_ms, 200)
            }
            other => panic!("expected LocatorNotFound, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn wait_for_text_sees_revealed_feedback() {
        let driver = MockDriver::new()
            .with_page("/", MockPage::new(&["text=Add to Cart"], "storefront"))
            .with_click_effect("/", "text=Add to Cart", ClickEffect::reveal("Item added to cart"));

        let click = Step::Click(ClickInput::Shorthand(StrategyInput::Single(
            "text=Add to Cart".to_string(),
        )));
        let wait = Step::WaitForText(WaitForTextInput::Params(WaitForTextParams {
            pattern: TextPattern::new("/added|success/i").unwrap(),
            timeout: Some(500),
        }));

        let mut c = ctx();
        assert!(matches!(
            execute(&click, &mut c, &driver).await.unwrap(),
            StepResult::Ok
        ));
        assert!(matches!(
            execute(&wait, &mut c, &driver).await.unwrap(),
            StepResult::Ok
        ));
    }

    #[tokio::test]
    async fn wait_for_text_times_out_as_failed_required() {
        let driver = MockDriver::new();

        let wait = Step::WaitForText(WaitForTextInput::Params(WaitForTextParams {
            pattern: TextPattern::new("/never/i").unwrap(),
            timeout: Some(200),
        }));

        let result = execute(&wait, &mut ctx(), &driver).await.unwrap();
        assert!(matches!(
            result,
            StepResult::FailedRequired(RunError::AssertionTimeout { .. })
        ));
    }

    #[tokio::test]
    async fn driver_fault_propagates_as_error() {
        let driver = MockDriver::new()
            .with_page("/", MockPage::new(&["text=Pay"], ""))
            .with_fault_on("text=Pay");

        let step = Step::Click(ClickInput::Shorthand(StrategyInput::Single(
            "text=Pay".to_string(),
        )));

        assert!(execute(&step, &mut ctx(), &driver).await.is_err());
    }

    #[tokio::test]
    async fn assertion_matches_url_alternative() {
        let driver = MockDriver::new().with_page("/auth/login", MockPage::default());
        driver.goto("/auth/login").await.unwrap();

        let assertion = Assertion {
            timeout: Some(300),
            any: vec![
                crate::parser::types::AssertCondition::Text(
                    TextPattern::new("/invalid|error/i").unwrap(),
                ),
                crate::parser::types::AssertCondition::Url(
                    TextPattern::new("/login|signin/").unwrap(),
                ),
            ],
        };

        let outcome = check_assertion(&assertion, &ctx(), &driver).await.unwrap();
        match outcome {
            AssertionOutcome::Matched { condition } => assert!(condition.starts_with("url")),
            AssertionOutcome::TimedOut => panic!("expected url match"),
        }
    }
}
