use fake::faker::name::en::Name;
use fake::Fake;
use rand::Rng;
use regex::Regex;
use std::collections::{HashMap, HashSet};

use crate::parser::types::DEFAULT_TIMEOUT_MS;

/// Cross-scenario state shared within a group (and along the serial chain
/// of groups). Carries established capabilities such as an authenticated
/// session, plus named variables like the last-created account email.
pub struct SharedContext {
    pub base_url: Option<String>,
    pub default_timeout_ms: u64,
    capabilities: HashSet<String>,
    vars: HashMap<String, String>,
}

impl SharedContext {
    pub fn new(base_url: Option<String>, default_timeout_ms: Option<u64>) -> Self {
        Self {
            base_url,
            default_timeout_ms: default_timeout_ms.unwrap_or(DEFAULT_TIMEOUT_MS),
            capabilities: HashSet::new(),
            vars: HashMap::new(),
        }
    }

    /// Record a capability established by a passing scenario (e.g. "login")
    pub fn grant(&mut self, capability: &str) {
        self.capabilities.insert(capability.to_string());
    }

    pub fn has(&self, capability: &str) -> bool {
        self.capabilities.contains(capability)
    }

    pub fn set_var(&mut self, name: &str, value: &str) {
        self.vars.insert(name.to_string(), value.to_string());
    }

    pub fn get_var(&self, name: &str) -> Option<String> {
        self.vars.get(name).cloned()
    }

    /// Substitute ${name} patterns in a string.
    ///
    /// Dynamic variables: `${uniqueEmail}` generates a previously unseen
    /// address and remembers it as `lastEmail`; `${randomName}` yields a
    /// person name; `${timestamp}` the current Unix time. Unknown names are
    /// left untouched.
    pub fn substitute_vars(&mut self, text: &str) -> String {
        let mut text = text.to_string();
        while text.contains("${uniqueEmail}") {
            let email = self.fresh_email();
            text = text.replacen("${uniqueEmail}", &email, 1);
        }

        let re = Regex::new(r"\$\{([a-zA-Z0-9_.]+)\}").unwrap();
        re.replace_all(&text, |caps: &regex::Captures| {
            let key = &caps[1];

            if let Some(val) = self.vars.get(key) {
                return val.clone();
            }

            match key {
                "randomName" => Name().fake::<String>(),
                "timestamp" => chrono::Utc::now().timestamp().to_string(),
                _ => format!("${{{}}}", key),
            }
        })
        .to_string()
    }

    /// Generate a unique, previously unseen email and remember it as the
    /// last-created account
    fn fresh_email(&mut self) -> String {
        let stamp = chrono::Utc::now().timestamp_millis();
        let suffix: u32 = rand::thread_rng().gen_range(100..1000);
        let email = format!("testuser{}{}@example.com", stamp, suffix);
        self.vars.insert("lastEmail".to_string(), email.clone());
        email
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unique_email_is_remembered_as_last_email() {
        let mut ctx = SharedContext::new(None, None);
        let filled = ctx.substitute_vars("${uniqueEmail}");
        assert!(filled.starts_with("testuser"));
        assert!(filled.ends_with("@example.com"));
        assert_eq!(ctx.get_var("lastEmail").as_deref(), Some(filled.as_str()));

        let again = ctx.substitute_vars("${lastEmail}");
        assert_eq!(again, filled);
    }

    #[test]
    fn unknown_vars_are_left_untouched() {
        let mut ctx = SharedContext::new(None, None);
        assert_eq!(ctx.substitute_vars("${nope}"), "${nope}");
    }

    #[test]
    fn plain_vars_substitute() {
        let mut ctx = SharedContext::new(None, None);
        ctx.set_var("email", "hassanjamal577987@gmail.com");
        assert_eq!(
            ctx.substitute_vars("login as ${email}"),
            "login as hassanjamal577987@gmail.com"
        );
    }

    #[test]
    fn capabilities_track_established_state() {
        let mut ctx = SharedContext::new(None, None);
        assert!(!ctx.has("login"));
        ctx.grant("login");
        assert!(ctx.has("login"));
    }
}
