use std::collections::HashSet;
use std::net::IpAddr;

use anyhow::{Context, Result};
use regex::Regex;
use thiserror::Error;

use crate::util::quote_str;

const MAX_REPORTED_ADDRESS_BYTES: usize = 254;
const MAX_DOMAIN_BYTES: usize = 253;
const MAX_LABEL_BYTES: usize = 63;

// RFC 5322 dot-atom on both sides of the '@'.
const ADDR_SPEC_PATTERN: &str = r"^([A-Za-z0-9!#$%&'*+/=?^_`{|}~-]+(?:\.[A-Za-z0-9!#$%&'*+/=?^_`{|}~-]+)*)@([A-Za-z0-9!#$%&'*+/=?^_`{|}~-]+(?:\.[A-Za-z0-9!#$%&'*+/=?^_`{|}~-]+)*)$";

/// Failure reason reported by an [`EmailPolicy`]. Its display form is used
/// verbatim as the reason column of a validation problem.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{0}")]
pub struct PolicyError(String);

impl PolicyError {
    pub fn new(reason: impl Into<String>) -> Self {
        Self(reason.into())
    }
}

pub trait EmailPolicy {
    fn check(&self, address: &str) -> Result<(), PolicyError>;
}

impl<F> EmailPolicy for F
where
    F: Fn(&str) -> Result<(), PolicyError>,
{
    fn check(&self, address: &str) -> Result<(), PolicyError> {
        self(address)
    }
}

/// Syntax and domain checks for contact mailboxes.
#[derive(Debug, Clone)]
pub struct MailboxPolicy {
    addr_spec: Regex,
    forbidden_domains: HashSet<String>,
}

impl MailboxPolicy {
    pub fn new<I, S>(forbidden_domains: I) -> Result<Self>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let addr_spec =
            Regex::new(ADDR_SPEC_PATTERN).context("failed to compile addr-spec regex")?;
        let forbidden_domains = forbidden_domains
            .into_iter()
            .map(|domain| domain.as_ref().trim().to_ascii_lowercase())
            .filter(|domain| !domain.is_empty())
            .collect();

        Ok(Self {
            addr_spec,
            forbidden_domains,
        })
    }
}

impl EmailPolicy for MailboxPolicy {
    fn check(&self, address: &str) -> Result<(), PolicyError> {
        let Some(captures) = self.addr_spec.captures(address) else {
            return Err(PolicyError::new(format!(
                "{} is not a valid e-mail address",
                quote_str(truncate_bytes(address, MAX_REPORTED_ADDRESS_BYTES))
            )));
        };

        let domain = captures[2].to_ascii_lowercase();
        if let Err(detail) = check_domain(&domain) {
            return Err(PolicyError::new(format!(
                "contact email {} has invalid domain : {detail}",
                quote_str(address)
            )));
        }

        if self.forbidden_domains.contains(&domain) {
            return Err(PolicyError::new(format!(
                "invalid contact domain. Contact emails @{domain} are forbidden"
            )));
        }

        Ok(())
    }
}

fn check_domain(domain: &str) -> Result<(), &'static str> {
    if domain.is_empty() {
        return Err("Domain name is empty");
    }
    if domain.len() > MAX_DOMAIN_BYTES {
        return Err("Domain name is longer than 253 bytes");
    }
    if !domain
        .bytes()
        .all(|byte| byte.is_ascii_alphanumeric() || byte == b'-' || byte == b'.')
    {
        return Err("Domain name contains an invalid character");
    }
    if domain.parse::<IpAddr>().is_ok() {
        return Err("Contact domain can not be an IP address");
    }

    let labels: Vec<&str> = domain.split('.').collect();
    if labels.len() < 2 {
        return Err("Domain name needs at least one dot");
    }
    for label in &labels {
        if label.is_empty() {
            return Err("Domain name contains an empty label");
        }
        if label.len() > MAX_LABEL_BYTES {
            return Err("Domain has a label (component between periods) longer than 63 chars");
        }
        if label.starts_with('-') || label.ends_with('-') {
            return Err("Domain name has a label that begins or ends with a hyphen");
        }
    }

    let tld = labels.last().copied().unwrap_or_default();
    if !tld.bytes().all(|byte| byte.is_ascii_alphabetic()) {
        return Err("Domain name does not end with a valid public suffix (TLD)");
    }

    Ok(())
}

fn truncate_bytes(value: &str, max: usize) -> &str {
    if value.len() <= max {
        return value;
    }
    let mut end = max;
    while !value.is_char_boundary(end) {
        end -= 1;
    }
    &value[..end]
}

#[cfg(test)]
mod tests {
    use super::*;

    fn policy() -> MailboxPolicy {
        MailboxPolicy::new(["Forbidden.example"]).expect("policy should build")
    }

    #[test]
    fn accepts_plain_mailboxes() {
        let policy = policy();
        for address in [
            "a@example.com",
            "first.last+tag@mail.example.org",
            "o'brien@sub-domain.example.co",
        ] {
            assert!(policy.check(address).is_ok(), "{address} should pass");
        }
    }

    #[test]
    fn rejects_unparseable_addresses_with_quoted_address() {
        let err = policy().check("not-an-email").unwrap_err();
        assert_eq!(
            err.to_string(),
            "\"not-an-email\" is not a valid e-mail address"
        );

        assert!(policy().check("two@@example.com").is_err());
        assert!(policy().check(" a@example.com").is_err());
        assert!(policy().check("a.@example.com").is_err());
    }

    #[test]
    fn unparseable_address_is_truncated_in_reason() {
        let address = format!("{}@", "x".repeat(400));
        let err = policy().check(&address).unwrap_err();
        assert_eq!(
            err.to_string(),
            format!("\"{}\" is not a valid e-mail address", "x".repeat(254))
        );
    }

    #[test]
    fn rejects_invalid_domains() {
        let err = policy().check("root@localhost").unwrap_err();
        assert_eq!(
            err.to_string(),
            "contact email \"root@localhost\" has invalid domain : Domain name needs at least one dot"
        );

        let err = policy().check("a@-bad.example.com").unwrap_err();
        assert!(err.to_string().contains("begins or ends with a hyphen"));

        let err = policy().check("a@1.2.3.4").unwrap_err();
        assert!(err.to_string().contains("IP address"));

        let err = policy().check("a@under_score.com").unwrap_err();
        assert!(err.to_string().contains("invalid character"));

        let err = policy().check("a@example.123").unwrap_err();
        assert!(err.to_string().contains("public suffix"));
    }

    #[test]
    fn rejects_forbidden_domains_case_insensitively() {
        let err = policy().check("ops@FORBIDDEN.example").unwrap_err();
        assert_eq!(
            err.to_string(),
            "invalid contact domain. Contact emails @forbidden.example are forbidden"
        );
    }

    #[test]
    fn closures_act_as_policies() {
        let reject_all = |_: &str| -> Result<(), PolicyError> { Err(PolicyError::new("nope")) };
        assert_eq!(reject_all.check("a@example.com").unwrap_err().to_string(), "nope");
    }
}
