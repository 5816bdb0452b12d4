//! Sender address → account resolution.

use std::sync::Arc;

use crate::error::{Result, TaskError};
use crate::model::Account;
use crate::store::AccountStore;

/// A channel-scoped sender address such as `whatsapp:+919999999999`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChannelAddress {
    channel: Option<String>,
    digits: String,
}

impl ChannelAddress {
    /// Parse `"<channel>:+<digits>"` or a bare number.
    ///
    /// Separators (spaces, dashes, dots, parentheses) are dropped. Returns
    /// `None` when no digits remain or any other character is present.
    #[must_use]
    pub fn parse(raw: &str) -> Option<Self> {
        let raw = raw.trim();
        let (channel, number) = match raw.split_once(':') {
            Some((channel, number)) => (Some(channel.trim().to_ascii_lowercase()), number),
            None => (None, raw),
        };

        let mut digits = String::with_capacity(number.len());
        for (index, ch) in number.trim().chars().enumerate() {
            match ch {
                '0'..='9' => digits.push(ch),
                '+' if index == 0 => {}
                ' ' | '-' | '.' | '(' | ')' => {}
                _ => return None,
            }
        }
        if digits.is_empty() {
            return None;
        }
        Some(Self { channel, digits })
    }

    /// Channel prefix (`whatsapp`), if the address carried one.
    pub fn channel(&self) -> Option<&str> {
        self.channel.as_deref()
    }

    /// Number reduced to ASCII digits, country code included when sent.
    pub fn digits(&self) -> &str {
        &self.digits
    }

    /// `+<digits>` form.
    #[must_use]
    pub fn e164(&self) -> String {
        format!("+{}", self.digits)
    }
}

/// Mask all but the last four digits of an address for log output.
#[must_use]
pub fn mask_address(address: &str) -> String {
    let digits: Vec<char> = address.chars().filter(char::is_ascii_digit).collect();
    if digits.len() <= 4 {
        return "****".to_owned();
    }
    let tail: String = digits[digits.len() - 4..].iter().collect();
    format!("***{tail}")
}

/// Maps inbound sender addresses to accounts.
#[derive(Clone)]
pub struct IdentityResolver {
    accounts: Arc<dyn AccountStore>,
    default_country_code: String,
}

impl IdentityResolver {
    pub fn new(accounts: Arc<dyn AccountStore>, default_country_code: impl Into<String>) -> Self {
        Self {
            accounts,
            default_country_code: default_country_code.into(),
        }
    }

    /// Resolve `sender` to its account.
    ///
    /// # Errors
    ///
    /// [`TaskError::NotRegistered`] when the address is malformed or no
    /// account carries the number; [`TaskError::PersistenceFailed`] when the
    /// lookup itself fails.
    pub fn resolve(&self, sender: &str) -> Result<Account> {
        let Some(address) = ChannelAddress::parse(sender) else {
            return Err(TaskError::NotRegistered(mask_address(sender)));
        };

        match self
            .accounts
            .find_account_by_phone(address.digits(), &self.default_country_code)?
        {
            Some(account) => Ok(account),
            None => Err(TaskError::NotRegistered(mask_address(address.digits()))),
        }
    }
}
