//! Config
//!
//! Store-wide configuration: currency, tax, and the per-provider payment
//! settings, loadable from a YAML file.
//!
//! Shipped defaults carry placeholder credentials. Real keys, links and
//! account details belong in a deployment-specific config file, never in
//! source.

use std::{fs, path::Path};

use rust_decimal::Decimal;
use rustc_hash::FxHashMap;
use rusty_money::iso::{self, Currency};
use serde::Deserialize;
use thiserror::Error;

use crate::plans::PlanId;

/// Errors related to loading configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The config file could not be read.
    #[error(transparent)]
    Io(#[from] std::io::Error),

    /// The config file could not be parsed.
    #[error(transparent)]
    Yaml(#[from] serde_norway::Error),

    /// The configured currency code is not a known ISO-4217 code.
    #[error("unknown currency code {0:?}")]
    UnknownCurrency(String),
}

/// Provider environment selector.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProviderEnvironment {
    /// Test credentials, no real money moves.
    #[default]
    Sandbox,

    /// Live credentials.
    Production,
}

/// PayPal settings.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct PaypalConfig {
    /// OAuth client id.
    pub client_id: String,

    /// Sandbox or production.
    pub environment: ProviderEnvironment,

    /// Checkout locale.
    pub locale: String,

    /// Base of the PayPal.me link; the amount in major units is appended.
    pub me_link_base: String,
}

impl Default for PaypalConfig {
    fn default() -> Self {
        Self {
            client_id: "YOUR_PAYPAL_CLIENT_ID".to_owned(),
            environment: ProviderEnvironment::Sandbox,
            locale: "es_ES".to_owned(),
            me_link_base: "https://www.paypal.com/paypalme/nextsite".to_owned(),
        }
    }
}

/// Stripe settings.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct StripeConfig {
    /// Publishable (client-side) key.
    pub publishable_key: String,

    /// Hosted payment-link URL per plan. An absent or empty entry means
    /// the plan has no link yet.
    pub payment_links: FxHashMap<PlanId, String>,
}

impl Default for StripeConfig {
    fn default() -> Self {
        Self {
            publishable_key: "pk_test_placeholder".to_owned(),
            payment_links: FxHashMap::default(),
        }
    }
}

impl StripeConfig {
    /// The payment link for `plan`, treating an empty entry as absent.
    #[must_use]
    pub fn payment_link(&self, plan: &PlanId) -> Option<&str> {
        self.payment_links
            .get(plan)
            .map(String::as_str)
            .filter(|link| !link.is_empty())
    }
}

/// Device-wallet (Apple Pay / Google Pay) session settings.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct WalletConfig {
    /// Registered merchant id.
    pub merchant_id: String,

    /// Name shown on the payment sheet.
    pub merchant_name: String,

    /// Two-letter country code of the merchant.
    pub country_code: String,

    /// Card networks the session accepts.
    pub supported_networks: Vec<String>,

    /// Sandbox or production.
    pub environment: ProviderEnvironment,
}

impl Default for WalletConfig {
    fn default() -> Self {
        Self {
            merchant_id: "merchant.com.nextsite".to_owned(),
            merchant_name: "NextSite".to_owned(),
            country_code: "ES".to_owned(),
            supported_networks: vec![
                "visa".to_owned(),
                "masterCard".to_owned(),
                "amex".to_owned(),
            ],
            environment: ProviderEnvironment::Sandbox,
        }
    }
}

/// Tax settings.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct TaxConfig {
    /// Fractional rate, e.g. `0.21`.
    pub rate: Decimal,

    /// Country the rate applies to.
    pub country: String,

    /// Whether displayed prices already include tax.
    pub included: bool,
}

impl Default for TaxConfig {
    fn default() -> Self {
        Self {
            rate: Decimal::new(21, 2),
            country: "ES".to_owned(),
            included: true,
        }
    }
}

/// Transactional-mail provider settings.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct MailProviderConfig {
    /// Provider service id.
    pub service_id: String,

    /// Template used for order confirmations.
    pub template_id: String,

    /// Client-side public key.
    pub public_key: String,
}

impl Default for MailProviderConfig {
    fn default() -> Self {
        Self {
            service_id: "service_placeholder".to_owned(),
            template_id: "template_placeholder".to_owned(),
            public_key: "public_key_placeholder".to_owned(),
        }
    }
}

/// Top-level store configuration.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct StoreConfig {
    /// ISO-4217 code of the store currency.
    pub currency: CurrencyCode,

    /// Tax settings.
    pub tax: TaxConfig,

    /// Stripe settings.
    pub stripe: StripeConfig,

    /// PayPal settings.
    pub paypal: PaypalConfig,

    /// Device-wallet settings.
    pub wallet: WalletConfig,

    /// Transactional-mail settings.
    pub mail: MailProviderConfig,
}

/// Newtype so the default currency is `EUR` rather than the empty
/// string.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(transparent)]
pub struct CurrencyCode(pub String);

impl Default for CurrencyCode {
    fn default() -> Self {
        Self("EUR".to_owned())
    }
}

impl StoreConfig {
    /// Load configuration from a YAML file.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Io`] if the file cannot be read and
    /// [`ConfigError::Yaml`] if it cannot be parsed.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let contents = fs::read_to_string(path)?;

        Ok(serde_norway::from_str(&contents)?)
    }

    /// Resolve the configured currency code.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::UnknownCurrency`] if the code is not a
    /// known ISO-4217 code.
    pub fn currency(&self) -> Result<&'static Currency, ConfigError> {
        iso::find(&self.currency.0)
            .ok_or_else(|| ConfigError::UnknownCurrency(self.currency.0.clone()))
    }

    /// The fractional tax rate.
    #[must_use]
    pub fn tax_rate(&self) -> Decimal {
        self.tax.rate
    }
}

#[cfg(test)]
mod tests {
    use rusty_money::iso::EUR;
    use testresult::TestResult;

    use super::*;

    #[test]
    fn defaults_target_the_spanish_store() -> TestResult {
        let config = StoreConfig::default();

        assert_eq!(config.currency()?, EUR);
        assert_eq!(config.tax_rate(), Decimal::new(21, 2));
        assert!(config.tax.included);
        assert_eq!(config.tax.country, "ES");

        Ok(())
    }

    #[test]
    fn partial_yaml_falls_back_to_defaults() -> TestResult {
        let config: StoreConfig = serde_norway::from_str(
            r#"
            stripe:
              publishable_key: pk_test_abc123
              payment_links:
                basico: https://buy.stripe.example/basico
                profesional: ""
            "#,
        )?;

        assert_eq!(config.stripe.publishable_key, "pk_test_abc123");
        assert_eq!(
            config.stripe.payment_link(&PlanId::from("basico")),
            Some("https://buy.stripe.example/basico")
        );
        assert_eq!(config.stripe.payment_link(&PlanId::from("profesional")), None);
        assert_eq!(config.stripe.payment_link(&PlanId::from("premium")), None);
        assert_eq!(config.currency()?, EUR);

        Ok(())
    }

    #[test]
    fn unknown_currency_is_reported() {
        let config = StoreConfig {
            currency: CurrencyCode("ZZZ".to_owned()),
            ..StoreConfig::default()
        };

        assert!(matches!(
            config.currency(),
            Err(ConfigError::UnknownCurrency(code)) if code == "ZZZ"
        ));
    }
}
