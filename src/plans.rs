//! Plans
//!
//! The catalog of purchasable product tiers. Each plan is identified by a
//! stable string key and carries a tax-inclusive price.

use std::{fmt, fs, path::Path};

use rust_decimal::{Decimal, prelude::ToPrimitive};
use rustc_hash::FxHashMap;
use rusty_money::{
    Money,
    iso::{Currency, EUR, GBP, USD},
};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Plan catalog parsing errors.
#[derive(Debug, Error)]
pub enum CatalogError {
    /// IO error reading a catalog file.
    #[error("failed to read catalog file: {0}")]
    Io(#[from] std::io::Error),

    /// YAML parsing error.
    #[error("failed to parse YAML: {0}")]
    Yaml(#[from] serde_norway::Error),

    /// Invalid price format.
    #[error("invalid price format: {0}")]
    InvalidPrice(String),

    /// Unknown currency code.
    #[error("unknown currency code: {0}")]
    UnknownCurrency(String),

    /// Plan not found in the catalog.
    #[error("plan not found: {0}")]
    PlanNotFound(String),

    /// A plan's currency differs from the rest of the catalog.
    #[error("currency mismatch: expected {0}, found {1}")]
    CurrencyMismatch(String, String),
}

/// Stable identifier for a purchasable plan tier, unique within a cart.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PlanId(String);

impl PlanId {
    /// Create a plan identifier from a string key.
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// The underlying string key.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for PlanId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for PlanId {
    fn from(id: &str) -> Self {
        Self(id.to_owned())
    }
}

/// A purchasable plan tier.
#[derive(Debug, Clone)]
pub struct Plan<'a> {
    /// Human-readable plan name.
    pub name: String,

    /// Short marketing description.
    pub description: String,

    /// Tax-inclusive price of one unit.
    pub price: Money<'a, Currency>,
}

/// Wrapper for plans in YAML.
#[derive(Debug, Deserialize)]
struct PlansFixture {
    /// Map of plan key -> plan fixture.
    plans: FxHashMap<String, PlanFixture>,
}

/// A single plan entry in YAML.
#[derive(Debug, Deserialize)]
struct PlanFixture {
    name: String,

    #[serde(default)]
    description: String,

    /// Price string (e.g., "299 EUR").
    price: String,
}

/// Plan catalog keyed by [`PlanId`].
#[derive(Debug, Default)]
pub struct PlanCatalog<'a> {
    plans: FxHashMap<PlanId, Plan<'a>>,
    currency: Option<&'static Currency>,
}

impl<'a> PlanCatalog<'a> {
    /// Create an empty catalog.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Load a catalog from a YAML file on disk.
    ///
    /// # Errors
    ///
    /// Returns a [`CatalogError`] if the file cannot be read or parsed, a
    /// price is malformed, or the plans mix currencies.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, CatalogError> {
        let contents = fs::read_to_string(path)?;

        Self::from_yaml_str(&contents)
    }

    /// Parse a catalog from YAML text.
    ///
    /// # Errors
    ///
    /// Returns a [`CatalogError`] if the YAML cannot be parsed, a price is
    /// malformed, or the plans mix currencies.
    pub fn from_yaml_str(contents: &str) -> Result<Self, CatalogError> {
        let fixture: PlansFixture = serde_norway::from_str(contents)?;

        let mut catalog = Self::new();

        for (key, plan_fixture) in fixture.plans {
            let (minor_units, currency) = parse_price(&plan_fixture.price)?;

            if let Some(existing) = catalog.currency {
                if existing != currency {
                    return Err(CatalogError::CurrencyMismatch(
                        existing.iso_alpha_code.to_string(),
                        currency.iso_alpha_code.to_string(),
                    ));
                }
            } else {
                catalog.currency = Some(currency);
            }

            catalog.plans.insert(
                PlanId::new(key),
                Plan {
                    name: plan_fixture.name,
                    description: plan_fixture.description,
                    price: Money::from_minor(minor_units, currency),
                },
            );
        }

        Ok(catalog)
    }

    /// The built-in `NextSite` plan catalog.
    ///
    /// # Errors
    ///
    /// Returns a [`CatalogError`] if the bundled fixture fails to parse,
    /// which would indicate a packaging defect.
    pub fn nextsite() -> Result<Self, CatalogError> {
        Self::from_yaml_str(include_str!("../fixtures/plans/nextsite.yml"))
    }

    /// Look up a plan by identifier.
    ///
    /// # Errors
    ///
    /// Returns [`CatalogError::PlanNotFound`] if the plan is not in the
    /// catalog.
    pub fn plan(&self, id: &PlanId) -> Result<&Plan<'a>, CatalogError> {
        self.plans
            .get(id)
            .ok_or_else(|| CatalogError::PlanNotFound(id.to_string()))
    }

    /// Iterate over the catalog entries.
    pub fn iter(&self) -> impl Iterator<Item = (&PlanId, &Plan<'a>)> {
        self.plans.iter()
    }

    /// Number of plans in the catalog.
    #[must_use]
    pub fn len(&self) -> usize {
        self.plans.len()
    }

    /// Check whether the catalog is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.plans.is_empty()
    }

    /// The currency shared by every plan, if any plans are loaded.
    #[must_use]
    pub fn currency(&self) -> Option<&'static Currency> {
        self.currency
    }
}

/// Parse a price string (e.g., "299 EUR") into minor units and currency.
///
/// # Errors
///
/// Returns an error if the string is not in the format "AMOUNT CURRENCY",
/// if the amount cannot be parsed as a decimal, or if the currency code is
/// not recognized.
pub fn parse_price(s: &str) -> Result<(i64, &'static Currency), CatalogError> {
    let parts: Vec<&str> = s.split_whitespace().collect();

    if parts.len() != 2 {
        return Err(CatalogError::InvalidPrice(format!(
            "Expected format 'AMOUNT CURRENCY', got: {s}"
        )));
    }

    let amount = parts
        .first()
        .ok_or_else(|| CatalogError::InvalidPrice(s.to_string()))?
        .parse::<Decimal>()
        .map_err(|_err| CatalogError::InvalidPrice(s.to_string()))?;

    let minor_units = amount
        .checked_mul(Decimal::new(100, 0))
        .and_then(|value| value.round_dp(0).to_i64())
        .ok_or_else(|| CatalogError::InvalidPrice(s.to_string()))?;

    let currency_code = parts
        .get(1)
        .ok_or_else(|| CatalogError::InvalidPrice(s.to_string()))?;

    let currency = match *currency_code {
        "EUR" => EUR,
        "GBP" => GBP,
        "USD" => USD,
        other => return Err(CatalogError::UnknownCurrency(other.to_string())),
    };

    Ok((minor_units, currency))
}
