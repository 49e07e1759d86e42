//! Holding model: one owned perk/voucher grant with an expiry date.

use chrono::{Datelike, NaiveDate};
use serde::{Deserialize, Serialize};

use crate::errors::FieldError;

/// Date format used for `expiry`.
pub const EXPIRY_FORMAT: &str = "%Y-%m-%d";

/// Voucher categories used when no override is configured.
pub const DEFAULT_VOUCHER_TYPES: [&str; 4] = ["食事", "買い物", "レジャー", "その他"];

/// A user-owned record of a single perk/voucher grant.
///
/// `company_name` is a snapshot of the catalog name at entry time and is never
/// reconciled with later catalog renames.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Holding {
    pub id: String,
    #[serde(default)]
    pub company_id: String,
    pub company_name: String,
    pub voucher_type: String,
    pub expiry: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub amount: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub count: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub shares: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub note: Option<String>,
    /// Epoch milliseconds, fixed at first insert
    pub created_at: i64,
    /// Epoch milliseconds, refreshed on every write
    pub updated_at: i64,
}

impl Holding {
    /// Parsed expiry date, if well formed.
    pub fn expiry_date(&self) -> Option<NaiveDate> {
        NaiveDate::parse_from_str(&self.expiry, EXPIRY_FORMAT).ok()
    }

    /// Whole days from `today` until expiry (negative once expired).
    pub fn days_until(&self, today: NaiveDate) -> Option<i64> {
        self.expiry_date().map(|d| (d - today).num_days())
    }

    /// Whether the holding expires in the calendar month of `today`.
    pub fn expires_in_month_of(&self, today: NaiveDate) -> bool {
        self.expiry_date()
            .is_some_and(|d| d.year() == today.year() && d.month() == today.month())
    }
}

/// Whether `value` is a real date written exactly as `YYYY-MM-DD`.
///
/// chrono's parser accepts unpadded fields and leading whitespace, which would
/// break the string ordering of stored expiries.
fn is_canonical_date(value: &str) -> bool {
    NaiveDate::parse_from_str(value, EXPIRY_FORMAT)
        .is_ok_and(|d| d.format(EXPIRY_FORMAT).to_string() == value)
}

/// Sort holdings by expiry (then id for a stable order).
pub fn sort_by_expiry(holdings: &mut [Holding]) {
    holdings.sort_by(|a, b| a.expiry.cmp(&b.expiry).then_with(|| a.id.cmp(&b.id)));
}

/// Urgency band used to highlight holdings nearing expiry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum ExpiryUrgency {
    /// Less than 30 days left (or already expired)
    Urgent,
    /// Less than 90 days left
    Soon,
    Later,
}

impl ExpiryUrgency {
    pub fn from_days(days: i64) -> Self {
        if days < 30 {
            ExpiryUrgency::Urgent
        } else if days < 90 {
            ExpiryUrgency::Soon
        } else {
            ExpiryUrgency::Later
        }
    }
}

/// Dashboard counts over the holding collection.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HoldingSummary {
    pub total: usize,
    pub expiring_this_month: usize,
    pub expired: usize,
    pub urgent: usize,
    pub soon: usize,
}

impl HoldingSummary {
    pub fn compute(holdings: &[Holding], today: NaiveDate) -> Self {
        let mut summary = HoldingSummary {
            total: holdings.len(),
            ..Default::default()
        };

        for holding in holdings {
            if holding.expires_in_month_of(today) {
                summary.expiring_this_month += 1;
            }
            let Some(days) = holding.days_until(today) else {
                continue;
            };
            if days < 0 {
                summary.expired += 1;
                continue;
            }
            match ExpiryUrgency::from_days(days) {
                ExpiryUrgency::Urgent => summary.urgent += 1,
                ExpiryUrgency::Soon => summary.soon += 1,
                ExpiryUrgency::Later => {}
            }
        }

        summary
    }
}

/// Configurable closed set of voucher categories.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VoucherTypes(Vec<String>);

impl VoucherTypes {
    pub fn new<I, S>(types: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self(types.into_iter().map(Into::into).collect())
    }

    /// Parse a comma separated list, ignoring blank entries.
    pub fn parse_list(value: &str) -> Self {
        Self::new(
            value
                .split(',')
                .map(str::trim)
                .filter(|s| !s.is_empty()),
        )
    }

    pub fn contains(&self, voucher_type: &str) -> bool {
        self.0.iter().any(|t| t == voucher_type)
    }

    pub fn as_slice(&self) -> &[String] {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl Default for VoucherTypes {
    fn default() -> Self {
        Self::new(DEFAULT_VOUCHER_TYPES)
    }
}

/// Request body for creating or editing a holding.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HoldingInput {
    #[serde(default)]
    pub company_id: Option<String>,
    #[serde(default)]
    pub company_name: String,
    #[serde(default)]
    pub voucher_type: String,
    #[serde(default)]
    pub expiry: String,
    #[serde(default)]
    pub amount: Option<f64>,
    #[serde(default)]
    pub count: Option<i64>,
    #[serde(default)]
    pub shares: Option<i64>,
    #[serde(default)]
    pub note: Option<String>,
}

impl HoldingInput {
    /// Check every field, collecting all failures.
    pub fn validate(&self, voucher_types: &VoucherTypes) -> Result<(), Vec<FieldError>> {
        let mut errors = Vec::new();

        if self.company_name.trim().is_empty() {
            errors.push(FieldError::new("companyName", "Company name is required"));
        }

        if self.expiry.trim().is_empty() {
            errors.push(FieldError::new("expiry", "Expiry is required"));
        } else if !is_canonical_date(&self.expiry) {
            errors.push(FieldError::new("expiry", "Expiry must be a YYYY-MM-DD date"));
        }

        if !voucher_types.contains(&self.voucher_type) {
            errors.push(FieldError::new(
                "voucherType",
                format!(
                    "Voucher type must be one of: {}",
                    voucher_types.as_slice().join(", ")
                ),
            ));
        }

        if let Some(amount) = self.amount {
            if !amount.is_finite() || amount < 0.0 {
                errors.push(FieldError::new("amount", "Must be zero or greater"));
            }
        }
        if self.count.is_some_and(|c| c < 0) {
            errors.push(FieldError::new("count", "Must be zero or greater"));
        }
        if self.shares.is_some_and(|s| s < 0) {
            errors.push(FieldError::new("shares", "Must be zero or greater"));
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }

    /// Build a holding, keeping `created_at` from the previous version when editing.
    pub fn into_holding(self, id: String, existing: Option<&Holding>, now_ms: i64) -> Holding {
        let note = self.note.filter(|n| !n.trim().is_empty());
        Holding {
            id,
            company_id: self.company_id.unwrap_or_default(),
            company_name: self.company_name.trim().to_string(),
            voucher_type: self.voucher_type,
            expiry: self.expiry,
            amount: self.amount,
            count: self.count,
            shares: self.shares,
            note,
            created_at: existing.map(|h| h.created_at).unwrap_or(now_ms),
            updated_at: now_ms,
        }
    }
}
