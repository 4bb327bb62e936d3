use serde::{Deserialize, Serialize};

/// Raw values that mean "nothing here" on snapshot pages.
pub const EMPTY_SENTINELS: [&str; 3] = ["", "None", "N/A"];

/// Fields populated from label lookups.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CarrierField {
    CompanyName,
    DotNumber,
    AuthorityType,
    AuthorityStatus,
    Phone,
    Email,
    State,
    SafetyRating,
    InsuranceStatus,
    InsuranceExpiry,
}

/// One carrier snapshot, keyed by the MC number it was looked up with.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CarrierRecord {
    pub mc_number: String,
    pub dot_number: Option<String>,
    pub company_name: Option<String>,
    pub authority_status: Option<String>,
    pub authority_type: Option<String>,
    pub insurance_status: Option<String>,
    /// Expiry as displayed on the page; not parsed.
    pub insurance_expiry: Option<String>,
    pub safety_rating: Option<String>,
    pub violations_12mo: u32,
    pub accidents_12mo: u32,
    pub authority_date: Option<String>,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub state: Option<String>,
}

impl CarrierRecord {
    pub fn new(mc_number: impl Into<String>) -> Self {
        Self {
            mc_number: mc_number.into(),
            dot_number: None,
            company_name: None,
            authority_status: None,
            authority_type: None,
            insurance_status: None,
            insurance_expiry: None,
            safety_rating: None,
            violations_12mo: 0,
            accidents_12mo: 0,
            authority_date: None,
            email: None,
            phone: None,
            state: None,
        }
    }

    pub fn set(&mut self, field: CarrierField, value: Option<String>) {
        let slot = match field {
            CarrierField::CompanyName => &mut self.company_name,
            CarrierField::DotNumber => &mut self.dot_number,
            CarrierField::AuthorityType => &mut self.authority_type,
            CarrierField::AuthorityStatus => &mut self.authority_status,
            CarrierField::Phone => &mut self.phone,
            CarrierField::Email => &mut self.email,
            CarrierField::State => &mut self.state,
            CarrierField::SafetyRating => &mut self.safety_rating,
            CarrierField::InsuranceStatus => &mut self.insurance_status,
            CarrierField::InsuranceExpiry => &mut self.insurance_expiry,
        };
        *slot = value;
    }

    /// Trim every string field and null out empty sentinels. Idempotent.
    pub fn normalized(self) -> Self {
        Self {
            mc_number: self.mc_number.trim().to_string(),
            dot_number: clean_value(self.dot_number),
            company_name: clean_value(self.company_name),
            authority_status: clean_value(self.authority_status),
            authority_type: clean_value(self.authority_type),
            insurance_status: clean_value(self.insurance_status),
            insurance_expiry: clean_value(self.insurance_expiry),
            safety_rating: clean_value(self.safety_rating),
            violations_12mo: self.violations_12mo,
            accidents_12mo: self.accidents_12mo,
            authority_date: clean_value(self.authority_date),
            email: clean_value(self.email),
            phone: clean_value(self.phone),
            state: clean_value(self.state),
        }
    }

    /// A record is only worth returning if it names the carrier somehow.
    pub fn has_identity(&self) -> bool {
        self.company_name.is_some() || self.dot_number.is_some()
    }
}

pub fn clean_value(value: Option<String>) -> Option<String> {
    let value = value?;
    let trimmed = value.trim();
    if EMPTY_SENTINELS.contains(&trimmed) {
        None
    } else if trimmed.len() == value.len() {
        Some(value)
    } else {
        Some(trimmed.to_string())
    }
}
