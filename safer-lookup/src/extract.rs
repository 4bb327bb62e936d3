use crate::error::LookupError;
use crate::labels::LabelLookup;
use crate::record::{CarrierField, CarrierRecord};
use scraper::Html;
use tracing::debug;

/// Labels tried for each field, in order. The first label yielding a
/// non-blank value wins.
pub const FIELD_LABELS: &[(CarrierField, &[&str])] = &[
    (CarrierField::CompanyName, &["company name", "legal name"]),
    (CarrierField::DotNumber, &["dot number", "usdot"]),
    (CarrierField::AuthorityType, &["entity type"]),
    (CarrierField::AuthorityStatus, &["operating status"]),
    (CarrierField::Phone, &["phone"]),
    (CarrierField::Email, &["email"]),
    (CarrierField::State, &["state", "principal place"]),
    (CarrierField::SafetyRating, &["rating", "safety rating"]),
    (CarrierField::InsuranceStatus, &["insurance required"]),
    (
        CarrierField::InsuranceExpiry,
        &["insurance expiry", "policy expiration", "expiration date"],
    ),
];

/// Populate a [`CarrierRecord`] from a rendered snapshot page.
///
/// Fails with [`LookupError::NoUsableData`] when neither a company name nor a
/// DOT number survives normalization.
pub fn extract_record(
    html: &str,
    mc_number: &str,
    labels: &dyn LabelLookup,
) -> Result<CarrierRecord, LookupError> {
    let document = Html::parse_document(html);
    let scope = document.root_element();

    let mut record = CarrierRecord::new(mc_number);
    for (field, candidates) in FIELD_LABELS {
        let value = candidates.iter().find_map(|label| {
            labels
                .find_value_by_label(label, scope)
                .filter(|value| !value.trim().is_empty())
        });
        debug!(target: "safer.extract", field = ?field, found = value.is_some());
        record.set(*field, value);
    }

    let record = record.normalized();
    if !record.has_identity() {
        return Err(LookupError::NoUsableData {
            identifier: record.mc_number,
        });
    }
    Ok(record)
}
