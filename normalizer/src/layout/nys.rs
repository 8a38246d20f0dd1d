//! NYS Board of Elections voter file
//!
//! The statewide extract (`AllNYSVoters_*.txt`) has no header row; fields
//! arrive in the fixed order of [`COLUMNS`].

use chrono::NaiveDate;

use super::Layout;
use crate::error::{HandlerError, HandlerResult};
use crate::handler;
use crate::transform::registry::HandlerRegistry;

pub const NAME: &str = "nys";

/// File name prefix of the statewide extract.
pub const SOURCE_PREFIX: &str = "AllNYSVoters";

/// Field order of the extract.
pub const COLUMNS: [&str; 47] = [
    // name
    "last_name",
    "first_name",
    "middle_name",
    "name_suffix",
    // residence
    "addr_number",
    "addr_half_code",
    "addr_pre",
    "addr_street",
    "addr_post",
    "addr_apt_type",
    "addr_apt",
    "addr_nonstandard",
    "addr_city",
    "addr_zip",
    "addr_zip4",
    // mailing
    "mail_addr1",
    "mail_addr2",
    "mail_addr3",
    "mail_addr4",
    "date_of_birth",
    "gender",
    "party",
    "other_party",
    // districts
    "county_id",
    "election_district",
    "legislative_district",
    "municipality",
    "ward",
    "congressional_district_id",
    "senate_district_id",
    "assembly_district_id",
    // history
    "last_voted_date",
    "prev_year_voted",
    "prev_county_voted",
    "prev_address_voted",
    "prev_name_voted",
    // registration
    "county_voter_id",
    "registration_date",
    "id_required",
    "id_met",
    "registration_source",
    "registration_status",
    "registration_status_reason",
    "inactive_date",
    "purge_date",
    "id",
    "voter_history",
];

/// Date columns, all `YYYYMMDD` in the extract.
pub const DATE_COLUMNS: [&str; 5] = [
    "date_of_birth",
    "last_voted_date",
    "registration_date",
    "inactive_date",
    "purge_date",
];

/// Status code of purged registrations.
const PURGED: &str = "P";

pub fn default(value: &str) -> HandlerResult {
    Ok(value.to_string())
}

/// `YYYYMMDD` to `YYYY-MM-DD`. Empty values pass through; values already
/// in dashed form are re-emitted zero-padded.
pub fn date(value: &str) -> HandlerResult {
    if value.is_empty() {
        return Ok(String::new());
    }
    let parsed = match NaiveDate::parse_from_str(value, "%Y-%m-%d") {
        Ok(date) => date,
        Err(_) => NaiveDate::parse_from_str(value, "%Y%m%d")?,
    };
    Ok(parsed.format("%Y-%m-%d").to_string())
}

/// Purged registrations are dropped from the output.
pub fn registration_status(value: &str) -> HandlerResult {
    if value == PURGED {
        return Err(HandlerError::Skip);
    }
    Ok(value.to_string())
}

pub fn registry() -> HandlerRegistry {
    let mut registry = HandlerRegistry::new();
    registry
        .register_for("first_name", default)
        .register_for("last_name", default)
        .register_for_each(DATE_COLUMNS, date)
        .register(handler!(registration_status));
    registry
}

pub fn layout() -> Layout {
    Layout {
        name: NAME.to_string(),
        description: "NYS Board of Elections statewide voter file".to_string(),
        columns: COLUMNS.iter().map(|c| c.to_string()).collect(),
        has_header: false,
        source_prefix: Some(SOURCE_PREFIX.to_string()),
        registry: registry(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transform::record::{Record, RecordOutcome, RecordTransformer};

    fn row(overrides: &[(&str, &str)]) -> Record {
        Record::from_pairs(COLUMNS.iter().map(|&column| {
            let value = overrides
                .iter()
                .find(|(c, _)| *c == column)
                .map(|(_, v)| *v)
                .unwrap_or("");
            (column, value)
        }))
    }

    #[test]
    fn test_columns_are_unique() {
        let mut seen = std::collections::HashSet::new();
        assert!(COLUMNS.iter().all(|c| seen.insert(*c)));
        assert_eq!(COLUMNS[0], "last_name");
        assert_eq!(COLUMNS[46], "voter_history");
    }

    #[test]
    fn test_date() {
        assert_eq!(date("19800101").unwrap(), "1980-01-01");
        assert_eq!(date("").unwrap(), "");
        assert_eq!(date("1980-01-01").unwrap(), "1980-01-01");
        assert_eq!(date("1980-1-1").unwrap(), "1980-01-01");
        assert!(matches!(date("2020-99-99"), Err(HandlerError::Fault(_))));
    }

    #[test]
    fn test_registry_bindings() {
        let registry = registry();
        assert_eq!(registry.len(), 8);
        assert_eq!(registry.resolve("registration_status").unwrap().name(), "registration_status");
        assert_eq!(registry.resolve("purge_date").unwrap().name(), "date");
        assert_eq!(registry.resolve("first_name").unwrap().name(), "default");
        assert!(registry.resolve("middle_name").is_none());
    }

    #[test]
    fn test_active_voter_normalized() {
        let registry = registry();
        let record = row(&[
            ("last_name", "DOE"),
            ("first_name", "JANE"),
            ("middle_name", "Q"),
            ("date_of_birth", "19800101"),
            ("registration_date", "20040315"),
            ("registration_status", "A"),
        ]);

        let RecordOutcome::Transformed(out) = RecordTransformer::new(&registry).apply(record) else {
            panic!("active voter should be kept");
        };
        assert_eq!(out.get("date_of_birth"), Some("1980-01-01"));
        assert_eq!(out.get("registration_date"), Some("2004-03-15"));
        assert_eq!(out.get("purge_date"), Some(""));
        assert_eq!(out.get("middle_name"), Some("Q"));
        assert_eq!(out.get("registration_status"), Some("A"));
    }

    #[test]
    fn test_purged_voter_skipped() {
        let registry = registry();
        let record = row(&[("last_name", "DOE"), ("registration_status", "P")]);

        assert_eq!(
            RecordTransformer::new(&registry).apply(record),
            RecordOutcome::Skipped {
                column: "registration_status".into()
            }
        );
    }

    #[test]
    fn test_layout() {
        let layout = layout();
        assert_eq!(layout.columns.len(), 47);
        assert!(!layout.has_header);
        assert_eq!(layout.source_prefix.as_deref(), Some("AllNYSVoters"));
    }
}
