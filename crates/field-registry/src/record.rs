use std::collections::BTreeMap;

use canonfill_core_types::{Conflict, Presence, ResolvedField, Source, Status, SuggestionOption};
use serde::{Deserialize, Serialize};

/// Identity-page fields recovered from a passport.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct PassportData {
    pub given_names: Option<String>,
    pub surname: Option<String>,
    pub full_name: Option<String>,
    pub date_of_birth: Option<String>,
    pub place_of_birth: Option<String>,
    pub nationality: Option<String>,
    pub country_of_issue: Option<String>,
    pub passport_number: Option<String>,
    pub date_of_issue: Option<String>,
    pub date_of_expiration: Option<String>,
    pub sex: Option<String>,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Address {
    pub street: Option<String>,
    pub unit: Option<String>,
    pub city: Option<String>,
    pub state: Option<String>,
    pub zip: Option<String>,
    pub country: Option<String>,
}

/// Attestation checkboxes and free-text qualifiers on the representation
/// form; all human-required.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct EligibilityData {
    pub attorney_eligible: Option<String>,
    pub subject_to_orders_no: Option<String>,
    pub subject_to_orders_yes: Option<String>,
    pub accredited_representative: Option<String>,
    pub recognized_organization_name: Option<String>,
    pub accreditation_date: Option<String>,
    pub associated_with: Option<String>,
    pub associated_with_name: Option<String>,
    pub law_student: Option<String>,
    pub law_student_name: Option<String>,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct AttorneyData {
    pub online_account_number: Option<String>,
    pub family_name: Option<String>,
    pub given_name: Option<String>,
    pub middle_name: Option<String>,
    pub full_name: Option<String>,
    pub law_firm_name: Option<String>,
    pub licensing_authority: Option<String>,
    pub bar_number: Option<String>,
    pub email: Option<String>,
    pub phone_daytime: Option<String>,
    pub phone_mobile: Option<String>,
    #[serde(default)]
    pub address: Address,
    #[serde(default)]
    pub eligibility: EligibilityData,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct ClientData {
    pub family_name: Option<String>,
    pub given_name: Option<String>,
    pub middle_name: Option<String>,
    pub full_name: Option<String>,
    pub email: Option<String>,
    pub phone: Option<String>,
    #[serde(default)]
    pub address: Address,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct ConsentData {
    pub send_notices_to_attorney: Option<String>,
    pub send_documents_to_attorney: Option<String>,
    pub send_documents_to_client: Option<String>,
    pub client_signature_date: Option<String>,
    pub attorney_signature_date: Option<String>,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct RepresentationData {
    #[serde(default)]
    pub attorney: AttorneyData,
    #[serde(default)]
    pub client: ClientData,
    #[serde(default)]
    pub consent: ConsentData,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct WarningItem {
    pub code: String,
    pub message: String,
    pub field: Option<String>,
}

/// Per-path bookkeeping carried alongside the record values.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct RecordMeta {
    #[serde(default)]
    pub sources: BTreeMap<String, Source>,
    #[serde(default)]
    pub confidence: BTreeMap<String, f64>,
    #[serde(default)]
    pub status: BTreeMap<String, Status>,
    #[serde(default)]
    pub evidence: BTreeMap<String, String>,
    #[serde(default)]
    pub suggestions: BTreeMap<String, Vec<SuggestionOption>>,
    #[serde(default)]
    pub presence: BTreeMap<String, Presence>,
    #[serde(default)]
    pub conflicts: BTreeMap<String, Conflict>,
    #[serde(default)]
    pub warnings: Vec<WarningItem>,
    #[serde(default)]
    pub resolved_fields: BTreeMap<String, ResolvedField>,
}

impl RecordMeta {
    pub fn presence_of(&self, path: &str) -> Presence {
        self.presence.get(path).copied().unwrap_or_default()
    }

    pub fn source_of(&self, path: &str) -> Source {
        self.sources.get(path).copied().unwrap_or(Source::Unknown)
    }

    pub fn add_warning(&mut self, code: &str, message: impl Into<String>, field: Option<&str>) {
        self.warnings.push(WarningItem {
            code: code.to_string(),
            message: message.into(),
            field: field.map(|f| f.to_string()),
        });
    }
}

/// The reconciled record under construction, plus its metadata.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct CanonicalRecord {
    #[serde(default)]
    pub passport: PassportData,
    #[serde(default)]
    pub representation: RepresentationData,
    #[serde(default)]
    pub meta: RecordMeta,
}

impl CanonicalRecord {
    /// Value at a registry path; `None` for unset or unknown paths.
    pub fn value(&self, path: &str) -> Option<String> {
        accessor_for(path).and_then(|a| (a.get)(self))
    }

    /// Set the value at a registry path. Unknown paths are a no-op; the
    /// registry guarantees at load time that declared paths resolve.
    pub fn set_value(&mut self, path: &str, value: Option<String>) {
        if let Some(a) = accessor_for(path) {
            (a.set)(self, value);
        }
    }

    /// Resolved value that overrides the extracted one: only entries a
    /// human or the approval flow produced may shadow the canonical value.
    pub fn resolved_override(&self, path: &str) -> Option<String> {
        let entry = self.meta.resolved_fields.get(path)?;
        if !entry.source.is_human_or_ai() {
            return None;
        }
        entry
            .value
            .as_ref()
            .map(|v| v.trim())
            .filter(|v| !v.is_empty())
            .map(|v| v.to_string())
    }

    /// Value the autofill run should write: override first, extraction second.
    pub fn fill_value(&self, path: &str) -> Option<String> {
        self.resolved_override(path).or_else(|| self.value(path))
    }
}

/// Typed getter/setter pair for one dotted path.
#[derive(Clone, Copy)]
pub struct Accessor {
    pub get: fn(&CanonicalRecord) -> Option<String>,
    pub set: fn(&mut CanonicalRecord, Option<String>),
}

macro_rules! accessors {
    ($($path:literal => $($seg:ident).+),+ $(,)?) => {
        /// Accessor for a dotted registry path, if the path is known.
        pub fn accessor_for(path: &str) -> Option<Accessor> {
            match path {
                $(
                    $path => Some(Accessor {
                        get: |r| r.$($seg).+.clone(),
                        set: |r, v| r.$($seg).+ = v,
                    }),
                )+
                _ => None,
            }
        }
    };
}

accessors! {
    "passport.given_names" => passport.given_names,
    "passport.surname" => passport.surname,
    "passport.full_name" => passport.full_name,
    "passport.date_of_birth" => passport.date_of_birth,
    "passport.place_of_birth" => passport.place_of_birth,
    "passport.nationality" => passport.nationality,
    "passport.country_of_issue" => passport.country_of_issue,
    "passport.passport_number" => passport.passport_number,
    "passport.date_of_issue" => passport.date_of_issue,
    "passport.date_of_expiration" => passport.date_of_expiration,
    "passport.sex" => passport.sex,
    "representation.attorney.online_account_number" => representation.attorney.online_account_number,
    "representation.attorney.family_name" => representation.attorney.family_name,
    "representation.attorney.given_name" => representation.attorney.given_name,
    "representation.attorney.middle_name" => representation.attorney.middle_name,
    "representation.attorney.full_name" => representation.attorney.full_name,
    "representation.attorney.law_firm_name" => representation.attorney.law_firm_name,
    "representation.attorney.licensing_authority" => representation.attorney.licensing_authority,
    "representation.attorney.bar_number" => representation.attorney.bar_number,
    "representation.attorney.email" => representation.attorney.email,
    "representation.attorney.phone_daytime" => representation.attorney.phone_daytime,
    "representation.attorney.phone_mobile" => representation.attorney.phone_mobile,
    "representation.attorney.address.street" => representation.attorney.address.street,
    "representation.attorney.address.unit" => representation.attorney.address.unit,
    "representation.attorney.address.city" => representation.attorney.address.city,
    "representation.attorney.address.state" => representation.attorney.address.state,
    "representation.attorney.address.zip" => representation.attorney.address.zip,
    "representation.attorney.address.country" => representation.attorney.address.country,
    "representation.attorney.eligibility.attorney_eligible" => representation.attorney.eligibility.attorney_eligible,
    "representation.attorney.eligibility.subject_to_orders_no" => representation.attorney.eligibility.subject_to_orders_no,
    "representation.attorney.eligibility.subject_to_orders_yes" => representation.attorney.eligibility.subject_to_orders_yes,
    "representation.attorney.eligibility.accredited_representative" => representation.attorney.eligibility.accredited_representative,
    "representation.attorney.eligibility.recognized_organization_name" => representation.attorney.eligibility.recognized_organization_name,
    "representation.attorney.eligibility.accreditation_date" => representation.attorney.eligibility.accreditation_date,
    "representation.attorney.eligibility.associated_with" => representation.attorney.eligibility.associated_with,
    "representation.attorney.eligibility.associated_with_name" => representation.attorney.eligibility.associated_with_name,
    "representation.attorney.eligibility.law_student" => representation.attorney.eligibility.law_student,
    "representation.attorney.eligibility.law_student_name" => representation.attorney.eligibility.law_student_name,
    "representation.client.family_name" => representation.client.family_name,
    "representation.client.given_name" => representation.client.given_name,
    "representation.client.middle_name" => representation.client.middle_name,
    "representation.client.full_name" => representation.client.full_name,
    "representation.client.email" => representation.client.email,
    "representation.client.phone" => representation.client.phone,
    "representation.client.address.street" => representation.client.address.street,
    "representation.client.address.unit" => representation.client.address.unit,
    "representation.client.address.city" => representation.client.address.city,
    "representation.client.address.state" => representation.client.address.state,
    "representation.client.address.zip" => representation.client.address.zip,
    "representation.client.address.country" => representation.client.address.country,
    "representation.consent.send_notices_to_attorney" => representation.consent.send_notices_to_attorney,
    "representation.consent.send_documents_to_attorney" => representation.consent.send_documents_to_attorney,
    "representation.consent.send_documents_to_client" => representation.consent.send_documents_to_client,
    "representation.consent.client_signature_date" => representation.consent.client_signature_date,
    "representation.consent.attorney_signature_date" => representation.consent.attorney_signature_date,
}

#[cfg(test)]
mod tests {
    use super::*;
    use canonfill_core_types::Source;

    #[test]
    fn accessor_round_trip() {
        let mut record = CanonicalRecord::default();
        record.set_value("passport.surname", Some("Eriksson".into()));
        assert_eq!(record.value("passport.surname").as_deref(), Some("Eriksson"));
        assert_eq!(record.passport.surname.as_deref(), Some("Eriksson"));
    }

    #[test]
    fn unknown_path_is_none() {
        let record = CanonicalRecord::default();
        assert!(record.value("passport.nope").is_none());
        assert!(accessor_for("representation.attorney").is_none());
    }

    #[test]
    fn resolved_override_only_for_user_or_ai() {
        let mut record = CanonicalRecord::default();
        record.passport.surname = Some("Extracted".into());
        record.meta.resolved_fields.insert(
            "passport.surname".into(),
            ResolvedField {
                key: "passport.surname".into(),
                value: Some("Corrected".into()),
                status: Status::Green,
                confidence: 1.0,
                source: Source::User,
                locked: true,
                requires_human_input: false,
                reason: None,
                suggestions: Vec::new(),
                last_validated_at: None,
                version: 2,
            },
        );
        assert_eq!(
            record.fill_value("passport.surname").as_deref(),
            Some("Corrected")
        );

        record
            .meta
            .resolved_fields
            .get_mut("passport.surname")
            .unwrap()
            .source = Source::Merge;
        assert_eq!(
            record.fill_value("passport.surname").as_deref(),
            Some("Extracted")
        );
    }
}
