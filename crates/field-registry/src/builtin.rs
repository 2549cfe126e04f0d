//! The built-in field table for passport + representation-form intake.

use canonfill_core_types::FieldType;

use crate::spec::FieldSpec;

const ATTESTATION: &str = "Human attestation required; do not autofill.";
const CONSENT: &str = "Client consent required; do not autofill.";

/// Declarations for every canonical field, in registry order.
pub fn builtin_fields() -> Vec<FieldSpec> {
    use FieldType::*;
    vec![
        // Passport
        FieldSpec::new("passport.given_names", "passport", Name, true, "Passport given names")
            .hints(&["Given Names", "First Name"])
            .validated()
            .autofill(&["1.b. First Name(s)", "Given Name", "First Name"], 31),
        FieldSpec::new("passport.surname", "passport", Name, true, "Passport surname")
            .hints(&["Surname", "Last Name"])
            .validated()
            .autofill(&["1.a. Last Name", "Family Name", "Last Name"], 30),
        FieldSpec::new("passport.full_name", "passport", Name, false, "Passport full name"),
        FieldSpec::new("passport.date_of_birth", "passport", DatePast, true, "Date of birth")
            .hints(&["Date of Birth", "DOB"])
            .validated()
            .autofill(&["5.a. Date of Birth", "Date of Birth", "DOB"], 33),
        FieldSpec::new("passport.place_of_birth", "passport", Text, false, "Place of birth")
            .hints(&["Place of Birth"])
            .llm_always()
            .autofill(&["5.b. Place of Birth", "Place of Birth"], 37),
        FieldSpec::new("passport.nationality", "passport", Text, false, "Nationality")
            .hints(&["Nationality"])
            .autofill(&["4. Nationality", "Nationality"], 36),
        FieldSpec::new("passport.country_of_issue", "passport", Text, false, "Country of issue")
            .hints(&["Country of Issue", "Issuing Country"])
            .autofill(&["3. Country of Issue", "Country of Issue"], 35),
        FieldSpec::new(
            "passport.passport_number",
            "passport",
            PassportNumber,
            true,
            "Passport number",
        )
        .hints(&["Passport Number", "Passport No"])
        .validated()
        .autofill(&["2. Passport Number", "Passport Number"], 34),
        FieldSpec::new("passport.date_of_issue", "passport", DatePast, false, "Date of issue")
            .hints(&["Date of Issue"])
            .autofill(&["7.a. Date of Issue", "Date of Issue"], 38),
        FieldSpec::new(
            "passport.date_of_expiration",
            "passport",
            DateFuture,
            true,
            "Date of expiration",
        )
        .hints(&["Date of Expiry", "Expiration", "Expiry"])
        .validated()
        .autofill(&["7.b. Date of Expiration", "Date of Expiry", "Expiration"], 39),
        FieldSpec::new("passport.sex", "passport", Sex, false, "Sex")
            .hints(&["Sex"])
            .validated()
            .autofill(&["6. Sex", "Sex"], 32),
        // Attorney / representative
        FieldSpec::new(
            "representation.attorney.online_account_number",
            "representation.attorney",
            Text,
            false,
            "Online account number",
        )
        .hints(&["Online Account Number"])
        .autofill(&["1. Online Account Number (if any)", "Online Account Number"], 0),
        FieldSpec::new(
            "representation.attorney.family_name",
            "representation.attorney",
            Name,
            true,
            "Attorney family name",
        )
        .hints(&["Family Name", "Last Name", r"2\s*\.?a", r"2a\.?"])
        .validated()
        .autofill(
            &["2.a. Family Name (Last Name)", "2.a. Family Name", "Family Name", "Last Name"],
            1,
        ),
        FieldSpec::new(
            "representation.attorney.given_name",
            "representation.attorney",
            Name,
            true,
            "Attorney given name",
        )
        .hints(&["Given Name", "First Name", r"2\s*\.?b", r"2b\.?"])
        .validated()
        .autofill(
            &["2.b. Given Name (First Name)", "2.b. Given Name", "Given Name", "First Name"],
            2,
        ),
        FieldSpec::new(
            "representation.attorney.middle_name",
            "representation.attorney",
            Name,
            false,
            "Attorney middle name",
        )
        .hints(&["Middle Name", r"2\s*\.?c", r"2c\.?"])
        .autofill(&["2.c. Middle Name", "Middle Name"], 3),
        FieldSpec::new(
            "representation.attorney.full_name",
            "representation.attorney",
            Name,
            false,
            "Attorney full name",
        ),
        FieldSpec::new(
            "representation.attorney.law_firm_name",
            "representation.attorney",
            Text,
            false,
            "Law firm name",
        )
        .hints(&["Law Firm", "Organization Name", "Name of Law Firm"])
        .autofill(
            &[
                "1.d. Name of Law Firm or Organization (if applicable)",
                "Name of Law Firm or Organization",
                "Law Firm",
                "Organization Name",
            ],
            4,
        ),
        FieldSpec::new(
            "representation.attorney.licensing_authority",
            "representation.attorney",
            Text,
            false,
            "Licensing authority",
        )
        .hints(&["Licensing Authority", "State Bar"])
        .validated()
        .autofill(&["Licensing Authority"], 14),
        FieldSpec::new(
            "representation.attorney.bar_number",
            "representation.attorney",
            Text,
            false,
            "Bar number",
        )
        .hints(&["Bar Number", r"Bar\s*#", "Bar No", r"1\s*\.?b", r"1b\.?"])
        .validated()
        .autofill(&["1.b. Bar Number (if applicable)", "Bar Number"], 15),
        FieldSpec::new(
            "representation.attorney.email",
            "representation.attorney",
            Email,
            true,
            "Attorney email",
        )
        .hints(&["Email", "Email Address", r"6\s*\.?"])
        .validated()
        .autofill(&["6. Email Address (if any)", "Email Address", "Email"], 13),
        FieldSpec::new(
            "representation.attorney.phone_daytime",
            "representation.attorney",
            Phone,
            false,
            "Attorney daytime phone",
        )
        .hints(&["Daytime Phone", "Phone Number", "Daytime Telephone", r"4\s*\.?"])
        .validated()
        .autofill(&["4. Daytime Telephone Number", "Daytime Phone Number", "Phone"], 11),
        FieldSpec::new(
            "representation.attorney.phone_mobile",
            "representation.attorney",
            Phone,
            false,
            "Attorney mobile phone",
        )
        .hints(&["Mobile Phone", "Mobile Number", "Cell", "Mobile Telephone", r"5\s*\.?"])
        .validated()
        .autofill(&["5. Mobile Telephone Number (if any)", "Mobile Phone Number", "Mobile"], 12),
        FieldSpec::new(
            "representation.attorney.address.street",
            "representation.attorney",
            Text,
            true,
            "Attorney street",
        )
        .hints(&["Street", "Number and Name", "Street Number", r"3\s*\.?a", r"3a\.?"])
        .validated()
        .autofill(&["3.a. Street Number and Name", "Street Number and Name", "Street"], 5),
        FieldSpec::new(
            "representation.attorney.address.unit",
            "representation.attorney",
            Text,
            false,
            "Attorney unit",
        )
        .hints(&[r"\bApt\b", r"\bSte\b", r"\bSuite\b", r"\bFlr\b", r"3\s*\.?b", r"3b\.?"])
        .autofill(&["Apt.", "Ste.", "Flr.", "Apt", "Suite", "Apt./Ste./Flr."], 6),
        FieldSpec::new(
            "representation.attorney.address.city",
            "representation.attorney",
            Text,
            true,
            "Attorney city",
        )
        .hints(&["City", "Town", r"3\s*\.?c", r"3c\.?"])
        .validated()
        .autofill(&["3.c. City", "City or Town", "City"], 7),
        FieldSpec::new(
            "representation.attorney.address.state",
            "representation.attorney",
            State,
            true,
            "Attorney state",
        )
        .hints(&["State", r"3\s*\.?d", r"3d\.?"])
        .validated()
        .autofill(&["3.d. State", "State"], 8),
        FieldSpec::new(
            "representation.attorney.address.zip",
            "representation.attorney",
            Zip,
            true,
            "Attorney ZIP",
        )
        .hints(&["ZIP", "Postal", "Postal Code", r"3\s*\.?e", r"3e\.?"])
        .validated()
        .autofill(&["3.e. ZIP Code", "ZIP Code", "Postal"], 9),
        FieldSpec::new(
            "representation.attorney.address.country",
            "representation.attorney",
            Text,
            false,
            "Attorney country",
        )
        .hints(&["Country", r"3\s*\.?h", r"3h\.?"])
        .autofill(&["3.f. Country", "Country"], 10),
        // Attorney eligibility attestations: never auto-populated.
        FieldSpec::new(
            "representation.attorney.eligibility.attorney_eligible",
            "representation.attorney.eligibility",
            Checkbox,
            false,
            "Eligible to practice law and in good standing",
        )
        .human_required(ATTESTATION),
        FieldSpec::new(
            "representation.attorney.eligibility.subject_to_orders_no",
            "representation.attorney.eligibility",
            Checkbox,
            false,
            "Not subject to any order restricting practice",
        )
        .human_required(ATTESTATION),
        FieldSpec::new(
            "representation.attorney.eligibility.subject_to_orders_yes",
            "representation.attorney.eligibility",
            Checkbox,
            false,
            "Subject to order restricting practice",
        )
        .human_required(ATTESTATION),
        FieldSpec::new(
            "representation.attorney.eligibility.accredited_representative",
            "representation.attorney.eligibility",
            Checkbox,
            false,
            "Accredited representative",
        )
        .human_required(ATTESTATION),
        FieldSpec::new(
            "representation.attorney.eligibility.recognized_organization_name",
            "representation.attorney.eligibility",
            Text,
            false,
            "Recognized organization name",
        )
        .human_required(ATTESTATION),
        FieldSpec::new(
            "representation.attorney.eligibility.accreditation_date",
            "representation.attorney.eligibility",
            DatePast,
            false,
            "Accreditation date",
        )
        .human_required(ATTESTATION),
        FieldSpec::new(
            "representation.attorney.eligibility.associated_with",
            "representation.attorney.eligibility",
            Checkbox,
            false,
            "Associated with a previously filed appearance",
        )
        .human_required(ATTESTATION),
        FieldSpec::new(
            "representation.attorney.eligibility.associated_with_name",
            "representation.attorney.eligibility",
            Text,
            false,
            "Name of previously filed attorney/representative",
        )
        .human_required(ATTESTATION),
        FieldSpec::new(
            "representation.attorney.eligibility.law_student",
            "representation.attorney.eligibility",
            Checkbox,
            false,
            "Law student or graduate under supervision",
        )
        .human_required(ATTESTATION),
        FieldSpec::new(
            "representation.attorney.eligibility.law_student_name",
            "representation.attorney.eligibility",
            Text,
            false,
            "Name of law student or graduate",
        )
        .human_required(ATTESTATION),
        // Client
        FieldSpec::new(
            "representation.client.family_name",
            "representation.client",
            Name,
            false,
            "Client family name",
        )
        .hints(&[
            "Family Name",
            "Last Name",
            "Client.*Family Name",
            "Applicant.*Family Name",
            "Petitioner.*Family Name",
            r"6\s*\.?a",
            r"6a\.?",
        ]),
        FieldSpec::new(
            "representation.client.given_name",
            "representation.client",
            Name,
            false,
            "Client given name",
        )
        .hints(&[
            "Given Name",
            "First Name",
            "Client.*Given Name",
            "Applicant.*Given Name",
            "Petitioner.*Given Name",
            r"6\s*\.?b",
            r"6b\.?",
        ]),
        FieldSpec::new(
            "representation.client.middle_name",
            "representation.client",
            Name,
            false,
            "Client middle name",
        )
        .hints(&["Middle Name", "Client.*Middle Name", "Applicant.*Middle Name", r"6\s*\.?c", r"6c\.?"]),
        FieldSpec::new(
            "representation.client.full_name",
            "representation.client",
            Name,
            false,
            "Client full name",
        ),
        FieldSpec::new(
            "representation.client.email",
            "representation.client",
            Email,
            false,
            "Client email",
        )
        .hints(&["Email", "Email Address", "Client.*Email", "Applicant.*Email", r"12\s*\.?"]),
        FieldSpec::new(
            "representation.client.phone",
            "representation.client",
            Phone,
            false,
            "Client phone",
        )
        .hints(&["Daytime Telephone", "Phone", "Client.*Phone", "Applicant.*Phone", r"10\s*\.?"]),
        FieldSpec::new(
            "representation.client.address.street",
            "representation.client",
            Text,
            false,
            "Client street",
        )
        .hints(&["Street", "Street Number", "Client.*Street", "Applicant.*Street", r"13\s*\.?a"]),
        FieldSpec::new(
            "representation.client.address.unit",
            "representation.client",
            Text,
            false,
            "Client unit",
        )
        .hints(&[r"\bApt\b", r"\bSte\b", r"\bSuite\b", r"\bFlr\b", r"13\s*\.?b"]),
        FieldSpec::new(
            "representation.client.address.city",
            "representation.client",
            Text,
            false,
            "Client city",
        )
        .hints(&["City", "Town", "Client.*City", "Applicant.*City", r"13\s*\.?c"]),
        FieldSpec::new(
            "representation.client.address.state",
            "representation.client",
            State,
            false,
            "Client state",
        )
        .hints(&["State", "Client.*State", "Applicant.*State", r"13\s*\.?d"]),
        FieldSpec::new(
            "representation.client.address.zip",
            "representation.client",
            Zip,
            false,
            "Client ZIP",
        )
        .hints(&["ZIP", "Postal", "Postal Code", "Client.*ZIP", "Applicant.*ZIP", r"13\s*\.?e"]),
        FieldSpec::new(
            "representation.client.address.country",
            "representation.client",
            Text,
            false,
            "Client country",
        )
        .hints(&["Country", "Client.*Country", "Applicant.*Country", r"13\s*\.?h"]),
        // Consent / signatures: explicit human action only.
        FieldSpec::new(
            "representation.consent.send_notices_to_attorney",
            "representation.consent",
            Checkbox,
            false,
            "Request notices be sent to attorney",
        )
        .human_required(CONSENT),
        FieldSpec::new(
            "representation.consent.send_documents_to_attorney",
            "representation.consent",
            Checkbox,
            false,
            "Request documents be sent to attorney",
        )
        .human_required(CONSENT),
        FieldSpec::new(
            "representation.consent.send_documents_to_client",
            "representation.consent",
            Checkbox,
            false,
            "Request documents be sent to client",
        )
        .human_required(CONSENT),
        FieldSpec::new(
            "representation.consent.client_signature_date",
            "representation.consent",
            DatePast,
            true,
            "Client signature date",
        )
        .human_required("Signature date must be provided by the client."),
        FieldSpec::new(
            "representation.consent.attorney_signature_date",
            "representation.consent",
            DatePast,
            true,
            "Attorney signature date",
        )
        .human_required("Signature date must be provided by the attorney."),
    ]
}
