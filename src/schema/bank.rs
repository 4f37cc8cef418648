//! Built-in feature set of the bank marketing subscription model.
//!
//! Order and vocabularies mirror what the offline training run fed the
//! encoder; the registry is still checked against the loaded pipeline at
//! startup, so a retrain that changes either is caught before serving.

use super::{DefaultValue, FeatureSpec, SchemaError, SchemaRegistry};

const OCCUPATIONS: [&str; 12] = [
    "admin.",
    "blue-collar",
    "entrepreneur",
    "housemaid",
    "management",
    "retired",
    "self-employed",
    "services",
    "student",
    "technician",
    "unemployed",
    "unknown",
];

const MARITAL_STATUSES: [&str; 4] = ["divorced", "married", "single", "unknown"];

const EDUCATION_LEVELS: [&str; 8] = [
    "basic.4y",
    "basic.6y",
    "basic.9y",
    "high.school",
    "illiterate",
    "professional.course",
    "university.degree",
    "unknown",
];

const YES_NO_UNKNOWN: [&str; 3] = ["no", "yes", "unknown"];

const CONTACT_MODES: [&str; 2] = ["cellular", "telephone"];

// The campaign never ran in January or February.
const MONTHS: [&str; 10] = [
    "mar", "apr", "may", "jun", "jul", "aug", "sep", "oct", "nov", "dec",
];

const WEEK_DAYS: [&str; 5] = ["mon", "tue", "wed", "thu", "fri"];

const PREVIOUS_OUTCOMES: [&str; 3] = ["failure", "nonexistent", "success"];

/// Feature specs of the bank marketing model, in pipeline order.
///
/// Documented defaults: `N_last_days` is 999 when the client was never
/// contacted before, in which case `nb_previous_contact` is 0 and
/// `previous_outcome` is `"nonexistent"`.
pub fn bank_marketing_features() -> Vec<FeatureSpec> {
    vec![
        FeatureSpec::numeric("age"),
        FeatureSpec::categorical("occupation", OCCUPATIONS),
        FeatureSpec::categorical("marital_status", MARITAL_STATUSES),
        FeatureSpec::categorical("education", EDUCATION_LEVELS),
        FeatureSpec::categorical("has_credit", YES_NO_UNKNOWN),
        FeatureSpec::categorical("housing_loan", YES_NO_UNKNOWN),
        FeatureSpec::categorical("personal_loan", YES_NO_UNKNOWN),
        FeatureSpec::categorical("contact_mode", CONTACT_MODES),
        FeatureSpec::categorical("month", MONTHS),
        FeatureSpec::categorical("week_day", WEEK_DAYS),
        FeatureSpec::numeric("last_contact_duration"),
        FeatureSpec::numeric("contacts_per_campaign"),
        FeatureSpec::numeric("N_last_days").with_default(DefaultValue::Number(999.0)),
        FeatureSpec::numeric("nb_previous_contact").with_default(DefaultValue::Number(0.0)),
        FeatureSpec::categorical("previous_outcome", PREVIOUS_OUTCOMES)
            .with_default(DefaultValue::Text("nonexistent".to_string())),
        FeatureSpec::numeric("emp_var_rate"),
        FeatureSpec::numeric("cons_price_index"),
        FeatureSpec::numeric("cons_conf_index"),
        FeatureSpec::numeric("euri_3_month"),
        FeatureSpec::numeric("nb_employees"),
    ]
}

/// Registry over [`bank_marketing_features`].
pub fn bank_marketing() -> Result<SchemaRegistry, SchemaError> {
    SchemaRegistry::new(bank_marketing_features())
}
