//! This module stores the column names of the raw extracts and of the cleaned outputs. The raw
//! names must be kept in sync with the upstream publishers (World Bank, IMF and IHME); the
//! canonical names are part of the file contract consumed by the dashboard.

// Canonical key columns shared by every cleaned table
pub const COUNTRY: &str = "country";
pub const YEAR: &str = "year";
pub const ISO3: &str = "ISO_3166_1_alpha_3";

// Canonical value columns
pub const HEALTH_EXP: &str = "HEALTH_EXP";
pub const ENV_EXP_TOTAL: &str = "ENV_EXP_TOTAL";

// Environmental expenditure sub-categories (after renaming through the variable mapping)
pub const ENV_EXP_PROT: &str = "ENV_EXP_Prot";
pub const ENV_EXP_BIODIV: &str = "ENV_EXP_BIODIV";
pub const ENV_EXP_OTHER: &str = "ENV_EXP_OTHER";
pub const ENV_EXP_RES_DEV: &str = "ENV_EXP_ResDev";
pub const ENV_EXP_POLLUTION: &str = "ENV_EXP_POLLUTION";
pub const ENV_EXP_WASTE: &str = "ENV_EXP_WASTE";
pub const ENV_EXP_WASTEWATER: &str = "ENV_EXP_WASTEWATER";

/// Sub-categories summed into `ENV_EXP_TOTAL`
pub const ENV_EXP_COMPONENTS: [&str; 7] = [
    ENV_EXP_PROT,
    ENV_EXP_BIODIV,
    ENV_EXP_OTHER,
    ENV_EXP_RES_DEV,
    ENV_EXP_POLLUTION,
    ENV_EXP_WASTE,
    ENV_EXP_WASTEWATER,
];

// IMF environmental expenditure extract
pub const IMF_COUNTRY: &str = "Country";
pub const IMF_ISO3: &str = "ISO3";
pub const IMF_CTS_NAME: &str = "CTS_Name";
pub const IMF_UNIT: &str = "Unit";
pub const IMF_YEAR_PREFIX: &str = "F";
pub const IMF_EXPENDITURE_ID: &str = "expenditure_id";
pub const IMF_VALUE: &str = "Env_Expenditure";

// IHME Global Burden of Disease extract
pub const IHME_SEX_NAME: &str = "sex_name";
pub const IHME_LOCATION_NAME: &str = "location_name";
pub const IHME_REI_NAME: &str = "rei_name";
pub const IHME_YEAR: &str = "year";
pub const IHME_VALUE: &str = "val";
pub const IHME_SEX_BOTH: &str = "Both";

// Dashboard display names
pub const DISPLAY_HEALTH: &str = "Health Expenses";
pub const DISPLAY_ENVIRONMENT: &str = "Environment Expenses";
pub const DISPLAY_OTHER: &str = "Other";
pub const DISPLAY_ISO3: &str = "iso3_code";
pub const EXP_TYPE: &str = "exp_type";
pub const EXP_VALUE: &str = "exp_value";
pub const INDICATOR: &str = "indicator";
pub const VALUE: &str = "value";
