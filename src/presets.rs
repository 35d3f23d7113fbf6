//! Named rule sets shipped with the binary.
//!
//! Presets are configuration data: they expand to ordinary [`RuleSpec`]s and
//! go through the same compilation path as rules from files or flags.

use crate::error::RuleError;
use crate::rules::RuleSpec;

/// UK postcode: anything matching the general shape is valid.
const UK_POSTCODE_MAIN: &str = r"(GIR\s0AA)|(((^[A-PR-UWYZ][0-9][0-9]?)|(([A-PR-UWYZ][A-HK-Y][0-9][0-9])|([A-PR-UWYZ][A-HK-Y][0-9])|(WC[0-9][A-Z])|((^[A-PR-UWYZ][0-9][A-HJKPSTUW])|([A-PR-UWYZ][A-HK-Y][0-9][ABEHMNPRVWXY]))))\s[0-9][ABD-HJLNP-UW-Z]{2})";

/// Areas that only have single digit districts, so AA99 is invalid there.
const UK_POSTCODE_SINGLE_DIGIT_AREAS: &str =
    r"((BR|FY|HA|HD|HG|HR|HS|HX|JE|LD|SM|SR|WC|WN|ZE)[0-9][0-9]\s[0-9][ABD-HJLNP-UW-Z]{2})";

/// Areas that only have double digit districts, so AA9 is invalid there.
const UK_POSTCODE_DOUBLE_DIGIT_AREAS: &str = r"((AB|LL|SO)[0-9]\s[0-9][ABD-HJLNP-UW-Z]{2})";

pub const DEFAULT_PRESET: &str = "uk-postcode";

/// Names accepted by `--preset`.
pub fn preset_names() -> &'static [&'static str] {
    &["uk-postcode"]
}

/// Expand a preset name into its ordered rule specs.
pub fn preset_rules(name: &str) -> Result<Vec<RuleSpec>, RuleError> {
    match name {
        "uk-postcode" => Ok(vec![
            RuleSpec::accept(UK_POSTCODE_MAIN),
            RuleSpec::reject(UK_POSTCODE_SINGLE_DIGIT_AREAS),
            RuleSpec::reject(UK_POSTCODE_DOUBLE_DIGIT_AREAS),
        ]),
        other => Err(RuleError::UnknownPreset(other.to_string())),
    }
}
