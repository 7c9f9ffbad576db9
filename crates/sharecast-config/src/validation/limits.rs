use crate::schema::RelayConfig;

use super::helpers::validate_range;

pub(crate) fn validate_limits(errors: &mut Vec<String>, config: &RelayConfig) {
    validate_range(
        errors,
        "limits.max_message_bytes",
        config.limits.max_message_bytes,
        1024,
        16 * 1024 * 1024,
    );
}
