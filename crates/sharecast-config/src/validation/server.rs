//! Listener validation: host, port and allowed origins.

use crate::schema::RelayConfig;

pub(crate) fn validate_server(errors: &mut Vec<String>, config: &RelayConfig) {
    let server = &config.server;

    if server.host.trim().is_empty() {
        errors.push("server.host must not be empty".into());
    }
    if server.port == 0 {
        errors.push("server.port must not be 0".into());
    }

    for origin in &server.allowed_origins {
        if !(origin.starts_with("http://") || origin.starts_with("https://")) {
            errors.push(format!(
                "server.allowed_origins entry '{origin}' must start with http:// or https://"
            ));
        }
    }
}
