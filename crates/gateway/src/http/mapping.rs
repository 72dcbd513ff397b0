use reqwest::StatusCode;

use crate::repository::GatewayError;

/// Map a non-success HTTP status to the error kind callers act on.
#[must_use]
pub fn status_error(status: StatusCode, body: String) -> GatewayError {
    let detail = if body.trim().is_empty() {
        status.to_string()
    } else {
        body.trim().to_string()
    };

    match status {
        StatusCode::NOT_FOUND => GatewayError::NotFound,
        StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => GatewayError::Unauthenticated,
        StatusCode::BAD_REQUEST | StatusCode::UNPROCESSABLE_ENTITY => {
            GatewayError::Validation(detail)
        }
        _ => GatewayError::Network(detail),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn maps_known_statuses() {
        assert_eq!(
            status_error(StatusCode::NOT_FOUND, String::new()),
            GatewayError::NotFound
        );
        assert_eq!(
            status_error(StatusCode::UNAUTHORIZED, String::new()),
            GatewayError::Unauthenticated
        );
        assert_eq!(
            status_error(StatusCode::UNPROCESSABLE_ENTITY, "answers missing".into()),
            GatewayError::Validation("answers missing".into())
        );
    }

    #[test]
    fn server_errors_are_network_errors_with_status_fallback() {
        assert_eq!(
            status_error(StatusCode::BAD_GATEWAY, "  ".into()),
            GatewayError::Network("502 Bad Gateway".into())
        );
    }
}
