use reqwest::StatusCode;

/// Failures callers may want to match on.
///
/// Library functions return `anyhow::Result`; use `err.downcast_ref::<ApiError>()`
/// to recover the typed condition (for example the HTTP status of a failed page).
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("{message}")]
    Http {
        status: StatusCode,
        url: String,
        message: String,
    },
    #[error("missing field in API response: {0}")]
    MissingField(&'static str),
    #[error("malformed API response: {0}")]
    Malformed(String),
}

impl ApiError {
    /// HTTP status of a failed request, if this is an HTTP failure.
    pub fn status(&self) -> Option<StatusCode> {
        match self {
            ApiError::Http { status, .. } => Some(*status),
            ApiError::MissingField(_) | ApiError::Malformed(_) => None,
        }
    }
}

// Elsevier answers errors with one of two bodies:
// {"service-error":{"status":{"statusCode":..,"statusText":..}}}
// {"error-response":{"error-code":..,"error-message":..}}
#[derive(Debug, Default, serde::Deserialize)]
pub(crate) struct ElsevierErrorResponse {
    #[serde(default, rename = "service-error")]
    service_error: Option<ServiceError>,
    #[serde(default, rename = "error-response")]
    error_response: Option<ErrorResponse>,
}

#[derive(Debug, serde::Deserialize)]
struct ServiceError {
    #[serde(default)]
    status: Option<ServiceStatus>,
}

#[derive(Debug, serde::Deserialize)]
struct ServiceStatus {
    #[serde(default, rename = "statusCode")]
    code: Option<String>,
    #[serde(default, rename = "statusText")]
    text: Option<String>,
}

#[derive(Debug, serde::Deserialize)]
struct ErrorResponse {
    #[serde(default, rename = "error-code")]
    code: Option<String>,
    #[serde(default, rename = "error-message")]
    message: Option<String>,
}

impl ElsevierErrorResponse {
    fn code(&self) -> &str {
        self.service_error
            .as_ref()
            .and_then(|e| e.status.as_ref())
            .and_then(|s| s.code.as_deref())
            .or_else(|| self.error_response.as_ref().and_then(|e| e.code.as_deref()))
            .unwrap_or("")
    }

    fn text(&self) -> &str {
        self.service_error
            .as_ref()
            .and_then(|e| e.status.as_ref())
            .and_then(|s| s.text.as_deref())
            .or_else(|| {
                self.error_response
                    .as_ref()
                    .and_then(|e| e.message.as_deref())
            })
            .unwrap_or("")
    }
}

pub(crate) fn format_api_error(status: StatusCode, url: &str, body: &str) -> ApiError {
    let parsed = serde_json::from_str::<ElsevierErrorResponse>(body).unwrap_or_default();
    let code = parsed.code();
    let text = if parsed.text().is_empty() {
        body.trim()
    } else {
        parsed.text()
    };

    let message = if status == StatusCode::UNAUTHORIZED || status == StatusCode::FORBIDDEN {
        format!(
            "Scopus authentication/authorization failed (HTTP {}).\n- Check the key in .scopusrc or SCOPUS_API_KEY\n- Some views and the abstract retrieval API require institutional (IP) access\n\nServer message: {} {}\nrequest: {}",
            status.as_u16(),
            code,
            text,
            redact_key(url)
        )
    } else if status == StatusCode::TOO_MANY_REQUESTS {
        format!(
            "Scopus quota exceeded (HTTP 429).\n- Either the per-second ceiling or the weekly quota was hit\n- The X-RateLimit-Reset header of the last successful call tells when the quota resets\n\nServer message: {} {}",
            code, text
        )
    } else {
        format!(
            "API request failed: HTTP {} for url ({})\n{} {}",
            status.as_u16(),
            redact_key(url),
            code,
            text
        )
    };

    ApiError::Http {
        status,
        url: redact_key(url),
        message: message.trim_end().to_string(),
    }
}

/// Replaces the value of the `apiKey` query parameter so keys never end up in logs.
pub(crate) fn redact_key(url: &str) -> String {
    match url.find("apiKey=") {
        Some(idx) => {
            let start = idx + "apiKey=".len();
            let end = url[start..]
                .find('&')
                .map(|i| start + i)
                .unwrap_or(url.len());
            format!("{}***{}", &url[..start], &url[end..])
        }
        None => url.to_string(),
    }
}
