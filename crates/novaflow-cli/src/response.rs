//! Generation API responses.

use serde::Deserialize;

use novaflow::{NovaflowError, markup::RawMarkup};

/// Body returned by the chart generation endpoint.
///
/// `warning` is set when the server fell back to a canned chart.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerationResponse {
    mermaid_code: RawMarkup,
    #[serde(default)]
    warning: Option<String>,
}

impl GenerationResponse {
    /// Parse a response body.
    ///
    /// # Errors
    ///
    /// Returns [`NovaflowError::Input`] when the body is not a JSON object
    /// with a string `mermaidCode` field.
    pub fn from_json(body: &str) -> Result<Self, NovaflowError> {
        serde_json::from_str(body)
            .map_err(|e| NovaflowError::Input(format!("invalid generation response: {e}")))
    }

    pub fn markup(&self) -> &str {
        self.mermaid_code.as_str()
    }

    pub fn warning(&self) -> Option<&str> {
        self.warning.as_deref()
    }

    pub fn into_markup(self) -> RawMarkup {
        self.mermaid_code
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_response_with_warning() {
        let response = GenerationResponse::from_json(
            r#"{"mermaidCode":"graph TD\n  A --> B","warning":"Used fallback chart generation due to API error"}"#,
        )
        .unwrap();

        assert_eq!(response.markup(), "graph TD\n  A --> B");
        assert_eq!(
            response.warning(),
            Some("Used fallback chart generation due to API error")
        );
    }

    #[test]
    fn test_response_without_warning() {
        let response = GenerationResponse::from_json(r#"{"mermaidCode":""}"#).unwrap();

        assert!(response.warning().is_none());
        assert!(response.into_markup().is_blank());
    }

    #[test]
    fn test_non_string_markup_is_rejected() {
        let err = GenerationResponse::from_json(r#"{"mermaidCode":42}"#).unwrap_err();
        assert!(matches!(err, NovaflowError::Input(_)));
    }

    #[test]
    fn test_missing_markup_is_an_input_error() {
        let err = GenerationResponse::from_json(r#"{"error":"rate limited"}"#).unwrap_err();

        assert!(matches!(err, NovaflowError::Input(_)));
        assert!(err.to_string().starts_with("Input error: invalid generation response"));
    }
}
