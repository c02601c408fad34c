//! Twilio REST transport
//!
//! Creates a call through `POST /2010-04-01/Accounts/{sid}/Calls.json`.
//! With the voice preference on, the call reads out the configured message
//! via inline TwiML; otherwise Twilio fetches the fallback TwiML URL.
//!
//! A call is reported Connected once Twilio accepts it and returns a call
//! SID. Rejections and network errors are reported as Failed.

use async_trait::async_trait;
use serde::Deserialize;
use std::time::Duration;

use autodial_common::config::TwilioSettings;

use super::{CallOutcome, CallTransport, TransportError};
use crate::models::PhoneNumber;

const TWILIO_BASE_URL: &str = "https://api.twilio.com";
const REQUEST_TIMEOUT_SECS: u64 = 15;

/// Subset of the Twilio call resource we read back
#[derive(Debug, Deserialize)]
struct TwilioCall {
    sid: String,
    #[serde(default)]
    status: Option<String>,
}

#[derive(Debug, Deserialize)]
struct TwilioErrorBody {
    #[serde(default)]
    message: Option<String>,
}

pub struct TwilioTransport {
    http_client: reqwest::Client,
    base_url: String,
    account_sid: String,
    auth_token: String,
    from_number: String,
    voice_message: String,
    fallback_url: String,
}

impl TwilioTransport {
    pub fn new(settings: &TwilioSettings) -> Result<Self, TransportError> {
        Self::with_base_url(settings, TWILIO_BASE_URL)
    }

    /// Point the client at a different API host
    pub fn with_base_url(
        settings: &TwilioSettings,
        base_url: impl Into<String>,
    ) -> Result<Self, TransportError> {
        if !settings.is_complete() {
            return Err(TransportError::Config(
                "Twilio account_sid, auth_token and from_number are required".to_string(),
            ));
        }

        let http_client = reqwest::Client::builder()
            .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECS))
            .build()
            .map_err(|e| TransportError::Network(e.to_string()))?;

        Ok(Self {
            http_client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            account_sid: settings.account_sid.clone().unwrap_or_default(),
            auth_token: settings.auth_token.clone().unwrap_or_default(),
            from_number: settings.from_number.clone().unwrap_or_default(),
            voice_message: settings.voice_message.clone(),
            fallback_url: settings.fallback_url.clone(),
        })
    }

    fn calls_url(&self) -> String {
        format!(
            "{}/2010-04-01/Accounts/{}/Calls.json",
            self.base_url, self.account_sid
        )
    }

    async fn create_call(
        &self,
        number: &PhoneNumber,
        voice_preference: bool,
    ) -> Result<TwilioCall, TransportError> {
        let twiml;
        let mut form: Vec<(&str, &str)> =
            vec![("To", number.as_str()), ("From", self.from_number.as_str())];
        if voice_preference {
            twiml = say_twiml(&self.voice_message);
            form.push(("Twiml", twiml.as_str()));
        } else {
            form.push(("Url", self.fallback_url.as_str()));
        }

        let response = self
            .http_client
            .post(self.calls_url())
            .basic_auth(&self.account_sid, Some(&self.auth_token))
            .form(&form)
            .send()
            .await
            .map_err(|e| TransportError::Network(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let message = response
                .json::<TwilioErrorBody>()
                .await
                .ok()
                .and_then(|b| b.message)
                .unwrap_or_else(|| status.canonical_reason().unwrap_or("unknown").to_string());
            return Err(TransportError::Api(status.as_u16(), message));
        }

        response
            .json::<TwilioCall>()
            .await
            .map_err(|e| TransportError::Parse(e.to_string()))
    }
}

#[async_trait]
impl CallTransport for TwilioTransport {
    fn name(&self) -> &'static str {
        "twilio"
    }

    async fn place(&self, number: &PhoneNumber, voice_preference: bool) -> CallOutcome {
        match self.create_call(number, voice_preference).await {
            Ok(call) => {
                tracing::info!(
                    number = %number,
                    call_sid = %call.sid,
                    status = call.status.as_deref().unwrap_or("unknown"),
                    "Twilio accepted call"
                );
                let detail = if voice_preference {
                    "call placed - AI voice delivered"
                } else {
                    "call placed"
                };
                CallOutcome::connected(detail)
            }
            Err(e) => {
                tracing::warn!(number = %number, error = %e, "Twilio call failed");
                e.into()
            }
        }
    }
}

/// Inline TwiML reading `message` aloud
pub(crate) fn say_twiml(message: &str) -> String {
    format!(
        r#"<Response><Say voice="alice" language="en-US">{}</Say></Response>"#,
        xml_escape(message)
    )
}

fn xml_escape(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&apos;"),
            _ => out.push(c),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn complete_settings() -> TwilioSettings {
        TwilioSettings {
            account_sid: Some("AC0001".into()),
            auth_token: Some("secret".into()),
            from_number: Some("+15550001111".into()),
            ..TwilioSettings::default()
        }
    }

    #[test]
    fn test_requires_credentials() {
        assert!(matches!(
            TwilioTransport::new(&TwilioSettings::default()),
            Err(TransportError::Config(_))
        ));
        assert!(TwilioTransport::new(&complete_settings()).is_ok());
    }

    #[test]
    fn test_calls_url() {
        let transport =
            TwilioTransport::with_base_url(&complete_settings(), "http://localhost:9000/").unwrap();
        assert_eq!(
            transport.calls_url(),
            "http://localhost:9000/2010-04-01/Accounts/AC0001/Calls.json"
        );
    }

    #[test]
    fn test_twiml_escapes_message() {
        let twiml = say_twiml("Tom & Jerry <say> \"hi\"");
        assert_eq!(
            twiml,
            "<Response><Say voice=\"alice\" language=\"en-US\">Tom &amp; Jerry &lt;say&gt; &quot;hi&quot;</Say></Response>"
        );
    }
}
