use serde::Deserialize;

/// Message type posted by the embedded form when a submission completes.
pub const FORM_SUBMITTED: &str = "form-submitted";

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct FormRef {
    pub slug: String,
}

/// Cross-document message from the embedded form provider.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct FormMessage {
    #[serde(rename = "type")]
    pub kind: String,
    pub form: Option<FormRef>,
}

/// Decides whether the host page should react to a form message.
#[derive(Debug, Clone)]
pub struct MessageGuard {
    trusted_origin: String,
    embedded_slug: String,
}

impl MessageGuard {
    pub fn new(trusted_origin: impl Into<String>, embedded_slug: impl Into<String>) -> Self {
        Self {
            trusted_origin: trusted_origin.into(),
            embedded_slug: embedded_slug.into(),
        }
    }

    pub fn accepts(&self, origin: &str, message: &FormMessage) -> bool {
        origin.contains(&self.trusted_origin)
            && message.kind == FORM_SUBMITTED
            && message
                .form
                .as_ref()
                .is_some_and(|f| f.slug == self.embedded_slug)
    }

    /// Like [`accepts`](Self::accepts), for raw message data. Anything that is
    /// not a form message is ignored.
    pub fn accepts_value(&self, origin: &str, data: &serde_json::Value) -> bool {
        serde_json::from_value::<FormMessage>(data.clone())
            .map(|m| self.accepts(origin, &m))
            .unwrap_or(false)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    const SLUG: &str = "beta-user-tracker-conciergesync-b4yxaf";

    fn guard() -> MessageGuard {
        MessageGuard::new("noteforms.com", SLUG)
    }

    #[test]
    fn test_accepts_matching_submission() {
        let data = json!({ "type": "form-submitted", "form": { "slug": SLUG } });
        assert!(guard().accepts_value("https://www.noteforms.com", &data));
    }

    #[test]
    fn test_rejects_untrusted_origin_or_other_form() {
        let data = json!({ "type": "form-submitted", "form": { "slug": SLUG } });
        assert!(!guard().accepts_value("https://evil.example", &data));

        let other = json!({ "type": "form-submitted", "form": { "slug": "section-3" } });
        assert!(!guard().accepts_value("https://noteforms.com", &other));

        let missing_form = json!({ "type": "form-submitted" });
        assert!(!guard().accepts_value("https://noteforms.com", &missing_form));

        assert!(!guard().accepts_value("https://noteforms.com", &json!("ping")));
    }
}
