//! OAuth return-URL interpretation.
//!
//! The remote service sends the user back with either `auth=success`
//! (cookie issued) or `token=<value>` (bearer token). [`classify`] reads
//! those markers and returns the URL with them removed; the embedding
//! application is responsible for replacing its visible URL with it.

use url::Url;

const AUTH_PARAM: &str = "auth";
const AUTH_SUCCESS: &str = "success";
const TOKEN_PARAM: &str = "token";

/// What the return URL says about a just-finished login.
#[derive(Clone, PartialEq, Eq)]
pub enum RedirectOutcome {
    /// No OAuth marker present.
    None,
    /// Cookie issued upstream; confirm status after a settling delay.
    SuccessMarker,
    /// Bearer token to persist and use right away.
    TokenMarker(String),
}

impl std::fmt::Debug for RedirectOutcome {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RedirectOutcome::None => f.write_str("None"),
            RedirectOutcome::SuccessMarker => f.write_str("SuccessMarker"),
            RedirectOutcome::TokenMarker(_) => f.write_str("TokenMarker(..)"),
        }
    }
}

/// Result of [`classify`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Classification {
    pub outcome: RedirectOutcome,
    /// The input URL without any marker parameters.
    pub cleaned_url: Url,
}

impl Classification {
    /// The cleaned URL, only when it differs from the input.
    pub fn replacement_for(&self, original: &Url) -> Option<&Url> {
        (self.cleaned_url != *original).then_some(&self.cleaned_url)
    }
}

fn is_marker(key: &str, value: &str) -> bool {
    key == TOKEN_PARAM || (key == AUTH_PARAM && value == AUTH_SUCCESS)
}

/// Classify a return URL and strip its markers.
///
/// A token wins over `auth=success` when both are present. An empty
/// `token=` is stripped but not treated as a token. Unrelated query
/// parameters and the fragment are preserved. Classifying the cleaned URL
/// again always yields [`RedirectOutcome::None`].
pub fn classify(url: &Url) -> Classification {
    let mut token = None;
    let mut success = false;
    let mut kept: Vec<(String, String)> = Vec::new();

    for (key, value) in url.query_pairs() {
        if key == TOKEN_PARAM {
            if token.is_none() && !value.is_empty() {
                token = Some(value.to_string());
            }
        } else if key == AUTH_PARAM && value == AUTH_SUCCESS {
            success = true;
        }

        if !is_marker(&key, &value) {
            kept.push((key.into_owned(), value.into_owned()));
        }
    }

    let outcome = match (token, success) {
        (Some(token), _) => RedirectOutcome::TokenMarker(token),
        (None, true) => RedirectOutcome::SuccessMarker,
        (None, false) => RedirectOutcome::None,
    };

    let had_marker = url.query_pairs().any(|(k, v)| is_marker(&k, &v));
    let cleaned_url = if had_marker {
        let mut cleaned = url.clone();
        if kept.is_empty() {
            cleaned.set_query(None);
        } else {
            cleaned.query_pairs_mut().clear().extend_pairs(kept);
        }
        cleaned
    } else {
        url.clone()
    };

    Classification {
        outcome,
        cleaned_url,
    }
}
