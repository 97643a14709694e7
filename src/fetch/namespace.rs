//! Mapping an IRI to the namespace document that should describe it.

use tower_lsp::lsp_types::Url;

use super::FetchError;

/// A fetchable namespace: `key` identifies it in the cache, `url` is what
/// gets requested.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct Namespace {
    pub key: String,
    pub url: Url,
}

impl Namespace {
    /// Strip the fragment (`…#Foo` → `…#`), else the last path segment
    /// (`…/42` → `…/`). Only `http` and `https` IRIs can be fetched.
    pub fn of(iri: &str) -> Result<Self, FetchError> {
        let unfetchable = || FetchError::Unfetchable(iri.to_string());

        let key = match iri.rfind('#') {
            Some(hash) => &iri[..=hash],
            None => &iri[..iri.rfind('/').ok_or_else(unfetchable)? + 1],
        };
        let mut url = Url::parse(key).map_err(|_| unfetchable())?;
        if !matches!(url.scheme(), "http" | "https") || url.host_str().is_none() {
            return Err(unfetchable());
        }
        url.set_fragment(None);

        Ok(Self {
            key: key.to_string(),
            url,
        })
    }
}
