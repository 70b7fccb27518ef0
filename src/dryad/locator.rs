//! Dataset identifier to resource locator mapping

use crate::error::{Error, Result};
use url::Url;

/// Namespace every Dryad identifier lives under
pub const DOI_PREFIX: &str = "doi:10.5061/dryad.";

/// Build the dataset resource URL for `identifier`
///
/// The identifier is embedded in the full DOI (`doi:10.5061/dryad.<identifier>`),
/// the whole DOI is percent-encoded as a single path segment, and `suffix` is
/// appended verbatim (e.g. `"/versions"`).
///
/// # Examples
///
/// ```
/// use dryad_dl::dryad::encode_locator;
/// use url::Url;
///
/// let base = Url::parse("https://datadryad.org/api/v2/datasets/").unwrap();
/// let url = encode_locator(&base, "abcd1234", "/versions").unwrap();
/// assert_eq!(
///     url.as_str(),
///     "https://datadryad.org/api/v2/datasets/doi%3A10.5061%2Fdryad.abcd1234/versions"
/// );
/// ```
pub fn encode_locator(datasets_url: &Url, identifier: &str, suffix: &str) -> Result<Url> {
    let doi = format!("{}{}", DOI_PREFIX, identifier);
    let encoded = urlencoding::encode(&doi);

    let mut base = datasets_url.as_str().to_string();
    if !base.ends_with('/') {
        base.push('/');
    }

    let full = format!("{}{}{}", base, encoded, suffix);
    Url::parse(&full).map_err(|e| {
        tracing::warn!(identifier, error = %e, "cannot build dataset URL");
        Error::InvalidIdentifier(identifier.to_string())
    })
}
