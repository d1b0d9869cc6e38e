use crate::validation::{SiteUrl, ValidationError, sanitize_site_url};
use serde::Serialize;

pub const MAX_SITES: usize = 5;

/// Ordered, bounded list of sites to poll. Duplicates are allowed.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct SiteRegistry {
    sites: Vec<SiteUrl>,
}

/// A settings input that failed sanitization and was cleared.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RejectedSite {
    pub input: String,
    pub reason: String,
}

impl SiteRegistry {
    pub fn new(sites: Vec<SiteUrl>) -> Result<Self, ValidationError> {
        if sites.len() > MAX_SITES {
            return Err(ValidationError::TooManySites {
                count: sites.len(),
                max: MAX_SITES,
            });
        }
        Ok(Self { sites })
    }

    /// Sanitizes raw settings inputs. Blank inputs are dropped, invalid ones
    /// are cleared and reported; only the input count itself is fatal.
    pub fn from_inputs<S: AsRef<str>>(
        inputs: &[S],
    ) -> Result<(Self, Vec<RejectedSite>), ValidationError> {
        if inputs.len() > MAX_SITES {
            return Err(ValidationError::TooManySites {
                count: inputs.len(),
                max: MAX_SITES,
            });
        }

        let mut sites = Vec::with_capacity(inputs.len());
        let mut rejected = Vec::new();

        for input in inputs {
            let input = input.as_ref();
            if input.trim().is_empty() {
                continue;
            }
            match sanitize_site_url(input) {
                Ok(site) => sites.push(site),
                Err(err) => rejected.push(RejectedSite {
                    input: input.to_string(),
                    reason: err.to_string(),
                }),
            }
        }

        Ok((Self { sites }, rejected))
    }

    pub fn iter(&self) -> impl Iterator<Item = &SiteUrl> {
        self.sites.iter()
    }

    pub fn len(&self) -> usize {
        self.sites.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sites.is_empty()
    }

    /// Looks up a configured site by its (unsanitized) URL.
    pub fn find(&self, raw: &str) -> Option<&SiteUrl> {
        let wanted = sanitize_site_url(raw).ok()?;
        self.sites.iter().find(|site| **site == wanted)
    }

    pub fn into_vec(self) -> Vec<SiteUrl> {
        self.sites
    }
}

impl<'a> IntoIterator for &'a SiteRegistry {
    type Item = &'a SiteUrl;
    type IntoIter = std::slice::Iter<'a, SiteUrl>;

    fn into_iter(self) -> Self::IntoIter {
        self.sites.iter()
    }
}
