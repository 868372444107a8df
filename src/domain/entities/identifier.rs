use std::fmt;

use crate::application::errors::AddressError;

/// A parsed participant address: `person@host` with an optional `/resource`
/// suffix. Covers both individual users (`alice@example.net/laptop`) and
/// room occupants (`room@conference.example.net/alice`).
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Identifier {
    person: String,
    host: String,
    resource: Option<String>,
}

impl Identifier {
    /// Parse a raw address string.
    ///
    /// The node part may itself contain `@` (gateway-style double-`@`
    /// addresses), so the node/host split happens on the *last* `@` of the
    /// part before the first `/`.
    pub fn parse(raw: &str) -> Result<Self, AddressError> {
        let (bare, resource) = match raw.split_once('/') {
            Some((bare, res)) => (bare, Some(res)),
            None => (raw, None),
        };

        let at = bare
            .rfind('@')
            .ok_or_else(|| AddressError::MalformedAddress(raw.to_string()))?;
        let (person, host) = (&bare[..at], &bare[at + 1..]);

        if person.is_empty() || host.is_empty() {
            return Err(AddressError::EmptyPart(raw.to_string()));
        }

        Ok(Self {
            person: person.to_string(),
            host: host.to_string(),
            resource: resource.map(|r| r.to_string()),
        })
    }

    pub fn new(person: impl Into<String>, host: impl Into<String>) -> Self {
        Self {
            person: person.into(),
            host: host.into(),
            resource: None,
        }
    }

    pub fn with_resource(mut self, resource: impl Into<String>) -> Self {
        self.resource = Some(resource.into());
        self
    }

    pub fn person(&self) -> &str {
        &self.person
    }

    pub fn host(&self) -> &str {
        &self.host
    }

    pub fn resource(&self) -> Option<&str> {
        self.resource.as_deref()
    }

    /// The address without its resource part, `person@host`.
    pub fn bare(&self) -> String {
        format!("{}@{}", self.person, self.host)
    }

    /// A copy of this identifier with the resource stripped.
    pub fn to_bare(&self) -> Self {
        Self {
            person: self.person.clone(),
            host: self.host.clone(),
            resource: None,
        }
    }

    /// Equality ignoring the resource part.
    pub fn bare_matches(&self, other: &Identifier) -> bool {
        self.person == other.person && self.host == other.host
    }
}

impl fmt::Display for Identifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.resource {
            Some(res) => write!(f, "{}@{}/{}", self.person, self.host, res),
            None => write!(f, "{}@{}", self.person, self.host),
        }
    }
}
