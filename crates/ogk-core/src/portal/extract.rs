//! Embedded-script payload extraction.
//!
//! The list page is HTML, not an API response. Somewhere in an inline script it
//! assigns the search result to a known identifier:
//!
//! ```text
//! var result = {"rtnList": [ ... ], "rtnTotal": 15};
//! ```
//!
//! Grammar assumed here: the first occurrence of `<marker>`, not preceded by an
//! identifier character or `.`, followed by optional whitespace (newlines
//! included), `=`, optional whitespace and `{`. The JSON object starting at that
//! brace is parsed as one value; anything after it (the `;`, more script) is
//! ignored. Any deviation from that shape is "not found".

use regex::Regex;
use serde_json::Value;

use crate::{errors::Error, Result};

#[derive(Clone, Debug)]
pub struct PayloadExtractor {
    marker: String,
    assignment: Regex,
}

impl PayloadExtractor {
    pub fn new(marker: &str) -> Result<Self> {
        let pattern = format!(r"(?:^|[^\w$.]){}\s*=\s*\{{", regex::escape(marker));
        let assignment = Regex::new(&pattern)
            .map_err(|e| Error::Config(format!("invalid payload marker `{marker}`: {e}")))?;
        Ok(Self {
            marker: marker.to_string(),
            assignment,
        })
    }

    /// Locate the assignment and parse the object on its right-hand side.
    ///
    /// `PayloadNotFound` when the assignment is absent, `PayloadParse` when it is
    /// there but the object is not valid JSON.
    pub fn extract(&self, body: &str) -> Result<Value> {
        let Some(m) = self.assignment.find(body) else {
            return Err(self.not_found());
        };

        // The match always ends on the opening brace.
        let object_start = m.end() - 1;
        let mut values =
            serde_json::Deserializer::from_str(&body[object_start..]).into_iter::<Value>();

        match values.next() {
            Some(Ok(value)) => Ok(value),
            Some(Err(e)) => Err(Error::PayloadParse(e)),
            None => Err(self.not_found()),
        }
    }

    fn not_found(&self) -> Error {
        Error::PayloadNotFound {
            marker: self.marker.clone(),
        }
    }
}
