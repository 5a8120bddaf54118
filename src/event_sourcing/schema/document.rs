use serde_json::Value;

// ============================================================================
// Event Schemas - JSON Schema Documents
// ============================================================================
//
// Schema files are JSON Schema documents (draft 2020-12) describing the full
// field set of one event: identity fields plus payload. The top level must
// describe an object. Optional fields are the ones left out of `required`;
// nullable fields list `"null"` among their types. Extra fields are
// tolerated unless the document says otherwise, and nothing is coerced.
//
// ============================================================================

#[derive(Debug, thiserror::Error, PartialEq)]
#[error("{0}")]
pub struct SchemaParseError(String);

/// A compiled event schema.
pub struct EventSchema {
    document: Value,
    validator: jsonschema::Validator,
}

impl EventSchema {
    pub fn parse(body: &str) -> Result<Self, SchemaParseError> {
        let document: Value =
            serde_json::from_str(body).map_err(|e| SchemaParseError(format!("invalid JSON: {e}")))?;
        Self::from_value(&document)
    }

    pub fn from_value(document: &Value) -> Result<Self, SchemaParseError> {
        if document.get("type").and_then(Value::as_str) != Some("object") {
            return Err(SchemaParseError(
                "event schema must describe an object (\"type\": \"object\")".into(),
            ));
        }

        let validator = jsonschema::options()
            .build(document)
            .map_err(|e| SchemaParseError(format!("invalid schema: {e}")))?;

        Ok(Self {
            document: document.clone(),
            validator,
        })
    }

    /// `title` of the document, if it has one.
    pub fn title(&self) -> Option<&str> {
        self.document.get("title").and_then(Value::as_str)
    }

    pub fn validate(&self, datum: &Value) -> bool {
        self.validator.is_valid(datum)
    }
}

impl std::fmt::Debug for EventSchema {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EventSchema")
            .field("document", &self.document)
            .finish_non_exhaustive()
    }
}
