//! Render output description.

use prism_core::{CompoundData, Data};

/// A named render target.
///
/// `data` selects what is written: `rgb`, `rgba`, `float <name>`,
/// `color <name>`, `vector <name>` or `lpe <expression>`.
#[derive(Debug, Clone, PartialEq)]
pub struct Output {
    pub file_name: String,
    pub driver_type: String,
    pub data: String,
    pub parameters: CompoundData,
}

impl Output {
    #[must_use]
    pub fn new(file_name: impl Into<String>, driver_type: impl Into<String>, data: impl Into<String>) -> Self {
        Self {
            file_name: file_name.into(),
            driver_type: driver_type.into(),
            data: data.into(),
            parameters: CompoundData::new(),
        }
    }

    #[must_use]
    pub fn with_parameter(mut self, name: impl Into<String>, value: impl Into<Data>) -> Self {
        self.parameters.insert(name, value);
        self
    }

    /// Per-output camera override.
    #[must_use]
    pub fn camera(&self) -> Option<&str> {
        self.parameters
            .get("camera")
            .and_then(Data::as_str)
            .filter(|c| !c.is_empty())
    }
}
