use serde::{Deserialize, Serialize};

/// Store-wide settings.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct StoreOptions {
    /// Null marker used when neither the curve nor the log defines one.
    pub default_null_value: Option<String>,
    /// Decimal scale used when projecting numeric index values.
    pub decimal_scale: u32,
}

impl Default for StoreOptions {
    fn default() -> Self {
        Self {
            default_null_value: None,
            decimal_scale: 3,
        }
    }
}

impl StoreOptions {
    /// Builder-style default null value.
    pub fn with_default_null_value(mut self, value: impl Into<String>) -> Self {
        self.default_null_value = Some(value.into());
        self
    }

    /// Builder-style decimal scale.
    pub fn with_decimal_scale(mut self, scale: u32) -> Self {
        self.decimal_scale = scale;
        self
    }

    pub(crate) fn default_null(&self) -> Option<&str> {
        self.default_null_value.as_deref()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn partial_json_keeps_defaults() {
        let options: StoreOptions =
            serde_json::from_str(r#"{ "default_null_value": "-999.25" }"#).expect("deserialize");
        assert_eq!(options.default_null(), Some("-999.25"));
        assert_eq!(options.decimal_scale, 3);
    }
}
