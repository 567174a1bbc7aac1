//! Three-state header fields.
use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// A header field that may be omitted, present-but-empty, or set.
///
/// JSON mapping (with `#[serde(default, skip_serializing_if = "Slot::is_omitted")]`
/// on the containing field): a missing key is [`Slot::Omitted`], `null` is
/// [`Slot::Empty`], anything else is [`Slot::Value`].
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum Slot<T> {
    /// The field is not part of this header's shape.
    Omitted,
    /// The field is present but carries no value.
    Empty,
    /// The field is present with a value.
    Value(T),
}

impl<T> Default for Slot<T> {
    fn default() -> Self {
        Slot::Omitted
    }
}

impl<T> Slot<T> {
    /// Present slot built from an optional value (`None` becomes [`Slot::Empty`]).
    pub fn from_option(value: Option<T>) -> Self {
        value.map_or(Slot::Empty, Slot::Value)
    }

    /// True for [`Slot::Omitted`].
    pub fn is_omitted(&self) -> bool {
        matches!(self, Slot::Omitted)
    }

    /// True unless the slot is omitted.
    pub fn is_present(&self) -> bool {
        !self.is_omitted()
    }

    /// Borrow the value, if any.
    pub fn value(&self) -> Option<&T> {
        match self {
            Slot::Value(v) => Some(v),
            _ => None,
        }
    }

    /// Take the value, if any.
    pub fn into_value(self) -> Option<T> {
        match self {
            Slot::Value(v) => Some(v),
            _ => None,
        }
    }

    /// Write `value` into the slot only if the slot is present.
    ///
    /// Returns whether the slot was written. Omitted slots are never created.
    pub fn assign(&mut self, value: Option<T>) -> bool {
        if self.is_omitted() {
            return false;
        }
        *self = Slot::from_option(value);
        true
    }

    /// Empty a present slot; omitted slots stay omitted.
    pub fn clear(&mut self) {
        if self.is_present() {
            *self = Slot::Empty;
        }
    }

    /// Make an omitted slot present (empty). Set slots keep their value.
    pub fn open(&mut self) {
        if self.is_omitted() {
            *self = Slot::Empty;
        }
    }
}

impl<T: Serialize> Serialize for Slot<T> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Slot::Value(v) => v.serialize(serializer),
            Slot::Empty | Slot::Omitted => serializer.serialize_none(),
        }
    }
}

impl<'de, T: Deserialize<'de>> Deserialize<'de> for Slot<T> {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        Option::<T>::deserialize(deserializer).map(Slot::from_option)
    }
}
