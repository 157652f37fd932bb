//! Serde helpers shared by partial-update patches.

use serde::{Deserialize, Deserializer};

/// Deserializes a present field into `Some(value)`, mapping JSON `null` to
/// `Some(None)`.
///
/// Paired with `#[serde(default)]` so an absent key stays `None`.
pub(crate) fn double_option<'de, D, T>(deserializer: D) -> Result<Option<Option<T>>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    Option::<T>::deserialize(deserializer).map(Some)
}
