//! Streaming walk over the upstream document shape.
//!
//! Both MTGJSON documents are `{ "meta": {...}, "data": { "<uuid>": ... } }`
//! and the identifier document's `data` object runs to hundreds of MB — it
//! must never be materialised whole. The walker drives a serde visitor over
//! the top-level object, consuming `meta` and anything else as
//! [`IgnoredAny`] and handing each `data` entry to the caller as one small,
//! fully materialised value. Memory is bounded by the largest single entry.

use std::fmt;
use std::io::Read;

use serde::de::{self, DeserializeSeed, IgnoredAny, MapAccess, Visitor};

use crate::error::PriceError;

/// Visits every `(key, value)` entry of the document's `data` object in
/// stream order. Single pass, finite, not restartable. Returns the number of
/// entries visited.
///
/// A syntax error anywhere in the stream — including a transport failure
/// surfaced as an I/O error by the reader — is fatal. Entries that are valid
/// JSON but semantically bogus are the callback's concern to skip and count.
///
/// # Errors
///
/// Returns [`PriceError::MalformedDocument`] tagged with `doc` when the
/// stream cannot be walked to completion.
pub(crate) fn for_each_data_entry<R, F>(
    doc: &'static str,
    reader: R,
    mut on_entry: F,
) -> Result<usize, PriceError>
where
    R: Read,
    F: FnMut(String, serde_json::Value),
{
    let mut deserializer = serde_json::Deserializer::from_reader(reader);
    let mut count = 0usize;
    DocumentSeed {
        count: &mut count,
        on_entry: &mut on_entry,
    }
    .deserialize(&mut deserializer)
    .map_err(|source| PriceError::MalformedDocument { doc, source })?;
    deserializer
        .end()
        .map_err(|source| PriceError::MalformedDocument { doc, source })?;
    Ok(count)
}

/// Seed for the top-level document object: skips everything except `data`.
struct DocumentSeed<'a, F> {
    count: &'a mut usize,
    on_entry: &'a mut F,
}

impl<'de, F> DeserializeSeed<'de> for DocumentSeed<'_, F>
where
    F: FnMut(String, serde_json::Value),
{
    type Value = ();

    fn deserialize<D>(self, deserializer: D) -> Result<Self::Value, D::Error>
    where
        D: de::Deserializer<'de>,
    {
        deserializer.deserialize_map(self)
    }
}

impl<'de, F> Visitor<'de> for DocumentSeed<'_, F>
where
    F: FnMut(String, serde_json::Value),
{
    type Value = ();

    fn expecting(&self, formatter: &mut fmt::Formatter) -> fmt::Result {
        formatter.write_str("a top-level document object")
    }

    fn visit_map<A>(self, mut map: A) -> Result<Self::Value, A::Error>
    where
        A: MapAccess<'de>,
    {
        while let Some(key) = map.next_key::<String>()? {
            if key == "data" {
                map.next_value_seed(EntriesSeed {
                    count: &mut *self.count,
                    on_entry: &mut *self.on_entry,
                })?;
            } else {
                map.next_value::<IgnoredAny>()?;
            }
        }
        Ok(())
    }
}

/// Seed for the `data` object itself: one callback per entry, one entry's
/// value in memory at a time.
struct EntriesSeed<'a, F> {
    count: &'a mut usize,
    on_entry: &'a mut F,
}

impl<'de, F> DeserializeSeed<'de> for EntriesSeed<'_, F>
where
    F: FnMut(String, serde_json::Value),
{
    type Value = ();

    fn deserialize<D>(self, deserializer: D) -> Result<Self::Value, D::Error>
    where
        D: de::Deserializer<'de>,
    {
        deserializer.deserialize_map(self)
    }
}

impl<'de, F> Visitor<'de> for EntriesSeed<'_, F>
where
    F: FnMut(String, serde_json::Value),
{
    type Value = ();

    fn expecting(&self, formatter: &mut fmt::Formatter) -> fmt::Result {
        formatter.write_str("a keyed data object")
    }

    fn visit_map<A>(self, mut map: A) -> Result<Self::Value, A::Error>
    where
        A: MapAccess<'de>,
    {
        while let Some(key) = map.next_key::<String>()? {
            let value: serde_json::Value = map.next_value()?;
            (self.on_entry)(key, value);
            *self.count += 1;
        }
        Ok(())
    }
}

#[cfg(test)]
#[path = "stream_test.rs"]
mod tests;
