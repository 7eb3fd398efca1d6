// SPDX-License-Identifier: MIT
// SPDX-FileCopyrightText: 2025-2026 natyamatsya contributors
//
// Pluggable byte codecs. Messages cross the ring as opaque bytes; a codec
// turns values into bytes on the producer side and back on the consumer
// side. The codec choice is per-endpoint and must match on both sides of
// a channel; a mismatch surfaces as a decode failure, not a protocol
// error.

use std::marker::PhantomData;

use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::error::{Error, Result};

/// Encode values to bytes and back.
pub trait Codec: Default {
    type Item;

    fn encode(&self, value: &Self::Item) -> Result<Vec<u8>>;
    fn decode(&self, bytes: &[u8]) -> Result<Self::Item>;
}

/// Compact binary codec for any serde-serializable type.
///
/// This is the structured default. It is Rust-to-Rust only: the encoding
/// is not self-describing across languages, so interop through it is not
/// possible; use [`RawCodec`] and an external format for that.
pub struct BincodeCodec<T> {
    _marker: PhantomData<fn() -> T>,
}

impl<T> std::fmt::Debug for BincodeCodec<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BincodeCodec").finish()
    }
}

impl<T> Default for BincodeCodec<T> {
    fn default() -> Self {
        Self {
            _marker: PhantomData,
        }
    }
}

impl<T: Serialize + DeserializeOwned> Codec for BincodeCodec<T> {
    type Item = T;

    fn encode(&self, value: &T) -> Result<Vec<u8>> {
        bincode::serialize(value).map_err(|e| Error::Serialization(e.to_string()))
    }

    fn decode(&self, bytes: &[u8]) -> Result<T> {
        bincode::deserialize(bytes).map_err(|e| Error::Serialization(e.to_string()))
    }
}

/// Pass-through codec for callers that bring their own bytes.
#[derive(Debug, Default, Clone, Copy)]
pub struct RawCodec;

impl Codec for RawCodec {
    type Item = Vec<u8>;

    fn encode(&self, value: &Vec<u8>) -> Result<Vec<u8>> {
        Ok(value.clone())
    }

    fn decode(&self, bytes: &[u8]) -> Result<Vec<u8>> {
        Ok(bytes.to_vec())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;

    #[derive(Debug, PartialEq, Serialize, Deserialize)]
    struct Sample {
        id: u64,
        label: String,
        readings: Vec<f64>,
    }

    #[test]
    fn bincode_round_trip() {
        let codec = BincodeCodec::<Sample>::default();
        let value = Sample {
            id: 7,
            label: "lidar".into(),
            readings: vec![0.5, -1.25, 3.0],
        };
        let bytes = codec.encode(&value).unwrap();
        assert_eq!(codec.decode(&bytes).unwrap(), value);
    }

    #[test]
    fn bincode_decode_garbage_fails() {
        let codec = BincodeCodec::<Sample>::default();
        let err = codec.decode(&[0xff]).unwrap_err();
        assert!(matches!(err, Error::Serialization(_)));
    }

    #[test]
    fn raw_passes_bytes_through() {
        let codec = RawCodec;
        let bytes = vec![1u8, 2, 3];
        assert_eq!(codec.encode(&bytes).unwrap(), bytes);
        assert_eq!(codec.decode(&bytes).unwrap(), bytes);
    }
}
