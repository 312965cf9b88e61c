//! Payload encodings: media-type detection and conversion between JSON,
//! YAML, and the store's self-describing protobuf envelope.

#![forbid(unsafe_code)]

pub mod envelope;
pub mod scheme;
pub mod strategic;

use anyhow::{Context, Result};
use kectl_core::{meta, Error, GroupVersionResource, MediaType};
use serde_json::Value;

/// Identify the encoding of a stored value from its first bytes.
pub fn detect(data: &[u8]) -> Result<MediaType, Error> {
    if data.starts_with(envelope::MAGIC) {
        return Ok(MediaType::Protobuf);
    }
    if std::str::from_utf8(data).is_err() {
        return Err(Error::UnknownEncoding);
    }
    match data.iter().copied().find(|b| !b" \t\r\n".contains(b)) {
        Some(b'{') | Some(b'[') => Ok(MediaType::Json),
        Some(_) => Ok(MediaType::Yaml),
        None => Err(Error::UnknownEncoding),
    }
}

/// Convert a value between media types. Same-type conversion is the
/// identity; everything else pipelines through an in-memory object.
pub fn convert(from: MediaType, to: MediaType, data: &[u8]) -> Result<Vec<u8>> {
    if from == to {
        return Ok(data.to_vec());
    }
    let obj = decode(from, data)?;
    encode(to, &obj)
}

/// Decode a value of a known media type into object JSON.
pub fn decode(from: MediaType, data: &[u8]) -> Result<Value> {
    match from {
        MediaType::Json => serde_json::from_slice(data).context("parsing JSON value"),
        MediaType::Yaml => serde_yaml::from_slice(data).context("parsing YAML value"),
        MediaType::Protobuf => {
            let unknown = envelope::decode(data)?;
            let gvk = envelope::gvk_of(&unknown).ok_or(Error::UnknownEncoding)?;
            let codec = scheme::codec_for(&gvk)
                .ok_or_else(|| Error::UnknownKind { gvk: gvk.to_string() })?;
            codec.decode(unknown.raw.as_deref().unwrap_or_default())
        }
    }
}

/// Encode object JSON into the requested media type.
pub fn encode(to: MediaType, obj: &Value) -> Result<Vec<u8>> {
    match to {
        MediaType::Json => serde_json::to_vec(obj).context("encoding JSON value"),
        MediaType::Yaml => Ok(serde_yaml::to_string(obj)
            .context("encoding YAML value")?
            .into_bytes()),
        MediaType::Protobuf => {
            let gvk = meta::gvk_of(obj).ok_or(Error::UnknownEncoding)?;
            let codec = scheme::codec_for(&gvk)
                .ok_or_else(|| Error::UnknownKind { gvk: gvk.to_string() })?;
            let body = codec.encode(obj)?;
            Ok(envelope::encode(&gvk, body))
        }
    }
}

/// The media type the store expects for this collection: the protobuf
/// envelope for groups the codec set recognizes, JSON otherwise, matching
/// what an API server would write.
pub fn media_type_for_gvr(gvr: &GroupVersionResource) -> MediaType {
    if scheme::group_has_codec(&gvr.group) {
        MediaType::Protobuf
    } else {
        MediaType::Json
    }
}
