//! The store's binary wrapper: a four-byte magic followed by a
//! self-describing protobuf message carrying the payload's group/version/
//! kind and its serialized body.

use kectl_core::{Error, GroupVersionKind};
use prost::Message;

/// `k8s\0`.
pub const MAGIC: &[u8] = &[0x6b, 0x38, 0x73, 0x00];

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct TypeMeta {
    #[prost(string, optional, tag = "1")]
    pub api_version: Option<String>,
    #[prost(string, optional, tag = "2")]
    pub kind: Option<String>,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct Unknown {
    #[prost(message, optional, tag = "1")]
    pub type_meta: Option<TypeMeta>,
    #[prost(bytes = "vec", optional, tag = "2")]
    pub raw: Option<Vec<u8>>,
    #[prost(string, optional, tag = "3")]
    pub content_encoding: Option<String>,
    #[prost(string, optional, tag = "4")]
    pub content_type: Option<String>,
}

/// Parse an envelope. The magic must be present; a payload that fails to
/// decode past it is surfaced as an unknown encoding.
pub fn decode(data: &[u8]) -> Result<Unknown, Error> {
    let body = data.strip_prefix(MAGIC).ok_or(Error::UnknownEncoding)?;
    Unknown::decode(body).map_err(|_| Error::UnknownEncoding)
}

/// Wrap a serialized body back into an envelope for the given kind.
pub fn encode(gvk: &GroupVersionKind, body: Vec<u8>) -> Vec<u8> {
    let unknown = Unknown {
        type_meta: Some(TypeMeta {
            api_version: Some(gvk.api_version()),
            kind: Some(gvk.kind.clone()),
        }),
        raw: Some(body),
        content_encoding: None,
        content_type: None,
    };
    let mut out = MAGIC.to_vec();
    out.extend(unknown.encode_to_vec());
    out
}

pub fn gvk_of(unknown: &Unknown) -> Option<GroupVersionKind> {
    let tm = unknown.type_meta.as_ref()?;
    let kind = tm.kind.as_deref()?;
    if kind.is_empty() {
        return None;
    }
    Some(GroupVersionKind::from_api_version(
        tm.api_version.as_deref().unwrap_or(""),
        kind,
    ))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trip() {
        let gvk = GroupVersionKind::new("", "v1", "Service");
        let body = vec![0x0a, 0x03, b'a', b'b', b'c'];
        let data = encode(&gvk, body.clone());
        assert!(data.starts_with(MAGIC));

        let unknown = decode(&data).unwrap();
        assert_eq!(unknown.raw.as_deref(), Some(body.as_slice()));
        let back = gvk_of(&unknown).unwrap();
        assert_eq!(back, gvk);
        assert_eq!(back.api_version(), "v1");
    }

    #[test]
    fn grouped_api_version() {
        let gvk = GroupVersionKind::new("coordination.k8s.io", "v1", "Lease");
        let unknown = decode(&encode(&gvk, Vec::new())).unwrap();
        let tm = unknown.type_meta.unwrap();
        assert_eq!(tm.api_version.as_deref(), Some("coordination.k8s.io/v1"));
    }

    #[test]
    fn missing_magic_is_unknown_encoding() {
        assert!(matches!(decode(b"notmagic"), Err(Error::UnknownEncoding)));
    }

    #[test]
    fn truncated_message_is_unknown_encoding() {
        let mut data = MAGIC.to_vec();
        data.extend_from_slice(&[0x0a]); // field header with no payload
        assert!(matches!(decode(&data), Err(Error::UnknownEncoding)));
    }
}
