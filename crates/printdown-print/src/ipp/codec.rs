// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// IPP binary encoding (RFC 8010 SS3).
//
// ```text
// version-number:  2 bytes (major, minor)
// operation-id:    2 bytes (big-endian u16; status-code in responses)
// request-id:      4 bytes (big-endian u32)
// attribute-groups: variable
//   delimiter-tag: 1 byte
//   attributes:    variable
//     value-tag:    1 byte
//     name-length:  2 bytes (big-endian u16)
//     name:         name-length bytes
//     value-length: 2 bytes (big-endian u16)
//     value:        value-length bytes
// end-of-attributes-tag: 1 byte (0x03)
// document-data: remainder
// ```
//
// A multi-valued attribute is written as one named value followed by
// "additional values" whose name-length is zero.  The decoder folds
// additional values back into the preceding attribute, and the encoder
// reproduces the convention exactly, so value order survives a round trip.

use tracing::{debug, warn};

use printdown_core::error::DecodeError;

// ---------------------------------------------------------------------------
// Delimiter tags (RFC 8010 SS3.5.1)
// ---------------------------------------------------------------------------

/// Operation attributes group delimiter.
pub const TAG_OPERATION_ATTRIBUTES: u8 = 0x01;

/// Job attributes group delimiter.
pub const TAG_JOB_ATTRIBUTES: u8 = 0x02;

/// End-of-attributes-tag -- terminates the attribute section.
pub const TAG_END_OF_ATTRIBUTES: u8 = 0x03;

/// Printer attributes group delimiter.
pub const TAG_PRINTER_ATTRIBUTES: u8 = 0x04;

/// Unsupported attributes group delimiter.
pub const TAG_UNSUPPORTED_ATTRIBUTES: u8 = 0x05;

/// Highest tag value reserved for delimiters.
const MAX_DELIMITER_TAG: u8 = 0x0F;

// ---------------------------------------------------------------------------
// Value tags (RFC 8010 SS3.5.2)
// ---------------------------------------------------------------------------

/// Integer value (4 bytes, signed big-endian).
pub const VALUE_TAG_INTEGER: u8 = 0x21;

/// Boolean value (1 byte: 0x00 = false, 0x01 = true).
pub const VALUE_TAG_BOOLEAN: u8 = 0x22;

/// Enum value (4 bytes, same encoding as integer).
pub const VALUE_TAG_ENUM: u8 = 0x23;

/// textWithoutLanguage (UTF-8 string).
pub const VALUE_TAG_TEXT: u8 = 0x41;

/// nameWithoutLanguage (UTF-8 string).
pub const VALUE_TAG_NAME: u8 = 0x42;

/// keyword (US-ASCII string).
pub const VALUE_TAG_KEYWORD: u8 = 0x44;

/// uri (US-ASCII string).
pub const VALUE_TAG_URI: u8 = 0x45;

/// charset (US-ASCII string, e.g. "utf-8").
pub const VALUE_TAG_CHARSET: u8 = 0x47;

/// naturalLanguage (US-ASCII string, e.g. "en-us").
pub const VALUE_TAG_NATURAL_LANGUAGE: u8 = 0x48;

/// mimeMediaType (US-ASCII string, e.g. "application/pdf").
pub const VALUE_TAG_MIME_MEDIA_TYPE: u8 = 0x49;

/// Size of the fixed message header.
pub const HEADER_LEN: usize = 8;

// ---------------------------------------------------------------------------
// Message model
// ---------------------------------------------------------------------------

/// The delimiter that opens an attribute group.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GroupTag {
    Operation,
    Job,
    Printer,
    Unsupported,
    Other(u8),
}

impl GroupTag {
    pub fn from_u8(tag: u8) -> Self {
        match tag {
            TAG_OPERATION_ATTRIBUTES => Self::Operation,
            TAG_JOB_ATTRIBUTES => Self::Job,
            TAG_PRINTER_ATTRIBUTES => Self::Printer,
            TAG_UNSUPPORTED_ATTRIBUTES => Self::Unsupported,
            other => Self::Other(other),
        }
    }

    pub fn as_u8(self) -> u8 {
        match self {
            Self::Operation => TAG_OPERATION_ATTRIBUTES,
            Self::Job => TAG_JOB_ATTRIBUTES,
            Self::Printer => TAG_PRINTER_ATTRIBUTES,
            Self::Unsupported => TAG_UNSUPPORTED_ATTRIBUTES,
            Self::Other(tag) => tag,
        }
    }
}

/// A single typed attribute value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IppValue {
    Integer(i32),
    Boolean(bool),
    Enum(i32),
    Text(String),
    Name(String),
    Keyword(String),
    Uri(String),
    Charset(String),
    NaturalLanguage(String),
    MimeMediaType(String),
    /// Any value this server does not interpret, kept verbatim.
    Other { tag: u8, bytes: Vec<u8> },
}

impl IppValue {
    /// The value tag written before this value.
    pub fn tag(&self) -> u8 {
        match self {
            Self::Integer(_) => VALUE_TAG_INTEGER,
            Self::Boolean(_) => VALUE_TAG_BOOLEAN,
            Self::Enum(_) => VALUE_TAG_ENUM,
            Self::Text(_) => VALUE_TAG_TEXT,
            Self::Name(_) => VALUE_TAG_NAME,
            Self::Keyword(_) => VALUE_TAG_KEYWORD,
            Self::Uri(_) => VALUE_TAG_URI,
            Self::Charset(_) => VALUE_TAG_CHARSET,
            Self::NaturalLanguage(_) => VALUE_TAG_NATURAL_LANGUAGE,
            Self::MimeMediaType(_) => VALUE_TAG_MIME_MEDIA_TYPE,
            Self::Other { tag, .. } => *tag,
        }
    }

    /// Wire bytes of the value (without tag or length prefix).
    pub fn to_bytes(&self) -> Vec<u8> {
        match self {
            Self::Integer(v) | Self::Enum(v) => v.to_be_bytes().to_vec(),
            Self::Boolean(v) => vec![u8::from(*v)],
            Self::Text(s)
            | Self::Name(s)
            | Self::Keyword(s)
            | Self::Uri(s)
            | Self::Charset(s)
            | Self::NaturalLanguage(s)
            | Self::MimeMediaType(s) => s.as_bytes().to_vec(),
            Self::Other { bytes, .. } => bytes.clone(),
        }
    }

    /// Interpret raw wire bytes.  Values whose length does not fit the tag
    /// are kept as `Other`.
    pub fn from_wire(tag: u8, bytes: &[u8]) -> Self {
        let other = || Self::Other {
            tag,
            bytes: bytes.to_vec(),
        };
        let string = |wrap: fn(String) -> Self| {
            String::from_utf8(bytes.to_vec()).map(wrap).unwrap_or_else(|_| other())
        };
        match tag {
            VALUE_TAG_INTEGER | VALUE_TAG_ENUM => match <[u8; 4]>::try_from(bytes) {
                Ok(raw) if tag == VALUE_TAG_INTEGER => Self::Integer(i32::from_be_bytes(raw)),
                Ok(raw) => Self::Enum(i32::from_be_bytes(raw)),
                Err(_) => other(),
            },
            VALUE_TAG_BOOLEAN => match bytes {
                [b] => Self::Boolean(*b != 0),
                _ => other(),
            },
            VALUE_TAG_TEXT => string(Self::Text),
            VALUE_TAG_NAME => string(Self::Name),
            VALUE_TAG_KEYWORD => string(Self::Keyword),
            VALUE_TAG_URI => string(Self::Uri),
            VALUE_TAG_CHARSET => string(Self::Charset),
            VALUE_TAG_NATURAL_LANGUAGE => string(Self::NaturalLanguage),
            VALUE_TAG_MIME_MEDIA_TYPE => string(Self::MimeMediaType),
            _ => other(),
        }
    }

    /// The value as a string, for any of the string-typed tags.
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::Text(s)
            | Self::Name(s)
            | Self::Keyword(s)
            | Self::Uri(s)
            | Self::Charset(s)
            | Self::NaturalLanguage(s)
            | Self::MimeMediaType(s) => Some(s),
            _ => None,
        }
    }

    /// The value as an integer, for integer and enum tags.
    pub fn as_i32(&self) -> Option<i32> {
        match self {
            Self::Integer(v) | Self::Enum(v) => Some(*v),
            _ => None,
        }
    }
}

/// A named attribute with one or more ordered values.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IppAttribute {
    name: String,
    values: Vec<IppValue>,
}

impl IppAttribute {
    pub fn new(name: impl Into<String>, value: IppValue) -> Self {
        Self {
            name: name.into(),
            values: vec![value],
        }
    }

    /// A multi-valued (1setOf) attribute.
    pub fn multi(name: impl Into<String>, values: Vec<IppValue>) -> Self {
        Self {
            name: name.into(),
            values,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn values(&self) -> &[IppValue] {
        &self.values
    }

    pub fn first(&self) -> Option<&IppValue> {
        self.values.first()
    }

    fn push_value(&mut self, value: IppValue) {
        self.values.push(value);
    }
}

/// A group of attributes delimited by a group tag.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AttributeGroup {
    tag: GroupTag,
    attributes: Vec<IppAttribute>,
}

impl AttributeGroup {
    pub fn new(tag: GroupTag) -> Self {
        Self {
            tag,
            attributes: Vec::new(),
        }
    }

    pub fn tag(&self) -> GroupTag {
        self.tag
    }

    pub fn attributes(&self) -> &[IppAttribute] {
        &self.attributes
    }

    /// Find the first attribute with the given name.
    pub fn get(&self, name: &str) -> Option<&IppAttribute> {
        self.attributes.iter().find(|a| a.name == name)
    }

    /// First value of the named attribute as a string.
    pub fn get_str(&self, name: &str) -> Option<&str> {
        self.get(name).and_then(IppAttribute::first).and_then(IppValue::as_str)
    }

    /// First value of the named attribute as an integer.
    pub fn get_i32(&self, name: &str) -> Option<i32> {
        self.get(name).and_then(IppAttribute::first).and_then(IppValue::as_i32)
    }

    pub fn push(&mut self, attribute: IppAttribute) -> &mut Self {
        self.attributes.push(attribute);
        self
    }

    // -- Builder helpers ----------------------------------------------------

    /// Append a single-valued attribute.
    pub fn with(mut self, name: &str, value: IppValue) -> Self {
        self.attributes.push(IppAttribute::new(name, value));
        self
    }

    /// Append a multi-valued attribute.
    pub fn with_values(mut self, name: &str, values: Vec<IppValue>) -> Self {
        self.attributes.push(IppAttribute::multi(name, values));
        self
    }

    pub fn text(self, name: &str, value: &str) -> Self {
        self.with(name, IppValue::Text(value.into()))
    }

    pub fn name_attr(self, name: &str, value: &str) -> Self {
        self.with(name, IppValue::Name(value.into()))
    }

    pub fn keyword(self, name: &str, value: &str) -> Self {
        self.with(name, IppValue::Keyword(value.into()))
    }

    pub fn keywords(self, name: &str, values: &[&str]) -> Self {
        let values = values.iter().map(|v| IppValue::Keyword((*v).into())).collect();
        self.with_values(name, values)
    }

    pub fn uri(self, name: &str, value: &str) -> Self {
        self.with(name, IppValue::Uri(value.into()))
    }

    pub fn charset(self, name: &str, value: &str) -> Self {
        self.with(name, IppValue::Charset(value.into()))
    }

    pub fn natural_language(self, name: &str, value: &str) -> Self {
        self.with(name, IppValue::NaturalLanguage(value.into()))
    }

    pub fn mime_types(self, name: &str, values: &[&str]) -> Self {
        let values = values
            .iter()
            .map(|v| IppValue::MimeMediaType((*v).into()))
            .collect();
        self.with_values(name, values)
    }

    pub fn integer(self, name: &str, value: i32) -> Self {
        self.with(name, IppValue::Integer(value))
    }

    pub fn enum_attr(self, name: &str, value: i32) -> Self {
        self.with(name, IppValue::Enum(value))
    }

    pub fn enums(self, name: &str, values: &[i32]) -> Self {
        let values = values.iter().map(|v| IppValue::Enum(*v)).collect();
        self.with_values(name, values)
    }

    pub fn boolean(self, name: &str, value: bool) -> Self {
        self.with(name, IppValue::Boolean(value))
    }
}

/// A decoded IPP request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IppRequest {
    pub version_major: u8,
    pub version_minor: u8,
    pub operation_id: u16,
    pub request_id: u32,
    pub groups: Vec<AttributeGroup>,
    /// Everything after the end-of-attributes tag.
    pub document: Vec<u8>,
}

impl IppRequest {
    /// A request with an empty attribute section.
    pub fn new(operation_id: u16, request_id: u32) -> Self {
        Self {
            version_major: 1,
            version_minor: 1,
            operation_id,
            request_id,
            groups: Vec::new(),
            document: Vec::new(),
        }
    }

    /// The first operation-attributes group.
    pub fn operation_attributes(&self) -> Option<&AttributeGroup> {
        self.groups.iter().find(|g| g.tag == GroupTag::Operation)
    }

    /// The client's `document-format` hint.
    pub fn document_format(&self) -> Option<&str> {
        self.operation_attributes()
            .and_then(|g| g.get_str("document-format"))
    }

    /// Values of `requested-attributes`, in request order.
    pub fn requested_attributes(&self) -> Vec<&str> {
        self.operation_attributes()
            .and_then(|g| g.get("requested-attributes"))
            .map(|a| a.values().iter().filter_map(IppValue::as_str).collect())
            .unwrap_or_default()
    }

    /// Encode as request bytes, including the document data.
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut buf = Vec::with_capacity(256 + self.document.len());
        write_message(
            &mut buf,
            (self.version_major, self.version_minor),
            self.operation_id,
            self.request_id,
            &self.groups,
        );
        buf.extend_from_slice(&self.document);
        buf
    }
}

/// An IPP response, built once per request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IppResponse {
    pub version_major: u8,
    pub version_minor: u8,
    pub status: u16,
    pub request_id: u32,
    pub groups: Vec<AttributeGroup>,
}

impl IppResponse {
    pub fn new(status: u16, request_id: u32) -> Self {
        Self {
            version_major: 1,
            version_minor: 1,
            status,
            request_id,
            groups: Vec::new(),
        }
    }

    /// Answer with the same protocol version the client used.
    pub fn with_version(mut self, major: u8, minor: u8) -> Self {
        self.version_major = major;
        self.version_minor = minor;
        self
    }

    pub fn group(mut self, group: AttributeGroup) -> Self {
        self.groups.push(group);
        self
    }

    /// Find the first group with the given tag.
    pub fn find_group(&self, tag: GroupTag) -> Option<&AttributeGroup> {
        self.groups.iter().find(|g| g.tag == tag)
    }

    pub fn to_bytes(&self) -> Vec<u8> {
        encode(self)
    }

    /// Parse response bytes (same layout as a request, with the status code
    /// in place of the operation id).
    pub fn from_bytes(data: &[u8]) -> Result<Self, DecodeError> {
        let parsed = decode(data)?;
        Ok(Self {
            version_major: parsed.version_major,
            version_minor: parsed.version_minor,
            status: parsed.operation_id,
            request_id: parsed.request_id,
            groups: parsed.groups,
        })
    }
}

// ---------------------------------------------------------------------------
// Decoder
// ---------------------------------------------------------------------------

/// Parse a raw IPP message body.
///
/// Only a message shorter than the fixed header is an error.  A truncated
/// attribute section keeps everything parsed so far; without an
/// end-of-attributes tag the document is empty.
pub fn decode(data: &[u8]) -> Result<IppRequest, DecodeError> {
    if data.len() < HEADER_LEN {
        return Err(DecodeError::MalformedHeader { len: data.len() });
    }

    let version_major = data[0];
    let version_minor = data[1];
    let operation_id = u16::from_be_bytes([data[2], data[3]]);
    let request_id = u32::from_be_bytes([data[4], data[5], data[6], data[7]]);

    let mut reader = Reader {
        data,
        pos: HEADER_LEN,
    };
    let mut groups: Vec<AttributeGroup> = Vec::new();
    let mut current: Option<AttributeGroup> = None;
    let mut document_start = None;

    while let Some(tag) = reader.u8() {
        if tag <= MAX_DELIMITER_TAG {
            if let Some(group) = current.take() {
                groups.push(group);
            }
            if tag == TAG_END_OF_ATTRIBUTES {
                document_start = Some(reader.pos);
                break;
            }
            current = Some(AttributeGroup::new(GroupTag::from_u8(tag)));
            continue;
        }

        let Some((name, value)) = reader.attribute() else {
            debug!(offset = reader.pos, "IPP attribute section truncated");
            break;
        };
        let value = IppValue::from_wire(tag, value);

        let Some(group) = current.as_mut() else {
            warn!(name = %String::from_utf8_lossy(name), "IPP attribute outside of any group -- discarded");
            continue;
        };

        if name.is_empty() {
            match group.attributes.last_mut() {
                Some(previous) => previous.push_value(value),
                None => warn!("additional value without a preceding attribute -- discarded"),
            }
        } else {
            let name = String::from_utf8_lossy(name).into_owned();
            group.attributes.push(IppAttribute::new(name, value));
        }
    }

    if let Some(group) = current.take() {
        groups.push(group);
    }

    let document = document_start
        .map(|start| data[start..].to_vec())
        .unwrap_or_default();

    Ok(IppRequest {
        version_major,
        version_minor,
        operation_id,
        request_id,
        groups,
        document,
    })
}

/// Bounds-checked cursor over the message bytes.
struct Reader<'a> {
    data: &'a [u8],
    pos: usize,
}

impl<'a> Reader<'a> {
    fn u8(&mut self) -> Option<u8> {
        let byte = *self.data.get(self.pos)?;
        self.pos += 1;
        Some(byte)
    }

    fn u16(&mut self) -> Option<usize> {
        let bytes = self.data.get(self.pos..self.pos + 2)?;
        self.pos += 2;
        Some(usize::from(u16::from_be_bytes([bytes[0], bytes[1]])))
    }

    fn bytes(&mut self, len: usize) -> Option<&'a [u8]> {
        let bytes = self.data.get(self.pos..self.pos + len)?;
        self.pos += len;
        Some(bytes)
    }

    /// name-length, name, value-length, value.
    fn attribute(&mut self) -> Option<(&'a [u8], &'a [u8])> {
        let name_len = self.u16()?;
        let name = self.bytes(name_len)?;
        let value_len = self.u16()?;
        let value = self.bytes(value_len)?;
        Some((name, value))
    }
}

// ---------------------------------------------------------------------------
// Encoder
// ---------------------------------------------------------------------------

/// Encode a response: header, groups in order, end-of-attributes tag.
pub fn encode(response: &IppResponse) -> Vec<u8> {
    let mut buf = Vec::with_capacity(512);
    write_message(
        &mut buf,
        (response.version_major, response.version_minor),
        response.status,
        response.request_id,
        &response.groups,
    );
    buf
}

fn write_message(
    buf: &mut Vec<u8>,
    version: (u8, u8),
    code: u16,
    request_id: u32,
    groups: &[AttributeGroup],
) {
    buf.push(version.0);
    buf.push(version.1);
    buf.extend_from_slice(&code.to_be_bytes());
    buf.extend_from_slice(&request_id.to_be_bytes());

    for group in groups {
        buf.push(group.tag.as_u8());
        for attribute in &group.attributes {
            write_attribute(buf, attribute);
        }
    }

    buf.push(TAG_END_OF_ATTRIBUTES);
}

/// Only the first value carries the name; the rest are additional values.
fn write_attribute(buf: &mut Vec<u8>, attribute: &IppAttribute) {
    for (i, value) in attribute.values.iter().enumerate() {
        let name = if i == 0 { attribute.name.as_bytes() } else { &[] };
        write_field(buf, value.tag(), name, &value.to_bytes());
    }
}

fn write_field(buf: &mut Vec<u8>, value_tag: u8, name: &[u8], value: &[u8]) {
    buf.push(value_tag);
    write_length_prefixed(buf, name);
    write_length_prefixed(buf, value);
}

fn write_length_prefixed(buf: &mut Vec<u8>, bytes: &[u8]) {
    let len = u16::try_from(bytes.len()).unwrap_or_else(|_| {
        warn!(len = bytes.len(), "IPP field longer than 65535 bytes -- truncated");
        u16::MAX
    });
    buf.extend_from_slice(&len.to_be_bytes());
    buf.extend_from_slice(&bytes[..usize::from(len)]);
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    /// Build a request the way a client would write it.
    fn build_test_ipp_request(
        operation_id: u16,
        request_id: u32,
        attributes: &[(u8, &str, &[u8])],
        document_data: &[u8],
    ) -> Vec<u8> {
        let mut buf = vec![0x02, 0x00];
        buf.extend_from_slice(&operation_id.to_be_bytes());
        buf.extend_from_slice(&request_id.to_be_bytes());
        buf.push(TAG_OPERATION_ATTRIBUTES);
        write_test_attr(&mut buf, VALUE_TAG_CHARSET, "attributes-charset", b"utf-8");
        write_test_attr(
            &mut buf,
            VALUE_TAG_NATURAL_LANGUAGE,
            "attributes-natural-language",
            b"en",
        );
        for &(tag, name, value) in attributes {
            write_test_attr(&mut buf, tag, name, value);
        }
        buf.push(TAG_END_OF_ATTRIBUTES);
        buf.extend_from_slice(document_data);
        buf
    }

    fn write_test_attr(buf: &mut Vec<u8>, value_tag: u8, name: &str, value: &[u8]) {
        buf.push(value_tag);
        buf.extend_from_slice(&(name.len() as u16).to_be_bytes());
        buf.extend_from_slice(name.as_bytes());
        buf.extend_from_slice(&(value.len() as u16).to_be_bytes());
        buf.extend_from_slice(value);
    }

    // -- Decoding -----------------------------------------------------------

    #[test]
    fn short_input_is_malformed_header() {
        for len in 0..HEADER_LEN {
            let data = vec![0x01; len];
            assert_eq!(decode(&data), Err(DecodeError::MalformedHeader { len }));
        }
    }

    #[test]
    fn bare_header_decodes() {
        let data = [0x01, 0x01, 0x00, 0x0B, 0x00, 0x00, 0x00, 0x2A];
        let req = decode(&data).unwrap();
        assert_eq!(req.operation_id, 0x000B);
        assert_eq!(req.request_id, 42);
        assert!(req.groups.is_empty());
        assert!(req.document.is_empty());
    }

    #[test]
    fn header_fields_and_groups() {
        let data = build_test_ipp_request(0x000B, 7, &[], &[]);
        let req = decode(&data).unwrap();

        assert_eq!((req.version_major, req.version_minor), (2, 0));
        assert_eq!(req.request_id, 7);
        assert_eq!(req.groups.len(), 1);
        let op = req.operation_attributes().unwrap();
        assert_eq!(op.get_str("attributes-charset"), Some("utf-8"));
        assert_eq!(op.get_str("attributes-natural-language"), Some("en"));
    }

    #[test]
    fn document_follows_end_of_attributes() {
        let doc = b"%PDF-1.4 \x03 contains the end tag byte";
        let data = build_test_ipp_request(0x0002, 1, &[], doc);
        let req = decode(&data).unwrap();
        assert_eq!(req.document, doc);
    }

    #[test]
    fn typed_values_decode() {
        let job_id = 42i32.to_be_bytes();
        let attrs = [
            (VALUE_TAG_INTEGER, "job-id", &job_id[..]),
            (VALUE_TAG_BOOLEAN, "flag", &[1u8][..]),
            (VALUE_TAG_MIME_MEDIA_TYPE, "document-format", b"text/plain"),
        ];
        let data = build_test_ipp_request(0x0008, 5, &attrs, &[]);
        let req = decode(&data).unwrap();
        let op = req.operation_attributes().unwrap();

        assert_eq!(op.get_i32("job-id"), Some(42));
        assert_eq!(op.get("flag").unwrap().first(), Some(&IppValue::Boolean(true)));
        assert_eq!(req.document_format(), Some("text/plain"));
    }

    #[test]
    fn wrong_length_integer_is_kept_opaque() {
        let attrs = [(VALUE_TAG_INTEGER, "odd", &[1u8, 2][..])];
        let data = build_test_ipp_request(0x000B, 1, &attrs, &[]);
        let req = decode(&data).unwrap();
        let value = req.operation_attributes().unwrap().get("odd").unwrap().first();
        assert_eq!(
            value,
            Some(&IppValue::Other {
                tag: VALUE_TAG_INTEGER,
                bytes: vec![1, 2]
            })
        );
    }

    #[test]
    fn additional_values_fold_into_previous_attribute() {
        let attrs = [
            (VALUE_TAG_KEYWORD, "requested-attributes", b"printer-name" as &[u8]),
            (VALUE_TAG_KEYWORD, "", b"printer-state"),
            (VALUE_TAG_KEYWORD, "", b"operations-supported"),
        ];
        let data = build_test_ipp_request(0x000B, 3, &attrs, &[]);
        let req = decode(&data).unwrap();

        assert_eq!(
            req.requested_attributes(),
            vec!["printer-name", "printer-state", "operations-supported"]
        );
        // charset + language + one multi-valued attribute
        assert_eq!(req.operation_attributes().unwrap().attributes().len(), 3);
    }

    #[test]
    fn truncated_attribute_keeps_partial_result() {
        let mut data = build_test_ipp_request(0x0002, 9, &[], &[]);
        data.pop(); // drop end-of-attributes
        // A value tag and a name length promising more bytes than exist.
        data.extend_from_slice(&[VALUE_TAG_NAME, 0x00, 0x20, b'j', b'o']);

        let req = decode(&data).unwrap();
        assert_eq!(req.request_id, 9);
        let op = req.operation_attributes().unwrap();
        assert_eq!(op.attributes().len(), 2);
        assert!(req.document.is_empty());
    }

    #[test]
    fn missing_end_tag_means_no_document() {
        let mut data = build_test_ipp_request(0x0002, 9, &[], &[]);
        data.pop();
        let req = decode(&data).unwrap();
        assert_eq!(req.groups.len(), 1);
        assert!(req.document.is_empty());
    }

    #[test]
    fn attribute_outside_group_is_discarded() {
        let mut data = vec![0x01, 0x01, 0x00, 0x0B, 0, 0, 0, 1];
        write_test_attr(&mut data, VALUE_TAG_KEYWORD, "stray", b"x");
        data.push(TAG_END_OF_ATTRIBUTES);
        let req = decode(&data).unwrap();
        assert!(req.groups.is_empty());
    }

    // -- Encoding -----------------------------------------------------------

    #[test]
    fn response_header_layout() {
        let bytes = IppResponse::new(0x0501, 99).with_version(2, 0).to_bytes();
        assert_eq!(bytes, vec![0x02, 0x00, 0x05, 0x01, 0, 0, 0, 99, TAG_END_OF_ATTRIBUTES]);
    }

    #[test]
    fn operations_supported_uses_additional_values() {
        let ops = [0x0002, 0x0004, 0x0005, 0x0008, 0x0009, 0x000A, 0x000B];
        let response = IppResponse::new(0, 1)
            .group(AttributeGroup::new(GroupTag::Printer).enums("operations-supported", &ops));
        let bytes = response.to_bytes();

        // Header (8) + group tag (1), then the seven encoded values.
        let mut pos = HEADER_LEN + 1;
        let mut named = 0;
        let mut unnamed = 0;
        for (i, op) in ops.iter().enumerate() {
            assert_eq!(bytes[pos], VALUE_TAG_ENUM);
            let name_len = usize::from(u16::from_be_bytes([bytes[pos + 1], bytes[pos + 2]]));
            pos += 3;
            if i == 0 {
                assert_eq!(&bytes[pos..pos + name_len], b"operations-supported");
                named += 1;
            } else {
                assert_eq!(name_len, 0);
                unnamed += 1;
            }
            pos += name_len;
            assert_eq!(u16::from_be_bytes([bytes[pos], bytes[pos + 1]]), 4);
            pos += 2;
            assert_eq!(&bytes[pos..pos + 4], &op.to_be_bytes());
            pos += 4;
        }
        assert_eq!((named, unnamed), (1, 6));
        assert_eq!(bytes[pos], TAG_END_OF_ATTRIBUTES);
        assert_eq!(pos + 1, bytes.len());
    }

    #[test]
    fn name_lengths_come_from_the_string() {
        let response = IppResponse::new(0, 1).group(
            AttributeGroup::new(GroupTag::Printer)
                .mime_types("document-format-supported", &["application/pdf"]),
        );
        let bytes = response.to_bytes();
        let name_len = u16::from_be_bytes([bytes[10], bytes[11]]);
        assert_eq!(usize::from(name_len), "document-format-supported".len());
    }

    #[test]
    fn encode_then_decode_preserves_order() {
        let response = IppResponse::new(0, 77)
            .group(
                AttributeGroup::new(GroupTag::Operation)
                    .charset("attributes-charset", "utf-8")
                    .natural_language("attributes-natural-language", "en-us"),
            )
            .group(
                AttributeGroup::new(GroupTag::Printer)
                    .keywords("ipp-versions-supported", &["1.1", "2.0"])
                    .boolean("printer-is-accepting-jobs", true)
                    .enum_attr("printer-state", 3),
            );

        let parsed = IppResponse::from_bytes(&response.to_bytes()).unwrap();
        assert_eq!(parsed, response);
    }

    #[test]
    fn request_to_bytes_round_trips() {
        let mut request = IppRequest::new(0x0002, 12);
        request.groups.push(
            AttributeGroup::new(GroupTag::Operation)
                .charset("attributes-charset", "utf-8")
                .mime_types("document-format", &["text/plain"]),
        );
        request.document = b"hello".to_vec();

        assert_eq!(decode(&request.to_bytes()).unwrap(), request);
    }

    #[test]
    fn boolean_is_one_byte() {
        assert_eq!(IppValue::Boolean(true).to_bytes(), vec![0x01]);
        assert_eq!(IppValue::Boolean(false).to_bytes(), vec![0x00]);
    }
}
