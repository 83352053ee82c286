use bytes::Bytes;
use serde::{Deserialize, Serialize};

use crate::{ImplicitTilingError, RangeError};

/// The availability descriptor of a subtree JSON. Exactly one of `constant`
/// and `bitstream` is meaningful; enforcing that exclusivity is up to the
/// producer of the JSON, not this type. The legacy `bufferView` spelling is
/// accepted as an alias for `bitstream`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Availability {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub constant: Option<u32>,
    #[serde(alias = "bufferView", skip_serializing_if = "Option::is_none")]
    pub bitstream: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub available_count: Option<u64>,
}

impl Availability {
    pub fn constant(value: u32) -> Self {
        Self {
            constant: Some(value),
            ..Default::default()
        }
    }

    pub fn bitstream(index: usize) -> Self {
        Self {
            bitstream: Some(index),
            ..Default::default()
        }
    }
}

/// Answers "is node N available" for a fixed number of nodes, either with
/// one constant answer or by reading a packed little-endian bitstream
/// (bit `i & 7` of byte `i >> 3`). The bitstream form holds a refcounted
/// slice of the buffer the subtree parser produced.
#[derive(Debug, Clone)]
pub enum AvailabilityInfo {
    Constant { available: bool, length: u64 },
    Bitstream { bitstream: Bytes, length: u64 },
}

impl AvailabilityInfo {
    /// Selects the concrete form from a descriptor. `buffer_views` are the
    /// already-sliced bufferView byte regions of the enclosing subtree.
    pub fn create(
        availability: &Availability,
        buffer_views: &[Bytes],
        length: u64,
    ) -> Result<Self, ImplicitTilingError> {
        if let Some(constant) = availability.constant {
            return Ok(Self::Constant {
                available: constant != 0,
                length,
            });
        }
        if let Some(index) = availability.bitstream {
            let bitstream = buffer_views
                .get(index)
                .ok_or(ImplicitTilingError::MissingBitstream {
                    index,
                    count: buffer_views.len(),
                })?
                .clone();
            let needed = (length + 7) / 8;
            if (bitstream.len() as u64) < needed {
                return Err(ImplicitTilingError::BitstreamTooShort {
                    length,
                    actual: bitstream.len(),
                });
            }
            return Ok(Self::Bitstream { bitstream, length });
        }
        return Err(ImplicitTilingError::InvalidAvailability);
    }

    pub fn length(&self) -> u64 {
        match self {
            Self::Constant { length, .. } => *length,
            Self::Bitstream { length, .. } => *length,
        }
    }

    /// Whether node `index` is available. Indices at or beyond `length` are
    /// a caller bug and fail with a range error.
    pub fn is_available(&self, index: u64) -> Result<bool, RangeError> {
        let length = self.length();
        if index >= length {
            return Err(RangeError::Index { index, length });
        }
        match self {
            Self::Constant { available, .. } => Ok(*available),
            Self::Bitstream { bitstream, .. } => {
                let byte = bitstream[(index >> 3) as usize];
                Ok((byte >> (index & 7)) & 1 == 1)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn constant_form_answers_for_every_index() {
        let info = AvailabilityInfo::create(&Availability::constant(1), &[], 21).unwrap();
        assert_eq!(info.length(), 21);
        assert!(info.is_available(0).unwrap());
        assert!(info.is_available(20).unwrap());

        let info = AvailabilityInfo::create(&Availability::constant(0), &[], 21).unwrap();
        assert!(!info.is_available(7).unwrap());
    }

    #[test]
    fn bitstream_form_reads_packed_bits() {
        let views = vec![Bytes::from_static(&[0b0000_0101])];
        let info = AvailabilityInfo::create(&Availability::bitstream(0), &views, 5).unwrap();
        assert!(info.is_available(0).unwrap());
        assert!(!info.is_available(1).unwrap());
        assert!(info.is_available(2).unwrap());
        assert!(!info.is_available(3).unwrap());
    }

    #[test]
    fn bit_index_crosses_byte_boundaries() {
        let views = vec![Bytes::from_static(&[0x00, 0x01, 0x80])];
        let info = AvailabilityInfo::create(&Availability::bitstream(0), &views, 24).unwrap();
        assert!(info.is_available(8).unwrap());
        assert!(!info.is_available(9).unwrap());
        assert!(info.is_available(23).unwrap());
    }

    #[test]
    fn out_of_range_queries_fail_in_both_forms() {
        let constant = AvailabilityInfo::create(&Availability::constant(1), &[], 4).unwrap();
        assert_eq!(
            constant.is_available(4),
            Err(RangeError::Index { index: 4, length: 4 })
        );

        let views = vec![Bytes::from_static(&[0xff])];
        let bitstream = AvailabilityInfo::create(&Availability::bitstream(0), &views, 4).unwrap();
        assert_eq!(
            bitstream.is_available(4),
            Err(RangeError::Index { index: 4, length: 4 })
        );
        assert_eq!(
            bitstream.is_available(u64::MAX),
            Err(RangeError::Index {
                index: u64::MAX,
                length: 4
            })
        );
    }

    #[test]
    fn missing_bitstream_index_is_structural() {
        let result = AvailabilityInfo::create(&Availability::bitstream(2), &[], 4);
        assert!(matches!(
            result,
            Err(ImplicitTilingError::MissingBitstream { index: 2, count: 0 })
        ));
    }

    #[test]
    fn short_bitstream_is_rejected_at_construction() {
        let views = vec![Bytes::from_static(&[0xff])];
        let result = AvailabilityInfo::create(&Availability::bitstream(0), &views, 9);
        assert!(matches!(
            result,
            Err(ImplicitTilingError::BitstreamTooShort { length: 9, .. })
        ));
    }

    #[test]
    fn descriptor_with_neither_form_is_rejected() {
        let result = AvailabilityInfo::create(&Availability::default(), &[], 4);
        assert!(matches!(result, Err(ImplicitTilingError::InvalidAvailability)));
    }

    #[test]
    fn legacy_buffer_view_alias_deserializes_as_bitstream() {
        let availability: Availability =
            serde_json::from_str(r#"{ "bufferView": 3 }"#).unwrap();
        assert_eq!(availability.bitstream, Some(3));
    }
}
