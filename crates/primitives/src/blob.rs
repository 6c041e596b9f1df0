use alloy::eips::eip4844::{BYTES_PER_BLOB, Blob};
use thiserror::Error;

/// The number of field elements in a single blob.
const FIELD_ELEMENTS: usize = BYTES_PER_BLOB / 32;

/// Usable data bytes per 32-byte field element. The top byte of every word is
/// left at zero so the element always stays below the BLS12-381 modulus.
const DATA_BYTES_PER_FIELD_ELEMENT: usize = 31;

/// The encoding version written into the first field element.
const ENCODING_VERSION: u8 = 0;

/// The maximum number of data bytes a single blob can carry: 31 usable bytes
/// per field element, minus one version byte and a 4-byte length prefix.
pub const MAX_BLOB_DATA_SIZE: usize = FIELD_ELEMENTS * DATA_BYTES_PER_FIELD_ELEMENT - 5;

/// An error that can occur while encoding or decoding blob data.
#[derive(Debug, Error)]
pub enum BlobError {
    /// The input data does not fit into a single blob.
    #[error("data of {0} bytes exceeds blob capacity of {MAX_BLOB_DATA_SIZE} bytes")]
    TooLarge(usize),
    /// The blob was encoded with an unknown version.
    #[error("unknown blob encoding version: {0}")]
    UnknownVersion(u8),
    /// The declared payload length exceeds the blob capacity.
    #[error("invalid blob payload length: {0}")]
    InvalidLength(u32),
}

/// Encodes `data` into a single fixed-size blob.
///
/// Layout: the first field element carries `[0x00, version, len_be_u32, data..]`,
/// every subsequent element carries `[0x00, data..]`. All elements keep their
/// top byte at zero, which keeps them canonical field elements.
pub fn encode_blob_data(data: &[u8]) -> Result<Blob, BlobError> {
    if data.len() > MAX_BLOB_DATA_SIZE {
        return Err(BlobError::TooLarge(data.len()));
    }

    let mut bytes = [0u8; BYTES_PER_BLOB];
    bytes[1] = ENCODING_VERSION;
    bytes[2..6].copy_from_slice(&(data.len() as u32).to_be_bytes());

    let (head, rest) = data.split_at(data.len().min(DATA_BYTES_PER_FIELD_ELEMENT - 5));
    bytes[6..6 + head.len()].copy_from_slice(head);

    for (element, chunk) in rest.chunks(DATA_BYTES_PER_FIELD_ELEMENT).enumerate() {
        let offset = (element + 1) * 32 + 1;
        bytes[offset..offset + chunk.len()].copy_from_slice(chunk);
    }

    Ok(Blob::from(bytes))
}

/// Decodes the payload of a blob produced by [`encode_blob_data`].
pub fn decode_blob_data(blob: &Blob) -> Result<Vec<u8>, BlobError> {
    if blob[1] != ENCODING_VERSION {
        return Err(BlobError::UnknownVersion(blob[1]));
    }

    let declared = u32::from_be_bytes([blob[2], blob[3], blob[4], blob[5]]);
    if declared as usize > MAX_BLOB_DATA_SIZE {
        return Err(BlobError::InvalidLength(declared));
    }

    let mut data = Vec::with_capacity(declared as usize);
    data.extend_from_slice(&blob[6..32]);
    for element in 1..FIELD_ELEMENTS {
        if data.len() >= declared as usize {
            break;
        }
        let offset = element * 32 + 1;
        data.extend_from_slice(&blob[offset..offset + DATA_BYTES_PER_FIELD_ELEMENT]);
    }

    data.truncate(declared as usize);
    Ok(data)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn roundtrip_small_payload() {
        let data = b"hello rollup".to_vec();
        let blob = encode_blob_data(&data).unwrap();
        assert_eq!(decode_blob_data(&blob).unwrap(), data);
    }

    #[test]
    fn roundtrip_max_payload() {
        let data: Vec<u8> = (0..MAX_BLOB_DATA_SIZE).map(|i| (i % 251) as u8).collect();
        let blob = encode_blob_data(&data).unwrap();
        assert_eq!(decode_blob_data(&blob).unwrap(), data);
    }

    #[test]
    fn oversized_payload_is_rejected() {
        let data = vec![0u8; MAX_BLOB_DATA_SIZE + 1];
        assert!(matches!(encode_blob_data(&data), Err(BlobError::TooLarge(_))));
    }

    #[test]
    fn field_element_top_bytes_stay_zero() {
        let data = vec![0xff; MAX_BLOB_DATA_SIZE];
        let blob = encode_blob_data(&data).unwrap();
        for element in 0..FIELD_ELEMENTS {
            assert_eq!(blob[element * 32], 0, "element {element} has a non-zero top byte");
        }
    }

    #[test]
    fn unknown_version_is_rejected() {
        let mut bytes = [0u8; BYTES_PER_BLOB];
        bytes[1] = 9;
        assert!(matches!(decode_blob_data(&Blob::from(bytes)), Err(BlobError::UnknownVersion(9))));
    }
}
