//! Declared-order reassembly of downloaded chunks.
//!
//! Downloads may complete in any order once retries are involved, so the
//! server-declared enumeration order is restored explicitly by matching
//! each chunk back to its declared identifier.

use std::collections::{HashMap, HashSet};

use blobwire_types::{BlobId, TransferError};

/// Verify that chunk ids are unique within one upload.
///
/// Blob ids are only scoped to an archive, but within a single upload a
/// duplicate would make registration and reassembly ambiguous.
pub fn check_unique(ids: &[BlobId]) -> Result<(), TransferError> {
    let mut seen = HashSet::with_capacity(ids.len());
    for id in ids {
        if !seen.insert(*id) {
            return Err(TransferError::Programming(format!(
                "duplicate blob id {id} within one upload"
            )));
        }
    }
    Ok(())
}

/// Concatenate chunks in the server-declared order.
///
/// `fetched` maps blob id to downloaded ciphertext in whatever order the
/// downloads completed. A declared id missing from the map is an error;
/// an empty buffer is never substituted for a missing chunk.
pub fn assemble_in_order(
    declared: &[BlobId],
    mut fetched: HashMap<BlobId, Vec<u8>>,
) -> Result<Vec<u8>, TransferError> {
    let total: usize = fetched.values().map(Vec::len).sum();
    let mut joined = Vec::with_capacity(total);
    for blob_id in declared {
        let chunk = fetched
            .remove(blob_id)
            .ok_or(TransferError::MissingChunk { blob_id: *blob_id })?;
        joined.extend_from_slice(&chunk);
    }
    Ok(joined)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn chunk(data: &[u8]) -> (BlobId, Vec<u8>) {
        (BlobId::for_ciphertext(data), data.to_vec())
    }

    #[test]
    fn assembles_in_declared_order() {
        let (id_a, a) = chunk(b"alpha ");
        let (id_b, b) = chunk(b"beta ");
        let (id_c, c) = chunk(b"gamma");

        // completion order differs from declared order
        let mut fetched = HashMap::new();
        fetched.insert(id_c, c);
        fetched.insert(id_a, a);
        fetched.insert(id_b, b);

        let joined = assemble_in_order(&[id_a, id_b, id_c], fetched).unwrap();
        assert_eq!(joined, b"alpha beta gamma");
    }

    #[test]
    fn missing_chunk_fails_loudly() {
        let (id_a, a) = chunk(b"present");
        let (id_b, _) = chunk(b"absent");

        let mut fetched = HashMap::new();
        fetched.insert(id_a, a);

        let result = assemble_in_order(&[id_a, id_b], fetched);
        assert!(
            matches!(result, Err(TransferError::MissingChunk { blob_id }) if blob_id == id_b)
        );
    }

    #[test]
    fn empty_declared_list_yields_empty_buffer() {
        let joined = assemble_in_order(&[], HashMap::new()).unwrap();
        assert!(joined.is_empty());
    }

    #[test]
    fn unique_ids_pass() {
        let ids = [
            BlobId::for_ciphertext(b"one"),
            BlobId::for_ciphertext(b"two"),
        ];
        assert!(check_unique(&ids).is_ok());
    }

    #[test]
    fn duplicate_ids_fail() {
        let id = BlobId::for_ciphertext(b"dup");
        let result = check_unique(&[id, id]);
        assert!(matches!(result, Err(TransferError::Programming(_))));
    }
}
