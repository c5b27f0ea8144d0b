use thiserror::Error;

#[derive(Debug, Error)]
#[error(transparent)]
pub struct DecodeError(#[from] serde_json::Error);

/// Decodes a stored contact payload: a JSON array of strings, order and
/// duplicates preserved. A bare `null` decodes to no contacts and a `null`
/// element to an empty contact.
pub fn decode_contacts(raw: &[u8]) -> Result<Vec<String>, DecodeError> {
    let contacts: Option<Vec<Option<String>>> = serde_json::from_slice(raw)?;
    Ok(contacts
        .unwrap_or_default()
        .into_iter()
        .map(Option::unwrap_or_default)
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decodes_in_order_and_keeps_duplicates() {
        let contacts =
            decode_contacts(br#"["mailto:b@example.com","tel:1","mailto:b@example.com"]"#)
                .expect("payload should decode");
        assert_eq!(
            contacts,
            vec!["mailto:b@example.com", "tel:1", "mailto:b@example.com"]
        );
    }

    #[test]
    fn null_payload_decodes_to_no_contacts() {
        assert!(decode_contacts(b"null").expect("null should decode").is_empty());
    }

    #[test]
    fn null_elements_decode_to_empty_contacts() {
        let contacts = decode_contacts(br#"["mailto:a@example.com", null]"#)
            .expect("null element should decode");
        assert_eq!(contacts, vec!["mailto:a@example.com", ""]);
    }

    #[test]
    fn rejects_non_string_arrays_and_truncated_json() {
        assert!(decode_contacts(br#"[1, 2]"#).is_err());
        assert!(decode_contacts(br#"{"contact": "mailto:a@example.com"}"#).is_err());
        assert!(decode_contacts(br#"["mailto:a@example.com""#).is_err());
        assert!(decode_contacts(b"").is_err());
    }
}
