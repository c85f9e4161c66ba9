use crate::errors::SerializationError;
use crate::ports::outbound::RecordSerializer;
use serde::de::DeserializeOwned;
use serde::Serialize;

/// Default record serializer using bincode.
///
/// Byte fields are written raw (length-prefixed), not hex encoded.
#[derive(Debug, Default, Clone, Copy)]
pub struct BincodeRecordSerializer;

impl RecordSerializer for BincodeRecordSerializer {
    fn encode<T: Serialize>(&self, record: &T) -> Result<Vec<u8>, SerializationError> {
        bincode::serialize(record).map_err(|e| SerializationError {
            message: e.to_string(),
        })
    }

    fn decode<T: DeserializeOwned>(&self, bytes: &[u8]) -> Result<T, SerializationError> {
        bincode::deserialize(bytes).map_err(|e| SerializationError {
            message: e.to_string(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::entities::{Message, Profile};
    use crate::domain::value_objects::{AccountId, Bytes, MessageId};

    #[test]
    fn test_message_with_media_decodes() {
        let serializer = BincodeRecordSerializer;
        let message = Message {
            id: MessageId::new(7),
            sender: AccountId::from("alice"),
            recipient: AccountId::from("bob"),
            ciphertext: Bytes::from(vec![0xde, 0xad, 0xbe, 0xef]),
            media: Some(Bytes::from(b"ipfs://cid".to_vec())),
            height: 3,
        };

        let bytes = serializer.encode(&message).unwrap();
        let decoded: Message = serializer.decode(&bytes).unwrap();
        assert_eq!(decoded, message);
    }

    #[test]
    fn test_ciphertext_stored_raw() {
        let serializer = BincodeRecordSerializer;
        let profile = Profile {
            owner: AccountId::from("alice"),
            username: "alice".into(),
            pubkey: Bytes::from(vec![0x02; 33]),
            registered_at: 1,
        };
        let bytes = serializer.encode(&profile).unwrap();
        // Raw bytes, not the "0x0202.." hex rendering used for JSON.
        assert!(bytes.windows(33).any(|w| w.iter().all(|b| *b == 0x02)));
    }

    #[test]
    fn test_garbage_is_rejected() {
        let serializer = BincodeRecordSerializer;
        let result: Result<Message, _> = serializer.decode(&[0xff, 0x01]);
        assert!(result.is_err());
    }
}
