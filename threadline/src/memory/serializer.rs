//! Serializer for checkpoint state (state <-> bytes), used by `SqliteSaver`.

use crate::memory::checkpointer::CheckpointError;

/// Serializes and deserializes state for checkpoint storage.
///
/// `MemorySaver` keeps `Checkpoint<S>` values directly and does not use one.
pub trait Serializer<S>: Send + Sync
where
    S: Clone + Send + Sync + 'static,
{
    fn serialize(&self, state: &S) -> Result<Vec<u8>, CheckpointError>;

    fn deserialize(&self, bytes: &[u8]) -> Result<S, CheckpointError>;
}

/// JSON serializer for any serde state.
pub struct JsonSerializer;

impl<S> Serializer<S> for JsonSerializer
where
    S: Clone + Send + Sync + 'static + serde::Serialize + serde::de::DeserializeOwned,
{
    fn serialize(&self, state: &S) -> Result<Vec<u8>, CheckpointError> {
        serde_json::to_vec(state).map_err(|e| CheckpointError::Serialization(e.to_string()))
    }

    fn deserialize(&self, bytes: &[u8]) -> Result<S, CheckpointError> {
        serde_json::from_slice(bytes).map_err(|e| CheckpointError::Serialization(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{Conversation, Message};

    #[test]
    fn conversation_survives_json_serializer() {
        let mut conv = Conversation::new("t");
        conv.push(Message::human("hi"));
        conv.push(Message::ai("hello"));
        let bytes = Serializer::<Conversation>::serialize(&JsonSerializer, &conv).unwrap();
        let back = Serializer::<Conversation>::deserialize(&JsonSerializer, &bytes).unwrap();
        assert_eq!(back, conv);
    }

    #[test]
    fn invalid_bytes_are_a_serialization_error() {
        let err = Serializer::<Conversation>::deserialize(&JsonSerializer, b"{ not json ]")
            .unwrap_err();
        assert!(matches!(err, CheckpointError::Serialization(ref s) if !s.is_empty()));
    }
}
