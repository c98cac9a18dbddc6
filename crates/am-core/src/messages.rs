use crate::error::MessageError;
use crate::types::{Message, MessageId, RequestId, UserId};

pub trait MessageRepository {
    fn append(
        &self,
        request_id: &RequestId,
        sender_id: &UserId,
        content: String,
    ) -> Result<Message, MessageError>;
    fn list_for_request(&self, request_id: &RequestId) -> Result<Vec<Message>, MessageError>;
    fn delete(&self, id: &MessageId) -> Result<(), MessageError>;
    fn delete_for_request(&self, request_id: &RequestId) -> Result<(), MessageError>;
}
