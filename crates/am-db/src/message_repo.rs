use crate::util::{from_rfc3339, to_rfc3339};
use am_core::error::MessageError;
use am_core::messages::MessageRepository;
use am_core::types::{Message, MessageId, RequestId, UserId};
use rusqlite::Connection;
use std::str::FromStr;

pub struct MessageRepo<'a> {
    pub conn: &'a Connection,
}

impl<'a> MessageRepo<'a> {
    pub fn new(conn: &'a Connection) -> Self {
        Self { conn }
    }
}

fn db_err(err: rusqlite::Error) -> MessageError {
    MessageError::Storage {
        message: err.to_string(),
    }
}

impl<'a> MessageRepository for MessageRepo<'a> {
    fn append(
        &self,
        request_id: &RequestId,
        sender_id: &UserId,
        content: String,
    ) -> Result<Message, MessageError> {
        let message = Message {
            id: MessageId::generate(),
            request_id: request_id.clone(),
            sender_id: sender_id.clone(),
            content,
            timestamp: chrono::Utc::now(),
        };
        self.conn
            .execute(
                "INSERT INTO messages (id, request_id, sender_id, content, timestamp) VALUES (?1, ?2, ?3, ?4, ?5)",
                (
                    message.id.as_str(),
                    message.request_id.as_str(),
                    message.sender_id.as_str(),
                    message.content.clone(),
                    to_rfc3339(&message.timestamp),
                ),
            )
            .map_err(db_err)?;
        Ok(message)
    }

    fn list_for_request(&self, request_id: &RequestId) -> Result<Vec<Message>, MessageError> {
        let mut stmt = self
            .conn
            .prepare(
                "SELECT id, request_id, sender_id, content, timestamp FROM messages WHERE request_id = ?1 ORDER BY timestamp ASC",
            )
            .map_err(db_err)?;
        let mut rows = stmt.query([request_id.as_str()]).map_err(db_err)?;
        let mut messages = Vec::new();
        while let Some(row) = rows.next().map_err(db_err)? {
            messages.push(map_message_row(row)?);
        }
        Ok(messages)
    }

    fn delete(&self, id: &MessageId) -> Result<(), MessageError> {
        let affected = self
            .conn
            .execute("DELETE FROM messages WHERE id = ?1", [id.as_str()])
            .map_err(db_err)?;
        if affected == 0 {
            return Err(MessageError::NotFound);
        }
        Ok(())
    }

    fn delete_for_request(&self, request_id: &RequestId) -> Result<(), MessageError> {
        self.conn
            .execute(
                "DELETE FROM messages WHERE request_id = ?1",
                [request_id.as_str()],
            )
            .map_err(db_err)?;
        Ok(())
    }
}

fn map_message_row(row: &rusqlite::Row<'_>) -> Result<Message, MessageError> {
    let invalid = |message: String| MessageError::Storage { message };

    let id: String = row.get(0).map_err(db_err)?;
    let request_id: String = row.get(1).map_err(db_err)?;
    let sender_id: String = row.get(2).map_err(db_err)?;
    let content: String = row.get(3).map_err(db_err)?;
    let timestamp: String = row.get(4).map_err(db_err)?;

    Ok(Message {
        id: MessageId::from_str(&id).map_err(|err| invalid(err.to_string()))?,
        request_id: RequestId::from_str(&request_id).map_err(|err| invalid(err.to_string()))?,
        sender_id: UserId::from_str(&sender_id).map_err(|err| invalid(err.to_string()))?,
        content,
        timestamp: from_rfc3339(&timestamp).map_err(|err| invalid(err.to_string()))?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::with_test_db;

    #[test]
    fn append_then_list_in_order() {
        let conn = with_test_db().unwrap();
        let repo = MessageRepo::new(&conn);
        let request_id = RequestId::generate();
        let sender = UserId::generate();

        repo.append(&request_id, &sender, "first".to_string()).unwrap();
        repo.append(&request_id, &sender, "second".to_string()).unwrap();

        let messages = repo.list_for_request(&request_id).unwrap();
        assert_eq!(messages.len(), 2);
        assert_eq!(messages[0].content, "first");
        assert_eq!(messages[1].content, "second");
    }

    #[test]
    fn delete_missing_message_is_not_found() {
        let conn = with_test_db().unwrap();
        let repo = MessageRepo::new(&conn);
        let err = repo.delete(&MessageId::generate()).unwrap_err();
        assert!(matches!(err, MessageError::NotFound));
    }

    #[test]
    fn delete_for_request_clears_the_thread() {
        let conn = with_test_db().unwrap();
        let repo = MessageRepo::new(&conn);
        let request_id = RequestId::generate();
        let sender = UserId::generate();
        repo.append(&request_id, &sender, "bye".to_string()).unwrap();
        repo.delete_for_request(&request_id).unwrap();
        assert!(repo.list_for_request(&request_id).unwrap().is_empty());
    }
}
