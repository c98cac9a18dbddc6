use crate::util::{decode_enum, decode_json, encode_enum, encode_json, from_rfc3339, to_rfc3339};
use am_core::error::RequestError;
use am_core::requests::{NewRequest, RequestRepository};
use am_core::types::{HelpRequest, RequestId, RequestStatus, UserId};
use rusqlite::Connection;
use std::str::FromStr;

const COLUMNS: &str = "id, title, subject, description, deadline, budget, attachments, status, advance_paid, student_id, helper_id, created_at, updated_at";

pub struct RequestRepo<'a> {
    pub conn: &'a Connection,
}

impl<'a> RequestRepo<'a> {
    pub fn new(conn: &'a Connection) -> Self {
        Self { conn }
    }

    fn query_many(&self, sql: &str, params: &[&dyn rusqlite::ToSql]) -> Result<Vec<HelpRequest>, RequestError> {
        let mut stmt = self.conn.prepare(sql).map_err(db_err)?;
        let mut rows = stmt.query(params).map_err(db_err)?;
        let mut requests = Vec::new();
        while let Some(row) = rows.next().map_err(db_err)? {
            requests.push(map_request_row(row)?);
        }
        Ok(requests)
    }
}

fn db_err(err: rusqlite::Error) -> RequestError {
    RequestError::Storage {
        message: err.to_string(),
    }
}

impl<'a> RequestRepository for RequestRepo<'a> {
    fn insert(&self, input: NewRequest) -> Result<HelpRequest, RequestError> {
        let now = chrono::Utc::now();
        let request = HelpRequest {
            id: RequestId::generate(),
            title: input.title,
            subject: input.subject,
            description: input.description,
            deadline: input.deadline,
            budget: input.budget,
            attachments: input.attachments,
            status: RequestStatus::Open,
            advance_paid: false,
            student_id: input.student_id,
            helper_id: None,
            created_at: now,
            updated_at: now,
        };

        let sql = format!("INSERT INTO help_requests ({COLUMNS}) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13)");
        let params = (
            request.id.as_str(),
            request.title.clone(),
            request.subject.clone(),
            request.description.clone(),
            to_rfc3339(&request.deadline),
            request.budget,
            encode_json(&request.attachments).map_err(|err| RequestError::InvalidInput {
                message: err.to_string(),
            })?,
            encode_enum(&request.status).map_err(|err| RequestError::InvalidInput {
                message: err.to_string(),
            })?,
            request.advance_paid,
            request.student_id.as_str(),
            request.helper_id.as_ref().map(UserId::as_str),
            to_rfc3339(&request.created_at),
            to_rfc3339(&request.updated_at),
        );
        self.conn.execute(&sql, params).map_err(db_err)?;
        Ok(request)
    }

    fn get(&self, id: &RequestId) -> Result<Option<HelpRequest>, RequestError> {
        let sql = format!("SELECT {COLUMNS} FROM help_requests WHERE id = ?1");
        let mut stmt = self.conn.prepare(&sql).map_err(db_err)?;
        let mut rows = stmt.query([id.as_str()]).map_err(db_err)?;
        let Some(row) = rows.next().map_err(db_err)? else {
            return Ok(None);
        };
        map_request_row(row).map(Some)
    }

    fn list_open(&self) -> Result<Vec<HelpRequest>, RequestError> {
        // Both predicates belong in the query: a stale helper assignment
        // must never surface in the browsable list.
        let sql = format!(
            "SELECT {COLUMNS} FROM help_requests WHERE status = 'open' AND helper_id IS NULL ORDER BY created_at DESC"
        );
        self.query_many(&sql, &[])
    }

    fn list_by_student(&self, student_id: &UserId) -> Result<Vec<HelpRequest>, RequestError> {
        let sql = format!(
            "SELECT {COLUMNS} FROM help_requests WHERE student_id = ?1 ORDER BY created_at DESC"
        );
        self.query_many(&sql, &[&student_id.as_str()])
    }

    fn list_by_helper(&self, helper_id: &UserId) -> Result<Vec<HelpRequest>, RequestError> {
        let sql = format!(
            "SELECT {COLUMNS} FROM help_requests WHERE helper_id = ?1 ORDER BY created_at DESC"
        );
        self.query_many(&sql, &[&helper_id.as_str()])
    }

    fn list_all(&self, status: Option<RequestStatus>) -> Result<Vec<HelpRequest>, RequestError> {
        match status {
            Some(status) => {
                let encoded = encode_enum(&status).map_err(|err| RequestError::InvalidInput {
                    message: err.to_string(),
                })?;
                let sql = format!(
                    "SELECT {COLUMNS} FROM help_requests WHERE status = ?1 ORDER BY created_at DESC"
                );
                self.query_many(&sql, &[&encoded])
            }
            None => {
                let sql = format!("SELECT {COLUMNS} FROM help_requests ORDER BY created_at DESC");
                self.query_many(&sql, &[])
            }
        }
    }

    fn try_assign(&self, id: &RequestId, helper_id: &UserId) -> Result<bool, RequestError> {
        // Compare-and-set: the WHERE clause re-checks openness so that of N
        // concurrent claims exactly one row update succeeds.
        let affected = self
            .conn
            .execute(
                "UPDATE help_requests SET helper_id = ?1, status = 'in_progress', updated_at = ?2 \
                 WHERE id = ?3 AND status = 'open' AND helper_id IS NULL",
                (
                    helper_id.as_str(),
                    to_rfc3339(&chrono::Utc::now()),
                    id.as_str(),
                ),
            )
            .map_err(db_err)?;
        Ok(affected == 1)
    }

    fn set_status(
        &self,
        id: &RequestId,
        status: RequestStatus,
    ) -> Result<HelpRequest, RequestError> {
        let encoded = encode_enum(&status).map_err(|err| RequestError::InvalidInput {
            message: err.to_string(),
        })?;
        let affected = self
            .conn
            .execute(
                "UPDATE help_requests SET status = ?1, updated_at = ?2 WHERE id = ?3",
                (encoded, to_rfc3339(&chrono::Utc::now()), id.as_str()),
            )
            .map_err(db_err)?;
        if affected == 0 {
            return Err(RequestError::NotFound);
        }
        self.get(id)?.ok_or(RequestError::NotFound)
    }

    fn set_advance_paid(&self, id: &RequestId) -> Result<HelpRequest, RequestError> {
        let affected = self
            .conn
            .execute(
                "UPDATE help_requests SET advance_paid = 1, updated_at = ?1 WHERE id = ?2",
                (to_rfc3339(&chrono::Utc::now()), id.as_str()),
            )
            .map_err(db_err)?;
        if affected == 0 {
            return Err(RequestError::NotFound);
        }
        self.get(id)?.ok_or(RequestError::NotFound)
    }

    fn set_helper(&self, id: &RequestId, helper_id: &UserId) -> Result<HelpRequest, RequestError> {
        let affected = self
            .conn
            .execute(
                "UPDATE help_requests SET helper_id = ?1, updated_at = ?2 WHERE id = ?3",
                (
                    helper_id.as_str(),
                    to_rfc3339(&chrono::Utc::now()),
                    id.as_str(),
                ),
            )
            .map_err(db_err)?;
        if affected == 0 {
            return Err(RequestError::NotFound);
        }
        self.get(id)?.ok_or(RequestError::NotFound)
    }

    fn delete(&self, id: &RequestId) -> Result<(), RequestError> {
        let affected = self
            .conn
            .execute("DELETE FROM help_requests WHERE id = ?1", [id.as_str()])
            .map_err(db_err)?;
        if affected == 0 {
            return Err(RequestError::NotFound);
        }
        Ok(())
    }

    fn count_by_status(&self, status: RequestStatus) -> Result<u32, RequestError> {
        let encoded = encode_enum(&status).map_err(|err| RequestError::InvalidInput {
            message: err.to_string(),
        })?;
        self.conn
            .query_row(
                "SELECT COUNT(*) FROM help_requests WHERE status = ?1",
                [encoded],
                |row| row.get(0),
            )
            .map_err(db_err)
    }

    fn count_advance_paid(&self) -> Result<u32, RequestError> {
        self.conn
            .query_row(
                "SELECT COUNT(*) FROM help_requests WHERE advance_paid = 1",
                [],
                |row| row.get(0),
            )
            .map_err(db_err)
    }

    fn completed_budget_sum(&self) -> Result<f64, RequestError> {
        self.conn
            .query_row(
                "SELECT COALESCE(SUM(budget), 0.0) FROM help_requests WHERE status = 'completed'",
                [],
                |row| row.get(0),
            )
            .map_err(db_err)
    }
}

fn map_request_row(row: &rusqlite::Row<'_>) -> Result<HelpRequest, RequestError> {
    let invalid = |message: String| RequestError::Storage { message };

    let id: String = row.get(0).map_err(db_err)?;
    let title: String = row.get(1).map_err(db_err)?;
    let subject: String = row.get(2).map_err(db_err)?;
    let description: String = row.get(3).map_err(db_err)?;
    let deadline: String = row.get(4).map_err(db_err)?;
    let budget: Option<f64> = row.get(5).map_err(db_err)?;
    let attachments: String = row.get(6).map_err(db_err)?;
    let status: String = row.get(7).map_err(db_err)?;
    let advance_paid: bool = row.get(8).map_err(db_err)?;
    let student_id: String = row.get(9).map_err(db_err)?;
    let helper_id: Option<String> = row.get(10).map_err(db_err)?;
    let created_at: String = row.get(11).map_err(db_err)?;
    let updated_at: String = row.get(12).map_err(db_err)?;

    Ok(HelpRequest {
        id: RequestId::from_str(&id).map_err(|err| invalid(err.to_string()))?,
        title,
        subject,
        description,
        deadline: from_rfc3339(&deadline).map_err(|err| invalid(err.to_string()))?,
        budget,
        attachments: decode_json(&attachments).map_err(|err| invalid(err.to_string()))?,
        status: decode_enum(&status).map_err(|err| invalid(err.to_string()))?,
        advance_paid,
        student_id: UserId::from_str(&student_id).map_err(|err| invalid(err.to_string()))?,
        helper_id: helper_id
            .map(|value| UserId::from_str(&value))
            .transpose()
            .map_err(|err| invalid(err.to_string()))?,
        created_at: from_rfc3339(&created_at).map_err(|err| invalid(err.to_string()))?,
        updated_at: from_rfc3339(&updated_at).map_err(|err| invalid(err.to_string()))?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::with_test_db;
    use chrono::Utc;

    fn sample(conn: &Connection, student: &UserId) -> HelpRequest {
        RequestRepo::new(conn)
            .insert(NewRequest {
                title: "Statistics assignment".to_string(),
                subject: "Statistics".to_string(),
                description: "ANOVA worksheet".to_string(),
                deadline: Utc::now(),
                budget: Some(300.0),
                attachments: vec!["/uploads/sheet.pdf".to_string()],
                student_id: student.clone(),
            })
            .unwrap()
    }

    #[test]
    fn insert_then_get_round_trips() {
        let conn = with_test_db().unwrap();
        let student = UserId::generate();
        let created = sample(&conn, &student);
        let fetched = RequestRepo::new(&conn).get(&created.id).unwrap().unwrap();
        assert_eq!(created, fetched);
        assert_eq!(fetched.status, RequestStatus::Open);
        assert!(fetched.helper_id.is_none());
    }

    #[test]
    fn try_assign_wins_exactly_once() {
        let conn = with_test_db().unwrap();
        let student = UserId::generate();
        let request = sample(&conn, &student);
        let repo = RequestRepo::new(&conn);

        let first = UserId::generate();
        let second = UserId::generate();
        assert!(repo.try_assign(&request.id, &first).unwrap());
        assert!(!repo.try_assign(&request.id, &second).unwrap());

        let current = repo.get(&request.id).unwrap().unwrap();
        assert_eq!(current.status, RequestStatus::InProgress);
        assert_eq!(current.helper_id, Some(first));
    }

    #[test]
    fn try_assign_on_missing_request_reports_loss() {
        let conn = with_test_db().unwrap();
        let repo = RequestRepo::new(&conn);
        let won = repo
            .try_assign(&RequestId::generate(), &UserId::generate())
            .unwrap();
        assert!(!won);
    }

    #[test]
    fn open_listing_excludes_assigned_requests() {
        let conn = with_test_db().unwrap();
        let student = UserId::generate();
        let kept = sample(&conn, &student);
        let taken = sample(&conn, &student);
        let repo = RequestRepo::new(&conn);
        repo.try_assign(&taken.id, &UserId::generate()).unwrap();

        let open = repo.list_open().unwrap();
        assert_eq!(open.len(), 1);
        assert_eq!(open[0].id, kept.id);
    }

    #[test]
    fn set_status_on_missing_request_is_not_found() {
        let conn = with_test_db().unwrap();
        let repo = RequestRepo::new(&conn);
        let err = repo
            .set_status(&RequestId::generate(), RequestStatus::Cancelled)
            .unwrap_err();
        assert!(matches!(err, RequestError::NotFound));
    }
}
