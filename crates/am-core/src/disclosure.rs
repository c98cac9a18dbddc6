use crate::types::{HelpRequest, RequestView, User, UserId};

/// Builds the per-viewer projection of a request.
///
/// The phone number is revealed only once the advance is paid and both
/// parties are on the record, and each party sees the *other* side's number.
/// Anyone else gets no phone at all. The result is computed at read time for
/// one viewer; nothing derived here is ever persisted.
pub fn project_for_viewer(
    request: HelpRequest,
    student: Option<&User>,
    helper: Option<&User>,
    viewer: &UserId,
) -> RequestView {
    let peer_phone = if request.advance_paid && request.helper_id.is_some() {
        if *viewer == request.student_id {
            helper.and_then(|user| user.phone_number.clone())
        } else if request.helper_id.as_ref() == Some(viewer) {
            student.and_then(|user| user.phone_number.clone())
        } else {
            None
        }
    } else {
        None
    };

    RequestView {
        student_name: student.map(|user| user.name.clone()),
        helper_name: helper.map(|user| user.name.clone()),
        peer_phone,
        request,
    }
}
