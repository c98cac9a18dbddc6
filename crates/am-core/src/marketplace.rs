use crate::audit::AuditRepository;
use crate::auth::{generate_token, hash_password, token_hash, verify_password, TOKEN_TTL_DAYS};
use crate::disclosure::project_for_viewer;
use crate::error::{AuthError, MarketError, MessageError, RequestError, UserError};
use crate::messages::MessageRepository;
use crate::requests::{NewRequest, RequestRepository};
use crate::settings::SettingsRepository;
use crate::store::Store;
use crate::tokens::TokenRepository;
use crate::types::io::{
    AdminOverview, CreateRequestInput, LoginInput, RegisterInput, UpdateUserStatusInput,
};
use crate::types::{
    ActivityLog, Actor, AuthToken, HelpRequest, Message, MessageId, RequestId, RequestStatus,
    RequestView, Role, SystemSettings, UpdateSettingsInput, User, UserId,
};
use crate::users::{NewUser, UserRepository};
use crate::validation::{parse_deadline, validate_transition};
use am_events::bus::EventBus;
use am_events::types::FeedEvent;
use chrono::{Duration, Utc};

/// The marketplace engine: loads current state, checks role and ownership,
/// applies the transition inside one transaction, and only then notifies
/// connected clients. It holds no request state across calls.
pub struct Marketplace<S: Store> {
    store: S,
    bus: EventBus,
}

impl<S: Store> Marketplace<S> {
    pub fn new(store: S, bus: EventBus) -> Self {
        Self { store, bus }
    }

    pub fn requests(&self) -> RequestsApi<'_, S> {
        RequestsApi { core: self }
    }

    pub fn messages(&self) -> MessagesApi<'_, S> {
        MessagesApi { core: self }
    }

    pub fn auth(&self) -> AuthApi<'_, S> {
        AuthApi { core: self }
    }

    pub fn admin(&self) -> AdminApi<'_, S> {
        AdminApi { core: self }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn bus(&self) -> &EventBus {
        &self.bus
    }
}

fn require_role(actor: &Actor, wanted: Role, action: &str) -> Result<(), MarketError> {
    // Exhaustive on purpose: a new role must be placed explicitly.
    let allowed = match (actor.role, wanted) {
        (Role::Student, Role::Student) => true,
        (Role::Helper, Role::Helper) => true,
        (Role::Admin, Role::Admin) => true,
        (Role::Student | Role::Helper | Role::Admin, _) => false,
    };
    if allowed {
        Ok(())
    } else {
        Err(AuthError::Forbidden {
            message: format!("role {} not authorized to {action}", actor.role),
        }
        .into())
    }
}

pub struct RequestsApi<'a, S: Store> {
    core: &'a Marketplace<S>,
}

impl<'a, S: Store> RequestsApi<'a, S> {
    pub fn create(
        &self,
        actor: &Actor,
        input: CreateRequestInput,
    ) -> Result<HelpRequest, MarketError> {
        require_role(actor, Role::Student, "post a request")?;
        if input.title.trim().is_empty() {
            return Err(RequestError::InvalidInput {
                message: "title must not be empty".to_string(),
            }
            .into());
        }
        if let Some(budget) = input.budget {
            if budget < 0.0 || !budget.is_finite() {
                return Err(RequestError::InvalidInput {
                    message: "budget must be non-negative".to_string(),
                }
                .into());
            }
        }
        let deadline = parse_deadline(input.deadline.as_deref());
        self.core.store.with_tx(|store| {
            store
                .requests()
                .insert(NewRequest {
                    title: input.title.clone(),
                    subject: input.subject.clone(),
                    description: input.description.clone(),
                    deadline,
                    budget: input.budget,
                    attachments: input.attachments.clone(),
                    student_id: actor.user_id.clone(),
                })
                .map_err(MarketError::from)
        })
    }

    /// The race-sensitive transition. Two helpers can both observe an open
    /// request; the conditional update in the store guarantees at most one
    /// claims it, and the loser gets `Unavailable` rather than a generic
    /// failure so clients can tell "someone beat me" from a server fault.
    pub fn accept(&self, actor: &Actor, id: &RequestId) -> Result<HelpRequest, MarketError> {
        require_role(actor, Role::Helper, "accept a request")?;
        let accepted = self.core.store.with_tx(|store| {
            if store.requests().get(id)?.is_none() {
                return Err(RequestError::Unavailable.into());
            }
            let won = store.requests().try_assign(id, &actor.user_id)?;
            if !won {
                return Err(RequestError::Unavailable.into());
            }
            store
                .requests()
                .get(id)?
                .ok_or_else(|| RequestError::Unavailable.into())
        })?;
        // Fire-and-forget: browsing clients drop the request from their
        // available view; a failed broadcast never unwinds the claim.
        let _ = self.core.bus.publish(FeedEvent::RequestAccepted {
            request_id: accepted.id.to_string(),
        });
        Ok(accepted)
    }

    pub fn pay_advance(&self, actor: &Actor, id: &RequestId) -> Result<HelpRequest, MarketError> {
        self.core.store.with_tx(|store| {
            let request = store.requests().get(id)?.ok_or(RequestError::NotFound)?;
            if request.student_id != actor.user_id {
                return Err(RequestError::Forbidden {
                    message: "only the student can pay the advance".to_string(),
                }
                .into());
            }
            if request.status != RequestStatus::InProgress {
                return Err(RequestError::InvalidState {
                    message: format!("expected in_progress, got {}", request.status),
                }
                .into());
            }
            if request.advance_paid {
                // Paying twice is a no-op, not an error.
                return Ok(request);
            }
            store.requests().set_advance_paid(id).map_err(MarketError::from)
        })
    }

    pub fn complete(&self, actor: &Actor, id: &RequestId) -> Result<HelpRequest, MarketError> {
        self.core.store.with_tx(|store| {
            let request = store.requests().get(id)?.ok_or(RequestError::NotFound)?;
            if request.student_id != actor.user_id {
                return Err(RequestError::Forbidden {
                    message: "only the student can complete the request".to_string(),
                }
                .into());
            }
            validate_transition(request.status, RequestStatus::Completed)?;
            // Status write and counter bump share the transaction: a crash
            // between them must not leave a completed request with an
            // unincremented helper counter.
            let updated = store.requests().set_status(id, RequestStatus::Completed)?;
            if let Some(helper_id) = &updated.helper_id {
                store.users().increment_completed(helper_id)?;
            }
            Ok(updated)
        })
    }

    pub fn cancel(&self, actor: &Actor, id: &RequestId) -> Result<HelpRequest, MarketError> {
        self.core.store.with_tx(|store| {
            let request = store.requests().get(id)?.ok_or(RequestError::NotFound)?;
            let is_party = request.student_id == actor.user_id
                || request.helper_id.as_ref() == Some(&actor.user_id);
            if !is_party {
                return Err(RequestError::Forbidden {
                    message: "you are not authorized to cancel this request".to_string(),
                }
                .into());
            }
            validate_transition(request.status, RequestStatus::Cancelled)?;
            store
                .requests()
                .set_status(id, RequestStatus::Cancelled)
                .map_err(MarketError::from)
        })
    }

    pub fn get_view(&self, actor: &Actor, id: &RequestId) -> Result<RequestView, MarketError> {
        let store = &self.core.store;
        let request = store.requests().get(id)?.ok_or(RequestError::NotFound)?;
        let student = store.users().get(&request.student_id)?;
        let helper = match &request.helper_id {
            Some(helper_id) => store.users().get(helper_id)?,
            None => None,
        };
        Ok(project_for_viewer(
            request,
            student.as_ref(),
            helper.as_ref(),
            &actor.user_id,
        ))
    }

    pub fn list_open(&self) -> Result<Vec<HelpRequest>, MarketError> {
        self.core
            .store
            .requests()
            .list_open()
            .map_err(MarketError::from)
    }

    pub fn list_mine(&self, actor: &Actor) -> Result<Vec<RequestView>, MarketError> {
        let store = &self.core.store;
        let requests = match actor.role {
            Role::Student => store.requests().list_by_student(&actor.user_id)?,
            Role::Helper | Role::Admin => store.requests().list_by_helper(&actor.user_id)?,
        };
        let mut views = Vec::with_capacity(requests.len());
        for request in requests {
            let student = store.users().get(&request.student_id)?;
            let helper = match &request.helper_id {
                Some(helper_id) => store.users().get(helper_id)?,
                None => None,
            };
            views.push(project_for_viewer(
                request,
                student.as_ref(),
                helper.as_ref(),
                &actor.user_id,
            ));
        }
        Ok(views)
    }
}

pub struct MessagesApi<'a, S: Store> {
    core: &'a Marketplace<S>,
}

impl<'a, S: Store> MessagesApi<'a, S> {
    /// Durable append. Room broadcast happens at the transport layer *after*
    /// this returns, so a failed write can never produce a phantom message.
    pub fn post(
        &self,
        actor: &Actor,
        request_id: &RequestId,
        content: String,
    ) -> Result<Message, MarketError> {
        if content.trim().is_empty() {
            return Err(MessageError::InvalidInput {
                message: "message content must not be empty".to_string(),
            }
            .into());
        }
        self.core.store.with_tx(|store| {
            if store
                .requests()
                .get(request_id)
                .map_err(MarketError::from)?
                .is_none()
            {
                return Err(MessageError::RequestNotFound.into());
            }
            store
                .messages()
                .append(request_id, &actor.user_id, content.clone())
                .map_err(MarketError::from)
        })
    }

    pub fn list(&self, request_id: &RequestId) -> Result<Vec<Message>, MarketError> {
        self.core
            .store
            .messages()
            .list_for_request(request_id)
            .map_err(MarketError::from)
    }
}

pub struct AuthApi<'a, S: Store> {
    core: &'a Marketplace<S>,
}

impl<'a, S: Store> AuthApi<'a, S> {
    pub fn register(&self, input: RegisterInput) -> Result<User, MarketError> {
        if input.password.len() < 6 {
            return Err(UserError::InvalidInput {
                message: "password must be at least 6 characters".to_string(),
            }
            .into());
        }
        let password_hash = hash_password(&input.password)?;
        self.core.store.with_tx(|store| {
            if store.users().get_by_email(&input.email)?.is_some() {
                return Err(UserError::EmailTaken.into());
            }
            store
                .users()
                .insert(NewUser {
                    name: input.name.clone(),
                    email: input.email.clone(),
                    password_hash: password_hash.clone(),
                    role: input.role,
                    phone_number: input.phone_number.clone(),
                })
                .map_err(MarketError::from)
        })
    }

    /// Verifies the password and issues an opaque bearer token. The raw
    /// token is returned exactly once; only its hash is stored.
    pub fn login(&self, input: LoginInput) -> Result<(User, String), MarketError> {
        let raw_token = generate_token();
        self.core.store.with_tx(|store| {
            let user = store
                .users()
                .get_by_email(&input.email)?
                .ok_or(AuthError::Unauthenticated)?;
            if !verify_password(&input.password, &user.password_hash) {
                return Err(AuthError::Unauthenticated.into());
            }
            let now = Utc::now();
            store.tokens().insert(AuthToken {
                token_hash: token_hash(&raw_token),
                user_id: user.id.clone(),
                expires_at: now + Duration::days(TOKEN_TTL_DAYS),
                created_at: now,
            })?;
            if user.role == Role::Admin {
                if let Err(err) = store.audit().append(
                    &user.id,
                    "login",
                    Some("Admin logged into dashboard".to_string()),
                ) {
                    tracing::warn!(error = %err, "audit log write failed");
                }
            }
            Ok((user, raw_token.clone()))
        })
    }

    pub fn logout(&self, credential: &str) -> Result<(), MarketError> {
        self.core.store.tokens().revoke(&token_hash(credential))
    }

    /// Bearer credential -> user. Invalid or expired tokens surface as
    /// `Unauthenticated`; suspended accounts as `Suspended`. Never retried.
    pub fn resolve(&self, credential: &str) -> Result<User, MarketError> {
        let store = &self.core.store;
        let token = store
            .tokens()
            .get_valid(&token_hash(credential), Utc::now())?
            .ok_or(AuthError::Unauthenticated)?;
        let user = store
            .users()
            .get(&token.user_id)?
            .ok_or(AuthError::Unauthenticated)?;
        if user.is_suspended {
            return Err(AuthError::Suspended.into());
        }
        Ok(user)
    }
}

pub struct AdminApi<'a, S: Store> {
    core: &'a Marketplace<S>,
}

impl<'a, S: Store> AdminApi<'a, S> {
    /// Audit completeness is a compliance property, not a precondition: a
    /// failed audit write is logged and the primary mutation stands.
    fn audit(store: &S, actor: &Actor, action: &str, details: Option<String>) {
        if let Err(err) = store.audit().append(&actor.user_id, action, details) {
            tracing::warn!(action, error = %err, "audit log write failed");
        }
    }

    pub fn overview(&self, actor: &Actor) -> Result<AdminOverview, MarketError> {
        require_role(actor, Role::Admin, "view the overview")?;
        let store = &self.core.store;
        let settings = store.settings().get()?;
        let revenue_base = store.requests().completed_budget_sum()?;
        Ok(AdminOverview {
            total_users: store.users().count(None)?,
            total_helpers: store.users().count(Some(Role::Helper))?,
            total_students: store.users().count(Some(Role::Student))?,
            pending_verifications: store.users().count_unverified()?,
            active_requests: store.requests().count_by_status(RequestStatus::InProgress)?,
            completed_requests: store.requests().count_by_status(RequestStatus::Completed)?,
            total_transactions: store.requests().count_advance_paid()?,
            revenue_summary: revenue_base * settings.commission_percentage / 100.0,
        })
    }

    pub fn list_users(
        &self,
        actor: &Actor,
        role: Option<Role>,
        verified: Option<bool>,
    ) -> Result<Vec<User>, MarketError> {
        require_role(actor, Role::Admin, "list users")?;
        self.core
            .store
            .users()
            .list(role, verified)
            .map_err(MarketError::from)
    }

    pub fn set_user_status(
        &self,
        actor: &Actor,
        user_id: &UserId,
        input: UpdateUserStatusInput,
    ) -> Result<User, MarketError> {
        require_role(actor, Role::Admin, "update user status")?;
        self.core.store.with_tx(|store| {
            let mut user = store.users().get(user_id)?.ok_or(UserError::NotFound)?;
            if let Some(suspended) = input.is_suspended {
                user = store.users().set_suspended(user_id, suspended)?;
                let action = if suspended { "suspend_user" } else { "reactivate_user" };
                Self::audit(store, actor, action, Some(format!("User ID: {user_id}")));
            }
            if let Some(verified) = input.is_verified {
                user = store.users().set_verified(user_id, verified)?;
                let action = if verified { "verify_user" } else { "unverify_user" };
                Self::audit(store, actor, action, Some(format!("User ID: {user_id}")));
            }
            Ok(user)
        })
    }

    pub fn delete_user(&self, actor: &Actor, user_id: &UserId) -> Result<(), MarketError> {
        require_role(actor, Role::Admin, "delete users")?;
        self.core.store.with_tx(|store| {
            if store.users().get(user_id)?.is_none() {
                return Err(UserError::NotFound.into());
            }
            store.tokens().revoke_for_user(user_id)?;
            store.users().delete(user_id)?;
            Self::audit(store, actor, "delete_user", Some(format!("User ID: {user_id}")));
            Ok(())
        })
    }

    /// Admin listing intentionally returns the bare records: no viewer, no
    /// phone disclosure.
    pub fn list_requests(
        &self,
        actor: &Actor,
        status: Option<RequestStatus>,
    ) -> Result<Vec<HelpRequest>, MarketError> {
        require_role(actor, Role::Admin, "list requests")?;
        self.core
            .store
            .requests()
            .list_all(status)
            .map_err(MarketError::from)
    }

    /// Corrective override: overwrites the helper regardless of status or
    /// prior assignment, bypassing every accept precondition.
    pub fn reassign_helper(
        &self,
        actor: &Actor,
        request_id: &RequestId,
        helper_id: &UserId,
    ) -> Result<HelpRequest, MarketError> {
        require_role(actor, Role::Admin, "reassign helpers")?;
        self.core.store.with_tx(|store| {
            let request = store.requests().get(request_id)?;
            let helper = store.users().get(helper_id)?;
            let helper_ok = helper.is_some_and(|user| user.role == Role::Helper);
            if request.is_none() || !helper_ok {
                return Err(RequestError::NotFound.into());
            }
            let updated = store.requests().set_helper(request_id, helper_id)?;
            Self::audit(
                store,
                actor,
                "reassign_helper",
                Some(format!("Request ID: {request_id}, New Helper: {helper_id}")),
            );
            Ok(updated)
        })
    }

    /// The one hard delete in the system. Messages go with their request.
    pub fn delete_request(&self, actor: &Actor, request_id: &RequestId) -> Result<(), MarketError> {
        require_role(actor, Role::Admin, "delete requests")?;
        self.core.store.with_tx(|store| {
            if store.requests().get(request_id)?.is_none() {
                return Err(RequestError::NotFound.into());
            }
            store.messages().delete_for_request(request_id)?;
            store.requests().delete(request_id)?;
            Self::audit(
                store,
                actor,
                "delete_request",
                Some(format!("Request ID: {request_id}")),
            );
            Ok(())
        })
    }

    pub fn chat_history(
        &self,
        actor: &Actor,
        request_id: &RequestId,
    ) -> Result<Vec<Message>, MarketError> {
        require_role(actor, Role::Admin, "view chat history")?;
        self.core
            .store
            .messages()
            .list_for_request(request_id)
            .map_err(MarketError::from)
    }

    pub fn delete_message(&self, actor: &Actor, message_id: &MessageId) -> Result<(), MarketError> {
        require_role(actor, Role::Admin, "delete messages")?;
        self.core.store.with_tx(|store| {
            store.messages().delete(message_id)?;
            Self::audit(
                store,
                actor,
                "delete_message",
                Some(format!("Message ID: {message_id}")),
            );
            Ok(())
        })
    }

    pub fn get_settings(&self, actor: &Actor) -> Result<SystemSettings, MarketError> {
        require_role(actor, Role::Admin, "view settings")?;
        self.core.store.settings().get().map_err(MarketError::from)
    }

    pub fn update_settings(
        &self,
        actor: &Actor,
        input: UpdateSettingsInput,
    ) -> Result<SystemSettings, MarketError> {
        require_role(actor, Role::Admin, "update settings")?;
        self.core.store.with_tx(move |store| {
            let mut settings = store.settings().get()?;
            let changed = settings.apply(input);
            store.settings().save(&settings)?;
            Self::audit(
                store,
                actor,
                "update_settings",
                Some(changed.join(", ")),
            );
            Ok(settings)
        })
    }

    pub fn logs(&self, actor: &Actor) -> Result<Vec<ActivityLog>, MarketError> {
        require_role(actor, Role::Admin, "view logs")?;
        self.core.store.audit().recent(100)
    }
}
