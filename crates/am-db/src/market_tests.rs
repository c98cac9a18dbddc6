use crate::schema;
use crate::store::DbStore;
use am_core::error::{AuthError, MarketError, RequestError};
use am_core::marketplace::Marketplace;
use am_core::requests::RequestRepository;
use am_core::types::io::{CreateRequestInput, LoginInput, RegisterInput};
use am_core::types::{Actor, HelpRequest, RequestStatus, Role};
use am_core::users::{NewUser, UserRepository};
use am_core::Store;
use am_events::bus::EventBus;
use am_events::types::FeedEvent;

fn market() -> Marketplace<DbStore> {
    let store = DbStore::new(schema::with_test_db().unwrap());
    Marketplace::new(store, EventBus::new(16))
}

/// Inserts a user directly at the repo layer; engine registration runs a
/// real argon2 hash, which the lifecycle tests do not need.
fn seed_user(market: &Marketplace<DbStore>, name: &str, role: Role) -> Actor {
    let user = market
        .store()
        .users()
        .insert(NewUser {
            name: name.to_string(),
            email: format!("{name}@cvru.ac.in"),
            password_hash: "$argon2id$stub".to_string(),
            role,
            phone_number: Some(format!("{name}-phone")),
        })
        .unwrap();
    Actor::of(&user)
}

fn post_request(market: &Marketplace<DbStore>, student: &Actor) -> HelpRequest {
    market
        .requests()
        .create(
            student,
            CreateRequestInput {
                title: "Linear algebra problem set".to_string(),
                subject: "Mathematics".to_string(),
                description: "Eigenvalue exercises 1-12".to_string(),
                deadline: Some("2026-09-01T10:00:00Z".to_string()),
                budget: Some(500.0),
                attachments: Vec::new(),
            },
        )
        .unwrap()
}

#[test]
fn create_requires_student_role() {
    let market = market();
    let helper = seed_user(&market, "hari", Role::Helper);
    let err = market
        .requests()
        .create(
            &helper,
            CreateRequestInput {
                title: "nope".to_string(),
                subject: "nope".to_string(),
                description: "nope".to_string(),
                deadline: None,
                budget: None,
                attachments: Vec::new(),
            },
        )
        .unwrap_err();
    assert!(matches!(
        err,
        MarketError::Auth(AuthError::Forbidden { .. })
    ));
}

#[test]
fn new_request_is_open_and_unassigned() {
    let market = market();
    let student = seed_user(&market, "sana", Role::Student);
    let request = post_request(&market, &student);
    assert_eq!(request.status, RequestStatus::Open);
    assert!(request.helper_id.is_none());
    assert!(!request.advance_paid);
    assert_eq!(request.student_id, student.user_id);
}

#[test]
fn negative_budget_is_rejected() {
    let market = market();
    let student = seed_user(&market, "sana", Role::Student);
    let err = market
        .requests()
        .create(
            &student,
            CreateRequestInput {
                title: "bad budget".to_string(),
                subject: "Math".to_string(),
                description: "x".to_string(),
                deadline: None,
                budget: Some(-5.0),
                attachments: Vec::new(),
            },
        )
        .unwrap_err();
    assert!(matches!(
        err,
        MarketError::Request(RequestError::InvalidInput { .. })
    ));
}

#[test]
fn accept_assigns_helper_and_emits_feed_event() {
    let market = market();
    let student = seed_user(&market, "sana", Role::Student);
    let helper = seed_user(&market, "hari", Role::Helper);
    let request = post_request(&market, &student);

    let mut feed = market_bus_subscribe(&market);
    let accepted = market.requests().accept(&helper, &request.id).unwrap();
    assert_eq!(accepted.status, RequestStatus::InProgress);
    assert_eq!(accepted.helper_id, Some(helper.user_id.clone()));

    let event = feed.try_recv().unwrap();
    assert_eq!(
        event,
        FeedEvent::RequestAccepted {
            request_id: request.id.to_string()
        }
    );
}

// The bus lives inside the engine; tests reach it through a second handle
// cloned before the operation under test.
fn market_bus_subscribe(
    market: &Marketplace<DbStore>,
) -> tokio::sync::broadcast::Receiver<FeedEvent> {
    market.bus().subscribe()
}

#[test]
fn second_accept_loses_with_unavailable() {
    let market = market();
    let student = seed_user(&market, "sana", Role::Student);
    let first = seed_user(&market, "hari", Role::Helper);
    let second = seed_user(&market, "mira", Role::Helper);
    let request = post_request(&market, &student);

    market.requests().accept(&first, &request.id).unwrap();
    let err = market.requests().accept(&second, &request.id).unwrap_err();
    assert!(matches!(
        err,
        MarketError::Request(RequestError::Unavailable)
    ));

    let current = market
        .store()
        .requests()
        .get(&request.id)
        .unwrap()
        .unwrap();
    assert_eq!(current.helper_id, Some(first.user_id));
}

#[test]
fn students_cannot_accept() {
    let market = market();
    let student = seed_user(&market, "sana", Role::Student);
    let other = seed_user(&market, "omar", Role::Student);
    let request = post_request(&market, &student);
    let err = market.requests().accept(&other, &request.id).unwrap_err();
    assert!(matches!(
        err,
        MarketError::Auth(AuthError::Forbidden { .. })
    ));
}

#[test]
fn pay_advance_rules() {
    let market = market();
    let student = seed_user(&market, "sana", Role::Student);
    let other_student = seed_user(&market, "omar", Role::Student);
    let helper = seed_user(&market, "hari", Role::Helper);
    let request = post_request(&market, &student);

    // Not yet in progress.
    let err = market
        .requests()
        .pay_advance(&student, &request.id)
        .unwrap_err();
    assert!(matches!(
        err,
        MarketError::Request(RequestError::InvalidState { .. })
    ));

    market.requests().accept(&helper, &request.id).unwrap();

    // Only the owning student may pay.
    let err = market
        .requests()
        .pay_advance(&other_student, &request.id)
        .unwrap_err();
    assert!(matches!(
        err,
        MarketError::Request(RequestError::Forbidden { .. })
    ));

    let paid = market.requests().pay_advance(&student, &request.id).unwrap();
    assert!(paid.advance_paid);

    // Re-paying is a no-op, not an error.
    let again = market.requests().pay_advance(&student, &request.id).unwrap();
    assert!(again.advance_paid);
}

#[test]
fn complete_increments_counter_exactly_once() {
    let market = market();
    let student = seed_user(&market, "sana", Role::Student);
    let helper = seed_user(&market, "hari", Role::Helper);
    let request = post_request(&market, &student);
    market.requests().accept(&helper, &request.id).unwrap();

    let completed = market.requests().complete(&student, &request.id).unwrap();
    assert_eq!(completed.status, RequestStatus::Completed);

    let helper_row = market
        .store()
        .users()
        .get(&helper.user_id)
        .unwrap()
        .unwrap();
    assert_eq!(helper_row.completed_tasks, 1);

    // A client-side timeout-and-retry must not double count.
    let err = market.requests().complete(&student, &request.id).unwrap_err();
    assert!(matches!(
        err,
        MarketError::Request(RequestError::InvalidState { .. })
    ));
    let helper_row = market
        .store()
        .users()
        .get(&helper.user_id)
        .unwrap()
        .unwrap();
    assert_eq!(helper_row.completed_tasks, 1);
}

#[test]
fn complete_of_open_request_is_rejected() {
    let market = market();
    let student = seed_user(&market, "sana", Role::Student);
    let request = post_request(&market, &student);
    let err = market.requests().complete(&student, &request.id).unwrap_err();
    assert!(matches!(
        err,
        MarketError::Request(RequestError::InvalidState { .. })
    ));
}

#[test]
fn cancel_rules() {
    let market = market();
    let student = seed_user(&market, "sana", Role::Student);
    let helper = seed_user(&market, "hari", Role::Helper);
    let stranger = seed_user(&market, "zed", Role::Helper);
    let request = post_request(&market, &student);
    market.requests().accept(&helper, &request.id).unwrap();

    let err = market.requests().cancel(&stranger, &request.id).unwrap_err();
    assert!(matches!(
        err,
        MarketError::Request(RequestError::Forbidden { .. })
    ));

    // The assigned helper may cancel.
    let cancelled = market.requests().cancel(&helper, &request.id).unwrap();
    assert_eq!(cancelled.status, RequestStatus::Cancelled);
}

#[test]
fn cancel_after_complete_is_rejected() {
    let market = market();
    let student = seed_user(&market, "sana", Role::Student);
    let helper = seed_user(&market, "hari", Role::Helper);
    let request = post_request(&market, &student);
    market.requests().accept(&helper, &request.id).unwrap();
    market.requests().complete(&student, &request.id).unwrap();

    let err = market.requests().cancel(&helper, &request.id).unwrap_err();
    assert!(matches!(
        err,
        MarketError::Request(RequestError::InvalidState { .. })
    ));
}

#[test]
fn open_listing_hides_accepted_requests() {
    let market = market();
    let student = seed_user(&market, "sana", Role::Student);
    let helper = seed_user(&market, "hari", Role::Helper);
    let kept = post_request(&market, &student);
    let taken = post_request(&market, &student);
    market.requests().accept(&helper, &taken.id).unwrap();

    let open = market.requests().list_open().unwrap();
    assert_eq!(open.len(), 1);
    assert_eq!(open[0].id, kept.id);
}

#[test]
fn disclosure_through_my_listings() {
    let market = market();
    let student = seed_user(&market, "sana", Role::Student);
    let helper = seed_user(&market, "hari", Role::Helper);
    let request = post_request(&market, &student);
    market.requests().accept(&helper, &request.id).unwrap();

    // Before the advance: names yes, phones no.
    let mine = market.requests().list_mine(&student).unwrap();
    assert_eq!(mine.len(), 1);
    assert_eq!(mine[0].helper_name.as_deref(), Some("hari"));
    assert!(mine[0].peer_phone.is_none());

    market.requests().pay_advance(&student, &request.id).unwrap();

    let mine = market.requests().list_mine(&student).unwrap();
    assert_eq!(mine[0].peer_phone.as_deref(), Some("hari-phone"));
    let theirs = market.requests().list_mine(&helper).unwrap();
    assert_eq!(theirs[0].peer_phone.as_deref(), Some("sana-phone"));
}

#[test]
fn messages_require_an_existing_request() {
    let market = market();
    let student = seed_user(&market, "sana", Role::Student);
    let request = post_request(&market, &student);

    let posted = market
        .messages()
        .post(&student, &request.id, "is this still needed?".to_string())
        .unwrap();
    assert_eq!(posted.sender_id, student.user_id);

    let err = market
        .messages()
        .post(
            &student,
            &am_core::types::RequestId::generate(),
            "ghost".to_string(),
        )
        .unwrap_err();
    assert!(matches!(
        err,
        MarketError::Message(am_core::error::MessageError::RequestNotFound)
    ));
}

#[test]
fn login_issues_token_and_resolve_round_trips() {
    let market = market();
    let user = market
        .auth()
        .register(RegisterInput {
            name: "sana".to_string(),
            email: "sana@cvru.ac.in".to_string(),
            password: "secret123".to_string(),
            role: Role::Student,
            phone_number: None,
        })
        .unwrap();

    let (logged_in, token) = market
        .auth()
        .login(LoginInput {
            email: "sana@cvru.ac.in".to_string(),
            password: "secret123".to_string(),
        })
        .unwrap();
    assert_eq!(logged_in.id, user.id);

    let resolved = market.auth().resolve(&token).unwrap();
    assert_eq!(resolved.id, user.id);

    market.auth().logout(&token).unwrap();
    let err = market.auth().resolve(&token).unwrap_err();
    assert!(matches!(err, MarketError::Auth(AuthError::Unauthenticated)));
}

#[test]
fn wrong_password_is_unauthenticated() {
    let market = market();
    market
        .auth()
        .register(RegisterInput {
            name: "sana".to_string(),
            email: "sana@cvru.ac.in".to_string(),
            password: "secret123".to_string(),
            role: Role::Student,
            phone_number: None,
        })
        .unwrap();
    let err = market
        .auth()
        .login(LoginInput {
            email: "sana@cvru.ac.in".to_string(),
            password: "wrong".to_string(),
        })
        .unwrap_err();
    assert!(matches!(err, MarketError::Auth(AuthError::Unauthenticated)));
}

#[test]
fn suspended_users_cannot_resolve() {
    let market = market();
    market
        .auth()
        .register(RegisterInput {
            name: "sana".to_string(),
            email: "sana@cvru.ac.in".to_string(),
            password: "secret123".to_string(),
            role: Role::Student,
            phone_number: None,
        })
        .unwrap();
    let (user, token) = market
        .auth()
        .login(LoginInput {
            email: "sana@cvru.ac.in".to_string(),
            password: "secret123".to_string(),
        })
        .unwrap();

    market
        .store()
        .users()
        .set_suspended(&user.id, true)
        .unwrap();

    let err = market.auth().resolve(&token).unwrap_err();
    assert!(matches!(err, MarketError::Auth(AuthError::Suspended)));
}

#[test]
fn end_to_end_scenario() {
    let market = market();
    let student = seed_user(&market, "sana", Role::Student);
    let h1 = seed_user(&market, "hari", Role::Helper);
    let h2 = seed_user(&market, "mira", Role::Helper);
    let request = post_request(&market, &student);

    // Two helpers race; in-process the second call simply observes the
    // first one's committed claim. The cross-thread version of this race
    // lives in accept_is_exactly_once_under_concurrent_load.
    let first = market.requests().accept(&h1, &request.id);
    let second = market.requests().accept(&h2, &request.id);
    assert!(first.is_ok());
    assert!(matches!(
        second.unwrap_err(),
        MarketError::Request(RequestError::Unavailable)
    ));

    market.requests().pay_advance(&student, &request.id).unwrap();
    let student_view = market.requests().list_mine(&student).unwrap();
    assert_eq!(student_view[0].peer_phone.as_deref(), Some("hari-phone"));
    let helper_view = market.requests().list_mine(&h1).unwrap();
    assert_eq!(helper_view[0].peer_phone.as_deref(), Some("sana-phone"));

    market.requests().complete(&student, &request.id).unwrap();
    let helper_row = market.store().users().get(&h1.user_id).unwrap().unwrap();
    assert_eq!(helper_row.completed_tasks, 1);

    let err = market.requests().cancel(&h1, &request.id).unwrap_err();
    assert!(matches!(
        err,
        MarketError::Request(RequestError::InvalidState { .. })
    ));
}

#[test]
fn accept_is_exactly_once_under_concurrent_load() {
    use std::sync::{Arc, Barrier};

    let dir = tempfile::tempdir().unwrap();
    let path = dir
        .path()
        .join("market.db")
        .to_string_lossy()
        .into_owned();

    let (request_id, helpers) = {
        let market = Marketplace::new(
            DbStore::new(schema::open_and_migrate(&path).unwrap()),
            EventBus::new(16),
        );
        let student = seed_user(&market, "sana", Role::Student);
        let helpers: Vec<Actor> = (0..8)
            .map(|i| seed_user(&market, &format!("helper{i}"), Role::Helper))
            .collect();
        let request = post_request(&market, &student);
        (request.id, helpers)
    };

    let barrier = Arc::new(Barrier::new(helpers.len()));
    let handles: Vec<_> = helpers
        .into_iter()
        .map(|helper| {
            let path = path.clone();
            let request_id = request_id.clone();
            let barrier = Arc::clone(&barrier);
            std::thread::spawn(move || {
                let market = Marketplace::new(
                    DbStore::new(schema::open_and_migrate(&path).unwrap()),
                    EventBus::new(16),
                );
                barrier.wait();
                market.requests().accept(&helper, &request_id)
            })
        })
        .collect();

    let mut winners = 0;
    let mut losers = 0;
    for handle in handles {
        match handle.join().unwrap() {
            Ok(accepted) => {
                winners += 1;
                assert_eq!(accepted.status, RequestStatus::InProgress);
            }
            Err(MarketError::Request(RequestError::Unavailable)) => losers += 1,
            Err(other) => panic!("unexpected error: {other}"),
        }
    }
    assert_eq!(winners, 1);
    assert_eq!(losers, 7);

    let market = Marketplace::new(
        DbStore::new(schema::open_and_migrate(&path).unwrap()),
        EventBus::new(16),
    );
    let final_state = market.store().requests().get(&request_id).unwrap().unwrap();
    assert_eq!(final_state.status, RequestStatus::InProgress);
    assert!(final_state.helper_id.is_some());
}

mod admin {
    use super::*;
    use am_core::types::io::UpdateUserStatusInput;
    use am_core::types::UpdateSettingsInput;

    #[test]
    fn non_admins_are_rejected() {
        let market = market();
        let student = seed_user(&market, "sana", Role::Student);
        let err = market.admin().overview(&student).unwrap_err();
        assert!(matches!(
            err,
            MarketError::Auth(AuthError::Forbidden { .. })
        ));
    }

    #[test]
    fn reassign_overrides_prior_helper_and_audits() {
        let market = market();
        let admin = seed_user(&market, "root", Role::Admin);
        let student = seed_user(&market, "sana", Role::Student);
        let original = seed_user(&market, "hari", Role::Helper);
        let replacement = seed_user(&market, "mira", Role::Helper);
        let request = post_request(&market, &student);
        market.requests().accept(&original, &request.id).unwrap();

        let updated = market
            .admin()
            .reassign_helper(&admin, &request.id, &replacement.user_id)
            .unwrap();
        assert_eq!(updated.helper_id, Some(replacement.user_id));

        let logs = market.admin().logs(&admin).unwrap();
        assert!(logs.iter().any(|log| log.action == "reassign_helper"));
    }

    #[test]
    fn reassign_to_a_student_is_not_found() {
        let market = market();
        let admin = seed_user(&market, "root", Role::Admin);
        let student = seed_user(&market, "sana", Role::Student);
        let not_a_helper = seed_user(&market, "omar", Role::Student);
        let request = post_request(&market, &student);

        let err = market
            .admin()
            .reassign_helper(&admin, &request.id, &not_a_helper.user_id)
            .unwrap_err();
        assert!(matches!(err, MarketError::Request(RequestError::NotFound)));
    }

    #[test]
    fn suspend_and_verify_audit_separately() {
        let market = market();
        let admin = seed_user(&market, "root", Role::Admin);
        let target = seed_user(&market, "sana", Role::Student);

        let updated = market
            .admin()
            .set_user_status(
                &admin,
                &target.user_id,
                UpdateUserStatusInput {
                    is_suspended: Some(true),
                    is_verified: Some(true),
                },
            )
            .unwrap();
        assert!(updated.is_suspended);
        assert!(updated.is_verified);

        let actions: Vec<String> = market
            .admin()
            .logs(&admin)
            .unwrap()
            .into_iter()
            .map(|log| log.action)
            .collect();
        assert!(actions.contains(&"suspend_user".to_string()));
        assert!(actions.contains(&"verify_user".to_string()));
    }

    #[test]
    fn delete_request_takes_its_messages_along() {
        let market = market();
        let admin = seed_user(&market, "root", Role::Admin);
        let student = seed_user(&market, "sana", Role::Student);
        let request = post_request(&market, &student);
        market
            .messages()
            .post(&student, &request.id, "hello?".to_string())
            .unwrap();

        market.admin().delete_request(&admin, &request.id).unwrap();

        assert!(market
            .store()
            .requests()
            .get(&request.id)
            .unwrap()
            .is_none());
        assert!(market.messages().list(&request.id).unwrap().is_empty());
    }

    #[test]
    fn settings_partial_update_only_touches_provided_fields() {
        let market = market();
        let admin = seed_user(&market, "root", Role::Admin);
        let updated = market
            .admin()
            .update_settings(
                &admin,
                UpdateSettingsInput {
                    commission_percentage: Some(12.0),
                    ..UpdateSettingsInput::default()
                },
            )
            .unwrap();
        assert_eq!(updated.commission_percentage, 12.0);
        assert_eq!(updated.allowed_email_domain, "cvru.ac.in");
    }

    #[test]
    fn overview_counts_line_up() {
        let market = market();
        let admin = seed_user(&market, "root", Role::Admin);
        let student = seed_user(&market, "sana", Role::Student);
        let helper = seed_user(&market, "hari", Role::Helper);
        let active = post_request(&market, &student);
        market.requests().accept(&helper, &active.id).unwrap();
        let done = post_request(&market, &student);
        market.requests().accept(&helper, &done.id).unwrap();
        market.requests().pay_advance(&student, &done.id).unwrap();
        market.requests().complete(&student, &done.id).unwrap();

        let overview = market.admin().overview(&admin).unwrap();
        assert_eq!(overview.total_users, 3);
        assert_eq!(overview.total_helpers, 1);
        assert_eq!(overview.total_students, 1);
        assert_eq!(overview.active_requests, 1);
        assert_eq!(overview.completed_requests, 1);
        assert_eq!(overview.total_transactions, 1);
        // 10% commission on the one completed 500.0 budget.
        assert!((overview.revenue_summary - 50.0).abs() < f64::EPSILON);
    }
}

mod invariants {
    use super::*;
    use proptest::prelude::*;

    #[derive(Debug, Clone)]
    enum Op {
        Accept(usize),
        PayAdvance,
        Complete,
        Cancel(usize),
    }

    fn op_strategy() -> impl Strategy<Value = Op> {
        prop_oneof![
            (0..3usize).prop_map(Op::Accept),
            Just(Op::PayAdvance),
            Just(Op::Complete),
            (0..4usize).prop_map(Op::Cancel),
        ]
    }

    fn check_invariants(request: &HelpRequest) {
        match request.status {
            RequestStatus::Open => assert!(
                request.helper_id.is_none(),
                "open request must be unassigned"
            ),
            RequestStatus::InProgress | RequestStatus::Completed => assert!(
                request.helper_id.is_some(),
                "active request must have a helper"
            ),
            RequestStatus::Cancelled => {}
        }
        if request.advance_paid {
            assert!(
                request.helper_id.is_some(),
                "advance cannot be paid without a helper"
            );
        }
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(48))]

        /// Any interleaving of lifecycle calls, valid or not, leaves the
        /// record satisfying the status/helper invariants.
        #[test]
        fn random_operation_sequences_preserve_invariants(
            ops in proptest::collection::vec(op_strategy(), 1..24)
        ) {
            let market = market();
            let student = seed_user(&market, "sana", Role::Student);
            let helpers = [
                seed_user(&market, "h0", Role::Helper),
                seed_user(&market, "h1", Role::Helper),
                seed_user(&market, "h2", Role::Helper),
            ];
            let stranger = seed_user(&market, "zed", Role::Student);
            let request = post_request(&market, &student);

            let cancellers: [&Actor; 4] =
                [&student, &helpers[0], &helpers[1], &stranger];

            for op in ops {
                let _ = match op {
                    Op::Accept(i) => market.requests().accept(&helpers[i], &request.id),
                    Op::PayAdvance => market.requests().pay_advance(&student, &request.id),
                    Op::Complete => market.requests().complete(&student, &request.id),
                    Op::Cancel(i) => market.requests().cancel(cancellers[i], &request.id),
                };
                let current = market
                    .store()
                    .requests()
                    .get(&request.id)
                    .unwrap()
                    .unwrap();
                check_invariants(&current);
            }

            // Completion bumps the assigned helper's counter exactly once.
            let current = market.store().requests().get(&request.id).unwrap().unwrap();
            if current.status == RequestStatus::Completed {
                let helper_id = current.helper_id.clone().unwrap();
                let helper_row = market.store().users().get(&helper_id).unwrap().unwrap();
                prop_assert_eq!(helper_row.completed_tasks, 1);
            }
        }
    }
}
