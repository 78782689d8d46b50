//! Integration tests for the ticket-booth matchmaking service
//!
//! These tests drive the whole core together:
//! - Solo and paired ticket lifecycles
//! - Join code authorization and sequencing
//! - Timeouts, vanished matches and the reconciler
//! - Concurrent ticket creation

mod fixtures;

use futures::future::join_all;
use std::collections::HashSet;
use ticket_booth::error::ErrorKind;
use ticket_booth::types::{TicketStatus, TicketView};

use fixtures::{create_test_system, create_test_system_with, rules_for};

#[test]
fn test_solo_ticket_starts_then_times_out() {
    let system = create_test_system();
    let ticket = system.ticket("default", "user1");

    assert_eq!(system.status(ticket, "user1"), TicketStatus::InProgress);

    system.advance_secs(4);
    assert_eq!(system.status(ticket, "user1"), TicketStatus::InProgress);

    system.advance_secs(1);
    let view = system.poll(ticket, "user1");
    assert_eq!(view.status, TicketStatus::StartServer);
    assert_eq!(view.players, vec!["user1".to_string()]);

    system.advance_secs(4);
    assert_eq!(system.status(ticket, "user1"), TicketStatus::StartServer);

    system.advance_secs(1);
    let view = system.poll(ticket, "user1");
    assert_eq!(view.status, TicketStatus::Timeout);

    for _ in 0..3 {
        system.advance_secs(1);
        assert_eq!(system.poll(ticket, "user1"), TicketView::expired(ticket));
    }
}

#[test]
fn test_pair_shares_match_and_join_code() {
    let system = create_test_system();
    let host = system.ticket("default", "user1");
    let guest = system.ticket("default", "user2");

    assert_eq!(system.status(host, "user1"), TicketStatus::StartServer);
    assert_eq!(system.status(guest, "user2"), TicketStatus::InProgress);

    // The guest keeps seeing InProgress while the host provisions
    system.advance_secs(2);
    assert_eq!(system.status(guest, "user2"), TicketStatus::InProgress);

    let host_view = system
        .service
        .set_join_code(host, "user1", "join-abc")
        .unwrap();
    assert_eq!(host_view.status, TicketStatus::Found);

    let guest_view = system.poll(guest, "user2");
    assert_eq!(guest_view.status, TicketStatus::Found);
    assert_eq!(guest_view.match_id, host_view.match_id);
    assert_eq!(guest_view.join_code.as_deref(), Some("join-abc"));
    assert_eq!(
        guest_view.players,
        vec!["user1".to_string(), "user2".to_string()]
    );

    // Found is stable
    system.advance_secs(30);
    assert_eq!(system.status(host, "user1"), TicketStatus::Found);
    assert_eq!(system.status(guest, "user2"), TicketStatus::Found);
}

#[test]
fn test_five_players_pairing() {
    let system = create_test_system();
    let users = ["user1", "user2", "user3", "user4", "user5"];
    let tickets: Vec<_> = users
        .iter()
        .map(|user| (system.ticket("default", user), *user))
        .collect();

    // Whoever sees StartServer provisions a server
    for (ticket, user) in &tickets {
        if system.status(*ticket, user) == TicketStatus::StartServer {
            let view = system.poll(*ticket, user);
            if view.players.len() == 2 {
                system
                    .service
                    .set_join_code(*ticket, user, &format!("code-{}", user))
                    .unwrap();
            }
        }
    }

    // The odd one out is never joined and times out solo
    system.advance_secs(5);
    for (ticket, user) in &tickets {
        system.poll(*ticket, user);
    }
    system.advance_secs(5);

    let views: Vec<_> = tickets
        .iter()
        .map(|(ticket, user)| system.poll(*ticket, user))
        .collect();

    let found: Vec<_> = views
        .iter()
        .filter(|view| view.status == TicketStatus::Found)
        .collect();
    let timed_out = views
        .iter()
        .filter(|view| view.status == TicketStatus::Timeout)
        .count();
    let distinct: HashSet<_> = found.iter().map(|view| view.match_id).collect();

    assert_eq!(found.len(), 4);
    assert_eq!(timed_out, 1);
    assert_eq!(distinct.len(), 2);
    assert!(found.iter().all(|view| view.join_code.is_some()));
}

#[test]
fn test_join_code_rejections() {
    let system = create_test_system();
    let host = system.ticket("default", "user1");
    let guest = system.ticket("default", "user2");

    let err = system
        .service
        .set_join_code(guest, "user2", "join")
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Forbidden);

    // Polling someone else's ticket does not grant initiator rights
    let err = system
        .service
        .set_join_code(host, "user2", "join")
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Forbidden);

    system.service.set_join_code(host, "user1", "join").unwrap();
    let err = system
        .service
        .set_join_code(host, "user1", "again")
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Conflict);

    // The join code is unchanged by the rejected attempt
    assert_eq!(
        system.poll(guest, "user2").join_code.as_deref(),
        Some("join")
    );
}

#[test]
fn test_join_code_before_ready_is_bad_request() {
    let system = create_test_system();
    let host = system.ticket("default", "user1");

    let err = system
        .service
        .set_join_code(host, "user1", "join")
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::BadRequest);

    system.advance_secs(5);
    system.service.set_join_code(host, "user1", "join").unwrap();
    assert_eq!(system.status(host, "user1"), TicketStatus::Found);
}

#[test]
fn test_join_code_on_timed_out_ticket_is_bad_request() {
    let system = create_test_system();
    let host = system.ticket("default", "user1");

    system.advance_secs(5);
    system.poll(host, "user1");
    system.advance_secs(5);
    assert_eq!(system.status(host, "user1"), TicketStatus::Timeout);

    let err = system
        .service
        .set_join_code(host, "user1", "join")
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::BadRequest);
}

#[test]
fn test_partner_of_timed_out_match() {
    let system = create_test_system();
    let host = system.ticket("default", "user1");
    let guest = system.ticket("default", "user2");

    assert_eq!(system.status(host, "user1"), TicketStatus::StartServer);
    system.advance_secs(5);
    assert_eq!(system.status(host, "user1"), TicketStatus::Timeout);

    // The guest's ticket still points at the removed match
    let err = system.service.get_status(guest, "user2").unwrap_err();
    assert_eq!(err.kind(), ErrorKind::NotFound);

    system.reconcile();
    for _ in 0..2 {
        assert_eq!(system.poll(guest, "user2"), TicketView::expired(guest));
    }

    // A fresh ticket lands in a fresh match
    let retry = system.ticket("default", "user2");
    let view = system.poll(retry, "user2");
    assert_eq!(view.status, TicketStatus::InProgress);
    assert_eq!(view.players, vec!["user2".to_string()]);
}

#[test]
fn test_timeout_requires_start_server_first() {
    let system = create_test_system();
    let ticket = system.ticket("default", "user1");

    // Long silence: the first read elects a starter instead of timing out
    system.advance_secs(60);
    assert_eq!(system.status(ticket, "user1"), TicketStatus::StartServer);

    system.advance_secs(5);
    assert_eq!(system.status(ticket, "user1"), TicketStatus::Timeout);
}

#[test]
fn test_stale_open_match_accepts_late_joiner() {
    let system = create_test_system();
    let host = system.ticket("default", "user1");

    system.advance_secs(6);
    assert_eq!(system.status(host, "user1"), TicketStatus::StartServer);

    let late = system.ticket("default", "user2");
    let view = system.poll(late, "user2");
    assert_eq!(view.players.len(), 2);
    assert_eq!(view.status, TicketStatus::InProgress);

    system.service.set_join_code(host, "user1", "join").unwrap();
    assert_eq!(system.status(late, "user2"), TicketStatus::Found);
}

#[test]
fn test_reconciler_finalizes_guests_without_polling() {
    let system = create_test_system();
    let host = system.ticket("default", "user1");
    let guest = system.ticket("default", "user2");

    system.reconcile();
    system.service.set_join_code(host, "user1", "join").unwrap();
    system.reconcile();

    let stats = system.service.stats().unwrap();
    assert_eq!(stats.tickets.found, 2);
    assert_eq!(system.status(guest, "user2"), TicketStatus::Found);
}

#[test]
fn test_queues_do_not_mix() {
    let system = create_test_system();
    let ranked = system.ticket("ranked", "user1");
    let casual = system.ticket("casual", "user2");

    let ranked_view = system.poll(ranked, "user1");
    let casual_view = system.poll(casual, "user2");
    assert_ne!(ranked_view.match_id, casual_view.match_id);
    assert_eq!(ranked_view.players.len(), 1);
    assert_eq!(casual_view.players.len(), 1);
}

#[test]
fn test_larger_matches_fill_before_starting() {
    let system = create_test_system_with(rules_for(4, 3));
    let host = system.ticket("default", "user1");
    system.ticket("default", "user2");
    assert_eq!(system.status(host, "user1"), TicketStatus::InProgress);

    system.ticket("default", "user3");
    assert_eq!(system.status(host, "user1"), TicketStatus::StartServer);

    // Still room for one more until the join code is set
    let fourth = system.ticket("default", "user4");
    assert_eq!(system.poll(fourth, "user4").players.len(), 4);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_joins_never_overfill() {
    let system = create_test_system_with(rules_for(4, 4));
    let service = system.service.clone();

    let handles: Vec<_> = (0..100)
        .map(|i| {
            let service = service.clone();
            tokio::spawn(async move { service.create_ticket("race", &format!("player{}", i)) })
        })
        .collect();

    let tickets: Vec<_> = join_all(handles)
        .await
        .into_iter()
        .map(|joined| joined.unwrap().unwrap())
        .collect();
    assert_eq!(tickets.len(), 100);

    let matches = service.pool().matches_in_queue("race").unwrap();
    assert_eq!(matches.len(), 25);
    assert!(matches.iter().all(|game| game.players().len() == 4));

    let players: HashSet<_> = matches
        .iter()
        .flat_map(|game| game.players().iter().cloned())
        .collect();
    assert_eq!(players.len(), 100);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_polls_and_reconciliation() {
    let system = create_test_system();
    let service = system.service.clone();

    let tickets: Vec<_> = (0..20)
        .map(|i| {
            let user = format!("player{}", i);
            (system.ticket("default", &user), user)
        })
        .collect();

    let polls: Vec<_> = tickets
        .iter()
        .cloned()
        .map(|(ticket, user)| {
            let service = service.clone();
            tokio::spawn(async move { service.get_status(ticket, &user) })
        })
        .collect();
    system.reconcile();

    for result in join_all(polls).await {
        let view = result.unwrap().unwrap();
        assert_ne!(view.status, TicketStatus::Timeout);
        assert_eq!(view.players.len(), 2);
    }
}
