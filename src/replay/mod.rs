//! Event replay with card-based partitioning
//!
//! This module provides the `ReplayProcessor`, which drives the settlement
//! engine from a stream of card events. Events are partitioned by card ID so
//! that different cards replay concurrently while each card's events keep
//! their original order.
//!
//! The processor is also where role authorization happens: issuing cards and
//! refunds are gated on the operator role, mirroring where such checks live
//! in a request layer. The engine itself stays role-agnostic.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;
use tracing::warn;

use crate::engine::FareEngine;
use crate::io::{Event, EventKind};
use crate::store::{CardStore, HistoryStore, StationRegistry};
use crate::types::{Capability, Card, FareError, Role};

/// Outcome of replaying a single event
#[derive(Debug, Clone)]
pub struct EventOutcome {
    /// The event that was replayed
    pub event: Event,

    /// The result of replaying it
    pub result: Result<(), FareError>,
}

/// Replays card events against a settlement engine
///
/// Cloneable and safe to share across tokio tasks; all state lives behind
/// the engine's stores and one shared user-ID counter.
pub struct ReplayProcessor<C, S, H> {
    engine: FareEngine<C, S, H>,
    role: Role,

    /// Surrogate key source for newly issued cards
    next_user_id: Arc<AtomicU32>,
}

impl<C, S, H> Clone for ReplayProcessor<C, S, H> {
    fn clone(&self) -> Self {
        ReplayProcessor {
            engine: self.engine.clone(),
            role: self.role,
            next_user_id: Arc::clone(&self.next_user_id),
        }
    }
}

impl<C, S, H> ReplayProcessor<C, S, H>
where
    C: CardStore + 'static,
    S: StationRegistry + 'static,
    H: HistoryStore + 'static,
{
    /// Create a new processor acting as the given role
    pub fn new(engine: FareEngine<C, S, H>, role: Role) -> Self {
        Self {
            engine,
            role,
            next_user_id: Arc::new(AtomicU32::new(1)),
        }
    }

    /// Partition events by card ID
    ///
    /// Each card's events keep their original relative order; every event
    /// lands in exactly one partition.
    pub fn partition_by_card(&self, events: Vec<Event>) -> HashMap<String, Vec<Event>> {
        let mut card_batches: HashMap<String, Vec<Event>> = HashMap::new();

        for event in events {
            card_batches
                .entry(event.card_id.clone())
                .or_default()
                .push(event);
        }

        card_batches
    }

    /// Replay one card's events sequentially
    ///
    /// Failed events are captured in their outcome and never stop the rest
    /// of the card's events from replaying.
    pub fn replay_card_events(&self, events: Vec<Event>) -> Vec<EventOutcome> {
        let mut outcomes = Vec::with_capacity(events.len());

        for event in events {
            let result = self.apply(&event);
            if let Err(error) = &result {
                warn!(card_id = %event.card_id, kind = event.kind.as_str(), %error, "event rejected");
            }
            outcomes.push(EventOutcome { event, result });
        }

        outcomes
    }

    /// Replay a batch of events with card-based partitioning
    ///
    /// Spawns one tokio task per card. Outcomes may interleave across cards
    /// but stay ordered within each card.
    pub async fn replay(&self, events: Vec<Event>) -> Vec<EventOutcome> {
        let card_batches = self.partition_by_card(events);

        let mut tasks = Vec::new();
        for (_card_id, card_events) in card_batches {
            let processor = self.clone();
            tasks.push(tokio::spawn(async move {
                processor.replay_card_events(card_events)
            }));
        }

        let mut outcomes = Vec::new();
        for task in tasks {
            match task.await {
                Ok(card_outcomes) => outcomes.extend(card_outcomes),
                Err(join_error) => {
                    warn!(%join_error, "replay task panicked");
                }
            }
        }

        outcomes
    }

    fn apply(&self, event: &Event) -> Result<(), FareError> {
        match event.kind {
            EventKind::Issue => {
                self.authorize(Capability::IssueCard)?;
                let class = event.class.ok_or_else(|| FareError::ParseError {
                    line: None,
                    message: format!("Issue event for card {} requires a class", event.card_id),
                })?;

                let user_id = self.next_user_id.fetch_add(1, Ordering::Relaxed);
                let card = Card::issue(event.card_id.clone(), Some(user_id), class);

                if !self.engine.cards().insert(card) {
                    return Err(FareError::card_already_exists(&event.card_id));
                }
                Ok(())
            }
            EventKind::TopUp => {
                self.authorize(Capability::TopUp)?;
                let amount = self.required_amount(event)?;
                self.engine.top_up(&event.card_id, amount).map(|_| ())
            }
            EventKind::Refund => {
                self.authorize(Capability::Refund)?;
                let amount = self.required_amount(event)?;
                self.engine.refund(&event.card_id, amount).map(|_| ())
            }
            EventKind::CheckIn => {
                let station_id = self.required_station(event)?;
                self.engine.check_in(station_id, &event.card_id).map(|_| ())
            }
            EventKind::CheckOut => {
                let station_id = self.required_station(event)?;
                self.engine.check_out(station_id, &event.card_id).map(|_| ())
            }
        }
    }

    fn authorize(&self, capability: Capability) -> Result<(), FareError> {
        if self.role.permits(capability) {
            Ok(())
        } else {
            Err(FareError::unauthorized(
                self.role.as_str(),
                capability.as_str(),
            ))
        }
    }

    fn required_amount(&self, event: &Event) -> Result<rust_decimal::Decimal, FareError> {
        event.amount.ok_or_else(|| FareError::ParseError {
            line: None,
            message: format!(
                "{} event for card {} requires an amount",
                event.kind.as_str(),
                event.card_id
            ),
        })
    }

    fn required_station(&self, event: &Event) -> Result<crate::types::StationId, FareError> {
        event.station_id.ok_or_else(|| FareError::ParseError {
            line: None,
            message: format!(
                "{} event for card {} requires a station",
                event.kind.as_str(),
                event.card_id
            ),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::{InMemoryCardStore, InMemoryHistoryStore, InMemoryStationRegistry};
    use crate::types::Station;
    use rust_decimal::Decimal;

    type TestProcessor =
        ReplayProcessor<InMemoryCardStore, InMemoryStationRegistry, InMemoryHistoryStore>;

    fn processor(role: Role) -> TestProcessor {
        let cards = Arc::new(InMemoryCardStore::new());
        let stations = Arc::new(InMemoryStationRegistry::new());
        let history = Arc::new(InMemoryHistoryStore::new());

        for id in 1..=4 {
            stations.insert(Station::new(id, format!("station-{id}"), "10.0.0.1"));
        }

        ReplayProcessor::new(FareEngine::new(cards, stations, history), role)
    }

    fn event(kind: EventKind, card: &str) -> Event {
        Event {
            kind,
            card_id: card.to_string(),
            station_id: None,
            amount: None,
            class: None,
        }
    }

    fn gate_event(kind: EventKind, card: &str, station: u32) -> Event {
        Event {
            station_id: Some(station),
            ..event(kind, card)
        }
    }

    fn money_event(kind: EventKind, card: &str, amount: i64) -> Event {
        Event {
            amount: Some(Decimal::new(amount, 0)),
            ..event(kind, card)
        }
    }

    fn issue_event(card: &str, class: crate::types::CardClass) -> Event {
        Event {
            class: Some(class),
            ..event(EventKind::Issue, card)
        }
    }

    #[test]
    fn test_partition_preserves_per_card_order() {
        let processor = processor(Role::Staff);
        let events = vec![
            gate_event(EventKind::CheckIn, "GM0000000001", 1),
            gate_event(EventKind::CheckIn, "GM0000000002", 1),
            gate_event(EventKind::CheckOut, "GM0000000001", 2),
            gate_event(EventKind::CheckOut, "GM0000000002", 3),
        ];

        let partitions = processor.partition_by_card(events);

        assert_eq!(partitions.len(), 2);
        let first = &partitions["GM0000000001"];
        assert_eq!(first[0].kind, EventKind::CheckIn);
        assert_eq!(first[1].kind, EventKind::CheckOut);
        assert_eq!(first[1].station_id, Some(2));
    }

    #[tokio::test]
    async fn test_replay_full_card_lifecycle() {
        use crate::types::CardClass;

        let processor = processor(Role::Staff);
        let card = "GM0000000001";
        let events = vec![
            issue_event(card, CardClass::Normal), // opening balance 10000
            money_event(EventKind::TopUp, card, 2_000),
            gate_event(EventKind::CheckIn, card, 1),
            gate_event(EventKind::CheckOut, card, 2),
        ];

        let outcomes = processor.replay(events).await;

        assert_eq!(outcomes.len(), 4);
        assert!(outcomes.iter().all(|outcome| outcome.result.is_ok()));

        let cards = processor.engine.all_cards();
        assert_eq!(cards.len(), 1);
        assert_eq!(cards[0].balance, Decimal::new(7_000, 0));
        assert_eq!(processor.engine.history().settlements().len(), 2);
    }

    #[tokio::test]
    async fn test_refund_requires_admin() {
        use crate::types::CardClass;

        let staff = processor(Role::Staff);
        let card = "GM0000000001";

        let outcomes = staff
            .replay(vec![
                issue_event(card, CardClass::Normal),
                money_event(EventKind::Refund, card, 1_000),
            ])
            .await;

        let refund_outcome = outcomes
            .iter()
            .find(|outcome| outcome.event.kind == EventKind::Refund)
            .unwrap();
        assert_eq!(
            refund_outcome.result,
            Err(FareError::unauthorized("staff", "refund"))
        );

        // The rejected refund left the balance alone
        let cards = staff.engine.all_cards();
        assert_eq!(cards[0].balance, CardClass::Normal.opening_balance());
    }

    #[tokio::test]
    async fn test_passenger_cannot_issue_cards() {
        use crate::types::CardClass;

        let passenger = processor(Role::Passenger);

        let outcomes = passenger
            .replay(vec![issue_event("GM0000000001", CardClass::Vip)])
            .await;

        assert_eq!(
            outcomes[0].result,
            Err(FareError::unauthorized("passenger", "issue-card"))
        );
        assert!(passenger.engine.all_cards().is_empty());
    }

    #[tokio::test]
    async fn test_duplicate_issue_is_rejected() {
        use crate::types::CardClass;

        let processor = processor(Role::Admin);
        let card = "GM0000000001";

        let first = processor
            .replay(vec![issue_event(card, CardClass::Normal)])
            .await;
        assert!(first[0].result.is_ok());

        let second = processor
            .replay(vec![issue_event(card, CardClass::Vip)])
            .await;
        assert_eq!(
            second[0].result,
            Err(FareError::card_already_exists(card))
        );
    }

    #[tokio::test]
    async fn test_issued_cards_get_distinct_user_ids() {
        use crate::types::CardClass;

        let processor = processor(Role::Staff);
        let outcomes = processor
            .replay(vec![
                issue_event("GM0000000001", CardClass::Normal),
                issue_event("GM0000000002", CardClass::Normal),
            ])
            .await;

        assert!(outcomes.iter().all(|outcome| outcome.result.is_ok()));
        let mut user_ids: Vec<_> = processor
            .engine
            .all_cards()
            .into_iter()
            .map(|card| card.user_id)
            .collect();
        user_ids.sort();
        assert_eq!(user_ids, vec![Some(1), Some(2)]);
    }

    #[tokio::test]
    async fn test_failed_event_does_not_stop_later_events_for_same_card() {
        use crate::types::CardClass;

        let processor = processor(Role::Staff);
        let card = "GM0000000001";
        let outcomes = processor
            .replay(vec![
                issue_event(card, CardClass::Normal),
                gate_event(EventKind::CheckIn, card, 99), // unknown station
                money_event(EventKind::TopUp, card, 500),
            ])
            .await;

        assert_eq!(outcomes.len(), 3);
        assert_eq!(
            outcomes[1].result,
            Err(FareError::station_not_found(99))
        );
        assert!(outcomes[2].result.is_ok());
        assert_eq!(
            processor.engine.all_cards()[0].balance,
            Decimal::new(10_500, 0)
        );
    }
}
