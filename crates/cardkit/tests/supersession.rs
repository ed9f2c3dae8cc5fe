//! Property tests for supersession resolution.

use cardkit::resolve_supersession;
use cardkit_core::{Card, CardId};
use cardkit_testkit::TestFixture;
use proptest::prelude::*;

/// A chain of `len` cards for one identity, oldest first.
fn chain(fixture: &TestFixture, identity: &str, len: usize, base_key: u8) -> Vec<Card> {
    let mut previous: Option<CardId> = None;
    let mut cards = Vec::with_capacity(len);
    for i in 0..len {
        let key = fixture.key(base_key + i as u8);
        let model = fixture.make_raw_card(&key, identity, 1_000 + i as i64, previous.as_ref());
        let card = Card::from_signed_model(fixture.crypto.as_ref(), &model).unwrap();
        previous = Some(*card.id());
        cards.push(card);
    }
    cards
}

fn history_len(card: &Card) -> usize {
    let mut len = 1;
    let mut current = card;
    while let Some(previous) = current.previous_card() {
        assert!(previous.is_outdated());
        len += 1;
        current = previous;
    }
    len
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(32))]

    #[test]
    fn test_shuffled_chain_resolves_to_newest(
        len in 1usize..6,
        order in Just((0..6).collect::<Vec<usize>>()).prop_shuffle(),
    ) {
        let fixture = TestFixture::new();
        let cards = chain(&fixture, "alice", len, 1);
        let newest = *cards[len - 1].id();

        let shuffled: Vec<Card> = order
            .iter()
            .filter(|&&i| i < len)
            .map(|&i| cards[i].clone())
            .collect();

        let resolved = resolve_supersession(shuffled);
        prop_assert_eq!(resolved.len(), 1);
        prop_assert_eq!(*resolved[0].id(), newest);
        prop_assert!(!resolved[0].is_outdated());
        prop_assert_eq!(history_len(&resolved[0]), len);
    }

    #[test]
    fn test_duplicates_do_not_change_result(len in 1usize..5, dup in 0usize..5) {
        let fixture = TestFixture::new();
        let cards = chain(&fixture, "bob", len, 20);
        let dup = dup % len;

        let mut input = cards.clone();
        input.push(cards[dup].clone());

        let resolved = resolve_supersession(input);
        prop_assert_eq!(resolved.len(), 1);
        prop_assert_eq!(resolved[0].id(), cards[len - 1].id());
    }

    #[test]
    fn test_identities_resolve_independently(a in 1usize..4, b in 1usize..4) {
        let fixture = TestFixture::new();
        let mut input = chain(&fixture, "alice", a, 40);
        input.extend(chain(&fixture, "bob", b, 60));

        let resolved = resolve_supersession(input);
        prop_assert_eq!(resolved.len(), 2);
        prop_assert_eq!(resolved[0].identity(), "alice");
        prop_assert_eq!(resolved[1].identity(), "bob");
    }
}
