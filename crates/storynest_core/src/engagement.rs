//! crates/storynest_core/src/engagement.rs
//!
//! The like/dislike engine for a single story.
//!
//! Per (story, user) pair there are three states - `Neutral`, `Liked`,
//! `Disliked` - and every vote is a toggle: repeating the same action undoes
//! it, applying the opposite action switches directly in one step. A user id
//! is never a member of both sets, and the net score is always recomputed
//! from the sets rather than incremented, so concurrent transactions cannot
//! drift the score away from the memberships.

use std::collections::BTreeSet;

use uuid::Uuid;

/// The action a user takes against a story.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Vote {
    Like,
    Dislike,
}

/// Where a given user currently stands on a story.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VoteState {
    Neutral,
    Liked,
    Disliked,
}

/// The like/dislike membership sets of one story.
///
/// Fields are private: `apply` is the only mutator, which is what keeps the
/// mutual-exclusivity invariant from ever being violated in memory.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Engagement {
    liked: BTreeSet<Uuid>,
    disliked: BTreeSet<Uuid>,
}

#[derive(Debug, thiserror::Error)]
pub enum EngagementError {
    #[error("user {0} appears in both the liked and disliked sets")]
    OverlappingMembership(Uuid),
}

/// What one `apply` call did, expressed as the state transition it made.
/// The row-level deltas (`like_added` etc.) let a relational store mirror
/// the exact join-table changes instead of rewriting whole sets.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VoteChange {
    pub previous: VoteState,
    pub current: VoteState,
}

impl VoteChange {
    pub fn like_added(&self) -> bool {
        self.current == VoteState::Liked && self.previous != VoteState::Liked
    }

    pub fn like_removed(&self) -> bool {
        self.previous == VoteState::Liked && self.current != VoteState::Liked
    }

    pub fn dislike_added(&self) -> bool {
        self.current == VoteState::Disliked && self.previous != VoteState::Disliked
    }

    pub fn dislike_removed(&self) -> bool {
        self.previous == VoteState::Disliked && self.current != VoteState::Disliked
    }
}

impl Engagement {
    pub fn new() -> Self {
        Self::default()
    }

    /// Rebuilds an engagement from persisted memberships, rejecting rows that
    /// violate the exclusivity invariant instead of silently repairing them.
    pub fn from_members(
        liked: impl IntoIterator<Item = Uuid>,
        disliked: impl IntoIterator<Item = Uuid>,
    ) -> Result<Self, EngagementError> {
        let liked: BTreeSet<Uuid> = liked.into_iter().collect();
        let disliked: BTreeSet<Uuid> = disliked.into_iter().collect();
        if let Some(user_id) = liked.intersection(&disliked).next() {
            return Err(EngagementError::OverlappingMembership(*user_id));
        }
        Ok(Self { liked, disliked })
    }

    pub fn state_of(&self, user_id: Uuid) -> VoteState {
        if self.liked.contains(&user_id) {
            VoteState::Liked
        } else if self.disliked.contains(&user_id) {
            VoteState::Disliked
        } else {
            VoteState::Neutral
        }
    }

    /// Applies one vote action and reports the transition it made.
    pub fn apply(&mut self, user_id: Uuid, vote: Vote) -> VoteChange {
        let previous = self.state_of(user_id);
        let current = match (previous, vote) {
            (VoteState::Liked, Vote::Like) => VoteState::Neutral,
            (VoteState::Disliked, Vote::Dislike) => VoteState::Neutral,
            (_, Vote::Like) => VoteState::Liked,
            (_, Vote::Dislike) => VoteState::Disliked,
        };

        self.liked.remove(&user_id);
        self.disliked.remove(&user_id);
        match current {
            VoteState::Liked => {
                self.liked.insert(user_id);
            }
            VoteState::Disliked => {
                self.disliked.insert(user_id);
            }
            VoteState::Neutral => {}
        }

        VoteChange { previous, current }
    }

    /// Net score, always derived from the authoritative sets.
    pub fn net_score(&self) -> i64 {
        self.liked.len() as i64 - self.disliked.len() as i64
    }

    pub fn liked(&self) -> &BTreeSet<Uuid> {
        &self.liked
    }

    pub fn disliked(&self) -> &BTreeSet<Uuid> {
        &self.disliked
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn user(n: u128) -> Uuid {
        Uuid::from_u128(n)
    }

    #[test]
    fn transition_table_matches_the_toggle_contract() {
        let alice = user(1);
        let cases = [
            (VoteState::Neutral, Vote::Like, VoteState::Liked),
            (VoteState::Neutral, Vote::Dislike, VoteState::Disliked),
            (VoteState::Liked, Vote::Like, VoteState::Neutral),
            (VoteState::Liked, Vote::Dislike, VoteState::Disliked),
            (VoteState::Disliked, Vote::Like, VoteState::Liked),
            (VoteState::Disliked, Vote::Dislike, VoteState::Neutral),
        ];

        for (start, vote, expected) in cases {
            let mut engagement = Engagement::new();
            match start {
                VoteState::Liked => {
                    engagement.apply(alice, Vote::Like);
                }
                VoteState::Disliked => {
                    engagement.apply(alice, Vote::Dislike);
                }
                VoteState::Neutral => {}
            }
            let change = engagement.apply(alice, vote);
            assert_eq!(change.previous, start);
            assert_eq!(change.current, expected);
            assert_eq!(engagement.state_of(alice), expected);
        }
    }

    #[test]
    fn repeating_a_like_returns_to_neutral() {
        let alice = user(1);
        let mut engagement = Engagement::new();
        let before = engagement.net_score();

        engagement.apply(alice, Vote::Like);
        assert_eq!(engagement.state_of(alice), VoteState::Liked);
        assert_eq!(engagement.net_score(), before + 1);

        engagement.apply(alice, Vote::Like);
        assert_eq!(engagement.state_of(alice), VoteState::Neutral);
        assert_eq!(engagement.net_score(), before);
    }

    #[test]
    fn switching_from_like_to_dislike_moves_membership_and_drops_score_by_two() {
        let alice = user(1);
        let mut engagement = Engagement::new();
        engagement.apply(alice, Vote::Like);
        let liked_score = engagement.net_score();

        let change = engagement.apply(alice, Vote::Dislike);
        assert!(change.like_removed());
        assert!(change.dislike_added());
        assert!(!engagement.liked().contains(&alice));
        assert!(engagement.disliked().contains(&alice));
        assert_eq!(engagement.net_score(), liked_score - 2);
    }

    #[test]
    fn a_user_is_never_in_both_sets() {
        let mut engagement = Engagement::new();
        let users: Vec<Uuid> = (1..=5).map(user).collect();
        let votes = [Vote::Like, Vote::Dislike, Vote::Like, Vote::Like, Vote::Dislike];

        // Interleave every user through every action a few times over.
        for round in 0..3 {
            for (i, &u) in users.iter().enumerate() {
                engagement.apply(u, votes[(i + round) % votes.len()]);
                assert!(engagement.liked().intersection(engagement.disliked()).next().is_none());
            }
        }
    }

    #[test]
    fn net_score_always_equals_likes_minus_dislikes() {
        let mut engagement = Engagement::new();
        let users: Vec<Uuid> = (1..=8).map(user).collect();

        let mut step = 0usize;
        for &u in &users {
            for _ in 0..4 {
                let vote = if step % 3 == 0 { Vote::Dislike } else { Vote::Like };
                engagement.apply(u, vote);
                assert_eq!(
                    engagement.net_score(),
                    engagement.liked().len() as i64 - engagement.disliked().len() as i64
                );
                step += 1;
            }
        }
    }

    #[test]
    fn overlapping_persisted_memberships_are_rejected() {
        let alice = user(1);
        let result = Engagement::from_members([alice], [alice]);
        assert!(matches!(
            result,
            Err(EngagementError::OverlappingMembership(id)) if id == alice
        ));
    }

    #[test]
    fn from_members_accepts_disjoint_sets() {
        let engagement = Engagement::from_members([user(1), user(2)], [user(3)]).unwrap();
        assert_eq!(engagement.net_score(), 1);
        assert_eq!(engagement.state_of(user(3)), VoteState::Disliked);
    }
}
