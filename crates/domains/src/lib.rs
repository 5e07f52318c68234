//! The domain model and port definitions for StylePitch.
//!
//! Nothing in this crate performs I/O; adapters implement [`ports`].

pub mod error;
pub mod models;
pub mod ports;
pub mod region;

pub use error::*;
pub use models::*;
pub use ports::*;
pub use region::{copy_targets, Region, GLOBAL, TAGGABLE_REGIONS};

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeMap;

    fn user(first: &str, last: &str) -> User {
        User {
            id: UserId::new("u1"),
            first_name: first.into(),
            last_name: last.into(),
            email: "u1@example.com".into(),
            region_preference: None,
            saved_designs: vec![],
            uploaded_designs: vec![],
            chats: BTreeMap::new(),
            created_at: chrono::Utc::now(),
        }
    }

    #[test]
    fn vote_from_region_touches_three_copies() {
        let targets = vote_targets(&Region::parse("Europe").unwrap());
        assert_eq!(
            targets,
            vec![
                VoteTarget::Canonical,
                VoteTarget::Region(Region::parse("Europe").unwrap()),
                VoteTarget::Region(Region::global()),
            ]
        );
    }

    #[test]
    fn vote_from_global_touches_two_copies() {
        let targets = vote_targets(&Region::global());
        assert_eq!(
            targets,
            vec![VoteTarget::Canonical, VoteTarget::Region(Region::global())]
        );
    }

    #[test]
    fn swipe_direction_accepts_aliases() {
        let right: SwipeDirection = serde_json::from_str("\"right\"").unwrap();
        let left: SwipeDirection = serde_json::from_str("\"left\"").unwrap();
        assert_eq!(right, SwipeDirection::Like);
        assert_eq!(left, SwipeDirection::Dislike);
        assert_eq!(serde_json::to_string(&right).unwrap(), "\"like\"");
    }

    #[test]
    fn display_name_falls_back() {
        assert_eq!(user("Ada", "Lovelace").display_name(), "Ada Lovelace");
        assert_eq!(user("", " ").display_name(), "First Last");
    }

    #[test]
    fn thread_lookup_by_counterparty() {
        let mut u = user("Ada", "Lovelace");
        u.chats.insert(ChatId::new("c1"), UserId::new("designer"));
        assert_eq!(u.thread_with(&UserId::new("designer")), Some(&ChatId::new("c1")));
        assert_eq!(u.thread_with(&UserId::new("other")), None);
    }

    #[test]
    fn counterparty_of_thread() {
        let thread = ChatThread {
            id: ChatId::new("c"),
            participants: [UserId::new("a"), UserId::new("b")],
            created_at: chrono::Utc::now(),
        };
        assert_eq!(thread.counterparty_of(&UserId::new("a")), Some(&UserId::new("b")));
        assert_eq!(thread.counterparty_of(&UserId::new("b")), Some(&UserId::new("a")));
        assert!(thread.counterparty_of(&UserId::new("c")).is_none());
    }
}
