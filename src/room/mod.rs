//! Room roster tracking

pub mod roster;

pub use roster::RoomMembershipTracker;
