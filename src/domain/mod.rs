pub mod card;
pub mod review;

pub use card::{Card, Deck, Difficulty};
pub use review::ReviewEvent;
