pub mod game;
pub mod player;
pub mod rules;
pub mod transcript;
pub mod unit;
