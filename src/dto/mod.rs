pub mod auth;
pub mod movies;
pub mod reservations;
pub mod screenings;
pub mod theaters;
