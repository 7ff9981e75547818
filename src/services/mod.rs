pub mod auth_service;
pub mod movie_service;
pub mod reservation_ledger;
pub mod reservation_service;
pub mod screening_service;
pub mod seat_service;
pub mod theater_service;
