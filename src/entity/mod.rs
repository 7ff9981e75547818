pub mod audit_logs;
pub mod movies;
pub mod reservation_seats;
pub mod reservations;
pub mod screenings;
pub mod screens;
pub mod seats;
pub mod theaters;
pub mod users;

pub use audit_logs::Entity as AuditLogs;
pub use movies::Entity as Movies;
pub use reservation_seats::Entity as ReservationSeats;
pub use reservations::Entity as Reservations;
pub use screenings::Entity as Screenings;
pub use screens::Entity as Screens;
pub use seats::Entity as Seats;
pub use theaters::Entity as Theaters;
pub use users::Entity as Users;
