use utoipa::{
    Modify, OpenApi,
    openapi::{
        self,
        OpenApi as OpenApiSpec,
        security::{HttpAuthScheme, HttpBuilder, SecurityScheme},
    },
};
use utoipa_scalar::{Scalar, Servable};

use crate::{
    dto::{
        auth::{LoginRequest, LoginResponse, RegisterRequest},
        movies::{CreateMovieRequest, MovieList, UpdateMovieRequest},
        reservations::{CreateReservationRequest, ReservationDetail, ReservationList},
        screenings::{
            CreateScreeningRequest, ScreeningAvailability, ScreeningList, SeatAvailability,
            UpdateScreeningRequest,
        },
        theaters::{
            CreateScreenRequest, CreateTheaterRequest, ScreenWithSeats, SeatList, TheaterList,
            TheaterWithScreens,
        },
    },
    models::{
        Movie, Reservation, ReservationStatus, Screen, Screening, ScreeningDetail, Seat, Theater,
        User,
    },
    response::{ApiResponse, Meta},
    routes::{auth, health, movies, params, reservations, screenings, theaters},
};

struct SecurityAddon;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut openapi::OpenApi) {
        let components = openapi.components.get_or_insert_with(Default::default);
        components.add_security_scheme(
            "bearer_auth",
            SecurityScheme::Http(
                HttpBuilder::new()
                    .scheme(HttpAuthScheme::Bearer)
                    .bearer_format("JWT")
                    .build(),
            ),
        );
    }
}

#[derive(OpenApi)]
#[openapi(
    paths(
        health::health_check,
        auth::login,
        auth::register,
        movies::list_movies,
        movies::get_movie,
        movies::create_movie,
        movies::update_movie,
        movies::delete_movie,
        theaters::list_theaters,
        theaters::get_theater,
        theaters::create_theater,
        theaters::create_screen,
        theaters::list_seats,
        screenings::list_screenings,
        screenings::get_screening,
        screenings::get_availability,
        screenings::create_screening,
        screenings::update_screening,
        screenings::delete_screening,
        reservations::create_reservation,
        reservations::list_reservations,
        reservations::get_reservation,
        reservations::cancel_reservation
    ),
    components(
        schemas(
            User,
            Movie,
            Theater,
            Screen,
            Seat,
            Screening,
            ScreeningDetail,
            Reservation,
            ReservationStatus,
            RegisterRequest,
            LoginRequest,
            LoginResponse,
            CreateMovieRequest,
            UpdateMovieRequest,
            MovieList,
            CreateTheaterRequest,
            CreateScreenRequest,
            TheaterWithScreens,
            TheaterList,
            ScreenWithSeats,
            SeatList,
            CreateScreeningRequest,
            UpdateScreeningRequest,
            ScreeningList,
            SeatAvailability,
            ScreeningAvailability,
            CreateReservationRequest,
            ReservationDetail,
            ReservationList,
            params::Pagination,
            params::SortOrder,
            params::MovieQuery,
            params::ScreeningListQuery,
            Meta,
            ApiResponse<Movie>,
            ApiResponse<MovieList>,
            ApiResponse<ScreeningDetail>,
            ApiResponse<ScreeningList>,
            ApiResponse<ReservationDetail>,
            ApiResponse<ReservationList>
        )
    ),
    security(
        ("bearer_auth" = [])
    ),
    modifiers(&SecurityAddon),
    tags(
        (name = "Health", description = "Health check endpoint"),
        (name = "Auth", description = "Authentication endpoints"),
        (name = "Movies", description = "Movie catalogue endpoints"),
        (name = "Theaters", description = "Theater, screen and seat endpoints"),
        (name = "Screenings", description = "Screening schedule endpoints"),
        (name = "Reservations", description = "Seat reservation endpoints"),
    )
)]
pub struct ApiDoc;

pub fn scalar_docs() -> Scalar<OpenApiSpec> {
    Scalar::with_url("/docs", ApiDoc::openapi())
}
