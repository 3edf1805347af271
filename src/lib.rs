//! Course review API: multi-dimensional ratings, threaded comments, likes and
//! course follows over a relational store.
//!
//! Everything is served under `/v1/api`. Each route opens one transaction,
//! hands it to a service function and commits once before responding.

#[macro_use]
extern crate rocket;

pub mod aggregation;
pub mod auth;
pub mod comments;
pub mod config;
pub mod courses;
pub mod engagement;
pub mod error;
pub mod ratings;
pub mod store;
pub mod user;

use rocket::fairing::{self, AdHoc};
use rocket::figment::Figment;
use rocket::http::{Method, Status};
use rocket::serde::json::Json;
use rocket::{Build, Request, Rocket};
use rocket_cors::{AllowedHeaders, AllowedOrigins, Cors, CorsOptions};
use rocket_db_pools::Database;
use tracing::{error, info};

use crate::config::AppConfig;
use crate::error::Message;

pub use crate::error::{Error, Result};

pub const API_BASE: &str = "/v1/api";

#[derive(Database)]
#[database("academisync")]
pub struct Db(sqlx::SqlitePool);

async fn run_migrations(rocket: Rocket<Build>) -> fairing::Result {
    let Some(db) = Db::fetch(&rocket) else {
        return Err(rocket);
    };

    match store::MIGRATOR.run(&**db).await {
        Ok(()) => {
            info!("database schema is up to date");
            Ok(rocket)
        }
        Err(e) => {
            error!(error = %e, "failed to run database migrations");
            Err(rocket)
        }
    }
}

fn cors() -> std::result::Result<Cors, rocket_cors::Error> {
    CorsOptions::default()
        .allowed_origins(AllowedOrigins::all())
        .allowed_methods(
            vec![Method::Get, Method::Post, Method::Delete, Method::Options]
                .into_iter()
                .map(From::from)
                .collect(),
        )
        .allowed_headers(AllowedHeaders::some(&["Authorization", "Content-Type"]))
        .to_cors()
}

async fn attach_cors(rocket: Rocket<Build>) -> fairing::Result {
    match cors() {
        Ok(cors) => Ok(rocket.attach(cors)),
        Err(e) => {
            error!(error = %e, "invalid CORS options");
            Err(rocket)
        }
    }
}

#[catch(400)]
fn bad_request() -> Json<Message> {
    Message::new("Bad request.")
}

#[catch(401)]
fn unauthorized() -> Json<Message> {
    Message::new("Missing or invalid bearer token.")
}

#[catch(404)]
fn not_found(request: &Request<'_>) -> Json<Message> {
    Message::new(format!("No resource at {}.", request.uri()))
}

#[catch(422)]
fn unprocessable() -> Json<Message> {
    Message::new("Request body could not be understood.")
}

#[catch(500)]
fn internal_error() -> Json<Message> {
    Message::new("Internal server error")
}

#[catch(default)]
fn fallback(status: Status, _request: &Request<'_>) -> Json<Message> {
    Message::new(status.reason_lossy())
}

/// Assembles the application from Rocket's default figment.
pub fn build() -> Rocket<Build> {
    build_from(rocket::Config::figment())
}

/// Assembles the application from an explicit figment; tests use this to
/// point the pool at an in-memory database.
pub fn build_from(figment: Figment) -> Rocket<Build> {
    rocket::custom(figment)
        .attach(Db::init())
        .attach(AdHoc::try_on_ignite("Database Migrations", run_migrations))
        .attach(AdHoc::try_on_ignite("CORS", attach_cors))
        .attach(AdHoc::config::<AppConfig>())
        .mount(
            API_BASE,
            routes![
                user::register,
                user::login,
                user::me,
                user::followed_courses,
                courses::list,
                courses::search,
                courses::detail,
                courses::instructor,
                ratings::submit,
                aggregation::course_averages,
                aggregation::pairing_averages,
                aggregation::course_instructor_averages,
                aggregation::my_ratings,
                comments::create,
                comments::course_threads,
                comments::pairing_threads,
                engagement::like,
                engagement::unlike,
                engagement::follow,
                engagement::unfollow,
            ],
        )
        .register(
            "/",
            catchers![
                bad_request,
                unauthorized,
                not_found,
                unprocessable,
                internal_error,
                fallback
            ],
        )
}
