use argon2::{
    password_hash::{rand_core::OsRng, PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Argon2,
};
use rocket::response::status::Created;
use rocket::serde::{json::Json, Deserialize, Serialize};
use rocket::State;
use rocket_db_pools::Connection;
use sqlx::SqliteConnection;
use tracing::{info, warn};

use crate::auth::AuthenticatedUser;
use crate::config::AppConfig;
use crate::error::{Error, Result};
use crate::store::{self, Course, NewUser, User};
use crate::Db;

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(crate = "rocket::serde")]
pub struct Registration {
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default, alias = "password_hash")]
    pub password: Option<String>,
    #[serde(default)]
    pub name: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(crate = "rocket::serde")]
pub struct LoginRequest {
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default, alias = "password_hash")]
    pub password: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(crate = "rocket::serde")]
pub struct LoginResponse {
    pub token: String,
    pub user: User,
}

fn required(value: &Option<String>) -> Option<&str> {
    value.as_deref().map(str::trim).filter(|v| !v.is_empty())
}

fn hash_password(password: &str) -> Result<String> {
    let salt = SaltString::generate(&mut OsRng);
    // Argon2 with default params (Argon2id v19)
    let hash = Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map_err(|e| Error::Password(e.to_string()))?;
    Ok(hash.to_string())
}

fn verify_password(password: &str, stored: &str) -> Result<bool> {
    let parsed = PasswordHash::new(stored).map_err(|e| Error::Password(e.to_string()))?;
    Ok(Argon2::default()
        .verify_password(password.as_bytes(), &parsed)
        .is_ok())
}

pub async fn register_user(
    registration: &Registration,
    config: &AppConfig,
    conn: &mut SqliteConnection,
) -> Result<User> {
    let (Some(email), Some(password), Some(name)) = (
        required(&registration.email),
        registration.password.as_deref().filter(|p| !p.is_empty()),
        required(&registration.name),
    ) else {
        return Err(Error::validation("Missing required fields."));
    };

    if !config.is_email_permitted(email) {
        return Err(Error::validation(
            "Please use a school email address for registration.",
        ));
    }

    if User::find_by_name(name, &mut *conn).await?.is_some() {
        return Err(Error::conflict(
            "Username already taken. Please choose another one.",
        ));
    }
    if User::find_by_email(email, &mut *conn).await?.is_some() {
        return Err(Error::conflict("Email already exists."));
    }

    let password_hash = hash_password(password)?;
    let user = NewUser {
        email,
        password_hash: &password_hash,
        name,
    }
    .insert(conn)
    .await?;

    info!(user_id = user.id, "user registered");
    Ok(user)
}

pub async fn login_user(
    request: &LoginRequest,
    config: &AppConfig,
    conn: &mut SqliteConnection,
) -> Result<LoginResponse> {
    let (Some(email), Some(password)) = (required(&request.email), request.password.as_deref())
    else {
        return Err(Error::validation("Missing email or password."));
    };

    let invalid = || Error::Unauthorized("Invalid email or password.".to_string());

    let user = User::find_by_email(email, conn).await?.ok_or_else(invalid)?;
    if !verify_password(password, &user.password_hash)? {
        warn!(user_id = user.id, "failed login");
        return Err(invalid());
    }

    let token = AuthenticatedUser::new(user.id).to_token(config)?;
    Ok(LoginResponse { token, user })
}

async fn current_user(user: &AuthenticatedUser, conn: &mut SqliteConnection) -> Result<User> {
    // A valid token can outlive its account.
    User::find(user.id(), conn)
        .await?
        .ok_or_else(|| Error::not_found("User not found."))
}

#[post("/auth/register", data = "<registration>")]
pub async fn register(
    mut db: Connection<Db>,
    config: &State<AppConfig>,
    registration: Json<Registration>,
) -> Result<Created<Json<User>>> {
    let mut tx = store::begin(&mut db).await?;
    let user = register_user(&registration, config, &mut tx).await?;
    tx.commit().await?;

    Ok(Created::new("/v1/api/users/me").body(Json(user)))
}

#[post("/auth/login", data = "<request>")]
pub async fn login(
    mut db: Connection<Db>,
    config: &State<AppConfig>,
    request: Json<LoginRequest>,
) -> Result<Json<LoginResponse>> {
    Ok(Json(login_user(&request, config, &mut db).await?))
}

#[get("/users/me")]
pub async fn me(mut db: Connection<Db>, user: AuthenticatedUser) -> Result<Json<User>> {
    Ok(Json(current_user(&user, &mut db).await?))
}

#[get("/users/me/followed-courses")]
pub async fn followed_courses(
    mut db: Connection<Db>,
    user: AuthenticatedUser,
) -> Result<Json<Vec<Course>>> {
    let user = current_user(&user, &mut db).await?;
    Ok(Json(Course::followed_by(user.id, &mut db).await?))
}
