use rusqlite::Connection;

use crate::db::{self, queries};
use crate::errors::AppError;
use crate::models::{NewUser, User, UserRole};

pub fn create_user(conn: &Connection, new_user: NewUser) -> Result<User, AppError> {
    let email = new_user.email.trim().to_lowercase();
    if new_user.name.trim().is_empty() {
        return Err(AppError::Validation("name must not be empty".to_string()));
    }
    if !email.contains('@') {
        return Err(AppError::Validation(format!("invalid email: {email}")));
    }

    let user = User {
        id: uuid::Uuid::new_v4().to_string(),
        name: new_user.name.trim().to_string(),
        email,
        role: new_user.role.unwrap_or(UserRole::User),
        created_at: db::now(),
    };

    match queries::insert_user(conn, &user) {
        Ok(()) => {}
        Err(rusqlite::Error::SqliteFailure(e, _)) if e.code == rusqlite::ErrorCode::ConstraintViolation => {
            return Err(AppError::Conflict(format!("email already registered: {}", user.email)));
        }
        Err(e) => return Err(e.into()),
    }

    tracing::info!(user_id = %user.id, role = user.role.as_str(), "user created");
    Ok(user)
}
