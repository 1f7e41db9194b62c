//! Demo customer accounts.
//!
//! Passwords are kept as plain text and session tokens never expire; both are
//! acceptable only because every document belongs to a throwaway demo session.

use chrono::Utc;

use crate::{
    audit::log_audit,
    dto::users::{AuthData, Empty, UserData},
    error::{AppError, AppResult},
    models::{User, UserProfile},
    response::ApiResponse,
    routes::params::RequestInput,
    services::{RequestContext, required_text},
    session::random_token,
    store::{EntityKind, StoreDocument},
};

pub const MIN_PASSWORD_LEN: usize = 6;

const PROFILE_FIELDS: [&str; 7] = [
    "first_name",
    "last_name",
    "phone",
    "address",
    "city",
    "postal_code",
    "canton",
];

fn normalize_email(input: &RequestInput) -> AppResult<String> {
    let email = required_text(input, "email", "Email")?.to_lowercase();
    if !email.contains('@') {
        return Err(AppError::BadRequest("Invalid email address".into()));
    }
    Ok(email)
}

fn check_password(password: &str) -> AppResult<()> {
    if password.chars().count() < MIN_PASSWORD_LEN {
        return Err(AppError::BadRequest(format!(
            "Password must be at least {MIN_PASSWORD_LEN} characters"
        )));
    }
    Ok(())
}

fn profile_field<'u>(user: &'u mut User, key: &str) -> Option<&'u mut String> {
    Some(match key {
        "first_name" => &mut user.first_name,
        "last_name" => &mut user.last_name,
        "phone" => &mut user.phone,
        "address" => &mut user.address,
        "city" => &mut user.city,
        "postal_code" => &mut user.postal_code,
        "canton" => &mut user.canton,
        _ => return None,
    })
}

fn apply_profile(user: &mut User, input: &RequestInput) {
    for key in PROFILE_FIELDS {
        if let (Some(value), Some(field)) = (input.raw_text(key), profile_field(user, key)) {
            *field = value;
        }
    }
}

/// Index of the user owning the request's bearer token.
fn authenticated(doc: &StoreDocument, input: &RequestInput) -> AppResult<usize> {
    let token = input
        .bearer()
        .ok_or_else(|| AppError::Unauthorized("Authentication required".into()))?;
    doc.users
        .iter()
        .position(|u| u.session_token.as_deref() == Some(token.as_str()))
        .ok_or_else(|| AppError::Unauthorized("Invalid or expired session token".into()))
}

pub fn register(
    doc: &mut StoreDocument,
    ctx: &RequestContext<'_>,
    input: &RequestInput,
) -> AppResult<ApiResponse<AuthData>> {
    let email = normalize_email(input)?;
    let password = input
        .raw_text("password")
        .ok_or_else(|| AppError::BadRequest("Password is required".into()))?;
    check_password(&password)?;
    if doc.users.iter().any(|u| u.email.eq_ignore_ascii_case(&email)) {
        return Err(AppError::BadRequest("Email is already registered".into()));
    }

    let now = Utc::now();
    let token = random_token();
    let mut user = User {
        id: doc.next_id(EntityKind::User),
        email,
        password,
        first_name: String::new(),
        last_name: String::new(),
        phone: String::new(),
        address: String::new(),
        city: String::new(),
        postal_code: String::new(),
        canton: String::new(),
        session_token: Some(token.clone()),
        created_at: now,
        updated_at: now,
    };
    apply_profile(&mut user, input);
    let profile = UserProfile::from(&user);
    doc.users.push(user);

    log_audit(
        ctx.session,
        "user_register",
        "users",
        Some(serde_json::json!({ "user_id": profile.id })),
    );

    Ok(ApiResponse::success("Registration successful", AuthData { user: profile, token }).created())
}

pub fn login(
    doc: &mut StoreDocument,
    ctx: &RequestContext<'_>,
    input: &RequestInput,
) -> AppResult<ApiResponse<AuthData>> {
    let email = required_text(input, "email", "Email")?;
    let password = input
        .raw_text("password")
        .ok_or_else(|| AppError::BadRequest("Password is required".into()))?;
    if input.flag("remember_me") {
        tracing::debug!("remember_me has no effect on demo sessions");
    }

    let user = doc
        .users
        .iter_mut()
        .find(|u| u.email.eq_ignore_ascii_case(&email) && u.password == password)
        .ok_or_else(|| AppError::Unauthorized("Invalid email or password".into()))?;

    let token = random_token();
    user.session_token = Some(token.clone());
    let profile = UserProfile::from(&*user);

    log_audit(
        ctx.session,
        "user_login",
        "users",
        Some(serde_json::json!({ "user_id": profile.id })),
    );

    Ok(ApiResponse::success("Logged in", AuthData { user: profile, token }))
}

pub fn logout(doc: &mut StoreDocument, input: &RequestInput) -> AppResult<ApiResponse<Empty>> {
    let index = authenticated(doc, input)?;
    doc.users[index].session_token = None;
    Ok(ApiResponse::success("Logged out", Empty {}))
}

pub fn get_user(doc: &StoreDocument, input: &RequestInput) -> AppResult<ApiResponse<UserData>> {
    let index = authenticated(doc, input)?;
    Ok(ApiResponse::data(UserData {
        user: UserProfile::from(&doc.users[index]),
    }))
}

pub fn update_user(
    doc: &mut StoreDocument,
    ctx: &RequestContext<'_>,
    input: &RequestInput,
) -> AppResult<ApiResponse<UserData>> {
    let index = authenticated(doc, input)?;

    if input.has("email") {
        let email = normalize_email(input)?;
        let taken = doc
            .users
            .iter()
            .enumerate()
            .any(|(i, u)| i != index && u.email.eq_ignore_ascii_case(&email));
        if taken {
            return Err(AppError::BadRequest("Email is already registered".into()));
        }
        doc.users[index].email = email;
    }

    let user = &mut doc.users[index];
    apply_profile(user, input);
    user.updated_at = Utc::now();
    let profile = UserProfile::from(&*user);

    log_audit(
        ctx.session,
        "user_update",
        "users",
        Some(serde_json::json!({ "user_id": profile.id })),
    );

    Ok(ApiResponse::success("Profile updated", UserData { user: profile }))
}

pub fn change_password(
    doc: &mut StoreDocument,
    ctx: &RequestContext<'_>,
    input: &RequestInput,
) -> AppResult<ApiResponse<Empty>> {
    let index = authenticated(doc, input)?;
    let current = input
        .raw_text("current_password")
        .ok_or_else(|| AppError::BadRequest("Current password is required".into()))?;
    let new_password = input
        .raw_text("new_password")
        .ok_or_else(|| AppError::BadRequest("New password is required".into()))?;

    let user = &mut doc.users[index];
    if user.password != current {
        return Err(AppError::Unauthorized("Current password is incorrect".into()));
    }
    check_password(&new_password)?;
    user.password = new_password;
    user.updated_at = Utc::now();

    log_audit(
        ctx.session,
        "user_password_change",
        "users",
        Some(serde_json::json!({ "user_id": user.id })),
    );

    Ok(ApiResponse::success("Password changed", Empty {}))
}

/// Deletes the account behind the bearer token.
pub fn delete_user(
    doc: &mut StoreDocument,
    ctx: &RequestContext<'_>,
    input: &RequestInput,
) -> AppResult<ApiResponse<Empty>> {
    let index = authenticated(doc, input)?;
    let user = doc.users.remove(index);

    log_audit(
        ctx.session,
        "user_delete",
        "users",
        Some(serde_json::json!({ "user_id": user.id })),
    );

    Ok(ApiResponse::success("Account deleted", Empty {}))
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;
    use crate::{config::AppConfig, store::seed, uploads::{UploadBatch, UploadStore}};

    fn run<T>(f: impl FnOnce(&RequestContext<'_>) -> T) -> T {
        let config = AppConfig::for_dir(std::env::temp_dir());
        let uploads = UploadStore::new(&config.uploads_dir, "/demo-uploads");
        let batch = UploadBatch::new();
        f(&RequestContext {
            session: "test",
            config: &config,
            uploads: &uploads,
            batch: &batch,
        })
    }

    fn registered(doc: &mut StoreDocument) -> String {
        let input = RequestInput::from_json(json!({
            "email": "Fritz@Example.ch",
            "password": "geheim123",
            "first_name": "Fritz",
        }));
        run(|ctx| register(doc, ctx, &input)).unwrap().data.token
    }

    #[test]
    fn email_uniqueness_ignores_case() {
        let mut doc = seed::document();
        registered(&mut doc);
        let input = RequestInput::from_json(json!({"email": "fritz@example.CH", "password": "abcdefg"}));
        let err = run(|ctx| register(&mut doc, ctx, &input)).unwrap_err();
        assert!(matches!(err, AppError::BadRequest(_)));
        assert_eq!(doc.users.len(), 1);
    }

    #[test]
    fn login_rotates_token() {
        let mut doc = seed::document();
        let first = registered(&mut doc);
        let input = RequestInput::from_json(json!({"email": "FRITZ@example.ch", "password": "geheim123"}));
        let second = run(|ctx| login(&mut doc, ctx, &input)).unwrap().data.token;
        assert_ne!(first, second);

        assert!(get_user(&doc, &RequestInput::new().with_bearer(first)).is_err());
        let me = get_user(&doc, &RequestInput::new().with_bearer(second)).unwrap();
        assert_eq!(me.data.user.first_name, "Fritz");
    }

    #[test]
    fn wrong_password_is_unauthorized() {
        let mut doc = seed::document();
        registered(&mut doc);
        let input = RequestInput::from_json(json!({"email": "fritz@example.ch", "password": "nope"}));
        let err = run(|ctx| login(&mut doc, ctx, &input)).unwrap_err();
        assert!(matches!(err, AppError::Unauthorized(_)));
    }

    #[test]
    fn change_password_requires_current() {
        let mut doc = seed::document();
        let token = registered(&mut doc);
        let input = RequestInput::from_json(json!({
            "current_password": "wrong", "new_password": "neuesPasswort"
        }))
        .with_bearer(token.clone());
        assert!(matches!(
            run(|ctx| change_password(&mut doc, ctx, &input)).unwrap_err(),
            AppError::Unauthorized(_)
        ));

        let input = RequestInput::from_json(json!({
            "current_password": "geheim123", "new_password": "neuesPasswort"
        }))
        .with_bearer(token);
        run(|ctx| change_password(&mut doc, ctx, &input)).unwrap();
        assert_eq!(doc.users[0].password, "neuesPasswort");
    }

    #[test]
    fn delete_is_keyed_by_token() {
        let mut doc = seed::document();
        let token = registered(&mut doc);
        assert!(run(|ctx| delete_user(&mut doc, ctx, &RequestInput::new())).is_err());
        run(|ctx| delete_user(&mut doc, ctx, &RequestInput::new().with_bearer(token))).unwrap();
        assert!(doc.users.is_empty());
    }
}
