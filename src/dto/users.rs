use serde::Serialize;
use utoipa::ToSchema;

use crate::models::UserProfile;

#[derive(Debug, Serialize, ToSchema)]
pub struct AuthData {
    pub user: UserProfile,
    pub token: String,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct UserData {
    pub user: UserProfile,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct Empty {}
