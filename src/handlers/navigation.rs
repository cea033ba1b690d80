use axum::{Extension, Json};

use crate::access::{visibility, Visibility};
use crate::utils::jwt::Claims;

/// Navigation, master tabs and dashboard widgets for the caller's role
pub async fn my_navigation(Extension(claims): Extension<Claims>) -> Json<Visibility> {
    Json(visibility(claims.role))
}
