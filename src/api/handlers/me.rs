use axum::{extract::Extension, response::Json};

use crate::auth::Identity;

#[utoipa::path(
    get,
    path = "/v1/me",
    responses(
        (status = 200, description = "The caller as resolved by the auth chain", body = Identity),
        (status = 401, description = "No credential was accepted"),
    ),
    tag = "auth"
)]
pub async fn me(Extension(identity): Extension<Identity>) -> Json<Identity> {
    Json(identity)
}
