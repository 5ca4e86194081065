// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

use axum::Json;

use crate::{auth::Auth, storage::UserView};

/// Profile of the signed-in user, including relationship manager contacts.
#[utoipa::path(
    get,
    path = "/api/users/profile",
    tag = "Users",
    security(("bearer_auth" = [])),
    responses(
        (status = 200, description = "User profile", body = UserView),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Account frozen")
    )
)]
pub async fn profile(Auth(user): Auth) -> Json<UserView> {
    Json(UserView::from(&user.profile))
}
