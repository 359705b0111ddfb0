//! Registration, login and profile endpoints.

use crate::net::request::{ApiClient, Envelope, RequestSpec};
use crate::net::types::{ChangePasswordRequest, LoginRequest, RegisterRequest, UpdateAvatarRequest, UpdateUserRequest};

pub const USER_INFO_PATH: &str = "/api/user/info";

/// `POST /api/user/register`
pub async fn register(client: &ApiClient, req: &RegisterRequest) -> Envelope {
    client.execute(RequestSpec::post("/api/user/register").json(req)).await
}

/// `POST /api/user/login`. The token comes back as the bare response body.
pub async fn login(client: &ApiClient, req: &LoginRequest) -> Envelope {
    client.execute(RequestSpec::post("/api/user/login").json(req)).await
}

/// `GET /api/user/info` for the bearer of the current token.
pub async fn info(client: &ApiClient) -> Envelope {
    client.execute(RequestSpec::get(USER_INFO_PATH)).await
}

/// `POST /api/user/avatar`
pub async fn update_avatar(client: &ApiClient, req: &UpdateAvatarRequest) -> Envelope {
    client.execute(RequestSpec::post("/api/user/avatar").json(req)).await
}

/// `POST /api/user/update`
pub async fn update_info(client: &ApiClient, req: &UpdateUserRequest) -> Envelope {
    client.execute(RequestSpec::post("/api/user/update").json(req)).await
}

/// `POST /api/user/changePwd`
pub async fn change_password(client: &ApiClient, req: &ChangePasswordRequest) -> Envelope {
    client.execute(RequestSpec::post("/api/user/changePwd").json(req)).await
}
