/*
 * SPDX-FileCopyrightText: 2026 Wavelens GmbH <info@wavelens.io>
 *
 * SPDX-License-Identifier: AGPL-3.0-only
 */

//! Authentication is the one flow that surfaces failures as errors instead of
//! an [`ApiResponse::Err`], so callers can report them inline.

use crate::*;
use serde::{Deserialize, Serialize};

#[derive(Serialize, Deserialize, Debug)]
struct MakeLoginRequest {
    pub email: String,
    pub password: String,
}

#[derive(Serialize, Deserialize, Debug)]
struct MakeUserRequest {
    pub email: String,
    pub password: String,
    pub name: String,
}

pub async fn post_login(
    config: &RequestConfig,
    email: String,
    password: String,
) -> Result<AuthResponse, ConnectorError> {
    let req = MakeLoginRequest { email, password };

    let res = get_client(config, ServiceBase::Auth, "/login", RequestType::POST)
        .json(&req)
        .send()
        .await?;

    parse_response::<AuthResponse>(res).await.into_result()
}

/// Registration answers with the created user only; a token is obtained by
/// logging in afterwards.
pub async fn post_register(
    config: &RequestConfig,
    email: String,
    password: String,
    name: String,
) -> Result<User, ConnectorError> {
    let req = MakeUserRequest {
        email,
        password,
        name,
    };

    let res = get_client(config, ServiceBase::Auth, "/register", RequestType::POST)
        .json(&req)
        .send()
        .await?;

    parse_response::<User>(res).await.into_result()
}
