// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

use filez_server_auth::{AppId, UserId};

/// The authenticated principal and the app the request came through.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Caller {
	pub user_id: UserId,
	pub app_id: AppId,
}

impl Caller {
	pub fn new(user_id: UserId, app_id: AppId) -> Self {
		Self { user_id, app_id }
	}
}
