// Copyright Exograph, Inc. All rights reserved.
//
// Use of this software is governed by the Business Source License
// included in the LICENSE file at the root of this repository.
//
// As of the Change Date specified in that file, in accordance with
// the Business Source License, use of this software will be governed
// by the Apache License, Version 2.0.

pub const TG_DATABASE_URL: &str = "TG_DATABASE_URL";
pub const DATABASE_URL: &str = "DATABASE_URL";

pub const TG_SERVER_PORT: &str = "TG_SERVER_PORT";

/// Follows the same conventions as `RUST_LOG`.
pub const TG_LOG: &str = "TG_LOG";
