// Copyright (c) Mysten Labs, Inc.
// SPDX-License-Identifier: Apache-2.0

//! Diesel table definitions for the Postgres-backed Activity Store and
//! Checkpoint Store (spec.md §4.5), matching `migrations/`.

diesel::table! {
    activities (network, id) {
        network -> Text,
        id -> Text,
        #[sql_name = "from"]
        from_ -> Text,
        #[sql_name = "to"]
        to_ -> Text,
        #[sql_name = "type"]
        ty -> Text,
        tag -> Text,
        platform -> Text,
        timestamp -> Timestamptz,
        status -> Bool,
        fee -> Jsonb,
        actions -> Jsonb,
    }
}

diesel::table! {
    checkpoints (network, worker, parameters_hash) {
        network -> Text,
        worker -> Text,
        parameters_hash -> Text,
        state -> Binary,
        index_count -> BigInt,
        updated_at -> Timestamptz,
    }
}
