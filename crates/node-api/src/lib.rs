// Copyright (c) Mysten Labs, Inc.
// SPDX-License-Identifier: Apache-2.0

//! The HTTP query API (spec.md §6): `GET /activities`, `GET
//! /activities/:network/:id`, `GET /healthz`. Deliberately thin per
//! spec.md §1 Out-of-scope — a read-only view over the Activity Store,
//! built on the teacher's `axum` + `tower-http` stack rather than a
//! hand-rolled listener (see `mysten-service`'s `/health` route for the
//! shape this imitates).

mod error;
mod query;

use std::sync::Arc;

use axum::extract::{Path, Query, State};
use axum::routing::get;
use axum::{Json, Router};
use node_storage::Store;
use node_types::{Activity, Network};
use serde::Serialize;
use tower_http::trace::TraceLayer;

pub use error::ApiError;
pub use query::ActivitiesQueryParams;

#[derive(Clone)]
struct ApiState {
    store: Arc<dyn Store>,
}

/// Builds the router. `store` is shared with the Indexer Engine
/// instances writing to the same backend, so reads observe committed
/// activities as soon as the engine's transaction commits.
pub fn router(store: Arc<dyn Store>) -> Router {
    Router::new()
        .route("/healthz", get(healthz))
        .route("/activities", get(list_activities))
        .route("/activities/:network/:id", get(get_activity))
        .layer(TraceLayer::new_for_http())
        .with_state(ApiState { store })
}

#[derive(Serialize)]
struct Health {
    status: &'static str,
}

async fn healthz() -> Json<Health> {
    Json(Health { status: "up" })
}

async fn get_activity(
    State(state): State<ApiState>,
    Path((network, id)): Path<(Network, String)>,
) -> Result<Json<Activity>, ApiError> {
    state
        .store
        .find_activity(network, &id)
        .await?
        .map(Json)
        .ok_or(ApiError::NotFound)
}

#[derive(Serialize)]
struct ActivityList {
    activities: Vec<Activity>,
}

async fn list_activities(
    State(state): State<ApiState>,
    Query(params): Query<ActivitiesQueryParams>,
) -> Result<Json<ActivityList>, ApiError> {
    let query = params.into_query()?;
    let activities = state.store.find_activities(&query).await?;
    Ok(Json(ActivityList { activities }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::http::{Request, StatusCode};
    use chrono::Utc;
    use node_storage::MemoryStore;
    use node_types::{Action, ActionMetadata, Fee, Platform, Tag, TokenAmount, Type};
    use tower::ServiceExt;

    fn sample_activity(id: &str) -> Activity {
        Activity {
            id: id.to_string(),
            network: Network::ArweaveMainnet,
            from: "alice".to_string(),
            to: "bob".to_string(),
            ty: Type::TransactionTransfer,
            tag: Tag::Transaction,
            platform: Platform::ArweaveNative,
            timestamp: Utc::now(),
            status: true,
            fee: Fee { amount: "0".to_string(), decimal: 12, address: None },
            actions: vec![Action {
                ty: Type::TransactionTransfer,
                platform: Platform::ArweaveNative,
                from: "alice".to_string(),
                to: "bob".to_string(),
                metadata: ActionMetadata::Transfer {
                    token: TokenAmount {
                        name: "Arweave".to_string(),
                        symbol: "AR".to_string(),
                        decimals: 12,
                        value: "1".to_string(),
                        address: None,
                        standard: None,
                    },
                },
            }],
        }
    }

    async fn seeded_store() -> Arc<dyn Store> {
        let store = MemoryStore::new();
        let mut txn = store.begin().await.unwrap();
        txn.save_activities(&[sample_activity("a")]).await.unwrap();
        txn.commit().await.unwrap();
        Arc::new(store)
    }

    #[tokio::test]
    async fn healthz_reports_up() {
        let app = router(seeded_store().await);
        let response = app
            .oneshot(Request::builder().uri("/healthz").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn get_activity_returns_the_canonical_shape() {
        let app = router(seeded_store().await);
        let response = app
            .oneshot(
                Request::builder()
                    .uri("/activities/arweave_mainnet/a")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn get_activity_404s_on_unknown_id() {
        let app = router(seeded_store().await);
        let response = app
            .oneshot(
                Request::builder()
                    .uri("/activities/arweave_mainnet/does-not-exist")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn list_activities_filters_by_network() {
        let app = router(seeded_store().await);
        let response = app
            .oneshot(
                Request::builder()
                    .uri("/activities?network=ethereum")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }
}
