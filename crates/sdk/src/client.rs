//! Thin async HTTP client over the SwapGraph API surface (§6).

use std::time::Duration;

use reqwest::{Response, StatusCode};
use serde::Serialize;

use crate::error::{ErrorEnvelope, Result, SdkError};
use crate::types::*;

/// The actor identity this client authenticates requests as, carried into
/// every call's `x-actor-type`/`x-actor-id`/`x-auth-scopes` headers.
#[derive(Debug, Clone)]
pub struct ClientIdentity {
    pub actor_type: String,
    pub actor_id: String,
    pub scopes: Vec<String>,
}

#[derive(Clone)]
pub struct SwapGraphClient {
    base_url: String,
    http: reqwest::Client,
    identity: ClientIdentity,
}

impl SwapGraphClient {
    pub fn new(base_url: impl Into<String>, identity: ClientIdentity) -> Self {
        Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            http: reqwest::Client::builder().timeout(Duration::from_secs(30)).build().unwrap_or_default(),
            identity,
        }
    }

    fn headers(&self, idempotency_key: Option<&str>) -> reqwest::header::HeaderMap {
        let mut headers = reqwest::header::HeaderMap::new();
        headers.insert("x-actor-type", self.identity.actor_type.parse().expect("actor type is a valid header value"));
        headers.insert("x-actor-id", self.identity.actor_id.parse().expect("actor id is a valid header value"));
        headers.insert(
            "x-auth-scopes",
            self.identity.scopes.join(" ").parse().expect("scopes join to a valid header value"),
        );
        let correlation_id = format!("corr_req_{}", uuid::Uuid::new_v4());
        headers.insert("x-correlation-id", correlation_id.parse().expect("uuid is a valid header value"));
        if let Some(key) = idempotency_key {
            headers.insert("idempotency-key", key.parse().expect("idempotency key is a valid header value"));
        }
        headers
    }

    async fn decode<T: serde::de::DeserializeOwned>(&self, response: Response) -> Result<T> {
        let status = response.status();
        if status.is_success() {
            Ok(response.json::<T>().await?)
        } else {
            let envelope = response.json::<ErrorEnvelope>().await.unwrap_or(ErrorEnvelope {
                correlation_id: String::new(),
                error: crate::error::ErrorBody { code: "SERVER_ERROR".to_string(), message: status.to_string(), details: serde_json::Value::Null },
            });
            Err(SdkError::Api { status: status.as_u16(), envelope })
        }
    }

    async fn get<T: serde::de::DeserializeOwned>(&self, path: &str) -> Result<T> {
        let response = self.http.get(format!("{}{}", self.base_url, path)).headers(self.headers(None)).send().await?;
        self.decode(response).await
    }

    async fn post<B: Serialize, T: serde::de::DeserializeOwned>(&self, path: &str, idempotency_key: &str, body: &B) -> Result<T> {
        let response = self
            .http
            .post(format!("{}{}", self.base_url, path))
            .headers(self.headers(Some(idempotency_key)))
            .json(body)
            .send()
            .await?;
        self.decode(response).await
    }

    async fn patch<B: Serialize, T: serde::de::DeserializeOwned>(&self, path: &str, idempotency_key: &str, body: &B) -> Result<T> {
        let response = self
            .http
            .patch(format!("{}{}", self.base_url, path))
            .headers(self.headers(Some(idempotency_key)))
            .json(body)
            .send()
            .await?;
        self.decode(response).await
    }

    pub async fn healthz(&self) -> Result<serde_json::Value> {
        self.get("/healthz").await
    }

    pub async fn create_swap_intent(&self, req: &CreateSwapIntentRequest, idempotency_key: &str) -> Result<SwapIntent> {
        self.post("/swap-intents", idempotency_key, req).await
    }

    pub async fn update_swap_intent(&self, id: &str, req: &UpdateSwapIntentRequest, idempotency_key: &str) -> Result<SwapIntent> {
        self.patch(&format!("/swap-intents/{id}"), idempotency_key, req).await
    }

    pub async fn cancel_swap_intent(&self, id: &str, idempotency_key: &str) -> Result<SwapIntent> {
        self.post(&format!("/swap-intents/{id}/cancel"), idempotency_key, &serde_json::json!({})).await
    }

    pub async fn get_swap_intent(&self, id: &str) -> Result<SwapIntent> {
        self.get(&format!("/swap-intents/{id}")).await
    }

    pub async fn list_swap_intents(&self, actor_id: Option<&str>) -> Result<Vec<SwapIntent>> {
        match actor_id {
            Some(id) => self.get(&format!("/swap-intents?actor_id={id}")).await,
            None => self.get("/swap-intents").await,
        }
    }

    pub async fn run_matching(&self, req: &MatchingRunRequest, idempotency_key: &str) -> Result<MatchingRunResponse> {
        self.post("/marketplace/matching/runs", idempotency_key, req).await
    }

    pub async fn list_cycle_proposals(&self, actor_id: Option<&str>) -> Result<Vec<CycleProposal>> {
        match actor_id {
            Some(id) => self.get(&format!("/cycle-proposals?actor_id={id}")).await,
            None => self.get("/cycle-proposals").await,
        }
    }

    pub async fn get_cycle_proposal(&self, id: &str) -> Result<CycleProposal> {
        self.get(&format!("/cycle-proposals/{id}")).await
    }

    pub async fn accept_cycle_proposal(&self, id: &str, req: &AcceptProposalRequest, idempotency_key: &str) -> Result<Commit> {
        self.post(&format!("/cycle-proposals/{id}/accept"), idempotency_key, req).await
    }

    pub async fn decline_cycle_proposal(&self, id: &str, idempotency_key: &str) -> Result<serde_json::Value> {
        self.post(&format!("/cycle-proposals/{id}/decline"), idempotency_key, &serde_json::json!({})).await
    }

    pub async fn start_settlement(
        &self,
        cycle_id: &str,
        req: &StartSettlementRequest,
        idempotency_key: &str,
    ) -> Result<StartSettlementResponse> {
        self.post(&format!("/settlement/{cycle_id}/start"), idempotency_key, req).await
    }

    pub async fn confirm_deposit(
        &self,
        cycle_id: &str,
        req: &ConfirmDepositRequest,
        idempotency_key: &str,
    ) -> Result<SettlementTimeline> {
        self.post(&format!("/settlement/{cycle_id}/deposit-confirmed"), idempotency_key, req).await
    }

    pub async fn begin_execution(&self, cycle_id: &str, idempotency_key: &str) -> Result<SettlementTimeline> {
        self.post(&format!("/settlement/{cycle_id}/begin-execution"), idempotency_key, &serde_json::json!({})).await
    }

    pub async fn complete_settlement(&self, cycle_id: &str, idempotency_key: &str) -> Result<Receipt> {
        self.post(&format!("/settlement/{cycle_id}/complete"), idempotency_key, &serde_json::json!({})).await
    }

    pub async fn settlement_status(&self, cycle_id: &str) -> Result<SettlementTimeline> {
        self.get(&format!("/settlement/{cycle_id}/status")).await
    }

    pub async fn get_receipt(&self, cycle_id: &str) -> Result<Receipt> {
        self.get(&format!("/receipts/{cycle_id}")).await
    }

    pub async fn publish_custody_snapshot(&self, req: &PublishCustodySnapshotRequest, idempotency_key: &str) -> Result<CustodySnapshot> {
        self.post("/vault/custody/snapshots", idempotency_key, req).await
    }

    pub async fn list_custody_snapshots(&self, cursor: Option<&str>, limit: Option<usize>) -> Result<CustodySnapshotPage> {
        let mut path = "/vault/custody/snapshots".to_string();
        let mut params = Vec::new();
        if let Some(cursor) = cursor {
            params.push(format!("cursor={cursor}"));
        }
        if let Some(limit) = limit {
            params.push(format!("limit={limit}"));
        }
        if !params.is_empty() {
            path.push('?');
            path.push_str(&params.join("&"));
        }
        self.get(&path).await
    }

    pub async fn get_custody_snapshot(&self, id: &str) -> Result<CustodySnapshot> {
        self.get(&format!("/vault/custody/snapshots/{id}")).await
    }

    pub async fn get_inclusion_proof(&self, snapshot_id: &str, holding_id: &str) -> Result<InclusionProof> {
        self.get(&format!("/vault/custody/snapshots/{snapshot_id}/holdings/{holding_id}/proof")).await
    }
}

/// Response status is checked against this before falling back to the
/// generic decode path — kept as a free function since it is useful to
/// callers building their own retry policy on top of the client.
pub fn is_retryable(status: StatusCode) -> bool {
    status.is_server_error()
}
