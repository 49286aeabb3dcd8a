use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, Method, RequestBuilder, Response, StatusCode, Url};
use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::debug;

use super::{AidGateway, AllocateRequest, GatewayError, Page, PageRequest, ReallocateRequest};
use crate::config::UpstreamConfig;
use crate::domain::{
    Allocation, Beneficiary, BeneficiaryId, Donation, DonationRequest, Housing, HousingId,
    ProductType, ProductTypeId, Space, SpaceId, StockLocation, StockRecord, Volunteer,
};
use crate::session::SessionContext;

/// [`AidGateway`] over the upstream JSON REST API.
///
/// Ids are appended as single percent-encoded path segments, so an id can
/// never address a different upstream route.
#[derive(Debug, Clone)]
pub struct RestAidGateway {
    client: Client,
    base_url: Url,
    token: Option<String>,
}

impl RestAidGateway {
    pub fn new(config: &UpstreamConfig) -> Result<Self, GatewayError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|err| GatewayError::Transport(err.to_string()))?;
        let base_url = Url::parse(config.base_url.trim_end_matches('/'))
            .ok()
            .filter(|url| !url.cannot_be_a_base())
            .ok_or_else(|| {
                GatewayError::Transport(format!("invalid upstream url '{}'", config.base_url))
            })?;

        Ok(Self {
            client,
            base_url,
            token: None,
        })
    }

    /// Copy of this gateway that authenticates as the signed-in operator.
    pub fn with_session(&self, session: &SessionContext) -> Self {
        Self {
            client: self.client.clone(),
            base_url: self.base_url.clone(),
            token: Some(session.token().to_string()),
        }
    }

    pub fn base_url(&self) -> &str {
        self.base_url.as_str()
    }

    /// Base URL extended with `segments`, each encoded as one path segment.
    fn url(&self, segments: &[&str]) -> Result<Url, GatewayError> {
        if let Some(segment) = segments
            .iter()
            .find(|segment| matches!(**segment, "" | "." | ".."))
        {
            return Err(GatewayError::not_found(format!(
                "{} '{segment}'",
                segments.first().copied().unwrap_or_default()
            )));
        }

        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|_| GatewayError::Transport("upstream url cannot take a path".to_string()))?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    fn request(&self, method: Method, url: Url) -> RequestBuilder {
        debug!(%method, %url, "upstream request");
        let builder = self
            .client
            .request(method, url)
            .header(reqwest::header::ACCEPT, "application/json");
        match &self.token {
            Some(token) => builder.bearer_auth(token),
            None => builder,
        }
    }

    async fn get_json<T: DeserializeOwned>(
        &self,
        segments: &[&str],
        query: &[(&str, String)],
    ) -> Result<T, GatewayError> {
        let url = self.url(segments)?;
        let path = url.path().to_string();
        let response = self
            .request(Method::GET, url)
            .query(query)
            .send()
            .await
            .map_err(transport_error)?;
        decode(&path, response).await
    }

    async fn post_json<B: Serialize + ?Sized, T: DeserializeOwned>(
        &self,
        segments: &[&str],
        body: &B,
    ) -> Result<T, GatewayError> {
        let url = self.url(segments)?;
        let path = url.path().to_string();
        let response = self
            .request(Method::POST, url)
            .json(body)
            .send()
            .await
            .map_err(transport_error)?;
        decode(&path, response).await
    }

    async fn delete(&self, segments: &[&str]) -> Result<(), GatewayError> {
        let url = self.url(segments)?;
        let path = url.path().to_string();
        let response = self
            .request(Method::DELETE, url)
            .send()
            .await
            .map_err(transport_error)?;
        check_status(&path, response).await.map(|_| ())
    }
}

fn page_query(page: PageRequest) -> Vec<(&'static str, String)> {
    let page = page.normalized();
    vec![
        ("offset", page.offset.to_string()),
        ("limit", page.limit.to_string()),
    ]
}

fn transport_error(err: reqwest::Error) -> GatewayError {
    GatewayError::Transport(err.to_string())
}

async fn check_status(path: &str, response: Response) -> Result<Response, GatewayError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let body = response.text().await.unwrap_or_default();
    let message = error_message(&body).unwrap_or_else(|| {
        status
            .canonical_reason()
            .unwrap_or("unknown error")
            .to_string()
    });

    Err(match status {
        StatusCode::NOT_FOUND => GatewayError::not_found(path),
        status if status.is_client_error() => GatewayError::Rejected {
            status: status.as_u16(),
            message,
        },
        status => GatewayError::Upstream {
            status: status.as_u16(),
            message,
        },
    })
}

async fn decode<T: DeserializeOwned>(path: &str, response: Response) -> Result<T, GatewayError> {
    let response = check_status(path, response).await?;
    let bytes = response.bytes().await.map_err(transport_error)?;
    serde_json::from_slice(&bytes).map_err(|err| GatewayError::Decode(format!("{path}: {err}")))
}

fn error_message(body: &str) -> Option<String> {
    let value: serde_json::Value = serde_json::from_str(body).ok()?;
    ["error", "message"]
        .iter()
        .find_map(|key| value.get(*key).and_then(|v| v.as_str()))
        .map(str::to_string)
}

#[async_trait]
impl AidGateway for RestAidGateway {
    async fn list_housings(&self, page: PageRequest) -> Result<Page<Housing>, GatewayError> {
        self.get_json(&["housings"], &page_query(page)).await
    }

    async fn housing(&self, id: &HousingId) -> Result<Housing, GatewayError> {
        self.get_json(&["housings", id.as_str()], &[]).await
    }

    async fn delete_housing(&self, id: &HousingId) -> Result<(), GatewayError> {
        self.delete(&["housings", id.as_str()]).await
    }

    async fn list_spaces(&self, housing_id: &HousingId) -> Result<Vec<Space>, GatewayError> {
        self.get_json(&["housings", housing_id.as_str(), "rooms"], &[])
            .await
    }

    async fn space(&self, id: &SpaceId) -> Result<Space, GatewayError> {
        self.get_json(&["rooms", id.as_str()], &[]).await
    }

    async fn delete_space(&self, id: &SpaceId) -> Result<(), GatewayError> {
        self.delete(&["rooms", id.as_str()]).await
    }

    async fn list_beneficiaries(
        &self,
        page: PageRequest,
    ) -> Result<Page<Beneficiary>, GatewayError> {
        self.get_json(&["beneficiaries"], &page_query(page)).await
    }

    async fn beneficiary(&self, id: &BeneficiaryId) -> Result<Beneficiary, GatewayError> {
        self.get_json(&["beneficiaries", id.as_str()], &[]).await
    }

    async fn allocate(
        &self,
        id: &BeneficiaryId,
        request: AllocateRequest,
    ) -> Result<Beneficiary, GatewayError> {
        self.post_json(&["beneficiaries", id.as_str(), "allocate"], &request)
            .await
    }

    async fn reallocate(
        &self,
        id: &BeneficiaryId,
        request: ReallocateRequest,
    ) -> Result<Beneficiary, GatewayError> {
        self.post_json(&["beneficiaries", id.as_str(), "reallocate"], &request)
            .await
    }

    async fn allocations(&self, id: &BeneficiaryId) -> Result<Vec<Allocation>, GatewayError> {
        let mut history: Vec<Allocation> = self
            .get_json(&["beneficiaries", id.as_str(), "allocations"], &[])
            .await?;
        history.sort_by_key(|allocation| allocation.created_at());
        Ok(history)
    }

    async fn donate(
        &self,
        id: &BeneficiaryId,
        request: DonationRequest,
    ) -> Result<Donation, GatewayError> {
        self.post_json(&["beneficiaries", id.as_str()], &request)
            .await
    }

    async fn list_volunteers(&self, page: PageRequest) -> Result<Page<Volunteer>, GatewayError> {
        self.get_json(&["volunteers"], &page_query(page)).await
    }

    async fn list_product_types(
        &self,
        page: PageRequest,
    ) -> Result<Page<ProductType>, GatewayError> {
        self.get_json(&["product-types"], &page_query(page)).await
    }

    async fn stock_at(&self, location: &StockLocation) -> Result<Vec<StockRecord>, GatewayError> {
        let query = [
            ("location_type", location.kind_label().to_string()),
            ("location_id", location.id().to_string()),
        ];
        self.get_json(&["stock"], &query).await
    }

    async fn product_stock(
        &self,
        product_type_id: &ProductTypeId,
    ) -> Result<Vec<StockRecord>, GatewayError> {
        self.get_json(&["product-types", product_type_id.as_str(), "stock"], &[])
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_message_prefers_error_then_message_keys() {
        assert_eq!(
            error_message(r#"{"error":"room is full"}"#).as_deref(),
            Some("room is full")
        );
        assert_eq!(
            error_message(r#"{"message":"bad input"}"#).as_deref(),
            Some("bad input")
        );
        assert_eq!(error_message("<html>"), None);
    }

    #[test]
    fn base_url_drops_trailing_slash() {
        let gateway = RestAidGateway::new(&UpstreamConfig {
            base_url: "http://127.0.0.1:9000/api/".to_string(),
            timeout_secs: 1,
        })
        .expect("client builds");
        assert_eq!(gateway.base_url(), "http://127.0.0.1:9000/api");
    }
}
