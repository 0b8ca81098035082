//! EC2 Query API client implementation.
//!
//! Every call is a SigV4-signed form `POST` to the regional endpoint.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::{AUTHORIZATION, CONTENT_TYPE};
use reqwest::{Client, StatusCode};
use serde::de::DeserializeOwned;
use tracing::{debug, info, warn};
use url::Url;

use super::models::{
    CreateKeyPairResponse, DeleteKeyPairResponse, Ec2Instance, ErrorResponse,
    RunInstancesResponse, TerminateInstancesResponse, API_VERSION,
};
use super::sigv4::{self, FORM_CONTENT_TYPE};
use crate::providers::traits::{
    ComputeProvider, Instance, InstanceStatus, KeyPair, ProviderError, RunInstanceRequest,
};

/// Default timeout for API requests.
const DEFAULT_TIMEOUT_SECS: u64 = 30;

/// Service name used in the SigV4 credential scope.
const SERVICE: &str = "ec2";

/// Static AWS credentials.
#[derive(Clone)]
pub struct AwsCredentials {
    /// Access key ID.
    pub access_key_id: String,
    /// Secret access key.
    pub secret_access_key: String,
    /// Session token for temporary credentials.
    pub session_token: Option<String>,
}

impl AwsCredentials {
    /// Create credentials from an access key pair.
    pub fn new(access_key_id: impl Into<String>, secret_access_key: impl Into<String>) -> Self {
        Self {
            access_key_id: access_key_id.into(),
            secret_access_key: secret_access_key.into(),
            session_token: None,
        }
    }

    /// Attach a session token.
    #[must_use]
    pub fn with_session_token(mut self, token: impl Into<String>) -> Self {
        self.session_token = Some(token.into());
        self
    }
}

impl std::fmt::Debug for AwsCredentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AwsCredentials")
            .field("access_key_id", &self.access_key_id)
            .field("secret_access_key", &"<redacted>")
            .field("session_token", &self.session_token.as_ref().map(|_| "<redacted>"))
            .finish()
    }
}

/// AWS EC2 compute provider.
#[derive(Clone)]
pub struct Ec2 {
    /// HTTP client.
    client: Client,
    /// Signing credentials.
    credentials: AwsCredentials,
    /// AWS region.
    region: String,
    /// Query API endpoint.
    endpoint: Url,
}

impl Ec2 {
    /// Create a new EC2 provider for the regional endpoint.
    ///
    /// # Arguments
    /// * `credentials` - Signing credentials
    /// * `region` - AWS region (e.g., "eu-west-1")
    ///
    /// # Errors
    /// Returns error if HTTP client cannot be created.
    pub fn new(
        credentials: AwsCredentials,
        region: impl Into<String>,
    ) -> Result<Self, ProviderError> {
        let region = region.into();
        let endpoint = Url::parse(&format!("https://ec2.{region}.amazonaws.com/"))
            .map_err(|e| ProviderError::Config(format!("invalid region '{region}': {e}")))?;

        let client = Client::builder()
            .timeout(Duration::from_secs(DEFAULT_TIMEOUT_SECS))
            .build()
            .map_err(ProviderError::Http)?;

        Ok(Self {
            client,
            credentials,
            region,
            endpoint,
        })
    }

    /// Send requests to a different endpoint, e.g. `LocalStack`.
    ///
    /// # Errors
    /// Returns error if the endpoint is not an absolute URL with a host.
    pub fn with_endpoint(mut self, endpoint: &str) -> Result<Self, ProviderError> {
        let url = Url::parse(endpoint)
            .map_err(|e| ProviderError::Config(format!("invalid endpoint '{endpoint}': {e}")))?;
        if url.host_str().is_none() {
            return Err(ProviderError::Config(format!(
                "endpoint '{endpoint}' has no host"
            )));
        }
        self.endpoint = url;
        Ok(self)
    }

    /// The region requests are signed for.
    #[must_use]
    pub fn region(&self) -> &str {
        &self.region
    }

    /// The endpoint requests are sent to.
    #[must_use]
    pub fn endpoint(&self) -> &Url {
        &self.endpoint
    }

    /// `Host` header value, as reqwest will send it.
    fn host(&self) -> String {
        let host = self.endpoint.host_str().unwrap_or_default();
        match self.endpoint.port() {
            Some(port) => format!("{host}:{port}"),
            None => host.to_string(),
        }
    }

    /// Sign and execute a Query API action.
    async fn call<T: DeserializeOwned>(
        &self,
        action: &str,
        params: &[(&str, &str)],
    ) -> Result<T, ProviderError> {
        let body = url::form_urlencoded::Serializer::new(String::new())
            .append_pair("Action", action)
            .append_pair("Version", API_VERSION)
            .extend_pairs(params)
            .finish();

        debug!(action = %action, endpoint = %self.endpoint, "EC2 request");

        let signed = sigv4::sign_post(
            &self.credentials,
            &self.region,
            SERVICE,
            &self.host(),
            &body,
            chrono::Utc::now(),
        )?;

        let mut request = self
            .client
            .post(self.endpoint.clone())
            .header(CONTENT_TYPE, FORM_CONTENT_TYPE)
            .header("X-Amz-Date", &signed.amz_date)
            .header(AUTHORIZATION, &signed.authorization);

        if let Some(token) = &signed.security_token {
            request = request.header("X-Amz-Security-Token", token);
        }

        let response = request.body(body).send().await?;
        Self::handle_response(action, response).await
    }

    /// Handle API response.
    async fn handle_response<T: DeserializeOwned>(
        action: &str,
        response: reqwest::Response,
    ) -> Result<T, ProviderError> {
        let status = response.status();
        let text = response.text().await?;

        if status.is_success() {
            quick_xml::de::from_str(&text).map_err(|e| {
                warn!(action = %action, error = %e, body = %text, "Failed to parse response");
                ProviderError::Xml(e)
            })
        } else {
            Err(Self::api_error(status, &text))
        }
    }

    /// Map an error document to a [`ProviderError`].
    fn api_error(status: StatusCode, body: &str) -> ProviderError {
        let (code, message, request_id) = match quick_xml::de::from_str::<ErrorResponse>(body) {
            Ok(resp) => {
                let (code, message) = resp
                    .errors
                    .errors
                    .into_iter()
                    .next()
                    .map_or_else(|| (String::new(), body.to_string()), |e| (e.code, e.message));
                (code, message, resp.request_id)
            }
            Err(_) => (String::new(), body.to_string(), None),
        };

        if status == StatusCode::UNAUTHORIZED || status == StatusCode::FORBIDDEN {
            ProviderError::Auth(format!("{code}: {message}"))
        } else if code.ends_with(".NotFound") {
            ProviderError::NotFound(message)
        } else {
            ProviderError::Api {
                status: status.as_u16(),
                code,
                message,
                request_id,
            }
        }
    }

    /// Convert EC2 instance to our type.
    fn to_instance(ec2: &Ec2Instance) -> Instance {
        let status = match ec2.state.name.as_str() {
            "pending" => InstanceStatus::Pending,
            "running" => InstanceStatus::Running,
            "stopped" | "stopping" => InstanceStatus::Stopped,
            "shutting-down" => InstanceStatus::Terminating,
            "terminated" => InstanceStatus::Terminated,
            _ => InstanceStatus::Unknown,
        };

        let non_empty = |s: &Option<String>| s.clone().filter(|v| !v.is_empty());

        Instance {
            id: ec2.instance_id.clone(),
            status,
            instance_type: ec2.instance_type.clone(),
            image: ec2.image_id.clone(),
            key_name: non_empty(&ec2.key_name),
            zone: ec2
                .placement
                .as_ref()
                .and_then(|p| non_empty(&p.availability_zone)),
            public_ip: non_empty(&ec2.public_ip_address),
            private_ip: non_empty(&ec2.private_ip_address),
            launched_at: ec2
                .launch_time
                .as_ref()
                .and_then(|s| chrono::DateTime::parse_from_rfc3339(s).ok())
                .map(|dt| dt.with_timezone(&chrono::Utc)),
        }
    }
}

#[async_trait]
impl ComputeProvider for Ec2 {
    async fn create_key_pair(&self, name: &str) -> Result<KeyPair, ProviderError> {
        info!(key_name = %name, "Creating key pair");

        let resp: CreateKeyPairResponse =
            self.call("CreateKeyPair", &[("KeyName", name)]).await?;

        info!(key_name = %resp.key_name, key_pair_id = ?resp.key_pair_id, "Key pair created");

        Ok(KeyPair {
            name: resp.key_name,
            id: resp.key_pair_id,
            fingerprint: resp.key_fingerprint,
            private_key: resp.key_material,
        })
    }

    async fn run_instance(&self, req: RunInstanceRequest) -> Result<Instance, ProviderError> {
        info!(
            image_id = %req.image_id,
            instance_type = %req.instance_type,
            key_name = %req.key_name,
            region = %self.region,
            "Creating EC2 instance"
        );

        let resp: RunInstancesResponse = self
            .call(
                "RunInstances",
                &[
                    ("ImageId", req.image_id.as_str()),
                    ("InstanceType", req.instance_type.as_str()),
                    ("MinCount", "1"),
                    ("MaxCount", "1"),
                    ("KeyName", req.key_name.as_str()),
                    ("TagSpecification.1.ResourceType", "instance"),
                    ("TagSpecification.1.Tag.1.Key", "Name"),
                    ("TagSpecification.1.Tag.1.Value", req.key_name.as_str()),
                ],
            )
            .await?;

        let ec2 = resp
            .instances
            .items
            .first()
            .ok_or_else(|| ProviderError::Api {
                status: 200,
                code: "EmptyReservation".to_string(),
                message: "No instance returned from creation".to_string(),
                request_id: None,
            })?;

        info!(instance_id = %ec2.instance_id, state = %ec2.state.name, "EC2 instance created");

        Ok(Self::to_instance(ec2))
    }

    async fn terminate_instance(&self, id: &str) -> Result<(), ProviderError> {
        info!(instance_id = %id, "Terminating instance");

        let resp: TerminateInstancesResponse = self
            .call("TerminateInstances", &[("InstanceId.1", id)])
            .await?;

        for change in &resp.instances.items {
            debug!(
                instance_id = %change.instance_id,
                previous = %change.previous_state.name,
                current = %change.current_state.name,
                "Instance state change"
            );
        }

        info!(instance_id = %id, "Instance termination initiated");
        Ok(())
    }

    async fn delete_key_pair(&self, name: &str) -> Result<(), ProviderError> {
        info!(key_name = %name, "Deleting key pair");

        let resp: DeleteKeyPairResponse =
            self.call("DeleteKeyPair", &[("KeyName", name)]).await?;

        if !resp.ok {
            return Err(ProviderError::Api {
                status: 200,
                code: "DeleteKeyPair".to_string(),
                message: format!("EC2 refused to delete key pair {name}"),
                request_id: None,
            });
        }

        info!(key_name = %name, "Key pair deleted");
        Ok(())
    }
}
