//! REST adapter
//!
//! The store talks to the layer service only through [`LayerApi`], so tests and
//! embedders can substitute their own transport.

use async_trait::async_trait;
use http_body_util::{BodyExt, Full};
use hyper::body::Bytes;
use hyper_rustls::HttpsConnector;
use hyper_util::client::legacy::{Client, connect::HttpConnector};
use hyper_util::rt::TokioExecutor;
use serde::{Deserialize, Serialize, de::DeserializeOwned};

use crate::prelude::*;
use strata_types::layer::{
	CreateLayer, Layer, LayerListResponse, LayerPatch, LayerResponse, LayerUsersResponse, slugify,
};

#[async_trait]
pub trait LayerApi: Send + Sync {
	/// Layers visible to the credentials this adapter carries
	async fn list_layers(&self) -> ClResult<Vec<Layer>>;

	/// Layer and public member roster by domain name
	async fn layer_users(&self, domain: &str) -> ClResult<LayerUsersResponse>;

	async fn create_layer(&self, input: &CreateLayer) -> ClResult<Layer>;

	async fn update_layer(&self, id: &str, patch: &LayerPatch) -> ClResult<Layer>;

	async fn remove_layer(&self, id: &str) -> ClResult<Layer>;
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
	error: ErrorDetail,
}

#[derive(Debug, Deserialize)]
struct ErrorDetail {
	#[serde(default)]
	message: String,
}

/// Map a non-success response to the shared error taxonomy
fn status_error(status: hyper::StatusCode, body: &[u8]) -> Error {
	let message = serde_json::from_slice::<ErrorBody>(body)
		.map(|b| b.error.message)
		.unwrap_or_else(|_| String::from_utf8_lossy(body).into_owned());

	match status {
		hyper::StatusCode::NOT_FOUND => Error::NotFound,
		hyper::StatusCode::FORBIDDEN => Error::PermissionDenied,
		hyper::StatusCode::UNAUTHORIZED => Error::Unauthorized,
		hyper::StatusCode::BAD_REQUEST | hyper::StatusCode::UNPROCESSABLE_ENTITY => {
			Error::ValidationError(message)
		}
		_ => Error::NetworkError(format!("HTTP {}: {}", status, message)),
	}
}

type HttpClient = Client<HttpsConnector<HttpConnector>, Full<Bytes>>;

/// [`LayerApi`] over HTTP(S)
#[derive(Clone)]
pub struct HttpLayerApi {
	base_url: Box<str>,
	token: Option<Box<str>>,
	client: HttpClient,
}

impl HttpLayerApi {
	/// `base_url` without trailing slash, e.g. `http://127.0.0.1:8080`
	pub fn new(base_url: &str, token: Option<&str>) -> ClResult<Self> {
		let connector = hyper_rustls::HttpsConnectorBuilder::new()
			.with_native_roots()
			.map_err(|e| Error::Internal(format!("TLS roots: {}", e)))?
			.https_or_http()
			.enable_http1()
			.build();
		let client = Client::builder(TokioExecutor::new()).build(connector);

		Ok(Self {
			base_url: base_url.trim_end_matches('/').into(),
			token: token.map(Into::into),
			client,
		})
	}

	async fn request<Res: DeserializeOwned>(
		&self,
		method: hyper::Method,
		path: &str,
		body: Option<Vec<u8>>,
	) -> ClResult<Res> {
		let mut builder = hyper::Request::builder()
			.method(method.clone())
			.uri(format!("{}{}", self.base_url, path))
			.header("Accept", "application/json");
		if let Some(token) = &self.token {
			builder = builder.header("Authorization", format!("Bearer {}", token));
		}
		if body.is_some() {
			builder = builder.header("Content-Type", "application/json");
		}
		let request = builder
			.body(Full::new(Bytes::from(body.unwrap_or_default())))
			.map_err(|e| Error::Internal(format!("Request build error: {}", e)))?;

		let response = self.client.request(request).await.map_err(|e| {
			warn!("{} {} failed: {}", method, path, e);
			Error::NetworkError(e.to_string())
		})?;
		let status = response.status();
		let bytes = response
			.into_body()
			.collect()
			.await
			.map_err(|e| Error::NetworkError(e.to_string()))?
			.to_bytes();

		if !status.is_success() {
			debug!("{} {} -> {}", method, path, status);
			return Err(status_error(status, &bytes));
		}
		serde_json::from_slice(&bytes)
			.inspect_err(|err| error!("Failed to deserialize response: {}", err))
			.map_err(|_| Error::Parse)
	}

	async fn send_json<Req: Serialize + Sync, Res: DeserializeOwned>(
		&self,
		method: hyper::Method,
		path: &str,
		body: &Req,
	) -> ClResult<Res> {
		let body = serde_json::to_vec(body)?;
		self.request(method, path, Some(body)).await
	}
}

#[async_trait]
impl LayerApi for HttpLayerApi {
	async fn list_layers(&self) -> ClResult<Vec<Layer>> {
		let res: LayerListResponse = self.request(hyper::Method::GET, "/layers", None).await?;
		Ok(res.layers)
	}

	async fn layer_users(&self, domain: &str) -> ClResult<LayerUsersResponse> {
		// slugs are path-safe and resolve to the same layer
		let path = format!("/layers/{}", slugify(domain));
		self.request(hyper::Method::GET, &path, None).await
	}

	async fn create_layer(&self, input: &CreateLayer) -> ClResult<Layer> {
		let res: LayerResponse = self.send_json(hyper::Method::POST, "/layers/new", input).await?;
		Ok(res.layer)
	}

	async fn update_layer(&self, id: &str, patch: &LayerPatch) -> ClResult<Layer> {
		let path = format!("/layers/{}", id);
		let res: LayerResponse = self.send_json(hyper::Method::PUT, &path, patch).await?;
		Ok(res.layer)
	}

	async fn remove_layer(&self, id: &str) -> ClResult<Layer> {
		let path = format!("/layers/{}", id);
		let res: LayerResponse = self.request(hyper::Method::DELETE, &path, None).await?;
		Ok(res.layer)
	}
}


// vim: ts=4
