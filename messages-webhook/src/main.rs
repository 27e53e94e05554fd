//! Messages webhook Lambda - bridges Bot Framework conversations with the
//! sensor API.
//!
//! Receives inbound activity events from the transport, authenticates against
//! the identity provider, routes the message to a reply, and posts the reply
//! back to the conversation. A rejected send gets one retry with a forced
//! token refresh; the transport is always acknowledged with a 200 envelope.

use chrono::Utc;
use lambda_runtime::{service_fn, Error as LambdaError, LambdaEvent};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use shared::{
    Activity, Authenticator, Config, Decision, DynamoTokenStore, ReplyClient, RetryEnvelope,
    RetryPolicy, Router, SecretResolver, SensorClient, TokenStore,
};
use std::sync::Arc;
use std::time::Duration;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

/// Outbound HTTP timeout; the transport re-delivers on a hung webhook.
const HTTP_TIMEOUT: Duration = Duration::from_secs(10);

/// API Gateway proxy request (simplified).
///
/// `expired` marks an event that is already the forced-refresh retry.
#[derive(Debug, Deserialize)]
struct ApiGatewayRequest {
    body: Option<String>,
    #[serde(default)]
    expired: bool,
}

/// API Gateway proxy response
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct ApiGatewayResponse {
    status_code: u16,
    body: String,
}

/// Acknowledgment body echoed back to the transport.
#[derive(Debug, Serialize)]
struct AckBody<'a> {
    message: &'static str,
    input: &'a Value,
}

/// Application state
struct AppState {
    authenticator: Authenticator,
    router: Router,
    replies: ReplyClient,
    retry_policy: RetryPolicy,
}

impl AppState {
    async fn new() -> Result<Self, LambdaError> {
        let config = Config::from_env()?;

        let aws_config = aws_config::defaults(aws_config::BehaviorVersion::latest())
            .region(aws_config::Region::new(config.aws_region.clone()))
            .load()
            .await;

        let http = reqwest::Client::builder().timeout(HTTP_TIMEOUT).build()?;

        let resolver = SecretResolver::new(aws_sdk_kms::Client::new(&aws_config));

        let store = config.token_table.as_ref().map(|table| {
            Arc::new(DynamoTokenStore::new(
                aws_sdk_dynamodb::Client::new(&aws_config),
                table.clone(),
            )) as Arc<dyn TokenStore>
        });

        let authenticator = Authenticator::new(
            resolver,
            store,
            http.clone(),
            config.client_id_cipher,
            config.client_secret_cipher,
        );

        let router = Router::new(
            SensorClient::new(http.clone(), config.sensors_api),
            config.sensor_targets,
            config.default_reply,
        );

        Ok(Self {
            authenticator,
            router,
            replies: ReplyClient::new(http),
            retry_policy: RetryPolicy::default(),
        })
    }
}

async fn handler(state: Arc<AppState>, event: LambdaEvent<Value>) -> Result<Value, LambdaError> {
    let (payload, _context) = event.into_parts();

    // Internal failures are logged, never surfaced: an erroring webhook
    // makes the transport re-deliver the event.
    if let Err(err) = process(&state, &payload).await {
        error!(error = %err, "webhook processing failed");
    }

    let ack = ApiGatewayResponse {
        status_code: 200,
        body: serde_json::to_string(&AckBody {
            message: "ok",
            input: &payload,
        })?,
    };

    Ok(serde_json::to_value(ack)?)
}

/// Parse the transport event and run the delivery pipeline.
async fn process(state: &AppState, payload: &Value) -> shared::Result<()> {
    let request: ApiGatewayRequest = serde_json::from_value(payload.clone())?;

    let body = request
        .body
        .ok_or_else(|| shared::Error::InvalidEvent("missing request body".to_string()))?;

    let activity: Activity = serde_json::from_str(&body)?;

    info!(
        conversation = %activity.conversation.id,
        expired = request.expired,
        "handling inbound activity"
    );

    deliver(
        state,
        RetryEnvelope {
            activity,
            expired: request.expired,
        },
    )
    .await
}

/// Authenticate, route, send, and retry once on a rejected send.
///
/// The first attempt forces a refresh only when the event itself is already
/// flagged; the retry always does. Retried attempts run with `expired` set,
/// so the policy can never schedule a second retry.
async fn deliver(state: &AppState, envelope: RetryEnvelope) -> shared::Result<()> {
    let RetryEnvelope {
        activity,
        mut expired,
    } = envelope;
    let mut attempt = 0;

    loop {
        let token = state.authenticator.authenticate(expired).await?;
        let text = state
            .router
            .route(&activity, Utc::now())
            .await?
            .unwrap_or_default();
        let reply = activity.reply(text);

        let status = state
            .replies
            .send(&activity.service_url, &token, &reply)
            .await?;

        match state.retry_policy.evaluate(attempt, expired, status) {
            Decision::Done => {
                match status {
                    Some(status) if status.is_success() => {
                        info!(%status, conversation = %activity.conversation.id, "reply delivered")
                    }
                    Some(status) => {
                        warn!(%status, conversation = %activity.conversation.id, "reply rejected, giving up")
                    }
                    None => info!("reply suppressed"),
                }
                return Ok(());
            }
            Decision::Retry => {
                warn!(status = ?status, "reply rejected, retrying with a fresh token");
                tokio::time::sleep(state.retry_policy.delay(attempt)).await;
                attempt += 1;
                expired = true;
            }
        }
    }
}

#[tokio::main]
async fn main() -> Result<(), LambdaError> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .json()
        .init();

    let state = Arc::new(AppState::new().await?);

    lambda_runtime::run(service_fn(move |event| {
        let state = Arc::clone(&state);
        async move { handler(state, event).await }
    }))
    .await
}
