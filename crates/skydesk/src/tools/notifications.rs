//! Webhook notifications for new imagery over an area.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::sync::Arc;
use uplink::schema_helpers::optional_u32_schema;
use uplink::Tool;

use super::orders::PageArgs;
use super::validate::{self, ArgError, Validate};
use crate::client::{ImageryClient, UpstreamError};

#[derive(Debug, Deserialize, JsonSchema)]
pub struct CreateNotificationArgs {
    /// Area of interest as WKT
    pub aoi: String,

    /// http(s) URL the provider POSTs to when matching imagery appears
    pub webhook_url: String,

    /// Finest ground sample distance in centimetres
    #[schemars(schema_with = "optional_u32_schema")]
    #[serde(default)]
    pub gsd_min: Option<u32>,

    /// Coarsest ground sample distance in centimetres
    #[schemars(schema_with = "optional_u32_schema")]
    #[serde(default)]
    pub gsd_max: Option<u32>,

    /// Only notify for this product type
    pub product_type: Option<String>,
}

impl Validate for CreateNotificationArgs {
    fn validate(&self) -> Result<(), ArgError> {
        validate::wkt("aoi", &self.aoi)?;
        validate::webhook_url(&self.webhook_url)?;
        if let (Some(min), Some(max)) = (self.gsd_min, self.gsd_max) {
            if min > max {
                return Err(ArgError::new("gsd_min must not exceed gsd_max"));
            }
        }
        Ok(())
    }
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct NotificationRequest<'a> {
    aoi: &'a str,
    webhook_url: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    gsd_min: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    gsd_max: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    product_type: Option<&'a str>,
}

pub fn create_notification_tool() -> Tool {
    Tool::new(
        "create_notification",
        "Subscribe a webhook to new imagery captured over an area.",
    )
    .with_input_schema::<CreateNotificationArgs>()
}

pub async fn create_notification(
    client: Arc<ImageryClient>,
    args: CreateNotificationArgs,
) -> Result<Value, UpstreamError> {
    let body = NotificationRequest {
        aoi: args.aoi.trim(),
        webhook_url: args.webhook_url.trim(),
        gsd_min: args.gsd_min,
        gsd_max: args.gsd_max,
        product_type: args.product_type.as_deref(),
    };
    client.post("/notifications", &body).await
}

pub fn list_notifications_tool() -> Tool {
    Tool::new("list_notifications", "List active webhook notifications.")
        .with_input_schema::<PageArgs>()
        .read_only()
}

pub async fn list_notifications(
    client: Arc<ImageryClient>,
    args: PageArgs,
) -> Result<Value, UpstreamError> {
    client.get("/notifications", &args.query()).await
}

#[derive(Debug, Deserialize, JsonSchema)]
pub struct DeleteNotificationArgs {
    /// Notification id as returned by create_notification
    pub notification_id: String,
}

impl Validate for DeleteNotificationArgs {
    fn validate(&self) -> Result<(), ArgError> {
        validate::resource_id("notification_id", &self.notification_id)
    }
}

pub fn delete_notification_tool() -> Tool {
    Tool::new("delete_notification", "Remove a webhook notification.")
        .with_input_schema::<DeleteNotificationArgs>()
        .destructive()
}

/// The provider answers DELETE with an empty body; report the id instead.
pub async fn delete_notification(
    client: Arc<ImageryClient>,
    args: DeleteNotificationArgs,
) -> Result<Value, UpstreamError> {
    let response = client
        .delete(&format!("/notifications/{}", args.notification_id))
        .await?;
    if response.is_null() {
        return Ok(json!({ "id": args.notification_id, "deleted": true }));
    }
    Ok(response)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tools::parse_args;

    #[test]
    fn test_webhook_must_be_http() {
        let args = json!({
            "aoi": "POLYGON((0 0, 1 0, 1 1, 0 0))",
            "webhook_url": "file:///etc/passwd",
        });
        let err = parse_args::<CreateNotificationArgs>(args).unwrap_err();
        assert!(err.0.contains("http or https"));
    }

    #[test]
    fn test_gsd_range() {
        let args = json!({
            "aoi": "POLYGON((0 0, 1 0, 1 1, 0 0))",
            "webhook_url": "https://hooks.example.com/x",
            "gsd_min": 100,
            "gsd_max": 50,
        });
        assert!(parse_args::<CreateNotificationArgs>(args).is_err());
    }

    #[test]
    fn test_schema_publishes_required_fields() {
        let tool = create_notification_tool();
        let required = tool.input_schema["required"].as_array().unwrap();
        assert!(required.contains(&json!("aoi")));
        assert!(required.contains(&json!("webhook_url")));
        assert!(!required.contains(&json!("gsd_min")));
        assert!(tool.input_schema["properties"]["gsd_min"].get("format").is_none());
    }
}
