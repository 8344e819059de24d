//! Archive and tasking orders.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::sync::Arc;
use uplink::schema_helpers::optional_u32_schema;
use uplink::Tool;

use super::validate::{self, ArgError, Validate};
use crate::client::{ImageryClient, UpstreamError};

/// An order is either for an existing archive image (`archive_id`) or for a
/// new capture over a window (`window_start` and `window_end`).
#[derive(Debug, Deserialize, JsonSchema)]
pub struct CreateOrderArgs {
    /// Area of interest as WKT
    pub aoi: String,

    /// Archive image to purchase. Omit for a tasking order.
    pub archive_id: Option<String>,

    /// Tasking window start (RFC 3339)
    pub window_start: Option<String>,

    /// Tasking window end (RFC 3339)
    pub window_end: Option<String>,

    /// Product type for tasking orders, e.g. DAY
    pub product_type: Option<String>,

    /// Resolution class for tasking orders, e.g. HIGH
    pub resolution: Option<String>,

    /// Free-form label shown in the order list
    pub label: Option<String>,
}

impl Validate for CreateOrderArgs {
    fn validate(&self) -> Result<(), ArgError> {
        validate::wkt("aoi", &self.aoi)?;
        match (&self.archive_id, &self.window_start, &self.window_end) {
            (Some(id), None, None) => validate::resource_id("archive_id", id),
            (None, Some(start), Some(end)) => {
                validate::window("window_start", start, "window_end", end)?;
                match (&self.product_type, &self.resolution) {
                    (Some(p), Some(r)) => {
                        validate::required("product_type", p)?;
                        validate::required("resolution", r)
                    }
                    _ => Err(ArgError::new(
                        "tasking orders need product_type and resolution",
                    )),
                }
            }
            (Some(_), _, _) => Err(ArgError::new(
                "archive_id cannot be combined with a tasking window",
            )),
            (None, _, _) => Err(ArgError::new(
                "give either archive_id, or both window_start and window_end",
            )),
        }
    }
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct OrderRequest<'a> {
    aoi: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    archive_id: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    window_start: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    window_end: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    product_type: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    resolution: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    label: Option<&'a str>,
}

pub fn create_order_tool() -> Tool {
    Tool::new(
        "create_order",
        "Place an imagery order. Pass archive_id to buy an existing image, or a \
         window plus product_type and resolution to task a new capture. \
         Orders are billed; confirm with the user first.",
    )
    .with_input_schema::<CreateOrderArgs>()
    .destructive()
}

pub async fn create_order(
    client: Arc<ImageryClient>,
    args: CreateOrderArgs,
) -> Result<Value, UpstreamError> {
    let body = OrderRequest {
        aoi: args.aoi.trim(),
        archive_id: args.archive_id.as_deref(),
        window_start: args.window_start.as_deref(),
        window_end: args.window_end.as_deref(),
        product_type: args.product_type.as_deref(),
        resolution: args.resolution.as_deref(),
        label: args.label.as_deref(),
    };
    tracing::info!(archive = body.archive_id.is_some(), "Placing order");
    client.post("/orders", &body).await
}

/// Paging shared by the list tools.
#[derive(Debug, Default, Deserialize, JsonSchema)]
pub struct PageArgs {
    /// Zero-based page number. Default: 0
    #[schemars(schema_with = "optional_u32_schema")]
    #[serde(default)]
    pub page_number: Option<u32>,

    /// Items per page, 1-100. Default: 25
    #[schemars(schema_with = "optional_u32_schema")]
    #[serde(default)]
    pub page_size: Option<u32>,
}

impl PageArgs {
    pub fn query(&self) -> Vec<(&'static str, String)> {
        vec![
            ("pageNumber", self.page_number.unwrap_or(0).to_string()),
            (
                "pageSize",
                self.page_size.unwrap_or(validate::DEFAULT_PAGE_SIZE).to_string(),
            ),
        ]
    }
}

impl Validate for PageArgs {
    fn validate(&self) -> Result<(), ArgError> {
        validate::page_size(self.page_size).map(|_| ())
    }
}

pub fn list_orders_tool() -> Tool {
    Tool::new("list_orders", "List your orders, newest first, one page at a time.")
        .with_input_schema::<PageArgs>()
        .read_only()
}

pub async fn list_orders(client: Arc<ImageryClient>, args: PageArgs) -> Result<Value, UpstreamError> {
    client.get("/orders", &args.query()).await
}

#[derive(Debug, Deserialize, JsonSchema)]
pub struct GetOrderArgs {
    /// Order id as returned by create_order or list_orders
    pub order_id: String,
}

impl Validate for GetOrderArgs {
    fn validate(&self) -> Result<(), ArgError> {
        validate::resource_id("order_id", &self.order_id)
    }
}

pub fn get_order_tool() -> Tool {
    Tool::new("get_order", "Fetch one order, including its status and delivery details.")
        .with_input_schema::<GetOrderArgs>()
        .read_only()
}

pub async fn get_order(client: Arc<ImageryClient>, args: GetOrderArgs) -> Result<Value, UpstreamError> {
    client.get(&format!("/orders/{}", args.order_id), &[]).await
}
