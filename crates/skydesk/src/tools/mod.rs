//! Imagery tools registered with the MCP server.
//!
//! Each tool deserializes its arguments into a typed struct (whose schema is
//! published in `tools/list`), validates them and forwards one call to the
//! provider API. Argument and upstream errors are returned as handler errors,
//! which the protocol server turns into `isError` results.

pub mod feasibility;
pub mod notifications;
pub mod orders;
pub mod validate;

use serde::de::DeserializeOwned;
use serde_json::Value;
use std::future::Future;
use std::sync::Arc;
use uplink::{tool_fn, BoxError, CallToolResult, ProtocolServer, Tool, ToolContext, ToolHandler};

use crate::client::{ImageryClient, UpstreamError};
use validate::{ArgError, Validate};

/// Register every imagery tool.
pub fn register_all(protocol: &ProtocolServer, client: Arc<ImageryClient>) {
    for (tool, handler) in definitions(&client) {
        protocol.register_tool(tool, handler);
    }
}

/// Tool metadata only, sorted by name. Used by `skydesk tools`.
pub fn catalogue() -> Vec<Tool> {
    let mut tools = vec![
        feasibility::check_feasibility_tool(),
        feasibility::predict_passes_tool(),
        orders::create_order_tool(),
        orders::list_orders_tool(),
        orders::get_order_tool(),
        notifications::create_notification_tool(),
        notifications::list_notifications_tool(),
        notifications::delete_notification_tool(),
    ];
    tools.sort_by(|a, b| a.name.cmp(&b.name));
    tools
}

fn definitions(client: &Arc<ImageryClient>) -> Vec<(Tool, Arc<dyn ToolHandler>)> {
    vec![
        (
            feasibility::check_feasibility_tool(),
            handler(client, feasibility::check_feasibility),
        ),
        (
            feasibility::predict_passes_tool(),
            handler(client, feasibility::predict_passes),
        ),
        (orders::create_order_tool(), handler(client, orders::create_order)),
        (orders::list_orders_tool(), handler(client, orders::list_orders)),
        (orders::get_order_tool(), handler(client, orders::get_order)),
        (
            notifications::create_notification_tool(),
            handler(client, notifications::create_notification),
        ),
        (
            notifications::list_notifications_tool(),
            handler(client, notifications::list_notifications),
        ),
        (
            notifications::delete_notification_tool(),
            handler(client, notifications::delete_notification),
        ),
    ]
}

/// Adapt a typed `async fn(client, args)` into a [`ToolHandler`].
pub fn handler<A, F, Fut>(client: &Arc<ImageryClient>, run: F) -> Arc<dyn ToolHandler>
where
    A: DeserializeOwned + Validate + Send + 'static,
    F: Fn(Arc<ImageryClient>, A) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<Value, UpstreamError>> + Send + 'static,
{
    let client = client.clone();
    let run = Arc::new(run);
    Arc::new(tool_fn(move |args: Value, ctx: ToolContext| {
        invoke(client.clone(), run.clone(), args, ctx)
    }))
}

async fn invoke<A, F, Fut>(
    client: Arc<ImageryClient>,
    run: Arc<F>,
    args: Value,
    ctx: ToolContext,
) -> Result<CallToolResult, BoxError>
where
    A: DeserializeOwned + Validate,
    F: Fn(Arc<ImageryClient>, A) -> Fut,
    Fut: Future<Output = Result<Value, UpstreamError>>,
{
    let args = parse_args::<A>(args)?;

    // a closed session has nobody to read the result
    tokio::select! {
        result = run(client, args) => Ok(CallToolResult::json(result?)),
        _ = ctx.closed.cancelled() => {
            tracing::debug!(session_id = %ctx.session_id, "Session closed mid-call, abandoning upstream request");
            Err("session closed".into())
        }
    }
}

/// Deserialize then validate tool arguments.
pub fn parse_args<A: DeserializeOwned + Validate>(args: Value) -> Result<A, ArgError> {
    let parsed: A = serde_json::from_value(args).map_err(|e| ArgError::new(e.to_string()))?;
    parsed.validate()?;
    Ok(parsed)
}
