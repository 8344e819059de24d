//! Feasibility and satellite pass prediction.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::sync::Arc;
use uplink::Tool;

use super::validate::{self, ArgError, Validate};
use crate::client::{ImageryClient, UpstreamError};

#[derive(Debug, Deserialize, JsonSchema)]
pub struct CheckFeasibilityArgs {
    /// Area of interest as WKT, e.g. `POLYGON((lon lat, lon lat, ...))`
    pub aoi: String,

    /// Product type, e.g. DAY, NIGHT, MULTISPECTRAL, SAR
    pub product_type: String,

    /// Resolution class, e.g. LOW, MEDIUM, HIGH, VERY HIGH
    pub resolution: String,

    /// Start of the capture window (RFC 3339)
    pub start_date: String,

    /// End of the capture window (RFC 3339), after start_date
    pub end_date: String,

    /// Maximum acceptable cloud cover, 0-100
    pub max_cloud_coverage_percent: Option<f64>,

    /// Request priority tasking
    pub priority_item: Option<bool>,
}

impl Validate for CheckFeasibilityArgs {
    fn validate(&self) -> Result<(), ArgError> {
        validate::wkt("aoi", &self.aoi)?;
        validate::required("product_type", &self.product_type)?;
        validate::required("resolution", &self.resolution)?;
        validate::window("start_date", &self.start_date, "end_date", &self.end_date)?;
        validate::percent("max_cloud_coverage_percent", self.max_cloud_coverage_percent)
    }
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct FeasibilityRequest<'a> {
    aoi: &'a str,
    product_type: &'a str,
    resolution: &'a str,
    start_date: &'a str,
    end_date: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    max_cloud_coverage_percent: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    priority_item: Option<bool>,
}

pub fn check_feasibility_tool() -> Tool {
    Tool::new(
        "check_feasibility",
        "Check whether new imagery can be captured over an area within a time window. \
         Returns the provider's feasibility assessment, including capture opportunities.",
    )
    .with_input_schema::<CheckFeasibilityArgs>()
    .read_only()
}

pub async fn check_feasibility(
    client: Arc<ImageryClient>,
    args: CheckFeasibilityArgs,
) -> Result<Value, UpstreamError> {
    let body = FeasibilityRequest {
        aoi: args.aoi.trim(),
        product_type: &args.product_type,
        resolution: &args.resolution,
        start_date: &args.start_date,
        end_date: &args.end_date,
        max_cloud_coverage_percent: args.max_cloud_coverage_percent,
        priority_item: args.priority_item,
    };
    client.post("/feasibility", &body).await
}

#[derive(Debug, Deserialize, JsonSchema)]
pub struct PredictPassesArgs {
    /// Area of interest as WKT
    pub aoi: String,

    /// Start of the prediction window (RFC 3339)
    pub from_date: String,

    /// End of the prediction window (RFC 3339), after from_date
    pub to_date: String,

    /// Restrict to these product types
    pub product_types: Option<Vec<String>>,

    /// Restrict to these resolution classes
    pub resolutions: Option<Vec<String>>,

    /// Maximum off-nadir angle in degrees
    pub max_off_nadir_angle: Option<f64>,
}

impl Validate for PredictPassesArgs {
    fn validate(&self) -> Result<(), ArgError> {
        validate::wkt("aoi", &self.aoi)?;
        validate::window("from_date", &self.from_date, "to_date", &self.to_date)?;
        if let Some(angle) = self.max_off_nadir_angle {
            if !(0.0..=90.0).contains(&angle) {
                return Err(ArgError::new("max_off_nadir_angle must be between 0 and 90"));
            }
        }
        Ok(())
    }
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct PassPredictionRequest<'a> {
    aoi: &'a str,
    from_date: &'a str,
    to_date: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    product_types: Option<&'a [String]>,
    #[serde(skip_serializing_if = "Option::is_none")]
    resolutions: Option<&'a [String]>,
    #[serde(skip_serializing_if = "Option::is_none")]
    max_off_nadir_angle: Option<f64>,
}

pub fn predict_passes_tool() -> Tool {
    Tool::new(
        "predict_passes",
        "Predict satellite passes over an area within a time window.",
    )
    .with_input_schema::<PredictPassesArgs>()
    .read_only()
}

pub async fn predict_passes(
    client: Arc<ImageryClient>,
    args: PredictPassesArgs,
) -> Result<Value, UpstreamError> {
    let body = PassPredictionRequest {
        aoi: args.aoi.trim(),
        from_date: &args.from_date,
        to_date: &args.to_date,
        product_types: args.product_types.as_deref(),
        resolutions: args.resolutions.as_deref(),
        max_off_nadir_angle: args.max_off_nadir_angle,
    };
    client.post("/feasibility/pass-prediction", &body).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tools::parse_args;
    use serde_json::json;

    fn feasibility_args() -> Value {
        json!({
            "aoi": "POLYGON((0 0, 1 0, 1 1, 0 0))",
            "product_type": "DAY",
            "resolution": "HIGH",
            "start_date": "2026-03-01T00:00:00Z",
            "end_date": "2026-03-15T00:00:00Z",
        })
    }

    #[test]
    fn test_feasibility_args_accept_minimal() {
        let args: CheckFeasibilityArgs = parse_args(feasibility_args()).unwrap();
        assert_eq!(args.product_type, "DAY");
        assert!(args.priority_item.is_none());
    }

    #[test]
    fn test_feasibility_request_is_camel_case() {
        let args: CheckFeasibilityArgs = parse_args(feasibility_args()).unwrap();
        let body = serde_json::to_value(FeasibilityRequest {
            aoi: &args.aoi,
            product_type: &args.product_type,
            resolution: &args.resolution,
            start_date: &args.start_date,
            end_date: &args.end_date,
            max_cloud_coverage_percent: Some(20.0),
            priority_item: None,
        })
        .unwrap();
        assert_eq!(body["productType"], "DAY");
        assert_eq!(body["maxCloudCoveragePercent"], 20.0);
        assert!(body.get("priorityItem").is_none());
    }

    #[test]
    fn test_feasibility_rejects_reversed_window() {
        let mut args = feasibility_args();
        args["end_date"] = json!("2026-02-01T00:00:00Z");
        let err = parse_args::<CheckFeasibilityArgs>(args).unwrap_err();
        assert!(err.0.contains("start_date must be before end_date"));
    }

    #[test]
    fn test_feasibility_rejects_missing_field() {
        let mut args = feasibility_args();
        args.as_object_mut().unwrap().remove("aoi");
        let err = parse_args::<CheckFeasibilityArgs>(args).unwrap_err();
        assert!(err.0.contains("aoi"));
    }

    #[test]
    fn test_pass_prediction_angle_bounds() {
        let args = json!({
            "aoi": "POINT(10 20)",
            "from_date": "2026-03-01T00:00:00Z",
            "to_date": "2026-03-02T00:00:00Z",
            "max_off_nadir_angle": 120.0,
        });
        assert!(parse_args::<PredictPassesArgs>(args).is_err());
    }
}
